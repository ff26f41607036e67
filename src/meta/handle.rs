use crate::ranking::DcIdx;

/// The handle a meta plugin hands out for a resource.
///
/// The low 24 bits index the plugin's resource table. The high 8 bits are the 1-based index of
/// the datacenter a pinned lookup (`resource/datacenter`) is restricted to, or `0` when the
/// lookup is not pinned. A pinned resource is therefore just another handle, resolved by the same
/// code path as the whole resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

impl Handle {
    const DC_SHIFT: u32 = 24;
    const RES_MASK: u32 = 0x00FF_FFFF;

    /// Resource table size limit, as a count.
    pub const MAX_RESOURCES: usize = 1 << Self::DC_SHIFT;

    /// Pack a resource index and a pinned datacenter. `base` must be below
    /// [`Handle::MAX_RESOURCES`]; the loader guarantees this for every table index.
    #[must_use]
    pub fn encode(base: u32, pinned_dc: DcIdx) -> Self {
        debug_assert!(base <= Self::RES_MASK, "resource index {base} out of range");
        Handle((base & Self::RES_MASK) | (u32::from(pinned_dc) << Self::DC_SHIFT))
    }

    /// Unpack into the resource index and pinned datacenter.
    #[must_use]
    pub fn decode(self) -> (u32, DcIdx) {
        (self.base(), self.pinned_dc())
    }

    #[must_use]
    pub fn base(self) -> u32 {
        self.0 & Self::RES_MASK
    }

    /// The pinned datacenter, `0` if unpinned.
    #[must_use]
    pub fn pinned_dc(self) -> DcIdx {
        // the shift leaves exactly 8 bits
        #[allow(clippy::cast_possible_truncation)]
        let dc = (self.0 >> Self::DC_SHIFT) as DcIdx;
        dc
    }

    #[must_use]
    pub fn pinned(self) -> Option<DcIdx> {
        Some(self.pinned_dc()).filter(|dc| *dc != 0)
    }
}

impl From<u32> for Handle {
    fn from(raw: u32) -> Self {
        Handle(raw)
    }
}

impl From<Handle> for u32 {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

#[cfg(test)]
mod tests {
    use super::Handle;

    #[test]
    fn decode_inverts_encode() {
        for base in [0, 1, 0x1234, 0x00FF_FFFE, 0x00FF_FFFF] {
            for dc in [0, 1, 2, 127, 254, 255] {
                assert_eq!(Handle::encode(base, dc).decode(), (base, dc));
            }
        }
    }

    #[test]
    fn layout() {
        let handle = Handle::encode(5, 2);
        assert_eq!(u32::from(handle), 0x0200_0005);
        assert_eq!(Handle::from(0x0200_0005).pinned(), Some(2));
        assert_eq!(Handle::encode(5, 0).pinned(), None);
        assert_eq!(u32::from(Handle::encode(5, 0)), 5);
    }
}
