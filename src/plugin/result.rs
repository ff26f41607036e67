use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use trust_dns_proto::rr::Name;

/// The output sink of a resolver: either a set of addresses or a single name, plus the EDNS
/// client subnet scope the answer was derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynResult {
    v4: Vec<Ipv4Addr>,
    v6: Vec<Ipv6Addr>,
    cname: Option<Name>,
    scope_mask: u8,
}

impl DynResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any addresses or name. The scope mask is left alone.
    pub fn wipe(&mut self) {
        self.v4.clear();
        self.v6.clear();
        self.cname = None;
    }

    pub fn reset_scope_mask(&mut self) {
        self.scope_mask = 0;
    }

    /// Widen the scope mask to at least `mask` bits. A narrower mask never replaces a wider one.
    pub fn add_scope_mask(&mut self, mask: u8) {
        self.scope_mask = self.scope_mask.max(mask);
    }

    pub fn add_addr(&mut self, addr: IpAddr) {
        match addr {
            IpAddr::V4(v4) => self.v4.push(v4),
            IpAddr::V6(v6) => self.v6.push(v6),
        }
    }

    /// Answer with a name. A result holds one name at most, so this replaces any previous one.
    pub fn add_cname(&mut self, name: Name) {
        self.cname = Some(name);
    }

    #[must_use]
    pub fn v4(&self) -> &[Ipv4Addr] {
        &self.v4
    }

    #[must_use]
    pub fn v6(&self) -> &[Ipv6Addr] {
        &self.v6
    }

    pub fn addrs(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.v4
            .iter()
            .copied()
            .map(IpAddr::V4)
            .chain(self.v6.iter().copied().map(IpAddr::V6))
    }

    #[must_use]
    pub fn cname(&self) -> Option<&Name> {
        self.cname.as_ref()
    }

    #[must_use]
    pub fn scope_mask(&self) -> u8 {
        self.scope_mask
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty() && self.cname.is_none()
    }
}
