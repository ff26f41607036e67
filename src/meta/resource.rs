use crate::plugin::PluginId;
use crate::ranking::{DcIdx, MapId};
use std::sync::OnceLock;
use trust_dns_proto::rr::Name;

/// A compiled resource: its ranking map and one entry per datacenter of that map.
#[derive(Debug)]
pub(crate) struct Resource {
    pub name: String,
    pub map: MapId,
    // dcs[i] is datacenter index i + 1
    pub dcs: Vec<DcEntry>,
}

impl Resource {
    /// The entry for a 1-based datacenter index.
    pub fn dc(&self, idx: DcIdx) -> Option<&DcEntry> {
        usize::from(idx)
            .checked_sub(1)
            .and_then(|i| self.dcs.get(i))
    }
}

#[derive(Debug)]
pub(crate) struct DcEntry {
    pub name: String,
    /// Admin slot for this datacenter of this resource.
    pub dc_slot: usize,
    /// Admin slot for this datacenter of the whole map, if the ranking has one.
    pub map_slot: Option<usize>,
    pub target: DcTarget,
}

#[derive(Debug)]
pub(crate) enum DcTarget {
    /// Answered by another resolver plugin.
    Delegate(Delegate),
    /// Answered with a fixed name.
    Name(NameTarget),
}

#[derive(Debug)]
pub(crate) struct Delegate {
    pub plugin_name: String,
    pub resource: String,
    // Bound once, by the first record mapped to this entry.
    pub plugin: OnceLock<PluginId>,
    pub handle: OnceLock<u32>,
}

impl Delegate {
    pub fn new(plugin_name: String, resource: String) -> Self {
        Delegate {
            plugin_name,
            resource,
            plugin: OnceLock::new(),
            handle: OnceLock::new(),
        }
    }

    /// The plugin and handle, once both are bound.
    pub fn binding(&self) -> Option<(PluginId, u32)> {
        Some((*self.plugin.get()?, *self.handle.get()?))
    }
}

#[derive(Debug)]
pub(crate) struct NameTarget {
    /// Possibly partial; completed with the record's origin.
    pub name: Name,
    /// One check slot per service type.
    pub slots: Vec<usize>,
}
