//! Datacenter rankings.
//!
//! A ranking owns the datacenter maps of a meta plugin. Each map is an ordered list of
//! datacenter names; datacenters are addressed by their 1-based position in that list, and `0`
//! never names a datacenter. For every query the ranking orders a map's datacenters for the
//! requesting client.
//!
//! Two rankings are provided:
//!
//! * [`StaticOrder`], behind the `metafo` plugin: every client gets the configured order.
//! * [`NetworkMap`], behind the `geoip` plugin: the order depends on which configured network
//!   the client is in.

pub mod network;
pub mod static_order;

pub use network::NetworkMap;
pub use static_order::StaticOrder;

use crate::client::ClientInfo;
use crate::config::Stanza;
use crate::error::Error;
use crate::monitor::Monitors;

/// A 1-based datacenter index within a map. `0` means "no datacenter".
pub type DcIdx = u8;

/// Opaque reference to one of a ranking's maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapId(pub(crate) usize);

/// Most datacenters a single map may list, so every index fits a [`DcIdx`].
pub const MAX_DATACENTERS: usize = u8::MAX as usize;

pub trait Ranking: Sized + Send + Sync + 'static {
    /// Name of the plugin built on this ranking.
    const PLUGIN_NAME: &'static str;

    /// Plugin-level keys the ranking consumes; they aren't inherited into resources.
    const PLUGIN_KEYS: &'static [&'static str];

    /// Resource-level keys the ranking consumes; they aren't inherited into synthesized configs.
    const RESOURCE_KEYS: &'static [&'static str];

    /// Build the ranking from the plugin's top-level config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for malformed ranking configuration.
    fn from_config(config: &Stanza, monitors: &mut Monitors) -> Result<Self, Error>;

    /// Pick (or create) the map for a resource from its (inherited) config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the resource doesn't identify a valid map.
    fn map_for_resource(&mut self, resource: &str, config: &Stanza) -> Result<MapId, Error>;

    /// Number of datacenters in a map.
    fn dc_count(&self, map: MapId) -> usize;

    /// The index of a datacenter in a map, if the map has it.
    fn dc_index(&self, map: MapId, dc_name: &str) -> Option<DcIdx>;

    /// The client's datacenters in order of preference, with the number of leading bits of the
    /// client address the ordering was derived from.
    fn dc_list(&self, map: MapId, client: &ClientInfo) -> (&[DcIdx], u8);

    /// The map-level admin slot of a datacenter, for rankings that have them.
    fn map_admin_slot(&self, _map: MapId, _dc: DcIdx) -> Option<usize> {
        None
    }
}

/// Parse a list of datacenter names, rejecting empty lists, duplicates and oversized lists.
pub(crate) fn datacenter_list(
    plugin: &str,
    what: &str,
    value: Option<&serde_json::Value>,
) -> Result<Vec<String>, Error> {
    let invalid = |message: String| Error::InvalidConfig {
        plugin: plugin.to_string(),
        message,
    };
    let list = match value {
        Some(serde_json::Value::Array(list)) => list,
        Some(serde_json::Value::String(name)) => return Ok(vec![name.clone()]),
        Some(_) => return Err(invalid(format!("{what}: 'datacenters' must be a list"))),
        None => return Err(invalid(format!("{what}: missing 'datacenters' list"))),
    };
    if list.is_empty() {
        return Err(invalid(format!("{what}: 'datacenters' must not be empty")));
    }
    if list.len() > MAX_DATACENTERS {
        return Err(invalid(format!(
            "{what}: too many datacenters (max {MAX_DATACENTERS})"
        )));
    }
    let mut names: Vec<String> = Vec::with_capacity(list.len());
    for value in list {
        let name = value
            .as_str()
            .ok_or_else(|| invalid(format!("{what}: datacenter names must be strings")))?;
        if names.iter().any(|n| n == name) {
            return Err(invalid(format!("{what}: datacenter '{name}' listed twice")));
        }
        names.push(name.to_string());
    }
    Ok(names)
}

/// Every datacenter index of a list of `count` datacenters, in configured order.
pub(crate) fn default_order(count: usize) -> Vec<DcIdx> {
    // count never exceeds MAX_DATACENTERS, see datacenter_list
    (1..=count)
        .map(|i| DcIdx::try_from(i).unwrap_or(DcIdx::MAX))
        .collect()
}
