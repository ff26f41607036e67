//! Static failover order.
//!
//! Each resource lists its datacenters in order of preference:
//!
//! ```json
//! "metafo": {
//!   "datacenters": ["us", "eu"],
//!   "resources": {
//!     "web": { "dcmap": { "us": "192.0.2.1", "eu": "192.0.2.2" } },
//!     "api": { "datacenters": ["eu", "us"], "dcmap": { ... } }
//!   }
//! }
//! ```
//!
//! Resources with identical lists share a map. The order doesn't depend on the client, so the
//! scope mask is always `0`.
use super::{datacenter_list, default_order, DcIdx, MapId, Ranking};
use crate::client::ClientInfo;
use crate::config::Stanza;
use crate::error::Error;
use crate::monitor::Monitors;

#[derive(Debug)]
struct DcList {
    names: Vec<String>,
    order: Vec<DcIdx>,
}

#[derive(Debug, Default)]
pub struct StaticOrder {
    maps: Vec<DcList>,
}

impl Ranking for StaticOrder {
    const PLUGIN_NAME: &'static str = "metafo";
    const PLUGIN_KEYS: &'static [&'static str] = &[];
    const RESOURCE_KEYS: &'static [&'static str] = &["datacenters"];

    fn from_config(_config: &Stanza, _monitors: &mut Monitors) -> Result<Self, Error> {
        Ok(Self::default())
    }

    fn map_for_resource(&mut self, resource: &str, config: &Stanza) -> Result<MapId, Error> {
        let names = datacenter_list(
            Self::PLUGIN_NAME,
            &format!("resource '{resource}'"),
            config.get("datacenters"),
        )?;
        if let Some(idx) = self.maps.iter().position(|m| m.names == names) {
            return Ok(MapId(idx));
        }
        let order = default_order(names.len());
        self.maps.push(DcList { names, order });
        Ok(MapId(self.maps.len() - 1))
    }

    fn dc_count(&self, map: MapId) -> usize {
        self.maps.get(map.0).map_or(0, |m| m.names.len())
    }

    fn dc_index(&self, map: MapId, dc_name: &str) -> Option<DcIdx> {
        let pos = self.maps.get(map.0)?.names.iter().position(|n| n == dc_name)?;
        DcIdx::try_from(pos + 1).ok()
    }

    fn dc_list(&self, map: MapId, _client: &ClientInfo) -> (&[DcIdx], u8) {
        (self.maps.get(map.0).map_or(&[][..], |m| m.order.as_slice()), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stanza(v: serde_json::Value) -> Stanza {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn identical_lists_share_a_map() {
        let mut ranking = StaticOrder::default();
        let a = ranking
            .map_for_resource("a", &stanza(json!({"datacenters": ["us", "eu"]})))
            .unwrap();
        let b = ranking
            .map_for_resource("b", &stanza(json!({"datacenters": ["us", "eu"]})))
            .unwrap();
        let c = ranking
            .map_for_resource("c", &stanza(json!({"datacenters": ["eu", "us"]})))
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(ranking.dc_index(c, "us"), Some(2));
        assert_eq!(ranking.dc_index(c, "ap"), None);
    }

    #[test]
    fn order_is_configured_order() {
        let mut ranking = StaticOrder::default();
        let map = ranking
            .map_for_resource("a", &stanza(json!({"datacenters": ["us", "eu", "ap"]})))
            .unwrap();
        let client = ClientInfo::new("192.0.2.1".parse().unwrap());
        assert_eq!(ranking.dc_list(map, &client), (&[1, 2, 3][..], 0));
    }

    #[test]
    fn rejects_bad_lists() {
        let mut ranking = StaticOrder::default();
        for cfg in [
            json!({}),
            json!({"datacenters": []}),
            json!({"datacenters": ["us", "us"]}),
            json!({"datacenters": [1]}),
        ] {
            assert!(ranking.map_for_resource("a", &stanza(cfg)).is_err());
        }
    }
}
