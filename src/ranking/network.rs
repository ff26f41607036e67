//! Network-based ("geo") ranking.
//!
//! Maps assign datacenter orders to client networks:
//!
//! ```json
//! "geoip": {
//!   "maps": {
//!     "world": {
//!       "datacenters": ["us", "eu", "ap"],
//!       "nets": {
//!         "192.0.2.0/24": ["eu", "us"],
//!         "2001:db8::/32": ["ap", "eu", "us"]
//!       }
//!     }
//!   },
//!   "resources": {
//!     "web": { "map": "world", "dcmap": { ... } }
//!   }
//! }
//! ```
//!
//! A client gets the order of the most specific network containing its address (the EDNS client
//! subnet when present) and the full `datacenters` order when no network matches. A network's
//! list may leave datacenters out. `map` may be omitted when only one map is configured.
//!
//! Every datacenter of every map also gets a map-level admin slot, `geoip/map/<map>/<dc>`, so an
//! operator can force a datacenter down for all resources that use the map at once.
use super::{datacenter_list, default_order, DcIdx, MapId, Ranking};
use crate::client::ClientInfo;
use crate::config::Stanza;
use crate::error::Error;
use crate::monitor::Monitors;
use ipnetwork::IpNetwork;
use serde_json::Value;
use std::net::IpAddr;
use std::str::FromStr;

#[derive(Debug)]
struct NetOrder {
    net: IpNetwork,
    order: Vec<DcIdx>,
    // Whether a more specific configured network lies inside this one.
    has_subnets: bool,
}

#[derive(Debug)]
struct DcMap {
    name: String,
    datacenters: Vec<String>,
    default_order: Vec<DcIdx>,
    // Sorted most specific first.
    nets: Vec<NetOrder>,
    admin_slots: Vec<usize>,
}

#[derive(Debug, Default)]
pub struct NetworkMap {
    maps: Vec<DcMap>,
}

fn invalid(message: String) -> Error {
    Error::InvalidConfig {
        plugin: NetworkMap::PLUGIN_NAME.to_string(),
        message,
    }
}

fn full_len(addr: IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

impl DcMap {
    fn from_config(name: &str, config: &Value, monitors: &mut Monitors) -> Result<Self, Error> {
        let what = format!("map '{name}'");
        let config = config
            .as_object()
            .ok_or_else(|| invalid(format!("{what}: must be an object")))?;
        let datacenters =
            datacenter_list(NetworkMap::PLUGIN_NAME, &what, config.get("datacenters"))?;
        let index_of = |dc: &str| -> Result<DcIdx, Error> {
            datacenters
                .iter()
                .position(|n| n == dc)
                .and_then(|pos| DcIdx::try_from(pos + 1).ok())
                .ok_or_else(|| invalid(format!("{what}: unknown datacenter '{dc}'")))
        };

        let mut nets = Vec::new();
        if let Some(nets_cfg) = config.get("nets") {
            let nets_cfg = nets_cfg
                .as_object()
                .ok_or_else(|| invalid(format!("{what}: 'nets' must be an object")))?;
            for (cidr, dcs) in nets_cfg {
                let net = IpNetwork::from_str(cidr)
                    .map_err(|e| invalid(format!("{what}: invalid network '{cidr}': {e}")))?;
                let names = datacenter_list(
                    NetworkMap::PLUGIN_NAME,
                    &format!("{what}: network '{cidr}'"),
                    Some(dcs),
                )?;
                let order = names
                    .iter()
                    .map(|dc| index_of(dc))
                    .collect::<Result<Vec<_>, _>>()?;
                nets.push(NetOrder {
                    net,
                    order,
                    has_subnets: false,
                });
            }
        }
        nets.sort_by(|a, b| b.net.prefix().cmp(&a.net.prefix()));
        for i in 0..nets.len() {
            let outer = nets[i].net;
            let has_subnets = nets.iter().any(|inner| {
                inner.net.prefix() > outer.prefix() && outer.contains(inner.net.network())
            });
            nets[i].has_subnets = has_subnets;
        }

        let admin_slots = datacenters
            .iter()
            .map(|dc| monitors.admin(&format!("{}/map/{name}/{dc}", NetworkMap::PLUGIN_NAME)))
            .collect();

        Ok(DcMap {
            name: name.to_string(),
            default_order: default_order(datacenters.len()),
            datacenters,
            nets,
            admin_slots,
        })
    }

    fn lookup(&self, addr: IpAddr) -> (&[DcIdx], u8) {
        match self.nets.iter().find(|n| n.net.contains(addr)) {
            Some(n) if n.has_subnets => (n.order.as_slice(), full_len(addr)),
            Some(n) => (n.order.as_slice(), n.net.prefix()),
            None if self.nets.is_empty() => (self.default_order.as_slice(), 0),
            None => (self.default_order.as_slice(), full_len(addr)),
        }
    }
}

impl Ranking for NetworkMap {
    const PLUGIN_NAME: &'static str = "geoip";
    const PLUGIN_KEYS: &'static [&'static str] = &["maps"];
    const RESOURCE_KEYS: &'static [&'static str] = &["map"];

    fn from_config(config: &Stanza, monitors: &mut Monitors) -> Result<Self, Error> {
        let maps_cfg = config
            .get("maps")
            .and_then(Value::as_object)
            .ok_or_else(|| invalid("config has no 'maps' object".to_string()))?;
        if maps_cfg.is_empty() {
            return Err(invalid("'maps' must not be empty".to_string()));
        }
        let maps = maps_cfg
            .iter()
            .map(|(name, cfg)| DcMap::from_config(name, cfg, monitors))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!("{}: loaded {} maps", Self::PLUGIN_NAME, maps.len());
        Ok(NetworkMap { maps })
    }

    fn map_for_resource(&mut self, resource: &str, config: &Stanza) -> Result<MapId, Error> {
        match config.get("map") {
            Some(Value::String(name)) => self
                .maps
                .iter()
                .position(|m| &m.name == name)
                .map(MapId)
                .ok_or_else(|| invalid(format!("resource '{resource}': unknown map '{name}'"))),
            Some(_) => Err(invalid(format!(
                "resource '{resource}': 'map' must be a string"
            ))),
            None if self.maps.len() == 1 => Ok(MapId(0)),
            None => Err(invalid(format!(
                "resource '{resource}': 'map' is required when more than one map is configured"
            ))),
        }
    }

    fn dc_count(&self, map: MapId) -> usize {
        self.maps.get(map.0).map_or(0, |m| m.datacenters.len())
    }

    fn dc_index(&self, map: MapId, dc_name: &str) -> Option<DcIdx> {
        let pos = self
            .maps
            .get(map.0)?
            .datacenters
            .iter()
            .position(|n| n == dc_name)?;
        DcIdx::try_from(pos + 1).ok()
    }

    fn dc_list(&self, map: MapId, client: &ClientInfo) -> (&[DcIdx], u8) {
        self.maps
            .get(map.0)
            .map_or((&[][..], 0), |m| m.lookup(client.lookup_addr()))
    }

    fn map_admin_slot(&self, map: MapId, dc: DcIdx) -> Option<usize> {
        let pos = usize::from(dc).checked_sub(1)?;
        self.maps.get(map.0)?.admin_slots.get(pos).copied()
    }
}
