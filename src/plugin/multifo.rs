//! Multi-address failover resolver.
//!
//! Each resource is an object of label → address pairs; plugin-level options are inherited into
//! every resource:
//!
//! ```json
//! "multifo": {
//!   "service_types": ["http"],
//!   "up_thresh": 0.5,
//!   "pool": { "1": "192.0.2.1", "2": "192.0.2.2", "3": "2001:db8::1" }
//! }
//! ```
//!
//! An address is up when all of its service types are up. If at least `up_thresh` of a
//! resource's addresses are up the answer is the up addresses, otherwise it is every address and
//! the resource is reported down. Either way the TTL is the shortest across all addresses.
//!
//! This is also the plugin meta plugins synthesize resources for when a datacenter is configured
//! as a bare address or a list of addresses.
use crate::config::{inherit, service_types, Stanza};
use crate::error::Error;
use crate::monitor::{Sttl, DEFAULT_SERVICE_TYPE};
use crate::plugin::{DynResult, LoadContext, Plugin, Plugins, Query};
use serde_json::Value;
use std::net::IpAddr;
use trust_dns_proto::rr::Name;

const OPTION_KEYS: &[&str] = &["service_types", "up_thresh"];
const DEFAULT_UP_THRESH: f64 = 0.5;

#[derive(Debug)]
struct Addr {
    addr: IpAddr,
    slots: Vec<usize>,
}

#[derive(Debug)]
struct Pool {
    name: String,
    addrs: Vec<Addr>,
    // Minimum number of up addresses for the pool to count as up.
    up_min: usize,
}

#[derive(Debug)]
pub struct Multifo {
    pools: Vec<Pool>,
}

fn invalid(message: String) -> Error {
    Error::InvalidConfig {
        plugin: Multifo::NAME.to_string(),
        message,
    }
}

impl Pool {
    fn from_config(name: &str, config: &Stanza, ctx: &mut LoadContext<'_>) -> Result<Self, Error> {
        let svc_types = service_types(config)
            .map_err(|()| Error::InvalidServiceTypes {
                plugin: Multifo::NAME.to_string(),
                resource: name.to_string(),
            })?
            .unwrap_or_else(|| vec![DEFAULT_SERVICE_TYPE.to_string()]);

        let up_thresh = match config.get("up_thresh") {
            None => DEFAULT_UP_THRESH,
            Some(v) => v
                .as_f64()
                .filter(|t| *t > 0.0 && *t <= 1.0)
                .ok_or_else(|| {
                    invalid(format!(
                        "resource '{name}': 'up_thresh' must be a number in (0, 1]"
                    ))
                })?,
        };

        let mut addrs = Vec::new();
        for (label, value) in config {
            if OPTION_KEYS.contains(&label.as_str()) {
                continue;
            }
            let addr = value
                .as_str()
                .and_then(|s| s.parse::<IpAddr>().ok())
                .ok_or_else(|| {
                    invalid(format!(
                        "resource '{name}': value for '{label}' must be an IP address"
                    ))
                })?;
            let addr_text = addr.to_string();
            let slots = svc_types
                .iter()
                .map(|svc| ctx.monitors.check(svc, &addr_text))
                .collect();
            addrs.push(Addr { addr, slots });
        }
        if addrs.is_empty() {
            return Err(invalid(format!("resource '{name}': no addresses")));
        }

        // up_thresh is in (0, 1] and counts are small, so this is exact enough.
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let up_min = ((addrs.len() as f64) * up_thresh).ceil() as usize;

        Ok(Pool {
            name: name.to_string(),
            addrs,
            up_min: up_min.max(1),
        })
    }
}

impl Multifo {
    pub const NAME: &'static str = "multifo";

    /// Build the plugin from its config section.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingConfig`] if the section isn't an object and
    /// [`Error::InvalidConfig`] for malformed resources.
    pub fn load(config: Option<&Value>, ctx: &mut LoadContext<'_>) -> Result<Self, Error> {
        let config = config
            .and_then(Value::as_object)
            .ok_or_else(|| Error::MissingConfig(Self::NAME.to_string()))?;

        let resource_names: Vec<&str> = config
            .keys()
            .map(String::as_str)
            .filter(|k| !OPTION_KEYS.contains(k))
            .collect();

        let mut pools = Vec::new();
        for &name in &resource_names {
            let mut res_cfg = config
                .get(name)
                .and_then(Value::as_object)
                .cloned()
                .ok_or_else(|| invalid(format!("resource '{name}' must be an object")))?;
            inherit(config, &mut res_cfg, &resource_names);
            pools.push(Pool::from_config(name, &res_cfg, ctx)?);
        }
        tracing::debug!("{}: loaded {} resources", Self::NAME, pools.len());
        Ok(Multifo { pools })
    }
}

impl Plugin for Multifo {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn map_res(
        &self,
        _plugins: &Plugins,
        resource: &str,
        _origin: Option<&Name>,
    ) -> Result<u32, Error> {
        self.pools
            .iter()
            .position(|p| p.name == resource)
            .and_then(|idx| u32::try_from(idx).ok())
            .ok_or_else(|| Error::UnknownResource {
                plugin: Self::NAME.to_string(),
                resource: resource.to_string(),
            })
    }

    fn resolve(
        &self,
        plugins: &Plugins,
        handle: u32,
        _query: &Query<'_>,
        result: &mut DynResult,
    ) -> Sttl {
        let Some(pool) = usize::try_from(handle).ok().and_then(|h| self.pools.get(h)) else {
            return Sttl::down(0);
        };
        let monitors = plugins.monitors();

        let mut rv = Sttl::MAX;
        let mut up = 0;
        for a in &pool.addrs {
            let state = monitors.min(&a.slots);
            rv = rv.min(state);
            if !state.is_down() {
                up += 1;
                result.add_addr(a.addr);
            }
        }

        if up >= pool.up_min {
            rv.without_down()
        } else {
            result.wipe();
            for a in &pool.addrs {
                result.add_addr(a.addr);
            }
            rv.with_down()
        }
    }
}
