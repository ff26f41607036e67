//! Load-time construction of the resource table.
use super::handle::Handle;
use super::resource::{DcEntry, DcTarget, Delegate, NameTarget, Resource};
use super::MetaPlugin;
use crate::config::{inherit, service_types, Stanza};
use crate::dname;
use crate::error::Error;
use crate::monitor::DEFAULT_SERVICE_TYPE;
use crate::plugin::multifo::Multifo;
use crate::plugin::LoadContext;
use crate::ranking::Ranking;
use serde_json::Value;
use std::net::IpAddr;

/// Keys of a resource that describe the resource itself and are never inherited further down.
const RESOURCE_ONLY_KEYS: &[&str] = &["dcmap", "plugin"];

impl<R: Ranking> MetaPlugin<R> {
    /// Build the plugin from its config section.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the offending resource, datacenter or plugin.
    pub fn load(config: Option<&Value>, ctx: &mut LoadContext<'_>) -> Result<Self, Error> {
        let plugin = R::PLUGIN_NAME;
        let config = config
            .and_then(Value::as_object)
            .ok_or_else(|| Error::MissingConfig(plugin.to_string()))?;

        let mut ranking = R::from_config(config, ctx.monitors)?;

        let resources_cfg = match config.get("resources") {
            Some(Value::Object(resources)) => resources,
            Some(_) => {
                return Err(Error::InvalidConfig {
                    plugin: plugin.to_string(),
                    message: "'resources' stanza must be an object".to_string(),
                })
            }
            None => return Err(Error::MissingResources(plugin.to_string())),
        };
        if resources_cfg.len() > Handle::MAX_RESOURCES {
            return Err(Error::TooManyResources {
                plugin: plugin.to_string(),
                max: Handle::MAX_RESOURCES,
            });
        }

        let mut skip = vec!["resources"];
        skip.extend_from_slice(R::PLUGIN_KEYS);

        let mut resources = Vec::with_capacity(resources_cfg.len());
        for (name, res_cfg) in resources_cfg {
            let mut res_cfg = res_cfg
                .as_object()
                .cloned()
                .ok_or_else(|| Error::InvalidConfig {
                    plugin: plugin.to_string(),
                    message: format!("the value of resource '{name}' must be an object"),
                })?;
            inherit(config, &mut res_cfg, &skip);
            resources.push(compile_resource(&mut ranking, name, &res_cfg, ctx)?);
        }

        tracing::info!("{plugin}: loaded {} resources", resources.len());
        Ok(MetaPlugin { ranking, resources })
    }
}

fn compile_resource<R: Ranking>(
    ranking: &mut R,
    name: &str,
    res_cfg: &Stanza,
    ctx: &mut LoadContext<'_>,
) -> Result<Resource, Error> {
    let plugin = R::PLUGIN_NAME;
    if name.contains('/') {
        return Err(Error::InvalidResourceName {
            plugin: plugin.to_string(),
            resource: name.to_string(),
        });
    }

    let map = ranking.map_for_resource(name, res_cfg)?;

    let dcmap = match res_cfg.get("dcmap") {
        Some(Value::Object(dcmap)) => dcmap,
        Some(_) => {
            return Err(Error::InvalidConfig {
                plugin: plugin.to_string(),
                message: format!("resource '{name}': 'dcmap' value must be an object"),
            })
        }
        None => {
            return Err(Error::MissingDcMap {
                plugin: plugin.to_string(),
                resource: name.to_string(),
            })
        }
    };

    let expected = ranking.dc_count(map);
    let mismatch = || Error::DcMapMismatch {
        plugin: plugin.to_string(),
        resource: name.to_string(),
        configured: dcmap.len(),
        expected,
    };
    if dcmap.len() != expected {
        return Err(mismatch());
    }

    let mut entries: Vec<Option<DcEntry>> = (0..expected).map(|_| None).collect();
    for (dc_name, dc_cfg) in dcmap {
        let unknown = || Error::UnknownDatacenter {
            plugin: plugin.to_string(),
            resource: name.to_string(),
            datacenter: dc_name.clone(),
        };
        let idx = ranking.dc_index(map, dc_name).ok_or_else(unknown)?;
        let slot = usize::from(idx)
            .checked_sub(1)
            .and_then(|i| entries.get_mut(i))
            .ok_or_else(unknown)?;
        let map_slot = ranking.map_admin_slot(map, idx);
        *slot = Some(compile_entry::<R>(name, res_cfg, dc_name, dc_cfg, map_slot, ctx)?);
    }
    let dcs = entries
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(mismatch)?;

    tracing::debug!("{plugin}: resource '{name}': compiled {} datacenters", dcs.len());
    Ok(Resource {
        name: name.to_string(),
        map,
        dcs,
    })
}

fn compile_entry<R: Ranking>(
    resource: &str,
    res_cfg: &Stanza,
    dc_name: &str,
    dc_cfg: &Value,
    map_slot: Option<usize>,
    ctx: &mut LoadContext<'_>,
) -> Result<DcEntry, Error> {
    let plugin = R::PLUGIN_NAME;
    let dc_slot = ctx.monitors.admin(&format!("{plugin}/{resource}/{dc_name}"));

    let target = match dc_cfg {
        Value::String(text) => {
            if let Some(delegate_to) = text.strip_prefix('%') {
                let (target, target_res) =
                    delegate_to.split_once('!')
                        .ok_or_else(|| Error::MissingDelegateResource {
                            plugin: plugin.to_string(),
                            resource: resource.to_string(),
                            datacenter: dc_name.to_string(),
                            target: delegate_to.to_string(),
                        })?;
                delegate::<R>(resource, target, target_res)?
            } else if let Some(target_res) = text.strip_prefix('!') {
                let target = defaulted_plugin::<R>(res_cfg.get("plugin"), resource, dc_name)?;
                delegate::<R>(resource, &target, target_res)?
            } else if text.parse::<IpAddr>().is_ok() {
                synthesize::<R>(resource, res_cfg, dc_name, dc_cfg, ctx)?
            } else {
                direct_name::<R>(resource, res_cfg, dc_name, text, ctx)?
            }
        }
        _ => synthesize::<R>(resource, res_cfg, dc_name, dc_cfg, ctx)?,
    };

    Ok(DcEntry {
        name: dc_name.to_string(),
        dc_slot,
        map_slot,
        target,
    })
}

fn delegate<R: Ranking>(resource: &str, target: &str, target_res: &str) -> Result<DcTarget, Error> {
    if target == R::PLUGIN_NAME && target_res == resource {
        return Err(Error::SelfReference {
            plugin: R::PLUGIN_NAME.to_string(),
            resource: resource.to_string(),
        });
    }
    Ok(DcTarget::Delegate(Delegate::new(
        target.to_string(),
        target_res.to_string(),
    )))
}

fn defaulted_plugin<R: Ranking>(
    value: Option<&Value>,
    resource: &str,
    dc_name: &str,
) -> Result<String, Error> {
    match value {
        None => Ok(Multifo::NAME.to_string()),
        Some(Value::String(name)) => Ok(name.clone()),
        Some(_) => Err(Error::InvalidConfig {
            plugin: R::PLUGIN_NAME.to_string(),
            message: format!(
                "resource '{resource}': datacenter '{dc_name}': value of 'plugin' must be a string"
            ),
        }),
    }
}

/// Turn a bare address, a list of addresses or an object into a resource of another plugin,
/// named `<plugin>_<resource>_<datacenter>`, and delegate to it.
fn synthesize<R: Ranking>(
    resource: &str,
    res_cfg: &Stanza,
    dc_name: &str,
    dc_cfg: &Value,
    ctx: &mut LoadContext<'_>,
) -> Result<DcTarget, Error> {
    let plugin = R::PLUGIN_NAME;
    let invalid = |message: &str| Error::InvalidConfig {
        plugin: plugin.to_string(),
        message: format!("resource '{resource}': datacenter '{dc_name}': {message}"),
    };

    let (target, mut stanza) = match dc_cfg {
        Value::Object(obj) => {
            let target = defaulted_plugin::<R>(
                obj.get("plugin").or_else(|| res_cfg.get("plugin")),
                resource,
                dc_name,
            )?;
            let stanza: Stanza = obj
                .iter()
                .filter(|(k, _)| k.as_str() != "plugin")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            (target, stanza)
        }
        Value::String(_) => (Multifo::NAME.to_string(), address_stanza(&[dc_cfg.clone()])),
        Value::Array(list) => {
            if !list.iter().all(Value::is_string) {
                return Err(invalid(
                    "if defined as an array, array values must all be address strings",
                ));
            }
            (Multifo::NAME.to_string(), address_stanza(list))
        }
        _ => return Err(invalid("value must be a string, a list or an object")),
    };

    let mut skip = RESOURCE_ONLY_KEYS.to_vec();
    skip.extend_from_slice(R::RESOURCE_KEYS);
    inherit(res_cfg, &mut stanza, &skip);

    if target == plugin {
        return Err(Error::SelfSynthesis {
            plugin: plugin.to_string(),
            resource: resource.to_string(),
            datacenter: dc_name.to_string(),
        });
    }
    if ctx.is_loaded(&target) {
        return Err(Error::SynthesisAfterLoad {
            plugin: plugin.to_string(),
            resource: resource.to_string(),
            datacenter: dc_name.to_string(),
            target,
        });
    }

    let child = format!("{plugin}_{resource}_{dc_name}");
    let section = ctx
        .resources_section(&target)
        .ok_or_else(|| invalid(&format!("config of plugin '{target}' must be an object")))?;
    if section.contains_key(&child) {
        return Err(Error::SynthesizedNameExists {
            plugin: plugin.to_string(),
            resource: resource.to_string(),
            datacenter: dc_name.to_string(),
            child,
            target,
        });
    }
    section.insert(child.clone(), Value::Object(stanza));
    tracing::debug!("{plugin}: synthesized resource '{child}' for plugin '{target}'");

    Ok(DcTarget::Delegate(Delegate::new(target, child)))
}

/// `["192.0.2.1", "192.0.2.2"]` → `{"1": "192.0.2.1", "2": "192.0.2.2"}`
fn address_stanza(addrs: &[Value]) -> Stanza {
    addrs
        .iter()
        .enumerate()
        .map(|(i, addr)| ((i + 1).to_string(), addr.clone()))
        .collect()
}

fn direct_name<R: Ranking>(
    resource: &str,
    res_cfg: &Stanza,
    dc_name: &str,
    text: &str,
    ctx: &mut LoadContext<'_>,
) -> Result<DcTarget, Error> {
    let plugin = R::PLUGIN_NAME;
    let name = dname::parse(text).ok_or_else(|| Error::InvalidDomainName {
        plugin: plugin.to_string(),
        resource: resource.to_string(),
        datacenter: dc_name.to_string(),
        name: text.to_string(),
    })?;

    let svc_types = service_types(res_cfg)
        .map_err(|()| Error::InvalidServiceTypes {
            plugin: plugin.to_string(),
            resource: resource.to_string(),
        })?
        .unwrap_or_else(|| vec![DEFAULT_SERVICE_TYPE.to_string()]);
    let slots = svc_types
        .iter()
        .map(|svc| ctx.monitors.check(svc, text))
        .collect();

    Ok(DcTarget::Name(NameTarget { name, slots }))
}
