//! Binding resource names to handles.
use super::handle::Handle;
use super::resource::{DcEntry, DcTarget, Delegate, Resource};
use super::MetaPlugin;
use crate::dname;
use crate::error::Error;
use crate::plugin::Plugins;
use crate::ranking::Ranking;
use trust_dns_proto::rr::Name;

impl<R: Ranking> MetaPlugin<R> {
    /// Map `resource` or `resource/datacenter` to a handle, binding the delegates of every
    /// datacenter the handle can reach.
    pub(super) fn map_resource(
        &self,
        plugins: &Plugins,
        resname: &str,
        origin: Option<&Name>,
    ) -> Result<u32, Error> {
        let plugin = R::PLUGIN_NAME;
        let (name, pinned_name) = match resname.split_once('/') {
            Some((name, dc)) => (name, Some(dc)),
            None => (resname, None),
        };

        let (base, res) = self
            .resources
            .iter()
            .enumerate()
            .find(|(_, r)| r.name == name)
            .ok_or_else(|| Error::UnknownResource {
                plugin: plugin.to_string(),
                resource: resname.to_string(),
            })?;

        let pinned = match pinned_name {
            None => 0,
            Some(dc) => self.ranking.dc_index(res.map, dc).ok_or_else(|| {
                Error::UnknownPinnedDatacenter {
                    plugin: plugin.to_string(),
                    resource: name.to_string(),
                    datacenter: dc.to_string(),
                }
            })?,
        };

        if pinned == 0 {
            for dc in &res.dcs {
                bind_entry::<R>(plugins, res, dc, origin)?;
            }
        } else if let Some(dc) = res.dc(pinned) {
            bind_entry::<R>(plugins, res, dc, origin)?;
        }

        // base < Handle::MAX_RESOURCES, enforced at load
        let base = u32::try_from(base).map_err(|_| Error::TooManyResources {
            plugin: plugin.to_string(),
            max: Handle::MAX_RESOURCES,
        })?;
        Ok(Handle::encode(base, pinned).into())
    }
}

fn bind_entry<R: Ranking>(
    plugins: &Plugins,
    res: &Resource,
    dc: &DcEntry,
    origin: Option<&Name>,
) -> Result<(), Error> {
    let plugin = R::PLUGIN_NAME;
    match &dc.target {
        DcTarget::Name(target) => {
            let Some(origin) = origin else {
                return Err(Error::CnameInAddressContext {
                    plugin: plugin.to_string(),
                    resource: res.name.clone(),
                    datacenter: dc.name.clone(),
                    name: target.name.to_string(),
                });
            };
            if dname::complete(&target.name, origin).is_none() {
                return Err(Error::InvalidCompletion {
                    plugin: plugin.to_string(),
                    resource: res.name.clone(),
                    name: target.name.to_string(),
                    origin: origin.to_string(),
                });
            }
            Ok(())
        }
        DcTarget::Delegate(delegate) => bind_delegate::<R>(plugins, res, dc, delegate, origin),
    }
}

fn bind_delegate<R: Ranking>(
    plugins: &Plugins,
    res: &Resource,
    dc: &DcEntry,
    delegate: &Delegate,
    origin: Option<&Name>,
) -> Result<(), Error> {
    let plugin = R::PLUGIN_NAME;
    let id = match delegate.plugin.get() {
        Some(&id) => id,
        None => {
            let id = plugins.find(&delegate.plugin_name).ok_or_else(|| {
                Error::InvalidPluginName {
                    plugin: plugin.to_string(),
                    resource: res.name.clone(),
                    datacenter: dc.name.clone(),
                    target: delegate.plugin_name.clone(),
                }
            })?;
            *delegate.plugin.get_or_init(|| id)
        }
    };

    // Each record mapping this entry is validated by the sub-resolver for its own origin.
    let handle = plugins
        .map_res(id, &delegate.resource, origin)
        .map_err(|source| match origin {
            Some(origin) => Error::DelegateRejectedName {
                plugin: plugin.to_string(),
                resource: res.name.clone(),
                datacenter: dc.name.clone(),
                target: delegate.plugin_name.clone(),
                target_resource: delegate.resource.clone(),
                origin: origin.to_string(),
                source: Box::new(source),
            },
            None => Error::DelegateRejectedAddress {
                plugin: plugin.to_string(),
                resource: res.name.clone(),
                datacenter: dc.name.clone(),
                target: delegate.plugin_name.clone(),
                target_resource: delegate.resource.clone(),
                source: Box::new(source),
            },
        })?;

    let bound = *delegate.handle.get_or_init(|| handle);
    debug_assert_eq!(bound, handle, "sub-resolver handles must not depend on origin");
    tracing::debug!(
        "{plugin}: resource '{}': datacenter '{}': bound to {}!{} ({handle:#010x})",
        res.name,
        dc.name,
        delegate.plugin_name,
        delegate.resource
    );
    Ok(())
}
