//! Resolver plugins and the registry that loads them.
//!
//! Every dynamic record is answered by a resolver plugin. A plugin goes through three phases:
//!
//! 1. **Load**: the plugin is built from its section of the `plugins` config object. Loading
//!    runs on one thread, in [load order](#load-order), with mutable access to the remaining
//!    config document and the monitor table through a [`LoadContext`].
//! 2. **Map**: every configured record asks the plugin for a numeric handle for its resource name
//!    via [`Plugin::map_res`]. Mapping also runs at load time on one thread, and is where a plugin
//!    validates that the resource suits the record (address-only or name-producing).
//! 3. **Resolve**: queries call [`Plugin::resolve`] with the handle from the map phase. This is
//!    `&self`, runs concurrently on any number of workers and never blocks.
//!
//! # Load order
//!
//! Meta plugins may synthesize configuration for other plugins (see [`crate::meta`]), which only
//! works if the target loads later. Plugins therefore load by rank, `geoip` first, then `metafo`,
//! then everything else, keeping document order within a rank. Sections synthesized during load
//! are picked up when their plugin's turn comes.

pub mod multifo;
mod result;

pub use result::DynResult;

use crate::client::ClientInfo;
use crate::config::Stanza;
use crate::error::Error;
use crate::meta::MetaPlugin;
use crate::monitor::{Monitors, Sttl};
use crate::ranking::{NetworkMap, Ranking, StaticOrder};
use multifo::Multifo;
use serde_json::Value;
use trust_dns_proto::rr::Name;

/// Index of a loaded plugin in its [`Plugins`] registry.
pub type PluginId = usize;

/// One query, as handed to [`Plugin::resolve`].
#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    /// Identifies the worker thread answering the query.
    pub worker: usize,
    /// The origin of a name-producing record; `None` for address-only records.
    pub origin: Option<&'a Name>,
    pub client: &'a ClientInfo,
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Bind a resource name to a handle for later [`resolve`][Plugin::resolve] calls.
    ///
    /// `origin` is present for name-producing records and absent for address-only ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource doesn't exist or can't serve this kind of record.
    fn map_res(&self, plugins: &Plugins, resource: &str, origin: Option<&Name>)
        -> Result<u32, Error>;

    /// Answer a query for a handle obtained from [`map_res`][Plugin::map_res], writing the answer
    /// into `result` and returning its health and cache lifetime.
    fn resolve(&self, plugins: &Plugins, handle: u32, query: &Query<'_>, result: &mut DynResult)
        -> Sttl;
}

/// Mutable load-time state handed to a loading plugin.
pub struct LoadContext<'a> {
    doc: &'a mut Stanza,
    loaded: &'a [String],
    pub monitors: &'a mut Monitors,
}

impl LoadContext<'_> {
    /// Whether `plugin` has already been loaded.
    #[must_use]
    pub fn is_loaded(&self, plugin: &str) -> bool {
        self.loaded.iter().any(|p| p == plugin)
    }

    /// The section of the config document that holds `plugin`'s resources, created if missing.
    /// Meta plugins keep resources in a `resources` sub-object, others directly in their section.
    ///
    /// Returns `None` if the existing section (or its `resources`) isn't an object.
    pub fn resources_section(&mut self, plugin: &str) -> Option<&mut Stanza> {
        let section = self
            .doc
            .entry(plugin.to_string())
            .or_insert_with(|| Value::Object(Stanza::new()))
            .as_object_mut()?;
        if uses_resources_stanza(plugin) {
            section
                .entry("resources")
                .or_insert_with(|| Value::Object(Stanza::new()))
                .as_object_mut()
        } else {
            Some(section)
        }
    }
}

fn uses_resources_stanza(plugin: &str) -> bool {
    plugin == StaticOrder::PLUGIN_NAME || plugin == NetworkMap::PLUGIN_NAME
}

fn load_rank(plugin: &str) -> u8 {
    if plugin == NetworkMap::PLUGIN_NAME {
        0
    } else if plugin == StaticOrder::PLUGIN_NAME {
        1
    } else {
        2
    }
}

fn load_plugin(
    name: &str,
    config: Option<&Value>,
    ctx: &mut LoadContext<'_>,
) -> Result<Box<dyn Plugin>, Error> {
    if name == StaticOrder::PLUGIN_NAME {
        Ok(Box::new(MetaPlugin::<StaticOrder>::load(config, ctx)?))
    } else if name == NetworkMap::PLUGIN_NAME {
        Ok(Box::new(MetaPlugin::<NetworkMap>::load(config, ctx)?))
    } else if name == Multifo::NAME {
        Ok(Box::new(Multifo::load(config, ctx)?))
    } else {
        Err(Error::UnknownPlugin(name.to_string()))
    }
}

/// The loaded plugins and the monitor table they registered their slots in.
pub struct Plugins {
    plugins: Vec<Box<dyn Plugin>>,
    monitors: Monitors,
}

impl Plugins {
    /// Load every plugin section of `doc`, plus any sections synthesized while loading.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error of any plugin.
    pub fn load(mut doc: Stanza) -> Result<Self, Error> {
        let mut monitors = Monitors::default();
        let mut loaded: Vec<String> = Vec::new();
        let mut plugins: Vec<Box<dyn Plugin>> = Vec::new();

        while let Some(name) = doc
            .keys()
            .filter(|k| !loaded.contains(*k))
            .min_by_key(|k| load_rank(k))
            .cloned()
        {
            let config = doc.get(&name).cloned();
            let plugin = {
                let mut ctx = LoadContext {
                    doc: &mut doc,
                    loaded: &loaded,
                    monitors: &mut monitors,
                };
                load_plugin(&name, config.as_ref(), &mut ctx)?
            };
            tracing::debug!("loaded plugin '{name}'");
            loaded.push(name);
            plugins.push(plugin);
        }

        tracing::info!(
            "loaded {} plugins with {} monitor slots",
            plugins.len(),
            monitors.len()
        );
        Ok(Plugins { plugins, monitors })
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<PluginId> {
        self.plugins.iter().position(|p| p.name() == name)
    }

    #[must_use]
    pub fn get(&self, id: PluginId) -> Option<&dyn Plugin> {
        self.plugins.get(id).map(|p| &**p)
    }

    #[must_use]
    pub fn monitors(&self) -> &Monitors {
        &self.monitors
    }

    /// Map `resource` with the plugin `id`. Unknown ids are rejected like unknown resources.
    ///
    /// # Errors
    ///
    /// Returns whatever the plugin's [`map_res`][Plugin::map_res] returns.
    pub fn map_res(
        &self,
        id: PluginId,
        resource: &str,
        origin: Option<&Name>,
    ) -> Result<u32, Error> {
        match self.get(id) {
            Some(plugin) => plugin.map_res(self, resource, origin),
            None => Err(Error::UnknownPlugin(id.to_string())),
        }
    }

    /// Resolve a handle with the plugin `id`. An unknown id yields an empty, down result.
    pub fn resolve(
        &self,
        id: PluginId,
        handle: u32,
        query: &Query<'_>,
        result: &mut DynResult,
    ) -> Sttl {
        match self.get(id) {
            Some(plugin) => plugin.resolve(self, handle, query, result),
            None => {
                tracing::error!("resolve called for unknown plugin id {id}");
                Sttl::down(0)
            }
        }
    }

    /// Bind a `plugin!resource` string, as used by records, to a plugin and handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResolver`] for a malformed string, [`Error::UnknownPlugin`] if the
    /// plugin isn't loaded, and any mapping error of the plugin.
    pub fn bind(&self, resolver: &str, origin: Option<&Name>) -> Result<Binding, Error> {
        let (plugin, resource) = resolver
            .split_once('!')
            .filter(|(p, r)| !p.is_empty() && !r.is_empty())
            .ok_or_else(|| Error::InvalidResolver(resolver.to_string()))?;
        let id = self
            .find(plugin)
            .ok_or_else(|| Error::UnknownPlugin(plugin.to_string()))?;
        let handle = self.map_res(id, resource, origin)?;
        tracing::debug!("bound '{resolver}' to handle {handle:#010x}");
        Ok(Binding { plugin: id, handle })
    }
}

/// A resource bound to a loaded plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub plugin: PluginId,
    pub handle: u32,
}

impl Binding {
    pub fn resolve(&self, plugins: &Plugins, query: &Query<'_>, result: &mut DynResult) -> Sttl {
        plugins.resolve(self.plugin, self.handle, query, result)
    }
}
