//! Meta resolvers: pick a datacenter per client, then answer from it.
//!
//! A meta plugin doesn't know any addresses itself. Each of its resources lists what to answer
//! for every datacenter of a [ranking][crate::ranking] map, and the ranking orders those
//! datacenters for each client. The first datacenter that is up answers the query.
//!
//! The same core backs both meta plugins; they only differ in their ranking:
//!
//! * `metafo` uses [`StaticOrder`][crate::ranking::StaticOrder], a fixed failover order.
//! * `geoip` uses [`NetworkMap`][crate::ranking::NetworkMap], an order per client network.
//!
//! # Resources
//!
//! Each resource needs a `dcmap` object with exactly one entry for every datacenter of its map.
//! Any other key of the plugin config is inherited by every resource that doesn't set it, and
//! resource keys are in turn inherited by synthesized sub-resolver configs (see below).
//!
//! ```json
//! "metafo": {
//!   "datacenters": ["us", "eu", "ap"],
//!   "resources": {
//!     "web": {
//!       "dcmap": {
//!         "us": "192.0.2.1",
//!         "eu": ["198.51.100.1", "198.51.100.2"],
//!         "ap": "web.ap.example.net."
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! A datacenter value is one of:
//!
//! * `"%plugin!resource"`: answer with `resource` of the resolver plugin `plugin`.
//! * `"!resource"`: the same with the plugin taken from the resource's `plugin` key, `multifo`
//!   if it has none.
//! * An address, a list of addresses, or an object: Meta Crab generates a resource named
//!   `<plugin>_<resource>_<datacenter>` for another plugin from it and answers with that.
//!   Addresses always generate a [`multifo`][crate::plugin::multifo] resource; an object goes to
//!   the plugin named by its own (or the resource's) `plugin` key, `multifo` by default.
//! * Anything else is a name to answer with directly, like a CNAME. Partial names such as `www`
//!   are completed with the origin of the record. Its health comes from the resource's
//!   `service_types` checks on that name (`up` by default).
//!
//! # Records and pinned datacenters
//!
//! Records refer to a resource as `plugin!resource`. `plugin!resource/datacenter` pins the
//! lookup to one datacenter, regardless of the client:
//!
//! ```text
//! www     dync  metafo!web
//! www-us  dync  metafo!web/us
//! ```
//!
//! Resources answering with a name can't serve address-only records; that is caught when the
//! record is bound.
//!
//! # Health
//!
//! A datacenter's health is that of its name's checks or of its sub-resolver. Operators can
//! override it through admin slots: `<plugin>/<resource>/<datacenter>` for one resource, and for
//! `geoip` also `geoip/map/<map>/<datacenter>` for every resource of a map. When both are forced
//! the per-resource one wins. If every candidate datacenter is down, the first one answers and
//! the result is reported down with the shortest TTL seen.

mod compile;
mod handle;
mod map;
mod resolve;
mod resource;

pub use handle::Handle;

use crate::error::Error;
use crate::monitor::Sttl;
use crate::plugin::{DynResult, Plugin, Plugins, Query};
use crate::ranking::Ranking;
use resource::Resource;
use trust_dns_proto::rr::Name;

/// A meta resolver plugin built on the ranking `R`.
#[derive(Debug)]
pub struct MetaPlugin<R: Ranking> {
    ranking: R,
    resources: Vec<Resource>,
}

impl<R: Ranking> Plugin for MetaPlugin<R> {
    fn name(&self) -> &str {
        R::PLUGIN_NAME
    }

    fn map_res(
        &self,
        plugins: &Plugins,
        resource: &str,
        origin: Option<&Name>,
    ) -> Result<u32, Error> {
        self.map_resource(plugins, resource, origin)
    }

    fn resolve(
        &self,
        plugins: &Plugins,
        handle: u32,
        query: &Query<'_>,
        result: &mut DynResult,
    ) -> Sttl {
        self.resolve_handle(plugins, handle, query, result)
    }
}
