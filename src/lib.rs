//! Meta Crab
//!
//! Datacenter failover (`metafo`) and geographic (`geoip`) resolution for dynamic DNS records.
//!
//! A record such as `www` is bound to a [meta resolver][meta] resource. For every query the
//! resource's datacenters are ranked for the client, either in a static failover order or by the
//! client's network, and the first healthy datacenter answers with its addresses or a name. The
//! answer comes with a health flag and a TTL derived from the [monitor table][monitor], which
//! operators can override per resource or per datacenter.
//!
//! ```json
//! {
//!   "origin": "example.com.",
//!   "plugins": {
//!     "metafo": {
//!       "datacenters": ["us", "eu"],
//!       "resources": {
//!         "web": { "dcmap": { "us": "192.0.2.1", "eu": "web.eu.example.net." } }
//!       }
//!     }
//!   },
//!   "records": [ { "name": "www", "kind": "dync", "resolver": "metafo!web", "ttl": 300 } ],
//!   "admin_state": { "metafo/web/us": "DOWN/30" }
//! }
//! ```
//!
#![warn(clippy::pedantic)]

pub mod client;
pub mod config;
pub mod dname;
pub mod error;
pub mod meta;
pub mod monitor;
pub mod plugin;
pub mod ranking;
pub mod record;

pub use client::ClientInfo;
pub use config::{Config, Shared};
pub use monitor::{Monitors, Sttl};
pub use plugin::{DynResult, Plugins};
pub use record::DynRecord;
