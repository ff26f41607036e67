//! Configuration.
//!
//! Meta Crab reads a single JSON document. Plugin sections are kept as untyped, ordered
//! [`serde_json`] objects: plugins read them during load, inherit defaults down the tree, and may
//! splice synthesized sections into it for plugins that load later.
use crate::error::Error;
use crate::monitor::{Monitors, Sttl};
use serde::Deserialize;
use serde_json::{Map, Value};
use serde_with::{serde_as, DurationSeconds};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use trust_dns_proto::rr::Name;

pub type Shared = Arc<Config>;

/// An ordered JSON object, the shape of every plugin section and resource.
pub type Stanza = Map<String, Value>;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Origin of the zone the configured records live in, e.g. `example.com.`.
    pub origin: String,
    /// Plugin sections keyed by plugin name.
    pub plugins: Stanza,
    #[serde(default)]
    pub records: Vec<RecordConfig>,
    /// Admin overrides applied at startup, keyed by monitor slot descriptor, e.g.
    /// `"metafo/web/us": "DOWN/30"`.
    #[serde(default)]
    pub admin_state: HashMap<String, String>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Answers with addresses only.
    Dyna,
    /// Answers with addresses or a name; partial names are completed with the zone origin.
    Dync,
}

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct RecordConfig {
    /// Owner name, relative to the zone origin unless fully qualified.
    pub name: String,
    pub kind: RecordKind,
    /// `plugin!resource`, optionally pinned with `plugin!resource/datacenter`.
    pub resolver: String,
    /// Upper bound for the TTL handed out for this record.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_record_ttl")]
    pub ttl: Duration,
}

fn default_record_ttl() -> Duration {
    Duration::from_secs(86_400)
}

impl Config {
    /// Load a [`Config`] from the JSON file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the file can't be read, [`Error::InvalidJSON`] if it isn't a
    /// valid config document and [`Error::DomainName`] if the origin isn't a valid name.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.origin()?;
        Ok(conf)
    }

    /// The zone origin, made fully qualified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DomainName`] if the origin isn't a valid name.
    pub fn origin(&self) -> Result<Name, Error> {
        let mut origin = Name::from_str(&self.origin)?;
        origin.set_fqdn(true);
        Ok(origin)
    }

    /// Apply the configured admin overrides to a loaded monitor table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] for an unparseable state and [`Error::UnknownMonitor`] for
    /// a descriptor that no plugin registered.
    pub fn apply_admin_state(&self, monitors: &Monitors) -> Result<(), Error> {
        for (desc, state) in &self.admin_state {
            monitors.force(desc, state.parse::<Sttl>()?)?;
        }
        Ok(())
    }
}

/// Copy every key of `parent` that `child` doesn't already have down into `child`, except for the
/// keys listed in `skip`.
pub fn inherit(parent: &Stanza, child: &mut Stanza, skip: &[&str]) {
    for (key, value) in parent {
        if skip.contains(&key.as_str()) || child.contains_key(key) {
            continue;
        }
        child.insert(key.clone(), value.clone());
    }
}

/// Read a `service_types` value: a single string or a list of strings. `None` if absent, `Err`
/// with the offending value if malformed.
pub(crate) fn service_types(stanza: &Stanza) -> Result<Option<Vec<String>>, ()> {
    match stanza.get("service_types") {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(vec![s.clone()])),
        Some(Value::Array(list)) => list
            .iter()
            .map(|v| v.as_str().map(str::to_string).ok_or(()))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(()),
    }
}
