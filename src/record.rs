//! Dynamic records.
//!
//! A dynamic record ties an owner name to a resolver resource. Records are bound once, when the
//! configuration is loaded, and every binding must succeed before any query is answered.
use crate::client::ClientInfo;
use crate::config::{Config, RecordConfig, RecordKind};
use crate::error::Error;
use crate::monitor::Sttl;
use crate::plugin::{Binding, DynResult, Plugins, Query};
use trust_dns_proto::rr::Name;

#[derive(Debug, Clone)]
pub struct DynRecord {
    pub name: Name,
    pub kind: RecordKind,
    pub resolver: String,
    binding: Binding,
    // Only name-producing records carry an origin.
    origin: Option<Name>,
    max_ttl: u32,
}

/// The answer for one query of a [`DynRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub result: DynResult,
    pub state: Sttl,
    /// The TTL to hand out: the resolver's, capped by the record's configured TTL.
    pub ttl: u32,
}

impl DynRecord {
    /// Bind a configured record to its resolver.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DomainName`] for an invalid owner name, and any error of
    /// [`Plugins::bind`].
    pub fn bind(config: &RecordConfig, origin: &Name, plugins: &Plugins) -> Result<Self, Error> {
        let mut name = Name::from_ascii(&config.name)?;
        if !name.is_fqdn() {
            name = name.append_domain(origin)?;
        }
        let record_origin = match config.kind {
            RecordKind::Dyna => None,
            RecordKind::Dync => Some(origin.clone()),
        };
        let binding = plugins.bind(&config.resolver, record_origin.as_ref())?;
        Ok(DynRecord {
            name,
            kind: config.kind,
            resolver: config.resolver.clone(),
            binding,
            origin: record_origin,
            max_ttl: u32::try_from(config.ttl.as_secs()).unwrap_or(u32::MAX),
        })
    }

    /// Bind every record of the config.
    ///
    /// # Errors
    ///
    /// Returns the first binding error.
    pub fn bind_all(config: &Config, plugins: &Plugins) -> Result<Vec<Self>, Error> {
        let origin = config.origin()?;
        config
            .records
            .iter()
            .map(|rec| Self::bind(rec, &origin, plugins))
            .collect()
    }

    #[must_use]
    pub fn resolve(&self, plugins: &Plugins, worker: usize, client: &ClientInfo) -> Answer {
        let query = Query {
            worker,
            origin: self.origin.as_ref(),
            client,
        };
        let mut result = DynResult::new();
        let state = self.binding.resolve(plugins, &query, &mut result);
        Answer {
            result,
            state,
            ttl: state.ttl().min(self.max_ttl),
        }
    }
}
