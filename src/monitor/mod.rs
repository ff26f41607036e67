//! Monitor state table.
//!
//! Resolvers register monitor slots while loading their configuration and keep the returned
//! slot indices. At query time they read the current [`Sttl`] of those slots from the table.
//!
//! There are two kinds of slots:
//!
//! * **Check slots** track the health of a service on an address or name, identified by a
//!   descriptor of the form `<address-or-name>/<service_type>`. The built-in service type `up`
//!   is always up and `down` is always down; any other service type starts up and is refreshed
//!   through [`Monitors::set_state`] by whatever is running the health checks.
//! * **Admin slots** exist only to be forced by an operator, e.g. `metafo/web/us` for the `us`
//!   datacenter of the `web` resource. They have no state of their own until forced.
//!
//! Any slot can be forced with [`Monitors::force`]. A forced slot ignores refreshes until it is
//! [unforced][Monitors::unforce].
//!
//! Registration needs `&mut Monitors` and only happens during load. Reads and refreshes work on a
//! shared reference: states are atomics updated in place, so readers never lock.

mod sttl;

pub use sttl::Sttl;

use crate::error::Error;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Service type used when a resource doesn't configure `service_types`.
pub const DEFAULT_SERVICE_TYPE: &str = "up";

#[derive(Debug)]
struct Slot {
    desc: String,
    state: AtomicU32,
}

/// The flat table of monitor slots.
#[derive(Debug, Default)]
pub struct Monitors {
    slots: Vec<Slot>,
    by_desc: HashMap<String, usize>,
}

impl Monitors {
    /// Register (or find) the admin slot with the given descriptor.
    pub fn admin(&mut self, desc: &str) -> usize {
        self.register(desc, Sttl::MAX)
    }

    /// Register (or find) the check slot for `service_type` on the address or name `target`.
    pub fn check(&mut self, service_type: &str, target: &str) -> usize {
        let initial = if service_type == "down" {
            Sttl::down(Sttl::TTL_MAX)
        } else {
            Sttl::MAX
        };
        self.register(&format!("{target}/{service_type}"), initial)
    }

    fn register(&mut self, desc: &str, initial: Sttl) -> usize {
        if let Some(&idx) = self.by_desc.get(desc) {
            return idx;
        }
        let idx = self.slots.len();
        self.slots.push(Slot {
            desc: desc.to_string(),
            state: AtomicU32::new(initial.bits()),
        });
        self.by_desc.insert(desc.to_string(), idx);
        tracing::trace!("registered monitor slot {idx} for '{desc}'");
        idx
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn lookup(&self, desc: &str) -> Option<usize> {
        self.by_desc.get(desc).copied()
    }

    #[must_use]
    pub fn desc(&self, idx: usize) -> Option<&str> {
        self.slots.get(idx).map(|s| s.desc.as_str())
    }

    /// The current value of a slot. Unknown slots read as [`Sttl::MAX`].
    #[must_use]
    pub fn get(&self, idx: usize) -> Sttl {
        self.slots.get(idx).map_or(Sttl::MAX, |slot| {
            Sttl::from_bits(slot.state.load(Ordering::Relaxed))
        })
    }

    /// The [minimum][Sttl::min] over a set of slots, [`Sttl::MAX`] for an empty set.
    #[must_use]
    pub fn min(&self, indices: &[usize]) -> Sttl {
        indices
            .iter()
            .fold(Sttl::MAX, |acc, &idx| acc.min(self.get(idx)))
    }

    /// Publish a fresh health check result. Has no effect on a forced slot.
    pub fn set_state(&self, idx: usize, state: Sttl) {
        if let Some(slot) = self.slots.get(idx) {
            let new = state.unforced().bits();
            let _ = slot
                .state
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                    (!Sttl::from_bits(cur).is_forced()).then_some(new)
                });
        }
    }

    /// Publish a fresh health check result for the slot with the given descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMonitor`] if no slot has that descriptor.
    pub fn set_state_by_desc(&self, desc: &str, state: Sttl) -> Result<(), Error> {
        let idx = self
            .lookup(desc)
            .ok_or_else(|| Error::UnknownMonitor(desc.to_string()))?;
        self.set_state(idx, state);
        Ok(())
    }

    /// Force the slot with the given descriptor to `state` until it is unforced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMonitor`] if no slot has that descriptor.
    pub fn force(&self, desc: &str, state: Sttl) -> Result<(), Error> {
        let idx = self
            .lookup(desc)
            .ok_or_else(|| Error::UnknownMonitor(desc.to_string()))?;
        self.slots[idx]
            .state
            .store(state.forced().bits(), Ordering::Relaxed);
        tracing::info!("admin state for '{desc}' forced to {state}");
        Ok(())
    }

    /// Drop an admin override, leaving the last forced value in place until the next refresh.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMonitor`] if no slot has that descriptor.
    pub fn unforce(&self, desc: &str) -> Result<(), Error> {
        let idx = self
            .lookup(desc)
            .ok_or_else(|| Error::UnknownMonitor(desc.to_string()))?;
        self.slots[idx].state.fetch_and(!Sttl::FORCED, Ordering::Relaxed);
        tracing::info!("admin state for '{desc}' no longer forced");
        Ok(())
    }
}
