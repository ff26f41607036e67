//! The query path.
use super::handle::Handle;
use super::resource::{DcTarget, Resource};
use super::MetaPlugin;
use crate::dname;
use crate::monitor::Sttl;
use crate::plugin::{DynResult, Plugins, Query};
use crate::ranking::{DcIdx, Ranking};

impl<R: Ranking> MetaPlugin<R> {
    pub(super) fn resolve_handle(
        &self,
        plugins: &Plugins,
        handle: u32,
        query: &Query<'_>,
        result: &mut DynResult,
    ) -> Sttl {
        let (base, pinned) = Handle::from(handle).decode();
        let Some(res) = usize::try_from(base).ok().and_then(|b| self.resources.get(b)) else {
            tracing::error!("{}: resolve for unmapped handle {handle:#010x}", R::PLUGIN_NAME);
            return Sttl::down(0);
        };

        let pinned_list = [pinned];
        let (dclist, scope_mask) = if pinned == 0 {
            self.ranking.dc_list(res.map, query.client)
        } else {
            (&pinned_list[..], 0)
        };

        let mut rv = Sttl::MAX;
        result.wipe();

        if let Some(&first) = dclist.first() {
            for &idx in dclist {
                result.wipe();
                result.reset_scope_mask();
                let this_rv = resolve_dc(plugins, res, idx, query, result);
                rv = rv.min(this_rv);
                if !this_rv.is_down() {
                    rv = rv.without_down();
                    break;
                }
            }

            // Everything is down: answer with the first choice, keeping the merged state.
            if rv.is_down() {
                tracing::trace!(
                    "{}: resource '{}': all datacenters down",
                    R::PLUGIN_NAME,
                    res.name
                );
                result.wipe();
                result.reset_scope_mask();
                resolve_dc(plugins, res, first, query, result);
            }
        }

        result.add_scope_mask(scope_mask);
        rv
    }
}

fn resolve_dc(
    plugins: &Plugins,
    res: &Resource,
    idx: DcIdx,
    query: &Query<'_>,
    result: &mut DynResult,
) -> Sttl {
    let Some(dc) = res.dc(idx) else {
        return Sttl::down(0);
    };
    let monitors = plugins.monitors();

    let mut rv = match &dc.target {
        DcTarget::Name(target) => {
            match query.origin.and_then(|o| dname::complete(&target.name, o)) {
                Some(name) => result.add_cname(name),
                None => tracing::error!(
                    "resource '{}': datacenter '{}': name '{}' used without a valid origin",
                    res.name,
                    dc.name,
                    target.name
                ),
            }
            monitors.min(&target.slots)
        }
        DcTarget::Delegate(delegate) => match delegate.binding() {
            Some((id, handle)) => plugins.resolve(id, handle, query, result),
            None => {
                tracing::error!(
                    "resource '{}': datacenter '{}': delegate was never bound",
                    res.name,
                    dc.name
                );
                Sttl::down(0)
            }
        },
    };

    if let Some(map_slot) = dc.map_slot {
        let forced = monitors.get(map_slot);
        if forced.is_forced() {
            rv = forced;
        }
    }

    // More specific than the map level, so it wins when both are forced.
    let forced = monitors.get(dc.dc_slot);
    if forced.is_forced() {
        rv = forced;
    }

    rv
}
