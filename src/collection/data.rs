//! Notification-driven binding between editors and a stored collection.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use super::{
    resolve_membership, select_strategy, CollectionApi, CollectionStringListData, ExpansionRule,
    RuleState, Signal, Strategy,
};
use crate::core::{Listen, ObjectsChanged, Prim, Stage, Subscription};
use crate::host::{CollectionContext, MessageType};
use crate::util::{Error, Result, ScenePath};

const INCLUDE_ALL_DISABLED: &str =
    "\"Include All\" has been disabled for the expression to take effect.";

/// A (prim, collection name) pair.
#[derive(Clone, Debug)]
pub(crate) struct Binding {
    pub(crate) prim: Prim,
    pub(crate) name: String,
}

impl Binding {
    /// Run `f` against the collection. None if the stage is gone, the prim
    /// was removed, or the name is unusable.
    pub(crate) fn with_api<R>(&self, f: impl FnOnce(&CollectionApi<'_>) -> R) -> Option<R> {
        let stage = self.prim.stage()?;
        if !self.prim.is_valid() {
            return None;
        }
        let api = CollectionApi::new(&stage, self.prim.path(), &self.name)?;
        Some(f(&api))
    }
}

/// Binding shared between a [`CollectionData`] and the list views it hands
/// out, so rebinding retargets views that editors already hold.
pub(crate) type SharedBinding = Arc<RwLock<Option<Binding>>>;

/// Which signals a notice should fire for one bound prim.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub any: bool,
    pub includes: bool,
    pub excludes: bool,
}

/// Filter `notice` down to properties of `prim`.
///
/// Property names with more than two `:` fields ending in `includes` or
/// `excludes` mark the matching list as changed.
pub fn classify_changes(notice: &ObjectsChanged, prim: &ScenePath) -> ChangeSet {
    let mut changes = ChangeSet::default();
    for path in notice.changed_paths() {
        let Some(property) = path.property_name() else {
            continue;
        };
        if path.prim_part() != prim.as_str() {
            continue;
        }
        changes.any = true;
        let fields: Vec<&str> = property.split(':').collect();
        if fields.len() > 2 {
            match fields.last() {
                Some(&"includes") => changes.includes = true,
                Some(&"excludes") => changes.excludes = true,
                _ => {}
            }
        }
    }
    changes
}

/// Editable view of one collection, kept in sync with its stage.
///
/// While bound, the stage's objects-changed notices are filtered to the
/// bound prim's properties and re-broadcast as `data_changed` plus the
/// includes/excludes list signals. Membership is never cached.
///
/// Every query on an unbound or stale binding returns a default (empty,
/// false) and every edit returns `false`.
pub struct CollectionData {
    ctx: CollectionContext,
    binding: SharedBinding,
    subscription: Option<Subscription>,
    data_changed: Signal,
    includes_changed: Signal,
    excludes_changed: Signal,
}

impl CollectionData {
    /// Bind to collection `name` on `prim`.
    pub fn new(ctx: CollectionContext, prim: &Prim, name: &str) -> Self {
        let mut data = Self::unbound(ctx);
        data.set_collection(prim, name);
        data
    }

    pub fn unbound(ctx: CollectionContext) -> Self {
        Self {
            ctx,
            binding: Arc::new(RwLock::new(None)),
            subscription: None,
            data_changed: Signal::new(),
            includes_changed: Signal::new(),
            excludes_changed: Signal::new(),
        }
    }

    /// Rebind to another collection.
    ///
    /// The old subscription is released before the new one is made, so two
    /// subscriptions never coexist. List views from
    /// [`include_data`](Self::include_data) and
    /// [`exclude_data`](Self::exclude_data) follow the new binding.
    /// Observers get `data_changed`.
    pub fn set_collection(&mut self, prim: &Prim, name: &str) {
        self.untrack();
        *self.binding.write() = Some(Binding {
            prim: prim.clone(),
            name: name.to_string(),
        });
        if self.is_valid() {
            self.track();
        } else {
            debug!(prim = %prim.path(), name, "bound to an invalid collection");
        }
        self.data_changed.emit(&());
    }

    /// Drop the binding and its subscription.
    pub fn unbind(&mut self) {
        self.untrack();
        let previous = self.binding.write().take();
        if previous.is_some() {
            self.data_changed.emit(&());
        }
    }

    fn track(&mut self) {
        let Some(binding) = self.binding() else {
            return;
        };
        let Some(stage) = binding.prim.stage() else {
            return;
        };
        let prim = binding.prim.clone();
        let data_changed = self.data_changed.clone();
        let includes_changed = self.includes_changed.clone();
        let excludes_changed = self.excludes_changed.clone();

        self.subscription = Some(stage.subscribe_objects_changed(move |notice| {
            if !prim.is_valid() {
                trace!(prim = %prim.path(), "collection prim went away, unsubscribing");
                return Listen::Revoke;
            }
            let changes = classify_changes(notice, prim.path());
            if changes.any {
                data_changed.emit(&());
            }
            if changes.includes {
                includes_changed.emit(&());
            }
            if changes.excludes {
                excludes_changed.emit(&());
            }
            Listen::Keep
        }));
    }

    fn untrack(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.revoke();
        }
    }

    /// Snapshot of the current binding. The lock is not held while the
    /// stage is queried or edited.
    fn binding(&self) -> Option<Binding> {
        self.binding.read().clone()
    }

    fn with_api<R>(&self, f: impl FnOnce(&CollectionApi<'_>) -> R) -> Option<R> {
        self.binding()?.with_api(f)
    }

    fn report_error(&self, action: &str, err: Error) {
        warn!(error = %err, "{}", action);
        self.ctx
            .report(&format!("{}: {}", action, err), MessageType::Error);
    }

    // ========================================================================
    // Binding state
    // ========================================================================

    pub fn context(&self) -> &CollectionContext {
        &self.ctx
    }

    /// Bound, stage alive and prim not removed.
    pub fn is_valid(&self) -> bool {
        self.binding.read().as_ref().map_or(false, |b| b.prim.is_valid())
    }

    pub fn prim(&self) -> Option<Prim> {
        self.binding().map(|b| b.prim)
    }

    pub fn name(&self) -> Option<String> {
        self.binding().map(|b| b.name)
    }

    pub fn stage(&self) -> Option<Arc<Stage>> {
        self.binding()?.prim.stage()
    }

    /// True while the stage subscription is registered.
    pub fn is_tracking(&self) -> bool {
        self.subscription.as_ref().map_or(false, |s| s.is_active())
    }

    /// `/prim.collection:name`.
    pub fn named_collection_path(&self) -> Option<ScenePath> {
        self.with_api(|api| api.named_collection_path())
    }

    pub fn rule_state(&self) -> RuleState {
        self.with_api(|api| api.rule_state()).unwrap_or_default()
    }

    /// Expression and include/exclude data are both present.
    pub fn has_data_conflict(&self) -> bool {
        self.rule_state().has_conflict()
    }

    // ========================================================================
    // Include all / expansion
    // ========================================================================

    pub fn includes_all(&self) -> bool {
        self.with_api(|api| api.include_root()).unwrap_or(false)
    }

    pub fn set_include_all(&self, state: bool) -> bool {
        let result = self.with_api(|api| {
            if api.include_root() == state {
                return Ok(false);
            }
            api.set_include_root(state).map(|_| true)
        });
        match result {
            Some(Ok(changed)) => changed,
            Some(Err(err)) => {
                self.report_error("Failed to set Include All", err);
                false
            }
            None => false,
        }
    }

    pub fn expansion_rule(&self) -> ExpansionRule {
        self.with_api(|api| api.expansion_rule()).unwrap_or_default()
    }

    pub fn set_expansion_rule(&self, rule: ExpansionRule) -> bool {
        let result = self.with_api(|api| {
            if api.expansion_rule() == rule && api.is_applied() {
                return Ok(false);
            }
            api.set_expansion_rule(rule).map(|_| true)
        });
        match result {
            Some(Ok(changed)) => changed,
            Some(Err(err)) => {
                self.report_error("Failed to set the expansion rule", err);
                false
            }
            None => false,
        }
    }

    // ========================================================================
    // Include / exclude lists
    // ========================================================================

    pub fn include_data(&self) -> CollectionStringListData {
        CollectionStringListData::new(
            self.ctx.clone(),
            Arc::clone(&self.binding),
            true,
            self.includes_changed.clone(),
        )
    }

    pub fn exclude_data(&self) -> CollectionStringListData {
        CollectionStringListData::new(
            self.ctx.clone(),
            Arc::clone(&self.binding),
            false,
            self.excludes_changed.clone(),
        )
    }

    /// Author blocks on includes and excludes, hiding weaker layers.
    pub fn remove_all_include_exclude(&self) -> bool {
        match self.with_api(|api| api.block_collection()) {
            Some(Ok(())) => true,
            Some(Err(err)) => {
                self.report_error("Failed to remove include/exclude data", err);
                false
            }
            None => false,
        }
    }

    /// Remove this level's include/exclude opinions so weaker layers show.
    pub fn clear_include_exclude_opinions(&self) -> bool {
        match self.with_api(|api| api.reset_collection()) {
            Some(Ok(changed)) => changed,
            Some(Err(err)) => {
                self.report_error("Failed to clear include/exclude opinions", err);
                false
            }
            None => false,
        }
    }

    // ========================================================================
    // Expression
    // ========================================================================

    /// Stored expression text, empty if none.
    pub fn membership_expression(&self) -> String {
        self.with_api(|api| api.membership_expression())
            .flatten()
            .unwrap_or_default()
    }

    /// Set or clear the membership expression. Returns whether anything changed.
    ///
    /// Invalid syntax is reported as an error and leaves the stored state
    /// alone. Setting an expression on a collection whose only rule is
    /// `includeAll` also turns `includeAll` off, with an INFO notice.
    pub fn set_membership_expression(&self, text: &str) -> bool {
        let Some(binding) = self.binding() else {
            return false;
        };
        if !self.is_valid() || text == self.membership_expression() {
            return false;
        }

        if text.is_empty() {
            let result = binding.with_api(|api| {
                api.stage().batch_changes(|| -> Result<bool> {
                    let cleared = api.clear_membership_expression()?;
                    if api.membership_expression().is_some() {
                        api.stage().block(api.membership_expression_path())?;
                        return Ok(true);
                    }
                    Ok(cleared)
                })
            });
            return match result {
                Some(Ok(changed)) => changed,
                Some(Err(err)) => {
                    self.report_error("Failed to clear the expression", err);
                    false
                }
                None => false,
            };
        }

        let expression = match self.ctx.evaluator().compile(text) {
            Ok(expression) => expression,
            Err(err) => {
                debug!(error = %err, "rejected membership expression");
                self.ctx.report(
                    &format!(
                        "Failed to update the collection {} with the expression: {}",
                        binding.name, text
                    ),
                    MessageType::Error,
                );
                return false;
            }
        };

        // Expression and includeAll change together, under one notice.
        let result = binding.with_api(|api| {
            api.stage().batch_changes(|| -> Result<bool> {
                let state = api.rule_state();
                let disable_include_all =
                    state.include_all && state.includes.is_empty() && state.excludes.is_empty();
                api.set_membership_expression(&expression)?;
                if disable_include_all {
                    api.set_include_root(false)?;
                }
                Ok(disable_include_all)
            })
        });
        match result {
            Some(Ok(disabled_include_all)) => {
                if disabled_include_all {
                    self.ctx.report(INCLUDE_ALL_DISABLED, MessageType::Info);
                }
                true
            }
            Some(Err(err)) => {
                self.report_error("Failed to set the expression", err);
                false
            }
            None => false,
        }
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// Strategy that [`compute_membership`](Self::compute_membership) would use.
    pub fn strategy(&self) -> Option<Strategy> {
        let policy = self.ctx.settings().conflict_policy;
        self.with_api(|api| select_strategy(&api.rule_state(), policy))
    }

    /// Current members in pre-order. Empty when unbound, stale, or when the
    /// stored expression does not compile.
    pub fn compute_membership(&self) -> Vec<ScenePath> {
        let policy = self.ctx.settings().conflict_policy;
        self.with_api(|api| {
            let strategy = select_strategy(&api.rule_state(), policy);
            match api.compute_membership_query(policy) {
                Ok(query) => {
                    resolve_membership(strategy, &query, api.stage(), self.ctx.evaluator())
                }
                Err(err) => {
                    warn!(collection = %api.name(), error = %err, "stored expression does not compile");
                    Vec::new()
                }
            }
        })
        .unwrap_or_default()
    }

    /// Report the member list, then the conflict warning if any, at INFO.
    pub fn print_collection(&self) {
        let Some(binding) = self.binding() else {
            return;
        };
        if !self.is_valid() {
            return;
        }
        let members = self.compute_membership();
        self.ctx.report(
            &format!(
                "{} prims included in collection {} on {}:",
                members.len(),
                binding.name,
                binding.prim.path()
            ),
            MessageType::Info,
        );

        if !members.is_empty() {
            let limit = self
                .ctx
                .settings()
                .print_member_limit
                .unwrap_or(members.len());
            let mut lines: Vec<String> = members
                .iter()
                .take(limit)
                .map(|p| p.to_string())
                .collect();
            if members.len() > limit {
                lines.push(format!("... and {} more", members.len() - limit));
            }
            self.ctx.report(&lines.join("\n"), MessageType::Info);
        }

        if self.has_data_conflict() {
            self.ctx.report(
                self.ctx.settings().conflict_policy.conflict_message(),
                MessageType::Info,
            );
        }
    }

    // ========================================================================
    // Signals
    // ========================================================================

    /// Fires after rebinding and whenever a property of the bound prim changes.
    pub fn connect_data_changed<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.data_changed.subscribe(move |_| {
            callback();
            Listen::Keep
        })
    }

    pub fn data_changed(&self) -> &Signal {
        &self.data_changed
    }
}

impl Drop for CollectionData {
    fn drop(&mut self) {
        self.untrack();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryReporter, Settings};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn p(s: &str) -> ScenePath {
        ScenePath::parse(s).unwrap()
    }

    fn setup() -> (Arc<Stage>, Arc<MemoryReporter>, CollectionData) {
        let stage = Stage::new();
        let prim = stage.define_prim(&p("/World")).unwrap();
        stage.define_prim(&p("/World/A")).unwrap();
        stage.define_prim(&p("/World/B")).unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let ctx = CollectionContext::new(Settings::default(), reporter.clone());
        let data = CollectionData::new(ctx, &prim, "lights");
        (stage, reporter, data)
    }

    #[test]
    fn test_classify_changes() {
        let mut notice = ObjectsChanged::new();
        notice.add_changed_info(p("/World.collection:lights:includes"));
        notice.add_resynced(p("/World/A.collection:lights:excludes"));
        notice.add_resynced(p("/World.includes"));
        let changes = classify_changes(&notice, &p("/World"));
        assert_eq!(
            changes,
            ChangeSet {
                any: true,
                includes: true,
                excludes: false
            }
        );
        assert_eq!(classify_changes(&notice, &p("/Other")), ChangeSet::default());
    }

    #[test]
    fn test_signal_fires_once_per_notice() {
        let (_stage, _reporter, data) = setup();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let _sub = data.connect_data_changed(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert!(data.set_include_all(true));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_set_include_all_noop() {
        let (_stage, _reporter, data) = setup();
        assert!(!data.set_include_all(false));
        assert!(data.set_include_all(true));
        assert!(!data.set_include_all(true));
        assert!(data.includes_all());
    }

    #[test]
    fn test_expression_disables_include_all() {
        let (_stage, reporter, data) = setup();
        data.set_include_all(true);
        assert!(data.set_membership_expression("A"));
        assert!(!data.includes_all());
        assert_eq!(data.membership_expression(), "A");
        assert!(reporter.contains(MessageType::Info, "\"Include All\" has been disabled"));
        assert_eq!(data.compute_membership(), vec![p("/World/A")]);
    }

    #[test]
    fn test_invalid_expression_is_reported() {
        let (_stage, reporter, data) = setup();
        assert!(data.set_membership_expression("/World/A"));
        assert!(!data.set_membership_expression("/World/A &"));
        assert_eq!(data.membership_expression(), "/World/A");
        assert!(reporter.contains(
            MessageType::Error,
            "Failed to update the collection lights with the expression: /World/A &"
        ));
    }

    #[test]
    fn test_clear_expression() {
        let (_stage, _reporter, data) = setup();
        assert!(!data.set_membership_expression(""));
        data.set_membership_expression("//");
        assert!(data.set_membership_expression(""));
        assert_eq!(data.membership_expression(), "");
        assert_eq!(data.strategy(), Some(Strategy::RuleBased));
    }

    #[test]
    fn test_unbound_defaults() {
        let data = CollectionData::unbound(CollectionContext::default());
        assert!(!data.is_valid());
        assert!(data.compute_membership().is_empty());
        assert!(!data.set_include_all(true));
        assert!(!data.set_membership_expression("//"));
        assert!(!data.has_data_conflict());
        assert_eq!(data.named_collection_path(), None);
    }

    #[test]
    fn test_print_collection_limit() {
        let stage = Stage::new();
        let prim = stage.define_prim(&p("/World")).unwrap();
        for name in ["A", "B", "C"] {
            stage.define_prim(&p(&format!("/World/{}", name))).unwrap();
        }
        let reporter = Arc::new(MemoryReporter::new());
        let settings = Settings {
            print_member_limit: Some(2),
            ..Default::default()
        };
        let data = CollectionData::new(
            CollectionContext::new(settings, reporter.clone()),
            &prim,
            "c",
        );
        data.include_data().set_strings(&["/World"]);
        data.print_collection();
        let messages = reporter.take();
        assert_eq!(messages[0].1, "4 prims included in collection c on /World:");
        assert_eq!(messages[1].1, "/World\n/World/A\n... and 2 more");
        assert_eq!(messages.len(), 2);
    }
}
