//! Explicitly passed context shared by collection editors.

use std::fmt;
use std::sync::Arc;

use super::{MessageType, Reporter, Settings, TracingReporter};
use crate::collection::{MembershipEvaluator, StageEvaluator};

/// Settings, message sink and membership evaluator used by
/// [`CollectionData`](crate::collection::CollectionData).
///
/// Cloning is cheap; clones share the reporter and evaluator.
#[derive(Clone)]
pub struct CollectionContext {
    settings: Settings,
    reporter: Arc<dyn Reporter>,
    evaluator: Arc<dyn MembershipEvaluator>,
}

impl Default for CollectionContext {
    fn default() -> Self {
        Self::new(Settings::default(), Arc::new(TracingReporter))
    }
}

impl fmt::Debug for CollectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl CollectionContext {
    /// Context using the built-in [`StageEvaluator`].
    pub fn new(settings: Settings, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            settings,
            reporter,
            evaluator: Arc::new(StageEvaluator),
        }
    }

    /// Replace the membership evaluator.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn MembershipEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }

    pub fn evaluator(&self) -> &dyn MembershipEvaluator {
        self.evaluator.as_ref()
    }

    pub fn report(&self, message: &str, kind: MessageType) {
        self.reporter.report(message, kind);
    }
}
