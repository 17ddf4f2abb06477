//! Step context persistence boundary.
//!
//! The engine never touches step variables directly; it hands the live
//! instance to a [`ContextStore`] at every transition boundary, so steps can
//! be recreated fresh on each visit without losing data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::step::{StepContext, StepType, WizardStep};

/// Key/value persistence for step-scoped variables, keyed by step type.
///
/// `persist_step_context` is called whenever the wizard leaves a step (in
/// either direction) and `load_step_context` whenever a step is instantiated
/// fresh. The very first entry into a flow finds nothing to restore.
pub trait ContextStore {
    /// Save the step's declared variables under its step type.
    fn persist_step_context(&mut self, step: &dyn WizardStep);

    /// Restore previously saved variables into the step, if any.
    fn load_step_context(&self, step: &mut dyn WizardStep);

    /// Hand out the whole context table for session persistence.
    fn export(&self) -> BTreeMap<StepType, StepContext>;

    /// Replace the whole context table from a persisted session.
    fn import(&mut self, contexts: BTreeMap<StepType, StepContext>);
}

/// In-memory context store.
///
/// Serializable, so hosts that do not bring their own storage can persist it
/// wholesale through the snapshot layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryContextStore {
    contexts: BTreeMap<StepType, StepContext>,
}

impl MemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context_for(&self, step_type: &StepType) -> Option<&StepContext> {
        self.contexts.get(step_type)
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }
}

impl ContextStore for MemoryContextStore {
    fn persist_step_context(&mut self, step: &dyn WizardStep) {
        let context = step.save_context();
        tracing::debug!(
            step = %step.step_type(),
            variables = context.len(),
            "persisting step context"
        );
        self.contexts.insert(step.step_type().clone(), context);
    }

    fn load_step_context(&self, step: &mut dyn WizardStep) {
        if let Some(context) = self.contexts.get(step.step_type()) {
            step.restore_context(context);
        }
    }

    fn export(&self) -> BTreeMap<StepType, StepContext> {
        self.contexts.clone()
    }

    fn import(&mut self, contexts: BTreeMap<StepType, StepContext>) {
        self.contexts = contexts;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepExit;

    struct ProbeStep {
        step_type: StepType,
        value: Option<String>,
    }

    impl ProbeStep {
        fn new(name: &str) -> Self {
            Self {
                step_type: StepType::new(name),
                value: None,
            }
        }
    }

    impl WizardStep for ProbeStep {
        fn step_type(&self) -> &StepType {
            &self.step_type
        }

        fn on_exit(&mut self, _exit: StepExit) {}

        fn save_context(&self) -> StepContext {
            let mut context = StepContext::new();
            if let Some(value) = &self.value {
                context.set("value", value).unwrap();
            }
            context
        }

        fn restore_context(&mut self, context: &StepContext) {
            self.value = context.get("value");
        }
    }

    #[test]
    fn test_persist_then_load_round_trip() {
        let mut store = MemoryContextStore::new();

        let mut step = ProbeStep::new("account");
        step.value = Some("ada@example.com".to_string());
        store.persist_step_context(&step);

        let mut fresh = ProbeStep::new("account");
        store.load_step_context(&mut fresh);
        assert_eq!(fresh.value, Some("ada@example.com".to_string()));
    }

    #[test]
    fn test_load_with_nothing_saved_is_a_no_op() {
        let store = MemoryContextStore::new();
        let mut step = ProbeStep::new("account");
        store.load_step_context(&mut step);
        assert_eq!(step.value, None);
    }

    #[test]
    fn test_export_import() {
        let mut store = MemoryContextStore::new();
        let mut step = ProbeStep::new("profile");
        step.value = Some("editor".to_string());
        store.persist_step_context(&step);

        let mut other = MemoryContextStore::new();
        other.import(store.export());
        let mut fresh = ProbeStep::new("profile");
        other.load_step_context(&mut fresh);
        assert_eq!(fresh.value, Some("editor".to_string()));
    }

    #[test]
    fn test_store_serialization() {
        let mut store = MemoryContextStore::new();
        let mut step = ProbeStep::new("confirm");
        step.value = Some("done".to_string());
        store.persist_step_context(&step);

        let json = serde_json::to_string(&store).unwrap();
        let deserialized: MemoryContextStore = serde_json::from_str(&json).unwrap();
        assert_eq!(store, deserialized);
    }
}
