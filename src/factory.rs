//! Step construction and the completion capability handed to steps.
//!
//! Step types are wired to constructor functions up front; the engine asks
//! this registry for a fresh instance on every transition into a position.
//! Each instance receives a [`StepHandle`] at construction time — the only
//! channel a step has back to its owning engine.

use std::collections::HashMap;

use crossbeam_channel::Sender;

use crate::error::FlowError;
use crate::step::{StepType, WizardStep};

/// Constructor outcome for a single step instance.
pub type ConstructionResult =
    Result<Box<dyn WizardStep>, Box<dyn std::error::Error + Send + Sync>>;

/// Factory function producing a fresh step instance.
pub type StepConstructor = Box<dyn Fn(StepHandle) -> ConstructionResult>;

/// Narrow capability handed to a step at construction time.
///
/// Exposes completion notification and nothing else; the step never sees the
/// engine itself. Signals are queued and applied when the engine pumps them.
#[derive(Clone)]
pub struct StepHandle {
    sender: Sender<bool>,
}

impl StepHandle {
    pub(crate) fn new(sender: Sender<bool>) -> Self {
        Self { sender }
    }

    /// Notify the wizard that this step's completion state changed.
    pub fn notify_completed(&self, completed: bool) {
        // If send fails the engine is gone - nothing left to notify.
        let _ = self.sender.try_send(completed);
    }
}

/// Registry of step constructors keyed by step type.
#[derive(Default)]
pub struct StepFactories {
    constructors: HashMap<StepType, StepConstructor>,
}

impl StepFactories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for a step type, replacing any previous one.
    pub fn register<F>(&mut self, step_type: impl Into<StepType>, constructor: F)
    where
        F: Fn(StepHandle) -> ConstructionResult + 'static,
    {
        self.constructors
            .insert(step_type.into(), Box::new(constructor));
    }

    pub fn is_registered(&self, step_type: &StepType) -> bool {
        self.constructors.contains_key(step_type)
    }

    /// Construct a fresh instance of a step type.
    ///
    /// An unregistered type or a failing constructor is fatal to the
    /// session: step types are programming-time configuration, not user
    /// input, so there is no retry path.
    pub fn construct(
        &self,
        step_type: &StepType,
        handle: StepHandle,
    ) -> Result<Box<dyn WizardStep>, FlowError> {
        let constructor =
            self.constructors
                .get(step_type)
                .ok_or_else(|| FlowError::UnknownStepType {
                    step_type: step_type.clone(),
                })?;
        constructor(handle).map_err(|source| FlowError::StepConstruction {
            step_type: step_type.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    struct NullStep {
        step_type: StepType,
    }

    impl WizardStep for NullStep {
        fn step_type(&self) -> &StepType {
            &self.step_type
        }
    }

    fn handle() -> (StepHandle, crossbeam_channel::Receiver<bool>) {
        let (tx, rx) = unbounded();
        (StepHandle::new(tx), rx)
    }

    #[test]
    fn test_register_and_construct() {
        let mut factories = StepFactories::new();
        factories.register("account", |_handle| {
            Ok(Box::new(NullStep {
                step_type: StepType::new("account"),
            }) as Box<dyn WizardStep>)
        });

        assert!(factories.is_registered(&StepType::new("account")));

        let (handle, _rx) = handle();
        let step = factories.construct(&StepType::new("account"), handle).unwrap();
        assert_eq!(step.step_type().as_str(), "account");
    }

    #[test]
    fn test_unknown_step_type() {
        let factories = StepFactories::new();
        let (handle, _rx) = handle();
        let result = factories.construct(&StepType::new("ghost"), handle);
        assert!(matches!(result, Err(FlowError::UnknownStepType { .. })));
    }

    #[test]
    fn test_construction_failure_is_surfaced() {
        let mut factories = StepFactories::new();
        factories.register("broken", |_handle| Err("missing dependency".into()));

        let (handle, _rx) = handle();
        let result = factories.construct(&StepType::new("broken"), handle);
        assert!(matches!(result, Err(FlowError::StepConstruction { .. })));
    }

    #[test]
    fn test_step_handle_queues_signals() {
        let (handle, rx) = handle();
        handle.notify_completed(true);
        handle.notify_completed(false);

        assert_eq!(rx.try_recv(), Ok(true));
        assert_eq!(rx.try_recv(), Ok(false));
        assert!(rx.try_recv().is_err());
    }
}
