//! Interfaces implemented by the surrounding application.

use crate::step::{StepType, WizardStep};

/// Lifecycle notifications emitted by the wizard engine.
///
/// All methods default to no-ops so hosts only implement what they listen
/// to.
pub trait WizardCallbacks {
    /// The wizard finished: `go_next` passed the gate on the final step.
    /// Fired exactly once per session.
    fn on_wizard_complete(&mut self) {}

    /// The position or a completion flag changed; refresh navigation
    /// controls.
    fn on_step_changed(&mut self) {}

    /// The visible step instance changed, carrying the type that was left,
    /// for step-agnostic cleanup (e.g. dismissing an input method).
    fn on_step_switched(&mut self, previous: &StepType) {
        let _ = previous;
    }
}

/// Callbacks for hosts that do not listen to lifecycle events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCallbacks;

impl WizardCallbacks for NullCallbacks {}

/// Rendering and back-navigation collaborator.
///
/// The driver is authoritative over whether a requested pop actually
/// happened; it reports the resulting depth back through
/// `WizardEngine::sync_back_stack`.
pub trait TransitionDriver {
    /// Show a step, optionally pushing an entry onto the back-navigation
    /// stack.
    fn present(&mut self, step: &dyn WizardStep, push_back_entry: bool);

    /// Ask for one back-navigation entry to be popped. The move completes
    /// only once the new depth is reported back to the engine.
    fn request_pop(&mut self);
}

/// Driver for headless hosts without a transition layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessDriver;

impl TransitionDriver for HeadlessDriver {
    fn present(&mut self, step: &dyn WizardStep, push_back_entry: bool) {
        tracing::debug!(step = %step.step_type(), push_back_entry, "presenting step");
    }

    fn request_pop(&mut self) {
        tracing::debug!("back-navigation pop requested");
    }
}
