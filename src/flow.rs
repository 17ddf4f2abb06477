//! The wizard engine: navigation state machine and transition protocol.
//!
//! The engine owns the current position and the live step instance, gates
//! forward movement on step completion, and keeps its position synchronized
//! with an external back-navigation mechanism that it does not control.
//! Backward navigation is a two-phase protocol: `go_back` requests a pop
//! from the transition driver, and the move completes only when the driver
//! confirms the new depth through `sync_back_stack`.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::context::ContextStore;
use crate::error::FlowError;
use crate::factory::{StepFactories, StepHandle};
use crate::host::{TransitionDriver, WizardCallbacks};
use crate::persistence::WizardSnapshot;
use crate::registry::FlowRegistry;
use crate::step::{StepExit, StepType, WizardStep};

/// Outcome of a navigation operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    /// Navigation succeeded; the wizard is on a new step.
    Moved,

    /// A back-navigation pop was requested; the move completes when the
    /// driver confirms the new depth through `sync_back_stack`.
    PopRequested,

    /// Navigation was not performed.
    Blocked { reason: String },

    /// The wizard reached (or already was in) its terminal state.
    Finished,
}

/// The navigation state machine driving one wizard session.
///
/// Single-threaded and host-driven: every operation completes synchronously
/// before control returns. One engine instance drives one user at a time.
pub struct WizardEngine {
    registry: FlowRegistry,
    factories: StepFactories,
    store: Box<dyn ContextStore>,
    callbacks: Box<dyn WizardCallbacks>,
    driver: Box<dyn TransitionDriver>,

    /// Active position; `None` until the first transition.
    position: Option<usize>,
    /// Live step instance behind `position`, exclusively owned.
    current: Option<Box<dyn WizardStep>>,
    /// Instances surviving in the external back stack, oldest first.
    parked: Vec<Box<dyn WizardStep>>,
    /// Mirror of the external back-navigation depth, used only for resync.
    back_depth: usize,
    /// A requested pop has not been confirmed yet.
    pop_pending: bool,
    finished: bool,

    signal_tx: Sender<bool>,
    signal_rx: Receiver<bool>,
}

impl WizardEngine {
    pub fn new(
        factories: StepFactories,
        store: Box<dyn ContextStore>,
        callbacks: Box<dyn WizardCallbacks>,
        driver: Box<dyn TransitionDriver>,
    ) -> Self {
        let (signal_tx, signal_rx) = unbounded();
        Self {
            registry: FlowRegistry::new(),
            factories,
            store,
            callbacks,
            driver,
            position: None,
            current: None,
            parked: Vec::new(),
            back_depth: 0,
            pop_pending: false,
            finished: false,
            signal_tx,
            signal_rx,
        }
    }

    /// Append a step to the flow. Adding an already-present type is a no-op.
    pub fn add_step(&mut self, step_type: impl Into<StepType>, required: bool) -> bool {
        self.registry.add_step(step_type, required)
    }

    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    pub fn steps_count(&self) -> usize {
        self.registry.steps_count()
    }

    pub fn current_position(&self) -> Option<usize> {
        self.position
    }

    pub fn current_step(&self) -> Option<&dyn WizardStep> {
        self.current.as_deref()
    }

    /// Mutable access to the live step, for hosts binding input to it.
    pub fn current_step_mut(&mut self) -> Option<&mut (dyn WizardStep + 'static)> {
        self.current.as_deref_mut()
    }

    pub fn current_step_type(&self) -> Option<&StepType> {
        self.current.as_deref().map(|step| step.step_type())
    }

    pub fn is_first_step(&self) -> bool {
        self.position == Some(0)
    }

    pub fn is_last_step(&self) -> bool {
        match self.position {
            Some(position) => position + 1 == self.registry.steps_count(),
            None => false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Expected depth of the external back-navigation stack.
    pub fn back_stack_depth(&self) -> usize {
        self.back_depth
    }

    /// Whether the gate out of the current step is open: optional steps
    /// never block, required steps block until marked complete.
    pub fn can_advance(&self) -> bool {
        match self.position {
            Some(position) => self.gate_open(position),
            None => false,
        }
    }

    pub fn can_go_back(&self) -> bool {
        matches!(self.position, Some(position) if position > 0)
            && !self.finished
            && !self.pop_pending
    }

    fn gate_open(&self, position: usize) -> bool {
        // The position is engine-maintained and always in range.
        let required = self.registry.is_required(position).unwrap_or(false);
        let completed = self.registry.is_completed(position).unwrap_or(false);
        !required || completed
    }

    fn construct_step(&self, step_type: &StepType) -> Result<Box<dyn WizardStep>, FlowError> {
        self.factories
            .construct(step_type, StepHandle::new(self.signal_tx.clone()))
    }

    /// Enter the first step of the flow.
    pub fn start(&mut self) -> Result<Navigation, FlowError> {
        if self.position.is_some() || self.finished {
            return Ok(Navigation::Blocked {
                reason: "wizard already started".to_string(),
            });
        }
        if self.registry.is_empty() {
            return Ok(Navigation::Blocked {
                reason: "flow has no steps".to_string(),
            });
        }

        let step_type = self.registry.descriptor(0)?.step_type().clone();
        let mut step = self.construct_step(&step_type)?;
        self.store.load_step_context(&mut *step);
        self.driver.present(&*step, false);

        self.position = Some(0);
        self.current = Some(step);
        tracing::debug!(step = %step_type, "wizard started");
        self.callbacks.on_step_changed();
        Ok(Navigation::Moved)
    }

    /// Advance to the next step, subject to the gating rule.
    ///
    /// Leaving the final step transitions the wizard to its terminal state
    /// instead; the position does not move past the last step.
    pub fn go_next(&mut self) -> Result<Navigation, FlowError> {
        self.drain_signals();

        if self.finished {
            return Ok(Navigation::Finished);
        }
        let Some(position) = self.position else {
            return Ok(Navigation::Blocked {
                reason: "wizard not started".to_string(),
            });
        };
        if self.pop_pending {
            return Ok(Navigation::Blocked {
                reason: "back-navigation resync outstanding".to_string(),
            });
        }
        if !self.gate_open(position) {
            let step_type = self.registry.descriptor(position)?.step_type().clone();
            return Ok(Navigation::Blocked {
                reason: format!("required step {step_type} is not completed"),
            });
        }

        // Leaving a step forward marks it completed.
        self.registry.set_completed(position, true)?;

        let Some(mut departing) = self.current.take() else {
            return Ok(Navigation::Blocked {
                reason: "wizard not started".to_string(),
            });
        };
        departing.on_exit(StepExit::Next);
        self.store.persist_step_context(&*departing);
        let previous_type = departing.step_type().clone();

        if position + 1 == self.registry.steps_count() {
            // Terminal state; keep showing the final step.
            self.current = Some(departing);
            self.finished = true;
            tracing::debug!(step = %previous_type, "wizard complete");
            self.callbacks.on_wizard_complete();
            return Ok(Navigation::Finished);
        }

        let next_type = self.registry.descriptor(position + 1)?.step_type().clone();
        let mut step = match self.construct_step(&next_type) {
            Ok(step) => step,
            Err(error) => {
                // Fatal: the session cannot continue without its next step.
                self.position = None;
                return Err(error);
            }
        };
        self.store.load_step_context(&mut *step);

        // The departing instance survives in the external back stack until
        // a pop adopts it again.
        self.parked.push(departing);
        self.back_depth += 1;
        self.driver.present(&*step, true);

        self.position = Some(position + 1);
        self.current = Some(step);
        tracing::debug!(step = %next_type, position = position + 1, "moved forward");

        self.callbacks.on_step_changed();
        self.callbacks.on_step_switched(&previous_type);
        Ok(Navigation::Moved)
    }

    /// Leave the current step backward.
    ///
    /// Runs the exit hook and persists the step's context, then asks the
    /// transition driver to pop one back entry. The position does NOT move
    /// here — the driver is authoritative over whether the pop happens, and
    /// the move completes in `sync_back_stack`.
    pub fn go_back(&mut self) -> Result<Navigation, FlowError> {
        self.drain_signals();

        if self.finished {
            return Ok(Navigation::Finished);
        }
        let Some(position) = self.position else {
            return Ok(Navigation::Blocked {
                reason: "wizard not started".to_string(),
            });
        };
        if position == 0 {
            return Ok(Navigation::Blocked {
                reason: "already at first step".to_string(),
            });
        }
        if self.pop_pending {
            return Ok(Navigation::Blocked {
                reason: "back-navigation resync outstanding".to_string(),
            });
        }

        let Some(mut departing) = self.current.take() else {
            return Ok(Navigation::Blocked {
                reason: "wizard not started".to_string(),
            });
        };
        departing.on_exit(StepExit::Previous);
        self.store.persist_step_context(&*departing);
        let previous_type = departing.step_type().clone();
        self.current = Some(departing);

        self.pop_pending = true;
        self.driver.request_pop();
        tracing::debug!(step = %previous_type, "back-navigation pop requested");
        self.callbacks.on_step_switched(&previous_type);
        Ok(Navigation::PopRequested)
    }

    /// Reconcile the engine's position with the external back stack.
    ///
    /// Invoked by the host whenever the back-navigation mechanism reports a
    /// new depth — either confirming a pop requested by `go_back`, or after
    /// the user navigated back directly through the platform mechanism.
    /// Signals that cannot apply (first step, depth not dropping) are
    /// ignored without corrupting state.
    pub fn sync_back_stack(&mut self, depth: usize) -> Result<Navigation, FlowError> {
        let Some(position) = self.position else {
            tracing::warn!(depth, "back-stack signal before the wizard started; ignoring");
            return Ok(Navigation::Blocked {
                reason: "wizard not started".to_string(),
            });
        };
        if self.finished || position == 0 || depth >= self.back_depth {
            tracing::warn!(
                depth,
                expected = self.back_depth,
                position,
                "back-stack signal cannot apply; ignoring"
            );
            return Ok(Navigation::Blocked {
                reason: "back-stack signal cannot apply".to_string(),
            });
        }
        if self.back_depth - depth > 1 {
            tracing::warn!(
                depth,
                expected = self.back_depth,
                "back stack dropped more than one level; resyncing one step"
            );
        }

        let target = position - 1;
        // Adopt whatever the external layer now shows. A parked instance is
        // still live, so its context is not reloaded; after a process
        // restart nothing is parked and the step is recreated fresh from
        // its persisted context.
        let step = match self.parked.pop() {
            Some(step) => step,
            None => {
                let step_type = self.registry.descriptor(target)?.step_type().clone();
                match self.construct_step(&step_type) {
                    Ok(mut step) => {
                        self.store.load_step_context(&mut *step);
                        step
                    }
                    Err(error) => {
                        self.position = None;
                        self.current = None;
                        return Err(error);
                    }
                }
            }
        };

        self.position = Some(target);
        self.current = Some(step);
        self.back_depth -= 1;
        self.pop_pending = false;
        tracing::debug!(position = target, depth, "resynced with back stack");
        self.callbacks.on_step_changed();
        Ok(Navigation::Moved)
    }

    /// Record the completion state of the current step.
    ///
    /// The change notification fires only when the flag actually changes.
    pub fn on_step_completed(&mut self, completed: bool) -> Result<(), FlowError> {
        let Some(position) = self.position else {
            tracing::warn!(completed, "completion signal with no active step; ignoring");
            return Ok(());
        };
        if self.registry.is_completed(position)? != completed {
            self.registry.set_completed(position, completed)?;
            self.callbacks.on_step_changed();
        }
        Ok(())
    }

    /// Apply completion signals queued by step handles.
    ///
    /// Hosts call this after dispatching input to the live step; `go_next`
    /// and `go_back` also drain before evaluating their gates.
    pub fn pump(&mut self) {
        self.drain_signals();
    }

    fn drain_signals(&mut self) {
        while let Ok(completed) = self.signal_rx.try_recv() {
            if let Err(error) = self.on_step_completed(completed) {
                tracing::warn!(%error, "dropping step completion signal");
            }
        }
    }

    /// Discard every step after the current one.
    ///
    /// Used when the current step invalidates work done past itself (e.g.
    /// the user changed an earlier answer). A no-op before the first
    /// transition.
    pub fn retract(&mut self) -> Result<usize, FlowError> {
        match self.current_step_type().cloned() {
            Some(step_type) => self.retract_to(&step_type),
            None => Ok(0),
        }
    }

    /// Discard every step after the last occurrence of `step_type`.
    ///
    /// Refuses a retraction that would remove the currently active
    /// position.
    pub fn retract_to(&mut self, step_type: &StepType) -> Result<usize, FlowError> {
        if let (Some(position), Some(keep)) =
            (self.position, self.registry.position_of(step_type))
        {
            if position > keep {
                return Err(FlowError::OutOfRange {
                    position,
                    count: keep + 1,
                });
            }
        }
        let removed = self.registry.retract_to(step_type)?;
        if removed > 0 {
            tracing::debug!(%step_type, removed, "retracted flow");
            self.callbacks.on_step_changed();
        }
        Ok(removed)
    }

    /// Capture the full session for persistence. The live step's context is
    /// persisted first so in-progress edits are not lost.
    pub fn snapshot(&mut self) -> WizardSnapshot {
        if let Some(step) = self.current.as_deref() {
            self.store.persist_step_context(step);
        }
        WizardSnapshot::new(
            self.registry.to_records(),
            self.position,
            self.finished,
            self.store.export(),
        )
    }

    /// Resume a persisted session: rebuild the flow table and re-enter the
    /// persisted position with a freshly constructed step instance.
    pub fn restore(&mut self, snapshot: WizardSnapshot) -> Result<Navigation, FlowError> {
        self.registry = FlowRegistry::from_records(snapshot.steps);
        self.store.import(snapshot.contexts);
        self.parked.clear();
        self.pop_pending = false;
        self.finished = snapshot.finished;
        self.current = None;
        self.position = None;
        self.back_depth = 0;

        let Some(position) = snapshot.position else {
            return Ok(Navigation::Blocked {
                reason: "restored wizard was not started".to_string(),
            });
        };
        if position >= self.registry.steps_count() {
            return Err(FlowError::OutOfRange {
                position,
                count: self.registry.steps_count(),
            });
        }

        let step_type = self.registry.descriptor(position)?.step_type().clone();
        let mut step = self.construct_step(&step_type)?;
        self.store.load_step_context(&mut *step);
        self.driver.present(&*step, false);

        self.position = Some(position);
        self.current = Some(step);
        // One external back entry per forward move made before the
        // snapshot.
        self.back_depth = position;
        tracing::debug!(position, step = %step_type, "restored wizard session");
        self.callbacks.on_step_changed();

        if self.finished {
            Ok(Navigation::Finished)
        } else {
            Ok(Navigation::Moved)
        }
    }

    /// Back to a fresh, not-started wizard with an empty flow.
    pub fn reset(&mut self) {
        self.registry.reset();
        self.position = None;
        self.current = None;
        self.parked.clear();
        self.back_depth = 0;
        self.pop_pending = false;
        self.finished = false;
    }
}
