//! Headless demo host for the stepflow engine.
//!
//! Stands in for a real UI host: drives a three-step account-setup flow
//! through the full protocol — gating, two-phase back navigation, snapshot
//! and resume — printing what a host would render.

use std::cell::Cell;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{Context, Result};

use stepflow::{
    MemoryContextStore, Navigation, SnapshotFile, StepContext, StepExit, StepFactories,
    StepType, TransitionDriver, WizardCallbacks, WizardEngine, WizardStep,
};

/// Shared form model standing in for UI input widgets.
type FormData = Rc<RefCell<BTreeMap<String, String>>>;

struct FormStep {
    step_type: StepType,
    form: FormData,
}

impl WizardStep for FormStep {
    fn step_type(&self) -> &StepType {
        &self.step_type
    }

    fn on_exit(&mut self, exit: StepExit) {
        tracing::debug!(step = %self.step_type, ?exit, "leaving step");
    }

    fn save_context(&self) -> StepContext {
        let mut context = StepContext::new();
        if let Some(value) = self.form.borrow().get(self.step_type.as_str()) {
            let _ = context.set("value", value);
        }
        context
    }

    fn restore_context(&mut self, context: &StepContext) {
        if let Some(value) = context.get::<String>("value") {
            tracing::info!(step = %self.step_type, value = %value, "restored step context");
            self.form
                .borrow_mut()
                .insert(self.step_type.as_str().to_string(), value);
        }
    }
}

struct ConsoleCallbacks;

impl WizardCallbacks for ConsoleCallbacks {
    fn on_wizard_complete(&mut self) {
        println!("✓ Wizard complete");
    }

    fn on_step_changed(&mut self) {
        println!("  [refresh controls]");
    }

    fn on_step_switched(&mut self, previous: &StepType) {
        println!("  [left step: {previous}]");
    }
}

/// Console transition layer: its back stack is just a depth counter.
struct ConsoleDriver {
    depth: Rc<Cell<usize>>,
}

impl TransitionDriver for ConsoleDriver {
    fn present(&mut self, step: &dyn WizardStep, push_back_entry: bool) {
        if push_back_entry {
            self.depth.set(self.depth.get() + 1);
        }
        println!("  showing step: {}", step.step_type());
    }

    fn request_pop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

fn initialize_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn build_wizard(form: &FormData, depth: &Rc<Cell<usize>>) -> WizardEngine {
    let mut factories = StepFactories::new();
    for name in ["account", "profile", "confirm"] {
        let form = Rc::clone(form);
        factories.register(name, move |_handle| {
            Ok(Box::new(FormStep {
                step_type: StepType::new(name),
                form: Rc::clone(&form),
            }) as Box<dyn WizardStep>)
        });
    }

    let mut wizard = WizardEngine::new(
        factories,
        Box::new(MemoryContextStore::new()),
        Box::new(ConsoleCallbacks),
        Box::new(ConsoleDriver {
            depth: Rc::clone(depth),
        }),
    );
    wizard.add_step("account", true);
    wizard.add_step("profile", false);
    wizard.add_step("confirm", true);
    wizard
}

fn main() -> Result<()> {
    initialize_tracing();

    println!("stepflow demo - account setup wizard\n");

    let form: FormData = Rc::default();
    let depth = Rc::new(Cell::new(0usize));

    let mut wizard = build_wizard(&form, &depth);
    wizard.start().context("failed to start the wizard")?;

    // The account step is required: forward navigation is gated.
    if let Navigation::Blocked { reason } = wizard.go_next()? {
        println!("  blocked: {reason}");
    }

    form.borrow_mut()
        .insert("account".to_string(), "ada@example.com".to_string());
    wizard.on_step_completed(true)?;
    wizard.go_next()?;

    // The profile step is optional; leave a draft and move on.
    form.borrow_mut()
        .insert("profile".to_string(), "Ada L.".to_string());
    wizard.go_next()?;

    // Change of mind: two-phase back navigation. The driver pops and the
    // host confirms the new depth.
    if wizard.go_back()? == Navigation::PopRequested {
        wizard.sync_back_stack(depth.get())?;
    }
    println!(
        "  back on: {}\n",
        wizard
            .current_step_type()
            .map(StepType::as_str)
            .unwrap_or("?")
    );

    // Snapshot mid-flight and resume in a fresh engine, the way a host
    // would across a process restart.
    let file = SnapshotFile::new(std::env::temp_dir().join("stepflow-demo").join("wizard.json"));
    file.save(&wizard.snapshot())
        .context("failed to save the wizard snapshot")?;
    println!("  snapshot saved to {}\n", file.path().display());

    let mut resumed = build_wizard(&form, &depth);
    if let Some(snapshot) = file.load()? {
        resumed.restore(snapshot)?;
    }

    // Finish the flow in the resumed session.
    resumed.go_next()?;
    resumed.on_step_completed(true)?;
    if resumed.go_next()? == Navigation::Finished {
        file.delete()?;
    }

    Ok(())
}
