//! Step-sequence wizard navigation engine.
//!
//! Drives a user through an ordered, partially-optional sequence of steps:
//! forward progress is gated on step completion, backward navigation goes
//! through an external back-navigation mechanism, and per-step state is
//! persisted at every transition boundary so steps can be recreated fresh
//! on each visit without losing data.
//!
//! ## Architecture
//!
//! ```text
//! WizardEngine
//!   ├── FlowRegistry (ordered step descriptors + completion flags)
//!   ├── StepFactories (step type → constructor, StepHandle injection)
//!   ├── ContextStore (per-step key/value persistence)
//!   ├── WizardCallbacks (lifecycle notifications to the host)
//!   └── TransitionDriver (rendering + back-navigation collaborator)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stepflow::{MemoryContextStore, Navigation, StepFactories, WizardEngine};
//!
//! let mut factories = StepFactories::new();
//! factories.register("account", |handle| Ok(Box::new(AccountStep::new(handle))));
//! factories.register("confirm", |handle| Ok(Box::new(ConfirmStep::new(handle))));
//!
//! let mut wizard = WizardEngine::new(
//!     factories,
//!     Box::new(MemoryContextStore::new()),
//!     Box::new(MyCallbacks),
//!     Box::new(MyDriver),
//! );
//! wizard.add_step("account", true);
//! wizard.add_step("confirm", true);
//!
//! wizard.start()?;
//! // ... host marks the step complete, then:
//! match wizard.go_next()? {
//!     Navigation::Moved => { /* new step is showing */ }
//!     Navigation::Blocked { reason } => { /* gate closed */ }
//!     _ => {}
//! }
//! ```

pub mod context;
pub mod error;
pub mod factory;
pub mod flow;
pub mod host;
pub mod persistence;
pub mod registry;
pub mod step;

// Re-export commonly used types
pub use context::{ContextStore, MemoryContextStore};
pub use error::{FlowError, PersistenceError};
pub use factory::{ConstructionResult, StepConstructor, StepFactories, StepHandle};
pub use flow::{Navigation, WizardEngine};
pub use host::{HeadlessDriver, NullCallbacks, TransitionDriver, WizardCallbacks};
pub use persistence::{SnapshotFile, WizardSnapshot};
pub use registry::{FlowRegistry, StepRecord};
pub use step::{StepContext, StepDescriptor, StepExit, StepType, WizardStep};
