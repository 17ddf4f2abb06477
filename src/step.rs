//! Step identity and the live step contract.
//!
//! A flow is an ordered sequence of step types. The identity of a step is
//! its [`StepType`] plus a required flag ([`StepDescriptor`]); the live,
//! engine-owned instance behind a position implements [`WizardStep`].

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Identifier of a step type within a flow.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepType(String);

impl StepType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StepType {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for StepType {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Exit code passed to a step's exit hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepExit {
    /// The wizard is moving to the next step.
    Next,
    /// The wizard is going back one step.
    Previous,
}

/// Immutable identity of one step in a flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDescriptor {
    step_type: StepType,
    required: bool,
}

impl StepDescriptor {
    pub fn new(step_type: impl Into<StepType>, required: bool) -> Self {
        Self {
            step_type: step_type.into(),
            required,
        }
    }

    pub fn step_type(&self) -> &StepType {
        &self.step_type
    }

    /// A required step gates forward navigation until completed.
    pub fn is_required(&self) -> bool {
        self.required
    }
}

// Two descriptors for the same step type are the same step, regardless of
// the required flag.
impl PartialEq for StepDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.step_type == other.step_type
    }
}

impl Eq for StepDescriptor {}

/// Per-step key/value state, persisted across transitions and restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepContext {
    values: BTreeMap<String, serde_json::Value>,
}

impl StepContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under `key`, replacing any previous value.
    pub fn set<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), serde_json::Error> {
        self.values.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Fetch and deserialize the value under `key`, if present and of the
    /// expected shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.values.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// A live step instance, owned exclusively by the engine.
///
/// Instances are created fresh on every forward transition into a position
/// and released after the exit hook has run and the context was persisted.
/// State that must survive re-creation belongs in the context.
pub trait WizardStep {
    /// The step type this instance was created for.
    fn step_type(&self) -> &StepType;

    /// Called before the wizard leaves this step, with the direction of
    /// travel. Handle input and finalize state here.
    fn on_exit(&mut self, exit: StepExit) {
        let _ = exit;
    }

    /// Snapshot the step's context variables for persistence.
    fn save_context(&self) -> StepContext {
        StepContext::default()
    }

    /// Restore previously persisted context variables.
    fn restore_context(&mut self, context: &StepContext) {
        let _ = context;
    }
}
