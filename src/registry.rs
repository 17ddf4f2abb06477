//! Ordered flow table: step descriptors plus completion flags.

use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::step::{StepDescriptor, StepType};

/// One persisted row of the flow table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_type: StepType,
    pub required: bool,
    pub completed: bool,
}

/// Ordered collection of step descriptors with a parallel completion table.
///
/// Insertion order is navigation order. Every position carries exactly one
/// completion flag, initialized to `false` when the step is added.
#[derive(Debug, Clone, Default)]
pub struct FlowRegistry {
    steps: Vec<StepDescriptor>,
    completed: Vec<bool>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step unless one with the same type is already present.
    /// Returns whether the step was actually inserted.
    pub fn add_step(&mut self, step_type: impl Into<StepType>, required: bool) -> bool {
        let descriptor = StepDescriptor::new(step_type, required);
        if self.steps.contains(&descriptor) {
            return false;
        }
        self.steps.push(descriptor);
        self.completed.push(false);
        debug_assert_eq!(self.steps.len(), self.completed.len());
        true
    }

    pub fn steps_count(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn descriptor(&self, position: usize) -> Result<&StepDescriptor, FlowError> {
        self.steps
            .get(position)
            .ok_or(FlowError::OutOfRange {
                position,
                count: self.steps.len(),
            })
    }

    pub fn is_required(&self, position: usize) -> Result<bool, FlowError> {
        self.descriptor(position).map(StepDescriptor::is_required)
    }

    pub fn is_completed(&self, position: usize) -> Result<bool, FlowError> {
        self.completed
            .get(position)
            .copied()
            .ok_or(FlowError::OutOfRange {
                position,
                count: self.completed.len(),
            })
    }

    pub fn set_completed(&mut self, position: usize, value: bool) -> Result<(), FlowError> {
        let count = self.completed.len();
        match self.completed.get_mut(position) {
            Some(flag) => {
                *flag = value;
                Ok(())
            }
            None => Err(FlowError::OutOfRange { position, count }),
        }
    }

    pub fn contains(&self, step_type: &StepType) -> bool {
        self.position_of(step_type).is_some()
    }

    /// Position of the last occurrence of a step type.
    pub fn position_of(&self, step_type: &StepType) -> Option<usize> {
        self.steps
            .iter()
            .rposition(|descriptor| descriptor.step_type() == step_type)
    }

    /// Remove every step strictly after the last occurrence of `step_type`,
    /// discarding the removed completion flags. Returns the number removed.
    ///
    /// If `step_type` is absent the registry is left untouched and
    /// `StepNotFound` is reported.
    pub fn retract_to(&mut self, step_type: &StepType) -> Result<usize, FlowError> {
        let keep = self
            .position_of(step_type)
            .ok_or_else(|| FlowError::StepNotFound {
                step_type: step_type.clone(),
            })?
            + 1;
        let removed = self.steps.len() - keep;
        self.steps.truncate(keep);
        self.completed.truncate(keep);
        Ok(removed)
    }

    /// Drain all descriptors and flags.
    pub fn reset(&mut self) {
        self.steps.clear();
        self.completed.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepDescriptor> {
        self.steps.iter()
    }

    /// Lossless, order-preserving conversion to the persisted row format.
    pub fn to_records(&self) -> Vec<StepRecord> {
        self.steps
            .iter()
            .zip(self.completed.iter())
            .map(|(descriptor, &completed)| StepRecord {
                step_type: descriptor.step_type().clone(),
                required: descriptor.is_required(),
                completed,
            })
            .collect()
    }

    /// Rebuild a registry from persisted rows, preserving order and flags.
    /// Duplicate rows collapse the same way `add_step` does.
    pub fn from_records(records: Vec<StepRecord>) -> Self {
        let mut registry = Self::new();
        for record in records {
            if registry.add_step(record.step_type, record.required) {
                let position = registry.steps_count() - 1;
                registry.completed[position] = record.completed;
            }
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_step_flow() -> FlowRegistry {
        let mut registry = FlowRegistry::new();
        registry.add_step("account", true);
        registry.add_step("profile", false);
        registry.add_step("confirm", true);
        registry
    }

    #[test]
    fn test_add_step_is_idempotent() {
        let mut registry = FlowRegistry::new();
        assert!(registry.add_step("account", true));
        assert!(registry.add_step("profile", false));
        assert!(!registry.add_step("account", true));
        // Same type with a different required flag is still the same step.
        assert!(!registry.add_step("account", false));

        assert_eq!(registry.steps_count(), 2);
        assert!(registry.is_required(0).unwrap());
    }

    #[test]
    fn test_new_steps_start_incomplete() {
        let registry = three_step_flow();
        for position in 0..registry.steps_count() {
            assert!(!registry.is_completed(position).unwrap());
        }
    }

    #[test]
    fn test_positional_access_out_of_range() {
        let mut registry = three_step_flow();

        assert!(matches!(
            registry.is_required(3),
            Err(FlowError::OutOfRange { position: 3, count: 3 })
        ));
        assert!(matches!(
            registry.is_completed(7),
            Err(FlowError::OutOfRange { .. })
        ));
        assert!(matches!(
            registry.set_completed(3, true),
            Err(FlowError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_set_completed() {
        let mut registry = three_step_flow();
        registry.set_completed(0, true).unwrap();
        assert!(registry.is_completed(0).unwrap());
        registry.set_completed(0, false).unwrap();
        assert!(!registry.is_completed(0).unwrap());
    }

    #[test]
    fn test_retract_to_removes_downstream_only() {
        let mut registry = three_step_flow();
        registry.set_completed(0, true).unwrap();

        let removed = registry.retract_to(&StepType::new("account")).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(registry.steps_count(), 1);
        assert_eq!(registry.descriptor(0).unwrap().step_type().as_str(), "account");
        // The kept step's flag is untouched.
        assert!(registry.is_completed(0).unwrap());
    }

    #[test]
    fn test_retract_to_last_step_removes_nothing() {
        let mut registry = three_step_flow();
        let removed = registry.retract_to(&StepType::new("confirm")).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(registry.steps_count(), 3);
    }

    #[test]
    fn test_retract_to_absent_type_reports_not_found() {
        let mut registry = three_step_flow();
        let result = registry.retract_to(&StepType::new("billing"));
        assert!(matches!(result, Err(FlowError::StepNotFound { .. })));
        // Registry untouched.
        assert_eq!(registry.steps_count(), 3);
    }

    #[test]
    fn test_records_round_trip() {
        let mut registry = three_step_flow();
        registry.set_completed(1, true).unwrap();

        let records = registry.to_records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].step_type.as_str(), "profile");
        assert!(!records[1].required);
        assert!(records[1].completed);

        let restored = FlowRegistry::from_records(records.clone());
        assert_eq!(restored.to_records(), records);
    }

    #[test]
    fn test_reset() {
        let mut registry = three_step_flow();
        registry.reset();
        assert!(registry.is_empty());
        assert_eq!(registry.steps_count(), 0);
    }
}
