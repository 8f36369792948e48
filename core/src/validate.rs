//! Checks a single parameter value against the `RuleTable`.

use serde_json::Value;
use tracing::debug;

use crate::error::ValidationError;
use crate::rules::{AllowedValues, JsonKind, RuleTable};

/// Accepts or rejects `(path, value)` pairs. Paths without a rule pass.
#[derive(Debug, Clone, Copy)]
pub struct RequestValidator<'a> {
    rules: &'a RuleTable,
}

impl<'a> RequestValidator<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        Self { rules }
    }

    pub fn validate(&self, path: &str, value: &Value) -> Result<(), ValidationError> {
        let Some(rule) = self.rules.get(path) else {
            return Ok(());
        };

        let actual = JsonKind::of(value);
        if !rule.expected_type.accepts(actual) {
            return Err(ValidationError::TypeMismatch {
                path: path.to_string(),
                expected: rule.expected_type,
                actual,
            });
        }

        if let AllowedValues::OneOf(allowed) = &rule.allowed {
            if !rule.allowed.admits(value) {
                return Err(ValidationError::ValueNotAllowed {
                    path: path.to_string(),
                    value: value.clone(),
                    allowed: allowed.clone(),
                });
            }
        }

        debug!(path, "parameter accepted");
        Ok(())
    }
}
