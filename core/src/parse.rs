//! Column extraction from `_embedded.items` collections.
//!
//! Every extracted value also goes through the `RequestValidator`, reusing
//! the write-side rules as a type guard on read data: lead ids are checked
//! against `task/add/element_id` (the rule they must satisfy to be used as a
//! task's `element_id`), names against `leads/name`, task texts against
//! `tasks/text`. The parsers never modify their input.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{CrmError, ParseError};
use crate::types::Lead;
use crate::validate::RequestValidator;

pub const LEAD_ID_RULE: &str = "task/add/element_id";
pub const LEAD_NAME_RULE: &str = "leads/name";
pub const TASK_TEXT_RULE: &str = "tasks/text";

fn column<'v>(
    validator: &RequestValidator<'_>,
    records: &'v [Value],
    field: &'static str,
    rule: &str,
) -> Result<Vec<&'v Value>, CrmError> {
    if records.is_empty() {
        return Err(ParseError::EmptyCollection.into());
    }
    records
        .iter()
        .enumerate()
        .map(|(index, record)| -> Result<&'v Value, CrmError> {
            let value = record
                .get(field)
                .ok_or(ParseError::MissingField { index, field })?;
            validator.validate(rule, value)?;
            Ok(value)
        })
        .collect()
}

fn strings(values: Vec<&Value>, field: &'static str) -> Result<Vec<String>, CrmError> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, v)| -> Result<String, CrmError> {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| ParseError::InvalidValue { index, field }.into())
        })
        .collect()
}

pub fn lead_ids(validator: &RequestValidator<'_>, leads: &[Value]) -> Result<Vec<i64>, CrmError> {
    column(validator, leads, "id", LEAD_ID_RULE)?
        .into_iter()
        .enumerate()
        .map(|(index, v)| -> Result<i64, CrmError> {
            v.as_i64()
                .ok_or_else(|| ParseError::InvalidValue { index, field: "id" }.into())
        })
        .collect()
}

pub fn lead_names(validator: &RequestValidator<'_>, leads: &[Value]) -> Result<Vec<String>, CrmError> {
    strings(column(validator, leads, "name", LEAD_NAME_RULE)?, "name")
}

pub fn task_texts(validator: &RequestValidator<'_>, tasks: &[Value]) -> Result<Vec<String>, CrmError> {
    strings(column(validator, tasks, "text", TASK_TEXT_RULE)?, "text")
}

/// Whole lead records; unknown fields are dropped.
pub fn leads(leads: &[Value]) -> Result<Vec<Lead>, ParseError> {
    if leads.is_empty() {
        return Err(ParseError::EmptyCollection);
    }
    leads
        .iter()
        .enumerate()
        .map(|(index, record)| {
            Lead::deserialize(record).map_err(|source| ParseError::Malformed { index, source })
        })
        .collect()
}
