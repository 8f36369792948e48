//! Validated request builders for every API operation.
//!
//! # Design
//! Each operation is split into a `build_*` method here, which validates the
//! parameters and produces an `HttpRequest` without touching the network,
//! and the round trip in `CrmApiClient`. A request that fails validation is
//! never built, so it can never be sent.
//!
//! `get_lead_by_id` and `get_tasks_by_element_id` validate under the bare keys
//! `id` and `element_id`. The rule table has no entry for those keys, so they
//! accept any value; the qualified `leads/id` rule is not consulted.

use serde_json::{json, Value};

use crate::config::Endpoints;
use crate::error::{CrmError, PreconditionError};
use crate::http::HttpRequest;
use crate::rules::RuleTable;
use crate::types::{Task, REQUIRED_TASK_FIELDS};
use crate::validate::RequestValidator;

const TASK_FILTER_PARAM: &str = "filter/tasks";
const LEAD_ID_PARAM: &str = "id";
const ELEMENT_ID_PARAM: &str = "element_id";
const ADD_TASK_PREFIX: &str = "task/add/";

#[derive(Debug, Clone)]
pub struct CrmRequests {
    endpoints: Endpoints,
    rules: RuleTable,
}

impl CrmRequests {
    pub fn new(endpoints: Endpoints, rules: RuleTable) -> Self {
        Self { endpoints, rules }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn validator(&self) -> RequestValidator<'_> {
        RequestValidator::new(&self.rules)
    }

    /// `GET leads?filter[tasks]=<code>`.
    pub fn build_filter_leads_by_task_presence(&self, code: i64) -> Result<HttpRequest, CrmError> {
        self.validator().validate(TASK_FILTER_PARAM, &json!(code))?;
        Ok(HttpRequest::get(&self.endpoints.leads, format!("filter[tasks]={code}")))
    }

    /// `GET leads?id=<id>`.
    pub fn build_get_lead_by_id(&self, id: i64) -> Result<HttpRequest, CrmError> {
        self.validator().validate(LEAD_ID_PARAM, &json!(id))?;
        Ok(HttpRequest::get(&self.endpoints.leads, format!("id={id}")))
    }

    /// `GET tasks?element_id=<id>`.
    pub fn build_get_tasks_by_element_id(&self, element_id: i64) -> Result<HttpRequest, CrmError> {
        self.validator().validate(ELEMENT_ID_PARAM, &json!(element_id))?;
        Ok(HttpRequest::get(
            &self.endpoints.tasks,
            format!("element_id={element_id}"),
        ))
    }

    /// `POST tasks` with `{"add": [task, ...]}` built from raw task objects.
    ///
    /// Every task must be an object carrying all of `REQUIRED_TASK_FIELDS`;
    /// that is checked for the whole list before any field is validated.
    pub fn build_add_tasks(&self, tasks: &[Value]) -> Result<HttpRequest, CrmError> {
        check_task_fields(tasks)?;

        let validator = self.validator();
        for task in tasks {
            if let Some(fields) = task.as_object() {
                for (field, value) in fields {
                    validator.validate(&format!("{ADD_TASK_PREFIX}{field}"), value)?;
                }
            }
        }

        Ok(HttpRequest::post_json(&self.endpoints.tasks, &json!({ "add": tasks }))?)
    }

    /// Same as `build_add_tasks` for typed tasks.
    pub fn build_add_typed_tasks(&self, tasks: &[Task]) -> Result<HttpRequest, CrmError> {
        let values = tasks
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.build_add_tasks(&values)
    }
}

fn check_task_fields(tasks: &[Value]) -> Result<(), PreconditionError> {
    for (index, task) in tasks.iter().enumerate() {
        let fields = task.as_object().ok_or(PreconditionError::TaskNotObject { index })?;
        if let Some(&field) = REQUIRED_TASK_FIELDS.iter().find(|f| !fields.contains_key(**f)) {
            return Err(PreconditionError::MissingTaskField { index, field });
        }
    }
    Ok(())
}
