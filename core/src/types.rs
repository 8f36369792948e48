//! Domain records of the amoCRM leads and tasks API.
//!
//! # Design
//! These types mirror the server's JSON but are defined independently of the
//! mock-server crate. Integration tests catch any schema drift between the two.

use serde::{Deserialize, Serialize};

/// Entity a task is attached to (`element_type`).
pub mod element_type {
    pub const CONTACT: i64 = 1;
    pub const LEAD: i64 = 2;
    pub const COMPANY: i64 = 3;
    pub const CUSTOMER: i64 = 12;
}

/// Kind of follow-up a task asks for (`task_type`).
pub mod task_type {
    pub const CALL: i64 = 1;
    pub const MEETING: i64 = 2;
    pub const LETTER: i64 = 3;
}

/// Values accepted by the `filter[tasks]` leads filter.
pub mod task_filter {
    /// Leads without any open task.
    pub const WITHOUT_OPEN_TASKS: i64 = 1;
    /// Leads with overdue tasks.
    pub const WITH_OVERDUE_TASKS: i64 = 2;
}

/// Fields every task in an add request must carry.
pub const REQUIRED_TASK_FIELDS: [&str; 6] = [
    "element_id",
    "element_type",
    "task_type",
    "text",
    "responsible_user_id",
    "complete_till_at",
];

/// A sales-pipeline deal. Other server fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lead {
    pub id: i64,
    pub name: String,
}

/// A task to create, attached to an entity through `element_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub element_id: i64,
    pub element_type: i64,
    pub task_type: i64,
    pub text: String,
    pub responsible_user_id: i64,
    /// Unix timestamp of the deadline.
    pub complete_till_at: i64,
}

impl Task {
    /// A call task on lead `lead_id`.
    pub fn call_for_lead(lead_id: i64, text: &str, responsible_user_id: i64, complete_till_at: i64) -> Self {
        Self {
            element_id: lead_id,
            element_type: element_type::LEAD,
            task_type: task_type::CALL,
            text: text.to_string(),
            responsible_user_id,
            complete_till_at,
        }
    }
}
