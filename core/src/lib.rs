//! Session-authenticated client for the amoCRM leads and tasks API.
//!
//! # Overview
//! `CrmApiClient` logs in once when it is constructed and then offers typed
//! operations over leads and tasks. Each operation validates its parameters
//! against a declarative `RuleTable`, sends one request through a
//! `Transport`, and refuses to hand the response back unless its status is
//! 200 or 204. Read responses are then reduced to a single column by the
//! collection parsers.
//!
//! # Design
//! - The network sits behind the `Transport` trait. `UreqTransport` is the
//!   blocking production implementation; tests substitute scripted doubles.
//! - The cookie `Session` belongs to the transport and is optionally saved
//!   through a `SessionStore`.
//! - Requests are built and validated by `CrmRequests` without I/O, so an
//!   invalid parameter never reaches the wire.
//! - Every failure is a typed error; nothing here aborts the process.
//!
//! ```no_run
//! use amocrm_core::{ClientConfig, CrmApiClient, Credentials, Task};
//!
//! # fn main() -> Result<(), amocrm_core::CrmError> {
//! let credentials = Credentials::new("acme@example.com", "api-key")?;
//! let mut client = CrmApiClient::from_config(&credentials, &ClientConfig::default())?;
//!
//! let leads = client.filter_leads_by_task_presence(1)?;
//! for id in client.parse_lead_ids(leads.embedded_items())? {
//!     client.add_tasks(&[Task::call_for_lead(id, "Сделка без задачи", 5885773, 1_700_000_000)])?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod guard;
pub mod http;
pub mod parse;
pub mod requests;
pub mod rules;
pub mod session;
pub mod transport;
pub mod types;
pub mod validate;

pub use auth::SessionAuthenticator;
pub use client::CrmApiClient;
pub use config::{ClientConfig, Endpoints, TransportConfig};
pub use credentials::Credentials;
pub use error::{
    AuthError, ConfigError, CrmError, ParseError, PreconditionError, RequestError, SessionStoreError,
    TransportError, ValidationError,
};
pub use http::{ApiResponse, HttpMethod, HttpRequest, HttpResponse};
pub use requests::CrmRequests;
pub use rules::{AllowedValues, JsonKind, RuleTable, ValidationRule, ValueType};
pub use session::{FileSessionStore, Session, SessionStore};
pub use transport::{Transport, UreqTransport};
pub use types::{Lead, Task};
pub use validate::RequestValidator;
