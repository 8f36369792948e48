//! Authenticated client for the amoCRM leads and tasks API.
//!
//! # Design
//! `CrmApiClient` owns a `Transport` and logs in through it once, on
//! construction. Every operation then runs the same sequence: build (and
//! validate) the request with `CrmRequests`, send it, decode the body, and
//! check the status with the response guard. Nothing is returned to the
//! caller before the guard has passed. There is no automatic re-login: an
//! expired session shows up as an ordinary `RequestError` on the next call.
//!
//! All operations take `&mut self`, so a client has at most one request in
//! flight against its session.

use serde_json::Value;
use tracing::debug;

use crate::auth::SessionAuthenticator;
use crate::config::{ClientConfig, Endpoints};
use crate::credentials::Credentials;
use crate::error::CrmError;
use crate::guard;
use crate::http::{ApiResponse, HttpRequest};
use crate::parse;
use crate::requests::CrmRequests;
use crate::rules::RuleTable;
use crate::session::{FileSessionStore, Session};
use crate::transport::{Transport, UreqTransport};
use crate::types::{Lead, Task};

pub struct CrmApiClient<T: Transport> {
    transport: T,
    requests: CrmRequests,
}

impl<T: Transport> CrmApiClient<T> {
    /// Logs in with `credentials` over `transport` using the built-in rules.
    pub fn connect(transport: T, credentials: &Credentials, endpoints: Endpoints) -> Result<Self, CrmError> {
        Self::connect_with_rules(transport, credentials, endpoints, RuleTable::amocrm())
    }

    pub fn connect_with_rules(
        mut transport: T,
        credentials: &Credentials,
        endpoints: Endpoints,
        rules: RuleTable,
    ) -> Result<Self, CrmError> {
        let session = SessionAuthenticator::new(&endpoints.auth).authenticate(&mut transport, credentials)?;
        debug!(cookies = !session.is_empty(), "session established");
        Ok(Self {
            transport,
            requests: CrmRequests::new(endpoints, rules),
        })
    }

    pub fn requests(&self) -> &CrmRequests {
        &self.requests
    }

    pub fn session(&self) -> Option<&Session> {
        self.transport.session()
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Leads filtered by task presence: `1` for leads without open tasks,
    /// `2` for leads with overdue tasks.
    pub fn filter_leads_by_task_presence(&mut self, code: i64) -> Result<ApiResponse, CrmError> {
        let request = self.requests.build_filter_leads_by_task_presence(code)?;
        self.execute(&request)
    }

    pub fn get_lead_by_id(&mut self, id: i64) -> Result<ApiResponse, CrmError> {
        let request = self.requests.build_get_lead_by_id(id)?;
        self.execute(&request)
    }

    pub fn get_tasks_by_element_id(&mut self, element_id: i64) -> Result<ApiResponse, CrmError> {
        let request = self.requests.build_get_tasks_by_element_id(element_id)?;
        self.execute(&request)
    }

    pub fn add_tasks(&mut self, tasks: &[Task]) -> Result<ApiResponse, CrmError> {
        let request = self.requests.build_add_typed_tasks(tasks)?;
        self.execute(&request)
    }

    /// Adds tasks given as raw JSON objects. Objects missing a required field
    /// are refused before anything is validated or sent.
    pub fn add_task_values(&mut self, tasks: &[Value]) -> Result<ApiResponse, CrmError> {
        let request = self.requests.build_add_tasks(tasks)?;
        self.execute(&request)
    }

    pub fn parse_lead_ids(&self, leads: &[Value]) -> Result<Vec<i64>, CrmError> {
        parse::lead_ids(&self.requests.validator(), leads)
    }

    pub fn parse_lead_names(&self, leads: &[Value]) -> Result<Vec<String>, CrmError> {
        parse::lead_names(&self.requests.validator(), leads)
    }

    pub fn parse_task_texts(&self, tasks: &[Value]) -> Result<Vec<String>, CrmError> {
        parse::task_texts(&self.requests.validator(), tasks)
    }

    pub fn parse_leads(&self, leads: &[Value]) -> Result<Vec<Lead>, CrmError> {
        Ok(parse::leads(leads)?)
    }

    fn execute(&mut self, request: &HttpRequest) -> Result<ApiResponse, CrmError> {
        let response = ApiResponse::from(self.transport.send(request)?);
        guard::check(&response)?;
        debug!(
            method = request.method.as_str(),
            target = %request.target(),
            status = response.status,
            "request succeeded"
        );
        Ok(response)
    }
}

impl CrmApiClient<UreqTransport> {
    /// Builds a `UreqTransport` from `config` and logs in.
    pub fn from_config(credentials: &Credentials, config: &ClientConfig) -> Result<Self, CrmError> {
        config.validate()?;
        let base_url = config.base_url_for(credentials.subdomain());
        let mut transport = UreqTransport::new(&base_url, &config.transport);
        if let Some(path) = &config.transport.session_file {
            transport = transport.with_session_store(FileSessionStore::new(path))?;
        }
        Self::connect_with_rules(transport, credentials, config.endpoints.clone(), config.rule_table())
    }
}
