//! The I/O boundary of the client.
//!
//! # Design
//! `CrmApiClient` only ever talks to the network through `Transport`, so any
//! HTTP stack, or a scripted test double, can stand behind it. The transport
//! owns the account base URL and the cookie session: whatever the login
//! response sets is sent back on every later call from the same instance.
//!
//! `UreqTransport` is the blocking implementation used in production. Status
//! codes are returned as data (`http_status_as_error(false)`) because judging
//! them is the client's job, not the transport's.

use std::time::Duration;

use tracing::{debug, warn};
use ureq::{Agent, RequestBuilder};

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::session::{Session, SessionStore};

/// Sends one request and returns the raw response.
pub trait Transport {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    /// The session established so far, if the transport keeps one.
    fn session(&self) -> Option<&Session> {
        None
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }

    fn session(&self) -> Option<&Session> {
        (**self).session()
    }
}

/// Blocking HTTP transport over `ureq` with a cookie session.
pub struct UreqTransport {
    agent: Agent,
    base_url: String,
    user_agent: String,
    session: Session,
    store: Option<Box<dyn SessionStore>>,
}

impl UreqTransport {
    pub fn new(base_url: &str, config: &TransportConfig) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout_secs.map(Duration::from_secs))
            .build()
            .new_agent();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            session: Session::default(),
            store: None,
        }
    }

    /// Restores a previously saved session from `store` and keeps saving to
    /// it whenever the server changes the cookies.
    pub fn with_session_store(
        mut self,
        store: impl SessionStore + 'static,
    ) -> Result<Self, TransportError> {
        if let Some(session) = store.load()? {
            debug!("restored saved session");
            self.session = session;
        }
        self.store = Some(Box::new(store));
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn decorate<B>(&self, mut builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
        builder = builder.header("user-agent", self.user_agent.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(cookie) = self.session.cookie_header() {
            builder = builder.header("cookie", cookie.as_str());
        }
        builder
    }
}

impl Transport for UreqTransport {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.target());
        debug!(method = request.method.as_str(), %url, "sending request");

        let result = match request.method {
            HttpMethod::Get => self.decorate(self.agent.get(&url), request).call(),
            HttpMethod::Post => {
                let builder = self.decorate(self.agent.post(&url), request);
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = result.map_err(|e| TransportError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        let mut headers = Vec::new();
        let mut session_changed = false;
        for (name, value) in response.headers() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            if name.as_str() == "set-cookie" {
                session_changed |= self.session.absorb_set_cookie(value);
            }
            headers.push((name.as_str().to_string(), value.to_string()));
        }

        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError::Body(e.to_string()))?;

        if session_changed {
            if let Some(store) = &self.store {
                store.save(&self.session)?;
            } else {
                debug!("session cookies updated");
            }
        }
        if status >= 500 {
            warn!(status, %url, "server error");
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn session(&self) -> Option<&Session> {
        (!self.session.is_empty()).then_some(&self.session)
    }
}
