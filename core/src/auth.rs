//! The one-time login exchange.

use serde_json::Value;
use tracing::{info, warn};

use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::guard::{is_success_status, server_error};
use crate::http::{ApiResponse, HttpRequest};
use crate::session::Session;
use crate::transport::Transport;

const GENERIC_REJECTION: &str = "authorization failed";

/// Exchanges credentials for a cookie session held by the transport.
#[derive(Debug, Clone)]
pub struct SessionAuthenticator {
    endpoint: String,
}

impl SessionAuthenticator {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
        }
    }

    pub fn build_request(&self, credentials: &Credentials) -> Result<HttpRequest, serde_json::Error> {
        HttpRequest::post_json(&self.endpoint, &credentials.auth_payload())
    }

    /// Logs in once. The login is accepted when the reply's `auth` flag is
    /// truthy or the status is 200 or 204.
    ///
    /// Returns a snapshot of the session the transport now holds; a transport
    /// that keeps no cookies yields an empty one.
    pub fn authenticate<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        credentials: &Credentials,
    ) -> Result<Session, AuthError> {
        let request = self.build_request(credentials)?;
        let response = ApiResponse::from(transport.send(&request)?);

        let auth_flag = response.envelope_field("auth").is_some_and(is_truthy);
        if !auth_flag && !is_success_status(response.status) {
            let (message, code) = server_error(&response, GENERIC_REJECTION);
            warn!(
                subdomain = credentials.subdomain(),
                status = response.status,
                %code,
                "authentication rejected"
            );
            return Err(AuthError::Rejected { message, code });
        }

        info!(subdomain = credentials.subdomain(), "authenticated");
        Ok(transport.session().cloned().unwrap_or_default())
    }
}

/// Loose truthiness: amoCRM has answered with `true`, `1` and `"1"` over time.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::http::HttpResponse;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    struct OneShot {
        reply: Option<HttpResponse>,
        sent: Vec<HttpRequest>,
    }

    impl OneShot {
        fn replying(status: u16, body: Value) -> Self {
            Self {
                reply: Some(HttpResponse {
                    status,
                    headers: Vec::new(),
                    body: body.to_string(),
                }),
                sent: Vec::new(),
            }
        }
    }

    impl Transport for OneShot {
        fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.sent.push(request.clone());
            self.reply
                .take()
                .ok_or_else(|| TransportError::Http("no reply scripted".to_string()))
        }
    }

    fn creds() -> Credentials {
        Credentials::new("acme@example.com", "hash").unwrap()
    }

    fn authenticator() -> SessionAuthenticator {
        SessionAuthenticator::new("/private/api/auth.php?type=json")
    }

    #[test]
    fn posts_credentials_to_auth_endpoint() {
        let mut transport = OneShot::replying(200, json!({"response": {"auth": true}}));
        authenticator().authenticate(&mut transport, &creds()).unwrap();

        let sent = &transport.sent[0];
        assert_eq!(sent.target(), "/private/api/auth.php?type=json");
        let body: Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"USER_LOGIN": "acme@example.com", "USER_HASH": "hash"}));
    }

    #[test]
    fn truthy_flag_wins_over_status() {
        let mut transport = OneShot::replying(401, json!({"response": {"auth": true}}));
        assert!(authenticator().authenticate(&mut transport, &creds()).is_ok());
    }

    #[test]
    fn success_status_is_enough() {
        let mut transport = OneShot::replying(204, Value::Null);
        let session = authenticator().authenticate(&mut transport, &creds()).unwrap();
        assert!(session.is_empty());
    }

    #[test]
    fn rejection_carries_server_detail() {
        let mut transport = OneShot::replying(
            401,
            json!({"response": {"auth": false, "error": "Неверный логин или пароль", "error_code": "110"}}),
        );
        let err = authenticator().authenticate(&mut transport, &creds()).unwrap_err();
        match err {
            AuthError::Rejected { message, code } => {
                assert_eq!(message, "Неверный логин или пароль");
                assert_eq!(code, "110");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejection_without_detail_uses_status() {
        let mut transport = OneShot::replying(403, json!("forbidden"));
        let err = authenticator().authenticate(&mut transport, &creds()).unwrap_err();
        assert!(matches!(
            err,
            AuthError::Rejected { ref message, ref code } if message == GENERIC_REJECTION && code == "403"
        ));
    }

    #[test]
    fn transport_failure_is_reported() {
        let mut transport = OneShot {
            reply: None,
            sent: Vec::new(),
        };
        let err = authenticator().authenticate(&mut transport, &creds()).unwrap_err();
        assert!(matches!(err, AuthError::Transport(_)));
    }

    #[test]
    fn truthiness() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("1")));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("0")));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&Value::Null));
        assert!(is_truthy(&json!({"ok": 1})));
        assert!(!is_truthy(&json!({})));
        assert!(!is_truthy(&json!([])));
    }

    #[test]
    fn empty_object_flag_is_not_a_login() {
        let mut transport = OneShot::replying(401, json!({"response": {"auth": {}}}));
        let err = authenticator().authenticate(&mut transport, &creds()).unwrap_err();
        assert!(matches!(err, AuthError::Rejected { .. }));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn rejection_log_omits_the_login() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut transport = OneShot::replying(401, json!({"response": {"auth": false}}));
            assert!(authenticator().authenticate(&mut transport, &creds()).is_err());
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("authentication rejected"), "{output}");
        assert!(output.contains("subdomain=\"acme\""), "{output}");
        assert!(!output.contains("acme@example.com"), "{output}");
    }
}
