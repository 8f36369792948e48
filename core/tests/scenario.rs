//! Client behaviour over a scripted transport: what is sent, in which order,
//! and what is refused before anything reaches the wire.

use std::collections::VecDeque;

use amocrm_core::{
    ApiResponse, AuthError, CrmApiClient, CrmError, Credentials, Endpoints, HttpMethod, HttpRequest,
    HttpResponse, PreconditionError, RequestError, Task, Transport, TransportError, ValidationError,
};
use serde_json::{json, Value};

/// Replays canned responses in order and records every request.
#[derive(Default)]
struct Scripted {
    replies: VecDeque<HttpResponse>,
    sent: Vec<HttpRequest>,
}

impl Scripted {
    fn reply(mut self, status: u16, body: Value) -> Self {
        let body = if body.is_null() { String::new() } else { body.to_string() };
        self.replies.push_back(HttpResponse {
            status,
            headers: Vec::new(),
            body,
        });
        self
    }
}

impl Transport for Scripted {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.sent.push(request.clone());
        self.replies
            .pop_front()
            .ok_or_else(|| TransportError::Http("connection refused".to_string()))
    }
}

type Operation = fn(&mut CrmApiClient<Scripted>, &Task) -> Result<ApiResponse, CrmError>;

fn creds() -> Credentials {
    Credentials::new("acme@example.com", "0123456789abcdef").unwrap()
}

fn logged_in() -> Scripted {
    Scripted::default().reply(200, json!({"response": {"auth": true}}))
}

#[test]
fn lead_without_task_gets_one() {
    let mut transport = logged_in()
        .reply(200, json!({"_embedded": {"items": [{"id": 42, "name": "Deal"}]}}))
        .reply(200, json!({"_embedded": {"items": [{"id": 900, "request_id": 0}]}}))
        .reply(200, json!({"_embedded": {"items": [{"id": 900, "element_id": 42, "text": "Сделка без задачи"}]}}));
    let mut client = CrmApiClient::connect(&mut transport, &creds(), Endpoints::default()).unwrap();

    let leads = client.filter_leads_by_task_presence(1).unwrap();
    let ids = client.parse_lead_ids(leads.embedded_items()).unwrap();
    assert_eq!(ids, vec![42]);

    let tasks: Vec<Task> = ids
        .iter()
        .map(|&id| Task::call_for_lead(id, "Сделка без задачи", 5885773, 1_700_000_000))
        .collect();
    client.add_tasks(&tasks).unwrap();

    let response = client.get_tasks_by_element_id(42).unwrap();
    assert_eq!(
        client.parse_task_texts(response.embedded_items()).unwrap(),
        vec!["Сделка без задачи"]
    );
    drop(client);

    let targets: Vec<String> = transport.sent.iter().map(HttpRequest::target).collect();
    assert_eq!(
        targets,
        vec![
            "/private/api/auth.php?type=json",
            "/api/v2/leads?filter[tasks]=1",
            "/api/v2/tasks",
            "/api/v2/tasks?element_id=42",
        ]
    );

    let login: Value = serde_json::from_str(transport.sent[0].body.as_deref().unwrap()).unwrap();
    assert_eq!(login, json!({"USER_LOGIN": "acme@example.com", "USER_HASH": "0123456789abcdef"}));

    let added: Value = serde_json::from_str(transport.sent[2].body.as_deref().unwrap()).unwrap();
    assert_eq!(
        added,
        json!({"add": [{
            "element_id": 42,
            "element_type": 2,
            "task_type": 1,
            "text": "Сделка без задачи",
            "responsible_user_id": 5885773,
            "complete_till_at": 1_700_000_000,
        }]})
    );
}

#[test]
fn invalid_parameters_never_reach_the_wire() {
    let mut transport = logged_in();
    let mut client = CrmApiClient::connect(&mut transport, &creds(), Endpoints::default()).unwrap();

    assert!(matches!(
        client.filter_leads_by_task_presence(0),
        Err(CrmError::Validation(ValidationError::ValueNotAllowed { .. }))
    ));

    let mut wrong_type = Task::call_for_lead(42, "x", 1, 0);
    wrong_type.element_type = 5;
    assert!(matches!(
        client.add_tasks(&[wrong_type]),
        Err(CrmError::Validation(ValidationError::ValueNotAllowed { .. }))
    ));

    let string_id = json!({
        "element_id": "42",
        "element_type": 2,
        "task_type": 1,
        "text": "x",
        "responsible_user_id": 1,
        "complete_till_at": 0,
    });
    assert!(matches!(
        client.add_task_values(&[string_id]),
        Err(CrmError::Validation(ValidationError::TypeMismatch { .. }))
    ));

    let without_text = json!({
        "element_id": 42,
        "element_type": 2,
        "task_type": 1,
        "responsible_user_id": 1,
        "complete_till_at": 0,
    });
    assert!(matches!(
        client.add_task_values(&[without_text]),
        Err(CrmError::Precondition(PreconditionError::MissingTaskField { index: 0, field: "text" }))
    ));

    assert!(matches!(
        client.add_task_values(&[json!("not a task")]),
        Err(CrmError::Precondition(PreconditionError::TaskNotObject { index: 0 }))
    ));

    drop(client);
    assert_eq!(transport.sent.len(), 1, "only the login was sent");
}

#[test]
fn login_without_at_sign_is_refused_before_sending() {
    let err = Credentials::new("acme.example.com", "key").unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentialsFormat { .. }));
}

#[test]
fn every_operation_rejects_unexpected_status() {
    let task = Task::call_for_lead(42, "x", 1, 0);
    let operations: [(&str, Operation); 4] = [
        ("filter", |c, _| c.filter_leads_by_task_presence(1)),
        ("lead", |c, _| c.get_lead_by_id(42)),
        ("tasks", |c, _| c.get_tasks_by_element_id(42)),
        ("add", |c, t| c.add_tasks(std::slice::from_ref(t))),
    ];

    for status in [201, 302, 400, 401, 403, 500] {
        for (name, operation) in &operations {
            let transport = logged_in().reply(status, json!({"_embedded": {"items": [{"id": 1}]}}));
            let mut client = CrmApiClient::connect(transport, &creds(), Endpoints::default()).unwrap();
            let result = operation(&mut client, &task);
            assert!(
                matches!(result, Err(CrmError::Request(RequestError::Failed { status: s, .. })) if s == status),
                "{name} with HTTP {status}"
            );
        }
    }
}

#[test]
fn truthy_auth_flag_wins_over_status() {
    for flag in [json!(true), json!(1), json!("1")] {
        let transport = Scripted::default().reply(401, json!({"response": {"auth": flag}}));
        assert!(CrmApiClient::connect(transport, &creds(), Endpoints::default()).is_ok());
    }

    let transport = Scripted::default().reply(403, json!({"response": {"auth": false}}));
    let err = CrmApiClient::connect(transport, &creds(), Endpoints::default()).err().unwrap();
    match err {
        CrmError::Auth(AuthError::Rejected { message, code }) => {
            assert_eq!(message, "authorization failed");
            assert_eq!(code, "403");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn transport_failure_during_login_is_reported() {
    let err = CrmApiClient::connect(Scripted::default(), &creds(), Endpoints::default())
        .err()
        .unwrap();
    assert!(matches!(err, CrmError::Auth(AuthError::Transport(_))));
}

#[test]
fn every_request_after_login_is_a_get_or_json_post() {
    let mut transport = logged_in().reply(204, Value::Null);
    let mut client = CrmApiClient::connect(&mut transport, &creds(), Endpoints::default()).unwrap();
    client.get_lead_by_id(7).unwrap();
    drop(client);

    assert_eq!(transport.sent[0].method, HttpMethod::Post);
    assert!(transport.sent[0]
        .headers
        .contains(&("content-type".to_string(), "application/json".to_string())));
    assert_eq!(transport.sent[1].method, HttpMethod::Get);
    assert!(transport.sent[1].body.is_none());
}
