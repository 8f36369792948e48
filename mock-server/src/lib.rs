use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session_id";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lead {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    #[serde(default)]
    pub id: i64,
    pub element_id: i64,
    pub element_type: i64,
    pub task_type: i64,
    pub text: String,
    pub responsible_user_id: i64,
    pub complete_till_at: i64,
    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Deserialize)]
pub struct AuthRequest {
    #[serde(rename = "USER_LOGIN")]
    pub user_login: String,
    #[serde(rename = "USER_HASH")]
    pub user_hash: String,
}

#[derive(Deserialize)]
pub struct AddTasks {
    pub add: Vec<Task>,
}

/// The single account the server accepts.
#[derive(Clone, Debug)]
pub struct Account {
    pub login: String,
    pub api_key: String,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            login: "demo@example.com".to_string(),
            api_key: "demo-key".to_string(),
        }
    }
}

#[derive(Default)]
pub struct Crm {
    pub account: Account,
    pub sessions: HashSet<String>,
    pub leads: Vec<Lead>,
    pub tasks: Vec<Task>,
    next_task_id: i64,
}

pub type Db = Arc<RwLock<Crm>>;

pub fn app() -> Router {
    app_with(Account::default(), Vec::new())
}

pub fn app_with(account: Account, leads: Vec<Lead>) -> Router {
    let db: Db = Arc::new(RwLock::new(Crm {
        account,
        leads,
        next_task_id: 1,
        ..Crm::default()
    }));
    Router::new()
        .route("/private/api/auth.php", post(auth))
        .route("/api/v2/leads", get(list_leads))
        .route("/api/v2/tasks", get(list_tasks).post(add_tasks))
        .with_state(db)
}

pub async fn run(listener: TcpListener, account: Account, leads: Vec<Lead>) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(account, leads)).await
}

fn envelope_error(status: StatusCode, message: &str, code: &str) -> Response {
    (
        status,
        Json(json!({"response": {"error": message, "error_code": code}})),
    )
        .into_response()
}

fn items<T: Serialize>(items: Vec<T>) -> Response {
    if items.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }
    Json(json!({"_embedded": {"items": items}})).into_response()
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

async fn authorized(db: &Db, headers: &HeaderMap) -> Result<(), Response> {
    let crm = db.read().await;
    match session_id(headers) {
        Some(id) if crm.sessions.contains(&id) => Ok(()),
        _ => Err(envelope_error(StatusCode::UNAUTHORIZED, "Не авторизован", "401")),
    }
}

async fn auth(
    State(db): State<Db>,
    Query(query): Query<HashMap<String, String>>,
    Json(input): Json<AuthRequest>,
) -> Response {
    if query.get("type").map(String::as_str) != Some("json") {
        return envelope_error(StatusCode::BAD_REQUEST, "Неверный формат ответа", "400");
    }

    let mut crm = db.write().await;
    if input.user_login != crm.account.login || input.user_hash != crm.account.api_key {
        debug!(login = %input.user_login, "login refused");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"response": {
                "auth": false,
                "error": "Неверный логин или пароль",
                "error_code": "110",
            }})),
        )
            .into_response();
    }

    let id = Uuid::new_v4().simple().to_string();
    crm.sessions.insert(id.clone());
    info!(login = %input.user_login, "session opened");

    let mut response = Json(json!({"response": {"auth": true}})).into_response();
    if let Ok(cookie) = HeaderValue::from_str(&format!("{SESSION_COOKIE}={id}; path=/; HttpOnly")) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

async fn list_leads(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = authorized(&db, &headers).await {
        return rejection;
    }
    let crm = db.read().await;

    if let Some(filter) = query.get("filter[tasks]") {
        let has_open_task = |lead: &Lead| {
            crm.tasks
                .iter()
                .any(|t| t.element_id == lead.id && !t.is_completed)
        };
        let leads: Vec<Lead> = match filter.as_str() {
            "1" => crm.leads.iter().filter(|l| !has_open_task(*l)).cloned().collect(),
            "2" => crm.leads.iter().filter(|l| has_open_task(*l)).cloned().collect(),
            _ => return envelope_error(StatusCode::BAD_REQUEST, "Неверный фильтр", "244"),
        };
        return items(leads);
    }

    if let Some(id) = query.get("id") {
        let Ok(id) = id.parse::<i64>() else {
            return envelope_error(StatusCode::BAD_REQUEST, "Неверный id", "244");
        };
        return items(crm.leads.iter().filter(|l| l.id == id).cloned().collect());
    }

    items(crm.leads.clone())
}

async fn list_tasks(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = authorized(&db, &headers).await {
        return rejection;
    }
    let crm = db.read().await;

    let tasks: Vec<Task> = match query.get("element_id") {
        Some(raw) => {
            let Ok(element_id) = raw.parse::<i64>() else {
                return envelope_error(StatusCode::BAD_REQUEST, "Неверный element_id", "244");
            };
            crm.tasks
                .iter()
                .filter(|t| t.element_id == element_id)
                .cloned()
                .collect()
        }
        None => crm.tasks.clone(),
    };
    items(tasks)
}

async fn add_tasks(State(db): State<Db>, headers: HeaderMap, Json(input): Json<AddTasks>) -> Response {
    if let Err(rejection) = authorized(&db, &headers).await {
        return rejection;
    }
    if input.add.is_empty() {
        return envelope_error(StatusCode::BAD_REQUEST, "Не переданы задачи", "202");
    }

    let mut crm = db.write().await;
    let mut created = Vec::new();
    for (request_id, mut task) in input.add.into_iter().enumerate() {
        task.id = crm.next_task_id;
        crm.next_task_id += 1;
        created.push(json!({"id": task.id, "request_id": request_id}));
        crm.tasks.push(task);
    }
    Json(json!({"_embedded": {"items": created}})).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_deserializes_without_server_fields() {
        let task: Task = serde_json::from_value(json!({
            "element_id": 42,
            "element_type": 2,
            "task_type": 1,
            "text": "Сделка без задачи",
            "responsible_user_id": 1,
            "complete_till_at": 0,
        }))
        .unwrap();
        assert_eq!(task.id, 0);
        assert!(!task.is_completed);
    }

    #[test]
    fn task_rejects_missing_text() {
        let result: Result<Task, _> = serde_json::from_value(json!({
            "element_id": 42,
            "element_type": 2,
            "task_type": 1,
            "responsible_user_id": 1,
            "complete_till_at": 0,
        }));
        assert!(result.is_err());
    }

    #[test]
    fn auth_request_uses_amocrm_field_names() {
        let input: AuthRequest =
            serde_json::from_str(r#"{"USER_LOGIN":"a@b.c","USER_HASH":"k"}"#).unwrap();
        assert_eq!(input.user_login, "a@b.c");
        assert_eq!(input.user_hash, "k");
    }

    #[test]
    fn session_id_is_read_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("user_lang=ru; session_id=abc"),
        );
        assert_eq!(session_id(&headers).as_deref(), Some("abc"));
        assert_eq!(session_id(&HeaderMap::new()), None);
    }
}
