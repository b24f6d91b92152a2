use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub const SHOPPING_LIST_FIELD: &str = "Shopping List";

/// Behavior of the fake services.
#[derive(Clone, Debug)]
pub struct MockConfig {
    pub base_id: String,
    pub table_name: String,
    /// Listing this view returns only records on the shopping list; any
    /// other view returns everything.
    pub list_view: String,
    pub page_size: usize,
    /// Required bearer token. `None` accepts any request.
    pub api_key: Option<String>,
    /// Values served by the parameter endpoint.
    pub parameters: HashMap<String, String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            base_id: "appGrocery".to_string(),
            table_name: "Items".to_string(),
            list_view: "Grocery List".to_string(),
            page_size: 100,
            api_key: None,
            parameters: HashMap::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MockRecord {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl MockRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("rec{}", &id[..14]),
            fields,
        }
    }

    fn on_shopping_list(&self) -> bool {
        self.fields.get(SHOPPING_LIST_FIELD) == Some(&Value::Bool(true))
    }
}

#[derive(Default)]
struct Db {
    records: Vec<MockRecord>,
    objects: HashMap<(String, String), String>,
    list_requests: usize,
}

/// Shared handle to the fake services' data, usable from tests while the
/// server is running.
#[derive(Clone)]
pub struct MockState {
    config: Arc<MockConfig>,
    db: Arc<RwLock<Db>>,
}

impl MockState {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config: Arc::new(config),
            db: Arc::new(RwLock::new(Db::default())),
        }
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    /// Insert a record directly, bypassing the API. Returns its id.
    pub async fn seed(&self, fields: Value) -> String {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let record = MockRecord::new(fields);
        let id = record.id.clone();
        self.db.write().await.records.push(record);
        id
    }

    pub async fn records(&self) -> Vec<MockRecord> {
        self.db.read().await.records.clone()
    }

    /// Number of list-page requests served so far.
    pub async fn list_requests(&self) -> usize {
        self.db.read().await.list_requests
    }

    pub async fn object(&self, bucket: &str, key: &str) -> Option<String> {
        let db = self.db.read().await;
        db.objects.get(&(bucket.to_string(), key.to_string())).cloned()
    }
}

pub fn app(config: MockConfig) -> Router {
    router(MockState::new(config))
}

pub fn router(state: MockState) -> Router {
    Router::new()
        .route(
            "/v0/{base}/{table}",
            get(list_records).post(create_records).patch(update_records),
        )
        .route(
            "/s3/{bucket}/{*key}",
            get(get_object).put(put_object).delete(delete_object),
        )
        .route("/systemsmanager/parameters/get", get(get_parameter))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, router(state)).await
}

fn api_error(status: StatusCode, kind: &str, message: &str) -> Response {
    (
        status,
        Json(json!({"error": {"type": kind, "message": message}})),
    )
        .into_response()
}

/// Check the table path and bearer token shared by every table route.
fn authorize(
    config: &MockConfig,
    base: &str,
    table: &str,
    headers: &HeaderMap,
) -> Result<(), Response> {
    if base != config.base_id || table != config.table_name {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Could not find what you are looking for",
        ));
    }
    if let Some(key) = &config.api_key {
        let expected = format!("Bearer {key}");
        let given = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        if given != Some(expected.as_str()) {
            return Err(api_error(
                StatusCode::UNAUTHORIZED,
                "AUTHENTICATION_REQUIRED",
                "Authentication required",
            ));
        }
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub view: Option<String>,
    pub offset: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct ListPage {
    pub records: Vec<MockRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
}

async fn list_records(
    State(state): State<MockState>,
    Path((base, table)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = authorize(&state.config, &base, &table, &headers) {
        return resp;
    }

    let start = match query.offset.as_deref() {
        None => 0,
        Some(token) => match token.strip_prefix("itr").and_then(|n| n.parse::<usize>().ok()) {
            Some(n) => n,
            None => {
                return api_error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "LIST_RECORDS_ITERATOR_NOT_AVAILABLE",
                    "Invalid offset",
                )
            }
        },
    };

    let mut db = state.db.write().await;
    db.list_requests += 1;

    let list_view = query.view.as_deref() == Some(state.config.list_view.as_str());
    let visible: Vec<&MockRecord> = db
        .records
        .iter()
        .filter(|r| !list_view || r.on_shopping_list())
        .collect();

    let page_size = state.config.page_size.max(1);
    let end = (start + page_size).min(visible.len());
    let records = visible
        .get(start..end)
        .unwrap_or_default()
        .iter()
        .map(|r| (*r).clone())
        .collect();
    let offset = (end < visible.len()).then(|| format!("itr{end}"));
    debug!(view = ?query.view, start, end, "served list page");

    Json(ListPage { records, offset }).into_response()
}

#[derive(Deserialize)]
pub struct NewRecord {
    pub fields: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct CreateRecords {
    pub records: Vec<NewRecord>,
}

async fn create_records(
    State(state): State<MockState>,
    Path((base, table)): Path<(String, String)>,
    headers: HeaderMap,
    Json(input): Json<CreateRecords>,
) -> Response {
    if let Err(resp) = authorize(&state.config, &base, &table, &headers) {
        return resp;
    }

    let created: Vec<MockRecord> = input
        .records
        .into_iter()
        .map(|r| MockRecord::new(r.fields))
        .collect();
    state.db.write().await.records.extend(created.iter().cloned());

    Json(json!({ "records": created })).into_response()
}

#[derive(Deserialize)]
pub struct RecordUpdate {
    pub id: Option<String>,
    pub fields: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct UpdateRecords {
    pub records: Vec<RecordUpdate>,
}

async fn update_records(
    State(state): State<MockState>,
    Path((base, table)): Path<(String, String)>,
    headers: HeaderMap,
    Json(input): Json<UpdateRecords>,
) -> Response {
    if let Err(resp) = authorize(&state.config, &base, &table, &headers) {
        return resp;
    }

    let mut db = state.db.write().await;
    // Validate everything before applying anything.
    for update in &input.records {
        let Some(id) = &update.id else {
            return api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_RECORDS",
                "Record id is required",
            );
        };
        if !db.records.iter().any(|r| &r.id == id) {
            return api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "ROW_DOES_NOT_EXIST",
                &format!("Record ID {id} does not exist in this table"),
            );
        }
    }

    let mut updated = Vec::new();
    for update in input.records {
        let Some(record) = db.records.iter_mut().find(|r| Some(&r.id) == update.id.as_ref()) else {
            continue;
        };
        for (name, value) in update.fields {
            if value.is_null() {
                record.fields.remove(&name);
            } else {
                record.fields.insert(name, value);
            }
        }
        updated.push(record.clone());
    }

    Json(json!({ "records": updated })).into_response()
}

fn object_id(bucket: String, key: String) -> (String, String) {
    (bucket, key)
}

async fn get_object(
    State(state): State<MockState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<String, StatusCode> {
    let db = state.db.read().await;
    db.objects
        .get(&object_id(bucket, key))
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)
}

async fn put_object(
    State(state): State<MockState>,
    Path((bucket, key)): Path<(String, String)>,
    body: String,
) -> StatusCode {
    state.db.write().await.objects.insert(object_id(bucket, key), body);
    StatusCode::OK
}

async fn delete_object(
    State(state): State<MockState>,
    Path((bucket, key)): Path<(String, String)>,
) -> StatusCode {
    state.db.write().await.objects.remove(&object_id(bucket, key));
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
pub struct ParameterQuery {
    pub name: String,
}

async fn get_parameter(
    State(state): State<MockState>,
    Query(query): Query<ParameterQuery>,
) -> Response {
    match state.config.parameters.get(&query.name) {
        Some(value) => Json(json!({
            "Parameter": {
                "Name": query.name,
                "Type": "SecureString",
                "Value": value,
                "Version": 1,
            }
        }))
        .into_response(),
        None => (StatusCode::BAD_REQUEST, "ParameterNotFound").into_response(),
    }
}
