//! Client for the grocery table of the tabular-data API.
//!
//! # Design
//! Each call is split into a pure `build_*` step that produces an
//! `HttpRequest` and a pure `parse_*` step that consumes an `HttpResponse`;
//! the public operations drive both through a `Transport`. The authorization
//! header lives in an immutable base set that every request copies from, and
//! no record is ever cached between calls.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::RecordsConfig;
use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::secrets::SecretSource;
use crate::transport::Transport;
use crate::types::{CreateRecords, ListPage, Record, RecordsResponse, UpdateRecords, NAME_FIELD};

/// Blocking client for one table, with a "shopping list" view and an
/// "everything" view.
#[derive(Debug, Clone)]
pub struct RecordsClient<T> {
    table_url: String,
    base_headers: Vec<(String, String)>,
    list_view: String,
    all_view: String,
    transport: T,
}

impl<T: Transport> RecordsClient<T> {
    pub fn new(config: &RecordsConfig, api_key: &str, transport: T) -> Self {
        Self {
            table_url: config.table_url(),
            base_headers: vec![("authorization".to_string(), format!("Bearer {api_key}"))],
            list_view: config.list_view.clone(),
            all_view: config.all_view.clone(),
            transport,
        }
    }

    /// Resolve the API key through `secrets`, then build the client.
    pub fn connect<S: SecretSource>(config: &RecordsConfig, secrets: &S, transport: T) -> Result<Self> {
        let api_key = secrets.get_secret(&config.api_key_parameter)?;
        Ok(Self::new(config, &api_key, transport))
    }

    pub fn list_view(&self) -> &str {
        &self.list_view
    }

    pub fn all_view(&self) -> &str {
        &self.all_view
    }

    pub fn build_list_page(&self, view: &str, offset: Option<&str>) -> HttpRequest {
        let req = HttpRequest::new(HttpMethod::Get, self.table_url.as_str())
            .with_headers(&self.base_headers)
            .with_query("view", view);
        match offset {
            Some(offset) => req.with_query("offset", offset),
            None => req,
        }
    }

    pub fn build_create_record(&self, name: &str) -> Result<HttpRequest> {
        let body = serde_json::to_string(&CreateRecords::shopping_item(name))
            .map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(HttpRequest::new(HttpMethod::Post, self.table_url.as_str())
            .with_headers(&self.base_headers)
            .with_json_body(body))
    }

    pub fn build_update_record(&self, id: Option<&str>, field: &str, value: Value) -> Result<HttpRequest> {
        let update = UpdateRecords::single_field(id.map(str::to_string), field, value);
        let body = serde_json::to_string(&update).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(HttpRequest::new(HttpMethod::Patch, self.table_url.as_str())
            .with_headers(&self.base_headers)
            .with_json_body(body))
    }

    pub fn parse_list_page(&self, response: HttpResponse) -> Result<ListPage> {
        check_success(&response)?;
        serde_json::from_str(&response.body).map_err(|e| Error::Deserialization(e.to_string()))
    }

    pub fn parse_records(&self, response: HttpResponse) -> Result<RecordsResponse> {
        check_success(&response)?;
        serde_json::from_str(&response.body).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Every record visible in `view`, in service order, following
    /// continuation tokens until a page arrives without one.
    pub fn list_all_records(&self, view: &str) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let req = self.build_list_page(view, offset.as_deref());
            let page = self.parse_list_page(self.transport.execute(&req)?)?;
            pages += 1;
            debug!(view, page = pages, count = page.records.len(), "fetched records page");
            records.extend(page.records);

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(records)
    }

    /// The `Name` of every record in `view`, in the same order.
    pub fn list_all_names(&self, view: &str) -> Result<Vec<String>> {
        self.list_all_records(view)?
            .into_iter()
            .map(|record| match record.fields.name {
                Some(name) => Ok(name),
                None => Err(Error::MissingField {
                    id: record.id,
                    field: NAME_FIELD.to_string(),
                }),
            })
            .collect()
    }

    pub fn shopping_list_names(&self) -> Result<Vec<String>> {
        self.list_all_names(&self.list_view)
    }

    pub fn all_names(&self) -> Result<Vec<String>> {
        self.list_all_names(&self.all_view)
    }

    /// Id of the first record in the all-items view whose name equals `name`
    /// exactly. Always performs a fresh full listing.
    pub fn get_record_id_by_name(&self, name: &str) -> Result<Option<String>> {
        let records = self.list_all_records(&self.all_view)?;
        match records.into_iter().find(|record| record.name() == Some(name)) {
            Some(record) => {
                info!(name, id = %record.id, "resolved record name");
                Ok(Some(record.id))
            }
            None => {
                warn!(name, "record id not found");
                Ok(None)
            }
        }
    }

    /// Create a new item on the shopping list. Not idempotent.
    pub fn create_record(&self, name: &str) -> Result<RecordsResponse> {
        let req = self.build_create_record(name)?;
        self.parse_records(self.transport.execute(&req)?)
    }

    /// Set one field of the record named `name`.
    ///
    /// An unresolved name is not caught here: the update is still sent with
    /// a null id and the service's answer is returned as-is.
    pub fn update_record(&self, name: &str, field: &str, value: impl Into<Value>) -> Result<RecordsResponse> {
        let id = self.get_record_id_by_name(name)?;
        let req = self.build_update_record(id.as_deref(), field, value.into())?;
        self.parse_records(self.transport.execute(&req)?)
    }
}

fn check_success(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    Err(Error::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use super::*;
    use crate::types::Fields;

    /// In-process stand-in for the table: serves `records` in pages of
    /// `page_size` and answers writes with a canned body.
    #[derive(Debug)]
    struct FakeTable {
        records: Vec<Record>,
        page_size: usize,
        write_response: HttpResponse,
        requests: RefCell<Vec<HttpRequest>>,
    }

    impl FakeTable {
        fn new(records: Vec<Record>, page_size: usize) -> Self {
            Self {
                records,
                page_size,
                write_response: HttpResponse::new(200, r#"{"records":[]}"#),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn page_requests(&self) -> usize {
            self.requests
                .borrow()
                .iter()
                .filter(|r| r.method == HttpMethod::Get)
                .count()
        }

        fn last_request(&self) -> HttpRequest {
            self.requests.borrow().last().cloned().unwrap()
        }
    }

    impl Transport for FakeTable {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.requests.borrow_mut().push(request.clone());
            if request.method != HttpMethod::Get {
                return Ok(self.write_response.clone());
            }
            let start: usize = request
                .query_param("offset")
                .map(|o| o.parse().unwrap())
                .unwrap_or(0);
            let end = (start + self.page_size).min(self.records.len());
            let page = ListPage {
                records: self.records[start..end].to_vec(),
                offset: (end < self.records.len()).then(|| end.to_string()),
            };
            Ok(HttpResponse::new(200, serde_json::to_string(&page).unwrap()))
        }
    }

    fn record(id: &str, name: &str) -> Record {
        Record {
            id: id.to_string(),
            created_time: None,
            fields: Fields {
                name: Some(name.to_string()),
                ..Fields::default()
            },
        }
    }

    fn config() -> RecordsConfig {
        RecordsConfig {
            api_key_parameter: "/grocery/key".to_string(),
            base_id: "appBase".to_string(),
            table_name: "Groceries".to_string(),
            list_view: "Grocery List".to_string(),
            all_view: "All Items".to_string(),
            api_root: "http://localhost:3000/v0".to_string(),
        }
    }

    fn client(table: &FakeTable) -> RecordsClient<&FakeTable> {
        RecordsClient::new(&config(), "key123", table)
    }

    #[test]
    fn build_list_page_carries_view_and_auth() {
        let table = FakeTable::new(Vec::new(), 10);
        let req = client(&table).build_list_page("All Items", None);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:3000/v0/appBase/Groceries");
        assert_eq!(req.query, vec![("view".to_string(), "All Items".to_string())]);
        assert_eq!(req.header("Authorization"), Some("Bearer key123"));
        assert!(req.body.is_none());
    }

    #[test]
    fn build_list_page_with_offset() {
        let table = FakeTable::new(Vec::new(), 10);
        let req = client(&table).build_list_page("All Items", Some("itr/rec9"));
        assert_eq!(req.query_param("offset"), Some("itr/rec9"));
    }

    #[test]
    fn write_requests_do_not_leak_content_type_into_reads() {
        let table = FakeTable::new(Vec::new(), 10);
        let c = client(&table);
        let create = c.build_create_record("milk").unwrap();
        assert_eq!(create.header("content-type"), Some("application/json"));
        let list = c.build_list_page("All Items", None);
        assert_eq!(list.header("content-type"), None);
    }

    #[test]
    fn list_all_records_follows_every_page_in_order() {
        let records: Vec<Record> = (0..7).map(|i| record(&format!("r{i}"), &format!("item{i}"))).collect();
        let table = FakeTable::new(records.clone(), 3);
        let listed = client(&table).list_all_records("All Items").unwrap();
        assert_eq!(listed, records);
        assert_eq!(table.page_requests(), 3);
    }

    #[test]
    fn list_all_records_single_exact_page() {
        let records: Vec<Record> = (0..3).map(|i| record(&format!("r{i}"), "x")).collect();
        let table = FakeTable::new(records, 3);
        assert_eq!(client(&table).list_all_records("v").unwrap().len(), 3);
        assert_eq!(table.page_requests(), 1);
    }

    #[test]
    fn list_all_records_empty_view() {
        let table = FakeTable::new(Vec::new(), 5);
        assert!(client(&table).list_all_records("Grocery List").unwrap().is_empty());
        assert_eq!(table.page_requests(), 1);
    }

    #[test]
    fn list_all_names_projects_in_order() {
        let table = FakeTable::new(vec![record("r1", "milk"), record("r2", "eggs"), record("r3", "milk")], 2);
        let names = client(&table).list_all_names("All Items").unwrap();
        assert_eq!(names, vec!["milk", "eggs", "milk"]);
    }

    #[test]
    fn list_all_names_rejects_nameless_record() {
        let mut nameless = record("r2", "");
        nameless.fields.name = None;
        let table = FakeTable::new(vec![record("r1", "milk"), nameless], 5);
        let err = client(&table).list_all_names("All Items").unwrap_err();
        assert!(matches!(err, Error::MissingField { ref id, .. } if id == "r2"));
    }

    #[test]
    fn get_record_id_by_name_scans_all_view() {
        let table = FakeTable::new(vec![record("r1", "milk"), record("r2", "eggs")], 1);
        let c = client(&table);
        assert_eq!(c.get_record_id_by_name("eggs").unwrap().as_deref(), Some("r2"));
        assert_eq!(c.get_record_id_by_name("bread").unwrap(), None);
        assert_eq!(table.last_request().query_param("view"), Some("All Items"));
    }

    #[test]
    fn get_record_id_by_name_is_case_sensitive_first_match() {
        let table = FakeTable::new(vec![record("r1", "Milk"), record("r2", "milk"), record("r3", "milk")], 10);
        let c = client(&table);
        assert_eq!(c.get_record_id_by_name("milk").unwrap().as_deref(), Some("r2"));
        assert_eq!(c.get_record_id_by_name("MILK").unwrap(), None);
    }

    #[test]
    fn get_record_id_by_name_on_empty_view() {
        let table = FakeTable::new(Vec::new(), 10);
        assert_eq!(client(&table).get_record_id_by_name("milk").unwrap(), None);
    }

    #[test]
    fn create_record_posts_shopping_item() {
        let mut table = FakeTable::new(Vec::new(), 10);
        table.write_response = HttpResponse::new(
            200,
            r#"{"records":[{"id":"recNew","createdTime":"2024-01-01T00:00:00.000Z","fields":{"Name":"bread","Shopping List":true}}]}"#,
        );
        let created = client(&table).create_record("bread").unwrap();
        assert_eq!(created.records[0].id, "recNew");

        let req = table.last_request();
        assert_eq!(req.method, HttpMethod::Post);
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"records": [{"fields": {"Name": "bread", "Shopping List": true}}]}));
    }

    #[test]
    fn create_record_error_status_is_returned_raw() {
        let mut table = FakeTable::new(Vec::new(), 10);
        table.write_response = HttpResponse::new(422, r#"{"error":{"type":"INVALID_REQUEST_UNKNOWN"}}"#);
        let err = client(&table).create_record("bread").unwrap_err();
        match err {
            Error::HttpError { status, body } => {
                assert_eq!(status, 422);
                assert!(body.contains("INVALID_REQUEST_UNKNOWN"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn update_record_patches_resolved_id() {
        let table = FakeTable::new(vec![record("r1", "milk"), record("r2", "eggs")], 10);
        client(&table).update_record("eggs", "Shopping List", false).unwrap();

        let req = table.last_request();
        assert_eq!(req.method, HttpMethod::Patch);
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"records": [{"id": "r2", "fields": {"Shopping List": false}}]}));
    }

    #[test]
    fn update_record_with_unknown_name_still_sends_null_id() {
        let table = FakeTable::new(vec![record("r1", "milk")], 10);
        client(&table).update_record("bread", "Shopping List", true).unwrap();

        let req = table.last_request();
        assert_eq!(req.method, HttpMethod::Patch);
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["records"][0]["id"], Value::Null);
    }

    #[test]
    fn parse_list_page_bad_json() {
        let table = FakeTable::new(Vec::new(), 10);
        let err = client(&table)
            .parse_list_page(HttpResponse::new(200, "not json"))
            .unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }

    #[test]
    fn connect_resolves_key_through_secret_source() {
        struct Fixed;
        impl SecretSource for Fixed {
            fn get_secret(&self, name: &str) -> Result<String> {
                assert_eq!(name, "/grocery/key");
                Ok("fromStore".to_string())
            }
        }
        let table = FakeTable::new(Vec::new(), 10);
        let c = RecordsClient::connect(&config(), &Fixed, &table).unwrap();
        let req = c.build_list_page(c.list_view(), None);
        assert_eq!(req.header("authorization"), Some("Bearer fromStore"));
        assert_eq!(req.query_param("view"), Some("Grocery List"));
    }

    #[test]
    fn connect_propagates_secret_failure() {
        struct Missing;
        impl SecretSource for Missing {
            fn get_secret(&self, name: &str) -> Result<String> {
                Err(Error::Secret {
                    name: name.to_string(),
                    status: 400,
                    body: "ParameterNotFound".to_string(),
                })
            }
        }
        let table = FakeTable::new(Vec::new(), 10);
        let err = RecordsClient::connect(&config(), &Missing, &table).unwrap_err();
        assert!(matches!(err, Error::Secret { status: 400, .. }));
    }
}
