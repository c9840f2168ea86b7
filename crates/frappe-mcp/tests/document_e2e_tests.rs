//! End-to-end tests against a mocked Frappe site.
//!
//! wiremock stands in for the site; the tests drive the real HTTP client,
//! the document and schema services, and the MCP server.

use frappe_mcp::client::{Credentials, FrappeClient, FrappeConfig, StaticCredentials};
use frappe_mcp::documents::{DocumentService, ListRequest};
use frappe_mcp::schema::SchemaService;
use frappe_mcp::tools::{all_tools, ToolServices};
use frappe_mcp::{FrappeError, McpRequest, McpServer, RetryConfig, ToolResult};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock site plus a client configured for it.
struct TestFixture {
    site: MockServer,
    client: Arc<FrappeClient>,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    async fn with_config(adjust: impl FnOnce(&mut FrappeConfig)) -> Self {
        let site = MockServer::start().await;
        let mut config = FrappeConfig::new(site.uri(), "test-key", "test-secret");
        config.timeout_secs = 5;
        adjust(&mut config);

        let client = Arc::new(FrappeClient::new(config).expect("client"));
        Self { site, client }
    }

    fn documents(&self, retry: RetryConfig) -> DocumentService {
        DocumentService::new(self.client.clone(), retry)
    }

    async fn server(&self) -> McpServer {
        let services = ToolServices::new(self.client.clone(), self.site.uri(), fast_retry(1));
        let server = McpServer::frappe();
        server.register_tools(all_tools(&services)).await;
        server
    }
}

fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        initial_delay: Duration::from_millis(10),
        ..RetryConfig::creation(max_attempts)
    }
}

fn values(v: Value) -> Map<String, Value> {
    v.as_object().cloned().expect("object")
}

async fn call_tool(server: &McpServer, name: &str, arguments: Value) -> ToolResult {
    let request = McpRequest::new(1, "tools/call")
        .with_params(json!({"name": name, "arguments": arguments}));
    let response = server.handle_request(request).await.expect("response");
    serde_json::from_value(response.result.expect("result")).expect("tool result")
}

#[tokio::test]
async fn test_create_todo_is_verified_by_direct_fetch() {
    let fixture = TestFixture::new().await;

    Mock::given(method("POST"))
        .and(path("/api/resource/ToDo"))
        .and(header("Authorization", "token test-key:test-secret"))
        .and(body_json(json!({"description": "Call the supplier"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"name": "TODO-001", "description": "Call the supplier", "status": "Open"}
        })))
        .expect(1)
        .mount(&fixture.site)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/resource/ToDo/TODO-001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"name": "TODO-001", "description": "Call the supplier"}
        })))
        .expect(1)
        .mount(&fixture.site)
        .await;

    let created = fixture
        .documents(RetryConfig::default())
        .create("ToDo", &values(json!({"description": "Call the supplier"})))
        .await
        .unwrap();

    assert_eq!(created.name().as_deref(), Some("TODO-001"));
    assert!(created.is_verified());
    assert_eq!(created.verification.message, "Verified by direct fetch");
}

#[tokio::test]
async fn test_create_verified_by_filter_search() {
    let fixture = TestFixture::new().await;

    Mock::given(method("POST"))
        .and(path("/api/resource/Note"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"name": "NOTE-7", "title": "Standup"}
        })))
        .mount(&fixture.site)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/resource/Note/NOTE-7"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "read replica lag"})))
        .mount(&fixture.site)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/resource/Note"))
        .and(query_param("filters", r#"[["title","=","Standup"]]"#))
        .and(query_param("fields", r#"["name"]"#))
        .and(query_param("limit_page_length", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"name": "NOTE-7"}]
        })))
        .expect(1)
        .mount(&fixture.site)
        .await;

    let created = fixture
        .documents(RetryConfig::default())
        .create("Note", &values(json!({"title": "Standup"})))
        .await
        .unwrap();

    assert!(created.is_verified());
    assert_eq!(created.verification.message, "Verified by filter search");
}

#[tokio::test]
async fn test_create_with_retry_reissues_insert_until_attempts_run_out() {
    let fixture = TestFixture::new().await;

    Mock::given(method("POST"))
        .and(path("/api/resource/ToDo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"name": "TODO-404"}
        })))
        .expect(3)
        .mount(&fixture.site)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/resource/ToDo/TODO-404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "exception": "frappe.exceptions.DoesNotExistError: ToDo TODO-404 not found"
        })))
        .mount(&fixture.site)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/resource/ToDo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&fixture.site)
        .await;

    let err = fixture
        .documents(fast_retry(3))
        .create_with_retry("ToDo", &values(json!({"description": "Ghost"})), None)
        .await
        .unwrap_err();

    match err {
        FrappeError::Verification { doctype, name, message } => {
            assert_eq!(doctype, "ToDo");
            assert_eq!(name, "TODO-404");
            assert_eq!(message, "No documents found matching filters");
        }
        other => panic!("expected a verification error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_list_doctypes_in_module_preserves_order() {
    let fixture = TestFixture::new().await;

    Mock::given(method("GET"))
        .and(path("/api/resource/DocType"))
        .and(query_param("filters", r#"[["module","=","Core"]]"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"name": "User"}, {"name": "DocType"}, {"name": "Role"}]
        })))
        .expect(1)
        .mount(&fixture.site)
        .await;

    let request = ListRequest {
        filters: Some(json!({"module": "Core"})),
        ..ListRequest::default()
    };
    let docs = fixture
        .documents(RetryConfig::default())
        .list("DocType", &request)
        .await
        .unwrap();

    let names: Vec<_> = docs.iter().map(|d| d["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["User", "DocType", "Role"]);
}

#[tokio::test]
async fn test_forbidden_is_authentication_error() {
    let fixture = TestFixture::new().await;

    Mock::given(method("GET"))
        .and(path("/api/resource/ToDo/TODO-001"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "exception": "frappe.exceptions.PermissionError",
            "_server_messages": "[\"{\\\"message\\\": \\\"Not permitted\\\"}\"]"
        })))
        .mount(&fixture.site)
        .await;

    let err = fixture
        .documents(RetryConfig::default())
        .get("ToDo", "TODO-001", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, FrappeError::Authentication(_)));
    assert_eq!(err.status_code(), Some(403));
    assert!(err.to_string().starts_with("Authentication failed during get_document(ToDo)"));
}

#[tokio::test]
async fn test_missing_document_is_not_found() {
    let fixture = TestFixture::new().await;

    Mock::given(method("GET"))
        .and(path("/api/resource/ToDo/NOPE"))
        .and(query_param("fields", r#"["name"]"#))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "exception": "frappe.exceptions.DoesNotExistError: ToDo NOPE not found"
        })))
        .mount(&fixture.site)
        .await;

    let exists = fixture
        .documents(RetryConfig::default())
        .exists("ToDo", "NOPE")
        .await
        .unwrap();

    assert!(!exists);
}

#[tokio::test]
async fn test_schema_falls_back_to_doctype_record() {
    let fixture = TestFixture::new().await;

    Mock::given(method("GET"))
        .and(path("/api/method/frappe.desk.form.load.getdoctype"))
        .and(query_param("doctype", "ToDo"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"exc_type": "Exception"})))
        .expect(1)
        .mount(&fixture.site)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/resource/DocType/ToDo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "name": "ToDo",
                "module": "Desk",
                "track_changes": 1,
                "fields": [
                    {"fieldname": "status", "fieldtype": "Select", "options": "Open\nClosed\nCancelled"}
                ]
            }
        })))
        .expect(1)
        .mount(&fixture.site)
        .await;

    let schema = SchemaService::new(fixture.client.clone())
        .get_schema("ToDo")
        .await
        .unwrap();

    assert_eq!(schema.module.as_deref(), Some("Desk"));
    assert!(schema.track_changes);
    assert_eq!(schema.field("status").unwrap().fieldtype, "Select");
}

#[tokio::test]
async fn test_tool_error_renders_message_and_details() {
    let fixture = TestFixture::new().await;
    let messages = serde_json::to_string(&vec![
        json!({"message": "Value missing for ToDo: Description"}).to_string(),
    ])
    .unwrap();

    Mock::given(method("POST"))
        .and(path("/api/resource/ToDo"))
        .respond_with(ResponseTemplate::new(417).set_body_json(json!({
            "_server_messages": messages
        })))
        .mount(&fixture.site)
        .await;

    let server = fixture.server().await;
    let result = call_tool(
        &server,
        "create_document",
        json!({"doctype": "ToDo", "values": {"status": "Open"}}),
    )
    .await;

    assert!(result.is_error);
    let text = result.first_text().unwrap();
    let (message, details) = text.split_once("\n\nDetails:\n").unwrap();
    assert_eq!(
        message,
        "Error during create_document(ToDo): Value missing for ToDo: Description"
    );
    let details: Value = serde_json::from_str(details).unwrap();
    assert_eq!(details["statusCode"], json!(417));
    assert!(details["endpoint"].as_str().unwrap().ends_with("/api/resource/ToDo"));
}

#[tokio::test]
async fn test_missing_credentials_fail_as_authentication() {
    let fixture = TestFixture::with_config(|config| {
        config.api_key = None;
        config.api_secret = None;
    })
    .await;

    Mock::given(method("GET"))
        .and(path("/api/resource/ToDo"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "exc_type": "AuthenticationError"
        })))
        .mount(&fixture.site)
        .await;

    let server = fixture.server().await;
    let result = call_tool(&server, "list_documents", json!({"doctype": "ToDo"})).await;

    assert!(result.is_error);
    assert!(result
        .first_text()
        .unwrap()
        .contains("API key and API secret are missing"));
}

#[tokio::test]
async fn test_credential_provider_overrides_configured_token() {
    let site = MockServer::start().await;
    let config = FrappeConfig::new(site.uri(), "stale-key", "stale-secret");
    let provider = StaticCredentials::new(Credentials::new("rotated-key", "rotated-secret"));
    let client = Arc::new(FrappeClient::with_credentials(config, Arc::new(provider)).expect("client"));

    Mock::given(method("GET"))
        .and(path("/api/resource/ToDo/TODO-001"))
        .and(header("Authorization", "token rotated-key:rotated-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"name": "TODO-001"}
        })))
        .expect(1)
        .mount(&site)
        .await;

    let doc = DocumentService::new(client, RetryConfig::default())
        .get("ToDo", "TODO-001", &[])
        .await
        .unwrap();

    assert_eq!(doc["name"], json!("TODO-001"));
}

#[tokio::test]
async fn test_tools_list_over_the_server() {
    let fixture = TestFixture::new().await;
    let server = fixture.server().await;

    let response = server
        .handle_request(McpRequest::new(1, "tools/list"))
        .await
        .unwrap();

    let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
    assert_eq!(tools.len(), 14);
    assert!(tools.iter().all(|t| t.get("inputSchema").is_some()));
}
