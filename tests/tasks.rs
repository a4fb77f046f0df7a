use actix_web::cookie::Cookie;
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use taskgate::auth::{CredentialStore, DemoCredentials, SessionAuthorizer};
use taskgate::middleware::{
    security_headers, CsrfMiddleware, HttpMetrics, MetricsMiddleware, RequestIdMiddleware,
    RequestLogger,
};
use taskgate::repository::InMemoryTaskRepository;
use taskgate::routes::{self, health, metrics, ServiceName};
use taskgate::service::TaskService;

const SESSION: &str = "demo-session-123";
const CSRF: &str = "demo-csrf-456";

// Inline App setup with the production middleware chain and an in-memory store.
macro_rules! tasks_app {
    ($metrics:expr) => {{
        let credentials: Arc<dyn CredentialStore> = Arc::new(DemoCredentials);
        test::init_service(
            App::new()
                .app_data(web::Data::new(TaskService::new(Arc::new(
                    InMemoryTaskRepository::new(),
                ))))
                .app_data(web::Data::new(SessionAuthorizer::CookieSession(credentials)))
                .app_data(web::Data::from($metrics.clone()))
                .app_data(web::Data::new(ServiceName("tasks")))
                .service(health::health)
                .service(metrics::metrics)
                .configure(routes::tasks_config)
                .wrap(CsrfMiddleware)
                .wrap(security_headers())
                .wrap(MetricsMiddleware::new($metrics.clone()))
                .wrap(RequestLogger)
                .wrap(RequestIdMiddleware),
        )
        .await
    }};
}

fn new_metrics() -> Arc<HttpMetrics> {
    Arc::new(HttpMetrics::new().unwrap())
}

/// A request carrying a valid session and matching CSRF cookie/header.
fn authed(req: test::TestRequest) -> test::TestRequest {
    req.cookie(Cookie::new("session_id", SESSION))
        .cookie(Cookie::new("csrf_token", CSRF))
        .insert_header(("X-CSRF-Token", CSRF))
}

async fn create_task(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
    >,
    body: Value,
) -> Value {
    let req = authed(test::TestRequest::post().uri("/v1/tasks"))
        .set_json(&body)
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED, "create failed for {}", body);
    test::read_body_json(resp).await
}

#[actix_rt::test]
async fn test_task_crud_flow() {
    let metrics = new_metrics();
    let app = tasks_app!(metrics);

    // Create
    let req = authed(test::TestRequest::post().uri("/v1/tasks"))
        .set_json(json!({
            "title": "Write report",
            "description": "quarterly",
            "due_date": "2030-01-01"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("t_"));
    assert_eq!(created["title"], "Write report");
    assert_eq!(created["description"], "quarterly");
    assert_eq!(created["due_date"], "2030-01-01");
    assert_eq!(created["done"], false);
    assert!(created.get("created_at").is_none());

    // Get
    let req = authed(test::TestRequest::get().uri(&format!("/v1/tasks/{}", id))).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Value = test::read_body_json(resp).await;
    assert_eq!(fetched, created);

    // List
    let req = authed(test::TestRequest::get().uri("/v1/tasks")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let listed: Value = test::read_body_json(resp).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // Patch only `done`
    let req = authed(test::TestRequest::patch().uri(&format!("/v1/tasks/{}", id)))
        .set_json(json!({ "done": true }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = test::read_body_json(resp).await;
    assert_eq!(updated["done"], true);
    assert_eq!(updated["title"], "Write report");
    assert_eq!(updated["description"], "quarterly");
    assert_eq!(updated["due_date"], "2030-01-01");

    // Delete twice
    let req = authed(test::TestRequest::delete().uri(&format!("/v1/tasks/{}", id))).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = authed(test::TestRequest::delete().uri(&format!("/v1/tasks/{}", id))).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "task not found");
}

#[actix_rt::test]
async fn test_missing_or_invalid_session_is_rejected() {
    let metrics = new_metrics();
    let app = tasks_app!(metrics);

    let req = test::TestRequest::get().uri("/v1/tasks").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "unauthorized - session cookie missing");

    let req = test::TestRequest::get()
        .uri("/v1/tasks")
        .cookie(Cookie::new("session_id", "forged"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "unauthorized - invalid session");

    // CSRF passes, session does not.
    let req = test::TestRequest::post()
        .uri("/v1/tasks")
        .cookie(Cookie::new("csrf_token", CSRF))
        .insert_header(("X-CSRF-Token", CSRF))
        .set_json(json!({ "title": "x" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_csrf_double_submit() {
    let metrics = new_metrics();
    let app = tasks_app!(metrics);

    let cases = [
        (None, None, "CSRF token missing in cookies"),
        (Some(CSRF), None, "X-CSRF-Token header missing"),
        (Some(CSRF), Some("other"), "CSRF token mismatch"),
    ];

    for (cookie, header_value, expected) in cases {
        let mut req = test::TestRequest::post()
            .uri("/v1/tasks")
            .cookie(Cookie::new("session_id", SESSION))
            .set_json(json!({ "title": "blocked" }));
        if let Some(cookie) = cookie {
            req = req.cookie(Cookie::new("csrf_token", cookie));
        }
        if let Some(value) = header_value {
            req = req.insert_header(("X-CSRF-Token", value));
        }

        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "case {}", expected);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], expected);
    }

    // Nothing was stored.
    let req = authed(test::TestRequest::get().uri("/v1/tasks")).to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed, json!([]));
}

#[actix_rt::test]
async fn test_create_validation() {
    let metrics = new_metrics();
    let app = tasks_app!(metrics);

    let req = authed(test::TestRequest::post().uri("/v1/tasks"))
        .set_json(json!({ "title": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "title is required");

    let req = authed(test::TestRequest::post().uri("/v1/tasks"))
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid request body");
}

#[actix_rt::test]
async fn test_text_fields_are_escaped() {
    let metrics = new_metrics();
    let app = tasks_app!(metrics);

    let created = create_task(
        &app,
        json!({
            "title": "<script>alert(1)</script>",
            "description": "Tom & \"Jerry\""
        }),
    )
    .await;
    assert_eq!(created["title"], "&lt;script&gt;alert(1)&lt;/script&gt;");
    assert_eq!(created["description"], "Tom &amp; &quot;Jerry&quot;");
    assert!(created.get("due_date").is_none());
}

#[actix_rt::test]
async fn test_unknown_task_is_not_found() {
    let metrics = new_metrics();
    let app = tasks_app!(metrics);

    let req = authed(test::TestRequest::get().uri("/v1/tasks/t_missing")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = authed(test::TestRequest::patch().uri("/v1/tasks/t_missing"))
        .set_json(json!({ "done": true }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "task not found");
}

#[actix_rt::test]
async fn test_search_safe_and_unsafe() {
    let metrics = new_metrics();
    let app = tasks_app!(metrics);

    for title in ["O'Brien notes", "groceries"] {
        create_task(&app, json!({ "title": title })).await;
    }

    let req = authed(test::TestRequest::get().uri("/v1/tasks/search")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "search query parameter 'q' is required");

    let req = authed(test::TestRequest::get().uri("/v1/tasks/search?q=")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // The safe search escapes the query like stored titles.
    let req = authed(test::TestRequest::get().uri("/v1/tasks/search?q=O%27Brien")).to_request();
    let found: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["title"], "O&#39;Brien notes");

    let req = authed(test::TestRequest::get().uri("/v1/tasks/search?q=GROC")).to_request();
    let found: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(found[0]["title"], "groceries");

    // The unsafe search uses the raw query, which no longer matches the escaped title.
    let req = authed(test::TestRequest::get().uri("/v1/tasks/search?q=O%27Brien&unsafe=true"))
        .to_request();
    let found: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(found, json!([]));

    // Only the literal `true` switches modes.
    let req = authed(test::TestRequest::get().uri("/v1/tasks/search?q=O%27Brien&unsafe=1"))
        .to_request();
    let found: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
}

#[actix_rt::test]
async fn test_security_and_request_id_headers() {
    let metrics = new_metrics();
    let app = tasks_app!(metrics);

    let req = test::TestRequest::get()
        .uri("/health")
        .insert_header(("X-Request-ID", "req-abc"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let headers = resp.headers();
    assert_eq!(headers.get("x-request-id").unwrap(), "req-abc");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(
        headers.get("content-security-policy").unwrap(),
        "default-src 'self'"
    );
    assert_eq!(
        headers.get("referrer-policy").unwrap(),
        "strict-origin-when-cross-origin"
    );
    assert_eq!(
        headers.get("strict-transport-security").unwrap(),
        "max-age=31536000; includeSubDomains"
    );

    // Rejections carry the headers too, with a generated id.
    let req = test::TestRequest::get().uri("/v1/tasks").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(!resp.headers().get("x-request-id").unwrap().is_empty());
    assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
}

#[actix_rt::test]
async fn test_metrics_endpoint_counts_normalized_routes() {
    let metrics = new_metrics();
    let app = tasks_app!(metrics);

    let req = authed(test::TestRequest::get().uri("/v1/tasks/t_123")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post().uri("/v1/tasks").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; version=0.0.4"
    );
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();

    assert!(body.contains(
        r#"http_requests_total{method="GET",route="/v1/tasks/{id}",status="404"} 1"#
    ));
    assert!(body.contains(r#"http_requests_total{method="POST",route="/v1/tasks",status="403"} 1"#));
    assert!(body.contains("http_request_duration_seconds_bucket"));
    assert!(body.contains("http_in_flight_requests"));
}
