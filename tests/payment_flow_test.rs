//! End-to-end tests for the ICEPAY checkout and postback routes.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; ICEPAY
//! itself is replaced by a small axum server bound on an ephemeral port.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use icepay_provider::api::{self, AppState};
use icepay_provider::config::{Config, EventConfig, ServerConfig};
use icepay_provider::error::{AppError, AppResult};
use icepay_provider::orders::{
    InMemoryOrderStore, LogEntry, Order, OrderStatus, OrderStore, PaymentInfo, PaymentInfoUpdate,
    Transition,
};
use icepay_provider::payments::providers::icepay::checksum::{
    fields_for, message_checksum, request_checksum,
};
use icepay_provider::payments::providers::icepay::IcepaySettings;
use icepay_provider::payments::providers::IcepayProvider;
use icepay_provider::payments::types::PostbackChannel;
use icepay_provider::payments::ProviderRegistry;
use serde_json::{json, Value};
use tower::ServiceExt;

const MERCHANT: &str = "10000";
const SECRET: &str = "s3cr3t";

struct FakeIcepay {
    base_url: String,
    /// Every OrderID received, including the ones answered with an error
    order_ids: Mutex<Vec<String>>,
    /// Number of upcoming checkouts to answer with 503
    failures: AtomicUsize,
}

impl FakeIcepay {
    fn fail_next(&self, calls: usize) {
        self.failures.store(calls, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

async fn fake_checkout(
    State(fake): State<Arc<FakeIcepay>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let url = format!("{}/payment/checkout", fake.base_url);
    let expected = request_checksum(&url, "POST", MERCHANT, SECRET, &body);
    let provided = headers
        .get("Checksum")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if provided != expected {
        return (StatusCode::UNAUTHORIZED, "bad checksum").into_response();
    }

    let request: Value = serde_json::from_str(&body).unwrap();
    let order_id = request["OrderID"].as_str().unwrap().to_string();
    fake.order_ids.lock().unwrap().push(order_id.clone());

    if fake.take_failure() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"Message": "Service unavailable."})),
        )
            .into_response();
    }

    Json(json!({
        "PaymentScreenURL": format!("https://pay.example/{}", order_id),
        "PaymentID": 9876543,
        "ProviderTransactionID": "0050001234567890",
    }))
    .into_response()
}

async fn spawn_fake_icepay() -> Arc<FakeIcepay> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let fake = Arc::new(FakeIcepay {
        base_url: format!("http://{}", listener.local_addr().unwrap()),
        order_ids: Mutex::new(Vec::new()),
        failures: AtomicUsize::new(0),
    });

    let app = Router::new()
        .route("/payment/checkout", post(fake_checkout))
        .with_state(fake.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    fake
}

struct Harness {
    app: Router,
    store: Arc<InMemoryOrderStore>,
    fake: Arc<FakeIcepay>,
}

/// Always failing store, as when the database is down
struct UnavailableStore;

fn unavailable() -> AppError {
    AppError::storage("database unavailable")
}

#[async_trait]
impl OrderStore for UnavailableStore {
    async fn find_by_code(&self, _code: &str) -> AppResult<Option<Order>> {
        Err(unavailable())
    }

    async fn update_payment_info(
        &self,
        _code: &str,
        _update: PaymentInfoUpdate,
    ) -> AppResult<Order> {
        Err(unavailable())
    }

    async fn mark_paid(&self, _code: &str, _provider: &str) -> AppResult<Transition> {
        Err(unavailable())
    }

    async fn mark_refunded(&self, _code: &str) -> AppResult<Transition> {
        Err(unavailable())
    }

    async fn log_action(
        &self,
        _code: &str,
        _action_type: &str,
        _data: Value,
    ) -> AppResult<LogEntry> {
        Err(unavailable())
    }

    async fn log_entries(&self, _code: &str) -> AppResult<Vec<LogEntry>> {
        Err(unavailable())
    }
}

fn config(api_url: &str, max_retries: u32) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            environment: "development".to_string(),
        },
        event: EventConfig {
            slug: "conf".to_string(),
            name: "Conference".to_string(),
            currency: "EUR".to_string(),
            public_url: "https://tickets.example/conf".to_string(),
            quota: None,
            orders_file: None,
        },
        icepay: IcepaySettings {
            merchant_id: MERCHANT.to_string(),
            secret_code: SECRET.to_string(),
            api_url: api_url.to_string(),
            max_retries,
            retry_backoff_ms: 1,
            ..Default::default()
        },
    }
}

fn app_with_store(config: Config, store: Arc<dyn OrderStore>) -> Router {
    let mut registry = ProviderRegistry::new();
    let provider =
        IcepayProvider::new(config.icepay.clone(), &config.event, store.clone()).unwrap();
    registry.register(Arc::new(provider));
    api::router(AppState::new(config, registry, store))
}

async fn setup() -> Harness {
    let store = InMemoryOrderStore::new();
    store.insert(Order::pending(7, "ABC12", "xyz", "10.00")).await;
    setup_with(store, 0).await
}

async fn setup_with(store: InMemoryOrderStore, max_retries: u32) -> Harness {
    let fake = spawn_fake_icepay().await;
    let store = Arc::new(store);
    let app = app_with_store(config(&fake.base_url, max_retries), store.clone());
    Harness { app, store, fake }
}

fn form_encode(pairs: &[(&str, &str)]) -> String {
    let mut url = reqwest::Url::parse("http://localhost/").unwrap();
    url.query_pairs_mut().extend_pairs(pairs);
    url.query().unwrap_or_default().to_string()
}

fn signed_postback(channel: PostbackChannel, status: &str, order_id: &str) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = [
        ("Merchant", MERCHANT),
        ("Status", status),
        ("StatusCode", "Payment completed"),
        ("OrderID", order_id),
        ("PaymentID", "9876543"),
        ("Reference", "ABC12"),
        ("TransactionID", "0050001234567890"),
        ("Amount", "1000"),
        ("Currency", "EUR"),
        ("Duration", "0"),
        ("ConsumerIPAddress", "192.0.2.10"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let lookup: HashMap<&str, &str> = params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let values: Vec<&str> = fields_for(channel)
        .iter()
        .map(|name| lookup.get(name).copied().unwrap_or_default())
        .collect();
    let checksum = message_checksum(SECRET, &values);
    params.push(("Checksum".to_string(), checksum));
    params
}

fn encode_owned(params: &[(String, String)]) -> String {
    let pairs: Vec<(&str, &str)> = params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    form_encode(&pairs)
}

async fn post_form(app: &Router, uri: &str, body: String) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(header::ACCEPT_LANGUAGE, "en")
                .header("x-forwarded-for", "192.0.2.10")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn order(store: &InMemoryOrderStore) -> Order {
    store.find_by_code("ABC12").await.unwrap().unwrap()
}

#[tokio::test]
async fn test_each_checkout_gets_a_new_reference() {
    let h = setup().await;
    let body = form_encode(&[("issuer", "ING")]);

    let first = post_form(&h.app, "/orders/ABC12/xyz/pay/icepay", body.clone()).await;
    assert_eq!(first.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&first), "https://pay.example/7-1");

    let second = post_form(&h.app, "/orders/ABC12/xyz/pay/icepay", body).await;
    assert_eq!(location(&second), "https://pay.example/7-2");

    assert_eq!(*h.fake.order_ids.lock().unwrap(), vec!["7-1", "7-2"]);

    let info = PaymentInfo::from_order(&order(&h.store).await).unwrap();
    assert_eq!(info.attempts, 2);
    assert_eq!(info.payment_id.as_deref(), Some("9876543"));
}

#[tokio::test]
async fn test_checkout_with_wrong_secret_is_not_found() {
    let h = setup().await;
    let response = post_form(
        &h.app,
        "/orders/ABC12/guess/pay/icepay",
        form_encode(&[("issuer", "ING")]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(h.fake.order_ids.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_without_issuer_asks_for_bank() {
    let h = setup().await;
    let response = post_form(&h.app, "/orders/ABC12/xyz/pay/icepay", String::new()).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response);
    assert!(target.starts_with("https://tickets.example/conf/order/ABC12/xyz/?message="));
    assert!(target.contains("select+your+bank"));
    assert!(order(&h.store).await.payment_info.is_none());
}

#[tokio::test]
async fn test_gateway_error_redirects_with_localized_message() {
    let h = setup().await;
    h.fake.fail_next(usize::MAX);

    let response = post_form(
        &h.app,
        "/orders/ABC12/xyz/pay/icepay",
        form_encode(&[("issuer", "RABOBANK")]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response);
    assert!(target.starts_with("https://tickets.example/conf/order/ABC12/xyz/?message="));
    assert!(target.contains("ICEPAY"));
    assert_eq!(order(&h.store).await.status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_duplicate_webhook_pays_once() {
    let h = setup().await;
    let body = encode_owned(&signed_postback(PostbackChannel::Webhook, "OK", "7-1"));

    let first = post_form(&h.app, "/icepay/webhook", body.clone()).await;
    assert_eq!(first.status(), StatusCode::OK);
    let paid = order(&h.store).await;
    assert_eq!(paid.status, OrderStatus::Paid);
    assert_eq!(paid.payment_provider.as_deref(), Some("icepay"));

    let second = post_form(&h.app, "/icepay/webhook", body).await;
    assert_eq!(second.status(), StatusCode::OK);
    let still_paid = order(&h.store).await;
    assert_eq!(still_paid.status, OrderStatus::Paid);
    assert_eq!(still_paid.paid_at, paid.paid_at);

    assert_eq!(h.store.log_entries("ABC12").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_webhook_with_bad_checksum_is_rejected() {
    let h = setup().await;
    let mut params = signed_postback(PostbackChannel::Webhook, "ERR", "7-1");
    for (key, value) in params.iter_mut() {
        if key == "Status" {
            *value = "OK".to_string();
        }
    }

    let response = post_form(&h.app, "/icepay/webhook", encode_owned(&params)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let untouched = order(&h.store).await;
    assert_eq!(untouched.status, OrderStatus::Pending);
    assert!(untouched.payment_info.is_none());
    assert!(h.store.log_entries("ABC12").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_status_never_pays() {
    let h = setup().await;
    for status in ["ERR", "OPEN", "AUTHORIZED"] {
        let body = encode_owned(&signed_postback(PostbackChannel::Webhook, status, "7-1"));
        let response = post_form(&h.app, "/icepay/webhook", body).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(order(&h.store).await.status, OrderStatus::Pending);
    }
}

#[tokio::test]
async fn test_refund_after_payment() {
    let h = setup().await;
    let paid = encode_owned(&signed_postback(PostbackChannel::Webhook, "OK", "7-1"));
    post_form(&h.app, "/icepay/webhook", paid).await;

    let refund = encode_owned(&signed_postback(PostbackChannel::Webhook, "REFUND", "7-1"));
    let response = post_form(&h.app, "/icepay/webhook", refund).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(order(&h.store).await.status, OrderStatus::Refunded);
}

#[tokio::test]
async fn test_browser_return_marks_paid_and_redirects() {
    let h = setup().await;
    let query = encode_owned(&signed_postback(PostbackChannel::BrowserReturn, "OK", "7-1"));

    let response = get(&h.app, &format!("/icepay/result?{}", query)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "https://tickets.example/conf/order/ABC12/xyz/?paid=yes"
    );
    assert_eq!(order(&h.store).await.status, OrderStatus::Paid);
}

#[tokio::test]
async fn test_browser_return_with_error_status() {
    let h = setup().await;
    let query = encode_owned(&signed_postback(PostbackChannel::BrowserReturn, "ERR", "7-1"));

    let response = get(&h.app, &format!("/icepay/failure?{}", query)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).contains("message="));
    assert_eq!(order(&h.store).await.status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_unknown_provider_is_not_found() {
    let h = setup().await;
    let response = post_form(&h.app, "/paypal/webhook", String::new()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_lists_providers() {
    let h = setup().await;
    let response = get(&h.app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["providers"], json!(["icepay"]));
    assert_eq!(health["icepay_configured"], json!(true));
}

#[tokio::test]
async fn test_issuer_choices_are_localized() {
    let h = setup().await;
    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/icepay/issuers")
                .header(header::ACCEPT_LANGUAGE, "nl-NL")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let fields: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(fields[0]["name"], json!("issuer"));
    assert_eq!(fields[0]["choices"][0], json!(["", "Je bank"]));
}

#[tokio::test]
async fn test_order_log_shows_reported_events() {
    let h = setup().await;
    let failed = encode_owned(&signed_postback(PostbackChannel::Webhook, "ERR", "7-1"));
    post_form(&h.app, "/icepay/webhook", failed).await;
    let paid = encode_owned(&signed_postback(PostbackChannel::Webhook, "OK", "7-2"));
    post_form(&h.app, "/icepay/webhook", paid).await;

    let response = get(&h.app, "/orders/ABC12/xyz/log").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let lines: Vec<String> = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        lines,
        vec![
            "ICEPAY reported an event: Payment failed. Reason: Payment completed",
            "ICEPAY reported an event: Payment succeeded.",
        ]
    );

    let hidden = get(&h.app, "/orders/ABC12/guess/log").await;
    assert_eq!(hidden.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_provider_settings_form() {
    let h = setup().await;
    let response = get(&h.app, "/icepay/settings").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let settings: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(settings["identifier"], json!("icepay"));
    assert_eq!(settings["name"], json!("iDEAL via ICEPAY"));
    assert_eq!(settings["fields"][0]["name"], json!("merchant_id"));
    assert_eq!(settings["fields"][1]["name"], json!("secret_code"));
}

#[tokio::test]
async fn test_retried_checkout_sends_a_fresh_reference() {
    let store = InMemoryOrderStore::new();
    store.insert(Order::pending(7, "ABC12", "xyz", "10.00")).await;
    let h = setup_with(store, 1).await;
    h.fake.fail_next(1);

    let response = post_form(
        &h.app,
        "/orders/ABC12/xyz/pay/icepay",
        form_encode(&[("issuer", "ING")]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "https://pay.example/7-2");
    assert_eq!(*h.fake.order_ids.lock().unwrap(), vec!["7-1", "7-2"]);
    let info = PaymentInfo::from_order(&order(&h.store).await).unwrap();
    assert_eq!(info.attempts, 2);
}

#[tokio::test]
async fn test_expired_order_cannot_be_checked_out() {
    let store = InMemoryOrderStore::new();
    let mut expired = Order::pending(7, "ABC12", "xyz", "10.00");
    expired.status = OrderStatus::Expired;
    store.insert(expired).await;
    let h = setup_with(store, 0).await;

    let response = post_form(
        &h.app,
        "/orders/ABC12/xyz/pay/icepay",
        form_encode(&[("issuer", "ING")]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response);
    assert!(target.starts_with("https://tickets.example/conf/order/ABC12/xyz/?message="));
    assert!(target.contains("cannot+be+paid"));
    assert!(h.fake.order_ids.lock().unwrap().is_empty());
    assert!(order(&h.store).await.payment_info.is_none());
}

#[tokio::test]
async fn test_webhook_pays_order_with_foreign_payment_info() {
    let store = InMemoryOrderStore::new();
    let mut order_with_blob = Order::pending(7, "ABC12", "xyz", "10.00");
    order_with_blob.payment_info = Some(r#"["stripe-charge"]"#.to_string());
    store.insert(order_with_blob).await;
    let h = setup_with(store, 0).await;

    let body = encode_owned(&signed_postback(PostbackChannel::Webhook, "OK", "7-1"));
    for _ in 0..2 {
        let response = post_form(&h.app, "/icepay/webhook", body.clone()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(order(&h.store).await.status, OrderStatus::Paid);
}

#[tokio::test]
async fn test_webhook_asks_for_redelivery_when_store_is_down() {
    let app = app_with_store(config("http://127.0.0.1:9", 0), Arc::new(UnavailableStore));

    let body = encode_owned(&signed_postback(PostbackChannel::Webhook, "OK", "7-1"));
    let response = post_form(&app, "/icepay/webhook", body).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

async fn sold_out() -> Harness {
    let store = InMemoryOrderStore::with_quota(1);
    store.insert(Order::pending(1, "HOLD1", "abc", "10.00")).await;
    let mut expired = Order::pending(7, "ABC12", "xyz", "10.00");
    expired.status = OrderStatus::Expired;
    store.insert(expired).await;
    setup_with(store, 0).await
}

#[tokio::test]
async fn test_webhook_acknowledges_payment_beyond_quota() {
    let h = sold_out().await;

    let body = encode_owned(&signed_postback(PostbackChannel::Webhook, "OK", "7-1"));
    let response = post_form(&h.app, "/icepay/webhook", body).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(order(&h.store).await.status, OrderStatus::Expired);
}

#[tokio::test]
async fn test_browser_return_beyond_quota_shows_quota_message() {
    let h = sold_out().await;
    let query = encode_owned(&signed_postback(PostbackChannel::BrowserReturn, "OK", "7-1"));

    let response = get(&h.app, &format!("/icepay/result?{}", query)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response);
    assert!(target.starts_with("https://tickets.example/conf/order/ABC12/xyz/?message="));
    assert!(target.contains("tickets+in+your+order+are+no+longer+available"));
    assert_eq!(order(&h.store).await.status, OrderStatus::Expired);
}

#[tokio::test]
async fn test_lowercase_ok_status_does_not_pay() {
    let h = setup().await;
    let body = encode_owned(&signed_postback(PostbackChannel::Webhook, "ok", "7-1"));

    let response = post_form(&h.app, "/icepay/webhook", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(order(&h.store).await.status, OrderStatus::Pending);
}
