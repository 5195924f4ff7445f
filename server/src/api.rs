//! # REST API
//!
//! Builds the axum router that exposes the vending machine's HTTP
//! interface. All endpoints share application state through axum's
//! `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                | Description                              |
//! |--------|---------------------|------------------------------------------|
//! | PUT    | `/`                 | Insert a coin                            |
//! | DELETE | `/`                 | Eject held coins                         |
//! | GET    | `/health`           | Liveness probe                           |
//! | GET    | `/status`           | Machine status summary                   |
//! | GET    | `/inventory`        | Stock counts for all slots               |
//! | GET    | `/inventory/:id`    | Stock count for one slot                 |
//! | PUT    | `/inventory/:id`    | Purchase one unit from a slot            |
//! | POST   | `/inventory/reset`  | Restore the seed catalog (admin only)    |
//!
//! Every response that can move coins carries an `X-Coins` header — on
//! failures too — so a client can reconcile its balance after any call.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use vendo_machine::config::ACCEPTED_COIN;
use vendo_machine::inventory::{Inventory, ItemId};
use vendo_machine::machine::{DispenseOutcome, VendingMachine};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The service's reported version string.
    pub version: String,
    /// The one machine unit, behind the single exclusive lock. Every
    /// operation — reads included — goes through it, so a purchase commits
    /// its whole critical section (stock, balance, snapshot write) without
    /// interleaving.
    pub machine: Arc<Mutex<VendingMachine>>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
    /// Credentials for the admin reset endpoint.
    pub admin: Arc<AdminAuth>,
}

// ---------------------------------------------------------------------------
// Admin Authentication
// ---------------------------------------------------------------------------

/// HTTP Basic credentials for the admin surface.
#[derive(Debug)]
pub struct AdminAuth {
    user: String,
    password: String,
}

impl AdminAuth {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Checks an `Authorization: Basic <base64>` header against the
    /// configured credentials. The comparison is constant-time so the
    /// response latency leaks nothing about how much of the secret matched.
    fn authorizes(&self, headers: &HeaderMap) -> bool {
        let Some(value) = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        else {
            return false;
        };
        let Some(encoded) = value.strip_prefix("Basic ") else {
            return false;
        };
        let Ok(decoded) =
            base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded)
        else {
            return false;
        };

        let expected = format!("{}:{}", self.user, self.password);
        constant_time_eq::constant_time_eq(&decoded, expected.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
///
/// The returned router is ready to be served on the configured API port.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT, Method::POST, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/", put(insert_coin_handler).delete(eject_coins_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/inventory", get(inventory_handler))
        .route(
            "/inventory/:id",
            get(item_stock_handler).put(dispense_handler),
        )
        .route("/inventory/reset", post(reset_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Request body for `PUT /` — one coin at a time.
#[derive(Debug, Deserialize)]
pub struct CoinRequest {
    /// Denomination of the inserted coin. Only value 1 is accepted.
    pub coin: u64,
}

/// Response payload for a successful purchase.
#[derive(Debug, Serialize, Deserialize)]
pub struct DispenseResponse {
    /// Units dispensed. Always 1.
    pub quantity: u32,
}

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Service software version.
    pub version: String,
    /// Number of slots in the catalog.
    pub items: usize,
    /// Sum of stock across all slots.
    pub total_stock: u64,
    /// Coin balance currently held.
    pub coins: u64,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Generic error body returned by endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the service is alive.
///
/// This is the liveness probe for orchestrators. It intentionally does not
/// touch the machine lock — that belongs in `/status`.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — returns a machine status summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let machine = state.machine.lock().await;
    let resp = StatusResponse {
        version: state.version.clone(),
        items: machine.inventory().len(),
        total_stock: machine.inventory().total_stock(),
        coins: machine.coins(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    Json(resp)
}

/// `PUT /` — inserts a coin.
///
/// Returns 204 with the new balance in `X-Coins`. Coins of any other
/// denomination are rejected here with 422 — the core would ignore them
/// silently, but the API tells the caller why nothing happened.
async fn insert_coin_handler(
    State(state): State<AppState>,
    Json(req): Json<CoinRequest>,
) -> impl IntoResponse {
    if req.coin != ACCEPTED_COIN {
        let balance = state.machine.lock().await.coins();
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            [("x-coins", balance.to_string())],
            Json(ErrorResponse {
                error: format!("only coins of value {ACCEPTED_COIN} are accepted"),
            }),
        )
            .into_response();
    }

    let balance = state.machine.lock().await.insert_coin(req.coin);

    state.metrics.coins_inserted_total.inc();
    state.metrics.coin_balance.set(balance as i64);

    (StatusCode::NO_CONTENT, [("x-coins", balance.to_string())]).into_response()
}

/// `DELETE /` — ejects all held coins.
///
/// Returns 204 with the ejected amount in `X-Coins`. Safe to repeat — an
/// empty machine ejects 0.
async fn eject_coins_handler(State(state): State<AppState>) -> impl IntoResponse {
    let returned = state.machine.lock().await.eject_coins();

    state.metrics.coins_returned_total.inc_by(returned);
    state.metrics.coin_balance.set(0);

    (StatusCode::NO_CONTENT, [("x-coins", returned.to_string())])
}

/// `GET /inventory` — stock counts for every slot, in catalog order.
async fn inventory_handler(State(state): State<AppState>) -> impl IntoResponse {
    let levels = state.machine.lock().await.stock_levels();
    Json(levels)
}

/// `GET /inventory/:id` — stock count for one slot.
///
/// Returns the bare integer, or 404 if the id isn't in the catalog.
async fn item_stock_handler(
    Path(id): Path<ItemId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.machine.lock().await.stock_of(id) {
        Some(stock) => (StatusCode::OK, Json(serde_json::json!(stock))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("item {id} not found"),
            }),
        )
            .into_response(),
    }
}

/// `PUT /inventory/:id` — purchases one unit from a slot.
///
/// Success: 200 with `{"quantity": 1}`, change in `X-Coins`, and the new
/// stock count in `X-Inventory-Remaining`. An unknown or empty slot is 404
/// and a short balance is 403, both with the unchanged balance in
/// `X-Coins`. A failed snapshot write is 500.
async fn dispense_handler(
    Path(id): Path<ItemId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let timer = state.metrics.dispense_latency_seconds.start_timer();
    let outcome = state.machine.lock().await.dispense(id);
    timer.observe_duration();

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(item = id, "failed to persist inventory: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("inventory store error: {e}"),
                }),
            )
                .into_response();
        }
    };

    match outcome {
        DispenseOutcome::Vended {
            change,
            quantity,
            remaining,
        } => {
            state.metrics.items_dispensed_total.inc();
            state.metrics.coins_returned_total.inc_by(change);
            state.metrics.coin_balance.set(0);

            (
                StatusCode::OK,
                [
                    ("x-coins", change.to_string()),
                    ("x-inventory-remaining", remaining.to_string()),
                ],
                Json(DispenseResponse { quantity }),
            )
                .into_response()
        }
        DispenseOutcome::NotAvailable { balance } => {
            state.metrics.dispense_rejections_total.inc();
            (
                StatusCode::NOT_FOUND,
                [("x-coins", balance.to_string())],
                Json(ErrorResponse {
                    error: format!("item {id} not available"),
                }),
            )
                .into_response()
        }
        DispenseOutcome::InsufficientFunds { balance } => {
            state.metrics.dispense_rejections_total.inc();
            (
                StatusCode::FORBIDDEN,
                [("x-coins", balance.to_string())],
                Json(ErrorResponse {
                    error: format!("insufficient coins for item {id}"),
                }),
            )
                .into_response()
        }
    }
}

/// `POST /inventory/reset` — restores the seed catalog.
///
/// Requires HTTP Basic credentials matching the configured admin user.
/// Restocks every slot to its seeded level and persists the snapshot.
async fn reset_handler(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if !state.admin.authorizes(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            [("www-authenticate", "Basic realm=\"vendo-admin\"")],
            Json(ErrorResponse {
                error: "invalid admin credentials".to_string(),
            }),
        )
            .into_response();
    }

    let result = state
        .machine
        .lock()
        .await
        .reset_inventory(Inventory::seed());

    match result {
        Ok(()) => {
            state.metrics.inventory_resets_total.inc();
            tracing::info!("admin inventory reset");
            (
                StatusCode::OK,
                Json(serde_json::json!({ "message": "inventory restored" })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("failed to persist inventory reset: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("inventory store error: {e}"),
                }),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use vendo_machine::inventory::Item;
    use vendo_machine::store::JsonStore;

    /// Builds a test router over a temp-dir store seeded with the given
    /// slots. The TempDir keeps the snapshot alive for the test's duration.
    fn test_router(items: &[(ItemId, u64, u64)]) -> (tempfile::TempDir, JsonStore, Router) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonStore::new(dir.path().join("beverages.json"));

        let mut inventory = Inventory::new();
        for (id, price, stock) in items {
            inventory.insert(*id, Item::new(format!("Item {id}"), *price, *stock));
        }
        let machine = VendingMachine::provision(store.clone(), inventory).expect("provision");

        let state = AppState {
            version: "0.1.0-test".into(),
            machine: Arc::new(Mutex::new(machine)),
            metrics: Arc::new(crate::metrics::MachineMetrics::new()),
            admin: Arc::new(AdminAuth::new("admin", "hunter2")),
        };
        (dir, store, create_router(state))
    }

    /// One catalog slot most tests use: id 1, price 2, stock 5.
    fn default_router() -> (tempfile::TempDir, JsonStore, Router) {
        test_router(&[(1, 2, 5)])
    }

    /// Sends a request and returns (status, headers, body_bytes).
    async fn send(
        router: &Router,
        method: &str,
        path: &str,
        body: Option<serde_json::Value>,
        auth: Option<&str>,
    ) -> (StatusCode, HeaderMap, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(auth) = auth {
            builder = builder.header("authorization", auth);
        }
        let req = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, headers, body)
    }

    /// Inserts `n` coins of value 1.
    async fn insert_coins(router: &Router, n: u64) {
        for _ in 0..n {
            let (status, _, _) =
                send(router, "PUT", "/", Some(serde_json::json!({"coin": 1})), None).await;
            assert_eq!(status, StatusCode::NO_CONTENT);
        }
    }

    fn coins_header(headers: &HeaderMap) -> &str {
        headers
            .get("x-coins")
            .expect("x-coins header present")
            .to_str()
            .unwrap()
    }

    fn basic(user: &str, password: &str) -> String {
        let encoded = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            format!("{user}:{password}"),
        );
        format!("Basic {encoded}")
    }

    // -- 1. Health endpoint --------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let (_dir, _store, router) = default_router();
        let (status, _, body) = send(&router, "GET", "/health", None, None).await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    // -- 2. Inserting a coin reports the running balance ---------------------

    #[tokio::test]
    async fn insert_coin_returns_balance_header() {
        let (_dir, _store, router) = default_router();

        let (status, headers, _) =
            send(&router, "PUT", "/", Some(serde_json::json!({"coin": 1})), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(coins_header(&headers), "1");

        let (_, headers, _) =
            send(&router, "PUT", "/", Some(serde_json::json!({"coin": 1})), None).await;
        assert_eq!(coins_header(&headers), "2");
    }

    // -- 3. Wrong denomination is rejected, balance untouched -----------------

    #[tokio::test]
    async fn wrong_coin_is_rejected_with_422() {
        let (_dir, _store, router) = default_router();
        insert_coins(&router, 1).await;

        let (status, headers, body) =
            send(&router, "PUT", "/", Some(serde_json::json!({"coin": 2})), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(coins_header(&headers), "1");
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("accepted"));
    }

    // -- 4. Eject returns the balance, then zero ------------------------------

    #[tokio::test]
    async fn eject_returns_balance_then_zero() {
        let (_dir, _store, router) = default_router();
        insert_coins(&router, 3).await;

        let (status, headers, _) = send(&router, "DELETE", "/", None, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(coins_header(&headers), "3");

        // Idempotent: a second eject returns 0.
        let (_, headers, _) = send(&router, "DELETE", "/", None, None).await;
        assert_eq!(coins_header(&headers), "0");
    }

    // -- 5. Inventory listing in slot order -----------------------------------

    #[tokio::test]
    async fn inventory_lists_stock_in_slot_order() {
        let (_dir, _store, router) = test_router(&[(1, 2, 5), (2, 1, 9), (3, 3, 0)]);

        let (status, _, body) = send(&router, "GET", "/inventory", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let levels: Vec<u64> = serde_json::from_slice(&body).unwrap();
        assert_eq!(levels, vec![5, 9, 0]);
    }

    // -- 6. Single-slot stock query -------------------------------------------

    #[tokio::test]
    async fn item_stock_returns_bare_integer() {
        let (_dir, _store, router) = default_router();

        let (status, _, body) = send(&router, "GET", "/inventory/1", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let stock: u64 = serde_json::from_slice(&body).unwrap();
        assert_eq!(stock, 5);
    }

    // -- 7. Unknown slot is 404 ------------------------------------------------

    #[tokio::test]
    async fn item_stock_unknown_slot_is_404() {
        let (_dir, _store, router) = default_router();

        let (status, _, body) = send(&router, "GET", "/inventory/123", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("not found"));
    }

    // -- 8. Successful purchase -------------------------------------------------

    #[tokio::test]
    async fn purchase_vends_with_change_and_persists() {
        let (_dir, store, router) = default_router();
        insert_coins(&router, 3).await;

        let (status, headers, body) = send(&router, "PUT", "/inventory/1", None, None).await;
        assert_eq!(status, StatusCode::OK);

        let resp: DispenseResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.quantity, 1);
        // price 2, three coins in: one coin of change, four units left.
        assert_eq!(coins_header(&headers), "1");
        assert_eq!(
            headers.get("x-inventory-remaining").unwrap().to_str().unwrap(),
            "4"
        );

        // The snapshot on disk reflects the vend.
        let snapshot = store.load().expect("reload snapshot");
        assert_eq!(snapshot.stock_of(1), Some(4));

        // The machine keeps nothing: the next eject returns 0.
        let (_, headers, _) = send(&router, "DELETE", "/", None, None).await;
        assert_eq!(coins_header(&headers), "0");
    }

    // -- 9. Unknown slot purchase is 404, balance kept --------------------------

    #[tokio::test]
    async fn purchase_unknown_slot_keeps_balance() {
        let (_dir, store, router) = default_router();
        insert_coins(&router, 2).await;

        let (status, headers, _) = send(&router, "PUT", "/inventory/123", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(coins_header(&headers), "2");

        // Nothing was written.
        assert_eq!(store.load().unwrap().stock_of(1), Some(5));
    }

    // -- 10. Empty slot purchase reports the same 404 ---------------------------

    #[tokio::test]
    async fn purchase_empty_slot_reports_same_404() {
        let (_dir, _store, router) = test_router(&[(1, 2, 0)]);
        insert_coins(&router, 2).await;

        let (status, headers, _) = send(&router, "PUT", "/inventory/1", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(coins_header(&headers), "2");
    }

    // -- 11. Short balance is 403, stock and balance kept -----------------------

    #[tokio::test]
    async fn purchase_short_paid_is_403() {
        let (_dir, store, router) = default_router();
        insert_coins(&router, 1).await;

        let (status, headers, _) = send(&router, "PUT", "/inventory/1", None, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(coins_header(&headers), "1");
        assert_eq!(store.load().unwrap().stock_of(1), Some(5));

        // The balance survives for a later, fully funded attempt.
        insert_coins(&router, 1).await;
        let (status, _, _) = send(&router, "PUT", "/inventory/1", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    // -- 12. Reset requires credentials -----------------------------------------

    #[tokio::test]
    async fn reset_without_credentials_is_401() {
        let (_dir, _store, router) = default_router();

        let (status, headers, _) = send(&router, "POST", "/inventory/reset", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(headers.get("www-authenticate").is_some());
    }

    // -- 13. Reset rejects wrong and malformed credentials ----------------------

    #[tokio::test]
    async fn reset_rejects_bad_credentials() {
        let (_dir, _store, router) = default_router();

        let wrong = basic("admin", "wrong-password");
        let (status, _, _) =
            send(&router, "POST", "/inventory/reset", None, Some(&wrong)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Not even valid base64.
        let (status, _, _) =
            send(&router, "POST", "/inventory/reset", None, Some("Basic %%%%")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // -- 14. Reset restores the seed catalog ------------------------------------

    #[tokio::test]
    async fn reset_restores_seed_catalog() {
        let (_dir, store, router) = default_router();

        let auth = basic("admin", "hunter2");
        let (status, _, body) =
            send(&router, "POST", "/inventory/reset", None, Some(&auth)).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["message"].as_str().unwrap().contains("restored"));

        let (_, _, body) = send(&router, "GET", "/inventory", None, None).await;
        let levels: Vec<u64> = serde_json::from_slice(&body).unwrap();
        assert_eq!(levels, Inventory::seed().stock_levels());

        // And the snapshot on disk matches.
        assert_eq!(store.load().unwrap(), Inventory::seed());
    }

    // -- 15. Status summary ------------------------------------------------------

    #[tokio::test]
    async fn status_reports_catalog_and_balance() {
        let (_dir, _store, router) = test_router(&[(1, 2, 5), (2, 1, 3)]);
        insert_coins(&router, 2).await;

        let (status, _, body) = send(&router, "GET", "/status", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let resp: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.version, "0.1.0-test");
        assert_eq!(resp.items, 2);
        assert_eq!(resp.total_stock, 8);
        assert_eq!(resp.coins, 2);
    }

    // -- 16. Walk-up purchase, end to end ----------------------------------------

    #[tokio::test]
    async fn walk_up_purchase_flow() {
        let (_dir, _store, router) = default_router();

        // Three coins in, one cola out, change back, balance cleared.
        insert_coins(&router, 3).await;
        let (status, headers, body) = send(&router, "PUT", "/inventory/1", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let resp: DispenseResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.quantity, 1);
        assert_eq!(coins_header(&headers), "1");

        let (_, _, body) = send(&router, "GET", "/inventory/1", None, None).await;
        let stock: u64 = serde_json::from_slice(&body).unwrap();
        assert_eq!(stock, 4);
    }
}
