//! HTTP surface: one cart store per session, each with its own snapshot file.

use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post, put}, Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use validator::{Validate, ValidationError};
use crate::config::AppConfig;
use crate::domain::aggregates::{CartLine, Product};
use crate::domain::availability::{AvailabilityProjector, ProductAvailability};
use crate::domain::events::CartEvent;
use crate::domain::value_objects::{lenient, Region};
use crate::domain::variant::VariantSelection;
use crate::persistence::JsonFilePersistence;
use crate::store::{CartStore, QuantityChange};
use crate::summary::OrderSummary;
use crate::StorefrontError;

type Store = CartStore<JsonFilePersistence>;
type Slot = Arc<Mutex<Option<Store>>>;
type ApiResult<T> = std::result::Result<T, (StatusCode, String)>;

/// Highest unit price a request may carry.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Sessions are only resident while a request holds them. Every store
/// transition writes its snapshot, so an evicted cart reopens from disk.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    sessions: Arc<Mutex<HashMap<String, Slot>>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self { config: Arc::new(config), sessions: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Number of sessions currently held by in-flight requests.
    pub fn resident_sessions(&self) -> usize {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Runs `f` against the session's store on the blocking pool. Requests
    /// for the same session are serialized; other sessions are not held up.
    pub async fn with_cart<R, F>(&self, session: &str, f: F) -> crate::Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Store) -> R + Send + 'static,
    {
        let slot = {
            let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(sessions.entry(session.to_string()).or_default())
        };

        let config = Arc::clone(&self.config);
        let owner = session.to_string();
        let worker = Arc::clone(&slot);
        let outcome = tokio::task::spawn_blocking(move || {
            let mut guard = worker.lock().unwrap_or_else(PoisonError::into_inner);
            let store = guard.get_or_insert_with(|| {
                tracing::debug!(session = %owner, "opening cart");
                CartStore::open(
                    JsonFilePersistence::in_dir(&config.snapshot_dir, &owner),
                    config.default_region,
                    config.remove_policy,
                )
            });
            f(store)
        })
        .await;

        if outcome.is_err() {
            // The store may have been left half-updated; reopen from the snapshot next time.
            slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        }
        self.release(session, &slot);
        outcome.map_err(|e| {
            tracing::error!(session, error = %e, "cart request failed");
            StorefrontError::Worker(e.to_string())
        })
    }

    fn release(&self, session: &str, slot: &Slot) {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        // The registry and this request hold the only references.
        if Arc::strong_count(slot) == 2 {
            sessions.remove(session);
        }
    }
}

fn reject(e: StorefrontError) -> (StatusCode, String) {
    let status = match e {
        StorefrontError::Validation(_) | StorefrontError::Selection(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

fn checked<T: Validate>(value: T) -> ApiResult<T> {
    value.validate().map_err(|e| reject(e.into()))?;
    Ok(value)
}

fn session_charset(session: &str) -> Result<(), ValidationError> {
    if session.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        Ok(())
    } else {
        Err(ValidationError::new("session_charset"))
    }
}

fn valid_product(product: &Product) -> Result<(), ValidationError> {
    if product.id.trim().is_empty() {
        return Err(ValidationError::new("product_id"));
    }
    let prices = [Some(product.price), product.regular_price, product.old_price]
        .into_iter()
        .flatten()
        .chain(product.count_prices.iter().map(|o| o.price));
    for price in prices {
        if price.is_sign_negative() || price > MAX_UNIT_PRICE {
            return Err(ValidationError::new("price_range"));
        }
    }
    Ok(())
}

fn require_product(selection: &VariantSelection) -> ApiResult<()> {
    if selection.product_id.trim().is_empty() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, "productId is required".to_string()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct SessionPath {
    #[validate(length(min = 1, max = 64), custom = "session_charset")]
    pub session: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    #[validate(custom = "valid_product")]
    pub product: Product,
    #[serde(default)] pub color: Option<String>,
    #[serde(default)] pub size: Option<String>,
    #[serde(default)] pub option_label: Option<String>,
    #[serde(default)] pub count_label: Option<String>,
    #[serde(default = "lenient::default_quantity", deserialize_with = "lenient::quantity")]
    #[validate(range(min = 1, max = 999))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(flatten)]
    pub selection: VariantSelection,
    pub change: QuantityChange,
}

#[derive(Debug, Deserialize)]
pub struct SetRegionRequest { pub region: Region }

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    #[validate(custom = "valid_product")]
    pub product: Product,
    #[serde(default)] pub color: Option<String>,
    #[serde(default)] pub option_label: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub session: String,
    pub lines: Vec<CartLine>,
    pub selected_items: u32,
    pub subtotal: Decimal,
    pub shipping_fee_hint: Decimal,
    pub region: Region,
    pub summary: OrderSummary,
    pub events: Vec<CartEvent>,
    /// Quantity of the line the request touched, when it still exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

impl CartResponse {
    fn from_store(session: &str, store: &mut Store, quantity: Option<u32>) -> Self {
        let events = store.take_events();
        let state = store.state();
        Self {
            session: session.to_string(),
            lines: state.lines().to_vec(),
            selected_items: state.selected_items(),
            subtotal: state.subtotal(),
            shipping_fee_hint: state.shipping_fee_hint(),
            region: state.region(),
            summary: OrderSummary::for_state(state),
            events,
            quantity,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-cart"})) }))
        .route("/api/v1/cart", post(create_session))
        .route("/api/v1/cart/:session", get(get_cart).delete(clear_cart))
        .route("/api/v1/cart/:session/items", post(add_item).patch(update_item).delete(remove_item))
        .route("/api/v1/cart/:session/region", put(set_region))
        .route("/api/v1/cart/:session/availability", post(availability))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

async fn create_session() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::CREATED, Json(serde_json::json!({"session": Uuid::now_v7().to_string()})))
}

async fn get_cart(State(s): State<AppState>, Path(p): Path<SessionPath>) -> ApiResult<Json<CartResponse>> {
    let p = checked(p)?;
    let session = p.session.clone();
    s.with_cart(&p.session, move |store| CartResponse::from_store(&session, store, None))
        .await
        .map(Json)
        .map_err(reject)
}

async fn clear_cart(State(s): State<AppState>, Path(p): Path<SessionPath>) -> ApiResult<Json<CartResponse>> {
    let p = checked(p)?;
    let session = p.session.clone();
    s.with_cart(&p.session, move |store| {
        store.clear();
        CartResponse::from_store(&session, store, None)
    })
    .await
    .map(Json)
    .map_err(reject)
}

async fn add_item(State(s): State<AppState>, Path(p): Path<SessionPath>, Json(r): Json<AddItemRequest>) -> ApiResult<(StatusCode, Json<CartResponse>)> {
    let p = checked(p)?;
    let r = checked(r)?;
    let selection = VariantSelection {
        product_id: r.product.id.clone(),
        color: r.color,
        size: r.size,
        option_label: r.option_label,
        count_label: r.count_label,
    };
    let line = r.product.line_for(&selection, i64::from(r.quantity)).map_err(|e| reject(e.into()))?;
    let (session, requested, product) = (p.session.clone(), r.quantity, r.product.id);
    let response = s
        .with_cart(&p.session, move |store| {
            let quantity = store.add(line, requested);
            tracing::info!(%session, %product, requested, granted = ?quantity, "added to cart");
            CartResponse::from_store(&session, store, quantity)
        })
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn update_item(State(s): State<AppState>, Path(p): Path<SessionPath>, Json(r): Json<UpdateItemRequest>) -> ApiResult<Json<CartResponse>> {
    let p = checked(p)?;
    require_product(&r.selection)?;
    let session = p.session.clone();
    s.with_cart(&p.session, move |store| {
        store
            .update_quantity(&r.selection, r.change)
            .map(|quantity| CartResponse::from_store(&session, store, Some(quantity)))
    })
    .await
    .map_err(reject)?
    .map(Json)
    .ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))
}

async fn remove_item(State(s): State<AppState>, Path(p): Path<SessionPath>, Query(selection): Query<VariantSelection>) -> ApiResult<Json<CartResponse>> {
    let p = checked(p)?;
    require_product(&selection)?;
    let session = p.session.clone();
    s.with_cart(&p.session, move |store| {
        let removed = store.remove(&selection);
        tracing::info!(%session, product = %selection.product_id, removed, "removed from cart");
        CartResponse::from_store(&session, store, None)
    })
    .await
    .map(Json)
    .map_err(reject)
}

async fn set_region(State(s): State<AppState>, Path(p): Path<SessionPath>, Json(r): Json<SetRegionRequest>) -> ApiResult<Json<CartResponse>> {
    let p = checked(p)?;
    let session = p.session.clone();
    s.with_cart(&p.session, move |store| {
        store.set_region(r.region);
        CartResponse::from_store(&session, store, None)
    })
    .await
    .map(Json)
    .map_err(reject)
}

async fn availability(State(s): State<AppState>, Path(p): Path<SessionPath>, Json(r): Json<AvailabilityRequest>) -> ApiResult<Json<ProductAvailability>> {
    let p = checked(p)?;
    let r = checked(r)?;
    s.with_cart(&p.session, move |store| {
        AvailabilityProjector::new(&r.product, store.state()).project(r.color.as_deref(), r.option_label.as_deref())
    })
    .await
    .map(Json)
    .map_err(reject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RemovePolicy;

    fn state(dir: &std::path::Path) -> AppState {
        AppState::new(AppConfig {
            port: 0,
            snapshot_dir: dir.to_path_buf(),
            remove_policy: RemovePolicy::Legacy,
            default_region: Region::Oman,
        })
    }

    fn mug(stock: u32) -> CartLine {
        CartLine { product_id: "mug".into(), unit_price: Decimal::from(6), stock: Some(stock), ..CartLine::default() }
    }

    #[tokio::test]
    async fn test_failed_request_does_not_wedge_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let app = state(dir.path());
        app.with_cart("a", |store| store.add(mug(5), 2)).await.unwrap();

        let failed = app.with_cart("a", |_| -> u32 { panic!("store blew up") }).await;
        assert!(matches!(failed, Err(StorefrontError::Worker(_))));

        assert_eq!(app.with_cart("a", |store| store.state().selected_items()).await.unwrap(), 2);
        assert_eq!(app.with_cart("b", |store| store.state().selected_items()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sessions_are_evicted_after_use() {
        let dir = tempfile::tempdir().unwrap();
        let app = state(dir.path());
        for session in ["a", "b", "c"] {
            app.with_cart(session, |store| store.add(mug(9), 1)).await.unwrap();
        }
        assert_eq!(app.resident_sessions(), 0);
        assert_eq!(app.with_cart("b", |store| store.add(mug(9), 1)).await.unwrap(), Some(2));
    }

    #[test]
    fn test_product_prices_are_range_checked() {
        let product = Product { id: "mug".into(), price: Decimal::from(6), ..Product::default() };
        assert!(valid_product(&product).is_ok());
        assert!(valid_product(&Product { price: Decimal::MAX, ..product.clone() }).is_err());
        assert!(valid_product(&Product { price: Decimal::from(-1), ..product.clone() }).is_err());
        assert!(valid_product(&Product { id: " ".into(), ..product }).is_err());
    }
}
