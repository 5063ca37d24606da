//! Test harness for the Piatto checkout engine.
//!
//! Provides scriptable [`RemoteApi`] and
//! [`HostShell`](piatto_checkout::host::HostShell) implementations so
//! the tests under `tests/` can drive full checkout flows without a
//! backend or an embedding host: per-address estimate scripts with
//! artificial latency, contact events injected on a schedule, and a
//! chronological call log to assert network behavior against.

#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use piatto_checkout::api::wire::{
    AuthSession, ConfirmationBlock, CreateOrderRequest, DeliveryEstimateResponse,
    OrderConfirmation, PaymentConfirmation, UserProfile,
};
use piatto_checkout::api::{ApiError, RemoteApi};
use piatto_checkout::cart::MemoryStorage;
use piatto_checkout::host::{ContactEvent, HostError, HostShell, SessionUser};
use piatto_checkout::types::PaymentMethod;
use piatto_checkout::{CheckoutConfig, CheckoutSession};
use piatto_core::{OrderId, ProductId};
use rust_decimal::Decimal;
use secrecy::SecretString;
use tokio::sync::broadcast;

/// Initialize test logging once per process.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

// =============================================================================
// Scripted backend
// =============================================================================

/// Backend double with per-address estimate scripts and latency.
pub struct ScriptedApi {
    calls: Mutex<Vec<String>>,
    estimates: Mutex<HashMap<String, DeliveryEstimateResponse>>,
    estimate_delays: Mutex<HashMap<String, Duration>>,
    /// Estimate used for unscripted addresses; `None` fails the endpoint.
    default_estimate: Mutex<Option<DeliveryEstimateResponse>>,
    payment: Mutex<PaymentConfirmation>,
    profile: Mutex<UserProfile>,
    order_delay: Mutex<Duration>,
    next_order_id: AtomicI64,
}

impl Default for ScriptedApi {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            estimates: Mutex::new(HashMap::new()),
            estimate_delays: Mutex::new(HashMap::new()),
            default_estimate: Mutex::new(Some(DeliveryEstimateResponse::default())),
            payment: Mutex::new(PaymentConfirmation::default()),
            profile: Mutex::new(UserProfile::default()),
            order_delay: Mutex::new(Duration::ZERO),
            next_order_id: AtomicI64::new(1),
        }
    }
}

impl ScriptedApi {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script the estimate for one address, with optional latency.
    pub fn script_estimate(
        &self,
        address: &str,
        response: DeliveryEstimateResponse,
        delay: Duration,
    ) {
        self.estimates
            .lock()
            .unwrap()
            .insert(address.to_string(), response);
        self.estimate_delays
            .lock()
            .unwrap()
            .insert(address.to_string(), delay);
    }

    /// An available estimate at the given cost.
    #[must_use]
    pub fn available_estimate(cost: i64) -> DeliveryEstimateResponse {
        DeliveryEstimateResponse {
            delivery_available: Some(true),
            delivery_cost: Some(Decimal::from(cost)),
            ..DeliveryEstimateResponse::default()
        }
    }

    /// Make the estimate endpoint fail for unscripted addresses.
    pub fn break_estimator(&self) {
        *self.default_estimate.lock().unwrap() = None;
    }

    pub fn set_payment_url(&self, url: &str) {
        *self.payment.lock().unwrap() = PaymentConfirmation {
            confirmation: Some(ConfirmationBlock {
                confirmation_url: Some(url.to_string()),
            }),
            confirmation_url: None,
        };
    }

    pub fn set_profile(&self, profile: UserProfile) {
        *self.profile.lock().unwrap() = profile;
    }

    /// Slow down order creation (used to hold a submission in flight).
    pub fn set_order_delay(&self, delay: Duration) {
        *self.order_delay.lock().unwrap() = delay;
    }

    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, entry: impl Into<String>) {
        self.calls.lock().unwrap().push(entry.into());
    }
}

#[async_trait]
impl RemoteApi for ScriptedApi {
    fn set_credential(&self, _token: SecretString) {
        self.log("set_credential");
    }

    async fn authenticate(&self, _init_data: &str) -> Result<AuthSession, ApiError> {
        self.log("authenticate");
        Ok(AuthSession {
            token: "scripted-token".to_string(),
            user_id: Some(1),
        })
    }

    async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        self.log("fetch_profile");
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        self.log("clear_cart");
        Ok(())
    }

    async fn add_cart_item(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiError> {
        self.log(format!("add_cart_item:{product_id}x{quantity}"));
        Ok(())
    }

    async fn estimate_delivery(
        &self,
        address: &str,
        _order_total: Decimal,
    ) -> Result<DeliveryEstimateResponse, ApiError> {
        self.log(format!("estimate:{address}"));
        let delay = self
            .estimate_delays
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or(Duration::ZERO);
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.estimates.lock().unwrap().get(address).cloned();
        match scripted {
            Some(response) => Ok(response),
            None => self
                .default_estimate
                .lock()
                .unwrap()
                .clone()
                .ok_or(ApiError::Api {
                    status: 503,
                    message: "estimator down".to_string(),
                }),
        }
    }

    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<OrderConfirmation, ApiError> {
        self.log(format!("create_order:{}", request.contact_phone));
        let delay = *self.order_delay.lock().unwrap();
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
        Ok(OrderConfirmation {
            id: OrderId::new(self.next_order_id.fetch_add(1, Ordering::SeqCst)),
            status: Some("CREATED".to_string()),
            total_amount: None,
        })
    }

    async fn create_payment(
        &self,
        order_id: OrderId,
        method: PaymentMethod,
    ) -> Result<PaymentConfirmation, ApiError> {
        self.log(format!("create_payment:{order_id}:{method:?}"));
        Ok(self.payment.lock().unwrap().clone())
    }
}

// =============================================================================
// Scripted host shell
// =============================================================================

/// Host-shell double: records outgoing calls, lets tests inject contact
/// events immediately or on a schedule.
pub struct ScriptedHost {
    events: broadcast::Sender<ContactEvent>,
    request_count: AtomicU32,
    request_error: Mutex<Option<HostError>>,
    user: Mutex<Option<SessionUser>>,
    init: Mutex<Option<String>>,
    alerts: Mutex<Vec<String>>,
    opened_links: Mutex<Vec<String>>,
}

impl Default for ScriptedHost {
    fn default() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            events,
            request_count: AtomicU32::new(0),
            request_error: Mutex::new(None),
            user: Mutex::new(None),
            init: Mutex::new(Some("signed-init-payload".to_string())),
            alerts: Mutex::new(Vec::new()),
            opened_links: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedHost {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// How many times the engine asked for a contact.
    #[must_use]
    pub fn contact_requests(&self) -> u32 {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn set_session_user(&self, user: SessionUser) {
        *self.user.lock().unwrap() = Some(user);
    }

    pub fn fail_contact_requests(&self, error: HostError) {
        *self.request_error.lock().unwrap() = Some(error);
    }

    /// Inject a contact event now.
    pub fn send_event(&self, event: ContactEvent) {
        let _ = self.events.send(event);
    }

    /// Inject a contact event after a delay (requires a running runtime).
    pub fn send_event_after(self: &Arc<Self>, delay: Duration, event: ContactEvent) {
        let host = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            host.send_event(event);
        });
    }

    #[must_use]
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }

    #[must_use]
    pub fn opened_links(&self) -> Vec<String> {
        self.opened_links.lock().unwrap().clone()
    }
}

impl HostShell for ScriptedHost {
    fn request_contact(&self) -> Result<(), HostError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        match self.request_error.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn contact_events(&self) -> broadcast::Receiver<ContactEvent> {
        self.events.subscribe()
    }

    fn session_user(&self) -> Option<SessionUser> {
        self.user.lock().unwrap().clone()
    }

    fn init_data(&self) -> Option<String> {
        self.init.lock().unwrap().clone()
    }

    fn show_alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }

    fn open_link(&self, url: &str) {
        self.opened_links.lock().unwrap().push(url.to_string());
    }
}

// =============================================================================
// Session assembly
// =============================================================================

/// A session wired to scripted collaborators, with the cart storage
/// exposed so tests can assert on persisted state.
pub struct TestContext {
    pub session: CheckoutSession,
    pub api: Arc<ScriptedApi>,
    pub host: Arc<ScriptedHost>,
    pub storage: Arc<MemoryStorage>,
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        init_tracing();
        let api = ScriptedApi::new();
        let host = ScriptedHost::new();
        let storage = Arc::new(MemoryStorage::new());
        let session = CheckoutSession::new(
            CheckoutConfig::new("https://api.piatto.test"),
            Arc::clone(&api) as Arc<dyn RemoteApi>,
            Arc::clone(&host) as Arc<dyn HostShell>,
            Arc::clone(&storage) as Arc<dyn piatto_checkout::cart::CartStorage>,
        );
        Self {
            session,
            api,
            host,
            storage,
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
