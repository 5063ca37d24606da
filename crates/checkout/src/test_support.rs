//! Scriptable `RemoteApi` stub shared by unit tests in this crate.

#![allow(clippy::unwrap_used)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};

use async_trait::async_trait;
use piatto_core::{OrderId, ProductId};
use rust_decimal::Decimal;
use secrecy::SecretString;
use tokio::sync::broadcast;

use crate::api::wire::{
    AuthSession, CreateOrderRequest, DeliveryEstimateResponse, OrderConfirmation,
    PaymentConfirmation, UserProfile,
};
use crate::api::{ApiError, RemoteApi};
use crate::host::{ContactEvent, HostError, HostShell, SessionUser};
use crate::types::PaymentMethod;

/// Backend stub recording calls and replaying scripted responses.
pub(crate) struct StubApi {
    /// Chronological log of calls, one compact line per call.
    pub calls: Mutex<Vec<String>>,
    /// Estimate to replay; `None` makes the endpoint fail with a 500.
    pub estimate: Mutex<Option<DeliveryEstimateResponse>>,
    /// Payment to replay; defaults to a body with no confirmation URL.
    pub payment: Mutex<PaymentConfirmation>,
    pub profile: Mutex<UserProfile>,
    pub next_order_id: AtomicI64,
    pub fail_clear_cart: AtomicBool,
}

impl Default for StubApi {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            estimate: Mutex::new(Some(DeliveryEstimateResponse::default())),
            payment: Mutex::new(PaymentConfirmation::default()),
            profile: Mutex::new(UserProfile::default()),
            next_order_id: AtomicI64::new(1),
            fail_clear_cart: AtomicBool::new(false),
        }
    }
}

impl StubApi {
    pub fn log(&self, entry: impl Into<String>) {
        self.calls.lock().unwrap().push(entry.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteApi for StubApi {
    fn set_credential(&self, _token: SecretString) {
        self.log("set_credential");
    }

    async fn authenticate(&self, _init_data: &str) -> Result<AuthSession, ApiError> {
        self.log("authenticate");
        Ok(AuthSession {
            token: "stub-token".to_string(),
            user_id: Some(1),
        })
    }

    async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        self.log("fetch_profile");
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        self.log("clear_cart");
        if self.fail_clear_cart.load(Ordering::SeqCst) {
            return Err(ApiError::Api {
                status: 500,
                message: "cart unavailable".to_string(),
            });
        }
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
        self.estimate
            .lock()
            .unwrap()
            .clone()
            .ok_or(ApiError::Api {
                status: 500,
                message: "estimator down".to_string(),
            })
    }

    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<OrderConfirmation, ApiError> {
        self.log(format!("create_order:{}", request.contact_phone));
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

/// Host-shell stub: events are injected through the broadcast sender,
/// outgoing calls are recorded.
pub(crate) struct StubHost {
    pub events: broadcast::Sender<ContactEvent>,
    pub request_count: AtomicU32,
    pub request_error: Mutex<Option<HostError>>,
    pub user: Mutex<Option<SessionUser>>,
    pub init: Mutex<Option<String>>,
    pub alerts: Mutex<Vec<String>>,
    pub opened_links: Mutex<Vec<String>>,
}

impl Default for StubHost {
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

impl StubHost {
    pub fn requests(&self) -> u32 {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn send_event(&self, event: ContactEvent) {
        let _ = self.events.send(event);
    }
}

impl HostShell for StubHost {
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
