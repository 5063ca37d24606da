//! Ordering backend client.
//!
//! [`RemoteApi`] is the seam between the engine and the backend: the
//! session and submitter talk to the trait, production wires in
//! [`HttpApi`], and tests wire in scripted implementations.
//!
//! Authentication is optional: endpoints are called in guest mode until a
//! credential is installed with [`RemoteApi::set_credential`], after
//! which every request carries it as a bearer token.

pub mod wire;

use std::sync::RwLock;

use async_trait::async_trait;
use piatto_core::{OrderId, ProductId};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;

use crate::types::PaymentMethod;
use wire::{
    AddCartItemRequest, AuthRequest, AuthSession, CreateOrderRequest, CreatePaymentRequest,
    DeliveryEstimateResponse, OrderConfirmation, PaymentConfirmation, UserProfile,
};

/// Request timeout for all backend calls.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

// Endpoint paths under the `/api/v1` prefix.
const AUTH_PATH: &str = "/auth/session";
const PROFILE_PATH: &str = "/user/profile";
const CART_PATH: &str = "/cart";
const CART_ITEMS_PATH: &str = "/cart/items";
const DELIVERY_ESTIMATE_PATH: &str = "/delivery/estimate";
const ORDERS_PATH: &str = "/orders";
const PAYMENTS_PATH: &str = "/payments/create";

/// Errors that can occur when talking to the ordering backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (network, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response body.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// The backend surface the checkout engine depends on.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Install a bearer credential for subsequent requests.
    fn set_credential(&self, token: SecretString);

    /// Exchange the host's session-init payload for a session.
    async fn authenticate(&self, init_data: &str) -> Result<AuthSession, ApiError>;

    /// Fetch the authenticated user's profile.
    async fn fetch_profile(&self) -> Result<UserProfile, ApiError>;

    /// Empty the remote cart.
    async fn clear_cart(&self) -> Result<(), ApiError>;

    /// Add one line to the remote cart.
    async fn add_cart_item(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiError>;

    /// Estimate delivery cost for an address at a given subtotal.
    async fn estimate_delivery(
        &self,
        address: &str,
        order_total: Decimal,
    ) -> Result<DeliveryEstimateResponse, ApiError>;

    /// Create an order from the remote cart.
    async fn create_order(&self, request: &CreateOrderRequest)
    -> Result<OrderConfirmation, ApiError>;

    /// Create a payment for an order.
    async fn create_payment(
        &self,
        order_id: OrderId,
        method: PaymentMethod,
    ) -> Result<PaymentConfirmation, ApiError>;
}

/// HTTP implementation of [`RemoteApi`] against the `/api/v1` surface.
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    device_id: String,
    token: RwLock<Option<SecretString>>,
}

impl HttpApi {
    /// Create a client for the given backend base URL.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            device_id: uuid::Uuid::new_v4().to_string(),
            token: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base_url)
    }

    fn credential(&self) -> Option<SecretString> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credential() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn read_empty(response: reqwest::Response) -> Result<(), ApiError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteApi for HttpApi {
    fn set_credential(&self, token: SecretString) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token);
        }
    }

    #[instrument(skip(self, init_data))]
    async fn authenticate(&self, init_data: &str) -> Result<AuthSession, ApiError> {
        let body = AuthRequest {
            init_data: init_data.to_string(),
            device_id: self.device_id.clone(),
        };
        let response = self
            .client
            .post(self.url(AUTH_PATH))
            .json(&body)
            .send()
            .await?;
        Self::read_json(response).await
    }

    #[instrument(skip(self))]
    async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        let response = self
            .authorize(self.client.get(self.url(PROFILE_PATH)))
            .send()
            .await?;
        Self::read_json(response).await
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<(), ApiError> {
        let response = self
            .authorize(self.client.delete(self.url(CART_PATH)))
            .send()
            .await?;
        Self::read_empty(response).await
    }

    #[instrument(skip(self))]
    async fn add_cart_item(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiError> {
        let body = AddCartItemRequest {
            product_id,
            quantity,
        };
        let response = self
            .authorize(self.client.post(self.url(CART_ITEMS_PATH)).json(&body))
            .send()
            .await?;
        Self::read_empty(response).await
    }

    #[instrument(skip(self), fields(address_len = address.len()))]
    async fn estimate_delivery(
        &self,
        address: &str,
        order_total: Decimal,
    ) -> Result<DeliveryEstimateResponse, ApiError> {
        let response = self
            .authorize(
                self.client
                    .get(self.url(DELIVERY_ESTIMATE_PATH))
                    .query(&[("address", address), ("orderAmount", &order_total.to_string())]),
            )
            .send()
            .await?;
        Self::read_json(response).await
    }

    #[instrument(skip(self, request))]
    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<OrderConfirmation, ApiError> {
        let response = self
            .authorize(self.client.post(self.url(ORDERS_PATH)).json(request))
            .send()
            .await?;
        Self::read_json(response).await
    }

    #[instrument(skip(self))]
    async fn create_payment(
        &self,
        order_id: OrderId,
        method: PaymentMethod,
    ) -> Result<PaymentConfirmation, ApiError> {
        let body = CreatePaymentRequest {
            order_id,
            payment_method: method,
        };
        let response = self
            .authorize(self.client.post(self.url(PAYMENTS_PATH)).json(&body))
            .send()
            .await?;
        Self::read_json(response).await
    }
}
