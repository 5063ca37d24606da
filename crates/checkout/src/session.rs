//! Checkout session controller.
//!
//! [`CheckoutSession`] is the explicit context object that owns all
//! checkout state and coordinates the other modules: the cart store, the
//! delivery estimator, contact acquisition, and the order submitter. It
//! is cheap to clone and safe to drive from multiple tasks; all mutable
//! state sits behind one async lock, and the lock is never held across a
//! network call, so overlapping operations interleave the same way they
//! would in the embedding UI.

use std::str::FromStr;
use std::sync::Arc;

use piatto_core::PhoneNumber;
use rust_decimal::Decimal;
use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::api::RemoteApi;
use crate::api::wire::UserProfile;
use crate::cart::{CartStorage, CartStore, FileStorage, MemoryStorage};
use crate::config::CheckoutConfig;
use crate::contact::{ContactAcquisition, Resolution};
use crate::debounce::Debouncer;
use crate::delivery::{DeliveryEstimator, IssuedQuote};
use crate::error::{CheckoutError, Result};
use crate::host::{ContactEvent, HostError, HostShell};
use crate::submit::{OrderSubmitter, SubmitRequest};
use crate::types::{Cart, CartItem, DeliveryMethod, PaymentMethod, SubmitOutcome, UserContact};

const MANUAL_PHONE_PROMPT: &str = "Please enter your phone number to continue";

/// Order totals derived from the current session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub delivery_cost: Decimal,
    pub total: Decimal,
}

/// Mutable session state, guarded by one lock.
struct SessionState {
    cart: CartStore,
    contact: UserContact,
    acquisition: ContactAcquisition,
    quote: Option<IssuedQuote>,
    delivery_method: DeliveryMethod,
    payment_method: PaymentMethod,
    address: String,
    comment: Option<String>,
    /// A submission is waiting for a phone number and resumes when one
    /// arrives.
    pending_submission: bool,
    /// Single-flight guard for [`CheckoutSession::submit_order`].
    submitting: bool,
}

struct SessionInner {
    config: CheckoutConfig,
    api: Arc<dyn RemoteApi>,
    host: Arc<dyn HostShell>,
    debouncer: Debouncer,
    estimator: DeliveryEstimator,
    submitter: OrderSubmitter,
    state: Mutex<SessionState>,
}

/// The checkout flow, from cart to confirmed order.
#[derive(Clone)]
pub struct CheckoutSession {
    inner: Arc<SessionInner>,
}

impl CheckoutSession {
    /// Assemble a session from its collaborators. The cart is restored
    /// from `storage` immediately.
    #[must_use]
    pub fn new(
        config: CheckoutConfig,
        api: Arc<dyn RemoteApi>,
        host: Arc<dyn HostShell>,
        storage: Arc<dyn CartStorage>,
    ) -> Self {
        let debouncer = Debouncer::new(config.debounce_delay);
        let estimator = DeliveryEstimator::new(Arc::clone(&api), config.fallback_delivery_cost);
        let submitter = OrderSubmitter::new(Arc::clone(&api));
        Self {
            inner: Arc::new(SessionInner {
                config,
                api,
                host,
                debouncer,
                estimator,
                submitter,
                state: Mutex::new(SessionState {
                    cart: CartStore::load(storage),
                    contact: UserContact::default(),
                    acquisition: ContactAcquisition::new(),
                    quote: None,
                    delivery_method: DeliveryMethod::Delivery,
                    payment_method: PaymentMethod::Sbp,
                    address: String::new(),
                    comment: None,
                    pending_submission: false,
                    submitting: false,
                }),
            }),
        }
    }

    /// Assemble a session with cart storage chosen from the
    /// configuration: file-backed under `cart_path` when set, in-memory
    /// otherwise.
    #[must_use]
    pub fn from_config(
        config: CheckoutConfig,
        api: Arc<dyn RemoteApi>,
        host: Arc<dyn HostShell>,
    ) -> Self {
        let storage: Arc<dyn CartStorage> = match config.cart_path.as_deref() {
            Some(path) => Arc::new(FileStorage::new(path)),
            None => Arc::new(MemoryStorage::new()),
        };
        Self::new(config, api, host, storage)
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Authenticate against the backend and seed the contact from the
    /// user's profile.
    ///
    /// Degrades rather than fails: a failed authentication or profile
    /// fetch leaves the session in guest mode, and a profile without a
    /// phone number starts contact acquisition.
    ///
    /// # Errors
    ///
    /// Currently infallible in practice; the `Result` reserves room for
    /// unrecoverable startup failures.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        match self.inner.host.init_data() {
            Some(init) => match self.inner.api.authenticate(&init).await {
                Ok(session) => self
                    .inner
                    .api
                    .set_credential(SecretString::from(session.token)),
                Err(e) => warn!(error = %e, "Authentication failed, continuing as guest"),
            },
            None => warn!("Host provided no session-init payload, continuing as guest"),
        }

        let profile = match self.inner.api.fetch_profile().await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, "Profile fetch failed, starting with an empty contact");
                UserProfile::default()
            }
        };

        let mut state = self.inner.state.lock().await;
        state.contact.display_name = profile
            .best_name()
            .or_else(|| self.inner.host.session_user().and_then(|u| u.full_name()))
            .unwrap_or_else(|| "Guest".to_string());
        if let Some(raw) = profile.best_phone()
            && let Ok(phone) = PhoneNumber::from_str(raw)
        {
            state.contact.phone = Some(phone);
        }
        if state.contact.phone.is_none() {
            self.begin_acquisition(&mut state);
        }
        Ok(())
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Add an item to the cart (merging with an existing line).
    pub async fn add_item(&self, item: CartItem) {
        let mut state = self.inner.state.lock().await;
        state.cart.add_item(item);
    }

    /// Set a line's quantity; zero removes it.
    pub async fn set_item_quantity(&self, product_id: piatto_core::ProductId, quantity: u32) {
        let mut state = self.inner.state.lock().await;
        state.cart.set_quantity(product_id, quantity);
    }

    /// Remove a line from the cart.
    pub async fn remove_item(&self, product_id: piatto_core::ProductId) {
        let mut state = self.inner.state.lock().await;
        state.cart.remove_item(product_id);
    }

    /// Snapshot of the current cart.
    pub async fn cart(&self) -> Cart {
        self.inner.state.lock().await.cart.snapshot()
    }

    /// Snapshot of the current contact.
    pub async fn contact(&self) -> UserContact {
        self.inner.state.lock().await.contact.clone()
    }

    /// Whether manual phone entry is the only remaining option.
    pub async fn manual_phone_required(&self) -> bool {
        self.inner.state.lock().await.acquisition.manual_required()
    }

    /// Current order totals. Delivery cost counts only for courier
    /// orders with an applied quote.
    pub async fn totals(&self) -> Totals {
        let state = self.inner.state.lock().await;
        let subtotal = state.cart.cart().total_amount;
        let delivery_cost = match state.delivery_method {
            DeliveryMethod::Delivery => state
                .quote
                .as_ref()
                .filter(|issued| issued.quote.available)
                .map_or(Decimal::ZERO, |issued| issued.quote.cost),
            DeliveryMethod::Pickup => Decimal::ZERO,
        };
        Totals {
            subtotal,
            delivery_cost,
            total: subtotal + delivery_cost,
        }
    }

    // =========================================================================
    // Delivery
    // =========================================================================

    /// Record an address keystroke and, once the input goes quiet,
    /// estimate delivery for it.
    ///
    /// Returns the applied quote, or `None` when this edit was
    /// superseded by a newer one, the address changed while settling, or
    /// pickup is selected. A quote is applied only if it was issued
    /// after the currently applied one, so out-of-order completions
    /// cannot clobber a fresher result.
    pub async fn edit_address(&self, address: &str) -> Option<IssuedQuote> {
        let token = {
            let mut state = self.inner.state.lock().await;
            state.address = address.to_string();
            if state.delivery_method != DeliveryMethod::Delivery {
                return None;
            }
            self.inner.debouncer.mark()
        };

        if !self.inner.debouncer.settle(token).await {
            return None;
        }

        let (current_address, subtotal) = {
            let state = self.inner.state.lock().await;
            (state.address.clone(), state.cart.cart().total_amount)
        };
        if current_address != address {
            return None;
        }

        let issued = self.inner.estimator.quote(&current_address, subtotal).await;
        self.apply_quote(issued).await
    }

    /// Switch between courier delivery and pickup. Switching to pickup
    /// clears the quote and the entered address; switching to courier
    /// with an address on file re-estimates immediately (no debounce).
    pub async fn set_delivery_method(&self, method: DeliveryMethod) -> Option<IssuedQuote> {
        let (address, subtotal) = {
            let mut state = self.inner.state.lock().await;
            state.delivery_method = method;
            if method == DeliveryMethod::Pickup {
                state.quote = None;
                state.address.clear();
                return None;
            }
            (state.address.clone(), state.cart.cart().total_amount)
        };
        if address.trim().is_empty() {
            return None;
        }
        let issued = self.inner.estimator.quote(&address, subtotal).await;
        self.apply_quote(issued).await
    }

    /// Re-estimate for the current address at the current subtotal,
    /// bypassing the debounce (used after cart changes).
    pub async fn refresh_quote(&self) -> Option<IssuedQuote> {
        let (method, address, subtotal) = {
            let state = self.inner.state.lock().await;
            (
                state.delivery_method,
                state.address.clone(),
                state.cart.cart().total_amount,
            )
        };
        if method != DeliveryMethod::Delivery || address.trim().is_empty() {
            return None;
        }
        let issued = self.inner.estimator.quote(&address, subtotal).await;
        self.apply_quote(issued).await
    }

    async fn apply_quote(&self, issued: IssuedQuote) -> Option<IssuedQuote> {
        let mut state = self.inner.state.lock().await;
        if issued.supersedes(state.quote.as_ref()) {
            state.quote = Some(issued.clone());
            Some(issued)
        } else {
            None
        }
    }

    /// Choose how the order is paid.
    pub async fn set_payment_method(&self, method: PaymentMethod) {
        self.inner.state.lock().await.payment_method = method;
    }

    /// Attach a free-text comment to the order.
    pub async fn set_comment(&self, comment: Option<String>) {
        self.inner.state.lock().await.comment = comment;
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submit the order.
    ///
    /// At most one submission runs at a time; a second call while one is
    /// in flight fails with [`CheckoutError::SubmissionInFlight`] rather
    /// than double-ordering. A missing phone number returns
    /// [`SubmitOutcome::PendingContact`] and starts contact acquisition;
    /// the submission resumes automatically once a phone arrives.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Submit`] on failed preconditions or
    /// backend failures.
    #[instrument(skip(self))]
    pub async fn submit_order(&self) -> Result<SubmitOutcome> {
        let mut state = self.inner.state.lock().await;
        if state.submitting {
            return Err(CheckoutError::SubmissionInFlight);
        }
        state.submitting = true;

        // Courier orders need a quote; estimate now if none was applied
        // yet (the submitting flag keeps this section single-flight).
        if state.delivery_method == DeliveryMethod::Delivery
            && state.quote.is_none()
            && !state.address.trim().is_empty()
        {
            let address = state.address.clone();
            let subtotal = state.cart.cart().total_amount;
            drop(state);
            let issued = self.inner.estimator.quote(&address, subtotal).await;
            self.apply_quote(issued).await;
            state = self.inner.state.lock().await;
        }

        let request = SubmitRequest {
            cart: state.cart.snapshot(),
            contact: state.contact.clone(),
            delivery_method: state.delivery_method,
            address: Some(state.address.clone()).filter(|a| !a.trim().is_empty()),
            quote: state.quote.as_ref().map(|issued| issued.quote.clone()),
            payment_method: state.payment_method,
            comment: state.comment.clone(),
            pickup_location_id: self.inner.config.pickup_location_id,
        };
        drop(state);

        let result = self.inner.submitter.submit(request).await;

        let mut state = self.inner.state.lock().await;
        state.submitting = false;
        match result {
            Ok(SubmitOutcome::PendingContact) => {
                state.pending_submission = true;
                self.begin_acquisition(&mut state);
                Ok(SubmitOutcome::PendingContact)
            }
            Ok(outcome) => {
                // Persisted-empty cart: a restart after this point must
                // not resurrect the purchased items.
                state.cart.clear();
                state.quote = None;
                drop(state);
                match &outcome {
                    SubmitOutcome::RedirectToPay { url, .. } => self.inner.host.open_link(url),
                    SubmitOutcome::Accepted { order_id } => {
                        self.inner
                            .host
                            .show_alert(&format!("Order #{order_id} accepted"));
                    }
                    SubmitOutcome::PendingContact => {}
                }
                Ok(outcome)
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Contact acquisition
    // =========================================================================

    /// Feed a contact event from the host into the session.
    ///
    /// Returns the outcome of a resumed submission when the event
    /// completed a pending one, `None` otherwise.
    ///
    /// # Errors
    ///
    /// Propagates failures from a resumed submission.
    #[instrument(skip(self, event))]
    pub async fn handle_contact_event(&self, event: ContactEvent) -> Result<Option<SubmitOutcome>> {
        let mut state = self.inner.state.lock().await;
        match state.acquisition.resolve(&event) {
            Resolution::Accepted(fragment) => match PhoneNumber::from_str(&fragment.phone) {
                Ok(phone) => {
                    self.accept_phone(&mut state, phone, fragment.display_name);
                    self.resume_pending(state).await
                }
                Err(e) => {
                    warn!(error = %e, "Shared contact carried an unusable phone number");
                    state.acquisition.require_manual();
                    drop(state);
                    self.inner.host.show_alert(MANUAL_PHONE_PROMPT);
                    Ok(None)
                }
            },
            Resolution::Cancelled => {
                drop(state);
                // Grace delay before falling back, so a host that emits
                // cancel-then-contact in quick succession still wins.
                tokio::time::sleep(self.inner.config.cancelled_retry_delay).await;
                self.fall_back_to_session_user().await
            }
            Resolution::Unrecognized | Resolution::Ignored => Ok(None),
        }
    }

    /// Wait for the open contact episode to finish, feeding events
    /// through [`CheckoutSession::handle_contact_event`].
    ///
    /// On timeout the episode is closed, manual entry is required, and
    /// `None` is returned.
    ///
    /// # Errors
    ///
    /// Propagates failures from a resumed submission.
    pub async fn await_contact(&self) -> Result<Option<SubmitOutcome>> {
        let mut events = self.inner.host.contact_events();
        let wait = async {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let outcome = self.handle_contact_event(event).await?;
                        let open = self.inner.state.lock().await.acquisition.is_requested();
                        if !open {
                            return Ok(outcome);
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => return Ok(None),
                }
            }
        };

        match tokio::time::timeout(self.inner.config.contact_timeout, wait).await {
            Ok(result) => result,
            Err(_) => {
                let mut state = self.inner.state.lock().await;
                state.acquisition.note_timeout();
                drop(state);
                warn!("Contact request timed out");
                self.inner.host.show_alert(MANUAL_PHONE_PROMPT);
                Ok(None)
            }
        }
    }

    /// Accept a phone number the user typed in.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Phone`] when the input cannot be
    /// canonicalized, and propagates failures from a resumed submission.
    pub async fn submit_manual_phone(&self, raw: &str) -> Result<Option<SubmitOutcome>> {
        let phone = PhoneNumber::from_str(raw)?;
        let mut state = self.inner.state.lock().await;
        self.accept_phone(&mut state, phone, None);
        self.resume_pending(state).await
    }

    fn begin_acquisition(&self, state: &mut SessionState) {
        if !state.acquisition.try_begin() {
            return;
        }
        match self.inner.host.request_contact() {
            Ok(()) => info!("Contact request sent to host"),
            // The open episode is the same one; its answer will arrive.
            Err(HostError::AlreadyRequested) => {}
            Err(HostError::Unsupported(capability)) => {
                warn!(capability, "Host cannot request contacts");
                state.acquisition.require_manual();
                self.inner.host.show_alert(MANUAL_PHONE_PROMPT);
            }
        }
    }

    /// Install an acquired phone number. Once set it is never undone,
    /// even if the follow-up re-authentication fails.
    fn accept_phone(&self, state: &mut SessionState, phone: PhoneNumber, name: Option<String>) {
        info!(phone = %phone, "Phone number acquired");
        state.contact.phone = Some(phone);
        if state.contact.display_name.trim().is_empty()
            && let Some(name) = name
        {
            state.contact.display_name = name;
        }
        state.acquisition.reset();
        self.spawn_reauth();
    }

    /// Refresh the backend session in the background now that the user
    /// is a known contact. Fire-and-forget.
    fn spawn_reauth(&self) {
        let Some(init) = self.inner.host.init_data() else {
            return;
        };
        let api = Arc::clone(&self.inner.api);
        tokio::spawn(async move {
            match api.authenticate(&init).await {
                Ok(session) => api.set_credential(SecretString::from(session.token)),
                Err(e) => warn!(error = %e, "Background re-authentication failed"),
            }
        });
    }

    async fn fall_back_to_session_user(&self) -> Result<Option<SubmitOutcome>> {
        let mut state = self.inner.state.lock().await;
        let fallback = self
            .inner
            .host
            .session_user()
            .and_then(|user| user.phone_number)
            .and_then(|raw| PhoneNumber::from_str(&raw).ok());
        match fallback {
            Some(phone) => {
                info!("Using phone number from the host session payload");
                self.accept_phone(&mut state, phone, None);
                self.resume_pending(state).await
            }
            None => {
                state.acquisition.require_manual();
                drop(state);
                self.inner.host.show_alert(MANUAL_PHONE_PROMPT);
                Ok(None)
            }
        }
    }

    async fn resume_pending(
        &self,
        mut state: tokio::sync::MutexGuard<'_, SessionState>,
    ) -> Result<Option<SubmitOutcome>> {
        if !state.pending_submission {
            return Ok(None);
        }
        state.pending_submission = false;
        drop(state);
        self.submit_order().await.map(Some)
    }
}
