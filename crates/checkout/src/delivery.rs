//! Delivery cost estimation.
//!
//! Every estimate request gets a monotonically increasing sequence
//! number. Requests may complete out of order; the quote from the
//! later-ISSUED request always wins, which the session enforces by
//! comparing sequence numbers before applying a completed quote.
//!
//! Estimator failures fail open: the order can still be placed at a
//! configured fallback cost rather than blocking checkout on a degraded
//! zonal service.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rust_decimal::Decimal;
use tracing::warn;

use crate::api::RemoteApi;
use crate::types::DeliveryQuote;

/// Addresses shorter than this (after trimming) are not worth a lookup.
const MIN_ADDRESS_LEN: usize = 3;

/// A quote stamped with its issue order.
#[derive(Debug, Clone)]
pub struct IssuedQuote {
    /// Issue-order sequence number; higher means issued later.
    pub seq: u64,
    pub quote: DeliveryQuote,
    /// Courier ETA text, when the estimator provides one.
    pub estimated_time: Option<String>,
    /// Degradation notice: set when the quote is a fallback or the
    /// estimator attached an explanatory message.
    pub warning: Option<String>,
}

impl IssuedQuote {
    /// Whether this quote was issued after (or is) `other`.
    #[must_use]
    pub fn supersedes(&self, other: Option<&Self>) -> bool {
        other.is_none_or(|existing| self.seq > existing.seq)
    }
}

/// Issues sequence-stamped delivery quotes.
pub struct DeliveryEstimator {
    api: Arc<dyn RemoteApi>,
    fallback_cost: Decimal,
    issued: AtomicU64,
}

impl DeliveryEstimator {
    #[must_use]
    pub fn new(api: Arc<dyn RemoteApi>, fallback_cost: Decimal) -> Self {
        Self {
            api,
            fallback_cost,
            issued: AtomicU64::new(0),
        }
    }

    /// Quote delivery for `address` at the given subtotal.
    ///
    /// Never fails: too-short addresses yield an unavailable quote
    /// without touching the network, and backend errors yield an
    /// available quote at the fallback cost with a warning attached.
    pub async fn quote(&self, address: &str, order_total: Decimal) -> IssuedQuote {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let address = address.trim();

        if address.chars().count() < MIN_ADDRESS_LEN {
            return IssuedQuote {
                seq,
                quote: DeliveryQuote::unavailable(),
                estimated_time: None,
                warning: None,
            };
        }

        match self.api.estimate_delivery(address, order_total).await {
            Ok(estimate) => {
                // Absent availability means available: only an explicit
                // `false` marks the address unreachable.
                let available = estimate.delivery_available != Some(false);
                let cost = if !available {
                    Decimal::ZERO
                } else if estimate.is_delivery_free == Some(true) {
                    Decimal::ZERO
                } else {
                    estimate.delivery_cost.unwrap_or(self.fallback_cost)
                };
                IssuedQuote {
                    seq,
                    quote: DeliveryQuote {
                        available,
                        cost,
                        zone_name: estimate.zone_name,
                        free_threshold: estimate.free_delivery_threshold,
                    },
                    estimated_time: estimate.estimated_time,
                    warning: estimate.message,
                }
            }
            Err(e) => {
                warn!(error = %e, "Delivery estimate failed, using fallback cost");
                IssuedQuote {
                    seq,
                    quote: DeliveryQuote {
                        available: true,
                        cost: self.fallback_cost,
                        zone_name: None,
                        free_threshold: None,
                    },
                    estimated_time: None,
                    warning: Some("Delivery cost is approximate".to_string()),
                }
            }
        }
    }

    /// Whether `quote` is the most recently issued one.
    #[must_use]
    pub fn is_current(&self, quote: &IssuedQuote) -> bool {
        quote.seq == self.issued.load(Ordering::SeqCst)
    }
}
