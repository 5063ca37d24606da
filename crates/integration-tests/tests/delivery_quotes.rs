//! Delivery estimation under races, debounce, and estimator outages.

use std::time::Duration;

use piatto_checkout::api::wire::{DeliveryEstimateResponse, UserProfile};
use piatto_checkout::types::{CartItem, SubmitOutcome};
use piatto_core::ProductId;
use piatto_integration_tests::{ScriptedApi, TestContext};
use rust_decimal::Decimal;

fn margherita() -> CartItem {
    CartItem {
        product_id: ProductId::new(1),
        name: "Margherita".to_string(),
        unit_price: Decimal::from(500),
        quantity: 1,
        image_ref: String::new(),
    }
}

fn known_user_profile() -> UserProfile {
    UserProfile {
        first_name: Some("Ivan".to_string()),
        phone: Some("+79161234567".to_string()),
        ..UserProfile::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_rapid_typing_estimates_only_the_final_address() {
    let ctx = TestContext::new();
    ctx.session.add_item(margherita()).await;

    // Keystrokes 100ms apart, well inside the 400ms quiet period. Each
    // edit runs as its own task, the way UI event handlers fire.
    let mut edits = Vec::new();
    for (i, address) in ["L", "Len", "Lenina", "Lenina 5"].into_iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        let session = ctx.session.clone();
        edits.push(tokio::spawn(
            async move { session.edit_address(address).await },
        ));
    }
    for edit in edits {
        edit.await.expect("edit task");
    }

    assert_eq!(ctx.api.calls(), vec!["estimate:Lenina 5".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_out_of_order_completions_keep_the_later_request() {
    let ctx = TestContext::new();
    ctx.session.add_item(margherita()).await;
    ctx.api.script_estimate(
        "Slow street 1",
        ScriptedApi::available_estimate(300),
        Duration::from_millis(1000),
    );
    ctx.api.script_estimate(
        "Fast street 2",
        ScriptedApi::available_estimate(150),
        Duration::from_millis(10),
    );

    // First edit settles and its (slow) estimate goes in flight.
    let session = ctx.session.clone();
    let slow_edit = tokio::spawn(async move { session.edit_address("Slow street 1").await });
    tokio::time::sleep(Duration::from_millis(450)).await;

    // Second edit is issued later and completes first.
    let applied = ctx.session.edit_address("Fast street 2").await;
    assert!(applied.is_some());

    // The slow estimate completes afterwards and must not clobber the
    // newer quote.
    let stale = slow_edit.await.expect("slow edit task");
    assert!(stale.is_none());

    let totals = ctx.session.totals().await;
    assert_eq!(totals.delivery_cost, Decimal::from(150));
}

#[tokio::test(start_paused = true)]
async fn test_estimator_outage_still_allows_checkout_at_fallback_cost() {
    let ctx = TestContext::new();
    ctx.api.set_profile(known_user_profile());
    ctx.api.break_estimator();
    ctx.api.set_payment_url("https://pay.example/1");

    ctx.session.initialize().await.expect("initialize");
    ctx.session.add_item(margherita()).await;

    let applied = ctx.session.edit_address("Lenina 5").await;
    let issued = applied.expect("fallback quote applied");
    assert!(issued.quote.available);
    assert_eq!(issued.quote.cost, Decimal::from(250));
    assert!(issued.warning.is_some());

    let totals = ctx.session.totals().await;
    assert_eq!(totals.total, Decimal::from(750));

    let outcome = ctx.session.submit_order().await.expect("submit");
    assert!(matches!(outcome, SubmitOutcome::RedirectToPay { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_short_address_yields_unavailable_without_network() {
    let ctx = TestContext::new();
    ctx.session.add_item(margherita()).await;

    let applied = ctx.session.edit_address("ab").await;
    let issued = applied.expect("quote applied");
    assert!(!issued.quote.available);
    assert!(!ctx.api.calls().iter().any(|c| c.starts_with("estimate")));
}

#[tokio::test(start_paused = true)]
async fn test_free_delivery_over_threshold() {
    let ctx = TestContext::new();
    ctx.session.add_item(margherita()).await;
    ctx.api.script_estimate(
        "Lenina 5",
        DeliveryEstimateResponse {
            delivery_available: Some(true),
            delivery_cost: Some(Decimal::from(150)),
            is_delivery_free: Some(true),
            free_delivery_threshold: Some(Decimal::from(1000)),
            ..DeliveryEstimateResponse::default()
        },
        Duration::ZERO,
    );

    ctx.session.edit_address("Lenina 5").await;
    let totals = ctx.session.totals().await;
    assert_eq!(totals.delivery_cost, Decimal::ZERO);
    assert_eq!(totals.total, Decimal::from(500));
}
