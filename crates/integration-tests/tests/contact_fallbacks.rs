//! Contact acquisition fallback chains: timeout, cancellation, manual
//! entry, and shape-tolerant event handling.

use std::time::Duration;

use piatto_checkout::api::wire::UserProfile;
use piatto_checkout::host::{ContactEvent, HostError, SessionUser};
use piatto_checkout::types::{CartItem, DeliveryMethod, PaymentMethod, SubmitOutcome};
use piatto_core::ProductId;
use piatto_integration_tests::TestContext;
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

/// Context whose profile has a name but no phone, so acquisition starts
/// at initialize.
async fn phoneless_context() -> TestContext {
    let ctx = TestContext::new();
    ctx.api.set_profile(UserProfile {
        first_name: Some("Ivan".to_string()),
        ..UserProfile::default()
    });
    ctx.session.initialize().await.expect("initialize");
    ctx
}

fn event_json(raw: &str) -> ContactEvent {
    serde_json::from_str(raw).expect("event json")
}

#[tokio::test(start_paused = true)]
async fn test_timeout_falls_through_to_manual_entry() {
    let ctx = phoneless_context().await;
    assert_eq!(ctx.host.contact_requests(), 1);

    // No event ever arrives; the wait times out.
    let outcome = ctx.session.await_contact().await.expect("await");
    assert!(outcome.is_none());
    assert!(ctx.session.manual_phone_required().await);
    assert!(!ctx.host.alerts().is_empty());

    // Manual entry closes the gap in any accepted format.
    ctx.session
        .submit_manual_phone("8 (916) 123-45-67")
        .await
        .expect("manual phone");
    let contact = ctx.session.contact().await;
    assert_eq!(
        contact.phone.map(|p| p.to_string()).as_deref(),
        Some("+79161234567")
    );
    assert!(!ctx.session.manual_phone_required().await);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_falls_back_to_session_user_phone() {
    let ctx = phoneless_context().await;
    ctx.host.set_session_user(SessionUser {
        phone_number: Some("+7 916 123-45-67".to_string()),
        ..SessionUser::default()
    });

    ctx.host.send_event_after(
        Duration::from_millis(100),
        event_json(r#"{"status":"cancelled"}"#),
    );
    ctx.session.await_contact().await.expect("await");

    let contact = ctx.session.contact().await;
    assert_eq!(
        contact.phone.map(|p| p.to_string()).as_deref(),
        Some("+79161234567")
    );
    assert!(!ctx.session.manual_phone_required().await);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_without_fallback_requires_manual_entry() {
    let ctx = phoneless_context().await;

    ctx.host.send_event_after(
        Duration::from_millis(100),
        event_json(r#"{"status":"cancelled"}"#),
    );
    let outcome = ctx.session.await_contact().await.expect("await");

    assert!(outcome.is_none());
    assert!(ctx.session.manual_phone_required().await);
}

#[tokio::test(start_paused = true)]
async fn test_unrecognized_event_keeps_waiting_for_a_usable_one() {
    let ctx = phoneless_context().await;

    // A shape carrying no phone is dropped, not treated as an answer.
    ctx.host
        .send_event_after(Duration::from_millis(50), event_json(r#"{"status":"sent"}"#));
    ctx.host.send_event_after(
        Duration::from_millis(150),
        event_json(r#"{"first_name":"Ivan","phone_number":"89161234567"}"#),
    );

    ctx.session.await_contact().await.expect("await");
    let contact = ctx.session.contact().await;
    assert_eq!(
        contact.phone.map(|p| p.to_string()).as_deref(),
        Some("+79161234567")
    );
}

#[tokio::test(start_paused = true)]
async fn test_contact_prompt_is_never_duplicated() {
    let ctx = phoneless_context().await;
    assert_eq!(ctx.host.contact_requests(), 1);

    // Repeated submit attempts while the episode is open must not
    // re-prompt the host.
    ctx.session.add_item(margherita()).await;
    ctx.session
        .set_delivery_method(DeliveryMethod::Pickup)
        .await;
    ctx.session.set_payment_method(PaymentMethod::Cash).await;

    for _ in 0..3 {
        let outcome = ctx.session.submit_order().await.expect("submit");
        assert_eq!(outcome, SubmitOutcome::PendingContact);
    }
    assert_eq!(ctx.host.contact_requests(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_host_goes_straight_to_manual_entry() {
    let ctx = TestContext::new();
    ctx.api.set_profile(UserProfile {
        first_name: Some("Ivan".to_string()),
        ..UserProfile::default()
    });
    ctx.host
        .fail_contact_requests(HostError::Unsupported("requestContact".to_string()));

    ctx.session.initialize().await.expect("initialize");
    assert!(ctx.session.manual_phone_required().await);
    assert!(!ctx.host.alerts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_accepted_phone_survives_failed_reauth() {
    let ctx = phoneless_context().await;

    ctx.host.send_event_after(
        Duration::from_millis(50),
        event_json(r#"{"status":"sent","contact":{"phone_number":"+79161234567"}}"#),
    );
    ctx.session.await_contact().await.expect("await");

    // Give the background re-authentication task room to run; whatever
    // it does, the accepted phone stays.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let contact = ctx.session.contact().await;
    assert_eq!(
        contact.phone.map(|p| p.to_string()).as_deref(),
        Some("+79161234567")
    );
}
