use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use courier_client::config::ApiConfig;
use courier_client::gateway::{ApiResponse, Gateway};
use courier_client::models::courier::Availability;
use courier_client::models::order::OrderStatus;
use courier_client::services::{AuthService, OrderService, ProfileService};
use courier_client::store::{OrderStore, SessionStore};
use courier_client::token::TokenStore;

struct Harness {
    server: MockServer,
    tokens: Arc<TokenStore>,
    session: SessionStore,
    orders: OrderStore,
    order_service: OrderService,
    profile_service: ProfileService,
}

async fn harness() -> Harness {
    harness_with_timeout(Duration::from_secs(5)).await
}

async fn harness_with_timeout(timeout: Duration) -> Harness {
    let server = MockServer::start().await;

    let config = ApiConfig {
        base_url: format!("{}/api/delivery", server.uri()),
        orders_base_url: format!("{}/api", server.uri()),
        timeout,
        token_file: None,
        log_level: "info".to_string(),
        refresh_interval: Duration::from_secs(30),
        tracking_interval: Duration::from_secs(30),
        courier_email: None,
        courier_password: None,
    };

    let tokens = Arc::new(TokenStore::new(None));
    let gateway = Arc::new(Gateway::new(config, tokens.clone()).unwrap());

    let auth = AuthService::new(gateway.clone(), tokens.clone());
    let profile_service = ProfileService::new(gateway.clone());
    let order_service = OrderService::new(gateway);

    let session = SessionStore::new(auth, profile_service.clone(), tokens.clone());
    let orders = OrderStore::new(order_service.clone(), profile_service.clone());

    Harness {
        server,
        tokens,
        session,
        orders,
        order_service,
        profile_service,
    }
}

fn courier_json(id: &str) -> Value {
    json!({
        "_id": id,
        "firstName": "Asha",
        "lastName": "Patel",
        "email": "courier@example.com",
        "phone": "555-0100",
        "status": "active",
        "availability": "available",
        "totalDeliveries": 12,
        "completedDeliveries": 11,
        "rating": 4.8
    })
}

fn order_json(id: &str, status: &str) -> Value {
    json!({
        "_id": id,
        "orderNumber": format!("ORD-{id}"),
        "status": status,
        "pricing": { "subtotal": 20.0, "deliveryFee": 3.0, "tax": 1.5, "discount": 0.0, "total": 24.5 }
    })
}

fn success(data: Value) -> Value {
    json!({ "success": true, "message": "ok", "data": data })
}

async fn mount_pending(server: &MockServer, orders: Value) {
    Mock::given(method("GET"))
        .and(path("/api/delivery/orders/pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(orders)))
        .mount(server)
        .await;
}

async fn mount_assigned(server: &MockServer, orders: Value) {
    Mock::given(method("GET"))
        .and(path("/api/delivery/orders/assigned"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(orders)))
        .mount(server)
        .await;
}

async fn login(h: &Harness) {
    Mock::given(method("POST"))
        .and(path("/api/delivery/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Login successful",
            "data": courier_json("c1"),
            "token": "abc123"
        })))
        .mount(&h.server)
        .await;

    assert!(h.session.login("courier@example.com", "secret123").await);
}

#[tokio::test]
async fn login_persists_token_and_authenticates() {
    let h = harness().await;

    Mock::given(method("POST"))
        .and(path("/api/delivery/login"))
        .and(body_json(json!({
            "email": "courier@example.com",
            "password": "secret123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Login successful",
            "data": courier_json("c1"),
            "token": "abc123"
        })))
        .mount(&h.server)
        .await;

    assert!(h.session.login("courier@example.com", "secret123").await);
    assert_eq!(h.tokens.current().as_deref(), Some("abc123"));
    assert!(h.session.is_authenticated());
    assert!(h.session.error().is_none());
}

#[tokio::test]
async fn rejected_login_sets_error_and_stays_logged_out() {
    let h = harness().await;

    Mock::given(method("POST"))
        .and(path("/api/delivery/login"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "message": "Invalid credentials"
        })))
        .mount(&h.server)
        .await;

    assert!(!h.session.login("courier@example.com", "wrong").await);
    assert_eq!(h.session.error().as_deref(), Some("Invalid credentials"));
    assert!(!h.session.is_authenticated());
    assert_eq!(h.tokens.current(), None);
}

#[tokio::test]
async fn authenticated_requests_carry_the_bearer_header() {
    let h = harness().await;
    h.tokens.save("abc123").await;

    Mock::given(method("GET"))
        .and(path("/api/delivery/me"))
        .and(header("authorization", "Bearer abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(courier_json("c1"))))
        .expect(1)
        .mount(&h.server)
        .await;

    h.session.fetch_profile().await;
    assert_eq!(h.session.user().map(|u| u.id).as_deref(), Some("c1"));
}

#[tokio::test]
async fn unauthorized_response_evicts_the_credential() {
    let h = harness().await;
    h.tokens.save("stale-token").await;

    Mock::given(method("GET"))
        .and(path("/api/delivery/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Unauthorized"
        })))
        .mount(&h.server)
        .await;

    let response = h.profile_service.profile().await;
    assert!(!response.is_success());
    assert_eq!(h.tokens.current(), None);
    assert!(!h.session.is_authenticated());
}

#[tokio::test]
async fn startup_replay_restores_the_session() {
    let h = harness().await;
    h.tokens.save("abc123").await;

    Mock::given(method("GET"))
        .and(path("/api/delivery/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(courier_json("c1"))))
        .mount(&h.server)
        .await;

    h.session.initialize().await;
    assert!(h.session.is_authenticated());
    assert!(h.session.profile().is_some());
}

#[tokio::test]
async fn startup_replay_with_rejected_token_is_silent() {
    let h = harness().await;
    h.tokens.save("expired-token").await;

    Mock::given(method("GET"))
        .and(path("/api/delivery/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Token expired"
        })))
        .mount(&h.server)
        .await;

    h.session.initialize().await;

    assert!(!h.session.is_authenticated());
    assert!(h.session.user().is_none());
    // The one startup case that must not surface an error.
    assert!(h.session.error().is_none());
}

#[tokio::test]
async fn logout_clears_the_session_when_the_server_agrees() {
    let h = harness().await;
    login(&h).await;

    Mock::given(method("POST"))
        .and(path("/api/delivery/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Logged out",
            "data": null
        })))
        .mount(&h.server)
        .await;

    h.session.logout().await;

    assert!(h.session.user().is_none());
    assert_eq!(h.tokens.current(), None);
    assert!(!h.session.is_authenticated());
}

#[tokio::test]
async fn logout_clears_the_session_even_when_the_server_fails() {
    let h = harness().await;
    login(&h).await;

    Mock::given(method("POST"))
        .and(path("/api/delivery/logout"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "success": false,
            "message": "boom"
        })))
        .mount(&h.server)
        .await;

    h.session.logout().await;

    assert!(h.session.user().is_none());
    assert_eq!(h.tokens.current(), None);
    assert!(!h.session.is_authenticated());
}

#[tokio::test]
async fn slow_responses_fail_with_a_timeout_message() {
    let h = harness_with_timeout(Duration::from_millis(250)).await;

    Mock::given(method("GET"))
        .and(path("/api/delivery/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success(courier_json("c1")))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&h.server)
        .await;

    let response = h.profile_service.profile().await;
    let ApiResponse::Failure { message, .. } = response else {
        panic!("expected timeout failure");
    };
    assert_eq!(message, "Request timeout");
}

#[tokio::test]
async fn accept_moves_the_order_using_the_server_copy() {
    let h = harness().await;

    mount_pending(&h.server, json!([order_json("o1", "pending")])).await;
    h.orders.fetch_pending().await;
    assert_eq!(h.orders.pending().len(), 1);

    // The server enriches the order on accept; that copy must win over the
    // cached pending one.
    Mock::given(method("POST"))
        .and(path("/api/delivery/orders/o1/accept"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(json!({
            "_id": "o1",
            "orderNumber": "ORD-o1-ENRICHED",
            "status": "confirmed"
        }))))
        .mount(&h.server)
        .await;

    assert!(h.orders.accept_order("o1").await);

    assert!(h.orders.pending().is_empty());
    let assigned = h.orders.assigned();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].order_number, "ORD-o1-ENRICHED");
    assert_eq!(assigned[0].status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn failed_accept_leaves_both_lists_untouched() {
    let h = harness().await;

    mount_pending(&h.server, json!([order_json("o1", "pending")])).await;
    h.orders.fetch_pending().await;

    Mock::given(method("POST"))
        .and(path("/api/delivery/orders/o1/accept"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "success": false,
            "message": "Order already taken"
        })))
        .mount(&h.server)
        .await;

    assert!(!h.orders.accept_order("o1").await);

    assert_eq!(h.orders.pending().len(), 1);
    assert!(h.orders.assigned().is_empty());
    assert_eq!(
        h.orders.action_error().as_deref(),
        Some("Order already taken")
    );
}

#[tokio::test]
async fn entry_without_an_id_is_dropped_from_the_list() {
    let h = harness().await;

    mount_pending(
        &h.server,
        json!([
            order_json("o1", "pending"),
            { "orderNumber": "ORD-broken", "status": "pending" }
        ]),
    )
    .await;

    h.orders.fetch_pending().await;

    let pending = h.orders.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, "o1");
    assert!(h.orders.pending_error().is_none());
}

#[tokio::test]
async fn out_for_delivery_updates_the_list_entry_and_the_selection() {
    let h = harness().await;

    mount_assigned(&h.server, json!([order_json("o1", "confirmed")])).await;
    h.orders.fetch_assigned().await;
    h.orders.select_order(h.orders.assigned().first().cloned());

    Mock::given(method("PUT"))
        .and(path("/api/delivery/orders/o1/out-for-delivery"))
        .and(body_json(json!({ "notes": "" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success(order_json("o1", "out-for-delivery"))),
        )
        .mount(&h.server)
        .await;

    assert!(h.orders.mark_out_for_delivery("o1", None).await);

    assert_eq!(h.orders.assigned()[0].status, OrderStatus::OutForDelivery);
    let selected = h.orders.selected().expect("selection kept");
    assert_eq!(selected.status, OrderStatus::OutForDelivery);
}

#[tokio::test]
async fn delivered_removes_the_order_and_refreshes_stats_once() {
    let h = harness().await;

    mount_assigned(&h.server, json!([order_json("o1", "out-for-delivery")])).await;
    h.orders.fetch_assigned().await;
    h.orders.select_order(h.orders.assigned().first().cloned());

    Mock::given(method("PUT"))
        .and(path("/api/delivery/orders/o1/delivered"))
        .and(body_json(json!({ "notes": "left at door", "otp": "" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(order_json("o1", "delivered"))))
        .mount(&h.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/delivery/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(json!({
            "totalDeliveries": 13,
            "completedDeliveries": 12,
            "rating": 4.8,
            "averageDeliveryTime": 27.5,
            "availability": "available",
            "status": "active"
        }))))
        .expect(1)
        .mount(&h.server)
        .await;

    assert!(h.orders.mark_delivered("o1", Some("left at door"), None).await);

    assert!(h.orders.assigned().is_empty());
    assert!(h.orders.selected().is_none());
    assert_eq!(h.orders.stats().map(|s| s.completed_deliveries), Some(12));
}

#[tokio::test]
async fn failed_delivery_keeps_the_order_and_skips_the_stats_refresh() {
    let h = harness().await;

    mount_assigned(&h.server, json!([order_json("o1", "out-for-delivery")])).await;
    h.orders.fetch_assigned().await;

    Mock::given(method("PUT"))
        .and(path("/api/delivery/orders/o1/delivered"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "message": "OTP mismatch"
        })))
        .mount(&h.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/delivery/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(json!({}))))
        .expect(0)
        .mount(&h.server)
        .await;

    assert!(!h.orders.mark_delivered("o1", None, Some("0000")).await);

    assert_eq!(h.orders.assigned().len(), 1);
    assert_eq!(h.orders.action_error().as_deref(), Some("OTP mismatch"));
}

#[tokio::test]
async fn out_of_range_coordinates_never_reach_the_network() {
    let h = harness().await;

    Mock::given(method("PUT"))
        .and(path("/api/delivery/location"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(courier_json("c1"))))
        .expect(0)
        .mount(&h.server)
        .await;

    assert!(!h.profile_service.update_location(91.0, 0.0).await.is_success());
    assert!(!h.profile_service.update_location(0.0, 181.0).await.is_success());
}

#[tokio::test]
async fn order_detail_uses_the_resource_scoped_base() {
    let h = harness().await;

    // Courier-scoped base must not see this request.
    Mock::given(method("GET"))
        .and(path("/api/delivery/orders/o9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(json!(null))))
        .expect(0)
        .mount(&h.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/orders/o9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(order_json("o9", "pending"))))
        .expect(1)
        .mount(&h.server)
        .await;

    let order = h
        .order_service
        .order_details("o9")
        .await
        .into_data()
        .expect("order detail payload");
    assert_eq!(order.id, "o9");
}

#[tokio::test]
async fn availability_update_replaces_the_user_with_the_server_copy() {
    let h = harness().await;
    login(&h).await;

    let mut busy = courier_json("c1");
    busy["availability"] = json!("busy");
    busy["totalDeliveries"] = json!(13);

    Mock::given(method("PUT"))
        .and(path("/api/delivery/availability"))
        .and(body_json(json!({ "availability": "busy" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(busy)))
        .mount(&h.server)
        .await;

    assert!(h.session.update_availability(Availability::Busy).await);

    let user = h.session.user().expect("user present");
    assert_eq!(user.availability, Availability::Busy);
    assert_eq!(user.total_deliveries, 13);
}

#[tokio::test]
async fn refresh_all_survives_a_partial_failure() {
    let h = harness().await;

    mount_pending(&h.server, json!([order_json("o1", "pending")])).await;

    Mock::given(method("GET"))
        .and(path("/api/delivery/orders/assigned"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "success": false,
            "message": "assigned listing broke"
        })))
        .mount(&h.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/delivery/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(json!({
            "totalDeliveries": 13,
            "completedDeliveries": 12,
            "rating": 4.8,
            "averageDeliveryTime": 27.5,
            "availability": "available",
            "status": "active"
        }))))
        .mount(&h.server)
        .await;

    h.orders.refresh_all().await;

    assert_eq!(h.orders.pending().len(), 1);
    assert!(h.orders.pending_error().is_none());
    assert_eq!(
        h.orders.assigned_error().as_deref(),
        Some("assigned listing broke")
    );
    assert_eq!(h.orders.stats().map(|s| s.total_deliveries), Some(13));
}

#[tokio::test]
async fn an_order_id_never_lives_in_both_lists() {
    let h = harness().await;

    mount_pending(
        &h.server,
        json!([order_json("o1", "pending"), order_json("o2", "pending")]),
    )
    .await;
    mount_assigned(&h.server, json!([order_json("o3", "confirmed")])).await;

    h.orders.fetch_pending().await;
    h.orders.fetch_assigned().await;

    Mock::given(method("POST"))
        .and(path("/api/delivery/orders/o2/accept"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(order_json("o2", "confirmed"))))
        .mount(&h.server)
        .await;

    assert!(h.orders.accept_order("o2").await);

    let pending_ids: Vec<String> = h.orders.pending().iter().map(|o| o.id.clone()).collect();
    let assigned_ids: Vec<String> = h.orders.assigned().iter().map(|o| o.id.clone()).collect();

    for id in &pending_ids {
        assert!(!assigned_ids.contains(id), "{id} present in both lists");
    }
    assert_eq!(pending_ids, vec!["o1"]);
    assert_eq!(assigned_ids, vec!["o3", "o2"]);
}
