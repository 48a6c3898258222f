mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{FakeDevice, FakePrice};
use heatgate::auth::SessionStore;
use heatgate::config::Config;
use heatgate::controller::{Controller, SharedController};
use heatgate::device::DeviceState;
use heatgate::web::{AppState, build_router};
use http_body_util::BodyExt as _;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tower::ServiceExt;

struct Harness {
    router: axum::Router,
    controller: SharedController,
    price: Arc<FakePrice>,
    device: Arc<FakeDevice>,
}

fn harness() -> Harness {
    let mut cfg = Config::default();
    cfg.thresholds.start_price = 5.0;
    cfg.thresholds.stop_price = 10.0;
    cfg.device.api_key = "live-key".to_string();
    cfg.auth.admin_password = "secret".to_string();

    let price = Arc::new(FakePrice::new(Some(3.0)));
    let device = Arc::new(FakeDevice::with_state(DeviceState::default()));
    let controller = Controller::new(cfg, price.clone(), device.clone())
        .unwrap()
        .into_shared();
    let sessions = Arc::new(SessionStore::with_ttl("secret", Duration::from_secs(60), 4).unwrap());
    Harness {
        router: build_router(AppState {
            controller: controller.clone(),
            sessions,
        }),
        controller,
        price,
        device,
    }
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login(router: &axum::Router) -> String {
    let resp = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"password":"secret"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    set_cookie.split(';').next().unwrap().to_string()
}

fn authed(method: &str, uri: &str, cookie: &str, body: Option<&str>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie);
    match body {
        Some(b) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn health_is_public() {
    let h = harness();
    let resp = h
        .router
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn api_requires_login() {
    let h = harness();
    let resp = h
        .router
        .clone()
        .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["error"], "Login required");

    let resp = h
        .router
        .oneshot(authed("GET", "/api/status", "heatgate_session=forged", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn pages_redirect_to_login() {
    let h = harness();
    let resp = h
        .router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(resp.status().is_redirection());
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap().to_str().unwrap(),
        "/login"
    );
}

#[tokio::test]
async fn form_login_sets_cookie() {
    let h = harness();
    let resp = h
        .router
        .clone()
        .oneshot(
            Request::post("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("password=wrong"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let html = resp.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&html).contains("Invalid password"));

    let resp = h
        .router
        .clone()
        .oneshot(
            Request::post("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("password=secret"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(resp.status().is_redirection());
    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let resp = h
        .router
        .oneshot(authed("GET", "/", &cookie, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = resp.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&html).contains("Heatgate"));
}

#[tokio::test]
async fn logout_ends_session() {
    let h = harness();
    let cookie = login(&h.router).await;
    let resp = h
        .router
        .clone()
        .oneshot(authed("POST", "/logout", &cookie, None))
        .await
        .unwrap();
    assert!(resp.status().is_redirection());

    let resp = h
        .router
        .oneshot(authed("GET", "/api/thresholds", &cookie, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn thresholds_roundtrip_and_validation() {
    let h = harness();
    let cookie = login(&h.router).await;

    let resp = h
        .router
        .clone()
        .oneshot(authed(
            "PUT",
            "/api/thresholds",
            &cookie,
            Some(r#"{"start_price":12.0,"stop_price":8.0}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = h
        .router
        .clone()
        .oneshot(authed(
            "PUT",
            "/api/thresholds",
            &cookie,
            Some(r#"{"start_price":6.5,"stop_price":9.0}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = h
        .router
        .oneshot(authed("GET", "/api/thresholds", &cookie, None))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["start_price"], 6.5);
    assert_eq!(json["stop_price"], 9.0);
}

#[tokio::test]
async fn price_endpoint_runs_a_cycle() {
    let h = harness();
    let cookie = login(&h.router).await;

    let resp = h
        .router
        .clone()
        .oneshot(authed("GET", "/api/price", &cookie, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["price"], 3.0);
    assert_eq!(json["zone"], "SE3");
    assert_eq!(h.device.applied().len(), 1);

    h.price.set(None);
    let resp = h
        .router
        .oneshot(authed("GET", "/api/price", &cookie, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(resp).await["error"],
        "Failed to fetch electricity price"
    );
}

#[tokio::test]
async fn override_set_and_clear() {
    let h = harness();
    let cookie = login(&h.router).await;

    h.device.fail_apply.store(true, Ordering::SeqCst);
    let resp = h
        .router
        .clone()
        .oneshot(authed(
            "POST",
            "/api/override",
            &cookie,
            Some(r#"{"state":"on"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(resp).await["error"], "Failed to turn on heat pump");

    h.device.fail_apply.store(false, Ordering::SeqCst);
    let resp = h
        .router
        .clone()
        .oneshot(authed(
            "POST",
            "/api/override",
            &cookie,
            Some(r#"{"state":"off"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = h
        .router
        .clone()
        .oneshot(authed("GET", "/api/status", &cookie, None))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["manual_override"]["state"], "off");
    assert_eq!(json["last_commanded"], "off");

    let resp = h
        .router
        .oneshot(authed("DELETE", "/api/override", &cookie, None))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["cleared"], "off");
}

#[tokio::test]
async fn config_is_redacted() {
    let h = harness();
    let cookie = login(&h.router).await;
    let resp = h
        .router
        .oneshot(authed("GET", "/api/config", &cookie, None))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["device"]["api_key"], "***");
    assert_eq!(json["auth"]["admin_password"], "***");
    assert_eq!(json["price"]["zone"], "SE3");
}

#[tokio::test]
async fn status_reads_device_without_holding_the_controller() {
    let h = harness();
    let cookie = login(&h.router).await;
    h.device.gate_reads.store(true, Ordering::SeqCst);

    let pending = tokio::spawn(
        h.router
            .clone()
            .oneshot(authed("GET", "/api/status", &cookie, None)),
    );
    while h.device.reads() == 0 {
        tokio::task::yield_now().await;
    }

    // The device read is parked; the controller must still be free
    assert!(h.controller.try_lock().is_ok());

    h.device.release_read();
    let resp = pending.await.unwrap().unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["zone"], "SE3");
    assert!(json.get("device").is_some());
}

#[tokio::test]
async fn status_page_renders_for_logged_in_user() {
    let h = harness();
    let cookie = login(&h.router).await;
    let resp = h
        .router
        .clone()
        .oneshot(authed("GET", "/", &cookie, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("SE3"));
    assert!(html.contains("5.00 öre/kWh"));
}
