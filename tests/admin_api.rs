//! Admin API served over a real socket, exercised with reqwest.

use std::sync::Arc;

use backend_guard::admin::setup_admin_router;
use backend_guard::http::RequestDescriptor;
use backend_guard::lifecycle::GuardContext;
use serde_json::Value;
use tokio::net::TcpListener;

mod common;

const KEY: &str = "integration-key";

async fn start_admin(ctx: Arc<GuardContext>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = setup_admin_router(ctx);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_admin_reflects_pipeline_state() {
    let backend = common::start_programmable_backend(|_, path| async move {
        match path.as_str() {
            "/health" => (503, "{}".into()),
            _ => (400, "{\"message\":\"bad filter\"}".into()),
        }
    })
    .await;

    let mut config = common::test_config(backend);
    config.admin.api_key = KEY.into();
    let ctx = Arc::new(GuardContext::from_config(config).unwrap());
    let admin = start_admin(ctx.clone()).await;
    let http = reqwest::Client::new();

    let url = ctx.client().url("/api/reports?filter=latest").unwrap();
    assert!(ctx.client().send(RequestDescriptor::get(url)).await.is_err());

    let errors: Value = http
        .get(format!("{}/admin/errors", admin))
        .bearer_auth(KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(errors[0]["message"], "bad filter");
    assert_eq!(errors[0]["severity"], "medium");
    assert_eq!(errors[0]["request"]["method"], "GET");

    let health: Value = http
        .post(format!("{}/admin/health/check", admin))
        .bearer_auth(KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["is_online"], false);
    assert_eq!(health["error"], "Server error");

    let status: Value = http
        .get(format!("{}/admin/status", admin))
        .bearer_auth(KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "degraded");
    assert_eq!(status["queued_errors"], 1);

    let cleared = http
        .delete(format!("{}/admin/errors", admin))
        .bearer_auth(KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(cleared.status().as_u16(), 204);
    assert!(ctx.reporter().queued_errors().is_empty());
}

#[tokio::test]
async fn test_admin_requires_key() {
    let ctx = Arc::new(GuardContext::from_config(common::test_config(common::unused_addr())).unwrap());
    let admin = start_admin(ctx).await;

    let response = reqwest::get(format!("{}/admin/status", admin)).await.unwrap();
    assert_eq!(response.status().as_u16(), 401);
}
