use std::time::Duration;

use axum::Router;
use pulse_driver::{Aggregate, Driver, HttpTransport, RetryPolicy, TargetDescriptor};
use pulse_echo::{app, EchoResponse};

async fn spawn_app(message: &str) -> String {
    let app: Router = app(message);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap(); });
    format!("http://{}:{}", addr.ip(), addr.port())
}

#[tokio::test]
async fn echo_health_and_metrics() {
    let base = spawn_app("Hello world!").await;
    let client = reqwest::Client::new();

    let body = serde_json::json!({"user_input": "hello", "history": []});
    let r = client.post(format!("{}/", base)).json(&body).send().await.unwrap();
    assert!(r.status().is_success());
    let echoed: EchoResponse = r.json().await.unwrap();
    assert_eq!(echoed.result, "Hello world!");

    let r = client.get(format!("{}/", base)).send().await.unwrap();
    assert_eq!(r.json::<EchoResponse>().await.unwrap().result, "Hello world!");

    let r = client.get(format!("{}/healthz", base)).send().await.unwrap();
    assert_eq!(r.text().await.unwrap(), "ok");

    let r = client.get(format!("{}/metrics", base)).send().await.unwrap();
    assert!(r.text().await.unwrap().contains("pulse_echo_requests_total"));
}

#[tokio::test]
async fn driver_against_echo_counts_every_request() {
    let base = spawn_app("Hello world!").await;
    let target = TargetDescriptor::new(&format!("{}/", base), "secret", TargetDescriptor::default_payload()).unwrap();
    let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
    let driver = Driver::new(transport, target).with_parallelism(3);

    driver.preflight().await.unwrap();
    let report = driver.run_cycle().await;
    assert_eq!(report.aggregate.count(r#"{"result":"Hello world!"}"#), 3);
    assert_eq!(report.aggregate.count(Aggregate::ERROR_KEY), 0);
}

#[tokio::test]
async fn unreachable_target_exhausts() {
    // Bind then drop to get a port nobody listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let target = TargetDescriptor::new(&format!("http://{}/", addr), "secret", TargetDescriptor::default_payload()).unwrap();
    let policy = RetryPolicy { backoff: Duration::from_millis(10), ..RetryPolicy::default() };
    let driver = Driver::new(HttpTransport::new(Duration::from_secs(2)).unwrap(), target)
        .with_policy(policy)
        .with_parallelism(2);

    let report = driver.run_cycle().await;
    assert_eq!(report.aggregate.count("exhausted"), 2);
    assert!(driver.preflight().await.is_err());
}
