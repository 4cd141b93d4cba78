//! Push events and reconnects over the live connection.

mod common;

use common::{client, eventually, reviews_settled, FakeBackend};
use gupsik_client::{ClientIdentity, ConnectionState};
use serde_json::json;
use std::time::Duration;

const DATE: &str = "2024-05-02";

#[tokio::test]
async fn connection_count_reaches_header() {
    let backend = FakeBackend::start().await;
    let (_dir, app) = client(&backend);
    let identity = ClientIdentity::generate();

    let manager = app.connect(&identity);
    eventually("connection count", || async {
        app.snapshot().await.header.connections == Some(1)
    })
    .await;

    assert_eq!(manager.state(), ConnectionState::Open);
    assert_eq!(
        backend.state.ws_client_ids.lock().unwrap().as_slice(),
        [identity.as_str().to_string()]
    );

    backend.push(json!({ "type": "connection_count", "count": 12 }));
    eventually("updated count", || async {
        app.snapshot().await.header.connections == Some(12)
    })
    .await;

    manager.shutdown().await;
}

#[tokio::test]
async fn reaction_push_updates_visible_card() {
    let backend = FakeBackend::start().await;
    backend.set_meals(DATE, &[("A", "가람중학교"), ("B", "나래고등학교")]);
    let (_dir, app) = client(&backend);

    app.select_date(DATE).await.unwrap();
    reviews_settled(&app).await;
    let manager = app.connect(&ClientIdentity::generate());
    eventually("socket open", || async {
        app.snapshot().await.header.connections.is_some()
    })
    .await;

    // Unknown, malformed and off-screen messages are dropped
    backend.push(json!({ "type": "weather", "sunny": true }));
    backend.push_raw("not json");
    backend.push(json!({ "type": "reaction", "school_code": "Z", "likes": 99 }));
    backend.push(json!({ "type": "reaction", "school_code": "B", "likes": 11 }));

    eventually("pushed likes", || async {
        app.snapshot()
            .await
            .cards
            .iter()
            .any(|card| card.school_code == "B" && card.likes == 11)
    })
    .await;

    let snapshot = app.snapshot().await;
    assert_eq!(snapshot.cards.len(), 2);
    assert!(snapshot.cards.iter().all(|card| card.school_code != "Z"));
    assert_eq!(manager.state(), ConnectionState::Open);

    manager.shutdown().await;
}

#[tokio::test]
async fn reconnects_after_server_close() {
    let backend = FakeBackend::start().await;
    let (_dir, app) = client(&backend);

    let manager = app.connect(&ClientIdentity::generate());
    let mut handle = manager.handle();
    tokio::time::timeout(Duration::from_secs(5), handle.wait_for(ConnectionState::Open))
        .await
        .unwrap();
    eventually("first socket registered", || async {
        backend.ws_connections() == 1
    })
    .await;

    backend.close_sockets();

    eventually("second socket", || async { backend.ws_connections() == 2 }).await;
    eventually("open again with backoff reset", || async {
        manager.state() == ConnectionState::Open
            && manager.current_backoff() == app.config().reconnect_floor
    })
    .await;

    manager.shutdown().await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn connect_is_idempotent() {
    let backend = FakeBackend::start().await;
    let (_dir, app) = client(&backend);

    let manager = app.connect(&ClientIdentity::generate());
    let mut handle = manager.handle();
    tokio::time::timeout(Duration::from_secs(5), handle.wait_for(ConnectionState::Open))
        .await
        .unwrap();

    manager.connect();
    manager.connect();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(backend.ws_connections(), 1);
    manager.shutdown().await;
}

#[tokio::test]
async fn unreachable_server_raises_connection_notices() {
    let backend = FakeBackend::start().await;
    let (_dir, app) = common::client_with(&backend, |config| {
        config.server_url = "http://127.0.0.1:9".into();
    });
    let mut notices = app.notices();

    let manager = app.connect(&ClientIdentity::generate());
    let notice = tokio::time::timeout(Duration::from_secs(5), notices.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(notice, gupsik_client::Notice::ConnectionProblem(_)));
    assert_ne!(manager.state(), ConnectionState::Open);

    manager.shutdown().await;
}

#[tokio::test]
async fn app_connect_reuses_connection() {
    let backend = FakeBackend::start().await;
    let (_dir, app) = client(&backend);
    let identity = ClientIdentity::generate();

    let first = app.connect(&identity);
    let mut handle = first.handle();
    tokio::time::timeout(Duration::from_secs(5), handle.wait_for(ConnectionState::Open))
        .await
        .unwrap();
    let second = app.connect(&identity);
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert!(app.connection().is_some());
    assert_eq!(backend.ws_connections(), 1);

    app.close().await;
    assert!(app.connection().is_none());
    assert_eq!(first.state(), ConnectionState::Disconnected);
}
