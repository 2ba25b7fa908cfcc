//! `HttpLedger` against an in-process server.

mod common;

use std::sync::Arc;
use std::sync::Mutex;

use axum::http::StatusCode;
use serde_json::json;

use common::{Ledger, StubServer};
use rollcall::api::EventRegistration;
use rollcall::{
    Category, DashboardSession, Error, HttpLedger, Identity, LedgerApi, MemberDirectory,
    SubmitOutcome, Submitter,
};

#[tokio::test]
async fn test_list_members() {
    let server = StubServer::start(Ledger {
        members: vec!["Alice Smith".to_string(), "Bob Jones".to_string()],
        ..Ledger::default()
    })
    .await;
    let ledger = HttpLedger::new(&server.config()).unwrap();

    let mut directory = MemberDirectory::new();
    directory.refresh(&ledger).await.unwrap();

    assert_eq!(directory.members(), ["Alice Smith", "Bob Jones"]);
}

#[tokio::test]
async fn test_list_records_keeps_server_order() {
    let server = StubServer::start(Ledger {
        records: Mutex::new(vec![
            json!({"name": "Bob", "type": "guest", "timestamp": "2024-05-01T18:00:00Z"}),
            json!({"name": "Ann", "type": "member", "timestamp": "2024-05-01T19:00:00.000Z",
                   "received_at": "2024-05-01T19:00:00.050"}),
        ]),
        ..Ledger::default()
    })
    .await;
    let ledger = HttpLedger::new(&server.config()).unwrap();

    let records = ledger.list_records().await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "Bob");
    assert_eq!(records[0].category, Category::Guest);
    assert_eq!(records[1].name, "Ann");
    assert_eq!(records[1].category, Category::Member);
    assert_eq!(records[1].received_at.as_deref(), Some("2024-05-01T19:00:00.050"));
}

#[tokio::test]
async fn test_session_load_over_http() {
    let server = StubServer::start(Ledger {
        records: Mutex::new(vec![
            json!({"name": "Bob", "type": "guest", "timestamp": "2024-05-01T18:00:00Z"}),
            json!({"name": "Ann", "type": "member", "timestamp": "2024-05-01T19:00:00Z"}),
            json!({"name": "Cat", "type": "member", "timestamp": "2024-05-01T19:05:00Z"}),
        ]),
        ..Ledger::default()
    })
    .await;
    let ledger = Arc::new(HttpLedger::new(&server.config()).unwrap());

    let mut session = DashboardSession::new(ledger, true);
    session.load().await.unwrap();

    let stats = session.stats();
    assert_eq!((stats.total, stats.guest_count, stats.member_count), (3, 1, 2));
    let newest: Vec<_> = session.store().recent_first().map(|r| r.name.as_str()).collect();
    assert_eq!(newest, ["Cat", "Ann", "Bob"]);
}

#[tokio::test]
async fn test_naive_timestamp_row_does_not_hide_the_ledger() {
    let server = StubServer::start(Ledger {
        records: Mutex::new(vec![
            json!({"name": "Bob", "type": "guest", "timestamp": "2024-05-01T18:00:00Z"}),
            json!({"name": "Ann", "type": "member", "timestamp": "2024-05-01T19:00:00"}),
            json!({"name": "Eve", "type": "member", "timestamp": "not a time"}),
        ]),
        ..Ledger::default()
    })
    .await;
    let ledger = Arc::new(HttpLedger::new(&server.config()).unwrap());

    let mut session = DashboardSession::new(ledger, true);
    session.load().await.unwrap();

    let names: Vec<_> = session.store().snapshot().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Bob", "Ann"]);
    let stats = session.stats();
    assert_eq!((stats.total, stats.guest_count, stats.member_count), (2, 1, 1));
    assert_eq!(
        session.store().snapshot()[1].timestamp.to_rfc3339(),
        "2024-05-01T19:00:00+00:00"
    );
}

#[tokio::test]
async fn test_submit_checkin_wire_format() {
    let server = StubServer::start(Ledger::default()).await;
    let submitter = Submitter::new(Arc::new(HttpLedger::new(&server.config()).unwrap()));

    let outcome = submitter
        .submit(&Identity::new("Alice Smith", Category::Member), None)
        .await
        .unwrap();

    assert_eq!(outcome, SubmitOutcome::Accepted);
    let checkins = server.ledger.checkins.lock().unwrap();
    assert_eq!(checkins.len(), 1);
    assert_eq!(checkins[0]["name"], "Alice Smith");
    assert_eq!(checkins[0]["type"], "member");
    let time = checkins[0]["currentTime"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(time).is_ok());
}

#[tokio::test]
async fn test_rejected_checkin() {
    let server = StubServer::start(Ledger {
        checkin_status: Some(StatusCode::BAD_REQUEST),
        ..Ledger::default()
    })
    .await;
    let submitter = Submitter::new(Arc::new(HttpLedger::new(&server.config()).unwrap()));

    let err = submitter
        .submit(&Identity::new("Zed", Category::Guest), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ServerRejected { status: 400, .. }));
    assert!(server.ledger.checkins.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_register_event() {
    let server = StubServer::start(Ledger::default()).await;
    let ledger = HttpLedger::new(&server.config()).unwrap();

    ledger
        .register_event(&EventRegistration {
            name: "Gala".to_string(),
            date: "2024-05-01".to_string(),
        })
        .await
        .unwrap();

    let events = server.ledger.events.lock().unwrap();
    assert_eq!(*events, [json!({"name": "Gala", "date": "2024-05-01"})]);
}

#[tokio::test]
async fn test_issued_event_is_registered() {
    let server = StubServer::start(Ledger::default()).await;
    let ledger = Arc::new(HttpLedger::new(&server.config()).unwrap());

    let issued = rollcall::issuer::issue(ledger, "Gala", "2024-05-01")
        .unwrap()
        .unwrap();
    issued.registration.await.unwrap();

    assert_eq!(server.ledger.events.lock().unwrap().len(), 1);
    assert_eq!(rollcall::decode(&issued.payload).unwrap(), issued.context);
}

#[tokio::test]
async fn test_unreachable_server_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = rollcall::Config::default();
    config.api.development_origin = format!("http://{addr}");
    let ledger = HttpLedger::new(&config).unwrap();

    let err = ledger.list_records().await.unwrap_err();
    assert!(err.is_network());
}

#[tokio::test]
async fn test_submit_to_unreachable_server_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = rollcall::Config::default();
    config.api.development_origin = format!("http://{addr}");
    let submitter = Submitter::new(Arc::new(HttpLedger::new(&config).unwrap()));

    let err = submitter
        .submit(&Identity::new("Alice Smith", Category::Member), None)
        .await
        .unwrap_err();

    assert!(err.is_network());
    assert!(!err.is_server_rejected());
    assert!(matches!(err, Error::Network { endpoint: "/api/checkin", .. }));
}

#[tokio::test]
async fn test_unknown_route_is_rejected() {
    let server = StubServer::start(Ledger::default()).await;
    let mut config = server.config();
    config.api.development_origin = format!("{}/missing", server.origin());
    let ledger = HttpLedger::new(&config).unwrap();

    let err = ledger.list_members().await.unwrap_err();
    assert!(matches!(err, Error::ServerRejected { status: 404, .. }));
}
