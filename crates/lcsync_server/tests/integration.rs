//! End-to-end tests over the server facade: every transport against one
//! shared scheduler, driven by manual ticks and by the run loop.

use chrono::{Duration as ChronoDuration, Utc};
use lcsync_protocol::{IngestRequest, StreamFrame};
use lcsync_server::{ServerConfig, SyncServer};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("lcsync_engine=debug,lcsync_server=debug")
        .with_test_writer()
        .try_init();
}

fn minutes_ago(minutes: i64) -> String {
    (Utc::now() - ChronoDuration::minutes(minutes)).to_rfc3339()
}

fn ingest(server: &SyncServer, id: &str, minutes: i64) {
    server
        .handle_ingest(
            "sncb",
            IngestRequest {
                timestamp: minutes_ago(minutes),
                record_id: id.into(),
                payload: json!({"departureStop": "008812005"}),
            },
        )
        .unwrap();
}

#[test]
fn poll_resume_cycle() {
    init_tracing();
    let server = SyncServer::in_memory(ServerConfig::default());
    ingest(&server, "ev-1", 30);
    ingest(&server, "ev-2", 20);

    let frame = server.handle_poll("sncb", &minutes_ago(40)).unwrap();
    assert_eq!(frame.records.len(), 2);

    // Resume from the returned anchor: only records strictly after the
    // boundary (plus the boundary record itself) are candidates
    let resumed = server
        .handle_poll("sncb", &frame.last_sync_time.to_rfc3339())
        .unwrap();
    assert_eq!(resumed.records.len(), 1);
    assert_eq!(resumed.records[0].id, "ev-2");
}

#[test]
fn push_stream_delivers_only_new_records() {
    init_tracing();
    let server = SyncServer::in_memory(ServerConfig::default());
    ingest(&server, "ev-1", 30);

    let mut session = server.open_push("sncb", &minutes_ago(40)).unwrap();

    server.scheduler().tick();
    let frame = session.try_next_frame().unwrap();
    assert_eq!(frame.as_sync().unwrap().records.len(), 1);

    // Nothing new: the next tick stays silent
    server.scheduler().tick();
    assert!(session.try_next_frame().is_none());

    // A record arriving mid-stream is delivered on the following tick
    ingest(&server, "ev-2", 0);
    server.scheduler().tick();
    let frame = session.try_next_frame().unwrap();
    assert_eq!(frame.as_sync().unwrap().records[0].id, "ev-2");
}

#[test]
fn duplex_rewind_and_error_reporting() {
    init_tracing();
    let server = SyncServer::in_memory(ServerConfig::default());
    ingest(&server, "ev-1", 30);

    let mut session = server.open_duplex("sncb", &minutes_ago(40)).unwrap();
    server.scheduler().tick();
    assert!(session.try_next_frame().unwrap().as_sync().is_some());

    // Rewind replays the history
    session.handle_message(&minutes_ago(40));
    server.scheduler().tick();
    let frame = session.try_next_frame().unwrap();
    assert_eq!(frame.as_sync().unwrap().records[0].id, "ev-1");

    // A malformed message earns an error frame, not a hangup
    session.handle_message("garbage");
    match session.try_next_frame().unwrap() {
        StreamFrame::Error(error) => assert_eq!(error.status, 400),
        StreamFrame::Sync(_) => panic!("expected an error frame"),
    }
    assert!(server.scheduler().is_registered(session.id()));
}

#[test]
fn dropped_session_stops_receiving() {
    init_tracing();
    let server = SyncServer::in_memory(ServerConfig::default());
    ingest(&server, "ev-1", 30);

    let session = server.open_push("sncb", &minutes_ago(40)).unwrap();
    assert_eq!(server.scheduler().active_count(), 1);

    drop(session);
    server.scheduler().tick();
    assert_eq!(server.scheduler().active_count(), 0);
}

#[test]
fn channels_are_isolated() {
    init_tracing();
    let server = SyncServer::in_memory(
        ServerConfig::default().with_channel("delijn"),
    );
    ingest(&server, "ev-1", 30);

    // The other channel sees nothing
    let frame = server.handle_poll("delijn", &minutes_ago(40)).unwrap();
    assert!(frame.records.is_empty());

    let frame = server.handle_poll("sncb", &minutes_ago(40)).unwrap();
    assert_eq!(frame.records.len(), 1);
}

#[test]
fn fragment_lookup_from_disk_layout() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let channel_dir = dir.path().join("sncb");
    std::fs::create_dir_all(channel_dir.join("connections")).unwrap();
    std::fs::write(
        channel_dir.join("events.json"),
        r#"[{"id": "ev-1", "timestamp": "2024-01-01T09:00:00Z", "delay": 60}]"#,
    )
    .unwrap();
    for name in [
        "2024-01-01T00:00:00.000Z.jsonld",
        "2024-01-02T00:00:00.000Z.jsonld",
    ] {
        std::fs::write(channel_dir.join("connections").join(name), "[]").unwrap();
    }

    let server = SyncServer::open(ServerConfig::new(dir.path())).unwrap();

    let partition = server
        .handle_fragment("sncb", "2024-01-01T12:00:00Z")
        .unwrap();
    assert!(partition
        .source
        .to_string_lossy()
        .contains("2024-01-01T00:00:00.000Z"));

    // Too early: no partition owns the instant
    let err = server
        .handle_fragment("sncb", "2023-12-31T12:00:00Z")
        .unwrap_err();
    assert_eq!(err.status_code(), 404);

    // The loaded store serves polls too, payload intact
    let frame = server.handle_poll("sncb", "2024-01-01T00:00:00Z").unwrap();
    assert_eq!(frame.records.len(), 1);
    assert_eq!(frame.records[0].payload["delay"], json!(60));
}

#[tokio::test]
async fn run_loop_serves_push_until_shutdown() {
    init_tracing();
    let server = Arc::new(SyncServer::in_memory(
        ServerConfig::default().with_tick_interval(Duration::from_millis(10)),
    ));
    ingest(&server, "ev-1", 30);

    let mut session = server.open_push("sncb", &minutes_ago(40)).unwrap();

    let runner = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.run().await })
    };

    let frame = tokio::time::timeout(Duration::from_secs(1), session.next_frame())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(frame.as_sync().unwrap().records[0].id, "ev-1");

    server.shutdown();
    runner.await.unwrap();
    assert_eq!(server.scheduler().active_count(), 0);
}
