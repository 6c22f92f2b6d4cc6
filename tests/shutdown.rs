//! Drain behavior: who can trigger a shutdown and what happens to work in
//! flight when they do.

mod common;

use std::time::Duration;

use plinth::middleware::{Errors, Logger, Panics, mw};
use plinth::{App, Ctx, Error, Method, Request, Responder, Shutdown, StatusCode};

fn app_with(shutdown: Shutdown, path: &str, handler: impl plinth::Handler) -> App {
    App::new(shutdown, [mw(Logger), mw(Errors), mw(Panics)]).on(Method::GET, path, handler)
}

#[tokio::test]
async fn signaling_is_idempotent_and_stops_the_server() {
    let server = common::start(|shutdown| {
        app_with(shutdown, "/test", |ctx: Ctx, res: Responder, _req: Request| async move {
            res.respond(&ctx, &serde_json::json!({"Status": "OK"}), StatusCode::OK)
        })
    })
    .await;

    server.shutdown.signal();
    server.shutdown.signal();

    server.join().await.unwrap();
}

#[tokio::test]
async fn in_flight_requests_complete_during_the_drain() {
    let server = common::start(|shutdown| {
        app_with(shutdown, "/slow", |ctx: Ctx, res: Responder, _req: Request| async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            res.respond(&ctx, &serde_json::json!({"Status": "OK"}), StatusCode::OK)
        })
    })
    .await;

    let addr = server.addr;
    let client = tokio::spawn(async move { common::get(addr, "/slow").await });

    // Let the request reach the handler, then start the drain under it.
    tokio::time::sleep(Duration::from_millis(100)).await;
    server.shutdown.signal();

    let (status, body) = client.await.unwrap();
    assert_eq!(status, 200);
    assert_eq!(body, r#"{"Status":"OK"}"#);

    server.join().await.unwrap();
}

#[tokio::test]
async fn a_handler_reported_integrity_failure_drains_the_whole_server() {
    let (logs, _guard) = common::capture_logs();
    let server = common::start(|shutdown| {
        app_with(shutdown, "/broken", |_ctx: Ctx, _res: Responder, _req: Request| async {
            Err::<(), _>(Error::shutdown("corrupt order index"))
        })
    })
    .await;

    let (status, body) = common::get(server.addr, "/broken").await;

    assert_eq!(status, 503);
    assert_eq!(body, r#"{"error":"service unavailable"}"#);
    assert_eq!(logs.occurrences("signaling shutdown"), 1);

    // No one called signal from the outside; the sentinel did.
    server.join().await.unwrap();
}

#[tokio::test]
async fn stragglers_are_left_behind_when_the_grace_period_expires() {
    let (logs, _guard) = common::capture_logs();
    let server = common::start_with_grace(Duration::from_millis(100), |shutdown| {
        app_with(shutdown, "/hang", |_ctx: Ctx, _res: Responder, _req: Request| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<(), Error>(())
        })
    })
    .await;

    let addr = server.addr;
    let _client = tokio::spawn(async move {
        let _ = common::send(
            addr,
            "GET /hang HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n",
        )
        .await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    server.shutdown.signal();

    // serve returns at the grace bound, well inside join's own 5 s limit,
    // with the hung connection detached rather than awaited.
    server.join().await.unwrap();
    assert_eq!(logs.occurrences("grace period expired"), 1);
}
