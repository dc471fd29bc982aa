use std::time::Duration;

use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use clap::Parser;
use long_poll_chat::{RoomConfig, cli::Cli, http::router, spawn_room};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> Router {
    let room = spawn_room(RoomConfig {
        poll_timeout: Duration::from_millis(50),
        ..RoomConfig::default()
    });
    router(room)
}

async fn call(app: &Router, method: Method, uri: &str) -> Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())?;
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

async fn get(app: &Router, uri: &str) -> Result<(StatusCode, Value)> {
    call(app, Method::GET, uri).await
}

#[tokio::test]
async fn join_then_duplicate_join() -> Result<()> {
    let app = app();

    let (status, body) = get(&app, "/join?id=alice").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "success", "message": "client joined the chat"})
    );

    let (status, body) = get(&app, "/join?id=alice").await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({"error": "Client ID already exists"}));
    Ok(())
}

#[tokio::test]
async fn missing_fields_are_bad_requests() -> Result<()> {
    let app = app();

    for uri in ["/join", "/join?id=", "/leave", "/messages?id="] {
        let (status, body) = get(&app, uri).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body, json!({"error": "Client ID is required"}), "{uri}");
    }

    for uri in ["/send", "/send?id=alice", "/send?message=hi", "/send?id=alice&message="] {
        let (status, body) = get(&app, uri).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(
            body,
            json!({"error": "Client ID and message are required"}),
            "{uri}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn unknown_clients_are_not_found() -> Result<()> {
    let app = app();

    for uri in ["/leave?id=ghost", "/send?id=ghost&message=boo", "/messages?id=ghost"] {
        let (status, body) = get(&app, uri).await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body, json!({"error": "Client not found"}), "{uri}");
    }
    Ok(())
}

#[tokio::test]
async fn send_then_poll_round_trip() -> Result<()> {
    let app = app();
    get(&app, "/join?id=alice").await?;
    get(&app, "/join?id=bob").await?;

    let (status, body) = call(&app, Method::POST, "/send?id=alice&message=hello%20bob").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "success", "message": "message sent", "payload": "hello bob"})
    );

    let expected = json!({"status": "success", "client": "alice", "message": "hello bob"});
    for id in ["alice", "bob"] {
        let (status, body) = get(&app, &format!("/messages?id={id}")).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, expected, "poll for {id}");
    }

    let (status, body) = get(&app, "/messages?id=bob").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "no new messages"}));
    Ok(())
}

#[tokio::test]
async fn leave_then_poll_is_not_found() -> Result<()> {
    let app = app();
    get(&app, "/join?id=alice").await?;

    let (status, body) = get(&app, "/leave?id=alice").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "success", "message": "client left the chat"})
    );

    let (status, _) = get(&app, "/messages?id=alice").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn poll_in_flight_when_client_leaves_is_gone() -> Result<()> {
    let room = spawn_room(RoomConfig {
        poll_timeout: Duration::from_secs(5),
        ..RoomConfig::default()
    });
    let app = router(room.clone());
    room.join("alice").await?;

    let poll = {
        let app = app.clone();
        tokio::spawn(async move { get(&app, "/messages?id=alice").await })
    };

    // Give the poll time to park on the queue before leaving.
    tokio::time::sleep(Duration::from_millis(100)).await;
    room.leave("alice").await?;

    let (status, body) = tokio::time::timeout(Duration::from_secs(5), poll).await???;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body, json!({"error": "Client channel closed"}));
    Ok(())
}

#[tokio::test]
async fn largest_poll_timeout_still_answers() -> Result<()> {
    let cli = Cli::try_parse_from([
        "long-poll-chat",
        "--poll-timeout-secs",
        "18446744073709551615",
    ])?;
    let room = spawn_room(cli.room_config());
    let app = router(room);
    get(&app, "/join?id=alice").await?;
    get(&app, "/send?id=alice&message=still%20here").await?;

    let (status, body) = tokio::time::timeout(
        Duration::from_secs(5),
        get(&app, "/messages?id=alice"),
    )
    .await??;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "success", "client": "alice", "message": "still here"})
    );
    Ok(())
}
