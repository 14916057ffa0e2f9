// relay-server/tests/relay_ws_test.rs
use actix_codec::{AsyncRead, AsyncWrite, Framed};
use actix_web::http::StatusCode;
use awc::error::WsClientError;
use awc::ws::Codec;
use serde_json::json;

use common::models::session::SessionCreated;

mod support;
use support::{next_json, next_text, send_text, spawn_relay};

/// Create a session over HTTP and return (id, secret).
async fn create_session(srv: &actix_test::TestServer) -> (String, String) {
    let mut resp = srv
        .post("/session")
        .send_json(&json!({"name": "My DApp", "url": "https://d.example"}))
        .await
        .unwrap();
    let created: SessionCreated = resp.json().await.unwrap();
    let secret = created.url.split_once("?k=").unwrap().1.to_string();
    (created.id, secret)
}

async fn connect_dapp(
    srv: &mut actix_test::TestServer,
    id: &str,
) -> Framed<impl AsyncRead + AsyncWrite, Codec> {
    srv.ws_at(&format!("/ws?session={}&role=dapp", id))
        .await
        .unwrap()
}

async fn connect_mobile(
    srv: &mut actix_test::TestServer,
    id: &str,
    secret: &str,
) -> Framed<impl AsyncRead + AsyncWrite, Codec> {
    srv.ws_at(&format!("/ws?session={}&role=mobile&k={}", id, secret))
        .await
        .unwrap()
}

fn rejection_status(err: WsClientError) -> StatusCode {
    match err {
        WsClientError::InvalidResponseStatus(status) => status,
        other => panic!("expected handshake rejection, got {:?}", other),
    }
}

/// Like `.unwrap_err()`, but works even though the `Ok` variant's type
/// (an opaque `impl AsyncRead + AsyncWrite`) doesn't implement `Debug`.
fn expect_ws_err<T>(result: Result<T, WsClientError>) -> WsClientError {
    match result {
        Ok(_) => panic!("expected handshake rejection, got a successful connection"),
        Err(err) => err,
    }
}

// S1: full happy path, with byte-identical forwarding both ways.
#[actix_rt::test]
async fn test_happy_path_transaction() {
    let (mut srv, _registry) = spawn_relay();
    let (id, secret) = create_session(&srv).await;

    let mut dapp = connect_dapp(&mut srv, &id).await;
    assert_eq!(next_json(&mut dapp).await, json!({"type": "ready"}));

    let mut mobile = connect_mobile(&mut srv, &id, &secret).await;
    assert_eq!(next_json(&mut mobile).await, json!({"type": "ready"}));

    // Wallet announces itself; the DApp sees the exact bytes.
    let connect_frame = r#"{"type":"connect","address":"0xabc","chainId":1}"#;
    send_text(&mut mobile, connect_frame).await;
    assert_eq!(next_text(&mut dapp).await, connect_frame);

    // RPC round trip.
    let request_frame =
        r#"{"type":"request","id":1,"method":"eth_sendTransaction","params":[{"to":"0xdef"}]}"#;
    send_text(&mut dapp, request_frame).await;
    assert_eq!(next_text(&mut mobile).await, request_frame);

    let response_frame = r#"{"type":"response","id":1,"result":"0xhash"}"#;
    send_text(&mut mobile, response_frame).await;
    assert_eq!(next_text(&mut dapp).await, response_frame);

    // Pairing is now connected with the extended deadline.
    let mut resp = srv.get(format!("/session/{}", id)).send().await.unwrap();
    let info: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(info["status"], "connected");
}

// S2: a second mobile is turned away while the first holds the lock.
#[actix_rt::test]
async fn test_mobile_lock_rejects_second_mobile() {
    let (mut srv, _registry) = spawn_relay();
    let (id, secret) = create_session(&srv).await;

    let mut mobile = connect_mobile(&mut srv, &id, &secret).await;
    assert_eq!(next_json(&mut mobile).await, json!({"type": "ready"}));

    let err = expect_ws_err(srv.ws_at(&format!("/ws?session={}&role=mobile&k={}", id, secret)).await);
    assert_eq!(rejection_status(err), StatusCode::CONFLICT);
}

// S3: a wrong secret never reaches the session.
#[actix_rt::test]
async fn test_bad_secret_is_forbidden() {
    let (mut srv, _registry) = spawn_relay();
    let (id, _secret) = create_session(&srv).await;

    let err = expect_ws_err(srv.ws_at(&format!("/ws?session={}&role=mobile&k=WRONG", id)).await);
    assert_eq!(rejection_status(err), StatusCode::FORBIDDEN);

    // A missing secret is rejected the same way.
    let err = expect_ws_err(srv.ws_at(&format!("/ws?session={}&role=mobile", id)).await);
    assert_eq!(rejection_status(err), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn test_handshake_validation_statuses() {
    let (mut srv, _registry) = spawn_relay();
    let (id, _secret) = create_session(&srv).await;

    let err = expect_ws_err(srv.ws_at("/ws?role=dapp").await);
    assert_eq!(rejection_status(err), StatusCode::BAD_REQUEST);

    let err = expect_ws_err(srv.ws_at(&format!("/ws?session={}", id)).await);
    assert_eq!(rejection_status(err), StatusCode::BAD_REQUEST);

    let err = expect_ws_err(srv.ws_at(&format!("/ws?session={}&role=desktop", id)).await);
    assert_eq!(rejection_status(err), StatusCode::BAD_REQUEST);

    let err = expect_ws_err(srv.ws_at("/ws?session=ZZZZ&role=dapp").await);
    assert_eq!(rejection_status(err), StatusCode::NOT_FOUND);
}

// S4: sending without an attached peer reports -32000 to the sender.
#[actix_rt::test]
async fn test_forward_without_peer_reports_error() {
    let (mut srv, _registry) = spawn_relay();
    let (id, _secret) = create_session(&srv).await;

    let mut dapp = connect_dapp(&mut srv, &id).await;
    assert_eq!(next_json(&mut dapp).await, json!({"type": "ready"}));

    send_text(&mut dapp, r#"{"type":"request","id":1,"method":"eth_accounts"}"#).await;
    assert_eq!(
        next_json(&mut dapp).await,
        json!({"type": "error", "code": -32000, "message": "Peer not connected"})
    );
}

// S5: DApp drop is advertised to the wallet; the reconnect is announced.
#[actix_rt::test]
async fn test_dapp_reconnect_notifies_mobile() {
    let (mut srv, _registry) = spawn_relay();
    let (id, secret) = create_session(&srv).await;

    let mut dapp = connect_dapp(&mut srv, &id).await;
    assert_eq!(next_json(&mut dapp).await, json!({"type": "ready"}));
    let mut mobile = connect_mobile(&mut srv, &id, &secret).await;
    assert_eq!(next_json(&mut mobile).await, json!({"type": "ready"}));

    drop(dapp);
    assert_eq!(
        next_json(&mut mobile).await,
        json!({"type": "disconnect", "reason": "Peer disconnected"})
    );

    let mut dapp = connect_dapp(&mut srv, &id).await;
    assert_eq!(next_json(&mut dapp).await, json!({"type": "ready"}));
    assert_eq!(
        next_json(&mut mobile).await,
        json!({"type": "dapp_reconnected"})
    );

    // The re-paired session still forwards.
    let frame = r#"{"type":"chainChanged","chainId":137}"#;
    send_text(&mut mobile, frame).await;
    assert_eq!(next_text(&mut dapp).await, frame);
}

// The lock releases on mobile detach; a fresh mobile may then attach.
#[actix_rt::test]
async fn test_mobile_can_reattach_after_detach() {
    let (mut srv, _registry) = spawn_relay();
    let (id, secret) = create_session(&srv).await;

    let mut dapp = connect_dapp(&mut srv, &id).await;
    assert_eq!(next_json(&mut dapp).await, json!({"type": "ready"}));

    let mobile = connect_mobile(&mut srv, &id, &secret).await;
    drop(mobile);
    assert_eq!(
        next_json(&mut dapp).await,
        json!({"type": "disconnect", "reason": "Peer disconnected"})
    );

    let mut mobile = connect_mobile(&mut srv, &id, &secret).await;
    assert_eq!(next_json(&mut mobile).await, json!({"type": "ready"}));
}

#[actix_rt::test]
async fn test_binary_frames_are_refused() {
    let (mut srv, _registry) = spawn_relay();
    let (id, _secret) = create_session(&srv).await;

    let mut dapp = connect_dapp(&mut srv, &id).await;
    assert_eq!(next_json(&mut dapp).await, json!({"type": "ready"}));

    use futures_util::SinkExt;
    dapp.send(awc::ws::Message::Binary(vec![1, 2, 3].into()))
        .await
        .unwrap();
    assert_eq!(
        next_json(&mut dapp).await,
        json!({"type": "error", "code": -32600, "message": "Binary frames not supported"})
    );
}
