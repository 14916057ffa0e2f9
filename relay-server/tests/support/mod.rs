// relay-server/tests/support/mod.rs
use actix_codec::{AsyncRead, AsyncWrite, Framed};
use actix_test::TestServer;
use actix_web::web;
use actix_web::App;
use awc::ws::Codec;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;

use relay_server::rate_limiter::RateLimiter;
use relay_server::session_registry::SessionRegistry;
use relay_server::{api, routing};

/// Boot an in-process relay with a fresh registry and limiter.
pub fn spawn_relay() -> (TestServer, Arc<SessionRegistry>) {
    let registry = Arc::new(SessionRegistry::new(100));
    let limiter = Arc::new(RateLimiter::session_create());
    let registry_data = web::Data::from(registry.clone());
    let limiter_data = web::Data::from(limiter.clone());

    let srv = actix_test::start(move || {
        App::new()
            .app_data(registry_data.clone())
            .app_data(limiter_data.clone())
            .configure(api::configure)
            .configure(routing::routes)
    });

    (srv, registry)
}

/// Next text frame as raw payload, answering heartbeat pings along the way.
pub async fn next_text<S>(conn: &mut Framed<S, Codec>) -> String
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        match conn.next().await {
            Some(Ok(awc::ws::Frame::Text(bytes))) => {
                return String::from_utf8(bytes.to_vec()).expect("non-utf8 text frame")
            }
            Some(Ok(awc::ws::Frame::Ping(payload))) => {
                conn.send(awc::ws::Message::Pong(payload))
                    .await
                    .expect("pong failed");
            }
            Some(Ok(other)) => panic!("unexpected frame: {:?}", other),
            other => panic!("connection ended: {:?}", other),
        }
    }
}

/// Next text frame parsed as JSON.
pub async fn next_json<S>(conn: &mut Framed<S, Codec>) -> Value
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let text = next_text(conn).await;
    serde_json::from_str(&text).expect("frame is not JSON")
}

/// Send a raw text frame.
pub async fn send_text<S>(conn: &mut Framed<S, Codec>, payload: &str)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    conn.send(awc::ws::Message::Text(payload.to_string().into()))
        .await
        .expect("send failed");
}
