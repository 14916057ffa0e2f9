// relay-server/src/api/sessions.rs
use actix_web::http::header;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

use common::models::session::{SessionCreated, SessionInfo, SessionMetadata};

use crate::rate_limiter::{client_ip, RateLimiter};
use crate::session_registry::SessionRegistry;

/// Scheme and host for building absolute URLs, honoring a TLS-terminating
/// proxy in front of the relay.
pub(crate) fn request_base(req: &HttpRequest) -> (String, String) {
    let proto = req
        .headers()
        .get("X-Forwarded-Proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http")
        .to_string();

    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost")
        .to_string();

    (proto, host)
}

/// The body is optional and advisory; anything that does not parse to
/// `{name, url, icon?}` with both required fields is treated as absent.
fn parse_metadata(body: &[u8]) -> Option<SessionMetadata> {
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice::<SessionMetadata>(body).ok()
}

/// Create a new relay session.
///
/// Admission order: capacity, then per-IP rate limit, then the optional
/// metadata body. The response embeds the short link handed to the wallet.
#[post("/session")]
pub async fn create_session(
    req: HttpRequest,
    body: web::Bytes,
    registry: web::Data<SessionRegistry>,
    limiter: web::Data<RateLimiter>,
) -> impl Responder {
    if registry.is_at_capacity() {
        tracing::warn!("Rejecting session create: server at capacity");
        return HttpResponse::ServiceUnavailable().json(json!({
            "error": "Server at capacity"
        }));
    }

    let ip = client_ip(&req);
    if !limiter.check(&ip) {
        let info = limiter.info(&ip);
        let now = Utc::now().timestamp_millis();
        let retry_after_secs = ((info.reset_at - now).max(0) + 999) / 1000;

        tracing::warn!("Rate limit exceeded for IP: {}", ip);
        return HttpResponse::TooManyRequests()
            .append_header((header::RETRY_AFTER, retry_after_secs.to_string()))
            .append_header(("X-RateLimit-Remaining", info.remaining.to_string()))
            .json(json!({
                "error": "Too many requests"
            }));
    }

    let metadata = parse_metadata(&body);
    let session = registry.create(metadata);

    let (proto, host) = request_base(&req);
    let url = format!("{}://{}/s/{}?k={}", proto, host, session.id, session.secret);

    HttpResponse::Ok().json(SessionCreated {
        id: session.id,
        url,
        expires_at: session.expires_at,
    })
}

/// Public session state; the secret is never included.
#[get("/session/{id}")]
pub async fn get_session(
    path: web::Path<(String,)>,
    registry: web::Data<SessionRegistry>,
) -> impl Responder {
    let session_id = &path.0;

    match registry.get(session_id) {
        None => HttpResponse::NotFound().json(json!({
            "error": "Session not found"
        })),
        Some(session) if session.terminated => HttpResponse::Gone().json(json!({
            "error": "Session terminated"
        })),
        Some(session) => HttpResponse::Ok().json(SessionInfo::from(&session)),
    }
}

#[get("/health")]
pub async fn health(registry: web::Data<SessionRegistry>) -> impl Responder {
    let stats = registry.stats();
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "uptime": stats.uptime,
        "sessions": stats.total_sessions,
    }))
}

#[get("/metrics")]
pub async fn metrics(registry: web::Data<SessionRegistry>) -> impl Responder {
    HttpResponse::Ok().json(registry.stats())
}
