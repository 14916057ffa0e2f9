// relay-server/src/routing.rs
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use serde_json::json;

use common::models::session::PeerRole;

use crate::actors::peer_actor::PeerActor;
use crate::session_registry::SessionRegistry;

/// Query parameters for the relay WebSocket endpoint.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    session: Option<String>,
    role: Option<String>,
    /// Session secret; required for the mobile role.
    k: Option<String>,
}

/// Configure the WebSocket route
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").route(web::get().to(relay_ws_route)));
}

/// `GET /ws?session=<id>&role=<dapp|mobile>[&k=<secret>]`
///
/// All handshake validation happens here, before the upgrade, so a bad
/// request costs a plain HTTP status and never touches session state. The
/// actual attachment is performed by [`PeerActor::started`], which is where
/// a lost register race is detected.
async fn relay_ws_route(
    req: HttpRequest,
    stream: web::Payload,
    registry: web::Data<SessionRegistry>,
    query: web::Query<WsQuery>,
) -> Result<HttpResponse, Error> {
    let Some(session_id) = query.session.clone() else {
        return Ok(bad_request("Missing session parameter"));
    };
    let Some(role_param) = query.role.as_deref() else {
        return Ok(bad_request("Missing role parameter"));
    };
    let Some(role) = PeerRole::parse(role_param) else {
        return Ok(bad_request("Invalid role parameter"));
    };

    if registry.get(&session_id).is_none() {
        return Ok(HttpResponse::NotFound().json(json!({
            "error": "Session not found"
        })));
    }

    if role == PeerRole::Mobile {
        let secret_ok = query
            .k
            .as_deref()
            .map(|k| registry.verify_secret(&session_id, k))
            .unwrap_or(false);
        if !secret_ok {
            return Ok(HttpResponse::Forbidden().json(json!({
                "error": "Invalid session secret"
            })));
        }

        if registry.is_mobile_locked(&session_id) {
            return Ok(HttpResponse::Conflict().json(json!({
                "error": "Session already has a mobile connection"
            })));
        }
    }

    let actor = PeerActor::new(session_id, role, registry.clone().into_inner());
    ws::start(actor, &req, stream)
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({ "error": message }))
}
