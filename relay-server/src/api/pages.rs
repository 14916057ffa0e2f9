// relay-server/src/api/pages.rs
//
// The real landing/bridge/demo experiences are client-side collaborators;
// the relay serves them a shell document carrying the session context plus
// the manifest/logo affordances that iframe-sandboxing wallets request.
use actix_web::http::header;
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

use crate::api::sessions::request_base;
use crate::session_registry::SessionRegistry;

const APP_NAME: &str = "Wallet Relay";
const APP_DESCRIPTION: &str = "Self-hosted relay connecting DApps to mobile wallets";

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Wallet Relay</title>
  <link rel="manifest" href="/manifest.json">
</head>
<body>
  <div id="app" data-page="{{PAGE}}"></div>
  <script>window.__RELAY_CONTEXT__ = {{CONTEXT}};</script>
</body>
</html>
"#;

const LOGO_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 64 64">
  <rect width="64" height="64" rx="14" fill="#1a1b26"/>
  <path d="M14 24h20a8 8 0 0 1 8 8v8H22a8 8 0 0 1-8-8v-8z" fill="#7aa2f7"/>
  <circle cx="44" cy="36" r="4" fill="#1a1b26"/>
  <path d="M42 18l8 6-8 6" stroke="#9ece6a" stroke-width="3" fill="none" stroke-linecap="round"/>
</svg>
"##;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    k: Option<String>,
    lang: Option<String>,
    theme: Option<String>,
    session: Option<String>,
}

/// Serialize a context object for embedding inside a `<script>` tag.
/// `<` is escaped so user-supplied values cannot break out of the element.
fn script_json(value: &serde_json::Value) -> String {
    value.to_string().replace('<', "\\u003c")
}

fn render_page(page: &str, context: &serde_json::Value) -> HttpResponse {
    let html = PAGE_TEMPLATE
        .replace("{{PAGE}}", page)
        .replace("{{CONTEXT}}", &script_json(context));
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html)
}

/// Wallet landing page for a specific session, opened from the QR link.
///
/// Deliberately not an HTTP redirect: wallets that load the relay inside an
/// iframe drop the query string (and with it the secret) across redirects.
#[get("/s/{id}")]
pub async fn session_page(
    path: web::Path<(String,)>,
    query: web::Query<PageQuery>,
    registry: web::Data<SessionRegistry>,
) -> impl Responder {
    let session_id = &path.0;

    if registry.get(session_id).is_none() {
        return HttpResponse::NotFound().json(json!({
            "error": "Session not found"
        }));
    }

    // The secret is passed through to the client bridge unverified; only
    // the WebSocket handshake authenticates it.
    render_page(
        "session",
        &json!({
            "session": session_id,
            "k": query.k,
            "lang": query.lang,
            "theme": query.theme,
        }),
    )
}

#[get("/landing")]
pub async fn landing_page(query: web::Query<PageQuery>) -> impl Responder {
    render_page(
        "landing",
        &json!({ "lang": query.lang, "theme": query.theme }),
    )
}

/// The in-wallet bridge shell; meaningless without a session to join.
#[get("/bridge")]
pub async fn bridge_page(query: web::Query<PageQuery>) -> impl Responder {
    let Some(session) = query.session.as_deref() else {
        return HttpResponse::BadRequest().json(json!({
            "error": "Missing session parameter"
        }));
    };

    render_page(
        "bridge",
        &json!({
            "session": session,
            "k": query.k,
            "lang": query.lang,
            "theme": query.theme,
        }),
    )
}

#[get("/demo")]
pub async fn demo_page(query: web::Query<PageQuery>) -> impl Responder {
    render_page("demo", &json!({ "lang": query.lang, "theme": query.theme }))
}

#[get("/")]
pub async fn index_page(query: web::Query<PageQuery>) -> impl Responder {
    render_page("index", &json!({ "lang": query.lang, "theme": query.theme }))
}

/// Web-app manifest, also answered under the page paths because sandboxing
/// wallets resolve it relative to whatever document they embedded.
async fn manifest(req: HttpRequest) -> HttpResponse {
    let (proto, host) = request_base(&req);
    HttpResponse::Ok()
        .append_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .json(json!({
            "name": APP_NAME,
            "description": APP_DESCRIPTION,
            "iconPath": format!("{}://{}/logo.svg", proto, host),
        }))
}

#[get("/logo.svg")]
pub async fn logo() -> impl Responder {
    HttpResponse::Ok()
        .content_type("image/svg+xml")
        .append_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .append_header((header::CACHE_CONTROL, "public, max-age=86400"))
        .body(LOGO_SVG)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/manifest.json", web::get().to(manifest))
        .route("/s/{id}/manifest.json", web::get().to(manifest))
        .route("/demo/manifest.json", web::get().to(manifest))
        .route("/bridge/manifest.json", web::get().to(manifest))
        .route("/landing/manifest.json", web::get().to(manifest))
        .service(session_page)
        .service(landing_page)
        .service(bridge_page)
        .service(demo_page)
        .service(index_page)
        .service(logo);
}
