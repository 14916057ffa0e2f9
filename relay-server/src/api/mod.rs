// relay-server/src/api/mod.rs
pub mod pages;
pub mod sessions;

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(sessions::create_session)
        .service(sessions::get_session)
        .service(sessions::health)
        .service(sessions::metrics)
        .configure(pages::configure);
}
