// API route configuration

use crate::api::handlers;
use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check
        .route("/health", web::get().to(handlers::health_check))
        .route("/", web::get().to(handlers::health_check))
        // API v1 routes
        .service(
            web::scope("/api/v1")
                .route("/search", web::get().to(handlers::search))
                .route("/compare", web::get().to(handlers::compare))
                .route("/lookup", web::get().to(handlers::lookup)),
        );
}
