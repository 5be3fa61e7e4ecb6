pub mod department;
pub mod employee;

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::db::EntityStore;
use crate::errors::AppError;

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Registers every route. The caller provides `web::Data<OrgServices<S>>`.
pub fn configure<S: EntityStore>(cfg: &mut web::ServiceConfig) {
    // Extractor failures use the same `{"error": ...}` body as service errors.
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::validation("body", err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::validation("query", err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::validation("path", err.to_string()).into()),
    )
    .service(web::resource("/health").route(web::get().to(health)))
    .service(
        web::resource("/departments/").route(web::post().to(department::create_department::<S>)),
    )
    .service(
        web::resource("/departments/{department_id}/employees/")
            .route(web::post().to(employee::create_employee::<S>)),
    )
    .service(
        web::resource("/departments/{department_id}")
            .route(web::get().to(department::get_department::<S>))
            .route(web::patch().to(department::update_department::<S>))
            .route(web::delete().to(department::delete_department::<S>)),
    );
}
