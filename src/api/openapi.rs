//! Machine-readable API description endpoints

use actix_web::{get, web, HttpResponse, Responder};
use utoipa::OpenApi;

use crate::api::parse::ApiDoc;

/// Serve the OpenAPI document as JSON
#[get("/openapi.json")]
pub async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// Serve the OpenAPI document as YAML
#[get("/openapi.yaml")]
pub async fn openapi_yaml() -> impl Responder {
    let doc = ApiDoc::openapi();
    HttpResponse::Ok()
        .content_type("text/yaml")
        .body(doc.to_yaml().unwrap())
}

/// Configure OpenAPI routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(openapi_json).service(openapi_yaml);
}
