pub mod error;
pub mod health;
pub mod openapi;
pub mod parse;

use actix_web::HttpResponseBuilder;

/// Browser clients call the parse endpoints cross-origin, so every
/// response (success, error and preflight alike) carries these headers.
pub(crate) fn cors_headers(builder: &mut HttpResponseBuilder) -> &mut HttpResponseBuilder {
    builder
        .insert_header(("Access-Control-Allow-Origin", "*"))
        .insert_header((
            "Access-Control-Allow-Headers",
            "authorization, x-client-info, apikey, content-type",
        ))
        .insert_header(("Access-Control-Allow-Methods", "POST, OPTIONS"))
}
