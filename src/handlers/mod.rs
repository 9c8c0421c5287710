pub mod analytics;
pub mod overview;
pub mod playlists;
pub mod songs;
pub mod users;

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse};
use sea_orm::DbErr;
use serde::Deserialize;

use crate::services::charts::{self, ChartFormat};

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    pub format: Option<String>,
}

pub(crate) fn db_error(e: DbErr) -> actix_web::Error {
    log::error!("Database error: {}", e);
    actix_web::error::ErrorInternalServerError("Database error")
}

/// Serve a rendered chart as SVG or PNG with a strong content ETag.
/// A matching `If-None-Match` short-circuits to 304.
pub(crate) fn chart_response(
    req: &HttpRequest,
    query: &ChartQuery,
    svg: String,
) -> Result<HttpResponse, actix_web::Error> {
    let format = ChartFormat::parse(query.format.as_deref())
        .ok_or_else(|| actix_web::error::ErrorBadRequest("Invalid chart format"))?;

    let body = charts::encode(svg, format).map_err(|e| {
        log::error!("Failed to render chart: {}", e);
        actix_web::error::ErrorInternalServerError("Failed to render chart")
    })?;

    let etag = format!("\"{}\"", charts::content_hash(&body));

    let cached = req
        .headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(',').any(|tag| tag.trim() == etag))
        .unwrap_or(false);

    if cached {
        return Ok(HttpResponse::NotModified()
            .insert_header((header::ETAG, etag))
            .finish());
    }

    Ok(HttpResponse::Ok()
        .content_type(format.content_type())
        .insert_header((header::ETAG, etag))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .body(body))
}
