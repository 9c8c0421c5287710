use actix_web::{web, HttpRequest, HttpResponse, Responder};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

use super::{chart_response, db_error, ChartQuery};
use crate::services::charts::{self, Bar};
use crate::services::reports::{PlaylistSongsPage, PlaylistSummary, ReportService, TOP_PLAYLISTS};
use crate::utils::validators;

#[derive(Debug, Deserialize)]
pub struct PlaylistSongsQuery {
    pub name: String,
}

/// GET /playlists
pub async fn get_playlists(
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, actix_web::Error> {
    let reports = ReportService::new(db.get_ref().clone());
    let page = reports.playlists().await.map_err(db_error)?;

    Ok(HttpResponse::Ok().json(page))
}

/// GET /playlists/charts/top
pub async fn top_playlists_chart(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ChartQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let reports = ReportService::new(db.get_ref().clone());
    let playlists = reports.playlist_summaries().await.map_err(db_error)?;

    chart_response(
        &req,
        &query,
        charts::bar_chart("Top 15 Playlists by Song Count", "Songs", &top_playlist_bars(&playlists)),
    )
}

/// GET /playlists/songs?name=...
/// Songs of the playlist(s) with the selected name
pub async fn get_playlist_songs(
    db: web::Data<DatabaseConnection>,
    query: web::Query<PlaylistSongsQuery>,
) -> Result<impl Responder, actix_web::Error> {
    let name = validators::validate_playlist_name(&query.name)
        .map_err(|e| actix_web::error::ErrorBadRequest(e.to_string()))?;

    let reports = ReportService::new(db.get_ref().clone());
    let songs = reports.playlist_songs(name).await.map_err(db_error)?;

    Ok(HttpResponse::Ok().json(PlaylistSongsPage {
        playlist_name: name.to_string(),
        songs,
    }))
}

/// Largest playlists first, colored by owner
fn top_playlist_bars(playlists: &[PlaylistSummary]) -> Vec<Bar> {
    playlists
        .iter()
        .take(TOP_PLAYLISTS)
        .map(|p| Bar {
            label: p.playlist_name.clone(),
            value: p.total_songs as f64,
            group: Some(p.user_name.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_playlist_bars_keeps_first_fifteen() {
        let playlists: Vec<PlaylistSummary> = (0..20)
            .map(|i| PlaylistSummary {
                playlist_id: i,
                playlist_name: format!("Word Mix {}", i),
                user_name: format!("User {}", i % 3),
                total_songs: 20 - i as i64,
            })
            .collect();

        let bars = top_playlist_bars(&playlists);

        assert_eq!(bars.len(), TOP_PLAYLISTS);
        assert_eq!(bars[0].label, "Word Mix 0");
        assert_eq!(bars[0].value, 20.0);
        assert_eq!(bars[0].group.as_deref(), Some("User 0"));
    }
}
