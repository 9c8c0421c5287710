use actix_web::{web, HttpRequest, HttpResponse, Responder};
use sea_orm::DatabaseConnection;

use super::overview::song_points;
use super::{chart_response, db_error, ChartQuery};
use crate::services::charts::{self, Bar};
use crate::services::reports::{ReportService, SONG_SAMPLE};

/// GET /songs
pub async fn get_songs(
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, actix_web::Error> {
    let reports = ReportService::new(db.get_ref().clone());
    let page = reports.songs().await.map_err(db_error)?;

    Ok(HttpResponse::Ok().json(page))
}

/// GET /songs/charts/genres
pub async fn genres_chart(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ChartQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let reports = ReportService::new(db.get_ref().clone());
    let genres = reports.genres().await.map_err(db_error)?;

    let bars: Vec<Bar> = genres
        .iter()
        .map(|g| Bar {
            label: g.genre.clone(),
            value: g.total_songs as f64,
            group: None,
        })
        .collect();

    chart_response(
        &req,
        &query,
        charts::bar_chart("Top Genres by Song Count", "Songs", &bars),
    )
}

/// GET /songs/charts/duration-vs-release
/// Same scatter as the overview, over the larger sample and colored by genre
pub async fn duration_vs_release_chart(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ChartQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let reports = ReportService::new(db.get_ref().clone());
    let songs = reports.song_sample(SONG_SAMPLE).await.map_err(db_error)?;

    let svg = charts::date_scatter_chart(
        "Duration vs Release Date of Songs",
        "Duration (s)",
        &song_points(&songs, true),
    );
    chart_response(&req, &query, svg)
}
