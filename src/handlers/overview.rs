use actix_web::{web, HttpRequest, HttpResponse, Responder};
use sea_orm::DatabaseConnection;

use super::{chart_response, db_error, ChartQuery};
use crate::models::song;
use crate::services::charts::{self, DatePoint};
use crate::services::reports::{ReportService, OVERVIEW_SONG_SAMPLE};

/// GET /
/// Headline KPIs and the first songs of the catalog
pub async fn get_overview(
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, actix_web::Error> {
    let reports = ReportService::new(db.get_ref().clone());
    let page = reports.overview().await.map_err(db_error)?;

    Ok(HttpResponse::Ok().json(page))
}

/// GET /charts/duration-vs-release
pub async fn duration_vs_release_chart(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ChartQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let reports = ReportService::new(db.get_ref().clone());
    let songs = reports
        .song_sample(OVERVIEW_SONG_SAMPLE)
        .await
        .map_err(db_error)?;

    let svg = charts::date_scatter_chart(
        "Duration vs Release Date",
        "Duration (s)",
        &song_points(&songs, false),
    );
    chart_response(&req, &query, svg)
}

/// Scatter points for songs, optionally colored by genre
pub(crate) fn song_points(songs: &[song::Model], by_genre: bool) -> Vec<DatePoint> {
    songs
        .iter()
        .map(|s| DatePoint {
            x: s.duration as f64,
            date: s.release_date,
            label: format!("{} - {}", s.title, s.artist),
            group: by_genre.then(|| s.genre.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_song_points() {
        let songs = vec![song::Model {
            song_id: 1,
            title: "Feel Good Inc.".to_string(),
            artist: "Gorillaz".to_string(),
            album: "Demon Days".to_string(),
            genre: "album".to_string(),
            duration: 222,
            release_date: NaiveDate::from_ymd_opt(2019, 4, 2).unwrap(),
        }];

        let plain = song_points(&songs, false);
        assert_eq!(plain[0].x, 222.0);
        assert_eq!(plain[0].label, "Feel Good Inc. - Gorillaz");
        assert!(plain[0].group.is_none());

        let grouped = song_points(&songs, true);
        assert_eq!(grouped[0].group.as_deref(), Some("album"));
    }
}
