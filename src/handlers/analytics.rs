use actix_web::{web, HttpRequest, HttpResponse, Responder};
use sea_orm::DatabaseConnection;

use super::{chart_response, db_error, ChartQuery};
use crate::services::charts::{self, Bar, LineSeries};
use crate::services::reports::{self, ReportService, WeeklyPlays};

/// GET /analytics
pub async fn get_analytics(
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, actix_web::Error> {
    let reports = ReportService::new(db.get_ref().clone());
    let page = reports.analytics().await.map_err(db_error)?;

    Ok(HttpResponse::Ok().json(page))
}

/// GET /analytics/charts/top-skipped
pub async fn top_skipped_chart(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ChartQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let reports = ReportService::new(db.get_ref().clone());
    let skipped = reports.top_skipped().await.map_err(db_error)?;

    let bars: Vec<Bar> = skipped
        .iter()
        .map(|s| Bar {
            label: s.title.clone(),
            value: s.skips as f64,
            group: Some(s.artist.clone()),
        })
        .collect();

    chart_response(&req, &query, charts::bar_chart("Top 10 Skipped Songs", "Skips", &bars))
}

/// GET /analytics/charts/weekly-plays
pub async fn weekly_plays_chart(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ChartQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let reports = ReportService::new(db.get_ref().clone());
    let weekly = reports.weekly_plays().await.map_err(db_error)?;

    chart_response(
        &req,
        &query,
        charts::line_chart("Weekly Viral Growth of Songs", "Plays", &weekly_series(&weekly)),
    )
}

/// GET /analytics/charts/activity
pub async fn activity_chart(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ChartQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let reports = ReportService::new(db.get_ref().clone());
    let cells = reports.activity().await.map_err(db_error)?;

    let grid = reports::activity_grid(&cells);
    chart_response(
        &req,
        &query,
        charts::activity_heatmap("Listening Activity by Day & Hour", &grid),
    )
}

/// GET /analytics/charts/power-users
pub async fn power_users_chart(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ChartQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let reports = ReportService::new(db.get_ref().clone());
    let users = reports.power_users().await.map_err(db_error)?;

    let bars: Vec<Bar> = users
        .iter()
        .map(|u| Bar {
            label: u.user_name.clone(),
            value: u.total_plays as f64,
            group: None,
        })
        .collect();

    chart_response(
        &req,
        &query,
        charts::bar_chart("Top 10 Most Active Listeners", "Plays", &bars),
    )
}

/// One series per title, in order of first appearance
fn weekly_series(rows: &[WeeklyPlays]) -> Vec<LineSeries> {
    let mut series: Vec<LineSeries> = Vec::new();

    for row in rows {
        let point = (row.week.date(), row.plays as f64);
        match series.iter_mut().find(|s| s.name == row.title) {
            Some(existing) => existing.points.push(point),
            None => series.push(LineSeries {
                name: row.title.clone(),
                points: vec![point],
            }),
        }
    }

    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn week(day: u32, title: &str, plays: i64) -> WeeklyPlays {
        WeeklyPlays {
            title: title.to_string(),
            week: NaiveDate::from_ymd_opt(2025, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            plays,
        }
    }

    #[test]
    fn test_weekly_series_groups_by_title() {
        let rows = vec![
            week(6, "Song A", 25),
            week(6, "Song B", 22),
            week(13, "Song A", 30),
        ];

        let series = weekly_series(&rows);

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].name, "Song A");
        assert_eq!(series[0].points.len(), 2);
        assert_eq!(series[0].points[1].1, 30.0);
        assert_eq!(series[1].name, "Song B");
    }
}
