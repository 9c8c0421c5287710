use actix_web::{web, HttpRequest, HttpResponse, Responder};
use sea_orm::DatabaseConnection;

use super::{chart_response, db_error, ChartQuery};
use crate::services::charts::{self, Bar};
use crate::services::reports::ReportService;

/// GET /users
pub async fn get_users(
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, actix_web::Error> {
    let reports = ReportService::new(db.get_ref().clone());
    let page = reports.users().await.map_err(db_error)?;

    Ok(HttpResponse::Ok().json(page))
}

/// GET /users/charts/age-distribution
pub async fn age_distribution_chart(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ChartQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let reports = ReportService::new(db.get_ref().clone());
    let ages = reports.age_distribution().await.map_err(db_error)?;

    let bars: Vec<Bar> = ages
        .iter()
        .map(|a| Bar {
            label: a.age.to_string(),
            value: a.count as f64,
            group: None,
        })
        .collect();

    chart_response(&req, &query, charts::bar_chart("Age Distribution", "Users", &bars))
}

/// GET /users/charts/top-countries
pub async fn top_countries_chart(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ChartQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let reports = ReportService::new(db.get_ref().clone());
    let countries = reports.top_countries().await.map_err(db_error)?;

    let bars: Vec<Bar> = countries
        .iter()
        .map(|c| Bar {
            label: c.country.clone(),
            value: c.user_count as f64,
            group: None,
        })
        .collect();

    chart_response(
        &req,
        &query,
        charts::bar_chart("Top 10 Countries by Users", "Users", &bars),
    )
}
