use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Open a sea-orm connection pool capped at `max_connections`.
///
/// The generator passes 1 so every batch runs on the same connection in
/// strict sequence; the dashboard uses a small shared pool.
pub async fn establish_connection(
    database_url: &str,
    max_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(max_connections)
        .min_connections(1)
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    Database::connect(options).await
}
