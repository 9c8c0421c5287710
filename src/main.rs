use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use streamdash::handlers;
use streamdash::utils::{config::Config, db::establish_connection};

/// Pool size for the read-only dashboard
const DASHBOARD_POOL_SIZE: u32 = 5;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file FIRST before anything else
    dotenv::dotenv().ok();

    // Initialize logger with default level if RUST_LOG not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=================================================");
    println!("🎵 streamdash Dashboard Server");
    println!("=================================================");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    let host = config.host.clone();
    let port = config.port;

    println!("📝 Configuration loaded:");
    println!("   - Database: {}", config.database.display_target());
    println!("   - Host: {}", host);
    println!("   - Port: {}", port);
    println!(
        "   - Log level: {}",
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
    );

    print!("🔌 Connecting to database... ");
    let db = match establish_connection(&config.database.url(), DASHBOARD_POOL_SIZE).await {
        Ok(db) => db,
        Err(e) => {
            println!();
            log::error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    println!("✅ Connected!");

    log::info!("Database connection established");

    println!("🌐 Starting HTTP server at http://{}:{}", host, port);
    println!("📍 Available pages:");
    println!("   - GET  http://{}:{}/", host, port);
    println!("   - GET  http://{}:{}/users", host, port);
    println!("   - GET  http://{}:{}/songs", host, port);
    println!("   - GET  http://{}:{}/playlists", host, port);
    println!("   - GET  http://{}:{}/playlists/songs?name=...", host, port);
    println!("   - GET  http://{}:{}/analytics", host, port);
    println!("=================================================");

    log::info!("Server started at http://{}:{}", host, port);

    HttpServer::new(move || {
        // Read-only public pages, embeddable anywhere
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(db.clone()))
            .wrap(Logger::default())
            .wrap(cors)
            .route("/", web::get().to(handlers::overview::get_overview))
            .route(
                "/charts/duration-vs-release",
                web::get().to(handlers::overview::duration_vs_release_chart),
            )
            .service(
                web::scope("/users")
                    .route("", web::get().to(handlers::users::get_users))
                    .route(
                        "/charts/age-distribution",
                        web::get().to(handlers::users::age_distribution_chart),
                    )
                    .route(
                        "/charts/top-countries",
                        web::get().to(handlers::users::top_countries_chart),
                    ),
            )
            .service(
                web::scope("/songs")
                    .route("", web::get().to(handlers::songs::get_songs))
                    .route("/charts/genres", web::get().to(handlers::songs::genres_chart))
                    .route(
                        "/charts/duration-vs-release",
                        web::get().to(handlers::songs::duration_vs_release_chart),
                    ),
            )
            .service(
                web::scope("/playlists")
                    .route("", web::get().to(handlers::playlists::get_playlists))
                    .route(
                        "/songs",
                        web::get().to(handlers::playlists::get_playlist_songs),
                    )
                    .route(
                        "/charts/top",
                        web::get().to(handlers::playlists::top_playlists_chart),
                    ),
            )
            .service(
                web::scope("/analytics")
                    .route("", web::get().to(handlers::analytics::get_analytics))
                    .route(
                        "/charts/top-skipped",
                        web::get().to(handlers::analytics::top_skipped_chart),
                    )
                    .route(
                        "/charts/weekly-plays",
                        web::get().to(handlers::analytics::weekly_plays_chart),
                    )
                    .route(
                        "/charts/activity",
                        web::get().to(handlers::analytics::activity_chart),
                    )
                    .route(
                        "/charts/power-users",
                        web::get().to(handlers::analytics::power_users_chart),
                    ),
            )
    })
    .bind((host, port))?
    .run()
    .await
}
