use chrono::NaiveDateTime;
use sea_orm::*;
use serde::Serialize;

use crate::models::{song, user};

/// Rows shown in the song sample on the overview page
pub const OVERVIEW_SONG_SAMPLE: u64 = 50;
pub const USER_SAMPLE: u64 = 50;
pub const SONG_SAMPLE: u64 = 100;
pub const TOP_PLAYLISTS: usize = 15;
/// A song/week pair must exceed this many plays to count as viral
pub const VIRAL_WEEKLY_PLAYS: i64 = 20;

#[derive(Debug, Default, Serialize, FromQueryResult)]
pub struct OverviewKpis {
    pub total_users: i64,
    pub total_songs: i64,
    pub total_plays: i64,
    /// Percentage of skipped plays, `None` before any play exists
    pub skip_rate: Option<f64>,
}

#[derive(Debug, Default, Serialize, FromQueryResult)]
pub struct UserKpis {
    pub total_users: i64,
    pub avg_age: Option<f64>,
    pub unique_countries: i64,
}

#[derive(Debug, Serialize, FromQueryResult)]
pub struct AgeCount {
    pub age: i32,
    pub count: i64,
}

#[derive(Debug, Serialize, FromQueryResult)]
pub struct CountryCount {
    pub country: String,
    pub user_count: i64,
}

#[derive(Debug, Default, Serialize, FromQueryResult)]
pub struct SongKpis {
    pub total_songs: i64,
    pub unique_artists: i64,
    pub unique_genres: i64,
}

#[derive(Debug, Serialize, FromQueryResult)]
pub struct GenreCount {
    pub genre: String,
    pub total_songs: i64,
}

#[derive(Debug, Serialize, FromQueryResult)]
pub struct PlaylistSummary {
    pub playlist_id: i32,
    pub playlist_name: String,
    pub user_name: String,
    pub total_songs: i64,
}

#[derive(Debug, Serialize, FromQueryResult)]
pub struct PlaylistSongRow {
    pub title: String,
    pub artist: String,
    pub genre: String,
}

#[derive(Debug, Serialize, FromQueryResult)]
pub struct SkippedSong {
    pub title: String,
    pub artist: String,
    pub skips: i64,
}

#[derive(Debug, Serialize, FromQueryResult)]
pub struct WeeklyPlays {
    pub title: String,
    pub week: NaiveDateTime,
    pub plays: i64,
}

#[derive(Debug, Serialize, FromQueryResult)]
pub struct ActivityCell {
    /// 0 = Sunday
    pub day: i32,
    pub hour: i32,
    pub plays: i64,
}

#[derive(Debug, Serialize, FromQueryResult)]
pub struct PowerUser {
    pub user_name: String,
    pub total_plays: i64,
}

#[derive(Debug, Serialize)]
pub struct OverviewPage {
    pub kpis: OverviewKpis,
    pub songs: Vec<song::Model>,
}

#[derive(Debug, Serialize)]
pub struct UsersPage {
    pub kpis: UserKpis,
    pub users: Vec<user::Model>,
    pub age_distribution: Vec<AgeCount>,
    pub top_countries: Vec<CountryCount>,
}

#[derive(Debug, Serialize)]
pub struct SongsPage {
    pub kpis: SongKpis,
    pub genres: Vec<GenreCount>,
    pub songs: Vec<song::Model>,
}

#[derive(Debug, Serialize)]
pub struct PlaylistsPage {
    pub total_playlists: usize,
    pub avg_songs_per_playlist: Option<f64>,
    pub playlists: Vec<PlaylistSummary>,
}

#[derive(Debug, Serialize)]
pub struct PlaylistSongsPage {
    pub playlist_name: String,
    pub songs: Vec<PlaylistSongRow>,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsPage {
    pub top_skipped: Vec<SkippedSong>,
    pub weekly_plays: Vec<WeeklyPlays>,
    pub activity: Vec<ActivityCell>,
    pub power_users: Vec<PowerUser>,
}

const OVERVIEW_KPIS_SQL: &str = r#"
SELECT
    (SELECT COUNT(*) FROM users) AS total_users,
    (SELECT COUNT(*) FROM songs) AS total_songs,
    (SELECT COUNT(*) FROM listeninghistory) AS total_plays,
    ROUND(
        100.0 * (SELECT COUNT(*) FROM listeninghistory WHERE skipped = TRUE)
        / NULLIF((SELECT COUNT(*) FROM listeninghistory), 0), 2
    )::float8 AS skip_rate
"#;

const USER_KPIS_SQL: &str = r#"
SELECT
    COUNT(*) AS total_users,
    ROUND(AVG(age), 1)::float8 AS avg_age,
    COUNT(DISTINCT country) AS unique_countries
FROM users
"#;

const AGE_DISTRIBUTION_SQL: &str = r#"
SELECT age, COUNT(*) AS count
FROM users
GROUP BY age
ORDER BY age
"#;

const TOP_COUNTRIES_SQL: &str = r#"
SELECT country, COUNT(*) AS user_count
FROM users
GROUP BY country
ORDER BY user_count DESC, country
LIMIT 10
"#;

const SONG_KPIS_SQL: &str = r#"
SELECT
    COUNT(*) AS total_songs,
    COUNT(DISTINCT artist) AS unique_artists,
    COUNT(DISTINCT genre) AS unique_genres
FROM songs
"#;

const GENRES_SQL: &str = r#"
SELECT genre, COUNT(*) AS total_songs
FROM songs
GROUP BY genre
ORDER BY total_songs DESC, genre
"#;

const PLAYLISTS_SQL: &str = r#"
SELECT
    p.playlist_id,
    p.playlist_name,
    u.name AS user_name,
    COUNT(ps.song_id) AS total_songs
FROM playlists p
JOIN users u ON p.user_id = u.user_id
LEFT JOIN playlistsongs ps ON p.playlist_id = ps.playlist_id
GROUP BY p.playlist_id, p.playlist_name, u.name
ORDER BY total_songs DESC, p.playlist_id
"#;

const PLAYLIST_SONGS_SQL: &str = r#"
SELECT s.title, s.artist, s.genre
FROM playlistsongs ps
JOIN songs s ON ps.song_id = s.song_id
JOIN playlists p ON ps.playlist_id = p.playlist_id
WHERE p.playlist_name = $1
ORDER BY s.title
"#;

const TOP_SKIPPED_SQL: &str = r#"
SELECT s.title, s.artist, COUNT(*) AS skips
FROM listeninghistory lh
JOIN songs s ON lh.song_id = s.song_id
WHERE lh.skipped = TRUE
GROUP BY s.title, s.artist
ORDER BY skips DESC, s.title
LIMIT 10
"#;

const WEEKLY_PLAYS_SQL: &str = r#"
SELECT s.title, DATE_TRUNC('week', lh.played_at) AS week, COUNT(*) AS plays
FROM listeninghistory lh
JOIN songs s ON lh.song_id = s.song_id
WHERE lh.skipped = FALSE
GROUP BY s.title, week
HAVING COUNT(*) > $1
ORDER BY week, plays DESC
"#;

const ACTIVITY_SQL: &str = r#"
SELECT
    EXTRACT(DOW FROM played_at)::int4 AS day,
    EXTRACT(HOUR FROM played_at)::int4 AS hour,
    COUNT(*) AS plays
FROM listeninghistory
GROUP BY day, hour
ORDER BY day, hour
"#;

const POWER_USERS_SQL: &str = r#"
SELECT u.name AS user_name, COUNT(*) AS total_plays
FROM listeninghistory lh
JOIN users u ON lh.user_id = u.user_id
GROUP BY u.name
ORDER BY total_plays DESC, u.name
LIMIT 10
"#;

fn statement(sql: &str) -> Statement {
    Statement::from_string(DbBackend::Postgres, sql.trim())
}

/// Songs in every playlist called `name`. The name is always bound as a
/// parameter, never spliced into the SQL text.
pub fn playlist_songs_statement(name: &str) -> Statement {
    Statement::from_sql_and_values(
        DbBackend::Postgres,
        PLAYLIST_SONGS_SQL.trim(),
        [name.into()],
    )
}

fn weekly_plays_statement() -> Statement {
    Statement::from_sql_and_values(
        DbBackend::Postgres,
        WEEKLY_PLAYS_SQL.trim(),
        [VIRAL_WEEKLY_PLAYS.into()],
    )
}

/// Mean playlist size rounded to one decimal, `None` without playlists
pub fn average_songs(playlists: &[PlaylistSummary]) -> Option<f64> {
    if playlists.is_empty() {
        return None;
    }

    let total: i64 = playlists.iter().map(|p| p.total_songs).sum();
    let mean = total as f64 / playlists.len() as f64;
    Some((mean * 10.0).round() / 10.0)
}

/// Spread day/hour counts over a full Sun..Sat × 0..23 grid; missing cells stay 0
pub fn activity_grid(cells: &[ActivityCell]) -> [[i64; 24]; 7] {
    let mut grid = [[0i64; 24]; 7];
    for cell in cells {
        if (0..7).contains(&cell.day) && (0..24).contains(&cell.hour) {
            grid[cell.day as usize][cell.hour as usize] += cell.plays;
        }
    }
    grid
}

/// Read-only queries behind the dashboard pages
pub struct ReportService {
    db: DatabaseConnection,
}

impl ReportService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn overview_kpis(&self) -> Result<OverviewKpis, DbErr> {
        let kpis = OverviewKpis::find_by_statement(statement(OVERVIEW_KPIS_SQL))
            .one(&self.db)
            .await?;
        Ok(kpis.unwrap_or_default())
    }

    pub async fn song_sample(&self, limit: u64) -> Result<Vec<song::Model>, DbErr> {
        song::Entity::find()
            .order_by_asc(song::Column::SongId)
            .limit(limit)
            .all(&self.db)
            .await
    }

    pub async fn overview(&self) -> Result<OverviewPage, DbErr> {
        Ok(OverviewPage {
            kpis: self.overview_kpis().await?,
            songs: self.song_sample(OVERVIEW_SONG_SAMPLE).await?,
        })
    }

    pub async fn user_kpis(&self) -> Result<UserKpis, DbErr> {
        let kpis = UserKpis::find_by_statement(statement(USER_KPIS_SQL))
            .one(&self.db)
            .await?;
        Ok(kpis.unwrap_or_default())
    }

    pub async fn age_distribution(&self) -> Result<Vec<AgeCount>, DbErr> {
        AgeCount::find_by_statement(statement(AGE_DISTRIBUTION_SQL))
            .all(&self.db)
            .await
    }

    pub async fn top_countries(&self) -> Result<Vec<CountryCount>, DbErr> {
        CountryCount::find_by_statement(statement(TOP_COUNTRIES_SQL))
            .all(&self.db)
            .await
    }

    pub async fn users(&self) -> Result<UsersPage, DbErr> {
        let users = user::Entity::find()
            .order_by_asc(user::Column::UserId)
            .limit(USER_SAMPLE)
            .all(&self.db)
            .await?;

        Ok(UsersPage {
            kpis: self.user_kpis().await?,
            users,
            age_distribution: self.age_distribution().await?,
            top_countries: self.top_countries().await?,
        })
    }

    pub async fn song_kpis(&self) -> Result<SongKpis, DbErr> {
        let kpis = SongKpis::find_by_statement(statement(SONG_KPIS_SQL))
            .one(&self.db)
            .await?;
        Ok(kpis.unwrap_or_default())
    }

    pub async fn genres(&self) -> Result<Vec<GenreCount>, DbErr> {
        GenreCount::find_by_statement(statement(GENRES_SQL))
            .all(&self.db)
            .await
    }

    pub async fn songs(&self) -> Result<SongsPage, DbErr> {
        Ok(SongsPage {
            kpis: self.song_kpis().await?,
            genres: self.genres().await?,
            songs: self.song_sample(SONG_SAMPLE).await?,
        })
    }

    /// Every playlist with owner and size, largest first
    pub async fn playlist_summaries(&self) -> Result<Vec<PlaylistSummary>, DbErr> {
        PlaylistSummary::find_by_statement(statement(PLAYLISTS_SQL))
            .all(&self.db)
            .await
    }

    pub async fn playlists(&self) -> Result<PlaylistsPage, DbErr> {
        let playlists = self.playlist_summaries().await?;

        Ok(PlaylistsPage {
            total_playlists: playlists.len(),
            avg_songs_per_playlist: average_songs(&playlists),
            playlists,
        })
    }

    pub async fn playlist_songs(&self, name: &str) -> Result<Vec<PlaylistSongRow>, DbErr> {
        PlaylistSongRow::find_by_statement(playlist_songs_statement(name))
            .all(&self.db)
            .await
    }

    pub async fn top_skipped(&self) -> Result<Vec<SkippedSong>, DbErr> {
        SkippedSong::find_by_statement(statement(TOP_SKIPPED_SQL))
            .all(&self.db)
            .await
    }

    pub async fn weekly_plays(&self) -> Result<Vec<WeeklyPlays>, DbErr> {
        WeeklyPlays::find_by_statement(weekly_plays_statement())
            .all(&self.db)
            .await
    }

    pub async fn activity(&self) -> Result<Vec<ActivityCell>, DbErr> {
        ActivityCell::find_by_statement(statement(ACTIVITY_SQL))
            .all(&self.db)
            .await
    }

    pub async fn power_users(&self) -> Result<Vec<PowerUser>, DbErr> {
        PowerUser::find_by_statement(statement(POWER_USERS_SQL))
            .all(&self.db)
            .await
    }

    pub async fn analytics(&self) -> Result<AnalyticsPage, DbErr> {
        Ok(AnalyticsPage {
            top_skipped: self.top_skipped().await?,
            weekly_plays: self.weekly_plays().await?,
            activity: self.activity().await?,
            power_users: self.power_users().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::{Value, Values};

    fn summary(id: i32, total_songs: i64) -> PlaylistSummary {
        PlaylistSummary {
            playlist_id: id,
            playlist_name: format!("Test Mix {}", id),
            user_name: "Owner".to_string(),
            total_songs,
        }
    }

    #[test]
    fn test_playlist_filter_is_bound_not_interpolated() {
        let hostile = "x'; DROP TABLE users; --";
        let stmt = playlist_songs_statement(hostile);

        assert!(stmt.sql.contains("p.playlist_name = $1"));
        assert!(!stmt.sql.contains(hostile));
        assert_eq!(stmt.values, Some(Values(vec![Value::from(hostile)])));
    }

    #[test]
    fn test_weekly_plays_threshold_is_bound() {
        let stmt = weekly_plays_statement();

        assert!(stmt.sql.contains("HAVING COUNT(*) > $1"));
        assert_eq!(stmt.values, Some(Values(vec![Value::from(VIRAL_WEEKLY_PLAYS)])));
    }

    #[test]
    fn test_average_songs() {
        assert_eq!(average_songs(&[]), None);
        assert_eq!(
            average_songs(&[summary(1, 5), summary(2, 6), summary(3, 6)]),
            Some(5.7)
        );
        assert_eq!(average_songs(&[summary(1, 0)]), Some(0.0));
    }

    #[test]
    fn test_activity_grid() {
        let cells = vec![
            ActivityCell {
                day: 0,
                hour: 0,
                plays: 3,
            },
            ActivityCell {
                day: 6,
                hour: 23,
                plays: 9,
            },
            ActivityCell {
                day: 7,
                hour: 1,
                plays: 100,
            },
        ];

        let grid = activity_grid(&cells);

        assert_eq!(grid[0][0], 3);
        assert_eq!(grid[6][23], 9);
        assert_eq!(grid.iter().flatten().sum::<i64>(), 12);
    }

    #[test]
    fn test_kpis_serialize_missing_skip_rate_as_null() {
        let kpis = OverviewKpis::default();
        let json = serde_json::to_value(&kpis).unwrap();

        assert_eq!(json["total_plays"], 0);
        assert!(json["skip_rate"].is_null());
    }

    #[test]
    fn test_statements_target_postgres() {
        let stmt = statement(OVERVIEW_KPIS_SQL);
        assert_eq!(stmt.db_backend, DbBackend::Postgres);
        assert!(stmt.values.is_none());
        assert!(stmt.sql.starts_with("SELECT"));
    }
}
