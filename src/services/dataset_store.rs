use anyhow::{Context, Result};
use async_trait::async_trait;
use sea_orm::*;
use std::fmt;

use crate::models::{listening_history, playlist, playlist_song, song, user};
use crate::services::synthesis::{
    NewListeningEvent, NewPlaylist, NewPlaylistSong, NewSong, NewUser, SongDuration,
};

/// Row counts of every table, reported after a generator run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub users: u64,
    pub songs: u64,
    pub playlists: u64,
    pub playlist_songs: u64,
    pub listening_history: u64,
}

impl fmt::Display for TableCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Users: {}", self.users)?;
        writeln!(f, "Songs: {}", self.songs)?;
        writeln!(f, "Playlists: {}", self.playlists)?;
        writeln!(f, "PlaylistSongs: {}", self.playlist_songs)?;
        write!(f, "ListeningHistory: {}", self.listening_history)
    }
}

/// Persistence seam for the dataset generator.
///
/// Every bulk call is one batch: it runs in its own transaction and is
/// committed before the call returns. Nothing spans batches, so a failure
/// leaves earlier batches in place.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    async fn insert_users(&self, rows: &[NewUser]) -> Result<()>;

    /// Every user id in the store, ascending
    async fn user_ids(&self) -> Result<Vec<i32>>;

    async fn insert_songs(&self, rows: &[NewSong]) -> Result<()>;

    /// Every song id with its duration, ascending by id
    async fn song_durations(&self) -> Result<Vec<SongDuration>>;

    /// Insert a single playlist and return its generated id
    async fn insert_playlist(&self, row: &NewPlaylist) -> Result<i32>;

    async fn insert_playlist_songs(&self, rows: &[NewPlaylistSong]) -> Result<()>;

    async fn insert_listening_events(&self, rows: &[NewListeningEvent]) -> Result<()>;

    async fn table_counts(&self) -> Result<TableCounts>;
}

/// `DatasetStore` backed by PostgreSQL through sea-orm
pub struct PgDatasetStore {
    db: DatabaseConnection,
}

impl PgDatasetStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Insert `models` in one transaction and commit it
async fn insert_batch<A>(db: &DatabaseConnection, models: Vec<A>) -> Result<u64, DbErr>
where
    A: ActiveModelTrait + Send,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    if models.is_empty() {
        return Ok(0);
    }

    let txn = db.begin().await?;
    let inserted = <A::Entity as EntityTrait>::insert_many(models)
        .exec_without_returning(&txn)
        .await?;
    txn.commit().await?;

    Ok(inserted)
}

#[async_trait]
impl DatasetStore for PgDatasetStore {
    async fn insert_users(&self, rows: &[NewUser]) -> Result<()> {
        let models: Vec<user::ActiveModel> = rows
            .iter()
            .map(|row| user::ActiveModel {
                user_id: NotSet,
                name: Set(row.name.clone()),
                email: Set(row.email.clone()),
                country: Set(row.country.clone()),
                age: Set(row.age),
                signup_date: Set(row.signup_date),
            })
            .collect();

        let inserted = insert_batch(&self.db, models)
            .await
            .context("Failed to insert users batch")?;
        log::debug!("Committed {} users", inserted);
        Ok(())
    }

    async fn user_ids(&self) -> Result<Vec<i32>> {
        let ids = user::Entity::find()
            .select_only()
            .column(user::Column::UserId)
            .order_by_asc(user::Column::UserId)
            .into_tuple::<i32>()
            .all(&self.db)
            .await
            .context("Failed to read user ids")?;

        Ok(ids)
    }

    async fn insert_songs(&self, rows: &[NewSong]) -> Result<()> {
        let models: Vec<song::ActiveModel> = rows
            .iter()
            .map(|row| song::ActiveModel {
                song_id: NotSet,
                title: Set(row.title.clone()),
                artist: Set(row.artist.clone()),
                album: Set(row.album.clone()),
                genre: Set(row.genre.clone()),
                duration: Set(row.duration),
                release_date: Set(row.release_date),
            })
            .collect();

        let inserted = insert_batch(&self.db, models)
            .await
            .context("Failed to insert songs batch")?;
        log::debug!("Committed {} songs", inserted);
        Ok(())
    }

    async fn song_durations(&self) -> Result<Vec<SongDuration>> {
        let rows = song::Entity::find()
            .select_only()
            .column(song::Column::SongId)
            .column(song::Column::Duration)
            .order_by_asc(song::Column::SongId)
            .into_tuple::<(i32, i32)>()
            .all(&self.db)
            .await
            .context("Failed to read song durations")?;

        Ok(rows
            .into_iter()
            .map(|(song_id, duration)| SongDuration { song_id, duration })
            .collect())
    }

    async fn insert_playlist(&self, row: &NewPlaylist) -> Result<i32> {
        let model = playlist::ActiveModel {
            playlist_id: NotSet,
            user_id: Set(row.user_id),
            playlist_name: Set(row.playlist_name.clone()),
            created_at: Set(row.created_at),
        };

        let result = playlist::Entity::insert(model)
            .exec(&self.db)
            .await
            .with_context(|| format!("Failed to insert playlist '{}'", row.playlist_name))?;

        Ok(result.last_insert_id)
    }

    async fn insert_playlist_songs(&self, rows: &[NewPlaylistSong]) -> Result<()> {
        let models: Vec<playlist_song::ActiveModel> = rows
            .iter()
            .map(|row| playlist_song::ActiveModel {
                playlist_id: Set(row.playlist_id),
                song_id: Set(row.song_id),
            })
            .collect();

        let inserted = insert_batch(&self.db, models)
            .await
            .context("Failed to insert playlist songs batch")?;
        log::debug!("Committed {} playlist songs", inserted);
        Ok(())
    }

    async fn insert_listening_events(&self, rows: &[NewListeningEvent]) -> Result<()> {
        let models: Vec<listening_history::ActiveModel> = rows
            .iter()
            .map(|row| listening_history::ActiveModel {
                history_id: NotSet,
                user_id: Set(row.user_id),
                song_id: Set(row.song_id),
                playlist_id: Set(row.playlist_id),
                played_at: Set(row.played_at),
                skipped: Set(row.skipped),
                duration_played: Set(row.duration_played),
            })
            .collect();

        let inserted = insert_batch(&self.db, models)
            .await
            .context("Failed to insert listening history batch")?;
        log::debug!("Committed {} listening events", inserted);
        Ok(())
    }

    async fn table_counts(&self) -> Result<TableCounts> {
        Ok(TableCounts {
            users: user::Entity::find().count(&self.db).await?,
            songs: song::Entity::find().count(&self.db).await?,
            playlists: playlist::Entity::find().count(&self.db).await?,
            playlist_songs: playlist_song::Entity::find().count(&self.db).await?,
            listening_history: listening_history::Entity::find().count(&self.db).await?,
        })
    }
}
