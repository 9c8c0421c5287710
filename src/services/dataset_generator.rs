use anyhow::Result;
use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use thiserror::Error;

use crate::services::catalog::{self, CatalogRecord};
use crate::services::dataset_store::{DatasetStore, TableCounts};
use crate::services::insert_buffer::InsertBuffer;
use crate::services::synthesis::{self, NewPlaylistSong, SongDuration};
use crate::utils::config::GeneratorConfig;
use crate::utils::validators;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("song catalog contains no usable rows")]
    EmptyCatalog,
    #[error("no users available to own playlists or play songs")]
    NoUsers,
    #[error("could not draw an unused email after {attempts} attempts")]
    UniqueEmailsExhausted { attempts: usize },
    #[error("batch size must be between 1 and {max}, got {got}")]
    InvalidBatchSize { got: usize, max: usize },
}

/// How many rows of each generated entity a run should produce
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetCounts {
    pub users: usize,
    pub playlists: usize,
    pub events: usize,
}

#[derive(Clone, Debug)]
pub struct GeneratorSettings {
    pub targets: TargetCounts,
    pub batch_size: usize,
    pub seed: u64,
    /// "Now" for every relative date window of the run
    pub reference_time: NaiveDateTime,
}

impl GeneratorSettings {
    pub fn from_config(config: &GeneratorConfig, reference_time: NaiveDateTime) -> Self {
        Self {
            targets: TargetCounts {
                users: config.users,
                playlists: config.playlists,
                events: config.events,
            },
            batch_size: config.batch_size,
            seed: config.seed,
            reference_time,
        }
    }
}

/// What a run produced, independent of rows already in the store
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneratedCounts {
    pub users: usize,
    pub songs: usize,
    pub fallback_durations: usize,
    pub playlists: usize,
    pub playlist_songs: usize,
    pub events: usize,
    pub skipped_events: usize,
    pub batches_committed: usize,
}

#[derive(Clone, Debug)]
pub struct PopulationSummary {
    pub generated: GeneratedCounts,
    pub tables: TableCounts,
}

/// One-shot batch job that synthesizes and loads the whole dataset.
///
/// Steps run strictly in dependency order: users, songs, playlists,
/// playlist membership, listening history. Users and songs are re-read from
/// the store after insertion so later steps only reference committed ids.
pub struct DatasetGenerator<'a, S: DatasetStore + ?Sized> {
    store: &'a S,
    settings: GeneratorSettings,
    rng: StdRng,
    generated: GeneratedCounts,
}

impl<'a, S: DatasetStore + ?Sized> DatasetGenerator<'a, S> {
    pub fn new(store: &'a S, settings: GeneratorSettings) -> Self {
        let rng = StdRng::seed_from_u64(settings.seed);
        Self {
            store,
            settings,
            rng,
            generated: GeneratedCounts::default(),
        }
    }

    /// Read the catalog at `catalog_path` and run every generation step.
    pub async fn populate(self, catalog_path: &Path) -> Result<PopulationSummary> {
        let records = catalog::read_catalog(catalog_path)?;
        self.populate_from_records(&records).await
    }

    /// Run every generation step over already-parsed catalog rows.
    pub async fn populate_from_records(
        mut self,
        records: &[CatalogRecord],
    ) -> Result<PopulationSummary> {
        if validators::validate_batch_size(self.settings.batch_size).is_err() {
            return Err(GeneratorError::InvalidBatchSize {
                got: self.settings.batch_size,
                max: validators::MAX_BATCH_SIZE,
            }
            .into());
        }
        if records.is_empty() {
            return Err(GeneratorError::EmptyCatalog.into());
        }

        let start_time = std::time::Instant::now();
        log::info!(
            "Populating dataset (seed {}, {} users, {} playlists, {} events, batch size {})",
            self.settings.seed,
            self.settings.targets.users,
            self.settings.targets.playlists,
            self.settings.targets.events,
            self.settings.batch_size
        );

        let user_ids = self.load_users().await?;
        let songs = self.load_songs(records).await?;

        let needs_users = self.settings.targets.playlists > 0 || self.settings.targets.events > 0;
        if needs_users && user_ids.is_empty() {
            return Err(GeneratorError::NoUsers.into());
        }
        if needs_users && songs.is_empty() {
            return Err(GeneratorError::EmptyCatalog.into());
        }

        let playlist_ids = self.create_playlists(&user_ids).await?;

        let song_ids: Vec<i32> = songs.iter().map(|s| s.song_id).collect();
        self.link_playlist_songs(&playlist_ids, &song_ids).await?;
        self.record_listening_history(&user_ids, &songs, &playlist_ids)
            .await?;

        let tables = self.store.table_counts().await?;

        log::info!(
            "Dataset populated in {:?}: {} batches committed",
            start_time.elapsed(),
            self.generated.batches_committed
        );

        Ok(PopulationSummary {
            generated: self.generated,
            tables,
        })
    }

    /// Step 1: synthesize users, bulk-insert them, re-read their ids
    async fn load_users(&mut self) -> Result<Vec<i32>> {
        let today = self.settings.reference_time.date();
        let users = synthesis::generate_users(&mut self.rng, self.settings.targets.users, today)?;

        for chunk in users.chunks(self.settings.batch_size) {
            self.store.insert_users(chunk).await?;
            self.generated.batches_committed += 1;
        }
        self.generated.users = users.len();

        let user_ids = self.store.user_ids().await?;
        log::info!(
            "Inserted {} users ({} user ids available)",
            users.len(),
            user_ids.len()
        );

        Ok(user_ids)
    }

    /// Step 2: build songs from the catalog, bulk-insert, re-read ids and durations
    async fn load_songs(&mut self, records: &[CatalogRecord]) -> Result<Vec<SongDuration>> {
        let today = self.settings.reference_time.date();

        let mut songs = Vec::with_capacity(records.len());
        for record in records {
            if record.duration_seconds().is_none() {
                self.generated.fallback_durations += 1;
            }
            songs.push(synthesis::song_from_record(&mut self.rng, record, today));
        }

        for chunk in songs.chunks(self.settings.batch_size) {
            self.store.insert_songs(chunk).await?;
            self.generated.batches_committed += 1;
        }
        self.generated.songs = songs.len();

        let durations = self.store.song_durations().await?;
        log::info!(
            "Inserted {} songs ({} with fallback duration, {} song ids available)",
            songs.len(),
            self.generated.fallback_durations,
            durations.len()
        );

        Ok(durations)
    }

    /// Step 3: insert playlists one at a time, capturing each generated id
    async fn create_playlists(&mut self, user_ids: &[i32]) -> Result<Vec<i32>> {
        let today = self.settings.reference_time.date();
        let mut playlist_ids = Vec::with_capacity(self.settings.targets.playlists);

        for index in 0..self.settings.targets.playlists {
            let playlist = synthesis::new_playlist(&mut self.rng, index, user_ids, today)?;
            let playlist_id = self.store.insert_playlist(&playlist).await?;
            playlist_ids.push(playlist_id);
        }

        self.generated.playlists = playlist_ids.len();
        log::info!("Inserted {} playlists", playlist_ids.len());

        Ok(playlist_ids)
    }

    /// Step 4: sample songs for every playlist and flush edges in batches
    async fn link_playlist_songs(&mut self, playlist_ids: &[i32], song_ids: &[i32]) -> Result<()> {
        let mut buffer = InsertBuffer::new(self.settings.batch_size);

        for &playlist_id in playlist_ids {
            let chosen = synthesis::sample_playlist_songs(&mut self.rng, song_ids);
            self.generated.playlist_songs += chosen.len();
            buffer.extend(chosen.into_iter().map(|song_id| NewPlaylistSong {
                playlist_id,
                song_id,
            }));

            if buffer.is_full() {
                let batch = buffer.take();
                self.store.insert_playlist_songs(&batch).await?;
                self.generated.batches_committed += 1;
                log::debug!("Flushed {} playlist songs", batch.len());
            }
        }

        if !buffer.is_empty() {
            self.store.insert_playlist_songs(&buffer.take()).await?;
            self.generated.batches_committed += 1;
        }

        log::info!(
            "Inserted {} playlist songs",
            self.generated.playlist_songs
        );

        Ok(())
    }

    /// Step 5: synthesize listening events and flush them in batches
    async fn record_listening_history(
        &mut self,
        user_ids: &[i32],
        songs: &[SongDuration],
        playlist_ids: &[i32],
    ) -> Result<()> {
        let total = self.settings.targets.events;
        let now = self.settings.reference_time;
        let mut buffer = InsertBuffer::new(self.settings.batch_size);

        for _ in 0..total {
            let event =
                synthesis::listening_event(&mut self.rng, user_ids, songs, playlist_ids, now)?;
            if event.skipped {
                self.generated.skipped_events += 1;
            }
            buffer.push(event);

            if buffer.is_full() {
                let batch = buffer.take();
                self.store.insert_listening_events(&batch).await?;
                self.generated.events += batch.len();
                self.generated.batches_committed += 1;
                log::info!("Listening history: {}/{} events committed", self.generated.events, total);
            }
        }

        if !buffer.is_empty() {
            let batch = buffer.take();
            self.store.insert_listening_events(&batch).await?;
            self.generated.events += batch.len();
            self.generated.batches_committed += 1;
        }

        log::info!(
            "Inserted {} listening events ({} skipped)",
            self.generated.events,
            self.generated.skipped_events
        );

        Ok(())
    }
}
