//! Row synthesis for the dataset generator.
//!
//! Every function takes the random source explicitly; the generator seeds a
//! single `StdRng` and threads it through each step so a run is reproducible
//! from its seed and catalog alone.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use fake::faker::address::en::CountryName;
use fake::faker::internet::en::FreeEmail;
use fake::faker::lorem::en::Word;
use fake::faker::name::en::Name;
use fake::Fake;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::ops::RangeInclusive;

use crate::services::catalog::CatalogRecord;
use crate::services::dataset_generator::GeneratorError;
use crate::utils::validators::truncate_chars;

pub const USER_AGE: RangeInclusive<i32> = 15..=70;
pub const SIGNUP_WINDOW_DAYS: i64 = 4 * 365;
pub const RELEASE_WINDOW_DAYS: i64 = 10 * 365;
pub const PLAYLIST_WINDOW_DAYS: i64 = 2 * 365;
pub const PLAY_WINDOW_DAYS: i64 = 365;

pub const FALLBACK_DURATION_SECS: RangeInclusive<i32> = 120..=420;
pub const PLAYLIST_SIZE: RangeInclusive<usize> = 5..=20;
pub const PLAYLIST_ATTRIBUTION_PROBABILITY: f64 = 0.4;
pub const SKIP_PROBABILITY: f64 = 0.18;
pub const SKIPPED_PLAY_FRACTION: f64 = 0.35;

pub const TITLE_MAX_CHARS: usize = 300;
pub const ARTIST_MAX_CHARS: usize = 200;
pub const ALBUM_MAX_CHARS: usize = 200;
pub const GENRE_MAX_CHARS: usize = 100;

/// Draws allowed per user before giving up on finding an unused email
pub const MAX_UNIQUE_ATTEMPTS: usize = 1000;

#[derive(Clone, Debug, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub country: String,
    pub age: i32,
    pub signup_date: NaiveDate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub duration: i32,
    pub release_date: NaiveDate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewPlaylist {
    pub user_id: i32,
    pub playlist_name: String,
    pub created_at: NaiveDate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NewPlaylistSong {
    pub playlist_id: i32,
    pub song_id: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewListeningEvent {
    pub user_id: i32,
    pub song_id: i32,
    pub playlist_id: Option<i32>,
    pub played_at: NaiveDateTime,
    pub skipped: bool,
    pub duration_played: i32,
}

/// A song as the event step sees it: identifier plus duration in seconds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SongDuration {
    pub song_id: i32,
    pub duration: i32,
}

/// Uniform date in `[today - days, today]`
pub fn random_date_within_days<R: Rng + ?Sized>(
    rng: &mut R,
    today: NaiveDate,
    days: i64,
) -> NaiveDate {
    today - Duration::days(rng.gen_range(0..=days))
}

/// Uniform timestamp in `[now - days, now]` at one-second granularity
pub fn random_datetime_within_days<R: Rng + ?Sized>(
    rng: &mut R,
    now: NaiveDateTime,
    days: i64,
) -> NaiveDateTime {
    let start = now - Duration::days(days);
    let span_seconds = (now - start).num_seconds();
    start + Duration::seconds(rng.gen_range(0..=span_seconds))
}

/// Synthesize `count` users with pairwise-distinct emails.
pub fn generate_users<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    today: NaiveDate,
) -> Result<Vec<NewUser>, GeneratorError> {
    let mut users = Vec::with_capacity(count);
    let mut seen_emails: HashSet<String> = HashSet::with_capacity(count);

    for _ in 0..count {
        let name: String = Name().fake_with_rng(rng);
        let email = unique_email(rng, &mut seen_emails)?;
        let country: String = CountryName().fake_with_rng(rng);
        let age = rng.gen_range(USER_AGE);
        let signup_date = random_date_within_days(rng, today, SIGNUP_WINDOW_DAYS);

        users.push(NewUser {
            name,
            email,
            country,
            age,
            signup_date,
        });
    }

    Ok(users)
}

fn unique_email<R: Rng + ?Sized>(
    rng: &mut R,
    seen: &mut HashSet<String>,
) -> Result<String, GeneratorError> {
    for _ in 0..MAX_UNIQUE_ATTEMPTS {
        let email: String = FreeEmail().fake_with_rng(rng);
        if seen.insert(email.clone()) {
            return Ok(email);
        }
    }

    Err(GeneratorError::UniqueEmailsExhausted {
        attempts: MAX_UNIQUE_ATTEMPTS,
    })
}

/// Build a song row from a catalog record. The catalog's own release date
/// is ignored: every song gets a synthetic date within the last ten years.
pub fn song_from_record<R: Rng + ?Sized>(
    rng: &mut R,
    record: &CatalogRecord,
    today: NaiveDate,
) -> NewSong {
    let duration = match record.duration_seconds() {
        Some(seconds) => seconds,
        None => rng.gen_range(FALLBACK_DURATION_SECS),
    };
    let release_date = random_date_within_days(rng, today, RELEASE_WINDOW_DAYS);

    NewSong {
        title: text_or_unknown(record.track.as_deref(), TITLE_MAX_CHARS),
        artist: text_or_unknown(record.artist.as_deref(), ARTIST_MAX_CHARS),
        album: text_or_unknown(record.album.as_deref(), ALBUM_MAX_CHARS),
        genre: text_or_unknown(record.album_type.as_deref(), GENRE_MAX_CHARS),
        duration,
        release_date,
    }
}

fn text_or_unknown(value: Option<&str>, max_chars: usize) -> String {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => truncate_chars(text, max_chars),
        _ => "Unknown".to_string(),
    }
}

/// Synthesize the `index`-th playlist, owned by a uniformly chosen user.
pub fn new_playlist<R: Rng + ?Sized>(
    rng: &mut R,
    index: usize,
    user_ids: &[i32],
    today: NaiveDate,
) -> Result<NewPlaylist, GeneratorError> {
    let owner = *user_ids.choose(rng).ok_or(GeneratorError::NoUsers)?;
    let word: String = Word().fake_with_rng(rng);
    let created_at = random_date_within_days(rng, today, PLAYLIST_WINDOW_DAYS);

    Ok(NewPlaylist {
        user_id: owner,
        playlist_name: playlist_name(&word, index),
        created_at,
    })
}

/// "{Word} Mix {index}" with the word capitalized
pub fn playlist_name(word: &str, index: usize) -> String {
    let mut chars = word.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    };

    format!("{} Mix {}", capitalized, index)
}

/// Pick 5..=20 distinct songs (capped at the catalog size) for one playlist
pub fn sample_playlist_songs<R: Rng + ?Sized>(rng: &mut R, song_ids: &[i32]) -> Vec<i32> {
    let wanted = rng.gen_range(PLAYLIST_SIZE).min(song_ids.len());
    song_ids.choose_multiple(rng, wanted).copied().collect()
}

/// Seconds listened: `[1, duration]`, or `[1, max(1, floor(0.35 * duration))]`
/// when the play was skipped.
pub fn duration_played<R: Rng + ?Sized>(rng: &mut R, duration: i32, skipped: bool) -> i32 {
    let duration = duration.max(1);
    let upper = if skipped {
        ((duration as f64 * SKIPPED_PLAY_FRACTION).floor() as i32).max(1)
    } else {
        duration
    };

    rng.gen_range(1..=upper)
}

/// Synthesize one listening event over the already-persisted entities.
pub fn listening_event<R: Rng + ?Sized>(
    rng: &mut R,
    user_ids: &[i32],
    songs: &[SongDuration],
    playlist_ids: &[i32],
    now: NaiveDateTime,
) -> Result<NewListeningEvent, GeneratorError> {
    let user_id = *user_ids.choose(rng).ok_or(GeneratorError::NoUsers)?;
    let song = *songs.choose(rng).ok_or(GeneratorError::EmptyCatalog)?;
    let playlist_id = if rng.gen_bool(PLAYLIST_ATTRIBUTION_PROBABILITY) {
        playlist_ids.choose(rng).copied()
    } else {
        None
    };
    let played_at = random_datetime_within_days(rng, now, PLAY_WINDOW_DAYS);
    let skipped = rng.gen_bool(SKIP_PROBABILITY);
    let duration_played = duration_played(rng, song.duration, skipped);

    Ok(NewListeningEvent {
        user_id,
        song_id: song.song_id,
        playlist_id,
        played_at,
        skipped,
        duration_played,
    })
}
