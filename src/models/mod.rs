pub mod user;
pub mod song;
pub mod playlist;
pub mod playlist_song;
pub mod listening_history;
