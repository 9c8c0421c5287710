use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "songs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub song_id: i32,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    /// Length of the track in seconds
    pub duration: i32,
    pub release_date: ChronoDate,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::playlist_song::Entity")]
    PlaylistSongs,
    #[sea_orm(has_many = "super::listening_history::Entity")]
    ListeningHistory,
}

impl Related<super::playlist_song::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PlaylistSongs.def()
    }
}

impl Related<super::listening_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ListeningHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
