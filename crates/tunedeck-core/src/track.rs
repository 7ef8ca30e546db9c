//! Catalog entries
//!
//! Defines the track record as stored by the backend, the draft an admin
//! submits to create one, and the fixed genre vocabularies.

use std::fmt;
use std::str::FromStr;

use serde::{ Deserialize, Serialize };
use thiserror::Error;

use crate::format::{ self, FormatError };


/// Genre marker carried by every Category-H (Halal) track.
pub const HALAL_GENRE: &str = "Halal";

/// Genres available to the Music and Song tabs.
pub const STANDARD_GENRES: &[&str] = &[
    "Pop", "Rock", "Instrumental", "Lo-Fi", "Electronic", "Folk", "Acoustic",
];

/// Categories available to Halal tracks, stored in `sub_genre`.
pub const HALAL_SUB_GENRES: &[&str] = &[
    "Nasheed", "Islamic Pop", "Quran Recitation", "Spoken Word", "Lofi Nasheed",
];


/// Errors raised while validating a track draft.
#[derive( Debug, Error, PartialEq, Eq )]
pub enum TrackError {
    #[error( "Missing required field: {0}" )]
    MissingField( &'static str ),

    #[error( "Unknown media type: {0}" )]
    UnknownMediaType( String ),

    #[error( "Unknown genre: {0}" )]
    UnknownGenre( String ),

    #[error( "Unknown category: {0}" )]
    UnknownCategory( String ),

    #[error( "Invalid URL: {0}" )]
    InvalidUrl( #[from] FormatError ),
}


/// Content category of a track. Each one has its own library tab.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize )]
pub enum MediaType {
    #[default]
    Music,
    Song,
    Halal,
}


impl MediaType {
    pub const ALL: [MediaType; 3] = [ MediaType::Music, MediaType::Song, MediaType::Halal ];


    /// Name as stored in the `type` field.
    pub fn as_str( &self ) -> &'static str {
        match self {
            MediaType::Music => "Music",
            MediaType::Song => "Song",
            MediaType::Halal => "Halal",
        }
    }
}


impl fmt::Display for MediaType {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        f.write_str( self.as_str() )
    }
}


impl FromStr for MediaType {
    type Err = TrackError;


    fn from_str( s: &str ) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "music" => Ok( MediaType::Music ),
            "song" | "songs" => Ok( MediaType::Song ),
            "halal" => Ok( MediaType::Halal ),
            other => Err( TrackError::UnknownMediaType( other.to_string() ) ),
        }
    }
}


/// A playable catalog entry as pushed by the backend.
#[derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize )]
#[serde( rename_all = "camelCase" )]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde( default )]
    pub original_url: String,
    #[serde( default )]
    pub direct_url: String,
    #[serde( default )]
    pub image_url: String,
    #[serde( default )]
    pub lyrics: String,
    #[serde( rename = "type", default )]
    pub media_type: MediaType,
    #[serde( default )]
    pub genre: String,
    #[serde( default )]
    pub sub_genre: String,
    #[serde( default )]
    pub play_count: u64,
    #[serde( default )]
    pub is_pinned: bool,
    /// Server-assigned creation time in milliseconds since the epoch.
    #[serde( default )]
    pub created_at: u64,
}


impl Track {
    /// True if the track belongs to Category-H by either tag.
    ///
    /// Older records carry the marker only in `genre`, so both fields count.
    pub fn is_halal( &self ) -> bool {
        self.media_type == MediaType::Halal || self.genre == HALAL_GENRE
    }


    /// The deep-link fragment that resolves back to this track.
    pub fn share_fragment( &self ) -> String {
        format!( "#/media/{}", format::slugify( &self.title ) )
    }
}


/// Admin-submitted fields for a new track.
///
/// The backend assigns `id`, `created_at`, and starts `play_count` at zero.
#[derive( Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize )]
#[serde( rename_all = "camelCase", default )]
pub struct NewTrack {
    pub title: String,
    pub artist: String,
    pub original_url: String,
    pub direct_url: String,
    pub image_url: String,
    pub lyrics: String,
    #[serde( rename = "type" )]
    pub media_type: MediaType,
    pub genre: String,
    pub sub_genre: String,
}


impl NewTrack {
    /// Validates the draft and returns it ready for storage.
    ///
    /// Halal drafts get the `Halal` genre and must name a category; other
    /// drafts must use a standard genre and carry no category. The playable
    /// `direct_url` is derived from `original_url`.
    pub fn normalize( mut self ) -> Result<Self, TrackError> {
        self.title = self.title.trim().to_string();
        self.artist = self.artist.trim().to_string();

        if self.title.is_empty() {
            return Err( TrackError::MissingField( "title" ) );
        }
        if self.artist.is_empty() {
            return Err( TrackError::MissingField( "artist" ) );
        }

        self.direct_url = format::normalize_audio_url( &self.original_url )?;
        self.original_url = self.original_url.trim().to_string();

        if self.media_type == MediaType::Halal {
            let category = self.sub_genre.trim();
            if category.is_empty() {
                return Err( TrackError::MissingField( "category" ) );
            }
            if !HALAL_SUB_GENRES.contains( &category ) {
                return Err( TrackError::UnknownCategory( category.to_string() ) );
            }
            self.sub_genre = category.to_string();
            self.genre = HALAL_GENRE.to_string();
        } else {
            let genre = self.genre.trim();
            if !STANDARD_GENRES.contains( &genre ) {
                return Err( TrackError::UnknownGenre( genre.to_string() ) );
            }
            self.genre = genre.to_string();
            self.sub_genre.clear();
        }

        Ok( self )
    }


    /// Builds the stored record once the backend has assigned identity.
    pub fn into_track( self, id: String, created_at: u64 ) -> Track {
        Track {
            id,
            title: self.title,
            artist: self.artist,
            original_url: self.original_url,
            direct_url: self.direct_url,
            image_url: self.image_url,
            lyrics: self.lyrics,
            media_type: self.media_type,
            genre: self.genre,
            sub_genre: self.sub_genre,
            play_count: 0,
            is_pinned: false,
            created_at,
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    fn draft( media_type: MediaType, genre: &str, sub_genre: &str ) -> NewTrack {
        NewTrack {
            title: " Safar ".into(),
            artist: "Ayaan".into(),
            original_url: "https://cdn.example.com/safar.mp3".into(),
            media_type,
            genre: genre.into(),
            sub_genre: sub_genre.into(),
            ..Default::default()
        }
    }


    #[test]
    fn test_halal_draft_forces_genre() {
        let track = draft( MediaType::Halal, "Rock", "Nasheed" ).normalize().unwrap();
        assert_eq!( track.genre, HALAL_GENRE );
        assert_eq!( track.sub_genre, "Nasheed" );
    }


    #[test]
    fn test_halal_draft_requires_category() {
        let result = draft( MediaType::Halal, "", "" ).normalize();
        assert_eq!( result, Err( TrackError::MissingField( "category" ) ) );
    }


    #[test]
    fn test_standard_draft_clears_category() {
        let track = draft( MediaType::Song, "Folk", "Nasheed" ).normalize().unwrap();
        assert_eq!( track.title, "Safar" );
        assert_eq!( track.genre, "Folk" );
        assert!( track.sub_genre.is_empty() );
        assert_eq!( track.direct_url, "https://cdn.example.com/safar.mp3" );
    }


    #[test]
    fn test_standard_draft_rejects_unknown_genre() {
        let result = draft( MediaType::Music, "Halal", "" ).normalize();
        assert!( matches!( result, Err( TrackError::UnknownGenre( _ ) ) ) );
    }


    #[test]
    fn test_draft_rejects_bad_url() {
        let mut d = draft( MediaType::Music, "Pop", "" );
        d.original_url = "not a link".into();
        assert!( matches!( d.normalize(), Err( TrackError::InvalidUrl( _ ) ) ) );
    }


    #[test]
    fn test_legacy_genre_marks_halal() {
        let track = draft( MediaType::Music, "Pop", "" )
            .normalize()
            .unwrap()
            .into_track( "t1".into(), 5 );
        assert!( !track.is_halal() );

        let legacy = Track { genre: HALAL_GENRE.into(), ..track };
        assert!( legacy.is_halal() );
    }


    #[test]
    fn test_deserialize_backend_record() {
        let json = r#"{
            "id": "abc",
            "title": "Cholna Sujon",
            "artist": "Band",
            "type": "Music",
            "genre": "Pop",
            "createdAt": 2
        }"#;
        let track: Track = serde_json::from_str( json ).unwrap();
        assert_eq!( track.media_type, MediaType::Music );
        assert_eq!( track.play_count, 0 );
        assert!( !track.is_pinned );
        assert_eq!( track.share_fragment(), "#/media/Cholna-Sujon" );
    }
}
