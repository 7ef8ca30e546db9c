//! Library filtering and ordering
//!
//! Turns the full catalog plus the tab/genre/search/sort selection into the
//! list shown to the user, which is also the active playlist.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::track::{ MediaType, Track, HALAL_SUB_GENRES, STANDARD_GENRES };


/// Genre filter value that disables genre refinement.
pub const ALL_GENRES: &str = "All";


#[derive( Debug, Error, PartialEq, Eq )]
#[error( "Unknown sort option: '{0}'. Use newest, oldest, title, artist, or plays" )]
pub struct UnknownSort( pub String );


/// A library tab. Tabs map one-to-one onto media types.
pub type Tab = MediaType;


impl MediaType {
    /// Tab to the right, as a left swipe would select.
    pub fn next( self ) -> Self {
        match self {
            MediaType::Music => MediaType::Song,
            MediaType::Song | MediaType::Halal => MediaType::Halal,
        }
    }


    /// Tab to the left.
    pub fn prev( self ) -> Self {
        match self {
            MediaType::Halal => MediaType::Song,
            MediaType::Song | MediaType::Music => MediaType::Music,
        }
    }
}


/// Ordering applied after filtering.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum SortOption {
    #[default]
    Newest,
    Oldest,
    Title,
    Artist,
    PlayCount,
}


impl SortOption {
    pub const ALL: [SortOption; 5] = [
        SortOption::Newest,
        SortOption::Oldest,
        SortOption::Title,
        SortOption::Artist,
        SortOption::PlayCount,
    ];


    /// Human-readable name for menus.
    pub fn label( &self ) -> &'static str {
        match self {
            SortOption::Newest => "Newest First",
            SortOption::Oldest => "Oldest First",
            SortOption::Title => "Title (A-Z)",
            SortOption::Artist => "Artist (A-Z)",
            SortOption::PlayCount => "Most Played",
        }
    }


    /// Compares two tracks by this option alone, ignoring pins.
    pub fn compare( &self, a: &Track, b: &Track ) -> Ordering {
        match self {
            SortOption::Newest => b.created_at.cmp( &a.created_at ),
            SortOption::Oldest => a.created_at.cmp( &b.created_at ),
            SortOption::Title => collate( &a.title, &b.title ),
            SortOption::Artist => collate( &a.artist, &b.artist ),
            SortOption::PlayCount => b.play_count.cmp( &a.play_count ),
        }
    }
}


impl fmt::Display for SortOption {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        f.write_str( match self {
            SortOption::Newest => "newest",
            SortOption::Oldest => "oldest",
            SortOption::Title => "title",
            SortOption::Artist => "artist",
            SortOption::PlayCount => "playCount",
        })
    }
}


impl FromStr for SortOption {
    type Err = UnknownSort;


    fn from_str( s: &str ) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "newest" | "new" => Ok( SortOption::Newest ),
            "oldest" | "old" => Ok( SortOption::Oldest ),
            "title" => Ok( SortOption::Title ),
            "artist" => Ok( SortOption::Artist ),
            "playcount" | "plays" | "popular" => Ok( SortOption::PlayCount ),
            _ => Err( UnknownSort( s.to_string() ) ),
        }
    }
}


/// Case- and accent-insensitive comparison, falling back to the raw text so
/// distinct strings never compare equal.
fn collate( a: &str, b: &str ) -> Ordering {
    collation_key( a )
        .cmp( &collation_key( b ) )
        .then_with( || a.cmp( b ) )
}


fn collation_key( s: &str ) -> String {
    s.nfkd()
        .filter( |c| !is_combining_mark( *c ) )
        .flat_map( char::to_lowercase )
        .collect()
}


/// The user's current library selection.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct FilterState {
    pub tab: Tab,
    /// `ALL_GENRES`, a standard genre, or a Halal category on the Halal tab.
    pub genre: String,
    pub search: String,
    pub sort: SortOption,
}


impl Default for FilterState {
    fn default() -> Self {
        Self {
            tab: Tab::Music,
            genre: ALL_GENRES.to_string(),
            search: String::new(),
            sort: SortOption::default(),
        }
    }
}


impl FilterState {
    /// Checks every filter predicate against one track.
    pub fn matches( &self, track: &Track ) -> bool {
        self.matches_tab( track ) && self.matches_genre( track ) && self.matches_search( track )
    }


    fn matches_tab( &self, track: &Track ) -> bool {
        match self.tab {
            // Legacy records may only carry the marker in `genre`.
            MediaType::Halal => track.is_halal(),
            tab => track.media_type == tab && !track.is_halal(),
        }
    }


    fn matches_genre( &self, track: &Track ) -> bool {
        if self.genre == ALL_GENRES {
            return true;
        }

        match self.tab {
            MediaType::Halal => track.sub_genre == self.genre,
            _ => track.genre == self.genre,
        }
    }


    fn matches_search( &self, track: &Track ) -> bool {
        if self.search.is_empty() {
            return true;
        }

        let query = self.search.to_lowercase();
        track.title.to_lowercase().contains( &query ) || track.artist.to_lowercase().contains( &query )
    }
}


/// Genre choices offered on a tab, `All` first.
pub fn genre_choices( tab: Tab ) -> Vec<&'static str> {
    let genres = match tab {
        MediaType::Halal => HALAL_SUB_GENRES,
        _ => STANDARD_GENRES,
    };

    std::iter::once( ALL_GENRES ).chain( genres.iter().copied() ).collect()
}


/// Computes the visible track list.
///
/// Pinned tracks come first; each group is ordered by the sort option and
/// ties keep catalog order.
pub fn visible_tracks( tracks: &[Track], state: &FilterState ) -> Vec<Track> {
    let mut result: Vec<Track> = tracks.iter()
        .filter( |t| state.matches( t ) )
        .cloned()
        .collect();

    result.sort_by( |a, b| {
        b.is_pinned.cmp( &a.is_pinned )
            .then_with( || state.sort.compare( a, b ) )
    });

    tracing::debug!(
        "Filtered {} of {} tracks (tab={}, genre={}, sort={})",
        result.len(),
        tracks.len(),
        state.tab,
        state.genre,
        state.sort
    );

    result
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::track::HALAL_GENRE;


    fn track( id: &str, title: &str, artist: &str, media_type: MediaType, genre: &str, created_at: u64 ) -> Track {
        Track {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            original_url: String::new(),
            direct_url: String::new(),
            image_url: String::new(),
            lyrics: String::new(),
            media_type,
            genre: genre.into(),
            sub_genre: String::new(),
            play_count: 0,
            is_pinned: false,
            created_at,
        }
    }


    fn catalog() -> Vec<Track> {
        let mut nasheed = track( "h1", "Tala al Badru", "Choir", MediaType::Halal, HALAL_GENRE, 5 );
        nasheed.sub_genre = "Nasheed".into();
        let mut spoken = track( "h2", "Reminder", "Imam", MediaType::Halal, HALAL_GENRE, 4 );
        spoken.sub_genre = "Spoken Word".into();

        vec![
            track( "m1", "Cholna Sujon", "Band", MediaType::Music, "Pop", 7 ),
            track( "m2", "Évasion", "zed", MediaType::Music, "Rock", 6 ),
            nasheed,
            spoken,
            // misfiled legacy record: Halal genre on a Music track
            track( "legacy", "Old Nasheed", "Choir", MediaType::Music, HALAL_GENRE, 3 ),
            track( "s1", "Safar", "Ayaan", MediaType::Song, "Folk", 1 ),
            track( "m3", "alpha", "Band", MediaType::Music, "Pop", 2 ),
        ]
    }


    fn ids( tracks: &[Track] ) -> Vec<&str> {
        tracks.iter().map( |t| t.id.as_str() ).collect()
    }


    #[test]
    fn test_scenario_music_tab() {
        let tracks = vec![
            track( "a", "Cholna Sujon", "X", MediaType::Music, "Pop", 2 ),
            track( "b", "Safar", "Y", MediaType::Song, "Folk", 1 ),
        ];
        let result = visible_tracks( &tracks, &FilterState::default() );
        assert_eq!( ids( &result ), vec![ "a" ] );
    }


    #[test]
    fn test_music_tab_excludes_legacy_halal() {
        let result = visible_tracks( &catalog(), &FilterState::default() );
        assert_eq!( ids( &result ), vec![ "m1", "m2", "m3" ] );
    }


    #[test]
    fn test_halal_tab_includes_legacy() {
        let state = FilterState { tab: Tab::Halal, ..Default::default() };
        let result = visible_tracks( &catalog(), &state );
        assert_eq!( ids( &result ), vec![ "h1", "h2", "legacy" ] );
    }


    #[test]
    fn test_halal_genre_uses_sub_genre() {
        let state = FilterState { tab: Tab::Halal, genre: "Nasheed".into(), ..Default::default() };
        assert_eq!( ids( &visible_tracks( &catalog(), &state ) ), vec![ "h1" ] );
    }


    #[test]
    fn test_genre_and_search_combine() {
        let state = FilterState { genre: "Pop".into(), search: "BAND".into(), ..Default::default() };
        assert_eq!( ids( &visible_tracks( &catalog(), &state ) ), vec![ "m1", "m3" ] );

        let state = FilterState { genre: "Pop".into(), search: "sujon".into(), ..Default::default() };
        assert_eq!( ids( &visible_tracks( &catalog(), &state ) ), vec![ "m1" ] );

        let state = FilterState { genre: "Rock".into(), search: "sujon".into(), ..Default::default() };
        assert!( visible_tracks( &catalog(), &state ).is_empty() );
    }


    #[test]
    fn test_predicates_partition_catalog() {
        let all = catalog();
        for tab in MediaType::ALL {
            for genre in genre_choices( tab ) {
                for search in [ "", "a", "choir", "zzz" ] {
                    let state = FilterState { tab, genre: genre.into(), search: search.into(), sort: SortOption::Title };
                    let shown = visible_tracks( &all, &state );
                    for t in &all {
                        let visible = shown.iter().any( |s| s.id == t.id );
                        assert_eq!( visible, state.matches( t ), "{:?} / {}", state, t.id );
                    }
                }
            }
        }
    }


    #[test]
    fn test_title_sort_ignores_case_and_accents() {
        let state = FilterState { sort: SortOption::Title, ..Default::default() };
        assert_eq!( ids( &visible_tracks( &catalog(), &state ) ), vec![ "m3", "m1", "m2" ] );
    }


    #[test]
    fn test_oldest_and_plays() {
        let mut tracks = catalog();
        tracks[ 0 ].play_count = 3;
        tracks[ 6 ].play_count = 9;

        let state = FilterState { sort: SortOption::Oldest, ..Default::default() };
        assert_eq!( ids( &visible_tracks( &tracks, &state ) ), vec![ "m3", "m2", "m1" ] );

        let state = FilterState { sort: SortOption::PlayCount, ..Default::default() };
        assert_eq!( ids( &visible_tracks( &tracks, &state ) ), vec![ "m3", "m1", "m2" ] );
    }


    #[test]
    fn test_each_sort_option_order() {
        let mut zebra = track( "z", "Zebra", "Émile", MediaType::Music, "Pop", 10 );
        zebra.play_count = 2;
        let mut apple = track( "a", "apple", "adam", MediaType::Music, "Pop", 30 );
        apple.play_count = 5;
        let mut upper = track( "M", "Mango", "Beta", MediaType::Music, "Pop", 20 );
        upper.play_count = 5;
        let lower = track( "m", "mango", "Zed", MediaType::Music, "Pop", 5 );
        let tracks = vec![ zebra, apple, upper, lower ];

        let order = |tracks: &[Track], sort: SortOption| -> Vec<String> {
            let state = FilterState { sort, ..Default::default() };
            visible_tracks( tracks, &state ).into_iter().map( |t| t.id ).collect()
        };

        assert_eq!( order( &tracks, SortOption::Newest ), vec![ "a", "M", "z", "m" ] );
        assert_eq!( order( &tracks, SortOption::Oldest ), vec![ "m", "z", "M", "a" ] );
        // same collation key: raw text breaks the tie, uppercase first
        assert_eq!( order( &tracks, SortOption::Title ), vec![ "a", "M", "m", "z" ] );
        // accents ignored: Émile sorts between Beta and Zed
        assert_eq!( order( &tracks, SortOption::Artist ), vec![ "a", "M", "z", "m" ] );
        // equal play counts keep catalog order
        assert_eq!( order( &tracks, SortOption::PlayCount ), vec![ "a", "M", "z", "m" ] );

        let reversed: Vec<Track> = tracks.iter().rev().cloned().collect();
        assert_eq!( order( &reversed, SortOption::PlayCount ), vec![ "M", "a", "z", "m" ] );
        for sort in [ SortOption::Newest, SortOption::Oldest, SortOption::Title, SortOption::Artist ] {
            assert_eq!( order( &reversed, sort ), order( &tracks, sort ), "{}", sort );
        }

        for a in &tracks {
            for b in &tracks {
                if a.id == b.id {
                    continue;
                }
                for sort in [ SortOption::Title, SortOption::Artist ] {
                    assert_ne!( sort.compare( a, b ), Ordering::Equal, "{} {} {}", sort, a.id, b.id );
                    assert_eq!( sort.compare( a, b ), sort.compare( b, a ).reverse() );
                }
            }
        }
    }


    #[test]
    fn test_pinned_first_for_every_sort() {
        let mut tracks = catalog();
        tracks[ 6 ].is_pinned = true;

        for sort in SortOption::ALL {
            let state = FilterState { sort, ..Default::default() };
            let result = visible_tracks( &tracks, &state );
            assert_eq!( result[ 0 ].id, "m3", "{}", sort );

            let first_unpinned = result.iter().position( |t| !t.is_pinned ).unwrap();
            assert!( result[ first_unpinned.. ].iter().all( |t| !t.is_pinned ) );
        }
    }


    #[test]
    fn test_result_is_deterministic() {
        let tracks = catalog();
        let state = FilterState { tab: Tab::Halal, sort: SortOption::PlayCount, ..Default::default() };
        assert_eq!( visible_tracks( &tracks, &state ), visible_tracks( &tracks, &state ) );
    }


    #[test]
    fn test_collate_is_total() {
        assert_eq!( collate( "abc", "ABC" ), "abc".cmp( "ABC" ) );
        assert_eq!( collate( "école", "Ecole" ), Ordering::Greater );
        assert_eq!( collate( "b", "Á" ), Ordering::Greater );
    }


    #[test]
    fn test_tab_neighbours_and_sort_parse() {
        assert_eq!( Tab::Music.next(), Tab::Song );
        assert_eq!( Tab::Halal.next(), Tab::Halal );
        assert_eq!( Tab::Music.prev(), Tab::Music );
        assert_eq!( "plays".parse::<SortOption>().unwrap(), SortOption::PlayCount );
        assert!( "random".parse::<SortOption>().is_err() );
        assert_eq!( genre_choices( Tab::Halal )[ 1 ], "Nasheed" );
    }
}
