//! Playback state machine
//!
//! Tracks the current track, play/pause, shuffle, and repeat against the
//! active playlist (the filtered library list). The controller never owns the
//! playlist; callers pass the current one to each navigation call because it
//! changes whenever filters or the catalog change.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{ Rng, SeedableRng };
use thiserror::Error;

use crate::store::Backend;
use crate::track::Track;


#[derive( Debug, Error, PartialEq, Eq )]
#[error( "Invalid repeat mode: '{0}'. Use 'off', 'one', or 'all'" )]
pub struct InvalidRepeatMode( pub String );


/// Repeat mode for the player.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}


impl RepeatMode {
    /// Next mode in the toggle cycle: Off → All → One → Off.
    pub fn cycle( self ) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }
}


impl fmt::Display for RepeatMode {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        f.write_str( match self {
            RepeatMode::Off => "off",
            RepeatMode::One => "one",
            RepeatMode::All => "all",
        })
    }
}


impl FromStr for RepeatMode {
    type Err = InvalidRepeatMode;


    fn from_str( s: &str ) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "off" | "0" => Ok( RepeatMode::Off ),
            "one" | "1" => Ok( RepeatMode::One ),
            "all" | "2" => Ok( RepeatMode::All ),
            _ => Err( InvalidRepeatMode( s.to_string() ) ),
        }
    }
}


/// Outcome of a controller operation, for the UI to react to.
#[derive( Debug, Clone, PartialEq, Eq )]
pub enum Transition {
    /// A track became current and playback started.
    Started { id: String },
    /// The current track was started again from the top.
    Restarted { id: String },
    /// The same track was selected again; playback toggled.
    Toggled { playing: bool },
    /// Nothing left to advance to; the current track is kept but paused.
    Stopped,
    /// The operation had no effect.
    Unchanged,
    /// A load is in flight; the request was ignored.
    Busy,
}


/// Player state driven by user actions and end-of-track events.
#[derive( Debug )]
pub struct PlaybackController {
    current: Option<Track>,
    playing: bool,
    shuffle: bool,
    repeat: RepeatMode,
    loading: bool,
    rng: StdRng,
}


impl Default for PlaybackController {
    fn default() -> Self {
        Self::with_rng( StdRng::from_os_rng() )
    }
}


impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }


    /// Creates a controller with a fixed random source for shuffle.
    pub fn with_rng( rng: StdRng ) -> Self {
        Self {
            current: None,
            playing: false,
            shuffle: false,
            repeat: RepeatMode::Off,
            loading: false,
            rng,
        }
    }


    /// Track currently loaded, playing or paused.
    pub fn current( &self ) -> Option<&Track> {
        self.current.as_ref()
    }


    /// True while audio should be playing.
    pub fn is_playing( &self ) -> bool {
        self.playing
    }


    /// True if `next` picks a random track.
    pub fn shuffle( &self ) -> bool {
        self.shuffle
    }


    /// Current repeat mode.
    pub fn repeat( &self ) -> RepeatMode {
        self.repeat
    }


    /// True while the playback surface is loading media.
    pub fn is_loading( &self ) -> bool {
        self.loading
    }


    /// Called by the playback surface when it starts loading media.
    pub fn begin_loading( &mut self ) {
        self.loading = true;
    }


    /// Called by the playback surface once media is ready or failed.
    pub fn finish_loading( &mut self ) {
        self.loading = false;
    }


    /// Mirrors the surface's play/pause state. Ignored with no current track.
    pub fn set_playing( &mut self, playing: bool ) {
        self.playing = playing && self.current.is_some();
    }


    /// Whether the playback surface should restart the finished track in
    /// place instead of reporting the end.
    pub fn should_restart_on_end( &self ) -> bool {
        self.repeat == RepeatMode::One
    }


    /// Plays a track, or toggles play/pause if it is already current.
    pub fn select( &mut self, track: &Track ) -> Transition {
        if self.loading {
            return Transition::Busy;
        }

        if self.current.as_ref().is_some_and( |c| c.id == track.id ) {
            self.playing = !self.playing;
            return Transition::Toggled { playing: self.playing };
        }

        self.start( track.clone() )
    }


    /// Makes `track` current and plays it, even if it already is current.
    pub fn play( &mut self, track: &Track ) -> Transition {
        self.start( track.clone() )
    }


    /// Advances within the playlist.
    ///
    /// Shuffle picks a random other track. Otherwise the next track is taken,
    /// wrapping only when repeat is `All`; at the end playback stops and the
    /// current track is kept.
    pub fn next( &mut self, playlist: &[Track] ) -> Transition {
        if self.loading {
            return Transition::Busy;
        }
        if self.current.is_none() || playlist.is_empty() {
            return Transition::Unchanged;
        }

        let current_index = self.position_in( playlist );
        let next_index = if self.shuffle {
            Some( self.random_index( playlist.len(), current_index ) )
        } else {
            let next = current_index.map_or( 0, |i| i + 1 );
            if next < playlist.len() {
                Some( next )
            } else if self.repeat == RepeatMode::All {
                Some( 0 )
            } else {
                None
            }
        };

        match next_index {
            Some( index ) => self.start( playlist[ index ].clone() ),
            None => {
                self.playing = false;
                tracing::debug!( "End of playlist reached" );
                Transition::Stopped
            }
        }
    }


    /// Goes back within the playlist, wrapping to the end only when repeat is
    /// `All`.
    pub fn prev( &mut self, playlist: &[Track] ) -> Transition {
        if self.loading {
            return Transition::Busy;
        }
        if self.current.is_none() || playlist.is_empty() {
            return Transition::Unchanged;
        }

        let prev_index = match self.position_in( playlist ) {
            Some( index ) if index > 0 => Some( index - 1 ),
            _ if self.repeat == RepeatMode::All => Some( playlist.len() - 1 ),
            _ => None,
        };

        match prev_index {
            Some( index ) => self.start( playlist[ index ].clone() ),
            None => Transition::Unchanged,
        }
    }


    /// Handles a track finishing on its own: counts the play, then advances
    /// exactly like `next`.
    ///
    /// A failed play-count write is logged and does not block advancing.
    pub async fn on_track_end( &mut self, playlist: &[Track], backend: &dyn Backend ) -> Transition {
        if let Some( finished ) = self.current.as_ref() {
            if let Err( e ) = backend.increment_play_count( &finished.id ).await {
                tracing::warn!( "Failed to record play for {}: {}", finished.id, e );
            }
        }

        self.next( playlist )
    }


    /// Flips shuffle, returning the new state.
    pub fn toggle_shuffle( &mut self ) -> bool {
        self.shuffle = !self.shuffle;
        self.shuffle
    }


    /// Cycles `Off -> All -> One`, returning the new mode.
    pub fn toggle_repeat( &mut self ) -> RepeatMode {
        self.repeat = self.repeat.cycle();
        self.repeat
    }


    /// Sets the repeat mode directly.
    pub fn set_repeat( &mut self, repeat: RepeatMode ) {
        self.repeat = repeat;
    }


    /// Keeps the cached current track in step with catalog pushes, so play
    /// counts and pins stay fresh. A deleted track stays current.
    pub fn refresh_current( &mut self, catalog: &[Track] ) {
        if let Some( current ) = self.current.as_mut() {
            if let Some( fresh ) = catalog.iter().find( |t| t.id == current.id ) {
                *current = fresh.clone();
            }
        }
    }


    fn start( &mut self, track: Track ) -> Transition {
        tracing::info!( "Playing: {} - {}", track.artist, track.title );
        let id = track.id.clone();
        self.current = Some( track );
        self.playing = true;
        Transition::Started { id }
    }


    fn position_in( &self, playlist: &[Track] ) -> Option<usize> {
        let current = self.current.as_ref()?;
        playlist.iter().position( |t| t.id == current.id )
    }


    /// Uniform pick over `0..len`, excluding `exclude` when there is a choice.
    fn random_index( &mut self, len: usize, exclude: Option<usize> ) -> usize {
        match exclude {
            Some( skip ) if len > 1 => {
                let pick = self.rng.random_range( 0..len - 1 );
                if pick >= skip { pick + 1 } else { pick }
            }
            _ if len > 1 => self.rng.random_range( 0..len ),
            _ => 0,
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::track::MediaType;


    fn track( id: &str ) -> Track {
        Track {
            id: id.into(),
            title: format!( "Title {}", id ),
            artist: "Artist".into(),
            original_url: String::new(),
            direct_url: String::new(),
            image_url: String::new(),
            lyrics: String::new(),
            media_type: MediaType::Music,
            genre: "Pop".into(),
            sub_genre: String::new(),
            play_count: 0,
            is_pinned: false,
            created_at: 0,
        }
    }


    fn playlist() -> Vec<Track> {
        vec![ track( "a" ), track( "b" ), track( "c" ) ]
    }


    fn controller() -> PlaybackController {
        PlaybackController::with_rng( StdRng::seed_from_u64( 71 ) )
    }


    fn current_id( c: &PlaybackController ) -> Option<&str> {
        c.current().map( |t| t.id.as_str() )
    }


    #[test]
    fn test_select_and_reselect() {
        let list = playlist();
        let mut c = controller();

        assert_eq!( c.select( &list[ 1 ] ), Transition::Started { id: "b".into() } );
        assert!( c.is_playing() );
        assert_eq!( c.select( &list[ 1 ] ), Transition::Toggled { playing: false } );
        assert_eq!( c.select( &list[ 1 ] ), Transition::Toggled { playing: true } );
        assert_eq!( c.select( &list[ 0 ] ), Transition::Started { id: "a".into() } );
    }


    #[test]
    fn test_next_without_repeat_stops_at_end() {
        let list = playlist();
        let mut c = controller();
        c.select( &list[ 2 ] );

        assert_eq!( c.next( &list ), Transition::Stopped );
        assert_eq!( current_id( &c ), Some( "c" ) );
        assert!( !c.is_playing() );
    }


    #[test]
    fn test_repeat_one_does_not_affect_manual_next() {
        let list = playlist();
        let mut c = controller();
        c.set_repeat( RepeatMode::One );
        c.select( &list[ 0 ] );

        assert_eq!( c.next( &list ), Transition::Started { id: "b".into() } );
        c.select( &list[ 2 ] );
        assert_eq!( c.next( &list ), Transition::Stopped );
        assert!( c.should_restart_on_end() );
    }


    #[test]
    fn test_repeat_all_wraps_both_ways() {
        let list = playlist();
        let mut c = controller();
        c.set_repeat( RepeatMode::All );

        c.select( &list[ 2 ] );
        assert_eq!( c.next( &list ), Transition::Started { id: "a".into() } );
        assert_eq!( c.prev( &list ), Transition::Started { id: "c".into() } );
    }


    #[test]
    fn test_prev_at_start_without_repeat() {
        let list = playlist();
        let mut c = controller();
        c.select( &list[ 0 ] );
        c.select( &list[ 0 ] );

        assert_eq!( c.prev( &list ), Transition::Unchanged );
        assert_eq!( current_id( &c ), Some( "a" ) );
        assert!( !c.is_playing() );

        c.select( &list[ 1 ] );
        assert_eq!( c.prev( &list ), Transition::Started { id: "a".into() } );
    }


    #[test]
    fn test_current_missing_from_playlist() {
        let list = playlist();
        let mut c = controller();
        c.select( &track( "zzz" ) );

        assert_eq!( c.next( &list ), Transition::Started { id: "a".into() } );

        c.select( &track( "zzz" ) );
        assert_eq!( c.prev( &list ), Transition::Unchanged );
    }


    #[test]
    fn test_next_without_current_is_noop() {
        let mut c = controller();
        assert_eq!( c.next( &playlist() ), Transition::Unchanged );
        assert_eq!( c.prev( &playlist() ), Transition::Unchanged );
        c.set_playing( true );
        assert!( !c.is_playing() );
    }


    #[test]
    fn test_shuffle_never_repeats_current() {
        let list = playlist();
        let mut c = controller();
        c.toggle_shuffle();
        c.select( &list[ 0 ] );

        for _ in 0..200 {
            let before = current_id( &c ).map( str::to_string );
            c.next( &list );
            assert_ne!( current_id( &c ).map( str::to_string ), before );
        }
    }


    #[test]
    fn test_shuffle_single_track_replays() {
        let list = vec![ track( "solo" ) ];
        let mut c = controller();
        c.toggle_shuffle();
        c.select( &list[ 0 ] );
        assert_eq!( c.next( &list ), Transition::Started { id: "solo".into() } );
    }


    #[test]
    fn test_loading_blocks_navigation() {
        let list = playlist();
        let mut c = controller();
        c.select( &list[ 0 ] );
        c.begin_loading();

        assert_eq!( c.next( &list ), Transition::Busy );
        assert_eq!( c.select( &list[ 2 ] ), Transition::Busy );
        c.finish_loading();
        assert_eq!( c.next( &list ), Transition::Started { id: "b".into() } );
    }


    #[test]
    fn test_toggles() {
        let mut c = controller();
        assert!( c.toggle_shuffle() );
        assert!( !c.toggle_shuffle() );
        assert_eq!( c.toggle_repeat(), RepeatMode::All );
        assert_eq!( c.toggle_repeat(), RepeatMode::One );
        assert_eq!( c.toggle_repeat(), RepeatMode::Off );
        assert_eq!( "ALL".parse::<RepeatMode>().unwrap(), RepeatMode::All );
    }


    #[test]
    fn test_refresh_current() {
        let mut list = playlist();
        let mut c = controller();
        c.select( &list[ 0 ] );
        list[ 0 ].play_count = 4;
        c.refresh_current( &list );
        assert_eq!( c.current().map( |t| t.play_count ), Some( 4 ) );
    }
}
