//! Application shell state
//!
//! `Session` is the single owner of everything a running front-end needs:
//! the catalog cache, the library selection, theme state, the player, the
//! admin panel, and the route. All methods run on the UI loop; backend pushes
//! land in the catalog and are picked up by `sync`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{ Duration, Instant };

use rand::rngs::StdRng;

use crate::admin::AdminPanel;
use crate::catalog::CatalogStore;
use crate::filter::{ self, FilterState, SortOption, Tab, ALL_GENRES };
use crate::playback::{ PlaybackController, Transition };
use crate::preferences::Preferences;
use crate::route::Route;
use crate::settings::SiteSettings;
use crate::store::Backend;
use crate::theme::{ Theme, ThemeState, ThemeStyles };
use crate::track::{ MediaType, Track };


/// Fixed startup splash duration. Not cancellable.
pub const SPLASH_DURATION: Duration = Duration::from_millis( 800 );


/// Startup options for a session.
#[derive( Debug, Default )]
pub struct SessionOptions {
    /// URL fragment the session was opened with.
    pub fragment: String,
    /// Preferences file; `None` keeps the theme in memory only.
    pub preferences_path: Option<PathBuf>,
    /// Random source for shuffle; seeded from the OS when absent.
    pub rng: Option<StdRng>,
}


/// One-shot deep-link resolution state.
#[derive( Debug, Clone, PartialEq, Eq )]
enum DeepLink {
    Pending { query: Option<String> },
    Done,
}


/// A running front-end session.
pub struct Session {
    backend: Arc<dyn Backend>,
    catalog: CatalogStore,
    filter: FilterState,
    theme: ThemeState,
    player: PlaybackController,
    admin: AdminPanel,
    route: Route,
    deep_link: DeepLink,
    preferences_path: Option<PathBuf>,
    seen_revision: u64,
}


impl Session {
    /// Attaches to the backend and restores the saved theme.
    pub fn new( backend: Arc<dyn Backend>, options: SessionOptions ) -> Self {
        let route = Route::from_fragment( &options.fragment );
        let prefs = options.preferences_path.as_deref()
            .map( Preferences::load_from )
            .unwrap_or_default();

        let player = match options.rng {
            Some( rng ) => PlaybackController::with_rng( rng ),
            None => PlaybackController::new(),
        };

        let mut catalog = CatalogStore::new();
        catalog.attach( backend.as_ref() );

        tracing::info!( "Session started on {} with theme {}", route.fragment(), prefs.theme );

        let mut session = Self {
            admin: AdminPanel::new( Arc::clone( &backend ) ),
            backend,
            catalog,
            filter: FilterState::default(),
            theme: ThemeState::new( prefs.theme ),
            player,
            deep_link: DeepLink::Pending { query: route.deep_link_query() },
            route,
            preferences_path: options.preferences_path,
            seen_revision: 0,
        };
        session.sync();
        session
    }


    /// Waits out the startup splash.
    pub async fn splash() {
        tokio::time::sleep( SPLASH_DURATION ).await;
    }


    /// Applies whatever the backend pushed since the last call.
    ///
    /// @returns true if the catalog changed
    pub fn sync( &mut self ) -> bool {
        let revision = self.catalog.revision();
        if revision == self.seen_revision {
            return false;
        }
        self.seen_revision = revision;

        let snapshot = self.catalog.snapshot();
        self.player.refresh_current( &snapshot.tracks );
        self.admin.sync_user( snapshot.user );
        self.resolve_deep_link();
        true
    }


    /// Advances timers owned by the session.
    pub fn tick( &mut self, now: Instant ) {
        self.admin.tick( now );
    }


    /// Detaches from every backend stream.
    pub fn shutdown( &mut self ) {
        self.catalog.detach();
        tracing::info!( "Session closed" );
    }


    /// Cached backend data.
    pub fn catalog( &self ) -> &CatalogStore {
        &self.catalog
    }


    /// Current site settings.
    pub fn settings( &self ) -> SiteSettings {
        self.catalog.settings()
    }


    /// The backend this session is attached to.
    pub fn backend( &self ) -> &Arc<dyn Backend> {
        &self.backend
    }


    /// Active route.
    pub fn route( &self ) -> &Route {
        &self.route
    }


    /// Handles a fragment change after startup. Deep links only resolve
    /// from the fragment the session was opened with.
    pub fn navigate( &mut self, fragment: &str ) -> &Route {
        self.route = Route::from_fragment( fragment );
        tracing::debug!( "Route changed to {}", self.route.fragment() );
        &self.route
    }


    /// Current library selection.
    pub fn filter( &self ) -> &FilterState {
        &self.filter
    }


    /// Switches library tab, applying the Halal theme override and resetting
    /// the genre filter.
    pub fn set_tab( &mut self, tab: Tab ) {
        let from = self.filter.tab;
        if tab == MediaType::Halal && from != MediaType::Halal {
            self.theme = self.theme.enter_halal();
        } else if tab != MediaType::Halal && from == MediaType::Halal {
            self.theme = self.theme.leave_halal();
        }

        self.filter.tab = tab;
        self.filter.genre = ALL_GENRES.to_string();
    }


    /// Filters by genre, or a category on the Halal tab.
    pub fn set_genre( &mut self, genre: &str ) {
        self.filter.genre = genre.to_string();
    }


    /// Sets the title/artist search text. Empty clears it.
    pub fn set_search( &mut self, query: &str ) {
        self.filter.search = query.to_string();
    }


    /// Changes the playlist order.
    pub fn set_sort( &mut self, sort: SortOption ) {
        self.filter.sort = sort;
    }


    /// Theme currently shown.
    pub fn theme( &self ) -> Theme {
        self.theme.theme()
    }


    /// Theme state including any Halal override.
    pub fn theme_state( &self ) -> ThemeState {
        self.theme
    }


    /// Style bundle of the theme currently shown.
    pub fn styles( &self ) -> ThemeStyles {
        self.theme().styles()
    }


    /// Manual theme choice. Persisted, and drops any Halal capture.
    pub fn switch_theme( &mut self, theme: Theme ) {
        self.theme = self.theme.switch( theme );

        if let Some( path ) = &self.preferences_path {
            if let Err( e ) = ( Preferences { theme } ).save_to( path ) {
                tracing::warn!( "Failed to save theme preference: {}", e );
            }
        }
    }


    /// The active playlist.
    pub fn visible_tracks( &self ) -> Vec<Track> {
        filter::visible_tracks( &self.catalog.tracks(), &self.filter )
    }


    /// Playback state.
    pub fn player( &self ) -> &PlaybackController {
        &self.player
    }


    /// Playback state, for the playback surface to drive.
    pub fn player_mut( &mut self ) -> &mut PlaybackController {
        &mut self.player
    }


    /// Admin panel state.
    pub fn admin( &self ) -> &AdminPanel {
        &self.admin
    }


    /// Admin panel, for sign-in and mutations.
    pub fn admin_mut( &mut self ) -> &mut AdminPanel {
        &mut self.admin
    }


    /// Plays a track, or toggles it if already current.
    pub fn select( &mut self, track: &Track ) -> Transition {
        self.player.select( track )
    }


    /// Selects by position in the active playlist.
    pub fn select_index( &mut self, index: usize ) -> Option<Transition> {
        let track = self.visible_tracks().into_iter().nth( index )?;
        Some( self.player.select( &track ) )
    }


    /// Advances within the visible playlist.
    pub fn next( &mut self ) -> Transition {
        let playlist = self.visible_tracks();
        self.player.next( &playlist )
    }


    /// Goes back within the visible playlist.
    pub fn prev( &mut self ) -> Transition {
        let playlist = self.visible_tracks();
        self.player.prev( &playlist )
    }


    /// Playback surface reports a natural end of the current track.
    ///
    /// With repeat `One` the surface restarts the track itself and no play is
    /// counted; otherwise the play is recorded and the player advances.
    pub async fn track_ended( &mut self ) -> Transition {
        if self.player.should_restart_on_end() {
            if let Some( current ) = self.player.current() {
                return Transition::Restarted { id: current.id.clone() };
            }
        }

        let playlist = self.visible_tracks();
        let transition = self.player.on_track_end( &playlist, self.backend.as_ref() ).await;
        self.sync();
        transition
    }


    /// Flips shuffle, returning the new state.
    pub fn toggle_shuffle( &mut self ) -> bool {
        self.player.toggle_shuffle()
    }


    /// Cycles repeat mode, returning the new mode.
    pub fn toggle_repeat( &mut self ) -> crate::playback::RepeatMode {
        self.player.toggle_repeat()
    }


    /// True while the initial deep link has not been resolved yet.
    pub fn deep_link_pending( &self ) -> bool {
        matches!( self.deep_link, DeepLink::Pending { .. } )
    }


    /// Resolves the startup deep link once the catalog has tracks.
    ///
    /// Runs at most once: after the first attempt, match or not, later
    /// catalog pushes are ignored.
    fn resolve_deep_link( &mut self ) {
        let DeepLink::Pending { query } = &self.deep_link else {
            return;
        };

        let tracks = self.catalog.tracks();
        if !self.catalog.is_loaded() || tracks.is_empty() {
            return;
        }

        let query = query.clone();
        self.deep_link = DeepLink::Done;

        let Some( query ) = query else {
            return;
        };

        match tracks.iter().find( |t| t.title.to_lowercase().contains( &query ) ) {
            Some( track ) => {
                tracing::info!( "Deep link '{}' resolved to {}", query, track.id );
                self.player.play( track );
            }
            None => tracing::info!( "Deep link '{}' matched no track", query ),
        }
    }
}


impl Drop for Session {
    fn drop( &mut self ) {
        self.catalog.detach();
    }
}


#[cfg( test )]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::store::{ CatalogFile, MemoryBackend };
    use crate::track::HALAL_GENRE;


    fn track( id: &str, title: &str, media_type: MediaType, genre: &str, created_at: u64 ) -> Track {
        Track {
            id: id.into(),
            title: title.into(),
            artist: "Artist".into(),
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


    fn session_with( tracks: Vec<Track>, fragment: &str ) -> ( MemoryBackend, Session ) {
        let backend = MemoryBackend::from_catalog( CatalogFile { tracks, ..Default::default() } );
        let session = Session::new( Arc::new( backend.clone() ), SessionOptions {
            fragment: fragment.into(),
            preferences_path: None,
            rng: Some( StdRng::seed_from_u64( 7 ) ),
        });
        ( backend, session )
    }


    #[test]
    fn test_halal_tab_theme_round_trip() {
        let ( _backend, mut session ) = session_with( Vec::new(), "" );
        assert_eq!( session.theme(), Theme::DarkLiquid );

        session.set_genre( "Pop" );
        session.set_tab( Tab::Halal );
        assert_eq!( session.theme(), Theme::PeaceLiquid );
        assert_eq!( session.filter().genre, ALL_GENRES );

        session.set_tab( Tab::Music );
        assert_eq!( session.theme(), Theme::DarkLiquid );
    }


    #[test]
    fn test_halal_tab_restores_custom_theme() {
        let ( _backend, mut session ) = session_with( Vec::new(), "" );
        session.switch_theme( Theme::SakuraLiquid );
        session.set_tab( Tab::Halal );
        session.set_tab( Tab::Halal );
        session.set_tab( Tab::Song );
        assert_eq!( session.theme(), Theme::SakuraLiquid );
    }


    #[test]
    fn test_deep_link_plays_match() {
        let tracks = vec![
            track( "a", "Cholna Sujon", MediaType::Music, "Pop", 2 ),
            track( "b", "Safar", MediaType::Song, "Folk", 1 ),
        ];
        let ( _backend, session ) = session_with( tracks, "#/media/safar" );

        assert!( !session.deep_link_pending() );
        assert_eq!( session.player().current().map( |t| t.id.as_str() ), Some( "b" ) );
        assert!( session.player().is_playing() );
    }


    #[tokio::test]
    async fn test_deep_link_waits_for_tracks_then_runs_once() {
        let ( backend, mut session ) = session_with( Vec::new(), "#/media/Nodi" );
        backend.add_account( "a@b.c", "pw" );
        assert!( session.deep_link_pending() );

        backend.sign_in( "a@b.c", "pw" ).await.unwrap();
        let draft = |title: &str| crate::track::NewTrack {
            title: title.into(),
            artist: "X".into(),
            original_url: "https://a.io/x.mp3".into(),
            media_type: MediaType::Music,
            genre: "Pop".into(),
            ..Default::default()
        }.normalize().unwrap();

        backend.create_track( draft( "Something Else" ) ).await.unwrap();
        session.sync();
        assert!( !session.deep_link_pending() );
        assert!( session.player().current().is_none() );

        backend.create_track( draft( "Nodi" ) ).await.unwrap();
        session.sync();
        assert!( session.player().current().is_none() );
    }


    #[tokio::test]
    async fn test_track_end_counts_and_advances() {
        let tracks = vec![
            track( "a", "One", MediaType::Music, "Pop", 3 ),
            track( "b", "Two", MediaType::Music, "Pop", 2 ),
            track( "h", "Three", MediaType::Music, HALAL_GENRE, 1 ),
        ];
        let ( backend, mut session ) = session_with( tracks, "" );

        session.select_index( 0 );
        let transition = session.track_ended().await;
        assert_eq!( transition, Transition::Started { id: "b".into() } );

        let counts: Vec<( String, u64 )> = backend.tracks().into_iter().map( |t| ( t.id, t.play_count ) ).collect();
        assert_eq!( counts, vec![ ( "a".into(), 1 ), ( "b".into(), 0 ), ( "h".into(), 0 ) ] );

        // last visible track: the legacy Halal record is not in the Music list
        assert_eq!( session.track_ended().await, Transition::Stopped );
        assert_eq!( session.player().current().map( |t| t.play_count ), Some( 1 ) );
    }


    #[tokio::test]
    async fn test_repeat_one_restarts_without_counting() {
        let tracks = vec![ track( "a", "One", MediaType::Music, "Pop", 1 ) ];
        let ( backend, mut session ) = session_with( tracks, "" );
        session.select_index( 0 );
        session.toggle_repeat();
        session.toggle_repeat();

        assert_eq!( session.track_ended().await, Transition::Restarted { id: "a".into() } );
        assert_eq!( backend.tracks()[ 0 ].play_count, 0 );
    }


    #[test]
    fn test_deep_link_title_with_hyphen() {
        let tracks = vec![
            track( "d", "Dreams", MediaType::Music, "Pop", 2 ),
            track( "lf", "Lo-Fi Dreams", MediaType::Music, "Lo-Fi", 1 ),
        ];
        let fragment = tracks[ 1 ].share_fragment();
        let ( _backend, session ) = session_with( tracks, &fragment );

        assert_eq!( session.player().current().map( |t| t.id.as_str() ), Some( "lf" ) );
    }


    #[test]
    fn test_theme_preference_saved_on_manual_switch_only() {
        let dir = std::env::temp_dir().join( format!( "tunedeck-session-{}", std::process::id() ) );
        let _ = std::fs::remove_dir_all( &dir );
        let path = dir.join( "preferences.json" );

        let open = |path: &PathBuf| Session::new( Arc::new( MemoryBackend::new() ), SessionOptions {
            fragment: String::new(),
            preferences_path: Some( path.clone() ),
            rng: Some( StdRng::seed_from_u64( 1 ) ),
        });

        let mut session = open( &path );
        assert_eq!( session.theme(), Theme::DarkLiquid );
        session.switch_theme( Theme::NeonLiquid );
        assert_eq!( Preferences::load_from( &path ).theme, Theme::NeonLiquid );
        let saved = std::fs::read_to_string( &path ).unwrap();

        session.set_tab( Tab::Halal );
        assert_eq!( session.theme(), Theme::PeaceLiquid );
        assert!( session.theme_state().is_overridden() );
        assert_eq!( std::fs::read_to_string( &path ).unwrap(), saved );

        session.set_tab( Tab::Music );
        assert_eq!( std::fs::read_to_string( &path ).unwrap(), saved );
        drop( session );

        let restored = open( &path );
        assert_eq!( restored.theme(), Theme::NeonLiquid );
        assert!( !restored.theme_state().is_overridden() );
        let _ = std::fs::remove_dir_all( &dir );
    }


    #[test]
    fn test_shutdown_unsubscribes() {
        let ( backend, mut session ) = session_with( Vec::new(), "#/admin" );
        assert!( session.route().is_admin() );
        assert_eq!( backend.subscriber_count(), 3 );
        session.shutdown();
        assert_eq!( backend.subscriber_count(), 0 );
    }
}
