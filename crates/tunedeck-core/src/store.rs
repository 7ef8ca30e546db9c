//! Backend collaborator
//!
//! The hosted document store and auth provider are reached only through the
//! `Backend` trait. Reads are push subscriptions; writes are async calls.
//! `MemoryBackend` keeps everything in process and backs the CLI and tests.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{ Arc, Mutex, MutexGuard };
use std::time::{ SystemTime, UNIX_EPOCH };

use async_trait::async_trait;
use serde::{ Deserialize, Serialize };
use thiserror::Error;

use crate::settings::{ SiteSettings, SETTINGS_ID };
use crate::track::{ NewTrack, Track };


/// Errors reported by the backend.
#[derive( Debug, Error, Clone, PartialEq, Eq )]
pub enum StoreError {
    #[error( "Invalid credentials" )]
    InvalidCredentials,

    #[error( "Permission denied: sign in required" )]
    PermissionDenied,

    #[error( "Track not found: {0}" )]
    NotFound( String ),

    #[error( "Network error: {0}" )]
    Network( String ),

    #[error( "Failed to read catalog: {0}" )]
    Io( String ),

    #[error( "Invalid catalog file: {0}" )]
    Parse( String ),
}


/// A signed-in identity.
#[derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize )]
pub struct User {
    pub uid: String,
    pub email: String,
}


pub type TracksListener = Arc<dyn Fn( &[Track] ) + Send + Sync>;
pub type SettingsListener = Arc<dyn Fn( &SiteSettings ) + Send + Sync>;
pub type AuthListener = Arc<dyn Fn( Option<&User> ) + Send + Sync>;


/// Handle for an active push subscription.
///
/// Dropping the handle unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}


impl Subscription {
    /// Wraps the action that cancels the subscription.
    pub fn new( cancel: impl FnOnce() + Send + 'static ) -> Self {
        Self { cancel: Some( Box::new( cancel ) ) }
    }


    /// Cancels the subscription now.
    pub fn unsubscribe( mut self ) {
        self.cancel_now();
    }


    fn cancel_now( &mut self ) {
        if let Some( cancel ) = self.cancel.take() {
            cancel();
        }
    }
}


impl Drop for Subscription {
    fn drop( &mut self ) {
        self.cancel_now();
    }
}


impl std::fmt::Debug for Subscription {
    fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
        f.debug_struct( "Subscription" )
            .field( "active", &self.cancel.is_some() )
            .finish()
    }
}


/// Hosted document store plus auth provider.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Pushes the whole track list, newest first, now and on every change.
    fn subscribe_tracks( &self, listener: TracksListener ) -> Subscription;

    /// Pushes the settings singleton, defaulted when absent.
    fn subscribe_settings( &self, listener: SettingsListener ) -> Subscription;

    /// Pushes the signed-in user, or none.
    fn subscribe_auth( &self, listener: AuthListener ) -> Subscription;

    /// Stores a new track. The backend assigns id and creation time.
    ///
    /// @returns The new track id
    async fn create_track( &self, track: NewTrack ) -> Result<String, StoreError>;

    async fn increment_play_count( &self, id: &str ) -> Result<(), StoreError>;

    async fn set_pinned( &self, id: &str, pinned: bool ) -> Result<(), StoreError>;

    async fn delete_track( &self, id: &str ) -> Result<(), StoreError>;

    async fn replace_settings( &self, settings: SiteSettings ) -> Result<(), StoreError>;

    async fn sign_in( &self, email: &str, password: &str ) -> Result<User, StoreError>;

    async fn sign_out( &self ) -> Result<(), StoreError>;
}


/// Login stored in a catalog file.
#[derive( Debug, Clone, Serialize, Deserialize )]
pub struct Account {
    pub email: String,
    pub password: String,
}


/// On-disk seed for `MemoryBackend`.
#[derive( Debug, Clone, Default, Serialize, Deserialize )]
#[serde( default )]
pub struct CatalogFile {
    pub tracks: Vec<Track>,
    pub settings: Option<SiteSettings>,
    pub accounts: Vec<Account>,
}


#[derive( Default )]
struct Listeners {
    next_id: u64,
    tracks: HashMap<u64, TracksListener>,
    settings: HashMap<u64, SettingsListener>,
    auth: HashMap<u64, AuthListener>,
}


fn tracks_slot( l: &mut Listeners ) -> &mut HashMap<u64, TracksListener> {
    &mut l.tracks
}


fn settings_slot( l: &mut Listeners ) -> &mut HashMap<u64, SettingsListener> {
    &mut l.settings
}


fn auth_slot( l: &mut Listeners ) -> &mut HashMap<u64, AuthListener> {
    &mut l.auth
}


#[derive( Default )]
struct MemoryState {
    tracks: Vec<Track>,
    settings: Option<SiteSettings>,
    accounts: HashMap<String, String>,
    user: Option<User>,
    next_track_id: u64,
    last_timestamp: u64,
    pending_failure: Option<String>,
    listeners: Listeners,
}


impl MemoryState {
    fn sorted_tracks( &self ) -> Vec<Track> {
        let mut tracks = self.tracks.clone();
        tracks.sort_by( |a, b| b.created_at.cmp( &a.created_at ) );
        tracks
    }


    fn effective_settings( &self ) -> SiteSettings {
        self.settings.clone().unwrap_or_default().merge_with_defaults()
    }


    /// Server timestamp, strictly increasing across calls.
    fn timestamp( &mut self ) -> u64 {
        let now = SystemTime::now()
            .duration_since( UNIX_EPOCH )
            .map( |d| d.as_millis() as u64 )
            .unwrap_or( 0 );
        self.last_timestamp = now.max( self.last_timestamp + 1 );
        self.last_timestamp
    }


    /// Gate shared by all writes: injected failure first, then auth.
    fn check_write( &mut self ) -> Result<(), StoreError> {
        if let Some( message ) = self.pending_failure.take() {
            return Err( StoreError::Network( message ) );
        }
        if self.user.is_none() {
            return Err( StoreError::PermissionDenied );
        }
        Ok(())
    }


    fn track_mut( &mut self, id: &str ) -> Result<&mut Track, StoreError> {
        self.tracks.iter_mut()
            .find( |t| t.id == id )
            .ok_or_else( || StoreError::NotFound( id.to_string() ) )
    }
}


/// In-process backend with the same observable behavior as the hosted one.
#[derive( Clone, Default )]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}


impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }


    /// Seeds a backend from catalog contents.
    pub fn from_catalog( catalog: CatalogFile ) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.lock();
            state.last_timestamp = catalog.tracks.iter().map( |t| t.created_at ).max().unwrap_or( 0 );
            state.next_track_id = catalog.tracks.len() as u64;
            state.tracks = catalog.tracks;
            state.settings = catalog.settings;
            state.accounts = catalog.accounts.into_iter()
                .map( |a| ( a.email.to_lowercase(), a.password ) )
                .collect();
        }
        backend
    }


    /// Loads a JSON catalog file.
    pub fn load( path: &Path ) -> Result<Self, StoreError> {
        let contents = fs::read_to_string( path )
            .map_err( |e| StoreError::Io( format!( "{}: {}", path.display(), e ) ) )?;
        let catalog: CatalogFile = serde_json::from_str( &contents )
            .map_err( |e| StoreError::Parse( e.to_string() ) )?;

        tracing::info!( "Loaded {} tracks from {}", catalog.tracks.len(), path.display() );
        Ok( Self::from_catalog( catalog ) )
    }


    /// Registers a login.
    pub fn add_account( &self, email: &str, password: &str ) {
        self.lock().accounts.insert( email.to_lowercase(), password.to_string() );
    }


    /// Makes the next write fail with a network error.
    pub fn fail_next_write( &self, message: &str ) {
        self.lock().pending_failure = Some( message.to_string() );
    }


    /// Snapshot of stored tracks, newest first.
    pub fn tracks( &self ) -> Vec<Track> {
        self.lock().sorted_tracks()
    }


    /// Stored settings record, `None` if never written.
    pub fn settings( &self ) -> Option<SiteSettings> {
        self.lock().settings.clone()
    }


    /// Number of live subscriptions across all streams.
    pub fn subscriber_count( &self ) -> usize {
        let state = self.lock();
        state.listeners.tracks.len() + state.listeners.settings.len() + state.listeners.auth.len()
    }


    fn lock( &self ) -> MutexGuard<'_, MemoryState> {
        // A panicking listener must not wedge the backend.
        self.state.lock().unwrap_or_else( |poisoned| poisoned.into_inner() )
    }


    fn notify_tracks( &self ) {
        let ( tracks, listeners ) = {
            let state = self.lock();
            ( state.sorted_tracks(), state.listeners.tracks.values().cloned().collect::<Vec<_>>() )
        };
        for listener in listeners {
            listener( &tracks );
        }
    }


    fn notify_settings( &self ) {
        let ( settings, listeners ) = {
            let state = self.lock();
            ( state.effective_settings(), state.listeners.settings.values().cloned().collect::<Vec<_>>() )
        };
        for listener in listeners {
            listener( &settings );
        }
    }


    fn notify_auth( &self ) {
        let ( user, listeners ) = {
            let state = self.lock();
            ( state.user.clone(), state.listeners.auth.values().cloned().collect::<Vec<_>>() )
        };
        for listener in listeners {
            listener( user.as_ref() );
        }
    }


    fn register<L>(
        &self,
        select: fn( &mut Listeners ) -> &mut HashMap<u64, L>,
        listener: L,
    ) -> Subscription
    where
        L: Send + 'static,
    {
        let id = {
            let mut state = self.lock();
            let id = state.listeners.next_id;
            state.listeners.next_id += 1;
            select( &mut state.listeners ).insert( id, listener );
            id
        };

        let backend = self.clone();
        Subscription::new( move || {
            select( &mut backend.lock().listeners ).remove( &id );
        })
    }
}


#[async_trait]
impl Backend for MemoryBackend {
    fn subscribe_tracks( &self, listener: TracksListener ) -> Subscription {
        let tracks = self.lock().sorted_tracks();
        listener( &tracks );
        self.register( tracks_slot, listener )
    }


    fn subscribe_settings( &self, listener: SettingsListener ) -> Subscription {
        let settings = self.lock().effective_settings();
        listener( &settings );
        self.register( settings_slot, listener )
    }


    fn subscribe_auth( &self, listener: AuthListener ) -> Subscription {
        let user = self.lock().user.clone();
        listener( user.as_ref() );
        self.register( auth_slot, listener )
    }


    async fn create_track( &self, track: NewTrack ) -> Result<String, StoreError> {
        let id = {
            let mut state = self.lock();
            state.check_write()?;
            let id = loop {
                state.next_track_id += 1;
                let candidate = format!( "trk{:06}", state.next_track_id );
                if !state.tracks.iter().any( |t| t.id == candidate ) {
                    break candidate;
                }
            };
            let created_at = state.timestamp();
            state.tracks.push( track.into_track( id.clone(), created_at ) );
            id
        };

        tracing::info!( "Created track {}", id );
        self.notify_tracks();
        Ok( id )
    }


    async fn increment_play_count( &self, id: &str ) -> Result<(), StoreError> {
        {
            let mut state = self.lock();
            if let Some( message ) = state.pending_failure.take() {
                return Err( StoreError::Network( message ) );
            }
            // Anonymous listeners may bump play counts.
            state.track_mut( id )?.play_count += 1;
        }
        self.notify_tracks();
        Ok(())
    }


    async fn set_pinned( &self, id: &str, pinned: bool ) -> Result<(), StoreError> {
        {
            let mut state = self.lock();
            state.check_write()?;
            state.track_mut( id )?.is_pinned = pinned;
        }
        self.notify_tracks();
        Ok(())
    }


    async fn delete_track( &self, id: &str ) -> Result<(), StoreError> {
        {
            let mut state = self.lock();
            state.check_write()?;
            let before = state.tracks.len();
            state.tracks.retain( |t| t.id != id );
            if state.tracks.len() == before {
                return Err( StoreError::NotFound( id.to_string() ) );
            }
        }
        tracing::info!( "Deleted track {}", id );
        self.notify_tracks();
        Ok(())
    }


    async fn replace_settings( &self, settings: SiteSettings ) -> Result<(), StoreError> {
        {
            let mut state = self.lock();
            state.check_write()?;
            state.settings = Some( settings );
        }
        tracing::info!( "Replaced settings document {}", SETTINGS_ID );
        self.notify_settings();
        Ok(())
    }


    async fn sign_in( &self, email: &str, password: &str ) -> Result<User, StoreError> {
        let user = {
            let mut state = self.lock();
            let key = email.trim().to_lowercase();
            match state.accounts.get( &key ) {
                Some( stored ) if stored == password => {}
                _ => return Err( StoreError::InvalidCredentials ),
            }
            let user = User { uid: format!( "uid-{}", key ), email: key };
            state.user = Some( user.clone() );
            user
        };
        self.notify_auth();
        Ok( user )
    }


    async fn sign_out( &self ) -> Result<(), StoreError> {
        self.lock().user = None;
        self.notify_auth();
        Ok(())
    }
}


#[cfg( test )]
mod tests {
    use std::sync::atomic::{ AtomicUsize, Ordering };

    use super::*;
    use crate::track::MediaType;


    fn draft( title: &str ) -> NewTrack {
        NewTrack {
            title: title.into(),
            artist: "Band".into(),
            original_url: "https://cdn.example.com/a.mp3".into(),
            direct_url: "https://cdn.example.com/a.mp3".into(),
            media_type: MediaType::Music,
            genre: "Pop".into(),
            ..Default::default()
        }
    }


    #[tokio::test]
    async fn test_writes_require_sign_in() {
        let backend = MemoryBackend::new();
        assert_eq!( backend.create_track( draft( "A" ) ).await, Err( StoreError::PermissionDenied ) );

        backend.add_account( "admin@s71.io", "pw" );
        assert_eq!( backend.sign_in( "admin@s71.io", "nope" ).await, Err( StoreError::InvalidCredentials ) );
        backend.sign_in( "Admin@S71.io", "pw" ).await.unwrap();
        assert!( backend.create_track( draft( "A" ) ).await.is_ok() );
    }


    #[tokio::test]
    async fn test_tracks_pushed_newest_first() {
        let backend = MemoryBackend::new();
        backend.add_account( "a@b.c", "pw" );
        backend.sign_in( "a@b.c", "pw" ).await.unwrap();

        let seen = Arc::new( Mutex::new( Vec::new() ) );
        let sink = Arc::clone( &seen );
        let sub = backend.subscribe_tracks( Arc::new( move |tracks: &[Track]| {
            sink.lock().unwrap().push( tracks.iter().map( |t| t.title.clone() ).collect::<Vec<_>>() );
        }));

        backend.create_track( draft( "First" ) ).await.unwrap();
        backend.create_track( draft( "Second" ) ).await.unwrap();

        let pushes = seen.lock().unwrap().clone();
        assert_eq!( pushes.len(), 3 );
        assert!( pushes[ 0 ].is_empty() );
        assert_eq!( pushes[ 2 ], vec![ "Second".to_string(), "First".to_string() ] );

        let created: Vec<u64> = backend.tracks().iter().map( |t| t.created_at ).collect();
        assert!( created[ 0 ] > created[ 1 ] );
        drop( sub );
    }


    #[tokio::test]
    async fn test_unsubscribe_stops_pushes() {
        let backend = MemoryBackend::new();
        let count = Arc::new( AtomicUsize::new( 0 ) );
        let counter = Arc::clone( &count );
        let sub = backend.subscribe_auth( Arc::new( move |_: Option<&User>| {
            counter.fetch_add( 1, Ordering::SeqCst );
        }));
        assert_eq!( backend.subscriber_count(), 1 );

        sub.unsubscribe();
        assert_eq!( backend.subscriber_count(), 0 );

        backend.sign_out().await.unwrap();
        assert_eq!( count.load( Ordering::SeqCst ), 1 );
    }


    #[tokio::test]
    async fn test_settings_default_when_absent() {
        let backend = MemoryBackend::new();
        let seen = Arc::new( Mutex::new( None ) );
        let sink = Arc::clone( &seen );
        let _sub = backend.subscribe_settings( Arc::new( move |s: &SiteSettings| {
            *sink.lock().unwrap() = Some( s.clone() );
        }));
        assert_eq!( seen.lock().unwrap().clone(), Some( SiteSettings::default() ) );
    }


    #[tokio::test]
    async fn test_injected_failure_is_single_shot() {
        let backend = MemoryBackend::new();
        backend.add_account( "a@b.c", "pw" );
        backend.sign_in( "a@b.c", "pw" ).await.unwrap();

        backend.fail_next_write( "offline" );
        assert_eq!(
            backend.delete_track( "missing" ).await,
            Err( StoreError::Network( "offline".into() ) )
        );
        assert_eq!(
            backend.delete_track( "missing" ).await,
            Err( StoreError::NotFound( "missing".into() ) )
        );
    }


    #[test]
    fn test_catalog_file_seed() {
        let json = r#"{
            "tracks": [
                { "id": "a", "title": "Old", "artist": "X", "type": "Song", "genre": "Folk", "createdAt": 10 },
                { "id": "b", "title": "New", "artist": "Y", "type": "Music", "genre": "Pop", "createdAt": 20 }
            ],
            "accounts": [ { "email": "admin@s71.io", "password": "pw" } ]
        }"#;
        let catalog: CatalogFile = serde_json::from_str( json ).unwrap();
        let backend = MemoryBackend::from_catalog( catalog );

        let titles: Vec<String> = backend.tracks().into_iter().map( |t| t.title ).collect();
        assert_eq!( titles, vec![ "New", "Old" ] );
        assert!( backend.settings().is_none() );
    }
}
