//! Client-side catalog cache
//!
//! Mirrors what the backend pushes: the track list, site settings, and the
//! signed-in user. Each push replaces its part of the snapshot under a single
//! write lock, so readers never observe a half-applied update.

use std::sync::{ Arc, RwLock, RwLockReadGuard, RwLockWriteGuard };

use crate::settings::SiteSettings;
use crate::store::{ Backend, Subscription, User };
use crate::track::Track;


/// Everything the client currently knows about the backend.
#[derive( Debug, Clone, Default, PartialEq, Eq )]
pub struct CatalogSnapshot {
    /// Newest first, as delivered.
    pub tracks: Vec<Track>,
    pub settings: SiteSettings,
    pub user: Option<User>,
    /// Set once the first track list has arrived.
    pub loaded: bool,
    /// Bumped on every applied push.
    pub revision: u64,
}


/// Read-through cache fed by backend subscriptions.
#[derive( Debug, Default )]
pub struct CatalogStore {
    shared: Arc<RwLock<CatalogSnapshot>>,
    subscriptions: Vec<Subscription>,
}


impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }


    /// Subscribes to the track, settings, and auth streams.
    ///
    /// Any earlier subscriptions are dropped first.
    pub fn attach( &mut self, backend: &dyn Backend ) {
        self.detach();

        let shared = Arc::clone( &self.shared );
        let tracks = backend.subscribe_tracks( Arc::new( move |tracks: &[Track]| {
            apply( &shared, |snap| {
                snap.tracks = tracks.to_vec();
                snap.loaded = true;
            });
        }));

        let shared = Arc::clone( &self.shared );
        let settings = backend.subscribe_settings( Arc::new( move |settings: &SiteSettings| {
            apply( &shared, |snap| snap.settings = settings.clone() );
        }));

        let shared = Arc::clone( &self.shared );
        let auth = backend.subscribe_auth( Arc::new( move |user: Option<&User>| {
            apply( &shared, |snap| snap.user = user.cloned() );
        }));

        self.subscriptions = vec![ tracks, settings, auth ];
        tracing::debug!( "Catalog attached to backend" );
    }


    /// Cancels all backend subscriptions. Cached data is kept.
    pub fn detach( &mut self ) {
        if !self.subscriptions.is_empty() {
            tracing::debug!( "Catalog detached from backend" );
        }
        for sub in self.subscriptions.drain( .. ) {
            sub.unsubscribe();
        }
    }


    /// True while backend subscriptions are live.
    pub fn is_attached( &self ) -> bool {
        !self.subscriptions.is_empty()
    }


    /// Copy of the current snapshot.
    pub fn snapshot( &self ) -> CatalogSnapshot {
        self.read().clone()
    }


    /// Cached tracks, newest first.
    pub fn tracks( &self ) -> Vec<Track> {
        self.read().tracks.clone()
    }


    /// Cached site settings.
    pub fn settings( &self ) -> SiteSettings {
        self.read().settings.clone()
    }


    /// Cached signed-in user.
    pub fn user( &self ) -> Option<User> {
        self.read().user.clone()
    }


    /// True once the first track list arrived.
    pub fn is_loaded( &self ) -> bool {
        self.read().loaded
    }


    /// Counter bumped on every applied push.
    pub fn revision( &self ) -> u64 {
        self.read().revision
    }


    /// Finds a cached track by id.
    pub fn track( &self, id: &str ) -> Option<Track> {
        self.read().tracks.iter().find( |t| t.id == id ).cloned()
    }


    fn read( &self ) -> RwLockReadGuard<'_, CatalogSnapshot> {
        self.shared.read().unwrap_or_else( |poisoned| poisoned.into_inner() )
    }
}


impl Drop for CatalogStore {
    fn drop( &mut self ) {
        self.detach();
    }
}


fn write( shared: &RwLock<CatalogSnapshot> ) -> RwLockWriteGuard<'_, CatalogSnapshot> {
    shared.write().unwrap_or_else( |poisoned| poisoned.into_inner() )
}


fn apply( shared: &RwLock<CatalogSnapshot>, update: impl FnOnce( &mut CatalogSnapshot ) ) {
    let mut snap = write( shared );
    update( &mut snap );
    snap.revision += 1;
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;
    use crate::track::{ MediaType, NewTrack };


    fn draft( title: &str ) -> NewTrack {
        NewTrack {
            title: title.into(),
            artist: "Band".into(),
            original_url: "https://cdn.example.com/a.mp3".into(),
            direct_url: "https://cdn.example.com/a.mp3".into(),
            media_type: MediaType::Song,
            genre: "Rock".into(),
            ..Default::default()
        }
    }


    #[tokio::test]
    async fn test_attach_receives_pushes() {
        let backend = MemoryBackend::new();
        backend.add_account( "a@b.c", "pw" );

        let mut catalog = CatalogStore::new();
        assert!( !catalog.is_loaded() );

        catalog.attach( &backend );
        assert!( catalog.is_loaded() );
        assert!( catalog.tracks().is_empty() );
        assert_eq!( catalog.settings(), SiteSettings::default() );

        backend.sign_in( "a@b.c", "pw" ).await.unwrap();
        assert_eq!( catalog.user().map( |u| u.email ), Some( "a@b.c".to_string() ) );

        let before = catalog.revision();
        let id = backend.create_track( draft( "Live" ) ).await.unwrap();
        assert!( catalog.revision() > before );
        assert_eq!( catalog.track( &id ).map( |t| t.title ), Some( "Live".to_string() ) );
    }


    #[tokio::test]
    async fn test_detach_stops_updates() {
        let backend = MemoryBackend::new();
        backend.add_account( "a@b.c", "pw" );
        backend.sign_in( "a@b.c", "pw" ).await.unwrap();

        let mut catalog = CatalogStore::new();
        catalog.attach( &backend );
        assert_eq!( backend.subscriber_count(), 3 );

        catalog.detach();
        assert!( !catalog.is_attached() );
        assert_eq!( backend.subscriber_count(), 0 );

        backend.create_track( draft( "Ignored" ) ).await.unwrap();
        assert!( catalog.tracks().is_empty() );
    }


    #[test]
    fn test_drop_unsubscribes() {
        let backend = MemoryBackend::new();
        {
            let mut catalog = CatalogStore::new();
            catalog.attach( &backend );
            catalog.attach( &backend );
            assert_eq!( backend.subscriber_count(), 3 );
        }
        assert_eq!( backend.subscriber_count(), 0 );
    }
}
