//! Admin mutation surface
//!
//! Sign-in plus the catalog and settings writes. Every outcome is mirrored in
//! a status banner; nothing here panics or retries on failure.

use std::sync::Arc;
use std::time::{ Duration, Instant };

use thiserror::Error;

use crate::settings::SiteSettings;
use crate::store::{ Backend, StoreError, User };
use crate::track::{ NewTrack, Track, TrackError };


/// How long a success banner stays up.
pub const STATUS_DISMISS_AFTER: Duration = Duration::from_secs( 3 );

pub const LOGIN_FAILED_MESSAGE: &str = "Login Failed: Invalid Email or Password.";


/// Errors surfaced by admin operations.
#[derive( Debug, Error, PartialEq, Eq )]
pub enum AdminError {
    #[error( "Sign in required" )]
    NotAuthenticated,

    #[error( "{}", LOGIN_FAILED_MESSAGE )]
    InvalidCredentials,

    #[error( "{0}" )]
    Validation( #[from] TrackError ),

    #[error( "{0}" )]
    Backend( #[from] StoreError ),
}


/// Banner state shown above the admin forms.
#[derive( Debug, Clone, PartialEq, Eq, Default )]
pub enum AdminStatus {
    #[default]
    Idle,
    Loading,
    Success( String ),
    Error( String ),
}


impl AdminStatus {
    /// Banner text, if any.
    pub fn message( &self ) -> Option<&str> {
        match self {
            AdminStatus::Success( m ) | AdminStatus::Error( m ) => Some( m ),
            AdminStatus::Idle | AdminStatus::Loading => None,
        }
    }
}


/// Explicit answer to the delete prompt.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum Confirmation {
    Confirmed,
    Declined,
}


/// Login form contents. Consumed by `sign_in` so the fields never outlive an
/// attempt.
#[derive( Clone )]
pub struct Credentials {
    pub email: String,
    pub password: String,
}


impl Credentials {
    /// Bundles a login attempt.
    pub fn new( email: impl Into<String>, password: impl Into<String> ) -> Self {
        Self { email: email.into(), password: password.into() }
    }
}


impl std::fmt::Debug for Credentials {
    fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
        f.debug_struct( "Credentials" )
            .field( "email", &self.email )
            .field( "password", &"***" )
            .finish()
    }
}


/// Admin-side operations against the backend.
pub struct AdminPanel {
    backend: Arc<dyn Backend>,
    user: Option<User>,
    status: AdminStatus,
    status_clear_at: Option<Instant>,
}


impl AdminPanel {
    /// Creates a signed-out panel over `backend`.
    pub fn new( backend: Arc<dyn Backend> ) -> Self {
        Self {
            backend,
            user: None,
            status: AdminStatus::Idle,
            status_clear_at: None,
        }
    }


    /// The signed-in admin, if any.
    pub fn user( &self ) -> Option<&User> {
        self.user.as_ref()
    }


    /// True once a sign-in succeeded or the auth stream reported a user.
    pub fn is_signed_in( &self ) -> bool {
        self.user.is_some()
    }


    /// Adopts the identity pushed by the auth stream.
    pub fn sync_user( &mut self, user: Option<User> ) {
        if user.is_none() && self.user.is_some() {
            self.set_status( AdminStatus::Idle );
        }
        self.user = user;
    }


    /// Current banner state.
    pub fn status( &self ) -> &AdminStatus {
        &self.status
    }


    /// Clears an expired success banner.
    pub fn tick( &mut self, now: Instant ) {
        if self.status_clear_at.is_some_and( |at| now >= at ) {
            self.status = AdminStatus::Idle;
            self.status_clear_at = None;
        }
    }


    /// Signs in. Any failure shows the same generic banner.
    pub async fn sign_in( &mut self, credentials: Credentials ) -> Result<&User, AdminError> {
        self.set_status( AdminStatus::Loading );
        let Credentials { email, password } = credentials;

        match self.backend.sign_in( &email, &password ).await {
            Ok( user ) => {
                tracing::info!( "Signed in as {}", user.email );
                self.set_status( AdminStatus::Idle );
                Ok( self.user.insert( user ) )
            }
            Err( e ) => {
                tracing::warn!( "Sign-in failed for {}: {}", email, e );
                self.set_status( AdminStatus::Error( LOGIN_FAILED_MESSAGE.to_string() ) );
                Err( AdminError::InvalidCredentials )
            }
        }
    }


    /// Signs out and clears the banner.
    pub async fn sign_out( &mut self ) -> Result<(), AdminError> {
        if let Err( e ) = self.backend.sign_out().await {
            tracing::warn!( "Sign-out failed: {}", e );
            return Err( e.into() );
        }
        self.user = None;
        self.set_status( AdminStatus::Idle );
        Ok(())
    }


    /// Validates and uploads a new track.
    ///
    /// @returns The id assigned by the backend
    pub async fn create_track( &mut self, draft: NewTrack ) -> Result<String, AdminError> {
        self.require_user()?;

        let track = match draft.normalize() {
            Ok( track ) => track,
            Err( e ) => return Err( self.fail( e.into() ) ),
        };

        self.set_status( AdminStatus::Loading );
        match self.backend.create_track( track ).await {
            Ok( id ) => {
                self.succeed( "Track added!" );
                Ok( id )
            }
            Err( e ) => Err( self.fail( e.into() ) ),
        }
    }


    /// Flips a track's pin.
    ///
    /// @returns The new pin state
    pub async fn toggle_pin( &mut self, track: &Track ) -> Result<bool, AdminError> {
        self.require_user()?;

        let pinned = !track.is_pinned;
        self.set_status( AdminStatus::Loading );
        match self.backend.set_pinned( &track.id, pinned ).await {
            Ok(()) => {
                self.succeed( if pinned { "Track pinned" } else { "Track unpinned" } );
                Ok( pinned )
            }
            Err( e ) => Err( self.fail( e.into() ) ),
        }
    }


    /// Deletes a track once the user has confirmed.
    ///
    /// @returns true if a delete was sent and succeeded
    pub async fn delete_track( &mut self, id: &str, confirmation: Confirmation ) -> Result<bool, AdminError> {
        self.require_user()?;

        if confirmation == Confirmation::Declined {
            tracing::debug!( "Delete of {} declined", id );
            return Ok( false );
        }

        self.set_status( AdminStatus::Loading );
        match self.backend.delete_track( id ).await {
            Ok(()) => {
                self.succeed( "Track deleted" );
                Ok( true )
            }
            Err( e ) => Err( self.fail( e.into() ) ),
        }
    }


    /// Overwrites the settings record.
    pub async fn save_settings( &mut self, settings: SiteSettings ) -> Result<(), AdminError> {
        self.require_user()?;

        self.set_status( AdminStatus::Loading );
        match self.backend.replace_settings( settings ).await {
            Ok(()) => {
                self.succeed( "Settings Saved!" );
                Ok(())
            }
            Err( e ) => Err( self.fail( e.into() ) ),
        }
    }


    fn require_user( &mut self ) -> Result<(), AdminError> {
        if self.user.is_some() {
            Ok(())
        } else {
            Err( self.fail( AdminError::NotAuthenticated ) )
        }
    }


    fn set_status( &mut self, status: AdminStatus ) {
        self.status = status;
        self.status_clear_at = None;
    }


    fn succeed( &mut self, message: &str ) {
        self.status = AdminStatus::Success( message.to_string() );
        self.status_clear_at = Some( Instant::now() + STATUS_DISMISS_AFTER );
    }


    fn fail( &mut self, error: AdminError ) -> AdminError {
        tracing::warn!( "Admin operation failed: {}", error );
        self.set_status( AdminStatus::Error( error.to_string() ) );
        error
    }
}


/// Filters the admin management list by title or artist.
pub fn manage_search<'a>( tracks: &'a [Track], query: &str ) -> Vec<&'a Track> {
    let query = query.trim().to_lowercase();
    tracks.iter()
        .filter( |t| {
            query.is_empty()
                || t.title.to_lowercase().contains( &query )
                || t.artist.to_lowercase().contains( &query )
        })
        .collect()
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;
    use crate::track::MediaType;


    fn draft( url: &str ) -> NewTrack {
        NewTrack {
            title: "Cholna Sujon".into(),
            artist: "Band".into(),
            original_url: url.into(),
            media_type: MediaType::Music,
            genre: "Pop".into(),
            ..Default::default()
        }
    }


    async fn signed_in() -> ( MemoryBackend, AdminPanel ) {
        let backend = MemoryBackend::new();
        backend.add_account( "admin@s71.io", "secret" );
        let mut panel = AdminPanel::new( Arc::new( backend.clone() ) );
        panel.sign_in( Credentials::new( "admin@s71.io", "secret" ) ).await.unwrap();
        ( backend, panel )
    }


    #[tokio::test]
    async fn test_bad_login_is_generic() {
        let backend = MemoryBackend::new();
        let mut panel = AdminPanel::new( Arc::new( backend ) );

        let err = panel.sign_in( Credentials::new( "who@x.io", "pw" ) ).await.unwrap_err();
        assert_eq!( err, AdminError::InvalidCredentials );
        assert_eq!( panel.status(), &AdminStatus::Error( LOGIN_FAILED_MESSAGE.into() ) );
        assert!( !panel.is_signed_in() );
    }


    #[tokio::test]
    async fn test_mutations_need_sign_in() {
        let backend = MemoryBackend::new();
        let mut panel = AdminPanel::new( Arc::new( backend.clone() ) );

        let err = panel.create_track( draft( "https://a.io/x.mp3" ) ).await.unwrap_err();
        assert_eq!( err, AdminError::NotAuthenticated );
        assert!( backend.tracks().is_empty() );
    }


    #[tokio::test]
    async fn test_invalid_url_never_reaches_backend() {
        let ( backend, mut panel ) = signed_in().await;

        let err = panel.create_track( draft( "::not a url::" ) ).await.unwrap_err();
        assert!( matches!( err, AdminError::Validation( TrackError::InvalidUrl( _ ) ) ) );
        assert!( matches!( panel.status(), AdminStatus::Error( _ ) ) );
        assert!( backend.tracks().is_empty() );
    }


    #[tokio::test]
    async fn test_create_pin_delete() {
        let ( backend, mut panel ) = signed_in().await;

        let id = panel.create_track( draft( "https://drive.google.com/file/d/abc123/view" ) ).await.unwrap();
        assert_eq!( panel.status(), &AdminStatus::Success( "Track added!".into() ) );

        let stored = backend.tracks().remove( 0 );
        assert_eq!( stored.id, id );
        assert_eq!( stored.direct_url, "https://drive.google.com/uc?export=download&id=abc123&confirm=t" );
        assert_eq!( stored.play_count, 0 );

        assert!( panel.toggle_pin( &stored ).await.unwrap() );
        assert!( backend.tracks()[ 0 ].is_pinned );

        assert!( !panel.delete_track( &id, Confirmation::Declined ).await.unwrap() );
        assert_eq!( backend.tracks().len(), 1 );

        assert!( panel.delete_track( &id, Confirmation::Confirmed ).await.unwrap() );
        assert!( backend.tracks().is_empty() );
    }


    #[tokio::test]
    async fn test_backend_failure_keeps_banner() {
        let ( backend, mut panel ) = signed_in().await;
        backend.fail_next_write( "quota exceeded" );

        let err = panel.save_settings( SiteSettings::default() ).await.unwrap_err();
        assert_eq!( err, AdminError::Backend( StoreError::Network( "quota exceeded".into() ) ) );

        panel.tick( Instant::now() + STATUS_DISMISS_AFTER * 2 );
        assert_eq!( panel.status().message(), Some( "Network error: quota exceeded" ) );
    }


    #[tokio::test]
    async fn test_success_banner_dismisses() {
        let ( backend, mut panel ) = signed_in().await;
        let settings = SiteSettings { youtube_url: "youtube.com/@s71".into(), ..Default::default() };
        panel.save_settings( settings.clone() ).await.unwrap();
        assert_eq!( backend.settings(), Some( settings ) );

        panel.tick( Instant::now() );
        assert_eq!( panel.status().message(), Some( "Settings Saved!" ) );
        panel.tick( Instant::now() + STATUS_DISMISS_AFTER );
        assert_eq!( panel.status(), &AdminStatus::Idle );
    }


    #[tokio::test]
    async fn test_sign_out() {
        let ( _backend, mut panel ) = signed_in().await;
        panel.sign_out().await.unwrap();
        assert!( !panel.is_signed_in() );
        assert_eq!(
            panel.toggle_pin( &draft( "https://a.io/x.mp3" ).normalize().unwrap().into_track( "x".into(), 1 ) ).await,
            Err( AdminError::NotAuthenticated )
        );
    }


    #[test]
    fn test_manage_search() {
        let tracks: Vec<Track> = [ ( "a", "Safar", "Ayaan" ), ( "b", "Nodi", "Band" ) ]
            .into_iter()
            .map( |( id, title, artist )| Track {
                title: title.into(),
                artist: artist.into(),
                ..draft( "https://a.io/x.mp3" ).normalize().unwrap().into_track( id.into(), 1 )
            })
            .collect();

        assert_eq!( manage_search( &tracks, "" ).len(), 2 );
        assert_eq!( manage_search( &tracks, "band" )[ 0 ].id, "b" );
        assert!( manage_search( &tracks, "zzz" ).is_empty() );
    }
}
