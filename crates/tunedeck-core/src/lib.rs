//! Tunedeck Core - Media catalog and playback engine
//!
//! This crate provides the client-side core of the S-71 music portal:
//! the catalog model, filtering and sorting, the playback queue, theming,
//! hash routing, the admin panel and the backend seam they all sit on.

pub mod admin;
pub mod catalog;
pub mod command;
pub mod filter;
pub mod format;
pub mod playback;
pub mod preferences;
pub mod route;
pub mod session;
pub mod settings;
pub mod store;
pub mod theme;
pub mod track;

pub use admin::{ AdminError, AdminPanel, AdminStatus, Confirmation, Credentials };
pub use catalog::{ CatalogSnapshot, CatalogStore };
pub use command::{ Command, CommandError };
pub use filter::{ FilterState, SortOption, Tab };
pub use playback::{ PlaybackController, RepeatMode, Transition };
pub use preferences::Preferences;
pub use route::Route;
pub use session::{ Session, SessionOptions };
pub use settings::{ BaseTheme, CustomLink, SiteSettings };
pub use store::{ Backend, MemoryBackend, StoreError, Subscription, User };
pub use theme::{ Theme, ThemeState, ThemeStyles };
pub use track::{ MediaType, NewTrack, Track, TrackError };
