//! Local preferences
//!
//! Only the theme choice survives a restart. It lives in a small JSON file
//! under the platform config directory.

use std::fs;
use std::path::{ Path, PathBuf };

use serde::{ Deserialize, Serialize };
use thiserror::Error;

use crate::theme::Theme;


#[derive( Debug, Error )]
pub enum PreferenceError {
    #[error( "IO error: {0}" )]
    Io( #[from] std::io::Error ),

    #[error( "Serialization error: {0}" )]
    Json( #[from] serde_json::Error ),
}


/// Persisted client preferences.
#[derive( Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize )]
#[serde( default )]
pub struct Preferences {
    pub theme: Theme,
}


impl Preferences {
    /// Default location of the preferences file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map( |p| p.join( "tunedeck" ).join( "preferences.json" ) )
    }


    /// Loads preferences, falling back to defaults when missing or unreadable.
    pub fn load_from( path: &Path ) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string( path ) {
            Ok( contents ) => serde_json::from_str( &contents ).unwrap_or_else( |e| {
                tracing::warn!( "Ignoring malformed preferences {}: {}", path.display(), e );
                Self::default()
            }),
            Err( e ) => {
                tracing::warn!( "Failed to read preferences: {}", e );
                Self::default()
            }
        }
    }


    /// Writes preferences, creating the parent directory if needed.
    pub fn save_to( &self, path: &Path ) -> Result<(), PreferenceError> {
        if let Some( parent ) = path.parent() {
            fs::create_dir_all( parent )?;
        }
        fs::write( path, serde_json::to_string_pretty( self )? )?;
        Ok(())
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    fn scratch( name: &str ) -> PathBuf {
        std::env::temp_dir()
            .join( format!( "tunedeck-prefs-{}-{}", std::process::id(), name ) )
            .join( "preferences.json" )
    }


    #[test]
    fn test_missing_file_gives_default() {
        let prefs = Preferences::load_from( &scratch( "missing" ) );
        assert_eq!( prefs.theme, Theme::DarkLiquid );
    }


    #[test]
    fn test_save_then_load() {
        let path = scratch( "save" );
        Preferences { theme: Theme::NeonLiquid }.save_to( &path ).unwrap();
        assert_eq!( Preferences::load_from( &path ).theme, Theme::NeonLiquid );

        let raw = fs::read_to_string( &path ).unwrap();
        assert!( raw.contains( "NEON_LIQUID" ) );
        let _ = fs::remove_dir_all( path.parent().unwrap() );
    }


    #[test]
    fn test_malformed_file_gives_default() {
        let path = scratch( "bad" );
        fs::create_dir_all( path.parent().unwrap() ).unwrap();
        fs::write( &path, "{ not json" ).unwrap();
        assert_eq!( Preferences::load_from( &path ), Preferences::default() );
        let _ = fs::remove_dir_all( path.parent().unwrap() );
    }
}
