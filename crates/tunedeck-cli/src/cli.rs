//! Command-line argument parsing for Tunedeck.

use std::path::PathBuf;

use clap::Parser;


/// Tunedeck - A terminal front-end for the S-71 music portal.
#[derive( Parser, Debug )]
#[command( name = "tunedeck" )]
#[command( version, about, long_about = None )]
pub struct Args {
    /// JSON catalog to serve (tracks, settings, admin accounts).
    #[arg( short, long )]
    pub catalog: Option<PathBuf>,

    /// URL fragment to open, e.g. `#/media/cholna-sujon` or `#/admin`.
    #[arg( short, long, default_value = "#/" )]
    pub fragment: String,

    /// Directory for preferences instead of the platform config dir.
    #[arg( long )]
    pub config_dir: Option<PathBuf>,
}


impl Args {
    /// Resolves where the theme preference is stored.
    pub fn preferences_path( &self ) -> Option<PathBuf> {
        match &self.config_dir {
            Some( dir ) => Some( dir.join( "preferences.json" ) ),
            None => tunedeck_core::Preferences::default_path(),
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_config_dir_flag() {
        let args = Args::try_parse_from([ "tunedeck", "--config-dir", "/tmp/td" ]).unwrap();
        assert_eq!( args.preferences_path(), Some( PathBuf::from( "/tmp/td/preferences.json" ) ) );
        assert_eq!( args.fragment, "#/" );
    }


    #[test]
    fn test_splash_cannot_be_skipped() {
        assert!( Args::try_parse_from([ "tunedeck", "--no-splash" ]).is_err() );
    }
}
