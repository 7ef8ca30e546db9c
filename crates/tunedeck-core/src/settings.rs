//! Site-wide settings record
//!
//! A single settings document exists per deployment. The footer reads it and
//! the admin panel replaces it wholesale.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{ AtomicU64, Ordering };
use std::time::{ SystemTime, UNIX_EPOCH };

use serde::{ Deserialize, Deserializer, Serialize };
use thiserror::Error;

use crate::format;


/// Well-known document id of the settings singleton.
pub const SETTINGS_ID: &str = "global";

pub const DEFAULT_COPYRIGHT: &str = "© 2026 S-71 MusicLab. All Rights Reserved.";


/// Errors raised when editing the settings draft.
#[derive( Debug, Error, PartialEq, Eq )]
pub enum SettingsError {
    #[error( "Link label is empty" )]
    EmptyLabel,

    #[error( "Link URL is empty" )]
    EmptyUrl,

    #[error( "Unknown base theme: {0}" )]
    UnknownBaseTheme( String ),
}


/// Accent palette chosen by the admin for the whole site.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize )]
#[serde( rename_all = "UPPERCASE" )]
pub enum BaseTheme {
    #[default]
    Cyan,
    Orange,
    Purple,
    Emerald,
}


impl fmt::Display for BaseTheme {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        f.write_str( match self {
            BaseTheme::Cyan => "CYAN",
            BaseTheme::Orange => "ORANGE",
            BaseTheme::Purple => "PURPLE",
            BaseTheme::Emerald => "EMERALD",
        })
    }
}


impl FromStr for BaseTheme {
    type Err = SettingsError;


    fn from_str( s: &str ) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CYAN" => Ok( BaseTheme::Cyan ),
            "ORANGE" => Ok( BaseTheme::Orange ),
            "PURPLE" => Ok( BaseTheme::Purple ),
            "EMERALD" => Ok( BaseTheme::Emerald ),
            other => Err( SettingsError::UnknownBaseTheme( other.to_string() ) ),
        }
    }
}


/// Admin-defined footer link.
#[derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize )]
pub struct CustomLink {
    pub id: String,
    pub label: String,
    pub url: String,
}


/// The site settings singleton.
#[derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize )]
#[serde( rename_all = "camelCase", default )]
pub struct SiteSettings {
    pub copyright_text: String,
    pub facebook_url: String,
    pub twitter_url: String,
    pub instagram_url: String,
    pub github_url: String,
    pub youtube_url: String,
    pub s71_studio_url: String,
    pub custom_links: Vec<CustomLink>,
    /// Blank or unrecognised stored values read as the default palette.
    #[serde( deserialize_with = "lenient_base_theme" )]
    pub base_theme: BaseTheme,
}


impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            copyright_text: DEFAULT_COPYRIGHT.to_string(),
            facebook_url: String::new(),
            twitter_url: String::new(),
            instagram_url: String::new(),
            github_url: String::new(),
            youtube_url: String::new(),
            s71_studio_url: String::new(),
            custom_links: Vec::new(),
            base_theme: BaseTheme::default(),
        }
    }
}


impl SiteSettings {
    /// Fills blank fields of a stored record with their defaults.
    pub fn merge_with_defaults( mut self ) -> Self {
        if self.copyright_text.trim().is_empty() {
            self.copyright_text = DEFAULT_COPYRIGHT.to_string();
        }
        self
    }


    /// Appends a footer link with a fresh id.
    pub fn add_custom_link( &mut self, label: &str, url: &str ) -> Result<&CustomLink, SettingsError> {
        let label = label.trim();
        let url = url.trim();
        if label.is_empty() {
            return Err( SettingsError::EmptyLabel );
        }
        if url.is_empty() {
            return Err( SettingsError::EmptyUrl );
        }

        let mut id = next_link_id();
        while self.custom_links.iter().any( |l| l.id == id ) {
            id = next_link_id();
        }

        self.custom_links.push( CustomLink {
            id,
            label: label.to_string(),
            url: url.to_string(),
        });

        Ok( &self.custom_links[ self.custom_links.len() - 1 ] )
    }


    /// Removes a footer link by id.
    ///
    /// @returns true if a link was removed
    pub fn remove_custom_link( &mut self, id: &str ) -> bool {
        let before = self.custom_links.len();
        self.custom_links.retain( |l| l.id != id );
        before != self.custom_links.len()
    }


    /// Social links that are set, as `(network, url)` pairs with a scheme.
    pub fn social_links( &self ) -> Vec<( &'static str, String )> {
        [
            ( "facebook", &self.facebook_url ),
            ( "twitter", &self.twitter_url ),
            ( "instagram", &self.instagram_url ),
            ( "github", &self.github_url ),
            ( "youtube", &self.youtube_url ),
        ]
        .into_iter()
        .filter_map( |( name, url )| format::normalize_external_url( url ).map( |u| ( name, u ) ) )
        .collect()
    }


    /// Studio link with a scheme, if set.
    pub fn studio_link( &self ) -> Option<String> {
        format::normalize_external_url( &self.s71_studio_url )
    }
}


fn lenient_base_theme<'de, D>( deserializer: D ) -> Result<BaseTheme, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize( deserializer )?;
    Ok( raw.and_then( |s| s.parse().ok() ).unwrap_or_default() )
}


/// Millisecond-based link ids, bumped when two are made in the same tick.
fn next_link_id() -> String {
    static LAST: AtomicU64 = AtomicU64::new( 0 );

    let now = SystemTime::now()
        .duration_since( UNIX_EPOCH )
        .map( |d| d.as_millis() as u64 )
        .unwrap_or( 0 );

    let mut prev = LAST.load( Ordering::Relaxed );
    loop {
        let next = now.max( prev + 1 );
        match LAST.compare_exchange( prev, next, Ordering::Relaxed, Ordering::Relaxed ) {
            Ok( _ ) => return next.to_string(),
            Err( actual ) => prev = actual,
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_partial_record_gets_defaults() {
        let stored: SiteSettings = serde_json::from_str( r#"{ "facebookUrl": "fb.com/x", "copyrightText": "" }"# ).unwrap();
        let merged = stored.merge_with_defaults();
        assert_eq!( merged.copyright_text, DEFAULT_COPYRIGHT );
        assert_eq!( merged.facebook_url, "fb.com/x" );
        assert_eq!( merged.base_theme, BaseTheme::Cyan );
        assert!( merged.custom_links.is_empty() );
    }


    #[test]
    fn test_blank_or_unknown_base_theme_reads_as_default() {
        let cases = [
            ( r#""""#, BaseTheme::Cyan ),
            ( r#""TEAL""#, BaseTheme::Cyan ),
            ( "null", BaseTheme::Cyan ),
            ( r#""emerald""#, BaseTheme::Emerald ),
        ];
        for ( raw, expected ) in cases {
            let json = format!( r#"{{ "copyrightText": "x", "baseTheme": {} }}"#, raw );
            let stored: SiteSettings = serde_json::from_str( &json ).unwrap();
            assert_eq!( stored.base_theme, expected, "{}", raw );
            assert_eq!( stored.copyright_text, "x" );
        }
    }


    #[test]
    fn test_custom_links() {
        let mut settings = SiteSettings::default();
        assert_eq!( settings.add_custom_link( "", "x" ).unwrap_err(), SettingsError::EmptyLabel );
        assert_eq!( settings.add_custom_link( "Blog", " " ).unwrap_err(), SettingsError::EmptyUrl );

        let first = settings.add_custom_link( "Blog", "blog.example.com" ).unwrap().id.clone();
        let second = settings.add_custom_link( "Shop", "shop.example.com" ).unwrap().id.clone();
        assert_ne!( first, second );
        assert_eq!( settings.custom_links.len(), 2 );

        assert!( settings.remove_custom_link( &first ) );
        assert!( !settings.remove_custom_link( &first ) );
        assert_eq!( settings.custom_links[ 0 ].label, "Shop" );
    }


    #[test]
    fn test_social_links_skip_blank() {
        let settings = SiteSettings {
            github_url: "github.com/s71".into(),
            youtube_url: "https://youtube.com/@s71".into(),
            ..Default::default()
        };
        let links = settings.social_links();
        assert_eq!( links, vec![
            ( "github", "https://github.com/s71".to_string() ),
            ( "youtube", "https://youtube.com/@s71".to_string() ),
        ]);
        assert_eq!( settings.studio_link(), None );
    }


    #[test]
    fn test_base_theme_parse() {
        assert_eq!( "emerald".parse::<BaseTheme>().unwrap(), BaseTheme::Emerald );
        assert_eq!( serde_json::to_string( &BaseTheme::Orange ).unwrap(), "\"ORANGE\"" );
        assert!( "teal".parse::<BaseTheme>().is_err() );
    }
}
