//! Link and time formatting helpers.

use thiserror::Error;


/// Download endpoint that serves a Drive file as a raw audio stream.
const DRIVE_DIRECT_URL: &str = "https://drive.google.com/uc?export=download";

/// Hosts whose share links carry a Drive file id.
const DRIVE_HOSTS: [&str; 2] = [ "drive.google.com", "docs.google.com" ];


/// Errors produced while turning user input into a playable link.
#[derive( Debug, Error, Clone, PartialEq, Eq )]
pub enum FormatError {
    #[error( "URL is empty" )]
    EmptyUrl,

    #[error( "Not a playable link: {0}" )]
    Unplayable( String ),
}


/// Converts an admin-entered audio link into a URL the player can stream.
///
/// Drive share links (`/file/d/<id>/...` or `...?id=<id>` on a Google Drive
/// host) are rewritten to the direct download endpoint. Anything else must
/// already be an absolute http(s) URL and passes through unchanged.
pub fn normalize_audio_url( url: &str ) -> Result<String, FormatError> {
    let url = url.trim();
    if url.is_empty() {
        return Err( FormatError::EmptyUrl );
    }

    let rest = url.strip_prefix( "https://" )
        .or_else( || url.strip_prefix( "http://" ) )
        .ok_or_else( || FormatError::Unplayable( url.to_string() ) )?;

    let host = rest.split( [ '/', '?', '#' ] ).next().unwrap_or( "" );
    if host.is_empty() || url.chars().any( char::is_whitespace ) {
        return Err( FormatError::Unplayable( url.to_string() ) );
    }

    if is_drive_host( host ) {
        if let Some( file_id ) = drive_file_id( &rest[ host.len().. ] ) {
            return Ok( format!( "{}&id={}&confirm=t", DRIVE_DIRECT_URL, file_id ) );
        }
    }

    Ok( url.to_string() )
}


fn is_drive_host( host: &str ) -> bool {
    let name = host.rsplit( '@' ).next().unwrap_or( host );
    let name = name.split( ':' ).next().unwrap_or( name ).to_ascii_lowercase();
    DRIVE_HOSTS.contains( &name.as_str() )
}


/// Extracts a Drive file id from the path and query of a Drive URL.
fn drive_file_id( path: &str ) -> Option<&str> {
    let after = path.split_once( "/file/d/" )
        .or_else( || path.split_once( "?id=" ) )
        .or_else( || path.split_once( "&id=" ) )
        .map( |( _, rest )| rest )?;

    let end = after
        .find( |c: char| !( c.is_ascii_alphanumeric() || c == '_' || c == '-' ) )
        .unwrap_or( after.len() );

    let id = &after[ ..end ];
    ( !id.is_empty() ).then_some( id )
}


/// Cleans a footer/social link, adding `https://` when no scheme is given.
///
/// @returns None for empty input
pub fn normalize_external_url( url: &str ) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    if url.starts_with( "http://" ) || url.starts_with( "https://" ) {
        Some( url.to_string() )
    } else {
        Some( format!( "https://{}", url ) )
    }
}


/// Formats a playback position as `m:ss`.
pub fn format_time( seconds: f64 ) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }

    let total = seconds.floor() as u64;
    format!( "{}:{:02}", total / 60, total % 60 )
}


/// Builds the deep-link slug for a title: words are percent-encoded and
/// joined with `-`. Hyphens inside words are encoded as `%2D` so they survive
/// `decode_slug`.
pub fn slugify( title: &str ) -> String {
    title.split_whitespace()
        .map( |word| urlencoding::encode( word ).replace( '-', "%2D" ) )
        .collect::<Vec<_>>()
        .join( "-" )
}


/// Turns a deep-link slug back into lowercase search text.
pub fn decode_slug( slug: &str ) -> String {
    let spaced = slug.replace( '-', " " );
    let decoded = urlencoding::decode( &spaced )
        .map( |s| s.into_owned() )
        .unwrap_or_else( |_| spaced.clone() );

    decoded.trim().to_lowercase()
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_drive_file_link() {
        let url = "https://drive.google.com/file/d/1AbC_d-9/view?usp=sharing";
        assert_eq!(
            normalize_audio_url( url ).unwrap(),
            "https://drive.google.com/uc?export=download&id=1AbC_d-9&confirm=t"
        );
    }


    #[test]
    fn test_drive_open_link() {
        let url = "https://drive.google.com/open?id=XYZ123&authuser=0";
        assert_eq!(
            normalize_audio_url( url ).unwrap(),
            "https://drive.google.com/uc?export=download&id=XYZ123&confirm=t"
        );
    }


    #[test]
    fn test_id_query_off_drive_is_untouched() {
        let url = "https://cdn.example.com/stream?id=abc123";
        assert_eq!( normalize_audio_url( url ).unwrap(), url );

        let url = "https://cdn.example.com/file/d/abc123/track.mp3";
        assert_eq!( normalize_audio_url( url ).unwrap(), url );

        assert_eq!(
            normalize_audio_url( "https://DOCS.google.com/uc?export=download&id=Q1w2" ).unwrap(),
            "https://drive.google.com/uc?export=download&id=Q1w2&confirm=t"
        );
    }


    #[test]
    fn test_plain_url_passes_through() {
        let url = "  https://cdn.example.com/a.mp3 ";
        assert_eq!( normalize_audio_url( url ).unwrap(), "https://cdn.example.com/a.mp3" );
    }


    #[test]
    fn test_unplayable_urls() {
        assert_eq!( normalize_audio_url( "   " ), Err( FormatError::EmptyUrl ) );
        assert!( matches!( normalize_audio_url( "ftp://host/a.mp3" ), Err( FormatError::Unplayable( _ ) ) ) );
        assert!( matches!( normalize_audio_url( "https:///a.mp3" ), Err( FormatError::Unplayable( _ ) ) ) );
        assert!( matches!( normalize_audio_url( "song name.mp3" ), Err( FormatError::Unplayable( _ ) ) ) );
    }


    #[test]
    fn test_external_url() {
        assert_eq!( normalize_external_url( "" ), None );
        assert_eq!( normalize_external_url( " fb.com/s71 " ).as_deref(), Some( "https://fb.com/s71" ) );
        assert_eq!( normalize_external_url( "http://x.org" ).as_deref(), Some( "http://x.org" ) );
    }


    #[test]
    fn test_format_time() {
        assert_eq!( format_time( 0.0 ), "0:00" );
        assert_eq!( format_time( f64::NAN ), "0:00" );
        assert_eq!( format_time( 9.7 ), "0:09" );
        assert_eq!( format_time( 125.0 ), "2:05" );
    }


    #[test]
    fn test_slug_roundtrip_text() {
        assert_eq!( slugify( "Cholna  Sujon" ), "Cholna-Sujon" );
        assert_eq!( decode_slug( "Cholna-Sujon" ), "cholna sujon" );
        assert_eq!( decode_slug( "Ami%20Tomar" ), "ami tomar" );
    }


    #[test]
    fn test_slug_keeps_hyphens_and_accents() {
        assert_eq!( slugify( "Lo-Fi Dreams" ), "Lo%2DFi-Dreams" );

        for title in [ "Lo-Fi Dreams", "A - B", "Café  Ñandú", "Tala al-Badru (Live)" ] {
            let expected = title.split_whitespace().collect::<Vec<_>>().join( " " ).to_lowercase();
            assert_eq!( decode_slug( &slugify( title ) ), expected, "{}", title );
        }
    }
}
