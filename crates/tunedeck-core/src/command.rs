//! Slash command parsing.
//!
//! Commands are parsed from user input and executed against a `Session` by
//! the shell. Track positions are 1-based, as shown in listings.

use std::str::FromStr;

use thiserror::Error;

use crate::filter::{ SortOption, Tab };
use crate::playback::RepeatMode;
use crate::settings::BaseTheme;
use crate::theme::Theme;
use crate::track::{ MediaType, NewTrack };


/// Reasons a line of input is not a command.
#[derive( Debug, Error, PartialEq, Eq )]
pub enum CommandError {
    #[error( "No such command: /{0} (try /help)" )]
    Unknown( String ),

    #[error( "{0}" )]
    InvalidArgument( String ),

    #[error( "Missing {0}" )]
    MissingArgument( String ),
}


/// A shell command, with positions already converted to 0-based indices.
#[derive( Debug, Clone, PartialEq )]
pub enum Command {
    // Library commands
    List,
    Tab { tab: Tab },
    Genre { genre: String },
    Search { term: String },
    Sort { sort: SortOption },
    Theme { theme: Theme },
    Go { fragment: String },
    Share { position: usize },

    // Playback commands
    Play { position: Option<usize> },
    Pause,
    Next,
    Prev,
    End,
    Shuffle,
    Repeat { mode: Option<RepeatMode> },

    // Admin commands
    Login { email: String, password: String },
    Logout,
    Add { draft: NewTrack },
    Pin { position: usize },
    Delete { position: usize },
    Settings,
    Link { label: String, url: String },
    Unlink { id: String },
    BaseTheme { theme: BaseTheme },

    // Shell commands
    Help,
    Quit,
}


impl Command {
    /// Parses one input line, without its leading `/`.
    ///
    /// @param input - Command word followed by its arguments
    ///
    /// @returns The command, or why it was rejected
    pub fn parse( input: &str ) -> Result<Self, CommandError> {
        let ( word, rest ) = input.trim().split_once( ' ' ).unwrap_or( ( input.trim(), "" ) );
        let args = Some( rest.trim() ).filter( |s| !s.is_empty() );

        match word.to_lowercase().as_str() {
            // Library commands
            "list" | "ls" | "l" => Ok( Command::List ),
            "tab" | "t" => {
                let tab = required( args, "tab (music, song, halal)" )?;
                Ok( Command::Tab { tab: parse_arg( tab )? } )
            }
            "genre" | "g" => Ok( Command::Genre {
                genre: args.unwrap_or( crate::filter::ALL_GENRES ).to_string(),
            }),
            "search" | "find" | "?" => Ok( Command::Search {
                term: args.unwrap_or( "" ).to_string(),
            }),
            "sort" => {
                let sort = required( args, "sort option" )?;
                Ok( Command::Sort { sort: parse_arg( sort )? } )
            }
            "theme" | "th" => {
                let theme = required( args, "theme name" )?;
                Ok( Command::Theme { theme: parse_arg( theme )? } )
            }
            "go" | "goto" => Ok( Command::Go {
                fragment: args.unwrap_or( "#/" ).to_string(),
            }),
            "share" => Ok( Command::Share { position: parse_position( args )? } ),

            // Playback commands
            "play" | "p" => {
                let position = args.map( |a| parse_position( Some( a ) ) ).transpose()?;
                Ok( Command::Play { position } )
            }
            "pause" | "pa" => Ok( Command::Pause ),
            "next" | "n" => Ok( Command::Next ),
            "prev" | "previous" | "pr" => Ok( Command::Prev ),
            "end" => Ok( Command::End ),
            "shuffle" | "sh" => Ok( Command::Shuffle ),
            "repeat" | "rep" => {
                let mode = args.map( parse_arg ).transpose()?;
                Ok( Command::Repeat { mode } )
            }

            // Admin commands
            "login" => {
                let args = required( args, "email and password" )?;
                let ( email, password ) = args.split_once( ' ' )
                    .ok_or_else( || CommandError::MissingArgument( "password".into() ) )?;
                Ok( Command::Login {
                    email: email.to_string(),
                    password: password.trim().to_string(),
                })
            }
            "logout" => Ok( Command::Logout ),
            "add" => Ok( Command::Add { draft: parse_draft( required( args, "track fields" )? )? } ),
            "pin" => Ok( Command::Pin { position: parse_position( args )? } ),
            "delete" | "del" | "rm" => Ok( Command::Delete { position: parse_position( args )? } ),
            "settings" => Ok( Command::Settings ),
            "link" => {
                let args = required( args, "label and url" )?;
                let ( label, url ) = args.rsplit_once( ' ' )
                    .ok_or_else( || CommandError::MissingArgument( "url".into() ) )?;
                Ok( Command::Link { label: label.trim().to_string(), url: url.to_string() } )
            }
            "unlink" => Ok( Command::Unlink { id: required( args, "link id" )?.to_string() } ),
            "base" => {
                let theme = required( args, "base theme" )?;
                Ok( Command::BaseTheme { theme: parse_arg( theme )? } )
            }

            // Shell commands
            "help" | "h" => Ok( Command::Help ),
            "quit" | "q" | "exit" => Ok( Command::Quit ),

            "" => Err( CommandError::MissingArgument( "command".into() ) ),
            other => Err( CommandError::Unknown( other.to_string() ) ),
        }
    }


    /// One-line summary shown next to the command.
    pub fn description( &self ) -> &'static str {
        match self {
            Command::List => "List visible tracks",
            Command::Tab { .. } => "Switch library tab",
            Command::Genre { .. } => "Filter by genre",
            Command::Search { .. } => "Search titles and artists",
            Command::Sort { .. } => "Change sort order",
            Command::Theme { .. } => "Switch theme",
            Command::Go { .. } => "Navigate to a fragment",
            Command::Share { .. } => "Show a track's share link",
            Command::Play { .. } => "Play track or toggle playback",
            Command::Pause => "Pause playback",
            Command::Next => "Next track",
            Command::Prev => "Previous track",
            Command::End => "Finish the current track",
            Command::Shuffle => "Toggle shuffle",
            Command::Repeat { .. } => "Set repeat mode",
            Command::Login { .. } => "Sign in as admin",
            Command::Logout => "Sign out",
            Command::Add { .. } => "Upload a track",
            Command::Pin { .. } => "Toggle a track's pin",
            Command::Delete { .. } => "Delete a track",
            Command::Settings => "Show site settings",
            Command::Link { .. } => "Add a footer link",
            Command::Unlink { .. } => "Remove a footer link",
            Command::BaseTheme { .. } => "Set the site base theme",
            Command::Help => "Show help",
            Command::Quit => "Quit application",
        }
    }
}


fn required<'a>( args: Option<&'a str>, what: &str ) -> Result<&'a str, CommandError> {
    args.ok_or_else( || CommandError::MissingArgument( what.into() ) )
}


fn parse_arg<T>( s: &str ) -> Result<T, CommandError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    s.parse().map_err( |e: T::Err| CommandError::InvalidArgument( e.to_string() ) )
}


/// Parses a 1-based track position into a 0-based index.
fn parse_position( args: Option<&str> ) -> Result<usize, CommandError> {
    let raw = required( args, "track number" )?;
    match raw.parse::<usize>() {
        Ok( n ) if n > 0 => Ok( n - 1 ),
        _ => Err( CommandError::InvalidArgument( format!( "Invalid track number: {}", raw ) ) ),
    }
}


/// Parses `type | genre-or-category | title | artist | url [| image]`.
fn parse_draft( args: &str ) -> Result<NewTrack, CommandError> {
    let fields: Vec<&str> = args.split( '|' ).map( str::trim ).collect();
    if fields.len() < 5 {
        return Err( CommandError::MissingArgument(
            "expected: type | genre | title | artist | url [| image]".into()
        ));
    }

    let media_type: MediaType = parse_arg( fields[ 0 ] )?;
    let ( genre, sub_genre ) = if media_type == MediaType::Halal {
        ( String::new(), fields[ 1 ].to_string() )
    } else {
        ( fields[ 1 ].to_string(), String::new() )
    };

    Ok( NewTrack {
        title: fields[ 2 ].to_string(),
        artist: fields[ 3 ].to_string(),
        original_url: fields[ 4 ].to_string(),
        image_url: fields.get( 5 ).map( |s| s.to_string() ).unwrap_or_default(),
        media_type,
        genre,
        sub_genre,
        ..Default::default()
    })
}


/// Full command reference printed by `/help`.
pub fn help_text() -> &'static str {
    r#"Library Commands:
  /list              List visible tracks           [l]
  /tab <name>        music, song, or halal
  /genre [name]      Filter by genre (no arg: All)
  /search [term]     Search (no arg: clear)
  /sort <option>     newest, oldest, title, artist, plays
  /theme <name>      dark, sakura, neon, pearl, peace
  /go <fragment>     Navigate (#/, #/admin, #/media/<slug>)
  /share <n>         Show share link for track n

Playback Commands:
  /play [n]          Play track n, or toggle playback
  /pause             Pause playback
  /next              Next track
  /prev              Previous track
  /end               Simulate the track finishing
  /shuffle           Toggle shuffle
  /repeat [mode]     Cycle or set repeat (off/all/one)

Admin Commands:
  /login <email> <password>
  /logout
  /add <type> | <genre> | <title> | <artist> | <url> [| <image>]
  /pin <n>           Toggle pin on track n
  /delete <n>        Delete track n (asks first)
  /settings          Show site settings
  /link <label> <url>
  /unlink <id>
  /base <theme>      cyan, orange, purple, emerald

Other Commands:
  /help              Show this help
  /quit              Exit tunedeck"#
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_parse_play_position() {
        assert_eq!( Command::parse( "play 3" ).unwrap(), Command::Play { position: Some( 2 ) } );
        assert_eq!( Command::parse( "p" ).unwrap(), Command::Play { position: None } );
        assert!( matches!( Command::parse( "play 0" ), Err( CommandError::InvalidArgument( _ ) ) ) );
    }


    #[test]
    fn test_parse_tab_and_sort() {
        assert_eq!( Command::parse( "tab Halal" ).unwrap(), Command::Tab { tab: MediaType::Halal } );
        assert_eq!( Command::parse( "sort plays" ).unwrap(), Command::Sort { sort: SortOption::PlayCount } );
        assert!( matches!( Command::parse( "sort random" ), Err( CommandError::InvalidArgument( _ ) ) ) );
    }


    #[test]
    fn test_repeat_mode_is_optional() {
        assert_eq!( Command::parse( "rep one" ).unwrap(), Command::Repeat { mode: Some( RepeatMode::One ) } );
        assert_eq!( Command::parse( "repeat" ).unwrap(), Command::Repeat { mode: None } );
        assert!( Command::parse( "repeat forever" ).is_err() );
    }


    #[test]
    fn test_parse_search_clear() {
        assert_eq!( Command::parse( "search" ).unwrap(), Command::Search { term: String::new() } );
        assert_eq!( Command::parse( "? sujon" ).unwrap(), Command::Search { term: "sujon".into() } );
    }


    #[test]
    fn test_parse_login() {
        let cmd = Command::parse( "login admin@s71.io hunter 2" ).unwrap();
        assert_eq!( cmd, Command::Login { email: "admin@s71.io".into(), password: "hunter 2".into() } );
        assert!( matches!( Command::parse( "login admin@s71.io" ), Err( CommandError::MissingArgument( _ ) ) ) );
    }


    #[test]
    fn test_parse_add_halal() {
        let cmd = Command::parse( "add halal | Nasheed | Tala al Badru | Choir | https://a.io/t.mp3" ).unwrap();
        let Command::Add { draft } = cmd else { panic!( "expected add" ) };
        assert_eq!( draft.media_type, MediaType::Halal );
        assert_eq!( draft.sub_genre, "Nasheed" );
        assert!( draft.genre.is_empty() );
        assert_eq!( draft.original_url, "https://a.io/t.mp3" );
    }


    #[test]
    fn test_parse_add_too_few_fields() {
        let result = Command::parse( "add music | Pop | Title" );
        assert!( matches!( result, Err( CommandError::MissingArgument( _ ) ) ) );
    }


    #[test]
    fn test_parse_link() {
        let cmd = Command::parse( "link Studio Blog blog.s71.io" ).unwrap();
        assert_eq!( cmd, Command::Link { label: "Studio Blog".into(), url: "blog.s71.io".into() } );
    }


    #[test]
    fn test_unknown_word_rejected() {
        assert_eq!( Command::parse( "dance now" ), Err( CommandError::Unknown( "dance".into() ) ) );
        assert!( matches!( Command::parse( "   " ), Err( CommandError::MissingArgument( _ ) ) ) );
    }


    #[test]
    fn test_positions_need_a_number() {
        assert!( matches!( Command::parse( "pin" ), Err( CommandError::MissingArgument( _ ) ) ) );
        assert!( matches!( Command::parse( "delete two" ), Err( CommandError::InvalidArgument( _ ) ) ) );
        assert_eq!( Command::parse( "DEL 2" ).unwrap(), Command::Delete { position: 1 } );
    }
}
