//! Terminal rendering
//!
//! Plain line output colored with the active theme's palette.

use crossterm::style::{ Color, StyledContent, Stylize };

use tunedeck_core::{
    filter,
    AdminStatus, FilterState, PlaybackController, SiteSettings, ThemeStyles, Track, Transition,
};


/// Converts a CSS hex color (`#rrggbb` or `#rrggbbaa`) to a terminal color.
/// Alpha is dropped.
pub fn hex_color( hex: &str ) -> Option<Color> {
    let digits = hex.strip_prefix( '#' )?;
    if digits.len() < 6 || !digits.is_ascii() {
        return None;
    }

    let channel = |i: usize| u8::from_str_radix( &digits[ i..i + 2 ], 16 ).ok();
    Some( Color::Rgb {
        r: channel( 0 )?,
        g: channel( 2 )?,
        b: channel( 4 )?,
    })
}


/// Palette resolved from theme styles.
#[derive( Debug, Clone, Copy )]
pub struct Palette {
    pub main: Color,
    pub secondary: Color,
    pub accent: Color,
}


impl Palette {
    /// Resolves terminal colors for a theme.
    pub fn from_styles( styles: &ThemeStyles ) -> Self {
        Self {
            main: hex_color( styles.text_main ).unwrap_or( Color::White ),
            secondary: hex_color( styles.text_secondary ).unwrap_or( Color::Grey ),
            accent: hex_color( styles.accent ).unwrap_or( Color::Cyan ),
        }
    }


    /// Bold accent text.
    pub fn accent<'a>( &self, text: &'a str ) -> StyledContent<&'a str> {
        text.with( self.accent ).bold()
    }


    /// Secondary text.
    pub fn dim<'a>( &self, text: &'a str ) -> StyledContent<&'a str> {
        text.with( self.secondary )
    }


    /// Primary text.
    pub fn main<'a>( &self, text: &'a str ) -> StyledContent<&'a str> {
        text.with( self.main )
    }
}


/// Startup banner shown during the splash delay.
pub fn print_splash( palette: &Palette ) {
    println!();
    println!( "  {}", palette.accent( "S-71 MUSICLAB" ) );
    println!( "  {}", palette.dim( "loading catalog..." ) );
    println!();
}


/// Prints the active playlist, marking the current track.
pub fn print_tracks( palette: &Palette, tracks: &[Track], state: &FilterState, player: &PlaybackController ) {
    let genres = filter::genre_choices( state.tab ).join( " / " );
    println!(
        "{} {}  {}",
        palette.accent( state.tab.as_str() ),
        palette.dim( &format!( "[{}] sort={}", state.genre, state.sort ) ),
        palette.dim( &genres ),
    );

    if tracks.is_empty() {
        println!( "  {}", palette.dim( "No tracks found." ) );
        return;
    }

    let current = player.current().map( |t| t.id.as_str() );
    for ( i, track ) in tracks.iter().enumerate() {
        let marker = if Some( track.id.as_str() ) == current {
            if player.is_playing() { ">" } else { "=" }
        } else {
            " "
        };
        let pin = if track.is_pinned { "*" } else { " " };
        let genre = if track.is_halal() && !track.sub_genre.is_empty() {
            &track.sub_genre
        } else {
            &track.genre
        };

        println!(
            "{}{} {:>3}. {} {} {}",
            palette.accent( marker ),
            pin,
            i + 1,
            palette.main( &track.title ),
            palette.dim( &format!( "- {} ({})", track.artist, genre ) ),
            palette.dim( &format!( "{} plays", track.play_count ) ),
        );
    }
}


/// Describes a playback transition for the status line.
pub fn transition_message( transition: &Transition, player: &PlaybackController ) -> Option<String> {
    let title = || player.current().map( |t| format!( "{} - {}", t.title, t.artist ) ).unwrap_or_default();

    match transition {
        Transition::Started { .. } => Some( format!( "Now playing: {}", title() ) ),
        Transition::Restarted { .. } => Some( format!( "Repeating: {}", title() ) ),
        Transition::Toggled { playing: true } => Some( format!( "Resumed: {}", title() ) ),
        Transition::Toggled { playing: false } => Some( "Paused".to_string() ),
        Transition::Stopped => Some( "End of playlist".to_string() ),
        Transition::Busy => Some( "Still loading, try again".to_string() ),
        Transition::Unchanged => None,
    }
}


/// Prints the now-playing bar.
pub fn print_now_playing( palette: &Palette, player: &PlaybackController ) {
    let Some( track ) = player.current() else {
        return;
    };

    println!(
        "{} {} {}",
        palette.accent( if player.is_playing() { "PLAYING" } else { "PAUSED" } ),
        palette.main( &format!( "{} - {}", track.title, track.artist ) ),
        palette.dim( &format!(
            "shuffle={} repeat={}",
            if player.shuffle() { "on" } else { "off" },
            player.repeat(),
        )),
    );
    println!( "  {}", palette.dim( &track.direct_url ) );
}


/// Prints the admin banner. Idle and loading print nothing.
pub fn print_status( palette: &Palette, status: &AdminStatus ) {
    match status {
        AdminStatus::Success( msg ) => println!( "{}", palette.accent( msg ) ),
        AdminStatus::Error( msg ) => println!( "{}", msg.as_str().red().bold() ),
        AdminStatus::Loading | AdminStatus::Idle => {}
    }
}


/// Prints the footer settings: socials, studio and custom links.
pub fn print_settings( palette: &Palette, settings: &SiteSettings ) {
    println!( "{}", palette.accent( "Site Settings" ) );
    println!( "  base theme: {}", settings.base_theme );
    for ( network, url ) in settings.social_links() {
        println!( "  {:<10} {}", network, palette.dim( &url ) );
    }
    if let Some( studio ) = settings.studio_link() {
        println!( "  {:<10} {}", "studio", palette.dim( &studio ) );
    }
    for link in &settings.custom_links {
        println!( "  [{}] {} {}", link.id, link.label, palette.dim( &link.url ) );
    }
    println!( "  {}", palette.dim( &settings.copyright_text ) );
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_hex_color() {
        assert_eq!( hex_color( "#10b981" ), Some( Color::Rgb { r: 0x10, g: 0xb9, b: 0x81 } ) );
        assert_eq!( hex_color( "#ffffff99" ), Some( Color::Rgb { r: 255, g: 255, b: 255 } ) );
        assert_eq!( hex_color( "10b981" ), None );
        assert_eq!( hex_color( "#12" ), None );
        assert_eq!( hex_color( "#zzzzzz" ), None );
    }
}
