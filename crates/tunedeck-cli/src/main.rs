//! Tunedeck CLI - Terminal front-end for the S-71 music portal

mod cli;
mod render;

use std::io::{ self, Write };
use std::sync::Arc;
use std::time::Instant;

use anyhow::{ anyhow, Context, Result };
use clap::Parser;
use tokio::io::{ AsyncBufReadExt, BufReader, Lines, Stdin };
use tracing_subscriber::EnvFilter;

use cli::Args;
use render::Palette;

use tunedeck_core::{
    command::{ self, Command },
    filter,
    AdminStatus, Confirmation, Credentials, MemoryBackend, Session, SessionOptions, Track, Transition,
};


type Input = Lines<BufReader<Stdin>>;


/// Application state.
struct App {
    session: Session,
    should_quit: bool,
    last_status: AdminStatus,
}


impl App {
    /// Creates a new App instance.
    fn new( args: &Args ) -> Result<Self> {
        let backend = match &args.catalog {
            Some( path ) => MemoryBackend::load( path )
                .with_context( || format!( "Failed to load catalog {}", path.display() ) )?,
            None => MemoryBackend::new(),
        };

        let session = Session::new( Arc::new( backend ), SessionOptions {
            fragment: args.fragment.clone(),
            preferences_path: args.preferences_path(),
            rng: None,
        });

        Ok( Self {
            session,
            should_quit: false,
            last_status: AdminStatus::Idle,
        })
    }


    fn palette( &self ) -> Palette {
        Palette::from_styles( &self.session.styles() )
    }


    fn set_status( &self, msg: impl AsRef<str> ) {
        println!( "{}", self.palette().dim( msg.as_ref() ) );
    }


    /// Picks up backend pushes and expired banners, and prints new admin status.
    fn tick( &mut self ) {
        self.session.sync();
        self.session.tick( Instant::now() );

        let status = self.session.admin().status().clone();
        if status != self.last_status {
            render::print_status( &self.palette(), &status );
            self.last_status = status;
        }
    }


    /// Reports a transition on the status line.
    fn on_transition( &self, transition: Transition ) {
        if let Some( msg ) = render::transition_message( &transition, self.session.player() ) {
            self.set_status( msg );
        }
    }


    fn track_at( &self, position: usize ) -> Result<Track> {
        self.session.visible_tracks()
            .into_iter()
            .nth( position )
            .ok_or_else( || anyhow!( "No track at position {}", position + 1 ) )
    }


    async fn execute_command( &mut self, input: &str, lines: &mut Input ) {
        match Command::parse( input ) {
            Ok( cmd ) => {
                if let Err( e ) = self.run_command( cmd, lines ).await {
                    self.set_status( format!( "Error: {}", e ) );
                }
            }
            Err( e ) => {
                self.set_status( format!( "{}", e ) );
            }
        }
    }


    async fn run_command( &mut self, cmd: Command, lines: &mut Input ) -> Result<()> {
        match cmd {
            Command::List => {
                let tracks = self.session.visible_tracks();
                render::print_tracks( &self.palette(), &tracks, self.session.filter(), self.session.player() );
            }
            Command::Tab { tab } => {
                self.session.set_tab( tab );
                let note = if self.session.theme_state().is_overridden() { ", Halal override" } else { "" };
                self.set_status( format!( "Tab: {} (theme {}{})", tab, self.session.theme(), note ) );
            }
            Command::Genre { genre } => {
                let choices = filter::genre_choices( self.session.filter().tab );
                let chosen = choices.iter()
                    .find( |g| g.eq_ignore_ascii_case( &genre ) )
                    .ok_or_else( || anyhow!( "Unknown genre '{}'. Choices: {}", genre, choices.join( ", " ) ) )?;
                self.session.set_genre( chosen );
                self.set_status( format!( "Genre: {}", chosen ) );
            }
            Command::Search { term } => {
                self.session.set_search( &term );
                let count = self.session.visible_tracks().len();
                self.set_status( format!( "{} tracks match", count ) );
            }
            Command::Sort { sort } => {
                self.session.set_sort( sort );
                self.set_status( format!( "Sorted by {}", sort.label() ) );
            }
            Command::Theme { theme } => {
                self.session.switch_theme( theme );
                self.set_status( format!( "Theme: {}", theme ) );
            }
            Command::Go { fragment } => {
                let route = self.session.navigate( &fragment ).clone();
                self.set_status( format!( "Now at {}", route.fragment() ) );
                if route.is_admin() && !self.session.admin().is_signed_in() {
                    self.set_status( "Admin Login: /login <email> <password>" );
                }
            }
            Command::Share { position } => {
                let track = self.track_at( position )?;
                self.set_status( format!( "Share: {}", track.share_fragment() ) );
            }

            Command::Play { position } => {
                let transition = match ( position, self.session.player().current().cloned() ) {
                    ( Some( index ), _ ) => {
                        let track = self.track_at( index )?;
                        self.session.select( &track )
                    }
                    ( None, Some( current ) ) => self.session.select( &current ),
                    ( None, None ) => {
                        self.session.select_index( 0 ).ok_or_else( || anyhow!( "No tracks to play" ) )?
                    }
                };
                self.on_transition( transition );
            }
            Command::Pause => {
                self.session.player_mut().set_playing( false );
                self.set_status( "Paused" );
            }
            Command::Next => {
                let transition = self.session.next();
                self.on_transition( transition );
            }
            Command::Prev => {
                let transition = self.session.prev();
                self.on_transition( transition );
            }
            Command::End => {
                let transition = self.session.track_ended().await;
                self.on_transition( transition );
            }
            Command::Shuffle => {
                let on = self.session.toggle_shuffle();
                self.set_status( format!( "Shuffle {}", if on { "on" } else { "off" } ) );
            }
            Command::Repeat { mode } => {
                let mode = match mode {
                    Some( mode ) => {
                        self.session.player_mut().set_repeat( mode );
                        mode
                    }
                    None => self.session.toggle_repeat(),
                };
                self.set_status( format!( "Repeat: {}", mode ) );
            }

            Command::Login { email, password } => {
                let user = self.session.admin_mut().sign_in( Credentials::new( email, password ) ).await?;
                let msg = format!( "Signed in as {}", user.email );
                self.set_status( msg );
            }
            Command::Logout => {
                self.session.admin_mut().sign_out().await?;
                self.set_status( "Signed out" );
            }
            Command::Add { draft } => {
                let id = self.session.admin_mut().create_track( draft ).await?;
                tracing::debug!( "Created track {}", id );
            }
            Command::Pin { position } => {
                let track = self.track_at( position )?;
                self.session.admin_mut().toggle_pin( &track ).await?;
            }
            Command::Delete { position } => {
                if !self.session.admin().is_signed_in() {
                    return Err( anyhow!( "Sign in first: /login <email> <password>" ) );
                }
                let track = self.track_at( position )?;
                let confirmation = confirm( &format!( "Delete '{}'?", track.title ), lines ).await?;
                if !self.session.admin_mut().delete_track( &track.id, confirmation ).await? {
                    self.set_status( "Delete cancelled" );
                }
            }
            Command::Settings => {
                render::print_settings( &self.palette(), &self.session.settings() );
            }
            Command::Link { label, url } => {
                let mut settings = self.session.settings();
                settings.add_custom_link( &label, &url )?;
                self.session.admin_mut().save_settings( settings ).await?;
            }
            Command::Unlink { id } => {
                let mut settings = self.session.settings();
                if !settings.remove_custom_link( &id ) {
                    return Err( anyhow!( "No link with id {}", id ) );
                }
                self.session.admin_mut().save_settings( settings ).await?;
            }
            Command::BaseTheme { theme } => {
                let mut settings = self.session.settings();
                settings.base_theme = theme;
                self.session.admin_mut().save_settings( settings ).await?;
            }

            Command::Help => {
                println!( "{}", command::help_text() );
            }
            Command::Quit => {
                self.should_quit = true;
            }
        }

        Ok(())
    }
}


/// Asks a yes/no question on stdin. Anything but `y` declines.
async fn confirm( question: &str, lines: &mut Input ) -> Result<Confirmation> {
    print!( "{} [y/N] ", question );
    io::stdout().flush()?;

    let answer = lines.next_line().await?.unwrap_or_default();
    Ok( match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Confirmation::Confirmed,
        _ => Confirmation::Declined,
    })
}


fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else( |_| EnvFilter::new( "tunedeck=info,tunedeck_core=info" ) );

    tracing_subscriber::fmt()
        .with_env_filter( filter )
        .with_writer( io::stderr )
        .init();
}


#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let mut app = App::new( &args )?;

    render::print_splash( &app.palette() );
    Session::splash().await;

    app.tick();
    render::print_now_playing( &app.palette(), app.session.player() );
    app.set_status( "Type /help for commands" );

    let mut lines = BufReader::new( tokio::io::stdin() ).lines();

    // Main loop
    loop {
        print!( "{} ", app.palette().accent( "tunedeck>" ) );
        io::stdout().flush()?;

        let Some( line ) = lines.next_line().await? else {
            break;
        };

        let input = line.trim();
        if !input.is_empty() {
            app.execute_command( input.strip_prefix( '/' ).unwrap_or( input ), &mut lines ).await;
        }
        app.tick();

        if app.should_quit {
            break;
        }
    }

    app.session.shutdown();
    Ok(())
}


#[cfg( test )]
mod tests {
    use super::*;


    fn demo_app() -> App {
        let catalog = concat!( env!( "CARGO_MANIFEST_DIR" ), "/../../demos/catalog.json" );
        let config_dir = std::env::temp_dir().join( format!( "tunedeck-cli-{}", std::process::id() ) );
        let args = Args::parse_from([
            "tunedeck",
            "--catalog", catalog,
            "--config-dir", config_dir.to_str().unwrap(),
        ]);

        let mut app = App::new( &args ).unwrap();
        app.tick();
        app
    }


    #[tokio::test]
    async fn test_delete_signed_out_fails_before_confirmation() {
        let mut app = demo_app();
        let mut lines = BufReader::new( tokio::io::stdin() ).lines();
        let before = app.session.visible_tracks().len();
        assert!( before > 0 );

        let err = app.run_command( Command::Delete { position: 0 }, &mut lines ).await.unwrap_err();
        assert!( err.to_string().contains( "Sign in first" ) );
        assert_eq!( app.session.visible_tracks().len(), before );
    }


    #[tokio::test]
    async fn test_play_leaves_no_loading_state() {
        let mut app = demo_app();
        let mut lines = BufReader::new( tokio::io::stdin() ).lines();

        app.run_command( Command::Play { position: Some( 0 ) }, &mut lines ).await.unwrap();
        assert!( app.session.player().is_playing() );
        assert!( !app.session.player().is_loading() );

        app.run_command( Command::Next, &mut lines ).await.unwrap();
        assert!( !app.session.player().is_loading() );
    }
}
