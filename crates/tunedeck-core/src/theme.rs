//! Themes and the Halal-tab theme override
//!
//! `Theme::styles` is a pure lookup. `ThemeState` tracks which theme is
//! active and whether it is currently forced by the Halal tab, so leaving the
//! tab can put the user's own choice back.

use std::fmt;
use std::str::FromStr;

use serde::{ Deserialize, Serialize };
use thiserror::Error;


#[derive( Debug, Error, PartialEq, Eq )]
#[error( "Unknown theme: {0}" )]
pub struct UnknownTheme( pub String );


/// Selectable UI themes.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize )]
#[serde( rename_all = "SCREAMING_SNAKE_CASE" )]
pub enum Theme {
    #[default]
    DarkLiquid,
    SakuraLiquid,
    NeonLiquid,
    PearlLiquid,
    /// Forced while the Halal tab is open.
    PeaceLiquid,
}


/// Glass surface variant used by cards and the player bar.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum Glass {
    Light,
    Dark,
}


/// Style bundle for one theme. Colors are CSS hex strings.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub struct ThemeStyles {
    pub background: &'static str,
    pub text_main: &'static str,
    pub text_secondary: &'static str,
    pub accent: &'static str,
    pub accent_text: &'static str,
    pub border: &'static str,
    pub glass: Glass,
}


impl Theme {
    pub const ALL: [Theme; 5] = [
        Theme::DarkLiquid,
        Theme::SakuraLiquid,
        Theme::NeonLiquid,
        Theme::PearlLiquid,
        Theme::PeaceLiquid,
    ];

    /// Theme the Halal tab switches to.
    pub const HALAL: Theme = Theme::PeaceLiquid;


    /// Storage key, also accepted by `from_str`.
    pub fn key( &self ) -> &'static str {
        match self {
            Theme::DarkLiquid => "DARK_LIQUID",
            Theme::SakuraLiquid => "SAKURA_LIQUID",
            Theme::NeonLiquid => "NEON_LIQUID",
            Theme::PearlLiquid => "PEARL_LIQUID",
            Theme::PeaceLiquid => "PEACE_LIQUID",
        }
    }


    /// Colors and glass variant for this theme.
    pub fn styles( &self ) -> ThemeStyles {
        match self {
            Theme::PeaceLiquid => ThemeStyles {
                background: "#022c22",
                text_main: "#ecfdf5",
                text_secondary: "#a7f3d0",
                accent: "#10b981",
                accent_text: "#ffffff",
                border: "#a7f3d0",
                glass: Glass::Dark,
            },
            Theme::SakuraLiquid => ThemeStyles {
                background: "#1a0510",
                text_main: "#ffffff",
                text_secondary: "#fce7f3",
                accent: "#ec4899",
                accent_text: "#ffffff",
                border: "#fbcfe8",
                glass: Glass::Dark,
            },
            Theme::NeonLiquid => ThemeStyles {
                background: "#050505",
                text_main: "#ecfeff",
                text_secondary: "#22d3ee",
                accent: "#06b6d4",
                accent_text: "#000000",
                border: "#06b6d4",
                glass: Glass::Dark,
            },
            Theme::PearlLiquid => ThemeStyles {
                background: "#f8fafc",
                text_main: "#111827",
                text_secondary: "#4b5563",
                accent: "#111827",
                accent_text: "#ffffff",
                border: "#d1d5db",
                glass: Glass::Light,
            },
            Theme::DarkLiquid => ThemeStyles {
                background: "#0f0720",
                text_main: "#ffffff",
                text_secondary: "#ffffff99",
                accent: "#ffffff",
                accent_text: "#000000",
                border: "#ffffff1a",
                glass: Glass::Dark,
            },
        }
    }
}


impl fmt::Display for Theme {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        f.write_str( self.key() )
    }
}


impl FromStr for Theme {
    type Err = UnknownTheme;


    fn from_str( s: &str ) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase().replace( '-', "_" );
        Theme::ALL.into_iter()
            .find( |t| t.key() == wanted || t.key().trim_end_matches( "_LIQUID" ) == wanted )
            .ok_or_else( || UnknownTheme( s.to_string() ) )
    }
}


/// Active theme, either the user's choice or the Halal override.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum ThemeState {
    Normal { theme: Theme },
    /// The Halal tab is open. `previous` is restored on leaving it and is
    /// `None` when nothing was captured; `shown` differs from the Halal theme
    /// only after a manual switch inside the tab.
    OverriddenForHalal { shown: Theme, previous: Option<Theme> },
}


impl Default for ThemeState {
    fn default() -> Self {
        ThemeState::Normal { theme: Theme::default() }
    }
}


impl ThemeState {
    /// Starts in the user's theme with no override.
    pub fn new( theme: Theme ) -> Self {
        ThemeState::Normal { theme }
    }


    /// The theme currently on screen.
    pub fn theme( &self ) -> Theme {
        match self {
            ThemeState::Normal { theme } => *theme,
            ThemeState::OverriddenForHalal { shown, .. } => *shown,
        }
    }


    /// Theme captured when the override started, if still held.
    pub fn previous( &self ) -> Option<Theme> {
        match self {
            ThemeState::Normal { .. } => None,
            ThemeState::OverriddenForHalal { previous, .. } => *previous,
        }
    }


    /// True while the Halal tab override is active.
    pub fn is_overridden( &self ) -> bool {
        matches!( self, ThemeState::OverriddenForHalal { .. } )
    }


    /// Transition for opening the Halal tab.
    pub fn enter_halal( self ) -> Self {
        match self {
            ThemeState::Normal { theme } => ThemeState::OverriddenForHalal {
                shown: Theme::HALAL,
                previous: ( theme != Theme::HALAL ).then_some( theme ),
            },
            overridden => overridden,
        }
    }


    /// Transition for leaving the Halal tab. Without a captured theme the
    /// default theme is used.
    pub fn leave_halal( self ) -> Self {
        match self {
            ThemeState::OverriddenForHalal { previous, .. } => ThemeState::Normal {
                theme: previous.unwrap_or_default(),
            },
            normal => normal,
        }
    }


    /// A manual switch shows `theme` right away and drops any captured theme.
    pub fn switch( self, theme: Theme ) -> Self {
        match self {
            ThemeState::Normal { .. } => ThemeState::Normal { theme },
            ThemeState::OverriddenForHalal { .. } => ThemeState::OverriddenForHalal {
                shown: theme,
                previous: None,
            },
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_parse_theme() {
        assert_eq!( "dark_liquid".parse::<Theme>().unwrap(), Theme::DarkLiquid );
        assert_eq!( "neon".parse::<Theme>().unwrap(), Theme::NeonLiquid );
        assert_eq!( "sakura-liquid".parse::<Theme>().unwrap(), Theme::SakuraLiquid );
        assert!( "plaid".parse::<Theme>().is_err() );
    }


    #[test]
    fn test_only_pearl_is_light() {
        for theme in Theme::ALL {
            let light = theme.styles().glass == Glass::Light;
            assert_eq!( light, theme == Theme::PearlLiquid );
        }
    }


    #[test]
    fn test_enter_and_leave_restores() {
        let state = ThemeState::new( Theme::NeonLiquid ).enter_halal();
        assert_eq!( state.theme(), Theme::PeaceLiquid );
        assert_eq!( state.previous(), Some( Theme::NeonLiquid ) );

        let state = state.leave_halal();
        assert_eq!( state, ThemeState::Normal { theme: Theme::NeonLiquid } );
    }


    #[test]
    fn test_leave_without_capture_falls_back() {
        let state = ThemeState::new( Theme::PeaceLiquid ).enter_halal();
        assert_eq!( state.previous(), None );
        assert_eq!( state.leave_halal().theme(), Theme::DarkLiquid );
    }


    #[test]
    fn test_manual_switch_drops_capture() {
        let state = ThemeState::new( Theme::SakuraLiquid )
            .enter_halal()
            .switch( Theme::PearlLiquid );
        assert_eq!( state.theme(), Theme::PearlLiquid );
        assert_eq!( state.previous(), None );
        assert_eq!( state.leave_halal().theme(), Theme::DarkLiquid );
    }


    #[test]
    fn test_manual_switch_outside_tab() {
        let state = ThemeState::new( Theme::SakuraLiquid ).switch( Theme::NeonLiquid );
        assert_eq!( state, ThemeState::Normal { theme: Theme::NeonLiquid } );
        assert_eq!( state.leave_halal(), state );
    }


    #[test]
    fn test_reentering_keeps_capture() {
        let state = ThemeState::new( Theme::SakuraLiquid ).enter_halal().enter_halal();
        assert_eq!( state.previous(), Some( Theme::SakuraLiquid ) );
    }
}
