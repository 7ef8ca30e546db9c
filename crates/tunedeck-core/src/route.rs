//! Fragment-based routing.

use crate::format;


const ADMIN_FRAGMENT: &str = "#/admin";
const MEDIA_PREFIX: &str = "#/media/";
/// Older share links used this prefix.
const LEGACY_MEDIA_PREFIX: &str = "#/music/";


/// A view selected by the URL fragment.
#[derive( Debug, Clone, PartialEq, Eq, Default )]
pub enum Route {
    #[default]
    Library,
    Admin,
    /// Deep link to a track; renders the library view.
    Media { slug: String },
}


impl Route {
    /// Resolves a fragment such as `#/admin`. Unknown fragments fall back to
    /// the library.
    pub fn from_fragment( fragment: &str ) -> Self {
        let fragment = fragment.trim();

        if fragment == ADMIN_FRAGMENT {
            return Route::Admin;
        }

        let slug = fragment.strip_prefix( MEDIA_PREFIX )
            .or_else( || fragment.strip_prefix( LEGACY_MEDIA_PREFIX ) );

        match slug {
            Some( slug ) if !slug.is_empty() => Route::Media { slug: slug.to_string() },
            _ => Route::Library,
        }
    }


    /// Renders the route back into a fragment.
    pub fn fragment( &self ) -> String {
        match self {
            Route::Library => "#/".to_string(),
            Route::Admin => ADMIN_FRAGMENT.to_string(),
            Route::Media { slug } => format!( "{}{}", MEDIA_PREFIX, slug ),
        }
    }


    /// True for the admin view.
    pub fn is_admin( &self ) -> bool {
        matches!( self, Route::Admin )
    }


    /// Lowercase title text a deep link points at.
    pub fn deep_link_query( &self ) -> Option<String> {
        match self {
            Route::Media { slug } => Some( format::decode_slug( slug ) ).filter( |q| !q.is_empty() ),
            _ => None,
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_admin_route() {
        assert_eq!( Route::from_fragment( "#/admin" ), Route::Admin );
        assert_eq!( Route::from_fragment( "#/admin/extra" ), Route::Library );
    }


    #[test]
    fn test_media_routes() {
        let route = Route::from_fragment( "#/media/Cholna-Sujon" );
        assert_eq!( route, Route::Media { slug: "Cholna-Sujon".into() } );
        assert_eq!( route.deep_link_query().as_deref(), Some( "cholna sujon" ) );
        assert_eq!( route.fragment(), "#/media/Cholna-Sujon" );

        assert_eq!( Route::from_fragment( "#/music/Safar" ), Route::Media { slug: "Safar".into() } );
        assert_eq!( Route::from_fragment( "#/media/" ), Route::Library );
    }


    #[test]
    fn test_everything_else_is_library() {
        for fragment in [ "", "#", "#/", "#/settings", "admin" ] {
            assert_eq!( Route::from_fragment( fragment ), Route::Library, "{}", fragment );
        }
        assert_eq!( Route::Library.deep_link_query(), None );
    }
}
