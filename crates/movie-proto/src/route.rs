//! Route table — symbolic screens and their navigable path templates.
//!
//! Paths are plain strings so they can be stored in the back stack and the
//! session file. The Detail route carries one argument, the movie id, encoded
//! as a single percent-encoded path segment so arbitrary ids (including ones
//! that look like the placeholder, or contain `/`) survive the round trip.

use crate::error::RouteError;

/// Name of the Detail route's path argument.
pub const ARG_MOVIE_ID: &str = "movieID";

const HOME_TEMPLATE: &str = "homeScreen";
const FAVOURITES_TEMPLATE: &str = "favouriteScreen";
const DETAIL_TEMPLATE: &str = "detailScreen/{movieID}";
const DETAIL_PREFIX: &str = "detailScreen/";

/// Every screen the navigation host knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Favourites,
    Detail,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::Home, Route::Favourites, Route::Detail];

    /// Human title shown in the top bar.
    pub fn title(self) -> &'static str {
        match self {
            Route::Home => "movies",
            Route::Favourites => "favourites",
            Route::Detail => "detail",
        }
    }
}

/// A concrete path resolved against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Home,
    Favourites,
    /// `movie_id` is `None` when the path was navigated without its argument.
    Detail { movie_id: Option<String> },
}

impl Destination {
    pub fn route(&self) -> Route {
        match self {
            Destination::Home => Route::Home,
            Destination::Favourites => Route::Favourites,
            Destination::Detail { .. } => Route::Detail,
        }
    }

    /// Canonical path for this destination.
    pub fn path(&self) -> String {
        match self {
            Destination::Home => HOME_TEMPLATE.to_string(),
            Destination::Favourites => FAVOURITES_TEMPLATE.to_string(),
            Destination::Detail { movie_id: Some(id) } => detail_path(id),
            Destination::Detail { movie_id: None } => DETAIL_PREFIX.to_string(),
        }
    }
}

/// Path template registered for `route`.
pub fn route_for(route: Route) -> &'static str {
    match route {
        Route::Home => HOME_TEMPLATE,
        Route::Favourites => FAVOURITES_TEMPLATE,
        Route::Detail => DETAIL_TEMPLATE,
    }
}

/// Concrete Detail path for `movie_id`.
pub fn detail_path(movie_id: &str) -> String {
    format!("{}{}", DETAIL_PREFIX, encode_segment(movie_id))
}

/// Extract the movie id from a Detail path.
///
/// Returns `None` for non-Detail paths, a missing or empty argument, and
/// segments that are not valid percent-encoded UTF-8. A segment holding a
/// raw byte that `detail_path` would have escaped (such as the `{movieID}`
/// placeholder itself) is not an encoded argument and is also `None`.
pub fn parse_detail_param(path: &str) -> Option<String> {
    let rest = strip_leading_slash(path).strip_prefix(DETAIL_PREFIX)?;
    if rest.is_empty() || rest.contains('/') {
        return None;
    }
    let id = decode_segment(rest)?;
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Resolve an incoming path to a destination.
pub fn match_path(path: &str) -> Result<Destination, RouteError> {
    let trimmed = strip_leading_slash(path);
    if trimmed == HOME_TEMPLATE {
        return Ok(Destination::Home);
    }
    if trimmed == FAVOURITES_TEMPLATE {
        return Ok(Destination::Favourites);
    }
    if trimmed == "detailScreen" || trimmed == DETAIL_PREFIX {
        return Ok(Destination::Detail { movie_id: None });
    }
    if let Some(rest) = trimmed.strip_prefix(DETAIL_PREFIX) {
        if rest.contains('/') {
            return Err(RouteError::UnknownPath(path.to_string()));
        }
        return Ok(Destination::Detail {
            movie_id: parse_detail_param(trimmed),
        });
    }
    Err(RouteError::UnknownPath(path.to_string()))
}

fn strip_leading_slash(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Percent-encode every byte outside the RFC 3986 unreserved set.
fn encode_segment(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len() + 8);
    for &b in s.as_bytes() {
        if is_unreserved(b) {
            out.push(char::from(b));
        } else {
            out.push('%');
            out.push(char::from(HEX[(b >> 4) as usize]));
            out.push(char::from(HEX[(b & 0x0F) as usize]));
        }
    }
    out
}

fn is_unreserved(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~')
}

/// Inverse of `encode_segment`; only unreserved bytes may appear unescaped.
fn decode_segment(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = hex_val(*bytes.get(i + 1)?)?;
            let lo = hex_val(*bytes.get(i + 2)?)?;
            out.push((hi << 4) | lo);
            i += 3;
        } else if is_unreserved(bytes[i]) {
            out.push(bytes[i]);
            i += 1;
        } else {
            return None;
        }
    }
    String::from_utf8(out).ok()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates() {
        assert_eq!(route_for(Route::Home), "homeScreen");
        assert_eq!(route_for(Route::Favourites), "favouriteScreen");
        assert_eq!(route_for(Route::Detail), "detailScreen/{movieID}");
        assert!(route_for(Route::Detail).contains(&format!("{{{}}}", ARG_MOVIE_ID)));
    }

    #[test]
    fn test_route_for_is_pure() {
        for route in Route::ALL {
            let a = route_for(route);
            let b = route_for(route);
            assert_eq!(a, b);
            assert!(std::ptr::eq(a, b));
        }
    }

    #[test]
    fn test_detail_path_plain_id() {
        assert_eq!(detail_path("tt0499549"), "detailScreen/tt0499549");
        assert_eq!(
            parse_detail_param("detailScreen/tt0499549").as_deref(),
            Some("tt0499549")
        );
    }

    #[test]
    fn test_placeholder_id_round_trips() {
        let id = "{movieID}";
        let path = detail_path(id);
        assert_eq!(path, "detailScreen/%7BmovieID%7D");
        assert_eq!(parse_detail_param(&path).as_deref(), Some(id));
    }

    #[test]
    fn test_missing_argument() {
        assert_eq!(parse_detail_param("detailScreen/"), None);
        assert_eq!(parse_detail_param("detailScreen"), None);
        assert_eq!(parse_detail_param("homeScreen"), None);
        assert_eq!(
            match_path("detailScreen").unwrap(),
            Destination::Detail { movie_id: None }
        );
    }

    #[test]
    fn test_bad_encoding_is_absent() {
        assert_eq!(parse_detail_param("detailScreen/%zz"), None);
        assert_eq!(parse_detail_param("detailScreen/%4"), None);
        assert_eq!(parse_detail_param("detailScreen/%FF"), None);
    }

    #[test]
    fn test_unescaped_reserved_bytes_are_absent() {
        assert_eq!(parse_detail_param(DETAIL_TEMPLATE), None);
        assert_eq!(parse_detail_param("detailScreen/a b"), None);
        assert_eq!(parse_detail_param("detailScreen/café"), None);
        assert_eq!(
            match_path(route_for(Route::Detail)).unwrap(),
            Destination::Detail { movie_id: None }
        );
        assert_eq!(
            parse_detail_param("detailScreen/a%20b").as_deref(),
            Some("a b")
        );
    }

    #[test]
    fn test_match_path() {
        assert_eq!(match_path("homeScreen").unwrap(), Destination::Home);
        assert_eq!(match_path("/favouriteScreen").unwrap(), Destination::Favourites);
        assert_eq!(
            match_path("detailScreen/abc").unwrap(),
            Destination::Detail {
                movie_id: Some("abc".to_string())
            }
        );
        assert_eq!(
            match_path("settings"),
            Err(RouteError::UnknownPath("settings".to_string()))
        );
        assert!(match_path("detailScreen/a/b").is_err());
    }

    #[test]
    fn test_destination_path_matches_back() {
        let dests = [
            Destination::Home,
            Destination::Favourites,
            Destination::Detail {
                movie_id: Some("a b/c".to_string()),
            },
            Destination::Detail { movie_id: None },
        ];
        for d in dests {
            assert_eq!(match_path(&d.path()).unwrap(), d);
        }
    }
}
