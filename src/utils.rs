use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Trailing numeric path segment, optionally followed by a slash
    static ref TRAILING_ID: Regex = Regex::new(r"/(\d+)/?$").expect("valid id pattern");
}

const SPRITE_BASE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

/// Extract the numeric id from a catalog resource URL.
///
/// `https://pokeapi.co/api/v2/pokemon/25/` yields `Some(25)`; a URL whose
/// last segment is not a number yields `None`.
pub fn extract_id_from_url(url: &str) -> Option<u32> {
    TRAILING_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Sprite shown when a record carries no sprite URL of its own.
pub fn default_sprite_url(id: u32) -> String {
    format!("{}/{}.png", SPRITE_BASE_URL, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_trailing_id() {
        assert_eq!(
            extract_id_from_url("https://host/api/v2/pokemon/25/"),
            Some(25)
        );
        assert_eq!(
            extract_id_from_url("https://host/api/v2/pokemon/150"),
            Some(150)
        );
    }

    #[test]
    fn non_numeric_segment_has_no_id() {
        assert_eq!(extract_id_from_url("https://host/api/v2/type/fire/"), None);
        assert_eq!(extract_id_from_url(""), None);
        assert_eq!(extract_id_from_url("https://host/api/v2/pokemon/25/extra/"), None);
    }

    #[test]
    fn only_the_last_segment_counts() {
        assert_eq!(extract_id_from_url("https://host/api/v2/pokemon-form/10/"), Some(10));
        assert_eq!(extract_id_from_url("https://host/v2/abc25/"), None);
    }

    #[test]
    fn id_overflow_is_unknown() {
        assert_eq!(extract_id_from_url("https://host/pokemon/99999999999999/"), None);
    }

    #[test]
    fn sprite_fallback() {
        assert_eq!(
            default_sprite_url(25),
            "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/25.png"
        );
    }
}
