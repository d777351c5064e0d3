//! Values derived from user input on the write path: URL slugs and excerpts.

use once_cell::sync::Lazy;
use regex::Regex;

/// Number of characters of stripped content kept in an excerpt.
pub const EXCERPT_LENGTH: usize = 150;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Lower-cases `text`, keeps `[a-z0-9 -]`, turns runs of spaces and hyphens
/// into a single hyphen and trims hyphens from both ends.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());

    for c in text.to_lowercase().chars() {
        let c = match c {
            'a'..='z' | '0'..='9' => c,
            ' ' | '-' => '-',
            _ => continue,
        };
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }

    slug.trim_matches('-').to_owned()
}

/// Slug to store for `text`. Text without a single usable character has none.
pub fn derive_slug(text: &str) -> Option<String> {
    Some(slugify(text)).filter(|slug| !slug.is_empty())
}

/// Strips tag-like substrings, keeps the first [`EXCERPT_LENGTH`] characters
/// and appends an ellipsis.
pub fn excerpt_from(content: &str) -> String {
    let stripped = HTML_TAG.replace_all(content, "");
    let head: String = stripped.chars().take(EXCERPT_LENGTH).collect();
    format!("{}...", head.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_from_title() {
        assert_eq!(slugify("New HEPA Filter Launch!"), "new-hepa-filter-launch");
        assert_eq!(slugify("Air Filters"), "air-filters");
    }

    #[test]
    fn test_slug_collapses_and_trims() {
        assert_eq!(slugify("  --Hello   --  World--  "), "hello-world");
        assert_eq!(slugify("a\tb"), "ab");
        assert_eq!(slugify("Café & Crème"), "caf-crme");
    }

    #[test]
    fn test_slug_alphabet_and_determinism() {
        let titles = [
            "Rust 2024: What's New?",
            "---",
            "Ünïcödé ünd Spaß",
            "<b>bold</b> move",
            "  spaced    out  ",
        ];
        for title in titles {
            let slug = slugify(title);
            assert_eq!(slug, slugify(title));
            assert!(slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            assert!(!slug.contains("--"));
        }
    }

    #[test]
    fn test_empty_slug_is_none() {
        assert_eq!(derive_slug("!!!"), None);
        assert_eq!(derive_slug("Ok"), Some("ok".to_owned()));
    }

    #[test]
    fn test_excerpt_strips_tags() {
        assert_eq!(
            excerpt_from("<p>Hello <strong>world</strong></p>"),
            "Hello world..."
        );
    }

    #[test]
    fn test_excerpt_truncates() {
        let content = format!("<div>{}</div>", "x".repeat(400));
        let excerpt = excerpt_from(&content);
        assert_eq!(excerpt.len(), EXCERPT_LENGTH + 3);
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn test_excerpt_counts_characters() {
        let excerpt = excerpt_from(&"é".repeat(200));
        assert_eq!(excerpt.chars().count(), EXCERPT_LENGTH + 3);
    }
}
