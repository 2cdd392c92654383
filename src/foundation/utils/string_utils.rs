use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

fn disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Letters, numbers, underscore only: `\w` would also keep combining marks.
    RE.get_or_init(|| {
        Regex::new(r"[^\p{L}\p{N}_\s-]").expect("slug character class is a valid regex")
    })
}

fn separator_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-\s]+").expect("slug separator class is a valid regex"))
}

/// Turns arbitrary text into a token that is safe as a single path segment.
///
/// With `allow_unicode` set to `false` the text is decomposed (NFKD) and every
/// non-ASCII code point is dropped, so accented letters fold to their base
/// letter and everything else disappears. With `allow_unicode` set to `true`
/// the text is composed (NFKC) and non-ASCII letters are kept.
///
/// The result is lower-cased, stripped of anything that is not a letter, a
/// number, an underscore, whitespace or a hyphen (combining marks included), has runs of whitespace/hyphens collapsed
/// into a single `-`, and is trimmed of leading and trailing `-` and `_`.
/// Text that normalizes to nothing yields an empty string.
///
/// # Examples
///
/// ```
/// use icloud_backup::foundation::utils::slugify;
///
/// assert_eq!(slugify("Family Trip", true), "family-trip");
/// assert_eq!(slugify("Café -- Paris!", false), "cafe-paris");
/// assert_eq!(slugify("Été à Zürich", true), "été-à-zürich");
/// ```
pub fn slugify(value: &str, allow_unicode: bool) -> String {
    let normalized: String = if allow_unicode {
        value.nfkc().collect()
    } else {
        value.nfkd().filter(char::is_ascii).collect()
    };

    let lowered = normalized.to_lowercase();
    let cleaned = disallowed_chars().replace_all(&lowered, "");
    let dashed = separator_runs().replace_all(&cleaned, "-");

    dashed.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Shortens text for a one-line console message without splitting a
/// user-perceived character. An ellipsis is appended when anything was cut.
pub fn truncate_graphemes(text: &str, max: usize) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() <= max {
        return text.to_string();
    }

    let mut short: String = graphemes[..max.saturating_sub(1)].concat();
    short.push('…');
    short
}
