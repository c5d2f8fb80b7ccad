//! String helpers for search queries, file names and tag values.

use chrono::{Datelike, NaiveDate};

use crate::catalog::TrackRecord;

/// Characters that are not allowed in file names on common filesystems.
const ILLEGAL_PATH_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Quote and dash glyphs that confuse video search; replaced by spaces.
const SEARCH_SEPARATORS: &[char] = &['\u{201C}', '\u{201D}', '"', '\u{2013}', '\u{2014}'];

/// Glyphs that some ID3 readers render as garbage.
const UNSUPPORTED_TAG_CHARS: &[char] = &[
    '\u{27C1}', // ⟁
    '\u{2026}', // …
    '\u{2019}', // ’
    '\u{2018}', // ‘
    '\u{201C}', // “
    '\u{201D}', // ”
    '\u{2013}', // –
    '\u{2014}', // —
    '\u{2022}', // •
    '\u{266A}', // ♪
    '\u{266B}', // ♫
    '\u{2669}', // ♩
    '\u{266C}', // ♬
    '\u{266D}', // ♭
    '\u{266E}', // ♮
];

/// Build the video-search query for a track: "<primary artist> <clean title>",
/// or just the clean title when the track lists no artist.
pub fn build_search_query(track: &TrackRecord) -> String {
    let title = clean_title_for_search(&track.title);
    match track.primary_artist() {
        Some(artist) => format!("{} {}", artist, title),
        None => title,
    }
}

/// Strip parenthesized asides, "feat"/"feat." words and quote/dash glyphs
/// from a track title, then collapse whitespace.
///
/// `"Song Title (feat. Someone) - Remix"` becomes `"Song Title - Remix"`.
pub fn clean_title_for_search(raw: &str) -> String {
    let without_parens = strip_parenthesized(raw);

    let separated: String = without_parens
        .chars()
        .map(|c| if SEARCH_SEPARATORS.contains(&c) { ' ' } else { c })
        .collect();

    let without_feat = strip_feat(&separated);

    without_feat.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove every `(...)` group.  An opening parenthesis without a closing one
/// is kept as-is.
fn strip_parenthesized(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find('(') {
        match rest[open..].find(')') {
            Some(close_rel) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + close_rel + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Remove the standalone word "feat" (any case), with an optional trailing dot.
fn strip_feat(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        let at_boundary = i == 0 || !is_word_char(chars[i - 1]);
        if at_boundary && i + 4 <= chars.len() {
            let word: String = chars[i..i + 4].iter().collect();
            let ends_word = i + 4 == chars.len() || !is_word_char(chars[i + 4]);
            if ends_word && word.eq_ignore_ascii_case("feat") {
                i += 4;
                if i < chars.len() && chars[i] == '.' {
                    i += 1;
                }
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Replace characters that are illegal in file names with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if ILLEGAL_PATH_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Replace typographic glyphs with a plain hyphen before writing tags.
pub fn normalize_tag_text(s: &str) -> String {
    s.chars()
        .map(|c| if UNSUPPORTED_TAG_CHARS.contains(&c) { '-' } else { c })
        .collect()
}

/// Extract the year from a catalog release date.
///
/// Accepts `YYYY`, `YYYY-MM` and `YYYY-MM-DD`.  Returns 0 when the date
/// cannot be parsed; callers treat 0 as "no year".
pub fn extract_year(date: &str) -> u32 {
    let date = date.trim();
    let full = match date.len() {
        4 => format!("{}-01-01", date),
        7 => format!("{}-01", date),
        _ => date.to_string(),
    };
    match NaiveDate::parse_from_str(&full, "%Y-%m-%d") {
        Ok(d) if d.format("%Y-%m-%d").to_string() == full => u32::try_from(d.year()).unwrap_or(0),
        _ => 0,
    }
}
