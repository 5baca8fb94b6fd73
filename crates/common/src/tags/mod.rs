//! Tag codec for the bracketed classification labels
//!
//! Classification labels (Rush, Local, CDL, ...) are stored in a single text
//! column on `extra_info` as a run of bracketed tokens, e.g.
//! `[Local][Rush][CDL]`. The brackets are the delimiter AND the guard:
//! membership tests match the exact bracketed token, so `NY` can never match
//! inside `NYC`.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::errors::{AppError, Result};

/// Closed tag vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tag {
    #[serde(rename = "CDL")]
    Cdl,
    Local,
    Rush,
    #[serde(rename = "NY")]
    Ny,
    #[serde(rename = "ILL")]
    Ill,
    #[serde(rename = "Non-Rush")]
    NonRush,
    Sensitive,
    Reserve,
    #[serde(rename = "DVD")]
    Dvd,
}

impl Tag {
    /// Every known tag, in display order
    pub const ALL: [Tag; 9] = [
        Tag::Cdl,
        Tag::Local,
        Tag::Rush,
        Tag::Ny,
        Tag::Ill,
        Tag::NonRush,
        Tag::Sensitive,
        Tag::Reserve,
        Tag::Dvd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Cdl => "CDL",
            Tag::Local => "Local",
            Tag::Rush => "Rush",
            Tag::Ny => "NY",
            Tag::Ill => "ILL",
            Tag::NonRush => "Non-Rush",
            Tag::Sensitive => "Sensitive",
            Tag::Reserve => "Reserve",
            Tag::Dvd => "DVD",
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn shape_regex() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| Regex::new(r"^(\[[^\[\]]*\])+$").expect("valid tag shape regex"))
}

/// Encode an ordered sequence of tags into the stored text form.
///
/// An empty sequence encodes to `"[]"`.
pub fn encode<S: AsRef<str>>(tags: &[S]) -> String {
    let inner = tags
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join("][");
    format!("[{}]", inner)
}

/// Decode a stored tag string back into its token sequence.
///
/// Legacy rows may hold strings that never went through [`encode`]; a shape
/// mismatch is a recoverable [`AppError::MalformedTags`], never a panic.
/// `"[]"` decodes to the empty sequence.
pub fn decode(raw: &str) -> Result<Vec<String>> {
    if raw == "[]" {
        return Ok(Vec::new());
    }
    if !shape_regex().is_match(raw) {
        return Err(AppError::MalformedTags { raw: raw.to_string() });
    }
    let inner = &raw[1..raw.len() - 1];
    Ok(inner.split("][").map(str::to_string).collect())
}

/// Exact bracketed-token membership test.
///
/// This is NOT a plain substring test of `tag`: `has_tag("[NYC]", "NY")` is
/// false because the delimiters are part of the needle.
pub fn has_tag(raw: &str, tag: &str) -> bool {
    raw.contains(&format!("[{}]", tag))
}

/// Decode for presentation: malformed strings degrade to the empty set
/// (logged for operator visibility), and a set CDL flag surfaces a `CDL`
/// tag in the returned sequence without persisting it.
pub fn surface(raw: Option<&str>, cdl_flag: bool) -> Vec<String> {
    let mut tags = match raw {
        None | Some("") => Vec::new(),
        Some(s) => match decode(s) {
            Ok(tags) => tags,
            Err(_) => {
                tracing::warn!(raw = %s, "malformed tag string, treating as empty");
                crate::metrics::record_malformed_tags();
                Vec::new()
            }
        },
    };
    if cdl_flag && !tags.iter().any(|t| t == Tag::Cdl.as_str()) {
        tags.push(Tag::Cdl.as_str().to_string());
    }
    tags
}

/// Append a tag to a stored string, preserving order and skipping duplicates
pub fn append(raw: Option<&str>, tag: Tag) -> Result<String> {
    let mut tags = match raw {
        None | Some("") => Vec::new(),
        Some(s) => decode(s)?,
    };
    if !tags.iter().any(|t| t == tag.as_str()) {
        tags.push(tag.as_str().to_string());
    }
    Ok(encode(&tags))
}

/// Remove a tag from a stored string
pub fn remove(raw: Option<&str>, tag: Tag) -> Result<String> {
    let tags = match raw {
        None | Some("") => Vec::new(),
        Some(s) => decode(s)?,
    };
    let kept: Vec<String> = tags.into_iter().filter(|t| t != tag.as_str()).collect();
    Ok(encode(&kept))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let tags = vec!["Local".to_string(), "Rush".to_string(), "CDL".to_string()];
        assert_eq!(decode(&encode(&tags)).unwrap(), tags);
    }

    #[test]
    fn test_empty_round_trip() {
        let tags: Vec<String> = vec![];
        assert_eq!(encode(&tags), "[]");
        assert_eq!(decode("[]").unwrap(), tags);
    }

    #[test]
    fn test_substring_safety() {
        assert!(!has_tag(&encode(&["NYC"]), "NY"));
        assert!(has_tag(&encode(&["NY"]), "NY"));
        assert!(has_tag(&encode(&["Local", "NY", "Rush"]), "NY"));
    }

    #[test]
    fn test_malformed_is_recoverable() {
        assert!(matches!(
            decode("Rush,Local"),
            Err(AppError::MalformedTags { .. })
        ));
        assert!(matches!(decode("[Rush"), Err(AppError::MalformedTags { .. })));
        assert!(matches!(
            decode("[Ru]sh]"),
            Err(AppError::MalformedTags { .. })
        ));
        assert!(decode("").is_err());
    }

    #[test]
    fn test_surface_enriches_cdl_flag() {
        let tags = surface(Some("[Rush][Local]"), true);
        assert_eq!(tags, vec!["Rush", "Local", "CDL"]);

        // already present: not duplicated
        let tags = surface(Some("[CDL][Rush]"), true);
        assert_eq!(tags, vec!["CDL", "Rush"]);

        // flag off: untouched
        let tags = surface(Some("[Rush]"), false);
        assert_eq!(tags, vec!["Rush"]);
    }

    #[test]
    fn test_surface_malformed_degrades_to_empty() {
        assert_eq!(surface(Some("not-tags"), false), Vec::<String>::new());
        assert_eq!(surface(Some("not-tags"), true), vec!["CDL"]);
        assert_eq!(surface(None, false), Vec::<String>::new());
    }

    #[test]
    fn test_append_and_remove() {
        let s = append(Some("[Rush]"), Tag::Sensitive).unwrap();
        assert_eq!(s, "[Rush][Sensitive]");
        // idempotent
        assert_eq!(append(Some(&s), Tag::Sensitive).unwrap(), s);

        let s = remove(Some("[Rush][CDL][Local]"), Tag::Cdl).unwrap();
        assert_eq!(s, "[Rush][Local]");
        assert_eq!(remove(Some("[CDL]"), Tag::Cdl).unwrap(), "[]");
    }
}
