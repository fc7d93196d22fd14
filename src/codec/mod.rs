//! Filename codec.
//!
//! A document's metadata lives entirely in its filename:
//!
//! ```text
//! YYYYMMDD-COUNTRY-GROUP-SENTBY-PURPOSE-concept_text-SENTTO.ext
//!    0        1      2      3      4         5          6
//! ```
//!
//! [`split`] checks the structure, [`decode`] additionally requires a real
//! date, and [`classify`] reports every value the repository's vocabulary
//! does not enable. [`normalize`] repairs names that do not have seven
//! fields by moving the whole stem into the concept slot.

mod fields;

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::vocabulary::{VocabularyField, VocabularyStore};

pub use fields::DecodedFields;

/// Number of dash-delimited fields in a canonical stem.
pub const FIELD_COUNT: usize = 7;

pub const DATE_FORMAT: &str = "%Y%m%d";

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{8}$").unwrap_or_else(|e| panic!("invalid date pattern: {e}"))
});

/// Problems found while decoding a filename.
///
/// None of these are fatal: the document is kept and flagged.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CodecError {
    #[error("Filename has no extension")]
    MissingExtension,

    #[error("Expected {} dash-separated fields, found {found}", FIELD_COUNT)]
    WrongFieldCount { found: usize },

    #[error("'{value}' is not a YYYYMMDD date")]
    InvalidDate { value: String },

    #[error("{field} value '{key}' is not enabled in this repository")]
    UnknownCategoricalValue { field: VocabularyField, key: String },
}

/// Split a filename into stem and extension at the last `.`.
///
/// A missing or empty extension yields `None`.
pub fn stem_and_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (filename, None),
    }
}

/// Structural decode: extension present and exactly seven fields.
///
/// Field values are not checked; see [`decode`] and [`classify`].
pub fn split(filename: &str) -> Result<DecodedFields, CodecError> {
    let (stem, extension) = stem_and_extension(filename);
    let extension = extension.ok_or(CodecError::MissingExtension)?;

    let parts: Vec<&str> = stem.split('-').collect();
    if parts.len() != FIELD_COUNT {
        return Err(CodecError::WrongFieldCount { found: parts.len() });
    }

    Ok(DecodedFields {
        date: parts[0].to_string(),
        country: parts[1].to_string(),
        group: parts[2].to_string(),
        sent_by: parts[3].to_string(),
        purpose: parts[4].to_string(),
        concept: parts[5].to_string(),
        sent_to: parts[6].to_string(),
        extension: extension.to_lowercase(),
    })
}

/// Decode a canonical filename, requiring a parseable date.
pub fn decode(filename: &str) -> Result<DecodedFields, CodecError> {
    let fields = split(filename)?;
    parse_date(&fields.date)?;
    Ok(fields)
}

/// Parse a raw `YYYYMMDD` value.
pub fn parse_date(raw: &str) -> Result<NaiveDate, CodecError> {
    let invalid = || CodecError::InvalidDate {
        value: raw.to_string(),
    };
    if !DATE_PATTERN.is_match(raw) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| invalid())
}

/// Every reason the decoded fields keep a document inactive.
///
/// An empty result means the date parses and every categorical value is
/// enabled in the field's `used` catalog.
pub fn classify(fields: &DecodedFields, vocabulary: &VocabularyStore) -> Vec<CodecError> {
    let mut issues = Vec::new();

    if let Err(e) = parse_date(&fields.date) {
        issues.push(e);
    }

    for field in VocabularyField::CATEGORICAL {
        let key = fields.get(field).unwrap_or_default();
        if !vocabulary.exists_used(field, key) {
            issues.push(CodecError::UnknownCategoricalValue {
                field,
                key: key.to_string(),
            });
        }
    }

    issues
}

/// Join the seven fields with `-` and append the lower-cased extension.
pub fn encode(fields: &DecodedFields) -> String {
    let stem = fields.slots().join("-");
    if fields.extension.is_empty() {
        stem
    } else {
        format!("{stem}.{}", fields.extension.to_lowercase())
    }
}

/// Repair a filename that does not have seven fields.
///
/// The sanitized stem becomes the concept and every other slot is left
/// empty. Names that already have seven fields are returned unchanged, so
/// `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(filename: &str) -> String {
    let (stem, extension) = stem_and_extension(filename);
    if stem.split('-').count() == FIELD_COUNT {
        return filename.to_string();
    }

    let mut concept = valid_key(stem);
    if extension.is_none() {
        // A dot would be read back as an extension separator
        concept.retain(|c| c != '.');
    }

    let fields = DecodedFields {
        concept,
        extension: extension.map(str::to_lowercase).unwrap_or_default(),
        ..DecodedFields::default()
    };
    encode(&fields)
}

/// Sanitize free-form text into a filename-safe token.
///
/// Dashes and spaces become underscores; anything outside
/// `[A-Za-z0-9_.]` is dropped.
pub fn valid_key(s: &str) -> String {
    s.chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.'))
        .collect()
}
