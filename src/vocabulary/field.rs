//! Categorical metadata axes.
//!
//! Per-field behaviour (filename slot, catalog file names, built-in
//! defaults) lives in one `match` per property rather than in a lookup table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::defaults;
use super::error::VocabularyError;

/// One categorical metadata axis with its own catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VocabularyField {
    Country,
    Group,
    SentBy,
    Purpose,
    SentTo,
    Project,
}

impl VocabularyField {
    /// Every field that owns catalogs.
    pub const ALL: [VocabularyField; 6] = [
        VocabularyField::Country,
        VocabularyField::Group,
        VocabularyField::SentBy,
        VocabularyField::Purpose,
        VocabularyField::SentTo,
        VocabularyField::Project,
    ];

    /// Fields encoded in the canonical filename, in slot order.
    pub const CATEGORICAL: [VocabularyField; 5] = [
        VocabularyField::Country,
        VocabularyField::Group,
        VocabularyField::SentBy,
        VocabularyField::Purpose,
        VocabularyField::SentTo,
    ];

    /// Position in [`VocabularyField::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable lowercase identifier, used for catalog file names.
    pub fn name(self) -> &'static str {
        match self {
            VocabularyField::Country => "country",
            VocabularyField::Group => "group",
            VocabularyField::SentBy => "sentby",
            VocabularyField::Purpose => "purpose",
            VocabularyField::SentTo => "sentto",
            VocabularyField::Project => "project",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            VocabularyField::Country => "Country",
            VocabularyField::Group => "Group",
            VocabularyField::SentBy => "Sent by",
            VocabularyField::Purpose => "Purpose",
            VocabularyField::SentTo => "Sent to",
            VocabularyField::Project => "Project",
        }
    }

    /// Position in the dash-delimited filename, if the field is encoded there.
    pub fn slot(self) -> Option<usize> {
        match self {
            VocabularyField::Country => Some(1),
            VocabularyField::Group => Some(2),
            VocabularyField::SentBy => Some(3),
            VocabularyField::Purpose => Some(4),
            VocabularyField::SentTo => Some(6),
            VocabularyField::Project => None,
        }
    }

    pub fn available_file(self) -> String {
        format!("{}-available.json", self.name())
    }

    pub fn used_file(self) -> String {
        format!("{}-used.json", self.name())
    }

    /// Built-in catalog used to seed a missing `available` file.
    pub fn defaults(self) -> Option<&'static [(&'static str, &'static str)]> {
        match self {
            VocabularyField::Country => Some(defaults::COUNTRIES),
            VocabularyField::Purpose => Some(defaults::PURPOSES),
            VocabularyField::Group
            | VocabularyField::SentBy
            | VocabularyField::SentTo
            | VocabularyField::Project => None,
        }
    }
}

impl fmt::Display for VocabularyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VocabularyField {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();

        VocabularyField::ALL
            .into_iter()
            .find(|field| field.name() == normalized)
            .ok_or_else(|| VocabularyError::UnknownField(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_cover_filename_layout() {
        let slots: Vec<usize> = VocabularyField::CATEGORICAL
            .iter()
            .filter_map(|f| f.slot())
            .collect();
        assert_eq!(slots, vec![1, 2, 3, 4, 6]);
        assert_eq!(VocabularyField::Project.slot(), None);
    }

    #[test]
    fn test_parse_field_names() {
        assert_eq!("country".parse::<VocabularyField>().unwrap(), VocabularyField::Country);
        assert_eq!("Sent_By".parse::<VocabularyField>().unwrap(), VocabularyField::SentBy);
        assert_eq!("sent-to".parse::<VocabularyField>().unwrap(), VocabularyField::SentTo);
        assert!("colour".parse::<VocabularyField>().is_err());
    }

    #[test]
    fn test_catalog_file_names() {
        assert_eq!(VocabularyField::Group.available_file(), "group-available.json");
        assert_eq!(VocabularyField::SentTo.used_file(), "sentto-used.json");
    }
}
