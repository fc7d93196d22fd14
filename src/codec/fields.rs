use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::parse_date;
use crate::vocabulary::VocabularyField;

/// The seven raw filename fields plus the extension.
///
/// Values are kept exactly as they appear in the filename (the extension
/// lower-cased); validation happens in [`super::classify`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedFields {
    pub date: String,
    pub country: String,
    pub group: String,
    pub sent_by: String,
    pub purpose: String,
    pub concept: String,
    pub sent_to: String,
    pub extension: String,
}

impl DecodedFields {
    /// The seven stem fields in filename order.
    pub fn slots(&self) -> [&str; super::FIELD_COUNT] {
        [
            &self.date,
            &self.country,
            &self.group,
            &self.sent_by,
            &self.purpose,
            &self.concept,
            &self.sent_to,
        ]
    }

    /// Raw value of a categorical field. `None` for fields not encoded in the name.
    pub fn get(&self, field: VocabularyField) -> Option<&str> {
        match field {
            VocabularyField::Country => Some(&self.country),
            VocabularyField::Group => Some(&self.group),
            VocabularyField::SentBy => Some(&self.sent_by),
            VocabularyField::Purpose => Some(&self.purpose),
            VocabularyField::SentTo => Some(&self.sent_to),
            VocabularyField::Project => None,
        }
    }

    /// Overwrite a categorical field. Returns `false` if the field has no slot.
    pub fn set(&mut self, field: VocabularyField, value: &str) -> bool {
        let slot = match field {
            VocabularyField::Country => &mut self.country,
            VocabularyField::Group => &mut self.group,
            VocabularyField::SentBy => &mut self.sent_by,
            VocabularyField::Purpose => &mut self.purpose,
            VocabularyField::SentTo => &mut self.sent_to,
            VocabularyField::Project => return false,
        };
        *slot = value.to_string();
        true
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_date(&self.date).ok()
    }

    /// Concept with underscores shown as spaces.
    pub fn concept_text(&self) -> String {
        self.concept.replace('_', " ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_set_by_field() {
        let mut fields = DecodedFields::default();
        assert!(fields.set(VocabularyField::SentBy, "ACME"));
        assert_eq!(fields.get(VocabularyField::SentBy), Some("ACME"));
        assert_eq!(fields.slots()[3], "ACME");

        assert!(!fields.set(VocabularyField::Project, "X"));
        assert_eq!(fields.get(VocabularyField::Project), None);
    }

    #[test]
    fn test_parsed_date_and_concept_text() {
        let fields = DecodedFields {
            date: "20240229".to_string(),
            concept: "annual_tax_report".to_string(),
            ..DecodedFields::default()
        };
        assert_eq!(fields.parsed_date(), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(fields.concept_text(), "annual tax report");

        let bad = DecodedFields {
            date: "20230229".to_string(),
            ..DecodedFields::default()
        };
        assert_eq!(bad.parsed_date(), None);
    }
}
