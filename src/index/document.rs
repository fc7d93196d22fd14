use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;

use crate::codec::{self, CodecError, DecodedFields};
use crate::vocabulary::{VocabularyField, VocabularyStore};

use super::descriptions::DescriptionCache;

/// One file in the repository, keyed by its filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub name: String,
    pub path: PathBuf,
    /// `None` when the name does not split into seven fields plus extension.
    pub fields: Option<DecodedFields>,
    /// Reasons the document is inactive; empty for active documents.
    pub issues: Vec<CodecError>,
    pub active: bool,
    pub date_label: String,
    pub labels: BTreeMap<VocabularyField, String>,
    #[serde(skip)]
    search_text: String,
}

impl Document {
    pub(crate) fn new(
        name: String,
        path: PathBuf,
        vocabulary: &VocabularyStore,
        descriptions: &mut DescriptionCache,
    ) -> Self {
        let (fields, issues) = match codec::split(&name) {
            Ok(fields) => (Some(fields), Vec::new()),
            Err(e) => (None, vec![e]),
        };

        let mut document = Self {
            name,
            path,
            fields,
            issues,
            active: false,
            date_label: String::new(),
            labels: BTreeMap::new(),
            search_text: String::new(),
        };
        document.classify(vocabulary, descriptions);
        document
    }

    /// Recompute activity, labels and search text against the vocabulary.
    pub(crate) fn classify(&mut self, vocabulary: &VocabularyStore, descriptions: &mut DescriptionCache) {
        self.labels.clear();

        let Some(fields) = &self.fields else {
            self.active = false;
            self.date_label.clear();
            self.search_text = self.name.to_lowercase();
            return;
        };

        self.issues = codec::classify(fields, vocabulary);
        self.active = self.issues.is_empty();
        self.date_label = descriptions.describe_date(&fields.date);

        for field in VocabularyField::CATEGORICAL {
            let key = fields.get(field).unwrap_or_default();
            if !key.is_empty() {
                let label = descriptions.describe(field, key, vocabulary);
                self.labels.insert(field, label);
            }
        }

        let concept = fields.concept_text();
        let mut parts: Vec<&str> = vec![self.name.as_str(), self.date_label.as_str()];
        parts.extend(fields.slots());
        parts.extend(self.labels.values().map(String::as_str));
        parts.push(&concept);
        self.search_text = parts.join(" ").to_lowercase();
    }

    pub fn is_valid(&self) -> bool {
        self.fields.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Raw value of a categorical field; empty for invalid documents.
    pub fn field(&self, field: VocabularyField) -> &str {
        self.fields
            .as_ref()
            .and_then(|fields| fields.get(field))
            .unwrap_or_default()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.fields.as_ref().and_then(DecodedFields::parsed_date)
    }

    pub fn references(&self, field: VocabularyField, key: &str) -> bool {
        !key.is_empty() && self.field(field).eq_ignore_ascii_case(key)
    }

    /// Lower-cased composite of the name, raw fields and their descriptions.
    pub fn search_text(&self) -> &str {
        &self.search_text
    }
}
