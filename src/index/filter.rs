//! Query predicates over the document collection.

use std::str::FromStr;

use chrono::{Local, NaiveDate};
use thiserror::Error;

use super::document::Document;
use crate::codec;
use crate::vocabulary::VocabularyField;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid date bound '{0}': expected YYYYMMDD, 'now' or 'today'")]
    InvalidDateBound(String),

    #[error("Date range is empty: {from} is after {to}")]
    EmptyRange { from: NaiveDate, to: NaiveDate },
}

/// Date constraint of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DateFilter {
    /// Every date passes, parseable or not.
    #[default]
    All,
    /// Only documents whose date does not parse.
    Undated,
    /// Parseable dates within the inclusive bounds. `None` leaves a side open.
    Range {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

impl DateFilter {
    /// Build a range from textual bounds (`YYYYMMDD`, `now`, `today`).
    pub fn range(from: Option<&str>, to: Option<&str>) -> Result<Self, FilterError> {
        let from = from.map(parse_bound).transpose()?;
        let to = to.map(parse_bound).transpose()?;
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(FilterError::EmptyRange { from, to });
            }
        }
        Ok(DateFilter::Range { from, to })
    }

    pub fn matches(&self, date: Option<NaiveDate>) -> bool {
        match self {
            DateFilter::All => true,
            DateFilter::Undated => date.is_none(),
            DateFilter::Range { from, to } => date.is_some_and(|date| {
                from.is_none_or(|from| date >= from) && to.is_none_or(|to| date <= to)
            }),
        }
    }
}

fn parse_bound(raw: &str) -> Result<NaiveDate, FilterError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "now" | "today" => Ok(Local::now().date_naive()),
        trimmed => codec::parse_date(trimmed).map_err(|_| FilterError::InvalidDateBound(raw.to_string())),
    }
}

/// Per-field constraint of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selector {
    #[default]
    Any,
    /// Only documents with an empty value.
    None,
    /// Case-insensitive exact match.
    Key(String),
}

impl Selector {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Selector::Any => true,
            Selector::None => value.is_empty(),
            Selector::Key(key) => value.eq_ignore_ascii_case(key),
        }
    }
}

impl FromStr for Selector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "" | "*" => Selector::Any,
            "-" => Selector::None,
            other if other.eq_ignore_ascii_case("any") => Selector::Any,
            other if other.eq_ignore_ascii_case("none") => Selector::None,
            other => Selector::Key(other.to_string()),
        })
    }
}

/// Complete query state.
///
/// In review mode only inactive documents match and date ranges are not
/// applied; the `Undated` filter still is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub text: String,
    pub dates: DateFilter,
    selectors: [Selector; VocabularyField::CATEGORICAL.len()],
    pub review: bool,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_dates(mut self, dates: DateFilter) -> Self {
        self.dates = dates;
        self
    }

    pub fn with_selector(mut self, field: VocabularyField, selector: Selector) -> Self {
        self.set_selector(field, selector);
        self
    }

    pub fn with_review(mut self, review: bool) -> Self {
        self.review = review;
        self
    }

    /// Fields without a filename slot are ignored.
    pub fn set_selector(&mut self, field: VocabularyField, selector: Selector) {
        if let Some(i) = categorical_index(field) {
            self.selectors[i] = selector;
        }
    }

    pub fn selector(&self, field: VocabularyField) -> &Selector {
        categorical_index(field).map_or(&Selector::Any, |i| &self.selectors[i])
    }

    /// Built-in predicate: text, dates, selectors and active/review state.
    pub fn matches(&self, document: &Document) -> bool {
        if document.is_active() == self.review {
            return false;
        }

        let text = self.text.trim();
        if !text.is_empty() && !document.search_text().contains(&text.to_lowercase()) {
            return false;
        }

        let dates_apply = !self.review || self.dates == DateFilter::Undated;
        if dates_apply && !self.dates.matches(document.date()) {
            return false;
        }

        VocabularyField::CATEGORICAL
            .iter()
            .zip(&self.selectors)
            .all(|(field, selector)| selector.matches(document.field(*field)))
    }
}

fn categorical_index(field: VocabularyField) -> Option<usize> {
    VocabularyField::CATEGORICAL.iter().position(|f| *f == field)
}

/// Extra predicate registered with the index.
///
/// A document is returned by a query only if the built-in predicate and
/// every registered filter accept it.
pub trait DocumentFilter: Send {
    fn name(&self) -> &str;

    fn matches(&self, document: &Document, state: &FilterState) -> bool;
}

/// [`DocumentFilter`] from a closure.
pub struct FnFilter<F> {
    name: String,
    predicate: F,
}

impl<F> FnFilter<F>
where
    F: Fn(&Document, &FilterState) -> bool + Send,
{
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> DocumentFilter for FnFilter<F>
where
    F: Fn(&Document, &FilterState) -> bool + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, document: &Document, state: &FilterState) -> bool {
        (self.predicate)(document, state)
    }
}
