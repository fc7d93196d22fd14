//! Document listing and file commands.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use crate::cli::{EditArgs, ListArgs};
use crate::codec::{self, CodecError};
use crate::index::{DateFilter, Document, FilterState, Selector};
use crate::repository::Repository;
use crate::vocabulary::VocabularyField;

/// Translate list flags into a query.
pub fn filter_state(args: &ListArgs) -> Result<FilterState> {
    let dates = if args.undated {
        DateFilter::Undated
    } else if args.from.is_some() || args.to.is_some() {
        DateFilter::range(args.from.as_deref(), args.to.as_deref())?
    } else {
        DateFilter::All
    };

    let mut state = FilterState::new()
        .with_text(args.text.clone().unwrap_or_default())
        .with_dates(dates)
        .with_review(args.review);

    let selectors = [
        (VocabularyField::Country, &args.country),
        (VocabularyField::Group, &args.group),
        (VocabularyField::SentBy, &args.sent_by),
        (VocabularyField::Purpose, &args.purpose),
        (VocabularyField::SentTo, &args.sent_to),
    ];
    for (field, value) in selectors {
        if let Some(value) = value {
            let Ok(selector) = value.parse::<Selector>();
            state.set_selector(field, selector);
        }
    }
    Ok(state)
}

pub fn run_list(repository: &Repository, args: &ListArgs) -> Result<()> {
    let state = filter_state(args)?;
    let documents = repository.query(&state);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&documents)?);
        return Ok(());
    }

    for document in &documents {
        println!("{}", format_document(document, args.review));
    }

    let index = repository.index();
    eprintln!(
        "{} of {} documents ({} active, {} to review)",
        documents.len(),
        index.len(),
        index.active_count(),
        index.inactive_count()
    );
    Ok(())
}

fn format_document(document: &Document, review: bool) -> String {
    if !review {
        let concept = document
            .fields
            .as_ref()
            .map(|fields| fields.concept_text())
            .unwrap_or_default();
        return format!("{}  {:<12} {}", document.name, document.date_label, concept);
    }

    let issues: Vec<String> = document.issues.iter().map(describe_issue).collect();
    format!("{}\n    {}", document.name, issues.join("\n    "))
}

fn describe_issue(issue: &CodecError) -> String {
    match issue {
        CodecError::UnknownCategoricalValue { field, key } if key.is_empty() => {
            format!("{} is empty", field.label())
        }
        other => other.to_string(),
    }
}

pub fn run_import(repository: &mut Repository, files: &[PathBuf]) -> Result<()> {
    let mut failed = 0;
    for file in files {
        match repository.import(file) {
            Ok(name) => println!("{} -> {name}", file.display()),
            Err(e) => {
                eprintln!("Failed to import {}: {e}", file.display());
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} files could not be imported", files.len());
    }
    Ok(())
}

pub fn run_rename(repository: &mut Repository, from: &str, to: &str) -> Result<()> {
    repository
        .rename(from, to)
        .with_context(|| format!("Failed to rename {from}"))?;
    println!("{from} -> {to}");
    Ok(())
}

pub fn run_edit(repository: &mut Repository, args: &EditArgs) -> Result<()> {
    let document = repository
        .index()
        .get(&args.name)
        .with_context(|| format!("Document not found: {}", args.name))?;
    let Some(mut fields) = document.fields.clone() else {
        bail!(
            "{} does not have seven fields; rename it to a canonical name first",
            args.name
        );
    };

    if let Some(date) = &args.date {
        codec::parse_date(date)?;
        fields.date = date.clone();
    }
    if let Some(concept) = &args.concept {
        fields.concept = codec::valid_key(concept);
    }
    let updates = [
        (VocabularyField::Country, &args.country),
        (VocabularyField::Group, &args.group),
        (VocabularyField::SentBy, &args.sent_by),
        (VocabularyField::Purpose, &args.purpose),
        (VocabularyField::SentTo, &args.sent_to),
    ];
    for (field, value) in updates {
        if let Some(value) = value {
            fields.set(field, value);
        }
    }

    let name = repository
        .rename_fields(&args.name, &fields)
        .with_context(|| format!("Failed to edit {}", args.name))?;
    println!("{} -> {name}", args.name);
    Ok(())
}

pub fn run_delete(repository: &mut Repository, name: &str) -> Result<()> {
    repository
        .delete(name)
        .with_context(|| format!("Failed to delete {name}"))?;
    println!("Deleted {name}");
    Ok(())
}
