//! Vocabulary catalog commands.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::VocabAction;
use crate::repository::Repository;
use crate::vocabulary::{KeyStatus, VocabularyField};

#[derive(Serialize)]
struct Entry<'a> {
    field: VocabularyField,
    key: &'a str,
    description: &'a str,
    used: bool,
}

fn parse_field(name: &str) -> Result<VocabularyField> {
    name.parse::<VocabularyField>().with_context(|| {
        let known: Vec<&str> = VocabularyField::ALL.iter().map(|f| f.name()).collect();
        format!("Known fields: {}", known.join(", "))
    })
}

pub fn run(repository: &mut Repository, action: VocabAction) -> Result<()> {
    match action {
        VocabAction::List { field, used, json } => {
            let fields = match field {
                Some(name) => vec![parse_field(&name)?],
                None => VocabularyField::ALL.to_vec(),
            };
            run_list(repository, &fields, used, json)
        }
        VocabAction::Add {
            field,
            key,
            description,
            used,
        } => {
            let field = parse_field(&field)?;
            let description = description.unwrap_or_else(|| key.clone());
            if !used || repository.vocabulary().status(field, &key) == KeyStatus::Unknown {
                repository.add_available(field, &key, &description)?;
            }
            if used {
                repository.add_used(field, &key, &description)?;
            }
            println!("Added {field}:{key}{}", if used { " (used)" } else { "" });
            Ok(())
        }
        VocabAction::Remove { field, key, used } => {
            let field = parse_field(&field)?;
            let result = if used {
                repository.remove_used(field, &key)
            } else {
                repository.remove_available(field, &key)
            };
            if result.is_err() {
                let (_, documents) = repository.field_used(field, &key);
                for document in documents {
                    eprintln!("  referenced by {}", document.name);
                }
            }
            result.with_context(|| format!("Cannot remove {field}:{key}"))?;
            println!("Removed {field}:{key}");
            Ok(())
        }
    }
}

fn run_list(repository: &Repository, fields: &[VocabularyField], used_only: bool, json: bool) -> Result<()> {
    let vocabulary = repository.vocabulary();
    let mut entries = Vec::new();
    for &field in fields {
        let catalog = if used_only {
            vocabulary.load_used(field)
        } else {
            vocabulary.load_available(field)
        };
        entries.extend(catalog.iter().map(|(key, description)| Entry {
            field,
            key,
            description,
            used: vocabulary.exists_used(field, key),
        }));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        let marker = if entry.used { '*' } else { ' ' };
        println!("{marker} {:<8} {:<10} {}", entry.field.name(), entry.key, entry.description);
    }
    eprintln!("{} entries (* = used in this repository)", entries.len());
    Ok(())
}
