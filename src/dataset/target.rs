// src/dataset/target.rs
//! Target-column inference
//!
//! Resolves the label column from an optional user request plus
//! heuristics, in a fixed priority order:
//!
//! 1. exact match on the requested name
//! 2. match after name normalization
//! 3. a fixed synonym list (label, target, class, species, y)
//! 4. the last non-numeric column
//! 5. the last column with few distinct values
//!
//! Each resolution carries a note recording which rule fired.

use std::collections::HashMap;

use tracing::info;

use super::table::RawTable;
use super::PrepareError;

/// Synonyms tried, in priority order, against normalized column names
pub const TARGET_SYNONYMS: [&str; 5] = ["label", "target", "class", "species", "y"];

/// Lowercase a name and strip everything outside `[a-z0-9]`
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter_map(|c| {
            let c = c.to_ascii_lowercase();
            c.is_ascii_alphanumeric().then_some(c)
        })
        .collect()
}

/// Outcome of target inference: the column index and a note naming the
/// rule that selected it
#[derive(Debug, Clone)]
pub struct TargetChoice {
    pub column: usize,
    pub note: String,
}

/// Resolve the target column of `table`, honoring `requested` if given
pub fn infer_target(table: &RawTable, requested: Option<&str>) -> Result<TargetChoice, PrepareError> {
    // Later columns win on normalization collisions
    let mut by_norm: HashMap<String, usize> = HashMap::new();
    for (i, col) in table.columns().iter().enumerate() {
        by_norm.insert(normalize_name(&col.name), i);
    }

    if let Some(req) = requested {
        if let Some(i) = table.column_index(req) {
            return Ok(choice(table, i, format!("Using target '{}'.", req)));
        }
        if let Some(&i) = by_norm.get(&normalize_name(req)) {
            return Ok(choice(
                table,
                i,
                format!(
                    "Target '{}' not found; using '{}' (normalized match).",
                    req,
                    table.column(i).name
                ),
            ));
        }
    }

    for syn in TARGET_SYNONYMS {
        if let Some(&i) = by_norm.get(syn) {
            return Ok(choice(
                table,
                i,
                format!("Using '{}' as target (synonym).", table.column(i).name),
            ));
        }
    }

    if let Some(i) = table
        .columns()
        .iter()
        .rposition(|c| !c.is_numeric())
    {
        return Ok(choice(
            table,
            i,
            format!(
                "No target specified; using last non-numeric column '{}'.",
                table.column(i).name
            ),
        ));
    }

    let max_distinct = 50.max((0.2 * table.n_rows() as f64) as usize);
    if let Some(i) = table
        .columns()
        .iter()
        .rposition(|c| c.distinct_count() <= max_distinct)
    {
        return Ok(choice(
            table,
            i,
            format!(
                "No target specified; using low-cardinality column '{}'.",
                table.column(i).name
            ),
        ));
    }

    Err(PrepareError::TargetInference {
        available: table.column_names(),
    })
}

fn choice(table: &RawTable, column: usize, note: String) -> TargetChoice {
    info!(target_column = %table.column(column).name, "{}", note);
    TargetChoice { column, note }
}
