use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info};

use crate::annotation::{AnnotationSet, join_annotations};
use crate::domain::Dataset;
use crate::error::FetchError;
use crate::filter::compile_patterns;
use crate::metaspace::MetaspaceClient;
use crate::table::{DatasetTable, normalize};

/// Keeps the datasets with at least one annotated ion matching a pattern.
///
/// Annotations are joined first when the table does not carry them yet.
/// When nothing matches, the (joined) input table is returned as is rather
/// than an empty table, unlike the metadata stages.
pub fn filter_by_molecule<C>(
    client: &C,
    table: DatasetTable,
    patterns: &[String],
) -> Result<DatasetTable, FetchError>
where
    C: MetaspaceClient + ?Sized,
{
    let patterns = compile_patterns(patterns)?;
    let table = if table.has_molecules() || table.is_empty() {
        table
    } else {
        join_annotations(client, table)?
    };

    let matched: Vec<Arc<Dataset>> = table
        .records()
        .iter()
        .filter(|record| {
            record
                .molecules
                .as_ref()
                .is_some_and(|set| first_match(set, &patterns).is_some())
        })
        .map(|record| Arc::clone(&record.dataset))
        .collect();

    if matched.is_empty() {
        info!(rows = table.len(), "no dataset matched molecule patterns");
        return Ok(table);
    }
    info!(matched = matched.len(), "datasets matched molecule patterns");
    join_annotations(client, normalize(matched))
}

/// First ion in `set` that any of `patterns` finds a match in.
///
/// Databases are scanned in order, ions in row order, and patterns in the
/// order given for each ion.
pub fn first_match<'a>(set: &'a AnnotationSet, patterns: &[Regex]) -> Option<&'a str> {
    for results in set {
        for ion in results.ions() {
            if let Some(pattern) = patterns.iter().find(|pattern| pattern.is_match(ion)) {
                debug!(ion, pattern = pattern.as_str(), "molecule match");
                return Some(ion);
            }
        }
    }
    None
}
