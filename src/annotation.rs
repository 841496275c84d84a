use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::FetchError;
use crate::metaspace::MetaspaceClient;
use crate::table::DatasetTable;

/// FDR level requested for every annotation fetch.
pub const ANNOTATION_FDR: f64 = 1.0;

/// One annotated ion from a dataset's result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRow {
    pub ion: String,
    #[serde(default)]
    pub formula: String,
    #[serde(default)]
    pub adduct: String,
    #[serde(default)]
    pub mz: f64,
    #[serde(default)]
    pub msm: f64,
    #[serde(default)]
    pub fdr: f64,
    #[serde(default)]
    pub molecule_names: Vec<String>,
}

/// Annotation results of one dataset against one database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultTable {
    rows: Vec<AnnotationRow>,
}

impl ResultTable {
    pub fn new(rows: Vec<AnnotationRow>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[AnnotationRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn ions(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.ion.as_str())
    }
}

/// Per-dataset result tables, index-aligned with the dataset's databases.
pub type AnnotationSet = Vec<ResultTable>;

/// Returns `table` with every record's annotation set populated.
///
/// Datasets are visited in row order and databases in reference order, one
/// request at a time. A failed fetch aborts the whole pass.
pub fn join_annotations<C>(client: &C, table: DatasetTable) -> Result<DatasetTable, FetchError>
where
    C: MetaspaceClient + ?Sized,
{
    info!(rows = table.len(), fdr = ANNOTATION_FDR, "joining annotations");
    let mut records = table.into_records();
    for record in &mut records {
        let databases = record.dataset.database_references();
        let mut set = AnnotationSet::with_capacity(databases.len());
        for database in databases {
            let results = client.results(&record.dataset, database, ANNOTATION_FDR)?;
            debug!(
                dataset = %record.id,
                database = %database,
                rows = results.len(),
                "fetched annotations"
            );
            if results.is_empty() {
                set.push(ResultTable::empty());
            } else {
                set.push(results);
            }
        }
        record.molecules = Some(set);
    }
    Ok(DatasetTable::from_records(records))
}
