#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Value, json};

use metaspace_fetch::annotation::{AnnotationRow, ResultTable};
use metaspace_fetch::domain::{
    DatabaseReference, Dataset, DownloadFile, DownloadLinks, SearchCriteria,
};
use metaspace_fetch::error::FetchError;
use metaspace_fetch::metaspace::MetaspaceClient;

pub fn dataset(id: &str, info: Value) -> Dataset {
    Dataset::new(id, format!("name-{id}"), vec!["+H".to_string()], info, json!({}))
}

pub fn dataset_with_adducts(id: &str, adducts: &[&str]) -> Dataset {
    Dataset::new(
        id,
        format!("name-{id}"),
        adducts.iter().map(|a| a.to_string()).collect(),
        json!({}),
        json!({}),
    )
}

pub fn dataset_with_metadata(id: &str, metadata: Value) -> Dataset {
    Dataset::new(id, format!("name-{id}"), vec!["+H".to_string()], json!({}), metadata)
}

pub fn hmdb() -> DatabaseReference {
    DatabaseReference::new("HMDB", "v4")
}

pub fn row(ion: &str) -> AnnotationRow {
    AnnotationRow {
        ion: ion.to_string(),
        formula: String::new(),
        adduct: String::new(),
        mz: 0.0,
        msm: 0.0,
        fdr: 0.1,
        molecule_names: Vec::new(),
    }
}

/// In-memory METASPACE stand-in that records every request.
#[derive(Default)]
pub struct MockClient {
    pub catalog: Vec<Dataset>,
    /// Ions keyed by (dataset id, database name).
    pub ions: HashMap<(String, String), Vec<String>>,
    pub fail_results_for: Option<String>,
    pub calls: Mutex<Vec<String>>,
}

impl MockClient {
    pub fn with_catalog(catalog: Vec<Dataset>) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    pub fn ions(mut self, dataset: &str, database: &str, ions: &[&str]) -> Self {
        self.ions.insert(
            (dataset.to_string(), database.to_string()),
            ions.iter().map(|ion| ion.to_string()).collect(),
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn result_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with("results:"))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MetaspaceClient for MockClient {
    fn datasets(&self, criteria: &SearchCriteria) -> Result<Vec<Dataset>, FetchError> {
        self.record("datasets".to_string());
        Ok(self
            .catalog
            .iter()
            .filter(|dataset| {
                criteria.dataset_ids.is_empty()
                    || criteria.dataset_ids.iter().any(|id| id == dataset.id())
            })
            .cloned()
            .collect())
    }

    fn results(
        &self,
        dataset: &Dataset,
        database: &DatabaseReference,
        _fdr: f64,
    ) -> Result<ResultTable, FetchError> {
        self.record(format!("results:{}:{}", dataset.id(), database.name));
        if self.fail_results_for.as_deref() == Some(dataset.id()) {
            return Err(FetchError::MetaspaceStatus {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }
        let rows: Vec<AnnotationRow> = self
            .ions
            .get(&(dataset.id().to_string(), database.name.clone()))
            .map(|ions| ions.iter().map(|ion| row(ion)).collect())
            .unwrap_or_default();
        Ok(ResultTable::new(rows))
    }

    fn download_links(&self, dataset: &Dataset) -> Result<DownloadLinks, FetchError> {
        self.record(format!("links:{}", dataset.id()));
        Ok(DownloadLinks {
            contributors: Vec::new(),
            license: None,
            files: vec![DownloadFile {
                filename: format!("{}.imzML", dataset.id()),
                link: format!("https://example.org/{}.imzML", dataset.id()),
            }],
        })
    }

    fn download_to_dir(
        &self,
        dataset: &Dataset,
        destination: &Utf8Path,
    ) -> Result<Vec<Utf8PathBuf>, FetchError> {
        self.record(format!("download:{}", dataset.id()));
        let path = destination.join(format!("{}.imzML", dataset.id()));
        fs::write(path.as_std_path(), b"imzML")
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        Ok(vec![path])
    }
}
