use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::annotation::join_annotations;
use crate::domain::{Dataset, DownloadLinks, SearchCriteria};
use crate::error::FetchError;
use crate::filter::{MetadataFilter, filter_metadata};
use crate::metaspace::MetaspaceClient;
use crate::molecule::filter_by_molecule;
use crate::selection::{Selection, select};
use crate::staging::{DownloadReceipt, Staging};
use crate::table::{DatasetTable, normalize};

#[derive(Debug, Clone, Default)]
pub struct QueryPlan {
    pub search: SearchCriteria,
    pub filter: MetadataFilter,
    pub molecules: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub force: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    pub items: Vec<DownloadItemResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadItemResult {
    pub id: String,
    pub name: String,
    pub action: String,
    pub directory: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<C: MetaspaceClient> {
    client: C,
    staging: Staging,
}

impl<C: MetaspaceClient> App<C> {
    pub fn new(client: C, staging: Staging) -> Self {
        Self { client, staging }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn staging(&self) -> &Staging {
        &self.staging
    }

    pub fn search(
        &self,
        criteria: &SearchCriteria,
        sink: &dyn ProgressSink,
    ) -> Result<DatasetTable, FetchError> {
        sink.event(ProgressEvent {
            message: "phase=Search; querying METASPACE".to_string(),
            elapsed: None,
        });
        let start = Instant::now();
        let datasets = self.client.datasets(criteria)?;
        sink.event(ProgressEvent {
            message: format!("metaspace.response datasets={}", datasets.len()),
            elapsed: Some(start.elapsed()),
        });
        Ok(normalize(datasets))
    }

    pub fn filter_metadata(
        &self,
        table: &DatasetTable,
        filter: &MetadataFilter,
        sink: &dyn ProgressSink,
    ) -> Result<DatasetTable, FetchError> {
        sink.event(ProgressEvent {
            message: format!("phase=Filter; rows={}", table.len()),
            elapsed: None,
        });
        let filtered = filter_metadata(table, filter)?;
        info!(before = table.len(), after = filtered.len(), "metadata filter");
        Ok(filtered)
    }

    pub fn annotate(
        &self,
        table: DatasetTable,
        sink: &dyn ProgressSink,
    ) -> Result<DatasetTable, FetchError> {
        sink.event(ProgressEvent {
            message: format!("phase=Annotate; rows={}", table.len()),
            elapsed: None,
        });
        let start = Instant::now();
        let joined = join_annotations(&self.client, table)?;
        sink.event(ProgressEvent {
            message: "metaspace.annotations joined".to_string(),
            elapsed: Some(start.elapsed()),
        });
        Ok(joined)
    }

    pub fn filter_molecule(
        &self,
        table: DatasetTable,
        patterns: &[String],
        sink: &dyn ProgressSink,
    ) -> Result<DatasetTable, FetchError> {
        sink.event(ProgressEvent {
            message: format!("phase=Molecules; patterns={}", patterns.len()),
            elapsed: None,
        });
        let start = Instant::now();
        let filtered = filter_by_molecule(&self.client, table, patterns)?;
        sink.event(ProgressEvent {
            message: format!("molecule.filter rows={}", filtered.len()),
            elapsed: Some(start.elapsed()),
        });
        Ok(filtered)
    }

    /// Search, then metadata filter, then the molecule filter when patterns
    /// are given.
    pub fn run_query(
        &self,
        plan: &QueryPlan,
        sink: &dyn ProgressSink,
    ) -> Result<DatasetTable, FetchError> {
        let table = self.search(&plan.search, sink)?;
        let table = self.filter_metadata(&table, &plan.filter, sink)?;
        if plan.molecules.is_empty() {
            return Ok(table);
        }
        self.filter_molecule(table, &plan.molecules, sink)
    }

    pub fn find_dataset(&self, id: &str) -> Result<Arc<Dataset>, FetchError> {
        let criteria = SearchCriteria {
            dataset_ids: vec![id.to_string()],
            ..SearchCriteria::default()
        };
        self.client
            .datasets(&criteria)?
            .into_iter()
            .find(|dataset| dataset.id() == id)
            .map(Arc::new)
            .ok_or_else(|| FetchError::DatasetNotFound(id.to_string()))
    }

    pub fn download_links(
        &self,
        id: &str,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadLinks, FetchError> {
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; dataset {id}"),
            elapsed: None,
        });
        let dataset = self.find_dataset(id)?;
        self.client.download_links(&dataset)
    }

    pub fn select(
        &self,
        table: &DatasetTable,
        selection: &Selection,
    ) -> Result<Vec<Arc<Dataset>>, FetchError> {
        select(table, selection)
    }

    pub fn download(
        &self,
        datasets: &[Arc<Dataset>],
        options: &DownloadOptions,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadResult, FetchError> {
        let mut items = Vec::with_capacity(datasets.len());
        for dataset in datasets {
            items.push(self.download_single(dataset, options, sink)?);
        }
        Ok(DownloadResult { items })
    }

    fn download_single(
        &self,
        dataset: &Dataset,
        options: &DownloadOptions,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadItemResult, FetchError> {
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; dataset {}", dataset.id()),
            elapsed: None,
        });
        let directory = self.staging.dataset_dir(dataset.name());

        if !options.force {
            if let Some(receipt) = Staging::read_receipt(&directory)? {
                if receipt.id == dataset.id() {
                    sink.event(ProgressEvent {
                        message: "phase=Store; already staged".to_string(),
                        elapsed: None,
                    });
                    return Ok(DownloadItemResult {
                        id: dataset.id().to_string(),
                        name: dataset.name().to_string(),
                        action: "staged".to_string(),
                        directory: directory.to_string(),
                        files: receipt.files,
                    });
                }
            }
        }

        if options.dry_run {
            return Ok(DownloadItemResult {
                id: dataset.id().to_string(),
                name: dataset.name().to_string(),
                action: "download".to_string(),
                directory: directory.to_string(),
                files: Vec::new(),
            });
        }

        let directory = self.staging.ensure_dataset_dir(dataset.name())?;
        sink.event(ProgressEvent {
            message: "metaspace.download".to_string(),
            elapsed: None,
        });
        let start = Instant::now();
        let written = self.client.download_to_dir(dataset, &directory)?;
        sink.event(ProgressEvent {
            message: format!("metaspace.download files={}", written.len()),
            elapsed: Some(start.elapsed()),
        });

        let files: Vec<String> = written
            .iter()
            .filter_map(|path| path.file_name().map(|name| name.to_string()))
            .collect();
        sink.event(ProgressEvent {
            message: "phase=Store; writing receipt".to_string(),
            elapsed: None,
        });
        Staging::write_receipt(
            &directory,
            &DownloadReceipt {
                id: dataset.id().to_string(),
                name: dataset.name().to_string(),
                files: files.clone(),
                downloaded_at: chrono::Utc::now().to_rfc3339(),
                tool: format!("metaspace-fetch/{}", env!("CARGO_PKG_VERSION")),
            },
        )?;
        info!(dataset = dataset.id(), directory = %directory, "dataset staged");

        Ok(DownloadItemResult {
            id: dataset.id().to_string(),
            name: dataset.name().to_string(),
            action: "download".to_string(),
            directory: directory.to_string(),
            files,
        })
    }
}
