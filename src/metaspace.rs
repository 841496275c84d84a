use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::annotation::{AnnotationRow, ResultTable};
use crate::domain::{Dataset, DatabaseReference, DownloadLinks, SearchCriteria};
use crate::error::FetchError;

pub const DEFAULT_ENDPOINT: &str = "https://metaspace2020.eu/graphql";
pub const ENDPOINT_ENV: &str = "METASPACE_GRAPHQL_URL";
const PAGE_SIZE: usize = 100;
const ANNOTATION_LIMIT: usize = 100_000;

const DATASET_FIELDS: &str = "
    id
    name
    uploadDT
    submitter { id name }
    group { id name shortName }
    principalInvestigator { name }
    projects { id name }
    polarity
    ionisationSource
    analyzer { type resolvingPower(mz: 400) }
    organism
    organismPart
    condition
    growthConditions
    maldiMatrix
    metadataType
    metadataJson
    isPublic
    databases { id name version }
    adducts
    status
";

const DATASETS_QUERY: &str = "
query GetDatasets($filter: DatasetFilter, $offset: Int, $limit: Int) {
  allDatasets(
    filter: $filter, offset: $offset, limit: $limit,
    orderBy: ORDER_BY_DATE, sortingOrder: DESCENDING
  ) {
    {FIELDS}
  }
}";

const ANNOTATIONS_QUERY: &str = "
query GetAnnotations($filter: AnnotationFilter, $dFilter: DatasetFilter, $limit: Int) {
  allAnnotations(
    filter: $filter, datasetFilter: $dFilter, limit: $limit,
    orderBy: ORDER_BY_MSM, sortingOrder: DESCENDING
  ) {
    ion
    sumFormula
    adduct
    mz
    msmScore
    fdrLevel
    possibleCompounds { name }
  }
}";

const DOWNLOAD_LINKS_QUERY: &str = "
query GetDownloadLinks($id: String!) {
  dataset(id: $id) { downloadLinkJson }
}";

/// Remote METASPACE capabilities consumed by the workflow.
pub trait MetaspaceClient: Send + Sync {
    fn datasets(&self, criteria: &SearchCriteria) -> Result<Vec<Dataset>, FetchError>;
    fn results(
        &self,
        dataset: &Dataset,
        database: &DatabaseReference,
        fdr: f64,
    ) -> Result<ResultTable, FetchError>;
    fn download_links(&self, dataset: &Dataset) -> Result<DownloadLinks, FetchError>;
    fn download_to_dir(
        &self,
        dataset: &Dataset,
        destination: &Utf8Path,
    ) -> Result<Vec<Utf8PathBuf>, FetchError>;
}

#[derive(Clone)]
pub struct MetaspaceHttpClient {
    client: Client,
    endpoint: String,
}

impl MetaspaceHttpClient {
    /// Client for `endpoint`, unless `METASPACE_GRAPHQL_URL` overrides it.
    pub fn new(endpoint: &str) -> Result<Self, FetchError> {
        let endpoint = std::env::var(ENDPOINT_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| endpoint.to_string());
        Self::with_endpoint(endpoint)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("metaspace-fetch/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| FetchError::MetaspaceHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| FetchError::MetaspaceHttp(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T, FetchError> {
        let body = json!({ "query": query, "variables": variables });
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|err| FetchError::MetaspaceHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let payload: GraphQlResponse<T> = response
            .json()
            .map_err(|err| FetchError::MetaspaceHttp(err.to_string()))?;
        payload.into_data()
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, FetchError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "METASPACE request failed".to_string());
        Err(FetchError::MetaspaceStatus { status, message })
    }

    fn download_file(&self, url: &str, destination: &Utf8Path) -> Result<(), FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| FetchError::MetaspaceHttp(err.to_string()))?;
        let mut response = Self::handle_status(response)?;
        let parent = destination
            .parent()
            .ok_or_else(|| FetchError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        let mut temp = tempfile::Builder::new()
            .prefix("metaspace-fetch-file")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, temp.as_file_mut())
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        temp.persist(destination.as_std_path())
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

impl MetaspaceClient for MetaspaceHttpClient {
    fn datasets(&self, criteria: &SearchCriteria) -> Result<Vec<Dataset>, FetchError> {
        let query = DATASETS_QUERY.replace("{FIELDS}", DATASET_FIELDS);
        let filter = dataset_filter(criteria);
        let mut datasets = Vec::new();
        let mut offset = 0usize;
        loop {
            let page: AllDatasets = self.query(
                &query,
                json!({ "filter": filter, "offset": offset, "limit": PAGE_SIZE }),
            )?;
            let count = page.all_datasets.len();
            debug!(offset, count, "fetched dataset page");
            for raw in page.all_datasets {
                datasets.push(Dataset::from_graphql(raw)?);
            }
            if count < PAGE_SIZE {
                break;
            }
            offset += count;
        }
        info!(datasets = datasets.len(), "search complete");
        Ok(datasets)
    }

    fn results(
        &self,
        dataset: &Dataset,
        database: &DatabaseReference,
        fdr: f64,
    ) -> Result<ResultTable, FetchError> {
        let variables = json!({
            "filter": annotation_filter(database, fdr),
            "dFilter": { "ids": dataset.id() },
            "limit": ANNOTATION_LIMIT,
        });
        let data: AllAnnotations = self.query(ANNOTATIONS_QUERY, variables)?;
        let rows = data
            .all_annotations
            .into_iter()
            .map(GraphQlAnnotation::into_row)
            .collect();
        Ok(ResultTable::new(rows))
    }

    fn download_links(&self, dataset: &Dataset) -> Result<DownloadLinks, FetchError> {
        let data: DatasetLinks = self.query(DOWNLOAD_LINKS_QUERY, json!({ "id": dataset.id() }))?;
        let text = data
            .dataset
            .and_then(|ds| ds.download_link_json)
            .ok_or_else(|| FetchError::GraphQl(format!("no download links for {}", dataset.id())))?;
        parse_download_links(&text)
    }

    fn download_to_dir(
        &self,
        dataset: &Dataset,
        destination: &Utf8Path,
    ) -> Result<Vec<Utf8PathBuf>, FetchError> {
        let links = self.download_links(dataset)?;
        let mut written = Vec::with_capacity(links.files.len());
        for file in &links.files {
            let name = Utf8Path::new(&file.filename).file_name().ok_or_else(|| {
                FetchError::Filesystem(format!("invalid file name {}", file.filename))
            })?;
            let target = destination.join(name);
            info!(dataset = dataset.id(), file = %target, "downloading");
            self.download_file(&file.link, &target)?;
            written.push(target);
        }
        Ok(written)
    }
}

/// Maps search criteria onto a GraphQL `DatasetFilter`, omitting unset keys.
pub fn dataset_filter(criteria: &SearchCriteria) -> Value {
    let mut filter = Map::new();
    let mut put = |key: &str, value: Option<&str>| {
        if let Some(value) = value {
            filter.insert(key.to_string(), Value::String(value.to_string()));
        }
    };
    put("name", criteria.keyword.as_deref());
    put("submitter", criteria.submitter_id.as_deref());
    put("group", criteria.group_id.as_deref());
    put("project", criteria.project_id.as_deref());
    put("polarity", criteria.polarity.map(|p| p.as_graphql()));
    put("ionisationSource", criteria.ionisation_source.as_deref());
    put("analyzerType", criteria.analyzer_type.as_deref());
    put("maldiMatrix", criteria.maldi_matrix.as_deref());
    put("organism", criteria.organism.as_deref());
    if !criteria.dataset_ids.is_empty() {
        filter.insert("ids".to_string(), Value::String(criteria.dataset_ids.join("|")));
    }
    Value::Object(filter)
}

fn annotation_filter(database: &DatabaseReference, fdr: f64) -> Value {
    match database.id {
        Some(id) => json!({ "databaseId": id, "fdrLevel": fdr }),
        None => json!({ "database": database.name, "fdrLevel": fdr }),
    }
}

pub fn parse_download_links(text: &str) -> Result<DownloadLinks, FetchError> {
    serde_json::from_str(text).map_err(|err| FetchError::GraphQl(format!("download links: {err}")))
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorMessage {
    message: String,
}

impl<T> GraphQlResponse<T> {
    fn into_data(self) -> Result<T, FetchError> {
        if !self.errors.is_empty() {
            let message = self
                .errors
                .into_iter()
                .map(|err| err.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(FetchError::GraphQl(message));
        }
        self.data
            .ok_or_else(|| FetchError::GraphQl("response carried no data".to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllDatasets {
    all_datasets: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllAnnotations {
    all_annotations: Vec<GraphQlAnnotation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlAnnotation {
    ion: String,
    #[serde(default)]
    sum_formula: Option<String>,
    #[serde(default)]
    adduct: Option<String>,
    #[serde(default)]
    mz: Option<f64>,
    #[serde(default)]
    msm_score: Option<f64>,
    #[serde(default)]
    fdr_level: Option<f64>,
    #[serde(default)]
    possible_compounds: Vec<PossibleCompound>,
}

#[derive(Debug, Deserialize)]
struct PossibleCompound {
    name: String,
}

impl GraphQlAnnotation {
    fn into_row(self) -> AnnotationRow {
        AnnotationRow {
            ion: self.ion,
            formula: self.sum_formula.unwrap_or_default(),
            adduct: self.adduct.unwrap_or_default(),
            mz: self.mz.unwrap_or_default(),
            msm: self.msm_score.unwrap_or_default(),
            fdr: self.fdr_level.unwrap_or_default(),
            molecule_names: self.possible_compounds.into_iter().map(|c| c.name).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DatasetLinks {
    dataset: Option<DatasetLinkJson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetLinkJson {
    download_link_json: Option<String>,
}
