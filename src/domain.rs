use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::FetchError;

/// Marker substituted for any metadata field the service did not provide.
pub const SENTINEL: &str = "N/A";

/// A metadata value that may be absent on the remote record.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Field<T> {
    Available(T),
    #[default]
    NotAvailable,
}

impl<T> Field<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Field::Available(_))
    }

    pub fn as_ref(&self) -> Field<&T> {
        match self {
            Field::Available(value) => Field::Available(value),
            Field::NotAvailable => Field::NotAvailable,
        }
    }

    pub fn available(self) -> Option<T> {
        match self {
            Field::Available(value) => Some(value),
            Field::NotAvailable => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Field<U> {
        match self {
            Field::Available(value) => Field::Available(f(value)),
            Field::NotAvailable => Field::NotAvailable,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Field::Available(value),
            None => Field::NotAvailable,
        }
    }
}

impl Field<String> {
    /// Text used for comparisons; the sentinel compares as `"N/A"`.
    pub fn text(&self) -> &str {
        match self {
            Field::Available(value) => value,
            Field::NotAvailable => SENTINEL,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Available(value) => write!(f, "{value}"),
            Field::NotAvailable => write!(f, "{SENTINEL}"),
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Available(value) => value.serialize(serializer),
            Field::NotAvailable => serializer.serialize_str(SENTINEL),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submitter {
    pub id: Field<String>,
    pub name: Field<String>,
}

impl fmt::Display for Submitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub id: Field<String>,
    pub name: Field<String>,
    #[serde(rename = "shortName")]
    pub short_name: Field<String>,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PixelSize {
    #[serde(rename = "Xaxis")]
    pub x: Field<f64>,
    #[serde(rename = "Yaxis")]
    pub y: Field<f64>,
}

impl fmt::Display for PixelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

/// One annotation database a dataset was searched against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseReference {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    pub version: String,
}

impl DatabaseReference {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for DatabaseReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// Handle on one remote dataset.
///
/// Holds the required identity fields plus the raw info object and the
/// parsed metadata tree; everything else is read through [`crate::fields`].
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    id: String,
    name: String,
    adducts: Vec<String>,
    databases: Vec<DatabaseReference>,
    info: Value,
    metadata: Value,
}

impl Dataset {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        adducts: Vec<String>,
        info: Value,
        metadata: Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            adducts,
            databases: Vec::new(),
            info,
            metadata,
        }
    }

    pub fn with_databases(mut self, databases: Vec<DatabaseReference>) -> Self {
        self.databases = databases;
        self
    }

    /// Builds a handle from one `allDatasets` entry.
    ///
    /// `id`, `name` and `adducts` are guaranteed by the service; their absence
    /// is a contract violation. `metadataJson` is decoded leniently.
    pub fn from_graphql(raw: Value) -> Result<Self, FetchError> {
        let id = required_str(&raw, "id")?;
        let name = required_str(&raw, "name")?;
        let adducts = raw
            .get("adducts")
            .and_then(|v| v.as_array())
            .ok_or_else(|| FetchError::MissingField(format!("adducts (dataset {id})")))?
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect();
        let databases = match raw.get("databases") {
            Some(value) if !value.is_null() => serde_json::from_value(value.clone())
                .map_err(|err| FetchError::GraphQl(format!("databases of {id}: {err}")))?,
            _ => Vec::new(),
        };
        let metadata = raw
            .get("metadataJson")
            .and_then(|v| v.as_str())
            .and_then(|text| serde_json::from_str(text).ok())
            .unwrap_or_else(|| Value::Object(Default::default()));

        Ok(Self {
            id,
            name,
            adducts,
            databases,
            info: raw,
            metadata,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn adducts(&self) -> &[String] {
        &self.adducts
    }

    pub fn database_references(&self) -> &[DatabaseReference] {
        &self.databases
    }

    pub fn info(&self) -> &Value {
        &self.info
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }
}

fn required_str(raw: &Value, key: &str) -> Result<String, FetchError> {
    raw.get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| FetchError::MissingField(key.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    pub fn as_graphql(self) -> &'static str {
        match self {
            Polarity::Positive => "POSITIVE",
            Polarity::Negative => "NEGATIVE",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Positive => write!(f, "positive"),
            Polarity::Negative => write!(f, "negative"),
        }
    }
}

impl FromStr for Polarity {
    type Err = FetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positive" | "pos" | "+" => Ok(Polarity::Positive),
            "negative" | "neg" | "-" => Ok(Polarity::Negative),
            _ => Err(FetchError::InvalidPolarity(value.to_string())),
        }
    }
}

/// Remote search parameters. Every field is optional; the default searches
/// the whole catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchCriteria {
    pub keyword: Option<String>,
    pub dataset_ids: Vec<String>,
    pub submitter_id: Option<String>,
    pub group_id: Option<String>,
    pub project_id: Option<String>,
    pub polarity: Option<Polarity>,
    pub ionisation_source: Option<String>,
    pub analyzer_type: Option<String>,
    pub maldi_matrix: Option<String>,
    pub organism: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadLinks {
    #[serde(default)]
    pub contributors: Vec<Contributor>,
    #[serde(default)]
    pub license: Option<License>,
    #[serde(default)]
    pub files: Vec<DownloadFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub name: String,
    #[serde(default)]
    pub institution: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadFile {
    pub filename: String,
    pub link: String,
}
