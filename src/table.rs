use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::annotation::AnnotationSet;
use crate::domain::{Dataset, Field, Group, PixelSize, Submitter};
use crate::fields;

/// Canonical column order of a [`DatasetTable`].
pub const COLUMNS: [&str; 23] = [
    "Name",
    "ID",
    "Dataset",
    "Submitter",
    "Group",
    "Analyzer",
    "Metadata Type",
    "Ionisation Source",
    "Organism",
    "Organism Part",
    "Adducts",
    "Condition",
    "Maldi Matrix",
    "Growth Conditions",
    "Polarity",
    "Resolving Power",
    "Pixel Size",
    "MZ Value",
    "MALDI Matrix Application",
    "Sample Stabilisation",
    "Solvent",
    "Tissue Modification",
    "Additional Information",
];

/// Derived column added by the annotation joiner.
pub const MOLECULES_COLUMN: &str = "Molecules";

/// One normalized row. Field order matches [`COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Dataset", serialize_with = "serialize_handle")]
    pub dataset: Arc<Dataset>,
    #[serde(rename = "Submitter")]
    pub submitter: Field<Submitter>,
    #[serde(rename = "Group")]
    pub group: Field<Group>,
    #[serde(rename = "Analyzer")]
    pub analyzer: Field<String>,
    #[serde(rename = "Metadata Type")]
    pub metadata_type: Field<String>,
    #[serde(rename = "Ionisation Source")]
    pub ionisation_source: Field<String>,
    #[serde(rename = "Organism")]
    pub organism: Field<String>,
    #[serde(rename = "Organism Part")]
    pub organism_part: Field<String>,
    #[serde(rename = "Adducts")]
    pub adducts: Vec<String>,
    #[serde(rename = "Condition")]
    pub condition: Field<String>,
    #[serde(rename = "Maldi Matrix")]
    pub maldi_matrix: Field<String>,
    #[serde(rename = "Growth Conditions")]
    pub growth_conditions: Field<String>,
    #[serde(rename = "Polarity")]
    pub polarity: Field<String>,
    #[serde(rename = "Resolving Power")]
    pub resolving_power: Field<f64>,
    #[serde(rename = "Pixel Size")]
    pub pixel_size: Field<PixelSize>,
    #[serde(rename = "MZ Value")]
    pub mz_value: Field<f64>,
    #[serde(rename = "MALDI Matrix Application")]
    pub maldi_matrix_application: Field<String>,
    #[serde(rename = "Sample Stabilisation")]
    pub sample_stabilisation: Field<String>,
    #[serde(rename = "Solvent")]
    pub solvent: Field<String>,
    #[serde(rename = "Tissue Modification")]
    pub tissue_modification: Field<String>,
    #[serde(rename = "Additional Information")]
    pub additional_information: Field<Value>,
    #[serde(rename = "Molecules", skip_serializing_if = "Option::is_none")]
    pub molecules: Option<AnnotationSet>,
}

impl DatasetRecord {
    pub fn from_dataset(dataset: Arc<Dataset>) -> Self {
        let ds = dataset.as_ref();
        Self {
            name: fields::name(ds).to_string(),
            id: fields::id(ds).to_string(),
            submitter: fields::submitter(ds),
            group: fields::group(ds),
            analyzer: fields::analyzer(ds),
            metadata_type: fields::metadata_type(ds),
            ionisation_source: fields::ionisation_source(ds),
            organism: fields::organism(ds),
            organism_part: fields::organism_part(ds),
            adducts: fields::adducts(ds).to_vec(),
            condition: fields::condition(ds),
            maldi_matrix: fields::maldi_matrix(ds),
            growth_conditions: fields::growth_conditions(ds),
            polarity: fields::polarity(ds),
            resolving_power: fields::resolving_power(ds),
            pixel_size: fields::pixel_size(ds),
            mz_value: fields::mz_value(ds),
            maldi_matrix_application: fields::maldi_matrix_application(ds),
            sample_stabilisation: fields::sample_stabilisation(ds),
            solvent: fields::solvent(ds),
            tissue_modification: fields::tissue_modification(ds),
            additional_information: fields::additional_information(ds),
            molecules: None,
            dataset,
        }
    }

    /// Renders one canonical column as text. Unknown column names yield `None`.
    pub fn cell(&self, column: &str) -> Option<String> {
        let text = match column {
            "Name" => self.name.clone(),
            "ID" | "Dataset" => self.id.clone(),
            "Submitter" => self.submitter.to_string(),
            "Group" => self.group.to_string(),
            "Analyzer" => self.analyzer.to_string(),
            "Metadata Type" => self.metadata_type.to_string(),
            "Ionisation Source" => self.ionisation_source.to_string(),
            "Organism" => self.organism.to_string(),
            "Organism Part" => self.organism_part.to_string(),
            "Adducts" => self.adducts.join(", "),
            "Condition" => self.condition.to_string(),
            "Maldi Matrix" => self.maldi_matrix.to_string(),
            "Growth Conditions" => self.growth_conditions.to_string(),
            "Polarity" => self.polarity.to_string(),
            "Resolving Power" => self.resolving_power.to_string(),
            "Pixel Size" => self.pixel_size.to_string(),
            "MZ Value" => self.mz_value.to_string(),
            "MALDI Matrix Application" => self.maldi_matrix_application.to_string(),
            "Sample Stabilisation" => self.sample_stabilisation.to_string(),
            "Solvent" => self.solvent.to_string(),
            "Tissue Modification" => self.tissue_modification.to_string(),
            "Additional Information" => self.additional_information.to_string(),
            _ => return None,
        };
        Some(text)
    }
}

fn serialize_handle<S: Serializer>(
    dataset: &Arc<Dataset>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(dataset.id())
}

/// Ordered collection of normalized records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DatasetTable {
    records: Vec<DatasetRecord>,
}

impl DatasetTable {
    pub fn from_records(records: Vec<DatasetRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[DatasetRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<DatasetRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Handles backing the rows, in row order.
    pub fn datasets(&self) -> impl Iterator<Item = &Arc<Dataset>> {
        self.records.iter().map(|record| &record.dataset)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(|record| record.id.as_str()).collect()
    }

    /// True when every row carries its annotation set.
    pub fn has_molecules(&self) -> bool {
        !self.records.is_empty() && self.records.iter().all(|r| r.molecules.is_some())
    }

    /// Column names of this table, including `Molecules` once joined.
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = COLUMNS.to_vec();
        if self.has_molecules() {
            columns.push(MOLECULES_COLUMN);
        }
        columns
    }
}

/// Builds a table with one record per dataset, in input order.
///
/// Duplicated dataset IDs yield duplicated records.
pub fn normalize<I>(datasets: I) -> DatasetTable
where
    I: IntoIterator,
    I::Item: Into<Arc<Dataset>>,
{
    let records: Vec<DatasetRecord> = datasets
        .into_iter()
        .map(|dataset| DatasetRecord::from_dataset(dataset.into()))
        .collect();
    debug!(rows = records.len(), "normalized datasets");
    DatasetTable { records }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn serialized_columns_follow_canonical_order() {
        let dataset = Dataset::new("ds1", "brain", vec!["+H".to_string()], json!({}), json!({}));
        let table = normalize(vec![dataset]);
        let text = serde_json::to_string(&table).unwrap();
        let positions: Vec<usize> = COLUMNS
            .iter()
            .map(|column| text.find(&format!("\"{column}\":")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "{text}");
        assert!(!text.contains("\"Molecules\":"));

        let value = serde_json::to_value(&table).unwrap();
        let row = value.as_array().unwrap()[0].as_object().unwrap();
        assert_eq!(row.len(), COLUMNS.len());
        assert_eq!(row["Dataset"], json!("ds1"));
        assert_eq!(row["Organism"], json!("N/A"));
    }

    #[test]
    fn every_column_renders() {
        let dataset = Dataset::new("ds1", "brain", vec!["+H".to_string()], json!({}), json!({}));
        let table = normalize(vec![dataset]);
        let record = &table.records()[0];
        for column in COLUMNS {
            assert!(record.cell(column).is_some(), "{column}");
        }
        assert_eq!(record.cell("Nope"), None);
    }
}
