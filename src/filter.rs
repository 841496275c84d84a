//! Multi-stage metadata filtering over a [`DatasetTable`].
//!
//! A [`MetadataFilter`] holds caller-supplied candidate lists, one per
//! filterable field. It compiles into an ordered list of [`Stage`]s; each
//! stage keeps the records matching at least one candidate and hands the
//! survivors to the next stage.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Dataset, Field};
use crate::error::FetchError;
use crate::table::{DatasetRecord, DatasetTable, normalize};

/// Filterable fields, declared in the order stages run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterField {
    Adducts,
    Analyzer,
    Condition,
    GroupId,
    GroupName,
    GroupShortName,
    GrowthConditions,
    IonisationSource,
    MaldiMatrix,
    MetadataType,
    Organism,
    OrganismPart,
    Polarity,
    ResolvingPower,
    PixelSizeX,
    PixelSizeY,
    MzValue,
}

/// How a field is compared against its candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// The field's list contains a candidate.
    Membership,
    /// Case-sensitive string equality.
    Exact,
    /// String equality after upper-casing both sides.
    ExactIgnoreCase,
    /// Unanchored regular-expression search.
    Pattern,
    /// Numeric field is at least one of the candidates.
    Threshold,
}

impl FilterField {
    pub fn match_mode(self) -> MatchMode {
        match self {
            FilterField::Adducts => MatchMode::Membership,
            FilterField::MaldiMatrix => MatchMode::Pattern,
            FilterField::Polarity => MatchMode::ExactIgnoreCase,
            FilterField::ResolvingPower
            | FilterField::PixelSizeX
            | FilterField::PixelSizeY
            | FilterField::MzValue => MatchMode::Threshold,
            FilterField::Analyzer
            | FilterField::Condition
            | FilterField::GroupId
            | FilterField::GroupName
            | FilterField::GroupShortName
            | FilterField::GrowthConditions
            | FilterField::IonisationSource
            | FilterField::MetadataType
            | FilterField::Organism
            | FilterField::OrganismPart => MatchMode::Exact,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterField::Adducts => "adducts",
            FilterField::Analyzer => "analyzer",
            FilterField::Condition => "condition",
            FilterField::GroupId => "group.id",
            FilterField::GroupName => "group.name",
            FilterField::GroupShortName => "group.shortName",
            FilterField::GrowthConditions => "growthConditions",
            FilterField::IonisationSource => "ionisationSource",
            FilterField::MaldiMatrix => "maldiMatrix",
            FilterField::MetadataType => "metadataType",
            FilterField::Organism => "organism",
            FilterField::OrganismPart => "organismPart",
            FilterField::Polarity => "polarity",
            FilterField::ResolvingPower => "resolvingPower",
            FilterField::PixelSizeX => "pixelSize.Xaxis",
            FilterField::PixelSizeY => "pixelSize.Yaxis",
            FilterField::MzValue => "mzValue",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Criterion {
    Text(Vec<String>),
    Patterns(Vec<Regex>),
    Thresholds(Vec<f64>),
}

impl Criterion {
    fn is_empty(&self) -> bool {
        match self {
            Criterion::Text(values) => values.is_empty(),
            Criterion::Patterns(values) => values.is_empty(),
            Criterion::Thresholds(values) => values.is_empty(),
        }
    }
}

/// One filter predicate at a fixed pipeline position.
#[derive(Debug, Clone)]
pub struct Stage {
    pub field: FilterField,
    pub criterion: Criterion,
}

impl Stage {
    /// Builds a text stage. Pattern fields compile their candidates;
    /// threshold fields are rejected.
    pub fn text(field: FilterField, candidates: Vec<String>) -> Result<Self, FetchError> {
        let criterion = match field.match_mode() {
            MatchMode::Threshold => {
                return Err(FetchError::StageKind {
                    field: field.label(),
                    kind: "text",
                });
            }
            MatchMode::Pattern => Criterion::Patterns(compile_patterns(&candidates)?),
            _ => Criterion::Text(candidates),
        };
        Ok(Self { field, criterion })
    }

    /// Builds a lower-bound stage; only threshold fields accept one.
    pub fn threshold(field: FilterField, candidates: Vec<f64>) -> Result<Self, FetchError> {
        if field.match_mode() != MatchMode::Threshold {
            return Err(FetchError::StageKind {
                field: field.label(),
                kind: "numeric",
            });
        }
        Ok(Self {
            field,
            criterion: Criterion::Thresholds(candidates),
        })
    }

    pub fn matches(&self, record: &DatasetRecord) -> bool {
        match (&self.criterion, self.field) {
            (Criterion::Text(candidates), FilterField::Adducts) => candidates
                .iter()
                .any(|candidate| record.adducts.contains(candidate)),
            (Criterion::Text(candidates), FilterField::Polarity) => {
                let value = record.polarity.text().to_uppercase();
                candidates
                    .iter()
                    .any(|candidate| candidate.to_uppercase() == value)
            }
            (Criterion::Text(candidates), field) => match text_value(record, field) {
                Some(value) => candidates.iter().any(|candidate| candidate == value),
                None => false,
            },
            (Criterion::Patterns(patterns), field) => match text_value(record, field) {
                Some(value) => patterns.iter().any(|pattern| pattern.is_match(value)),
                None => false,
            },
            (Criterion::Thresholds(candidates), field) => match numeric_value(record, field) {
                Field::Available(value) => candidates.iter().any(|k| *k <= value),
                Field::NotAvailable => false,
            },
        }
    }
}

/// Field text a text or pattern stage compares against.
///
/// Group subfields need a structured group; without one the record has no
/// comparable value and is dropped.
fn text_value(record: &DatasetRecord, field: FilterField) -> Option<&str> {
    let value = match field {
        FilterField::Analyzer => record.analyzer.text(),
        FilterField::Condition => record.condition.text(),
        FilterField::GrowthConditions => record.growth_conditions.text(),
        FilterField::IonisationSource => record.ionisation_source.text(),
        FilterField::MaldiMatrix => record.maldi_matrix.text(),
        FilterField::MetadataType => record.metadata_type.text(),
        FilterField::Organism => record.organism.text(),
        FilterField::OrganismPart => record.organism_part.text(),
        FilterField::Polarity => record.polarity.text(),
        FilterField::GroupId | FilterField::GroupName | FilterField::GroupShortName => {
            let Field::Available(group) = &record.group else {
                return None;
            };
            match field {
                FilterField::GroupId => group.id.text(),
                FilterField::GroupName => group.name.text(),
                _ => group.short_name.text(),
            }
        }
        FilterField::Adducts
        | FilterField::ResolvingPower
        | FilterField::PixelSizeX
        | FilterField::PixelSizeY
        | FilterField::MzValue => return None,
    };
    Some(value)
}

fn numeric_value(record: &DatasetRecord, field: FilterField) -> Field<f64> {
    match field {
        FilterField::ResolvingPower => record.resolving_power.clone(),
        FilterField::PixelSizeX => match &record.pixel_size {
            Field::Available(size) => size.x.clone(),
            Field::NotAvailable => Field::NotAvailable,
        },
        FilterField::PixelSizeY => match &record.pixel_size {
            Field::Available(size) => size.y.clone(),
            Field::NotAvailable => Field::NotAvailable,
        },
        FilterField::MzValue => record.mz_value.clone(),
        _ => Field::NotAvailable,
    }
}

pub(crate) fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, FetchError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|err| FetchError::InvalidPattern {
                pattern: pattern.clone(),
                message: err.to_string(),
            })
        })
        .collect()
}

/// Candidate lists per filterable field. An empty list disables its stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetadataFilter {
    pub adducts: Vec<String>,
    pub analyzer: Vec<String>,
    pub condition: Vec<String>,
    pub group_id: Vec<String>,
    pub group_name: Vec<String>,
    pub group_short_name: Vec<String>,
    pub growth_conditions: Vec<String>,
    pub ionisation_source: Vec<String>,
    /// Regular expressions searched anywhere in the MALDI matrix.
    pub maldi_matrix: Vec<String>,
    pub metadata_type: Vec<String>,
    pub organism: Vec<String>,
    pub organism_part: Vec<String>,
    pub polarity: Vec<String>,
    pub min_resolving_power: Vec<f64>,
    pub min_pixel_size_x: Vec<f64>,
    pub min_pixel_size_y: Vec<f64>,
    pub min_mz_value: Vec<f64>,
}

impl MetadataFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Compiles the non-empty candidate lists into stages, in run order.
    pub fn stages(&self) -> Result<Vec<Stage>, FetchError> {
        let text = [
            (FilterField::Adducts, &self.adducts),
            (FilterField::Analyzer, &self.analyzer),
            (FilterField::Condition, &self.condition),
            (FilterField::GroupId, &self.group_id),
            (FilterField::GroupName, &self.group_name),
            (FilterField::GroupShortName, &self.group_short_name),
            (FilterField::GrowthConditions, &self.growth_conditions),
            (FilterField::IonisationSource, &self.ionisation_source),
            (FilterField::MaldiMatrix, &self.maldi_matrix),
            (FilterField::MetadataType, &self.metadata_type),
            (FilterField::Organism, &self.organism),
            (FilterField::OrganismPart, &self.organism_part),
            (FilterField::Polarity, &self.polarity),
        ];
        let thresholds = [
            (FilterField::ResolvingPower, &self.min_resolving_power),
            (FilterField::PixelSizeX, &self.min_pixel_size_x),
            (FilterField::PixelSizeY, &self.min_pixel_size_y),
            (FilterField::MzValue, &self.min_mz_value),
        ];

        let mut stages = Vec::new();
        for (field, candidates) in text {
            if !candidates.is_empty() {
                stages.push(Stage::text(field, candidates.clone())?);
            }
        }
        for (field, candidates) in thresholds {
            if !candidates.is_empty() {
                stages.push(Stage::threshold(field, candidates.clone())?);
            }
        }
        Ok(stages)
    }
}

/// Runs `stages` in canonical field order, each over the previous stage's
/// survivors, and returns a freshly normalized table of what remains.
pub fn apply_stages(table: &DatasetTable, stages: &[Stage]) -> DatasetTable {
    let mut ordered: Vec<&Stage> = stages.iter().collect();
    ordered.sort_by_key(|stage| stage.field);

    let mut survivors: Vec<&DatasetRecord> = table.records().iter().collect();
    for stage in ordered {
        if stage.criterion.is_empty() {
            continue;
        }
        let before = survivors.len();
        survivors.retain(|record| stage.matches(record));
        debug!(
            stage = stage.field.label(),
            before,
            after = survivors.len(),
            "applied filter stage"
        );
    }

    let datasets: Vec<Arc<Dataset>> = survivors
        .into_iter()
        .map(|record| Arc::clone(&record.dataset))
        .collect();
    normalize(datasets)
}

pub fn filter_metadata(
    table: &DatasetTable,
    filter: &MetadataFilter,
) -> Result<DatasetTable, FetchError> {
    let stages = filter.stages()?;
    Ok(apply_stages(table, &stages))
}
