//! Per-field accessors over a [`Dataset`].
//!
//! Every accessor walks a fixed path into the dataset's info object or its
//! metadata tree. A missing segment, or an explicit `null`, resolves to
//! [`Field::NotAvailable`]; nothing here fails.

use serde_json::Value;

use crate::domain::{Dataset, Field, Group, PixelSize, Submitter};

pub fn name(dataset: &Dataset) -> &str {
    dataset.name()
}

pub fn id(dataset: &Dataset) -> &str {
    dataset.id()
}

pub fn adducts(dataset: &Dataset) -> &[String] {
    dataset.adducts()
}

pub fn submitter(dataset: &Dataset) -> Field<Submitter> {
    lookup(dataset.info(), "/submitter")
        .filter(|v| v.is_object())
        .map(|v| Submitter {
            id: text_at(v, "/id"),
            name: text_at(v, "/name"),
        })
        .into()
}

pub fn group(dataset: &Dataset) -> Field<Group> {
    lookup(dataset.info(), "/group")
        .filter(|v| v.is_object())
        .map(|v| Group {
            id: text_at(v, "/id"),
            name: text_at(v, "/name"),
            short_name: text_at(v, "/shortName"),
        })
        .into()
}

/// Analyzer as declared in the submitted MS_Analysis metadata.
pub fn analyzer(dataset: &Dataset) -> Field<String> {
    text_at(dataset.metadata(), "/MS_Analysis/Analyzer")
}

pub fn metadata_type(dataset: &Dataset) -> Field<String> {
    text_at(dataset.info(), "/metadataType")
}

pub fn ionisation_source(dataset: &Dataset) -> Field<String> {
    text_at(dataset.info(), "/ionisationSource")
}

pub fn organism(dataset: &Dataset) -> Field<String> {
    text_at(dataset.info(), "/organism")
}

pub fn organism_part(dataset: &Dataset) -> Field<String> {
    text_at(dataset.info(), "/organismPart")
}

pub fn condition(dataset: &Dataset) -> Field<String> {
    text_at(dataset.info(), "/condition")
}

pub fn maldi_matrix(dataset: &Dataset) -> Field<String> {
    text_at(dataset.info(), "/maldiMatrix")
}

pub fn growth_conditions(dataset: &Dataset) -> Field<String> {
    text_at(dataset.info(), "/growthConditions")
}

pub fn polarity(dataset: &Dataset) -> Field<String> {
    text_at(dataset.info(), "/polarity")
}

/// Resolving power reported by the service for the dataset's analyzer.
pub fn resolving_power(dataset: &Dataset) -> Field<f64> {
    number_at(dataset.info(), "/analyzer/resolvingPower")
}

pub fn pixel_size(dataset: &Dataset) -> Field<PixelSize> {
    lookup(dataset.metadata(), "/MS_Analysis/Pixel_Size")
        .filter(|v| v.is_object())
        .map(|v| PixelSize {
            x: number_at(v, "/Xaxis"),
            y: number_at(v, "/Yaxis"),
        })
        .into()
}

pub fn pixel_size_x(dataset: &Dataset) -> Field<f64> {
    number_at(dataset.metadata(), "/MS_Analysis/Pixel_Size/Xaxis")
}

pub fn pixel_size_y(dataset: &Dataset) -> Field<f64> {
    number_at(dataset.metadata(), "/MS_Analysis/Pixel_Size/Yaxis")
}

/// The m/z at which the detector resolving power was specified.
pub fn mz_value(dataset: &Dataset) -> Field<f64> {
    number_at(
        dataset.metadata(),
        "/MS_Analysis/Detector_Resolving_Power/mz",
    )
}

pub fn maldi_matrix_application(dataset: &Dataset) -> Field<String> {
    text_at(
        dataset.metadata(),
        "/Sample_Preparation/MALDI_Matrix_Application",
    )
}

pub fn sample_stabilisation(dataset: &Dataset) -> Field<String> {
    text_at(dataset.metadata(), "/Sample_Preparation/Sample_Stabilisation")
}

pub fn solvent(dataset: &Dataset) -> Field<String> {
    text_at(dataset.metadata(), "/Sample_Preparation/Solvent")
}

pub fn tissue_modification(dataset: &Dataset) -> Field<String> {
    text_at(dataset.metadata(), "/Sample_Preparation/Tissue_Modification")
}

pub fn additional_information(dataset: &Dataset) -> Field<Value> {
    lookup(dataset.metadata(), "/Additional_Information")
        .cloned()
        .into()
}

fn lookup<'a>(root: &'a Value, pointer: &str) -> Option<&'a Value> {
    root.pointer(pointer).filter(|v| !v.is_null())
}

fn text_at(root: &Value, pointer: &str) -> Field<String> {
    lookup(root, pointer)
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .into()
}

fn number_at(root: &Value, pointer: &str) -> Field<f64> {
    lookup(root, pointer).and_then(coerce_number).into()
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}
