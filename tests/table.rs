mod common;

use std::sync::Arc;

use serde_json::json;

use metaspace_fetch::domain::{Dataset, SENTINEL};
use metaspace_fetch::table::{COLUMNS, DatasetTable, normalize};

use common::{dataset, dataset_with_metadata};

#[test]
fn one_row_per_dataset_in_input_order() {
    let table = normalize(vec![
        dataset("a", json!({})),
        dataset("b", json!({})),
        dataset("c", json!({})),
    ]);
    assert_eq!(table.len(), 3);
    assert_eq!(table.ids(), vec!["a", "b", "c"]);
    assert_eq!(table.columns(), COLUMNS.to_vec());
}

#[test]
fn empty_input_gives_empty_table_with_columns() {
    let table = normalize(Vec::<Arc<Dataset>>::new());
    assert!(table.is_empty());
    assert_eq!(table.columns().len(), 23);
    assert!(!table.has_molecules());
}

#[test]
fn duplicate_datasets_stay_duplicated() {
    let shared = Arc::new(dataset("dup", json!({})));
    let table = normalize(vec![Arc::clone(&shared), shared]);
    assert_eq!(table.ids(), vec!["dup", "dup"]);
}

#[test]
fn missing_fields_render_sentinel() {
    let table = normalize(vec![dataset("a", json!({}))]);
    let record = &table.records()[0];
    for column in ["Submitter", "Group", "Analyzer", "Organism", "Pixel Size", "MZ Value"] {
        assert_eq!(record.cell(column).as_deref(), Some(SENTINEL), "{column}");
    }
    assert_eq!(record.cell("Name").as_deref(), Some("name-a"));
    assert_eq!(record.cell("Dataset").as_deref(), Some("a"));
}

#[test]
fn metadata_fields_are_extracted() {
    let table = normalize(vec![dataset_with_metadata(
        "a",
        json!({
            "MS_Analysis": {
                "Analyzer": "Orbitrap",
                "Pixel_Size": { "Xaxis": 20, "Yaxis": 25.5 },
                "Detector_Resolving_Power": { "mz": 200, "Resolving_Power": 140000 }
            },
            "Sample_Preparation": { "Solvent": "ACN" }
        }),
    )]);
    let record = &table.records()[0];
    assert_eq!(record.analyzer.text(), "Orbitrap");
    assert_eq!(record.cell("Pixel Size").as_deref(), Some("20x25.5"));
    assert_eq!(record.mz_value.as_ref().available(), Some(&200.0));
    assert_eq!(record.solvent.text(), "ACN");
    assert_eq!(record.tissue_modification.text(), SENTINEL);
}

#[test]
fn serializes_columns_in_canonical_order() {
    let table = normalize(vec![
        dataset("a", json!({ "organism": "Mus musculus" })),
        dataset("b", json!({})),
    ]);
    let text = serde_json::to_string(&table).unwrap();
    let first_row = &text[..text.find("},{").unwrap()];
    let mut last = 0;
    for column in COLUMNS {
        let key = format!("\"{column}\":");
        let position = first_row.find(&key).unwrap_or_else(|| panic!("missing {column}"));
        assert!(position > last, "{column} out of order in {first_row}");
        last = position;
    }

    let value = serde_json::to_value(&table).unwrap();
    let row = value.as_array().unwrap()[0].as_object().unwrap().clone();
    assert_eq!(row["Organism"], json!("Mus musculus"));
    assert_eq!(row["Condition"], json!(SENTINEL));
    assert_eq!(row["Dataset"], json!("a"));
    assert!(!row.contains_key("Molecules"));
}

#[test]
fn from_records_round_trips_handles() {
    let table = normalize(vec![dataset("a", json!({}))]);
    let rebuilt = DatasetTable::from_records(table.clone().into_records());
    assert_eq!(rebuilt, table);
}
