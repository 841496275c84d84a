mod common;

use assert_matches::assert_matches;
use serde_json::json;

use metaspace_fetch::annotation::join_annotations;
use metaspace_fetch::domain::DatabaseReference;
use metaspace_fetch::error::FetchError;
use metaspace_fetch::table::normalize;

use common::{MockClient, dataset};

#[test]
fn one_result_table_per_database_even_when_empty() {
    let ds = dataset("a", json!({})).with_databases(vec![
        DatabaseReference::new("HMDB", "v4"),
        DatabaseReference::new("ChEBI", "2018-01"),
        DatabaseReference::new("LipidMaps", "2017-12-12"),
    ]);
    let client = MockClient::default()
        .ions("a", "HMDB", &["C6H12O6+H"])
        .ions("a", "LipidMaps", &["C16H32O2+Na", "C18H36O2+H"]);

    let joined = join_annotations(&client, normalize(vec![ds])).unwrap();
    let set = joined.records()[0].molecules.as_ref().unwrap();
    assert_eq!(set.len(), 3);
    assert_eq!(set[0].len(), 1);
    assert!(set[1].is_empty());
    assert_eq!(set[2].len(), 2);
    assert!(joined.has_molecules());
    assert_eq!(
        client.calls(),
        vec!["results:a:HMDB", "results:a:ChEBI", "results:a:LipidMaps"]
    );
}

#[test]
fn dataset_without_databases_gets_empty_set() {
    let client = MockClient::default();
    let joined = join_annotations(&client, normalize(vec![dataset("a", json!({}))])).unwrap();
    let set = joined.records()[0].molecules.as_ref().unwrap();
    assert!(set.is_empty());
    assert_eq!(client.result_calls(), 0);
}

#[test]
fn fetch_failure_aborts_the_join() {
    let databases = vec![DatabaseReference::new("HMDB", "v4")];
    let table = normalize(vec![
        dataset("a", json!({})).with_databases(databases.clone()),
        dataset("b", json!({})).with_databases(databases),
    ]);
    let client = MockClient {
        fail_results_for: Some("a".to_string()),
        ..MockClient::default()
    };
    assert_matches!(
        join_annotations(&client, table),
        Err(FetchError::MetaspaceStatus { status: 502, .. })
    );
    assert_eq!(client.result_calls(), 1);
}

#[test]
fn joined_table_serializes_molecules_column() {
    let ds = dataset("a", json!({})).with_databases(vec![DatabaseReference::new("HMDB", "v4")]);
    let client = MockClient::default().ions("a", "HMDB", &["C5H9NO4+H"]);
    let joined = join_annotations(&client, normalize(vec![ds])).unwrap();
    let value = serde_json::to_value(&joined).unwrap();
    assert_eq!(value[0]["Molecules"][0][0]["ion"], json!("C5H9NO4+H"));
}
