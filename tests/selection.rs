mod common;

use assert_matches::assert_matches;
use serde_json::json;

use metaspace_fetch::error::FetchError;
use metaspace_fetch::selection::{Selection, select};
use metaspace_fetch::table::normalize;

use common::dataset;

#[test]
fn selects_by_name_in_request_order() {
    let table = normalize(vec![dataset("a", json!({})), dataset("b", json!({}))]);
    let picked = select(&table, &Selection::by_name(["name-b", "name-a"])).unwrap();
    let ids: Vec<&str> = picked.iter().map(|ds| ds.id()).collect();
    assert_eq!(ids, vec!["b", "a"]);
}

#[test]
fn selects_by_id() {
    let table = normalize(vec![dataset("a", json!({})), dataset("b", json!({}))]);
    let picked = select(&table, &Selection::by_id(["b"])).unwrap();
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].id(), "b");
}

#[test]
fn all_selects_every_row() {
    let table = normalize(vec![dataset("a", json!({})), dataset("b", json!({}))]);
    assert_eq!(select(&table, &Selection::All).unwrap().len(), 2);
}

#[test]
fn unknown_value_is_an_error() {
    let table = normalize(vec![dataset("a", json!({}))]);
    assert_matches!(
        select(&table, &Selection::by_name(["missing"])),
        Err(FetchError::DatasetNotFound(value)) if value == "Name=missing"
    );
}

#[test]
fn empty_table_selects_nothing() {
    let table = normalize(Vec::<metaspace_fetch::domain::Dataset>::new());
    assert!(select(&table, &Selection::by_name(["anything"])).unwrap().is_empty());
}
