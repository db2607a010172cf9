//! Product store tests: path layout, forgiving reads, atomic writes.

mod common;

use std::fs;

use chrono::NaiveDate;
use common::file_names;
use tcg_price_history::models::{AggregateDocument, PriceSet, ProductKey, SnapshotDocument};
use tcg_price_history::{AggregationPolicy, ProductStore, StoreLayout};

fn snapshot_doc(product_id: u64, sub_type: &str) -> SnapshotDocument {
    SnapshotDocument {
        product_id,
        sub_type_name: sub_type.to_string(),
        last_updated: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        day7: None,
        day30: None,
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[test]
fn per_product_layout_uses_product_id() {
    let store = ProductStore::new("/data", StoreLayout::PerProduct);
    let path = store.path_for(&ProductKey::new("1", "555", "Foil"));
    assert_eq!(path, std::path::Path::new("/data/1/555.json"));
}

#[test]
fn per_variant_layout_includes_sub_type() {
    let store = ProductStore::new("/data", StoreLayout::PerVariant);
    let path = store.path_for(&ProductKey::new("68", "555", "Foil"));
    assert_eq!(path, std::path::Path::new("/data/68/555_Foil.json"));
}

#[test]
fn separators_in_sub_type_are_replaced() {
    let store = ProductStore::new("/data", StoreLayout::PerVariant);
    let path = store.path_for(&ProductKey::new("1", "7", "A/B"));
    assert_eq!(path, std::path::Path::new("/data/1/7_A-B.json"));
}

#[test]
fn layout_follows_policy() {
    assert_eq!(StoreLayout::from(AggregationPolicy::Rolling), StoreLayout::PerProduct);
    assert_eq!(StoreLayout::from(AggregationPolicy::Snapshot), StoreLayout::PerVariant);
}

// ---------------------------------------------------------------------------
// load
// ---------------------------------------------------------------------------

#[test]
fn load_missing_is_none() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ProductStore::new(tmp.path(), StoreLayout::PerVariant);
    assert!(store.load(&ProductKey::new("1", "1", "Normal")).is_none());
}

#[test]
fn load_corrupt_is_none() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ProductStore::new(tmp.path(), StoreLayout::PerVariant);
    let key = ProductKey::new("1", "1", "Normal");
    let path = store.path_for(&key);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "{\"productId\": 1, \"subTy").unwrap();

    assert!(store.load(&key).is_none());
}

#[test]
fn load_reads_both_shapes() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ProductStore::new(tmp.path(), StoreLayout::PerProduct);
    let key = ProductKey::new("1", "1", "Normal");
    let path = store.path_for(&key);
    fs::create_dir_all(path.parent().unwrap()).unwrap();

    fs::write(
        &path,
        r#"{"productId":1,"subTypeName":"Normal","lastUpdated":"2024-06-30",
            "avg30":{"marketPrice":2.5},"avg7":{"marketPrice":null}}"#,
    )
    .unwrap();
    let loaded = store.load(&key).unwrap();
    assert_eq!(loaded.shape(), "rolling");
    assert_eq!(loaded.last_updated(), NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
    match store.load(&key) {
        Some(AggregateDocument::Rolling(doc)) => {
            assert_eq!(doc.avg30.market_price, Some(2.5));
            assert_eq!(doc.avg7, PriceSet::default());
        }
        other => panic!("expected rolling document, got {:?}", other),
    }

    fs::write(
        &path,
        r#"{"productId":1,"subTypeName":"Normal","lastUpdated":"2024-06-30",
            "day7":{"date":"2024-06-23","productId":1,"subTypeName":"Normal","marketPrice":4}}"#,
    )
    .unwrap();
    match store.load(&key) {
        Some(AggregateDocument::Snapshot(doc)) => {
            let day7 = doc.day7.unwrap();
            assert_eq!(day7.prices.market_price, Some(4.0));
            assert!(doc.day30.is_none());
        }
        other => panic!("expected snapshot document, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// store
// ---------------------------------------------------------------------------

#[test]
fn store_round_trips_and_leaves_no_temp_files() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ProductStore::new(tmp.path(), StoreLayout::PerVariant);
    let key = ProductKey::new("3", "10", "Holofoil");
    let doc = snapshot_doc(10, "Holofoil");

    let path = store.store(&key, &doc).unwrap();

    assert_eq!(path, tmp.path().join("3").join("10_Holofoil.json"));
    assert_eq!(file_names(&tmp.path().join("3")), vec!["10_Holofoil.json".to_string()]);
    assert_eq!(store.load(&key), Some(AggregateDocument::Snapshot(doc)));
}

#[test]
fn store_overwrites_whole_document() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ProductStore::new(tmp.path(), StoreLayout::PerVariant);
    let key = ProductKey::new("3", "10", "Normal");
    let path = store.path_for(&key);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "x".repeat(10_000)).unwrap();

    store.store(&key, &snapshot_doc(10, "Normal")).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["productId"], 10);
    assert!(text.contains("\n  \"subTypeName\""));
}

// ---------------------------------------------------------------------------
// is_empty
// ---------------------------------------------------------------------------

#[test]
fn is_empty_without_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ProductStore::new(tmp.path().join("missing"), StoreLayout::PerVariant);
    assert!(store.is_empty(&["1", "2"]).unwrap());
}

#[test]
fn is_empty_ignores_non_documents_and_other_categories() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("1")).unwrap();
    fs::write(tmp.path().join("1").join("notes.txt"), "x").unwrap();
    fs::create_dir_all(tmp.path().join("99")).unwrap();
    fs::write(tmp.path().join("99").join("5.json"), "{}").unwrap();

    let store = ProductStore::new(tmp.path(), StoreLayout::PerVariant);
    assert!(store.is_empty(&["1", "2"]).unwrap());
}

#[test]
fn is_empty_false_once_a_document_exists() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ProductStore::new(tmp.path(), StoreLayout::PerVariant);
    store
        .store(&ProductKey::new("2", "5", "Normal"), &snapshot_doc(5, "Normal"))
        .unwrap();
    assert!(!store.is_empty(&["1", "2"]).unwrap());
}
