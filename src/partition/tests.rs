//! Tests for partition module

use super::*;
use crate::types::RequestOption;
use serde_json::json;

// ============================================================================
// Partition Tests
// ============================================================================

#[test]
fn test_partition_values_and_key() {
    let partition = Partition::new().with_value("account_id", "a1");
    assert_eq!(partition.get("account_id"), Some(&json!("a1")));
    assert_eq!(partition.key(), r#"{"account_id":"a1"}"#);
}

#[test]
fn test_partition_key_is_canonical() {
    let a = Partition::new().with_value("b", 2).with_value("a", 1);
    let b = Partition::new().with_value("a", 1).with_value("b", 2);
    assert_eq!(a.key(), b.key());
}

// ============================================================================
// ListRouter Tests
// ============================================================================

#[test]
fn test_list_router() {
    let router = ListRouter::new(vec!["us".to_string(), "eu".to_string()], "region");
    let partitions = router.partitions().unwrap();

    assert_eq!(partitions.len(), 2);
    assert_eq!(partitions[0].get("region"), Some(&json!("us")));
    assert_eq!(partitions[1].get("region"), Some(&json!("eu")));
}

#[test]
fn test_list_router_request_params() {
    let router = ListRouter::new(vec!["us".to_string()], "region")
        .with_request_option(RequestOption::request_parameter("region_id"));

    let partitions = router.partitions().unwrap();
    let params = router.request_params(&partitions[0]);
    assert_eq!(params.get("region_id"), Some(&"us".to_string()));
}

// ============================================================================
// ParentRouter Tests
// ============================================================================

#[test]
fn test_parent_router_extracts_keys() {
    let records = vec![
        json!({"id": 1, "name": "first"}),
        json!({"id": 2, "name": "second"}),
    ];
    let router = ParentRouter::new(records, "id", "parent_id");
    let partitions = router.partitions().unwrap();

    assert_eq!(partitions.len(), 2);
    assert_eq!(partitions[0].get("parent_id"), Some(&json!("1")));
    assert_eq!(partitions[1].get("parent_id"), Some(&json!("2")));
}

#[test]
fn test_parent_router_nested_key() {
    let records = vec![json!({"account": {"id": "acc_1"}})];
    let router = ParentRouter::new(records, "account.id", "account_id");
    let partitions = router.partitions().unwrap();

    assert_eq!(partitions[0].get("account_id"), Some(&json!("acc_1")));
}

#[test]
fn test_parent_router_deduplicates() {
    let records = vec![json!({"id": "a"}), json!({"id": "a"}), json!({"id": "b"})];
    let router = ParentRouter::new(records, "id", "parent_id");

    assert_eq!(router.partitions().unwrap().len(), 2);
}

#[test]
fn test_parent_router_skips_records_without_key() {
    let records = vec![json!({"id": "a"}), json!({"name": "no id"})];
    let router = ParentRouter::new(records, "id", "parent_id");

    assert_eq!(router.partitions().unwrap().len(), 1);
}

#[test]
fn test_parent_router_zero_records_zero_partitions() {
    let router = ParentRouter::new(Vec::new(), "id", "parent_id");
    assert!(router.partitions().unwrap().is_empty());
}
