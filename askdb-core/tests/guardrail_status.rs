use askdb_core::{AskDbError, GuardrailCheck, GuardrailStatus, GuardrailStatusMap};

#[test]
fn new_map_starts_every_configured_check_as_not_run() {
    let map = GuardrailStatusMap::new(&GuardrailCheck::SINGLE_TURN);

    assert_eq!(map.len(), 3);
    for check in GuardrailCheck::SINGLE_TURN {
        assert_eq!(map.get(check), Some(GuardrailStatus::NotRun));
    }
    assert_eq!(map.get(GuardrailCheck::Consistency), None);
}

#[test]
fn record_maps_failures_to_check_specific_status() {
    let mut map = GuardrailStatusMap::new(&GuardrailCheck::MULTI_TURN);

    assert_eq!(
        map.record(GuardrailCheck::ContainsCode, false).unwrap(),
        GuardrailStatus::ContainsCode
    );
    assert_eq!(
        map.record(GuardrailCheck::Safety, false).unwrap(),
        GuardrailStatus::Unsafe
    );
    assert_eq!(
        map.record(GuardrailCheck::Consistency, false).unwrap(),
        GuardrailStatus::Inconsistent
    );
    assert_eq!(
        map.record(GuardrailCheck::Relevance, true).unwrap(),
        GuardrailStatus::Passed
    );
}

#[test]
fn a_check_resolves_at_most_once_per_turn() {
    let mut map = GuardrailStatusMap::new(&GuardrailCheck::SINGLE_TURN);
    map.record(GuardrailCheck::Safety, true).unwrap();

    let err = map.record(GuardrailCheck::Safety, false).unwrap_err();
    assert!(matches!(err, AskDbError::GuardrailAlreadyResolved { .. }));
    assert_eq!(map.get(GuardrailCheck::Safety), Some(GuardrailStatus::Passed));
}

#[test]
fn unconfigured_check_is_an_error() {
    let mut map = GuardrailStatusMap::new(&GuardrailCheck::SINGLE_TURN);
    let err = map.record(GuardrailCheck::Consistency, true).unwrap_err();
    assert!(matches!(err, AskDbError::GuardrailNotConfigured { .. }));
}

#[test]
fn all_passed_requires_every_check_to_have_run() {
    let mut map = GuardrailStatusMap::new(&GuardrailCheck::SINGLE_TURN);
    map.record(GuardrailCheck::ContainsCode, true).unwrap();
    map.record(GuardrailCheck::Safety, true).unwrap();
    assert!(!map.all_passed());

    map.record(GuardrailCheck::Relevance, true).unwrap();
    assert!(map.all_passed());
}

#[test]
fn serializes_with_snake_case_checks_and_human_labels() {
    let mut map = GuardrailStatusMap::new(&GuardrailCheck::SINGLE_TURN);
    map.record(GuardrailCheck::ContainsCode, false).unwrap();

    let json = serde_json::to_value(&map).unwrap();
    assert_eq!(json["contains_code"], "Query contains code");
    assert_eq!(json["safety"], "Did not run");
    assert_eq!(json["relevance"], "Did not run");

    let back: GuardrailStatusMap = serde_json::from_value(json).unwrap();
    assert_eq!(back, map);
}

#[test]
fn labels_round_trip_through_from_label() {
    assert_eq!(
        GuardrailStatus::from_label("Query unsafe"),
        Some(GuardrailStatus::Unsafe)
    );
    assert_eq!(GuardrailStatus::from_label("unknown"), None);
    assert!(GuardrailStatus::Irrelevant.is_rejection());
    assert!(!GuardrailStatus::NotRun.is_rejection());
}
