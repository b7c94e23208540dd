// SPDX-License-Identifier: PMPL-1.0-or-later
//! End-to-end queries against a catalog snapshot.

use insight_query::{
    Dataset, DatasetCatalog, QueryConfig, QueryEngine, QueryError, ResultRow, Room, Section,
};
use serde_json::{json, Value};

fn section(dept: &str, id: &str, instructor: &str, avg: f64, year: f64) -> Section {
    Section {
        uuid: format!("{dept}{id}{year}{avg}"),
        id: id.to_string(),
        title: format!("{dept} {id}"),
        instructor: instructor.to_string(),
        dept: dept.to_string(),
        year,
        avg,
        pass: 40.0,
        fail: 2.0,
        audit: 1.0,
    }
}

fn room(shortname: &str, number: &str, seats: f64, furniture: &str) -> Room {
    Room {
        fullname: format!("{shortname} Hall"),
        shortname: shortname.to_string(),
        number: number.to_string(),
        name: format!("{shortname}_{number}"),
        address: "6245 Agronomy Road".to_string(),
        lat: 49.26125,
        lon: -123.24807,
        seats,
        room_type: "Tiered Large Group".to_string(),
        furniture: furniture.to_string(),
        href: format!("http://rooms.example/{shortname}-{number}"),
    }
}

fn catalog() -> DatasetCatalog {
    let catalog = DatasetCatalog::new();
    catalog
        .add_dataset(Dataset::sections(
            "sections",
            vec![
                section("cpsc", "110", "kiczales, gregor", 78.5, 2014.0),
                section("cpsc", "121", "wolfman, steve", 80.0, 2015.0),
                section("cpsc", "121", "belleville, patrice", 90.0, 2016.0),
                section("math", "100", "smith, jane", 65.25, 2015.0),
                section("math", "101", "smith, jane", 72.0, 1900.0),
                section("biol", "200", "", 88.0, 2016.0),
            ],
        ))
        .unwrap();
    catalog
        .add_dataset(Dataset::rooms(
            "rooms",
            vec![
                room("DMP", "110", 120.0, "Classroom-Fixed Tables/Movable Chairs"),
                room("DMP", "310", 160.0, "Classroom-Fixed Tables/Movable Chairs"),
                room("ANGU", "098", 260.0, "Classroom-Fixed Tablets"),
                room("ANGU", "037", 54.0, "Classroom-Movable Tables & Chairs"),
                room("WOOD", "2", 503.0, "Classroom-Fixed Tablets"),
            ],
        ))
        .unwrap();
    catalog
}

fn run(raw: Value) -> Result<Vec<ResultRow>, QueryError> {
    let snapshot = catalog().snapshot().unwrap();
    QueryEngine::default().perform_query(&snapshot, &raw)
}

fn rows(values: Value) -> Vec<ResultRow> {
    serde_json::from_value(values).unwrap()
}

#[test]
fn test_grouped_average_with_ordering() {
    let got = run(json!({
        "WHERE": {"AND": [
            {"IS": {"sections_dept": "cpsc"}},
            {"GT": {"sections_avg": 79}}
        ]},
        "OPTIONS": {
            "COLUMNS": ["sections_dept", "sections_id", "avgMark"],
            "ORDER": {"dir": "DOWN", "keys": ["avgMark"]}
        },
        "TRANSFORMATIONS": {
            "GROUP": ["sections_dept", "sections_id"],
            "APPLY": [{"avgMark": {"AVG": "sections_avg"}}]
        }
    }))
    .unwrap();
    assert_eq!(
        got,
        rows(json!([{"sections_dept": "cpsc", "sections_id": "121", "avgMark": 85}]))
    );
}

#[test]
fn test_plain_filter_columns_only() {
    let got = run(json!({
        "WHERE": {"IS": {"sections_dept": "cpsc"}},
        "OPTIONS": {"COLUMNS": ["sections_dept", "sections_id"]}
    }))
    .unwrap();
    assert_eq!(got.len(), 3);
    assert!(got.iter().all(|r| r.len() == 2 && r["sections_dept"] == "cpsc"));
}

#[test]
fn test_empty_where_matches_all() {
    let got = run(json!({
        "WHERE": {},
        "OPTIONS": {"COLUMNS": ["rooms_name"], "ORDER": "rooms_name"}
    }))
    .unwrap();
    let names: Vec<&str> = got.iter().map(|r| r["rooms_name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["ANGU_037", "ANGU_098", "DMP_110", "DMP_310", "WOOD_2"]);
}

#[test]
fn test_not_or_and_wildcards() {
    let got = run(json!({
        "WHERE": {"NOT": {"OR": [
            {"IS": {"rooms_furniture": "*Tablets"}},
            {"LT": {"rooms_seats": 100}}
        ]}},
        "OPTIONS": {"COLUMNS": ["rooms_name", "rooms_seats"], "ORDER": "rooms_seats"}
    }))
    .unwrap();
    assert_eq!(
        got,
        rows(json!([
            {"rooms_name": "DMP_110", "rooms_seats": 120},
            {"rooms_name": "DMP_310", "rooms_seats": 160}
        ]))
    );

    let got = run(json!({
        "WHERE": {"IS": {"rooms_furniture": "*Movable*"}},
        "OPTIONS": {"COLUMNS": ["rooms_name"]}
    }))
    .unwrap();
    assert_eq!(got.len(), 3);
}

#[test]
fn test_empty_string_pattern_matches_only_empty() {
    let got = run(json!({
        "WHERE": {"IS": {"sections_instructor": ""}},
        "OPTIONS": {"COLUMNS": ["sections_dept"]}
    }))
    .unwrap();
    assert_eq!(got, rows(json!([{"sections_dept": "biol"}])));
}

#[test]
fn test_interior_wildcard_rejected() {
    let err = run(json!({
        "WHERE": {"IS": {"sections_dept": "c*sc"}},
        "OPTIONS": {"COLUMNS": ["sections_dept"]}
    }))
    .unwrap_err();
    assert!(err.is_structure());
}

#[test]
fn test_type_mismatch_rejected() {
    for clause in [
        json!({"GT": {"sections_dept": 5}}),
        json!({"IS": {"sections_avg": "90"}}),
        json!({"EQ": {"sections_avg": "90"}}),
    ] {
        let err = run(json!({"WHERE": clause, "OPTIONS": {"COLUMNS": ["sections_dept"]}}))
            .unwrap_err();
        assert!(err.is_structure(), "{clause} should be rejected");
    }
}

#[test]
fn test_all_aggregate_tokens() {
    let got = run(json!({
        "WHERE": {},
        "OPTIONS": {
            "COLUMNS": ["sections_dept", "hi", "lo", "total", "mean", "teachers"],
            "ORDER": "sections_dept"
        },
        "TRANSFORMATIONS": {
            "GROUP": ["sections_dept"],
            "APPLY": [
                {"hi": {"MAX": "sections_avg"}},
                {"lo": {"MIN": "sections_avg"}},
                {"total": {"SUM": "sections_avg"}},
                {"mean": {"AVG": "sections_avg"}},
                {"teachers": {"COUNT": "sections_instructor"}}
            ]
        }
    }))
    .unwrap();
    assert_eq!(
        got,
        rows(json!([
            {"sections_dept": "biol", "hi": 88, "lo": 88, "total": 88, "mean": 88, "teachers": 1},
            {"sections_dept": "cpsc", "hi": 90, "lo": 78.5, "total": 248.5, "mean": 82.83, "teachers": 3},
            {"sections_dept": "math", "hi": 72, "lo": 65.25, "total": 137.25, "mean": 68.63, "teachers": 1}
        ]))
    );
}

#[test]
fn test_numeric_aggregate_on_text_rejected() {
    let err = run(json!({
        "WHERE": {},
        "OPTIONS": {"COLUMNS": ["sections_dept", "x"]},
        "TRANSFORMATIONS": {
            "GROUP": ["sections_dept"],
            "APPLY": [{"x": {"AVG": "sections_title"}}]
        }
    }))
    .unwrap_err();
    assert!(err.is_structure());
}

#[test]
fn test_duplicate_apply_key_rejected() {
    let err = run(json!({
        "WHERE": {},
        "OPTIONS": {"COLUMNS": ["rooms_shortname", "x"]},
        "TRANSFORMATIONS": {
            "GROUP": ["rooms_shortname"],
            "APPLY": [{"x": {"MAX": "rooms_seats"}}, {"x": {"MIN": "rooms_seats"}}]
        }
    }))
    .unwrap_err();
    assert!(err.to_string().contains("duplicate APPLY key"));
}

#[test]
fn test_mixed_datasets_rejected() {
    let err = run(json!({
        "WHERE": {"GT": {"rooms_seats": 100}},
        "OPTIONS": {"COLUMNS": ["sections_dept"]}
    }))
    .unwrap_err();
    assert!(err.is_structure());

    let err = run(json!({
        "WHERE": {},
        "OPTIONS": {"COLUMNS": ["sections_dept", "rooms_name"]}
    }))
    .unwrap_err();
    assert!(err.is_structure());
}

#[test]
fn test_wrong_shape_field_rejected() {
    let err = run(json!({
        "WHERE": {},
        "OPTIONS": {"COLUMNS": ["rooms_dept"]}
    }))
    .unwrap_err();
    assert!(err.is_structure());
}

#[test]
fn test_order_key_not_in_columns_rejected() {
    let err = run(json!({
        "WHERE": {},
        "OPTIONS": {"COLUMNS": ["sections_dept"], "ORDER": "sections_avg"}
    }))
    .unwrap_err();
    assert!(err.is_structure());
}

#[test]
fn test_unknown_dataset_rejected() {
    let err = run(json!({
        "WHERE": {},
        "OPTIONS": {"COLUMNS": ["courses_dept"]}
    }))
    .unwrap_err();
    assert!(err.is_structure());
}

#[test]
fn test_removed_dataset_not_queryable() {
    let catalog = catalog();
    catalog.remove_dataset("rooms").unwrap();
    let snapshot = catalog.snapshot().unwrap();
    let err = QueryEngine::default()
        .perform_query(
            &snapshot,
            &json!({"WHERE": {}, "OPTIONS": {"COLUMNS": ["rooms_name"]}}),
        )
        .unwrap_err();
    assert!(err.is_structure());
}

fn bulk_catalog(n: usize) -> DatasetCatalog {
    let catalog = DatasetCatalog::new();
    let records = (0..n)
        .map(|i| section("bulk", &i.to_string(), "smith, jane", (i % 100) as f64, 2015.0))
        .collect();
    catalog.add_dataset(Dataset::sections("bulk", records)).unwrap();
    catalog
}

#[test]
fn test_result_cap_boundary() {
    let raw = json!({"WHERE": {}, "OPTIONS": {"COLUMNS": ["bulk_id"]}});
    let engine = QueryEngine::default();

    let ok = engine
        .perform_query(&bulk_catalog(5000).snapshot().unwrap(), &raw)
        .unwrap();
    assert_eq!(ok.len(), 5000);

    let err = engine
        .perform_query(&bulk_catalog(5001).snapshot().unwrap(), &raw)
        .unwrap_err();
    assert_eq!(err, QueryError::ResultTooLarge { rows: 5001, limit: 5000 });
}

#[test]
fn test_result_cap_applies_after_grouping() {
    let raw = json!({
        "WHERE": {},
        "OPTIONS": {"COLUMNS": ["bulk_avg", "n"]},
        "TRANSFORMATIONS": {
            "GROUP": ["bulk_avg"],
            "APPLY": [{"n": {"COUNT": "bulk_uuid"}}]
        }
    });
    let got = QueryEngine::default()
        .perform_query(&bulk_catalog(6000).snapshot().unwrap(), &raw)
        .unwrap();
    assert_eq!(got.len(), 100);
    assert!(got.iter().all(|r| r["n"] == 60));
}

#[test]
fn test_result_cap_boundary_on_groups() {
    let raw = json!({
        "WHERE": {},
        "OPTIONS": {"COLUMNS": ["bulk_id", "n"]},
        "TRANSFORMATIONS": {
            "GROUP": ["bulk_id"],
            "APPLY": [{"n": {"COUNT": "bulk_uuid"}}]
        }
    });
    let engine = QueryEngine::default();

    let ok = engine
        .perform_query(&bulk_catalog(5000).snapshot().unwrap(), &raw)
        .unwrap();
    assert_eq!(ok.len(), 5000);
    assert!(ok.iter().all(|r| r["n"] == 1));

    let err = engine
        .perform_query(&bulk_catalog(5001).snapshot().unwrap(), &raw)
        .unwrap_err();
    assert_eq!(err, QueryError::ResultTooLarge { rows: 5001, limit: 5000 });
}

#[test]
fn test_configured_cap() {
    let engine = QueryEngine::new(QueryConfig::default().with_max_results(3));
    let snapshot = catalog().snapshot().unwrap();
    let err = engine
        .perform_query(&snapshot, &json!({"WHERE": {}, "OPTIONS": {"COLUMNS": ["rooms_name"]}}))
        .unwrap_err();
    assert!(err.is_too_large());
}

#[test]
fn test_two_row_sections_scenarios() {
    let data = vec![Dataset::sections(
        "sections",
        vec![
            section("cpsc", "110", "a", 80.0, 2015.0),
            section("cpsc", "121", "b", 90.0, 2015.0),
        ],
    )];
    let engine = QueryEngine::default();

    let filtered = engine
        .perform_query(
            &data,
            &json!({
                "WHERE": {"GT": {"sections_avg": 85}},
                "OPTIONS": {"COLUMNS": ["sections_dept", "sections_id"]}
            }),
        )
        .unwrap();
    assert_eq!(
        filtered,
        rows(json!([{"sections_dept": "cpsc", "sections_id": "121"}]))
    );

    let grouped = engine
        .perform_query(
            &data,
            &json!({
                "WHERE": {},
                "OPTIONS": {"COLUMNS": ["sections_dept", "avgMark"]},
                "TRANSFORMATIONS": {
                    "GROUP": ["sections_dept"],
                    "APPLY": [{"avgMark": {"AVG": "sections_avg"}}]
                }
            }),
        )
        .unwrap();
    assert_eq!(grouped, rows(json!([{"sections_dept": "cpsc", "avgMark": 85}])));
}
