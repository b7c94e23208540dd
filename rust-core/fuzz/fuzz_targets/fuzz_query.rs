// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for the query engine.
// Run with: cargo +nightly fuzz run fuzz_query
//
// Any JSON document is fed to the engine against a small fixed catalog. The
// engine must reject malformed queries with an error, never a panic.

#![no_main]

use std::sync::OnceLock;

use insight_query::{Dataset, QueryConfig, QueryEngine, Room, Section};
use libfuzzer_sys::fuzz_target;

fn datasets() -> &'static [Dataset] {
    static DATASETS: OnceLock<Vec<Dataset>> = OnceLock::new();
    DATASETS.get_or_init(|| {
        let sections = ["cpsc", "math", "biol"]
            .iter()
            .enumerate()
            .map(|(i, dept)| Section {
                uuid: i.to_string(),
                id: format!("1{i}0"),
                title: format!("{dept} intro"),
                instructor: "smith, jane".to_string(),
                dept: dept.to_string(),
                year: 2015.0,
                avg: 70.0 + i as f64,
                pass: 10.0,
                fail: 1.0,
                audit: 0.0,
            })
            .collect();
        let rooms = vec![Room {
            fullname: "Hugh Dempster Pavilion".to_string(),
            shortname: "DMP".to_string(),
            number: "110".to_string(),
            name: "DMP_110".to_string(),
            address: "6245 Agronomy Road".to_string(),
            lat: 49.26125,
            lon: -123.24807,
            seats: 120.0,
            room_type: "Tiered Large Group".to_string(),
            furniture: "Classroom-Fixed Tables/Movable Chairs".to_string(),
            href: "http://rooms.example/DMP-110".to_string(),
        }];
        vec![
            Dataset::sections("sections", sections),
            Dataset::rooms("rooms", rooms),
        ]
    })
}

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 {
        return;
    }
    if let Ok(raw) = serde_json::from_slice::<serde_json::Value>(data) {
        let engine = QueryEngine::new(QueryConfig::default().with_max_results(2));
        let _ = engine.perform_query(datasets(), &raw);
    }
});
