use std::time::Duration;

use casegrid_api_client::{ApiClient, ApiError, AuthCredentials};
use casegrid_core::{CellKey, RecordId};
use casegrid_engine::{BulkEditGrid, Schema};
use httpmock::prelude::*;
use serde_json::{json, Map, Value};

fn client(server: &MockServer) -> ApiClient {
    let creds = AuthCredentials::new("test_token", format!("{}/", server.base_url()));
    ApiClient::new(creds, Duration::from_secs(5)).unwrap()
}

fn payload(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[test]
fn list_records_sends_team_and_token() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/testcases/")
            .query_param("team_id", "7")
            .header("Authorization", "Bearer test_token");
        then.status(200)
            .json_body(json!([
                { "id": 1, "test_case_number": "TC-1", "title": "Login" },
                { "id": 2, "test_case_number": "TC-2", "title": "Logout" },
            ]));
    });

    let records = client(&server).list_records("7").unwrap();
    mock.assert();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["title"], json!("Logout"));
}

#[test]
fn list_records_accepts_paginated_envelope() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/testcases/");
        then.status(200)
            .json_body(json!({ "count": 1, "results": [{ "id": "a1", "title": "Only" }] }));
    });

    let records = client(&server).list_records("1").unwrap();
    assert_eq!(records, vec![json!({ "id": "a1", "title": "Only" })]);
}

#[test]
fn unauthorized_maps_to_not_authenticated() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/testcases/");
        then.status(401).json_body(json!({ "detail": "Invalid token." }));
    });

    let err = client(&server).list_records("1").unwrap_err();
    assert!(matches!(err, ApiError::NotAuthenticated));
}

#[test]
fn update_record_puts_partial_body() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/api/testcases/3/")
            .json_body(json!({ "priority": "Low" }));
        then.status(200)
            .json_body(json!({ "id": 3, "title": "Reset", "priority": "Low" }));
    });

    let record = client(&server)
        .update_record(&RecordId::from("3"), &payload(json!({ "priority": "Low" })))
        .unwrap();
    mock.assert();
    assert_eq!(record["priority"], json!("Low"));
}

#[test]
fn validation_error_carries_field_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(PUT).path("/api/testcases/3/");
        then.status(400)
            .json_body(json!({ "title": ["Ensure this field has no more than 255 characters."] }));
    });

    let err = client(&server)
        .update_record(&RecordId::from("3"), &payload(json!({ "title": "x" })))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "title: Ensure this field has no more than 255 characters."
    );
}

#[test]
fn grid_save_through_client_reports_partial_failure() {
    let server = MockServer::start();
    let ok = server.mock(|when, then| {
        when.method(PUT).path("/api/testcases/1/");
        then.status(200)
            .json_body(json!({ "id": 1, "test_case_number": "TC-1", "title": "Renamed" }));
    });
    let failing = server.mock(|when, then| {
        when.method(PUT).path("/api/testcases/2/");
        then.status(500).body("boom");
    });

    let mut grid = BulkEditGrid::new(Schema::test_cases());
    grid.load_records(vec![
        json!({ "id": 1, "test_case_number": "TC-1", "title": "Login" }),
        json!({ "id": 2, "test_case_number": "TC-2", "title": "Logout" }),
    ]);
    grid.select_column(&"title".into());
    grid.batch_assign("Renamed").unwrap();

    let report = grid.save(&client(&server)).unwrap();
    ok.assert();
    failing.assert();

    assert_eq!(report.succeeded, vec![RecordId::from("1")]);
    assert_eq!(report.failed[&RecordId::from("2")], "HTTP 500: boom");
    assert!(grid.pending().get(&CellKey::new("2", "title")).is_some());
    assert!(grid.pending().record(&RecordId::from("1")).is_none());
}
