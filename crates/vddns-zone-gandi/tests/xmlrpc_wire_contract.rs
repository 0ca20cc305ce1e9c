//! Contract Test: Gandi XML-RPC Wire Format
//!
//! Runs the client against a local stub endpoint.
//!
//! Constraints verified:
//! - Every call carries the API key as its first parameter
//! - Method names follow the versioned zone API
//! - Faults, HTTP errors and `false`/zero answers surface as errors
//! - A full update transaction issues the expected sequence of calls

mod common;

use common::*;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use vddns_core::config::Platform;
use vddns_core::traits::{NewRecord, RecordId, VersionId, ZoneApi, ZoneId};
use vddns_core::{Error, UpdateOutcome, UpdateTransaction};
use vddns_zone_gandi::GandiZoneApi;

const ZONE: ZoneId = ZoneId(1234);

fn client_for(stub: &StubServer) -> GandiZoneApi {
    assert_ok!(GandiZoneApi::new(
        "test-key",
        Platform::Testing,
        Duration::from_secs(5)
    ))
    .with_endpoint(stub.url.clone())
}

fn method_of(request: &str) -> &str {
    let start = request.find("<methodName>").map(|i| i + 12).unwrap_or(0);
    let end = request.find("</methodName>").unwrap_or(start);
    &request[start..end]
}

#[tokio::test]
async fn reads_active_version_from_zone_info() {
    let stub = StubServer::start(vec![ok(
        "<value><struct>\
           <member><name>name</name><value><string>example.com</string></value></member>\
           <member><name>version</name><value><int>7</int></value></member>\
         </struct></value>",
    )])
    .await;
    let api = client_for(&stub);

    let version = assert_ok!(api.current_active_version(ZONE).await);

    assert_eq!(version, VersionId(7));
    let requests = stub.requests();
    assert_eq!(method_of(&requests[0]), "domain.zone.info");
    assert!(requests[0].contains(
        "<params><param><value><string>test-key</string></value></param>\
         <param><value><int>1234</int></value></param></params>"
    ));
}

#[tokio::test]
async fn full_transaction_against_stub() {
    let stub = StubServer::start(vec![
        ok(&int(8)),
        ok(&array(&[
            record(201, "mail", "9.9.9.9"),
            record(202, "home", "1.2.3.4"),
        ])),
        ok(&int(1)),
        ok(&record(203, "home", "5.6.7.8")),
        ok(&boolean(true)),
        ok(&boolean(true)),
    ])
    .await;
    let api = client_for(&stub);

    let outcome = UpdateTransaction::new(
        &api,
        ZONE,
        VersionId(7),
        NewRecord::new("home", "A", "5.6.7.8", 300),
    )
    .execute()
    .await;

    assert!(matches!(outcome, UpdateOutcome::Success(VersionId(8))));

    let requests = stub.requests();
    let methods: Vec<&str> = requests.iter().map(|r| method_of(r)).collect();
    assert_eq!(
        methods,
        vec![
            "domain.zone.version.new",
            "domain.zone.record.list",
            "domain.zone.record.delete",
            "domain.zone.record.add",
            "domain.zone.version.set",
            "domain.zone.version.delete",
        ]
    );
    for request in &requests {
        assert!(request.contains("<param><value><string>test-key</string></value></param>"));
    }
    assert!(requests[2].contains("<member><name>id</name><value><int>202</int></value></member>"));
    assert!(requests[3].contains("<member><name>value</name><value><string>5.6.7.8</string></value></member>"));
    assert!(requests[4].contains("<param><value><int>8</int></value></param>"));
    assert!(requests[5].contains("<param><value><int>7</int></value></param>"));
}

#[tokio::test]
async fn fault_becomes_zone_api_error() {
    let stub = StubServer::start(vec![fault(510042, "Version is active")]).await;
    let api = client_for(&stub);

    let err = assert_err!(api.delete_version(ZONE, VersionId(7)).await);

    let Error::ZoneApi { api, message } = err else {
        panic!("expected ZoneApi, got {:?}", err);
    };
    assert_eq!(api, "gandi");
    assert!(message.contains("510042"));
    assert!(message.contains("Version is active"));
}

#[tokio::test]
async fn unauthorized_status_is_an_auth_error() {
    let stub = StubServer::start(vec![(401, "denied".to_string())]).await;
    let api = client_for(&stub);

    let err = assert_err!(api.list_records(ZONE, VersionId(7)).await);
    assert!(matches!(err, Error::Authentication(_)));
    assert!(!err.to_string().contains("test-key"));
}

#[tokio::test]
async fn server_error_is_transient_zone_api_error() {
    let stub = StubServer::start(vec![(503, "maintenance".to_string())]).await;
    let api = client_for(&stub);

    let err = assert_err!(api.clone_version(ZONE, VersionId(7)).await);
    assert!(matches!(err, Error::ZoneApi { .. }));
}

#[tokio::test]
async fn false_answers_are_errors() {
    let stub = StubServer::start(vec![ok(&boolean(false)), ok(&boolean(false))]).await;
    let api = client_for(&stub);

    assert_err!(api.activate_version(ZONE, VersionId(8)).await);
    assert_err!(api.delete_version(ZONE, VersionId(8)).await);
}

#[tokio::test]
async fn zero_deleted_records_is_an_error() {
    let stub = StubServer::start(vec![ok(&int(0)), ok(&int(1))]).await;
    let api = client_for(&stub);

    assert_err!(api.delete_record(ZONE, VersionId(8), RecordId(202)).await);
    assert_ok!(api.delete_record(ZONE, VersionId(8), RecordId(202)).await);
}

#[tokio::test]
async fn malformed_record_list_is_rejected() {
    let stub = StubServer::start(vec![ok(&array(&[int(5)]))]).await;
    let api = client_for(&stub);

    assert_err!(api.list_records(ZONE, VersionId(7)).await);
}
