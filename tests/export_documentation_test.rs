use pbi_cli::transport::{Method, MockTransport, RequestBody};
use pbi_cli::{ClientConfig, Credentials, PbiError, ServiceClient};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const API: &str = "http://api.test/v1.0/myorg";

fn authenticated(mock: &MockTransport) -> ServiceClient<MockTransport> {
    mock.respond(
        Method::Post,
        "http://idp.test/tenant/oauth2/v2.0/token",
        200,
        r#"{"access_token":"tok"}"#,
    );
    let mut client = ServiceClient::with_transport(
        Credentials::new("tenant", "client", "secret", "scope"),
        ClientConfig::with_base_urls("http://idp.test", API),
        mock.clone(),
    );
    client.fetch_token().unwrap();
    client
}

fn query_url(dataset: &str) -> String {
    format!("{}/datasets/{}/executeQueries", API, dataset)
}

fn workbook_xml(path: &Path) -> String {
    let file = File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut entry = archive.by_name("xl/workbook.xml").unwrap();
    let mut xml = String::new();
    entry.read_to_string(&mut xml).unwrap();
    xml
}

#[test]
fn test_export_writes_four_sheets_in_order() {
    let mock = MockTransport::new();
    let url = query_url("ds-42");
    mock.respond(
        Method::Post,
        &url,
        200,
        r#"{"results":[{"tables":[{"rows":[{"[TableID]":1,"[ExplicitName]":"Amount","[IsHidden]":false}]}]}]}"#,
    );
    mock.respond(
        Method::Post,
        &url,
        200,
        r#"{"results":[{"tables":[{"rows":[{"[ID]":1,"[Name]":"Sales"}]}]}]}"#,
    );
    mock.respond(
        Method::Post,
        &url,
        200,
        r#"{"results":[{"tables":[{"rows":[]}]}]}"#,
    );
    mock.respond(
        Method::Post,
        &url,
        200,
        r#"{"results":[{"tables":[{"rows":[{"[FromTableID]":1,"[ToTableID]":2}]}]}]}"#,
    );
    let client = authenticated(&mock);
    let dir = tempfile::tempdir().unwrap();

    let path = client.export_documentation("ds-42", dir.path()).unwrap();
    assert_eq!(path, dir.path().join("Documentation_ds-42.xlsx"));

    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries.len(), 1, "staging file left behind: {:?}", entries);

    let xml = workbook_xml(&path);
    let positions: Vec<usize> = ["columns", "tables", "measures", "relations"]
        .iter()
        .map(|name| {
            xml.find(&format!("name=\"{}\"", name))
                .unwrap_or_else(|| panic!("sheet {} missing", name))
        })
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(xml.matches("<sheet ").count(), 4);

    let queries: Vec<String> = mock
        .requests()
        .into_iter()
        .filter(|r| r.url == url)
        .filter_map(|r| match r.body {
            Some(RequestBody::Json(v)) => v["queries"][0]["query"].as_str().map(String::from),
            _ => None,
        })
        .collect();
    assert_eq!(queries.len(), 4);
    assert!(queries[0].contains("INFO.COLUMNS"));
    assert!(queries[3].contains("INFO.RELATIONSHIPS"));
}

#[test]
fn test_export_failure_on_third_query_leaves_no_file() {
    let mock = MockTransport::new();
    let url = query_url("ds-7");
    let ok = r#"{"results":[{"tables":[{"rows":[{"a":1}]}]}]}"#;
    mock.respond(Method::Post, &url, 200, ok);
    mock.respond(Method::Post, &url, 200, ok);
    mock.respond(Method::Post, &url, 500, "engine unavailable");
    let client = authenticated(&mock);
    let dir = tempfile::tempdir().unwrap();

    let err = client.export_documentation("ds-7", dir.path()).unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    assert!(!dir.path().join("Documentation_ds-7.xlsx").exists());
}

#[test]
fn test_export_shape_error_leaves_no_file() {
    let mock = MockTransport::new();
    mock.respond(Method::Post, &query_url("ds-8"), 200, r#"{"results":[]}"#);
    let client = authenticated(&mock);
    let dir = tempfile::tempdir().unwrap();

    let err = client.export_documentation("ds-8", dir.path()).unwrap_err();
    assert!(matches!(err, PbiError::QueryResultShape(_)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_export_replaces_previous_file() {
    let mock = MockTransport::new();
    mock.respond(
        Method::Post,
        &query_url("ds-9"),
        200,
        r#"{"results":[{"tables":[{"rows":[{"a":"x"}]}]}]}"#,
    );
    let client = authenticated(&mock);
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("Documentation_ds-9.xlsx");
    std::fs::write(&target, b"stale").unwrap();

    client.export_documentation("ds-9", dir.path()).unwrap();
    assert!(workbook_xml(&target).contains("name=\"relations\""));
}
