use crate::auth::{self, BearerToken};
use crate::config::{ClientConfig, DatasetResolution};
use crate::credentials::Credentials;
use crate::data::datatable::DataTable;
use crate::data::datatable_converter::DataTableConverter;
use crate::data::query_result::{extract_rows, QueryRow};
use crate::endpoints;
use crate::error::{PbiError, Result};
use crate::export::{self, AtomicOutput, DocumentationSheet};
use crate::models::{collection_items, DatasetRecord, ReportRecord};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Client for the analytics REST API.
///
/// Construction never touches the network. Call [`fetch_token`](Self::fetch_token) once
/// before anything else; every other operation fails with
/// [`PbiError::NotAuthenticated`] until then, without sending a request. The token is
/// never renewed automatically, so call `fetch_token` again once it has expired.
///
/// Not meant to be shared between threads; use one client per caller.
pub struct ServiceClient<T: HttpTransport = ReqwestTransport> {
    credentials: Credentials,
    config: ClientConfig,
    transport: T,
    token: Option<BearerToken>,
}

impl ServiceClient<ReqwestTransport> {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self::with_transport(
            Credentials::new(tenant_id, client_id, client_secret, scope),
            ClientConfig::default(),
            ReqwestTransport::new(),
        )
    }

    /// Client over reqwest honouring `config.timeout_secs`.
    pub fn with_config(credentials: Credentials, config: ClientConfig) -> Result<Self> {
        let transport = match config.timeout_secs {
            Some(secs) => ReqwestTransport::with_timeout(Duration::from_secs(secs))?,
            None => ReqwestTransport::new(),
        };
        Ok(Self::with_transport(credentials, config, transport))
    }
}

impl<T: HttpTransport> ServiceClient<T> {
    pub fn with_transport(credentials: Credentials, config: ClientConfig, transport: T) -> Self {
        Self {
            credentials,
            config,
            transport,
            token: None,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Acquire a bearer token with the client-credentials grant and keep it.
    ///
    /// Any previous token is dropped first, so a failed renewal leaves the client
    /// unauthenticated.
    pub fn fetch_token(&mut self) -> Result<()> {
        self.token = None;
        let token = auth::fetch_token(&self.transport, &self.credentials, &self.config)?;
        self.token = Some(token);
        Ok(())
    }

    fn bearer(&self) -> Result<&BearerToken> {
        self.token.as_ref().ok_or(PbiError::NotAuthenticated)
    }

    fn base(&self) -> &str {
        self.config.api_base_url.trim_end_matches('/')
    }

    fn send_authenticated(&self, request: HttpRequest) -> Result<HttpResponse> {
        let token = self.bearer()?;
        let request = request.header("Authorization", token.authorization_header());
        debug!(target: "api", "{} {}", request.method, request.url);
        self.transport.send(request)
    }

    /// Send and insist on exactly `expected` as the status.
    fn send_expecting(&self, request: HttpRequest, expected: u16) -> Result<HttpResponse> {
        let response = self.send_authenticated(request)?;
        if response.status != expected {
            debug!(target: "api", "Unexpected status {} (wanted {})", response.status, expected);
            return Err(PbiError::api(response.status, response.body));
        }
        Ok(response)
    }

    fn get_json(&self, url: String) -> Result<Value> {
        self.send_expecting(HttpRequest::get(url), 200)?.json()
    }

    pub fn list_datasets(&self, workspace_id: &str) -> Result<Vec<DatasetRecord>> {
        let body = self.get_json(endpoints::datasets(self.base(), workspace_id))?;
        let datasets: Vec<DatasetRecord> = collection_items(&body)
            .iter()
            .map(DatasetRecord::from_json)
            .collect();
        info!(target: "api", "Workspace {}: {} datasets", workspace_id, datasets.len());
        Ok(datasets)
    }

    /// Reports with id and name only; the dataset fields are left as the listing gives them.
    pub fn list_reports(&self, workspace_id: &str) -> Result<Vec<ReportRecord>> {
        let body = self.get_json(endpoints::reports(self.base(), workspace_id))?;
        let reports: Vec<ReportRecord> = collection_items(&body)
            .iter()
            .map(ReportRecord::from_json)
            .collect();
        info!(target: "api", "Workspace {}: {} reports", workspace_id, reports.len());
        Ok(reports)
    }

    pub fn get_dataset(&self, workspace_id: &str, dataset_id: &str) -> Result<DatasetRecord> {
        let body = self.get_json(endpoints::dataset(self.base(), workspace_id, dataset_id))?;
        Ok(DatasetRecord::from_json(&body))
    }

    /// Reports with their dataset names resolved, one detail lookup per report that has a
    /// dataset id.
    ///
    /// A lookup answered with an error status follows `config.dataset_resolution`.
    /// `Lenient` logs it and leaves `dataset_name` empty. `Strict` returns it. Transport and
    /// decode failures are always returned.
    pub fn list_reports_with_datasets(&self, workspace_id: &str) -> Result<Vec<ReportRecord>> {
        let mut reports = self.list_reports(workspace_id)?;

        for report in &mut reports {
            let dataset_id = match report.dataset_id.as_deref() {
                Some(id) if !id.is_empty() => id,
                _ => continue,
            };

            match self.get_dataset(workspace_id, dataset_id) {
                Ok(dataset) => report.dataset_name = dataset.name,
                Err(err @ PbiError::Api { .. })
                    if self.config.dataset_resolution == DatasetResolution::Lenient =>
                {
                    warn!(
                        target: "api",
                        "Could not resolve dataset {} for report {:?}: {}",
                        dataset_id, report.id, err
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Ok(reports)
    }

    /// Run `query` against a dataset and return the rows of the first result table.
    ///
    /// The text goes to the engine untouched. Callers that splice untrusted input into it
    /// are responsible for escaping it.
    pub fn execute_query(&self, query: &str, dataset_id: &str) -> Result<Vec<QueryRow>> {
        debug!(target: "query", "Dataset {}: {}", dataset_id, query);

        let payload = json!({ "queries": [ { "query": query } ] });
        let request =
            HttpRequest::post(endpoints::execute_queries(self.base(), dataset_id)).json(payload);
        let response = self.send_expecting(request, 200)?;
        let body: Value = serde_json::from_str(&response.body)
            .map_err(|e| PbiError::QueryResultShape(format!("response is not JSON: {}", e)))?;

        let rows = extract_rows(&body)?;
        info!(target: "query", "Dataset {}: {} rows", dataset_id, rows.len());
        Ok(rows)
    }

    /// [`execute_query`](Self::execute_query) flattened into a named table.
    pub fn execute_query_table(
        &self,
        query: &str,
        dataset_id: &str,
        table_name: &str,
    ) -> Result<DataTable> {
        let rows = self.execute_query(query, dataset_id)?;
        Ok(DataTableConverter::from_rows(table_name, &rows))
    }

    /// Write `Documentation_{dataset_id}.xlsx` into `output_dir` with the columns, tables,
    /// measures and relations sheets.
    ///
    /// Either the complete workbook appears at its final path or nothing does.
    pub fn export_documentation(&self, dataset_id: &str, output_dir: &Path) -> Result<PathBuf> {
        // checked up front so a missing token never leaves a staged file behind
        self.bearer()?;
        let output = AtomicOutput::create(output_dir, &export::documentation_file_name(dataset_id))?;

        let mut tables = Vec::with_capacity(DocumentationSheet::ALL.len());
        for sheet in DocumentationSheet::ALL {
            let table = self.execute_query_table(sheet.query(), dataset_id, sheet.sheet_name())?;
            debug!(
                target: "export",
                "Sheet {}: {} rows x {} columns",
                sheet.sheet_name(),
                table.row_count(),
                table.column_count()
            );
            tables.push(table);
        }

        let path = export::write_documentation(output, &tables)?;
        info!(target: "export", "Documentation saved at: {}", path.display());
        Ok(path)
    }

    /// Queue a refresh. Returns once the service accepted it (202), not when it finishes.
    pub fn refresh_dataset(&self, workspace_id: &str, dataset_id: &str) -> Result<()> {
        let request = HttpRequest::post(endpoints::refreshes(self.base(), workspace_id, dataset_id))
            .header("Content-Type", "application/json")
            .empty_body();
        self.send_expecting(request, 202)?;
        info!(target: "api", "Refresh started for dataset: {}", dataset_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Method, MockTransport};

    fn client(mock: &MockTransport) -> ServiceClient<MockTransport> {
        ServiceClient::with_transport(
            Credentials::new("t", "c", "s", "scope"),
            ClientConfig::with_base_urls("http://idp", "http://api/"),
            mock.clone(),
        )
    }

    #[test]
    fn test_new_does_not_fetch() {
        let client = ServiceClient::new("t", "c", "s", "scope");
        assert!(!client.has_token());
        assert_eq!(client.credentials().tenant_id(), "t");
    }

    #[test]
    fn test_authorization_header_attached() {
        let mock = MockTransport::new();
        mock.respond(Method::Post, "http://idp/t/oauth2/v2.0/token", 200, r#"{"access_token":"tok"}"#);
        mock.respond(Method::Get, "http://api/groups/ws/datasets", 200, r#"{"value":[]}"#);

        let mut client = client(&mock);
        client.fetch_token().unwrap();
        client.list_datasets("ws").unwrap();

        let req = mock.last_request().unwrap();
        assert_eq!(req.header_value("Authorization"), Some("Bearer tok"));
    }

    #[test]
    fn test_clear_token_requires_refetch() {
        let mock = MockTransport::new();
        mock.respond(Method::Post, "http://idp/t/oauth2/v2.0/token", 200, r#"{"access_token":"tok"}"#);

        let mut client = client(&mock);
        client.fetch_token().unwrap();
        assert!(client.has_token());
        client.clear_token();

        let calls = mock.call_count();
        assert!(matches!(client.list_reports("ws"), Err(PbiError::NotAuthenticated)));
        assert_eq!(mock.call_count(), calls);
    }

    #[test]
    fn test_failed_fetch_keeps_previous_state() {
        let mock = MockTransport::new();
        mock.respond(Method::Post, "http://idp/t/oauth2/v2.0/token", 400, r#"{"error":"invalid_scope"}"#);

        let mut client = client(&mock);
        assert!(matches!(client.fetch_token(), Err(PbiError::Authentication(_))));
        assert!(!client.has_token());
    }

    #[test]
    fn test_failed_refetch_drops_old_token() {
        let mock = MockTransport::new();
        mock.respond(Method::Post, "http://idp/t/oauth2/v2.0/token", 200, r#"{"access_token":"old"}"#);
        mock.respond(Method::Post, "http://idp/t/oauth2/v2.0/token", 401, r#"{"error":"expired"}"#);

        let mut client = client(&mock);
        client.fetch_token().unwrap();
        assert!(client.has_token());

        assert!(matches!(client.fetch_token(), Err(PbiError::Authentication(_))));
        assert!(!client.has_token());

        let calls = mock.call_count();
        assert!(matches!(client.list_datasets("ws"), Err(PbiError::NotAuthenticated)));
        assert_eq!(mock.call_count(), calls);
    }
}
