//! REST path templates under the API base URL.

pub fn datasets(base: &str, workspace_id: &str) -> String {
    format!("{}/groups/{}/datasets", base, workspace_id)
}

pub fn reports(base: &str, workspace_id: &str) -> String {
    format!("{}/groups/{}/reports", base, workspace_id)
}

pub fn dataset(base: &str, workspace_id: &str, dataset_id: &str) -> String {
    format!("{}/groups/{}/datasets/{}", base, workspace_id, dataset_id)
}

pub fn execute_queries(base: &str, dataset_id: &str) -> String {
    format!("{}/datasets/{}/executeQueries", base, dataset_id)
}

pub fn refreshes(base: &str, workspace_id: &str, dataset_id: &str) -> String {
    format!(
        "{}/groups/{}/datasets/{}/refreshes",
        base, workspace_id, dataset_id
    )
}
