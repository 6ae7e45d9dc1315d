use crate::error::{PbiError, Result};
use serde_json::{Map, Value};

/// One result row: column name to value, in the order the engine returned them.
pub type QueryRow = Map<String, Value>;

/// Pull `results[0].tables[0].rows` out of an executeQueries response.
pub fn extract_rows(response: &Value) -> Result<Vec<QueryRow>> {
    let result = response
        .get("results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .ok_or_else(|| shape_error("missing results[0]"))?;

    if let Some(error) = result.get("error") {
        return Err(shape_error(&format!("query engine error: {}", error)));
    }

    let rows = result
        .get("tables")
        .and_then(Value::as_array)
        .and_then(|tables| tables.first())
        .ok_or_else(|| shape_error("missing results[0].tables[0]"))?
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| shape_error("missing results[0].tables[0].rows"))?;

    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            row.as_object()
                .cloned()
                .ok_or_else(|| shape_error(&format!("row {} is not an object", idx)))
        })
        .collect()
}

fn shape_error(detail: &str) -> PbiError {
    PbiError::QueryResultShape(detail.to_string())
}
