use crate::data::datatable::DataValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Read `key` from a JSON object as text. Absent or null gives None.
fn text_field(obj: &Value, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// The `value` array of an OData collection envelope. A missing key is an empty collection.
pub fn collection_items(envelope: &Value) -> &[Value] {
    envelope
        .get("value")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl DatasetRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
        }
    }

    pub fn from_json(obj: &Value) -> Self {
        Self {
            id: text_field(obj, "id"),
            name: text_field(obj, "name"),
        }
    }
}

/// A report plus, when resolved, the dataset it is bound to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub dataset_id: Option<String>,
    pub dataset_name: Option<String>,
}

impl ReportRecord {
    pub fn from_json(obj: &Value) -> Self {
        Self {
            id: text_field(obj, "id"),
            name: text_field(obj, "name"),
            dataset_id: text_field(obj, "datasetId"),
            dataset_name: None,
        }
    }
}

/// A record type with a fixed column layout.
pub trait TabularRecord {
    fn headers() -> &'static [&'static str];
    fn cells(&self) -> Vec<DataValue>;
}

fn opt_cell(value: &Option<String>) -> DataValue {
    value
        .as_ref()
        .map(|s| DataValue::String(s.clone()))
        .unwrap_or(DataValue::Null)
}

impl TabularRecord for DatasetRecord {
    fn headers() -> &'static [&'static str] {
        &["id", "name"]
    }

    fn cells(&self) -> Vec<DataValue> {
        vec![opt_cell(&self.id), opt_cell(&self.name)]
    }
}

/// Report-only listing: `id, name`.
#[derive(Debug, Clone, Copy)]
pub struct ReportSummary<'a>(pub &'a ReportRecord);

impl TabularRecord for ReportSummary<'_> {
    fn headers() -> &'static [&'static str] {
        &["id", "name"]
    }

    fn cells(&self) -> Vec<DataValue> {
        vec![opt_cell(&self.0.id), opt_cell(&self.0.name)]
    }
}

impl TabularRecord for ReportRecord {
    fn headers() -> &'static [&'static str] {
        &["report_id", "report_name", "dataset_id", "dataset_name"]
    }

    fn cells(&self) -> Vec<DataValue> {
        vec![
            opt_cell(&self.id),
            opt_cell(&self.name),
            opt_cell(&self.dataset_id),
            opt_cell(&self.dataset_name),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dataset_from_json() {
        let record = DatasetRecord::from_json(&json!({"id": "d1", "name": "Sales", "extra": 1}));
        assert_eq!(record, DatasetRecord::new("d1", "Sales"));
    }

    #[test]
    fn test_missing_fields_become_none() {
        let record = DatasetRecord::from_json(&json!({"name": null}));
        assert_eq!(record.id, None);
        assert_eq!(record.name, None);

        let report = ReportRecord::from_json(&json!({"id": "r1"}));
        assert_eq!(report.id.as_deref(), Some("r1"));
        assert_eq!(report.dataset_id, None);
    }

    #[test]
    fn test_collection_items_missing_value() {
        assert!(collection_items(&json!({})).is_empty());
        assert_eq!(collection_items(&json!({"value": [1, 2]})).len(), 2);
    }

    #[test]
    fn test_report_cells_follow_headers() {
        let report = ReportRecord {
            id: Some("r1".into()),
            name: Some("Overview".into()),
            dataset_id: Some("d1".into()),
            dataset_name: None,
        };
        let cells = report.cells();
        assert_eq!(cells.len(), ReportRecord::headers().len());
        assert_eq!(cells[3], DataValue::Null);
        assert_eq!(ReportSummary(&report).cells().len(), 2);
    }
}
