use crate::data::datatable::{DataColumn, DataRow, DataTable, DataValue};
use crate::data::query_result::QueryRow;
use crate::models::TabularRecord;

/// Builds `DataTable`s out of query rows and API records
pub struct DataTableConverter;

impl DataTableConverter {
    /// Flatten query rows into a table.
    ///
    /// Columns are the union of every row's keys in first-seen order. A row missing one
    /// of them gets `Null` in that cell.
    pub fn from_rows(name: impl Into<String>, rows: &[QueryRow]) -> DataTable {
        let column_names = Self::extract_column_names(rows);

        let mut table = DataTable::new(name);
        for col in &column_names {
            table.add_column(DataColumn::new(col.clone()));
        }

        for row in rows {
            let values = column_names
                .iter()
                .map(|col| row.get(col).map(DataValue::from_json).unwrap_or(DataValue::Null))
                .collect();
            table.rows.push(DataRow::new(values));
        }

        table.infer_column_types();
        table
    }

    /// One row per record, columns from the record type's fixed headers.
    pub fn from_records<R: TabularRecord>(name: impl Into<String>, records: &[R]) -> DataTable {
        let mut table = DataTable::new(name);
        for header in R::headers() {
            table.add_column(DataColumn::new(*header));
        }
        for record in records {
            table.rows.push(DataRow::new(record.cells()));
        }
        table.infer_column_types();
        table
    }

    fn extract_column_names(rows: &[QueryRow]) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for row in rows {
            for key in row.keys() {
                if !names.iter().any(|n| n == key) {
                    names.push(key.clone());
                }
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::datatable::DataType;
    use crate::models::{DatasetRecord, ReportRecord};
    use serde_json::{json, Value};

    fn rows(values: Vec<Value>) -> Vec<QueryRow> {
        values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_rows_to_table_keeps_key_order() {
        let data = rows(vec![
            json!({"Table[Name]": "Sales", "Table[Rows]": 120}),
            json!({"Table[Name]": "Dates", "Table[Rows]": 365}),
        ]);
        let table = DataTableConverter::from_rows("tables", &data);

        assert_eq!(table.name, "tables");
        assert_eq!(table.column_names(), vec!["Table[Name]", "Table[Rows]"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.get_value_by_name(1, "Table[Rows]"),
            Some(&DataValue::Integer(365))
        );
        assert_eq!(table.columns[1].data_type, DataType::Integer);
    }

    #[test]
    fn test_ragged_rows_fill_nulls() {
        let data = rows(vec![json!({"a": 1}), json!({"b": "x"})]);
        let table = DataTableConverter::from_rows("t", &data);

        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.get_value(0, 1), Some(&DataValue::Null));
        assert_eq!(table.get_value(1, 0), Some(&DataValue::Null));
        assert_eq!(table.columns[0].null_count, 1);
    }

    #[test]
    fn test_empty_rows() {
        let table = DataTableConverter::from_rows("empty", &[]);
        assert_eq!(table.column_count(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_from_records() {
        let datasets = vec![DatasetRecord::new("d1", "Sales"), DatasetRecord::default()];
        let table = DataTableConverter::from_records("datasets", &datasets);
        assert_eq!(table.column_names(), vec!["id", "name"]);
        assert_eq!(table.get_value(1, 0), Some(&DataValue::Null));

        let reports: Vec<ReportRecord> = vec![];
        let table = DataTableConverter::from_records("reports", &reports);
        assert_eq!(table.column_count(), 4);
    }
}
