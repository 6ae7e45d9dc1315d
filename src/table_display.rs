use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use pbi_cli::data::datatable::{DataTable, DataValue};
use std::path::Path;

pub fn display_table(table: &DataTable) {
    if table.is_empty() {
        println!("No results found.");
        return;
    }

    let mut out = Table::new();
    out.set_content_arrangement(ContentArrangement::Dynamic);
    out.set_header(
        table
            .columns
            .iter()
            .map(|c| Cell::new(&c.name).add_attribute(Attribute::Bold)),
    );

    for row in &table.rows {
        let cells = row.values.iter().zip(&table.columns).map(|(value, column)| {
            let cell = match value {
                DataValue::Null => Cell::new("NULL"),
                other => Cell::new(other.to_string()),
            };
            if column.data_type.is_numeric() {
                cell.set_alignment(CellAlignment::Right)
            } else {
                cell
            }
        });
        out.add_row(cells);
    }

    println!("{out}");
    println!("\n{} rows returned", table.row_count());
}

pub fn export_to_csv(table: &DataTable, path: &Path) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(table.column_names())?;
    for row in table.to_string_table() {
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    println!("Results exported to {}", path.display());
    Ok(())
}
