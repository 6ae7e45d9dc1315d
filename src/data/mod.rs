pub mod datatable;
pub mod datatable_converter;
pub mod query_result;
