pub mod ddl;
pub mod processor;
pub mod types;
