pub mod connections;
pub mod schema;
