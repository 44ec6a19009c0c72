pub mod user_import;
pub mod user_mapping;
