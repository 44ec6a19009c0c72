//! CSV user import service.
//!
//! Decodes a CSV file with dotted headers into nested records, stores them as
//! user rows in one transaction and reports the age distribution over HTTP.

pub mod app;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;

pub use app::run;
