pub mod cache;
pub mod extract;
pub mod manar;
pub mod types;
