pub mod envelope;
pub mod handler;
pub mod registry;
pub mod result;
pub mod tables;
pub mod validate;
