//! Command handlers for the warcsift binary

pub mod create;
pub mod init;
pub mod languages;
pub mod status;
