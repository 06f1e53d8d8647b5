// ABOUTME: Library root for enginewire - stream decoding and field mapping.
// ABOUTME: The inspection binary is in main.rs.

pub mod config;
pub mod error;
pub mod mapping;
pub mod query;
pub mod stream;
pub mod types;
