//! portalsync: multi-tenant content synchronization service
//!
//! Mirrors remote content folders into a SQLite store per tenant, detects
//! additions, updates, and deletions, renders ingested items into static
//! HTML card fragments, and publishes one aggregate fragment per folder.

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod parse;
pub mod render;
pub mod source;
pub mod sync;
pub mod tenant;
