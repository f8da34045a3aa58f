//! Data access for banners and the catalogs they reference.
//!
//! Each store sits behind a trait so the resolution service can be driven by
//! test doubles; the `Sql*` types are the sea-orm backed implementations.

pub mod banner_store;
pub mod catalog_service;

pub use banner_store::*;
pub use catalog_service::*;
