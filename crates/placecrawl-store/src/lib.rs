//! Persistence for crawl output: per-flush partial artifacts, the
//! consolidated master snapshot, and the id set loaded from it. Everything
//! goes through [`Storage`], which is a local directory or an S3 prefix.

pub mod consolidate;
pub mod error;
pub mod master;
pub mod partial;
pub mod storage;

pub use consolidate::{consolidate, ConsolidationReport};
pub use error::StoreError;
pub use master::{latest_master, list_masters, load_master_ids, master_file_name, write_master};
pub use object_store::path::Path as ObjectPath;
pub use partial::PartialWriter;
pub use storage::Storage;
