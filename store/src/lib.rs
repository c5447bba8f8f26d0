//! Vector store manager (Qdrant, remote or embedded) and the in-store
//! collection catalog.
//!
//! `spec.md` §4.5/§4.6, grounded on
//! `original_source/tiny_chat/database/qdrant/{qdrant_manager,collection}.py`.

pub mod backend;
pub mod collection;
pub mod config;
pub mod error;
pub mod filter;
pub mod manager;
pub mod schema;
pub mod singleton;

pub use collection::{Collection, STORED_COLLECTION_NAME};
pub use ragcore_core::NO_THRESHOLD;
pub use config::{ConnectionMode, StoreConfig};
pub use error::StoreError;
pub use filter::{FilterSpec, FilterValue};
pub use manager::{VectorStoreManager, DEFAULT_COLLECTION_NAME};
pub use schema::CollectionSchema;
