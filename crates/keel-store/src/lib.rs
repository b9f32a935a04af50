//! Keel Store - kind-scoped record stores
//!
//! Provides:
//! - [`ResourceStore`]: the get/create/update/delete contract shared by
//!   shadow and production stores
//! - [`ShadowStore`]: an isolated in-memory store with snapshot reset and an
//!   operation log for post-run audit
//! - [`StoreSnapshot`]: deep, non-aliased copies of store contents
//!
//! # Example
//!
//! ```rust
//! use keel_store::{Record, ResourceStore, ShadowStore};
//!
//! let store = ShadowStore::new();
//! store
//!     .create(&"documents".into(), &"doc-1".into(), Record::new())
//!     .unwrap();
//! assert_eq!(store.log().len(), 1);
//!
//! store.reset();
//! assert!(store.log().is_empty());
//! ```

pub mod error;
pub mod shadow;
pub mod snapshot;
pub mod store;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use shadow::ShadowStore;
pub use snapshot::{Collection, StoreSnapshot};
pub use store::ResourceStore;
pub use types::{
    OperationKind, OperationLogEntry, Record, ResourceId, ResourceKind, CREATED_AT_FIELD,
    ID_FIELD, UPDATED_AT_FIELD,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
