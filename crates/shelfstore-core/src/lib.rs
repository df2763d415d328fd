//! Shelfstore Core — flat-file product catalog with a movement audit trail
//!
//! Products live in one CSV file that is always loaded and rewritten whole.
//! Every location change appends a row to a second, append-only CSV file.
//!
//! # Architecture
//!
//! - **Record codec**: product ↔ catalog row, lenient list parsing
//! - **Catalog store**: load, append, atomic rewrite, delete by key
//! - **Movement log**: append-only audit of location changes
//! - **Key allocator**: next sequential `OBEN###` key
//! - **Inventory**: session-checked operations over the above
//!
//! # Known limitations
//!
//! No cross-process locking: two processes rewriting the same catalog race
//! and the last rewrite wins. List cells are not escaped, so a location
//! containing a comma splits in two when reloaded.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod inventory;
pub mod keys;
pub mod movement;
pub mod platform_durability;
pub mod record;

// Re-export key types for convenience
pub use auth::{Action, CredentialTable, Role, Session};
pub use catalog::{Catalog, CatalogStore};
pub use config::Config;
pub use error::{ShelfError, ShelfResult, ValidationError};
pub use inventory::{Inventory, NewProduct};
pub use keys::KeyAllocator;
pub use movement::{Movement, MovementLog};
pub use record::{CatalogRow, Product};
