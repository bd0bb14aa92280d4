//! ============================================================================
//! CATALOG-CORE: Pearl Verse Shop Engine
//! ============================================================================
//! Client-side engine for the avatar shop catalog:
//! - Typed HTTP/JSON client for the shop REST endpoints
//! - CatalogView: ownership-aware filtering, sorting, and pagination over
//!   a merge-only local cache, with a one-item-per-slot equip model
//! - Compact pearl-amount formatting for display layers
//! ============================================================================

pub mod client;
pub mod format;
pub mod types;
pub mod view;

// Re-export main types for convenience
pub use client::{
    CatalogApi, ConfigurationSnapshot, EquipAction, HttpCatalogClient, ItemPage, ItemQuery,
    Pagination,
};
pub use types::*;
pub use view::CatalogView;
