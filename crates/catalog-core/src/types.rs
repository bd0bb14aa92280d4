//! ============================================================================
//! Core Types for the Pearl Verse Catalog
//! ============================================================================
//! Defines the data model shared by the view engine and the API client:
//! shop items, equip slots, filter state, display pages, and the typed
//! error taxonomy. These mirror the JSON shapes served by the avatar shop
//! backend.
//! ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Server-assigned item identifier, stable across fetches.
pub type ItemId = i64;

/// Items per display page (the shop grid shows 12 cards).
pub const DEFAULT_PAGE_SIZE: usize = 12;

/// Page size used when the full catalog for a category must be pulled so
/// ownership filtering can happen client-side.
pub const FULL_FETCH_LIMIT: usize = 1000;

/// Placeholder shown when an item has no image of its own.
pub const PLACEHOLDER_IMAGE: &str = "/static/images/avatar-placeholder.png";

/// Equip slot an item occupies. Each user wears at most one item per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    Banner,
    Avatar,
    Decoration,
    /// Tag the backend added after this client shipped. Kept displayable
    /// so new categories degrade gracefully instead of failing to parse.
    #[serde(other)]
    Unknown,
}

impl ItemCategory {
    /// The slots a fresh configuration starts with.
    pub const ALL: [ItemCategory; 3] = [
        ItemCategory::Banner,
        ItemCategory::Avatar,
        ItemCategory::Decoration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Banner => "banner",
            ItemCategory::Avatar => "avatar",
            ItemCategory::Decoration => "decoration",
            ItemCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "banner" | "banners" => Ok(ItemCategory::Banner),
            "avatar" | "avatars" => Ok(ItemCategory::Avatar),
            "decoration" | "decorations" => Ok(ItemCategory::Decoration),
            _ => Err(format!(
                "Unknown category '{}'. Valid values: banner, avatar, decoration",
                s
            )),
        }
    }
}

/// Item rarity tier as stored by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    #[default]
    Common,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
            Rarity::Mythic => "mythic",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One purchasable/equippable cosmetic, as reported by the server.
///
/// `owned` and `selected` are per-user flags the backend computes for the
/// requesting session. `selected` reflects the equip state at fetch time;
/// the view's [`EquippedConfiguration`] is the authoritative copy between
/// round-trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub category: ItemCategory,
    #[serde(default)]
    pub rarity: Rarity,
    pub price: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub owned: bool,
    #[serde(default)]
    pub selected: bool,
}

fn default_currency() -> String {
    "pearls".to_string()
}

impl Item {
    /// Image URL with the placeholder fallback applied.
    pub fn image_url(&self) -> &str {
        self.image.as_deref().unwrap_or(PLACEHOLDER_IMAGE)
    }

    /// Case-insensitive key used for name ordering.
    pub fn sort_name(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Which slice of the catalog the category tabs select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    One(ItemCategory),
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("all"),
            CategoryFilter::One(c) => f.write_str(c.as_str()),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(CategoryFilter::All)
        } else {
            s.parse().map(CategoryFilter::One)
        }
    }
}

/// Ownership restriction applied on top of category and search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OwnershipFilter {
    #[default]
    All,
    Owned,
    Unowned,
}

impl OwnershipFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnershipFilter::All => "all",
            OwnershipFilter::Owned => "owned",
            OwnershipFilter::Unowned => "unowned",
        }
    }
}

impl fmt::Display for OwnershipFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OwnershipFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(OwnershipFilter::All),
            "owned" => Ok(OwnershipFilter::Owned),
            "unowned" => Ok(OwnershipFilter::Unowned),
            _ => Err(format!(
                "Unknown ownership filter '{}'. Valid values: all, owned, unowned",
                s
            )),
        }
    }
}

/// The view's query parameters: category tab, search box, ownership
/// dropdown, and the 1-based page cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub category: CategoryFilter,
    pub search: String,
    pub ownership: OwnershipFilter,
    pub page: usize,
    pub page_size: usize,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            category: CategoryFilter::All,
            search: String::new(),
            ownership: OwnershipFilter::All,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Partial filter change. Any category/search/ownership change resets the
/// page to 1; a bare page move keeps the rest of the filter as-is.
#[derive(Debug, Clone, Default)]
pub struct FilterUpdate {
    pub category: Option<CategoryFilter>,
    pub search: Option<String>,
    pub ownership: Option<OwnershipFilter>,
    pub page: Option<usize>,
}

impl FilterUpdate {
    pub fn category(category: CategoryFilter) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    pub fn search(search: impl Into<String>) -> Self {
        Self {
            search: Some(search.into()),
            ..Self::default()
        }
    }

    pub fn ownership(ownership: OwnershipFilter) -> Self {
        Self {
            ownership: Some(ownership),
            ..Self::default()
        }
    }

    pub fn page(page: usize) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }
}

/// Per-user mapping from equip slot to the item currently worn in it.
///
/// Invariant: at most one item per category. The map only ever holds the
/// occupant; an absent key means the slot is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EquippedConfiguration {
    slots: HashMap<ItemCategory, ItemId>,
}

impl EquippedConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// The item occupying `category`, if any.
    pub fn equipped(&self, category: ItemCategory) -> Option<ItemId> {
        self.slots.get(&category).copied()
    }

    /// True when `item` is the current occupant of its slot.
    pub fn is_equipped(&self, item: &Item) -> bool {
        self.equipped(item.category) == Some(item.id)
    }

    /// Occupy `category` with `item_id`, replacing any previous occupant.
    pub fn set(&mut self, category: ItemCategory, item_id: ItemId) {
        self.slots.insert(category, item_id);
    }

    /// Empty the slot for `category`. Idempotent.
    pub fn clear(&mut self, category: ItemCategory) {
        self.slots.remove(&category);
    }

    /// Empty every slot (the "reset avatar" action).
    pub fn clear_all(&mut self) {
        self.slots.clear();
    }

    /// Reverse lookup: which slot holds `item_id`, if any.
    pub fn category_of(&self, item_id: ItemId) -> Option<ItemCategory> {
        self.slots
            .iter()
            .find(|(_, id)| **id == item_id)
            .map(|(cat, _)| *cat)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemCategory, ItemId)> + '_ {
        self.slots.iter().map(|(cat, id)| (*cat, *id))
    }
}

/// Why a display page came back empty, so the front end can show a precise
/// message instead of a generic one. Classification depends only on the
/// filter that produced the page, not on the item count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// The catalog slice itself has nothing in it.
    NoItems,
    /// A search term is active and nothing matched it.
    NoSearchMatches,
    /// An ownership restriction is active and nothing survived it.
    NoOwnershipMatches,
}

impl EmptyReason {
    /// Message shown in the empty-state card.
    pub fn message(&self) -> &'static str {
        match self {
            EmptyReason::NoItems => "No items available in this category yet",
            EmptyReason::NoSearchMatches => "No items found. Try adjusting your search terms",
            EmptyReason::NoOwnershipMatches => {
                "No items found. Try adjusting your ownership filter"
            }
        }
    }
}

/// One renderable page of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayPage {
    /// Items in display order.
    pub items: Vec<Item>,
    /// Total pages for the active filter, never zero.
    pub total_pages: usize,
    /// Set when `items` is empty.
    pub empty: Option<EmptyReason>,
}

/// Confirmed purchase. `new_balance` is the server's authoritative figure;
/// the client never computes the balance locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub item_id: ItemId,
    pub new_balance: u64,
    pub message: Option<String>,
}

/// Outcome of a state-changing call against the equip slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The server confirmed the change; `message` is its text, verbatim.
    Applied { message: Option<String> },
    /// Nothing to do (e.g. unequipping an already-empty slot).
    NoOp,
}

/// Outcome of a filter refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response was the latest issued and has been applied.
    Applied,
    /// A newer request was issued while this one was in flight; the
    /// response was dropped without touching the view.
    Superseded,
}

/// Client-side guard that failed before any network round-trip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("Item {0} not found")]
    ItemNotFound(ItemId),

    #[error("Item {0} is already owned")]
    AlreadyOwned(ItemId),

    #[error("Item {0} is not owned")]
    NotOwned(ItemId),

    #[error("Insufficient pearls: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },
}

/// Error taxonomy for every catalog operation.
///
/// `Api` carries the server's message verbatim; the front end renders it
/// unchanged. `Transport` and `Malformed` both surface as a generic
/// connection problem. Local state is never mutated on any of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Connection error: {0}")]
    Transport(String),

    #[error("{message}")]
    Api { message: String },

    #[error("Malformed server response: {0}")]
    Malformed(String),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),
}

impl CatalogError {
    /// Server-reported failure with the message preserved as-is.
    pub fn api(message: impl Into<String>) -> Self {
        CatalogError::Api {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: ItemId, category: ItemCategory) -> Item {
        Item {
            id,
            name: format!("Item {}", id),
            category,
            rarity: Rarity::Common,
            price: 100,
            currency: "pearls".to_string(),
            description: None,
            image: None,
            owned: false,
            selected: false,
        }
    }

    #[test]
    fn test_item_deserializes_from_api_shape() {
        let json = r#"{
            "id": 7,
            "name": "Ocean Banner",
            "category": "banner",
            "category_id": 1,
            "rarity": "epic",
            "price": 2500,
            "currency": "pearls",
            "description": null,
            "image": "/static/images/avatar_shop/banners/ocean.png",
            "owned": true,
            "selected": false
        }"#;

        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, 7);
        assert_eq!(item.category, ItemCategory::Banner);
        assert_eq!(item.rarity, Rarity::Epic);
        assert!(item.owned);
        assert!(!item.selected);
    }

    #[test]
    fn test_item_defaults_for_sparse_payloads() {
        // Single-item lookups omit the per-user flags.
        let json = r#"{"id": 1, "name": "Plain Avatar", "category": "avatar", "price": 0}"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.rarity, Rarity::Common);
        assert_eq!(item.currency, "pearls");
        assert!(!item.owned);
        assert_eq!(item.image_url(), PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_unknown_category_is_tolerated() {
        let json = r#"{"id": 2, "name": "Mystery", "category": "hat", "price": 10}"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.category, ItemCategory::Unknown);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(
            "banner".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::One(ItemCategory::Banner)
        );
        assert_eq!("ALL".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert!("hat".parse::<CategoryFilter>().is_err());
    }

    #[test]
    fn test_equip_slot_replacement() {
        let mut config = EquippedConfiguration::new();
        let first = item(1, ItemCategory::Banner);
        let second = item(2, ItemCategory::Banner);

        config.set(ItemCategory::Banner, first.id);
        assert!(config.is_equipped(&first));

        config.set(ItemCategory::Banner, second.id);
        assert!(config.is_equipped(&second));
        assert!(!config.is_equipped(&first));
        // Still exactly one occupant for the slot.
        assert_eq!(config.equipped(ItemCategory::Banner), Some(second.id));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut config = EquippedConfiguration::new();
        config.set(ItemCategory::Avatar, 42);
        config.clear(ItemCategory::Avatar);
        let after_first = config.clone();
        config.clear(ItemCategory::Avatar);
        assert_eq!(config, after_first);
        assert!(config.is_empty());
    }

    #[test]
    fn test_iter_yields_occupied_slots_only() {
        let mut config = EquippedConfiguration::new();
        config.set(ItemCategory::Banner, 1);
        config.set(ItemCategory::Avatar, 42);

        let mut slots: Vec<(ItemCategory, ItemId)> = config.iter().collect();
        slots.sort_by_key(|(_, id)| *id);
        assert_eq!(
            slots,
            vec![(ItemCategory::Banner, 1), (ItemCategory::Avatar, 42)]
        );
    }

    #[test]
    fn test_category_of_reverse_lookup() {
        let mut config = EquippedConfiguration::new();
        config.set(ItemCategory::Decoration, 9);
        assert_eq!(config.category_of(9), Some(ItemCategory::Decoration));
        assert_eq!(config.category_of(10), None);
    }

    #[test]
    fn test_api_error_preserves_server_message() {
        let err = CatalogError::api("You do not have enough pearls to purchase this item.");
        assert_eq!(
            err.to_string(),
            "You do not have enough pearls to purchase this item."
        );
    }
}
