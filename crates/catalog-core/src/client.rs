//! ============================================================================
//! Catalog API Client - Avatar Shop REST Endpoints
//! ============================================================================
//! Talks to the Pearl Verse backend over HTTP/JSON:
//! - List items (paged, filterable by category/search)
//! - Single-item lookup by id
//! - Purchase, equip/unequip
//! - Fetch/reset the equipped configuration
//! - Wallet balance and featured rotation
//!
//! Every response carries `success: bool`; a `success: false` body maps to
//! `CatalogError::Api` with the server's message preserved verbatim.
//! ============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{
    CatalogError, CategoryFilter, EquippedConfiguration, Item, ItemCategory, ItemId,
    PurchaseReceipt,
};

/// Items listing endpoint.
const ITEMS_PATH: &str = "/api/avatar-shop/items";

/// Purchase endpoint.
const PURCHASE_PATH: &str = "/api/avatar-shop/purchase";

/// Equip/unequip endpoint.
const EQUIP_PATH: &str = "/api/avatar-shop/equip";

/// Per-user equipped configuration endpoint.
const CONFIGURATION_PATH: &str = "/api/avatar-shop/user-configuration";

/// Featured items rotation endpoint.
const FEATURED_PATH: &str = "/api/avatar-shop/featured-items";

/// Wallet statistics endpoint (pearl balance source).
const WALLET_STATS_PATH: &str = "/api/wallet/stats";

/// Query parameters for the items listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub category: CategoryFilter,
    pub search: String,
    pub page: usize,
    pub per_page: usize,
}

/// Server-side pagination block attached to a listing response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub pages: usize,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default)]
    pub has_prev: bool,
}

/// One page of listing results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub pagination: Pagination,
}

/// Direction of an equip mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipAction {
    Equip,
    Unequip,
}

impl EquipAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipAction::Equip => "equip",
            EquipAction::Unequip => "unequip",
        }
    }
}

/// Equipped configuration plus the item payloads the server embeds in it.
/// The embedded items let callers warm their cache without extra lookups.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationSnapshot {
    pub equipped: EquippedConfiguration,
    pub items: Vec<Item>,
}

/// Remote collaborator the view engine depends on. Implemented over HTTP by
/// [`HttpCatalogClient`] and by an in-memory fake in tests.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// List items for a category/search slice, server-paged.
    async fn list_items(&self, query: &ItemQuery) -> Result<ItemPage, CatalogError>;

    /// Fetch a single item by id. `Ok(None)` when the id is unknown.
    async fn get_item(&self, item_id: ItemId) -> Result<Option<Item>, CatalogError>;

    /// Purchase an item. The receipt carries the server's new balance.
    async fn purchase(&self, item_id: ItemId) -> Result<PurchaseReceipt, CatalogError>;

    /// Equip or unequip an item. Returns the server's message, if any.
    async fn set_equipped(
        &self,
        item_id: ItemId,
        action: EquipAction,
    ) -> Result<Option<String>, CatalogError>;

    /// Fetch the per-user equipped configuration.
    async fn fetch_configuration(&self) -> Result<ConfigurationSnapshot, CatalogError>;

    /// Reset the configuration to all-empty slots.
    async fn reset_configuration(&self) -> Result<(), CatalogError>;

    /// Current pearl balance for the session user.
    async fn fetch_balance(&self) -> Result<u64, CatalogError>;

    /// Featured items rotation.
    async fn featured_items(&self) -> Result<Vec<Item>, CatalogError>;
}

/// HTTP implementation of [`CatalogApi`] against the Pearl Verse backend.
pub struct HttpCatalogClient {
    client: reqwest::Client,
    base_url: String,
    /// Opaque session cookie for authenticated endpoints. Session handling
    /// itself lives elsewhere; this client just forwards the header.
    session_cookie: Option<String>,
}

impl HttpCatalogClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: trim_trailing_slash(base_url.into()),
            session_cookie: None,
        }
    }

    /// Attach a session cookie (e.g. `session=<value>`) to every request.
    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.decorate(self.client.get(self.url(path)))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.decorate(self.client.post(self.url(path)))
    }

    fn decorate(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("X-Requested-With", "XMLHttpRequest");
        match &self.session_cookie {
            Some(cookie) => builder.header(reqwest::header::COOKIE, cookie.clone()),
            None => builder,
        }
    }

    /// Send a request and decode its envelope. Failures before the server
    /// answers become `Transport`; a decodable `success: false` body becomes
    /// `Api` with the message untouched; anything undecodable on a 2xx
    /// becomes `Malformed`.
    async fn execute<T>(&self, builder: reqwest::RequestBuilder) -> Result<T, CatalogError>
    where
        T: serde::de::DeserializeOwned + Envelope,
    {
        let response = builder
            .send()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        let envelope: T = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(CatalogError::Malformed(e.to_string()));
            }
            // Non-2xx with an unparseable body (proxy error page, etc.):
            // the server never gave us a usable answer.
            Err(_) => {
                return Err(CatalogError::Transport(format!("HTTP {}", status)));
            }
        };

        if !envelope.success() {
            let message = envelope
                .message()
                .unwrap_or("The request could not be completed")
                .to_string();
            debug!(%status, %message, "API reported failure");
            return Err(CatalogError::Api { message });
        }

        Ok(envelope)
    }
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[async_trait]
impl CatalogApi for HttpCatalogClient {
    async fn list_items(&self, query: &ItemQuery) -> Result<ItemPage, CatalogError> {
        let mut params: Vec<(&str, String)> = vec![
            ("page", query.page.to_string()),
            ("per_page", query.per_page.to_string()),
        ];
        if let CategoryFilter::One(category) = query.category {
            params.push(("category", category.as_str().to_string()));
        }
        if !query.search.is_empty() {
            params.push(("search", query.search.clone()));
        }

        debug!(?query, "Listing catalog items");

        let envelope: ItemsEnvelope = self.execute(self.get(ITEMS_PATH).query(&params)).await?;
        Ok(ItemPage {
            items: envelope.items,
            pagination: envelope.pagination.unwrap_or_default(),
        })
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Option<Item>, CatalogError> {
        debug!(item_id, "Fetching single item");

        let envelope: ItemsEnvelope = self
            .execute(self.get(ITEMS_PATH).query(&[("item_id", item_id)]))
            .await?;
        Ok(envelope.items.into_iter().next())
    }

    async fn purchase(&self, item_id: ItemId) -> Result<PurchaseReceipt, CatalogError> {
        debug!(item_id, "Sending purchase request");

        let envelope: PurchaseEnvelope = self
            .execute(self.post(PURCHASE_PATH).json(&ItemBody { item_id }))
            .await?;

        let new_balance = envelope.new_balance.ok_or_else(|| {
            CatalogError::Malformed("purchase response missing new_balance".to_string())
        })?;

        Ok(PurchaseReceipt {
            item_id,
            new_balance,
            message: envelope.message,
        })
    }

    async fn set_equipped(
        &self,
        item_id: ItemId,
        action: EquipAction,
    ) -> Result<Option<String>, CatalogError> {
        debug!(item_id, action = action.as_str(), "Sending equip request");

        let envelope: MessageEnvelope = self
            .execute(self.post(EQUIP_PATH).json(&EquipBody { item_id, action }))
            .await?;
        Ok(envelope.message)
    }

    async fn fetch_configuration(&self) -> Result<ConfigurationSnapshot, CatalogError> {
        let envelope: ConfigurationEnvelope = self.execute(self.get(CONFIGURATION_PATH)).await?;

        let mut snapshot = ConfigurationSnapshot::default();
        let Some(configuration) = envelope.configuration else {
            return Err(CatalogError::Malformed(
                "configuration response missing configuration".to_string(),
            ));
        };

        for (slot, occupant) in configuration.equipped_items {
            let Some(item) = occupant else { continue };
            match slot.parse::<ItemCategory>() {
                Ok(category) => {
                    snapshot.equipped.set(category, item.id);
                    snapshot.items.push(item);
                }
                Err(_) => {
                    // A slot this client doesn't know how to render.
                    warn!(slot = %slot, "Ignoring unrecognized equip slot");
                }
            }
        }

        Ok(snapshot)
    }

    async fn reset_configuration(&self) -> Result<(), CatalogError> {
        let _: MessageEnvelope = self
            .execute(self.post(CONFIGURATION_PATH).json(&ResetBody { reset: true }))
            .await?;
        Ok(())
    }

    async fn fetch_balance(&self) -> Result<u64, CatalogError> {
        let envelope: WalletStatsEnvelope = self.execute(self.get(WALLET_STATS_PATH)).await?;
        envelope.current_balance.ok_or_else(|| {
            CatalogError::Malformed("wallet stats missing current_balance".to_string())
        })
    }

    async fn featured_items(&self) -> Result<Vec<Item>, CatalogError> {
        let envelope: ItemsEnvelope = self.execute(self.get(FEATURED_PATH)).await?;
        Ok(envelope.items)
    }
}

// ============================================================================
// Wire Types
// ============================================================================

/// Common surface of every response body.
trait Envelope {
    fn success(&self) -> bool;
    fn message(&self) -> Option<&str>;
}

macro_rules! impl_envelope {
    ($ty:ty) => {
        impl Envelope for $ty {
            fn success(&self) -> bool {
                self.success
            }
            fn message(&self) -> Option<&str> {
                self.message.as_deref()
            }
        }
    };
}

#[derive(Debug, Deserialize)]
struct ItemsEnvelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    items: Vec<Item>,
    #[serde(default)]
    pagination: Option<Pagination>,
}
impl_envelope!(ItemsEnvelope);

#[derive(Debug, Deserialize)]
struct PurchaseEnvelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    new_balance: Option<u64>,
}
impl_envelope!(PurchaseEnvelope);

#[derive(Debug, Deserialize)]
struct MessageEnvelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}
impl_envelope!(MessageEnvelope);

#[derive(Debug, Deserialize)]
struct ConfigurationEnvelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    configuration: Option<ConfigurationBody>,
}
impl_envelope!(ConfigurationEnvelope);

#[derive(Debug, Deserialize)]
struct ConfigurationBody {
    #[serde(default)]
    equipped_items: std::collections::HashMap<String, Option<Item>>,
}

#[derive(Debug, Deserialize)]
struct WalletStatsEnvelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    current_balance: Option<u64>,
}
impl_envelope!(WalletStatsEnvelope);

#[derive(Debug, Serialize)]
struct ItemBody {
    item_id: ItemId,
}

#[derive(Debug, Serialize)]
struct EquipBody {
    item_id: ItemId,
    action: EquipAction,
}

#[derive(Debug, Serialize)]
struct ResetBody {
    reset: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalization() {
        let client = HttpCatalogClient::new("https://pearlverse.app/");
        assert_eq!(client.base_url(), "https://pearlverse.app");
        assert_eq!(
            client.url(ITEMS_PATH),
            "https://pearlverse.app/api/avatar-shop/items"
        );
    }

    #[test]
    fn test_items_envelope_decodes_listing() {
        let body = r#"{
            "success": true,
            "items": [
                {"id": 1, "name": "Reef Banner", "category": "banner", "price": 500, "owned": true},
                {"id": 2, "name": "Kelp Avatar", "category": "avatar", "price": 800}
            ],
            "pagination": {"page": 1, "pages": 3, "total": 25, "has_next": true, "has_prev": false}
        }"#;

        let envelope: ItemsEnvelope = serde_json::from_str(body).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.items.len(), 2);
        let pagination = envelope.pagination.unwrap();
        assert_eq!(pagination.pages, 3);
        assert!(pagination.has_next);
    }

    #[test]
    fn test_failure_envelope_keeps_message() {
        let body = r#"{"success": false, "message": "Please log in to view the shop"}"#;
        let envelope: MessageEnvelope = serde_json::from_str(body).unwrap();
        assert!(!envelope.success());
        assert_eq!(envelope.message(), Some("Please log in to view the shop"));
    }

    #[test]
    fn test_equip_body_wire_shape() {
        let body = EquipBody {
            item_id: 42,
            action: EquipAction::Unequip,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["item_id"], 42);
        assert_eq!(json["action"], "unequip");
    }

    #[test]
    fn test_configuration_body_with_empty_slots() {
        let body = r#"{
            "success": true,
            "configuration": {
                "equipped_items": {
                    "banner": {"id": 3, "name": "Tide Banner", "category": "banner", "price": 100},
                    "avatar": null,
                    "decoration": null
                }
            }
        }"#;
        let envelope: ConfigurationEnvelope = serde_json::from_str(body).unwrap();
        let configuration = envelope.configuration.unwrap();
        assert_eq!(configuration.equipped_items.len(), 3);
        assert!(configuration.equipped_items["avatar"].is_none());
        assert_eq!(
            configuration.equipped_items["banner"].as_ref().unwrap().id,
            3
        );
    }
}
