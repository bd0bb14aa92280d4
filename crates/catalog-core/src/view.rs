//! ============================================================================
//! Catalog View - Ownership-Aware Filtering, Sorting, and Pagination
//! ============================================================================
//! Maintains the in-memory working set for the avatar shop screen:
//! - A merge-only cache of every item seen so far
//! - The per-user equipped configuration (one item per slot)
//! - The active filter (category tab, search box, ownership dropdown, page)
//! - The cached pearl balance
//!
//! The engine answers "what should this page show, in what order" from
//! local data plus a minimal set of round-trips, and only mutates its state
//! after the server confirms a change. Overlapping refreshes are resolved
//! with a request-sequence token: a response that is not the latest issued
//! is dropped on the floor.
//! ============================================================================

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::client::{CatalogApi, EquipAction, ItemPage, ItemQuery};
use crate::types::{
    CatalogError, CategoryFilter, DisplayPage, EmptyReason, EquippedConfiguration, FetchOutcome,
    FilterState, FilterUpdate, Item, ItemId, MutationOutcome, OwnershipFilter, PreconditionError,
    PurchaseReceipt, FULL_FETCH_LIMIT,
};

/// Sort tier for the default ordering: equipped > owned > unowned.
fn priority_tier(item: &Item, equipped: &EquippedConfiguration) -> u8 {
    if equipped.is_equipped(item) {
        3
    } else if item.owned {
        2
    } else {
        1
    }
}

/// Client-side view over the remote item catalog.
pub struct CatalogView<C: CatalogApi> {
    client: C,
    /// Every item ever fetched this session, by id. Merged, never evicted,
    /// so items stay addressable after later pages exclude them.
    snapshot: HashMap<ItemId, Item>,
    /// Ids returned by the most recent applied query, in response order.
    last_query: Vec<ItemId>,
    /// Server-reported page count for the last applied query.
    server_pages: usize,
    /// Set when `last_query` holds the complete category+search slice.
    /// Ownership filtering needs the whole slice in the working set.
    last_query_full: Option<(CategoryFilter, String)>,
    equipped: EquippedConfiguration,
    filter: FilterState,
    balance: u64,
    /// Latest request-sequence token issued. Responses carrying an older
    /// token are stale and must not touch the view.
    latest_token: u64,
}

impl<C: CatalogApi> CatalogView<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            snapshot: HashMap::new(),
            last_query: Vec::new(),
            server_pages: 1,
            last_query_full: None,
            equipped: EquippedConfiguration::new(),
            filter: FilterState::default(),
            balance: 0,
            latest_token: 0,
        }
    }

    /// Pull the equipped configuration and pearl balance for the session
    /// user. Called once when the shop screen opens.
    pub async fn initialize(&mut self) -> Result<(), CatalogError> {
        let configuration = self.client.fetch_configuration().await?;
        for item in configuration.items {
            self.snapshot.insert(item.id, item);
        }
        self.equipped = configuration.equipped;
        self.balance = self.client.fetch_balance().await?;
        info!(balance = self.balance, "Catalog view initialized");
        Ok(())
    }

    // ========================================================================
    // Filtering & fetching
    // ========================================================================

    /// Apply a partial filter change and refresh the working set.
    ///
    /// Any category/search/ownership change resets the page to 1; a bare
    /// page move keeps the rest of the filter. An `Owned`/`Unowned` filter
    /// needs the whole category+search slice cached locally, so the first
    /// such refresh pulls up to [`FULL_FETCH_LIMIT`] items in one request.
    ///
    /// On a network failure the previously displayed state is untouched.
    pub async fn set_filter(&mut self, update: FilterUpdate) -> Result<FetchOutcome, CatalogError> {
        let mut next = self.filter.clone();
        let mut reset_page = false;

        if let Some(category) = update.category {
            if category != next.category {
                reset_page = true;
            }
            next.category = category;
        }
        if let Some(search) = update.search {
            let search = search.to_lowercase();
            if search != next.search {
                reset_page = true;
            }
            next.search = search;
        }
        if let Some(ownership) = update.ownership {
            if ownership != next.ownership {
                reset_page = true;
            }
            next.ownership = ownership;
        }
        if reset_page {
            next.page = 1;
        } else if let Some(page) = update.page {
            next.page = page.max(1);
        }

        self.refresh(next).await
    }

    /// Re-run the current filter against the server (e.g. after a purchase
    /// changed ownership flags elsewhere).
    pub async fn reload(&mut self) -> Result<FetchOutcome, CatalogError> {
        // Force a round-trip even when the full slice is cached.
        self.last_query_full = None;
        let filter = self.filter.clone();
        self.refresh(filter).await
    }

    async fn refresh(&mut self, next: FilterState) -> Result<FetchOutcome, CatalogError> {
        let slice = (next.category, next.search.clone());
        if next.ownership != OwnershipFilter::All && self.last_query_full.as_ref() == Some(&slice)
        {
            // The complete slice is already in the working set; page and
            // ownership-mode changes are resolved client-side.
            debug!(?next.ownership, page = next.page, "Filter change resolved from cache");
            self.filter = next;
            return Ok(FetchOutcome::Applied);
        }

        let (token, query) = self.begin_refresh(&next);
        let page = self.client.list_items(&query).await?;
        Ok(self.apply_list_response(token, next, page))
    }

    /// Issue a sequence token and build the wire query for `next`.
    ///
    /// Ownership modes filter client-side, so they pull the whole
    /// category+search slice in one request; the plain mode trusts server
    /// pagination.
    fn begin_refresh(&mut self, next: &FilterState) -> (u64, ItemQuery) {
        self.latest_token += 1;
        let token = self.latest_token;

        let query = if next.ownership != OwnershipFilter::All {
            ItemQuery {
                category: next.category,
                search: next.search.clone(),
                page: 1,
                per_page: FULL_FETCH_LIMIT,
            }
        } else {
            ItemQuery {
                category: next.category,
                search: next.search.clone(),
                page: next.page,
                per_page: next.page_size,
            }
        };

        debug!(token, ?query, "Issued catalog refresh");
        (token, query)
    }

    /// Fold a listing response into the view, unless a newer request has
    /// been issued since `token`.
    fn apply_list_response(
        &mut self,
        token: u64,
        next: FilterState,
        page: ItemPage,
    ) -> FetchOutcome {
        if token != self.latest_token {
            debug!(
                token,
                latest = self.latest_token,
                "Dropping stale listing response"
            );
            return FetchOutcome::Superseded;
        }

        self.last_query = page.items.iter().map(|item| item.id).collect();
        for item in page.items {
            self.snapshot.insert(item.id, item);
        }
        self.server_pages = page.pagination.pages.max(1);

        if next.ownership != OwnershipFilter::All {
            if page.pagination.has_next {
                // Slice larger than the fetch limit; ownership filtering
                // will run over a truncated set.
                warn!(
                    total = page.pagination.total,
                    limit = FULL_FETCH_LIMIT,
                    "Catalog slice exceeds full-fetch limit"
                );
            }
            self.last_query_full = Some((next.category, next.search.clone()));
        } else {
            self.last_query_full = None;
        }

        self.filter = next;
        FetchOutcome::Applied
    }

    // ========================================================================
    // Display
    // ========================================================================

    /// Produce the page to render for the current filter.
    ///
    /// The equipped item for the active category is guaranteed to be
    /// included even when it falls outside normal pagination; if it has
    /// never been fetched it is looked up by id and cached first.
    pub async fn display_page(&mut self) -> Result<DisplayPage, CatalogError> {
        if let CategoryFilter::One(category) = self.filter.category {
            if let Some(item_id) = self.equipped.equipped(category) {
                if !self.snapshot.contains_key(&item_id) {
                    match self.client.get_item(item_id).await? {
                        Some(item) => {
                            self.snapshot.insert(item_id, item);
                        }
                        None => {
                            // Configuration points at an item the catalog no
                            // longer serves; render without it.
                            warn!(item_id, "Equipped item missing from catalog");
                        }
                    }
                }
            }
        }
        Ok(self.assemble_page())
    }

    /// Pure assembly of the display page from cached state.
    fn assemble_page(&self) -> DisplayPage {
        let mut items: Vec<Item> = self
            .last_query
            .iter()
            .filter_map(|id| self.snapshot.get(id))
            .cloned()
            .collect();

        // Equipped-item guarantee for the active category tab.
        if let CategoryFilter::One(category) = self.filter.category {
            if let Some(item_id) = self.equipped.equipped(category) {
                if !items.iter().any(|item| item.id == item_id) {
                    if let Some(item) = self.snapshot.get(&item_id) {
                        items.push(item.clone());
                    }
                }
            }
        }

        items.retain(|item| match self.filter.ownership {
            OwnershipFilter::All => true,
            OwnershipFilter::Owned => item.owned || self.equipped.is_equipped(item),
            OwnershipFilter::Unowned => !item.owned && !self.equipped.is_equipped(item),
        });

        match self.filter.ownership {
            // The unowned tab is a storefront: plain alphabetical order.
            OwnershipFilter::Unowned => items.sort_by_key(|item| item.sort_name()),
            _ => items.sort_by(|a, b| {
                priority_tier(b, &self.equipped)
                    .cmp(&priority_tier(a, &self.equipped))
                    .then_with(|| a.sort_name().cmp(&b.sort_name()))
            }),
        }

        let (items, total_pages) = if self.filter.ownership == OwnershipFilter::All {
            // Server-paged; the response already is the page.
            (items, self.server_pages)
        } else {
            self.paginate(items)
        };

        let empty = if items.is_empty() {
            Some(self.classify_empty())
        } else {
            None
        };

        DisplayPage {
            items,
            total_pages,
            empty,
        }
    }

    /// Client-side pagination for ownership-filtered views. A page index
    /// that fell out of range (e.g. a refresh shrank the result set) clamps
    /// to page 1 rather than rendering an empty grid.
    fn paginate(&self, items: Vec<Item>) -> (Vec<Item>, usize) {
        let page_size = self.filter.page_size.max(1);
        let total_pages = items.len().div_ceil(page_size).max(1);
        let page = if self.filter.page > total_pages {
            1
        } else {
            self.filter.page
        };

        let start = (page - 1) * page_size;
        let paged = items
            .into_iter()
            .skip(start)
            .take(page_size)
            .collect();
        (paged, total_pages)
    }

    /// Empty-state classification. A function of the filter alone so the
    /// message stays stable while results are in flux.
    fn classify_empty(&self) -> EmptyReason {
        if !self.filter.search.is_empty() {
            EmptyReason::NoSearchMatches
        } else if self.filter.ownership != OwnershipFilter::All {
            EmptyReason::NoOwnershipMatches
        } else {
            EmptyReason::NoItems
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// An item by id: from the cache when seen this session, otherwise via
    /// the single-item endpoint (and cached for next time).
    pub async fn lookup(&mut self, item_id: ItemId) -> Result<Option<Item>, CatalogError> {
        if let Some(item) = self.snapshot.get(&item_id) {
            return Ok(Some(item.clone()));
        }
        let fetched = self.client.get_item(item_id).await?;
        if let Some(item) = &fetched {
            self.snapshot.insert(item_id, item.clone());
        }
        Ok(fetched)
    }

    /// Buy an item. Guards run before any round-trip; on success the item
    /// is marked owned and the balance adopts the server's figure verbatim.
    pub async fn purchase(&mut self, item_id: ItemId) -> Result<PurchaseReceipt, CatalogError> {
        let item = self
            .lookup(item_id)
            .await?
            .ok_or(PreconditionError::ItemNotFound(item_id))?;

        if item.owned {
            return Err(PreconditionError::AlreadyOwned(item_id).into());
        }
        if self.balance < item.price {
            return Err(PreconditionError::InsufficientBalance {
                needed: item.price,
                available: self.balance,
            }
            .into());
        }

        let receipt = self.client.purchase(item_id).await?;

        if let Some(item) = self.snapshot.get_mut(&item_id) {
            item.owned = true;
        }
        // The server's balance always wins; no local arithmetic.
        self.balance = receipt.new_balance;

        info!(item_id, new_balance = self.balance, "Purchase confirmed");
        Ok(receipt)
    }

    /// Equip an owned item, replacing whatever occupied its slot.
    pub async fn equip(&mut self, item_id: ItemId) -> Result<MutationOutcome, CatalogError> {
        let item = self
            .lookup(item_id)
            .await?
            .ok_or(PreconditionError::ItemNotFound(item_id))?;
        if !item.owned {
            return Err(PreconditionError::NotOwned(item_id).into());
        }

        let message = self.client.set_equipped(item_id, EquipAction::Equip).await?;

        // Full slot replacement: the previous occupant is gone the moment
        // the new one lands.
        self.equipped.set(item.category, item_id);
        info!(item_id, category = %item.category, "Item equipped");
        Ok(MutationOutcome::Applied { message })
    }

    /// Clear the slot an item occupies. Unequipping an item that is not
    /// currently worn is a no-op success, no round-trip performed.
    pub async fn unequip(&mut self, item_id: ItemId) -> Result<MutationOutcome, CatalogError> {
        let category = match self.snapshot.get(&item_id) {
            Some(item) => item.category,
            None => match self.equipped.category_of(item_id) {
                Some(category) => category,
                None => return Ok(MutationOutcome::NoOp),
            },
        };

        if self.equipped.equipped(category) != Some(item_id) {
            return Ok(MutationOutcome::NoOp);
        }

        let message = self
            .client
            .set_equipped(item_id, EquipAction::Unequip)
            .await?;

        self.equipped.clear(category);
        info!(item_id, category = %category, "Item unequipped");
        Ok(MutationOutcome::Applied { message })
    }

    /// Reset every slot. Locally this always means all-empty, regardless of
    /// what the server echoes back.
    pub async fn reset_configuration(&mut self) -> Result<(), CatalogError> {
        self.client.reset_configuration().await?;
        self.equipped.clear_all();
        info!("Equipped configuration reset");
        Ok(())
    }

    /// Featured rotation, merged into the snapshot so the items stay
    /// addressable for purchase/equip actions.
    pub async fn featured(&mut self) -> Result<Vec<Item>, CatalogError> {
        let items = self.client.featured_items().await?;
        for item in &items {
            self.snapshot.insert(item.id, item.clone());
        }
        Ok(items)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// True when `item` occupies its category slot.
    pub fn is_equipped(&self, item: &Item) -> bool {
        self.equipped.is_equipped(item)
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn equipped_configuration(&self) -> &EquippedConfiguration {
        &self.equipped
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Cached copy of an item, if it has been seen this session.
    pub fn item(&self, item_id: ItemId) -> Option<&Item> {
        self.snapshot.get(&item_id)
    }
}
