// Marketplace ledger: game/item catalogs, per-player holdings, and the
// atomic revenue-split purchase protocol.
// Ordering discipline for every mutating operation:
// validate -> debit -> local effects -> credits -> events.

use crate::event::{AccountId, EventLog, EventRecord};
use crate::transfer::{TransferError, ValueTransfer};
use crate::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarketError {
    InvalidId,
    DuplicateGame,
    GameNotFound,
    NotGameCreator,
    GameNotActive,
    DuplicateItem,
    PriceNotPositive,
    ItemNotFound,
    NotItemCreator,
    ItemNotActive,
    SoldOut,
    CannotPurchaseOwnItem,
    AlreadyOwned,
    NotConsumable,
    NoConsumablesOwned,
    Transfer(TransferError),
}

impl MarketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketError::GameNotFound | MarketError::ItemNotFound => ErrorKind::NotFound,
            MarketError::NotGameCreator | MarketError::NotItemCreator => ErrorKind::Unauthorized,
            MarketError::GameNotActive
            | MarketError::ItemNotActive
            | MarketError::AlreadyOwned => ErrorKind::InvalidState,
            MarketError::InvalidId
            | MarketError::DuplicateGame
            | MarketError::DuplicateItem
            | MarketError::PriceNotPositive
            | MarketError::CannotPurchaseOwnItem
            | MarketError::NotConsumable => ErrorKind::InvalidInput,
            MarketError::SoldOut | MarketError::NoConsumablesOwned => {
                ErrorKind::ResourceExhausted
            }
            MarketError::Transfer(_) => ErrorKind::TransferFailed,
        }
    }
}

impl std::fmt::Display for MarketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketError::InvalidId => write!(f, "id must be a non-empty string"),
            MarketError::DuplicateGame => write!(f, "game id already taken"),
            MarketError::GameNotFound => write!(f, "game not found"),
            MarketError::NotGameCreator => write!(f, "caller is not the game creator"),
            MarketError::GameNotActive => write!(f, "game is not active"),
            MarketError::DuplicateItem => write!(f, "item id already taken"),
            MarketError::PriceNotPositive => write!(f, "price must be positive"),
            MarketError::ItemNotFound => write!(f, "item not found"),
            MarketError::NotItemCreator => write!(f, "caller is not the item creator"),
            MarketError::ItemNotActive => write!(f, "item is not active"),
            MarketError::SoldOut => write!(f, "item supply exhausted"),
            MarketError::CannotPurchaseOwnItem => write!(f, "creator cannot buy own item"),
            MarketError::AlreadyOwned => write!(f, "buyer already owns this item"),
            MarketError::NotConsumable => write!(f, "item is not a consumable"),
            MarketError::NoConsumablesOwned => write!(f, "no consumable balance to use"),
            MarketError::Transfer(e) => write!(f, "transfer failed: {}", e),
        }
    }
}

impl std::error::Error for MarketError {}

impl From<TransferError> for MarketError {
    fn from(e: TransferError) -> Self {
        MarketError::Transfer(e)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCategory {
    Cosmetic,
    Consumable,
    PowerUp,
    Access,
    Subscription,
}

impl ItemCategory {
    pub fn name(&self) -> &'static str {
        match self {
            ItemCategory::Cosmetic => "Cosmetic",
            ItemCategory::Consumable => "Consumable",
            ItemCategory::PowerUp => "PowerUp",
            ItemCategory::Access => "Access",
            ItemCategory::Subscription => "Subscription",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub creator: AccountId,
    pub active: bool,
    /// Gross sale volume across the game's items.
    pub total_revenue: u64,
    /// Creator's share of that volume after the platform cut.
    pub creator_earnings: u64,
    pub created_at: u64,
    /// Item ids in creation order.
    pub item_ids: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub game_id: String,
    pub creator: AccountId,
    /// Smallest value unit; always positive.
    pub price: u64,
    /// 0 means unbounded.
    pub max_supply: u64,
    pub current_supply: u64,
    pub active: bool,
    pub category: ItemCategory,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub item_id: String,
    pub price: u64,
    pub creator_amount: u64,
    pub platform_amount: u64,
}

/// Creator/platform division of a sale price. The platform share is the
/// subtraction remainder, so the two always sum to `price` exactly.
pub fn revenue_split(price: u64, creator_percent: u8) -> (u64, u64) {
    let creator = ((u128::from(price) * u128::from(creator_percent)) / 100) as u64;
    (creator, price - creator)
}

struct PurchasePlan {
    item_id: String,
    game_id: String,
    creator: AccountId,
    price: u64,
    creator_amount: u64,
    platform_amount: u64,
    consumable: bool,
}

#[derive(Clone, Debug, Default)]
pub struct MarketplaceLedger {
    games: HashMap<String, Game>,
    items: HashMap<String, Item>,
    /// item id -> owners (non-consumable categories; at most one unit each).
    owners: HashMap<String, HashSet<AccountId>>,
    /// item id -> player -> remaining quantity (consumables).
    consumables: HashMap<String, HashMap<AccountId, u64>>,
}

impl MarketplaceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_game(
        &mut self,
        id: &str,
        creator: AccountId,
        now: u64,
        events: &mut EventLog,
    ) -> Result<(), MarketError> {
        if id.is_empty() {
            return Err(MarketError::InvalidId);
        }
        if self.games.contains_key(id) {
            return Err(MarketError::DuplicateGame);
        }

        self.games.insert(
            id.to_string(),
            Game {
                id: id.to_string(),
                creator,
                active: true,
                total_revenue: 0,
                creator_earnings: 0,
                created_at: now,
                item_ids: Vec::new(),
            },
        );
        events.append(EventRecord::GamePublished {
            game_id: id.to_string(),
            creator,
            timestamp: now,
        });
        Ok(())
    }

    /// Irreversible; there is no reactivation path.
    pub fn deactivate_game(
        &mut self,
        id: &str,
        caller: AccountId,
        now: u64,
        events: &mut EventLog,
    ) -> Result<(), MarketError> {
        let game = self.games.get_mut(id).ok_or(MarketError::GameNotFound)?;
        if game.creator != caller {
            return Err(MarketError::NotGameCreator);
        }
        game.active = false;
        events.append(EventRecord::GameDeactivated {
            game_id: id.to_string(),
            timestamp: now,
        });
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_item(
        &mut self,
        id: &str,
        game_id: &str,
        price: u64,
        max_supply: u64,
        category: ItemCategory,
        caller: AccountId,
        now: u64,
        events: &mut EventLog,
    ) -> Result<(), MarketError> {
        let game = self.games.get_mut(game_id).ok_or(MarketError::GameNotFound)?;
        if game.creator != caller {
            return Err(MarketError::NotGameCreator);
        }
        if !game.active {
            return Err(MarketError::GameNotActive);
        }
        if id.is_empty() {
            return Err(MarketError::InvalidId);
        }
        if self.items.contains_key(id) {
            return Err(MarketError::DuplicateItem);
        }
        if price == 0 {
            return Err(MarketError::PriceNotPositive);
        }

        game.item_ids.push(id.to_string());
        let creator = game.creator;
        self.items.insert(
            id.to_string(),
            Item {
                id: id.to_string(),
                game_id: game_id.to_string(),
                creator,
                price,
                max_supply,
                current_supply: 0,
                active: true,
                category,
            },
        );
        events.append(EventRecord::ItemCreated {
            item_id: id.to_string(),
            game_id: game_id.to_string(),
            creator,
            price,
            category: category.name().to_string(),
            timestamp: now,
        });
        Ok(())
    }

    pub fn update_item_price(
        &mut self,
        id: &str,
        new_price: u64,
        caller: AccountId,
    ) -> Result<(), MarketError> {
        let item = self.items.get_mut(id).ok_or(MarketError::ItemNotFound)?;
        if item.creator != caller {
            return Err(MarketError::NotItemCreator);
        }
        if new_price == 0 {
            return Err(MarketError::PriceNotPositive);
        }
        item.price = new_price;
        Ok(())
    }

    pub fn deactivate_item(&mut self, id: &str, caller: AccountId) -> Result<(), MarketError> {
        let item = self.items.get_mut(id).ok_or(MarketError::ItemNotFound)?;
        if item.creator != caller {
            return Err(MarketError::NotItemCreator);
        }
        item.active = false;
        Ok(())
    }

    pub fn purchase_item(
        &mut self,
        id: &str,
        buyer: AccountId,
        treasury: AccountId,
        creator_percent: u8,
        bank: &mut dyn ValueTransfer,
        events: &mut EventLog,
    ) -> Result<PurchaseReceipt, MarketError> {
        let ids = [id.to_string()];
        let mut receipts = self.purchase_items(&ids, buyer, treasury, creator_percent, bank, events)?;
        Ok(receipts.pop().expect("one receipt per purchased id"))
    }

    /// Batch purchase, one protocol application per id in array order. The
    /// whole batch is validated up front (tracking supply and ownership the
    /// batch itself would consume) and the buyer is debited the batch total
    /// exactly once, so a single failure aborts everything with no residue.
    pub fn purchase_items(
        &mut self,
        ids: &[String],
        buyer: AccountId,
        treasury: AccountId,
        creator_percent: u8,
        bank: &mut dyn ValueTransfer,
        events: &mut EventLog,
    ) -> Result<Vec<PurchaseReceipt>, MarketError> {
        // --- validate every id in order, accumulating batch-local claims ---
        let mut plans: Vec<PurchasePlan> = Vec::with_capacity(ids.len());
        let mut supply_taken: HashMap<&str, u64> = HashMap::new();
        let mut owned_in_batch: HashSet<&str> = HashSet::new();
        let mut total: u64 = 0;

        for id in ids {
            let item = self.items.get(id.as_str()).ok_or(MarketError::ItemNotFound)?;
            if !item.active {
                return Err(MarketError::ItemNotActive);
            }
            let game = self
                .games
                .get(&item.game_id)
                .ok_or(MarketError::GameNotFound)?;
            if !game.active {
                return Err(MarketError::GameNotActive);
            }
            let taken = supply_taken.get(id.as_str()).copied().unwrap_or(0);
            if item.max_supply != 0 && item.current_supply + taken >= item.max_supply {
                return Err(MarketError::SoldOut);
            }
            if buyer == item.creator {
                return Err(MarketError::CannotPurchaseOwnItem);
            }
            let consumable = item.category == ItemCategory::Consumable;
            if !consumable {
                let already = self
                    .owners
                    .get(id.as_str())
                    .map(|set| set.contains(&buyer))
                    .unwrap_or(false);
                if already || owned_in_batch.contains(id.as_str()) {
                    return Err(MarketError::AlreadyOwned);
                }
                owned_in_batch.insert(id.as_str());
            }
            supply_taken.insert(id.as_str(), taken + 1);

            let (creator_amount, platform_amount) = revenue_split(item.price, creator_percent);
            total = total.saturating_add(item.price);
            plans.push(PurchasePlan {
                item_id: item.id.clone(),
                game_id: item.game_id.clone(),
                creator: item.creator,
                price: item.price,
                creator_amount,
                platform_amount,
                consumable,
            });
        }

        // --- debit: the only fallible external call, before any effect ---
        bank.debit(buyer, total)?;

        // --- local effects; state is final before any credit goes out ---
        for plan in &plans {
            if plan.consumable {
                let holdings = self
                    .consumables
                    .entry(plan.item_id.clone())
                    .or_insert_with(HashMap::new);
                let qty = holdings.entry(buyer).or_insert(0);
                *qty = qty.saturating_add(1);
            } else {
                self.owners
                    .entry(plan.item_id.clone())
                    .or_insert_with(HashSet::new)
                    .insert(buyer);
            }
            let item = self
                .items
                .get_mut(&plan.item_id)
                .expect("validated above");
            item.current_supply += 1;
            let game = self.games.get_mut(&plan.game_id).expect("validated above");
            game.total_revenue = game.total_revenue.saturating_add(plan.price);
            game.creator_earnings = game.creator_earnings.saturating_add(plan.creator_amount);
        }

        // --- credits ---
        for plan in &plans {
            bank.credit(plan.creator, plan.creator_amount)?;
            bank.credit(treasury, plan.platform_amount)?;
        }

        // --- events ---
        let mut receipts = Vec::with_capacity(plans.len());
        for plan in plans {
            events.append(EventRecord::ItemPurchased {
                item_id: plan.item_id.clone(),
                game_id: plan.game_id.clone(),
                buyer,
                price: plan.price,
                creator_amount: plan.creator_amount,
                platform_amount: plan.platform_amount,
            });
            events.append(EventRecord::CreatorPaid {
                item_id: plan.item_id.clone(),
                creator: plan.creator,
                amount: plan.creator_amount,
            });
            events.append(EventRecord::TreasuryFunded {
                item_id: plan.item_id.clone(),
                amount: plan.platform_amount,
            });
            receipts.push(PurchaseReceipt {
                item_id: plan.item_id,
                price: plan.price,
                creator_amount: plan.creator_amount,
                platform_amount: plan.platform_amount,
            });
        }
        Ok(receipts)
    }

    /// Burn one unit of a player's consumable balance. The caller must be the
    /// creator of the item's game (game servers consume on the player's
    /// behalf). Returns the remaining quantity.
    pub fn use_consumable(
        &mut self,
        player: AccountId,
        item_id: &str,
        caller: AccountId,
    ) -> Result<u64, MarketError> {
        let item = self.items.get(item_id).ok_or(MarketError::ItemNotFound)?;
        if item.category != ItemCategory::Consumable {
            return Err(MarketError::NotConsumable);
        }
        let game = self
            .games
            .get(&item.game_id)
            .ok_or(MarketError::GameNotFound)?;
        if game.creator != caller {
            return Err(MarketError::NotGameCreator);
        }
        let qty = self
            .consumables
            .get_mut(item_id)
            .and_then(|holdings| holdings.get_mut(&player));
        match qty {
            Some(q) if *q > 0 => {
                *q -= 1;
                Ok(*q)
            }
            _ => Err(MarketError::NoConsumablesOwned),
        }
    }

    // --- read accessors (side-effect free) ---

    pub fn game(&self, id: &str) -> Option<&Game> {
        self.games.get(id)
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    /// Items of a game in creation order; empty for an unknown game.
    pub fn game_items(&self, game_id: &str) -> Vec<&Item> {
        match self.games.get(game_id) {
            Some(game) => game
                .item_ids
                .iter()
                .filter_map(|id| self.items.get(id))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn owns_item(&self, player: AccountId, item_id: &str) -> bool {
        self.owners
            .get(item_id)
            .map(|set| set.contains(&player))
            .unwrap_or(false)
    }

    pub fn consumable_balance(&self, player: AccountId, item_id: &str) -> u64 {
        self.consumables
            .get(item_id)
            .and_then(|holdings| holdings.get(&player))
            .copied()
            .unwrap_or(0)
    }

    // --- snapshot plumbing (sorted for deterministic output) ---

    pub(crate) fn export_games(&self) -> Vec<Game> {
        let mut games: Vec<Game> = self.games.values().cloned().collect();
        games.sort_by(|a, b| a.id.cmp(&b.id));
        games
    }

    pub(crate) fn export_items(&self) -> Vec<Item> {
        let mut items: Vec<Item> = self.items.values().cloned().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }

    pub(crate) fn export_ownership(&self) -> Vec<(String, AccountId)> {
        let mut rows: Vec<(String, AccountId)> = self
            .owners
            .iter()
            .flat_map(|(id, set)| set.iter().map(move |o| (id.clone(), *o)))
            .collect();
        rows.sort();
        rows
    }

    pub(crate) fn export_consumables(&self) -> Vec<(String, AccountId, u64)> {
        let mut rows: Vec<(String, AccountId, u64)> = self
            .consumables
            .iter()
            .flat_map(|(id, holdings)| {
                holdings.iter().map(move |(owner, qty)| (id.clone(), *owner, *qty))
            })
            .collect();
        rows.sort();
        rows
    }

    pub(crate) fn from_parts(
        games: Vec<Game>,
        items: Vec<Item>,
        ownership: Vec<(String, AccountId)>,
        consumables: Vec<(String, AccountId, u64)>,
    ) -> Self {
        let mut ledger = Self::new();
        for game in games {
            ledger.games.insert(game.id.clone(), game);
        }
        for item in items {
            ledger.items.insert(item.id.clone(), item);
        }
        for (item_id, owner) in ownership {
            ledger
                .owners
                .entry(item_id)
                .or_insert_with(HashSet::new)
                .insert(owner);
        }
        for (item_id, owner, qty) in consumables {
            ledger
                .consumables
                .entry(item_id)
                .or_insert_with(HashMap::new)
                .insert(owner, qty);
        }
        ledger
    }
}
