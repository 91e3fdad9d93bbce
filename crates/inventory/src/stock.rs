use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{Aggregate, AggregateRoot, DomainError, DomainResult, ProductId};
use stockledger_events::Event;

/// Why a ledger entry was written.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Opening balance written when the product is created.
    Seed,
    /// Manual restock or consumption.
    Adjustment,
    /// Units sold through `purchase`.
    Purchase,
    /// Reversal of an adjustment that drove the total negative.
    Compensation,
    /// Administrative move to a requested quantity.
    Correction,
}

/// A single append-only stock movement (the ledger's event type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub product_id: ProductId,
    /// Signed delta: positive restocks, negative consumes.
    pub delta: i64,
    pub remarks: String,
    pub kind: MovementKind,
    pub occurred_at: DateTime<Utc>,
}

impl StockMovement {
    /// Offsetting entry for `original`, written when a post-write check finds
    /// the total below zero. Decided deltas are never `i64::MIN`.
    pub fn compensating(original: &StockMovement, occurred_at: DateTime<Utc>) -> Self {
        Self {
            product_id: original.product_id.clone(),
            delta: -original.delta,
            remarks: format!("Reverting invalid stock adjustment: {}", original.remarks),
            kind: MovementKind::Compensation,
            occurred_at,
        }
    }
}

impl Event for StockMovement {
    fn event_type(&self) -> &'static str {
        match self.kind {
            MovementKind::Seed => "inventory.stock.seeded",
            MovementKind::Adjustment => "inventory.stock.adjusted",
            MovementKind::Purchase => "inventory.stock.purchased",
            MovementKind::Compensation => "inventory.stock.compensated",
            MovementKind::Correction => "inventory.stock.corrected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// Command: SeedStock (opening balance for a new product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedStock {
    pub product_id: ProductId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdjustStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub product_id: ProductId,
    pub delta: i64,
    pub remarks: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordPurchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPurchase {
    pub product_id: ProductId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CorrectStock (move the total to `target`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectStock {
    pub product_id: ProductId,
    pub target: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockCommand {
    Seed(SeedStock),
    Adjust(AdjustStock),
    Purchase(RecordPurchase),
    Correct(CorrectStock),
}

/// Aggregate: the stock level of one product, derived from its ledger.
///
/// `version` counts applied ledger entries. A level with no entries carries
/// the product's cached quantity instead (records that predate the ledger).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLevel {
    product_id: ProductId,
    total: i64,
    version: u64,
}

impl StockLevel {
    /// Empty level for a product with no ledger history yet.
    pub fn empty(product_id: ProductId) -> Self {
        Self {
            product_id,
            total: 0,
            version: 0,
        }
    }

    /// Rebuild the level from ledger history, falling back to
    /// `cached_quantity` when the history is empty.
    ///
    /// Fails if the history sums past the `i64` range.
    pub fn rehydrate<'a>(
        product_id: ProductId,
        cached_quantity: i64,
        history: impl IntoIterator<Item = &'a StockMovement>,
    ) -> DomainResult<Self> {
        let mut level = Self::empty(product_id);
        for movement in history {
            level.apply(movement)?;
        }
        if level.version == 0 {
            level.total = cached_quantity;
        }
        Ok(level)
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn has_history(&self) -> bool {
        self.version > 0
    }
}

impl AggregateRoot for StockLevel {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.product_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for StockLevel {
    type Command = StockCommand;
    type Event = StockMovement;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        self.total = self.total_after(event.delta)?;
        self.version += 1;
        Ok(())
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockCommand::Seed(cmd) => self.handle_seed(cmd),
            StockCommand::Adjust(cmd) => self.handle_adjust(cmd),
            StockCommand::Purchase(cmd) => self.handle_purchase(cmd),
            StockCommand::Correct(cmd) => self.handle_correct(cmd),
        }
    }
}

impl StockLevel {
    fn ensure_product_id(&self, product_id: &ProductId) -> Result<(), DomainError> {
        if &self.product_id != product_id {
            return Err(DomainError::invalid_argument("product_id mismatch"));
        }
        Ok(())
    }

    fn total_after(&self, delta: i64) -> Result<i64, DomainError> {
        self.total
            .checked_add(delta)
            .ok_or_else(|| out_of_range(delta))
    }

    fn handle_seed(&self, cmd: &SeedStock) -> Result<Vec<StockMovement>, DomainError> {
        self.ensure_product_id(&cmd.product_id)?;
        if self.has_history() {
            return Err(DomainError::conflict("stock already seeded"));
        }
        if cmd.quantity < 0 {
            return Err(DomainError::invalid_argument("quantity cannot be negative"));
        }
        if cmd.quantity == 0 {
            return Ok(vec![]);
        }
        self.total_after(cmd.quantity)?;
        Ok(vec![StockMovement {
            product_id: cmd.product_id.clone(),
            delta: cmd.quantity,
            remarks: "Initial stock".to_string(),
            kind: MovementKind::Seed,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_adjust(&self, cmd: &AdjustStock) -> Result<Vec<StockMovement>, DomainError> {
        self.ensure_product_id(&cmd.product_id)?;

        if cmd.delta == 0 {
            return Err(DomainError::invalid_argument("delta cannot be zero"));
        }

        if cmd.delta < 0 {
            let requested = cmd.delta.checked_neg().ok_or_else(|| out_of_range(cmd.delta))?;
            if requested > self.total {
                return Err(DomainError::insufficient_stock(self.total, requested));
            }
        }
        self.total_after(cmd.delta)?;

        Ok(vec![StockMovement {
            product_id: cmd.product_id.clone(),
            delta: cmd.delta,
            remarks: cmd.remarks.clone(),
            kind: MovementKind::Adjustment,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_purchase(&self, cmd: &RecordPurchase) -> Result<Vec<StockMovement>, DomainError> {
        self.ensure_product_id(&cmd.product_id)?;

        if cmd.quantity <= 0 {
            return Err(DomainError::invalid_argument(
                "purchase quantity must be positive",
            ));
        }
        if self.total < cmd.quantity {
            return Err(DomainError::insufficient_stock(self.total, cmd.quantity));
        }

        Ok(vec![StockMovement {
            product_id: cmd.product_id.clone(),
            delta: -cmd.quantity,
            remarks: format!("Purchase of {} units", cmd.quantity),
            kind: MovementKind::Purchase,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_correct(&self, cmd: &CorrectStock) -> Result<Vec<StockMovement>, DomainError> {
        self.ensure_product_id(&cmd.product_id)?;

        if cmd.target < 0 {
            return Err(DomainError::invalid_argument("quantity cannot be negative"));
        }

        let delta = cmd
            .target
            .checked_sub(self.total)
            .ok_or_else(|| out_of_range(cmd.target))?;
        if delta == 0 {
            return Ok(vec![]);
        }

        Ok(vec![StockMovement {
            product_id: cmd.product_id.clone(),
            delta,
            remarks: format!("Administrative correction to {} units", cmd.target),
            kind: MovementKind::Correction,
            occurred_at: cmd.occurred_at,
        }])
    }
}

fn out_of_range(value: i64) -> DomainError {
    DomainError::invalid_argument(format!("{value} puts the stock total out of range"))
}
