//! # Domain Types
//!
//! Core domain types used throughout Spaza POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌───────────────┐   ┌────────────────┐   ┌──────────────────┐     │
//! │  │   Product     │   │ StockMovement  │   │    DailyCash     │     │
//! │  │ ───────────── │   │ ────────────── │   │ ──────────────── │     │
//! │  │ id (i64)      │   │ product_id     │   │ business_date    │     │
//! │  │ barcode       │   │ kind / delta   │   │ opening_cents    │     │
//! │  │ sell_price    │   │ prev / result  │   │ expected_closing │     │
//! │  │ current_stock │   │ sale_id (opt)  │   │ variance_cents   │     │
//! │  └───────────────┘   └────────────────┘   └──────────────────┘     │
//! │                                                                     │
//! │  ┌───────────────┐   ┌────────────────┐   ┌──────────────────┐     │
//! │  │   VatRate     │   │  MovementKind  │   │  PaymentMethod   │     │
//! │  │ ───────────── │   │ ────────────── │   │ ──────────────── │     │
//! │  │ bps (u32)     │   │  Addition      │   │  Cash            │     │
//! │  │ 1500 = 15.0%  │   │  Sale          │   │  Card            │     │
//! │  └───────────────┘   │  Adjustment    │   │  Mixed           │     │
//! │                      │  Deletion      │   └──────────────────┘     │
//! │                      └────────────────┘                            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Entities use database-assigned integer ids (`Option<i64>`, `None` until
//! persisted). Sales additionally carry a human-readable transaction
//! reference generated at creation time (see [`crate::sale`]).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;
use crate::DEFAULT_VAT_RATE_BPS;

// =============================================================================
// VAT Rate
// =============================================================================

/// VAT rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1500 bps = 15.00% (the South African VAT rate)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatRate(u32);

impl VatRate {
    /// Creates a VAT rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        VatRate(bps)
    }

    /// Creates a VAT rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        VatRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero VAT rate.
    #[inline]
    pub const fn zero() -> Self {
        VatRate(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for VatRate {
    fn default() -> Self {
        VatRate(DEFAULT_VAT_RATE_BPS)
    }
}

// =============================================================================
// Product Category
// =============================================================================

/// Shelf category for a product.
///
/// The fixed set the shop trades in; `Other` is the catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Food,
    Household,
    Sweets,
    Cooldrinks,
    Other,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Category; 5] = [
        Category::Food,
        Category::Household,
        Category::Sweets,
        Category::Cooldrinks,
        Category::Other,
    ];
}

impl Default for Category {
    fn default() -> Self {
        Category::Other
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Food => "Food",
            Category::Household => "Household",
            Category::Sweets => "Sweets",
            Category::Cooldrinks => "Cooldrinks",
            Category::Other => "Other",
        };
        write!(f, "{}", name)
    }
}

// =============================================================================
// Movement Kind
// =============================================================================

/// The cause of a stock quantity change.
///
/// Every mutation of `current_stock` is tagged with exactly one of these in
/// its audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Stock received (initial stock, restocking).
    Addition,
    /// Stock sold through a completed sale (negative delta).
    Sale,
    /// Manual correction, including void compensation (either sign).
    Adjustment,
    /// Remaining stock written off when a product is hard-deleted.
    Deletion,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash into the till.
    Cash,
    /// Card on the external terminal; the till sees no cash.
    Card,
    /// Part card, part cash.
    Mixed,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// `current_stock` is written exclusively by the stock ledger; every other
/// writer goes through catalog update paths that never touch it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Database-assigned identifier (None until inserted).
    pub id: Option<i64>,

    /// Display name shown to the cashier and on receipts.
    pub name: String,

    /// Barcode (EAN-13, UPC-A, etc.). Unique when present.
    pub barcode: Option<String>,

    /// Shelf category.
    pub category: Category,

    /// What the shop paid per unit, in cents.
    pub cost_price_cents: i64,

    /// Shelf price per unit, in cents.
    pub sell_price_cents: i64,

    /// Quantity on hand. Never negative.
    pub current_stock: i64,

    /// Reorder threshold: at or below this the product is "low stock".
    pub min_stock: i64,

    /// VAT rate in basis points (1500 = 15.0%).
    pub vat_rate_bps: u32,

    /// Whether the shelf price already contains VAT.
    pub vat_inclusive: bool,

    /// Soft-delete flag. Archived products are hidden from sale and search
    /// but their history is preserved.
    pub archived: bool,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the shelf price as a Money type.
    #[inline]
    pub fn sell_price(&self) -> Money {
        Money::from_cents(self.sell_price_cents)
    }

    /// Returns the cost price as a Money type.
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    /// Returns the VAT rate.
    #[inline]
    pub fn vat_rate(&self) -> VatRate {
        VatRate::from_bps(self.vat_rate_bps)
    }

    /// The VAT rate a sale line should snapshot for this product.
    ///
    /// A VAT-exclusive product contributes nothing to the VAT amount, which
    /// is encoded by snapshotting a zero rate (the nominal rate is only
    /// meaningful when the price is VAT-inclusive).
    #[inline]
    pub fn vat_rate_for_sale(&self) -> u32 {
        if self.vat_inclusive {
            self.vat_rate_bps
        } else {
            0
        }
    }

    /// Checks whether the requested quantity is available to sell.
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity > 0 && quantity <= self.current_stock
    }

    /// Checks whether the product is at or below its reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.min_stock
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// One audited change to a product's quantity on hand.
///
/// Append-only: movements are never edited or deleted, even when the product
/// they reference is later removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    /// Database-assigned identifier (None until inserted).
    pub id: Option<i64>,

    /// The product whose stock changed.
    pub product_id: i64,

    /// What caused the change.
    pub kind: MovementKind,

    /// Signed change in quantity (negative for sales).
    pub quantity_delta: i64,

    /// Stock level before the change.
    pub previous_stock: i64,

    /// Stock level after the change.
    /// Invariant: `resulting_stock == previous_stock + quantity_delta`.
    pub resulting_stock: i64,

    /// The user who caused the change (audit attribution).
    pub user_id: i64,

    /// Free-text reason.
    pub reason: String,

    /// The sale that caused this movement, for kind = Sale.
    pub sale_id: Option<i64>,

    /// When the movement was recorded.
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// Daily Cash Record
// =============================================================================

/// One business day of till activity: opening float, aggregated sales,
/// withdrawals, and the end-of-day reconciliation.
///
/// At most one record per calendar date; reconciliation is a one-time
/// terminal transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DailyCash {
    /// The business date (unique).
    pub business_date: NaiveDate,

    /// Opening float counted into the till at day start.
    pub opening_cents: i64,

    /// Aggregated cash takings (includes the cash leg of mixed sales).
    pub cash_sales_cents: i64,

    /// Aggregated card takings (includes the card leg of mixed sales).
    pub card_sales_cents: i64,

    /// Cash taken out of the till during the day.
    pub withdrawals_cents: i64,

    /// Derived: opening + cash sales − withdrawals.
    pub expected_closing_cents: i64,

    /// Physical count entered at reconciliation.
    pub actual_closing_cents: Option<i64>,

    /// Derived at reconciliation: actual − expected.
    pub variance_cents: Option<i64>,

    /// Whether the day has been reconciled (terminal).
    pub reconciled: bool,

    /// Who reconciled the till.
    pub reconciled_by: Option<i64>,

    /// When the till was reconciled.
    pub reconciled_at: Option<DateTime<Utc>>,

    /// Reconciliation notes.
    pub notes: String,
}

impl DailyCash {
    /// Returns the expected closing as Money.
    #[inline]
    pub fn expected_closing(&self) -> Money {
        Money::from_cents(self.expected_closing_cents)
    }
}

// =============================================================================
// Variance Status
// =============================================================================

/// Classification of a reconciliation variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceStatus {
    /// Actual matched expected to the cent.
    Balanced,
    /// More cash in the drawer than expected.
    Over,
    /// Less cash in the drawer than expected.
    Short,
}

impl VarianceStatus {
    /// Classifies a variance in cents.
    pub fn classify(variance_cents: i64) -> Self {
        if variance_cents == 0 {
            VarianceStatus::Balanced
        } else if variance_cents > 0 {
            VarianceStatus::Over
        } else {
            VarianceStatus::Short
        }
    }
}

impl fmt::Display for VarianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VarianceStatus::Balanced => "balanced",
            VarianceStatus::Over => "over",
            VarianceStatus::Short => "short",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
