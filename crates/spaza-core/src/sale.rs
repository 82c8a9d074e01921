//! # Sale Module
//!
//! The in-memory sale transaction: line items, derived totals, and payment
//! settlement math.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                │
//! │                                                                     │
//! │  start_new_sale()                                                   │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌─────────┐  add/remove/update lines   ┌───────────┐              │
//! │  │  Open   │ ─────────────────────────► │ Completed │              │
//! │  │         │  set_payment + complete    │ (persisted,│              │
//! │  └────┬────┘                            │  immutable)│              │
//! │       │                                 └─────┬─────┘              │
//! │       │ discard (no trace)                    │ void               │
//! │       ▼                                       ▼                    │
//! │   (gone)                                ┌───────────┐              │
//! │                                         │  Voided   │  terminal    │
//! │                                         └───────────┘              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Derived Totals
//! Subtotal, VAT amount, grand total and item count are computed fresh from
//! the line items on every read. They are deliberately NOT stored (neither
//! on this struct nor in the sales table) so they can never drift from the
//! lines that define them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;
use crate::types::{PaymentMethod, Product, VatRate};

// =============================================================================
// Sale Line
// =============================================================================

/// A line item in a sale.
///
/// Uses the snapshot pattern: name, unit price and VAT rate are frozen at
/// add time so the sale's history is immune to later catalog edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLine {
    /// The product sold.
    pub product_id: i64,

    /// Product name at time of sale (frozen).
    pub name_snapshot: String,

    /// Quantity sold. Always > 0.
    pub quantity: i64,

    /// Unit shelf price in cents at time of sale (frozen).
    pub unit_price_cents: i64,

    /// Line total (unit price × quantity). VAT-inclusive.
    pub total_cents: i64,

    /// VAT rate snapshot in basis points. Zero when the product was
    /// VAT-exclusive at add time; such a line contributes nothing to the
    /// VAT amount regardless of the product's nominal rate.
    pub vat_rate_bps: u32,
}

impl SaleLine {
    /// Creates a line by snapshotting a product at the given quantity.
    ///
    /// `product_id` is passed separately because an unpersisted `Product`
    /// carries no id; callers resolve it first.
    pub fn snapshot(product_id: i64, product: &Product, quantity: i64) -> Self {
        SaleLine {
            product_id,
            name_snapshot: product.name.clone(),
            quantity,
            unit_price_cents: product.sell_price_cents,
            total_cents: product.sell_price_cents * quantity,
            vat_rate_bps: product.vat_rate_for_sale(),
        }
    }

    /// Rewrites the quantity, keeping the frozen unit price.
    pub fn set_quantity(&mut self, quantity: i64) {
        self.quantity = quantity;
        self.total_cents = self.unit_price_cents * quantity;
    }

    /// The VAT contained in this line's total (inclusive back-calculation).
    pub fn vat_amount_cents(&self) -> i64 {
        Money::from_cents(self.total_cents)
            .vat_portion(VatRate::from_bps(self.vat_rate_bps))
            .cents()
    }

    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A sale transaction.
///
/// While open it lives only in memory inside the transaction manager;
/// completion persists it and assigns `id`. Line order is insertion order
/// (display order only; totals do not depend on it).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    /// Database-assigned identifier (None until persisted).
    pub id: Option<i64>,

    /// Human-readable globally-unique reference, e.g. `TXN-9F2C41AB`.
    /// Generated at creation time, before persistence.
    pub transaction_ref: String,

    /// When the sale was started.
    pub date_time: DateTime<Utc>,

    /// The cashier who rang up the sale.
    pub user_id: i64,

    /// Ordered line items.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub lines: Vec<SaleLine>,

    /// How the sale was settled.
    pub payment_method: PaymentMethod,

    /// Cash handed over by the customer, in cents.
    pub cash_tendered_cents: i64,

    /// Amount put through the card terminal, in cents.
    pub card_tendered_cents: i64,

    /// Change returned to the customer. Always >= 0.
    pub change_cents: i64,

    /// Whether the sale has been voided.
    pub voided: bool,

    /// Who voided the sale.
    pub voided_by: Option<i64>,

    /// When the sale was voided.
    pub voided_at: Option<DateTime<Utc>>,

    /// Why the sale was voided.
    pub void_reason: String,
}

impl Sale {
    /// Creates a new empty sale for the given cashier.
    pub fn new(user_id: i64) -> Self {
        Sale {
            id: None,
            transaction_ref: generate_transaction_ref(),
            date_time: Utc::now(),
            user_id,
            lines: Vec::new(),
            payment_method: PaymentMethod::Cash,
            cash_tendered_cents: 0,
            card_tendered_cents: 0,
            change_cents: 0,
            voided: false,
            voided_by: None,
            voided_at: None,
            void_reason: String::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Line access
    // -------------------------------------------------------------------------

    /// The staged quantity of a product, 0 when not in the sale.
    pub fn quantity_of(&self, product_id: i64) -> i64 {
        self.lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map(|l| l.quantity)
            .unwrap_or(0)
    }

    /// Appends a new line. Caller guarantees the product is not already
    /// staged (merging goes through [`Sale::set_line_quantity`]).
    pub fn push_line(&mut self, line: SaleLine) {
        self.lines.push(line);
    }

    /// Rewrites an existing line's quantity and total.
    ///
    /// Returns false when the product is not in the sale.
    pub fn set_line_quantity(&mut self, product_id: i64, quantity: i64) -> bool {
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => {
                line.set_quantity(quantity);
                true
            }
            None => false,
        }
    }

    /// Removes a product's line entirely, regardless of quantity.
    ///
    /// Returns false when the product is not in the sale.
    pub fn remove_line(&mut self, product_id: i64) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    /// Checks if the sale has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    // -------------------------------------------------------------------------
    // Derived totals (never stored)
    // -------------------------------------------------------------------------

    /// Sum of line totals minus their VAT shares.
    pub fn subtotal_cents(&self) -> i64 {
        self.lines
            .iter()
            .map(|l| l.total_cents - l.vat_amount_cents())
            .sum()
    }

    /// Sum of line VAT shares.
    pub fn vat_cents(&self) -> i64 {
        self.lines.iter().map(|l| l.vat_amount_cents()).sum()
    }

    /// Grand total: sum of line totals.
    pub fn total_cents(&self) -> i64 {
        self.lines.iter().map(|l| l.total_cents).sum()
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents())
    }

    // -------------------------------------------------------------------------
    // Payment
    // -------------------------------------------------------------------------

    /// Records the tendered amounts and computes change.
    ///
    /// ## Change Rules
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────┐
    /// │  cash:   change = max(0, cash − total)                          │
    /// │  card:   change = 0 (terminal settles the exact total)          │
    /// │  mixed:  cash_due = max(0, total − card)                        │
    /// │          change   = max(0, cash − cash_due)                     │
    /// │                                                                 │
    /// │  The card amount offsets the total BEFORE the cash shortfall    │
    /// │  is computed. When the card alone covers the total, cash_due    │
    /// │  is 0 and any cash tendered comes straight back as change.      │
    /// └─────────────────────────────────────────────────────────────────┘
    /// ```
    pub fn set_payment(&mut self, method: PaymentMethod, cash_cents: i64, card_cents: i64) {
        self.payment_method = method;
        self.cash_tendered_cents = cash_cents;
        self.card_tendered_cents = card_cents;

        let total = self.total_cents();
        self.change_cents = match method {
            PaymentMethod::Cash => (cash_cents - total).max(0),
            PaymentMethod::Card => 0,
            PaymentMethod::Mixed => {
                let cash_due = (total - card_cents).max(0);
                (cash_cents - cash_due).max(0)
            }
        };
    }

    /// True iff the tendered amounts cover the grand total.
    ///
    /// Change is not considered, only sufficiency.
    pub fn validate_payment(&self) -> bool {
        self.cash_tendered_cents + self.card_tendered_cents >= self.total_cents()
    }
}

/// Generates a globally-unique human-readable transaction reference.
///
/// Format: `TXN-` + first 8 hex chars of a UUID v4, uppercased.
fn generate_transaction_ref() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("TXN-{}", hex[..8].to_uppercase())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;

    fn test_product(id: i64, sell_price_cents: i64) -> Product {
        Product {
            id: Some(id),
            name: format!("Product {}", id),
            barcode: None,
            category: Category::Food,
            cost_price_cents: sell_price_cents / 2,
            sell_price_cents,
            current_stock: 100,
            min_stock: 5,
            vat_rate_bps: 1500,
            vat_inclusive: true,
            archived: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sale_with_total(total_cents: i64) -> Sale {
        let mut sale = Sale::new(1);
        let product = test_product(1, total_cents);
        sale.push_line(SaleLine::snapshot(1, &product, 1));
        sale
    }

    #[test]
    fn test_transaction_ref_format() {
        let sale = Sale::new(1);
        assert!(sale.transaction_ref.starts_with("TXN-"));
        assert_eq!(sale.transaction_ref.len(), 12);
        assert!(sale.transaction_ref[4..]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_transaction_refs_are_unique() {
        let a = Sale::new(1);
        let b = Sale::new(1);
        assert_ne!(a.transaction_ref, b.transaction_ref);
    }

    #[test]
    fn test_line_snapshot_freezes_product_data() {
        let mut product = test_product(7, 1899);
        let line = SaleLine::snapshot(7, &product, 3);

        // Later catalog edits must not affect the line
        product.sell_price_cents = 2500;
        product.name = "Renamed".to_string();

        assert_eq!(line.unit_price_cents, 1899);
        assert_eq!(line.total_cents, 5697);
        assert_eq!(line.name_snapshot, "Product 7");
    }

    #[test]
    fn test_vat_exclusive_line_contributes_no_vat() {
        let mut product = test_product(1, 1000);
        product.vat_inclusive = false;
        let line = SaleLine::snapshot(1, &product, 2);

        assert_eq!(line.vat_rate_bps, 0);
        assert_eq!(line.vat_amount_cents(), 0);
    }

    #[test]
    fn test_derived_totals_identity() {
        let mut sale = Sale::new(1);
        sale.push_line(SaleLine::snapshot(1, &test_product(1, 1899), 2));
        sale.push_line(SaleLine::snapshot(2, &test_product(2, 799), 5));

        // subtotal + vat == total, exactly, in integer cents
        assert_eq!(
            sale.subtotal_cents() + sale.vat_cents(),
            sale.total_cents()
        );
        assert_eq!(sale.total_cents(), 1899 * 2 + 799 * 5);
        assert_eq!(sale.item_count(), 7);
    }

    #[test]
    fn test_set_line_quantity_rewrites_total() {
        let mut sale = Sale::new(1);
        sale.push_line(SaleLine::snapshot(1, &test_product(1, 500), 2));

        assert!(sale.set_line_quantity(1, 5));
        assert_eq!(sale.quantity_of(1), 5);
        assert_eq!(sale.total_cents(), 2500);

        assert!(!sale.set_line_quantity(99, 1));
    }

    #[test]
    fn test_remove_line() {
        let mut sale = Sale::new(1);
        sale.push_line(SaleLine::snapshot(1, &test_product(1, 500), 4));

        assert!(sale.remove_line(1));
        assert!(sale.is_empty());
        assert!(!sale.remove_line(1));
    }

    #[test]
    fn test_cash_payment_change() {
        let mut sale = sale_with_total(10000);
        sale.set_payment(PaymentMethod::Cash, 15000, 0);
        assert_eq!(sale.change_cents, 5000);

        // Exact tender: zero change
        sale.set_payment(PaymentMethod::Cash, 10000, 0);
        assert_eq!(sale.change_cents, 0);

        // Under-tender never yields negative change
        sale.set_payment(PaymentMethod::Cash, 9000, 0);
        assert_eq!(sale.change_cents, 0);
    }

    #[test]
    fn test_card_payment_has_no_change() {
        let mut sale = sale_with_total(10000);
        sale.set_payment(PaymentMethod::Card, 0, 10000);
        assert_eq!(sale.change_cents, 0);
    }

    #[test]
    fn test_mixed_payment_change() {
        // total R100.00, card R60, cash R50:
        // cash_due = max(0, 100 − 60) = 40, change = max(0, 50 − 40) = R10
        let mut sale = sale_with_total(10000);
        sale.set_payment(PaymentMethod::Mixed, 5000, 6000);
        assert_eq!(sale.change_cents, 1000);
    }

    #[test]
    fn test_mixed_payment_card_covers_total() {
        // Card alone covers the total: cash_due = 0, all cash is change
        let mut sale = sale_with_total(10000);
        sale.set_payment(PaymentMethod::Mixed, 2000, 10000);
        assert_eq!(sale.change_cents, 2000);
    }

    #[test]
    fn test_validate_payment_boundaries() {
        let mut sale = sale_with_total(10000);

        sale.set_payment(PaymentMethod::Cash, 10000, 0);
        assert!(sale.validate_payment());

        // One cent short fails
        sale.set_payment(PaymentMethod::Cash, 9999, 0);
        assert!(!sale.validate_payment());

        sale.set_payment(PaymentMethod::Mixed, 4000, 6000);
        assert!(sale.validate_payment());
    }
}
