//! # Receipt Projection
//!
//! The read-only completed-sale structure handed to receipt printers, SMS
//! senders and display screens. Consumers get everything a slip needs
//! (reference, lines, totals, tender) without any access to the sale's
//! mutation paths.
//!
//! `render_text` produces the classic 50-column till slip; structured
//! consumers (SMS, e-receipt) serialize the struct instead.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ShopConfig;
use spaza_core::{PaymentMethod, Sale};

/// One rendered line on a receipt.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_cents: i64,
}

/// A completed sale projected for receipt/SMS consumers.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub shop_name: String,
    pub transaction_ref: String,
    pub date_time: DateTime<Utc>,
    pub lines: Vec<ReceiptLine>,
    pub item_count: i64,
    pub subtotal_cents: i64,
    pub vat_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub cash_tendered_cents: i64,
    pub card_tendered_cents: i64,
    pub change_cents: i64,
    pub currency_symbol: String,
    pub footer: String,
}

/// Slip width in characters (fits 58mm till paper at standard pitch).
const WIDTH: usize = 50;

impl Receipt {
    /// Projects a sale into its receipt form.
    pub fn from_sale(sale: &Sale, config: &ShopConfig) -> Self {
        Receipt {
            shop_name: config.shop_name.clone(),
            transaction_ref: sale.transaction_ref.clone(),
            date_time: sale.date_time,
            lines: sale
                .lines
                .iter()
                .map(|l| ReceiptLine {
                    name: l.name_snapshot.clone(),
                    quantity: l.quantity,
                    unit_price_cents: l.unit_price_cents,
                    total_cents: l.total_cents,
                })
                .collect(),
            item_count: sale.item_count(),
            subtotal_cents: sale.subtotal_cents(),
            vat_cents: sale.vat_cents(),
            total_cents: sale.total_cents(),
            payment_method: sale.payment_method,
            cash_tendered_cents: sale.cash_tendered_cents,
            card_tendered_cents: sale.card_tendered_cents,
            change_cents: sale.change_cents,
            currency_symbol: config.currency_symbol.clone(),
            footer: config.receipt_footer.clone(),
        }
    }

    /// Renders the fixed-width till slip.
    pub fn render_text(&self) -> String {
        let rule = "=".repeat(WIDTH);
        let thin_rule = "-".repeat(WIDTH);
        let mut out = Vec::new();

        out.push(rule.clone());
        out.push(center("PROOF OF PURCHASE"));
        out.push(rule.clone());
        out.push(String::new());
        out.push(center(&self.shop_name));
        out.push(String::new());
        out.push(format!("Transaction: {}", self.transaction_ref));
        out.push(format!(
            "Date: {}",
            self.date_time.format("%Y-%m-%d %H:%M:%S")
        ));
        out.push(String::new());
        out.push(thin_rule.clone());
        out.push(format!(
            "{:<22} {:>4} {:>10} {:>11}",
            "Item", "Qty", "Price", "Total"
        ));
        out.push(thin_rule.clone());

        for line in &self.lines {
            let name: String = line.name.chars().take(22).collect();
            out.push(format!(
                "{:<22} {:>4} {:>10} {:>11}",
                name,
                line.quantity,
                self.money(line.unit_price_cents),
                self.money(line.total_cents),
            ));
        }

        out.push(thin_rule);
        out.push(format!("{:<34} {:>15}", "Items:", self.item_count));
        out.push(format!(
            "{:<34} {:>15}",
            "Subtotal:",
            self.money(self.subtotal_cents)
        ));
        out.push(format!(
            "{:<34} {:>15}",
            "VAT:",
            self.money(self.vat_cents)
        ));
        out.push(format!(
            "{:<34} {:>15}",
            "TOTAL:",
            self.money(self.total_cents)
        ));
        out.push(rule.clone());

        match self.payment_method {
            PaymentMethod::Cash => {
                out.push(format!("{:<34} {:>15}", "Payment Method:", "CASH"));
                out.push(format!(
                    "{:<34} {:>15}",
                    "Cash Received:",
                    self.money(self.cash_tendered_cents)
                ));
                out.push(format!(
                    "{:<34} {:>15}",
                    "Change Given:",
                    self.money(self.change_cents)
                ));
            }
            PaymentMethod::Card => {
                out.push(format!("{:<34} {:>15}", "Payment Method:", "CARD"));
                out.push(format!(
                    "{:<34} {:>15}",
                    "Card Amount:",
                    self.money(self.card_tendered_cents)
                ));
            }
            PaymentMethod::Mixed => {
                out.push(format!("{:<34} {:>15}", "Payment Method:", "MIXED"));
                out.push(format!(
                    "{:<34} {:>15}",
                    "Card Amount:",
                    self.money(self.card_tendered_cents)
                ));
                out.push(format!(
                    "{:<34} {:>15}",
                    "Cash Amount:",
                    self.money(self.cash_tendered_cents)
                ));
                out.push(format!(
                    "{:<34} {:>15}",
                    "Change Given:",
                    self.money(self.change_cents)
                ));
            }
        }

        out.push(String::new());
        out.push(rule);
        out.push(center(&self.footer));
        out.push(center("Keep this receipt for your records"));
        out.push(String::new());

        out.join("\n")
    }

    fn money(&self, cents: i64) -> String {
        format!("{}{}.{:02}", self.currency_symbol, cents / 100, (cents % 100).abs())
    }
}

fn center(s: &str) -> String {
    format!("{:^width$}", s, width = WIDTH)
}

// =============================================================================
// Unit Tests
// =============================================================================
