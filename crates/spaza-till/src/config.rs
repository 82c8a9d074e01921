//! # Shop Configuration
//!
//! The handful of shop-level settings the till needs. A settings
//! collaborator (file, database, admin screen) owns persistence; this layer
//! just receives the value at construction time and passes it by reference
//! wherever it is needed (receipt header, catalog defaults).

use serde::{Deserialize, Serialize};

use spaza_core::DEFAULT_VAT_RATE_BPS;

/// Shop-level configuration for the till.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopConfig {
    /// Shop name printed on receipt headers.
    pub shop_name: String,

    /// Currency symbol for rendered amounts.
    pub currency_symbol: String,

    /// Default VAT rate for new products, in basis points.
    pub default_vat_rate_bps: u32,

    /// Whether new products default to VAT-inclusive pricing.
    pub vat_inclusive_default: bool,

    /// Footer line printed on receipts.
    pub receipt_footer: String,
}

impl Default for ShopConfig {
    fn default() -> Self {
        ShopConfig {
            shop_name: "Spaza Shop".to_string(),
            currency_symbol: "R".to_string(),
            default_vat_rate_bps: DEFAULT_VAT_RATE_BPS,
            vat_inclusive_default: true,
            receipt_footer: "Thank you for your business!".to_string(),
        }
    }
}
