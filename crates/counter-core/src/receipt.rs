//! # Receipt Formatter
//!
//! Turns a cart (preview) or a committed sale (original or reprint) into a
//! device-independent [`Ticket`]. Pure: the timestamp is passed in.
//!
//! ## Ticket Layout
//! ```text
//! ┌────────────────────────────────┐
//! │           My Store             │  store name
//! │        123 Main Street         │  address
//! │         Tel: 555-0100          │  phone
//! │      2024-05-01 14:03:22       │  timestamp
//! │        Ticket #1a2b3c4d        │  short ref / DRAFT
//! │--------------------------------│
//! │2 x Yerba Mate 1k         20.00 │  qty x name(15)  subtotal
//! │1 x Bread                  5.00 │
//! │--------------------------------│
//! │TOTAL                     25.00 │
//! │                                │
//! │ Thank you for your purchase!   │
//! │     *** REPRINTED COPY ***     │  reprints only
//! └────────────────────────────────┘
//! ```
//!
//! The structured [`Ticket`] is what the printer and screen layers consume.
//! [`Ticket::render`] produces the fixed-width text above for thermal paper.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::Cart;
use crate::money::Money;
use crate::types::{SaleRecord, StoreIdentity};

/// Reference printed for a cart that has not been checked out.
pub const DRAFT_REFERENCE: &str = "DRAFT";

/// Characters of the product name kept on a ticket row.
pub const TICKET_NAME_WIDTH: usize = 15;

pub const TICKET_FOOTER: &str = "Thank you for your purchase!";

pub const REPRINT_MARKER: &str = "*** REPRINTED COPY ***";

/// Default thermal paper width in characters (58mm roll).
pub const DEFAULT_PAPER_WIDTH: usize = 32;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// =============================================================================
// Input
// =============================================================================

/// Whether the ticket is printed for the first time or reprinted from history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TicketKind {
    Original,
    Reprint,
}

/// One line to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketLineInput {
    pub quantity: i64,
    pub name: String,
    pub unit_price: Money,
}

/// What a ticket is printed from: a cart or a sale, reduced to the same shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketSource {
    /// Sale short reference. `None` for an uncommitted cart.
    pub reference: Option<String>,
    pub lines: Vec<TicketLineInput>,
    pub total: Money,
}

impl From<&Cart> for TicketSource {
    fn from(cart: &Cart) -> Self {
        TicketSource {
            reference: None,
            lines: cart
                .lines()
                .iter()
                .map(|line| TicketLineInput {
                    quantity: line.quantity,
                    name: line.name.clone(),
                    unit_price: line.unit_price,
                })
                .collect(),
            total: cart.total(),
        }
    }
}

impl From<&SaleRecord> for TicketSource {
    fn from(record: &SaleRecord) -> Self {
        TicketSource {
            reference: Some(record.sale.short_ref()),
            lines: record
                .lines
                .iter()
                .map(|line| TicketLineInput {
                    quantity: line.quantity,
                    name: line.name.clone(),
                    unit_price: line.price,
                })
                .collect(),
            total: record.sale.total,
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// A printed row: `qty x name ... subtotal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TicketRow {
    pub quantity: i64,
    /// Product name truncated to [`TICKET_NAME_WIDTH`] characters.
    pub name: String,
    /// Line subtotal with two decimals.
    pub subtotal: String,
}

/// A formatted ticket, ready for a printer or a preview screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Ticket {
    pub store_name: String,
    pub address: String,
    pub phone: String,
    pub date_time: String,
    pub reference: String,
    pub rows: Vec<TicketRow>,
    pub total: String,
    pub footer: String,
    pub reprint_marker: Option<String>,
}

/// Formats a ticket.
///
/// ## Rules
/// - Reference: the sale's short ref, or `DRAFT` for a cart
/// - Names: first 15 characters
/// - Amounts: two decimals, no currency symbol
/// - Reprints carry the reprint marker and should be given the sale's
///   original timestamp
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use counter_core::receipt::{format_ticket, TicketKind, TicketLineInput, TicketSource};
/// use counter_core::{Money, StoreIdentity};
///
/// let source = TicketSource {
///     reference: None,
///     lines: vec![TicketLineInput {
///         quantity: 2,
///         name: "Yerba Mate 1kg Premium".to_string(),
///         unit_price: Money::from_cents(1000),
///     }],
///     total: Money::from_cents(2000),
/// };
/// let at = Utc.with_ymd_and_hms(2024, 5, 1, 14, 3, 22).unwrap();
/// let ticket = format_ticket(&StoreIdentity::default(), &source, at, TicketKind::Original);
///
/// assert_eq!(ticket.reference, "DRAFT");
/// assert_eq!(ticket.rows[0].name, "Yerba Mate 1kg ");
/// assert_eq!(ticket.total, "20.00");
/// assert_eq!(ticket.date_time, "2024-05-01 14:03:22");
/// ```
pub fn format_ticket(
    store: &StoreIdentity,
    source: &TicketSource,
    timestamp: DateTime<Utc>,
    kind: TicketKind,
) -> Ticket {
    let rows = source
        .lines
        .iter()
        .map(|line| TicketRow {
            quantity: line.quantity,
            name: line.name.chars().take(TICKET_NAME_WIDTH).collect(),
            subtotal: line.unit_price.multiply_quantity(line.quantity).to_decimal_string(),
        })
        .collect();

    Ticket {
        store_name: store.name.clone(),
        address: store.address.clone(),
        phone: store.phone.clone(),
        date_time: timestamp.format(TIMESTAMP_FORMAT).to_string(),
        reference: source
            .reference
            .clone()
            .unwrap_or_else(|| DRAFT_REFERENCE.to_string()),
        rows,
        total: source.total.to_decimal_string(),
        footer: TICKET_FOOTER.to_string(),
        reprint_marker: match kind {
            TicketKind::Original => None,
            TicketKind::Reprint => Some(REPRINT_MARKER.to_string()),
        },
    }
}

impl Ticket {
    pub fn is_reprint(&self) -> bool {
        self.reprint_marker.is_some()
    }

    /// Renders fixed-width text lines for a thermal printer.
    ///
    /// Header and footer lines are centered. Subtotals are right-aligned.
    /// Widths below 24 are raised to 24.
    pub fn render(&self, width: usize) -> Vec<String> {
        let width = width.max(24);
        let rule = "-".repeat(width);
        let mut out = Vec::with_capacity(self.rows.len() + 12);

        out.push(center(&self.store_name, width));
        if !self.address.is_empty() {
            out.push(center(&self.address, width));
        }
        if !self.phone.is_empty() {
            out.push(center(&format!("Tel: {}", self.phone), width));
        }
        out.push(center(&self.date_time, width));
        out.push(center(&format!("Ticket #{}", self.reference), width));
        out.push(rule.clone());

        for row in &self.rows {
            let left = format!("{} x {}", row.quantity, row.name);
            out.push(justify(&left, &row.subtotal, width));
        }

        out.push(rule);
        out.push(justify("TOTAL", &self.total, width));
        out.push(String::new());
        out.push(center(&self.footer, width));
        if let Some(marker) = &self.reprint_marker {
            out.push(center(marker, width));
        }

        out
    }

    /// Serializes the ticket for the screen / printer bridge.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.chars().take(width).collect();
    }
    let pad = (width - len) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

/// `left` padded so that `right` ends at column `width`. The left part is
/// cut when both do not fit.
fn justify(left: &str, right: &str, width: usize) -> String {
    let right_len = right.chars().count();
    let room = width.saturating_sub(right_len + 1);
    let left: String = left.chars().take(room).collect();
    let gap = width - left.chars().count() - right_len;
    format!("{}{}{}", left, " ".repeat(gap), right)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Product, Sale, SaleLine};
    use chrono::TimeZone;

    fn store() -> StoreIdentity {
        StoreIdentity {
            id: 1,
            name: "Almacen Don Jose".to_string(),
            address: "Av. Siempre Viva 742".to_string(),
            phone: "555-0100".to_string(),
            logo_url: None,
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 14, 3, 22).unwrap()
    }

    fn product(id: &str, name: &str, cents: i64) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            barcode: None,
            cost_price: Money::from_cents(cents / 2),
            price_sell: Money::from_cents(cents),
            stock_current: 10,
            category_id: None,
        }
    }

    fn cart() -> Cart {
        let mut cart = Cart::new();
        let yerba = product("p1", "Yerba Mate 1kg Premium", 1000);
        cart.add(&yerba).unwrap();
        cart.add(&yerba).unwrap();
        cart.add(&product("p2", "Bread", 500)).unwrap();
        cart
    }

    fn sale_record() -> SaleRecord {
        SaleRecord {
            sale: Sale {
                id: "1a2b3c4d-0000-4000-8000-000000000000".to_string(),
                created_at: at(),
                total: Money::from_cents(2500),
                terminal_id: "till-1".to_string(),
                idempotency_key: "k".to_string(),
            },
            lines: vec![
                SaleLine {
                    product_id: "p1".to_string(),
                    name: "Yerba Mate 1kg Premium".to_string(),
                    quantity: 2,
                    price: Money::from_cents(1000),
                },
                SaleLine {
                    product_id: "p2".to_string(),
                    name: "Bread".to_string(),
                    quantity: 1,
                    price: Money::from_cents(500),
                },
            ],
        }
    }

    #[test]
    fn test_cart_preview() {
        let ticket = format_ticket(&store(), &TicketSource::from(&cart()), at(), TicketKind::Original);

        assert_eq!(ticket.reference, DRAFT_REFERENCE);
        assert_eq!(ticket.date_time, "2024-05-01 14:03:22");
        assert_eq!(ticket.total, "25.00");
        assert_eq!(ticket.rows.len(), 2);
        assert_eq!(ticket.rows[0].name, "Yerba Mate 1kg ");
        assert_eq!(ticket.rows[0].subtotal, "20.00");
        assert_eq!(ticket.rows[1].subtotal, "5.00");
        assert!(!ticket.is_reprint());
    }

    #[test]
    fn test_same_inputs_same_ticket() {
        let source = TicketSource::from(&sale_record());
        let a = format_ticket(&store(), &source, at(), TicketKind::Original);
        let b = format_ticket(&store(), &source, at(), TicketKind::Original);
        assert_eq!(a, b);
        assert_eq!(a.render(32), b.render(32));
    }

    #[test]
    fn test_reprint_differs_only_by_marker() {
        let source = TicketSource::from(&sale_record());
        let original = format_ticket(&store(), &source, at(), TicketKind::Original);
        let reprint = format_ticket(&store(), &source, at(), TicketKind::Reprint);

        assert_eq!(reprint.reprint_marker.as_deref(), Some(REPRINT_MARKER));
        assert_eq!(original.rows, reprint.rows);
        assert_eq!(original.total, reprint.total);
        assert_eq!(original.reference, "1a2b3c4d");
        assert_eq!(
            Ticket {
                reprint_marker: None,
                ..reprint
            },
            original
        );
    }

    #[test]
    fn test_cart_and_sale_produce_same_rows() {
        let from_cart = format_ticket(&store(), &TicketSource::from(&cart()), at(), TicketKind::Original);
        let from_sale = format_ticket(
            &store(),
            &TicketSource::from(&sale_record()),
            at(),
            TicketKind::Original,
        );
        assert_eq!(from_cart.rows, from_sale.rows);
        assert_eq!(from_cart.total, from_sale.total);
    }

    #[test]
    fn test_render_layout() {
        let ticket = format_ticket(
            &store(),
            &TicketSource::from(&sale_record()),
            at(),
            TicketKind::Reprint,
        );
        let lines = ticket.render(32);

        assert!(lines.iter().all(|l| l.chars().count() <= 32));
        assert!(lines.contains(&"2 x Yerba Mate 1kg         20.00".to_string()));
        assert!(lines.contains(&"TOTAL                      25.00".to_string()));
        assert!(lines.iter().any(|l| l.trim() == "Tel: 555-0100"));
        assert!(lines.iter().any(|l| l.trim() == "Ticket #1a2b3c4d"));
        assert_eq!(lines.last().map(|l| l.trim()), Some(REPRINT_MARKER));
    }

    #[test]
    fn test_render_narrow_paper_cuts_name_not_amount() {
        let ticket = format_ticket(
            &store(),
            &TicketSource::from(&sale_record()),
            at(),
            TicketKind::Original,
        );
        let lines = ticket.render(10);
        assert!(lines.iter().all(|l| l.chars().count() <= 24));
        assert!(lines.iter().any(|l| l.ends_with(" 20.00")));
    }

    #[test]
    fn test_to_json() {
        let ticket = format_ticket(&store(), &TicketSource::from(&cart()), at(), TicketKind::Original);
        let json = ticket.to_json().unwrap();
        let back: Ticket = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ticket);
        assert!(json.contains("\"reprint_marker\":null"));
    }
}
