// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Free-text message parser.
//!
//! Staff type sales as loose phrases:
//!
//! ```text
//! Tort 140000 100000, Perog 2ta 12000 tel 903456677
//! ```
//!
//! Parsing runs in three stages: the [lexer](lexer) splits the message into
//! tokens, the [segmenter](segment) groups them into one segment per line
//! item, and the [item builder](item) resolves quantity, price, paid amount
//! and name. Parsing never fails; a message with nothing usable yields no
//! items, which callers treat as a user-input error.

mod item;
pub(crate) mod lexer;
mod segment;

use crate::config::ParserConfig;
use crate::error::LedgerError;
use crate::records::LineItem;
use item::{build_expense, build_item};
use lexer::lex;
use rust_decimal::Decimal;
use segment::segment;
use serde::Serialize;
use tracing::debug;

/// Result of parsing a sale message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedSale {
    pub items: Vec<LineItem>,
    /// Normalized phone, e.g. `998903456677`.
    pub phone: Option<String>,
}

impl ParsedSale {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Turns an empty parse into [`LedgerError::ParseEmpty`].
    pub fn require_items(self) -> Result<Self, LedgerError> {
        if self.is_empty() {
            Err(LedgerError::ParseEmpty)
        } else {
            Ok(self)
        }
    }
}

/// Result of parsing an expense message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedExpense {
    pub title: String,
    /// `qty * unit_price`.
    pub amount: Decimal,
    pub qty: u32,
    pub unit_price: Decimal,
}

/// Message parser with its settings.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parses a sale message into line items and an optional phone.
    pub fn parse_sale(&self, text: &str) -> ParsedSale {
        let segmented = segment(text);
        let items: Vec<LineItem> = segmented
            .segments
            .iter()
            .filter_map(|segment| build_item(segment, &self.config))
            .collect();
        let phone = segmented
            .phone_candidates
            .iter()
            .find_map(|candidate| self.normalize_phone(candidate));

        if items.is_empty() {
            debug!(text, "no line item found in sale message");
        }
        ParsedSale { items, phone }
    }

    /// Parses an expense message: one quantity, one unit price, the rest is
    /// the title. `None` if no amount qualifies.
    pub fn parse_expense(&self, text: &str) -> Option<ParsedExpense> {
        let parts = build_expense(&lex(text), &self.config);
        let Some(parts) = parts else {
            debug!(text, "no amount found in expense message");
            return None;
        };
        let unit_price = Decimal::from(parts.unit_price);
        Some(ParsedExpense {
            title: parts.title,
            amount: Decimal::from(parts.qty) * unit_price,
            qty: parts.qty,
            unit_price,
        })
    }

    /// Accepts 9 to 12 digits, optionally after a `+`. Nine-digit local
    /// numbers get the country code prefixed.
    pub fn normalize_phone(&self, candidate: &str) -> Option<String> {
        let trimmed = candidate.trim_end_matches(['.', ',', ';']);
        let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
        if !(9..=12).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if digits.len() == 9 {
            Some(format!("{}{}", self.config.country_code, digits))
        } else {
            Some(digits.to_string())
        }
    }
}

/// Parses a sale message with default settings.
///
/// # Example
///
/// ```
/// use kassa::parse_sale_message;
/// use rust_decimal_macros::dec;
///
/// let parsed = parse_sale_message("Tort 140000 100000 tel 903456677");
/// assert_eq!(parsed.items[0].unit_price, dec!(140000));
/// assert_eq!(parsed.items[0].paid_amount, dec!(100000));
/// assert_eq!(parsed.phone.as_deref(), Some("998903456677"));
/// ```
pub fn parse_sale_message(text: &str) -> ParsedSale {
    Parser::default().parse_sale(text)
}

/// Parses an expense message with default settings.
pub fn parse_expense_message(text: &str) -> Option<ParsedExpense> {
    Parser::default().parse_expense(text)
}
