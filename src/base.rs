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

//! Core identifier types for ledger records and the people behind them.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Identifier of a [`Sale`](crate::Sale).
    SaleId
);
record_id!(
    /// Identifier of an [`Expense`](crate::Expense).
    ExpenseId
);
record_id!(
    /// Identifier of a [`Debt`](crate::Debt).
    DebtId
);
record_id!(
    /// Identifier of a [`Supplier`](crate::Supplier).
    SupplierId
);
record_id!(
    /// Identifier of a [`Purchase`](crate::Purchase).
    PurchaseId
);

/// Human-readable order number shared by sales, expenses and purchases.
///
/// Zero-padded to four digits up to `9999`, five digits beyond that.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct OrderNo(String);

impl OrderNo {
    /// Formats a raw sequence value.
    pub fn from_seq(value: u64) -> Self {
        if value <= 9999 {
            OrderNo(format!("{value:04}"))
        } else {
            OrderNo(format!("{value:05}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses user input such as `"0042"` or `"#42"`, ignoring non-digits.
    pub fn parse_loose(input: &str) -> Option<Self> {
        let digits: String = input.chars().filter(char::is_ascii_digit).collect();
        let value = digits.parse::<u64>().ok()?;
        Some(OrderNo::from_seq(value))
    }
}

impl fmt::Display for OrderNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Staff member acting on the ledger (seller, spender, payer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
}

impl Person {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Reference to a stored record, used in [`LedgerError::NotFound`](crate::LedgerError::NotFound).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordRef {
    Sale(SaleId),
    Expense(ExpenseId),
    Debt(DebtId),
    Supplier(SupplierId),
    Purchase(PurchaseId),
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRef::Sale(id) => write!(f, "sale {id}"),
            RecordRef::Expense(id) => write!(f, "expense {id}"),
            RecordRef::Debt(id) => write!(f, "debt {id}"),
            RecordRef::Supplier(id) => write!(f, "supplier {id}"),
            RecordRef::Purchase(id) => write!(f, "purchase {id}"),
        }
    }
}
