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

//! # Kassa
//!
//! Cash-flow ledger core for a small retail shop: sales, expenses, customer
//! and supplier debt, and a running cash balance, driven by free-text
//! messages typed by staff.
//!
//! ## Core Components
//!
//! - [`Parser`]: turns phrases like `Perog 2ta 12000` into line items
//! - [`Ledger`]: records business events atomically against the balance
//! - [`allocator`]: debt payments and FIFO supplier allocation
//! - [`report`]: read-only totals over date ranges
//! - [`LedgerError`]: typed failures; a rejected operation changes nothing
//!
//! ## Example
//!
//! ```
//! use kassa::{Ledger, Person};
//! use rust_decimal_macros::dec;
//!
//! let ledger = Ledger::new();
//! let seller = Person::new(1, "Ali");
//!
//! // 140 000 cake, 100 000 paid now
//! let parsed = ledger
//!     .parse_sale_message("Tort 140000 100000 tel 903456677")
//!     .require_items()
//!     .unwrap();
//! let receipt = ledger.record_sale(&seller, parsed.items, parsed.phone).unwrap();
//! assert_eq!(ledger.balance(), dec!(100000));
//!
//! // the customer settles the rest
//! let debt = receipt.debt.unwrap();
//! let payment = ledger.pay_debt(debt.id, dec!(50000), &seller).unwrap();
//! assert_eq!(payment.actual_pay, dec!(40000));
//! assert!(payment.debt.is_closed);
//! assert_eq!(ledger.balance(), dec!(140000));
//! ```
//!
//! ## Thread Safety
//!
//! [`Ledger`] is `Sync`; share it behind an `Arc` and call it from any
//! number of threads. Each business event commits as one unit and the
//! balance is only ever changed through an atomic add.

pub mod allocator;
pub mod balance;
mod base;
pub mod config;
pub mod dedup;
pub mod error;
mod ledger;
pub mod money;
pub mod parser;
pub mod records;
pub mod report;
mod sequence;
mod store;

pub use allocator::{DebtPayment, FifoAllocation, SupplierPayment};
pub use base::{DebtId, ExpenseId, OrderNo, Person, PurchaseId, RecordRef, SaleId, SupplierId};
pub use config::{LedgerConfig, ParserConfig};
pub use error::LedgerError;
pub use ledger::{ExpenseReceipt, Ledger, PurchaseReceipt, SaleReceipt};
pub use parser::{ParsedExpense, ParsedSale, Parser, parse_expense_message, parse_sale_message};
pub use records::{
    Debt, DebtKind, DebtLink, DebtStatus, Expense, ExpenseCategory, LineItem, Payment, Purchase,
    Sale, Supplier,
};
pub use report::{DateRange, SalesTotals, Summary};
pub use sequence::OrderSequence;
pub use store::Durability;
