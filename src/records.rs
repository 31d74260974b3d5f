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

//! Ledger records.
//!
//! Debts and purchases follow the same state machine:
//! - [`Open`] → [`PartiallyPaid`] (repeatable) → [`Closed`]
//!
//! `Closed` is terminal: nothing reopens a closed record and the remaining
//! amount never goes below zero.
//!
//! [`Open`]: DebtStatus::Open
//! [`PartiallyPaid`]: DebtStatus::PartiallyPaid
//! [`Closed`]: DebtStatus::Closed

use crate::base::{DebtId, ExpenseId, OrderNo, Person, PurchaseId, SaleId, SupplierId};
use crate::money::format_amount;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One product or expense entry parsed from a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub qty: u32,
    pub unit_price: Decimal,
    /// Total paid for the whole line (not per unit).
    pub paid_amount: Decimal,
}

impl LineItem {
    /// Creates a fully paid line item.
    pub fn paid_in_full(name: impl Into<String>, qty: u32, unit_price: Decimal) -> Self {
        let paid_amount = Decimal::from(qty) * unit_price;
        Self {
            name: name.into(),
            qty,
            unit_price,
            paid_amount,
        }
    }

    /// Creates a line item with an explicit paid amount.
    pub fn with_paid(
        name: impl Into<String>,
        qty: u32,
        unit_price: Decimal,
        paid_amount: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            qty,
            unit_price,
            paid_amount,
        }
    }

    /// Returns `qty * unit_price`.
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.qty) * self.unit_price
    }
}

/// Renders items as a debt note: `Tort x1 (140 000), Perog x2 (12 000)`.
pub fn items_note(items: &[LineItem]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "{} x{} ({})",
                item.name,
                item.qty,
                format_amount(item.unit_price)
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub order_no: OrderNo,
    pub seller: Person,
    /// Normalized international digits, e.g. `998903456677`.
    pub phone: Option<String>,
    pub items: Vec<LineItem>,
    pub total: Decimal,
    pub paid_total: Decimal,
    pub debt_total: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Expense categories offered to staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    #[default]
    Other,
    Rent,
    Electric,
    Supplier,
    Cashbox,
    Worker,
    Lunch,
    Taxi,
    Master,
    BankTax,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 10] = [
        ExpenseCategory::Other,
        ExpenseCategory::Rent,
        ExpenseCategory::Electric,
        ExpenseCategory::Supplier,
        ExpenseCategory::Cashbox,
        ExpenseCategory::Worker,
        ExpenseCategory::Lunch,
        ExpenseCategory::Taxi,
        ExpenseCategory::Master,
        ExpenseCategory::BankTax,
    ];

    /// Storage key of the category.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Other => "other",
            Self::Rent => "rent",
            Self::Electric => "electric",
            Self::Supplier => "supplier",
            Self::Cashbox => "cashbox",
            Self::Worker => "worker",
            Self::Lunch => "lunch",
            Self::Taxi => "taxi",
            Self::Master => "master",
            Self::BankTax => "bank_tax",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ExpenseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.key() == key)
            .ok_or_else(|| format!("unknown expense category {s:?}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub order_no: OrderNo,
    pub spender: Person,
    pub title: String,
    pub amount: Decimal,
    pub category: ExpenseCategory,
    /// Set when the expense paid a supplier.
    pub supplier: Option<SupplierId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtKind {
    /// A customer owes the shop.
    Customer,
    /// The shop owes a supplier.
    Supplier,
}

/// Record a debt originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtLink {
    Sale(SaleId),
    Purchase(PurchaseId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebtStatus {
    Open,
    PartiallyPaid,
    Closed,
}

impl DebtStatus {
    fn of(total: Decimal, remaining: Decimal) -> Self {
        if remaining <= Decimal::ZERO {
            DebtStatus::Closed
        } else if remaining < total {
            DebtStatus::PartiallyPaid
        } else {
            DebtStatus::Open
        }
    }
}

/// Applies up to `amount` against `remaining`, returning what was applied.
fn settle(remaining: &mut Decimal, amount: Decimal) -> Decimal {
    let applied = amount.min(*remaining).max(Decimal::ZERO);
    *remaining -= applied;
    applied
}

/// Money received against a debt. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub amount: Decimal,
    pub payer: Person,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    pub id: DebtId,
    pub kind: DebtKind,
    pub link: DebtLink,
    pub phone: Option<String>,
    pub note: String,
    /// Seller for customer debts, buyer for supplier debts.
    pub owner: Person,
    pub total_debt: Decimal,
    pub remaining_debt: Decimal,
    pub payments: Vec<Payment>,
    pub is_closed: bool,
    pub created_at: DateTime<Utc>,
}

impl Debt {
    pub fn status(&self) -> DebtStatus {
        DebtStatus::of(self.total_debt, self.remaining_debt)
    }

    /// Applies a payment, closing the debt when nothing remains.
    ///
    /// Returns the amount actually applied, which never exceeds the
    /// remaining debt. Nothing is recorded if that amount is zero.
    pub(crate) fn apply_payment(
        &mut self,
        amount: Decimal,
        payer: &Person,
        at: DateTime<Utc>,
    ) -> Decimal {
        if self.is_closed {
            return Decimal::ZERO;
        }
        let applied = settle(&mut self.remaining_debt, amount);
        if applied > Decimal::ZERO {
            self.payments.push(Payment {
                amount: applied,
                payer: payer.clone(),
                paid_at: at,
            });
        }
        if self.remaining_debt.is_zero() {
            self.is_closed = true;
        }
        self.assert_invariants();
        applied
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.remaining_debt >= Decimal::ZERO && self.remaining_debt <= self.total_debt,
            "Invariant violated: remaining debt {} outside 0..={}",
            self.remaining_debt,
            self.total_debt
        );
        debug_assert_eq!(
            self.is_closed,
            self.remaining_debt.is_zero(),
            "Invariant violated: closed flag disagrees with remaining debt"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    /// Unique, whitespace-normalized.
    pub name: String,
    pub phone: Option<String>,
    /// Sum of `remaining` over the supplier's open purchases.
    pub debt: Decimal,
    pub created_at: DateTime<Utc>,
}

/// One delivery from a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub order_no: OrderNo,
    pub supplier: SupplierId,
    pub total_cost: Decimal,
    pub paid: Decimal,
    pub remaining: Decimal,
    pub is_closed: bool,
    pub description: String,
    pub created_by: Person,
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    pub fn status(&self) -> DebtStatus {
        DebtStatus::of(self.total_cost, self.remaining)
    }

    /// Pays down the purchase, returning the amount applied.
    pub(crate) fn apply_payment(&mut self, amount: Decimal) -> Decimal {
        if self.is_closed {
            return Decimal::ZERO;
        }
        let applied = settle(&mut self.remaining, amount);
        self.paid += applied;
        if self.remaining.is_zero() {
            self.is_closed = true;
        }
        applied
    }
}
