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

//! Read-only aggregates for reporting.
//!
//! Totals over a [`DateRange`], optionally filtered by expense category.
//! Nothing here formats documents; the daily "close cash" figures are
//! returned as a plain [`Summary`].

use crate::ledger::Ledger;
use crate::records::{DebtKind, ExpenseCategory};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Half-open time range `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Everything ever recorded.
    pub fn all() -> Self {
        Self::new(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)
    }

    /// One calendar day (UTC).
    pub fn day(date: NaiveDate) -> Self {
        let to = date
            .succ_opt()
            .map_or(DateTime::<Utc>::MAX_UTC, start_of);
        Self::new(start_of(date), to)
    }

    /// One calendar month (UTC); `None` for an invalid month.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self::new(start_of(first), start_of(next)))
    }

    pub fn today() -> Self {
        Self::day(Utc::now().date_naive())
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at < self.to
    }
}

fn start_of(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Sales aggregated over a range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SalesTotals {
    pub count: usize,
    pub total: Decimal,
    pub paid: Decimal,
    pub debt: Decimal,
}

/// Cash figures for a range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub sales_count: usize,
    pub sales_total: Decimal,
    pub sales_paid: Decimal,
    pub sales_debt: Decimal,
    pub expense_total: Decimal,
    pub purchase_total: Decimal,
    /// Open customer debt right now, regardless of range.
    pub open_customer_debt: Decimal,
    /// Owed to suppliers right now, regardless of range.
    pub supplier_debt: Decimal,
    pub balance: Decimal,
}

impl Ledger {
    pub fn sales_totals(&self, range: &DateRange) -> SalesTotals {
        self.store.read(|t| {
            t.sales
                .values()
                .filter(|s| range.contains(s.created_at))
                .fold(SalesTotals::default(), |acc, s| SalesTotals {
                    count: acc.count + 1,
                    total: acc.total + s.total,
                    paid: acc.paid + s.paid_total,
                    debt: acc.debt + s.debt_total,
                })
        })
    }

    /// Expenses in `range`; `categories` of `None` means all of them.
    pub fn expense_total(
        &self,
        range: &DateRange,
        categories: Option<&[ExpenseCategory]>,
    ) -> Decimal {
        self.store.read(|t| {
            t.expenses
                .values()
                .filter(|e| range.contains(e.created_at))
                .filter(|e| categories.is_none_or(|c| c.contains(&e.category)))
                .map(|e| e.amount)
                .sum()
        })
    }

    /// Total cost of supplier deliveries in `range`.
    pub fn purchase_total(&self, range: &DateRange) -> Decimal {
        self.store.read(|t| {
            t.purchases
                .values()
                .filter(|p| range.contains(p.created_at))
                .map(|p| p.total_cost)
                .sum()
        })
    }

    /// What customers still owe.
    pub fn open_customer_debt(&self) -> Decimal {
        self.store.read(|t| {
            t.debts
                .values()
                .filter(|d| d.kind == DebtKind::Customer && !d.is_closed)
                .map(|d| d.remaining_debt)
                .sum()
        })
    }

    /// What the shop owes its suppliers.
    pub fn supplier_debt_total(&self) -> Decimal {
        self.store
            .read(|t| t.suppliers.values().map(|s| s.debt).sum())
    }

    pub fn summary(&self, range: &DateRange, categories: Option<&[ExpenseCategory]>) -> Summary {
        let sales = self.sales_totals(range);
        Summary {
            from: range.from,
            to: range.to,
            sales_count: sales.count,
            sales_total: sales.total,
            sales_paid: sales.paid,
            sales_debt: sales.debt,
            expense_total: self.expense_total(range, categories),
            purchase_total: self.purchase_total(range),
            open_customer_debt: self.open_customer_debt(),
            supplier_debt: self.supplier_debt_total(),
            balance: self.balance(),
        }
    }
}
