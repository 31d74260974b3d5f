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

//! Record store.
//!
//! One logical store holds every ledger table, next to the add-only
//! [`BalanceCounter`] and the [`OrderSequence`]. Multi-record business
//! events run inside a [`Txn`].
//!
//! # Concurrency
//!
//! A transaction serializes only with transactions touching the same
//! [`Aggregate`]: it locks the debt, supplier, sale or expense it is about to
//! change before reading it, and keeps those locks until it commits. Events
//! on different aggregates run side by side. The tables themselves sit behind
//! a [`RwLock`] that is held for single reads and for applying a commit,
//! never across a whole transaction.
//!
//! Aggregate locks are taken in the order sale, expense, debt, supplier.
//!
//! # Durability
//!
//! - **Atomic**: the transaction stages its writes and a balance delta and
//!   applies both at commit, under one write lock, so readers see all of an
//!   event or none of it. A rejected transaction changes nothing.
//! - **Degraded**: when the store is configured without atomic multi-write
//!   and degraded writes are allowed, every write is applied as soon as it is
//!   issued, under its own lock. Each such write is logged at `warn`.
//!
//! Lock order is aggregates, then tables, then balance.

use crate::balance::BalanceCounter;
use crate::base::{DebtId, ExpenseId, OrderNo, PurchaseId, SaleId, SupplierId};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::records::{Debt, Expense, Purchase, Sale, Supplier};
use crate::sequence::OrderSequence;
use dashmap::DashMap;
use parking_lot::{ArcMutexGuard, Mutex, RawMutex, RwLock};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// How a business event was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// All writes applied as one unit.
    Atomic,
    /// Writes applied one by one; a crash in between could leave a partial event.
    Degraded,
}

impl Durability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Durability::Atomic => "atomic",
            Durability::Degraded => "degraded",
        }
    }
}

/// Unit of mutual exclusion between transactions.
///
/// Purchases and supplier debts belong to their supplier's aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Aggregate {
    Sale(SaleId),
    Expense(ExpenseId),
    Debt(DebtId),
    Supplier(SupplierId),
    /// The set of supplier names, for create-or-get.
    SupplierNames,
}

/// Committed ledger tables.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub sales: BTreeMap<SaleId, Sale>,
    pub expenses: BTreeMap<ExpenseId, Expense>,
    pub debts: BTreeMap<DebtId, Debt>,
    pub suppliers: BTreeMap<SupplierId, Supplier>,
    pub purchases: BTreeMap<PurchaseId, Purchase>,
}

/// A single staged change.
#[derive(Debug)]
pub(crate) enum Write {
    PutSale(Sale),
    DeleteSale(SaleId),
    PutExpense(Expense),
    DeleteExpense(ExpenseId),
    PutDebt(Debt),
    DeleteDebt(DebtId),
    PutSupplier(Supplier),
    PutPurchase(Purchase),
}

impl Write {
    fn label(&self) -> &'static str {
        match self {
            Write::PutSale(_) => "put_sale",
            Write::DeleteSale(_) => "delete_sale",
            Write::PutExpense(_) => "put_expense",
            Write::DeleteExpense(_) => "delete_expense",
            Write::PutDebt(_) => "put_debt",
            Write::DeleteDebt(_) => "delete_debt",
            Write::PutSupplier(_) => "put_supplier",
            Write::PutPurchase(_) => "put_purchase",
        }
    }
}

impl Tables {
    fn apply(&mut self, write: Write) {
        match write {
            Write::PutSale(sale) => {
                self.sales.insert(sale.id, sale);
            }
            Write::DeleteSale(id) => {
                self.sales.remove(&id);
            }
            Write::PutExpense(expense) => {
                self.expenses.insert(expense.id, expense);
            }
            Write::DeleteExpense(id) => {
                self.expenses.remove(&id);
            }
            Write::PutDebt(debt) => {
                self.debts.insert(debt.id, debt);
            }
            Write::DeleteDebt(id) => {
                self.debts.remove(&id);
            }
            Write::PutSupplier(supplier) => {
                self.suppliers.insert(supplier.id, supplier);
            }
            Write::PutPurchase(purchase) => {
                self.purchases.insert(purchase.id, purchase);
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct Store {
    tables: RwLock<Tables>,
    locks: DashMap<Aggregate, Arc<Mutex<()>>>,
    balance: BalanceCounter,
    sequence: OrderSequence,
    ids: AtomicU64,
    transactional: bool,
    allow_degraded_writes: bool,
}

impl Store {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            locks: DashMap::new(),
            balance: BalanceCounter::new(),
            sequence: OrderSequence::new(),
            ids: AtomicU64::new(0),
            transactional: config.transactional,
            allow_degraded_writes: config.allow_degraded_writes,
        }
    }

    /// Runs `f` as one business event.
    ///
    /// On `Err` nothing staged by `f` is applied. In degraded mode writes
    /// issued before the error stay applied, so `f` must validate before
    /// it writes.
    ///
    /// # Errors
    ///
    /// [`LedgerError::DegradedDurability`] if the store cannot commit
    /// atomically and degraded writes are disabled; otherwise whatever `f`
    /// returns.
    pub fn transaction<R>(
        &self,
        f: impl FnOnce(&mut Txn<'_>) -> Result<R, LedgerError>,
    ) -> Result<(R, Durability), LedgerError> {
        let mut txn = self.begin()?;
        let out = f(&mut txn)?;
        Ok((out, txn.commit()))
    }

    fn begin(&self) -> Result<Txn<'_>, LedgerError> {
        let mode = if self.transactional {
            Mode::Atomic { writes: Vec::new() }
        } else if self.allow_degraded_writes {
            Mode::Sequential
        } else {
            return Err(LedgerError::DegradedDurability);
        };
        Ok(Txn {
            store: self,
            mode,
            held: Vec::new(),
            balance_delta: Decimal::ZERO,
        })
    }

    /// Reads committed state.
    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        f(&*self.tables.read())
    }

    pub fn balance(&self) -> Decimal {
        self.balance.value()
    }

    pub fn last_order_seq(&self) -> u64 {
        self.sequence.last()
    }
}

enum Mode {
    Atomic { writes: Vec<Write> },
    Sequential,
}

/// An open business event.
///
/// Reads always see committed state, never this transaction's own staged
/// writes.
pub(crate) struct Txn<'s> {
    store: &'s Store,
    mode: Mode,
    held: Vec<(Aggregate, ArcMutexGuard<RawMutex, ()>)>,
    balance_delta: Decimal,
}

impl Txn<'_> {
    /// Locks `aggregate` until this transaction ends. Locking an aggregate
    /// already held is a no-op.
    pub fn lock(&mut self, aggregate: Aggregate) {
        if self.held.iter().any(|(held, _)| *held == aggregate) {
            return;
        }
        // clone out of the map so no shard lock is held while blocking
        let lock = self.store.locks.entry(aggregate).or_default().clone();
        self.held.push((aggregate, lock.lock_arc()));
    }

    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        self.store.read(f)
    }

    pub fn write(&mut self, write: Write) {
        match &mut self.mode {
            Mode::Atomic { writes, .. } => writes.push(write),
            Mode::Sequential => {
                warn!(
                    write = write.label(),
                    durability = Durability::Degraded.as_str(),
                    "applying write without transaction"
                );
                self.store.tables.write().apply(write);
            }
        }
    }

    /// Adds `delta` to the balance at commit.
    pub fn add_balance(&mut self, delta: Decimal) {
        match self.mode {
            Mode::Atomic { .. } => self.balance_delta += delta,
            Mode::Sequential => {
                warn!(
                    %delta,
                    durability = Durability::Degraded.as_str(),
                    "applying balance change without transaction"
                );
                self.store.balance.add(delta);
            }
        }
    }

    pub fn next_order_no(&self) -> OrderNo {
        self.store.sequence.next()
    }

    /// Allocates a record id. Ids are shared by all tables.
    pub fn next_id(&self) -> u64 {
        self.store.ids.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn commit(self) -> Durability {
        match self.mode {
            Mode::Atomic { writes } => {
                let mut tables = self.store.tables.write();
                for write in writes {
                    tables.apply(write);
                }
                if !self.balance_delta.is_zero() {
                    self.store.balance.add(self.balance_delta);
                }
                Durability::Atomic
            }
            Mode::Sequential => Durability::Degraded,
        }
    }
}
