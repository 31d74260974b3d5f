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

//! Ledger transaction coordinator.
//!
//! The [`Ledger`] records sales, expenses and supplier purchases. Each
//! business event runs as one store transaction: the record, its balance
//! change and any debt it opens are committed together or not at all.
//!
//! # Events
//!
//! | Operation | Balance | Records |
//! |-----------|---------|---------|
//! | [`record_sale`](Ledger::record_sale) | `+ paid_total` | sale, customer debt if unpaid |
//! | [`record_expense`](Ledger::record_expense) | `- amount` | expense |
//! | [`record_purchase`](Ledger::record_purchase) | `- paid` | purchase, expense if paid, supplier debt if unpaid |
//! | [`delete_sale`](Ledger::delete_sale) | `- paid_total` | removes sale and its debt |
//! | [`delete_expense`](Ledger::delete_expense) | `+ amount` | removes expense, restores supplier debt |
//!
//! Payments against debts live in [`allocator`](crate::allocator), read-only
//! aggregates in [`report`](crate::report).

use crate::base::{DebtId, ExpenseId, OrderNo, Person, PurchaseId, RecordRef, SaleId, SupplierId};
use crate::config::LedgerConfig;
use crate::dedup::RequestLog;
use crate::error::LedgerError;
use crate::parser::{ParsedExpense, ParsedSale, Parser};
use crate::records::{
    Debt, DebtKind, DebtLink, Expense, ExpenseCategory, LineItem, Purchase, Sale, Supplier,
    items_note,
};
use crate::store::{Aggregate, Durability, Store, Tables, Txn, Write};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

/// Outcome of [`Ledger::record_sale`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleReceipt {
    pub sale: Sale,
    /// Customer debt opened for the unpaid part, if any.
    pub debt: Option<Debt>,
    pub durability: Durability,
}

/// Outcome of [`Ledger::record_expense`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseReceipt {
    pub expense: Expense,
    pub durability: Durability,
}

/// Outcome of [`Ledger::record_purchase`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseReceipt {
    pub purchase: Purchase,
    /// Cash paid on delivery.
    pub expense: Option<Expense>,
    /// Supplier debt opened for the unpaid part.
    pub debt: Option<Debt>,
    pub durability: Durability,
}

/// Sale amounts derived from its line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SaleTotals {
    total: Decimal,
    paid_total: Decimal,
    debt_total: Decimal,
}

impl SaleTotals {
    /// Validates `items`, capping each line's paid amount at its total.
    fn settle(items: &mut [LineItem]) -> Result<Self, LedgerError> {
        if items.is_empty() {
            return Err(LedgerError::ParseEmpty);
        }
        let mut total = Decimal::ZERO;
        let mut paid_total = Decimal::ZERO;
        for item in items.iter_mut() {
            if item.qty == 0 {
                return Err(LedgerError::InvalidQuantity);
            }
            if item.unit_price.is_sign_negative() || item.paid_amount.is_sign_negative() {
                return Err(LedgerError::InvalidAmount);
            }
            let line_total = Decimal::from(item.qty)
                .checked_mul(item.unit_price)
                .ok_or(LedgerError::InvalidAmount)?;
            item.paid_amount = item.paid_amount.min(line_total);
            total = total
                .checked_add(line_total)
                .ok_or(LedgerError::InvalidAmount)?;
            paid_total += item.paid_amount;
        }
        Ok(SaleTotals {
            total,
            paid_total,
            debt_total: total - paid_total,
        })
    }
}

/// The ledger: record store, parser and idempotency log.
///
/// # Invariants
///
/// - The balance changes only through committed events.
/// - `sale.debt_total == sale.total - sale.paid_total`; a customer debt
///   exists for a sale iff `debt_total > 0`.
/// - A supplier's `debt` equals the sum of `remaining` over its open purchases.
/// - A rejected operation leaves every aggregate unchanged.
#[derive(Debug)]
pub struct Ledger {
    pub(crate) store: Store,
    parser: Parser,
    requests: RequestLog,
}

impl Ledger {
    /// Creates an empty ledger with default settings.
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        Ledger {
            store: Store::new(&config),
            parser: Parser::new(config.parser),
            requests: RequestLog::new(config.dedup_capacity),
        }
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    /// Parses a sale message with this ledger's parser settings.
    pub fn parse_sale_message(&self, text: &str) -> ParsedSale {
        self.parser.parse_sale(text)
    }

    /// Parses an expense message with this ledger's parser settings.
    pub fn parse_expense_message(&self, text: &str) -> Option<ParsedExpense> {
        self.parser.parse_expense(text)
    }

    /// Records a sale.
    ///
    /// Creates the sale under a new order number, adds `paid_total` to the
    /// balance and, if anything is unpaid, opens a customer debt for it.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ParseEmpty`] - `items` is empty.
    /// - [`LedgerError::InvalidQuantity`] - an item has `qty == 0`.
    /// - [`LedgerError::InvalidAmount`] - an item has a negative price or paid amount.
    /// - [`LedgerError::DegradedDurability`] - no atomic commit available.
    pub fn record_sale(
        &self,
        seller: &Person,
        mut items: Vec<LineItem>,
        phone: Option<String>,
    ) -> Result<SaleReceipt, LedgerError> {
        let totals = SaleTotals::settle(&mut items)
            .inspect_err(|e| debug!(seller = %seller.name, error = %e, "sale rejected"))?;
        let now = Utc::now();

        let ((sale, debt), durability) = self
            .store
            .transaction(|txn| {
                let sale = Sale {
                    id: SaleId(txn.next_id()),
                    order_no: txn.next_order_no(),
                    seller: seller.clone(),
                    phone,
                    items,
                    total: totals.total,
                    paid_total: totals.paid_total,
                    debt_total: totals.debt_total,
                    created_at: now,
                };
                let debt = (totals.debt_total > Decimal::ZERO).then(|| Debt {
                    id: DebtId(txn.next_id()),
                    kind: DebtKind::Customer,
                    link: DebtLink::Sale(sale.id),
                    phone: sale.phone.clone(),
                    note: items_note(&sale.items),
                    owner: seller.clone(),
                    total_debt: totals.debt_total,
                    remaining_debt: totals.debt_total,
                    payments: Vec::new(),
                    is_closed: false,
                    created_at: now,
                });

                txn.write(Write::PutSale(sale.clone()));
                txn.add_balance(totals.paid_total);
                if let Some(debt) = &debt {
                    txn.write(Write::PutDebt(debt.clone()));
                }
                Ok((sale, debt))
            })
            .inspect_err(|e| debug!(error = %e, "sale rejected"))?;

        info!(
            order_no = %sale.order_no,
            total = %sale.total,
            paid = %sale.paid_total,
            debt = %sale.debt_total,
            durability = durability.as_str(),
            "sale recorded"
        );
        Ok(SaleReceipt {
            sale,
            debt,
            durability,
        })
    }

    /// Records a sale at most once per request `key`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::DuplicateRequest`] if `key` was already used, plus
    /// everything [`record_sale`](Self::record_sale) returns.
    pub fn record_sale_once(
        &self,
        key: &str,
        seller: &Person,
        items: Vec<LineItem>,
        phone: Option<String>,
    ) -> Result<SaleReceipt, LedgerError> {
        self.once(key, |receipt: &SaleReceipt| receipt.sale.order_no.clone(), || {
            self.record_sale(seller, items, phone)
        })
    }

    /// Records an uncategorized expense.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - `amount` is not positive.
    /// - [`LedgerError::DegradedDurability`] - no atomic commit available.
    pub fn record_expense(
        &self,
        spender: &Person,
        title: &str,
        amount: Decimal,
    ) -> Result<ExpenseReceipt, LedgerError> {
        self.record_categorized_expense(spender, title, amount, ExpenseCategory::Other)
    }

    /// Records an expense under `category`, taking `amount` out of the balance.
    pub fn record_categorized_expense(
        &self,
        spender: &Person,
        title: &str,
        amount: Decimal,
        category: ExpenseCategory,
    ) -> Result<ExpenseReceipt, LedgerError> {
        if amount <= Decimal::ZERO {
            debug!(%amount, "expense rejected: non-positive amount");
            return Err(LedgerError::InvalidAmount);
        }
        let title = match title.trim() {
            "" => self.parser.config().expense_title.clone(),
            trimmed => trimmed.to_string(),
        };
        let now = Utc::now();

        let (expense, durability) = self.store.transaction(|txn| {
            let expense = Expense {
                id: ExpenseId(txn.next_id()),
                order_no: txn.next_order_no(),
                spender: spender.clone(),
                title,
                amount,
                category,
                supplier: None,
                created_at: now,
            };
            txn.write(Write::PutExpense(expense.clone()));
            txn.add_balance(-amount);
            Ok(expense)
        })?;

        info!(
            order_no = %expense.order_no,
            %amount,
            %category,
            durability = durability.as_str(),
            "expense recorded"
        );
        Ok(ExpenseReceipt {
            expense,
            durability,
        })
    }

    /// Records an expense at most once per request `key`.
    pub fn record_expense_once(
        &self,
        key: &str,
        spender: &Person,
        title: &str,
        amount: Decimal,
        category: ExpenseCategory,
    ) -> Result<ExpenseReceipt, LedgerError> {
        self.once(key, |receipt: &ExpenseReceipt| receipt.expense.order_no.clone(), || {
            self.record_categorized_expense(spender, title, amount, category)
        })
    }

    fn once<T>(
        &self,
        key: &str,
        order_no: impl FnOnce(&T) -> OrderNo,
        f: impl FnOnce() -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        self.requests
            .reserve(key)
            .inspect_err(|_| debug!(key, "duplicate request rejected"))?;
        match f() {
            Ok(receipt) => {
                self.requests.complete(key, order_no(&receipt));
                Ok(receipt)
            }
            Err(e) => {
                self.requests.release(key);
                Err(e)
            }
        }
    }

    /// Deletes a sale together with its unpaid debt, taking the paid amount
    /// back out of the balance.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] - no such sale.
    /// - [`LedgerError::IrreversibleDeletion`] - its debt already has payments.
    pub fn delete_sale(&self, id: SaleId) -> Result<Durability, LedgerError> {
        let (sale, durability) = self
            .store
            .transaction(|txn| {
                txn.lock(Aggregate::Sale(id));
                let debt_id = txn.read(|t| sale_debt(t, id).map(|d| d.id));
                if let Some(debt_id) = debt_id {
                    txn.lock(Aggregate::Debt(debt_id));
                }
                let (sale, debt) =
                    txn.read(|t| (t.sales.get(&id).cloned(), sale_debt(t, id).cloned()));
                let sale = sale.ok_or(LedgerError::NotFound(RecordRef::Sale(id)))?;
                if debt.as_ref().is_some_and(|d| !d.payments.is_empty()) {
                    return Err(LedgerError::IrreversibleDeletion(id));
                }

                txn.add_balance(-sale.paid_total);
                if let Some(debt) = debt {
                    txn.write(Write::DeleteDebt(debt.id));
                }
                txn.write(Write::DeleteSale(id));
                Ok(sale)
            })
            .inspect_err(|e| debug!(sale = %id, error = %e, "sale deletion rejected"))?;

        info!(
            order_no = %sale.order_no,
            paid = %sale.paid_total,
            durability = durability.as_str(),
            "sale deleted"
        );
        Ok(durability)
    }

    /// Deletes an expense, returning its amount to the balance.
    ///
    /// If the expense paid a supplier, the amount is owed again: it is added
    /// back to the supplier's debt as a new open adjustment purchase.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] if there is no such expense.
    pub fn delete_expense(&self, id: ExpenseId) -> Result<Durability, LedgerError> {
        let now = Utc::now();
        let (expense, durability) = self
            .store
            .transaction(|txn| {
                txn.lock(Aggregate::Expense(id));
                let supplier_id = txn.read(|t| t.expenses.get(&id).and_then(|e| e.supplier));
                if let Some(supplier_id) = supplier_id {
                    txn.lock(Aggregate::Supplier(supplier_id));
                }
                let (expense, supplier) = txn.read(|t| {
                    let expense = t.expenses.get(&id).cloned();
                    let supplier = expense
                        .as_ref()
                        .and_then(|e| e.supplier)
                        .and_then(|s| t.suppliers.get(&s).cloned());
                    (expense, supplier)
                });
                let expense = expense.ok_or(LedgerError::NotFound(RecordRef::Expense(id)))?;

                txn.add_balance(expense.amount);
                if let Some(mut supplier) = supplier {
                    let purchase = Purchase {
                        id: PurchaseId(txn.next_id()),
                        order_no: txn.next_order_no(),
                        supplier: supplier.id,
                        total_cost: expense.amount,
                        paid: Decimal::ZERO,
                        remaining: expense.amount,
                        is_closed: false,
                        description: format!("Restored from deleted expense {}", expense.order_no),
                        created_by: expense.spender.clone(),
                        created_at: now,
                    };
                    let debt = supplier_debt(txn, &purchase, &supplier, now);
                    supplier.debt += purchase.remaining;
                    txn.write(Write::PutPurchase(purchase));
                    txn.write(Write::PutDebt(debt));
                    txn.write(Write::PutSupplier(supplier));
                }
                txn.write(Write::DeleteExpense(id));
                Ok(expense)
            })
            .inspect_err(|e| debug!(expense = %id, error = %e, "expense deletion rejected"))?;

        info!(
            order_no = %expense.order_no,
            amount = %expense.amount,
            supplier_restored = expense.supplier.is_some(),
            durability = durability.as_str(),
            "expense deleted"
        );
        Ok(durability)
    }

    /// Returns the supplier named `name`, creating it if needed.
    ///
    /// Names are compared case-insensitively after collapsing whitespace.
    ///
    /// # Errors
    ///
    /// [`LedgerError::EmptyName`] if `name` is blank.
    pub fn add_supplier(&self, name: &str, phone: Option<String>) -> Result<Supplier, LedgerError> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(LedgerError::EmptyName);
        }
        let now = Utc::now();

        let ((supplier, created), _) = self.store.transaction(|txn| {
            txn.lock(Aggregate::SupplierNames);
            if let Some(existing) = txn.read(|t| find_supplier(t.suppliers.values(), &name)) {
                return Ok((existing, false));
            }
            let supplier = Supplier {
                id: SupplierId(txn.next_id()),
                name,
                phone,
                debt: Decimal::ZERO,
                created_at: now,
            };
            txn.write(Write::PutSupplier(supplier.clone()));
            Ok((supplier, true))
        })?;

        if created {
            info!(supplier = %supplier.name, "supplier added");
        }
        Ok(supplier)
    }

    /// Records a delivery from a supplier.
    ///
    /// `paid` is capped at `total_cost`. The paid part is recorded as a
    /// supplier expense under the purchase's order number; the rest becomes
    /// supplier debt.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - `total_cost` not positive or `paid` negative.
    /// - [`LedgerError::NotFound`] - no such supplier.
    pub fn record_purchase(
        &self,
        supplier_id: SupplierId,
        total_cost: Decimal,
        paid: Decimal,
        description: &str,
        created_by: &Person,
    ) -> Result<PurchaseReceipt, LedgerError> {
        if total_cost <= Decimal::ZERO || paid.is_sign_negative() {
            debug!(%total_cost, %paid, "purchase rejected: invalid amount");
            return Err(LedgerError::InvalidAmount);
        }
        let paid = paid.min(total_cost);
        let now = Utc::now();

        let ((purchase, expense, debt), durability) = self
            .store
            .transaction(|txn| {
                txn.lock(Aggregate::Supplier(supplier_id));
                let mut supplier = txn
                    .read(|t| t.suppliers.get(&supplier_id).cloned())
                    .ok_or(LedgerError::NotFound(RecordRef::Supplier(supplier_id)))?;

                let remaining = total_cost - paid;
                let purchase = Purchase {
                    id: PurchaseId(txn.next_id()),
                    order_no: txn.next_order_no(),
                    supplier: supplier_id,
                    total_cost,
                    paid,
                    remaining,
                    is_closed: remaining.is_zero(),
                    description: description.trim().to_string(),
                    created_by: created_by.clone(),
                    created_at: now,
                };

                let expense = (paid > Decimal::ZERO).then(|| Expense {
                    id: ExpenseId(txn.next_id()),
                    order_no: purchase.order_no.clone(),
                    spender: created_by.clone(),
                    title: format!("Purchase: {}", supplier.name),
                    amount: paid,
                    category: ExpenseCategory::Supplier,
                    supplier: Some(supplier_id),
                    created_at: now,
                });
                let debt = (remaining > Decimal::ZERO)
                    .then(|| supplier_debt(txn, &purchase, &supplier, now));

                txn.write(Write::PutPurchase(purchase.clone()));
                if let Some(expense) = &expense {
                    txn.write(Write::PutExpense(expense.clone()));
                    txn.add_balance(-paid);
                }
                if let Some(debt) = &debt {
                    supplier.debt += remaining;
                    txn.write(Write::PutDebt(debt.clone()));
                    txn.write(Write::PutSupplier(supplier));
                }
                Ok((purchase, expense, debt))
            })
            .inspect_err(|e| debug!(supplier = %supplier_id, error = %e, "purchase rejected"))?;

        info!(
            order_no = %purchase.order_no,
            supplier = %supplier_id,
            total = %purchase.total_cost,
            paid = %purchase.paid,
            remaining = %purchase.remaining,
            durability = durability.as_str(),
            "purchase recorded"
        );
        Ok(PurchaseReceipt {
            purchase,
            expense,
            debt,
            durability,
        })
    }

    pub fn sale(&self, id: SaleId) -> Option<Sale> {
        self.store.read(|t| t.sales.get(&id).cloned())
    }

    pub fn sale_by_order(&self, order_no: &OrderNo) -> Option<Sale> {
        self.store
            .read(|t| t.sales.values().find(|s| &s.order_no == order_no).cloned())
    }

    pub fn expense(&self, id: ExpenseId) -> Option<Expense> {
        self.store.read(|t| t.expenses.get(&id).cloned())
    }

    pub fn debt(&self, id: DebtId) -> Option<Debt> {
        self.store.read(|t| t.debts.get(&id).cloned())
    }

    /// Customer debt opened by a sale.
    pub fn debt_for_sale(&self, id: SaleId) -> Option<Debt> {
        self.store.read(|t| sale_debt(t, id).cloned())
    }

    pub fn supplier(&self, id: SupplierId) -> Option<Supplier> {
        self.store.read(|t| t.suppliers.get(&id).cloned())
    }

    pub fn supplier_by_name(&self, name: &str) -> Option<Supplier> {
        let name = normalize_name(name);
        self.store
            .read(|t| find_supplier(t.suppliers.values(), &name))
    }

    /// A supplier's purchases, oldest first.
    pub fn purchases_for(&self, supplier: SupplierId) -> Vec<Purchase> {
        let mut purchases: Vec<Purchase> = self.store.read(|t| {
            t.purchases
                .values()
                .filter(|p| p.supplier == supplier)
                .cloned()
                .collect()
        });
        purchases.sort_by_key(|p| (p.created_at, p.id));
        purchases
    }

    /// Open debts of one kind, oldest first.
    pub fn open_debts(&self, kind: DebtKind) -> Vec<Debt> {
        let mut debts: Vec<Debt> = self.store.read(|t| {
            t.debts
                .values()
                .filter(|d| d.kind == kind && !d.is_closed)
                .cloned()
                .collect()
        });
        debts.sort_by_key(|d| (d.created_at, d.id));
        debts
    }

    /// Cash on hand.
    pub fn balance(&self) -> Decimal {
        self.store.balance()
    }

    /// Order number a request key was committed under, while the key is
    /// still remembered.
    pub fn request_order_no(&self, key: &str) -> Option<OrderNo> {
        self.requests.order_no(key)
    }

    /// Last order number issued, if any.
    pub fn last_order_no(&self) -> Option<OrderNo> {
        match self.store.last_order_seq() {
            0 => None,
            last => Some(OrderNo::from_seq(last)),
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

/// Supplier debt mirroring an unpaid purchase.
pub(crate) fn supplier_debt(
    txn: &Txn<'_>,
    purchase: &Purchase,
    supplier: &Supplier,
    at: DateTime<Utc>,
) -> Debt {
    let note = if purchase.description.is_empty() {
        supplier.name.clone()
    } else {
        format!("{}: {}", supplier.name, purchase.description)
    };
    Debt {
        id: DebtId(txn.next_id()),
        kind: DebtKind::Supplier,
        link: DebtLink::Purchase(purchase.id),
        phone: supplier.phone.clone(),
        note,
        owner: purchase.created_by.clone(),
        total_debt: purchase.remaining,
        remaining_debt: purchase.remaining,
        payments: Vec::new(),
        is_closed: false,
        created_at: at,
    }
}

fn sale_debt(tables: &Tables, id: SaleId) -> Option<&Debt> {
    tables.debts.values().find(|d| d.link == DebtLink::Sale(id))
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn find_supplier<'a>(
    mut suppliers: impl Iterator<Item = &'a Supplier>,
    name: &str,
) -> Option<Supplier> {
    suppliers
        .find(|s| s.name.to_lowercase() == name.to_lowercase())
        .cloned()
}
