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

//! Debt payment allocation.
//!
//! Customer debts are paid one at a time with [`Ledger::pay_debt`]. Supplier
//! debt is paid per supplier, oldest purchase first
//! ([`Ledger::pay_purchase_fifo`], [`Ledger::pay_supplier`]).

use crate::base::{DebtId, ExpenseId, Person, PurchaseId, RecordRef, SupplierId};
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::records::{Debt, DebtKind, DebtLink, Expense, ExpenseCategory, Purchase};
use crate::store::{Aggregate, Durability, Txn, Write};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Outcome of [`Ledger::pay_debt`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebtPayment {
    pub debt: Debt,
    /// Amount applied, never more than the remaining debt.
    pub actual_pay: Decimal,
    pub durability: Durability,
}

/// Outcome of [`Ledger::pay_purchase_fifo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FifoAllocation {
    pub used_amount: Decimal,
    /// Part of the payment exceeding everything owed.
    pub leftover_amount: Decimal,
    /// Supplier debt after the payment.
    pub new_remaining_debt: Decimal,
    pub durability: Durability,
}

/// Outcome of [`Ledger::pay_supplier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplierPayment {
    /// Cash paid out, for the used amount only.
    pub expense: Expense,
    pub allocation: FifoAllocation,
}

/// FIFO result before commit.
struct Allocated {
    used: Decimal,
    leftover: Decimal,
    remaining: Decimal,
}

/// Pays `amount` into the supplier's open purchases, oldest first, keeping
/// linked supplier debts and the supplier's aggregate debt in step.
fn allocate(
    txn: &mut Txn<'_>,
    supplier_id: SupplierId,
    amount: Decimal,
    payer: &Person,
    at: DateTime<Utc>,
) -> Result<Allocated, LedgerError> {
    txn.lock(Aggregate::Supplier(supplier_id));
    let (supplier, mut open, mut debts) = txn.read(|t| {
        let open: Vec<Purchase> = t
            .purchases
            .values()
            .filter(|p| p.supplier == supplier_id && !p.is_closed)
            .cloned()
            .collect();
        let debts: BTreeMap<PurchaseId, Debt> = t
            .debts
            .values()
            .filter(|d| !d.is_closed)
            .filter_map(|d| match d.link {
                DebtLink::Purchase(id) => Some((id, d.clone())),
                DebtLink::Sale(_) => None,
            })
            .collect();
        (t.suppliers.get(&supplier_id).cloned(), open, debts)
    });
    let mut supplier =
        supplier.ok_or(LedgerError::NotFound(RecordRef::Supplier(supplier_id)))?;
    open.sort_by_key(|p| (p.created_at, p.id));

    let mut left = amount;
    for purchase in open.iter_mut() {
        if left <= Decimal::ZERO {
            break;
        }
        let applied = purchase.apply_payment(left);
        left -= applied;
        if let Some(mut debt) = debts.remove(&purchase.id) {
            debt.apply_payment(applied, payer, at);
            txn.write(Write::PutDebt(debt));
        }
        txn.write(Write::PutPurchase(purchase.clone()));
    }

    supplier.debt = open
        .iter()
        .filter(|p| !p.is_closed)
        .map(|p| p.remaining)
        .sum();
    let remaining = supplier.debt;
    txn.write(Write::PutSupplier(supplier));

    Ok(Allocated {
        used: amount - left,
        leftover: left,
        remaining,
    })
}

/// Sum of `remaining` over the supplier's open purchases.
fn outstanding(txn: &Txn<'_>, supplier_id: SupplierId) -> Decimal {
    txn.read(|t| {
        t.purchases
            .values()
            .filter(|p| p.supplier == supplier_id && !p.is_closed)
            .map(|p| p.remaining)
            .sum()
    })
}

impl Ledger {
    /// Applies a customer's payment to their debt.
    ///
    /// The balance grows by the amount actually applied, which is capped at
    /// the remaining debt; any excess is not recorded.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - `amount` is not positive.
    /// - [`LedgerError::NotFound`] - no such debt.
    /// - [`LedgerError::SupplierDebt`] - the debt is owed to a supplier.
    /// - [`LedgerError::AlreadyClosed`] - the debt is fully paid.
    pub fn pay_debt(
        &self,
        debt_id: DebtId,
        amount: Decimal,
        payer: &Person,
    ) -> Result<DebtPayment, LedgerError> {
        if amount <= Decimal::ZERO {
            debug!(debt = %debt_id, %amount, "payment rejected: non-positive amount");
            return Err(LedgerError::InvalidAmount);
        }
        let now = Utc::now();

        let ((debt, actual_pay), durability) = self
            .store
            .transaction(|txn| {
                txn.lock(Aggregate::Debt(debt_id));
                let mut debt = txn
                    .read(|t| t.debts.get(&debt_id).cloned())
                    .ok_or(LedgerError::NotFound(RecordRef::Debt(debt_id)))?;
                if debt.kind == DebtKind::Supplier {
                    return Err(LedgerError::SupplierDebt(debt_id));
                }
                if debt.is_closed {
                    return Err(LedgerError::AlreadyClosed(debt_id));
                }

                let actual_pay = debt.apply_payment(amount, payer, now);
                txn.write(Write::PutDebt(debt.clone()));
                txn.add_balance(actual_pay);
                Ok((debt, actual_pay))
            })
            .inspect_err(|e| debug!(debt = %debt_id, error = %e, "payment rejected"))?;

        info!(
            debt = %debt_id,
            %actual_pay,
            remaining = %debt.remaining_debt,
            closed = debt.is_closed,
            durability = durability.as_str(),
            "debt payment recorded"
        );
        Ok(DebtPayment {
            debt,
            actual_pay,
            durability,
        })
    }

    /// Allocates a payment across a supplier's open purchases, oldest first.
    ///
    /// Closes every purchase (and its supplier debt) that is paid off and
    /// recomputes the supplier's debt. The balance is not touched; use
    /// [`pay_supplier`](Self::pay_supplier) to also record the cash leaving.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - `amount` is not positive.
    /// - [`LedgerError::NotFound`] - no such supplier.
    pub fn pay_purchase_fifo(
        &self,
        supplier_id: SupplierId,
        amount: Decimal,
        payer: &Person,
    ) -> Result<FifoAllocation, LedgerError> {
        if amount <= Decimal::ZERO {
            debug!(supplier = %supplier_id, %amount, "allocation rejected: non-positive amount");
            return Err(LedgerError::InvalidAmount);
        }
        let now = Utc::now();

        let (allocated, durability) = self
            .store
            .transaction(|txn| allocate(txn, supplier_id, amount, payer, now))
            .inspect_err(|e| debug!(supplier = %supplier_id, error = %e, "allocation rejected"))?;

        info!(
            supplier = %supplier_id,
            used = %allocated.used,
            leftover = %allocated.leftover,
            remaining = %allocated.remaining,
            durability = durability.as_str(),
            "supplier payment allocated"
        );
        Ok(FifoAllocation {
            used_amount: allocated.used,
            leftover_amount: allocated.leftover,
            new_remaining_debt: allocated.remaining,
            durability,
        })
    }

    /// Pays a supplier in cash: allocates the payment FIFO, records a
    /// supplier expense for the part actually used and takes it out of the
    /// balance.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - `amount` is not positive.
    /// - [`LedgerError::NotFound`] - no such supplier.
    /// - [`LedgerError::NothingOutstanding`] - the supplier is owed nothing.
    pub fn pay_supplier(
        &self,
        supplier_id: SupplierId,
        amount: Decimal,
        spender: &Person,
    ) -> Result<SupplierPayment, LedgerError> {
        if amount <= Decimal::ZERO {
            debug!(supplier = %supplier_id, %amount, "supplier payment rejected: non-positive amount");
            return Err(LedgerError::InvalidAmount);
        }
        let now = Utc::now();

        let ((expense, allocated), durability) = self
            .store
            .transaction(|txn| {
                txn.lock(Aggregate::Supplier(supplier_id));
                let name = txn
                    .read(|t| t.suppliers.get(&supplier_id).map(|s| s.name.clone()))
                    .ok_or(LedgerError::NotFound(RecordRef::Supplier(supplier_id)))?;
                if outstanding(txn, supplier_id).is_zero() {
                    return Err(LedgerError::NothingOutstanding(supplier_id));
                }

                let allocated = allocate(txn, supplier_id, amount, spender, now)?;
                let expense = Expense {
                    id: ExpenseId(txn.next_id()),
                    order_no: txn.next_order_no(),
                    spender: spender.clone(),
                    title: format!("Supplier payment: {name}"),
                    amount: allocated.used,
                    category: ExpenseCategory::Supplier,
                    supplier: Some(supplier_id),
                    created_at: now,
                };
                txn.write(Write::PutExpense(expense.clone()));
                txn.add_balance(-allocated.used);
                Ok((expense, allocated))
            })
            .inspect_err(|e| {
                debug!(supplier = %supplier_id, error = %e, "supplier payment rejected")
            })?;

        info!(
            order_no = %expense.order_no,
            supplier = %supplier_id,
            used = %allocated.used,
            leftover = %allocated.leftover,
            remaining = %allocated.remaining,
            durability = durability.as_str(),
            "supplier paid"
        );
        Ok(SupplierPayment {
            expense,
            allocation: FifoAllocation {
                used_amount: allocated.used,
                leftover_amount: allocated.leftover,
                new_remaining_debt: allocated.remaining,
                durability,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::LineItem;
    use rust_decimal_macros::dec;

    fn staff() -> Person {
        Person::new(1, "Ali")
    }

    #[test]
    fn supplier_debts_cannot_be_paid_directly() {
        let ledger = Ledger::new();
        let supplier = ledger.add_supplier("Coca Cola", None).unwrap();
        let receipt = ledger
            .record_purchase(supplier.id, dec!(5000), dec!(0), "", &staff())
            .unwrap();
        let debt = receipt.debt.unwrap();

        assert_eq!(
            ledger.pay_debt(debt.id, dec!(1000), &staff()),
            Err(LedgerError::SupplierDebt(debt.id))
        );
    }

    #[test]
    fn closed_debt_rejects_payment() {
        let ledger = Ledger::new();
        let receipt = ledger
            .record_sale(
                &staff(),
                vec![LineItem::with_paid("Tort", 1, dec!(140000), dec!(100000))],
                None,
            )
            .unwrap();
        let debt = receipt.debt.unwrap();
        ledger.pay_debt(debt.id, dec!(40000), &staff()).unwrap();

        assert_eq!(
            ledger.pay_debt(debt.id, dec!(1000), &staff()),
            Err(LedgerError::AlreadyClosed(debt.id))
        );
        assert_eq!(ledger.balance(), dec!(140000));
    }

    #[test]
    fn fifo_closes_linked_debts() {
        let ledger = Ledger::new();
        let supplier = ledger.add_supplier("Coca Cola", None).unwrap();
        let first = ledger
            .record_purchase(supplier.id, dec!(5000), dec!(0), "", &staff())
            .unwrap();
        ledger
            .record_purchase(supplier.id, dec!(3000), dec!(0), "", &staff())
            .unwrap();

        ledger
            .pay_purchase_fifo(supplier.id, dec!(5000), &staff())
            .unwrap();

        let debt = ledger.debt(first.debt.unwrap().id).unwrap();
        assert!(debt.is_closed);
        assert_eq!(debt.payments.len(), 1);
        assert_eq!(ledger.open_debts(DebtKind::Supplier).len(), 1);
    }
}
