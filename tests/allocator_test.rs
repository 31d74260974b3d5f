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

//! Debt payment and FIFO supplier allocation tests.

use kassa::{
    DebtId, DebtStatus, Durability, Ledger, LedgerError, LineItem, Person, RecordRef, Supplier,
    SupplierId,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn staff() -> Person {
    Person::new(1, "Ali")
}

/// Supplier with one unpaid purchase per amount, oldest first.
fn supplier_owing(ledger: &Ledger, amounts: &[Decimal]) -> Supplier {
    let supplier = ledger.add_supplier("Coca Cola", None).unwrap();
    for amount in amounts {
        ledger
            .record_purchase(supplier.id, *amount, Decimal::ZERO, "", &staff())
            .unwrap();
    }
    ledger.supplier(supplier.id).unwrap()
}

fn sale_with_debt(ledger: &Ledger, paid: Decimal) -> DebtId {
    ledger
        .record_sale(
            &staff(),
            vec![LineItem::with_paid("Tort", 1, dec!(140000), paid)],
            None,
        )
        .unwrap()
        .debt
        .unwrap()
        .id
}

#[test]
fn partial_payment_keeps_debt_open() {
    let ledger = Ledger::new();
    let debt_id = sale_with_debt(&ledger, dec!(100000));

    let payment = ledger.pay_debt(debt_id, dec!(15000), &staff()).unwrap();

    assert_eq!(payment.actual_pay, dec!(15000));
    assert_eq!(payment.debt.remaining_debt, dec!(25000));
    assert_eq!(payment.debt.status(), DebtStatus::PartiallyPaid);
    assert!(!payment.debt.is_closed);
    assert_eq!(payment.durability, Durability::Atomic);
    assert_eq!(ledger.balance(), dec!(115000));
}

#[test]
fn overpayment_applies_only_remaining_debt() {
    let ledger = Ledger::new();
    let debt_id = sale_with_debt(&ledger, dec!(100000));

    let payment = ledger.pay_debt(debt_id, dec!(100000), &staff()).unwrap();

    assert_eq!(payment.actual_pay, dec!(40000));
    assert_eq!(payment.debt.remaining_debt, Decimal::ZERO);
    assert!(payment.debt.is_closed);
    assert_eq!(payment.debt.status(), DebtStatus::Closed);
    assert_eq!(payment.debt.payments.len(), 1);
    assert_eq!(payment.debt.payments[0].amount, dec!(40000));
    assert_eq!(ledger.balance(), dec!(140000));
}

#[test]
fn repeated_partial_payments_close_the_debt() {
    let ledger = Ledger::new();
    let debt_id = sale_with_debt(&ledger, dec!(100000));

    for _ in 0..3 {
        ledger.pay_debt(debt_id, dec!(10000), &staff()).unwrap();
    }
    let last = ledger.pay_debt(debt_id, dec!(10000), &staff()).unwrap();

    assert!(last.debt.is_closed);
    assert_eq!(last.debt.payments.len(), 4);
    assert_eq!(
        ledger.pay_debt(debt_id, dec!(10000), &staff()),
        Err(LedgerError::AlreadyClosed(debt_id))
    );
    assert_eq!(ledger.balance(), dec!(140000));
}

#[test]
fn invalid_debt_payments_are_rejected() {
    let ledger = Ledger::new();
    let debt_id = sale_with_debt(&ledger, dec!(100000));

    assert_eq!(
        ledger.pay_debt(debt_id, Decimal::ZERO, &staff()),
        Err(LedgerError::InvalidAmount)
    );
    assert_eq!(
        ledger.pay_debt(debt_id, dec!(-5000), &staff()),
        Err(LedgerError::InvalidAmount)
    );
    assert_eq!(
        ledger.pay_debt(DebtId(999), dec!(5000), &staff()),
        Err(LedgerError::NotFound(RecordRef::Debt(DebtId(999))))
    );
    assert_eq!(ledger.balance(), dec!(100000));
    assert!(ledger.debt(debt_id).unwrap().payments.is_empty());
}

#[test]
fn fifo_pays_oldest_purchase_first() {
    let ledger = Ledger::new();
    let supplier = supplier_owing(&ledger, &[dec!(5000), dec!(3000)]);
    assert_eq!(supplier.debt, dec!(8000));

    let allocation = ledger
        .pay_purchase_fifo(supplier.id, dec!(6000), &staff())
        .unwrap();

    assert_eq!(allocation.used_amount, dec!(6000));
    assert_eq!(allocation.leftover_amount, Decimal::ZERO);
    assert_eq!(allocation.new_remaining_debt, dec!(2000));

    let purchases = ledger.purchases_for(supplier.id);
    assert!(purchases[0].is_closed);
    assert_eq!(purchases[0].remaining, Decimal::ZERO);
    assert_eq!(purchases[0].paid, dec!(5000));
    assert!(!purchases[1].is_closed);
    assert_eq!(purchases[1].remaining, dec!(2000));
    assert_eq!(purchases[1].status(), DebtStatus::PartiallyPaid);
    assert_eq!(ledger.supplier(supplier.id).unwrap().debt, dec!(2000));
}

#[test]
fn fifo_does_not_touch_balance() {
    let ledger = Ledger::new();
    let supplier = supplier_owing(&ledger, &[dec!(5000)]);
    ledger
        .pay_purchase_fifo(supplier.id, dec!(5000), &staff())
        .unwrap();
    assert_eq!(ledger.balance(), Decimal::ZERO);
}

#[test]
fn fifo_leftover_when_payment_exceeds_debt() {
    let ledger = Ledger::new();
    let supplier = supplier_owing(&ledger, &[dec!(5000), dec!(3000)]);

    let allocation = ledger
        .pay_purchase_fifo(supplier.id, dec!(10000), &staff())
        .unwrap();

    assert_eq!(allocation.used_amount, dec!(8000));
    assert_eq!(allocation.leftover_amount, dec!(2000));
    assert_eq!(allocation.new_remaining_debt, Decimal::ZERO);
    assert!(ledger.purchases_for(supplier.id).iter().all(|p| p.is_closed));
}

#[test]
fn fifo_with_nothing_owed_returns_everything() {
    let ledger = Ledger::new();
    let supplier = supplier_owing(&ledger, &[]);

    let allocation = ledger
        .pay_purchase_fifo(supplier.id, dec!(1000), &staff())
        .unwrap();

    assert_eq!(allocation.used_amount, Decimal::ZERO);
    assert_eq!(allocation.leftover_amount, dec!(1000));
}

#[test]
fn fifo_rejects_bad_input() {
    let ledger = Ledger::new();
    let supplier = supplier_owing(&ledger, &[dec!(5000)]);

    assert_eq!(
        ledger.pay_purchase_fifo(supplier.id, Decimal::ZERO, &staff()),
        Err(LedgerError::InvalidAmount)
    );
    assert_eq!(
        ledger.pay_purchase_fifo(SupplierId(77), dec!(1000), &staff()),
        Err(LedgerError::NotFound(RecordRef::Supplier(SupplierId(77))))
    );
    assert_eq!(ledger.supplier(supplier.id).unwrap().debt, dec!(5000));
}

#[test]
fn supplier_payment_records_expense_for_used_amount() {
    let ledger = Ledger::new();
    ledger
        .record_sale(
            &staff(),
            vec![LineItem::paid_in_full("Tort", 1, dec!(140000))],
            None,
        )
        .unwrap();
    let supplier = supplier_owing(&ledger, &[dec!(5000), dec!(3000)]);

    let payment = ledger
        .pay_supplier(supplier.id, dec!(10000), &staff())
        .unwrap();

    assert_eq!(payment.allocation.used_amount, dec!(8000));
    assert_eq!(payment.allocation.leftover_amount, dec!(2000));
    assert_eq!(payment.expense.amount, dec!(8000));
    assert_eq!(payment.expense.title, "Supplier payment: Coca Cola");
    assert_eq!(payment.expense.supplier, Some(supplier.id));
    assert_eq!(ledger.balance(), dec!(132000));
}

#[test]
fn supplier_payment_when_nothing_owed() {
    let ledger = Ledger::new();
    let supplier = supplier_owing(&ledger, &[]);

    assert_eq!(
        ledger.pay_supplier(supplier.id, dec!(1000), &staff()),
        Err(LedgerError::NothingOutstanding(supplier.id))
    );
    assert_eq!(ledger.balance(), Decimal::ZERO);
}
