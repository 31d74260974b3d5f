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

//! Property-based tests for the parser and the ledger.
//!
//! These tests verify invariants that should hold for any message and any
//! sequence of valid ledger operations.

use kassa::{Ledger, LineItem, Person, parse_sale_message};
use proptest::prelude::*;
use rust_decimal::Decimal;

// =============================================================================
// Arbitrary Strategies
// =============================================================================

/// A product name that is not a marker word.
fn arb_name() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{2,8}".prop_filter("marker word", |name| {
        !["tel", "telefon", "ta", "dona", "x", "min", "ming"]
            .iter()
            .any(|m| name.eq_ignore_ascii_case(m))
    })
}

/// A whole price at or above the noise threshold.
fn arb_price() -> impl Strategy<Value = u64> {
    1_000u64..=5_000_000
}

fn arb_item() -> impl Strategy<Value = LineItem> {
    (arb_name(), 1u32..=20, arb_price(), 0u32..=100).prop_map(|(name, qty, price, percent)| {
        let price = Decimal::from(price);
        let total = Decimal::from(qty) * price;
        let paid = (total * Decimal::from(percent) / Decimal::from(100)).floor();
        LineItem::with_paid(name, qty, price, paid)
    })
}

fn staff() -> Person {
    Person::new(1, "Ali")
}

// =============================================================================
// Parser Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Any input parses without panicking, and every item is well-formed.
    #[test]
    fn parser_is_total(text in ".{0,80}") {
        let parsed = parse_sale_message(&text);
        for item in &parsed.items {
            prop_assert!(item.qty >= 1);
            prop_assert!(item.unit_price >= Decimal::from(1000));
            prop_assert!(item.paid_amount >= Decimal::ZERO);
            prop_assert!(item.paid_amount <= item.line_total());
            prop_assert!(!item.name.is_empty());
        }
    }

    /// Messages built from loose tokens still yield well-formed items.
    #[test]
    fn token_soup_is_total(
        words in prop::collection::vec(
            prop_oneof![
                arb_name(),
                "[0-9]{1,7}",
                "[0-9]{1,3}(ta|x| dona)",
                "[0-9]{1,3} ?(min|ming)",
                "[0-9]{4,6}-[0-9]{1,6}",
                Just("tel".to_string()),
                Just(",".to_string()),
            ],
            0..12,
        ),
    ) {
        let parsed = parse_sale_message(&words.join(" "));
        for item in &parsed.items {
            prop_assert!(item.qty >= 1);
            prop_assert!(item.paid_amount >= Decimal::ZERO);
            prop_assert!(item.paid_amount <= item.line_total());
        }
        if let Some(phone) = &parsed.phone {
            prop_assert!(phone.len() >= 9 && phone.len() <= 12);
        }
    }

    /// `<name> <qty>ta <price>` is read back exactly and fully paid.
    #[test]
    fn simple_item_is_exact(name in arb_name(), qty in 1u32..=99, price in arb_price()) {
        let parsed = parse_sale_message(&format!("{name} {qty}ta {price}"));
        let price = Decimal::from(price);
        prop_assert_eq!(
            parsed.items,
            vec![LineItem::with_paid(name, qty, price, Decimal::from(qty) * price)]
        );
    }

    /// Comma-separated items are parsed independently.
    #[test]
    fn comma_items_are_independent(
        items in prop::collection::vec((arb_name(), arb_price()), 1..6),
    ) {
        let text = items
            .iter()
            .map(|(name, price)| format!("{name} {price}"))
            .collect::<Vec<_>>()
            .join(", ");
        let parsed = parse_sale_message(&text);
        prop_assert_eq!(parsed.items.len(), items.len());
        for (item, (name, price)) in parsed.items.iter().zip(&items) {
            prop_assert_eq!(&item.name, name);
            prop_assert_eq!(item.unit_price, Decimal::from(*price));
        }
    }
}

// =============================================================================
// Ledger Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Sale debt is total minus paid, and a debt exists iff it is positive.
    #[test]
    fn sale_arithmetic(items in prop::collection::vec(arb_item(), 1..6)) {
        let ledger = Ledger::new();
        let receipt = ledger.record_sale(&staff(), items, None).unwrap();
        let sale = &receipt.sale;

        prop_assert_eq!(sale.debt_total, sale.total - sale.paid_total);
        prop_assert!(sale.paid_total <= sale.total);
        prop_assert_eq!(receipt.debt.is_some(), sale.debt_total > Decimal::ZERO);
        if let Some(debt) = &receipt.debt {
            prop_assert_eq!(debt.remaining_debt, sale.debt_total);
        }
        prop_assert_eq!(ledger.balance(), sale.paid_total);
        prop_assert_eq!(ledger.open_customer_debt(), sale.debt_total);
    }

    /// Debt payments never apply more than what is owed.
    #[test]
    fn payments_never_over_apply(
        item in arb_item(),
        payments in prop::collection::vec(1u64..=2_000_000, 1..10),
    ) {
        let ledger = Ledger::new();
        let receipt = ledger.record_sale(&staff(), vec![item], None).unwrap();
        let Some(debt) = receipt.debt else {
            return Ok(());
        };

        let mut applied = Decimal::ZERO;
        for amount in payments {
            match ledger.pay_debt(debt.id, Decimal::from(amount), &staff()) {
                Ok(payment) => {
                    prop_assert!(payment.actual_pay <= Decimal::from(amount));
                    prop_assert!(payment.debt.remaining_debt >= Decimal::ZERO);
                    applied += payment.actual_pay;
                }
                Err(e) => {
                    prop_assert_eq!(e, kassa::LedgerError::AlreadyClosed(debt.id));
                }
            }
        }

        let debt_now = ledger.debt(debt.id).unwrap();
        prop_assert_eq!(applied, debt.total_debt - debt_now.remaining_debt);
        prop_assert_eq!(debt_now.is_closed, debt_now.remaining_debt.is_zero());
        prop_assert_eq!(ledger.balance(), receipt.sale.paid_total + applied);
    }

    /// FIFO allocation conserves money and keeps supplier debt equal to
    /// what open purchases still need.
    #[test]
    fn fifo_conserves_amounts(
        purchases in prop::collection::vec(arb_price(), 0..6),
        amount in 1u64..=10_000_000,
    ) {
        let ledger = Ledger::new();
        let supplier = ledger.add_supplier("Coca Cola", None).unwrap();
        for cost in &purchases {
            ledger
                .record_purchase(supplier.id, Decimal::from(*cost), Decimal::ZERO, "", &staff())
                .unwrap();
        }
        let owed: Decimal = purchases.iter().copied().map(Decimal::from).sum();
        let amount = Decimal::from(amount);

        let allocation = ledger.pay_purchase_fifo(supplier.id, amount, &staff()).unwrap();

        prop_assert_eq!(allocation.used_amount + allocation.leftover_amount, amount);
        prop_assert_eq!(allocation.used_amount, amount.min(owed));
        prop_assert_eq!(allocation.new_remaining_debt, owed - allocation.used_amount);

        let open: Decimal = ledger
            .purchases_for(supplier.id)
            .iter()
            .filter(|p| !p.is_closed)
            .map(|p| p.remaining)
            .sum();
        prop_assert_eq!(ledger.supplier(supplier.id).unwrap().debt, open);

        // closed purchases form a prefix: older ones are paid first
        let closed: Vec<bool> = ledger
            .purchases_for(supplier.id)
            .iter()
            .map(|p| p.is_closed)
            .collect();
        prop_assert!(closed.windows(2).all(|w| w[0] || !w[1]));
    }
}
