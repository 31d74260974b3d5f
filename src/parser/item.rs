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

//! Line-item builder: turns one segment into quantity, price, paid amount
//! and name.

use super::lexer::{Lexeme, Token};
use crate::config::ParserConfig;
use crate::money::THOUSAND;
use crate::records::LineItem;
use rust_decimal::Decimal;

/// A money expression found in a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Money {
    Single(u64),
    /// `A-B`: unit price and second operand.
    Pair(u64, u64),
}

/// Second operand next to the unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Second {
    /// From a hyphen pair.
    Hyphen(u64),
    /// A second plain amount.
    Plain(u64),
}

/// Everything a segment was made of, with markers resolved.
#[derive(Debug, Default)]
struct Parts<'a> {
    qty: Option<u64>,
    money: Vec<Money>,
    words: Vec<&'a str>,
}

impl<'a> Parts<'a> {
    fn collect(lexemes: &[Lexeme<'a>]) -> Self {
        let tokens: Vec<Token<'a>> = lexemes
            .iter()
            .flat_map(|lexeme| lexeme.tokens.iter().copied())
            .collect();

        let mut parts = Parts::default();
        let mut i = 0;
        while i < tokens.len() {
            match tokens[i] {
                Token::Number(n) => {
                    if matches!(tokens.get(i + 1), Some(Token::Qty(_))) {
                        // only the first count wins; later ones are still stripped
                        parts.qty.get_or_insert(n);
                        i += 2;
                        continue;
                    }
                    let (a, next) = operand(n, &tokens, i + 1);
                    i = next;
                    if let (Some(Token::Hyphen), Some(Token::Number(m))) =
                        (tokens.get(i), tokens.get(i + 1))
                    {
                        let (b, next) = operand(*m, &tokens, i + 2);
                        i = next;
                        parts.money.push(Money::Pair(a, b));
                    } else {
                        parts.money.push(Money::Single(a));
                    }
                }
                // an orphan quantity marker is just a word
                Token::Qty(text) | Token::Word(text) => {
                    parts.words.push(text);
                    i += 1;
                }
                Token::Thousand | Token::Tel | Token::Hyphen => i += 1,
            }
        }
        parts
    }

    fn qty(&self) -> u32 {
        self.qty
            .map_or(1, |n| u32::try_from(n).unwrap_or(u32::MAX))
            .max(1)
    }

    /// Unit price and optional second operand.
    ///
    /// The first hyphen pair with a price at or above the noise threshold
    /// wins. Otherwise the first plain amount at or above the threshold is
    /// the price, and the plain amount right after it, whatever its size
    /// (`0` included), is the paid amount.
    fn price(&self, threshold: u64) -> Option<(u64, Option<Second>)> {
        let pair = self.money.iter().find_map(|money| match *money {
            Money::Pair(a, b) if a >= threshold => Some((a, Some(Second::Hyphen(b)))),
            _ => None,
        });
        if pair.is_some() {
            return pair;
        }

        let mut plain = self.money.iter().filter_map(|money| match *money {
            Money::Single(a) => Some(a),
            Money::Pair(..) => None,
        });
        let price = plain.find(|&a| a >= threshold)?;
        Some((price, plain.next().map(Second::Plain)))
    }

    /// Every amount in the segment, both sides of pairs included.
    fn amounts(&self) -> impl Iterator<Item = u64> + '_ {
        self.money.iter().flat_map(|money| match *money {
            Money::Single(a) => vec![a],
            Money::Pair(a, b) => vec![a, b],
        })
    }

    fn name(&self) -> Option<String> {
        let joined = self.words.join(" ");
        let trimmed = joined.trim_matches(|c: char| ".,;:-!?".contains(c) || c.is_whitespace());
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Reads an amount starting at a number, applying a following thousand marker.
fn operand(n: u64, tokens: &[Token<'_>], after: usize) -> (u64, usize) {
    if matches!(tokens.get(after), Some(Token::Thousand)) {
        (n.saturating_mul(THOUSAND), after + 1)
    } else {
        (n, after)
    }
}

/// Builds a line item from one segment; `None` if it has no price.
///
/// With a quantity above one, a hyphen operand below the unit price is the
/// amount still owed, so `2ta 12000-0` is fully paid; this is intended.
pub(crate) fn build_item(segment: &[Lexeme<'_>], config: &ParserConfig) -> Option<LineItem> {
    let parts = Parts::collect(segment);
    let (price, second) = parts.price(config.noise_threshold)?;
    let qty = parts.qty();

    let unit_price = Decimal::from(price);
    let total = Decimal::from(qty) * unit_price;
    let paid = match second {
        None => total,
        Some(Second::Hyphen(b)) if qty > 1 && b < price => total - Decimal::from(b),
        Some(Second::Hyphen(b) | Second::Plain(b)) => Decimal::from(b).min(total),
    };

    let name = parts.name().unwrap_or_else(|| config.unknown_name.clone());
    Some(LineItem::with_paid(name, qty, unit_price, paid))
}

/// Title, quantity and unit price of an expense line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExpenseParts {
    pub title: String,
    pub qty: u32,
    pub unit_price: u64,
}

/// Reads a whole expense line: the last amount inside the accepted range is
/// the unit price.
pub(crate) fn build_expense(lexemes: &[Lexeme<'_>], config: &ParserConfig) -> Option<ExpenseParts> {
    let parts = Parts::collect(lexemes);
    let range = config.noise_threshold..config.expense_ceiling;
    let unit_price = parts.amounts().filter(|a| range.contains(a)).last()?;
    Some(ExpenseParts {
        title: parts
            .name()
            .unwrap_or_else(|| config.expense_title.clone()),
        qty: parts.qty(),
        unit_price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::lex;
    use rust_decimal_macros::dec;

    fn item(text: &str) -> Option<LineItem> {
        build_item(&lex(text), &ParserConfig::default())
    }

    #[test]
    fn plain_price_is_fully_paid() {
        let item = item("Tort 140000").unwrap();
        assert_eq!(item, LineItem::with_paid("Tort", 1, dec!(140000), dec!(140000)));
    }

    #[test]
    fn second_amount_is_paid() {
        let item = item("Tort 140000 100000").unwrap();
        assert_eq!(item.unit_price, dec!(140000));
        assert_eq!(item.paid_amount, dec!(100000));
    }

    #[test]
    fn paid_is_clamped_to_line_total() {
        let item = item("Tort 140000 200000").unwrap();
        assert_eq!(item.paid_amount, dec!(140000));
    }

    #[test]
    fn quantity_with_and_without_space() {
        let a = item("Perog 2ta 12000").unwrap();
        let b = item("Perog 2 ta 12000").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.qty, 2);
        assert_eq!(a.paid_amount, dec!(24000));
        assert_eq!(a.name, "Perog");
    }

    #[test]
    fn zero_quantity_becomes_one() {
        assert_eq!(item("Perog 0ta 12000").unwrap().qty, 1);
    }

    #[test]
    fn hyphen_with_quantity_is_remaining_debt() {
        // 3 x 12000 = 36000, 10000 still owed
        let item = item("Perog 3ta 12000-10000").unwrap();
        assert_eq!(item.paid_amount, dec!(26000));
    }

    #[test]
    fn hyphen_zero_with_quantity_is_fully_paid() {
        let item = item("Perog 2ta 12000-0").unwrap();
        assert_eq!(item.paid_amount, dec!(24000));
    }

    #[test]
    fn hyphen_without_quantity_is_paid_amount() {
        let item = item("Tort 140000-100000").unwrap();
        assert_eq!(item.paid_amount, dec!(100000));

        let item = self::item("Tort 140000-0").unwrap();
        assert_eq!(item.paid_amount, dec!(0));
    }

    #[test]
    fn hyphen_second_operand_above_price_is_paid() {
        // B >= unit price: absolute paid amount, clamped
        let item = item("Perog 2ta 12000-15000").unwrap();
        assert_eq!(item.paid_amount, dec!(15000));
        let item = self::item("Perog 2ta 12000-30000").unwrap();
        assert_eq!(item.paid_amount, dec!(24000));
    }

    #[test]
    fn thousand_markers() {
        assert_eq!(item("Tort 100 ming").unwrap().unit_price, dec!(100000));
        assert_eq!(item("Tort 100min").unwrap().unit_price, dec!(100000));
        let item = item("Tort 140min-100min").unwrap();
        assert_eq!(item.unit_price, dec!(140000));
        assert_eq!(item.paid_amount, dec!(100000));
    }

    #[test]
    fn small_numbers_are_noise() {
        let item = item("Kola 500 12000").unwrap();
        assert_eq!(item.unit_price, dec!(12000));
        assert_eq!(item.paid_amount, dec!(12000));
        assert!(self::item("Kola 500").is_none());
    }

    #[test]
    fn small_second_amount_is_paid() {
        let item = item("Tort 140000 0").unwrap();
        assert_eq!(item.unit_price, dec!(140000));
        assert_eq!(item.paid_amount, dec!(0));

        let item = self::item("Tort 140000 500").unwrap();
        assert_eq!(item.paid_amount, dec!(500));

        let item = self::item("Kola 500 12000 0").unwrap();
        assert_eq!(item.unit_price, dec!(12000));
        assert_eq!(item.paid_amount, dec!(0));
    }

    #[test]
    fn missing_name_uses_placeholder() {
        assert_eq!(item("12000").unwrap().name, "unknown");
    }

    #[test]
    fn name_is_trimmed_and_collapsed() {
        assert_eq!(item("Hot-dog  katta: 3ta 10000").unwrap().name, "Hot-dog katta");
    }

    #[test]
    fn expense_uses_last_amount() {
        let parts = build_expense(&lex("Taxi 2ta 15000"), &ParserConfig::default()).unwrap();
        assert_eq!(
            parts,
            ExpenseParts {
                title: "Taxi".into(),
                qty: 2,
                unit_price: 15000
            }
        );
    }

    #[test]
    fn expense_ignores_amounts_out_of_range() {
        let config = ParserConfig::default();
        let parts = build_expense(&lex("Svet 500 250000000 80000"), &config).unwrap();
        assert_eq!(parts.unit_price, 80000);
        assert!(build_expense(&lex("Svet 500"), &config).is_none());
        assert_eq!(
            build_expense(&lex("45000"), &config).unwrap().title,
            "expense"
        );
    }
}
