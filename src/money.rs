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

//! Money literals.
//!
//! Staff type prices the way they say them: `140000`, `140 000`, `140.000`,
//! `100min` or `100 ming` (a hundred thousand). These helpers turn such
//! literals into whole amounts and format amounts back for notes.
//!
//! # Example
//!
//! ```
//! use kassa::money::parse_amount;
//!
//! assert_eq!(parse_amount("140 000"), Some(140_000));
//! assert_eq!(parse_amount("100ming"), Some(100_000));
//! assert_eq!(parse_amount("abc"), None);
//! ```

use crate::parser::lexer::{Token, lex_word};
use rust_decimal::Decimal;

/// Multiplier applied by a thousand marker.
pub const THOUSAND: u64 = 1000;

/// Value of a digit literal as the lexer matches it: `140000`, `140.000`,
/// `1,250,000`, `1.5`.
///
/// A `.` or `,` followed by exactly three digits is a thousands separator.
/// The first group of any other length starts a fraction, which is dropped
/// together with everything after it. Values saturate at `u64::MAX`.
pub fn literal_value(literal: &str) -> u64 {
    let mut groups = literal.split(['.', ',']);
    let lead = groups.next().map_or(0, group_value);
    groups
        .take_while(|group| group.len() == 3)
        .fold(lead, |acc, group| {
            acc.saturating_mul(THOUSAND).saturating_add(group_value(group))
        })
}

fn group_value(digits: &str) -> u64 {
    digits.parse().unwrap_or(u64::MAX)
}

/// Parses a standalone money literal.
///
/// Accepts thousand separators (`.`, `,`, space) and a trailing
/// `min`/`ming` marker, with or without a space before it.
pub fn parse_amount(raw: &str) -> Option<u64> {
    let compact: String = raw.split_whitespace().collect();
    match lex_word(&compact).as_slice() {
        [Token::Number(n)] => Some(*n),
        [Token::Number(n), Token::Thousand] => Some(n.saturating_mul(THOUSAND)),
        _ => None,
    }
}

/// Formats a whole amount with space-separated thousands: `140 000`.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round();
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = rounded.abs().to_string();

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if negative {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}
