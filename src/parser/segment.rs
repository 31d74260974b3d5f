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

//! Segmenter: groups lexemes into one segment per line item.
//!
//! With a comma anywhere in the line, every comma-separated part is a
//! segment. Otherwise lexemes are grouped greedily and a segment closes after
//! each money-looking lexeme (plus an immediately following paid amount,
//! however small: `Tort 140000 0`).
//! A `tel` marker and the lexeme after it never belong to a segment; the
//! lexeme is kept aside as a phone candidate. So is a number glued to the
//! marker (`tel903456677`).

use super::lexer::{Lexeme, lex};
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub(crate) struct Segmented<'a> {
    pub segments: Vec<Vec<Lexeme<'a>>>,
    /// Text following each `tel` marker, in order of appearance.
    pub phone_candidates: Vec<&'a str>,
}

pub(crate) fn segment(line: &str) -> Segmented<'_> {
    let commas = item_commas(line);
    if commas.is_empty() {
        by_money(line)
    } else {
        by_comma(line, &commas)
    }
}

/// Byte offsets of commas separating items. A comma between two digits
/// (`140,000`, `12,5`) belongs to a number instead.
fn item_commas(line: &str) -> Vec<usize> {
    let bytes = line.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|&(i, &b)| b == b',' && !is_number_comma(bytes, i))
        .map(|(i, _)| i)
        .collect()
}

fn is_number_comma(bytes: &[u8], i: usize) -> bool {
    i > 0
        && bytes[i - 1].is_ascii_digit()
        && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)
}

fn by_comma<'a>(line: &'a str, commas: &[usize]) -> Segmented<'a> {
    let mut out = Segmented::default();
    let mut start = 0;
    let mut parts = Vec::with_capacity(commas.len() + 1);
    for &comma in commas {
        parts.push(&line[start..comma]);
        start = comma + 1;
    }
    parts.push(&line[start..]);

    for part in parts {
        let mut queue: VecDeque<_> = lex(part).into();
        let mut kept = Vec::new();
        while let Some(lexeme) = queue.pop_front() {
            if let Some(phone) = lexeme.attached_phone() {
                out.phone_candidates.push(phone);
                continue;
            }
            if lexeme.is_tel_marker() {
                if let Some(candidate) = queue.pop_front() {
                    out.phone_candidates.push(candidate.text);
                }
                continue;
            }
            kept.push(lexeme);
        }
        if !kept.is_empty() {
            out.segments.push(kept);
        }
    }
    out
}

fn by_money(line: &str) -> Segmented<'_> {
    let mut out = Segmented::default();
    let mut queue: VecDeque<_> = lex(line).into();
    let mut current = Vec::new();

    while let Some(lexeme) = queue.pop_front() {
        if let Some(phone) = lexeme.attached_phone() {
            close(&mut current, &mut out.segments);
            out.phone_candidates.push(phone);
            continue;
        }
        if lexeme.is_tel_marker() {
            close(&mut current, &mut out.segments);
            if let Some(candidate) = queue.pop_front() {
                out.phone_candidates.push(candidate.text);
            }
            continue;
        }

        let money = lexeme.looks_like_money(queue.front());
        let short = lexeme.digits <= 3;
        current.push(lexeme);
        if !money {
            continue;
        }

        if short {
            // "100 ming"
            take_thousand_marker(&mut queue, &mut current);
        }
        if queue.front().is_some_and(Lexeme::is_hyphen)
            && queue.get(1).is_some_and(|l| l.digits > 0)
        {
            // "12000 - 10000"
            take_front(&mut queue, &mut current);
            take_front(&mut queue, &mut current);
            take_thousand_marker(&mut queue, &mut current);
        } else if queue.front().is_some_and(|next| {
            next.attached_phone().is_none() && next.looks_like_money(queue.get(1))
        }) {
            // price followed by the paid amount
            take_front(&mut queue, &mut current);
            take_thousand_marker(&mut queue, &mut current);
        } else if queue.front().is_some_and(Lexeme::is_bare_number)
            && !queue.get(1).is_some_and(Lexeme::is_qty_marker)
        {
            // short paid amount: "140000 0", but not "140000 2 ta"
            take_front(&mut queue, &mut current);
        }
        close(&mut current, &mut out.segments);
    }

    close(&mut current, &mut out.segments);
    out
}

fn take_front<'a>(queue: &mut VecDeque<Lexeme<'a>>, current: &mut Vec<Lexeme<'a>>) {
    if let Some(lexeme) = queue.pop_front() {
        current.push(lexeme);
    }
}

fn take_thousand_marker<'a>(queue: &mut VecDeque<Lexeme<'a>>, current: &mut Vec<Lexeme<'a>>) {
    if queue.front().is_some_and(Lexeme::is_thousand_marker) {
        take_front(queue, current);
    }
}

fn close<'a>(current: &mut Vec<Lexeme<'a>>, segments: &mut Vec<Vec<Lexeme<'a>>>) {
    if !current.is_empty() {
        segments.push(std::mem::take(current));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(segmented: &Segmented<'_>) -> Vec<Vec<String>> {
        segmented
            .segments
            .iter()
            .map(|s| s.iter().map(|l| l.text.to_string()).collect())
            .collect()
    }

    #[test]
    fn comma_mode_splits_on_commas() {
        let s = segment("Tort 140000 100000, Perog 2ta 12000");
        assert_eq!(
            texts(&s),
            vec![vec!["Tort", "140000", "100000"], vec!["Perog", "2ta", "12000"]]
        );
    }

    #[test]
    fn grouping_comma_is_not_a_separator() {
        let s = segment("Tort 140,000 Perog 12000");
        assert_eq!(texts(&s), vec![vec!["Tort", "140,000"], vec!["Perog", "12000"]]);

        let s = segment("Tort 140,000, Perog 12,5");
        assert_eq!(texts(&s), vec![vec!["Tort", "140,000"], vec!["Perog", "12,5"]]);
    }

    #[test]
    fn greedy_mode_closes_after_money() {
        let s = segment("Tort 140000 100000 Perog 2ta 12000 Hot-dog 3ta 10000");
        assert_eq!(
            texts(&s),
            vec![
                vec!["Tort", "140000", "100000"],
                vec!["Perog", "2ta", "12000"],
                vec!["Hot-dog", "3ta", "10000"],
            ]
        );
    }

    #[test]
    fn thousand_word_stays_with_number() {
        let s = segment("Tort 100 ming Perog 12000");
        assert_eq!(
            texts(&s),
            vec![vec!["Tort", "100", "ming"], vec!["Perog", "12000"]]
        );
    }

    #[test]
    fn paid_amount_with_thousand_word() {
        let s = segment("Tort 140000 100 ming Kofe 8000");
        assert_eq!(
            texts(&s),
            vec![vec!["Tort", "140000", "100", "ming"], vec!["Kofe", "8000"]]
        );
    }

    #[test]
    fn paid_amount_after_thousand_word() {
        let s = segment("Tort 100 ming 80 ming Kofe 8000");
        assert_eq!(
            texts(&s),
            vec![vec!["Tort", "100", "ming", "80", "ming"], vec!["Kofe", "8000"]]
        );
    }

    #[test]
    fn spaced_hyphen_pair_stays_together() {
        let s = segment("Perog 3ta 12000 - 10000 Kofe 8000");
        assert_eq!(
            texts(&s),
            vec![vec!["Perog", "3ta", "12000", "-", "10000"], vec!["Kofe", "8000"]]
        );
    }

    #[test]
    fn tel_pair_is_split_off() {
        let s = segment("Tort 140000 100000 tel 903456677");
        assert_eq!(texts(&s), vec![vec!["Tort", "140000", "100000"]]);
        assert_eq!(s.phone_candidates, vec!["903456677"]);
    }

    #[test]
    fn tel_pair_in_comma_mode() {
        let s = segment("Tort 140000, Perog 12000 tel 903456677");
        assert_eq!(texts(&s), vec![vec!["Tort", "140000"], vec!["Perog", "12000"]]);
        assert_eq!(s.phone_candidates, vec!["903456677"]);
    }

    #[test]
    fn short_paid_amount_stays_with_price() {
        let s = segment("Tort 140000 0 Kofe 8000");
        assert_eq!(
            texts(&s),
            vec![vec!["Tort", "140000", "0"], vec!["Kofe", "8000"]]
        );

        let s = segment("Tort 140000 500");
        assert_eq!(texts(&s), vec![vec!["Tort", "140000", "500"]]);
    }

    #[test]
    fn count_after_price_starts_next_item() {
        let s = segment("Perog 12000 3 dona Kofe 8000");
        assert_eq!(
            texts(&s),
            vec![vec!["Perog", "12000"], vec!["3", "dona", "Kofe", "8000"]]
        );
    }

    #[test]
    fn attached_tel_number_is_split_off() {
        let s = segment("Tort 140000 tel903456677");
        assert_eq!(texts(&s), vec![vec!["Tort", "140000"]]);
        assert_eq!(s.phone_candidates, vec!["903456677"]);

        let s = segment("Tort 140000, Perog 12000 tel:+998903456677");
        assert_eq!(texts(&s), vec![vec!["Tort", "140000"], vec!["Perog", "12000"]]);
        assert_eq!(s.phone_candidates, vec!["+998903456677"]);
    }

    #[test]
    fn trailing_tel_marker_without_number() {
        let s = segment("Tort 140000 tel");
        assert_eq!(texts(&s), vec![vec!["Tort", "140000"]]);
        assert!(s.phone_candidates.is_empty());
    }

    #[test]
    fn empty_line() {
        let s = segment("   ");
        assert!(s.segments.is_empty());
        let s = segment(" , ,");
        assert!(s.segments.is_empty());
    }
}
