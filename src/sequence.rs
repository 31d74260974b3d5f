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

//! Global order sequence shared by sales, expenses and purchases.

use crate::base::OrderNo;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomically incrementing order number generator.
///
/// Concurrent callers never observe the same value.
#[derive(Debug, Default)]
pub struct OrderSequence {
    last: AtomicU64,
}

impl OrderSequence {
    pub fn new() -> Self {
        Self::starting_after(0)
    }

    /// Resumes a sequence whose last issued value was `last`.
    pub fn starting_after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    pub fn next(&self) -> OrderNo {
        let value = self.last.fetch_add(1, Ordering::SeqCst) + 1;
        OrderNo::from_seq(value)
    }

    /// Last value issued, `0` if none.
    pub fn last(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn starts_at_one() {
        let seq = OrderSequence::new();
        assert_eq!(seq.next().as_str(), "0001");
        assert_eq!(seq.next().as_str(), "0002");
        assert_eq!(seq.last(), 2);
    }

    #[test]
    fn widens_after_9999_without_repadding() {
        let seq = OrderSequence::starting_after(9998);
        assert_eq!(seq.next().as_str(), "9999");
        assert_eq!(seq.next().as_str(), "10000");
        assert_eq!(seq.next().as_str(), "10001");
    }

    #[test]
    fn concurrent_callers_get_unique_numbers() {
        let seq = Arc::new(OrderSequence::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seq = Arc::clone(&seq);
                thread::spawn(move || (0..500).map(|_| seq.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for order_no in handle.join().unwrap() {
                assert!(seen.insert(order_no), "order number issued twice");
            }
        }
        assert_eq!(seen.len(), 4000);
        assert_eq!(seq.last(), 4000);
    }
}
