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

//! Cash-on-hand counter.
//!
//! The balance is mutated only through [`BalanceCounter::add`]. There is no
//! setter, so no caller can read the value and write back a stale result.

use parking_lot::Mutex;
use rust_decimal::Decimal;

#[derive(Debug, Default)]
pub struct BalanceCounter {
    value: Mutex<Decimal>,
}

impl BalanceCounter {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(Decimal::ZERO),
        }
    }

    /// Atomically adds `delta` (which may be negative) and returns the new value.
    pub fn add(&self, delta: Decimal) -> Decimal {
        let mut value = self.value.lock();
        *value += delta;
        *value
    }

    pub fn value(&self) -> Decimal {
        *self.value.lock()
    }
}
