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

//! Ledger and parser settings.
//!
//! Both structs deserialize with every field optional, so a host application
//! can embed them in its own settings file and override only what it needs.

use serde::{Deserialize, Serialize};

/// Parser settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Prefixed to 9-digit local phone numbers.
    pub country_code: String,
    /// Money values below this are treated as noise (quantities, sizes).
    pub noise_threshold: u64,
    /// Expense values at or above this are ignored.
    pub expense_ceiling: u64,
    /// Name used when a line item has no text left.
    pub unknown_name: String,
    /// Title used when an expense has no text left.
    pub expense_title: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            country_code: "998".to_string(),
            noise_threshold: 1000,
            expense_ceiling: 100_000_000,
            unknown_name: "unknown".to_string(),
            expense_title: "expense".to_string(),
        }
    }
}

/// Ledger settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Whether the store commits multi-record writes atomically.
    pub transactional: bool,
    /// Permit sequential, non-atomic writes when `transactional` is off.
    pub allow_degraded_writes: bool,
    /// Idempotency keys remembered before the oldest are evicted.
    pub dedup_capacity: usize,
    pub parser: ParserConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            transactional: true,
            allow_degraded_writes: false,
            dedup_capacity: 10_000,
            parser: ParserConfig::default(),
        }
    }
}
