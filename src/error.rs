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

//! Error types for parsing and ledger operations.

use crate::base::{DebtId, RecordRef, SaleId, SupplierId};
use thiserror::Error;

/// Ledger errors.
///
/// Every rejected operation leaves all aggregates unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No usable line item was found in the message
    #[error("no line item found in message")]
    ParseEmpty,

    /// Amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Line item quantity is zero
    #[error("invalid quantity (must be at least 1)")]
    InvalidQuantity,

    /// Referenced record does not exist
    #[error("{0} not found")]
    NotFound(RecordRef),

    /// Payment attempted on a closed debt
    #[error("debt {0} is already closed")]
    AlreadyClosed(DebtId),

    /// Sale deletion blocked because its debt already has payments
    #[error("sale {0} has payments recorded against its debt")]
    IrreversibleDeletion(SaleId),

    /// Store cannot commit atomically and degraded writes are disabled
    #[error("atomic transactions unavailable and degraded writes are disabled")]
    DegradedDurability,

    /// Idempotency key already used
    #[error("duplicate request key {0:?}")]
    DuplicateRequest(String),

    /// Supplier debts are settled through supplier payments
    #[error("debt {0} is owed to a supplier; pay the supplier instead")]
    SupplierDebt(DebtId),

    /// Supplier has no open purchases
    #[error("supplier {0} has nothing outstanding")]
    NothingOutstanding(SupplierId),

    /// Name is blank
    #[error("name must not be empty")]
    EmptyName,
}
