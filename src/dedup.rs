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

//! Idempotency keys for retried requests.
//!
//! Callers with a stable request identifier (a chat message id, say) pass it
//! as a key. The key is reserved before the ledger transaction runs, so a
//! concurrent retry with the same key is rejected rather than recorded twice.

use crate::LedgerError;
use crate::base::OrderNo;
use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Debug, Clone, PartialEq, Eq)]
enum KeyState {
    /// Reserved; the transaction has not finished.
    Pending,
    /// Committed under this order number.
    Done(OrderNo),
}

/// A bounded log of request keys.
///
/// Combines a [`DashMap`] for atomic check-and-reserve with a [`SegQueue`]
/// recording completion order, so the oldest completed keys are forgotten
/// first once `capacity` is exceeded.
#[derive(Debug)]
pub struct RequestLog {
    keys: DashMap<String, KeyState>,
    completed: SegQueue<String>,
    capacity: usize,
}

impl RequestLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            keys: DashMap::new(),
            completed: SegQueue::new(),
            capacity,
        }
    }

    /// Reserves `key` for a new request.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateRequest`] if the key is pending or
    /// was already committed.
    pub fn reserve(&self, key: &str) -> Result<(), LedgerError> {
        match self.keys.entry(key.to_string()) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateRequest(key.to_string())),
            Entry::Vacant(entry) => {
                entry.insert(KeyState::Pending);
                Ok(())
            }
        }
    }

    /// Frees a reserved key after its transaction was rejected.
    pub fn release(&self, key: &str) {
        self.keys
            .remove_if(key, |_, state| *state == KeyState::Pending);
    }

    /// Marks `key` as committed and evicts the oldest keys over capacity.
    pub fn complete(&self, key: &str, order_no: OrderNo) {
        self.keys.insert(key.to_string(), KeyState::Done(order_no));
        self.completed.push(key.to_string());
        while self.completed.len() > self.capacity {
            match self.completed.pop() {
                Some(oldest) => {
                    self.keys.remove(&oldest);
                }
                None => break,
            }
        }
    }

    /// Order number a committed key was recorded under.
    pub fn order_no(&self, key: &str) -> Option<OrderNo> {
        match self.keys.get(key).as_deref() {
            Some(KeyState::Done(order_no)) => Some(order_no.clone()),
            _ => None,
        }
    }

    /// Keys currently remembered, pending ones included.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::new(10_000)
    }
}
