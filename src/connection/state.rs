//
// Copyright 2026 Ferrum RPC Contributors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Connection lifecycle states and the atomic cell that holds them.
//!
//! Legal transitions: `Disconnected -> Connecting -> Connected`, back to
//! `Disconnected` on channel loss, and from any live state to `Closing ->
//! Closed`. `Closed` is terminal; nothing transitions out of it.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// The lifecycle state of one logical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// No live channel; eligible for connect or reconnect.
    Disconnected = 0,
    /// A connect attempt is in flight.
    Connecting = 1,
    /// A live channel is installed.
    Connected = 2,
    /// Shutdown has begun; no new work is accepted.
    Closing = 3,
    /// Terminal. The connection can never be used again.
    Closed = 4,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Disconnected,
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Closing,
            _ => Self::Closed,
        }
    }

    /// `true` for `Closing` and `Closed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Lock-free holder for a [`ConnectionState`].
///
/// Reads never block, so `is_connected` style checks stay cheap on hot
/// paths. Compound state decisions still go through the connect lock; the
/// cell only guarantees each individual transition is atomic.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    /// Creates a cell holding `initial`.
    #[must_use]
    pub fn new(initial: ConnectionState) -> Self {
        Self(AtomicU8::new(initial as u8))
    }

    /// Current state.
    #[must_use]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Unconditionally stores `state`.
    pub fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    /// Atomically moves `from -> to`; returns `false` if the state changed
    /// underneath.
    pub fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// `true` while the cell holds `Connected`.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }

    /// `true` once shutdown has begun.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.get().is_terminal()
    }
}
