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

//! Inbound call classification.
//!
//! Three kinds of call can arrive on a channel, and the routing key is built
//! differently for each. Classification is a pure function of the channel
//! facts and the invocation's attachments so it can be tested without any
//! live connection.

use crate::connection::ChannelInfo;
use crate::invocation::{keys, Invocation};

/// How an inbound invocation should be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Ordinary consumer-to-provider call; keyed by the local port.
    Normal,
    /// Provider-to-consumer callback arriving on a channel this side
    /// originally opened; keyed by the local port with the callback path
    /// suffix applied.
    Callback,
    /// Stub event notification; keyed by the *remote* port, because the
    /// exported stub service was registered under the consumer's port.
    StubEvent,
}

/// `true` when this endpoint opened the channel (it is the consumer side).
///
/// A channel opened by this side targets the peer's service port, so the
/// channel URL's address matches the remote end. On an accepted channel the
/// URL instead matches the local end.
#[must_use]
pub fn is_client_side(channel: &ChannelInfo) -> bool {
    channel.url.port() == channel.remote.port && channel.url.host() == channel.remote.host
}

/// Classifies one inbound invocation.
#[must_use]
pub fn classify(channel: &ChannelInfo, invocation: &Invocation) -> CallKind {
    if invocation
        .attachment(keys::STUB_EVENT)
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    {
        return CallKind::StubEvent;
    }
    if is_client_side(channel) {
        return CallKind::Callback;
    }
    CallKind::Normal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ChannelAddress;
    use crate::url::ServiceUrl;

    fn server_side_channel() -> ChannelInfo {
        // Accepted channel: URL matches the local (bound) end.
        ChannelInfo {
            url: ServiceUrl::new("127.0.0.1", 20880, "demo.Service"),
            local: ChannelAddress::new("127.0.0.1", 20880),
            remote: ChannelAddress::new("127.0.0.1", 50001),
        }
    }

    fn client_side_channel() -> ChannelInfo {
        // Opened channel: URL matches the remote (target) end.
        ChannelInfo {
            url: ServiceUrl::new("127.0.0.1", 20880, "demo.Service"),
            local: ChannelAddress::new("127.0.0.1", 50001),
            remote: ChannelAddress::new("127.0.0.1", 20880),
        }
    }

    #[test]
    fn test_side_detection() {
        assert!(!is_client_side(&server_side_channel()));
        assert!(is_client_side(&client_side_channel()));
    }

    #[test]
    fn test_normal_call() {
        let inv = Invocation::new("echo");
        assert_eq!(classify(&server_side_channel(), &inv), CallKind::Normal);
    }

    #[test]
    fn test_callback_on_client_side() {
        let inv = Invocation::new("notify");
        assert_eq!(classify(&client_side_channel(), &inv), CallKind::Callback);
    }

    #[test]
    fn test_stub_event_wins_over_side() {
        let inv = Invocation::new("onpush").with_attachment(keys::STUB_EVENT, "true");
        assert_eq!(classify(&client_side_channel(), &inv), CallKind::StubEvent);
        assert_eq!(classify(&server_side_channel(), &inv), CallKind::StubEvent);
    }
}
