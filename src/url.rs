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

//! The service URL: a resolved address plus a flat string parameter map.
//!
//! Registries and discovery hand the engine a [`ServiceUrl`]; everything the
//! engine needs to know about a connection or service is read from it through
//! the typed accessors here, with the defaults the protocol mandates.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default background reconnect period when `reconnect` is absent or `true`.
pub const DEFAULT_RECONNECT_PERIOD: Duration = Duration::from_millis(2000);
/// Default number of failed reconnect attempts between warning logs.
pub const DEFAULT_RECONNECT_WARNING_PERIOD: u64 = 1800;
/// Default silent-failure window before the one-shot escalated error log.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(900_000);
/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);
/// Default service port.
pub const DEFAULT_PORT: u16 = 20880;

/// A malformed service URL parameter.
#[derive(Debug, Error)]
pub enum UrlError {
    /// A parameter value could not be parsed as the expected type.
    #[error("parameter '{key}' must be {expected}, got '{value}'")]
    InvalidParameter {
        /// The offending parameter key.
        key: String,
        /// The raw value found.
        value: String,
        /// What the parameter should have been.
        expected: &'static str,
    },
}

/// A resolved remote address plus the flat parameter map configuring how the
/// engine talks to it.
///
/// # Examples
///
/// ```rust
/// use ferrum_rpc::ServiceUrl;
///
/// let url = ServiceUrl::new("127.0.0.1", 20880, "demo.Service")
///     .with_param("version", "1.0.0")
///     .with_param("lazy", "true");
/// assert_eq!(url.address(), "127.0.0.1:20880");
/// assert!(url.lazy());
/// assert_eq!(url.service_key(), "demo.Service:1.0.0:20880");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceUrl {
    host: String,
    port: u16,
    path: String,
    params: BTreeMap<String, String>,
}

impl ServiceUrl {
    /// Creates a URL for `path` served at `host:port` with no parameters.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
            params: BTreeMap::new(),
        }
    }

    /// Sets one parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// The remote host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The remote port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The service path (interface name).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Raw parameter lookup.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    fn bool_param(&self, key: &str, default: bool) -> bool {
        match self.param(key) {
            Some(v) => v.eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    fn u64_param(&self, key: &str, default: u64) -> u64 {
        self.param(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// The composite service key: `group/path:version:port`.
    ///
    /// Group and version segments are omitted when empty, matching the key
    /// format inbound requests are routed by.
    #[must_use]
    pub fn service_key(&self) -> String {
        service_key(
            self.port,
            &self.path,
            self.param("version").unwrap_or(""),
            self.param("group").unwrap_or(""),
        )
    }

    /// Service version, empty when unset.
    #[must_use]
    pub fn version(&self) -> &str {
        self.param("version").unwrap_or("")
    }

    /// Service group, empty when unset.
    #[must_use]
    pub fn group(&self) -> &str {
        self.param("group").unwrap_or("")
    }

    /// Serialization format name, `json` when unset.
    #[must_use]
    pub fn serialization(&self) -> &str {
        self.param("serialization").unwrap_or("json")
    }

    /// Background reconnect period.
    ///
    /// `None` disables the reconnect loop (`reconnect=false` or `0`); absence
    /// or `true` yields [`DEFAULT_RECONNECT_PERIOD`].
    ///
    /// # Errors
    ///
    /// Returns [`UrlError::InvalidParameter`] for values that are neither a
    /// nonnegative integer nor `true`/`false`.
    pub fn reconnect_period(&self) -> Result<Option<Duration>, UrlError> {
        let raw = match self.param("reconnect") {
            None | Some("") => return Ok(Some(DEFAULT_RECONNECT_PERIOD)),
            Some(raw) => raw,
        };
        if raw.eq_ignore_ascii_case("true") {
            return Ok(Some(DEFAULT_RECONNECT_PERIOD));
        }
        if raw.eq_ignore_ascii_case("false") {
            return Ok(None);
        }
        match raw.parse::<u64>() {
            Ok(0) => Ok(None),
            Ok(millis) => Ok(Some(Duration::from_millis(millis))),
            Err(_) => Err(UrlError::InvalidParameter {
                key: "reconnect".to_string(),
                value: raw.to_string(),
                expected: "a nonnegative integer or true/false",
            }),
        }
    }

    /// Failed attempts between reconnect warning logs.
    #[must_use]
    pub fn reconnect_warning_period(&self) -> u64 {
        self.u64_param("reconnect.warning.period", DEFAULT_RECONNECT_WARNING_PERIOD)
            .max(1)
    }

    /// Silent-failure window before the escalated error log.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.u64_param(
            "shutdown.timeout",
            DEFAULT_SHUTDOWN_TIMEOUT.as_millis() as u64,
        ))
    }

    /// Whether a failed construction-time connect aborts construction.
    #[must_use]
    pub fn check(&self) -> bool {
        self.bool_param("check", true)
    }

    /// Whether `send` should first reconnect a disconnected client.
    #[must_use]
    pub fn send_reconnect(&self) -> bool {
        self.bool_param("send.reconnect", false)
    }

    /// Whether connection establishment is deferred until first use.
    #[must_use]
    pub fn lazy(&self) -> bool {
        self.bool_param("lazy", false)
    }

    /// What a lazy client reports from `is_connected` before first use.
    #[must_use]
    pub fn lazy_initial_state(&self) -> bool {
        self.bool_param("lazy.initial.state", true)
    }

    /// Configured connection count; `0` means one shared connection.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.u64_param("connections", 0) as usize
    }

    /// Maximum accepted connections on the server side; `0` means unlimited.
    #[must_use]
    pub fn accepts(&self) -> usize {
        self.u64_param("accepts", 0) as usize
    }

    /// Advisory idle timeout handed to the channel layer.
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.u64_param("idle.timeout", 600))
    }

    /// Default per-call timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.u64_param("timeout", DEFAULT_TIMEOUT.as_millis() as u64))
    }

    fn method_param(&self, method: &str, key: &str) -> Option<&str> {
        self.param(&format!("{method}.{key}"))
    }

    /// Per-method timeout, falling back to [`timeout`](Self::timeout).
    #[must_use]
    pub fn method_timeout(&self, method: &str) -> Duration {
        self.method_param(method, "timeout")
            .and_then(|v| v.parse().ok())
            .map_or_else(|| self.timeout(), Duration::from_millis)
    }

    /// Whether a method runs in fire-and-wait-for-future mode.
    #[must_use]
    pub fn method_async(&self, method: &str) -> bool {
        self.method_param(method, "async")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// Whether a method's send waits for assured delivery.
    #[must_use]
    pub fn method_sent(&self, method: &str) -> bool {
        self.method_param(method, "sent")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// Whether a method expects a return value at all.
    ///
    /// `false` turns the call into fire-and-forget.
    #[must_use]
    pub fn method_expects_return(&self, method: &str) -> bool {
        match self.method_param(method, "return") {
            Some(v) => !v.eq_ignore_ascii_case("false"),
            None => true,
        }
    }

    /// Method to invoke on the exported service when a channel connects.
    #[must_use]
    pub fn on_connect_method(&self) -> Option<&str> {
        self.param("onconnect").filter(|m| !m.is_empty())
    }

    /// Method to invoke on the exported service when a channel disconnects.
    #[must_use]
    pub fn on_disconnect_method(&self) -> Option<&str> {
        self.param("ondisconnect").filter(|m| !m.is_empty())
    }

    /// Whether this export publishes a client-stub event service.
    #[must_use]
    pub fn stub_event(&self) -> bool {
        self.bool_param("stub.event", false)
    }

    /// Comma-separated allowlist of stub/callback methods.
    #[must_use]
    pub fn stub_event_methods(&self) -> Option<&str> {
        self.param("stub.event.methods").filter(|m| !m.is_empty())
    }

    /// Whether this export is itself a callback service.
    #[must_use]
    pub fn is_callback_service(&self) -> bool {
        self.bool_param("callback.service.instance", false)
    }
}

impl fmt::Display for ServiceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rpc://{}:{}/{}", self.host, self.port, self.path)?;
        if !self.params.is_empty() {
            let mut sep = '?';
            for (k, v) in &self.params {
                write!(f, "{sep}{k}={v}")?;
                sep = '&';
            }
        }
        Ok(())
    }
}

/// Builds the composite routing key from its four parts.
///
/// Format: `group/path:version:port`, with empty group and version segments
/// collapsed away.
#[must_use]
pub fn service_key(port: u16, path: &str, version: &str, group: &str) -> String {
    let mut key = String::new();
    if !group.is_empty() {
        key.push_str(group);
        key.push('/');
    }
    key.push_str(path);
    if !version.is_empty() {
        key.push(':');
        key.push_str(version);
    }
    key.push(':');
    key.push_str(&port.to_string());
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_key_full() {
        assert_eq!(
            service_key(20880, "demo.Service", "1.0.0", "g1"),
            "g1/demo.Service:1.0.0:20880"
        );
    }

    #[test]
    fn test_service_key_empty_segments() {
        assert_eq!(service_key(20880, "demo.Service", "", ""), "demo.Service:20880");
    }

    #[test]
    fn test_reconnect_defaults() {
        let url = ServiceUrl::new("h", 1, "p");
        assert_eq!(url.reconnect_period().unwrap(), Some(DEFAULT_RECONNECT_PERIOD));

        let url = url.with_param("reconnect", "true");
        assert_eq!(url.reconnect_period().unwrap(), Some(DEFAULT_RECONNECT_PERIOD));
    }

    #[test]
    fn test_reconnect_disabled() {
        let url = ServiceUrl::new("h", 1, "p").with_param("reconnect", "false");
        assert_eq!(url.reconnect_period().unwrap(), None);

        let url = ServiceUrl::new("h", 1, "p").with_param("reconnect", "0");
        assert_eq!(url.reconnect_period().unwrap(), None);
    }

    #[test]
    fn test_reconnect_explicit_period() {
        let url = ServiceUrl::new("h", 1, "p").with_param("reconnect", "250");
        assert_eq!(
            url.reconnect_period().unwrap(),
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_reconnect_invalid() {
        let url = ServiceUrl::new("h", 1, "p").with_param("reconnect", "-5");
        assert!(url.reconnect_period().is_err());

        let url = ServiceUrl::new("h", 1, "p").with_param("reconnect", "soon");
        assert!(url.reconnect_period().is_err());
    }

    #[test]
    fn test_method_overrides() {
        let url = ServiceUrl::new("h", 1, "p")
            .with_param("timeout", "500")
            .with_param("echo.timeout", "2500")
            .with_param("echo.async", "true")
            .with_param("notify.return", "false");

        assert_eq!(url.method_timeout("echo"), Duration::from_millis(2500));
        assert_eq!(url.method_timeout("other"), Duration::from_millis(500));
        assert!(url.method_async("echo"));
        assert!(!url.method_async("other"));
        assert!(!url.method_expects_return("notify"));
        assert!(url.method_expects_return("echo"));
    }

    #[test]
    fn test_display_includes_params() {
        let url = ServiceUrl::new("127.0.0.1", 20880, "demo.Service").with_param("lazy", "true");
        assert_eq!(
            url.to_string(),
            "rpc://127.0.0.1:20880/demo.Service?lazy=true"
        );
    }
}
