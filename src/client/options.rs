//! Client Options
//!
//! Resolves optional timeout and socket settings into a complete, immutable
//! [`ClientOptions`] value. Every absent setting resolves to the library
//! default, so building options never fails.

use std::time::Duration;

use tracing::info;

use crate::config::{
    ClientOptionsSettings, KeepAliveSettings, SocketSettings, TimeoutSettings, TimeoutStatus,
    DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_KEEP_ALIVE,
    DEFAULT_KEEP_ALIVE_COUNT, DEFAULT_KEEP_ALIVE_IDLE_HOURS, DEFAULT_KEEP_ALIVE_INTERVAL_SECS,
    DEFAULT_TCP_NO_DELAY,
};

// == Timeout Policy ==
/// Command timeout policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// Commands wait indefinitely
    Disabled,
    /// Commands are bounded by the library default
    EnabledDefault,
    /// Commands are bounded by a fixed threshold
    EnabledFixed(Duration),
}

impl TimeoutPolicy {
    /// Effective per-command bound, `None` when disabled.
    pub fn command_timeout(&self) -> Option<Duration> {
        match self {
            TimeoutPolicy::Disabled => None,
            TimeoutPolicy::EnabledDefault => Some(Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS)),
            TimeoutPolicy::EnabledFixed(timeout) => Some(*timeout),
        }
    }
}

// == Keep Alive Options ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAliveOptions {
    pub enabled: bool,
    pub count: u32,
    pub idle: Duration,
    pub interval: Duration,
}

impl Default for KeepAliveOptions {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_KEEP_ALIVE,
            count: DEFAULT_KEEP_ALIVE_COUNT,
            idle: Duration::from_secs(DEFAULT_KEEP_ALIVE_IDLE_HOURS * 3600),
            interval: Duration::from_secs(DEFAULT_KEEP_ALIVE_INTERVAL_SECS),
        }
    }
}

// == Socket Options ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketOptions {
    pub connect_timeout: Duration,
    pub tcp_no_delay: bool,
    pub keep_alive: KeepAliveOptions,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            tcp_no_delay: DEFAULT_TCP_NO_DELAY,
            keep_alive: KeepAliveOptions::default(),
        }
    }
}

// == Client Options ==
/// Timeout and socket behaviour attached to every node connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    pub timeout: TimeoutPolicy,
    pub socket: SocketOptions,
}

impl Default for ClientOptions {
    /// Timeouts enabled with the library default threshold.
    fn default() -> Self {
        Self {
            timeout: TimeoutPolicy::EnabledDefault,
            socket: SocketOptions::default(),
        }
    }
}

impl ClientOptions {
    /// Builds client options from optional settings.
    pub fn from_settings(settings: Option<&ClientOptionsSettings>) -> Self {
        let Some(settings) = settings else {
            info!("No custom client options configured, using defaults");
            return Self::default();
        };

        Self {
            timeout: timeout_policy(settings.timeout.as_ref()),
            socket: socket_options(settings.socket.as_ref()),
        }
    }
}

fn timeout_policy(settings: Option<&TimeoutSettings>) -> TimeoutPolicy {
    let Some(settings) = settings else {
        return TimeoutPolicy::EnabledDefault;
    };
    match settings.status() {
        TimeoutStatus::Disabled => TimeoutPolicy::Disabled,
        TimeoutStatus::EnabledFixed => {
            TimeoutPolicy::EnabledFixed(Duration::from_millis(settings.timeout_ms.unsigned_abs()))
        }
        TimeoutStatus::EnabledDefault => TimeoutPolicy::EnabledDefault,
    }
}

fn socket_options(settings: Option<&SocketSettings>) -> SocketOptions {
    let Some(settings) = settings else {
        return SocketOptions::default();
    };
    SocketOptions {
        connect_timeout: Duration::from_secs(settings.connection_timeout_secs),
        tcp_no_delay: settings.tcp_no_delay,
        keep_alive: keep_alive_options(settings.keep_alive.as_ref()),
    }
}

fn keep_alive_options(settings: Option<&KeepAliveSettings>) -> KeepAliveOptions {
    let Some(settings) = settings else {
        return KeepAliveOptions::default();
    };
    KeepAliveOptions {
        enabled: settings.enable,
        count: settings.count,
        idle: Duration::from_secs(settings.idle_hours.saturating_mul(3600)),
        interval: Duration::from_secs(settings.interval_secs),
    }
}
