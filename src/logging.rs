//! Logging abstraction layer.
//!
//! The navigation pipeline never prints. Every diagnostic goes through the
//! macros below, which forward to either [`log`](https://docs.rs/log) or
//! [`tracing`](https://docs.rs/tracing) depending on the enabled feature.
//! The two features are **mutually exclusive**; enable at most one. With
//! neither enabled the macros expand to nothing.
//!
//! | Feature    | Backend         | Default |
//! |------------|-----------------|---------|
//! | `log`      | `log` crate     | yes     |
//! | `tracing`  | `tracing` crate | no      |
//!
//! # What gets logged where
//!
//! | Level   | Pipeline events |
//! |---------|-----------------|
//! | `trace` | phase transitions, each middleware call, cache hits |
//! | `debug` | route-change classification, refresh decisions, layout picks |
//! | `info`  | navigation start and completion, mount |
//! | `warn`  | layout fallbacks, stale-asset reloads, duplicate completion attempts |
//! | `error` | error recovery, failed refresh |
//!
//! ```ignore
//! use shell_navigator::{debug_log, info_log};
//!
//! info_log!("Navigation #{} '{}' -> '{}'", id, from, to);
//! debug_log!("Component '{}' at depth {} needs refresh", name, depth);
//! ```

/// Shared dispatcher used by the level macros. Not part of the public API.
#[doc(hidden)]
#[macro_export]
macro_rules! __shell_log {
    ($level:ident, $($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        ::tracing::$level!($($arg)*);
        #[cfg(feature = "log")]
        ::log::$level!($($arg)*);
    }};
}

/// Emit a **trace**-level message (`format!`-style arguments).
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        $crate::__shell_log!(trace, $($arg)*)
    };
}

/// Emit a **debug**-level message (`format!`-style arguments).
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        $crate::__shell_log!(debug, $($arg)*)
    };
}

/// Emit an **info**-level message (`format!`-style arguments).
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        $crate::__shell_log!(info, $($arg)*)
    };
}

/// Emit a **warn**-level message (`format!`-style arguments).
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        $crate::__shell_log!(warn, $($arg)*)
    };
}

/// Emit an **error**-level message (`format!`-style arguments).
#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        $crate::__shell_log!(error, $($arg)*)
    };
}
