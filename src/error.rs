//! Error types for the navigation pipeline.
//!
//! - [`AppError`]: the normalised, user-visible error (`{status_code,
//!   message}`) stored in the application state and handed to the error
//!   view.
//! - [`NavigationError`]: everything a hook or a pipeline stage can fail
//!   with. It includes the redirect sentinel, which is not a real failure.
//! - [`ErrorStamp`]: a monotonic marker stamped on every write through the
//!   error entry point, so the shell can tell "same error still active" from
//!   "error raised again".
//!
//! # Examples
//!
//! ```
//! use shell_navigator::error::{AppError, NavigationError};
//!
//! let err = NavigationError::ValidationFailed;
//! assert_eq!(err.status_code(), 404);
//! assert_eq!(err.to_app_error().message, "This page could not be found");
//!
//! let err: NavigationError = AppError::new(403, "Forbidden").into();
//! assert_eq!(err.status_code(), 403);
//! ```

use std::fmt;
use thiserror::Error;

/// Message used for every 404 the shell raises itself.
pub const NOT_FOUND_MESSAGE: &str = "This page could not be found";

/// Normalised error shown by the error view.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AppError {
    /// HTTP-like status code.
    pub status_code: u16,
    /// Human-readable message (may be empty).
    pub message: String,
}

impl AppError {
    /// Create an error with an explicit status.
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    /// The shell's canonical 404.
    pub fn not_found() -> Self {
        Self::new(404, NOT_FOUND_MESSAGE)
    }

    /// A 500 with the given message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status_code, self.message)
    }
}

impl std::error::Error for AppError {}

impl From<&str> for AppError {
    fn from(message: &str) -> Self {
        Self::internal(message)
    }
}

impl From<String> for AppError {
    fn from(message: String) -> Self {
        Self::internal(message)
    }
}

/// Failure modes of the navigation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum NavigationError {
    /// A hook redirected the navigation. Completion has already been
    /// invoked with the target; this only unwinds the pipeline.
    #[error("redirected to '{to}'")]
    Redirect {
        /// Redirect target path.
        to: String,
    },

    /// An error carrying its own status.
    #[error("{0}")]
    Status(AppError),

    /// A middleware identifier with no registered function.
    #[error("Unknown middleware {name}")]
    UnknownMiddleware {
        /// The unresolved identifier.
        name: String,
    },

    /// No route matched the location.
    #[error("no route matched '{path}'")]
    NotFound {
        /// The unmatched path.
        path: String,
    },

    /// A page validation predicate returned `false`.
    #[error("This page could not be found")]
    ValidationFailed,

    /// A deployed asset no longer exists (typically after a redeploy).
    #[error("{message}")]
    StaleAsset {
        /// The original loader message.
        message: String,
    },

    /// A lazy component could not be loaded.
    #[error("failed to resolve component '{component}': {message}")]
    ComponentResolution {
        /// Component id.
        component: String,
        /// Loader message.
        message: String,
    },

    /// A path template was filled without one of its required params.
    #[error("missing param '{name}' for template '{template}'")]
    MissingParam {
        /// Parameter name.
        name: String,
        /// Template being compiled.
        template: String,
    },

    /// Anything else; reported as a 500.
    #[error("{0}")]
    Message(String),
}

impl NavigationError {
    /// Shorthand for [`NavigationError::Status`].
    pub fn status(status_code: u16, message: impl Into<String>) -> Self {
        Self::Status(AppError::new(status_code, message))
    }

    /// Status code reported for this error (500 unless the error carries one).
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Status(err) => err.status_code,
            Self::NotFound { .. } | Self::ValidationFailed => 404,
            Self::Redirect { .. } => 302,
            _ => 500,
        }
    }

    /// Normalise into the `{status_code, message}` shape shown to users.
    pub fn to_app_error(&self) -> AppError {
        match self {
            Self::Status(err) => err.clone(),
            Self::NotFound { .. } | Self::ValidationFailed => AppError::not_found(),
            other => AppError::new(other.status_code(), other.to_string()),
        }
    }

    /// Return `true` for the redirect sentinel.
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }

    /// Return `true` if this error means the running build is out of date
    /// and the page must be reloaded instead of showing an error view.
    pub fn is_stale_asset(&self) -> bool {
        match self {
            Self::StaleAsset { .. } => true,
            Self::Status(err) => is_stale_asset_message(&err.message),
            Self::ComponentResolution { message, .. } | Self::Message(message) => {
                is_stale_asset_message(message)
            }
            _ => false,
        }
    }
}

impl From<AppError> for NavigationError {
    fn from(err: AppError) -> Self {
        Self::Status(err)
    }
}

impl From<&str> for NavigationError {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}

impl From<String> for NavigationError {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

/// Result type returned by every hook.
pub type HookResult<T = ()> = Result<T, NavigationError>;

/// Recognise `Loading chunk 12 failed.` and `Loading CSS chunk 3 failed.`
pub fn is_stale_asset_message(message: &str) -> bool {
    let Some(rest) = message.strip_prefix("Loading ") else {
        return false;
    };
    let rest = rest.strip_prefix("CSS ").unwrap_or(rest);
    let Some(rest) = rest.strip_prefix("chunk ") else {
        return false;
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && rest[digits..].starts_with(" failed.")
}

/// Monotonic marker stamped on every write through the error entry point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ErrorStamp(pub u64);

/// Current error of the application together with its stamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorState {
    /// Active error, if any.
    pub error: Option<AppError>,
    /// Stamp of the last write (set or clear). `None` until the first write.
    pub stamp: Option<ErrorStamp>,
}

impl ErrorState {
    /// Return `true` while an error is shown.
    pub fn is_errored(&self) -> bool {
        self.error.is_some()
    }
}
