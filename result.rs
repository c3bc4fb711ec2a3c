use crate::*;

/// Basic Result alias with [`enum@Error`]
pub type Result<T = (), E = Error> = std::result::Result<T, E>;

/// Utility for type inference that allows using `?` operator in closure handlers
pub const OK: Result<(), Error> = Result::Ok(());

use thiserror::Error;
/// Error type used across the shell
#[derive(Error, Debug)]
pub enum Error {
    /// Exception thrown by a browser API, stringified
    #[error("{0}")]
    Platform(String),
    #[error("No deferred install prompt is held")]
    NoDeferredPrompt,
    #[error("Push subscription has no endpoint")]
    MissingEndpoint,
    #[error("Instantiating app module failed: {0}")]
    Instantiate(String),
    #[error("Response for {url} failed with status {status}")]
    BadStatus { url: String, status: StatusCode },
    #[error(transparent)]
    InvalidVapidKey(#[from] base64::DecodeError),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    HttpError(#[from] http::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error("{0:?}")]
    Any(AnyError),
}

#[cfg(host)]
impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        // malformed request bodies are rejected by the `Json` extractor before any handler runs
        match self {
            Error::MissingEndpoint => StatusCode::BAD_REQUEST.into_response(),
            _ => {
                error!("{self}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Provides shorthand to map errs into [`enum@Error`] using `.somehow()`
#[doc(hidden)]
pub trait _Somehow<T, E> {
    fn somehow(self) -> Result<T, Error>;
}

impl<T, E> _Somehow<T, E> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn somehow(self) -> Result<T, Error> {
        self.map_err(|e| Error::Any(AnyError(format!("{e}"))))
    }
}

#[derive(Debug)]
#[doc(hidden)]
pub struct AnyError(pub String);
impl<E: std::error::Error> From<E> for AnyError {
    fn from(value: E) -> Self {
        AnyError(format!("{value}"))
    }
}

/// Shorthand to create formatted [`enum@Error`] values like `e!("{x:?}")`
#[macro_export]
macro_rules! e {
    ($($tokens:tt),+) => {
        $crate::Error::Any($crate::AnyError(format!($($tokens),+)))
    };
}
