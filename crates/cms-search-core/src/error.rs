//! Error types for the content search engine.

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while configuring, indexing or searching content.
///
/// All variants carry enough context to be surfaced to a caller as-is; the
/// original cause, when there is one, is available through
/// [`std::error::Error::source`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid or unreachable index/taxonomy location or connection info.
    #[error("Setup error: {message}")]
    Setup {
        /// What could not be set up
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<BoxError>,
    },

    /// Failure while opening, querying or reading matched documents.
    #[error("Search error: {message}")]
    Search {
        /// What the search was doing when it failed
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<BoxError>,
    },

    /// Failure while releasing a per-call resource.
    #[error("Error releasing {resource}: {message}")]
    Release {
        /// Resource that failed to release (e.g. "index reader")
        resource: &'static str,
        /// Failure description
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<BoxError>,
    },

    /// Configuration is missing or inconsistent.
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// A category path could not be parsed.
    #[error("Invalid category path '{path}': {reason}")]
    InvalidCategory {
        /// Offending path
        path: String,
        /// Why it was rejected
        reason: String,
    },

    /// A term map key does not name a field of the index schema.
    #[error("Unknown search field: {field}")]
    UnknownField {
        /// Field identifier that was not found
        field: String,
    },

    /// No resources are registered for the tenant.
    #[error("Tenant not found: {tenant}")]
    TenantNotFound {
        /// Tenant/core identifier
        tenant: String,
    },

    /// Resources are already registered for the tenant.
    #[error("Tenant already exists: {tenant}")]
    TenantExists {
        /// Tenant/core identifier
        tenant: String,
    },

    /// `unlock` was called by a thread that does not hold the lock.
    #[error("Lock for '{tenant}' is not held by the current thread")]
    LockNotHeld {
        /// Tenant/core identifier
        tenant: String,
    },

    /// The backend or client handle has been closed.
    #[error("{what} is closed")]
    Closed {
        /// Closed component
        what: String,
    },

    /// The remote index service answered with an error status.
    #[error("Remote index service returned {status}: {body}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience `Result` alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns whether the failure is transient.
    ///
    /// Nothing in the engine retries; calling layers may use this to decide.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Search { .. } => true,
            Error::Remote { status, .. } => *status >= 500 || *status == 429,
            Error::Setup { .. }
            | Error::Release { .. }
            | Error::Config { .. }
            | Error::InvalidCategory { .. }
            | Error::UnknownField { .. }
            | Error::TenantNotFound { .. }
            | Error::TenantExists { .. }
            | Error::LockNotHeld { .. }
            | Error::Closed { .. }
            | Error::Json(_) => false,
        }
    }

    /// Creates a setup error.
    pub fn setup<S: Into<String>>(message: S) -> Self {
        Error::Setup {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a setup error with its cause.
    pub fn setup_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<BoxError>,
    {
        Error::Setup {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a search execution error.
    pub fn search<S: Into<String>>(message: S) -> Self {
        Error::Search {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a search execution error with its cause.
    pub fn search_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<BoxError>,
    {
        Error::Search {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a resource release error.
    pub fn release<S: Into<String>>(resource: &'static str, message: S) -> Self {
        Error::Release {
            resource,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a resource release error with its cause.
    pub fn release_with_source<S, E>(resource: &'static str, message: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<BoxError>,
    {
        Error::Release {
            resource,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid category error.
    pub fn invalid_category<P: Into<String>, R: Into<String>>(path: P, reason: R) -> Self {
        Error::InvalidCategory {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a closed-component error.
    pub fn closed<S: Into<String>>(what: S) -> Self {
        Error::Closed { what: what.into() }
    }
}
