//! Error handling for the ballot ledger

/// Result type alias for the ballot ledger
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the ballot ledger
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The caller certificate could not be turned into an identity
    #[error("Identity parse error: {message}")]
    IdentityParse { message: String },

    /// A cast was attempted before the allow-list was ever stored
    #[error("State not initialized: {message}")]
    StateNotInitialized { message: String },

    /// The allow-list has already been stored and cannot be replaced
    #[error("Already initialized: {message}")]
    AlreadyInitialized { message: String },

    /// The caller's organization is not on the allow-list
    #[error("Not authorized: organization '{organization}' may not vote")]
    NotAuthorized { organization: String },

    /// A ballot already exists and the recast policy forbids replacing it
    #[error("Already voted: {message}")]
    AlreadyVoted { message: String },

    /// Wrong argument count or malformed argument
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Unknown invoke function name
    #[error("Invalid function name: {name}")]
    InvalidFunction { name: String },

    /// A ledger key was not produced by the composite key scheme
    #[error("Key decode error: {message}")]
    KeyDecode { message: String },

    /// A stored value could not be interpreted
    #[error("Value decode error: {message}")]
    ValueDecode { message: String },

    /// Failures reported by the underlying ledger
    #[error("Ledger error: {message}")]
    Ledger { message: String },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new identity parse error
    pub fn identity(message: impl Into<String>) -> Self {
        Self::IdentityParse {
            message: message.into(),
        }
    }

    /// Create a new state-not-initialized error
    pub fn not_initialized(message: impl Into<String>) -> Self {
        Self::StateNotInitialized {
            message: message.into(),
        }
    }

    /// Create a new already-initialized error
    pub fn already_initialized(message: impl Into<String>) -> Self {
        Self::AlreadyInitialized {
            message: message.into(),
        }
    }

    /// Create a new not-authorized error
    pub fn not_authorized(organization: impl Into<String>) -> Self {
        Self::NotAuthorized {
            organization: organization.into(),
        }
    }

    /// Create a new already-voted error
    pub fn already_voted(message: impl Into<String>) -> Self {
        Self::AlreadyVoted {
            message: message.into(),
        }
    }

    /// Create a new invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a new invalid function error
    pub fn invalid_function(name: impl Into<String>) -> Self {
        Self::InvalidFunction { name: name.into() }
    }

    /// Create a new key decode error
    pub fn key_decode(message: impl Into<String>) -> Self {
        Self::KeyDecode {
            message: message.into(),
        }
    }

    /// Create a new value decode error
    pub fn value_decode(message: impl Into<String>) -> Self {
        Self::ValueDecode {
            message: message.into(),
        }
    }

    /// Create a new ledger error
    pub fn ledger(message: impl Into<String>) -> Self {
        Self::Ledger {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Response status code for this error.
    ///
    /// Anything at or above 400 is a failed invocation.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidArgument { .. } | Self::InvalidFunction { .. } => 400,
            Self::NotAuthorized { .. } => 403,
            Self::AlreadyInitialized { .. } | Self::AlreadyVoted { .. } => 409,
            _ => 500,
        }
    }
}

/// Convenience macros for creating specific error types
#[macro_export]
macro_rules! ledger_error {
    ($msg:expr) => {
        $crate::Error::ledger($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::ledger(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! invalid_argument {
    ($msg:expr) => {
        $crate::Error::invalid_argument($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::invalid_argument(format!($fmt, $($arg)*))
    };
}
