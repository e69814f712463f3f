//! Error types for bladematch-core

use thiserror::Error;

use crate::catalog::VehicleKey;

/// What the presentation layer should offer the user after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    /// The referenced selection is gone; start a new search.
    RestartFlow,
    /// The vehicle is real but this branch has no parts; pick something else.
    ChooseAnother,
    /// Operator-supplied input (catalog, config) must be fixed.
    FixInput,
}

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bladematch-core
#[derive(Error, Debug)]
pub enum Error {
    /// Navigation and resolution outcomes
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Catalog snapshot errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Logging bootstrap errors
    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LogError),
}

impl Error {
    /// Recovery hint for the surrounding layer.
    #[must_use]
    pub fn recovery(&self) -> Recovery {
        match self {
            Self::Lookup(err) => err.recovery(),
            Self::Catalog(_) | Self::Config(_) | Self::Logging(_) => Recovery::FixInput,
        }
    }
}

/// Why a referenced selection could not be found.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFound {
    /// Token was never issued or has been evicted. Both read as "expired".
    #[error("session token '{0}' has expired")]
    Token(String),

    /// The vehicle the selection points at is no longer in the catalog.
    #[error("vehicle {0} is not in the catalog")]
    Vehicle(VehicleKey),

    /// The token resolved to a payload of the wrong stage.
    #[error("session token '{token}' does not hold a {expected} selection")]
    Stage {
        token: String,
        expected: &'static str,
    },
}

/// Which narrowing step came up empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NoParts {
    #[error("no frame fits mount '{mount}'")]
    Frames { mount: String },

    #[error("no blade type fits frame '{frame}'")]
    Types { frame: String },

    #[error("vehicle declares no {side} blade size")]
    SideSize { side: crate::selection::Side },
}

/// Outcomes of resolver and navigator operations that are not successes.
///
/// None of these are faults: `NotFound` asks the user to restart,
/// `NoCompatibleParts` is an informative business condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("{0}")]
    NotFound(#[from] NotFound),

    #[error("no compatible parts: {0}")]
    NoCompatibleParts(#[from] NoParts),
}

impl LookupError {
    #[must_use]
    pub fn recovery(&self) -> Recovery {
        match self {
            Self::NotFound(_) => Recovery::RestartFlow,
            Self::NoCompatibleParts(_) => Recovery::ChooseAnother,
        }
    }

    /// True when the user has to start the flow over.
    #[must_use]
    pub fn requires_restart(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Catalog snapshot errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid {table} row {row}: {reason}")]
    InvalidRow {
        table: &'static str,
        row: usize,
        reason: String,
    },

    #[error("Synonym alias '{alias}' is claimed by both '{first}' and '{second}'")]
    ConflictingAlias {
        alias: String,
        first: String,
        second: String,
    },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file {0}: {1}")]
    ReadFailed(String, String),

    #[error("Failed to parse config: {0}")]
    ParseFailed(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Side;

    #[test]
    fn not_found_requires_restart() {
        let err = LookupError::from(NotFound::Token("abc".to_string()));
        assert!(err.requires_restart());
        assert_eq!(err.recovery(), Recovery::RestartFlow);
        assert_eq!(err.to_string(), "session token 'abc' has expired");
    }

    #[test]
    fn no_parts_is_informative() {
        let err = LookupError::from(NoParts::SideSize {
            side: Side::Passenger,
        });
        assert!(!err.requires_restart());
        assert_eq!(err.recovery(), Recovery::ChooseAnother);
        assert!(err.to_string().contains("passenger"));
    }

    #[test]
    fn top_level_error_maps_recovery() {
        let err: Error = ConfigError::ValidationError("bad".to_string()).into();
        assert_eq!(err.recovery(), Recovery::FixInput);

        let err: Error = LookupError::from(NoParts::Frames {
            mount: "hook".to_string(),
        })
        .into();
        assert_eq!(err.recovery(), Recovery::ChooseAnother);
    }
}
