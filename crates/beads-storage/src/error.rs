//! Storage error types.

/// Errors that can occur during storage operations.
///
/// The variants map onto the system-wide taxonomy: `NotFound` and `Conflict`
/// are recoverable and surfaced to the caller; `SchemaViolation` rejects a
/// write; `DatabaseLocked`/`Connection`/`Transaction` form the transient
/// class the daemon retries; everything else is fatal and propagates.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested entity was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g., "issue", "decision", "config").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// An entity with this primary key already exists.
    #[error("conflict: id {id} already exists")]
    Conflict {
        /// The duplicated identifier.
        id: String,
    },

    /// A type schema rejected the bead.
    #[error("{0}")]
    SchemaViolation(String),

    /// A validation constraint was violated.
    #[error("validation error: {message}")]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// An issue ID does not match the configured workspace prefix.
    #[error("issue {id} does not match configured prefix {prefix}")]
    PrefixMismatch {
        /// The issue ID.
        id: String,
        /// The expected prefix.
        prefix: String,
    },

    /// Adding a dependency would create a cycle in the blocking graph.
    #[error("adding this dependency would create a cycle")]
    CycleDetected,

    /// A dependency edge points at its own source.
    #[error("issue {0} cannot depend on itself")]
    SelfDependency(String),

    /// The database has not been initialized.
    #[error("database not initialized: {reason}")]
    NotInitialized {
        /// Why the database is considered uninitialized.
        reason: String,
    },

    /// The database is locked by another process.
    #[error("database locked: {0}")]
    DatabaseLocked(String),

    /// Failed to establish or maintain a database connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// A transaction operation failed or was aborted.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// A schema migration failed.
    #[error("migration {name} failed: {reason}")]
    Migration {
        /// Name of the migration that failed.
        name: String,
        /// Underlying error description.
        reason: String,
    },

    /// A raw SQLite query error.
    #[error("query error: {0}")]
    Query(#[from] rusqlite::Error),

    /// JSON serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Catch-all for unexpected internal errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the storage crate.
pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    // -- Constructors --------------------------------------------------------

    /// Creates a [`StorageError::NotFound`] for the given entity kind and id.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a [`StorageError::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    // -- Predicates ----------------------------------------------------------

    /// Returns `true` if this is a [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a [`StorageError::Conflict`].
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns `true` if the error is transient and the operation may succeed
    /// on retry (e.g., database locked, connection errors).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseLocked(_) | Self::Connection(_) | Self::Transaction(_)
        )
    }

    /// Maps a rusqlite error, converting UNIQUE-constraint failures on the
    /// given id into [`StorageError::Conflict`] so callers can retry with a
    /// fresh nonce.
    pub fn from_sqlite(e: rusqlite::Error, id: &str) -> Self {
        if let rusqlite::Error::SqliteFailure(ref err, ref msg) = e {
            if err.code == rusqlite::ErrorCode::ConstraintViolation
                && msg
                    .as_deref()
                    .is_some_and(|m| m.contains("UNIQUE constraint"))
            {
                return Self::Conflict { id: id.to_owned() };
            }
        }
        Self::Query(e)
    }
}

impl From<beads_core::validation::ValidationError> for StorageError {
    fn from(e: beads_core::validation::ValidationError) -> Self {
        match e {
            beads_core::validation::ValidationError::Schema { .. } => {
                Self::SchemaViolation(e.to_string())
            }
            other => Self::Validation {
                message: other.to_string(),
            },
        }
    }
}
