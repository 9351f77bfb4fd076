//! Error types for EntiGraph core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in EntiGraph core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Journal storage error.
    #[error("storage error: {0}")]
    Storage(#[from] entigraph_storage::StorageError),

    /// A commit batch could not be encoded or decoded.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },

    /// An entity with this name is already registered.
    #[error("entity already registered: {name}")]
    DuplicateEntity {
        /// Entity name.
        name: String,
    },

    /// No entity with this name is registered.
    #[error("unknown entity: {name}")]
    UnknownEntity {
        /// Entity name.
        name: String,
    },

    /// The schema is internally inconsistent.
    #[error("invalid schema: {message}")]
    InvalidSchema {
        /// Description of the inconsistency.
        message: String,
    },

    /// A key names neither an attribute nor a relationship of the entity.
    #[error("unknown key {key:?} on entity {entity}")]
    UnknownKey {
        /// Entity name.
        entity: String,
        /// The offending key.
        key: String,
    },

    /// A value does not fit the slot it was assigned to.
    #[error("type mismatch for {entity}.{key}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Entity name.
        entity: String,
        /// Attribute or relationship name.
        key: String,
        /// What the slot accepts.
        expected: String,
        /// What was supplied.
        actual: String,
    },

    /// A predicate could not be parsed.
    #[error("invalid predicate at {position}: {message}")]
    InvalidPredicate {
        /// Byte offset in the predicate source.
        position: usize,
        /// Description of the problem.
        message: String,
    },

    /// No live instance with this identity exists.
    #[error("instance not found: {id}")]
    InstanceNotFound {
        /// Instance identity.
        id: String,
    },

    /// A `deny` delete rule blocked a destroy.
    #[error("delete denied: {entity}.{relationship} still holds {count} live instance(s)")]
    DeleteDenied {
        /// Entity owning the denying relationship.
        entity: String,
        /// The denying relationship.
        relationship: String,
        /// Number of live members blocking the delete.
        count: usize,
    },

    /// The instance has never been committed.
    #[error("instance {id} has never been saved")]
    NotPersisted {
        /// Instance identity.
        id: String,
    },

    /// The pending change set could not be committed.
    #[error("commit failed: {reason}")]
    CommitFailed {
        /// Why the commit was abandoned.
        reason: String,
    },
}

impl CoreError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates an unknown entity error.
    pub fn unknown_entity(name: impl Into<String>) -> Self {
        Self::UnknownEntity { name: name.into() }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }

    /// Creates an unknown key error.
    pub fn unknown_key(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self::UnknownKey {
            entity: entity.into(),
            key: key.into(),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(
        entity: impl Into<String>,
        key: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            entity: entity.into(),
            key: key.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an invalid predicate error.
    pub fn invalid_predicate(position: usize, message: impl Into<String>) -> Self {
        Self::InvalidPredicate {
            position,
            message: message.into(),
        }
    }

    /// Creates an instance not found error.
    pub fn instance_not_found(id: impl ToString) -> Self {
        Self::InstanceNotFound { id: id.to_string() }
    }

    /// Creates a commit failed error.
    pub fn commit_failed(reason: impl Into<String>) -> Self {
        Self::CommitFailed {
            reason: reason.into(),
        }
    }
}
