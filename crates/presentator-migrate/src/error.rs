//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid JSON/YAML, missing fields, conflicting storage, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source database connection or query error
    #[error("Source database error ({context}): {source}")]
    Source {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    /// Target database connection or query error
    #[error("Target database error ({context}): {source}")]
    Target {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Error raised by a store that is not backed by a database driver.
    #[error("Store error: {0}")]
    Store(String),

    /// The target store has no collection with the requested name.
    #[error("Collection {0:?} not found in the target store")]
    CollectionNotFound(String),

    /// A record could not be written to the target store.
    #[error("Failed to save {kind} record {id:?}")]
    Write {
        kind: String,
        id: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// A source row could not be turned into a target record.
    #[error("Failed to map {kind} row {source_id}: {message}")]
    Mapping {
        kind: String,
        source_id: i64,
        message: String,
    },

    /// Blob read or write failed
    #[error("Blob {key:?}: {message}")]
    Blob { key: String, message: String },

    /// A whole entity pass failed.
    #[error("Failed to migrate {kind}")]
    Entity {
        kind: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Source error for a failed source query.
    pub fn source_db(context: impl Into<String>, source: sqlx::Error) -> Self {
        MigrateError::Source {
            context: context.into(),
            source,
        }
    }

    /// Create a Target error for a failed target query.
    pub fn target_db(context: impl Into<String>, source: sqlx::Error) -> Self {
        MigrateError::Target {
            context: context.into(),
            source,
        }
    }

    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    pub fn write(kind: impl Into<String>, id: impl Into<String>, source: MigrateError) -> Self {
        MigrateError::Write {
            kind: kind.into(),
            id: id.into(),
            source: Box::new(source),
        }
    }

    pub fn mapping(kind: impl Into<String>, source_id: i64, message: impl Into<String>) -> Self {
        MigrateError::Mapping {
            kind: kind.into(),
            source_id,
            message: message.into(),
        }
    }

    pub fn blob(key: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::Blob {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Wrap a pass failure with the entity kind it happened in.
    pub fn entity(kind: impl Into<String>, source: MigrateError) -> Self {
        MigrateError::Entity {
            kind: kind.into(),
            source: Box::new(source),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) => 2,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
