use strum::EnumIs;
use thiserror::Error;

use crate::clause::ModifierKind;

/// A single diagnostic emitted by one of the textual readers in
/// [`crate::parser`].
///
/// `start` and `end` are byte offsets into the parsed source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParserError {
    pub message: String,
    pub start: usize,
    pub end: usize,
    pub file: Option<String>,
}

impl std::fmt::Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}..{}: {}", file, self.start, self.end, self.message),
            None => write!(f, "{}..{}: {}", self.start, self.end, self.message),
        }
    }
}

#[derive(Debug, EnumIs, Error)]
pub enum Error {
    /// A clause could not be turned into a [`crate::clause::ClauseItem`].
    ///
    /// `index` is the position of the offending clause within the directive's
    /// clause list when it is known.
    #[error("Malformed `{clause}` clause: {reason}.")]
    MalformedClause {
        index: Option<usize>,
        clause: String,
        reason: String,
    },

    /// Two mutually exclusive modifiers apply to the same device type.
    #[error(
        "Clauses `{first}` and `{second}` are mutually exclusive, \
         but both apply to device type `{device}`."
    )]
    ConflictingModifiers {
        first: ModifierKind,
        second: ModifierKind,
        device: String,
    },

    /// The input handed to the lowering stage breaks its contract. This is a
    /// compiler fault, not a user error.
    #[error("Internal consistency violation: {context}.")]
    InternalConsistency { context: String },

    /// One or more errors reported by the clause or attribute readers.
    #[error(
        "Failed to parse input ({} error(s)): {}",
        errors.len(),
        errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
    )]
    ParserErrors { errors: Vec<ParserError> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse lowering configuration '{file}': {source}")]
    ConfigParse {
        source: toml::de::Error,
        file: String,
    },

    #[error("Failed to serialize lowering configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Returns `true` when the error must abort the whole compilation unit
    /// rather than only the directive that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::InternalConsistency { .. })
    }

    pub(crate) fn internal(context: impl Into<String>) -> Self {
        Error::InternalConsistency {
            context: context.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
