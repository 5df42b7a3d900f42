//! SSA values and source locations.
use std::sync::Arc;

use strum::EnumIs;

/// SSA value produced by an operation and referenced by later ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Value(pub u32);

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Source location attached to structured operations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, EnumIs)]
pub enum Location {
    #[default]
    Unknown,
    FileLineCol {
        file: Arc<str>,
        line: u32,
        column: u32,
    },
}

impl Location {
    pub fn new(file: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        Location::FileLineCol {
            file: file.into(),
            line,
            column,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Unknown => write!(f, "loc(unknown)"),
            Location::FileLineCol { file, line, column } => {
                if f.alternate() {
                    write!(f, "{}:{}:{}", file, line, column)
                } else {
                    write!(f, "loc({:?}:{}:{})", file, line, column)
                }
            }
        }
    }
}
