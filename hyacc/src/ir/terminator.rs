//! Region terminators.
//!
//! Every region of the structured loop ends with exactly one terminator. The
//! condition region hands a boolean back to its parent loop, the other regions
//! yield control without values.
use auto_enums::auto_enum;
use strum::EnumIs;

use crate::ir::operand::Value;

/// `cir.condition(%v)`: ends a loop condition region.
///
/// The loop continues while `cond` is true.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Condition {
    pub cond: Value,
}

/// `cir.yield`: ends a body or step region.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Yield;

/// `acc.yield`: ends the region of an `acc.loop`, returning control to the
/// enclosing region.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct AccYield;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, EnumIs)]
pub enum Terminator {
    Condition(Condition),
    Yield(Yield),
    AccYield(AccYield),
}

impl Terminator {
    pub fn opname(&self) -> &'static str {
        match self {
            Terminator::Condition(_) => "cir.condition",
            Terminator::Yield(_) => "cir.yield",
            Terminator::AccYield(_) => "acc.yield",
        }
    }

    #[auto_enum(Iterator)]
    pub fn operands(&self) -> impl Iterator<Item = Value> + '_ {
        match self {
            Terminator::Condition(condition) => std::iter::once(condition.cond),
            Terminator::Yield(_) => std::iter::empty(),
            Terminator::AccYield(_) => std::iter::empty(),
        }
    }
}

impl std::fmt::Display for Terminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Terminator::Condition(condition) => {
                write!(f, "{}({})", self.opname(), condition.cond)
            }
            Terminator::Yield(_) | Terminator::AccYield(_) => write!(f, "{}", self.opname()),
        }
    }
}

macro_rules! define_terminator_from {
    ($typ:ty, $variant:ident) => {
        impl From<$typ> for Terminator {
            fn from(term: $typ) -> Self {
                Terminator::$variant(term)
            }
        }
    };
}

define_terminator_from!(Condition, Condition);
define_terminator_from!(Yield, Yield);
define_terminator_from!(AccYield, AccYield);
