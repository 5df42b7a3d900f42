//! Structured IR
//!
//! The operations produced when lowering an annotated loop. The IR is a tree of
//! operations owning single-block regions; each region ends with a
//! [`Terminator`]. Four operation kinds exist:
//!
//! - `GenericOp`: an already lowered statement coming from the expression code
//!   generator (loads, stores, arithmetic, ...). It is opaque to this crate.
//! - `ScopeOp` (`cir.scope`): introduces a lexical scope so that variables
//!   declared inside it have the right lifetime.
//! - `ForOp` (`cir.for`): the structured loop primitive with `cond`, `body` and
//!   `step` regions.
//! - `LoopOp` (`acc.loop`): the loop construct carrying the resolved modifier
//!   attributes.
use std::collections::BTreeSet;

use auto_enums::auto_enum;
use strum::EnumIs;

use crate::{
    ir::{
        operand::{Location, Value},
        terminator::Terminator,
    },
    resolve::AttributeMap,
    utils::{Error, Result},
};

pub mod fmt;
pub mod operand;
pub mod terminator;

/// A single-block region: a list of operations closed by a terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub ops: Vec<Operation>,
    pub terminator: Terminator,
}

impl Region {
    pub fn new(ops: Vec<Operation>, terminator: impl Into<Terminator>) -> Self {
        Self {
            ops,
            terminator: terminator.into(),
        }
    }

    /// Values defined by the operations of this region and of all regions
    /// nested in it, in definition order.
    pub fn defined_values(&self) -> Vec<Value> {
        let mut values = Vec::new();
        for op in &self.ops {
            op.walk(&mut |op: &Operation| values.extend(op.result()));
        }
        values
    }

    /// First operand of the terminator that no operation of this region
    /// defines.
    pub fn undefined_terminator_operand(&self) -> Option<Value> {
        let defined = self.defined_values();
        self.terminator
            .operands()
            .find(|value| !defined.contains(value))
    }
}

/// An opaque, already lowered statement.
///
/// ```text
/// %3 = cir.load %0 : !s32i
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericOp {
    pub result: Option<Value>,
    pub name: String,
    pub operands: Vec<Value>,
    /// Trailing type annotation, printed after ` : ` when present.
    pub ty: Option<String>,
}

impl GenericOp {
    pub fn new(name: impl Into<String>, operands: impl IntoIterator<Item = Value>) -> Self {
        Self {
            result: None,
            name: name.into(),
            operands: operands.into_iter().collect(),
            ty: None,
        }
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_type(mut self, ty: impl Into<String>) -> Self {
        self.ty = Some(ty.into());
        self
    }
}

/// `cir.scope { .. }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeOp {
    pub body: Region,
    pub loc: Location,
}

/// `cir.for : cond { .. } body { .. } step { .. }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForOp {
    pub cond: Region,
    pub body: Region,
    pub step: Region,
    pub loc: Location,
}

/// `acc.loop { .. } attributes { .. }`
///
/// Built by [`crate::lower::lower_loop`]. The region holds exactly one
/// [`ScopeOp`] wrapping the loop's init statements and its [`ForOp`], and ends
/// with [`Terminator::AccYield`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOp {
    pub region: Region,
    pub attributes: AttributeMap,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIs)]
pub enum Operation {
    Generic(GenericOp),
    Scope(ScopeOp),
    For(ForOp),
    Loop(LoopOp),
}

impl Operation {
    pub fn opname(&self) -> &str {
        match self {
            Operation::Generic(op) => &op.name,
            Operation::Scope(_) => "cir.scope",
            Operation::For(_) => "cir.for",
            Operation::Loop(_) => "acc.loop",
        }
    }

    pub fn result(&self) -> Option<Value> {
        match self {
            Operation::Generic(op) => op.result,
            _ => None,
        }
    }

    #[auto_enum(Iterator)]
    pub fn regions(&self) -> impl Iterator<Item = &Region> + '_ {
        match self {
            Operation::Generic(_) => std::iter::empty(),
            Operation::Scope(op) => std::iter::once(&op.body),
            Operation::For(op) => [&op.cond, &op.body, &op.step].into_iter(),
            Operation::Loop(op) => std::iter::once(&op.region),
        }
    }

    /// Visit this operation and every operation nested in it, pre-order.
    pub fn walk(&self, f: &mut impl FnMut(&Operation)) {
        f(self);
        for region in self.regions() {
            for op in &region.ops {
                op.walk(f);
            }
        }
    }
}

macro_rules! define_operation_from {
    ($typ:ty, $variant:ident) => {
        impl From<$typ> for Operation {
            fn from(op: $typ) -> Self {
                Operation::$variant(op)
            }
        }
    };
}

define_operation_from!(GenericOp, Generic);
define_operation_from!(ScopeOp, Scope);
define_operation_from!(ForOp, For);
define_operation_from!(LoopOp, Loop);

impl LoopOp {
    /// The `cir.for` nested in this loop construct, if the shape is intact.
    pub fn for_op(&self) -> Option<&ForOp> {
        match self.region.ops.as_slice() {
            [Operation::Scope(scope)] => match scope.body.ops.last() {
                Some(Operation::For(for_op)) => Some(for_op),
                _ => None,
            },
            _ => None,
        }
    }

    /// Verify the structural shape of the loop construct:
    /// 1) the region holds a single `cir.scope` and ends with `acc.yield`;
    /// 2) the scope ends with a `cir.for`;
    /// 3) `cond` ends with `cir.condition`, `body` is a single `cir.scope` and
    ///    `body`/`step` end with `cir.yield`;
    /// 4) every terminator operand is computed by the region it ends;
    /// 5) no value is defined twice.
    pub fn verify(&self) -> Result<()> {
        if !self.region.terminator.is_acc_yield() {
            return Err(Error::internal(format!(
                "`acc.loop` region must end with `acc.yield`, found `{}`",
                self.region.terminator.opname()
            )));
        }

        let scope = match self.region.ops.as_slice() {
            [Operation::Scope(scope)] => scope,
            _ => {
                return Err(Error::internal(
                    "`acc.loop` region must hold exactly one `cir.scope`",
                ));
            }
        };

        let for_op = match scope.body.ops.last() {
            Some(Operation::For(for_op)) => for_op,
            _ => {
                return Err(Error::internal(
                    "the scope of an `acc.loop` must end with a `cir.for`",
                ));
            }
        };

        if !for_op.cond.terminator.is_condition() {
            return Err(Error::internal(format!(
                "`cond` region must end with `cir.condition`, found `{}`",
                for_op.cond.terminator.opname()
            )));
        }

        if !matches!(for_op.body.ops.as_slice(), [Operation::Scope(_)]) {
            return Err(Error::internal(
                "`body` region must wrap its statements in a single `cir.scope`",
            ));
        }

        for (name, region) in [("body", &for_op.body), ("step", &for_op.step)] {
            if !region.terminator.is_yield() {
                return Err(Error::internal(format!(
                    "`{name}` region must end with `cir.yield`, found `{}`",
                    region.terminator.opname()
                )));
            }
        }

        let mut undefined = self.region.undefined_terminator_operand();
        for op in &self.region.ops {
            op.walk(&mut |op: &Operation| {
                for region in op.regions() {
                    if undefined.is_none() {
                        undefined = region.undefined_terminator_operand();
                    }
                }
            });
        }
        if let Some(value) = undefined {
            return Err(Error::internal(format!(
                "terminator operand {value} is not computed by its region"
            )));
        }

        let mut defined = BTreeSet::new();
        for value in self.region.defined_values() {
            if !defined.insert(value) {
                return Err(Error::internal(format!(
                    "value {value} is defined more than once"
                )));
            }
        }

        Ok(())
    }
}
