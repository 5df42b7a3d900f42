//! Structured loop lowering
//!
//! Wraps an already lowered `for` statement into an `acc.loop` construct:
//!
//! ```text
//! acc.loop {
//!   cir.scope {            // lifetime of the loop's init declarations
//!     <init>
//!     cir.for : cond { <cond> cir.condition(%c) }
//!              body { cir.scope { <body> } cir.yield }
//!              step { <step> cir.yield }
//!   }
//!   acc.yield
//! } attributes { <one entry per modifier kind> }
//! ```
//!
//! The statements themselves come from the expression code generator as a
//! [`LoopSkeleton`]. Missing pieces are rejected when the skeleton is built, so
//! [`lower_loop`] itself cannot fail.
use log::debug;

use crate::{
    ir::{
        ForOp, LoopOp, Operation, Region, ScopeOp,
        operand::{Location, Value},
        terminator::{AccYield, Condition, Yield},
    },
    resolve::AttributeMap,
    utils::{Error, Result},
};

/// The lowered pieces of a `for` statement.
///
/// Only constructible through [`LoopSkeletonBuilder`], which guarantees that
/// every region is present and that the loop condition is computed by the
/// condition region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSkeleton {
    init: Vec<Operation>,
    cond: Vec<Operation>,
    cond_value: Value,
    body: Vec<Operation>,
    step: Vec<Operation>,
    loc: Location,
}

impl LoopSkeleton {
    pub fn builder(loc: Location) -> LoopSkeletonBuilder {
        LoopSkeletonBuilder {
            loc,
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct LoopSkeletonBuilder {
    init: Vec<Operation>,
    cond: Option<(Vec<Operation>, Value)>,
    body: Option<Vec<Operation>>,
    step: Option<Vec<Operation>>,
    loc: Location,
}

impl LoopSkeletonBuilder {
    /// Statements of the `for` init clause, e.g. the induction variable's
    /// declaration. May be empty.
    pub fn init(mut self, ops: impl IntoIterator<Item = Operation>) -> Self {
        self.init = ops.into_iter().collect();
        self
    }

    /// Statements computing the loop condition and the boolean value the loop
    /// tests.
    pub fn cond(mut self, ops: impl IntoIterator<Item = Operation>, value: Value) -> Self {
        self.cond = Some((ops.into_iter().collect(), value));
        self
    }

    /// Statements of the loop body. An empty body (`for (..);`) is valid.
    pub fn body(mut self, ops: impl IntoIterator<Item = Operation>) -> Self {
        self.body = Some(ops.into_iter().collect());
        self
    }

    /// Statements of the increment expression.
    pub fn step(mut self, ops: impl IntoIterator<Item = Operation>) -> Self {
        self.step = Some(ops.into_iter().collect());
        self
    }

    /// Finish the skeleton, failing with [`Error::InternalConsistency`] when a
    /// region is missing or the condition value is not defined by the condition
    /// region.
    pub fn build(self) -> Result<LoopSkeleton> {
        let (cond, cond_value) = self
            .cond
            .ok_or_else(|| Error::internal("loop skeleton has no condition region"))?;
        let body = self
            .body
            .ok_or_else(|| Error::internal("loop skeleton has no body region"))?;
        let step = self
            .step
            .ok_or_else(|| Error::internal("loop skeleton has no step region"))?;

        let mut defined = Vec::new();
        for op in &cond {
            op.walk(&mut |op: &Operation| defined.extend(op.result()));
        }
        if !defined.contains(&cond_value) {
            return Err(Error::internal(format!(
                "loop condition {} is not computed by the condition region",
                cond_value
            )));
        }

        Ok(LoopSkeleton {
            init: self.init,
            cond,
            cond_value,
            body,
            step,
            loc: self.loc,
        })
    }
}

/// Build the `acc.loop` operation for `skeleton` carrying `attributes`.
///
/// `loc` is the source location of the directive. Structured operations created
/// for the loop statement itself are tagged with the skeleton's location.
pub fn lower_loop(skeleton: LoopSkeleton, attributes: AttributeMap, loc: Location) -> LoopOp {
    let LoopSkeleton {
        init,
        cond,
        cond_value,
        body,
        step,
        loc: stmt_loc,
    } = skeleton;

    debug!(
        "Lowering loop at {:#} with {} modifier attribute(s).",
        loc,
        attributes.len()
    );

    let body_scope = ScopeOp {
        body: Region::new(body, Yield),
        loc: stmt_loc.clone(),
    };

    let for_op = ForOp {
        cond: Region::new(cond, Condition { cond: cond_value }),
        body: Region::new(vec![body_scope.into()], Yield),
        step: Region::new(step, Yield),
        loc: stmt_loc.clone(),
    };

    let mut scope_ops = init;
    scope_ops.push(for_op.into());
    let outer_scope = ScopeOp {
        body: Region::new(scope_ops, Yield),
        loc: stmt_loc,
    };

    LoopOp {
        region: Region::new(vec![outer_scope.into()], AccYield),
        attributes,
        loc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::GenericOp;

    fn cond_ops() -> Vec<Operation> {
        vec![GenericOp::new("cir.const", []).with_result(Value(0)).with_type("!cir.bool").into()]
    }

    #[test]
    fn builder_requires_every_region() {
        let missing_cond = LoopSkeleton::builder(Location::Unknown)
            .body([])
            .step([])
            .build()
            .unwrap_err();
        assert!(missing_cond.is_internal_consistency());

        let missing_body = LoopSkeleton::builder(Location::Unknown)
            .cond(cond_ops(), Value(0))
            .step([])
            .build()
            .unwrap_err();
        assert!(missing_body.is_internal_consistency());

        let missing_step = LoopSkeleton::builder(Location::Unknown)
            .cond(cond_ops(), Value(0))
            .body([])
            .build()
            .unwrap_err();
        assert!(missing_step.is_internal_consistency());
    }

    #[test]
    fn condition_value_must_come_from_condition_region() {
        let err = LoopSkeleton::builder(Location::Unknown)
            .cond(cond_ops(), Value(7))
            .body([])
            .step([])
            .build()
            .unwrap_err();
        assert!(err.is_internal_consistency());
        assert!(!err.is_malformed_clause());
        assert!(err.is_fatal());
    }

    #[test]
    fn empty_body_lowers_to_valid_shape() {
        let skeleton = LoopSkeleton::builder(Location::new("t.cpp", 3, 3))
            .cond(cond_ops(), Value(0))
            .body([])
            .step([])
            .build()
            .unwrap();

        let op = lower_loop(skeleton, AttributeMap::default(), Location::new("t.cpp", 2, 9));
        op.verify().unwrap();
        assert!(op.attributes.is_empty());
        assert!(op.region.terminator.is_acc_yield());
        let for_op = op.for_op().unwrap();
        assert!(matches!(
            for_op.body.ops.as_slice(),
            [Operation::Scope(scope)] if scope.body.ops.is_empty()
        ));
    }
}
