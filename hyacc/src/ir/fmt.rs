//! Pretty-print helpers for operations, regions and attribute maps.
//!
//! Device tags are interned, so every helper takes the [`DeviceRegistry`] that
//! owns them.
use std::fmt::{Formatter, Result as FmtResult};

use crate::{
    device::DeviceRegistry,
    ir::{ForOp, GenericOp, LoopOp, Operation, Region, ScopeOp, terminator::Terminator},
    resolve::AttributeMap,
};

const INDENT: usize = 2;

fn indent(f: &mut Formatter<'_>, level: usize) -> FmtResult {
    write!(f, "{:width$}", "", width = level * INDENT)
}

fn write_generic(f: &mut Formatter<'_>, op: &GenericOp) -> FmtResult {
    if let Some(result) = op.result {
        write!(f, "{} = ", result)?;
    }
    write!(f, "{}", op.name)?;

    let mut first = true;
    for operand in &op.operands {
        if first {
            first = false;
            write!(f, " ")?;
        } else {
            write!(f, ", ")?;
        }
        write!(f, "{}", operand)?;
    }

    if let Some(ty) = &op.ty {
        write!(f, " : {}", ty)?;
    }
    Ok(())
}

/// Write the operations of `region` one per line, then its terminator unless
/// `elide_yield` is set and the terminator is a plain `cir.yield`.
fn write_region(
    f: &mut Formatter<'_>,
    registry: &DeviceRegistry,
    region: &Region,
    level: usize,
    elide_yield: bool,
) -> FmtResult {
    for op in &region.ops {
        write_op(f, registry, op, level)?;
    }

    if !(elide_yield && matches!(region.terminator, Terminator::Yield(_))) {
        indent(f, level)?;
        writeln!(f, "{}", region.terminator)?;
    }
    Ok(())
}

fn write_scope(
    f: &mut Formatter<'_>,
    registry: &DeviceRegistry,
    scope: &ScopeOp,
    level: usize,
) -> FmtResult {
    writeln!(f, "cir.scope {{")?;
    write_region(f, registry, &scope.body, level + 1, true)?;
    indent(f, level)?;
    writeln!(f, "}} {}", scope.loc)
}

fn write_for(
    f: &mut Formatter<'_>,
    registry: &DeviceRegistry,
    for_op: &ForOp,
    level: usize,
) -> FmtResult {
    writeln!(f, "cir.for : cond {{")?;
    write_region(f, registry, &for_op.cond, level + 1, false)?;
    indent(f, level)?;
    writeln!(f, "}} body {{")?;
    write_region(f, registry, &for_op.body, level + 1, false)?;
    indent(f, level)?;
    writeln!(f, "}} step {{")?;
    write_region(f, registry, &for_op.step, level + 1, false)?;
    indent(f, level)?;
    writeln!(f, "}} {}", for_op.loc)
}

fn write_attributes(
    f: &mut Formatter<'_>,
    registry: &DeviceRegistry,
    attributes: &AttributeMap,
) -> FmtResult {
    write!(f, "{{")?;
    let mut first_attr = true;
    for (kind, devices) in attributes.iter() {
        if first_attr {
            first_attr = false;
        } else {
            write!(f, ", ")?;
        }

        write!(f, "{} = [", kind.attr_name())?;
        let mut first = true;
        for device in devices {
            if first {
                first = false;
            } else {
                write!(f, ", ")?;
            }
            write!(f, "{}", registry.fmt(*device))?;
        }
        write!(f, "]")?;
    }
    write!(f, "}}")
}

fn write_loop(
    f: &mut Formatter<'_>,
    registry: &DeviceRegistry,
    loop_op: &LoopOp,
    level: usize,
) -> FmtResult {
    writeln!(f, "acc.loop {{")?;
    write_region(f, registry, &loop_op.region, level + 1, false)?;
    indent(f, level)?;
    write!(f, "}}")?;

    // A loop without modifiers carries no attribute dictionary at all
    if !loop_op.attributes.is_empty() {
        write!(f, " attributes ")?;
        write_attributes(f, registry, &loop_op.attributes)?;
    }
    writeln!(f, " {}", loop_op.loc)
}

fn write_op(
    f: &mut Formatter<'_>,
    registry: &DeviceRegistry,
    op: &Operation,
    level: usize,
) -> FmtResult {
    indent(f, level)?;
    match op {
        Operation::Generic(generic) => {
            write_generic(f, generic)?;
            writeln!(f)
        }
        Operation::Scope(scope) => write_scope(f, registry, scope, level),
        Operation::For(for_op) => write_for(f, registry, for_op, level),
        Operation::Loop(loop_op) => write_loop(f, registry, loop_op, level),
    }
}

impl AttributeMap {
    /// Build a formatting helper rendering the map as an attribute dictionary,
    /// e.g. `{seq = [#acc.device_type<none>]}`.
    pub fn fmt<'a>(&'a self, registry: &'a DeviceRegistry) -> impl std::fmt::Display + 'a {
        struct Fmt<'a> {
            attributes: &'a AttributeMap,
            registry: &'a DeviceRegistry,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                write_attributes(f, self.registry, self.attributes)
            }
        }

        Fmt {
            attributes: self,
            registry,
        }
    }
}

impl Operation {
    /// Build a formatting helper that renders the operation, and everything
    /// nested in it, in textual form.
    pub fn fmt<'a>(&'a self, registry: &'a DeviceRegistry) -> impl std::fmt::Display + 'a {
        struct Fmt<'a> {
            op: &'a Operation,
            registry: &'a DeviceRegistry,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                write_op(f, self.registry, self.op, 0)
            }
        }

        Fmt { op: self, registry }
    }
}

impl LoopOp {
    /// Build a formatting helper that renders the loop construct.
    ///
    /// ```text
    /// acc.loop {
    ///   cir.scope {
    ///     ..
    ///     cir.for : cond {
    ///       ..
    ///       cir.condition(%4)
    ///     } body {
    ///       cir.scope {
    ///         ..
    ///       } loc(..)
    ///       cir.yield
    ///     } step {
    ///       ..
    ///       cir.yield
    ///     } loc(..)
    ///   } loc(..)
    ///   acc.yield
    /// } attributes {seq = [#acc.device_type<none>]} loc(..)
    /// ```
    pub fn fmt<'a>(&'a self, registry: &'a DeviceRegistry) -> impl std::fmt::Display + 'a {
        struct Fmt<'a> {
            loop_op: &'a LoopOp,
            registry: &'a DeviceRegistry,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                write_loop(f, self.registry, self.loop_op, 0)
            }
        }

        Fmt {
            loop_op: self,
            registry,
        }
    }
}
