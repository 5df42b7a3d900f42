#![allow(dead_code)]

use hyacc::{
    ir::{
        GenericOp, Operation,
        operand::{Location, Value},
    },
    lower::LoopSkeleton,
};

pub const FILE: &str = "loop.cpp";

// Values %0..%3 are the allocas of `A`, `B`, `C` and `N` in the enclosing
// function.
const ALLOCA_A: Value = Value(0);
const ALLOCA_B: Value = Value(1);
const ALLOCA_C: Value = Value(2);
const ALLOCA_N: Value = Value(3);

fn op(result: u32, name: &str, operands: &[Value], ty: &str) -> Operation {
    GenericOp::new(name, operands.iter().copied())
        .with_result(Value(result))
        .with_type(ty)
        .into()
}

fn store(value: Value, addr: Value) -> Operation {
    GenericOp::new("cir.store", [value, addr]).into()
}

/// Skeleton of
///
/// ```c++
/// for (unsigned I = 0u; I < N; ++I) {
///   A[I] = B[I] + C[I];
/// }
/// ```
pub fn sample_skeleton(line: u32) -> LoopSkeleton {
    let i = Value(4);

    LoopSkeleton::builder(Location::new(FILE, line, 3))
        .init([
            op(4, "cir.alloca", &[], "!cir.ptr<!u32i>"),
            op(5, "cir.const", &[], "!u32i"),
            store(Value(5), i),
        ])
        .cond(
            [
                op(6, "cir.load", &[i], "!u32i"),
                op(7, "cir.load", &[ALLOCA_N], "!s32i"),
                op(8, "cir.cast", &[Value(7)], "!u32i"),
                op(9, "cir.cmp", &[Value(6), Value(8)], "!cir.bool"),
            ],
            Value(9),
        )
        .body([
            op(10, "cir.load", &[ALLOCA_B], "!cir.ptr<!s32i>"),
            op(11, "cir.load", &[i], "!u32i"),
            op(12, "cir.ptr_stride", &[Value(10), Value(11)], "!cir.ptr<!s32i>"),
            op(13, "cir.load", &[Value(12)], "!s32i"),
            op(14, "cir.load", &[ALLOCA_C], "!cir.ptr<!s32i>"),
            op(15, "cir.ptr_stride", &[Value(14), Value(11)], "!cir.ptr<!s32i>"),
            op(16, "cir.load", &[Value(15)], "!s32i"),
            op(17, "cir.binop", &[Value(13), Value(16)], "!s32i"),
            op(18, "cir.load", &[ALLOCA_A], "!cir.ptr<!s32i>"),
            op(19, "cir.ptr_stride", &[Value(18), Value(11)], "!cir.ptr<!s32i>"),
            store(Value(17), Value(19)),
        ])
        .step([
            op(20, "cir.load", &[i], "!u32i"),
            op(21, "cir.unary", &[Value(20)], "!u32i"),
            store(Value(21), i),
        ])
        .build()
        .expect("sample skeleton is well formed")
}

/// Skeleton of `for (unsigned I = 0; I < N; ++I);`
pub fn empty_body_skeleton(line: u32) -> LoopSkeleton {
    let i = Value(4);

    LoopSkeleton::builder(Location::new(FILE, line, 3))
        .init([op(4, "cir.alloca", &[], "!cir.ptr<!u32i>")])
        .cond(
            [
                op(6, "cir.load", &[i], "!u32i"),
                op(7, "cir.load", &[ALLOCA_N], "!s32i"),
                op(9, "cir.cmp", &[Value(6), Value(7)], "!cir.bool"),
            ],
            Value(9),
        )
        .body([])
        .step([op(20, "cir.unary", &[i], "!u32i")])
        .build()
        .expect("empty body skeleton is well formed")
}

pub fn directive_loc(line: u32) -> Location {
    Location::new(FILE, line, 9)
}

/// A line expectation for [`check_lines`].
pub enum Check<'a> {
    /// Some later line contains the pattern.
    Later(&'a str),
    /// The line right after the previous match contains the pattern.
    Next(&'a str),
}

/// Match `checks` against the lines of `text` in order.
pub fn check_lines(text: &str, checks: &[Check<'_>]) {
    let lines: Vec<&str> = text.lines().collect();
    let mut cursor = 0usize;

    for check in checks {
        match check {
            Check::Later(pattern) => {
                let found = lines[cursor..]
                    .iter()
                    .position(|line| line.contains(pattern))
                    .unwrap_or_else(|| {
                        panic!("`{pattern}` not found after line {cursor} in:\n{text}")
                    });
                cursor += found + 1;
            }
            Check::Next(pattern) => {
                let index = cursor;
                let line = lines
                    .get(index)
                    .unwrap_or_else(|| panic!("expected `{pattern}` at line {index} in:\n{text}"));
                assert!(
                    line.contains(pattern),
                    "expected `{pattern}` at line {index}, found `{line}` in:\n{text}"
                );
                cursor = index + 1;
            }
        }
    }
}
