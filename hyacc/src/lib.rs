//! Lowering of OpenACC `loop` directives into structured IR.
//!
//! A directive travels through the crate in a fixed order:
//!
//! 1. [`clause`] validates the raw clause records and interns device names in a
//!    [`device::DeviceRegistry`];
//! 2. [`grammar`] rejects clause combinations the directive forbids;
//! 3. [`resolve`] decides which device types every modifier applies to;
//! 4. [`lower`] wraps the lowered `for` statement into an `acc.loop` operation
//!    (see [`ir`]) carrying the resolved attributes.
//!
//! [`session::Session`] drives these steps for one compilation unit. The
//! optional [`parser`] module reads clause lists and printed attribute
//! dictionaries from text.

pub mod clause;
pub mod config;
pub mod device;
pub mod grammar;
pub mod ir;
pub mod lower;
#[cfg(feature = "chumsky")]
pub mod parser;
pub mod resolve;
pub mod session;
pub mod utils;
