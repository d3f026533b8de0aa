//! The backend turns the annotated AST into IR and runs it.
//!
//! 1. [`lowering`] translates every function to tree IR, using the frames and
//!    accesses computed in [`crate::middle::frame`].
//! 2. [`canon`] linearizes each body into a flat list of statements.
//! 3. [`interpreter`] executes the resulting [`ir::Program`].

pub mod canon;
pub mod interpreter;
pub mod ir;
pub mod lowering;
pub mod pretty_print;
