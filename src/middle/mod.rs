//! Information computed about the AST before any code is generated: the
//! tables handed over by the upstream phases, resolved types and the frame
//! layout of every function.

pub mod annotations;
pub mod frame;
pub mod label;
pub mod ty;
