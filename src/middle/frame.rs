//! Activation records and variable accesses.
//!
//! A single walk over the AST lays out the frame of every function and decides
//! where every variable lives. Frames look like this (the stack grows towards
//! lower addresses):
//!
//! ```text
//!          |  parameter n        |  FP + 8n
//!          |  ...                |
//!          |  parameter 1        |  FP + 8
//!          |  static link/result |  FP + 0
//!   FP --> +---------------------+
//!          |  locals             |  FP - locals_size .. FP
//!          |  saved FP           |  FP - old_fp_offset
//!          |  outgoing arguments |  SP .. SP + outgoing_args_size
//!   SP --> +---------------------+
//! ```

use thiserror::Error;
use tracing::debug;

use crate::{
    frontend::{
        Span,
        ast::{Def, DefKind, Defs, Expr, ExprKind, NodeId},
    },
    middle::{
        annotations::{Annotations, NodeMap},
        label::{Label, LabelGenerator},
        ty::Type,
    },
};

/// Size of a machine word (and of every atom value) in bytes
pub const WORD_SIZE: i64 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub label: Label,
    /// Depth of function nesting. Top level functions are on level 1.
    pub static_level: u32,
    pub locals_size: i64,
    /// Always includes the static link
    pub params_size: i64,
    /// Largest argument area needed by any call made from this function
    pub outgoing_args_size: i64,
}

impl Frame {
    /// Distance from the frame pointer down to the slot holding the caller's
    /// frame pointer
    pub fn old_fp_offset(&self) -> i64 {
        self.locals_size + WORD_SIZE
    }

    /// Number of bytes the stack pointer moves down on entry
    pub fn size(&self) -> i64 {
        self.locals_size + WORD_SIZE + self.outgoing_args_size
    }
}

#[derive(Debug)]
pub struct FrameBuilder {
    label: Label,
    static_level: u32,
    locals_size: i64,
    params_size: i64,
    outgoing_args_size: i64,
}

impl FrameBuilder {
    /// Starts a frame with the static link already occupying the first
    /// parameter slot
    pub fn new(label: Label, static_level: u32) -> Self {
        Self {
            label,
            static_level,
            locals_size: 0,
            params_size: WORD_SIZE,
            outgoing_args_size: 0,
        }
    }

    pub fn static_level(&self) -> u32 {
        self.static_level
    }

    /// Returns the offset of the new parameter from the frame pointer
    pub fn add_parameter(&mut self, size: i64) -> i64 {
        let offset = self.params_size;
        self.params_size += size;
        offset
    }

    /// Returns the (negative) offset of the new local from the frame pointer
    pub fn add_local(&mut self, size: i64) -> i64 {
        self.locals_size += size;
        -self.locals_size
    }

    /// Registers a call with an argument area of `args_size` bytes (static
    /// link included)
    pub fn add_call(&mut self, args_size: i64) {
        self.outgoing_args_size = self.outgoing_args_size.max(args_size);
    }

    pub fn build(self) -> Frame {
        Frame {
            label: self.label,
            static_level: self.static_level,
            locals_size: self.locals_size,
            params_size: self.params_size,
            outgoing_args_size: self.outgoing_args_size,
        }
    }
}

/// Where the value of a variable or parameter lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// A labeled cell in static memory
    Global { size: i64, label: Label },
    /// `offset` bytes from the frame pointer of the function on `static_level`
    Local {
        size: i64,
        offset: i64,
        static_level: u32,
    },
    Parameter {
        size: i64,
        offset: i64,
        static_level: u32,
    },
}

impl Access {
    pub fn size(&self) -> i64 {
        match self {
            Access::Global { size, .. }
            | Access::Local { size, .. }
            | Access::Parameter { size, .. } => *size,
        }
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("no resolved type for node {node:?} at {span}")]
    MissingType { node: NodeId, span: Span },
}

/// Output of the frame pass
#[derive(Debug)]
pub struct FrameLayout {
    /// Function definition to its frame
    pub frames: NodeMap<Frame>,
    /// Variable definition or parameter to its access
    pub accesses: NodeMap<Access>,
    /// Continues numbering anonymous labels where the frame pass stopped
    pub labels: LabelGenerator,
}

pub fn evaluate_frames(defs: &Defs, annotations: &Annotations) -> Result<FrameLayout, FrameError> {
    let mut evaluator = FrameEvaluator {
        annotations,
        frames: NodeMap::new(),
        accesses: NodeMap::new(),
        labels: LabelGenerator::new(),
    };

    evaluator.visit_defs(defs, None)?;

    Ok(FrameLayout {
        frames: evaluator.frames,
        accesses: evaluator.accesses,
        labels: evaluator.labels,
    })
}

struct FrameEvaluator<'a> {
    annotations: &'a Annotations,
    frames: NodeMap<Frame>,
    accesses: NodeMap<Access>,
    labels: LabelGenerator,
}

impl FrameEvaluator<'_> {
    fn type_of(&self, node: NodeId, span: Span) -> Result<&Type, FrameError> {
        self.annotations
            .types
            .get(node)
            .ok_or(FrameError::MissingType { node, span })
    }

    /// `builder` is the frame of the innermost enclosing function, if any
    fn visit_defs(
        &mut self,
        defs: &Defs,
        mut builder: Option<&mut FrameBuilder>,
    ) -> Result<(), FrameError> {
        for def in &defs.definitions {
            self.visit_def(def, builder.as_deref_mut())?;
        }

        Ok(())
    }

    fn visit_def(&mut self, def: &Def, builder: Option<&mut FrameBuilder>) -> Result<(), FrameError> {
        match &def.kind {
            DefKind::Var(var) => {
                let size = self.type_of(def.id, def.span)?.size_in_bytes();

                let access = match builder {
                    None => Access::Global {
                        size,
                        label: Label::named(&var.name),
                    },
                    Some(builder) => Access::Local {
                        size,
                        offset: builder.add_local(size),
                        static_level: builder.static_level(),
                    },
                };

                debug!(name = %var.name, ?access, "allocated variable");
                self.accesses.store(def.id, access);
            }
            DefKind::Fun(fun) => {
                let static_level = builder.as_ref().map_or(0, |b| b.static_level()) + 1;
                let label = match builder {
                    None => Label::named(&fun.name),
                    Some(_) => self.labels.next_anonymous(),
                };

                let mut inner = FrameBuilder::new(label, static_level);

                for parameter in &fun.parameters {
                    let size = self
                        .type_of(parameter.id, parameter.span)?
                        .size_in_bytes_as_param();
                    let access = Access::Parameter {
                        size,
                        offset: inner.add_parameter(size),
                        static_level,
                    };
                    self.accesses.store(parameter.id, access);
                }

                self.visit_expr(&fun.body, Some(&mut inner))?;

                let frame = inner.build();
                debug!(name = %fun.name, ?frame, "built frame");
                self.frames.store(def.id, frame);
            }
            DefKind::Type(_) => {}
        }

        Ok(())
    }

    fn visit_expr(
        &mut self,
        expr: &Expr,
        mut builder: Option<&mut FrameBuilder>,
    ) -> Result<(), FrameError> {
        match &expr.kind {
            ExprKind::Binary { lhs, rhs, .. } => {
                self.visit_expr(lhs, builder.as_deref_mut())?;
                self.visit_expr(rhs, builder)
            }
            ExprKind::Unary { operand, .. } => self.visit_expr(operand, builder),
            ExprKind::Literal(_) | ExprKind::Name(_) => Ok(()),
            ExprKind::Call { arguments, .. } => {
                let mut args_size = WORD_SIZE;

                for argument in arguments {
                    self.visit_expr(argument, builder.as_deref_mut())?;
                    args_size += self
                        .type_of(argument.id, argument.span)?
                        .size_in_bytes_as_param();
                }

                if let Some(builder) = builder {
                    builder.add_call(args_size);
                }

                Ok(())
            }
            ExprKind::Block(expressions) => {
                for expression in expressions {
                    self.visit_expr(expression, builder.as_deref_mut())?;
                }

                Ok(())
            }
            ExprKind::If {
                condition,
                positive,
                negative,
            } => {
                self.visit_expr(condition, builder.as_deref_mut())?;
                self.visit_expr(positive, builder.as_deref_mut())?;

                match negative {
                    Some(negative) => self.visit_expr(negative, builder),
                    None => Ok(()),
                }
            }
            ExprKind::While { condition, body } => {
                self.visit_expr(condition, builder.as_deref_mut())?;
                self.visit_expr(body, builder)
            }
            ExprKind::For {
                counter,
                low,
                high,
                step,
                body,
            } => {
                for part in [counter, low, high, step, body] {
                    self.visit_expr(part, builder.as_deref_mut())?;
                }

                Ok(())
            }
            // a where block shares the frame of the function it appears in
            ExprKind::Where { defs, expr } => {
                self.visit_defs(defs, builder.as_deref_mut())?;
                self.visit_expr(expr, builder)
            }
        }
    }
}
