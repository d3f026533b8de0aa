//! Translation of the annotated AST to IR.
//!
//! Every AST node is translated to either an IR expression or an IR
//! statement. Structured control flow becomes labels and jumps, variable
//! references become address computations (following static links for
//! variables of enclosing functions) and string literals become data chunks.
//! Once a function body is translated it is linearized by [`canon`] so the
//! code chunk only holds a flat list of statements.

use thiserror::Error;
use tracing::{debug, trace};

use super::{
    canon,
    ir::{BinaryOp, Chunk, Expr, Intrinsic, Program, Stmt, TempId},
};
use crate::{
    frontend::{
        Span,
        ast::{
            BinaryOperatorKind, Def, DefKind, Defs, Expr as AstExpr, ExprKind, FunDef, Literal,
            NodeId, UnaryOperatorKind,
        },
    },
    index::Index,
    middle::{
        annotations::{Annotations, NodeMap},
        frame::{Access, Frame, FrameLayout, WORD_SIZE},
        label::LabelGenerator,
        ty::Type,
    },
};

/// Value of blocks and bodies which end in a statement
pub const VOID_VALUE: i64 = 0;

#[derive(Debug, Error)]
pub enum LowerErrorKind {
    #[error("left-hand side of an assignment is not a storage location")]
    NotAssignable,
    #[error("index {index} is out of bounds for an array of size {size}")]
    IndexOutOfBounds { index: i64, size: usize },
    #[error("indexed expression is not an array")]
    NotAnArray,
    #[error("no frame was computed for function `{0}`")]
    MissingFrame(String),
    #[error("no access was computed for `{0}`")]
    MissingAccess(String),
    #[error("`{0}` is not bound to any definition")]
    MissingDefinition(String),
    #[error("node {0:?} has no resolved type")]
    MissingType(NodeId),
    #[error("`{name}` is defined on static level {defined}, deeper than the use on level {used}")]
    NegativeLevelDelta {
        name: String,
        defined: u32,
        used: u32,
    },
    #[error("entry function `{0}` is not defined at the top level")]
    MissingEntry(String),
}

#[derive(Debug, Error)]
#[error("{kind} at {span}")]
pub struct LowerError {
    pub kind: LowerErrorKind,
    pub span: Span,
    /// Where in the compiler the error was raised
    #[cfg(feature = "error-backtrace")]
    pub origin: &'static str,
}

impl LowerError {
    pub fn backtrace(&self) -> Option<&'static str> {
        #[cfg(feature = "error-backtrace")]
        return Some(self.origin);

        #[cfg(not(feature = "error-backtrace"))]
        return None;
    }
}

macro_rules! lower_error {
    ($kind:expr, $span:expr $(,)?) => {{
        LowerError {
            kind: $kind,
            span: $span,
            #[cfg(feature = "error-backtrace")]
            origin: concat!(module_path!(), " (at ", file!(), ":", line!(), ")"),
        }
    }};
}

/// Translates a whole program. `entry` names the top level function execution
/// starts in.
pub fn lower_program(
    defs: &Defs,
    annotations: &Annotations,
    layout: FrameLayout,
    entry: &str,
) -> Result<Program, LowerError> {
    let entry_def = defs
        .definitions
        .iter()
        .find(|def| matches!(&def.kind, DefKind::Fun(fun) if fun.name == entry))
        .ok_or_else(|| lower_error!(LowerErrorKind::MissingEntry(entry.to_owned()), defs.span))?;
    let entry = layout
        .frames
        .get(entry_def.id)
        .ok_or_else(|| lower_error!(LowerErrorKind::MissingFrame(entry.to_owned()), entry_def.span))?
        .label
        .clone();

    let mut context = LoweringContext {
        annotations,
        frames: &layout.frames,
        accesses: &layout.accesses,
        labels: layout.labels,
        next_temp: TempId::new(0),
        chunks: Vec::new(),
        static_level: 0,
    };

    context.lower_defs(defs)?;

    debug!(chunks = context.chunks.len(), %entry, "lowered program");

    Ok(Program {
        chunks: context.chunks,
        entry,
    })
}

/// The translation of one AST node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrNode {
    Expr(Expr),
    Stmt(Stmt),
}

impl IrNode {
    /// The node as a value. Statements evaluate to [`VOID_VALUE`].
    pub fn into_expr(self) -> Expr {
        match self {
            IrNode::Expr(expr) => expr,
            IrNode::Stmt(stmt) => Expr::eseq(stmt, Expr::Constant(VOID_VALUE)),
        }
    }

    /// The node evaluated only for its effect
    pub fn into_stmt(self) -> Stmt {
        match self {
            IrNode::Expr(expr) => Stmt::Exp(expr),
            IrNode::Stmt(stmt) => stmt,
        }
    }
}

struct LoweringContext<'a> {
    annotations: &'a Annotations,
    frames: &'a NodeMap<Frame>,
    accesses: &'a NodeMap<Access>,
    labels: LabelGenerator,
    next_temp: TempId,
    chunks: Vec<Chunk>,
    /// Level of the function whose body is being lowered, 0 outside functions
    static_level: u32,
}

impl LoweringContext<'_> {
    fn create_temp(&mut self) -> TempId {
        let prev = self.next_temp;
        self.next_temp.increment_by(1);
        prev
    }

    fn type_of(&self, expr: &AstExpr) -> Result<&Type, LowerError> {
        self.annotations
            .types
            .get(expr.id)
            .ok_or_else(|| lower_error!(LowerErrorKind::MissingType(expr.id), expr.span))
    }

    fn lower_defs(&mut self, defs: &Defs) -> Result<(), LowerError> {
        for def in &defs.definitions {
            self.lower_def(def)?;
        }

        Ok(())
    }

    fn lower_def(&mut self, def: &Def) -> Result<(), LowerError> {
        match &def.kind {
            DefKind::Var(var) => {
                let access = self.accesses.get(def.id).ok_or_else(|| {
                    lower_error!(LowerErrorKind::MissingAccess(var.name.clone()), def.span)
                })?;

                // locals live in their frame and need no chunk
                if let Access::Global { .. } = access {
                    self.chunks.push(Chunk::Global {
                        access: access.clone(),
                    });
                }

                Ok(())
            }
            DefKind::Fun(fun) => self.lower_fun(def, fun),
            DefKind::Type(_) => Ok(()),
        }
    }

    fn lower_fun(&mut self, def: &Def, fun: &FunDef) -> Result<(), LowerError> {
        let frame = self
            .frames
            .get(def.id)
            .ok_or_else(|| lower_error!(LowerErrorKind::MissingFrame(fun.name.clone()), def.span))?
            .clone();

        let outer_level = self.static_level;
        self.static_level = frame.static_level;

        let value = self.lower_expr(&fun.body)?.into_expr();
        // the result is handed back through the static link slot
        let body = Stmt::move_to(Expr::mem(Expr::frame_pointer()), value);
        let body = canon::linearize(body, &mut self.next_temp);

        self.static_level = outer_level;

        debug!(name = %fun.name, label = %frame.label, "lowered function");
        self.chunks.push(Chunk::Code { frame, body });

        Ok(())
    }

    fn lower_expr(&mut self, expr: &AstExpr) -> Result<IrNode, LowerError> {
        trace!(id = ?expr.id, "lowering expression");

        match &expr.kind {
            ExprKind::Literal(literal) => Ok(IrNode::Expr(self.lower_literal(literal))),
            ExprKind::Name(name) => self.lower_name(expr, name).map(IrNode::Expr),
            ExprKind::Unary { operator, operand } => {
                let operand = self.lower_expr(operand)?.into_expr();

                Ok(IrNode::Expr(match operator {
                    UnaryOperatorKind::Plus => operand,
                    UnaryOperatorKind::Negate => {
                        Expr::binop(BinaryOp::Sub, Expr::Constant(0), operand)
                    }
                    UnaryOperatorKind::Not => Expr::binop(BinaryOp::Sub, Expr::Constant(1), operand),
                }))
            }
            ExprKind::Binary { lhs, operator, rhs } => match operator {
                BinaryOperatorKind::Assign => self.lower_assignment(lhs, rhs, expr.span),
                BinaryOperatorKind::Index => self.lower_index(lhs, rhs).map(IrNode::Expr),
                _ => {
                    let Some(op) = BinaryOp::from_source(*operator) else {
                        unreachable!("{operator} is handled above")
                    };
                    let lhs = self.lower_expr(lhs)?.into_expr();
                    let rhs = self.lower_expr(rhs)?.into_expr();

                    Ok(IrNode::Expr(Expr::binop(op, lhs, rhs)))
                }
            },
            ExprKind::Call { name, arguments } => {
                self.lower_call(expr, name, arguments).map(IrNode::Expr)
            }
            ExprKind::Block(expressions) => self.lower_block(expressions),
            ExprKind::If {
                condition,
                positive,
                negative,
            } => self.lower_if(condition, positive, negative.as_deref()),
            ExprKind::While { condition, body } => self.lower_while(condition, body),
            ExprKind::For {
                counter,
                low,
                high,
                step,
                body,
            } => self.lower_for(counter, low, high, step, body),
            ExprKind::Where { defs, expr } => {
                self.lower_defs(defs)?;
                self.lower_expr(expr)
            }
        }
    }

    fn lower_literal(&mut self, literal: &Literal) -> Expr {
        match literal {
            Literal::Integer(value) => Expr::Constant(*value),
            Literal::Logical(value) => Expr::Constant(i64::from(*value)),
            Literal::String(value) => {
                let label = self.labels.next_anonymous();
                let access = Access::Global {
                    // includes the NUL terminator
                    size: value.len() as i64 + 1,
                    label: label.clone(),
                };

                self.chunks.push(Chunk::Data {
                    access,
                    literal: value.clone(),
                });

                Expr::Name(label)
            }
        }
    }

    /// Address of the storage described by `access`, as seen from the current
    /// function
    fn access_address(&self, access: &Access, name: &str, span: Span) -> Result<Expr, LowerError> {
        match access {
            Access::Global { label, .. } => Ok(Expr::Name(label.clone())),
            Access::Local {
                offset,
                static_level,
                ..
            }
            | Access::Parameter {
                offset,
                static_level,
                ..
            } => {
                let frame = self.enclosing_frame_pointer(*static_level, name, span)?;
                Ok(Expr::offset(frame, *offset))
            }
        }
    }

    /// Frame pointer of the function on `level`, reached from the current
    /// frame by following static links
    fn enclosing_frame_pointer(&self, level: u32, name: &str, span: Span) -> Result<Expr, LowerError> {
        let delta = self.static_level.checked_sub(level).ok_or_else(|| {
            lower_error!(
                LowerErrorKind::NegativeLevelDelta {
                    name: name.to_owned(),
                    defined: level,
                    used: self.static_level,
                },
                span,
            )
        })?;

        Ok(static_link_chain(delta))
    }

    fn lower_name(&mut self, expr: &AstExpr, name: &str) -> Result<Expr, LowerError> {
        let def = self
            .annotations
            .definitions
            .get(expr.id)
            .ok_or_else(|| lower_error!(LowerErrorKind::MissingDefinition(name.to_owned()), expr.span))?;
        let access = self
            .accesses
            .get(*def)
            .ok_or_else(|| lower_error!(LowerErrorKind::MissingAccess(name.to_owned()), expr.span))?;
        let address = self.access_address(access, name, expr.span)?;

        // an array is represented by the address of its first element. arrays
        // declared as variables are stored in place while array parameters
        // hold the address of the caller's array.
        Ok(match (self.type_of(expr)?.is_array(), access) {
            (true, Access::Parameter { .. }) => Expr::mem(address),
            (true, _) => address,
            (false, _) => Expr::mem(address),
        })
    }

    fn lower_index(&mut self, array: &AstExpr, index: &AstExpr) -> Result<Expr, LowerError> {
        let Type::Array { size, element } = self.type_of(array)?.clone() else {
            return Err(lower_error!(LowerErrorKind::NotAnArray, array.span));
        };

        if let ExprKind::Literal(Literal::Integer(value)) = index.kind
            && (value < 0 || value as usize >= size)
        {
            return Err(lower_error!(
                LowerErrorKind::IndexOutOfBounds { index: value, size },
                index.span,
            ));
        }

        let base = self.lower_expr(array)?.into_expr();
        let index = self.lower_expr(index)?.into_expr();
        let address = Expr::binop(
            BinaryOp::Add,
            base,
            Expr::binop(
                BinaryOp::Mul,
                index,
                Expr::Constant(element.size_in_bytes()),
            ),
        );

        // nested arrays are values too, which means addresses
        Ok(if element.is_array() {
            address
        } else {
            Expr::mem(address)
        })
    }

    fn lower_assignment(
        &mut self,
        lhs: &AstExpr,
        rhs: &AstExpr,
        span: Span,
    ) -> Result<IrNode, LowerError> {
        let ty = self.type_of(lhs)?.clone();

        if !ty.is_array() {
            let dst = self.lower_expr(lhs)?.into_expr();
            if !dst.is_assignable() {
                return Err(lower_error!(LowerErrorKind::NotAssignable, span));
            }
            let src = self.lower_expr(rhs)?.into_expr();

            return Ok(IrNode::Stmt(Stmt::move_to(dst, src)));
        }

        // arrays are copied word by word into the destination block
        let is_storage = match &lhs.kind {
            ExprKind::Name(_) => true,
            ExprKind::Binary { operator, .. } => *operator == BinaryOperatorKind::Index,
            _ => false,
        };
        if !is_storage {
            return Err(lower_error!(LowerErrorKind::NotAssignable, span));
        }

        let dst = self.create_temp();
        let src = self.create_temp();
        let mut statements = vec![
            Stmt::move_to(Expr::Temp(dst), self.lower_expr(lhs)?.into_expr()),
            Stmt::move_to(Expr::Temp(src), self.lower_expr(rhs)?.into_expr()),
        ];

        for offset in (0..ty.size_in_bytes()).step_by(WORD_SIZE as usize) {
            statements.push(Stmt::move_to(
                Expr::mem(Expr::offset(Expr::Temp(dst), offset)),
                Expr::mem(Expr::offset(Expr::Temp(src), offset)),
            ));
        }

        Ok(IrNode::Stmt(Stmt::Seq(statements)))
    }

    fn lower_call(
        &mut self,
        expr: &AstExpr,
        name: &str,
        arguments: &[AstExpr],
    ) -> Result<Expr, LowerError> {
        let frames = self.frames;
        let callee = match self.annotations.definitions.get(expr.id) {
            Some(def) => Some(frames.get(*def).ok_or_else(|| {
                lower_error!(LowerErrorKind::MissingFrame(name.to_owned()), expr.span)
            })?),
            None => None,
        };

        let (label, static_link) = match callee {
            Some(frame) => {
                // the callee is defined inside the function on the level right
                // above its own, top level functions have no enclosing frame
                let static_link = match frame.static_level {
                    1 => Expr::Constant(0),
                    level => self.enclosing_frame_pointer(level - 1, name, expr.span)?,
                };

                (frame.label.clone(), static_link)
            }
            None => {
                let intrinsic = name.parse::<Intrinsic>().map_err(|_| {
                    lower_error!(LowerErrorKind::MissingDefinition(name.to_owned()), expr.span)
                })?;

                (intrinsic.label(), Expr::Constant(0))
            }
        };

        let mut statements = Vec::with_capacity(arguments.len() + 1);
        let mut values = Vec::with_capacity(arguments.len() + 1);
        values.push(static_link);

        for argument in arguments {
            let value = self.lower_expr(argument)?.into_expr();
            let temp = self.create_temp();
            statements.push(Stmt::move_to(Expr::Temp(temp), value));
            values.push(Expr::Temp(temp));
        }

        // the callee's saved FP slot lies below its frame pointer, which will
        // be our current stack pointer
        if let Some(frame) = callee {
            statements.push(Stmt::move_to(
                Expr::mem(Expr::binop(
                    BinaryOp::Sub,
                    Expr::stack_pointer(),
                    Expr::Constant(frame.old_fp_offset()),
                )),
                Expr::frame_pointer(),
            ));
        }

        Ok(Expr::eseq(
            Stmt::Seq(statements),
            Expr::Call {
                label,
                arguments: values,
            },
        ))
    }

    fn lower_block(&mut self, expressions: &[AstExpr]) -> Result<IrNode, LowerError> {
        let Some((last, rest)) = expressions.split_last() else {
            return Ok(IrNode::Expr(Expr::Constant(VOID_VALUE)));
        };

        let mut statements = Vec::with_capacity(expressions.len());
        for expression in rest {
            statements.push(self.lower_expr(expression)?.into_stmt());
        }

        Ok(match self.lower_expr(last)? {
            IrNode::Expr(value) => IrNode::Expr(Expr::eseq(Stmt::Seq(statements), value)),
            IrNode::Stmt(stmt) => {
                statements.push(stmt);
                IrNode::Stmt(Stmt::Seq(statements))
            }
        })
    }

    fn lower_if(
        &mut self,
        condition: &AstExpr,
        positive: &AstExpr,
        negative: Option<&AstExpr>,
    ) -> Result<IrNode, LowerError> {
        let condition = self.lower_expr(condition)?.into_expr();
        let positive_label = self.labels.next_anonymous();
        let negative_label = negative.map(|_| self.labels.next_anonymous());
        let end_label = self.labels.next_anonymous();

        let mut statements = vec![
            Stmt::CJump {
                condition,
                positive: positive_label.clone(),
                negative: negative_label.clone().unwrap_or_else(|| end_label.clone()),
            },
            Stmt::Label(positive_label),
            self.lower_expr(positive)?.into_stmt(),
        ];

        if let (Some(negative), Some(negative_label)) = (negative, negative_label) {
            statements.push(Stmt::Jump(end_label.clone()));
            statements.push(Stmt::Label(negative_label));
            statements.push(self.lower_expr(negative)?.into_stmt());
        }

        statements.push(Stmt::Label(end_label));

        Ok(IrNode::Stmt(Stmt::Seq(statements)))
    }

    fn lower_while(&mut self, condition: &AstExpr, body: &AstExpr) -> Result<IrNode, LowerError> {
        let start_label = self.labels.next_anonymous();
        let body_label = self.labels.next_anonymous();
        let end_label = self.labels.next_anonymous();

        let condition = self.lower_expr(condition)?.into_expr();
        let body = self.lower_expr(body)?.into_stmt();

        Ok(IrNode::Stmt(Stmt::Seq(vec![
            Stmt::Label(start_label.clone()),
            Stmt::CJump {
                condition,
                positive: body_label.clone(),
                negative: end_label.clone(),
            },
            Stmt::Label(body_label),
            body,
            Stmt::Jump(start_label),
            Stmt::Label(end_label),
        ])))
    }

    fn lower_for(
        &mut self,
        counter: &AstExpr,
        low: &AstExpr,
        high: &AstExpr,
        step: &AstExpr,
        body: &AstExpr,
    ) -> Result<IrNode, LowerError> {
        let test_label = self.labels.next_anonymous();
        let body_label = self.labels.next_anonymous();
        let end_label = self.labels.next_anonymous();

        let counter_location = self.lower_expr(counter)?.into_expr();
        if !counter_location.is_assignable() {
            return Err(lower_error!(LowerErrorKind::NotAssignable, counter.span));
        }

        let low = self.lower_expr(low)?.into_expr();
        let high = self.lower_expr(high)?.into_expr();
        let step = self.lower_expr(step)?.into_expr();
        let body = self.lower_expr(body)?.into_stmt();

        Ok(IrNode::Stmt(Stmt::Seq(vec![
            Stmt::move_to(counter_location.clone(), low),
            Stmt::Label(test_label.clone()),
            Stmt::CJump {
                condition: Expr::binop(BinaryOp::Lt, counter_location.clone(), high),
                positive: body_label.clone(),
                negative: end_label.clone(),
            },
            Stmt::Label(body_label),
            body,
            Stmt::move_to(
                counter_location.clone(),
                Expr::binop(BinaryOp::Add, counter_location, step),
            ),
            Stmt::Jump(test_label),
            Stmt::Label(end_label),
        ])))
    }
}

/// Address of the frame `delta` static levels out from the current one. Each
/// step loads the static link stored at offset 0 of a frame.
pub fn static_link_chain(delta: u32) -> Expr {
    (0..delta).fold(Expr::frame_pointer(), |frame, _| Expr::mem(frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middle::label::Label;

    fn depth(mut expr: &Expr) -> u32 {
        let mut depth = 0;
        while let Expr::Mem(inner) = expr {
            depth += 1;
            expr = &**inner;
        }
        assert_eq!(expr, &Expr::frame_pointer());
        depth
    }

    #[test]
    fn static_link_chain_dereferences_once_per_level() {
        for delta in 0..5 {
            assert_eq!(depth(&static_link_chain(delta)), delta);
        }
    }

    #[test]
    fn statements_evaluate_to_the_void_value() {
        let node = IrNode::Stmt(Stmt::Jump(Label::Anonymous(0)));

        assert_eq!(
            node.into_expr(),
            Expr::eseq(Stmt::Jump(Label::Anonymous(0)), Expr::Constant(VOID_VALUE))
        );
    }
}
