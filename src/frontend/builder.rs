//! Programmatic construction of annotated programs.
//!
//! [`ProgramBuilder`] produces exactly what the parser, name resolver and type
//! checker would hand to the backend: an AST with unique node ids plus the
//! definition and type tables. It is used by the demo programs and the tests.
//! Nothing is validated, the caller is trusted to build well-formed programs.

use std::cell::{Cell, RefCell};

use super::{
    Span,
    ast::{
        AtomKind, BinaryOperatorClass, BinaryOperatorKind, Def, DefKind, Defs, Expr, ExprKind,
        FunDef, Literal, NodeId, Parameter, TypeDef, TypeExpr, TypeExprKind, UnaryOperatorKind,
        VarDef,
    },
};
use crate::{
    backend::ir::Intrinsic,
    index::Index,
    middle::{annotations::Annotations, ty::Type},
};

/// Anything a `Name` expression can refer to
pub trait Definition {
    fn definition_id(&self) -> NodeId;
    fn definition_name(&self) -> &str;
}

impl Definition for Def {
    fn definition_id(&self) -> NodeId {
        self.id
    }

    fn definition_name(&self) -> &str {
        self.name()
    }
}

impl Definition for Parameter {
    fn definition_id(&self) -> NodeId {
        self.id
    }

    fn definition_name(&self) -> &str {
        &self.name
    }
}

/// A function whose id is reserved but whose body does not exist yet, so it
/// can be called from its own body (or from siblings) before it is defined.
#[derive(Debug)]
pub struct FunSignature {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub parameters: Vec<Parameter>,
    result_type: TypeExpr,
    result: Type,
}

impl FunSignature {
    pub fn parameter(&self, index: usize) -> &Parameter {
        &self.parameters[index]
    }
}

#[derive(Debug)]
pub struct ProgramBuilder {
    next_id: Cell<usize>,
    span: Cell<Span>,
    annotations: RefCell<Annotations>,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            span: Cell::new(Span::at(1, 1)),
            annotations: RefCell::new(Annotations::default()),
        }
    }

    /// Every node built afterwards is reported at this position
    pub fn at(&self, line: u32, column: u32) -> &Self {
        self.span.set(Span::at(line, column));
        self
    }

    fn node(&self) -> (NodeId, Span) {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        (NodeId::new(id), self.span.get())
    }

    fn typed(&self, id: NodeId, ty: Type) {
        self.annotations.borrow_mut().types.store(id, ty);
    }

    fn type_of(&self, id: NodeId) -> Type {
        self.annotations
            .borrow()
            .types
            .get(id)
            .cloned()
            .unwrap_or(Type::Void)
    }

    fn expr(&self, kind: ExprKind, ty: Type) -> Expr {
        let (id, span) = self.node();
        self.typed(id, ty);
        Expr { id, span, kind }
    }

    /// Builds the type expression spelling out `ty`
    pub fn type_expr(&self, ty: &Type) -> TypeExpr {
        let (id, span) = self.node();
        let kind = match ty {
            Type::Int => TypeExprKind::Atom(AtomKind::Integer),
            Type::Log => TypeExprKind::Atom(AtomKind::Logical),
            Type::Str => TypeExprKind::Atom(AtomKind::String),
            Type::Array { size, element } => TypeExprKind::Array {
                size: *size,
                element: Box::new(self.type_expr(element)),
            },
            Type::Void | Type::Function { .. } => {
                unreachable!("{ty} can not be spelled out in source")
            }
        };
        self.typed(id, ty.clone());
        TypeExpr { id, span, kind }
    }

    /* Literals and names */

    pub fn int(&self, value: i64) -> Expr {
        self.expr(ExprKind::Literal(Literal::Integer(value)), Type::Int)
    }

    pub fn log(&self, value: bool) -> Expr {
        self.expr(ExprKind::Literal(Literal::Logical(value)), Type::Log)
    }

    pub fn string(&self, value: &str) -> Expr {
        self.expr(ExprKind::Literal(Literal::String(value.to_owned())), Type::Str)
    }

    pub fn name(&self, target: &impl Definition) -> Expr {
        let ty = self.type_of(target.definition_id());
        let expr = self.expr(ExprKind::Name(target.definition_name().to_owned()), ty);
        self.annotations
            .borrow_mut()
            .definitions
            .store(expr.id, target.definition_id());
        expr
    }

    /* Operators */

    pub fn binary(&self, lhs: Expr, operator: BinaryOperatorKind, rhs: Expr) -> Expr {
        let ty = match operator.class() {
            BinaryOperatorClass::Arithmetic => Type::Int,
            BinaryOperatorClass::Logical | BinaryOperatorClass::Comparison => Type::Log,
            BinaryOperatorClass::Assignment => Type::Void,
            BinaryOperatorClass::Index => match self.type_of(lhs.id) {
                Type::Array { element, .. } => (*element).clone(),
                _ => Type::Void,
            },
        };

        self.expr(
            ExprKind::Binary {
                lhs: Box::new(lhs),
                operator,
                rhs: Box::new(rhs),
            },
            ty,
        )
    }

    pub fn assign(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.binary(lhs, BinaryOperatorKind::Assign, rhs)
    }

    pub fn index(&self, array: Expr, index: Expr) -> Expr {
        self.binary(array, BinaryOperatorKind::Index, index)
    }

    pub fn unary(&self, operator: UnaryOperatorKind, operand: Expr) -> Expr {
        let ty = match operator {
            UnaryOperatorKind::Not => Type::Log,
            UnaryOperatorKind::Plus | UnaryOperatorKind::Negate => Type::Int,
        };

        self.expr(
            ExprKind::Unary {
                operator,
                operand: Box::new(operand),
            },
            ty,
        )
    }

    /* Calls */

    pub fn call(&self, callee: &FunSignature, arguments: Vec<Expr>) -> Expr {
        let expr = self.expr(
            ExprKind::Call {
                name: callee.name.clone(),
                arguments,
            },
            callee.result.clone(),
        );
        self.annotations
            .borrow_mut()
            .definitions
            .store(expr.id, callee.id);
        expr
    }

    /// A call the name resolver could not bind to a definition, which is how
    /// the built-in functions reach the backend
    pub fn call_unresolved(&self, name: &str, arguments: Vec<Expr>) -> Expr {
        let ty = match name.parse::<Intrinsic>() {
            Ok(Intrinsic::RandInt) => Type::Int,
            _ => Type::Void,
        };

        self.expr(
            ExprKind::Call {
                name: name.to_owned(),
                arguments,
            },
            ty,
        )
    }

    /* Compound expressions */

    pub fn block(&self, expressions: Vec<Expr>) -> Expr {
        let ty = expressions
            .last()
            .map(|e| self.type_of(e.id))
            .unwrap_or(Type::Void);
        self.expr(ExprKind::Block(expressions), ty)
    }

    pub fn if_then(&self, condition: Expr, positive: Expr) -> Expr {
        self.expr(
            ExprKind::If {
                condition: Box::new(condition),
                positive: Box::new(positive),
                negative: None,
            },
            Type::Void,
        )
    }

    pub fn if_else(&self, condition: Expr, positive: Expr, negative: Expr) -> Expr {
        self.expr(
            ExprKind::If {
                condition: Box::new(condition),
                positive: Box::new(positive),
                negative: Some(Box::new(negative)),
            },
            Type::Void,
        )
    }

    pub fn while_loop(&self, condition: Expr, body: Expr) -> Expr {
        self.expr(
            ExprKind::While {
                condition: Box::new(condition),
                body: Box::new(body),
            },
            Type::Void,
        )
    }

    pub fn for_loop(&self, counter: Expr, low: Expr, high: Expr, step: Expr, body: Expr) -> Expr {
        self.expr(
            ExprKind::For {
                counter: Box::new(counter),
                low: Box::new(low),
                high: Box::new(high),
                step: Box::new(step),
                body: Box::new(body),
            },
            Type::Void,
        )
    }

    /// `{ expr where definitions }`
    pub fn where_defs(&self, expr: Expr, definitions: Vec<Def>) -> Expr {
        let ty = self.type_of(expr.id);
        let defs = self.defs(definitions);
        self.expr(
            ExprKind::Where {
                defs,
                expr: Box::new(expr),
            },
            ty,
        )
    }

    /* Definitions */

    fn defs(&self, definitions: Vec<Def>) -> Defs {
        let (id, span) = self.node();
        Defs {
            id,
            span,
            definitions,
        }
    }

    pub fn var(&self, name: &str, ty: Type) -> Def {
        let type_expr = self.type_expr(&ty);
        let (id, span) = self.node();
        self.typed(id, ty);
        Def {
            id,
            span,
            kind: DefKind::Var(VarDef {
                name: name.to_owned(),
                ty: type_expr,
            }),
        }
    }

    pub fn type_def(&self, name: &str, ty: Type) -> Def {
        let type_expr = self.type_expr(&ty);
        let (id, span) = self.node();
        self.typed(id, ty);
        Def {
            id,
            span,
            kind: DefKind::Type(TypeDef {
                name: name.to_owned(),
                ty: type_expr,
            }),
        }
    }

    pub fn param(&self, name: &str, ty: Type) -> Parameter {
        let type_expr = self.type_expr(&ty);
        let (id, span) = self.node();
        self.typed(id, ty);
        Parameter {
            id,
            span,
            name: name.to_owned(),
            ty: type_expr,
        }
    }

    /// Reserves the definition of a function, see [`FunSignature`]
    pub fn signature(&self, name: &str, parameters: Vec<Parameter>, result: Type) -> FunSignature {
        let result_type = self.type_expr(&result);
        let (id, span) = self.node();
        let ty = Type::function(
            parameters.iter().map(|p| self.type_of(p.id)),
            result.clone(),
        );
        self.typed(id, ty);

        FunSignature {
            id,
            span,
            name: name.to_owned(),
            parameters,
            result_type,
            result,
        }
    }

    pub fn fun(&self, signature: FunSignature, body: Expr) -> Def {
        Def {
            id: signature.id,
            span: signature.span,
            kind: DefKind::Fun(FunDef {
                name: signature.name,
                parameters: signature.parameters,
                result: signature.result_type,
                body,
            }),
        }
    }

    /// Wraps up the top level definitions of the program
    pub fn finish(self, definitions: Vec<Def>) -> (Defs, Annotations) {
        let defs = self.defs(definitions);
        (defs, self.annotations.into_inner())
    }
}
