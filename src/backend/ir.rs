//! The intermediate representation. Expressions compute a word, statements
//! are executed for their effect. After lowering, every function body is a
//! single flat `Seq` of `Move`, `Exp`, `Jump`, `CJump` and `Label` statements
//! with no `ESeq` left inside any expression.

use strum::{EnumIter, EnumString};

use crate::{
    frontend::ast::BinaryOperatorKind,
    index::simple_index,
    middle::{
        frame::{Access, Frame},
        label::Label,
    },
};

simple_index! {
    /// A scratch register. Temporaries are local to one function activation.
    pub struct TempId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Eq,
    Neq,
    Lt,
    Gt,
    Leq,
    Geq,
}

impl BinaryOp {
    /// The IR operator computing a source operator, if there is a direct one
    pub fn from_source(kind: BinaryOperatorKind) -> Option<Self> {
        Some(match kind {
            BinaryOperatorKind::Add => Self::Add,
            BinaryOperatorKind::Subtract => Self::Sub,
            BinaryOperatorKind::Multiply => Self::Mul,
            BinaryOperatorKind::Divide => Self::Div,
            BinaryOperatorKind::Modulus => Self::Mod,
            BinaryOperatorKind::And => Self::And,
            BinaryOperatorKind::Or => Self::Or,
            BinaryOperatorKind::Equals => Self::Eq,
            BinaryOperatorKind::NotEquals => Self::Neq,
            BinaryOperatorKind::LessThan => Self::Lt,
            BinaryOperatorKind::GreaterThan => Self::Gt,
            BinaryOperatorKind::LessThanOrEqualTo => Self::Leq,
            BinaryOperatorKind::GreaterThanOrEqualTo => Self::Geq,
            BinaryOperatorKind::Assign | BinaryOperatorKind::Index => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Constant(i64),
    /// The address a label stands for
    Name(Label),
    /// The word stored at an address
    Mem(Box<Expr>),
    Temp(TempId),
    Binop {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// The first argument is always the static link
    Call {
        label: Label,
        arguments: Vec<Expr>,
    },
    /// Executes the statement, then evaluates the expression
    ESeq(Box<Stmt>, Box<Expr>),
}

impl Expr {
    pub fn mem(address: Expr) -> Self {
        Self::Mem(Box::new(address))
    }

    pub fn binop(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binop {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn eseq(stmt: Stmt, expr: Expr) -> Self {
        Self::ESeq(Box::new(stmt), Box::new(expr))
    }

    pub fn frame_pointer() -> Self {
        Self::Name(Label::frame_pointer())
    }

    pub fn stack_pointer() -> Self {
        Self::Name(Label::stack_pointer())
    }

    /// `base + offset`, folding away a zero offset
    pub fn offset(base: Expr, offset: i64) -> Self {
        if offset == 0 {
            base
        } else {
            Self::binop(BinaryOp::Add, base, Self::Constant(offset))
        }
    }

    /// Whether the value can be computed at any point without changing
    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_) | Self::Name(_))
    }

    pub fn is_assignable(&self) -> bool {
        matches!(self, Self::Mem(_) | Self::Temp(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `dst` is always a `Mem` or a `Temp`
    Move { dst: Expr, src: Expr },
    Exp(Expr),
    Seq(Vec<Stmt>),
    /// Jumps to `positive` if `condition` is 1 and to `negative` if it is 0
    CJump {
        condition: Expr,
        positive: Label,
        negative: Label,
    },
    Jump(Label),
    Label(Label),
}

impl Stmt {
    pub fn move_to(dst: Expr, src: Expr) -> Self {
        Self::Move { dst, src }
    }

    /// Whether the statement can appear in a linearized body. Calls may only
    /// be the whole source of a `Move` or the whole expression of an `Exp`,
    /// and their arguments may not contain calls.
    pub fn is_linear(&self) -> bool {
        fn pure(expr: &Expr) -> bool {
            match expr {
                Expr::Constant(_) | Expr::Name(_) | Expr::Temp(_) => true,
                Expr::Mem(address) => pure(address),
                Expr::Binop { lhs, rhs, .. } => pure(lhs) && pure(rhs),
                Expr::Call { .. } | Expr::ESeq(..) => false,
            }
        }

        fn call_or_pure(expr: &Expr) -> bool {
            match expr {
                Expr::Call { arguments, .. } => arguments.iter().all(pure),
                expr => pure(expr),
            }
        }

        match self {
            Stmt::Move { dst, src } => pure(dst) && call_or_pure(src),
            Stmt::Exp(expr) => call_or_pure(expr),
            Stmt::CJump { condition, .. } => pure(condition),
            Stmt::Jump(_) | Stmt::Label(_) => true,
            Stmt::Seq(_) => false,
        }
    }
}

/// The built-in functions. Calls to them are recognized by their reserved
/// label and executed natively by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Intrinsic {
    PrintInt,
    PrintStr,
    PrintLog,
    RandInt,
    Seed,
}

impl Intrinsic {
    /// Number of arguments, not counting the static link
    pub fn arity(self) -> usize {
        match self {
            Intrinsic::PrintInt | Intrinsic::PrintStr | Intrinsic::PrintLog | Intrinsic::Seed => 1,
            Intrinsic::RandInt => 2,
        }
    }

    pub fn from_label(label: &Label) -> Option<Self> {
        match label {
            Label::Named(name) => name.parse().ok(),
            Label::Anonymous(_) => None,
        }
    }

    pub fn label(self) -> Label {
        Label::named(self.to_string())
    }
}

/// A unit of compiled output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// A function body
    Code { frame: Frame, body: Stmt },
    /// A string constant
    Data { access: Access, literal: String },
    /// An uninitialized global variable
    Global { access: Access },
}

/// Everything the interpreter needs to run a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub chunks: Vec<Chunk>,
    /// Label of the function execution starts in
    pub entry: Label,
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn intrinsics_round_trip_through_their_labels() {
        for intrinsic in Intrinsic::iter() {
            assert_eq!(Intrinsic::from_label(&intrinsic.label()), Some(intrinsic));
        }

        assert_eq!(Intrinsic::from_label(&Label::named("main")), None);
        assert_eq!(Intrinsic::from_label(&Label::Anonymous(3)), None);
    }

    #[test]
    fn eseq_and_seq_are_not_linear() {
        let eseq = Stmt::Exp(Expr::eseq(Stmt::Seq(vec![]), Expr::Constant(1)));
        let nested = Stmt::Seq(vec![Stmt::Jump(Label::Anonymous(0))]);

        assert!(!eseq.is_linear());
        assert!(!nested.is_linear());
        assert!(Stmt::move_to(Expr::Temp(TempId(0)), Expr::Constant(1)).is_linear());
    }

    #[test]
    fn calls_are_only_linear_at_the_root() {
        let call = |arguments| Expr::Call {
            label: Label::named("f"),
            arguments,
        };

        assert!(Stmt::Exp(call(vec![Expr::Constant(0)])).is_linear());
        assert!(Stmt::move_to(Expr::Temp(TempId(0)), call(vec![Expr::Constant(0)])).is_linear());
        assert!(!Stmt::Exp(call(vec![call(vec![])])).is_linear());
        assert!(
            !Stmt::Exp(Expr::binop(BinaryOp::Add, call(vec![]), Expr::Constant(1))).is_linear()
        );
    }
}
