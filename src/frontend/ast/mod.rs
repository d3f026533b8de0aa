use super::Span;
use crate::index::simple_index;

simple_index! {
    /// Identifies a node in the AST. Ids are unique within one compilation
    /// and are the keys of every side table the later phases produce.
    pub struct NodeId;
}

/// A list of definitions. The whole program is one of these, and so is the
/// definition part of every `where` expression.
#[derive(Debug, Clone)]
pub struct Defs {
    pub id: NodeId,
    pub span: Span,
    pub definitions: Vec<Def>,
}

#[derive(Debug, Clone)]
pub struct Def {
    pub id: NodeId,
    pub span: Span,
    pub kind: DefKind,
}

impl Def {
    pub fn name(&self) -> &str {
        match &self.kind {
            DefKind::Var(var) => &var.name,
            DefKind::Fun(fun) => &fun.name,
            DefKind::Type(ty) => &ty.name,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DefKind {
    Var(VarDef),
    Fun(FunDef),
    Type(TypeDef),
}

#[derive(Debug, Clone)]
pub struct VarDef {
    pub name: String,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct FunDef {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub result: TypeExpr,
    pub body: Expr,
}

#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: String,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Binary {
        lhs: Box<Expr>,
        operator: BinaryOperatorKind,
        rhs: Box<Expr>,
    },
    Unary {
        operator: UnaryOperatorKind,
        operand: Box<Expr>,
    },
    Literal(Literal),
    Name(String),
    Call {
        name: String,
        arguments: Vec<Expr>,
    },
    /// `{ e1; e2; ...; en }`, the value is the value of `en`
    Block(Vec<Expr>),
    If {
        condition: Box<Expr>,
        positive: Box<Expr>,
        negative: Option<Box<Expr>>,
    },
    While {
        condition: Box<Expr>,
        body: Box<Expr>,
    },
    /// `for counter = low, high, step: body`
    For {
        counter: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        step: Box<Expr>,
        body: Box<Expr>,
    },
    /// `{ expr where defs }`
    Where {
        defs: Defs,
        expr: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Integer(i64),
    Logical(bool),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum BinaryOperatorKind {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulus,
    #[strum(serialize = "&")]
    And,
    #[strum(serialize = "|")]
    Or,
    #[strum(serialize = "==")]
    Equals,
    #[strum(serialize = "!=")]
    NotEquals,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = "<=")]
    LessThanOrEqualTo,
    #[strum(serialize = ">=")]
    GreaterThanOrEqualTo,
    #[strum(serialize = "=")]
    Assign,
    /// `array[index]`
    #[strum(serialize = "[]")]
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperatorClass {
    Arithmetic,
    Logical,
    Comparison,
    Assignment,
    Index,
}

impl BinaryOperatorKind {
    pub fn class(self) -> BinaryOperatorClass {
        match self {
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulus => {
                BinaryOperatorClass::Arithmetic
            }
            Self::And | Self::Or => BinaryOperatorClass::Logical,
            Self::Equals
            | Self::NotEquals
            | Self::LessThan
            | Self::GreaterThan
            | Self::LessThanOrEqualTo
            | Self::GreaterThanOrEqualTo => BinaryOperatorClass::Comparison,
            Self::Assign => BinaryOperatorClass::Assignment,
            Self::Index => BinaryOperatorClass::Index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum UnaryOperatorKind {
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Negate,
    #[strum(serialize = "!")]
    Not,
}

#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub id: NodeId,
    pub span: Span,
    pub kind: TypeExprKind,
}

#[derive(Debug, Clone)]
pub enum TypeExprKind {
    Atom(AtomKind),
    /// `arr[size] element`
    Array {
        size: usize,
        element: Box<TypeExpr>,
    },
    /// A reference to a type definition
    Name(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum AtomKind {
    Integer,
    Logical,
    String,
}
