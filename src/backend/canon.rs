//! Linearization of IR trees.
//!
//! Pulls every `ESeq` up and out of the expressions it appears in and
//! flattens nested `Seq`s, so a function body becomes one flat list of
//! statements. Side effects keep their source order: whenever a statement has
//! to be hoisted over an expression which was supposed to run before it, the
//! expression's value is saved in a fresh temporary first. Calls are always
//! saved in a temporary unless they are the whole source of a `Move` to a
//! temporary or the whole expression of an `Exp`.

use tracing::trace;

use super::ir::{Expr, Stmt, TempId};
use crate::index::Index;

/// Linearizes `stmt`, allocating temporaries from `next_temp`
pub fn linearize(stmt: Stmt, next_temp: &mut TempId) -> Stmt {
    let mut canon = Canonicalizer { next_temp };
    let stmt = canon.do_stmt(stmt);

    let mut statements = Vec::new();
    flatten(stmt, &mut statements);

    trace!(statements = statements.len(), "linearized body");

    Stmt::Seq(statements)
}

fn flatten(stmt: Stmt, out: &mut Vec<Stmt>) {
    match stmt {
        Stmt::Seq(statements) => {
            for stmt in statements {
                flatten(stmt, out);
            }
        }
        // evaluating these has no effect at all
        Stmt::Exp(Expr::Constant(_) | Expr::Name(_) | Expr::Temp(_)) => {}
        stmt => out.push(stmt),
    }
}

struct Canonicalizer<'a> {
    next_temp: &'a mut TempId,
}

impl Canonicalizer<'_> {
    fn create_temp(&mut self) -> TempId {
        let prev = *self.next_temp;
        self.next_temp.increment_by(1);
        prev
    }

    fn do_stmt(&mut self, stmt: Stmt) -> Stmt {
        match stmt {
            Stmt::Seq(statements) => {
                Stmt::Seq(statements.into_iter().map(|s| self.do_stmt(s)).collect())
            }
            Stmt::Jump(_) | Stmt::Label(_) => stmt,
            Stmt::CJump {
                condition,
                positive,
                negative,
            } => {
                let (mut statements, [condition]) = self.reorder_n([condition]);
                statements.push(Stmt::CJump {
                    condition,
                    positive,
                    negative,
                });
                Stmt::Seq(statements)
            }
            Stmt::Move {
                dst: Expr::Temp(temp),
                src: Expr::Call { label, arguments },
            } => {
                let (mut statements, arguments) = self.reorder(arguments);
                statements.push(Stmt::move_to(
                    Expr::Temp(temp),
                    Expr::Call { label, arguments },
                ));
                Stmt::Seq(statements)
            }
            Stmt::Move {
                dst: Expr::Temp(temp),
                src,
            } => {
                let (mut statements, [src]) = self.reorder_n([src]);
                statements.push(Stmt::move_to(Expr::Temp(temp), src));
                Stmt::Seq(statements)
            }
            Stmt::Move {
                dst: Expr::Mem(address),
                src,
            } => {
                let (mut statements, [address, src]) = self.reorder_n([*address, src]);
                statements.push(Stmt::move_to(Expr::mem(address), src));
                Stmt::Seq(statements)
            }
            Stmt::Move {
                dst: Expr::ESeq(effect, dst),
                src,
            } => self.do_stmt(Stmt::Seq(vec![*effect, Stmt::move_to(*dst, src)])),
            Stmt::Move { dst, src } => {
                let (mut statements, [dst, src]) = self.reorder_n([dst, src]);
                statements.push(Stmt::move_to(dst, src));
                Stmt::Seq(statements)
            }
            Stmt::Exp(Expr::Call { label, arguments }) => {
                let (mut statements, arguments) = self.reorder(arguments);
                statements.push(Stmt::Exp(Expr::Call { label, arguments }));
                Stmt::Seq(statements)
            }
            Stmt::Exp(expr) => {
                let (mut statements, [expr]) = self.reorder_n([expr]);
                statements.push(Stmt::Exp(expr));
                Stmt::Seq(statements)
            }
        }
    }

    /// Splits `expr` into the statements to execute first and an `ESeq` free
    /// expression computing its value afterwards
    fn do_expr(&mut self, expr: Expr) -> (Vec<Stmt>, Expr) {
        match expr {
            Expr::Constant(_) | Expr::Name(_) | Expr::Temp(_) => (Vec::new(), expr),
            Expr::Mem(address) => {
                let (statements, [address]) = self.reorder_n([*address]);
                (statements, Expr::mem(address))
            }
            Expr::Binop { op, lhs, rhs } => {
                let (statements, [lhs, rhs]) = self.reorder_n([*lhs, *rhs]);
                (statements, Expr::binop(op, lhs, rhs))
            }
            Expr::Call { label, arguments } => {
                let (mut statements, arguments) = self.reorder(arguments);
                let temp = self.create_temp();
                statements.push(Stmt::move_to(
                    Expr::Temp(temp),
                    Expr::Call { label, arguments },
                ));
                (statements, Expr::Temp(temp))
            }
            Expr::ESeq(effect, expr) => {
                let mut statements = vec![self.do_stmt(*effect)];
                let (rest, expr) = self.do_expr(*expr);
                statements.extend(rest);
                (statements, expr)
            }
        }
    }

    fn reorder_n<const N: usize>(&mut self, expressions: [Expr; N]) -> (Vec<Stmt>, [Expr; N]) {
        let (statements, expressions) = self.reorder(expressions.into());
        match expressions.try_into() {
            Ok(expressions) => (statements, expressions),
            Err(_) => unreachable!("reordering keeps the number of expressions"),
        }
    }

    /// Hoists the side effects of `expressions` in front of all of them while
    /// keeping the order in which they would have been evaluated
    fn reorder(&mut self, expressions: Vec<Expr>) -> (Vec<Stmt>, Vec<Expr>) {
        let mut statements = Vec::new();
        let mut values = Vec::with_capacity(expressions.len());

        // walking backwards, `statements` holds the effects of everything to
        // the right of the current expression
        for expr in expressions.into_iter().rev() {
            let (mut effects, value) = self.do_expr(expr);

            if statements.is_empty() || value.is_constant() {
                values.push(value);
            } else {
                let temp = self.create_temp();
                effects.push(Stmt::move_to(Expr::Temp(temp), value));
                values.push(Expr::Temp(temp));
            }

            effects.append(&mut statements);
            statements = effects;
        }

        values.reverse();

        (statements, values)
    }
}
