use colored::Colorize;
use itertools::Itertools;

use super::ir::{Chunk, Expr, Program, Stmt, TempId};
use crate::{index::Index, middle::frame::Access};

/// Renders every chunk of the program, function bodies one statement per line
pub fn pretty_print_program(program: &Program) -> String {
    program.to_string()
}

impl core::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for chunk in &self.chunks {
            write_chunk(f, chunk)?;
        }

        writeln!(f, "{} {}", "entry".magenta(), self.entry.to_string().blue())
    }
}

fn write_chunk(out: &mut std::fmt::Formatter<'_>, chunk: &Chunk) -> std::fmt::Result {
    match chunk {
        Chunk::Code { frame, body } => {
            writeln!(
                out,
                "{} {} {}",
                "fn".magenta(),
                frame.label.to_string().blue(),
                format!(
                    "[level {}, locals {}, params {}, outgoing {}, size {}]",
                    frame.static_level,
                    frame.locals_size,
                    frame.params_size,
                    frame.outgoing_args_size,
                    frame.size()
                )
                .white()
            )?;

            let statements = match body {
                Stmt::Seq(statements) => statements.as_slice(),
                body => core::slice::from_ref(body),
            };

            for stmt in statements {
                match stmt {
                    Stmt::Label(_) => writeln!(out, "  {stmt}")?,
                    _ => writeln!(out, "    {stmt}")?,
                }
            }

            Ok(())
        }
        Chunk::Data { access, literal } => writeln!(
            out,
            "{} {} {} {}",
            "data".magenta(),
            access_label(access).blue(),
            format!("[{} bytes]", access.size()).white(),
            format!("{literal:?}").green()
        ),
        Chunk::Global { access } => writeln!(
            out,
            "{} {} {}",
            "global".magenta(),
            access_label(access).blue(),
            format!("[{} bytes]", access.size()).white()
        ),
    }
}

fn access_label(access: &Access) -> String {
    match access {
        Access::Global { label, .. } => label.to_string(),
        Access::Local { offset, .. } | Access::Parameter { offset, .. } => {
            format!("FP{offset:+}")
        }
    }
}

impl core::fmt::Display for TempId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format!("T{}", self.index()).yellow())
    }
}

impl core::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Constant(value) => write!(f, "{}", value.to_string().purple()),
            Expr::Name(label) => write!(f, "{}", label.to_string().blue()),
            Expr::Mem(address) => write!(f, "{}[{address}]", "MEM".cyan()),
            Expr::Temp(temp) => write!(f, "{temp}"),
            Expr::Binop { op, lhs, rhs } => {
                write!(f, "{}({lhs}, {rhs})", op.to_string().cyan())
            }
            Expr::Call { label, arguments } => write!(
                f,
                "{} {}({})",
                "CALL".cyan(),
                label.to_string().blue(),
                arguments.iter().join(", ")
            ),
            Expr::ESeq(stmt, expr) => write!(f, "{}({stmt}; {expr})", "ESEQ".red()),
        }
    }
}

impl core::fmt::Display for Stmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stmt::Move { dst, src } => write!(f, "{} {dst} {} {src}", "MOVE".cyan(), "<-".white()),
            Stmt::Exp(expr) => write!(f, "{} {expr}", "EXP".cyan()),
            Stmt::Seq(statements) => {
                write!(f, "{}{{{}}}", "SEQ".red(), statements.iter().join("; "))
            }
            Stmt::CJump {
                condition,
                positive,
                negative,
            } => write!(
                f,
                "{} {condition} {} {}",
                "CJUMP".cyan(),
                positive.to_string().blue(),
                negative.to_string().blue()
            ),
            Stmt::Jump(label) => write!(f, "{} {}", "JUMP".cyan(), label.to_string().blue()),
            Stmt::Label(label) => write!(f, "{}", format!("{label}:").bright_red()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::ir::BinaryOp,
        middle::{frame::FrameBuilder, label::Label},
    };

    fn plain(value: impl ToString) -> String {
        colored::control::set_override(false);
        value.to_string()
    }

    #[test]
    fn expressions_print_as_prefix_trees() {
        let expr = Expr::mem(Expr::binop(
            BinaryOp::Add,
            Expr::frame_pointer(),
            Expr::Constant(-8),
        ));

        assert_eq!(plain(expr), "MEM[ADD({FP}, -8)]");
    }

    #[test]
    fn calls_list_their_arguments() {
        let stmt = Stmt::move_to(
            Expr::Temp(TempId::new(2)),
            Expr::Call {
                label: Label::named("f"),
                arguments: vec![Expr::Constant(0), Expr::Temp(TempId::new(1))],
            },
        );

        assert_eq!(plain(stmt), "MOVE T2 <- CALL f(0, T1)");
    }

    #[test]
    fn programs_list_chunks_then_the_entry() {
        let program = Program {
            chunks: vec![
                Chunk::Global {
                    access: Access::Global {
                        size: 16,
                        label: Label::named("pair"),
                    },
                },
                Chunk::Code {
                    frame: FrameBuilder::new(Label::named("main"), 1).build(),
                    body: Stmt::Seq(vec![
                        Stmt::Label(Label::Anonymous(0)),
                        Stmt::Jump(Label::Anonymous(0)),
                    ]),
                },
            ],
            entry: Label::named("main"),
        };

        assert_eq!(
            plain(&program),
            "global pair [16 bytes]\n\
             fn main [level 1, locals 0, params 8, outgoing 0, size 8]\n\
             \x20 L0:\n\
             \x20   JUMP L0\n\
             entry main\n"
        );
        assert_eq!(pretty_print_program(&program), program.to_string());
    }
}
