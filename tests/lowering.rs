mod common;

use common::{SiblingCalls, compile_program, sibling_calls};
use indoc::indoc;
use pinsc::{
    CompileError,
    backend::{
        ir::{Chunk, Expr, Program, Stmt},
        lowering::{LowerErrorKind, static_link_chain},
        pretty_print::pretty_print_program,
    },
    compile,
    demos::{self, Demo, ENTRY},
    frontend::{
        ast::{BinaryOperatorKind, Def, Defs},
        builder::ProgramBuilder,
    },
    middle::{annotations::Annotations, frame::evaluate_frames, label::Label, ty::Type},
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use strum::IntoEnumIterator;

fn lower_error(program: &(Defs, Annotations)) -> LowerErrorKind {
    match compile(&program.0, &program.1, ENTRY) {
        Err(CompileError::Lower(error)) => error.kind,
        other => panic!("expected a lowering error, got {other:?}"),
    }
}

/// `fun main(): integer = { a[index] = 1; 0 } where var a: arr[5] integer`
fn index_program(index: i64) -> (Defs, Annotations) {
    let b = ProgramBuilder::new();

    let main = b.signature("main", vec![], Type::Int);
    let a = b.var("a", Type::array(5, Type::Int));
    let body = b.block(vec![
        b.assign(b.index(b.name(&a), b.int(index)), b.int(1)),
        b.int(0),
    ]);
    let body = b.where_defs(body, vec![a]);
    let main = b.fun(main, body);

    b.finish(vec![main])
}

#[rstest]
#[case(0)]
#[case(4)]
fn literal_index_in_bounds_is_accepted(#[case] index: i64) {
    let program = index_program(index);

    assert!(compile(&program.0, &program.1, ENTRY).is_ok());
}

#[rstest]
#[case(5)]
#[case(17)]
#[case(-1)]
fn literal_index_out_of_bounds_is_rejected(#[case] index: i64) {
    assert!(matches!(
        lower_error(&index_program(index)),
        LowerErrorKind::IndexOutOfBounds { index: i, size: 5 } if i == index
    ));
}

#[test]
fn assigning_to_a_constant_is_rejected() {
    let b = ProgramBuilder::new();

    let main = b.signature("main", vec![], Type::Int);
    let body = b.block(vec![b.assign(b.int(3), b.int(4)), b.int(0)]);
    let main = b.fun(main, body);
    let program = b.finish(vec![main]);

    assert!(matches!(lower_error(&program), LowerErrorKind::NotAssignable));
}

#[test]
fn unknown_functions_are_rejected() {
    let b = ProgramBuilder::new();

    let main = b.signature("main", vec![], Type::Int);
    let body = b.call_unresolved("launch_missiles", vec![]);
    let main = b.fun(main, body);
    let program = b.finish(vec![main]);

    assert!(matches!(
        lower_error(&program),
        LowerErrorKind::MissingDefinition(name) if name == "launch_missiles"
    ));
}

#[test]
fn missing_entry_is_rejected() {
    let b = ProgramBuilder::new();
    let program = b.finish(vec![]);

    assert!(matches!(
        lower_error(&program),
        LowerErrorKind::MissingEntry(name) if name == "main"
    ));
}

#[test]
fn every_string_literal_gets_its_own_chunk() {
    let b = ProgramBuilder::new();

    let main = b.signature("main", vec![], Type::Int);
    let body = b.block(vec![
        b.call_unresolved("print_str", vec![b.string("same")]),
        b.call_unresolved("print_str", vec![b.string("same")]),
        b.call_unresolved("print_str", vec![b.string("other")]),
        b.int(0),
    ]);
    let main = b.fun(main, body);
    let program = compile_program(&b.finish(vec![main]));

    let labels = program
        .chunks
        .iter()
        .filter_map(|chunk| match chunk {
            Chunk::Data { access, literal } => Some((access.clone(), literal.as_str())),
            _ => None,
        })
        .collect::<Vec<_>>();

    assert_eq!(labels.len(), 3);
    assert_ne!(labels[0].0, labels[1].0);
    assert_eq!(labels[0].1, labels[1].1);
    assert_eq!(labels[0].0.size(), 5);
}

/// `main` on level 1 declares `x`, every deeper function calls the next one
/// and the innermost on level `depth` returns `x`
fn nested_program(depth: u32) -> (Defs, Annotations) {
    let b = ProgramBuilder::new();
    let x = b.var("x", Type::Int);

    let mut body = b.name(&x);
    let mut inner: Option<Def> = None;

    for level in (2..=depth).rev() {
        let signature = b.signature(&format!("f{level}"), vec![], Type::Int);
        let call = b.call(&signature, vec![]);
        let fun_body = match inner.take() {
            Some(def) => b.where_defs(b.block(vec![body]), vec![def]),
            None => body,
        };
        inner = Some(b.fun(signature, fun_body));
        body = call;
    }

    let main = b.signature("main", vec![], Type::Int);
    let defs = std::iter::once(x).chain(inner).collect();
    let main_body = b.where_defs(b.block(vec![body]), defs);
    let main = b.fun(main, main_body);

    b.finish(vec![main])
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
#[case(5)]
fn non_local_reads_follow_one_static_link_per_level(#[case] depth: u32) {
    let program = compile_program(&nested_program(depth));

    let innermost = program
        .chunks
        .iter()
        .find_map(|chunk| match chunk {
            Chunk::Code { frame, body } if frame.static_level == depth => Some(body),
            _ => None,
        })
        .unwrap();

    let x = Expr::mem(Expr::offset(static_link_chain(depth - 1), -8));
    assert_eq!(
        innermost,
        &Stmt::Seq(vec![Stmt::move_to(Expr::mem(Expr::frame_pointer()), x)])
    );
}

/// Callee and static link of every call in the body of `function`
fn static_links(program: &Program, function: &Label) -> Vec<(Label, Expr)> {
    program
        .chunks
        .iter()
        .filter_map(|chunk| match chunk {
            Chunk::Code {
                frame,
                body: Stmt::Seq(statements),
            } if frame.label == *function => Some(statements),
            _ => None,
        })
        .flatten()
        .filter_map(|stmt| match stmt {
            Stmt::Move {
                src: Expr::Call { label, arguments },
                ..
            }
            | Stmt::Exp(Expr::Call { label, arguments }) => {
                Some((label.clone(), arguments[0].clone()))
            }
            _ => None,
        })
        .collect()
}

#[test]
fn static_links_of_calls_skip_one_frame_per_level_difference() {
    let SiblingCalls { program, g, h, k } = sibling_calls();
    let layout = evaluate_frames(&program.0, &program.1).unwrap();
    let label = |id| layout.frames.get(id).unwrap().label.clone();
    let (g, h, k) = (label(g), label(h), label(k));

    let program = compile_program(&program);

    // main on level 1 calls its child h: its own frame pointer
    assert_eq!(
        static_links(&program, &Label::named(ENTRY)),
        vec![(h.clone(), static_link_chain(0))]
    );
    // h on level 2 calls itself (one link up to main) and its child k
    assert_eq!(
        static_links(&program, &h),
        vec![(h.clone(), static_link_chain(1)), (k.clone(), static_link_chain(0))]
    );
    // k on level 3 calls g, a child of main
    assert_eq!(
        static_links(&program, &k),
        vec![(g, Expr::mem(Expr::mem(Expr::frame_pointer())))]
    );
}

#[test]
fn every_demo_lowers_to_linear_code() {
    for demo in Demo::iter() {
        let program = compile_program(&demo.build());

        for chunk in &program.chunks {
            if let Chunk::Code { frame, body } = chunk {
                let Stmt::Seq(statements) = body else {
                    panic!("body of {} is not a sequence", frame.label);
                };
                assert!(
                    statements.iter().all(Stmt::is_linear),
                    "body of {} in {demo} is not linear",
                    frame.label
                );
            }
        }

        assert_eq!(program.entry, Label::named(ENTRY));
    }
}

#[test]
fn pretty_printed_program() {
    let b = ProgramBuilder::new();

    let main = b.signature("main", vec![], Type::Int);
    let body = b.binary(b.int(1), BinaryOperatorKind::Add, b.int(2));
    let main = b.fun(main, body);
    let program = compile_program(&b.finish(vec![main]));

    assert_eq!(
        strip_ansi_escapes::strip_str(pretty_print_program(&program)),
        indoc! {"
            fn main [level 1, locals 0, params 8, outgoing 0, size 8]
                MOVE MEM[{FP}] <- ADD(1, 2)
            entry main
        "}
    );
}

#[test]
fn pretty_printed_static_data() {
    let program = compile_program(&demos::strings());
    let listing = strip_ansi_escapes::strip_str(pretty_print_program(&program));

    assert_eq!(
        listing.lines().take(4).collect::<Vec<_>>(),
        vec![
            "global greeting [8 bytes]",
            "data L0 [6 bytes] \"hello\"",
            "data L1 [6 bytes] \"hello\"",
            "data L2 [6 bytes] \"world\"",
        ]
    );
}
