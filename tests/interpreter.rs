mod common;

use common::{compile_program, run, run_program, sibling_calls};
use pinsc::{
    backend::{
        interpreter::{Interpreter, InterpreterConfig, RuntimeError},
        ir::{BinaryOp, Chunk, Expr, Intrinsic, Program, Stmt},
    },
    demos,
    frontend::{
        ast::{BinaryOperatorKind, Defs},
        builder::ProgramBuilder,
    },
    middle::{annotations::Annotations, frame::FrameBuilder, label::Label, ty::Type},
};
use pretty_assertions::assert_eq;
use rstest::rstest;

/// `fun main(): integer = body`
fn main_returning(build: impl FnOnce(&ProgramBuilder) -> pinsc::frontend::ast::Expr) -> (Defs, Annotations) {
    let b = ProgramBuilder::new();

    let main = b.signature("main", vec![], Type::Int);
    let body = build(&b);
    let main = b.fun(main, body);

    b.finish(vec![main])
}

#[rstest]
#[case(0, 1)]
#[case(1, 1)]
#[case(5, 120)]
#[case(10, 3_628_800)]
fn recursive_factorial(#[case] input: i64, #[case] expected: i64) {
    let (value, output) = run(demos::factorial(input)).unwrap();

    assert_eq!(value, expected);
    assert_eq!(output, format!("{expected}\n"));
}

#[test]
fn loops_run_the_expected_number_of_times() {
    let (value, output) = run(demos::loops(3)).unwrap();

    assert_eq!(value, 3);
    assert_eq!(output, "0\n1\n2\n3\n4\n0\n10\n20\n");
}

#[test]
fn while_false_never_runs() {
    let (value, output) = run(demos::loops(0)).unwrap();

    assert_eq!(value, 0);
    assert_eq!(output, "0\n1\n2\n3\n4\n");
}

#[test]
fn nested_functions_share_enclosing_variables() {
    let (value, output) = run(demos::counter(5)).unwrap();

    assert_eq!(output, "10\n");
    assert_eq!(value, 12);
}

#[test]
fn calls_to_siblings_of_enclosing_functions_find_their_frame() {
    assert_eq!(run(sibling_calls().program).unwrap(), (42, String::new()));
}

#[test]
fn arrays_are_copied_and_passed_by_reference() {
    let (value, output) = run(demos::array_sum()).unwrap();

    assert_eq!(output, "30\n-2\n");
    assert_eq!(value, 30);
}

#[test]
fn globals_keep_their_values_after_the_run() {
    let program = compile_program(&demos::array_sum());
    let mut interpreter = Interpreter::new(&program, &InterpreterConfig::default()).unwrap();
    interpreter.run().unwrap();

    let memory = interpreter.memory();
    let numbers = memory.address_of(&Label::named("numbers")).unwrap();
    let values = (0..5)
        .map(|i| memory.load(numbers + i * 8).unwrap())
        .collect::<Vec<_>>();

    assert_eq!(values, vec![0, 1, 4, 9, 16]);
}

#[test]
fn print_formats() {
    let (value, output) = run(demos::strings()).unwrap();

    assert_eq!(value, 0);
    assert_eq!(output, "\"hello\"\n\"hello\"\n\"world\"\ntrue\nfalse\n");
}

#[test]
fn seeded_random_numbers_are_reproducible() {
    let program = compile_program(&demos::random(7, 20));

    let first = run_program(&program, &InterpreterConfig::default()).unwrap();
    let second = run_program(
        &program,
        &InterpreterConfig {
            seed: Some(1234),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(first, second);

    let values = first
        .1
        .lines()
        .map(|line| line.parse::<i64>().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(values.len(), 20);
    assert!(values.iter().all(|value| (1..7).contains(value)));
    assert_eq!(first.0, *values.last().unwrap());
}

#[test]
fn empty_random_range_is_an_error() {
    let program = main_returning(|b| b.call_unresolved("rand_int", vec![b.int(3), b.int(3)]));

    assert!(matches!(
        run(program),
        Err(RuntimeError::EmptyRange { min: 3, max: 3 })
    ));
}

#[rstest]
#[case(BinaryOperatorKind::Divide)]
#[case(BinaryOperatorKind::Modulus)]
fn division_by_zero_is_an_error(#[case] operator: BinaryOperatorKind) {
    let program = main_returning(|b| {
        b.binary(
            b.int(1),
            operator,
            b.binary(b.int(2), BinaryOperatorKind::Subtract, b.int(2)),
        )
    });

    assert!(matches!(run(program), Err(RuntimeError::DivisionByZero)));
}

#[test]
fn conditions_must_be_logical() {
    let program = main_returning(|b| {
        b.block(vec![b.while_loop(b.int(2), b.int(0)), b.int(0)])
    });

    assert!(matches!(run(program), Err(RuntimeError::InvalidCondition(2))));
}

#[test]
fn intrinsic_argument_count_is_checked() {
    let program = main_returning(|b| {
        b.block(vec![
            b.call_unresolved("print_int", vec![b.int(1), b.int(2)]),
            b.int(0),
        ])
    });

    assert!(matches!(
        run(program),
        Err(RuntimeError::ArgumentCount {
            intrinsic: Intrinsic::PrintInt,
            expected: 1,
            found: 2
        })
    ));
}

#[test]
fn calling_a_label_without_code_is_an_error() {
    let program = Program {
        chunks: vec![Chunk::Code {
            frame: FrameBuilder::new(Label::named("main"), 1).build(),
            body: Stmt::Seq(vec![Stmt::move_to(
                Expr::mem(Expr::frame_pointer()),
                Expr::Call {
                    label: Label::named("nowhere"),
                    arguments: vec![Expr::Constant(0)],
                },
            )]),
        }],
        entry: Label::named("main"),
    };

    assert!(matches!(
        run_program(&program, &InterpreterConfig::default()),
        Err(RuntimeError::NotAFunction(label)) if label == Label::named("nowhere")
    ));
}

#[test]
fn non_linear_bodies_are_refused() {
    let program = Program {
        chunks: vec![Chunk::Code {
            frame: FrameBuilder::new(Label::named("main"), 1).build(),
            body: Stmt::Seq(vec![Stmt::Exp(Expr::eseq(
                Stmt::Seq(vec![]),
                Expr::Constant(0),
            ))]),
        }],
        entry: Label::named("main"),
    };

    assert!(matches!(
        run_program(&program, &InterpreterConfig::default()),
        Err(RuntimeError::NotLinearized(label)) if label == Label::named("main")
    ));
}

#[test]
fn calls_nested_in_expressions_are_refused() {
    let call = Expr::Call {
        label: Intrinsic::PrintInt.label(),
        arguments: vec![Expr::Constant(0), Expr::Constant(1)],
    };
    let program = Program {
        chunks: vec![Chunk::Code {
            frame: FrameBuilder::new(Label::named("main"), 1).build(),
            body: Stmt::Seq(vec![Stmt::move_to(
                Expr::mem(Expr::frame_pointer()),
                Expr::binop(BinaryOp::Add, call, Expr::Constant(1)),
            )]),
        }],
        entry: Label::named("main"),
    };

    assert!(matches!(
        run_program(&program, &InterpreterConfig::default()),
        Err(RuntimeError::NotLinearized(label)) if label == Label::named("main")
    ));
}

#[test]
fn entry_must_not_take_parameters() {
    let b = ProgramBuilder::new();

    let main = b.signature("main", vec![b.param("n", Type::Int)], Type::Int);
    let body = b.name(main.parameter(0));
    let main = b.fun(main, body);

    assert!(matches!(
        run(b.finish(vec![main])),
        Err(RuntimeError::EntryParameters(_))
    ));
}

#[rstest]
#[case(1024)]
#[case(64 * 1024)]
#[case(1024 * 1024)]
fn unbounded_recursion_overflows_the_stack(#[case] memory_size: usize) {
    let b = ProgramBuilder::new();

    let main = b.signature("main", vec![], Type::Int);
    let body = b.call(&main, vec![]);
    let main = b.fun(main, body);
    let program = compile_program(&b.finish(vec![main]));

    let config = InterpreterConfig {
        memory_size,
        seed: None,
    };

    assert!(matches!(
        run_program(&program, &config),
        Err(RuntimeError::StackOverflow)
    ));
}

#[test]
fn deep_recursion_is_limited_by_simulated_memory_only() {
    // a frame of fact takes 32 bytes
    assert!(run(demos::factorial(1500)).is_ok());
    assert!(matches!(
        run(demos::factorial(3000)),
        Err(RuntimeError::StackOverflow)
    ));
}

/// ```text
/// fun main(): integer = { i = index; a[i] } where
///     var a: arr[5] integer
///     var i: integer
/// ```
#[rstest]
#[case(1 << 20)]
#[case(-(1 << 20))]
#[case((i64::MAX - 65488) / 8)]
#[case(i64::MAX / 8)]
fn wild_array_indices_are_reported(#[case] index: i64) {
    let b = ProgramBuilder::new();

    let main = b.signature("main", vec![], Type::Int);
    let a = b.var("a", Type::array(5, Type::Int));
    let i = b.var("i", Type::Int);
    let body = b.block(vec![
        b.assign(b.name(&i), b.int(index)),
        b.index(b.name(&a), b.name(&i)),
    ]);
    let body = b.where_defs(body, vec![a, i]);
    let main = b.fun(main, body);

    assert!(matches!(
        run(b.finish(vec![main])),
        Err(RuntimeError::AddressOutOfBounds(_))
    ));
}
