#![allow(dead_code)]

use pinsc::{
    backend::{
        interpreter::{Interpreter, InterpreterConfig, RuntimeError},
        ir::Program,
    },
    compile,
    demos::ENTRY,
    frontend::{
        ast::{BinaryOperatorKind as Op, Defs, NodeId},
        builder::ProgramBuilder,
    },
    middle::{annotations::Annotations, ty::Type},
};

pub fn compile_program((defs, annotations): &(Defs, Annotations)) -> Program {
    compile(defs, annotations, ENTRY).expect("program should compile")
}

/// Runs `program` and returns the result of `main` together with everything
/// it printed
pub fn run_program(
    program: &Program,
    config: &InterpreterConfig,
) -> Result<(i64, String), RuntimeError> {
    let mut output = Vec::new();
    let value = Interpreter::new(program, config)?
        .with_output(&mut output)
        .run()?;

    Ok((value, String::from_utf8(output).expect("output is valid UTF-8")))
}

pub fn run(program: (Defs, Annotations)) -> Result<(i64, String), RuntimeError> {
    run_program(&compile_program(&program), &InterpreterConfig::default())
}

/// Functions calling siblings of their enclosing functions and themselves
pub struct SiblingCalls {
    pub program: (Defs, Annotations),
    pub g: NodeId,
    pub h: NodeId,
    pub k: NodeId,
}

/// ```text
/// fun main(): integer = { x = 41; h(3) + 1 } where
///     var x: integer
///     fun g(): integer = x
///     fun h(n: integer): integer = { if n > 0 then r = h(n - 1) else r = k(); r } where
///         var r: integer
///         fun k(): integer = g()
/// ```
pub fn sibling_calls() -> SiblingCalls {
    let b = ProgramBuilder::new();

    let x = b.var("x", Type::Int);

    let g = b.signature("g", vec![], Type::Int);
    let g_body = b.name(&x);

    let h = b.signature("h", vec![b.param("n", Type::Int)], Type::Int);
    let n = h.parameter(0).clone();
    let r = b.var("r", Type::Int);

    let k = b.signature("k", vec![], Type::Int);
    let k_body = b.call(&g, vec![]);

    let h_body = b.block(vec![
        b.if_else(
            b.binary(b.name(&n), Op::GreaterThan, b.int(0)),
            b.assign(
                b.name(&r),
                b.call(&h, vec![b.binary(b.name(&n), Op::Subtract, b.int(1))]),
            ),
            b.assign(b.name(&r), b.call(&k, vec![])),
        ),
        b.name(&r),
    ]);

    let main = b.signature(ENTRY, vec![], Type::Int);
    let main_body = b.block(vec![
        b.assign(b.name(&x), b.int(41)),
        b.binary(b.call(&h, vec![b.int(3)]), Op::Add, b.int(1)),
    ]);

    let (g_id, h_id, k_id) = (g.id, h.id, k.id);

    let h_body = b.where_defs(h_body, vec![r, b.fun(k, k_body)]);
    let main_body = b.where_defs(main_body, vec![x, b.fun(g, g_body), b.fun(h, h_body)]);
    let main = b.fun(main, main_body);

    SiblingCalls {
        program: b.finish(vec![main]),
        g: g_id,
        h: h_id,
        k: k_id,
    }
}
