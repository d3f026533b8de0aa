//! Sample programs, built directly as annotated ASTs. Each one defines a
//! parameterless top level `main` returning an integer.

use strum::{EnumIter, EnumString};

use crate::{
    frontend::{
        ast::{BinaryOperatorKind as Op, Defs, UnaryOperatorKind},
        builder::ProgramBuilder,
    },
    middle::{annotations::Annotations, ty::Type},
};

/// Name of the function every demo starts in
pub const ENTRY: &str = "main";

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, EnumIter, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Demo {
    Factorial,
    Counter,
    ArraySum,
    Strings,
    Loops,
    Random,
}

impl Demo {
    pub fn description(self) -> &'static str {
        match self {
            Demo::Factorial => "recursive factorial of 5",
            Demo::Counter => "nested functions updating a variable through static links",
            Demo::ArraySum => "global array filled in a loop, passed to a function and copied",
            Demo::Strings => "string constants, string variables and logical output",
            Demo::Loops => "while and for loops",
            Demo::Random => "seeded random numbers",
        }
    }

    pub fn build(self) -> (Defs, Annotations) {
        match self {
            Demo::Factorial => factorial(5),
            Demo::Counter => counter(5),
            Demo::ArraySum => array_sum(),
            Demo::Strings => strings(),
            Demo::Loops => loops(3),
            Demo::Random => random(42, 10),
        }
    }
}

/// ```text
/// fun fact(n: integer): integer = { if n <= 1 then r = 1 else r = n * fact(n - 1); r } where var r: integer
/// fun main(): integer = { print_int(fact(input)); fact(input) }
/// ```
pub fn factorial(input: i64) -> (Defs, Annotations) {
    let b = ProgramBuilder::new();

    let fact = b.signature("fact", vec![b.param("n", Type::Int)], Type::Int);
    let n = fact.parameter(0).clone();
    let r = b.at(2, 5).var("r", Type::Int);

    let body = b.at(1, 30).block(vec![
        b.if_else(
            b.binary(b.name(&n), Op::LessThanOrEqualTo, b.int(1)),
            b.assign(b.name(&r), b.int(1)),
            b.assign(
                b.name(&r),
                b.binary(
                    b.name(&n),
                    Op::Multiply,
                    b.call(&fact, vec![b.binary(b.name(&n), Op::Subtract, b.int(1))]),
                ),
            ),
        ),
        b.name(&r),
    ]);
    let body = b.where_defs(body, vec![r]);

    let main = b.at(4, 1).signature(ENTRY, vec![], Type::Int);
    let main_body = b.block(vec![
        b.call_unresolved("print_int", vec![b.call(&fact, vec![b.int(input)])]),
        b.call(&fact, vec![b.int(input)]),
    ]);

    let fact = b.fun(fact, body);
    let main = b.fun(main, main_body);

    b.finish(vec![fact, main])
}

/// Three levels of nesting, the innermost function updates a local of the
/// outermost one and reads its parameter.
///
/// ```text
/// fun outer(n: integer): integer = { total = 0; middle(); total } where
///     var total: integer
///     fun middle(): integer = { inner(); inner(); 0 } where
///         fun inner(): integer = { total = total + n; total }
/// fun main(): integer = { print_int(outer(step)); outer(step + 1) }
/// ```
pub fn counter(step: i64) -> (Defs, Annotations) {
    let b = ProgramBuilder::new();

    let outer = b.signature("outer", vec![b.param("n", Type::Int)], Type::Int);
    let n = outer.parameter(0).clone();
    let total = b.var("total", Type::Int);

    let inner = b.signature("inner", vec![], Type::Int);
    let inner_body = b.block(vec![
        b.assign(
            b.name(&total),
            b.binary(b.name(&total), Op::Add, b.name(&n)),
        ),
        b.name(&total),
    ]);

    let middle = b.signature("middle", vec![], Type::Int);
    let middle_body = b.block(vec![
        b.call(&inner, vec![]),
        b.call(&inner, vec![]),
        b.int(0),
    ]);
    let middle_body = b.where_defs(middle_body, vec![b.fun(inner, inner_body)]);

    let outer_body = b.block(vec![
        b.assign(b.name(&total), b.int(0)),
        b.call(&middle, vec![]),
        b.name(&total),
    ]);
    let outer_body = b.where_defs(outer_body, vec![total, b.fun(middle, middle_body)]);

    let main = b.signature(ENTRY, vec![], Type::Int);
    let main_body = b.block(vec![
        b.call_unresolved("print_int", vec![b.call(&outer, vec![b.int(step)])]),
        b.call(&outer, vec![b.binary(b.int(step), Op::Add, b.int(1))]),
    ]);

    let outer = b.fun(outer, outer_body);
    let main = b.fun(main, main_body);

    b.finish(vec![outer, main])
}

/// ```text
/// var numbers: arr[5] integer
/// fun sum(values: arr[5] integer): integer = { s = 0; for i = 0, 5, 1: s = s + values[i]; s } where
///     var s: integer
///     var i: integer
/// fun main(): integer = {
///     for i = 0, 5, 1: numbers[i] = i * i;
///     copy = numbers; copy[4] = -copy[4];
///     print_int(sum(numbers)); print_int(sum(copy));
///     sum(numbers)
/// } where
///     var i: integer
///     var copy: arr[5] integer
/// ```
pub fn array_sum() -> (Defs, Annotations) {
    let b = ProgramBuilder::new();
    let array = Type::array(5, Type::Int);

    let numbers = b.var("numbers", array.clone());

    let sum = b.signature("sum", vec![b.param("values", array.clone())], Type::Int);
    let values = sum.parameter(0).clone();
    let s = b.var("s", Type::Int);
    let i = b.var("i", Type::Int);
    let sum_body = b.block(vec![
        b.assign(b.name(&s), b.int(0)),
        b.for_loop(
            b.name(&i),
            b.int(0),
            b.int(5),
            b.int(1),
            b.assign(
                b.name(&s),
                b.binary(b.name(&s), Op::Add, b.index(b.name(&values), b.name(&i))),
            ),
        ),
        b.name(&s),
    ]);
    let sum_body = b.where_defs(sum_body, vec![s, i]);

    let main = b.signature(ENTRY, vec![], Type::Int);
    let j = b.var("i", Type::Int);
    let copy = b.var("copy", array);
    let main_body = b.block(vec![
        b.for_loop(
            b.name(&j),
            b.int(0),
            b.int(5),
            b.int(1),
            b.assign(
                b.index(b.name(&numbers), b.name(&j)),
                b.binary(b.name(&j), Op::Multiply, b.name(&j)),
            ),
        ),
        b.assign(b.name(&copy), b.name(&numbers)),
        b.assign(
            b.index(b.name(&copy), b.int(4)),
            b.unary(
                UnaryOperatorKind::Negate,
                b.index(b.name(&copy), b.int(4)),
            ),
        ),
        b.call_unresolved("print_int", vec![b.call(&sum, vec![b.name(&numbers)])]),
        b.call_unresolved("print_int", vec![b.call(&sum, vec![b.name(&copy)])]),
        b.call(&sum, vec![b.name(&numbers)]),
    ]);
    let main_body = b.where_defs(main_body, vec![j, copy]);

    let sum = b.fun(sum, sum_body);
    let main = b.fun(main, main_body);

    b.finish(vec![numbers, sum, main])
}

/// ```text
/// var greeting: string
/// fun main(): integer = {
///     print_str("hello"); print_str("hello");
///     greeting = "world"; print_str(greeting);
///     print_log(1 < 2); print_log(!true);
///     0
/// }
/// ```
pub fn strings() -> (Defs, Annotations) {
    let b = ProgramBuilder::new();

    let greeting = b.var("greeting", Type::Str);

    let main = b.signature(ENTRY, vec![], Type::Int);
    let main_body = b.block(vec![
        b.call_unresolved("print_str", vec![b.string("hello")]),
        b.call_unresolved("print_str", vec![b.string("hello")]),
        b.assign(b.name(&greeting), b.string("world")),
        b.call_unresolved("print_str", vec![b.name(&greeting)]),
        b.call_unresolved(
            "print_log",
            vec![b.binary(b.int(1), Op::LessThan, b.int(2))],
        ),
        b.call_unresolved(
            "print_log",
            vec![b.unary(UnaryOperatorKind::Not, b.log(true))],
        ),
        b.int(0),
    ]);

    let main = b.fun(main, main_body);

    b.finish(vec![greeting, main])
}

/// ```text
/// fun main(): integer = {
///     while false: print_int(-1);
///     for i = 0, 5, 1: print_int(i);
///     i = 0;
///     while i < limit: { print_int(i * 10); i = i + 1 };
///     i
/// } where var i: integer
/// ```
pub fn loops(limit: i64) -> (Defs, Annotations) {
    let b = ProgramBuilder::new();

    let main = b.signature(ENTRY, vec![], Type::Int);
    let i = b.var("i", Type::Int);
    let main_body = b.block(vec![
        b.while_loop(
            b.log(false),
            b.call_unresolved(
                "print_int",
                vec![b.unary(UnaryOperatorKind::Negate, b.int(1))],
            ),
        ),
        b.for_loop(
            b.name(&i),
            b.int(0),
            b.int(5),
            b.int(1),
            b.call_unresolved("print_int", vec![b.name(&i)]),
        ),
        b.assign(b.name(&i), b.int(0)),
        b.while_loop(
            b.binary(b.name(&i), Op::LessThan, b.int(limit)),
            b.block(vec![
                b.call_unresolved(
                    "print_int",
                    vec![b.binary(b.name(&i), Op::Multiply, b.int(10))],
                ),
                b.assign(b.name(&i), b.binary(b.name(&i), Op::Add, b.int(1))),
            ]),
        ),
        b.name(&i),
    ]);
    let main_body = b.where_defs(main_body, vec![i]);

    let main = b.fun(main, main_body);

    b.finish(vec![main])
}

/// ```text
/// fun main(): integer = {
///     seed(seed);
///     for i = 0, count, 1: { x = rand_int(1, 7); print_int(x) };
///     x
/// } where var i: integer; var x: integer
/// ```
pub fn random(seed: i64, count: i64) -> (Defs, Annotations) {
    let b = ProgramBuilder::new();

    let main = b.signature(ENTRY, vec![], Type::Int);
    let i = b.var("i", Type::Int);
    let x = b.var("x", Type::Int);
    let main_body = b.block(vec![
        b.call_unresolved("seed", vec![b.int(seed)]),
        b.for_loop(
            b.name(&i),
            b.int(0),
            b.int(count),
            b.int(1),
            b.block(vec![
                b.assign(
                    b.name(&x),
                    b.call_unresolved("rand_int", vec![b.int(1), b.int(7)]),
                ),
                b.call_unresolved("print_int", vec![b.name(&x)]),
            ]),
        ),
        b.name(&x),
    ]);
    let main_body = b.where_defs(main_body, vec![i, x]);

    let main = b.fun(main, main_body);

    b.finish(vec![main])
}
