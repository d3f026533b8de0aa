//! Execution of linearized IR on a simulated stack machine.
//!
//! The machine has a flat byte addressed [`Memory`] and two registers, the
//! frame pointer and the stack pointer, which IR code reads through the
//! reserved `{FP}` and `{SP}` labels. Calls follow the frame layout described
//! in [`crate::middle::frame`]: the caller stores its frame pointer into the
//! callee's saved FP slot and the arguments at the stack pointer, the callee
//! leaves its result where the static link was passed.

use std::{
    io::{self, Write as _},
    rc::Rc,
};

use hashbrown::HashMap;
use rand::{Rng, SeedableRng, rngs::StdRng};
use thiserror::Error;
use tracing::{debug, trace};

use super::ir::{BinaryOp, Chunk, Expr, Intrinsic, Program, Stmt, TempId};
use crate::{
    index::{IndexVec, simple_index},
    middle::{
        frame::{Access, Frame, WORD_SIZE},
        label::Label,
    },
};

pub mod memory;

pub use memory::Memory;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("condition evaluated to {0}, expected 0 or 1")]
    InvalidCondition(i64),
    #[error("`{intrinsic}` takes {expected} argument(s) but was called with {found}")]
    ArgumentCount {
        intrinsic: Intrinsic,
        expected: usize,
        found: usize,
    },
    #[error("`{0}` is not a function")]
    NotAFunction(Label),
    #[error("address {0} is outside of memory")]
    AddressOutOfBounds(i64),
    #[error("temporary {0:?} was read before it was written")]
    UninitializedTemp(TempId),
    #[error("label `{0}` does not exist")]
    UnknownLabel(Label),
    #[error("body of `{0}` is not linearized")]
    NotLinearized(Label),
    #[error("stack overflow")]
    StackOverflow,
    #[error("rand_int called with an empty range [{min}, {max})")]
    EmptyRange { min: i64, max: i64 },
    #[error("entry function `{0}` must not take parameters")]
    EntryParameters(Label),
    #[error("`{0}` is not a valid assignment target")]
    InvalidDestination(Label),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Size of the simulated memory in bytes
    pub memory_size: usize,
    /// Seed of the random number generator, drawn from the OS if missing
    pub seed: Option<u64>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            memory_size: 64 * 1024,
            seed: None,
        }
    }
}

simple_index! {
    /// A function body loaded into the interpreter
    pub struct CodeId;
}

#[derive(Debug)]
struct LoadedCode {
    frame: Frame,
    statements: Vec<Stmt>,
    /// Index of every label statement in `statements`
    labels: HashMap<Label, usize>,
}

/// Where the result of a call goes once the callee returns
#[derive(Debug, Clone, Copy)]
enum Destination {
    Temp(TempId),
    Mem(i64),
    Discard,
}

/// A running function
#[derive(Debug)]
struct Activation {
    code: Rc<LoadedCode>,
    pc: usize,
    temps: HashMap<TempId, i64>,
    /// Where the caller wants the result of this activation
    destination: Destination,
}

/// What the interpreter loop has to do after a statement
enum Step {
    Continue,
    Call {
        id: CodeId,
        arguments: Vec<i64>,
        destination: Destination,
    },
    Return,
}

pub struct Interpreter<'out> {
    memory: Memory,
    code: IndexVec<CodeId, Rc<LoadedCode>>,
    functions: HashMap<Label, CodeId>,
    entry: Label,
    frame_pointer: i64,
    stack_pointer: i64,
    rng: StdRng,
    output: Option<&'out mut dyn io::Write>,
}

impl<'out> Interpreter<'out> {
    /// Lays out the static data of `program` and indexes its function bodies
    pub fn new(program: &Program, config: &InterpreterConfig) -> Result<Self, RuntimeError> {
        let mut memory = Memory::new(config.memory_size);
        let mut code = IndexVec::new();
        let mut functions = HashMap::new();

        for chunk in &program.chunks {
            match chunk {
                Chunk::Code { frame, body } => {
                    let statements = match body {
                        Stmt::Seq(statements) => statements.clone(),
                        stmt => vec![stmt.clone()],
                    };

                    if !statements.iter().all(Stmt::is_linear) {
                        return Err(RuntimeError::NotLinearized(frame.label.clone()));
                    }

                    let labels = statements
                        .iter()
                        .enumerate()
                        .filter_map(|(index, stmt)| match stmt {
                            Stmt::Label(label) => Some((label.clone(), index)),
                            _ => None,
                        })
                        .collect();

                    let id = code.push(Rc::new(LoadedCode {
                        frame: frame.clone(),
                        statements,
                        labels,
                    }));
                    functions.insert(frame.label.clone(), id);
                }
                Chunk::Data { access, literal } => {
                    let address = memory.allocate(global_label(access)?, access.size())?;
                    memory.store_string(address, literal.as_bytes())?;
                }
                Chunk::Global { access } => {
                    memory.allocate(global_label(access)?, access.size())?;
                }
            }
        }

        debug!(
            functions = code.len(),
            static_size = memory.static_end(),
            "loaded program"
        );

        let top = memory.size() - WORD_SIZE;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            memory,
            code,
            functions,
            entry: program.entry.clone(),
            frame_pointer: top,
            stack_pointer: top,
            rng,
            output: None,
        })
    }

    /// Sends the output of the print intrinsics to `output`. Without an output
    /// printing does nothing.
    pub fn with_output(mut self, output: &'out mut dyn io::Write) -> Self {
        self.output = Some(output);
        self
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Executes the entry function and returns its result.
    ///
    /// Activations are kept in a `Vec`, so the depth of the simulated call
    /// stack is only limited by the simulated memory.
    pub fn run(&mut self) -> Result<i64, RuntimeError> {
        let entry = self.entry.clone();
        let id = self.function(&entry)?;

        let frame = &self.code[id].frame;
        if frame.params_size > WORD_SIZE {
            return Err(RuntimeError::EntryParameters(entry));
        }

        let old_fp_slot = self.stack_pointer - frame.old_fp_offset();
        self.memory.store(old_fp_slot, self.frame_pointer)?;

        let mut stack = vec![self.enter(id, &[0], Destination::Discard)?];

        while let Some(activation) = stack.last_mut() {
            match self.step(activation)? {
                Step::Continue => {}
                Step::Call {
                    id,
                    arguments,
                    destination,
                } => {
                    let callee = self.enter(id, &arguments, destination)?;
                    stack.push(callee);
                }
                Step::Return => {
                    let value = self.leave(&activation.code)?;
                    let destination = activation.destination;
                    stack.pop();

                    match stack.last_mut() {
                        Some(caller) => self.write(caller, destination, value)?,
                        None => return Ok(value),
                    }
                }
            }
        }

        unreachable!("the entry activation returns its result")
    }

    fn function(&self, label: &Label) -> Result<CodeId, RuntimeError> {
        self.functions
            .get(label)
            .copied()
            .ok_or_else(|| RuntimeError::NotAFunction(label.clone()))
    }

    /// `arguments` starts with the static link. The caller has already saved
    /// its frame pointer in the callee's frame.
    fn enter(
        &mut self,
        id: CodeId,
        arguments: &[i64],
        destination: Destination,
    ) -> Result<Activation, RuntimeError> {
        let code = Rc::clone(&self.code[id]);

        for (i, argument) in arguments.iter().enumerate() {
            self.memory
                .store(self.stack_pointer + i as i64 * WORD_SIZE, *argument)?;
        }

        trace!(label = %code.frame.label, fp = self.stack_pointer, "entering function");

        self.frame_pointer = self.stack_pointer;
        self.stack_pointer -= code.frame.size();

        if self.stack_pointer < self.memory.static_end() {
            return Err(RuntimeError::StackOverflow);
        }

        Ok(Activation {
            code,
            pc: 0,
            temps: HashMap::new(),
            destination,
        })
    }

    /// Pops the frame of `code` and returns the result it left at its frame
    /// pointer
    fn leave(&mut self, code: &LoadedCode) -> Result<i64, RuntimeError> {
        trace!(label = %code.frame.label, "leaving function");

        self.stack_pointer = self.frame_pointer;
        self.frame_pointer = self
            .memory
            .load(self.stack_pointer - code.frame.old_fp_offset())?;

        self.memory.load(self.stack_pointer)
    }

    fn step(&mut self, activation: &mut Activation) -> Result<Step, RuntimeError> {
        let code = Rc::clone(&activation.code);
        let Some(stmt) = code.statements.get(activation.pc) else {
            return Ok(Step::Return);
        };
        activation.pc += 1;

        match stmt {
            Stmt::Move { dst, src } => {
                let destination = match dst {
                    Expr::Temp(temp) => Destination::Temp(*temp),
                    Expr::Mem(address) => Destination::Mem(self.eval(address, activation)?),
                    _ => return Err(RuntimeError::InvalidDestination(code.frame.label.clone())),
                };

                if let Expr::Call { label, arguments } = src {
                    return self.call(label, arguments, destination, activation);
                }

                let value = self.eval(src, activation)?;
                self.write(activation, destination, value)?;
            }
            Stmt::Exp(Expr::Call { label, arguments }) => {
                return self.call(label, arguments, Destination::Discard, activation);
            }
            Stmt::Exp(expr) => {
                self.eval(expr, activation)?;
            }
            Stmt::Jump(label) => activation.pc = jump_target(&code, label)?,
            Stmt::CJump {
                condition,
                positive,
                negative,
            } => {
                let target = match self.eval(condition, activation)? {
                    1 => positive,
                    0 => negative,
                    value => return Err(RuntimeError::InvalidCondition(value)),
                };
                activation.pc = jump_target(&code, target)?;
            }
            Stmt::Label(_) => {}
            Stmt::Seq(_) => return Err(RuntimeError::NotLinearized(code.frame.label.clone())),
        }

        Ok(Step::Continue)
    }

    /// Intrinsics run right away, calls to compiled code are handed back to
    /// the loop in [`Interpreter::run`]
    fn call(
        &mut self,
        label: &Label,
        arguments: &[Expr],
        destination: Destination,
        activation: &mut Activation,
    ) -> Result<Step, RuntimeError> {
        let arguments = arguments
            .iter()
            .map(|argument| self.eval(argument, activation))
            .collect::<Result<Vec<_>, _>>()?;

        match Intrinsic::from_label(label) {
            Some(intrinsic) if !self.functions.contains_key(label) => {
                let value = self.call_intrinsic(intrinsic, &arguments)?;
                self.write(activation, destination, value)?;
                Ok(Step::Continue)
            }
            _ => Ok(Step::Call {
                id: self.function(label)?,
                arguments,
                destination,
            }),
        }
    }

    fn write(
        &mut self,
        activation: &mut Activation,
        destination: Destination,
        value: i64,
    ) -> Result<(), RuntimeError> {
        match destination {
            Destination::Temp(temp) => {
                activation.temps.insert(temp, value);
            }
            Destination::Mem(address) => self.memory.store(address, value)?,
            Destination::Discard => {}
        }

        Ok(())
    }

    /// Evaluates a call free expression
    fn eval(&self, expr: &Expr, activation: &Activation) -> Result<i64, RuntimeError> {
        match expr {
            Expr::Constant(value) => Ok(*value),
            Expr::Name(label) => self.address_of(label),
            Expr::Mem(address) => {
                let address = self.eval(address, activation)?;
                self.memory.load(address)
            }
            Expr::Temp(temp) => activation
                .temps
                .get(temp)
                .copied()
                .ok_or(RuntimeError::UninitializedTemp(*temp)),
            Expr::Binop { op, lhs, rhs } => {
                let lhs = self.eval(lhs, activation)?;
                let rhs = self.eval(rhs, activation)?;
                binop(*op, lhs, rhs)
            }
            Expr::Call { .. } | Expr::ESeq(..) => Err(RuntimeError::NotLinearized(
                activation.code.frame.label.clone(),
            )),
        }
    }

    fn address_of(&self, label: &Label) -> Result<i64, RuntimeError> {
        if *label == Label::frame_pointer() {
            return Ok(self.frame_pointer);
        }
        if *label == Label::stack_pointer() {
            return Ok(self.stack_pointer);
        }

        self.memory
            .address_of(label)
            .ok_or_else(|| RuntimeError::UnknownLabel(label.clone()))
    }

    /// `arguments` includes the static link, which intrinsics ignore
    fn call_intrinsic(&mut self, intrinsic: Intrinsic, arguments: &[i64]) -> Result<i64, RuntimeError> {
        let arguments = arguments.get(1..).unwrap_or_default();

        if arguments.len() != intrinsic.arity() {
            return Err(RuntimeError::ArgumentCount {
                intrinsic,
                expected: intrinsic.arity(),
                found: arguments.len(),
            });
        }

        trace!(%intrinsic, ?arguments, "calling intrinsic");

        match intrinsic {
            Intrinsic::PrintInt => {
                self.print(&arguments[0].to_string())?;
                Ok(0)
            }
            Intrinsic::PrintStr => {
                let text = self.memory.load_string(arguments[0])?;
                self.print(&format!("\"{text}\""))?;
                Ok(0)
            }
            Intrinsic::PrintLog => {
                self.print(if arguments[0] != 0 { "true" } else { "false" })?;
                Ok(0)
            }
            Intrinsic::RandInt => {
                let (min, max) = (arguments[0], arguments[1]);
                if min >= max {
                    return Err(RuntimeError::EmptyRange { min, max });
                }
                Ok(self.rng.gen_range(min..max))
            }
            Intrinsic::Seed => {
                self.rng = StdRng::seed_from_u64(arguments[0] as u64);
                Ok(0)
            }
        }
    }

    fn print(&mut self, line: &str) -> Result<(), RuntimeError> {
        if let Some(output) = self.output.as_mut() {
            writeln!(output, "{line}")?;
        }

        Ok(())
    }
}

fn global_label(access: &Access) -> Result<Label, RuntimeError> {
    match access {
        Access::Global { label, .. } => Ok(label.clone()),
        Access::Local { offset, .. } | Access::Parameter { offset, .. } => {
            Err(RuntimeError::AddressOutOfBounds(*offset))
        }
    }
}

fn jump_target(code: &LoadedCode, label: &Label) -> Result<usize, RuntimeError> {
    code.labels
        .get(label)
        .copied()
        .ok_or_else(|| RuntimeError::UnknownLabel(label.clone()))
}

fn binop(op: BinaryOp, lhs: i64, rhs: i64) -> Result<i64, RuntimeError> {
    Ok(match op {
        BinaryOp::Add => lhs.wrapping_add(rhs),
        BinaryOp::Sub => lhs.wrapping_sub(rhs),
        BinaryOp::Mul => lhs.wrapping_mul(rhs),
        BinaryOp::Div | BinaryOp::Mod if rhs == 0 => return Err(RuntimeError::DivisionByZero),
        BinaryOp::Div => lhs.wrapping_div(rhs),
        BinaryOp::Mod => lhs.wrapping_rem(rhs),
        BinaryOp::And => i64::from(lhs != 0 && rhs != 0),
        BinaryOp::Or => i64::from(lhs != 0 || rhs != 0),
        BinaryOp::Eq => i64::from(lhs == rhs),
        BinaryOp::Neq => i64::from(lhs != rhs),
        BinaryOp::Lt => i64::from(lhs < rhs),
        BinaryOp::Gt => i64::from(lhs > rhs),
        BinaryOp::Leq => i64::from(lhs <= rhs),
        BinaryOp::Geq => i64::from(lhs >= rhs),
    })
}
