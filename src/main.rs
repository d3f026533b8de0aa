use std::{io, process::ExitCode};

use clap::{Parser as ClapParser, Subcommand};
use colored::Colorize;
use pinsc::{
    backend::{
        interpreter::{Interpreter, InterpreterConfig},
        pretty_print::pretty_print_program,
    },
    compile,
    demos::{Demo, ENTRY},
    diagnostic::{render_compile_error, render_runtime_error},
};
use strum::IntoEnumIterator;
use tracing_subscriber::EnvFilter;

#[derive(Debug, ClapParser)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compiles and runs one of the bundled programs
    Run {
        demo: Demo,

        /// Size of the simulated memory in bytes
        #[arg(long, default_value_t = InterpreterConfig::default().memory_size)]
        memory_size: usize,

        /// Seed for `rand_int`, random if not given
        #[arg(long)]
        seed: Option<u64>,

        /// Print the generated IR before running it
        #[arg(long)]
        dump_ir: bool,
    },
    /// Lists the bundled programs
    List,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::List => {
            for demo in Demo::iter() {
                println!("{:<12} {}", demo.to_string().blue(), demo.description());
            }

            ExitCode::SUCCESS
        }
        Command::Run {
            demo,
            memory_size,
            seed,
            dump_ir,
        } => {
            let (defs, annotations) = demo.build();

            let program = match compile(&defs, &annotations, ENTRY) {
                Ok(program) => program,
                Err(error) => {
                    eprintln!("{}", render_compile_error(&error));
                    return ExitCode::FAILURE;
                }
            };

            if dump_ir {
                print!("{}", pretty_print_program(&program));
            }

            let config = InterpreterConfig { memory_size, seed };
            let mut stdout = io::stdout();

            let result = Interpreter::new(&program, &config)
                .and_then(|interpreter| interpreter.with_output(&mut stdout).run());

            match result {
                Ok(value) => {
                    eprintln!("{} {value}", "result:".green());
                    ExitCode::SUCCESS
                }
                Err(error) => {
                    eprintln!("{}", render_runtime_error(&error));
                    ExitCode::FAILURE
                }
            }
        }
    }
}
