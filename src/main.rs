//! Monkey CLI: execute files, evaluate snippets, or run the REPL.

use std::env;
use std::fs;
use std::process;

use monkey::bytecode::disassembler::disassemble;
use monkey::repl::Repl;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI command to execute.
enum Command {
    /// Start the REPL
    Repl,
    /// Run a script file
    Run { file: String },
    /// Evaluate a string
    Eval { code: String },
}

/// CLI options parsed from arguments.
struct Options {
    command: Command,
    disasm: bool,
}

fn print_usage() {
    eprintln!("Monkey {} - bytecode interpreter", VERSION);
    eprintln!();
    eprintln!("Usage: monkey [options] [script.monkey]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -e <code>   Evaluate code and print the result");
    eprintln!("  --disasm    Print the compiled bytecode instead of running");
    eprintln!("  -h, --help  Show this help");
    eprintln!();
    eprintln!("With no arguments, starts the interactive REPL.");
}

fn parse_args() -> Result<Options, String> {
    let mut args = env::args().skip(1);
    let mut command = None;
    let mut disasm = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "--disasm" => disasm = true,
            "-e" => {
                let code = args.next().ok_or("-e requires an argument")?;
                command = Some(Command::Eval { code });
            }
            other if other.starts_with('-') => {
                return Err(format!("unknown option '{}'", other));
            }
            file => {
                command = Some(Command::Run {
                    file: file.to_string(),
                });
            }
        }
    }

    Ok(Options {
        command: command.unwrap_or(Command::Repl),
        disasm,
    })
}

fn main() {
    let options = match parse_args() {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{}", message);
            print_usage();
            process::exit(2);
        }
    };

    match options.command {
        Command::Repl => Repl::new().run(),
        Command::Eval { code } => execute(&code, options.disasm),
        Command::Run { file } => match fs::read_to_string(&file) {
            Ok(source) => execute(&source, options.disasm),
            Err(err) => {
                eprintln!("could not read {}: {}", file, err);
                process::exit(1);
            }
        },
    }
}

/// Compile and run a whole program, printing the final value, or just the
/// disassembly when asked. Errors exit non-zero.
fn execute(source: &str, disasm: bool) {
    if disasm {
        match monkey::compile(source) {
            Ok(bytecode) => print!("{}", disassemble(&bytecode.instructions)),
            Err(err) => {
                eprintln!("{}", err);
                process::exit(1);
            }
        }
        return;
    }

    match monkey::run(source) {
        Ok(value) => println!("{}", value),
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}
