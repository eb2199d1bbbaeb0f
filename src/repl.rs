//! Interactive REPL driving the compile-then-execute pipeline.

use std::path::PathBuf;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::bytecode::compiler::Compiler;
use crate::bytecode::symbol_table::SymbolTable;
use crate::bytecode::vm::{Vm, GLOBAL_SIZE};
use crate::lexer::Scanner;
use crate::object::Value;
use crate::parser::Parser;

const HISTORY_FILE: &str = ".monkey_history";
const PROMPT: &str = ">> ";

const MONKEY_FACE: &str = r#"            __,__
   .--.  .-"     "-.  .--.
  / .. \/  .-. .-.  \/ .. \
 | |  '|  /   Y   \  |'  | |
 | \   \  \ 0 | 0 /  /   / |
  \ '- ,\.-"""""""-./, -' /
   ''-' /_   ^ ^   _\ '-''
       |  \._   _./  |
       \   \ '~' /   /
        '._ '-=-' _.'
           '-----'
"#;

/// The interactive session. Bindings, constants, and symbols persist
/// across lines by threading the same state into each fresh compiler and
/// VM.
pub struct Repl {
    symbol_table: SymbolTable,
    constants: Vec<Value>,
    globals: Vec<Value>,
}

impl Repl {
    pub fn new() -> Self {
        Self {
            symbol_table: SymbolTable::new(),
            constants: Vec::new(),
            globals: vec![Value::Null; GLOBAL_SIZE],
        }
    }

    pub fn run(&mut self) {
        println!("Monkey {} (bytecode VM)", env!("CARGO_PKG_VERSION"));
        println!("Type exit to leave.\n");

        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(err) => {
                eprintln!("could not start line editor: {}", err);
                return;
            }
        };

        let history_file = history_path();
        let _ = editor.load_history(&history_file);

        loop {
            match editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if line == "exit" || line == "quit" {
                        break;
                    }

                    let _ = editor.add_history_entry(line);
                    self.eval_line(line);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("read error: {}", err);
                    break;
                }
            }
        }

        let _ = editor.save_history(&history_file);
    }

    /// Run one line through the pipeline and print the result or the error.
    fn eval_line(&mut self, line: &str) {
        let tokens = match Scanner::new(line).scan_tokens() {
            Ok(tokens) => tokens,
            Err(err) => {
                self.print_parse_failure(&err.to_string());
                return;
            }
        };

        let program = match Parser::new(tokens).parse() {
            Ok(program) => program,
            Err(err) => {
                self.print_parse_failure(&err.to_string());
                return;
            }
        };

        // A failed compile discards this compiler along with any partial
        // definitions; the next line starts from the last good state.
        let mut compiler = Compiler::with_state(self.symbol_table.clone(), self.constants.clone());
        if let Err(err) = compiler.compile(&program) {
            println!("{} {}", "compile error:".red(), err);
            return;
        }
        self.symbol_table = compiler.symbol_table().clone();

        let bytecode = compiler.bytecode();
        self.constants = bytecode.constants.clone();

        let mut vm = Vm::with_global_store(bytecode, std::mem::take(&mut self.globals));
        match vm.run() {
            Ok(()) => println!("{}", vm.last_popped_stack_elem()),
            Err(err) => println!("{} {}", "runtime error:".red(), err),
        }
        self.globals = vm.into_globals();
    }

    fn print_parse_failure(&self, message: &str) {
        print!("{}", MONKEY_FACE);
        println!("Woops! We ran into some monkey business here!");
        println!(" parser errors:");
        println!("\t{}", message.red());
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

fn history_path() -> PathBuf {
    if let Some(home) = dirs::home_dir() {
        home.join(HISTORY_FILE)
    } else {
        PathBuf::from(HISTORY_FILE)
    }
}
