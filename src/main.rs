use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use clap::Subcommand;
use lisp_interpreter::Context;
use lisp_interpreter::Lexer;
use lisp_interpreter::builtin;
use lisp_interpreter::lex::Eof;
use lisp_interpreter::lex::MalformedNumberError;
use lisp_interpreter::lex::SingleTokenError;
use lisp_interpreter::lex::StringTerminationError;
use lisp_interpreter::lex::TokenKind;
use lisp_interpreter::printer::DebugTree;
use log::warn;
use miette::IntoDiagnostic;
use miette::WrapErr;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

#[derive(Parser, Debug)]
#[command(version, about = "An interpreter for a small S-expression language")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print every token of a file
    Tokenize { filename: PathBuf },
    /// Print the syntax tree of a file
    Parse { filename: PathBuf },
    /// Evaluate a file
    Run { filename: PathBuf },
    /// Start an interactive session
    Repl,
}

fn read_source(filename: &Path) -> miette::Result<String> {
    let file_contents = fs::read_to_string(filename)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading `{}` failed", filename.display()))?;
    Ok(file_contents.trim_matches('\n').to_string())
}

/// `[line N] Error: ...` summary for scan errors, printed ahead of the diagnostic.
fn report_line(e: &miette::Error) {
    if let Some(single_token_error) = e.downcast_ref::<SingleTokenError>() {
        eprintln!(
            "[line {}] Error: Unexpected character: {}",
            single_token_error.line(),
            single_token_error.token
        );
    } else if let Some(string_termination_error) = e.downcast_ref::<StringTerminationError>() {
        eprintln!(
            "[line {}] Error: Unterminated string",
            string_termination_error.line()
        );
    } else if let Some(malformed_number_error) = e.downcast_ref::<MalformedNumberError>() {
        eprintln!(
            "[line {}] Error: Malformed number: {}",
            malformed_number_error.line(),
            malformed_number_error.literal
        );
    } else if let Some(eof) = e.downcast_ref::<Eof>() {
        eprintln!("[line {}] Error: Unexpected end of file", eof.line());
    }
}

fn main() -> miette::Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Commands::Tokenize { filename } => {
            let file_contents = read_source(&filename)?;
            let mut lexer = Lexer::new(filename.to_str(), &file_contents);

            while let Some(token) = lexer.next() {
                if let TokenKind::Illegal(_) = token.kind {
                    if let Some(e) = lexer.illegal(&token) {
                        report_line(&e);
                        eprintln!("{e:?}");
                    }
                    std::process::exit(65);
                }
                println!("{token}");
            }
        }
        Commands::Parse { filename } => {
            let file_contents = read_source(&filename)?;
            let program = lisp_interpreter::Parser::new(filename.to_str(), &file_contents)
                .parse()
                .inspect_err(report_line)?;
            println!("{}", DebugTree(&program));
        }
        Commands::Run { filename } => {
            let file_contents = read_source(&filename)?;
            let mut context = Context::new();
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            lisp_interpreter::run_with_output(
                filename.to_str(),
                &file_contents,
                &mut context,
                &mut out,
            )
            .inspect_err(report_line)?;
        }
        Commands::Repl => repl()?,
    }
    Ok(())
}

fn print_help() {
    println!("Enter S-expressions like: (+ 1 2)");
    println!("Builtins: {}", builtin::names().join(" "));
    println!("Special forms: (defvar name value \"documentation\")");
    println!("Commands: :help, :env, :quit");
}

fn print_environment(context: &Context) {
    let mut names: Vec<_> = context.names().collect();
    names.sort_unstable();
    for name in names {
        let Ok(value) = context.get(name) else {
            continue;
        };
        match context.documentation(name) {
            Some(doc) => println!("{name} = {value}  ; {doc}"),
            None => println!("{name} = {value}"),
        }
    }
}

fn repl() -> miette::Result<()> {
    let mut rl = DefaultEditor::new()
        .into_diagnostic()
        .wrap_err("could not initialize the line editor")?;
    let mut context = Context::new();
    println!("Type :help for more commands, or Ctrl+D to exit.");

    loop {
        match rl.readline("lisp> ") {
            Ok(line) => {
                let line = line.trim_matches('\n');
                if line.trim().is_empty() {
                    continue;
                }
                if let Err(e) = rl.add_history_entry(line) {
                    warn!("could not record history entry: {e}");
                }

                match line.trim() {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&context);
                        continue;
                    }
                    ":quit" => break,
                    _ => {}
                }

                match lisp_interpreter::run(line, &mut context) {
                    Ok(Some(value)) => println!("{}", value.to_string().trim_matches(['\n', '\r'])),
                    Ok(None) => println!(),
                    Err(e) => eprintln!("{e:?}"),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{e}");
                break;
            }
        }
    }
    Ok(())
}
