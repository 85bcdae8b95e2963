use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rox as lox;

use lox::ast::Stmt;
use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::scanner::Scanner;
use lox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: Option<PathBuf> },

    /// Parses input from a file as a program and prints its AST
    Parse {
        filename: Option<PathBuf>,

        /// Print the AST as JSON instead of s-expressions
        #[arg(long)]
        json: bool,
    },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program
    Run { filename: Option<PathBuf> },

    /// Reads programs line by line from stdin against one interpreter
    Repl,
}

/// Maps a source file into memory and copies it out.
fn read_file(filename: PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);

    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?
        .len();

    // Zero-length mappings are rejected by the OS.
    if len == 0 {
        return Ok(Vec::new());
    }

    // SAFETY: the map is read once and dropped before this function returns.
    let map = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    info!("Read {} bytes from {:?}", map.len(), filename);

    Ok(map.to_vec())
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn no_input() -> ! {
    info!("No filepath provided");
    println!("No input filepath was provided. Exiting...");
    process::exit(0);
}

fn fail(error: &LoxError) -> ! {
    debug!("Exiting after error: {:?}", error);
    eprintln!("{}", error);
    process::exit(error.exit_code());
}

fn scan(buf: &[u8]) -> Vec<Token> {
    Scanner::new(buf).scan_all().unwrap_or_else(|e| fail(&e))
}

/// Parses every statement, reporting each parse error before giving up.
fn parse_program(tokens: &[Token]) -> Option<Vec<Stmt>> {
    let mut statements = Vec::new();
    let mut parsed = true;

    for stmt in Parser::new(tokens) {
        match stmt {
            Ok(stmt) => {
                debug!("Parsed statement: {:?}", stmt);
                statements.push(stmt);
            }
            Err(e) => {
                parsed = false;
                eprintln!("{}", e);
            }
        }
    }

    info!("Parsed {} statements", statements.len());

    parsed.then_some(statements)
}

/// Resolve then interpret one program.
fn execute(interpreter: &mut Interpreter<'_>, statements: &[Stmt]) -> lox::error::Result<()> {
    interpreter.resolve(statements)?;
    interpreter.interpret(statements)?;
    Ok(())
}

fn repl() -> Result<()> {
    let mut out = io::stdout();
    let mut interpreter = Interpreter::new(&mut out);
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        let mut line = String::new();
        if stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?
            == 0
        {
            break;
        }

        let line = line.trim();
        if line == "q" || line == "quit" {
            break;
        }

        let tokens = match Scanner::new(line.as_bytes()).scan_all() {
            Ok(tokens) => tokens,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        let Some(statements) = parse_program(&tokens) else {
            continue;
        };

        if let Err(e) = execute(&mut interpreter, &statements) {
            eprintln!("{}", e);
        }
    }

    info!("REPL session ended");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename } => {
            let buf = read_file(filename.unwrap_or_else(|| no_input()))?;
            let mut tokenized = true;

            for token in Scanner::new(&buf) {
                match token {
                    Ok(token) => println!("{}", token),
                    Err(e) => {
                        tokenized = false;
                        eprintln!("{}", e);
                    }
                }
            }

            if !tokenized {
                debug!("Tokenization failed, exiting with code 65");
                process::exit(65);
            }
        }

        Commands::Parse { filename, json } => {
            let buf = read_file(filename.unwrap_or_else(|| no_input()))?;
            let tokens = scan(&buf);
            let statements = parse_program(&tokens).unwrap_or_else(|| process::exit(65));

            if json {
                let rendered = serde_json::to_string_pretty(&statements)
                    .context("Failed to serialise AST")?;
                println!("{}", rendered);
            } else {
                println!("{}", AstPrinter::print_program(&statements));
            }
        }

        Commands::Evaluate { filename } => {
            let buf = read_file(filename.unwrap_or_else(|| no_input()))?;
            let tokens = scan(&buf);
            let expr = Parser::new(&tokens)
                .parse_expression()
                .unwrap_or_else(|e| fail(&e));

            let mut out = io::stdout().lock();
            let mut interpreter = Interpreter::new(&mut out);

            match interpreter.evaluate(&expr) {
                Ok(value) => println!("{}", value),
                Err(e) => fail(&LoxError::from(e)),
            }
        }

        Commands::Run { filename } => {
            let buf = read_file(filename.unwrap_or_else(|| no_input()))?;
            let tokens = scan(&buf);
            let statements = parse_program(&tokens).unwrap_or_else(|| process::exit(65));

            let mut out = io::stdout().lock();
            let mut interpreter = Interpreter::new(&mut out);

            if let Err(e) = execute(&mut interpreter, &statements) {
                fail(&e);
            }

            info!("Program executed successfully");
        }

        Commands::Repl => repl()?,
    }

    Ok(())
}
