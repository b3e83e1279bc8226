use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::parser::Parser;
use rox::scanner::Scanner;
use rox::session::Session;

const INTERPRETER_STACK_SIZE: usize = 256 * 1024 * 1024;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable debug logging to a file
    #[arg(long, global = true)]
    log: bool,

    /// Log file used with --log
    #[arg(long, global = true, default_value = "app.log")]
    log_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: PathBuf },

    /// Parses a file and prints its statements
    Parse {
        filename: PathBuf,

        /// Print the AST as JSON instead of prefix form
        #[arg(long)]
        json: bool,
    },

    /// Runs a file as a Lox program, or starts a REPL without one
    Run { filename: Option<PathBuf> },
}

/// Reads the contents of a file into a Vec<u8>
fn read_file(filename: &PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger(path: &PathBuf) -> Result<()> {
    let log_file = File::create(path).context(format!("Failed to create {:?}", path))?;

    // Writes to file with module and source line; RUST_LOG still overrides.
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
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to {:?}", path);
    Ok(())
}

fn tokenize(filename: &PathBuf) -> Result<i32> {
    let buf = read_file(filename)?;
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

    Ok(if tokenized { 0 } else { 65 })
}

fn parse(filename: &PathBuf, json: bool) -> Result<i32> {
    let buf = read_file(filename)?;
    let (tokens, lex_errors) = Scanner::new(&buf).scan_all();

    for e in &lex_errors {
        eprintln!("{}", e);
    }

    match Parser::new(tokens).parse() {
        Ok(statements) => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&statements).context("Failed to encode AST")?
                );
            } else {
                for stmt in &statements {
                    println!("{}", AstPrinter::print_stmt(stmt));
                }
            }

            Ok(if lex_errors.is_empty() { 0 } else { 65 })
        }
        Err(errors) => {
            for e in errors {
                eprintln!("{}", e);
            }

            Ok(65)
        }
    }
}

fn run_file(filename: &PathBuf) -> Result<i32> {
    let buf = read_file(filename)?;
    let mut session = Session::new();

    match session.run(&buf) {
        Ok(()) => {
            info!("Program executed successfully");
            Ok(0)
        }
        Err(e) => {
            debug!("Run failed: {:?}", e);
            eprintln!("{}", e);
            Ok(e.exit_code())
        }
    }
}

/// Each line is its own batch; errors are reported and forgotten, globals
/// survive.
fn run_prompt() -> Result<i32> {
    let mut session = Session::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        let Some(line) = lines.next() else {
            println!();
            return Ok(0);
        };
        let line = line.context("Failed to read from stdin")?;

        if let Err(e) = session.run(line.as_bytes()) {
            eprintln!("{}", e);
        }
    }
}

fn dispatch(commands: &Commands) -> Result<i32> {
    match commands {
        Commands::Tokenize { filename } => tokenize(filename),
        Commands::Parse { filename, json } => parse(filename, *json),
        Commands::Run {
            filename: Some(filename),
        } => run_file(filename),
        Commands::Run { filename: None } => run_prompt(),
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger(&args.log_file)?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    // Deep Lox recursion needs more than the default main-thread stack to
    // reach the interpreter's call-depth limit.
    let code: i32 = thread::Builder::new()
        .name("rox".into())
        .stack_size(INTERPRETER_STACK_SIZE)
        .spawn(move || dispatch(&args.commands))
        .context("Failed to spawn interpreter thread")?
        .join()
        .map_err(|_| anyhow!("Interpreter thread panicked"))??;

    if code != 0 {
        debug!("Exiting with code {}", code);
        std::process::exit(code);
    }

    Ok(())
}
