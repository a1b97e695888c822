use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

#[derive(Debug, Parser)]
struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a program and print the final value of every assigned variable
    Run(RunArgs),
    /// Print the token stream of a program
    Tokens(FileArgs),
    /// Print the parsed program
    Ast(FileArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    file: String,

    /// Skip the name resolution pass
    #[arg(long)]
    no_check: bool,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Debug, Args)]
struct FileArgs {
    file: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Failed to read {0}: {1}")]
    Read(String, std::io::Error),
    #[error(transparent)]
    Pascal(#[from] pascal::Error),
    #[error(transparent)]
    Parse(#[from] pascal::parser::ParseError),
    #[error(transparent)]
    Lex(#[from] pascal::lexer::LexError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn main() {
    let args = Cli::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let result = match &args.command {
        Command::Run(args) => run_command(args),
        Command::Tokens(args) => tokens_command(args),
        Command::Ast(args) => ast_command(args),
    };

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn read_source(file: &str) -> Result<String, CliError> {
    std::fs::read_to_string(file).map_err(|e| CliError::Read(file.to_string(), e))
}

fn run_command(args: &RunArgs) -> Result<(), CliError> {
    let source = read_source(&args.file)?;
    let options = pascal::Options {
        check_names: !args.no_check,
    };
    let store = pascal::interpret(&source, options)?;

    match args.format {
        Format::Text => {
            for (name, value) in &store {
                println!("{name} = {value}");
            }
        }
        Format::Json => println!("{}", serde_json::to_string_pretty(&store)?),
    }

    Ok(())
}

fn tokens_command(args: &FileArgs) -> Result<(), CliError> {
    let source = read_source(&args.file)?;
    let mut line = 0;
    for token in pascal::lexer::tokens(&source)? {
        if token.span.start_line != line {
            print!("{:4} ", token.span.start_line);
            line = token.span.start_line;
        } else {
            print!("   | ");
        }

        println!("{:<20} {}", format!("{:?}", token.token_type), token.lexeme);
    }

    Ok(())
}

fn ast_command(args: &FileArgs) -> Result<(), CliError> {
    let source = read_source(&args.file)?;
    let program = pascal::parser::program(&source)?;
    println!("{program}");
    Ok(())
}
