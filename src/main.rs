use clap::{Parser as ClapParser, Subcommand};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tool_form::cli::{self, CheckOptions, CliError, QueryOptions, RenderOptions};
use tool_form::output::JsonPrinter;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "tool-form")]
#[command(about = "tool-form - A declarative template engine for transforming JSON")]
#[command(version)]
struct Cli {
    /// Log template parsing and resource loading to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a template against JSON arguments
    Render {
        /// Path to the template file
        template: PathBuf,

        /// JSON arguments (reads from stdin if not provided)
        #[arg(short, long)]
        args: Option<String>,

        /// Base URI for resolving references (defaults to the template's path)
        #[arg(long)]
        base_uri: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Write encoded output as raw content instead of JSON
        #[arg(short, long)]
        raw: bool,

        /// Print payload headers before the output
        #[arg(long)]
        headers: bool,
    },

    /// Parse a template and its static includes without transforming it
    Check {
        /// Path to the template file
        template: PathBuf,

        /// Base URI for resolving references (defaults to the template's path)
        #[arg(long)]
        base_uri: Option<String>,
    },

    /// Run a query against JSON input
    Query {
        /// The query to execute
        query: String,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Evaluate a singular expression, with transform pipes
        #[arg(short, long)]
        singular: bool,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Render {
            template,
            args,
            base_uri,
            pretty,
            raw,
            headers,
        } => run_render(template, args, base_uri, pretty, raw, headers),
        Commands::Check { template, base_uri } => {
            let options = CheckOptions {
                template,
                base_uri,
            };
            cli::execute_check(&options).map(|()| println!("Template is valid"))
        }
        Commands::Query {
            query,
            input,
            singular,
            pretty,
        } => run_query(query, input, singular, pretty),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Read stdin when it is piped.
fn read_stdin() -> Result<Option<String>, CliError> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(Some(buffer))
}

fn run_render(
    template: PathBuf,
    args: Option<String>,
    base_uri: Option<String>,
    pretty: bool,
    raw: bool,
    headers: bool,
) -> Result<(), CliError> {
    let args = match args {
        Some(s) => Some(s),
        None => read_stdin()?,
    };

    let options = RenderOptions {
        template,
        args,
        base_uri,
        pretty,
        raw,
    };
    let output = cli::execute_render(&options)?;

    let mut stdout = io::stdout().lock();
    if headers {
        for (name, value) in &output.headers {
            writeln!(stdout, "{}: {}", name, value)?;
        }
        writeln!(stdout)?;
    }
    stdout.write_all(&output.body)?;
    if !raw {
        writeln!(stdout)?;
    }
    Ok(())
}

fn run_query(query: String, input: Option<String>, singular: bool, pretty: bool) -> Result<(), CliError> {
    let input = match input {
        Some(s) => Some(s),
        None => read_stdin()?,
    };

    let options = QueryOptions {
        query,
        input,
        singular,
    };
    let result = cli::execute_query(&options)?;

    let json = JsonPrinter::new(if pretty { 2 } else { 0 })
        .print(&result)
        .ok_or(CliError::Undefined)?;
    println!("{}", json);
    Ok(())
}
