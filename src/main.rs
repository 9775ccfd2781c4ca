use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use nixdomain::types::{EntityKind, Role};
use nixdomain::{commands, diagnostics, info};

/// Command-line interface.
#[derive(Parser)]
#[command(name = "nixdomain", about = "Cross-referencing for Nix documentation in markdown")]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
    /// Log more (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

/// Subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Read every document, resolve every reference, report diagnostics
    Build {
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
        /// Exit 1 when any diagnostic was emitted
        #[arg(long)]
        strict: bool,
    },
    /// Print the options and library indices
    Index {
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Only the index of this kind (option, function, package)
        #[arg(long)]
        kind: Option<EntityKind>,
    },
    /// Reference card: syntax, exit codes, current state
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve one reference as if written inside the given context
    Resolve {
        /// Enclosing function paths, outermost first (repeatable)
        #[arg(long = "function-context")]
        function_context: Vec<String>,
        /// Enclosing option paths, outermost first (repeatable)
        #[arg(long = "option-context")]
        option_context: Vec<String>,
        /// Role to resolve with (option, func, pkg, bind, obj)
        #[arg(long, default_value = "obj")]
        role: Role,
        /// Target path as written in the reference
        target: String,
    },
    /// Print the attributes of a path, one per line
    Split {
        /// Attribute path, e.g. `services.nginx.virtualHosts."example.org".root`
        path: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let root = PathBuf::from(".");
    let result = match cli.command {
        Commands::Build { json, strict } => commands::build(&root, json, strict),
        Commands::Index { json, kind } => commands::index(&root, kind, json),
        Commands::Info { json } => {
            info::run(&root, json);
            Ok(ExitCode::SUCCESS)
        },
        Commands::Resolve { function_context, option_context, role, target } => {
            commands::resolve(&root, &target, role, option_context, function_context)
        },
        Commands::Split { path } => commands::split(&path),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(2)
        },
    };
}

/// Log to stderr. `RUST_LOG` wins; otherwise the level follows `-v`.
fn setup_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        return match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("nixdomain=info,warn"),
            _ => EnvFilter::new("nixdomain=debug,info"),
        };
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
