use std::path::Path;
use std::process;

use clap::{Parser, ValueEnum};
use jscfg_driver::{BuildOptions, OutputFormat, build_file};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "jscfg", about = "jscfg: SSA control-flow graphs for JavaScript")]
struct Cli {
    /// Input JavaScript file.
    input: String,

    /// Output file path (stdout if omitted).
    #[arg(short, long)]
    output: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Dot)]
    format: Format,

    /// Fail if any construct was left untranslated.
    #[arg(long)]
    strict: bool,

    /// Skip the semantic early-error check.
    #[arg(long)]
    no_check: bool,

    /// Log verbosity (-v debug, -vv trace). `RUST_LOG` overrides it.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    /// Graphviz, one digraph per unit.
    Dot,
    /// Plain-text block listing.
    Summary,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Dot => OutputFormat::Dot,
            Format::Summary => OutputFormat::Summary,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let path = Path::new(&cli.input);
    if !path.exists() {
        eprintln!("error: file not found: {}", cli.input);
        process::exit(1);
    }

    let options = BuildOptions {
        format: cli.format.into(),
        strict: cli.strict,
        check_syntax: !cli.no_check,
    };

    let rendered = match build_file(path, &options) {
        Ok(rendered) => rendered,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    match &cli.output {
        Some(output) => {
            if let Err(e) = std::fs::write(output, rendered) {
                eprintln!("error: cannot write {output}: {e}");
                process::exit(1);
            }
            tracing::info!(%output, "graphs written");
        }
        None => print!("{rendered}"),
    }
}
