use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use amr_daide::daide::{EnglishGenerator, Form, parse_daide};
use amr_daide::report::{BatchOptions, run_batch};
use amr_daide::{DaideTranslator, Lexicon, RuleTable};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// More log output on STDERR (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Lexical resource file replacing the built-in standard map
    #[arg(long, global = true, value_name = "FILE")]
    resources: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translates a stream of AMRs into DAIDE.
    AmrToDaide(AmrToDaideArgs),
    /// Glosses DAIDE expressions, one per line, in English.
    DaideToEnglish(DaideToEnglishArgs),
}

#[derive(Args)]
struct AmrToDaideArgs {
    /// AMR input (default: STDIN)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Text output (default: STDOUT)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// JSONL record output
    #[arg(short, long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Maximum number of AMRs to process
    #[arg(short, long)]
    max: Option<usize>,

    /// Hide known gaps and finish with a summary line
    #[arg(short, long)]
    developer_mode: bool,

    /// Rule table replacing the built-in one
    #[arg(long, value_name = "FILE")]
    rules: Option<PathBuf>,
}

#[derive(Args)]
struct DaideToEnglishArgs {
    /// DAIDE input (default: STDIN)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Text output (default: STDOUT)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("amr_daide={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let lexicon = match &cli.resources {
        Some(path) => Lexicon::from_file(path)?,
        None => Lexicon::builtin(),
    };

    match cli.command {
        Commands::AmrToDaide(args) => amr_to_daide(&lexicon, args),
        Commands::DaideToEnglish(args) => daide_to_english(&lexicon, args),
    }
}

fn amr_to_daide(lexicon: &Lexicon, args: AmrToDaideArgs) -> Result<ExitCode> {
    let rules = match &args.rules {
        Some(path) => RuleTable::from_file(path)?,
        None => RuleTable::builtin().context("Built-in rule table is invalid")?,
    };
    let translator = DaideTranslator::new(lexicon, &rules);

    let input = read_input(args.input.as_deref())?;
    let mut out = open_output(args.output.as_deref())?;
    let mut json = args.json.as_deref().map(create_file).transpose()?;

    let options = BatchOptions {
        max: args.max,
        developer_mode: args.developer_mode,
        // With -j and no -o, STDOUT stays quiet.
        echo_blocks: !(args.json.is_some() && args.output.is_none()),
    };
    let outcome = run_batch(&input, &translator, options, &mut out, json.as_mut())?;
    out.flush()?;
    if let Some(json) = json.as_mut() {
        json.flush()?;
    }

    info!(
        amrs = outcome.summary.amrs,
        failed = outcome.summary.failed_ids.len(),
        "batch done"
    );
    match outcome.stream_error {
        Some(e) => {
            error!("{e}");
            Ok(ExitCode::FAILURE)
        }
        None => Ok(ExitCode::SUCCESS),
    }
}

fn daide_to_english(lexicon: &Lexicon, args: DaideToEnglishArgs) -> Result<ExitCode> {
    let input = read_input(args.input.as_deref())?;
    let mut out = open_output(args.output.as_deref())?;
    let generator = EnglishGenerator::new(lexicon);
    let mut failures = 0usize;

    for line in input.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let parse = parse_daide(line, 0);
        writeln!(out, "DAIDE: {line}")?;
        for diagnostic in &parse.diagnostics {
            writeln!(out, "*** {diagnostic}")?;
        }
        match generator.render(&parse.tree, Form::Plain) {
            Ok(gloss) => writeln!(out, "Engl.: {}", gloss.finish())?,
            Err(e) => {
                failures += 1;
                writeln!(out, "*** {e}")?;
            }
        }
        writeln!(out)?;
    }
    out.flush()?;

    if failures > 0 {
        info!(failures, "some DAIDE lines could not be glossed");
    }
    Ok(ExitCode::SUCCESS)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read STDIN")?;
            Ok(input)
        }
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(create_file(path)?),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

fn create_file(path: &Path) -> Result<BufWriter<File>> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}
