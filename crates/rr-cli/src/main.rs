//! Redirect Rules CLI
//!
//! CLI tool for compiling redirect rule files and inspecting the resulting index.

mod index;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};

use rr_core::{ExclusionReason, MatchResult, Matcher, RequestContext, RuleKind};

use crate::index::{compile_index, load_options, read_index, render, write_index, OptionOverrides, OutputFormat};

#[derive(Parser)]
#[command(name = "rr-cli")]
#[command(about = "Redirect rule compiler and tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a redirects CSV into an index
    Compile {
        /// JSON options file (csv, trailingSlash, alwaysRedirect, ...)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Rules CSV (overrides the options file)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Output index file
        #[arg(short, long, default_value = "redirects.json")]
        output: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Keep trailing slashes significant
        #[arg(long)]
        trailing_slash: bool,

        /// Redirect exact paths even when the query does not match
        #[arg(long)]
        always_redirect: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate an index file
    Validate {
        /// Index file to validate
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Dump index info
    Info {
        /// Index file to inspect
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Match request URIs against an index
    Match {
        /// Index file to match against
        #[arg(short, long)]
        input: PathBuf,

        /// Request URIs, e.g. /old/page?a=1
        #[arg(required = true)]
        uris: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Compile { verbose: true, .. });
    init_logging(verbose);

    let result = match cli.command {
        Commands::Compile {
            config,
            csv,
            output,
            format,
            trailing_slash,
            always_redirect,
            verbose,
        } => {
            let overrides = OptionOverrides {
                csv,
                trailing_slash,
                always_redirect,
            };
            cmd_compile(config.as_deref(), overrides, &output, format, verbose)
        }
        Commands::Validate { input } => cmd_validate(&input),
        Commands::Info { input } => cmd_info(&input),
        Commands::Match { input, uris } => cmd_match(&input, &uris),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn cmd_compile(
    config: Option<&Path>,
    overrides: OptionOverrides,
    output: &Path,
    format: OutputFormat,
    verbose: bool,
) -> Result<(), String> {
    let start = Instant::now();

    let options = load_options(config, overrides)?;
    log::debug!("compiling '{}'", options.csv.display());

    let (snapshot, stats) = compile_index(&options, verbose)?;
    let contents = render(&snapshot, format)?;
    write_index(output, &contents)?;

    let total_time = start.elapsed();
    let build = stats.build;

    println!("Compiled '{}' to '{}'", options.csv.display(), output.display());
    println!("  Rows:     {} accepted, {} rejected", stats.rows_accepted, stats.rows_rejected);
    println!("  Exact:    {} rules ({} overridden)", build.exact_rules, build.overridden);
    println!("  Pattern:  {} rules in {} nodes", build.pattern_rules, snapshot.index.forest.len());
    if build.dropped_parent_tokens > 0 {
        println!("  Dropped:  {} malformed parent tokens", build.dropped_parent_tokens);
    }
    println!("  Size:     {} bytes ({:.1} KB)", contents.len(), contents.len() as f64 / 1024.0);
    println!("  Time:     {:.1}ms", total_time.as_secs_f64() * 1000.0);

    Ok(())
}

fn cmd_validate(input: &Path) -> Result<(), String> {
    let snapshot = read_index(input)?;

    println!("Index '{}' is valid", input.display());
    println!("  Version:     {}", snapshot.version);
    println!("  Rules:       {}", snapshot.index.exact_rule_count() + snapshot.index.pattern_rule_count());

    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), String> {
    let snapshot = read_index(input)?;
    let index = &snapshot.index;

    println!("Index: {}", input.display());
    println!("  Version:          {}", snapshot.version);
    println!("  Trailing slash:   {}", index.options.trailing_slash);
    println!("  Always redirect:  {}", index.options.always_redirect);
    println!();

    println!("Exact:");
    println!("  Paths:       {}", index.exact.len());
    println!("  Rules:       {}", index.exact_rule_count());
    println!();

    println!("Patterns:");
    println!("  Nodes:       {}", index.forest.len());
    println!("  Rules:       {}", index.pattern_rule_count());
    println!();

    println!("Exclusions:");
    println!("  Literal:     {}", index.exclusions.punctual.len());
    println!("  Patterns:    {}", index.exclusions.patterns.len());

    Ok(())
}

fn cmd_match(input: &Path, uris: &[String]) -> Result<(), String> {
    let snapshot = read_index(input)?;
    let matcher = Matcher::new(&snapshot.index).map_err(|e| format!("Invalid index: {}", e))?;

    for uri in uris {
        let ctx = RequestContext::from_uri(uri);
        let outcome = match matcher.match_request(&ctx) {
            MatchResult::PassThrough => "pass through".to_string(),
            MatchResult::Excluded(ExclusionReason::Punctual) => "excluded (literal)".to_string(),
            MatchResult::Excluded(ExclusionReason::Pattern(pattern)) => format!("excluded by {}", pattern),
            MatchResult::Redirect(redirect) => {
                let kind = match redirect.kind {
                    RuleKind::Exact => "exact",
                    RuleKind::Pattern => "pattern",
                };
                format!("{} {} ({})", redirect.code, redirect.to, kind)
            }
        };
        println!("{} -> {}", uri, outcome);
    }

    Ok(())
}
