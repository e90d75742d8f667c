//! Command handlers behind the `psamfinder` binary.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::actions::{
    confirm, execute_deletion, plan_deletion, prompt_selections, select_by_policy, DeleteMethod,
    DeleteOptions, DeletionOutcome, DeletionPlan,
};
use crate::analysis::{AnalyzerConfig, SimilarityAnalyzer};
use crate::cli::{Cli, Commands, OutputFormat, ScanArgs, ThresholdArgs};
use crate::config::Settings;
use crate::diagnostics::DiagnosticLog;
use crate::duplicates::{DuplicateFinder, FinderConfig};
use crate::error::ExitCode;
use crate::logging::init_logging;
use crate::output::{write_json, JsonDeletion, JsonScanOutput, JsonThresholdOutput, TextOutput};
use crate::progress::Progress;
use crate::scanner::WalkerConfig;

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Copy)]
struct Globals {
    quiet: bool,
    color: bool,
}

/// Run the parsed command line and return the process exit code.
///
/// # Errors
///
/// Returns an error for an invalid directory, an invalid configuration, an
/// unusable flag combination, or a failure writing output.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }
    let globals = Globals {
        quiet: cli.quiet,
        color: !cli.no_color && io::stdout().is_terminal(),
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout().lock();
    let mut err = io::stderr().lock();

    match &cli.command {
        Commands::Scan(args) => {
            let settings = Settings::load(cli.config.as_deref(), &args.overrides())
                .context("failed to load configuration")?;
            run_scan(args, &settings, globals, &mut input, &mut out, &mut err)
        }
        Commands::Threshold(args) => {
            let settings = Settings::load(cli.config.as_deref(), &args.overrides())
                .context("failed to load configuration")?;
            run_threshold(args, &settings, globals, &mut out, &mut err)
        }
    }
}

fn require_directory(path: &Path) -> Result<()> {
    if !path.is_dir() {
        bail!("{} is not an existing directory", path.display());
    }
    Ok(())
}

/// JSON runs echo diagnostics to the log; text runs print the collected
/// list to `err` at the end.
fn diagnostic_log(json: bool) -> DiagnosticLog {
    if json {
        DiagnosticLog::echoing()
    } else {
        DiagnosticLog::new()
    }
}

fn run_scan<R: BufRead, W: Write, E: Write>(
    args: &ScanArgs,
    settings: &Settings,
    globals: Globals,
    input: &mut R,
    out: &mut W,
    err: &mut E,
) -> Result<ExitCode> {
    require_directory(&args.path)?;
    let json = args.output == OutputFormat::Json;
    if json && args.wants_deletion() && (args.keep.is_none() || !(args.yes || args.dry_run)) {
        bail!("--output json with --delete needs --keep and either --yes or --dry-run");
    }

    let text = TextOutput::new(globals.color);
    if !globals.quiet && !json {
        writeln!(out, "Scanning: {} ...", args.path.display())?;
    }

    let progress = Arc::new(Progress::new(globals.quiet || json));
    let config = FinderConfig::default()
        .with_fuzzy(args.fuzzy_images)
        .with_threshold(settings.similarity_threshold)
        .with_digest_algorithm(settings.hash_algorithm)
        .with_perceptual_algorithm(settings.perceptual_algorithm)
        .with_io_threads(settings.io_threads)
        .with_walker_config(WalkerConfig::new(settings.skip_hidden))
        .with_progress_callback(progress);

    let sink = diagnostic_log(json);
    let (groups, summary) = DuplicateFinder::new(config)
        .find_duplicates(&args.path, &sink)
        .with_context(|| format!("cannot scan {}", args.path.display()))?;

    if !json {
        text.write_groups(out, &groups)?;
    }

    let mut deletion: Option<(Vec<DeletionPlan>, Vec<DeletionOutcome>)> = None;
    if args.wants_deletion() && !groups.is_empty() {
        // Dry runs skip confirmation.
        let proceed =
            args.yes || args.dry_run || confirm(input, out, "\nProceed with deletion?")?;
        if proceed {
            let selections = match args.keep {
                Some(policy) => select_by_policy(&groups, policy),
                None => prompt_selections(&groups, input, out)?,
            };
            let method = if settings.use_trash {
                DeleteMethod::Trash
            } else {
                DeleteMethod::Permanent
            };
            let options = DeleteOptions {
                dry_run: args.dry_run,
                method,
            };
            let plans = plan_deletion(&groups, &selections, &sink);
            let outcomes = execute_deletion(plans.clone(), &options, &sink);
            deletion = Some((plans, outcomes));
        } else {
            writeln!(out, "Cancelled")?;
        }
    }

    let diagnostics = sink.into_inner();
    let exit_code = ExitCode::from_diagnostic_count(diagnostics.len());

    if json {
        let doc = JsonScanOutput::new(
            &groups,
            &summary,
            &diagnostics,
            deletion
                .as_ref()
                .map(|(plans, outcomes)| JsonDeletion::new(args.dry_run, plans, outcomes)),
            exit_code,
        );
        write_json(out, &doc, true)?;
    } else {
        if let Some((_, outcomes)) = &deletion {
            writeln!(out)?;
            text.write_outcomes(out, outcomes, args.dry_run)?;
        }
        if !globals.quiet {
            text.write_summary(out, &summary)?;
        }
        // Printed even when quiet.
        text.write_diagnostics(err, &diagnostics)?;
    }

    Ok(exit_code)
}

fn run_threshold<W: Write, E: Write>(
    args: &ThresholdArgs,
    settings: &Settings,
    globals: Globals,
    out: &mut W,
    err: &mut E,
) -> Result<ExitCode> {
    require_directory(&args.path)?;
    let json = args.output == OutputFormat::Json;
    if !globals.quiet && !json {
        writeln!(out, "Analyzing images in: {} ...", args.path.display())?;
    }

    let config = AnalyzerConfig::default()
        .with_max_images(settings.max_images)
        .with_verbose(args.verbose_report)
        .with_algorithm(settings.perceptual_algorithm)
        .with_io_threads(settings.io_threads)
        .with_walker_config(WalkerConfig::new(settings.skip_hidden));

    let sink = diagnostic_log(json);
    let report = SimilarityAnalyzer::new(config)
        .analyze(&args.path, &sink)
        .with_context(|| format!("cannot analyze {}", args.path.display()))?;
    let diagnostics = sink.into_inner();

    let exit_code = if report.is_sufficient() {
        ExitCode::from_diagnostic_count(diagnostics.len())
    } else {
        ExitCode::GeneralError
    };

    if json {
        let doc = JsonThresholdOutput::new(&report, &diagnostics, exit_code);
        write_json(out, &doc, true)?;
    } else {
        let text = TextOutput::new(globals.color);
        text.write_report(out, &report)?;
        text.write_diagnostics(err, &diagnostics)?;
    }
    Ok(exit_code)
}
