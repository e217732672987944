use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use modbreak_core::cli::{CheckArgs, Cli, Commands, ExplainArgs, OutputFormat};
use modbreak_core::cli_report::{print_text, render_rule_explanation, render_rules_table};
use modbreak_core::config::{ModbreakConfig, check_threshold};
use modbreak_core::config_hierarchy::load_hierarchical_config;
use modbreak_core::engine::{CheckOptions, Engine, EngineConfig};
use modbreak_core::error::ModbreakError;
use modbreak_core::registry::{Registry, default_registry};
use modbreak_core::reporting::{render_report, write_report};
use modbreak_core::snapshot::ModuleSnapshot;

const EXIT_FAIL: u8 = 1;
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = color_eyre::install() {
        eprintln!("Failed to install error reporter: {err}");
    }
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(report) => {
            eprintln!("Error: {report:?}");
            if let Some(err) = report.downcast_ref::<ModbreakError>() {
                for hint in err.suggestions() {
                    eprintln!("  hint: {hint}");
                }
            }
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// `RUST_LOG` wins; otherwise `warn`, or `debug` with `--verbose`.
/// Logs go to stderr so they never mix with reports on stdout.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to install tracing subscriber");
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    tracing::debug!(?cli, "Parsed CLI arguments");
    let registry = default_registry();
    match cli.command {
        Commands::Check(args) => run_check(&args, registry),
        Commands::Rules => {
            print!("{}", render_rules_table(registry));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Explain(args) => run_explain(&args, registry),
    }
}

fn run_explain(args: &ExplainArgs, registry: &Registry) -> Result<ExitCode> {
    let id = resolve_rule(registry, &args.rule)?;
    let rule = registry
        .get(id)
        .ok_or_else(|| eyre!("rule {id} disappeared from the registry"))?;
    print!("{}", render_rule_explanation(rule.doc()));
    Ok(ExitCode::SUCCESS)
}

fn run_check(args: &CheckArgs, registry: &Registry) -> Result<ExitCode> {
    let hierarchical = load_hierarchical_config(args.config.as_deref())?;
    for source in &hierarchical.sources {
        tracing::debug!(
            kind = ?source.source_type,
            path = %source.path.display(),
            "Using config file"
        );
    }

    let mut config = hierarchical.merged;
    apply_scalar_overrides(&mut config, args)?;
    let mut engine_config = config.engine_config_for(registry)?;
    apply_rule_toggles(&mut engine_config, args, registry)?;

    let old = ModuleSnapshot::from_json_file(&args.old)
        .wrap_err_with(|| format!("failed to load old snapshot {}", args.old.display()))?;
    let new = ModuleSnapshot::from_json_file(&args.new)
        .wrap_err_with(|| format!("failed to load new snapshot {}", args.new.display()))?;

    let options = CheckOptions {
        include_remediation: config.general.include_remediation.unwrap_or(false),
    };
    let result = Engine::new(engine_config).check_with_options(&old, &new, &options);

    let format = config.general.format.unwrap_or_default();
    match (&config.general.output_file, format) {
        (Some(path), _) => write_report(&render_report(&result, format, registry)?, path)?,
        (None, OutputFormat::Text) => print_text(&result),
        (None, _) => println!("{}", render_report(&result, format, registry)?),
    }

    Ok(if result.is_fail() {
        ExitCode::from(EXIT_FAIL)
    } else {
        ExitCode::SUCCESS
    })
}

/// Layers command-line values over the merged config files.
fn apply_scalar_overrides(config: &mut ModbreakConfig, args: &CheckArgs) -> Result<()> {
    if let Some(fail_on) = args.fail_on {
        config.general.fail_on = Some(fail_on.into());
    }
    if let Some(format) = args.format {
        config.general.format = Some(format);
    }
    if args.include_remediation {
        config.general.include_remediation = Some(true);
    }
    if let Some(path) = &args.output_file {
        config.general.output_file = Some(path.clone());
    }
    if args.rename_detection {
        config.rename_detection.enabled = Some(true);
    }
    if let Some(threshold) = args.similarity_threshold {
        check_threshold(threshold)?;
        config.rename_detection.similarity_threshold = Some(threshold);
    }
    Ok(())
}

/// `--enable` and `--disable` act on resolved IDs; `--disable` wins when a
/// rule is named by both.
fn apply_rule_toggles(
    engine_config: &mut EngineConfig,
    args: &CheckArgs,
    registry: &Registry,
) -> Result<()> {
    for (rules, enabled) in [(&args.enable, true), (&args.disable, false)] {
        for rule in rules {
            let id = resolve_rule(registry, rule)?;
            engine_config.rules.entry(id.to_string()).or_default().enabled = Some(enabled);
        }
    }
    Ok(())
}

fn resolve_rule(registry: &Registry, rule: &str) -> Result<&'static str> {
    registry.resolve(rule).ok_or_else(|| {
        ModbreakError::invalid_input_with_arg(
            "unknown rule; run `modbreak rules` to list rule IDs and names",
            rule,
        )
        .into()
    })
}
