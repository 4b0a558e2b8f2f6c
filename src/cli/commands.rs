use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{self, Config, Settings};
use crate::model::Model;
use crate::rules::{
    self, apply_rules, detect_form, CompileOptions, OperatorPolicy, RawTable, RuleDefinition,
    RunReport, TableForm,
};

use super::exit_codes;
use super::output::{self, ApplyData, CompileData, OutputMode, SummaryData};

#[derive(Parser)]
#[command(name = "rulebatch")]
#[command(about = "Apply tables of attribute rules to element models")]
#[command(version)]
pub struct Cli {
    /// Path to config file (overrides RULEBATCH_CONFIG env var and default location)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (auto-enabled when stdout is piped)
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Force text output even when stdout is piped
    #[arg(long, global = true, conflicts_with = "json")]
    pub no_json: bool,

    /// Suppress all output on success (errors still go to stderr)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log rule progress to stderr (RULEBATCH_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a rule table and print the resulting rules
    Compile {
        /// Rule table (JSON)
        table: PathBuf,

        /// Table shape: auto, wide, or flat (overrides settings.table_form)
        #[arg(long)]
        form: Option<TableForm>,

        /// Reject unknown properties and comparators
        #[arg(long)]
        strict: bool,

        /// Print one line per rule using {field} placeholders (e.g. "{label}: {target_attribute}")
        #[arg(long)]
        format: Option<String>,
    },

    /// Apply a rule table to a model snapshot
    Apply {
        /// Rule table (JSON)
        table: PathBuf,

        /// Model snapshot to update (JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Write the updated model here instead of overwriting the snapshot
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Evaluate rules and report planned writes without saving
        #[arg(long)]
        dry_run: bool,

        /// Table shape: auto, wide, or flat (overrides settings.table_form)
        #[arg(long)]
        form: Option<TableForm>,

        /// Reject unknown properties and comparators
        #[arg(long)]
        strict: bool,

        /// Exit with an error and save nothing when a rule matches no elements
        #[arg(long)]
        fail_on_unmatched: bool,

        /// Exit with an error and save nothing when any write is not applied
        #[arg(long)]
        fail_on_issues: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "settings.table_form")
        key: String,
        /// Value to set
        value: String,
    },
    /// Reset configuration to defaults
    Reset,
    /// Verify configuration file for errors
    Verify,
}

/// report an error in the active output mode and exit with `code`
fn exit_with(output_mode: OutputMode, code: i32, message: &str, details: Vec<String>) -> ! {
    if output_mode.is_json() {
        output::print_json_error(code, message, details);
    } else {
        eprintln!("Error: {}", message);
        for detail in &details {
            eprintln!("  - {}", detail);
        }
    }
    std::process::exit(code);
}

fn load_config(config_path: Option<&Path>, output_mode: OutputMode) -> Config {
    match config::load_with_override(config_path) {
        Ok(config) => config,
        Err(e) => exit_with(output_mode, exit_codes::CONFIG_ERROR, &format!("{:#}", e), vec![]),
    }
}

fn read_table(path: &Path) -> Result<RawTable> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rule table: {}", path.display()))?;
    RawTable::from_json(&content)
        .with_context(|| format!("Failed to parse rule table: {}", path.display()))
}

/// settings merged with per-command flags
fn compile_options(settings: &Settings, form: Option<TableForm>, strict: bool) -> CompileOptions {
    let mut options = settings.compile_options();
    if let Some(form) = form {
        options.form = form;
    }
    if strict {
        options.operators = OperatorPolicy::Strict;
    }
    options
}

fn compile_table(
    path: &Path,
    options: &CompileOptions,
    output_mode: OutputMode,
) -> (RawTable, Vec<RuleDefinition>) {
    let table = match read_table(path) {
        Ok(table) => table,
        Err(e) => exit_with(output_mode, exit_codes::INVALID_ARGS, &format!("{:#}", e), vec![]),
    };

    match rules::compile(&table, options) {
        Ok(rules) => (table, rules),
        Err(e) => exit_with(
            output_mode,
            exit_codes::COMPILE_ERROR,
            &format!("{}: {}", path.display(), e),
            vec![],
        ),
    }
}

pub fn execute(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Compile {
            table: table_path,
            form,
            strict,
            format,
        } => {
            let output_mode =
                OutputMode::from_flags(cli.json, cli.no_json, cli.quiet, format.is_some());
            let config = load_config(config_path, output_mode);
            let options = compile_options(&config.settings, form, strict);
            let (table, rules) = compile_table(&table_path, &options, output_mode);

            let form = match options.form {
                TableForm::Auto => detect_form(&table),
                form => form,
            };

            match output_mode {
                OutputMode::Json => output::print_json(&CompileData {
                    table: table_path.display().to_string(),
                    form,
                    rules: &rules,
                }),
                OutputMode::Format => {
                    let template = format.unwrap_or_default();
                    for rule in &rules {
                        println!("{}", output::format_template(&template, rule));
                    }
                }
                OutputMode::Text => {
                    println!("{} rule(s) from {} ({} form)", rules.len(), table_path.display(), form);
                    for rule in &rules {
                        println!("  {}", rule);
                    }
                }
                OutputMode::Quiet => {}
            }
            Ok(())
        }

        Commands::Apply {
            table: table_path,
            model: model_path,
            output: output_path,
            dry_run,
            form,
            strict,
            fail_on_unmatched,
            fail_on_issues,
        } => {
            let output_mode = OutputMode::from_flags(cli.json, cli.no_json, cli.quiet, false);
            let config = load_config(config_path, output_mode);
            let options = compile_options(&config.settings, form, strict);

            // nothing is written unless the table compiles
            let (_, rules) = compile_table(&table_path, &options, output_mode);

            let mut model = match Model::load(&model_path) {
                Ok(model) => model,
                Err(e) => exit_with(output_mode, exit_codes::INVALID_ARGS, &e.to_string(), vec![]),
            };

            let report = apply_rules(&mut model, &rules, &config.settings.apply_options());

            if fail_on_unmatched && report.unmatched().next().is_some() {
                let details = report
                    .unmatched()
                    .map(|r| format!("[{}] {} = \"{}\"", r.label, r.target_attribute, r.target_value))
                    .collect();
                exit_with(
                    output_mode,
                    exit_codes::NO_MATCH,
                    "rules matched no elements, model not saved",
                    details,
                );
            }

            if fail_on_issues && report.issues().next().is_some() {
                exit_with(
                    output_mode,
                    exit_codes::WRITE_ISSUES,
                    "attribute writes were not applied, model not saved",
                    issue_lines(&report),
                );
            }

            let saved_to = if dry_run {
                None
            } else {
                let target = output_path.unwrap_or_else(|| model_path.clone());
                model
                    .save(&target)
                    .with_context(|| format!("Failed to save model: {}", target.display()))?;
                Some(target)
            };

            match output_mode {
                OutputMode::Json => output::print_json(&ApplyData {
                    model: model_path.display().to_string(),
                    saved_to: saved_to.as_ref().map(|p| p.display().to_string()),
                    dry_run,
                    summary: SummaryData::from_report(&report),
                    report: &report,
                }),
                OutputMode::Text | OutputMode::Format => {
                    print_report(&report);
                    match &saved_to {
                        Some(path) => println!("Saved model to {}", path.display()),
                        None => println!("Dry run: model not saved"),
                    }
                }
                OutputMode::Quiet => {}
            }
            Ok(())
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let config = config::load_with_override(config_path)?;
                let json =
                    serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
                println!("{}", json);
                Ok(())
            }
            ConfigCommands::Path => {
                let path = config::get_config_path_with_override(config_path)?;
                println!("{}", path.display());
                Ok(())
            }
            ConfigCommands::Set { key, value } => {
                let mut config = config::load_with_override(config_path)?;
                config::set_value(&mut config, &key, &value)?;
                config::save_with_override(&config, config_path)?;
                if !cli.quiet {
                    println!("Set {} = {}", key, value);
                }
                Ok(())
            }
            ConfigCommands::Reset => {
                let config = Config::default();
                config::save_with_override(&config, config_path)?;
                if !cli.quiet {
                    println!("Configuration reset to defaults");
                }
                Ok(())
            }
            ConfigCommands::Verify => {
                let path = config::get_config_path_with_override(config_path)?;
                let errors = config::verify(&path)?;

                if errors.is_empty() {
                    if !cli.quiet {
                        println!("✓ Configuration is valid: {}", path.display());
                    }
                    Ok(())
                } else {
                    println!(
                        "✗ Configuration has {} error(s): {}",
                        errors.len(),
                        path.display()
                    );
                    println!();
                    for error in &errors {
                        println!("  - {}", error);
                    }
                    Err(anyhow!("configuration validation failed"))
                }
            }
        },
    }
}

fn issue_lines(report: &RunReport) -> Vec<String> {
    report
        .issues()
        .map(|(rule, issue)| {
            format!(
                "[{}] element {}: {} = \"{}\": {}",
                rule.label, issue.entity, issue.attribute, issue.attempted, issue.reason
            )
        })
        .collect()
}

fn print_report(report: &RunReport) {
    for rule in &report.rules {
        println!(
            "[{}] {} = \"{}\": {} matched, {} written",
            rule.label,
            rule.target_attribute,
            rule.target_value,
            rule.matched,
            rule.writes.len()
        );
        for bypass in &rule.bypassed {
            println!("    condition {} ignored: {}", bypass.condition + 1, bypass.reason);
        }
        if rule.is_unmatched() {
            println!("    no elements matched");
        }
    }

    let issues = issue_lines(report);
    if !issues.is_empty() {
        println!();
        println!("{} write(s) not applied:", issues.len());
        for line in &issues {
            println!("  - {}", line);
        }
    }

    println!();
    println!(
        "{} rule(s), {} write(s), {} unmatched",
        report.rules.len(),
        report.total_writes(),
        report.unmatched().count()
    );
}
