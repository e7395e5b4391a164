/*!
# PSHelp Analyzer CLI

Command-line interface for the PowerShell parameter documentation analyzer.
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::info;

use pshelp_analyzer::cli_common::{
    collect_script_files, format_duration, init_logging, print_error, print_success,
    print_warning, validate_path, write_output,
};
use pshelp_analyzer::help::collect_help;
use pshelp_analyzer::reports::ReportSummary;
use pshelp_analyzer::rules::RuleRegistry;
use pshelp_analyzer::{
    analyze_file, analyze_tree_json, generate_report, AnalysisError, AnalyzerConfig, Ast,
    FileReport, ReportFormat, RulesEngine, ScriptParser,
};

#[derive(Parser)]
#[command(
    name = "pshelp-analyzer",
    version = env!("CARGO_PKG_VERSION"),
    about = "Finds PowerShell function parameters missing from comment-based help"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze PowerShell scripts
    Analyze {
        /// Script files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Output format (text, json, sarif)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file (TOML or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Do not evaluate dynamicparam blocks
        #[arg(long)]
        no_dynamic: bool,

        /// Bound on one dynamicparam evaluation, in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// PowerShell executable used for dynamicparam blocks
        #[arg(long)]
        interpreter: Option<String>,

        /// Inputs are syntax trees dumped as JSON instead of scripts
        #[arg(long)]
        tree_json: bool,
    },

    /// Rules management
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// Print the syntax tree of a script as JSON
    DumpTree {
        /// Script file
        file: PathBuf,

        /// Print each function's parsed help instead of the tree
        #[arg(long)]
        help_info: bool,
    },
}

#[derive(Subcommand)]
enum RulesAction {
    /// List available rules
    List {
        /// Configuration file (TOML or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write an example configuration file
    GenerateConfig {
        /// Output file; `.yaml`/`.yml` writes YAML
        #[arg(short, long, default_value = "pshelp.toml")]
        output: PathBuf,
    },
}

struct AnalyzeOptions {
    paths: Vec<PathBuf>,
    recursive: bool,
    format: String,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    no_dynamic: bool,
    timeout_ms: Option<u64>,
    interpreter: Option<String>,
    tree_json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    if let Err(e) = init_logging(cli.verbose, cli.quiet) {
        print_warning(&e.to_string());
    }

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            print_error(&format!("{:#}", e));
            ExitCode::from(2)
        }
    }
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Analyze {
            paths,
            recursive,
            format,
            output,
            config,
            no_dynamic,
            timeout_ms,
            interpreter,
            tree_json,
        } => analyze_command(AnalyzeOptions {
            paths,
            recursive,
            format,
            output,
            config,
            no_dynamic,
            timeout_ms,
            interpreter,
            tree_json,
        }),
        Commands::Rules { action } => {
            rules_command(action)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::DumpTree { file, help_info } => {
            dump_tree_command(&file, help_info)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalyzerConfig> {
    match path {
        Some(path) => {
            validate_path(path, "Configuration file")?;
            AnalyzerConfig::load_from_file(path)
        }
        None => Ok(AnalyzerConfig::default()),
    }
}

fn analyze_command(options: AnalyzeOptions) -> Result<ExitCode> {
    let start_time = Instant::now();
    let format: ReportFormat = options.format.parse()?;

    let mut config = load_config(options.config.as_deref())?;
    let dynamic = &mut config.settings.dynamic_parameters;
    if options.no_dynamic {
        dynamic.enabled = false;
    }
    if let Some(timeout_ms) = options.timeout_ms {
        dynamic.timeout_ms = timeout_ms;
    }
    if let Some(interpreter) = options.interpreter {
        dynamic.interpreter = interpreter;
    }
    if !config.settings.use_colors {
        colored::control::set_override(false);
    }
    if let Some(threads) = config.settings.threads.filter(|&threads| threads > 0) {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            tracing::warn!("Failed to configure {} worker threads: {}", threads, e);
        }
    }

    let files = if options.tree_json {
        for path in &options.paths {
            validate_path(path, "Input path")?;
        }
        options.paths.clone()
    } else {
        collect_script_files(&options.paths, options.recursive)?
    };
    if files.is_empty() {
        print_warning("No PowerShell scripts found");
    }
    info!("Analyzing {} file(s)", files.len());

    let engine = RulesEngine::new(config);
    let reports: Vec<FileReport> = files
        .par_iter()
        .map(|path| analyze_path(&engine, path, options.tree_json))
        .collect();

    let use_colors =
        options.output.is_none() && colored::control::SHOULD_COLORIZE.should_colorize();
    let rendered = generate_report(format, &reports, use_colors)?;
    write_output(options.output.as_deref(), &rendered)?;

    let summary = ReportSummary::from_files(&reports);
    info!(
        "Analyzed {} file(s) in {}",
        summary.files,
        format_duration(start_time.elapsed())
    );
    tracing::debug!("{}", engine.get_summary());
    if let Some(output) = &options.output {
        print_success(&format!("Report written to {}", output.display()));
    }

    if summary.diagnostics > 0 || summary.failed_files > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn analyze_path(engine: &RulesEngine, path: &Path, tree_json: bool) -> FileReport {
    let shown = path.display().to_string();
    let result = if tree_json {
        std::fs::read_to_string(path)
            .map_err(|e| AnalysisError::io(path, e))
            .and_then(|json| analyze_tree_json(engine, &json, Some(&shown)))
    } else {
        analyze_file(engine, path)
    };

    match result {
        Ok(diagnostics) => FileReport::new(shown, diagnostics),
        Err(e) => {
            tracing::error!("{}: {}", shown, e);
            FileReport::failed(shown, e.to_string())
        }
    }
}

fn rules_command(action: RulesAction) -> Result<()> {
    match action {
        RulesAction::List { config } => {
            let config = load_config(config.as_deref())?;
            let registry = RuleRegistry::builtin(&config.settings);
            for rule in registry.rules() {
                let metadata = rule.metadata();
                let state = if config.is_rule_enabled(&metadata.name) {
                    "enabled".green()
                } else {
                    "disabled".red()
                };
                println!(
                    "{} [{}] ({}) {}",
                    metadata.name.bold(),
                    metadata.severity,
                    state,
                    metadata.common_name
                );
                println!("    {}", metadata.description.dimmed());
            }
        }
        RulesAction::GenerateConfig { output } => {
            AnalyzerConfig::create_example_config(&output)?;
            print_success(&format!("Configuration written to {}", output.display()));
        }
    }
    Ok(())
}

fn dump_tree_command(file: &Path, help_info: bool) -> Result<()> {
    validate_path(file, "Script file")?;
    let tree = ScriptParser::new()
        .parse_file(file)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let json = if help_info {
        let entries: Vec<serde_json::Value> = collect_help(Ast::from(&tree))
            .into_iter()
            .map(|(function, help)| {
                serde_json::json!({
                    "function": function.name,
                    "line": function.extent.start_line,
                    "help": help,
                })
            })
            .collect();
        serde_json::to_string_pretty(&entries)
    } else {
        serde_json::to_string_pretty(&tree)
    }
    .context("Failed to serialize syntax tree")?;

    println!("{}", json);
    Ok(())
}
