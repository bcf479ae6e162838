//! sqlint CLI - layout linter for SQL concrete syntax trees

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use glob::glob;
use globset::{Glob, GlobSet, GlobSetBuilder};
use sqlint::config::{ColorMode, Config, OutputFormat};
use sqlint::cst::CstFile;
use sqlint::engine::Engine;
use sqlint::fixer::{generate_unified_diff, Fixer};
use sqlint::output::formatter_for;
use sqlint::rule::{RuleMetadata, RuleStability};
use sqlint::rules::find_rule;
use sqlint::Severity;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "sqlint",
    version,
    about = "SQL layout linter",
    long_about = "Lints concrete syntax trees written by a SQL parser (.cst.json / .cst.yaml)."
)]
struct Cli {
    /// Files, directories or glob patterns to lint
    files: Vec<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Disable specific rules (comma-separated ids or names)
    #[arg(long, value_delimiter = ',')]
    disable: Option<Vec<String>>,

    /// Only enable specific rules (comma-separated ids or names)
    #[arg(long, value_delimiter = ',')]
    select: Option<Vec<String>>,

    /// Print a diff of the fixed SQL (nothing is written)
    #[arg(long)]
    fix: bool,

    /// Include unsafe fixes (with --fix)
    #[arg(long, requires = "fix")]
    unsafe_fixes: bool,

    /// List available rules and exit
    #[arg(long)]
    list_rules: bool,

    /// Show detailed information about a specific rule
    #[arg(long)]
    explain: Option<String>,

    /// Show per-rule timing statistics
    #[arg(long)]
    stats: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    Compact,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::Compact => OutputFormat::Compact,
        }
    }
}

fn severity_str(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Error => "error".red(),
        Severity::Warning => "warning".yellow(),
        Severity::Info => "info".blue(),
    }
}

fn print_rule(rule: &RuleMetadata) {
    let stability_marker = match rule.stability {
        RuleStability::Preview => " [preview]".yellow(),
        RuleStability::Deprecated => " [deprecated]".red(),
        RuleStability::Stable => "".normal(),
    };
    let fix_marker = if rule.fix_compatible {
        " [fix]".green()
    } else {
        "".normal()
    };

    println!(
        "    {} {} [{}] ({}){}{}",
        rule.id.cyan(),
        rule.name,
        severity_str(rule.severity),
        rule.category,
        stability_marker,
        fix_marker
    );
    println!("      {}", rule.description);
}

/// Print detailed rule explanation
fn explain_rule(rule: &RuleMetadata) {
    println!("{}", "Rule Details".bold());
    println!();
    println!("  {}: {}", "ID".bold(), rule.id.cyan());
    println!("  {}: {}", "Name".bold(), rule.name);
    println!("  {}: {}", "Severity".bold(), severity_str(rule.severity));
    println!("  {}: {}", "Category".bold(), rule.category);
    println!("  {}: {}", "Stability".bold(), rule.stability);

    println!();
    println!("  {}", "Description".bold());
    println!("  {}", rule.description);

    if let Some(rationale) = &rule.rationale {
        println!();
        println!("  {}", "Rationale".bold());
        println!("  {}", rationale);
    }

    if let Some(bad) = &rule.example_bad {
        println!();
        println!("  {} {}", "Example".bold(), "(incorrect)".red());
        for line in bad.lines() {
            println!("    {}", line);
        }
    }

    if let Some(good) = &rule.example_good {
        println!();
        println!("  {} {}", "Example".bold(), "(correct)".green());
        for line in good.lines() {
            println!("    {}", line);
        }
    }

    if rule.fix_compatible {
        println!();
        println!("  {}", "Auto-fix Available".bold());
    }

    if !rule.related.is_empty() {
        println!();
        println!("  {}: {}", "Related Rules".bold(), rule.related.join(", "));
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_default().unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable default config: {}", e);
            Config::default()
        }),
    };

    config.merge_cli(
        cli.format.map(OutputFormat::from),
        cli.verbose.then_some(true),
        cli.jobs,
        cli.disable.clone(),
        cli.select.clone(),
    );
    if cli.no_color {
        config.output.color = ColorMode::Never;
    }
    Ok(config)
}

fn include_set(config: &Config) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in &config.files.include {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid include '{}'", pattern))?);
    }
    Ok(builder.build()?)
}

/// Expand arguments into CST files. Directories are searched for the
/// configured include patterns.
fn collect_files(patterns: &[String], config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let include = include_set(config)?;
    let mut files: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_dir() {
            let walk = format!("{}/**/*", pattern.trim_end_matches('/'));
            for entry in glob(&walk)?.flatten() {
                if entry.is_file() && include.is_match(&entry) {
                    files.push(entry);
                }
            }
            continue;
        }

        let paths = glob(pattern).with_context(|| format!("Invalid pattern '{}'", pattern))?;
        let before = files.len();
        files.extend(paths.flatten().filter(|entry| entry.is_file()));
        if files.len() == before && !path.exists() {
            // Let the engine report it as unreadable
            files.push(path.to_path_buf());
        }
    }

    files.retain(|f| !config.files.is_excluded(f));
    files.sort();
    files.dedup();
    Ok(files)
}

/// Print a diff of the fixed SQL for each file. Returns the number of fixes applied.
fn show_fixes(engine: &Engine, files: &[PathBuf], fixer: &Fixer, verbose: bool) -> usize {
    let mut applied = 0;

    for path in files {
        let cst = match CstFile::load(path) {
            Ok(cst) => cst,
            Err(e) => {
                log::debug!("Skipping fixes for {}: {}", path.display(), e);
                continue;
            }
        };
        let display_path = cst.display_path(path);
        let result = engine.lint_tree(&cst.tree, display_path);
        if verbose {
            eprint!("{}", fixer.format_fixes(&result.diagnostics));
        }
        let (fixed, fix_result) = fixer.apply(&cst.tree, &result.diagnostics);

        for error in &fix_result.errors {
            eprintln!(
                "{}: {}: {}",
                "warning".yellow().bold(),
                display_path.display(),
                error
            );
        }
        if fixed.raw() != cst.tree.raw() {
            print!(
                "{}",
                generate_unified_diff(display_path, cst.tree.raw(), fixed.raw())
            );
        }
        applied += fix_result.fixes_applied;
    }

    applied
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    if let Some(reference) = &cli.explain {
        let Some(rule) = find_rule(reference) else {
            eprintln!("{}: Rule '{}' not found", "error".red().bold(), reference);
            eprintln!();
            eprintln!("Use {} to see all available rules", "--list-rules".cyan());
            return Ok(1);
        };
        explain_rule(rule.metadata());
        return Ok(0);
    }

    let config = load_config(&cli)?;
    match config.output.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {}
    }

    let engine = Engine::new(config);

    if cli.list_rules {
        println!("{}", "Available rules:".bold());
        println!();
        for rule in engine.rules() {
            let metadata = rule.metadata();
            if engine.config().is_rule_enabled(metadata) {
                print_rule(metadata);
            }
        }
        return Ok(0);
    }

    if cli.files.is_empty() {
        eprintln!("{}: No files specified", "error".red().bold());
        eprintln!();
        eprintln!("Usage: sqlint [OPTIONS] <FILES>...");
        eprintln!();
        eprintln!("For more information, try '--help'");
        return Ok(2);
    }

    let config = engine.config();
    let files = collect_files(&cli.files, config)?;
    if files.is_empty() {
        bail!("No files found to lint");
    }
    if config.output.verbose {
        eprintln!("Linting {} file(s)", files.len());
    }

    if cli.fix {
        let fixer = Fixer::new().with_unsafe_fixes(cli.unsafe_fixes);
        let applied = show_fixes(&engine, &files, &fixer, config.output.verbose);
        eprintln!("{} fix(es) available; no files were modified", applied);
    }

    let result = engine.lint(&files);

    let colored = match config.output.color {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => std::io::stdout().is_terminal(),
    };
    let formatter = formatter_for(
        config.output.format,
        colored,
        config.output.show_statistics(),
    );
    print!("{}", formatter.format(&result));

    if cli.stats {
        eprintln!();
        eprintln!("{}", result.format_timings());
    }

    Ok(result.exit_code())
}

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            2
        }
    };
    std::process::exit(exit_code);
}
