//! CLI module - Command-line interface definitions and handlers

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config;
use crate::core::finder;
use crate::core::rules::RuleSet;
use crate::core::script::{Mechanism, PreloadWriter, ScriptGenerator};

/// prewarm - generate PHP opcache preload scripts from a scanned file manifest.
#[derive(Parser, Debug)]
#[command(name = "prewarm")]
#[command(
    author,
    version,
    about,
    long_about = r#"prewarm scans a PHP project for source files and generates an opcache
preload script. Executing that script once (for example through the
opcache.preload ini directive, or at deploy time) compiles every listed
file into the opcache ahead of real traffic, cutting cold-start latency
for dependency-heavy applications.

Configuration lives in the "extra.preload" section of composer.json, or
in a standalone JSON file passed with --config. Recognized settings:
paths, files, exclude, extensions, exclude-regex, no-status-check,
mechanism.

Examples:
    prewarm generate
    prewarm generate --mechanism precompile --output var/preload.php
    prewarm generate --no-status-check
    prewarm list
"#
)]
pub struct Cli {
    /// Project root directory.
    #[arg(
        long,
        global = true,
        default_value = ".",
        value_name = "ROOT",
        long_help = "Project root directory (defaults to the current directory).\n\n\
Configured paths, the config file and the output path are resolved\n\
relative to this root."
    )]
    pub root: PathBuf,

    /// Configuration file, relative to ROOT unless absolute.
    #[arg(
        long,
        global = true,
        default_value = "composer.json",
        value_name = "FILE",
        long_help = "Configuration file to read the preload settings from.\n\n\
The settings are looked up under \"extra.preload\" (composer.json\n\
layout), then under a top-level \"preload\" key, then at the document\n\
root itself."
    )]
    pub config: PathBuf,

    /// Disable colored output.
    #[arg(
        long,
        global = true,
        long_help = "Disable colored output. This is useful when piping to files or when\n\
your terminal does not support ANSI colors."
    )]
    pub no_color: bool,

    /// Quiet mode (suppress the summary lines).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the preload script and write it to disk.
    #[command(
        long_about = "Scan the configured paths, build the preload manifest and write the\n\
generated script to the output path.\n\n\
Examples:\n\
  prewarm generate\n\
  prewarm generate --output var/preload.php --mechanism precompile\n"
    )]
    Generate {
        /// Destination for the generated script, relative to ROOT.
        #[arg(long, default_value = "vendor/preload.php", value_name = "FILE")]
        output: PathBuf,

        /// Omit the opcache status checks from the generated script.
        #[arg(
            long,
            long_help = "Do not include opcache status checks in the generated file.\n\n\
Useful when the generated script is included from another script that\n\
already performed these checks. Overrides the \"no-status-check\"\n\
configuration directive."
        )]
        no_status_check: bool,

        /// Override the configured load mechanism (require/precompile).
        #[arg(long, value_name = "MECHANISM")]
        mechanism: Option<String>,

        /// Prune a subdirectory (relative to each scanned path) from traversal.
        #[arg(long = "skip-dir", value_name = "DIR")]
        skip_dir: Vec<String>,
    },

    /// List the files that would be preloaded, without writing anything.
    #[command(
        long_about = "Dry run: scan the configured paths and print the preload manifest,\n\
one path per line, without generating or writing the script.\n\n\
Example:\n\
  prewarm list\n"
    )]
    List {
        /// Prune a subdirectory (relative to each scanned path) from traversal.
        #[arg(long = "skip-dir", value_name = "DIR")]
        skip_dir: Vec<String>,
    },
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Get absolute root path
    let root = cli.root.canonicalize().unwrap_or_else(|_| cli.root.clone());
    let config_path = if cli.config.is_absolute() {
        cli.config.clone()
    } else {
        root.join(&cli.config)
    };

    match cli.command {
        Commands::Generate {
            output,
            no_status_check,
            mechanism,
            skip_dir,
        } => run_generate(
            &root,
            &config_path,
            &output,
            no_status_check,
            mechanism.as_deref(),
            &skip_dir,
            cli.quiet,
        ),

        Commands::List { skip_dir } => run_list(&root, &config_path, &skip_dir, cli.quiet),
    }
}

fn build_rules(root: &Path, config: &config::PreloadConfig, skip_dirs: &[String]) -> Result<RuleSet> {
    let mut rules = config::build_ruleset(root, config)?;
    for dir in skip_dirs {
        rules.add_exclude_sub_dir(dir.clone());
    }
    Ok(rules)
}

fn run_generate(
    root: &Path,
    config_path: &Path,
    output: &Path,
    no_status_check: bool,
    mechanism: Option<&str>,
    skip_dirs: &[String],
    quiet: bool,
) -> Result<()> {
    let timer = Instant::now();

    let config = config::load(config_path)?;
    let mechanism = match mechanism {
        Some(value) => value.parse::<Mechanism>().map_err(|err| anyhow!(err))?,
        None => config.mechanism,
    };
    let status_check = !(no_status_check || config.no_status_check);

    let rules = build_rules(root, &config, skip_dirs)?;
    let manifest = finder::discover(&rules)?;

    let generator = ScriptGenerator::new(mechanism).with_status_check(status_check);
    let script = generator.generate(&manifest, root)?;

    let destination = if output.is_absolute() {
        output.to_path_buf()
    } else {
        root.join(output)
    };
    PreloadWriter::new(destination).write(&script)?;

    if !quiet {
        eprintln!("{}", "Preload file created successfully.".green());
        eprintln!(
            "Preload script ({}) contains {} files.",
            output.display().to_string().cyan(),
            script.count.to_string().cyan()
        );
        eprintln!(
            "Elapsed time: {} ms.",
            timer.elapsed().as_millis().to_string().cyan()
        );
    }

    Ok(())
}

fn run_list(root: &Path, config_path: &Path, skip_dirs: &[String], quiet: bool) -> Result<()> {
    let config = config::load(config_path)?;
    let rules = build_rules(root, &config, skip_dirs)?;
    let manifest = finder::discover(&rules)?;

    let files = manifest.files()?;
    let mut stdout = std::io::stdout().lock();
    for file in files {
        writeln!(stdout, "{}", file)?;
    }

    if !quiet {
        eprintln!("{} files matched.", files.len().to_string().cyan());
    }

    Ok(())
}
