//! cdeps CLI
//!
//! Command-line interface for scrubbing C sources and extracting their
//! directives and dependencies.

use anyhow::{Context, Result};
use cdeps_core::config::Config;
use cdeps_core::Dependency;
use cdeps_parser::lines::{ok_lines, split_lines};
use cdeps_parser::parallel::{summarize, ParallelScanner};
use cdeps_parser::preprocessor::parse_directives;
use cdeps_parser::{
    iter_compiler_refs, scrub_lines, DirectiveKind, DirectiveMode, FsIncludeLoader, HeaderResolver,
    NoIncludes,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cdeps")]
#[command(author, version, about = "C source scrubbing and dependency extraction", long_about = None)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a file with comments and string contents blanked
    Scrub {
        /// Source file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Blank directive lines too
        #[arg(long)]
        blank_directives: bool,

        /// Directive kinds kept when blanking (e.g. include,define)
        #[arg(long, value_name = "KINDS", requires = "blank_directives")]
        keep: Option<String>,
    },

    /// List the preprocessor directives of a file
    Directives {
        /// Source file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the file with directives in canonical form instead
        #[arg(long)]
        normalize: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// List the references of a file
    Refs {
        /// Source file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Follow user includes
        #[arg(long)]
        follow: bool,

        /// Include directory, searched in order
        #[arg(short = 'I', long = "include-dir", value_name = "DIR")]
        include_dirs: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Scan every source file under a directory
    Scan {
        /// Directory to scan
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Scrub {
            file,
            blank_directives,
            keep,
        } => {
            cmd_scrub(&file, &config, blank_directives, keep.as_deref())?;
        }
        Commands::Directives {
            file,
            normalize,
            format,
        } => {
            cmd_directives(&file, &config, normalize, format)?;
        }
        Commands::Refs {
            file,
            follow,
            include_dirs,
            format,
        } => {
            let mut config = config;
            config.scan.follow_includes |= follow;
            config.includes.include_dirs.extend(include_dirs);
            cmd_refs(&file, &config, format)?;
        }
        Commands::Scan { dir, format } => {
            cmd_scan(&dir, config, format)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn cmd_scrub(file: &Path, config: &Config, blank_directives: bool, keep: Option<&str>) -> Result<()> {
    let source = read_source(file)?;
    let scrubbed = scrub_lines(ok_lines(split_lines(&source)), config.scan.keep_includes);

    let lines: Vec<String> = if blank_directives {
        let keep = match keep {
            Some(kinds) => DirectiveKind::parse_kinds(kinds)?,
            None => Default::default(),
        };
        parse_directives(scrubbed, DirectiveMode::Blank { keep })
            .with_filename(file.to_string_lossy())
            .lines()
            .collect::<cdeps_core::Result<_>>()
    } else {
        scrubbed.collect::<cdeps_core::Result<_>>()
    }
    .with_context(|| format!("Failed to scrub {}", file.display()))?;

    print!("{}", lines.concat());
    Ok(())
}

fn cmd_directives(file: &Path, config: &Config, normalize: bool, format: Format) -> Result<()> {
    let source = read_source(file)?;
    let scrubbed = scrub_lines(ok_lines(split_lines(&source)), config.scan.keep_includes);
    let filename = file.to_string_lossy();

    if normalize {
        let lines = parse_directives(scrubbed, DirectiveMode::normalize())
            .with_filename(filename)
            .lines()
            .collect::<cdeps_core::Result<Vec<_>>>()
            .with_context(|| format!("Failed to parse {}", file.display()))?;
        print!("{}", lines.concat());
        return Ok(());
    }

    let directives = parse_directives(scrubbed, DirectiveMode::Identify)
        .with_filename(filename)
        .directives()
        .collect::<cdeps_core::Result<Vec<_>>>()
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&directives)?),
        Format::Text => {
            for directive in &directives {
                println!("{:>5}  {}", directive.lineno(), directive.text().replace('\n', " "));
            }
        }
    }
    Ok(())
}

fn cmd_refs(file: &Path, config: &Config, format: Format) -> Result<()> {
    let source = read_source(file)?;
    let lines = ok_lines(split_lines(&source));
    let filename = file.to_string_lossy();

    let dependencies: Vec<Dependency> = if config.scan.follow_includes {
        let root = file.parent().unwrap_or(Path::new(".")).to_path_buf();
        let resolver = HeaderResolver::from_config(root, &config.includes);
        debug!("Include paths: {:?}", resolver.include_paths());
        let loader = FsIncludeLoader::new(resolver).from_file(file);
        iter_compiler_refs(lines, &filename, loader, &config.scan).collect::<cdeps_core::Result<Vec<_>>>()
    } else {
        iter_compiler_refs(lines, &filename, NoIncludes, &config.scan).collect::<cdeps_core::Result<Vec<_>>>()
    }
    .with_context(|| format!("Failed to extract references from {}", file.display()))?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&dependencies)?),
        Format::Text => print_dependencies(&dependencies),
    }
    Ok(())
}

fn print_dependencies(dependencies: &[Dependency]) {
    for dependency in dependencies {
        let at = dependency
            .reference
            .location()
            .map(|l| l.to_string())
            .unwrap_or_default();
        let via = dependency
            .parent_reference()
            .map(|r| format!("  (via {})", r.name()))
            .unwrap_or_default();
        println!("{:<24} {:<32} {}{}", dependency.reference.kind_name(), dependency.reference.name(), at, via);
    }
}

fn cmd_scan(dir: &Path, config: Config, format: Format) -> Result<()> {
    let scanner = ParallelScanner::new(config)?.with_progress(|event| {
        debug!("{:?} {}/{}: {}", event.phase, event.current, event.total, event.message);
    });
    let results = scanner.scan_directory(dir);
    let summary = summarize(&results);

    match format {
        Format::Json => {
            let files: Vec<_> = results
                .iter()
                .map(|(path, result)| match result {
                    Ok(dependencies) => serde_json::json!({
                        "file": path.to_string_lossy(),
                        "dependencies": dependencies,
                    }),
                    Err(e) => serde_json::json!({
                        "file": path.to_string_lossy(),
                        "error": e.to_string(),
                    }),
                })
                .collect();
            let output = serde_json::json!({
                "files": files,
                "summary": {
                    "files": summary.files,
                    "failed": summary.failed,
                    "kinds": summary.kinds,
                },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Format::Text => {
            println!("📂 Scanned {}", dir.display());
            for (path, result) in &results {
                match result {
                    Ok(dependencies) => println!("   {} ({} references)", path.display(), dependencies.len()),
                    Err(e) => println!("   {} ❌ {}", path.display(), e),
                }
            }
            println!("\n📊 Summary:");
            println!("   Files: {}", summary.files);
            println!("   Failed: {}", summary.failed);
            for (kind, count) in &summary.kinds {
                println!("   {}: {}", kind, count);
            }
        }
    }
    Ok(())
}
