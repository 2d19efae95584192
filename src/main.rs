//! instcfg CLI
//!
//! Offline tools for saved instrument configurations: convert a settings
//! dump to JSON, inspect and merge configuration files, and check a
//! settings file.

use clap::{Parser, Subcommand};
use instcfg::{ConfigTree, SyncSettings};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "instcfg")]
#[command(about = "Inspect and edit saved instrument configurations", version)]
struct Cli {
    /// Log each step (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a shorthand settings dump (SET? reply) to a JSON tree
    Parse {
        /// File holding the raw dump
        input: PathBuf,

        /// Keep only this sub-group
        #[arg(long, short = 's', default_value = "")]
        subgroup: String,

        /// Write the tree here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Print a configuration file, or a sub-group of it
    Show {
        file: PathBuf,

        #[arg(long, short = 's', default_value = "")]
        subgroup: String,
    },

    /// Print the commands that would restore a configuration
    Commands {
        file: PathBuf,

        #[arg(long, short = 's', default_value = "")]
        subgroup: String,
    },

    /// Print a single value
    Get {
        file: PathBuf,

        /// Parameter path, e.g. TRIG:MODE
        path: String,
    },

    /// Save a sub-group of one configuration file into another
    Merge {
        source: PathBuf,
        dest: PathBuf,

        #[arg(long, short = 's', default_value = "")]
        subgroup: String,

        /// Replace the destination instead of merging into it
        #[arg(long)]
        overwrite: bool,
    },

    /// Validate a settings file
    Verify {
        /// Path to settings file (default: instcfg.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Parse {
            input,
            subgroup,
            output,
        } => run_parse(&input, &subgroup, output),
        Commands::Show { file, subgroup } => run_show(&file, &subgroup),
        Commands::Commands { file, subgroup } => run_commands(&file, &subgroup),
        Commands::Get { file, path } => run_get(&file, &path),
        Commands::Merge {
            source,
            dest,
            subgroup,
            overwrite,
        } => run_merge(&source, &dest, &subgroup, overwrite),
        Commands::Verify { config } => run_verify(config),
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_parse(input: &Path, subgroup: &str, output: Option<PathBuf>) {
    let response = match fs::read_to_string(input) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading {}: {}", input.display(), e);
            process::exit(1);
        }
    };

    let tree = match ConfigTree::from_bulk_response(&response, subgroup) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("Error parsing dump: {}", e);
            process::exit(1);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = tree.save(&path, "", true) {
                eprintln!("Error writing output: {}", e);
                process::exit(1);
            }
            println!("{} parameters written to {}", tree.len(), path.display());
        }
        None => println!("{}", tree),
    }
}

fn run_show(file: &Path, subgroup: &str) {
    let tree = load_or_exit(file, subgroup);
    println!("{}", tree);
}

fn run_commands(file: &Path, subgroup: &str) {
    let tree = load_or_exit(file, subgroup);
    for line in tree.get_write_list(subgroup) {
        println!("{}", line);
    }
}

fn run_get(file: &Path, path: &str) {
    let tree = load_or_exit(file, "");
    match tree.get(path) {
        Ok(value) => println!("{}", value),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_merge(source: &Path, dest: &Path, subgroup: &str, overwrite: bool) {
    let tree = load_or_exit(source, subgroup);
    if let Err(e) = tree.save(dest, subgroup, overwrite) {
        eprintln!("Error writing {}: {}", dest.display(), e);
        process::exit(1);
    }

    let action = if overwrite { "Wrote" } else { "Merged" };
    let scope = if subgroup.is_empty() { "everything" } else { subgroup };
    println!("{} {} ({} parameters) into {}", action, scope, tree.len(), dest.display());
}

fn run_verify(config_path: Option<PathBuf>) {
    let path = config_path.unwrap_or_else(|| PathBuf::from("instcfg.toml"));

    match SyncSettings::load(&path) {
        Ok(settings) => {
            println!("Settings valid: {}", path.display());
            println!();
            println!("  Header optional: {}", settings.header_is_optional);
            println!("  Verbose optional: {}", settings.verbose_is_optional);
            println!("  Preceding colon: {}", settings.preceding_colon);
            println!("  Intervening space: {}", settings.intervening_space);
            println!("  Defaults directory: {}", settings.defaults_dir.display());
            println!(
                "  Dump: {} ({} ms, trial {} ms)",
                settings.dump_command, settings.dump_timeout_ms, settings.trial_timeout_ms
            );
        }
        Err(e) => {
            eprintln!("Settings error: {}", e);
            process::exit(1);
        }
    }
}

fn load_or_exit(file: &Path, subgroup: &str) -> ConfigTree {
    match ConfigTree::from_file(file, subgroup) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("Error loading {}: {}", file.display(), e);
            process::exit(1);
        }
    }
}
