use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use paper_atlas::utils;

mod combine;
mod serve;
mod summarize;

const DEFAULT_DATA_DIR: &str = "paperlists";
const DEFAULT_CSV_PATH: &str = "all_papers.csv";
const DEFAULT_TEMPLATES_DIR: &str = "templates";
const DEFAULT_STATIC_DIR: &str = "static";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub data_dir: String,
    pub csv_path: String,
    pub templates_dir: String,
    pub static_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.to_string(),
            csv_path: DEFAULT_CSV_PATH.to_string(),
            templates_dir: DEFAULT_TEMPLATES_DIR.to_string(),
            static_dir: DEFAULT_STATIC_DIR.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AppConfigFile {
    #[serde(default)]
    data_dir: Option<String>,
    #[serde(default)]
    csv_path: Option<String>,
    #[serde(default)]
    templates_dir: Option<String>,
    #[serde(default)]
    static_dir: Option<String>,
}

impl AppConfig {
    fn from_file(config: AppConfigFile) -> Self {
        let defaults = AppConfig::default();
        Self {
            data_dir: config.data_dir.unwrap_or(defaults.data_dir),
            csv_path: config.csv_path.unwrap_or(defaults.csv_path),
            templates_dir: config.templates_dir.unwrap_or(defaults.templates_dir),
            static_dir: config.static_dir.unwrap_or(defaults.static_dir),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "paper_atlas",
    version,
    about = "Search and filtering server for merged conference paper metadata"
)]
struct Cli {
    #[arg(long, global = true, default_value = "atlas_config.json")]
    config: PathBuf,
    #[arg(
        long,
        global = true,
        help = "Write the resolved config to disk before running"
    )]
    write_config: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(name = "combine", alias = "combine_papers")]
    Combine(combine::CombineArgs),
    #[command(name = "serve")]
    Serve(serve::ServeArgs),
    #[command(name = "summarize", alias = "summarize_data")]
    Summarize,
}

fn load_config(path: &Path) -> Result<AppConfig, String> {
    if path.exists() {
        let contents = fs::read_to_string(path)
            .map_err(|err| format!("Failed to read config {path:?}: {err}"))?;
        let config = serde_json::from_str::<AppConfigFile>(&contents)
            .map_err(|err| format!("Failed to parse config {path:?}: {err}"))?;
        Ok(AppConfig::from_file(config))
    } else {
        Ok(AppConfig::default())
    }
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), String> {
    let _ = utils::ensure_parent_dir(path)?;
    let contents = serde_json::to_string_pretty(config)
        .map_err(|err| format!("Failed to serialize config {path:?}: {err}"))?;
    fs::write(path, contents).map_err(|err| format!("Failed to write config {path:?}: {err}"))
}

fn dispatch_command(command: Commands, config: &AppConfig) -> Result<(), String> {
    match command {
        Commands::Combine(args) => combine::run_combine(&args, config),
        Commands::Serve(args) => {
            let rt = tokio::runtime::Runtime::new()
                .map_err(|err| format!("Failed to create runtime: {err}"))?;
            rt.block_on(serve::run_with_args(args, config))
                .map_err(|err| format!("serve failed: {err}"))
        }
        Commands::Summarize => summarize::run_summarize(config),
    }
}

fn main() {
    let cli = Cli::parse();
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if cli.write_config {
        if let Err(err) = write_config(&cli.config, &config) {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }

    let Some(command) = cli.command else {
        if !cli.write_config {
            eprintln!("No subcommand supplied. Use --help for usage details.");
            std::process::exit(2);
        }
        return;
    };

    if let Err(err) = dispatch_command(command, &config) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
