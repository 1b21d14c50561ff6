use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use mod_catalog_lib::commands;
use mod_catalog_lib::config::EngineSettings;
use mod_catalog_lib::core::engine::ModEngine;
use mod_catalog_lib::logging;
use mod_catalog_lib::models::catalog_dto::PackageView;
use mod_catalog_lib::models::scan::ActivationResult;
use mod_catalog_lib::utils::context::ScanContext;
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mod-catalog")]
#[command(about = "Discover, diagnose and toggle installed mods", long_about = None)]
struct Cli {
    /// Packages root; defaults to the one in the saved settings.
    #[arg(long, global = true)]
    root: Option<Utf8PathBuf>,

    /// Installed game version, used for `game` dependencies.
    #[arg(long, global = true)]
    game_version: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the packages root and print every package with its findings
    Scan,
    /// Print packages, one line each
    List,
    /// Enable a package by mod id
    Enable { id: String },
    /// Disable a package by mod id
    Disable { id: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut settings = EngineSettings::load().unwrap_or_default();
    if let Some(root) = cli.root {
        settings.packages_root = Some(root);
    }
    if let Some(version) = cli.game_version {
        settings.host.game = version;
    }
    let logs = settings.data_paths().logs;
    let _guard = logging::init(Some(logs.as_path()));

    let engine = Arc::new(ModEngine::from_settings(&settings)?);
    let views = commands::scan(engine.clone(), ScanContext::new()).await?;

    match cli.command {
        Command::Scan => print_detailed(&views),
        Command::List => views.iter().for_each(print_line),
        Command::Enable { id } => toggle(engine, id, true).await?,
        Command::Disable { id } => toggle(engine, id, false).await?,
    }
    Ok(())
}

async fn toggle(engine: Arc<ModEngine>, id: String, enabled: bool) -> Result<(), Box<dyn Error>> {
    let result = commands::set_active(engine.clone(), id, enabled).await;
    toggle_outcome(result)?;
    let views = commands::list(engine).await;
    views.iter().for_each(print_line);
    Ok(())
}

/// The coordinator's message already names the mod and the failure.
fn toggle_outcome(result: ActivationResult) -> Result<(), Box<dyn Error>> {
    if result.success {
        return Ok(());
    }
    Err(result
        .error_message
        .unwrap_or_else(|| "toggle failed".to_string())
        .into())
}

fn print_line(view: &PackageView) {
    let state = if view.enabled { "on " } else { "off" };
    let status = if view.diagnostics.is_empty() { "ok" } else { "!!" };
    println!(
        "[{state}] {status} {:<32} {:<12} {}",
        view.mod_id,
        view.version.as_deref().unwrap_or("-"),
        view.name
    );
}

fn print_detailed(views: &[PackageView]) {
    for view in views {
        print_line(view);
        println!("      {:?} at {}", view.kind, view.path);
        for finding in &view.diagnostics {
            println!("      - {finding}");
        }
    }
    let enabled = views.iter().filter(|v| v.enabled).count();
    println!("{} packages, {enabled} enabled", views.len());
}
