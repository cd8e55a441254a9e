use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use projclose::closure::{ClosureMode, ClosureReceipt, ClosureStateMachine, reactivate_project};
use projclose::domain::{Actor, ActorRole, LifecycleStatus, Project};
use projclose::permissions::{PermissionGate, RoleGate};
use projclose::store::JsonlStore;

mod cli;
mod config;

use cli::Cli;
use cli::commands::{Commands, EvaluationArgs, FinalReviewArgs};
use config::Config;

/// Filter for env_logger: RUST_LOG wins, then the configured level, then info
fn log_filter(rust_log: Option<String>, config: &Config) -> String {
    rust_log
        .filter(|filter| !filter.trim().is_empty())
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "info".to_string())
}

fn setup_logging(config: &Config) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("projclose")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("projclose.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let filter = log_filter(std::env::var("RUST_LOG").ok(), config);
    env_logger::Builder::new()
        .parse_filters(&filter)
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized ({}), writing to: {}", filter, log_file.display());
    Ok(())
}

fn resolve_actor(cli: &Cli, config: &Config) -> Result<Actor> {
    let mut actor = config.actor.to_actor();
    if let Some(id) = &cli.actor {
        actor.id = id.clone();
    }
    if let Some(role) = &cli.role {
        actor.role = role.parse::<ActorRole>()?;
    }
    Ok(actor)
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let store = Arc::new(
        JsonlStore::open(&config.storage.data_dir).context("Failed to open project store")?,
    );
    let actor = resolve_actor(cli, config)?;
    let gate = RoleGate;

    match &cli.command {
        Commands::Add { name, manager } => handle_add(&store, name, manager.as_deref()),
        Commands::List { status } => handle_list(&store, status.as_deref()),
        Commands::Show { id } => handle_show(&store, id),
        Commands::Close {
            id,
            review,
            evaluation,
            postpone,
        } => handle_close(&store, &gate, &actor, id, review, evaluation, *postpone).await,
        Commands::Evaluate { id, evaluation } => {
            handle_evaluate(&store, &gate, &actor, id, evaluation).await
        }
        Commands::Reactivate { id } => handle_reactivate(&store, &gate, &actor, id).await,
    }
}

fn handle_add(store: &JsonlStore, name: &str, manager: Option<&str>) -> Result<()> {
    info!("Adding project: {}", name);
    let mut project = Project::new(name);
    if let Some(manager) = manager {
        project = project.with_manager(manager);
    }
    store.create_project(&project)?;
    println!("{} {} ({})", "Added:".green(), project.name, project.id);
    Ok(())
}

fn handle_list(store: &JsonlStore, status: Option<&str>) -> Result<()> {
    info!("Listing projects - status: {:?}", status);
    let status: Option<LifecycleStatus> = status.map(str::parse::<LifecycleStatus>).transpose()?;

    for project in store.list_projects()? {
        if status.is_some_and(|s| s != project.lifecycle_status) {
            continue;
        }
        let marker = if project.closure_status.is_some() {
            " (evaluation pending)".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "{}  {:<12} {}{}",
            project.id,
            project.lifecycle_status.to_string(),
            project.name,
            marker
        );
    }
    Ok(())
}

fn handle_show(store: &JsonlStore, id: &str) -> Result<()> {
    info!("Showing project: {}", id);
    let project = store.require_project(id)?;

    println!("{} {}", "Project:".green(), project.name);
    println!("  id:        {}", project.id);
    println!("  lifecycle: {}", project.lifecycle_status);
    if let Some(status) = project.closure_status {
        println!("  closure:   {:?}", status);
    }
    if let (Some(at), Some(by)) = (project.closed_at, project.closed_by.as_deref()) {
        println!("  closed:    {} by {}", at.to_rfc3339(), by);
    }

    for review in store.final_reviews(id)? {
        println!(
            "{} weather={} progress={} completion={}%",
            "Final review:".cyan(),
            review.data.weather,
            review.data.progress,
            review.data.completion
        );
        if let Some(comment) = &review.data.comment {
            println!("  comment:      {}", comment);
        }
        if let Some(difficulties) = &review.data.difficulties {
            println!("  difficulties: {}", difficulties);
        }
    }

    for evaluation in store.evaluations(id)? {
        println!("{}", "Method evaluation:".cyan());
        if evaluation.data.is_empty() {
            println!("  (no content)");
        }
        let fields = [
            ("what worked", &evaluation.data.what_worked),
            ("what was missing", &evaluation.data.what_was_missing),
            ("improvements", &evaluation.data.improvements),
            ("lessons learned", &evaluation.data.lessons_learned),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                println!("  {}: {}", label, value);
            }
        }
    }
    Ok(())
}

fn print_receipt(receipt: &ClosureReceipt) {
    println!("{} {} ({:?})", "Done:".green(), receipt.project_id, receipt.outcome);
    if let Some(review_id) = &receipt.review_id {
        println!("  final review: {}", review_id);
    }
    if let Some(evaluation_id) = &receipt.evaluation_id {
        println!("  evaluation:   {}", evaluation_id);
    }
}

async fn handle_close(
    store: &Arc<JsonlStore>,
    gate: &impl PermissionGate,
    actor: &Actor,
    id: &str,
    review: &FinalReviewArgs,
    evaluation: &EvaluationArgs,
    postpone: bool,
) -> Result<()> {
    info!("Closing project {} as {} (postpone: {})", id, actor.id, postpone);
    let project = store.require_project(id)?;
    if !gate.can_close_project(actor, &project) {
        bail!("{} ({}) may not close project {}", actor.id, actor.role, id);
    }

    let machine = ClosureStateMachine::open(store.clone(), id).await?;
    if machine.mode() == ClosureMode::Resume {
        bail!("Project {} is already closed with a pending evaluation, use `projclose evaluate`", id);
    }

    machine.go_to_next_step()?;
    machine.save_final_review_data(&review.to_input())?;

    let receipt = if postpone {
        machine.postpone_evaluation(actor).await?
    } else {
        let evaluation = evaluation.to_data();
        if evaluation.is_empty() {
            println!("{}", "Warning: recording an empty method evaluation".yellow());
        }
        machine.save_evaluation_data(&evaluation)?;
        machine.submit_closure(actor).await?
    };

    info!("Project {} closed: {:?}", id, receipt.outcome);
    print_receipt(&receipt);
    Ok(())
}

async fn handle_evaluate(
    store: &Arc<JsonlStore>,
    gate: &impl PermissionGate,
    actor: &Actor,
    id: &str,
    evaluation: &EvaluationArgs,
) -> Result<()> {
    info!("Completing evaluation of {} as {}", id, actor.id);
    let project = store.require_project(id)?;
    if !gate.can_complete_evaluation(actor, &project) {
        bail!("{} ({}) may not complete the evaluation of {}", actor.id, actor.role, id);
    }

    let machine = ClosureStateMachine::open(store.clone(), id).await?;
    if machine.mode() != ClosureMode::Resume {
        bail!("Project {} has no pending evaluation", id);
    }

    let receipt = machine.complete_evaluation(actor, &evaluation.to_data()).await?;
    print_receipt(&receipt);
    Ok(())
}

async fn handle_reactivate(
    store: &JsonlStore,
    gate: &impl PermissionGate,
    actor: &Actor,
    id: &str,
) -> Result<()> {
    info!("Reactivating project {} as {}", id, actor.id);
    let project = store.require_project(id)?;
    if !gate.can_reactivate_project(actor, &project) {
        bail!("{} ({}) may not reactivate project {}", actor.id, actor.role, id);
    }

    reactivate_project(store, id).await?;
    println!("{} {}", "Reactivated:".green(), id);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration, which decides the log filter
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_level(level: Option<&str>) -> Config {
        Config {
            log_level: level.map(str::to_string),
            ..Config::default()
        }
    }

    #[test]
    fn test_config_log_level_drives_filter() {
        let filter = log_filter(None, &config_with_level(Some("debug")));
        assert_eq!(filter, "debug");

        let logger = env_logger::Builder::new().parse_filters(&filter).build();
        assert_eq!(logger.filter(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_rust_log_overrides_config() {
        let filter = log_filter(Some("warn".to_string()), &config_with_level(Some("debug")));
        assert_eq!(filter, "warn");
    }

    #[test]
    fn test_filter_defaults_to_info() {
        assert_eq!(log_filter(None, &config_with_level(None)), "info");
        assert_eq!(log_filter(Some("  ".to_string()), &config_with_level(None)), "info");
    }
}
