use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use contentq_studio::agent_activity::AgentActivity;
use contentq_studio::config::StudioConfig;
use contentq_studio::headless::run_headless;
use contentq_studio::persistence::{load_from_storage, FileSessionStorage};
use contentq_studio::workflow::{derive_steps, WorkflowTemplates};
use contentq_studio::Studio;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the tracing filter, e.g. `contentq_studio=debug`.
const LOG_ENV: &str = "CONTENTQ_LOG";

#[derive(Parser)]
#[command(name = "contentq")]
#[command(about = "Scripted content workflows with simulated agents")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CONTENTQ_GIT_SHA"), ")"))]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Config file (defaults to ~/.contentq/config.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for persisted demo state
    #[arg(long, global = true)]
    session_dir: Option<PathBuf>,

    /// Simulation speed multiplier
    #[arg(long, global = true)]
    speed: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List workflow types with their stages
    List,
    /// Walk through a workflow without user interaction
    Run {
        /// Workflow type, e.g. `blog`
        workflow_type: String,
        /// Text for input stages
        #[arg(long)]
        input: Option<String>,
    },
    /// Print the persisted demo state
    State,
    /// Print active agents and recent history
    Agents,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<StudioConfig> {
    let mut config = StudioConfig::load_or_default(cli.config.as_deref())?;
    if let Some(dir) = &cli.session_dir {
        config.storage.session_dir = Some(dir.clone());
    }
    if let Some(speed) = cli.speed {
        config.simulation.speed = Some(speed);
    }
    config.validate()?;
    Ok(config)
}

fn print_activity(activity: &AgentActivity) {
    let reasoning = activity.reasoning.as_deref().unwrap_or("");
    println!(
        "  {:<11} {:<40} {}",
        activity.agent.as_str(),
        activity.task,
        reasoning
    );
}

fn list_workflows(templates: &WorkflowTemplates) {
    for workflow_type in templates.workflow_types() {
        let stages = templates.stages_for(workflow_type);
        let steps: Vec<String> = derive_steps(&stages).into_iter().map(|s| s.id).collect();
        println!("{} ({})", workflow_type, steps.join(" > "));
        for (i, stage) in stages.iter().enumerate() {
            println!("  {}. [{}] {}", i + 1, stage.stage_type, stage.title);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Command::List => {
            let templates = config.load_templates()?;
            list_workflows(&templates);
        }
        Command::Run {
            workflow_type,
            input,
        } => {
            let session_id = uuid::Uuid::new_v4().to_string();
            let studio = Studio::from_config(&config, &session_id)?;
            let report = run_headless(&studio, workflow_type, input.as_deref())
                .await
                .with_context(|| format!("Failed to run workflow '{}'", workflow_type))?;

            println!("Workflow: {}", report.workflow_type);
            for (i, (stage_id, stage_type)) in report.visited.iter().enumerate() {
                println!("  {}. {} [{}]", i + 1, stage_id, stage_type);
            }
            if let Some(brief) = &report.brief {
                println!();
                println!("Brief: {}", brief.title);
                println!("  Target words: {}", brief.target_word_count);
                println!("  Read time:    {}", brief.estimated_read_time);
                println!("  Keywords:     {}", brief.keywords.join(", "));
            }
            println!();
            println!("# {}", report.editor_title);
            println!("{}", report.editor_content);
        }
        Command::State => {
            let storage = FileSessionStorage::new(config.session_dir()?)?;
            let snapshot = load_from_storage(&storage);
            let json = serde_json::to_string_pretty(&snapshot)
                .context("Failed to serialize demo state")?;
            println!("{}", json);
        }
        Command::Agents => {
            let storage = FileSessionStorage::new(config.session_dir()?)?;
            let snapshot = load_from_storage(&storage);
            println!("Active ({}):", snapshot.active_agents.len());
            snapshot.active_agents.iter().for_each(print_activity);
            println!("History ({}):", snapshot.agent_history.len());
            snapshot.agent_history.iter().for_each(print_activity);
        }
    }

    Ok(())
}
