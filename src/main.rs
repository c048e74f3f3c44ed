//! Demos for the step-agent decision loop.
//!
//! No hosted model client ships with this workspace; model output is replayed
//! from a script file (a JSON array of responses, one per model call).

mod demo_site;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agent_tools::all_tools;
use anyhow::Context;
use browser_agent::{BrowserAgent, BrowserDriver};
use clap::{Parser, Subcommand};
use step_agent::{
    ControllerConfig, Perception, RunOutcome, ScriptedModel, StaticPerception, StepController,
};
use tracing_subscriber::{fmt, EnvFilter};

/// Command-line arguments for the agent demos
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON controller config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the step budget
    #[arg(short, long)]
    max_steps: Option<usize>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question with the calculator and search tools
    Tools {
        /// Model script to replay
        #[arg(short, long)]
        script: PathBuf,

        question: String,
    },

    /// Run a browser task against the seeded demo store
    Browser {
        /// Model script to replay; `extract` answers are read from the same
        /// script unless --extract-script is given
        #[arg(short, long)]
        script: PathBuf,

        /// Separate script for `extract` answers
        #[arg(long)]
        extract_script: Option<PathBuf>,

        /// Attach screenshots to every observation
        #[arg(long, default_value_t = false)]
        screenshots: bool,

        task: String,
    },
}

fn load_config(path: Option<&Path>, max_steps: Option<usize>) -> anyhow::Result<ControllerConfig> {
    let config = match path {
        Some(path) => ControllerConfig::load(path)?,
        None => ControllerConfig::default(),
    };
    let config = config.apply_env()?;
    Ok(match max_steps {
        Some(max_steps) => config.with_max_steps(max_steps),
        None => config,
    })
}

fn print_outcome(outcome: &RunOutcome) {
    for entry in outcome.history() {
        let action = entry.action().map(|action| action.name()).unwrap_or("-");
        println!("step {:>2}  {:<14} {}", entry.step(), action, entry.result());
    }
    match outcome {
        RunOutcome::Completed {
            result, success, ..
        } => println!("\nFinished (success={success}): {result}"),
        RunOutcome::BudgetExhausted { history, memory } => {
            println!("\nStep budget exhausted after {} steps", history.len());
            if !memory.is_empty() {
                println!("Last memory: {memory}");
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    fmt().with_env_filter(filter).init();

    let config = load_config(args.config.as_deref(), args.max_steps)?;
    tracing::debug!(?config, "controller config");

    let outcome = match args.command {
        Commands::Tools { script, question } => {
            let model = Arc::new(ScriptedModel::from_file(&script)?);
            let controller = StepController::new(model, config).with_effectors(all_tools());
            controller
                .run(question, &StaticPerception(Perception::empty()))
                .await?
        }
        Commands::Browser {
            script,
            extract_script,
            screenshots,
            task,
        } => {
            let model = Arc::new(ScriptedModel::from_file(&script)?);
            let browser = Arc::new(demo_site::costco(screenshots));
            browser
                .navigate(demo_site::HOME)
                .await
                .context("failed to open the demo store")?;

            let mut builder = BrowserAgent::builder(model, browser).with_config(config);
            if let Some(path) = extract_script {
                builder = builder.with_extract_model(Arc::new(ScriptedModel::from_file(&path)?));
            }
            builder.build().run(&task).await?
        }
    };

    print_outcome(&outcome);
    Ok(())
}
