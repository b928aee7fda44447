use anyhow::{Context, Result};
use notepipe::cli::commands::{load_pipeline_config, RunCommand, StagesCommand, ValidateCommand};
use notepipe::cli::output::*;
use notepipe::cli::{Cli, Command};
use notepipe::core::Definitions;
use notepipe::execution::{ExecutionEngine, ProcessRunner};
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging: --verbose wins, then RUST_LOG, then info
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let code = match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::Stages(cmd) => list_stages(cmd)?,
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

async fn run_pipeline(cmd: &RunCommand) -> Result<i32> {
    // Nothing may start before the definitions are loaded
    let definitions = Definitions::from_file(&cmd.env_file)
        .with_context(|| format!("Failed to load definitions from {}", cmd.env_file.display()))?;
    let source = definitions.source().unwrap_or(cmd.env_file.as_path());
    println!(
        "{} Environment variables loaded ({} from {})",
        INFO,
        style(definitions.len()).cyan(),
        style(source.display()).dim()
    );

    let config = load_pipeline_config(cmd.pipeline.as_deref(), &cmd.python)
        .context("Failed to load pipeline config")?;
    let mut pipeline = config.to_pipeline();
    if let Some(policy) = cmd.policy {
        pipeline.failure_policy = policy.into();
    }

    if let Some(start) = &cmd.from_stage {
        if pipeline.stage(start).is_none() {
            anyhow::bail!("Unknown stage '{}' (see `notepipe stages`)", start);
        }
    }

    if cmd.dry_run {
        print!("{}", format_plan(&pipeline, &definitions, cmd.from_stage.as_deref()));
        return Ok(0);
    }

    let mut engine = ExecutionEngine::new(ProcessRunner::new());
    if let Some(start) = &cmd.from_stage {
        engine = engine.with_start_stage(start.clone());
    }
    engine.add_event_handler(|event| {
        println!("{}", format_execution_event(event));
    });

    println!();
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let status = engine
        .execute_until(&mut pipeline, &definitions, interrupt)
        .await
        .context("Failed to execute pipeline")?;

    println!("\n{} Stage summary:", INFO);
    for stage in &pipeline.stages {
        println!("  {:<20} {}", stage.id, format_stage_state(&stage.state));
    }

    let code = pipeline.exit_code();
    if code == 0 {
        println!(
            "\n{} {} completed {}",
            CHECK,
            style(&pipeline.name).bold(),
            style("successfully").green()
        );
    } else {
        println!(
            "\n{} {} {}",
            CROSS,
            style(&pipeline.name).bold(),
            format_status(status)
        );
        error!("Pipeline finished with exit code {}", code);
    }

    Ok(code)
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<i32> {
    println!("{} Validating pipeline...", INFO);

    match load_pipeline_config(cmd.pipeline.as_deref(), notepipe::core::config::DEFAULT_PYTHON) {
        Ok(config) => {
            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Stages: {}", style(config.stages.len()).cyan());
            println!("  Failure policy: {:?}", config.failure_policy);

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(0)
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            Ok(1)
        }
    }
}

fn list_stages(cmd: &StagesCommand) -> Result<i32> {
    let config = load_pipeline_config(cmd.pipeline.as_deref(), &cmd.python)
        .context("Failed to load pipeline config")?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&config.stages)?);
        return Ok(0);
    }

    let pipeline = config.to_pipeline();
    println!("{} Stages of {}:", INFO, style(&pipeline.name).bold());
    for line in format_stage_list(&pipeline) {
        println!("{}", line);
    }

    Ok(0)
}
