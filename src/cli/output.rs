//! CLI output formatting

use crate::{
    core::{Definitions, ExecutionStatus, Pipeline, StageState},
    execution::ExecutionEvent,
};
use console::Emoji;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");

/// Format a stage state for display
pub fn format_stage_state(state: &StageState) -> String {
    match state {
        StageState::Pending => style("PENDING").dim().to_string(),
        StageState::Running { .. } => style("RUNNING").yellow().to_string(),
        StageState::Succeeded { .. } => style("SUCCEEDED").green().to_string(),
        StageState::Failed { tolerated: true, .. } => style("FAILED (allowed)").yellow().to_string(),
        StageState::Failed { .. } => style("FAILED").red().to_string(),
        StageState::Skipped { .. } => style("SKIPPED").dim().to_string(),
    }
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
        ExecutionStatus::Cancelled => style("CANCELLED").yellow().to_string(),
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name,
            total_stages,
        } => format!(
            "{} Starting pipeline {} ({} stages, {})",
            ROCKET,
            style(pipeline_name).bold(),
            total_stages,
            style(&execution_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::StageStarted {
            stage_id,
            name,
            position,
            total,
            command,
        } => format!(
            "{} [{}/{}] {} {} {}",
            SPINNER,
            position,
            total,
            style(name).bold(),
            style(format!("({})", stage_id)).cyan(),
            style(command).dim()
        ),
        ExecutionEvent::StageSucceeded { stage_id, duration } => format!(
            "{} {} {}",
            CHECK,
            style(stage_id).green(),
            style(format_duration(*duration)).dim()
        ),
        ExecutionEvent::StageFailed {
            stage_id,
            error,
            tolerated,
        } => {
            if *tolerated {
                format!(
                    "{} {}: {} {}",
                    WARN,
                    style(stage_id).yellow(),
                    style(error).dim(),
                    style("(failure allowed, continuing)").dim()
                )
            } else {
                format!("{} {}: {}", CROSS, style(stage_id).red(), style(error).dim())
            }
        }
        ExecutionEvent::StageSkipped { stage_id, reason } => {
            format!("{} {} ({})", SKIP, style(stage_id).dim(), reason)
        }
        ExecutionEvent::PipelineFinished {
            execution_id,
            status,
            exit_code,
        } => {
            let status_str = match status {
                ExecutionStatus::Completed => format!("{} completed", style("successfully").green()),
                ExecutionStatus::Failed => format!("{} (exit code {})", style("failed").red(), exit_code),
                ExecutionStatus::Cancelled => style("was interrupted").yellow().to_string(),
                other => format!("{:?}", other),
            };
            format!(
                "{} Pipeline ({}) {}",
                INFO,
                style(&execution_id.to_string()[..8]).dim(),
                status_str
            )
        }
    }
}

/// Format the stage list of a pipeline, one entry per stage
pub fn format_stage_list(pipeline: &Pipeline) -> Vec<String> {
    format_stages(pipeline, 0)
}

// Stages before `start_index` are marked as skipped
fn format_stages(pipeline: &Pipeline, start_index: usize) -> Vec<String> {
    pipeline
        .stages
        .iter()
        .enumerate()
        .map(|(i, stage)| {
            let mut line = format!(
                "  {}. {} {} {}",
                i + 1,
                style(&stage.name).bold(),
                style(format!("({})", stage.id)).cyan(),
                style(stage.command_line()).dim()
            );
            if i < start_index {
                line.push_str(&format!(" {}", style("[skipped: before start stage]").dim()));
            }
            if stage.allow_failure {
                line.push_str(&format!(" {}", style("[failure allowed]").yellow()));
            }
            if let Some(timeout) = stage.timeout {
                line.push_str(&format!(" {}", style(format!("[timeout {}]", format_duration(timeout))).dim()));
            }
            if let Some(description) = &stage.description {
                line.push_str(&format!("\n     {}", style(description).dim()));
            }
            line
        })
        .collect()
}

/// Format the plan printed by a dry run.
///
/// With a start stage, the stages before it are listed as skipped.
pub fn format_plan(pipeline: &Pipeline, definitions: &Definitions, start_stage: Option<&str>) -> String {
    let start_index = start_stage.and_then(|id| pipeline.position(id)).unwrap_or(0);
    let mut out = format!(
        "{} Dry run: {} (policy: {:?})\n",
        INFO,
        style(&pipeline.name).bold(),
        pipeline.failure_policy
    );

    out.push_str(&format!("{} Stages:\n", INFO));
    for line in format_stages(pipeline, start_index) {
        out.push_str(&line);
        out.push('\n');
    }

    match definitions.source() {
        Some(path) => out.push_str(&format!(
            "{} Definitions ({} from {}):\n",
            INFO,
            definitions.len(),
            path.display()
        )),
        None => out.push_str(&format!("{} Definitions ({}):\n", INFO, definitions.len())),
    }
    for line in definitions.masked() {
        out.push_str(&format!("  {}\n", style(line).dim()));
    }

    out
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
