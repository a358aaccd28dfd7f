//! Headless walk-through of a workflow, used by `contentq run`.
//!
//! Plays the user's part: seeds input stages, picks the first option on
//! selection stages, approves approvals and lets processing stages run.

use crate::runtime::Studio;
use crate::state_machine::StateSnapshot;
use crate::workflow::{Brief, InsertPosition, StagePatch, StageType};
use anyhow::{bail, Context, Result};
use std::time::Duration;
use tokio::sync::watch;

/// Upper bound for a single stage to finish, in unscaled time.
const STAGE_TIMEOUT: Duration = Duration::from_secs(300);

/// Text used for input stages when no `--input` was given.
const DEFAULT_INPUT: &str = "How small teams ship more content without burning out";

#[derive(Debug, Clone)]
pub struct HeadlessReport {
    pub workflow_type: String,
    /// `(stage id, stage type)` in visit order
    pub visited: Vec<(String, StageType)>,
    pub brief: Option<Brief>,
    pub editor_title: String,
    pub editor_content: String,
}

pub async fn run_headless(
    studio: &Studio,
    workflow_type: &str,
    input: Option<&str>,
) -> Result<HeadlessReport> {
    let mut rx = studio.subscribe();
    studio.start_workflow(workflow_type);

    let mut visited = Vec::new();
    loop {
        let snapshot = studio.snapshot();
        let Some(stage) = snapshot.current_stage() else {
            bail!("Workflow '{}' has no stages", workflow_type);
        };
        let index = snapshot.current_stage_index;
        let stage_id = stage.id.clone();
        let stage_type = stage.stage_type;

        tracing::info!(
            stage = index + 1,
            total = snapshot.stages.len(),
            stage_id = %stage_id,
            stage_type = %stage_type,
            "Entering stage"
        );
        visited.push((stage_id.clone(), stage_type));

        match stage_type {
            StageType::Input => {
                let text = input
                    .or(stage.placeholder.as_deref())
                    .unwrap_or(DEFAULT_INPUT);
                if stage.input_value.is_empty() {
                    studio.insert_into_input(text, InsertPosition::Replace);
                }
            }
            StageType::Selection => {
                if let (None, Some(first)) = (&stage.selected_option, stage.options.first()) {
                    tracing::info!(option = %first.id, "Selecting first option");
                    studio.update_stage_data(StagePatch::selected_option(first.id.clone()));
                }
            }
            StageType::Processing | StageType::Approval | StageType::Editor => {}
        }

        if snapshot.is_final_stage() && stage_type != StageType::Processing {
            break;
        }

        studio.complete_stage();

        if snapshot.is_final_stage() {
            wait_for(&mut rx, &stage_id, |s| {
                !s.progress_running && s.current_stage().is_some_and(|st| st.progress >= 100)
            })
            .await?;
            break;
        }
        wait_for(&mut rx, &stage_id, |s| {
            s.current_stage_index != index || s.active_workflow.is_none()
        })
        .await?;
    }

    studio.shutdown();
    let snapshot = studio.snapshot();
    Ok(HeadlessReport {
        workflow_type: workflow_type.to_string(),
        visited,
        brief: snapshot.brief,
        editor_title: snapshot.editor_title,
        editor_content: snapshot.editor_content,
    })
}

async fn wait_for(
    rx: &mut watch::Receiver<StateSnapshot>,
    stage_id: &str,
    predicate: impl FnMut(&StateSnapshot) -> bool,
) -> Result<()> {
    tokio::time::timeout(STAGE_TIMEOUT, rx.wait_for(predicate))
        .await
        .with_context(|| format!("Timed out waiting for stage '{}' to finish", stage_id))?
        .context("Workflow engine stopped")?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/headless_tests.rs"]
mod tests;
