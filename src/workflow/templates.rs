use crate::workflow::types::{content_from_output, Brief, OutputKind, WorkflowStage};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Static stage scripts keyed by workflow type (`blog`, `linkedin`, ...).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowTemplates {
    pub workflows: BTreeMap<String, Vec<WorkflowStage>>,
}

impl WorkflowTemplates {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow templates: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid workflow templates: {}", path.display()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let templates: Self =
            serde_yaml::from_str(yaml).context("Failed to parse workflow templates as YAML")?;
        templates.validate()?;
        Ok(templates)
    }

    pub fn default_templates() -> Self {
        const DEFAULT_WORKFLOWS_YAML: &str = include_str!("../../workflows.yaml");

        serde_yaml::from_str(DEFAULT_WORKFLOWS_YAML)
            .expect("Failed to parse embedded workflows.yaml - this is a bug in the workflows.yaml file")
    }

    /// Checks that stage ids are unique per workflow and that mock outputs
    /// match their declared output kind.
    pub fn validate(&self) -> Result<()> {
        for (workflow_type, stages) in &self.workflows {
            let mut seen = HashSet::new();
            for stage in stages {
                if !seen.insert(stage.id.as_str()) {
                    anyhow::bail!(
                        "Workflow '{}' has duplicate stage id '{}'",
                        workflow_type,
                        stage.id
                    );
                }

                let Some(output) = &stage.mock_output else {
                    continue;
                };
                match stage.output_kind {
                    OutputKind::Brief => {
                        serde_json::from_value::<Brief>(output.clone()).with_context(|| {
                            format!(
                                "Stage '{}' in workflow '{}' has a brief output that is not a valid brief",
                                stage.id, workflow_type
                            )
                        })?;
                    }
                    OutputKind::Content => {
                        if content_from_output(output).is_none() {
                            anyhow::bail!(
                                "Stage '{}' in workflow '{}' has a content output without a 'content' string",
                                stage.id,
                                workflow_type
                            );
                        }
                    }
                    OutputKind::None => {}
                }
            }
        }
        Ok(())
    }

    /// Deep copy of the stage list for `workflow_type`; empty when unknown.
    pub fn stages_for(&self, workflow_type: &str) -> Vec<WorkflowStage> {
        self.workflows
            .get(workflow_type)
            .cloned()
            .unwrap_or_default()
    }

    pub fn contains(&self, workflow_type: &str) -> bool {
        self.workflows.contains_key(workflow_type)
    }

    pub fn workflow_types(&self) -> impl Iterator<Item = &str> {
        self.workflows.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::StageType;
    use std::io::Write;

    #[test]
    fn test_default_templates() {
        let templates = WorkflowTemplates::default_templates();
        for workflow_type in ["blog", "linkedin", "calendar", "improve"] {
            assert!(templates.contains(workflow_type), "missing {}", workflow_type);
            assert!(!templates.stages_for(workflow_type).is_empty());
        }
    }

    #[test]
    fn test_default_templates_validate() {
        let templates = WorkflowTemplates::default_templates();
        assert!(templates.validate().is_ok());
    }

    #[test]
    fn test_blog_routes_brief_then_content() {
        let templates = WorkflowTemplates::default_templates();
        let stages = templates.stages_for("blog");
        let brief_idx = stages
            .iter()
            .position(|s| s.output_kind == OutputKind::Brief)
            .expect("blog should have a brief stage");
        let content_idx = stages
            .iter()
            .position(|s| s.output_kind == OutputKind::Content)
            .expect("blog should have a content stage");
        assert!(brief_idx < content_idx);
        assert_eq!(stages[brief_idx].stage_type, StageType::Processing);
    }

    #[test]
    fn test_unknown_type_yields_empty() {
        let templates = WorkflowTemplates::default_templates();
        assert!(templates.stages_for("podcast").is_empty());
    }

    #[test]
    fn test_stages_for_is_deep_copy() {
        let templates = WorkflowTemplates::default_templates();
        let mut stages = templates.stages_for("blog");
        stages[0].input_value = "changed".to_string();
        assert_eq!(templates.stages_for("blog")[0].input_value, "");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
workflows:
  mini:
    - id: topic
      step_id: input
      title: Topic
      type: input
    - id: draft
      step_id: writing
      title: Draft
      type: processing
      agent: Copywriter
      output_kind: content
      mock_output:
        content: "Hello"
"#;
        let templates = WorkflowTemplates::from_yaml(yaml).unwrap();
        let stages = templates.stages_for("mini");
        assert_eq!(stages.len(), 2);
        assert!(stages[0].can_go_back);
        assert_eq!(stages[1].progress, 0);
    }

    #[test]
    fn test_validation_duplicate_stage_id() {
        let yaml = r#"
workflows:
  mini:
    - { id: a, step_id: s, title: A, type: input }
    - { id: a, step_id: s, title: B, type: approval }
"#;
        let err = WorkflowTemplates::from_yaml(yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("duplicate stage id"));
    }

    #[test]
    fn test_validation_bad_brief_output() {
        let yaml = r#"
workflows:
  mini:
    - id: brief
      step_id: s
      title: Brief
      type: processing
      output_kind: brief
      mock_output:
        headline: "no title field"
"#;
        assert!(WorkflowTemplates::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_validation_bad_content_output() {
        let yaml = r#"
workflows:
  mini:
    - id: post
      step_id: s
      title: Post
      type: processing
      output_kind: content
      mock_output:
        body: "wrong key"
"#;
        assert!(WorkflowTemplates::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "workflows:\n  solo:\n    - {{ id: only, step_id: s, title: Only, type: editor }}"
        )
        .unwrap();
        let templates = WorkflowTemplates::load(file.path()).unwrap();
        assert_eq!(templates.workflow_types().collect::<Vec<_>>(), vec!["solo"]);
    }
}
