use crate::types::{Components, Extensions, SourceDescription, Workflow};

/// The linked document graph handed over by the caller's document provider.
///
/// Syntax parsing and structural validation happen before a value of this
/// type exists; the runtime only reads it.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WorkflowDocument {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[serde(rename = "sourceDescriptions")]
    pub source_descriptions: Vec<SourceDescription>,

    pub workflows: Vec<Workflow>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,

    #[serde(flatten, default)]
    pub extensions: Extensions,
}

impl WorkflowDocument {
    pub fn workflow(&self, workflow_id: &str) -> Option<&Workflow> {
        self.workflows.iter().find(|w| w.workflow_id == workflow_id)
    }

    pub fn source_description(&self, name: &str) -> Option<&SourceDescription> {
        self.source_descriptions.iter().find(|s| s.name == name)
    }
}
