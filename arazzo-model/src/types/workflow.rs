use std::collections::BTreeMap;

use crate::types::{
    Extensions, FailureAction, JsonSchema, Parameter, RuntimeExpression, Step, SuccessAction,
};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Workflow {
    #[serde(rename = "workflowId")]
    pub workflow_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<JsonSchema>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[serde(rename = "dependsOn")]
    pub depends_on: Vec<String>,

    pub steps: Vec<Step>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[serde(rename = "successActions")]
    pub success_actions: Vec<SuccessAction>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[serde(rename = "failureActions")]
    pub failure_actions: Vec<FailureAction>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, RuntimeExpression>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,

    #[serde(flatten, default)]
    pub extensions: Extensions,
}

impl Workflow {
    pub fn step_index(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.step_id == step_id)
    }

    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }
}
