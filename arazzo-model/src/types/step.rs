use std::collections::BTreeMap;

use crate::types::{
    Criterion, Extensions, FailureAction, Parameter, RequestBody, RuntimeExpression,
    SuccessAction,
};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Step {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "stepId")]
    pub step_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "operationId")]
    pub operation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "operationPath")]
    pub operation_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "workflowId")]
    pub workflow_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "requestBody")]
    pub request_body: Option<RequestBody>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[serde(rename = "successCriteria")]
    pub success_criteria: Vec<Criterion>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[serde(rename = "onSuccess")]
    pub on_success: Vec<SuccessAction>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[serde(rename = "onFailure")]
    pub on_failure: Vec<FailureAction>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, RuntimeExpression>,

    #[serde(flatten, default)]
    pub extensions: Extensions,
}

impl Step {
    /// The workflow this step hands control to, when it performs no operation itself.
    pub fn delegated_workflow(&self) -> Option<&str> {
        match (&self.workflow_id, &self.operation_id, &self.operation_path) {
            (Some(id), None, None) => Some(id),
            _ => None,
        }
    }

    /// `operationId` wins over `operationPath` when a document sets both.
    pub fn operation(&self) -> Option<&str> {
        self.operation_id
            .as_deref()
            .or(self.operation_path.as_deref())
    }
}
