use arazzo_model::{Parameter, ParameterLocation, Step, Workflow};
use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::executor::error::EngineError;
use crate::executor::step::{conclude_step, StepExecutor};
use crate::executor::types::{EngineConfig, ExecutionOutcome};
use crate::resolver::Resolver;
use crate::snapshot::TransactionSnapshot;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("timeout")]
    Timeout,
    #[error("connect/dns/tls error: {0}")]
    Network(String),
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
    #[error("transport error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ResolvedParameter {
    pub name: String,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<ParameterLocation>,
    pub value: JsonValue,
}

/// Everything a transport needs to perform one step's operation.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRequest {
    pub workflow_id: String,
    pub step_id: String,
    /// `operationId` as declared, or the `operationPath` with its expressions substituted.
    pub operation: String,
    pub parameters: Vec<ResolvedParameter>,
    pub content_type: Option<String>,
    pub payload: Option<JsonValue>,
}

impl StepRequest {
    pub fn parameter(&self, name: &str) -> Option<&JsonValue> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

/// Performs the remote call and reports what happened on the wire.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: StepRequest) -> Result<TransactionSnapshot, TransportError>;
}

/// A [`StepExecutor`] that builds a [`StepRequest`] through the resolver,
/// hands it to a [`Transport`] and judges the returned snapshot.
pub struct TransportStepExecutor<T> {
    transport: T,
}

impl<T: Transport> TransportStepExecutor<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn build_request(
        &self,
        workflow: &Workflow,
        step: &Step,
        resolver: &mut Resolver<'_>,
    ) -> Result<StepRequest, EngineError> {
        let target = step.operation().ok_or_else(|| EngineError::MissingOperation {
            step_id: step.step_id.clone(),
        })?;
        // An operationPath may embed runtime expressions; an operationId is used verbatim.
        let operation = if step.operation_id.is_some() {
            target.to_string()
        } else {
            resolver.resolve_template(target, None)?
        };

        let mut parameters = Vec::new();
        for p in merge_parameters(&workflow.parameters, &step.parameters) {
            parameters.push(ResolvedParameter {
                name: p.name.clone(),
                location: p.r#in,
                value: resolver.resolve_value(&p.value, None)?,
            });
        }

        let (content_type, payload) = match &step.request_body {
            Some(body) => {
                let payload = match &body.payload {
                    Some(p) => Some(resolver.resolve_value(p, None)?),
                    None => None,
                };
                (body.content_type.clone(), payload)
            }
            None => (None, None),
        };

        Ok(StepRequest {
            workflow_id: workflow.workflow_id.clone(),
            step_id: step.step_id.clone(),
            operation,
            parameters,
            content_type,
            payload,
        })
    }
}

/// Workflow parameters apply to every step; a step parameter with the same
/// name and location replaces the workflow one.
fn merge_parameters<'p>(workflow: &'p [Parameter], step: &'p [Parameter]) -> Vec<&'p Parameter> {
    let mut merged: Vec<&Parameter> = workflow
        .iter()
        .filter(|w| !step.iter().any(|s| s.same_identity(w)))
        .collect();
    merged.extend(step.iter());
    merged
}

#[async_trait]
impl<T: Transport> StepExecutor for TransportStepExecutor<T> {
    async fn execute(
        &self,
        workflow: &Workflow,
        step: &Step,
        resolver: &mut Resolver<'_>,
        config: &EngineConfig,
    ) -> Result<ExecutionOutcome, EngineError> {
        let request = self.build_request(workflow, step, resolver)?;
        let snapshot = self.transport.send(request).await?;
        conclude_step(step, &snapshot, resolver, &config.retry)
    }
}
