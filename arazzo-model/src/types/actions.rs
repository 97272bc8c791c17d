use std::time::Duration;

use crate::types::{Criterion, Extensions};

/// Attempts granted by a RETRY action that omits `retryLimit`.
pub const DEFAULT_RETRY_LIMIT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessActionType {
    End,
    Goto,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SuccessAction {
    pub name: String,

    #[serde(rename = "type")]
    pub action_type: SuccessActionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "workflowId")]
    pub workflow_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "stepId")]
    pub step_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Vec<Criterion>>,

    #[serde(flatten, default)]
    pub extensions: Extensions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureActionType {
    End,
    Retry,
    Goto,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FailureAction {
    pub name: String,

    #[serde(rename = "type")]
    pub action_type: FailureActionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "workflowId")]
    pub workflow_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "stepId")]
    pub step_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "retryAfter")]
    pub retry_after_seconds: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "retryLimit")]
    pub retry_limit: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Vec<Criterion>>,

    #[serde(flatten, default)]
    pub extensions: Extensions,
}

/// Where a GOTO jumps to, or what a RETRY runs before retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Step(&'a str),
    Workflow(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessKind<'a> {
    End,
    Goto(Target<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailureKind<'a> {
    End,
    Goto(Target<'a>),
    Retry(RetryPolicy<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy<'a> {
    /// Step or workflow executed for its side effects before the retry.
    pub hook: Option<Target<'a>>,
    /// Declared `retryAfter`; `None` defers to the runtime default.
    pub after: Option<Duration>,
    pub limit: u32,
}

impl SuccessAction {
    pub fn kind(&self) -> Result<SuccessKind<'_>, ActionError> {
        let target = target_of(&self.name, self.step_id.as_deref(), self.workflow_id.as_deref())?;
        match (self.action_type, target) {
            (SuccessActionType::End, None) => Ok(SuccessKind::End),
            (SuccessActionType::End, Some(_)) => Err(ActionError::UnexpectedTarget {
                action: self.name.clone(),
            }),
            (SuccessActionType::Goto, Some(t)) => Ok(SuccessKind::Goto(t)),
            (SuccessActionType::Goto, None) => Err(ActionError::MissingTarget {
                action: self.name.clone(),
            }),
        }
    }
}

impl FailureAction {
    pub fn kind(&self) -> Result<FailureKind<'_>, ActionError> {
        let target = target_of(&self.name, self.step_id.as_deref(), self.workflow_id.as_deref())?;
        let has_retry_fields = self.retry_after_seconds.is_some() || self.retry_limit.is_some();

        match self.action_type {
            FailureActionType::Retry => Ok(FailureKind::Retry(RetryPolicy {
                hook: target,
                after: self.retry_after()?,
                limit: self.retry_limit.unwrap_or(DEFAULT_RETRY_LIMIT),
            })),
            _ if has_retry_fields => Err(ActionError::RetryFieldsOnNonRetry {
                action: self.name.clone(),
            }),
            FailureActionType::End => match target {
                None => Ok(FailureKind::End),
                Some(_) => Err(ActionError::UnexpectedTarget {
                    action: self.name.clone(),
                }),
            },
            FailureActionType::Goto => target.map(FailureKind::Goto).ok_or_else(|| {
                ActionError::MissingTarget {
                    action: self.name.clone(),
                }
            }),
        }
    }

    fn retry_after(&self) -> Result<Option<Duration>, ActionError> {
        let Some(secs) = self.retry_after_seconds else {
            return Ok(None);
        };
        Duration::try_from_secs_f64(secs)
            .map(Some)
            .map_err(|_| ActionError::InvalidRetryAfter {
                action: self.name.clone(),
                value: secs,
            })
    }
}

fn target_of<'a>(
    action: &str,
    step_id: Option<&'a str>,
    workflow_id: Option<&'a str>,
) -> Result<Option<Target<'a>>, ActionError> {
    match (step_id, workflow_id) {
        (Some(_), Some(_)) => Err(ActionError::ConflictingTargets {
            action: action.to_string(),
        }),
        (Some(s), None) => Ok(Some(Target::Step(s))),
        (None, Some(w)) => Ok(Some(Target::Workflow(w))),
        (None, None) => Ok(None),
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("action '{action}' sets both stepId and workflowId")]
    ConflictingTargets { action: String },
    #[error("action '{action}' requires a stepId or workflowId")]
    MissingTarget { action: String },
    #[error("action '{action}' of type end must not name a target")]
    UnexpectedTarget { action: String },
    #[error("action '{action}' sets retryAfter/retryLimit but is not a retry action")]
    RetryFieldsOnNonRetry { action: String },
    #[error("action '{action}' has an invalid retryAfter: {value}")]
    InvalidRetryAfter { action: String, value: f64 },
}
