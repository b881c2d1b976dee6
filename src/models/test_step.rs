//! Test step models.
//!
//! Steps arrive as [`RawTestStep`] (open strings, as stored by the entity
//! layer) and are validated once into [`TestStep`], whose [`StepAction`] is a
//! closed set the compiler matches exhaustively.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Step as stored by the entity layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTestStep {
    pub action: String,
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Page whose selector map `selector` may refer to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<Uuid>,
}

impl RawTestStep {
    pub fn new(action: impl Into<String>, selector: impl Into<String>) -> Self {
        RawTestStep {
            action: action.into(),
            selector: selector.into(),
            value: None,
            description: None,
            page_id: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn on_page(mut self, page_id: Uuid) -> Self {
        self.page_id = Some(page_id);
        self
    }
}

/// One atomic browser action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    Click,
    Type { value: String },
    Select { value: String },
    Hover,
    Wait,
    Assert,
}

impl StepAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Type { .. } => "type",
            Self::Select { .. } => "select",
            Self::Hover => "hover",
            Self::Wait => "wait",
            Self::Assert => "assert",
        }
    }
}

/// Validated step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestStep {
    pub action: StepAction,
    pub selector: String,
    pub description: Option<String>,
    pub page_id: Option<Uuid>,
}

impl TestStep {
    /// Same step with a different selector string.
    pub fn with_selector(&self, selector: impl Into<String>) -> Self {
        TestStep {
            selector: selector.into(),
            ..self.clone()
        }
    }
}

impl TryFrom<&RawTestStep> for TestStep {
    type Error = AppError;

    fn try_from(raw: &RawTestStep) -> AppResult<Self> {
        let action = match raw.action.as_str() {
            "click" => StepAction::Click,
            "type" => match raw.value.as_deref() {
                Some(value) if !value.is_empty() => StepAction::Type {
                    value: value.to_string(),
                },
                _ => {
                    return Err(AppError::InvalidStep(format!(
                        "'type' step on '{}' requires a non-empty value",
                        raw.selector
                    )));
                }
            },
            "select" => match raw.value.as_deref() {
                Some(value) if !value.is_empty() => StepAction::Select {
                    value: value.to_string(),
                },
                _ => {
                    return Err(AppError::InvalidStep(format!(
                        "'select' step on '{}' requires an option value",
                        raw.selector
                    )));
                }
            },
            "hover" => StepAction::Hover,
            "wait" => StepAction::Wait,
            "assert" => StepAction::Assert,
            other => return Err(AppError::UnknownAction(other.to_string())),
        };

        if raw.selector.is_empty() {
            return Err(AppError::InvalidStep(format!(
                "'{}' step requires a selector",
                raw.action
            )));
        }

        Ok(TestStep {
            action,
            selector: raw.selector.clone(),
            description: raw.description.clone(),
            page_id: raw.page_id,
        })
    }
}

/// Validate an ordered sequence, preserving order.
pub fn validate_steps(raw: &[RawTestStep]) -> AppResult<Vec<TestStep>> {
    raw.iter().map(TestStep::try_from).collect()
}
