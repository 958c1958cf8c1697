//! Single interactive form field: a kind (text box, checkbox, button, ...),
//! a declared data type, the raw state behind it, and the alert surface that
//! errors are reported on.
//!
//! Typed reads follow a strict split: data the user can fix (bad base64, an
//! out-of-range number) yields `Ok(None)` with an alert attached to the
//! element, while misuse by the caller (attaching an alert to a hidden
//! element, writing the wrong value shape) is a hard [`UiError`].

use std::fmt;

use thiserror::Error;

use crate::codec::{self, CodecError};
use crate::form::Predicate;

/// Handle addressing one element within its form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub(crate) usize);

/// Interpretation applied to an element's raw state when it is read or
/// written. Fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Plaintext,
    Base64,
    JsonBase64,
    Bool,
    Number,
    Category,
    None,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Plaintext => "plaintext",
            DataType::Base64 => "base64",
            DataType::JsonBase64 => "json-base64",
            DataType::Bool => "bool",
            DataType::Number => "number",
            DataType::Category => "category",
            DataType::None => "none",
        };
        write!(f, "{}", name)
    }
}

/// Widget family an element renders and edits as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    TextBox,
    TextArea,
    PasswordBox,
    NumberBox,
    DropDown,
    CheckBox,
    Button,
    Output,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::TextBox => "text box",
            ElementKind::TextArea => "text area",
            ElementKind::PasswordBox => "password box",
            ElementKind::NumberBox => "number box",
            ElementKind::DropDown => "drop-down",
            ElementKind::CheckBox => "checkbox",
            ElementKind::Button => "button",
            ElementKind::Output => "output",
        };
        write!(f, "{}", name)
    }
}

/// Typed value produced by reading an element (and accepted when writing
/// one). Which variant applies is decided by the element's [`DataType`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Bool(bool),
    Number(f64),
}

/// Caller-side misuse of the form API. These are programmer errors and
/// propagate as hard failures; they never become alerts.
#[derive(Error, Debug)]
pub enum UiError {
    #[error("a {kind} cannot carry the {data_type} data type")]
    UnsupportedType { kind: ElementKind, data_type: DataType },
    #[error("cannot attach an alert to hidden element '{label}'")]
    HiddenAlert { label: String },
    #[error("element '{label}' expects a {expected} value")]
    TypeMismatch {
        label: String,
        expected: &'static str,
    },
    #[error("'{value}' is not an option of drop-down '{label}'")]
    UnknownOption { label: String, value: String },
    #[error("no such element in this form")]
    UnknownElement,
    #[error("no such form")]
    UnknownForm,
}

/// Number-input constraint violation, carrying the message shown to the
/// user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Severity of an [`Alert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Info,
    Error,
}

/// Message attached beneath an element until it is read again, hidden, or
/// explicitly cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn info(message: impl Into<String>) -> Self {
        Self::titled(AlertKind::Info, "Info: ", message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::titled(AlertKind::Error, "Error: ", message)
    }

    pub fn titled(kind: AlertKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// One drop-down entry: a display name and the categorical value reads
/// produce when it is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub name: String,
    pub value: String,
}

impl ChoiceOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Constraints applied when a number box is read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NumberConstraints {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub required: bool,
}

impl NumberConstraints {
    /// Validates a raw edit buffer against the constraints. An empty
    /// optional field is valid and carries no value.
    pub fn validate(&self, raw: &str) -> Result<Option<f64>, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            if self.required {
                return Err(ValidationError("Please fill out this field.".into()));
            }
            return Ok(None);
        }
        let value: f64 = trimmed
            .parse()
            .map_err(|_| ValidationError("Please enter a number.".into()))?;
        if !value.is_finite() {
            return Err(ValidationError("Please enter a number.".into()));
        }
        if let Some(min) = self.min {
            if value < min {
                return Err(ValidationError(format!(
                    "Value must be greater than or equal to {}.",
                    min
                )));
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return Err(ValidationError(format!(
                    "Value must be less than or equal to {}.",
                    max
                )));
            }
        }
        if let Some(step) = self.step {
            let base = self.min.unwrap_or(0.0);
            let ratio = (value - base) / step;
            let drift = (ratio - ratio.round()).abs();
            if drift > 1e-9 {
                return Err(ValidationError("Please enter a valid value.".into()));
            }
        }
        Ok(Some(value))
    }
}

/// Kind-specific storage behind an element.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Payload {
    /// Edit buffer for text boxes, text areas, password boxes and outputs.
    Text { raw: String },
    /// Edit buffer plus constraints for number boxes.
    Number {
        raw: String,
        constraints: NumberConstraints,
    },
    /// Options and current selection of a drop-down.
    Choice {
        options: Vec<ChoiceOption>,
        selected: usize,
    },
    /// Checkbox state.
    Flag { checked: bool },
    /// Buttons hold no value.
    Action,
}

pub struct Element {
    pub(crate) label: String,
    pub(crate) kind: ElementKind,
    pub(crate) data_type: DataType,
    pub(crate) payload: Payload,
    pub(crate) placeholder: Option<String>,
    pub(crate) advanced: bool,
    pub(crate) enabled: bool,
    pub(crate) hidden: bool,
    pub(crate) alerts: Vec<Alert>,
    pub(crate) enabled_when: Option<Predicate>,
    pub(crate) visible_when: Option<Predicate>,
}

impl Element {
    pub(crate) fn new(
        label: impl Into<String>,
        kind: ElementKind,
        data_type: DataType,
        payload: Payload,
    ) -> Self {
        Self {
            label: label.into(),
            kind,
            data_type,
            payload,
            placeholder: None,
            advanced: false,
            enabled: true,
            hidden: false,
            alerts: Vec::new(),
            enabled_when: None,
            visible_when: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_advanced(&self) -> bool {
        self.advanced
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    /// Raw edit buffer, as rendered. Empty for non-text kinds.
    pub fn raw_text(&self) -> &str {
        match &self.payload {
            Payload::Text { raw } | Payload::Number { raw, .. } => raw,
            _ => "",
        }
    }

    pub fn is_checked(&self) -> bool {
        matches!(self.payload, Payload::Flag { checked: true })
    }

    pub fn options(&self) -> &[ChoiceOption] {
        match &self.payload {
            Payload::Choice { options, .. } => options,
            _ => &[],
        }
    }

    /// Categorical value of the selected option.
    pub fn selected_option(&self) -> Option<&str> {
        match &self.payload {
            Payload::Choice { options, selected } => {
                options.get(*selected).map(|o| o.value.as_str())
            }
            _ => None,
        }
    }

    /// Display name of the selected option.
    pub fn selected_name(&self) -> Option<&str> {
        match &self.payload {
            Payload::Choice { options, selected } => {
                options.get(*selected).map(|o| o.name.as_str())
            }
            _ => None,
        }
    }

    pub(crate) fn clear_alerts(&mut self) {
        self.alerts.clear();
    }

    /// Reads the element through its data type. Clears prior alerts first;
    /// a recoverable conversion failure attaches a fresh alert (or logs it
    /// when the element is hidden) and yields `None`.
    pub(crate) fn read_value(&mut self) -> Option<Value> {
        self.clear_alerts();
        match self.convert() {
            Ok(value) => value,
            Err(alert) => {
                if self.hidden {
                    tracing::warn!(
                        element = %self.label,
                        message = %alert.message,
                        "suppressed alert on hidden element"
                    );
                } else {
                    self.alerts.push(alert);
                }
                None
            }
        }
    }

    fn convert(&self) -> Result<Option<Value>, Alert> {
        match self.data_type {
            DataType::Plaintext => Ok(Some(Value::Text(self.raw_text().to_string()))),
            DataType::Base64 => match codec::base64_to_bytes(self.raw_text()) {
                Ok(bytes) => Ok(Some(Value::Bytes(bytes))),
                Err(err) => Err(Alert::error(err.to_string())),
            },
            DataType::JsonBase64 => match codec::base64_to_json(self.raw_text()) {
                Ok(json) => Ok(Some(Value::Json(json))),
                Err(err @ CodecError::Decode(_)) => Err(Alert::error(err.to_string())),
                Err(err @ CodecError::Parse(_)) => Err(Alert::error(err.to_string())),
            },
            DataType::Number => {
                let constraints = match &self.payload {
                    Payload::Number { constraints, .. } => *constraints,
                    _ => NumberConstraints::default(),
                };
                match constraints.validate(self.raw_text()) {
                    Ok(value) => Ok(value.map(Value::Number)),
                    Err(err) => Err(Alert::error(err.0)),
                }
            }
            DataType::Bool => Ok(Some(Value::Bool(self.is_checked()))),
            DataType::Category => Ok(self
                .selected_option()
                .map(|option| Value::Text(option.to_string()))),
            DataType::None => Ok(None),
        }
    }

    /// Writes a typed value through the element's data type. No validation
    /// is applied on write; shape mismatches are caller errors.
    pub(crate) fn write_value(&mut self, value: Value) -> Result<(), UiError> {
        match (self.data_type, value) {
            (DataType::Plaintext, Value::Text(text)) => self.set_raw(text),
            (DataType::Base64, Value::Bytes(bytes)) => self.set_raw(codec::bytes_to_base64(&bytes)),
            (DataType::JsonBase64, Value::Json(json)) => {
                let encoded = codec::json_to_base64(&json).map_err(|_| UiError::TypeMismatch {
                    label: self.label.clone(),
                    expected: "serializable JSON",
                })?;
                self.set_raw(encoded)
            }
            (DataType::Number, Value::Number(number)) => self.set_raw(number.to_string()),
            (DataType::Bool, Value::Bool(checked)) => {
                if let Payload::Flag { checked: current } = &mut self.payload {
                    *current = checked;
                }
                Ok(())
            }
            (DataType::Category, Value::Text(option)) => {
                if let Payload::Choice { options, selected } = &mut self.payload {
                    match options.iter().position(|o| o.value == option) {
                        Some(index) => {
                            *selected = index;
                            Ok(())
                        }
                        None => Err(UiError::UnknownOption {
                            label: self.label.clone(),
                            value: option,
                        }),
                    }
                } else {
                    Err(UiError::TypeMismatch {
                        label: self.label.clone(),
                        expected: "category",
                    })
                }
            }
            (data_type, _) => Err(UiError::TypeMismatch {
                label: self.label.clone(),
                expected: match data_type {
                    DataType::Plaintext => "text",
                    DataType::Base64 => "byte",
                    DataType::JsonBase64 => "JSON",
                    DataType::Bool => "bool",
                    DataType::Number => "number",
                    DataType::Category => "category",
                    DataType::None => "no",
                },
            }),
        }
    }

    pub(crate) fn set_raw(&mut self, text: String) -> Result<(), UiError> {
        match &mut self.payload {
            Payload::Text { raw } | Payload::Number { raw, .. } => {
                *raw = text;
                Ok(())
            }
            _ => Err(UiError::TypeMismatch {
                label: self.label.clone(),
                expected: "text",
            }),
        }
    }
}
