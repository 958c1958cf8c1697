//! Ordered collection of form elements with the state that ties them
//! together: the advanced-settings toggle, the hidden and busy flags, and
//! the broadcast update pass that recomputes every element's displayed
//! enabled/visible state from its predicates.
//!
//! Predicates are pure functions over a [`FormSnapshot`] and are attached
//! after the elements they reference exist, so any element can depend on
//! any other regardless of creation order.

use std::fmt;

use serde::Serialize;

use crate::element::{
    Alert, AlertKind, ChoiceOption, DataType, Element, ElementId, ElementKind, NumberConstraints,
    Payload, UiError, Value,
};

pub type UiResult<T> = std::result::Result<T, UiError>;

/// Pure view of a form's current state, passed to enabled/visible
/// predicates during the update pass.
pub struct FormSnapshot<'a> {
    form: &'a Form,
}

impl FormSnapshot<'_> {
    /// Raw checkbox state, regardless of the element's visibility.
    pub fn is_checked(&self, id: ElementId) -> bool {
        self.form
            .elements
            .get(id.0)
            .map(Element::is_checked)
            .unwrap_or(false)
    }

    /// Currently selected drop-down option.
    pub fn choice(&self, id: ElementId) -> Option<&str> {
        self.form.elements.get(id.0).and_then(Element::selected_option)
    }

    pub fn choice_is(&self, id: ElementId, option: &str) -> bool {
        self.choice(id) == Some(option)
    }

    pub fn advanced(&self) -> bool {
        self.form.advanced
    }

    /// True while an operation triggered from this form is in flight.
    pub fn busy(&self) -> bool {
        self.form.busy
    }
}

/// Predicate evaluated against a [`FormSnapshot`] on every update pass.
pub type Predicate = Box<dyn Fn(&FormSnapshot) -> bool + Send>;

/// Shared creation options for the element factories.
#[derive(Default)]
pub struct ElementParams {
    label: String,
    data_type: Option<DataType>,
    advanced: bool,
    placeholder: Option<String>,
    initial: Option<String>,
    constraints: NumberConstraints,
    options: Vec<ChoiceOption>,
}

impl ElementParams {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Overrides the factory's default data type.
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Marks the element as part of the advanced settings group: it is
    /// only visible while the form's advanced mode is on.
    pub fn with_advanced(mut self) -> Self {
        self.advanced = true;
        self
    }

    pub fn with_placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = Some(text.into());
        self
    }

    /// Initial edit-buffer content (or initially selected drop-down
    /// option).
    pub fn with_initial(mut self, text: impl Into<String>) -> Self {
        self.initial = Some(text.into());
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.constraints.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.constraints.max = Some(max);
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.constraints.step = Some(step);
        self
    }

    pub fn with_required(mut self) -> Self {
        self.constraints.required = true;
        self
    }

    /// Drop-down options whose display name doubles as the value.
    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|o| ChoiceOption::new(*o, *o)).collect();
        self
    }

    /// Drop-down options as (display name, value) pairs.
    pub fn with_named_options(mut self, options: &[(&str, &str)]) -> Self {
        self.options = options
            .iter()
            .map(|(name, value)| ChoiceOption::new(*name, *value))
            .collect();
        self
    }
}

pub struct Form {
    title: String,
    elements: Vec<Element>,
    advanced_toggle: ElementId,
    advanced: bool,
    hidden: bool,
    busy: bool,
}

impl Form {
    /// Creates an empty form. Every form starts with its own
    /// "Advanced settings" checkbox as the first element; toggling it
    /// switches the form's advanced mode.
    pub fn new(title: impl Into<String>) -> Self {
        let mut form = Self {
            title: title.into(),
            elements: Vec::new(),
            advanced_toggle: ElementId(0),
            advanced: false,
            hidden: false,
            busy: false,
        };
        form.elements.push(Element::new(
            "Advanced settings",
            ElementKind::CheckBox,
            DataType::Bool,
            Payload::Flag { checked: false },
        ));
        form
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn advanced_toggle(&self) -> ElementId {
        self.advanced_toggle
    }

    // ---- factories ----------------------------------------------------

    pub fn create_text_box(&mut self, params: ElementParams) -> UiResult<ElementId> {
        self.insert(
            ElementKind::TextBox,
            &[DataType::Plaintext, DataType::Base64, DataType::JsonBase64],
            DataType::Plaintext,
            params,
        )
    }

    pub fn create_text_area(&mut self, params: ElementParams) -> UiResult<ElementId> {
        self.insert(
            ElementKind::TextArea,
            &[DataType::Plaintext, DataType::Base64, DataType::JsonBase64],
            DataType::Plaintext,
            params,
        )
    }

    pub fn create_password_box(&mut self, params: ElementParams) -> UiResult<ElementId> {
        self.insert(
            ElementKind::PasswordBox,
            &[DataType::Plaintext],
            DataType::Plaintext,
            params,
        )
    }

    pub fn create_number_box(&mut self, params: ElementParams) -> UiResult<ElementId> {
        self.insert(
            ElementKind::NumberBox,
            &[DataType::Number],
            DataType::Number,
            params,
        )
    }

    pub fn create_drop_down(&mut self, params: ElementParams) -> UiResult<ElementId> {
        self.insert(
            ElementKind::DropDown,
            &[DataType::Category],
            DataType::Category,
            params,
        )
    }

    pub fn create_check_box(&mut self, params: ElementParams) -> UiResult<ElementId> {
        self.insert(
            ElementKind::CheckBox,
            &[DataType::Bool],
            DataType::Bool,
            params,
        )
    }

    pub fn create_button(&mut self, params: ElementParams) -> UiResult<ElementId> {
        self.insert(ElementKind::Button, &[DataType::None], DataType::None, params)
    }

    pub fn create_output(&mut self, params: ElementParams) -> UiResult<ElementId> {
        self.insert(
            ElementKind::Output,
            &[DataType::Plaintext, DataType::Base64, DataType::JsonBase64],
            DataType::Plaintext,
            params,
        )
    }

    fn insert(
        &mut self,
        kind: ElementKind,
        allowed: &[DataType],
        default: DataType,
        params: ElementParams,
    ) -> UiResult<ElementId> {
        let data_type = params.data_type.unwrap_or(default);
        if !allowed.contains(&data_type) {
            return Err(UiError::UnsupportedType { kind, data_type });
        }
        let payload = match kind {
            ElementKind::TextBox
            | ElementKind::TextArea
            | ElementKind::PasswordBox
            | ElementKind::Output => Payload::Text {
                raw: params.initial.clone().unwrap_or_default(),
            },
            ElementKind::NumberBox => Payload::Number {
                raw: params.initial.clone().unwrap_or_default(),
                constraints: params.constraints,
            },
            ElementKind::DropDown => {
                let selected = match &params.initial {
                    Some(initial) => params
                        .options
                        .iter()
                        .position(|o| o.value == *initial)
                        .ok_or_else(|| UiError::UnknownOption {
                            label: params.label.clone(),
                            value: initial.clone(),
                        })?,
                    None => 0,
                };
                Payload::Choice {
                    options: params.options.clone(),
                    selected,
                }
            }
            ElementKind::CheckBox => Payload::Flag { checked: false },
            ElementKind::Button => Payload::Action,
        };
        let mut element = Element::new(params.label, kind, data_type, payload);
        element.placeholder = params.placeholder;
        element.advanced = params.advanced;
        // Advanced elements start hidden until the first update pass runs
        // with advanced mode on.
        element.hidden = self.hidden || (element.advanced && !self.advanced);
        self.elements.push(element);
        Ok(ElementId(self.elements.len() - 1))
    }

    // ---- predicates and the update pass -------------------------------

    pub fn enable_when(
        &mut self,
        id: ElementId,
        predicate: impl Fn(&FormSnapshot) -> bool + Send + 'static,
    ) -> UiResult<()> {
        self.element_mut(id)?.enabled_when = Some(Box::new(predicate));
        self.update_all();
        Ok(())
    }

    pub fn show_when(
        &mut self,
        id: ElementId,
        predicate: impl Fn(&FormSnapshot) -> bool + Send + 'static,
    ) -> UiResult<()> {
        self.element_mut(id)?.visible_when = Some(Box::new(predicate));
        self.update_all();
        Ok(())
    }

    /// Recomputes every element's displayed enabled/hidden state from its
    /// predicates and the form-level flags. An element becoming hidden has
    /// its alerts cleared; one becoming visible is re-evaluated, never
    /// forced.
    pub fn update_all(&mut self) {
        let form_hidden = self.hidden;
        let form_advanced = self.advanced;
        let states: Vec<(bool, bool)> = {
            let snapshot = FormSnapshot { form: &*self };
            self.elements
                .iter()
                .map(|el| {
                    let enabled = el.enabled_when.as_ref().map_or(true, |p| p(&snapshot));
                    let shown = el.visible_when.as_ref().map_or(true, |p| p(&snapshot));
                    let visible = !form_hidden && (!el.advanced || form_advanced) && shown;
                    (enabled, visible)
                })
                .collect()
        };
        for (element, (enabled, visible)) in self.elements.iter_mut().zip(states) {
            element.enabled = enabled;
            if !visible && !element.hidden {
                element.clear_alerts();
            }
            element.hidden = !visible;
        }
    }

    // ---- form-level flags ---------------------------------------------

    pub fn is_advanced(&self) -> bool {
        self.advanced
    }

    pub fn set_advanced(&mut self, on: bool) {
        self.advanced = on;
        if let Some(toggle) = self.elements.get_mut(self.advanced_toggle.0) {
            if let Payload::Flag { checked } = &mut toggle.payload {
                *checked = on;
            }
        }
        self.update_all();
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_hidden(&mut self, on: bool) {
        self.hidden = on;
        self.update_all();
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn set_busy(&mut self, on: bool) {
        self.busy = on;
        self.update_all();
    }

    // ---- element access -----------------------------------------------

    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        (0..self.elements.len()).map(ElementId)
    }

    pub fn element(&self, id: ElementId) -> UiResult<&Element> {
        self.elements.get(id.0).ok_or(UiError::UnknownElement)
    }

    fn element_mut(&mut self, id: ElementId) -> UiResult<&mut Element> {
        self.elements.get_mut(id.0).ok_or(UiError::UnknownElement)
    }

    // ---- typed reads and writes ---------------------------------------

    /// Reads an element through its data type. Clears the element's alerts
    /// first; recoverable conversion failures attach an alert and yield
    /// `Ok(None)`.
    pub fn value(&mut self, id: ElementId) -> UiResult<Option<Value>> {
        Ok(self.element_mut(id)?.read_value())
    }

    pub fn set_value(&mut self, id: ElementId, value: Value) -> UiResult<()> {
        self.element_mut(id)?.write_value(value)
    }

    pub fn text(&mut self, id: ElementId) -> UiResult<Option<String>> {
        match self.value(id)? {
            Some(Value::Text(text)) => Ok(Some(text)),
            None => Ok(None),
            Some(_) => Err(self.mismatch(id, "text")),
        }
    }

    pub fn bytes(&mut self, id: ElementId) -> UiResult<Option<Vec<u8>>> {
        match self.value(id)? {
            Some(Value::Bytes(bytes)) => Ok(Some(bytes)),
            None => Ok(None),
            Some(_) => Err(self.mismatch(id, "byte")),
        }
    }

    pub fn json(&mut self, id: ElementId) -> UiResult<Option<serde_json::Value>> {
        match self.value(id)? {
            Some(Value::Json(json)) => Ok(Some(json)),
            None => Ok(None),
            Some(_) => Err(self.mismatch(id, "JSON")),
        }
    }

    pub fn number(&mut self, id: ElementId) -> UiResult<Option<f64>> {
        match self.value(id)? {
            Some(Value::Number(number)) => Ok(Some(number)),
            None => Ok(None),
            Some(_) => Err(self.mismatch(id, "number")),
        }
    }

    pub fn checked(&mut self, id: ElementId) -> UiResult<bool> {
        match self.value(id)? {
            Some(Value::Bool(checked)) => Ok(checked),
            _ => Err(self.mismatch(id, "bool")),
        }
    }

    pub fn choice(&mut self, id: ElementId) -> UiResult<Option<String>> {
        match self.value(id)? {
            Some(Value::Text(option)) => Ok(Some(option)),
            None => Ok(None),
            Some(_) => Err(self.mismatch(id, "category")),
        }
    }

    pub fn set_text(&mut self, id: ElementId, text: impl Into<String>) -> UiResult<()> {
        self.set_value(id, Value::Text(text.into()))
    }

    /// Replaces a text-like element's edit buffer verbatim, as if the user
    /// had typed it. Unlike the typed writes this bypasses the element's
    /// data type.
    pub fn set_raw_text(&mut self, id: ElementId, text: impl Into<String>) -> UiResult<()> {
        self.element_mut(id)?.set_raw(text.into())
    }

    pub fn set_bytes(&mut self, id: ElementId, bytes: impl Into<Vec<u8>>) -> UiResult<()> {
        self.set_value(id, Value::Bytes(bytes.into()))
    }

    pub fn set_json<T: Serialize>(&mut self, id: ElementId, value: &T) -> UiResult<()> {
        let json = serde_json::to_value(value).map_err(|_| self.mismatch(id, "serializable JSON"))?;
        self.set_value(id, Value::Json(json))
    }

    fn mismatch(&self, id: ElementId, expected: &'static str) -> UiError {
        let label = self
            .elements
            .get(id.0)
            .map(|el| el.label.clone())
            .unwrap_or_default();
        UiError::TypeMismatch { label, expected }
    }

    // ---- alerts --------------------------------------------------------

    /// Attaches an alert with the default title for its kind. Alerts on
    /// hidden elements are a caller error and leave the element untouched.
    pub fn alert(&mut self, id: ElementId, kind: AlertKind, message: impl Into<String>) -> UiResult<()> {
        let alert = match kind {
            AlertKind::Info => Alert::info(message),
            AlertKind::Error => Alert::error(message),
        };
        self.push_alert(id, alert)
    }

    pub fn alert_titled(
        &mut self,
        id: ElementId,
        kind: AlertKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> UiResult<()> {
        self.push_alert(id, Alert::titled(kind, title, message))
    }

    fn push_alert(&mut self, id: ElementId, alert: Alert) -> UiResult<()> {
        let element = self.element_mut(id)?;
        if element.hidden {
            return Err(UiError::HiddenAlert {
                label: element.label.clone(),
            });
        }
        element.alerts.push(alert);
        Ok(())
    }

    /// Reports a handled error on an element: the message lands in an
    /// error alert as `message (extra)` — or bare when no extra context is
    /// given — and is forwarded to the diagnostic log.
    pub fn handle_error(
        &mut self,
        id: ElementId,
        error: &dyn fmt::Display,
        extra: &str,
    ) -> UiResult<()> {
        tracing::error!(context = extra, "{}", error);
        let message = if extra.is_empty() {
            error.to_string()
        } else {
            format!("{} ({})", error, extra)
        };
        self.alert(id, AlertKind::Error, message)
    }

    pub fn clear_alerts(&mut self, id: ElementId) -> UiResult<()> {
        self.element_mut(id)?.clear_alerts();
        Ok(())
    }

    pub fn clear_all_alerts(&mut self) {
        for element in &mut self.elements {
            element.clear_alerts();
        }
    }

    // ---- user edits ----------------------------------------------------

    /// Flips a checkbox and runs the broadcast update. Toggling the
    /// advanced-settings checkbox switches the form's advanced mode.
    pub fn toggle_check_box(&mut self, id: ElementId) -> UiResult<()> {
        let element = self.element_mut(id)?;
        if element.hidden || !element.enabled {
            return Ok(());
        }
        let now_checked = match &mut element.payload {
            Payload::Flag { checked } => {
                *checked = !*checked;
                *checked
            }
            _ => return Err(self.mismatch(id, "bool")),
        };
        if id == self.advanced_toggle {
            self.advanced = now_checked;
        }
        self.update_all();
        Ok(())
    }

    /// Moves a drop-down's selection by `delta` (wrapping) and runs the
    /// broadcast update.
    pub fn cycle_choice(&mut self, id: ElementId, delta: i32) -> UiResult<()> {
        let element = self.element_mut(id)?;
        if element.hidden || !element.enabled {
            return Ok(());
        }
        match &mut element.payload {
            Payload::Choice { options, selected } if !options.is_empty() => {
                let len = options.len() as i32;
                *selected = ((*selected as i32 + delta).rem_euclid(len)) as usize;
            }
            Payload::Choice { .. } => {}
            _ => return Err(self.mismatch(id, "category")),
        }
        self.update_all();
        Ok(())
    }

    /// Appends a character to a text-like element's edit buffer. Ignored
    /// for disabled or hidden elements.
    pub fn push_char(&mut self, id: ElementId, ch: char) -> UiResult<()> {
        let element = self.element_mut(id)?;
        if element.hidden || !element.enabled {
            return Ok(());
        }
        match &mut element.payload {
            Payload::Text { raw } | Payload::Number { raw, .. } => {
                raw.push(ch);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Removes the last character from a text-like element's edit buffer.
    pub fn pop_char(&mut self, id: ElementId) -> UiResult<()> {
        let element = self.element_mut(id)?;
        if element.hidden || !element.enabled {
            return Ok(());
        }
        match &mut element.payload {
            Payload::Text { raw } | Payload::Number { raw, .. } => {
                raw.pop();
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
