//! Tab list holding multiple forms with exactly one active at a time.
//! Switching tabs hides the outgoing form (clearing its alerts) and shows
//! the incoming one, whose children re-evaluate their own visibility.

use crate::element::UiError;
use crate::form::{Form, UiResult};

/// Handle addressing one form within a [`TabList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormId(pub(crate) usize);

#[derive(Default)]
pub struct TabList {
    forms: Vec<Form>,
    active: usize,
}

impl TabList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a form. The first form created becomes the active tab; later
    /// ones start hidden.
    pub fn create_form(&mut self, title: impl Into<String>) -> FormId {
        let mut form = Form::new(title);
        if !self.forms.is_empty() {
            form.set_hidden(true);
        }
        self.forms.push(form);
        FormId(self.forms.len() - 1)
    }

    pub fn active(&self) -> FormId {
        FormId(self.active)
    }

    /// Makes `id` the active tab, hiding every other form.
    pub fn set_active(&mut self, id: FormId) -> UiResult<()> {
        if id.0 >= self.forms.len() {
            return Err(UiError::UnknownForm);
        }
        for (index, form) in self.forms.iter_mut().enumerate() {
            form.set_hidden(index != id.0);
        }
        self.active = id.0;
        Ok(())
    }

    /// Cycles to the next tab in creation order.
    pub fn activate_next(&mut self) -> UiResult<()> {
        if self.forms.is_empty() {
            return Ok(());
        }
        let next = (self.active + 1) % self.forms.len();
        self.set_active(FormId(next))
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    pub fn titles(&self) -> Vec<String> {
        self.forms.iter().map(|f| f.title().to_string()).collect()
    }

    pub fn form(&self, id: FormId) -> UiResult<&Form> {
        self.forms.get(id.0).ok_or(UiError::UnknownForm)
    }

    pub fn form_mut(&mut self, id: FormId) -> UiResult<&mut Form> {
        self.forms.get_mut(id.0).ok_or(UiError::UnknownForm)
    }

    pub fn active_form(&self) -> Option<&Form> {
        self.forms.get(self.active)
    }

    pub fn active_form_mut(&mut self) -> Option<&mut Form> {
        self.forms.get_mut(self.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{AlertKind, DataType};
    use crate::form::ElementParams;

    #[test]
    fn test_first_form_is_active_later_forms_start_hidden() {
        let mut tabs = TabList::new();
        let first = tabs.create_form("Encryption");
        let second = tabs.create_form("Decryption");
        assert_eq!(tabs.active(), first);
        assert!(!tabs.form(first).unwrap().is_hidden());
        assert!(tabs.form(second).unwrap().is_hidden());
    }

    #[test]
    fn test_switching_hides_the_previous_form_and_clears_its_alerts() {
        let mut tabs = TabList::new();
        let first = tabs.create_form("Encryption");
        let second = tabs.create_form("Decryption");

        let field = tabs
            .form_mut(first)
            .unwrap()
            .create_text_box(ElementParams::new("F").with_data_type(DataType::Base64))
            .unwrap();
        let form = tabs.form_mut(first).unwrap();
        form.alert(field, AlertKind::Error, "bad").unwrap();
        assert_eq!(form.element(field).unwrap().alerts().len(), 1);

        tabs.set_active(second).unwrap();
        assert!(tabs.form(first).unwrap().is_hidden());
        assert!(!tabs.form(second).unwrap().is_hidden());
        assert!(tabs
            .form(first)
            .unwrap()
            .element(field)
            .unwrap()
            .alerts()
            .is_empty());
    }

    #[test]
    fn test_activate_next_wraps_around() {
        let mut tabs = TabList::new();
        let first = tabs.create_form("A");
        let second = tabs.create_form("B");
        tabs.activate_next().unwrap();
        assert_eq!(tabs.active(), second);
        tabs.activate_next().unwrap();
        assert_eq!(tabs.active(), first);
    }

    #[test]
    fn test_unknown_form_is_an_error() {
        let mut tabs = TabList::new();
        tabs.create_form("A");
        assert!(matches!(
            tabs.set_active(FormId(9)),
            Err(UiError::UnknownForm)
        ));
    }
}
