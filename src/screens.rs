//! The two tab screens: element layout, predicate wiring, and the glue
//! between form reads/writes and pipeline requests/outcomes.
//!
//! Collection reads abort on the first unreadable value; the failing
//! element already carries the alert, so an abort is silent. Write-backs
//! never touch outputs on failure.

use crate::element::{AlertKind, DataType, ElementId};
use crate::form::{ElementParams, Form};
use crate::models::{AesMode, DecryptPayload, KeySize, DEFAULT_PBKDF2_ITERATIONS, PBKDF2_ITERATIONS_WARN};
use crate::pipeline::{
    DecryptError, DecryptOutcome, DecryptRequest, EncryptError, EncryptOutcome, EncryptRequest,
};
use crate::tabs::{FormId, TabList};
use crate::Result;

const MODE_OPTIONS: [(&str, &str); 3] = [
    ("AES-GCM (Galois/Counter Mode)", "AES-GCM"),
    ("AES-CBC (Cipher Block Chaining)", "AES-CBC"),
    ("AES-CTR (Counter)", "AES-CTR"),
];
const KEY_SIZE_OPTIONS: [(&str, &str); 2] = [("128 bits", "128"), ("256 bits", "256")];

/// Elements of the encryption tab.
pub struct EncryptScreen {
    pub form: FormId,
    pub message: ElementId,
    pub password: ElementId,
    pub iterations: ElementId,
    pub salt: ElementId,
    pub fixed_salt: ElementId,
    pub key_size: ElementId,
    pub key: ElementId,
    pub manual_key: ElementId,
    pub iv: ElementId,
    pub fixed_iv: ElementId,
    pub counter: ElementId,
    pub fixed_counter: ElementId,
    pub mode: ElementId,
    pub button: ElementId,
    pub output: ElementId,
    pub output_raw: ElementId,
}

impl EncryptScreen {
    pub fn build(tabs: &mut TabList) -> Result<Self> {
        let form_id = tabs.create_form("Encryption");
        let form = tabs.form_mut(form_id)?;

        let message = form.create_text_area(
            ElementParams::new("Message").with_placeholder("Type a secret message"),
        )?;
        let password = form.create_password_box(
            ElementParams::new("Password").with_placeholder("Enter your password"),
        )?;
        let iterations = form.create_number_box(
            ElementParams::new("PBKDF2 iterations")
                .with_min(1.0)
                .with_max(u32::MAX as f64)
                .with_step(1.0)
                .with_required()
                .with_initial(DEFAULT_PBKDF2_ITERATIONS.to_string())
                .with_advanced(),
        )?;
        let salt = form.create_text_box(
            ElementParams::new("PBKDF2 salt")
                .with_data_type(DataType::Base64)
                .with_advanced(),
        )?;
        let fixed_salt = form.create_check_box(
            ElementParams::new("Use fixed salt instead of random").with_advanced(),
        )?;
        let key_size = form.create_drop_down(
            ElementParams::new("AES key size")
                .with_advanced()
                .with_named_options(&KEY_SIZE_OPTIONS),
        )?;
        let key = form.create_text_box(
            ElementParams::new("Key")
                .with_data_type(DataType::Base64)
                .with_advanced(),
        )?;
        let manual_key = form.create_check_box(
            ElementParams::new("Use fixed key instead of password").with_advanced(),
        )?;
        let iv = form.create_text_box(
            ElementParams::new("IV")
                .with_data_type(DataType::Base64)
                .with_advanced(),
        )?;
        let fixed_iv = form.create_check_box(
            ElementParams::new("Use fixed IV instead of random").with_advanced(),
        )?;
        let counter = form.create_text_box(
            ElementParams::new("Counter")
                .with_data_type(DataType::Base64)
                .with_advanced(),
        )?;
        let fixed_counter = form.create_check_box(
            ElementParams::new("Use fixed counter instead of random").with_advanced(),
        )?;
        let mode = form.create_drop_down(
            ElementParams::new("AES mode")
                .with_advanced()
                .with_named_options(&MODE_OPTIONS),
        )?;
        let button = form.create_button(ElementParams::new("Encrypt"))?;
        let output =
            form.create_output(ElementParams::new("Output").with_data_type(DataType::JsonBase64))?;
        let output_raw = form.create_output(
            ElementParams::new("Raw ciphertext")
                .with_data_type(DataType::Base64)
                .with_advanced(),
        )?;

        form.enable_when(password, move |s| !s.is_checked(manual_key))?;
        form.enable_when(iterations, move |s| !s.is_checked(manual_key))?;
        form.enable_when(salt, move |s| {
            s.is_checked(fixed_salt) && !s.is_checked(manual_key)
        })?;
        form.enable_when(key, move |s| s.is_checked(manual_key))?;
        form.enable_when(iv, move |s| s.is_checked(fixed_iv))?;
        form.show_when(iv, move |s| {
            s.choice_is(mode, "AES-GCM") || s.choice_is(mode, "AES-CBC")
        })?;
        form.show_when(fixed_iv, move |s| {
            s.choice_is(mode, "AES-GCM") || s.choice_is(mode, "AES-CBC")
        })?;
        form.enable_when(counter, move |s| s.is_checked(fixed_counter))?;
        form.show_when(counter, move |s| s.choice_is(mode, "AES-CTR"))?;
        form.show_when(fixed_counter, move |s| s.choice_is(mode, "AES-CTR"))?;
        form.enable_when(button, |s| !s.busy())?;

        Ok(Self {
            form: form_id,
            message,
            password,
            iterations,
            salt,
            fixed_salt,
            key_size,
            key,
            manual_key,
            iv,
            fixed_iv,
            counter,
            fixed_counter,
            mode,
            button,
            output,
            output_raw,
        })
    }

    /// Reads the current element values into an encryption request.
    /// Returns `Ok(None)` when a read failed; the element carries the
    /// alert.
    pub fn collect_request(&self, tabs: &mut TabList) -> Result<Option<EncryptRequest>> {
        let form = tabs.form_mut(self.form)?;

        let Some(iterations) = form.number(self.iterations)? else {
            return Ok(None);
        };
        let iterations = iterations as u32;
        if iterations > PBKDF2_ITERATIONS_WARN {
            notify_latency(form, self.iterations, iterations);
        }

        let manual = form.checked(self.manual_key)?;
        let manual_key = if manual {
            let Some(bytes) = form.bytes(self.key)? else {
                return Ok(None);
            };
            Some(bytes)
        } else {
            None
        };
        let password = if manual {
            String::new()
        } else {
            form.text(self.password)?.unwrap_or_default()
        };
        let fixed_salt = if !manual && form.checked(self.fixed_salt)? {
            let Some(bytes) = form.bytes(self.salt)? else {
                return Ok(None);
            };
            Some(bytes)
        } else {
            None
        };

        let Some(mode_value) = form.choice(self.mode)? else {
            return Ok(None);
        };
        let mode: AesMode = mode_value.parse()?;
        let Some(size_label) = form.choice(self.key_size)? else {
            return Ok(None);
        };
        let key_size = KeySize::from_label(&size_label)
            .ok_or_else(|| anyhow::anyhow!("unknown key size option '{}'", size_label))?;

        let fixed_iv = if mode.uses_iv() && form.checked(self.fixed_iv)? {
            let Some(bytes) = form.bytes(self.iv)? else {
                return Ok(None);
            };
            Some(bytes)
        } else {
            None
        };
        let fixed_counter = if mode.uses_counter() && form.checked(self.fixed_counter)? {
            let Some(bytes) = form.bytes(self.counter)? else {
                return Ok(None);
            };
            Some(bytes)
        } else {
            None
        };

        let message = form.text(self.message)?.unwrap_or_default();
        Ok(Some(EncryptRequest {
            message,
            password,
            iterations,
            mode,
            key_size,
            manual_key,
            fixed_salt,
            fixed_iv,
            fixed_counter,
        }))
    }

    /// Writes a successful outcome back: resolved parameters for audit,
    /// then the envelope and raw ciphertext outputs.
    pub fn apply_outcome(&self, tabs: &mut TabList, outcome: &EncryptOutcome) -> Result<()> {
        let form = tabs.form_mut(self.form)?;
        form.set_bytes(self.salt, outcome.salt.clone())?;
        if let Some(iv) = &outcome.iv {
            form.set_bytes(self.iv, iv.clone())?;
        }
        if let Some(counter) = &outcome.counter {
            form.set_bytes(self.counter, counter.clone())?;
        }
        if let Some(key) = &outcome.derived_key {
            form.set_bytes(self.key, key.clone())?;
        }
        form.set_json(self.output, &outcome.envelope)?;
        form.set_bytes(self.output_raw, outcome.raw_ciphertext.clone())?;
        Ok(())
    }

    pub fn apply_error(&self, tabs: &mut TabList, error: &EncryptError) -> Result<()> {
        let form = tabs.form_mut(self.form)?;
        if form.is_hidden() {
            tracing::warn!("encryption failed on a hidden form: {}", error);
            return Ok(());
        }
        match error {
            EncryptError::ImportKey(e) => form.handle_error(self.message, e, "")?,
            EncryptError::Crypto(e) => {
                form.handle_error(self.message, e, "Error during encryption.")?
            }
        }
        Ok(())
    }
}

/// Elements of the decryption tab.
pub struct DecryptScreen {
    pub form: FormId,
    pub message: ElementId,
    pub password: ElementId,
    pub key: ElementId,
    pub manual_key: ElementId,
    pub button: ElementId,
    pub output: ElementId,
}

impl DecryptScreen {
    pub fn build(tabs: &mut TabList) -> Result<Self> {
        let form_id = tabs.create_form("Decryption");
        let form = tabs.form_mut(form_id)?;

        let message = form.create_text_area(
            ElementParams::new("Encrypted message")
                .with_placeholder("Paste the encrypted output")
                .with_data_type(DataType::JsonBase64),
        )?;
        let password = form.create_password_box(
            ElementParams::new("Password").with_placeholder("Enter your password"),
        )?;
        let key = form.create_text_box(
            ElementParams::new("Key")
                .with_data_type(DataType::Base64)
                .with_advanced(),
        )?;
        let manual_key = form.create_check_box(
            ElementParams::new("Use fixed key instead of password").with_advanced(),
        )?;
        let button = form.create_button(ElementParams::new("Decrypt"))?;
        let output = form.create_output(ElementParams::new("Output"))?;

        form.enable_when(password, move |s| !s.is_checked(manual_key))?;
        form.enable_when(key, move |s| s.is_checked(manual_key))?;
        form.enable_when(button, |s| !s.busy())?;

        Ok(Self {
            form: form_id,
            message,
            password,
            key,
            manual_key,
            button,
            output,
        })
    }

    /// Reads and validates the envelope plus key inputs. Payload
    /// violations surface as a single alert on the encrypted-message
    /// element and abort before any crypto.
    pub fn collect_request(&self, tabs: &mut TabList) -> Result<Option<DecryptRequest>> {
        let form = tabs.form_mut(self.form)?;

        let Some(json) = form.json(self.message)? else {
            return Ok(None);
        };
        let payload = match DecryptPayload::from_json(json) {
            Ok(payload) => payload,
            Err(err) => {
                form.handle_error(self.message, &err, "Invalid encrypted payload.")?;
                return Ok(None);
            }
        };
        if payload.iterations > PBKDF2_ITERATIONS_WARN {
            notify_latency(form, self.message, payload.iterations);
        }

        let manual = form.checked(self.manual_key)?;
        let manual_key = if manual {
            let Some(bytes) = form.bytes(self.key)? else {
                return Ok(None);
            };
            Some(bytes)
        } else {
            None
        };
        let password = if manual {
            String::new()
        } else {
            form.text(self.password)?.unwrap_or_default()
        };

        Ok(Some(DecryptRequest {
            payload,
            password,
            manual_key,
        }))
    }

    pub fn apply_outcome(&self, tabs: &mut TabList, outcome: &DecryptOutcome) -> Result<()> {
        let form = tabs.form_mut(self.form)?;
        if let Some(key) = &outcome.derived_key {
            form.set_bytes(self.key, key.clone())?;
        }
        form.set_text(self.output, outcome.plaintext.clone())?;
        Ok(())
    }

    pub fn apply_error(&self, tabs: &mut TabList, error: &DecryptError) -> Result<()> {
        let form = tabs.form_mut(self.form)?;
        if form.is_hidden() {
            tracing::warn!("decryption failed on a hidden form: {}", error);
            return Ok(());
        }
        if error.is_opaque() {
            form.handle_error(
                self.message,
                &"Could not decrypt; is your password/key correct?",
                "",
            )?;
            return Ok(());
        }
        match error {
            DecryptError::ImportKey(e) => form.handle_error(self.message, e, "")?,
            DecryptError::Crypto(e) => {
                form.handle_error(self.message, e, "Error during decryption.")?
            }
        }
        Ok(())
    }
}

pub struct Screens {
    pub encrypt: EncryptScreen,
    pub decrypt: DecryptScreen,
}

/// Builds both tab screens in display order.
pub fn build(tabs: &mut TabList) -> Result<Screens> {
    let encrypt = EncryptScreen::build(tabs)?;
    let decrypt = DecryptScreen::build(tabs)?;
    Ok(Screens { encrypt, decrypt })
}

/// High iteration counts are worth a heads-up, but never on a hidden
/// element; those land in the log instead.
fn notify_latency(form: &mut Form, id: ElementId, iterations: u32) {
    let message = format!(
        "PBKDF2 is using {} iterations: this might take a long time...",
        iterations
    );
    if let Err(err) = form.alert(id, AlertKind::Info, message) {
        tracing::warn!(iterations, "latency notice suppressed: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn built() -> (TabList, Screens) {
        let mut tabs = TabList::new();
        let screens = build(&mut tabs).unwrap();
        (tabs, screens)
    }

    #[test]
    fn test_default_wiring() {
        let (tabs, screens) = built();
        let enc = &screens.encrypt;
        let form = tabs.form(enc.form).unwrap();

        // Password path is the default: password enabled, key box not.
        assert!(form.element(enc.password).unwrap().is_enabled());
        assert!(!form.element(enc.key).unwrap().is_enabled());
        assert!(!form.element(enc.salt).unwrap().is_enabled());

        // Advanced elements are hidden until the toggle is set.
        assert!(form.element(enc.iterations).unwrap().is_hidden());
        assert!(!form.element(enc.message).unwrap().is_hidden());

        // Decryption tab starts hidden behind the active encryption tab.
        assert!(tabs.form(screens.decrypt.form).unwrap().is_hidden());
    }

    #[test]
    fn test_manual_key_disables_password_and_iterations() {
        let (mut tabs, screens) = built();
        let enc = &screens.encrypt;
        let form = tabs.form_mut(enc.form).unwrap();
        form.set_advanced(true);
        form.toggle_check_box(enc.manual_key).unwrap();

        assert!(!form.element(enc.password).unwrap().is_enabled());
        assert!(!form.element(enc.iterations).unwrap().is_enabled());
        assert!(form.element(enc.key).unwrap().is_enabled());

        // Fixed salt cannot be combined with a manual key.
        form.toggle_check_box(enc.fixed_salt).unwrap();
        assert!(!form.element(enc.salt).unwrap().is_enabled());
    }

    #[test]
    fn test_mode_choice_swaps_iv_and_counter_visibility() {
        let (mut tabs, screens) = built();
        let enc = &screens.encrypt;
        let form = tabs.form_mut(enc.form).unwrap();
        form.set_advanced(true);

        // Default mode is GCM.
        assert!(!form.element(enc.iv).unwrap().is_hidden());
        assert!(form.element(enc.counter).unwrap().is_hidden());

        form.set_value(enc.mode, crate::element::Value::Text("AES-CTR".into()))
            .unwrap();
        form.update_all();
        assert!(form.element(enc.iv).unwrap().is_hidden());
        assert!(!form.element(enc.counter).unwrap().is_hidden());
    }

    #[test]
    fn test_collect_defaults_to_gcm_128_with_default_iterations() {
        let (mut tabs, screens) = built();
        let enc = &screens.encrypt;
        tabs.form_mut(enc.form)
            .unwrap()
            .set_text(enc.message, "hi")
            .unwrap();
        let request = screens.encrypt.collect_request(&mut tabs).unwrap().unwrap();
        assert_eq!(request.mode, AesMode::Gcm);
        assert_eq!(request.key_size, KeySize::Bits128);
        assert_eq!(request.iterations, DEFAULT_PBKDF2_ITERATIONS);
        assert_eq!(request.manual_key, None);
        assert_eq!(request.fixed_salt, None);
        assert_eq!(request.message, "hi");
    }

    #[test]
    fn test_collect_aborts_on_unreadable_iterations() {
        let (mut tabs, screens) = built();
        let enc = &screens.encrypt;
        let form = tabs.form_mut(enc.form).unwrap();
        form.set_advanced(true);
        form.set_value(enc.iterations, crate::element::Value::Number(0.0))
            .unwrap();

        let request = screens.encrypt.collect_request(&mut tabs).unwrap();
        assert!(request.is_none());
        let form = tabs.form(enc.form).unwrap();
        assert_eq!(form.element(enc.iterations).unwrap().alerts().len(), 1);
    }

    #[test]
    fn test_malformed_payload_is_one_alert_with_context() {
        let (mut tabs, screens) = built();
        tabs.activate_next().unwrap();
        let dec = &screens.decrypt;
        let envelope = serde_json::json!({"ciphertext": "AA=="});
        let encoded = crate::codec::json_to_base64(&envelope).unwrap();
        tabs.form_mut(dec.form)
            .unwrap()
            .set_raw_text(dec.message, encoded)
            .unwrap();

        let request = screens.decrypt.collect_request(&mut tabs).unwrap();
        assert!(request.is_none());
        let alerts = tabs
            .form(dec.form)
            .unwrap()
            .element(dec.message)
            .unwrap()
            .alerts()
            .to_vec();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].message.ends_with("(Invalid encrypted payload.)"));
    }
}
