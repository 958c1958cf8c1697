//! Form-level behavior tests: alert lifecycle, predicate cascades and
//! request collection seen through the public screen API.

use msglock::{codec, screens, tabs::TabList, Value};

fn built() -> (TabList, screens::Screens) {
    let mut tabs = TabList::new();
    let screens = screens::build(&mut tabs).unwrap();
    (tabs, screens)
}

fn paste_envelope(tabs: &mut TabList, screens: &screens::Screens, envelope: serde_json::Value) {
    let dec = &screens.decrypt;
    let encoded = codec::json_to_base64(&envelope).unwrap();
    tabs.form_mut(dec.form)
        .unwrap()
        .set_raw_text(dec.message, encoded)
        .unwrap();
}

#[test]
fn test_unknown_mode_in_payload_is_one_alert_with_context() {
    let (mut tabs, screens) = built();
    tabs.activate_next().unwrap();
    paste_envelope(
        &mut tabs,
        &screens,
        serde_json::json!({
            "ciphertext": "AA==",
            "salt": "AA==",
            "iv": "AA==",
            "encMode": "AES-XTS",
            "encKeySize": 128,
            "pbkdf2Iters": 1000,
        }),
    );

    let request = screens.decrypt.collect_request(&mut tabs).unwrap();
    assert!(request.is_none());

    let alerts = tabs
        .form(screens.decrypt.form)
        .unwrap()
        .element(screens.decrypt.message)
        .unwrap()
        .alerts()
        .to_vec();
    assert_eq!(alerts.len(), 1);
    assert_eq!(
        alerts[0].message,
        "Mode 'AES-XTS' is not implemented. (Invalid encrypted payload.)"
    );
}

#[test]
fn test_missing_iv_for_gcm_is_one_alert_before_any_crypto() {
    let (mut tabs, screens) = built();
    tabs.activate_next().unwrap();
    paste_envelope(
        &mut tabs,
        &screens,
        serde_json::json!({
            "ciphertext": "AA==",
            "salt": "AA==",
            "encMode": "AES-GCM",
            "encKeySize": 256,
            "pbkdf2Iters": 1000,
        }),
    );

    let request = screens.decrypt.collect_request(&mut tabs).unwrap();
    assert!(request.is_none());

    let alerts = tabs
        .form(screens.decrypt.form)
        .unwrap()
        .element(screens.decrypt.message)
        .unwrap()
        .alerts()
        .to_vec();
    assert_eq!(alerts.len(), 1);
    assert_eq!(
        alerts[0].message,
        "Missing 'iv' field for AES-GCM. (Invalid encrypted payload.)"
    );
}

#[test]
fn test_rerunning_validation_replaces_the_alert() {
    let (mut tabs, screens) = built();
    tabs.activate_next().unwrap();
    paste_envelope(
        &mut tabs,
        &screens,
        serde_json::json!({"ciphertext": "AA=="}),
    );

    assert!(screens.decrypt.collect_request(&mut tabs).unwrap().is_none());
    assert!(screens.decrypt.collect_request(&mut tabs).unwrap().is_none());

    let form = tabs.form(screens.decrypt.form).unwrap();
    assert_eq!(form.element(screens.decrypt.message).unwrap().alerts().len(), 1);
}

#[test]
fn test_switching_tabs_clears_pending_alerts() {
    let (mut tabs, screens) = built();
    tabs.activate_next().unwrap();
    paste_envelope(
        &mut tabs,
        &screens,
        serde_json::json!({"ciphertext": "AA=="}),
    );
    assert!(screens.decrypt.collect_request(&mut tabs).unwrap().is_none());

    tabs.set_active(screens.encrypt.form).unwrap();
    let form = tabs.form(screens.decrypt.form).unwrap();
    assert!(form
        .element(screens.decrypt.message)
        .unwrap()
        .alerts()
        .is_empty());
}

#[test]
fn test_manual_key_request_carries_key_and_empty_password() {
    let (mut tabs, screens) = built();
    let enc = &screens.encrypt;
    let form = tabs.form_mut(enc.form).unwrap();
    form.set_text(enc.password, "ignored").unwrap();
    form.set_advanced(true);
    form.toggle_check_box(enc.manual_key).unwrap();
    form.set_bytes(enc.key, vec![7u8; 32]).unwrap();
    form.set_text(enc.message, "payload").unwrap();

    let request = screens.encrypt.collect_request(&mut tabs).unwrap().unwrap();
    assert_eq!(request.manual_key, Some(vec![7u8; 32]));
    assert_eq!(request.password, "");
    assert_eq!(request.fixed_salt, None);
}

#[test]
fn test_latency_notice_lands_on_a_visible_iterations_box() {
    let (mut tabs, screens) = built();
    let enc = &screens.encrypt;
    let form = tabs.form_mut(enc.form).unwrap();
    form.set_advanced(true);
    form.set_value(enc.iterations, Value::Number(2_000_000.0))
        .unwrap();

    let request = screens.encrypt.collect_request(&mut tabs).unwrap();
    assert!(request.is_some());

    let alerts = tabs
        .form(enc.form)
        .unwrap()
        .element(enc.iterations)
        .unwrap()
        .alerts()
        .to_vec();
    assert_eq!(alerts.len(), 1);
    assert_eq!(
        alerts[0].message,
        "PBKDF2 is using 2000000 iterations: this might take a long time..."
    );
}

#[test]
fn test_latency_notice_is_suppressed_on_a_hidden_iterations_box() {
    let (mut tabs, screens) = built();
    let enc = &screens.encrypt;
    let form = tabs.form_mut(enc.form).unwrap();
    form.set_value(enc.iterations, Value::Number(2_000_000.0))
        .unwrap();

    let request = screens.encrypt.collect_request(&mut tabs).unwrap();
    assert!(request.is_some());
    assert!(tabs
        .form(enc.form)
        .unwrap()
        .element(enc.iterations)
        .unwrap()
        .alerts()
        .is_empty());
}

#[test]
fn test_counter_fields_are_ignored_while_a_block_mode_is_selected() {
    let (mut tabs, screens) = built();
    let enc = &screens.encrypt;
    let form = tabs.form_mut(enc.form).unwrap();
    form.set_advanced(true);
    // Check the fixed-counter box, then leave the mode on GCM where the
    // counter elements are hidden and irrelevant.
    form.set_value(enc.mode, Value::Text("AES-CTR".to_string()))
        .unwrap();
    form.update_all();
    form.toggle_check_box(enc.fixed_counter).unwrap();
    form.set_bytes(enc.counter, vec![3u8; 16]).unwrap();
    form.set_value(enc.mode, Value::Text("AES-GCM".to_string()))
        .unwrap();
    form.update_all();

    let request = screens.encrypt.collect_request(&mut tabs).unwrap().unwrap();
    assert_eq!(request.fixed_counter, None);
    assert_eq!(request.fixed_iv, None);
}
