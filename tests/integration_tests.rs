//! Integration tests for msglock

use msglock::{
    models::{AesMode, DecryptPayload, KeySize},
    pipeline::{run_decrypt, run_encrypt, DecryptRequest, EncryptRequest},
    provider::CryptoProvider,
    screens,
    tabs::TabList,
    Value,
};

fn encrypt_request(mode: AesMode, key_size: KeySize) -> EncryptRequest {
    EncryptRequest {
        message: "attack at dawn".to_string(),
        password: "correct horse battery staple".to_string(),
        iterations: 1000,
        mode,
        key_size,
        manual_key: None,
        fixed_salt: None,
        fixed_iv: None,
        fixed_counter: None,
    }
}

#[tokio::test]
async fn test_every_mode_and_key_size_round_trips() {
    let provider = CryptoProvider::new();
    for mode in AesMode::ALL {
        for key_size in KeySize::ALL {
            let request = encrypt_request(mode, key_size);
            let outcome = run_encrypt(&provider, request.clone()).await.unwrap();
            let payload = DecryptPayload::from_envelope(&outcome.envelope).unwrap();
            let decrypted = run_decrypt(
                &provider,
                DecryptRequest {
                    payload,
                    password: request.password.clone(),
                    manual_key: None,
                },
            )
            .await
            .unwrap();
            assert_eq!(
                decrypted.plaintext, request.message,
                "round trip failed for {} at {} bits",
                mode, key_size
            );
        }
    }
}

#[tokio::test]
async fn test_wrong_password_is_rejected_opaquely_under_gcm() {
    let provider = CryptoProvider::new();
    let outcome = run_encrypt(&provider, encrypt_request(AesMode::Gcm, KeySize::Bits256))
        .await
        .unwrap();
    let payload = DecryptPayload::from_envelope(&outcome.envelope).unwrap();
    let error = run_decrypt(
        &provider,
        DecryptRequest {
            payload,
            password: "not the password".to_string(),
            manual_key: None,
        },
    )
    .await
    .unwrap_err();
    assert!(error.is_opaque());
}

#[tokio::test]
async fn test_wrong_password_under_ctr_yields_garbage_not_an_error() {
    // CTR carries no authentication, so a bad key cannot be detected;
    // the operation succeeds and produces noise.
    let provider = CryptoProvider::new();
    let request = encrypt_request(AesMode::Ctr, KeySize::Bits128);
    let outcome = run_encrypt(&provider, request.clone()).await.unwrap();
    let payload = DecryptPayload::from_envelope(&outcome.envelope).unwrap();
    let decrypted = run_decrypt(
        &provider,
        DecryptRequest {
            payload,
            password: "not the password".to_string(),
            manual_key: None,
        },
    )
    .await
    .unwrap();
    assert_ne!(decrypted.plaintext, request.message);
}

#[tokio::test]
async fn test_tampered_gcm_ciphertext_is_rejected() {
    let provider = CryptoProvider::new();
    let outcome = run_encrypt(&provider, encrypt_request(AesMode::Gcm, KeySize::Bits128))
        .await
        .unwrap();
    let mut payload = DecryptPayload::from_envelope(&outcome.envelope).unwrap();
    let last = payload.ciphertext.len() - 1;
    payload.ciphertext[last] ^= 0x01;
    let error = run_decrypt(
        &provider,
        DecryptRequest {
            payload,
            password: encrypt_request(AesMode::Gcm, KeySize::Bits128).password,
            manual_key: None,
        },
    )
    .await
    .unwrap_err();
    assert!(error.is_opaque());
}

#[tokio::test]
async fn test_truncated_cbc_ciphertext_is_rejected() {
    let provider = CryptoProvider::new();
    let request = encrypt_request(AesMode::Cbc, KeySize::Bits256);
    let outcome = run_encrypt(&provider, request.clone()).await.unwrap();
    let mut payload = DecryptPayload::from_envelope(&outcome.envelope).unwrap();
    payload.ciphertext.pop();
    let error = run_decrypt(
        &provider,
        DecryptRequest {
            payload,
            password: request.password,
            manual_key: None,
        },
    )
    .await
    .unwrap_err();
    assert!(error.is_opaque());
}

#[tokio::test]
async fn test_manual_key_round_trip_skips_derivation() {
    let provider = CryptoProvider::new();
    let key = vec![7u8; 32];
    let mut request = encrypt_request(AesMode::Gcm, KeySize::Bits128);
    request.manual_key = Some(key.clone());
    let outcome = run_encrypt(&provider, request.clone()).await.unwrap();

    // The envelope reports the imported key's true size, and no derived
    // key is surfaced.
    assert_eq!(outcome.envelope.enc_key_size, 256);
    assert_eq!(outcome.derived_key, None);

    let payload = DecryptPayload::from_envelope(&outcome.envelope).unwrap();
    let decrypted = run_decrypt(
        &provider,
        DecryptRequest {
            payload,
            password: String::new(),
            manual_key: Some(key),
        },
    )
    .await
    .unwrap();
    assert_eq!(decrypted.plaintext, request.message);
}

#[tokio::test]
async fn test_fixed_parameters_reproduce_the_ciphertext() {
    let provider = CryptoProvider::new();
    let mut request = encrypt_request(AesMode::Cbc, KeySize::Bits256);
    request.fixed_salt = Some(vec![1u8; 16]);
    request.fixed_iv = Some(vec![2u8; 16]);
    let first = run_encrypt(&provider, request.clone()).await.unwrap();
    let second = run_encrypt(&provider, request).await.unwrap();
    assert_eq!(first.envelope, second.envelope);
}

#[tokio::test]
async fn test_encrypt_then_decrypt_through_the_forms() {
    let mut tabs = TabList::new();
    let screens = screens::build(&mut tabs).unwrap();
    let enc = &screens.encrypt;

    let form = tabs.form_mut(enc.form).unwrap();
    form.set_text(enc.message, "the cake is a lie").unwrap();
    form.set_text(enc.password, "GLaDOS").unwrap();
    form.set_advanced(true);
    form.set_value(enc.iterations, Value::Number(1000.0)).unwrap();
    form.set_advanced(false);

    let request = enc.collect_request(&mut tabs).unwrap().unwrap();
    let provider = CryptoProvider::new();
    let outcome = run_encrypt(&provider, request).await.unwrap();
    enc.apply_outcome(&mut tabs, &outcome).unwrap();

    // The primary output now holds the base64 envelope; hand it to the
    // decryption tab the way a user would paste it.
    let envelope_text = tabs
        .form(enc.form)
        .unwrap()
        .element(enc.output)
        .unwrap()
        .raw_text()
        .to_string();
    assert!(!envelope_text.is_empty());

    tabs.activate_next().unwrap();
    let dec = &screens.decrypt;
    let form = tabs.form_mut(dec.form).unwrap();
    form.set_raw_text(dec.message, envelope_text).unwrap();
    form.set_text(dec.password, "GLaDOS").unwrap();

    let request = dec.collect_request(&mut tabs).unwrap().unwrap();
    let outcome = run_decrypt(&provider, request).await.unwrap();
    dec.apply_outcome(&mut tabs, &outcome).unwrap();

    let dec_form = tabs.form(dec.form).unwrap();
    assert_eq!(
        dec_form.element(dec.output).unwrap().raw_text(),
        "the cake is a lie"
    );
    assert!(!dec_form.element(dec.key).unwrap().raw_text().is_empty());

    // The encryption tab got its resolved parameters written back.
    let enc_form = tabs.form(enc.form).unwrap();
    assert!(!enc_form.element(enc.salt).unwrap().raw_text().is_empty());
    assert!(!enc_form.element(enc.iv).unwrap().raw_text().is_empty());
    assert!(!enc_form.element(enc.key).unwrap().raw_text().is_empty());
}

#[tokio::test]
async fn test_failed_decryption_leaves_previous_output_untouched() {
    let mut tabs = TabList::new();
    let screens = screens::build(&mut tabs).unwrap();
    let provider = CryptoProvider::new();

    let outcome = run_encrypt(&provider, encrypt_request(AesMode::Gcm, KeySize::Bits128))
        .await
        .unwrap();
    let envelope_text = msglock::codec::json_to_base64(&outcome.envelope).unwrap();

    tabs.activate_next().unwrap();
    let dec = &screens.decrypt;
    let form = tabs.form_mut(dec.form).unwrap();
    form.set_raw_text(dec.message, envelope_text).unwrap();
    form.set_text(dec.password, "correct horse battery staple")
        .unwrap();

    let request = dec.collect_request(&mut tabs).unwrap().unwrap();
    let first = run_decrypt(&provider, request).await.unwrap();
    dec.apply_outcome(&mut tabs, &first).unwrap();
    assert_eq!(
        tabs.form(dec.form)
            .unwrap()
            .element(dec.output)
            .unwrap()
            .raw_text(),
        "attack at dawn"
    );

    // Second run with a wrong password: the error lands as the generic
    // alert and the previous plaintext stays on screen.
    let form = tabs.form_mut(dec.form).unwrap();
    form.set_text(dec.password, "wrong").unwrap();
    let request = dec.collect_request(&mut tabs).unwrap().unwrap();
    let error = run_decrypt(&provider, request).await.unwrap_err();
    dec.apply_error(&mut tabs, &error).unwrap();

    let form = tabs.form(dec.form).unwrap();
    assert_eq!(
        form.element(dec.output).unwrap().raw_text(),
        "attack at dawn"
    );
    let alerts = form.element(dec.message).unwrap().alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(
        alerts[0].message,
        "Could not decrypt; is your password/key correct?"
    );
}
