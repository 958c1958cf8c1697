//! Basic usage example for msglock

use msglock::{
    codec,
    models::{AesMode, DecryptPayload, KeySize},
    pipeline::{run_decrypt, run_encrypt, DecryptRequest, EncryptRequest},
    provider::CryptoProvider,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let provider = CryptoProvider::new();
    let password = "example_password_123";

    // Example 1: Encrypt a message with a password
    println!("=== Message Encryption Example ===");
    let request = EncryptRequest {
        message: "This is an example message.".to_string(),
        password: password.to_string(),
        iterations: 10_000, // low for a quick demo; the application default is 300,000
        mode: AesMode::Gcm,
        key_size: KeySize::Bits256,
        manual_key: None,
        fixed_salt: None,
        fixed_iv: None,
        fixed_counter: None,
    };

    let outcome = run_encrypt(&provider, request).await?;
    let envelope_text = codec::json_to_base64(&outcome.envelope)?;
    println!("✓ Encryption successful");
    println!("  Envelope: {}", envelope_text);
    if let Some(key) = &outcome.derived_key {
        println!("  Derived key: {}", codec::bytes_to_base64(key));
    }

    // Example 2: Decrypt the envelope back
    println!("\n=== Message Decryption Example ===");
    let json = codec::base64_to_json(&envelope_text)?;
    let payload = DecryptPayload::from_json(json)?;
    let decrypted = run_decrypt(
        &provider,
        DecryptRequest {
            payload,
            password: password.to_string(),
            manual_key: None,
        },
    )
    .await?;
    println!("✓ Decryption successful");
    println!("  Plaintext: {}", decrypted.plaintext);

    // Example 3: Use a raw key instead of a password
    println!("\n=== Manual Key Example ===");
    let key = provider.random_bytes(32);
    let request = EncryptRequest {
        message: "Keyed without a password.".to_string(),
        password: String::new(),
        iterations: 10_000,
        mode: AesMode::Ctr,
        key_size: KeySize::Bits256,
        manual_key: Some(key.clone()),
        fixed_salt: None,
        fixed_iv: None,
        fixed_counter: None,
    };

    let outcome = run_encrypt(&provider, request).await?;
    let payload = DecryptPayload::from_envelope(&outcome.envelope)?;
    let decrypted = run_decrypt(
        &provider,
        DecryptRequest {
            payload,
            password: String::new(),
            manual_key: Some(key.clone()),
        },
    )
    .await?;
    println!("✓ Round trip with a {}-byte raw key", key.len());
    println!("  Plaintext: {}", decrypted.plaintext);

    println!("\n=== Examples completed! ===");
    Ok(())
}
