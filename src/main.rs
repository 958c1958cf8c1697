use clap::{Parser, Subcommand};
use msglock::{
    codec,
    models::{AesMode, DecryptPayload, KeySize, DEFAULT_PBKDF2_ITERATIONS, PBKDF2_ITERATIONS_WARN},
    pipeline::{self, DecryptRequest, EncryptRequest},
    progress::ProgressTracker,
    provider::CryptoProvider,
    tui::App,
};

/// Password-based message encryption with an interactive TUI
#[derive(Parser)]
#[command(name = "msglock")]
#[command(about = "Encrypt and decrypt short messages with a password")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive TUI
    Tui,
    /// Encrypt a message and print the base64 envelope
    Encrypt {
        /// Message to encrypt (reads stdin if not provided)
        message: Option<String>,
        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
        /// AES mode
        #[arg(short, long, value_enum, default_value = "gcm")]
        mode: ModeArg,
        /// AES key size in bits
        #[arg(short = 's', long, value_enum, default_value = "128")]
        key_size: KeySizeArg,
        /// PBKDF2 iteration count
        #[arg(short, long, default_value_t = DEFAULT_PBKDF2_ITERATIONS)]
        iterations: u32,
        /// Base64 raw key, replacing password derivation
        #[arg(long)]
        key: Option<String>,
        /// Base64 fixed salt instead of a random one
        #[arg(long)]
        salt: Option<String>,
        /// Base64 fixed IV instead of a random one (GCM/CBC)
        #[arg(long)]
        iv: Option<String>,
        /// Base64 fixed counter block instead of a random one (CTR)
        #[arg(long)]
        counter: Option<String>,
        /// Print the derived key to stderr
        #[arg(long)]
        show_key: bool,
    },
    /// Decrypt a base64 envelope and print the message
    Decrypt {
        /// Base64 envelope to decrypt (reads stdin if not provided)
        payload: Option<String>,
        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
        /// Base64 raw key, replacing password derivation
        #[arg(long)]
        key: Option<String>,
        /// Print the derived key to stderr
        #[arg(long)]
        show_key: bool,
    },
}

/// AES modes accepted on the command line
#[derive(clap::ValueEnum, Clone, Debug)]
enum ModeArg {
    Gcm,
    Cbc,
    Ctr,
}

impl From<ModeArg> for AesMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Gcm => AesMode::Gcm,
            ModeArg::Cbc => AesMode::Cbc,
            ModeArg::Ctr => AesMode::Ctr,
        }
    }
}

/// AES key sizes accepted on the command line
#[derive(clap::ValueEnum, Clone, Debug)]
enum KeySizeArg {
    #[value(name = "128")]
    Bits128,
    #[value(name = "256")]
    Bits256,
}

impl From<KeySizeArg> for KeySize {
    fn from(size: KeySizeArg) -> Self {
        match size {
            KeySizeArg::Bits128 => KeySize::Bits128,
            KeySizeArg::Bits256 => KeySize::Bits256,
        }
    }
}

#[tokio::main]
async fn main() -> msglock::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Tui) | None => {
            // Default to TUI mode; no log subscriber so the alternate
            // screen stays clean.
            let mut app = App::new()?;
            app.run().await?;
        }
        Some(Commands::Encrypt {
            message,
            password,
            mode,
            key_size,
            iterations,
            key,
            salt,
            iv,
            counter,
            show_key,
        }) => {
            init_tracing();
            let message = read_input(message)?;
            let manual_key = decode_arg("key", key);
            let fixed_salt = decode_arg("salt", salt);
            let fixed_iv = decode_arg("iv", iv);
            let fixed_counter = decode_arg("counter", counter);
            let password = if manual_key.is_some() {
                String::new()
            } else {
                get_password(password)?
            };
            if iterations > PBKDF2_ITERATIONS_WARN {
                eprintln!(
                    "PBKDF2 is using {} iterations: this might take a long time...",
                    iterations
                );
            }

            let request = EncryptRequest {
                message,
                password,
                iterations,
                mode: mode.into(),
                key_size: key_size.into(),
                manual_key,
                fixed_salt,
                fixed_iv,
                fixed_counter,
            };

            let spinner = ProgressTracker::for_derivation("Encrypting", iterations);
            let provider = CryptoProvider::new();
            let result = pipeline::run_encrypt(&provider, request).await;
            spinner.finish_and_clear();

            match result {
                Ok(outcome) => {
                    println!("{}", codec::json_to_base64(&outcome.envelope)?);
                    if show_key {
                        if let Some(derived) = &outcome.derived_key {
                            eprintln!("Key: {}", codec::bytes_to_base64(derived));
                        }
                    }
                }
                Err(pipeline::EncryptError::ImportKey(e)) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Error: {} (Error during encryption.)", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Decrypt {
            payload,
            password,
            key,
            show_key,
        }) => {
            init_tracing();
            let encoded = read_input(payload)?;
            let json = match codec::base64_to_json(encoded.trim()) {
                Ok(json) => json,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            let payload = match DecryptPayload::from_json(json) {
                Ok(payload) => payload,
                Err(e) => {
                    eprintln!("Error: {} (Invalid encrypted payload.)", e);
                    std::process::exit(1);
                }
            };
            let manual_key = decode_arg("key", key);
            let password = if manual_key.is_some() {
                String::new()
            } else {
                get_password(password)?
            };
            if payload.iterations > PBKDF2_ITERATIONS_WARN {
                eprintln!(
                    "PBKDF2 is using {} iterations: this might take a long time...",
                    payload.iterations
                );
            }

            let iterations = payload.iterations;
            let request = DecryptRequest {
                payload,
                password,
                manual_key,
            };

            let spinner = ProgressTracker::for_derivation("Decrypting", iterations);
            let provider = CryptoProvider::new();
            let result = pipeline::run_decrypt(&provider, request).await;
            spinner.finish_and_clear();

            match result {
                Ok(outcome) => {
                    println!("{}", outcome.plaintext);
                    if show_key {
                        if let Some(derived) = &outcome.derived_key {
                            eprintln!("Key: {}", codec::bytes_to_base64(derived));
                        }
                    }
                }
                Err(e) if e.is_opaque() => {
                    eprintln!("Error: Could not decrypt; is your password/key correct?");
                    std::process::exit(1);
                }
                Err(pipeline::DecryptError::ImportKey(e)) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Error: {} (Error during decryption.)", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Log to stderr, filtered by RUST_LOG, for the non-interactive paths.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Get input from argument or stdin
fn read_input(arg: Option<String>) -> msglock::Result<String> {
    match arg {
        Some(text) => Ok(text),
        None => {
            use std::io::Read;
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

/// Decode a base64 command-line value, exiting with its field name on
/// bad input.
fn decode_arg(name: &str, arg: Option<String>) -> Option<Vec<u8>> {
    arg.map(|text| match codec::base64_to_bytes(text.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error: --{}: {}", name, e);
            std::process::exit(1);
        }
    })
}

/// Get password from argument or prompt user
fn get_password(password: Option<String>) -> msglock::Result<String> {
    match password {
        Some(pwd) => Ok(pwd),
        None => {
            use std::io::{self, Write};
            print!("Enter password: ");
            io::stdout().flush()?;
            let mut password = String::new();
            io::stdin().read_line(&mut password)?;
            Ok(password.trim().to_string())
        }
    }
}
