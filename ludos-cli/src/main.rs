#![deny(missing_docs)]
//! A command-line interface for the Ludos privacy toolkit.

use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use ludos_core::authenticator::Authenticator;
use ludos_core::otp::Totp;
use ludos_core::rotation::{self, RotationWorker};
use ludos_core::secret_store::KeyringStore;
use ludos_core::{Config, PasswordPolicy, password};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(
    after_help = "EXAMPLES:\n  \n# Generate a 32 character password without symbols\nludos password --length 32 --no-symbols\n\n# Rotate a password into the log every 2 hours until Ctrl-C\nludos rotate start --hours 2\n\n# Show when the last 5 rotations happened\nludos rotate history --last 5\n\n# Store a TOTP secret (prompts for the secret)\nludos totp add github\n\n# Print the current code\nludos totp code github"
)]
struct Cli {
    /// Directory holding the TOTP index and rotation log. Defaults to the home directory.
    #[arg(long, global = true, env = "LUDOS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a strong random password
    Password {
        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// Periodically generate passwords into the rotation log
    Rotate {
        #[command(subcommand)]
        command: RotateCommands,
    },
    /// Manage TOTP secrets kept in the OS secret store
    Totp {
        #[command(subcommand)]
        command: TotpCommands,
    },
}

#[derive(Args)]
struct PolicyArgs {
    /// Number of characters in the password
    #[arg(short, long, default_value_t = 24)]
    length: usize,
    /// Leave out upper-case letters (A-Z)
    #[arg(long)]
    no_upper: bool,
    /// Leave out lower-case letters (a-z)
    #[arg(long)]
    no_lower: bool,
    /// Leave out digits (0-9)
    #[arg(long)]
    no_digits: bool,
    /// Leave out symbols
    #[arg(long)]
    no_symbols: bool,
}

impl PolicyArgs {
    const fn policy(&self) -> PasswordPolicy {
        PasswordPolicy {
            length: self.length,
            include_upper: !self.no_upper,
            include_lower: !self.no_lower,
            include_digits: !self.no_digits,
            include_symbols: !self.no_symbols,
        }
    }
}

#[derive(Subcommand)]
enum RotateCommands {
    /// Generate and log a password every interval until interrupted
    Start {
        /// Hours between rotations (never less than 0.1)
        #[arg(long, default_value_t = 2.0)]
        hours: f64,
        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// List logged rotations, oldest first
    History {
        /// Only show the most recent N entries
        #[arg(long, value_name = "N")]
        last: Option<usize>,
        /// Print the logged passwords as well as their timestamps
        #[arg(long)]
        show_passwords: bool,
    },
}

#[derive(Subcommand)]
enum TotpCommands {
    /// Store or replace the Base32 secret for a label
    Add {
        /// Name to file the secret under
        label: String,
        /// The Base32 secret. Prompted for without echo if omitted.
        #[arg(long)]
        secret: Option<String>,
    },
    /// Print the current code for a label
    Code {
        /// Label of the stored secret
        label: String,
    },
    /// List stored labels
    List,
    /// Delete a label and its secret
    Remove {
        /// Label of the stored secret
        label: String,
    },
}

fn exit_with(message: &str) -> ! {
    error!("{message}");
    std::process::exit(1);
}

fn main() {
    // Rotation failures are reported as warnings, so show them by default.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = cli.data_dir.map_or_else(
        || Config::from_home().unwrap_or_else(|e| exit_with(&e.to_string())),
        Config::in_dir,
    );

    match cli.command {
        Commands::Password { policy } => match password::generate(&policy.policy()) {
            Ok(password) => println!("{}", password.as_str()),
            Err(e) => exit_with(&e.to_string()),
        },
        Commands::Rotate { command } => match command {
            RotateCommands::Start { hours, policy } => run_rotation(&config, hours, policy.policy()),
            RotateCommands::History {
                last,
                show_passwords,
            } => {
                let entries = rotation::read_entries(&config.rotation_log_path)
                    .unwrap_or_else(|e| exit_with(&e.to_string()));
                if entries.is_empty() {
                    println!(
                        "No rotations logged in '{}'",
                        config.rotation_log_path.display()
                    );
                    return;
                }
                let skip = last.map_or(0, |n| entries.len().saturating_sub(n));
                for entry in entries.iter().skip(skip) {
                    if show_passwords {
                        print!("{}", entry.to_line());
                    } else {
                        println!("{}", entry.timestamp_string());
                    }
                }
            }
        },
        Commands::Totp { command } => {
            let auth = Authenticator::new(&config, KeyringStore, Totp::default());
            match command {
                TotpCommands::Add { label, secret } => {
                    let secret = secret.unwrap_or_else(|| {
                        rpassword::prompt_password("Base32 secret: ")
                            .unwrap_or_else(|e| exit_with(&format!("Failed to read secret: {e}")))
                    });
                    match auth.add(&label, &secret) {
                        Ok(_) => println!("Stored secret for '{}'.", label.trim()),
                        Err(e) => exit_with(&e.to_string()),
                    }
                }
                TotpCommands::Code { label } => match auth.code(&label) {
                    Ok(code) => println!("{}: {code}", label.trim()),
                    Err(e) => exit_with(&e.to_string()),
                },
                TotpCommands::List => {
                    let entries = auth.list().unwrap_or_else(|e| exit_with(&e.to_string()));
                    if entries.is_empty() {
                        println!("No TOTP labels stored.");
                        return;
                    }
                    for (label, entry) in entries {
                        println!("{label}  added={}", entry.created);
                    }
                }
                TotpCommands::Remove { label } => match auth.remove(&label) {
                    Ok(true) => println!("Removed '{}'", label.trim()),
                    Ok(false) => println!("No label '{}' was stored", label.trim()),
                    Err(e) => exit_with(&e.to_string()),
                },
            }
        }
    }
}

fn run_rotation(config: &Config, hours: f64, policy: PasswordPolicy) {
    let worker = RotationWorker::new(config);
    let (stop_tx, stop_rx) = mpsc::channel();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    }) {
        exit_with(&format!("Failed to install Ctrl-C handler: {e}"));
    }

    if let Err(e) = worker.start(hours, policy) {
        exit_with(&e.to_string());
    }
    println!(
        "Rotating into '{}'. Press Ctrl-C to stop.",
        worker.log_path().display()
    );

    let mut reported_failures = 0;
    loop {
        match stop_rx.recv_timeout(Duration::from_secs(1)) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                let status = worker.status();
                if status.failures > reported_failures {
                    reported_failures = status.failures;
                    if let Some(last_error) = status.last_error {
                        warn!("Rotation will retry next interval: {last_error}");
                    }
                }
            }
        }
    }

    worker.shutdown();
    info!("Rotation stopped after {} cycle(s)", worker.status().cycles);
}
