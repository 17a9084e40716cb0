//! walletbox CLI - passphrase-sealed wallet files
//!
//! Command-line front end for creating, inspecting, and editing wallet files
//! sealed with PBKDF2-HMAC-SHA256 and AES-256-CBC.

use clap::{Parser, Subcommand};
use std::error::Error as StdError;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use walletbox::WalletboxError;
use walletbox::passphrase::{PassphraseReader, ReaderPassphraseReader, TerminalPassphraseReader};
use walletbox::store;

#[derive(Parser)]
#[command(name = "walletbox")]
#[command(version)]
#[command(about = "Passphrase-sealed wallet key storage.", long_about = None)]
struct Cli {
    /// Read passphrase from stdin instead of from terminal
    #[arg(long, global = true)]
    passphrase_stdin: bool,

    /// Log progress to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new wallet file holding no records
    Init {
        /// Path of the wallet file to create; must not exist yet
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Seal a JSON list of records into a new wallet file
    #[command(alias = "s")]
    Seal {
        /// Path to the JSON file with name/public_key/private_key records
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the wallet file to write
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Decrypt a wallet file into a JSON list of records
    #[command(alias = "u")]
    Unseal {
        /// Path to the wallet file to decrypt
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the JSON file to write; it will hold private keys in clear text
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Replace the records of a wallet file, while validating that the
    /// passphrase is not accidentally changed.
    Update {
        /// Path to the JSON file with the new records
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the existing wallet file to replace
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Append the records from a JSON file to a wallet file
    #[command(alias = "a")]
    Append {
        /// Path to the JSON file with the records to add
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the existing wallet file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Remove one record from a wallet file
    #[command(alias = "rm")]
    Remove {
        /// Path to the existing wallet file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Zero-based position of the record, as shown by `list`
        #[arg(long)]
        index: usize,
    },

    /// Print the records held in a wallet file
    #[command(alias = "ls")]
    List {
        /// Path to the wallet file
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Print private keys instead of a redaction marker
        #[arg(long)]
        show_secrets: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init { output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin, true);
            store::create_empty(&output, &mut *reader)
        }
        Commands::Seal { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin, true);
            store::seal_file(&input, &output, &mut *reader)
        }
        Commands::Unseal { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin, false);
            store::unseal_file(&input, &output, &mut *reader)
        }
        Commands::Update { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin, false);
            store::update_file(&input, &output, &mut *reader)
        }
        Commands::Append { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin, false);
            store::append_records(&input, &output, &mut *reader).map(|count| {
                println!("{} records", count);
            })
        }
        Commands::Remove { output, index } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin, false);
            store::remove_record(&output, index, &mut *reader).map(|removed| {
                println!("removed {} ({})", removed.name(), removed.public_key());
            })
        }
        Commands::List {
            input,
            show_secrets,
        } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin, false);
            store::load(&input, &mut *reader).map(|records| {
                for (index, record) in records.iter().enumerate() {
                    let private_key = if show_secrets {
                        record.private_key()
                    } else {
                        "********"
                    };
                    println!(
                        "{}\t{}\t{}\t{}",
                        index,
                        record.name(),
                        record.public_key(),
                        private_key
                    );
                }
            })
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", render_chain(&e));
        process::exit(1);
    }
}

/// Joins the error with every error it wraps, outermost first.
fn render_chain(err: &WalletboxError) -> String {
    let mut rendered = err.to_string();
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(inner) = source {
        rendered.push_str(": ");
        rendered.push_str(&inner.to_string());
        source = inner.source();
    }
    rendered
}

fn init_logging(verbose: bool) {
    // Accepted `RUST_LOG` values are `trace`, `debug`, `info`, `warn`,
    // and `error`, or any tracing directive.
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Unable to set global default subscriber");
    }
}

fn get_passphrase_reader(use_stdin: bool, new_passphrase: bool) -> Box<dyn PassphraseReader> {
    if use_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(std::io::stdin())))
    } else if new_passphrase {
        Box::new(TerminalPassphraseReader::with_confirmation())
    } else {
        Box::new(TerminalPassphraseReader::new())
    }
}
