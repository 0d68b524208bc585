use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Password-encrypted EVM wallet manager", long_about = None)]
pub struct Args {
    /// Directory holding the wallet store (overrides WALLET_DATA_DIR)
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// JSON-RPC endpoint, tried in the order given (overrides WALLET_RPC_URLS)
    #[arg(long = "rpc-url", global = true)]
    pub rpc_urls: Vec<String>,

    /// Use cheap scrypt parameters for new keystores
    #[arg(long, global = true, default_value_t = false)]
    pub light_kdf: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a new wallet and store it encrypted
    Generate {
        /// Encryption password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// List stored wallets
    List,

    /// Show one wallet, optionally decrypting its private key
    Show {
        address: String,

        /// Decrypt and print the private key
        #[arg(short, long, default_value_t = false)]
        reveal: bool,

        /// Keystore password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Fetch and store the current balance of a wallet
    Balance { address: String },

    /// Delete a stored wallet
    Delete {
        address: String,

        /// Skip the confirmation prompt
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },

    /// Export all wallets as JSON
    Export {
        /// Output file path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace stored wallets with a previous export
    Import { file: PathBuf },

    /// Remove all stored wallets
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },

    /// Check an address for correct format and EIP-55 checksum
    Validate { address: String },
}
