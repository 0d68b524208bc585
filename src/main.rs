use anyhow::{anyhow, bail, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use evm_wallet_manager::{
    is_valid_address, shorten_address, to_checksum_address, AppState, Args, Command, Config,
    FileStore, JsonRpcClient, KeyValueStore, ScryptParams, Severity, WalletStorage,
    DEFAULT_VISIBLE_CHARS,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    // Set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if !args.rpc_urls.is_empty() {
        config.rpc_endpoints = args.rpc_urls;
    }
    if args.light_kdf {
        config.scrypt = ScryptParams::light();
    }

    let storage = WalletStorage::new(FileStore::new_with_base_dir(config.data_dir.clone()));
    let mut app = AppState::new(storage, config.scrypt);
    app.load_wallets();

    let result = run(&mut app, &config, args.command).await;
    print_notifications(&mut app);
    result
}

async fn run<S: KeyValueStore>(app: &mut AppState<S>, config: &Config, command: Command) -> Result<()> {
    match command {
        Command::Generate { password } => {
            let (password, confirm) = match password {
                Some(p) => (p.clone(), p),
                None => (
                    prompt("Enter a secure password:")?,
                    prompt("Confirm your password:")?,
                ),
            };

            let start_time = Instant::now();
            let pb = spinner("Encrypting keystore...")?;
            let result = app.generate_wallet(&password, &confirm).await;
            pb.finish_and_clear();
            let record = result?;

            println!("\n✅ Wallet generated");
            println!("────────────────────");
            println!("📫 Address: {}", record.address);
            println!("⏱️  Time: {:.2}s", start_time.elapsed().as_secs_f64());
            println!("📁 Store: {}", config.data_dir.display());
            println!("\nYour wallet is encrypted and stored locally. Never share your private key or password.");
        }

        Command::List => {
            let wallets = &app.wallet.wallets;
            if wallets.is_empty() {
                println!("No wallets yet. Run `evm-wallet generate` to create one.");
                return Ok(());
            }

            println!("{} wallet{}", wallets.len(), if wallets.len() != 1 { "s" } else { "" });
            for wallet in wallets {
                println!(
                    "  {}  {:>14}  {}",
                    shorten_address(&wallet.address, DEFAULT_VISIBLE_CHARS),
                    wallet.balance.as_deref().unwrap_or("-"),
                    wallet
                        .last_updated
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                        .unwrap_or_default(),
                );
            }
        }

        Command::Show { address, reveal, password } => {
            app.select_wallet(&address)?;
            let record = app
                .current_wallet()
                .cloned()
                .ok_or_else(|| anyhow!("Wallet not found: {}", address))?;

            println!("📫 Address: {}", record.address);
            println!("💰 Balance: {}", record.balance.as_deref().unwrap_or("unknown"));
            if let Some(updated) = record.last_updated {
                println!("🕒 Updated: {}", updated.to_rfc3339());
            }

            if reveal {
                let password = match password {
                    Some(p) => p,
                    None => prompt("Enter wallet password:")?,
                };

                let pb = spinner("Decrypting keystore...")?;
                let result = app.decrypt_current(&password).await;
                pb.finish_and_clear();
                result?;

                app.toggle_private_key();
                if let Some(key) = app.visible_private_key() {
                    println!("🔑 Private key: {}", key);
                    println!("⚠️  Never share your private key. Anyone with it controls the funds.");
                }
                app.hide_private_key();
            }
        }

        Command::Balance { address } => {
            app.select_wallet(&address)?;
            let client = JsonRpcClient::new(config.chain_id, config.rpc_timeout)?;

            let pb = spinner(&format!(
                "Querying balance ({} endpoints)...",
                config.rpc_endpoints.len()
            ))?;
            let result = app.refresh_balance(&client, &config.rpc_endpoints).await;
            pb.finish_and_clear();
            result?;

            if let Some(record) = app.current_wallet() {
                println!(
                    "💰 {}: {} ETH",
                    shorten_address(&record.address, DEFAULT_VISIBLE_CHARS),
                    record.balance.as_deref().unwrap_or("0.000000")
                );
            }
        }

        Command::Delete { address, yes } => {
            if !yes && !confirm("Are you sure you want to delete this wallet? This action cannot be undone.")? {
                println!("Aborted.");
                return Ok(());
            }
            app.delete_wallet(&address)?;
        }

        Command::Export { output } => {
            let data = app.export_wallets()?;
            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(&path, data)?;
                    println!("📁 Exported {} wallets to {}", app.wallet.wallets.len(), path.display());
                }
                None => println!("{}", data),
            }
        }

        Command::Import { file } => {
            let data = fs::read_to_string(&file)?;
            if !app.import_wallets(&data)? {
                bail!("{} is not a valid wallet export", file.display());
            }
        }

        Command::Clear { yes } => {
            if !yes && !confirm("Delete ALL stored wallets? This action cannot be undone.")? {
                println!("Aborted.");
                return Ok(());
            }
            app.clear_all()?;
        }

        Command::Validate { address } => {
            if !is_valid_address(&address) {
                bail!("{} is not a valid address", address);
            }
            let mut bytes = [0u8; 20];
            hex::decode_to_slice(&address[2..], &mut bytes)?;
            println!("✅ Valid address");
            println!("📫 Checksummed: {}", to_checksum_address(&bytes));
        }
    }

    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    println!("{}", message);
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

fn confirm(message: &str) -> Result<bool> {
    print!("{} [y/N] ", message);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn print_notifications<S: KeyValueStore>(app: &mut AppState<S>) {
    for n in app.ui.notifications.drain(..) {
        let icon = match n.severity {
            Severity::Success => "✅",
            Severity::Error => "❌",
            Severity::Info => "ℹ️ ",
            Severity::Warning => "⚠️ ",
        };
        eprintln!("{} {}", icon, n.message);
    }
}
