use anyhow::{Context, Result};
use clap::Parser;
use gce_windows_password::compute::ComputeClient;
use gce_windows_password::config::ResetConfig;
use gce_windows_password::reset;
use log::info;
use std::env;
use std::time::Duration;

const TOKEN_ENV: &str = "GCE_ACCESS_TOKEN";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Project the instance is in
    #[arg(short, long)]
    project: String,
    /// Zone the instance is in
    #[arg(short, long)]
    zone: String,
    /// Instance to reset the password on
    #[arg(short, long)]
    instance: String,
    /// User to reset the password for
    #[arg(short, long)]
    user: String,
    /// Email recorded in the windows-keys entry
    #[arg(short, long, default_value = "")]
    email: String,
    /// Serial port the guest agent answers on
    #[arg(long, default_value = "4")]
    port: u8,
    /// Overall deadline in seconds for the serial poll
    #[arg(long, default_value = "120")]
    timeout: u64,
    /// OAuth2 access token; falls back to the GCE_ACCESS_TOKEN environment
    /// variable
    #[arg(long)]
    access_token: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let token = match args.access_token {
        Some(token) => token,
        None => env::var(TOKEN_ENV)
            .with_context(|| format!("pass --access-token or set {TOKEN_ENV}"))?,
    };

    let config = ResetConfig {
        project: args.project,
        zone: args.zone,
        instance: args.instance,
        username: args.user,
        email: args.email,
        port: args.port,
        timeout: Duration::from_secs(args.timeout),
    };

    info!(
        "resetting password on instance {:?} for user {:?}",
        config.instance, config.username
    );
    let client = ComputeClient::new(token);
    let creds = reset::reset_password(&client, &config)?;

    println!("Username: {}", creds.username);
    println!("Password: {}", creds.password);
    Ok(())
}
