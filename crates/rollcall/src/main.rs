//! `rollcall` - live event check-in from the command line.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Local;
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::mpsc;

use rollcall::api::{HttpLedger, LedgerApi, EXPORT_PATH};
use rollcall::channel::{ChannelSettings, LiveSyncChannel, WsTransport};
use rollcall::cli::{
    CheckInCommand, Cli, Command, ConfigCommand, EventCommand, IdentityArgs, RecordsCommand,
};
use rollcall::scanner::{self, LineScanner, ScannerSlot};
use rollcall::session::{Change, DashboardSession};
use rollcall::submit::{SubmitOutcome, Submitter};
use rollcall::{handshake, init_logging, issuer, stats, CheckInRecord, Config, MemberDirectory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    // Loaded per command; decoding and most config subcommands work without it.
    let config_file = cli.config;
    let load = || Config::load_from(config_file.clone());

    match cli.command {
        Command::Decode(cmd) => handle_decode(&cmd.payload),
        Command::Scan(cmd) => handle_scan(&load()?, &cmd.who).await,
        Command::CheckIn(cmd) => handle_checkin(&load()?, cmd).await,
        Command::Members => handle_members(&load()?).await,
        Command::Records(cmd) => handle_records(&load()?, &cmd).await,
        Command::Watch => handle_watch(&load()?).await,
        Command::Event(cmd) => handle_event(&load()?, cmd).await,
        Command::ExportUrl => {
            println!("{}", load()?.api_url(EXPORT_PATH)?);
            Ok(())
        }
        Command::Config(cmd) => handle_config(config_file, cmd),
    }
}

fn ledger(config: &Config) -> anyhow::Result<Arc<dyn LedgerApi>> {
    Ok(Arc::new(HttpLedger::new(config)?))
}

fn format_record(record: &CheckInRecord) -> String {
    format!(
        "{}  {:<6}  {}",
        record.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        record.category.label(),
        record.name
    )
}

fn handle_decode(payload: &str) -> anyhow::Result<()> {
    let context = handshake::decode(payload)?;
    println!("Event: {}", context.event_name);
    println!("Date:  {}", context.date);
    if !context.id.is_empty() {
        println!("Id:    {}", context.id);
    }
    Ok(())
}

async fn submit(
    config: &Config,
    who: &IdentityArgs,
    context: Option<&handshake::EventContext>,
) -> anyhow::Result<()> {
    let identity = who.identity();
    let submitter = Submitter::new(ledger(config)?);

    match submitter
        .submit(&identity, context)
        .await
        .context("check-in was not recorded")?
    {
        SubmitOutcome::Accepted => {
            println!(
                "Checked in {} as {}",
                identity.name.trim(),
                identity.category.label()
            );
        }
        SubmitOutcome::Skipped => println!("No name given, nothing was sent."),
    }
    Ok(())
}

async fn handle_scan(config: &Config, who: &IdentityArgs) -> anyhow::Result<()> {
    let slot = ScannerSlot::new();
    let mut source = LineScanner::new(BufReader::new(tokio::io::stdin()));

    eprintln!("Waiting for an event QR code on stdin...");
    let context = scanner::scan_event(&slot, &mut source, |e| {
        eprintln!("Not an event code ({e}), keep scanning.");
    })
    .await?;

    println!("Event: {} ({})", context.event_name, context.date);
    submit(config, who, Some(&context)).await
}

async fn handle_checkin(config: &Config, cmd: CheckInCommand) -> anyhow::Result<()> {
    let context = cmd
        .event
        .as_deref()
        .map(handshake::decode)
        .transpose()
        .context("invalid event payload")?;
    submit(config, &cmd.who, context.as_ref()).await
}

async fn handle_members(config: &Config) -> anyhow::Result<()> {
    let ledger = ledger(config)?;
    let mut directory = MemberDirectory::new();
    directory.refresh(ledger.as_ref()).await?;

    for name in directory.members() {
        println!("{name}");
    }
    Ok(())
}

async fn handle_records(config: &Config, cmd: &RecordsCommand) -> anyhow::Result<()> {
    let records = ledger(config)?.list_records().await?;
    let stats = stats::recompute(&records);

    if cmd.json {
        let out = serde_json::json!({ "stats": stats, "records": records });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{stats}");
        println!();
        for record in records.iter().rev() {
            println!("{}", format_record(record));
        }
    }
    Ok(())
}

fn print_change(session: &DashboardSession, change: &Change) {
    match change {
        Change::Status(state) => println!("[{state}]"),
        Change::Retrying { attempt, delay } => {
            println!("[reconnecting in {}s, drop #{attempt}]", delay.as_secs());
        }
        Change::Reseeded => {
            for record in session.store().recent_first().take(10) {
                println!("{}", format_record(record));
            }
            println!("{}", session.stats());
        }
        Change::Appended(record) => {
            println!("{}", format_record(record));
            println!("{}", session.stats());
        }
    }
}

async fn handle_watch(config: &Config) -> anyhow::Result<()> {
    let settings = ChannelSettings::from_config(config)?;
    let (tx, mut rx) = mpsc::channel(config.channel.event_buffer);

    // The channel starts first so pushes during the initial fetch are queued.
    let handle = LiveSyncChannel::new(WsTransport, settings).spawn(tx);
    let mut session = DashboardSession::new(ledger(config)?, config.channel.resync_on_reconnect);

    tokio::select! {
        () = session.run(&mut rx, print_change) => {}
        result = tokio::signal::ctrl_c() => result.context("failed to listen for Ctrl-C")?,
    }

    // Unblock a channel task waiting on a full queue before stopping it.
    drop(rx);
    handle.stop().await;
    println!();
    println!("{}", session.stats());
    Ok(())
}

async fn handle_event(config: &Config, cmd: EventCommand) -> anyhow::Result<()> {
    let date = cmd
        .date
        .unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string());

    let Some(issued) = issuer::issue(ledger(config)?, &cmd.name, &date)? else {
        bail!("event name and date must not be blank");
    };

    println!("{}", issued.payload);
    issued.registration.await?;
    Ok(())
}

fn handle_config(config_file: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = &Config::load_from(config_file)?;
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[API]");
                println!("  Profile:            {:?}", config.api.profile);
                println!("  Origin:             {}", config.origin()?);
                println!("  Request timeout:    {}s", config.api.request_timeout_secs);
                println!();
                println!("[Channel]");
                println!("  URL:                {}", config.push_url()?);
                println!("  Reconnect delay:    {}s", config.channel.reconnect_delay_secs);
                println!(
                    "  Resync on reconnect: {}",
                    config.channel.resync_on_reconnect
                );
                println!("  Event buffer:       {}", config.channel.event_buffer);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_file)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path.clone()))
                .with_context(|| format!("invalid configuration in {}", path.display()))?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
