//! Command-line guest client: confirm attendance, list confirmations, keep them in sync.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use rsvp_invitation::config::{ClientConfig, LogFormat};
use rsvp_invitation::init_tracing;
use rsvp_invitation::models::{sort_newest_first, AttendanceStatus, RsvpEntry};
use rsvp_invitation::sync::{LoadOutcome, LoadSource, Reconciler, RsvpForm, SaveOutcome, SyncStatus};

#[derive(Parser)]
#[command(name = "rsvp")]
#[command(about = "Confirm attendance and browse RSVPs, syncing with the invitation server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Attending,
    NotAttending,
}

impl From<StatusArg> for AttendanceStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Attending => AttendanceStatus::Attending,
            StatusArg::NotAttending => AttendanceStatus::NotAttending,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show all confirmations and attendance counts
    List,
    /// Show this device's own confirmation
    Me,
    /// Confirm attendance (or absence)
    Submit {
        /// Full name
        #[arg(short, long)]
        name: String,

        /// Alumni year ("angkatan")
        #[arg(short, long)]
        cohort: String,

        /// Full address
        #[arg(short, long)]
        address: String,

        #[arg(short, long, value_enum, default_value = "attending")]
        status: StatusArg,

        /// Replace an existing confirmation with the same name and cohort
        #[arg(long)]
        overwrite: bool,
    },
    /// Withdraw this device's confirmation
    Reset,
    /// Push locally saved data that has not reached the server yet
    Sync,
    /// Keep refreshing and print changes until interrupted
    Watch,
    /// Forget the locally cached collection and confirmation
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("warn", LogFormat::Pretty);

    let cli = Cli::parse();
    let config = ClientConfig::from_env();
    let reconciler = Arc::new(Reconciler::from_config(&config)?);

    match cli.command {
        Commands::List => cmd_list(&reconciler).await,
        Commands::Me => cmd_me(&reconciler).await,
        Commands::Submit {
            name,
            cohort,
            address,
            status,
            overwrite,
        } => {
            let form = RsvpForm {
                name,
                address,
                cohort,
                status: status.into(),
            };
            cmd_submit(&reconciler, form, overwrite).await
        }
        Commands::Reset => cmd_reset(&reconciler).await,
        Commands::Sync => cmd_sync(&reconciler).await,
        Commands::Watch => cmd_watch(reconciler).await,
        Commands::Clear => cmd_clear(&reconciler),
    }
}

async fn cmd_list(reconciler: &Reconciler) -> Result<()> {
    let outcome = reconciler.hybrid_load().await;
    print_source(reconciler, &outcome);
    print_list(&outcome);
    Ok(())
}

async fn cmd_me(reconciler: &Reconciler) -> Result<()> {
    let outcome = reconciler.hybrid_load().await;
    print_source(reconciler, &outcome);

    match outcome.current_user {
        Some(me) => println!("{}", describe(&me)),
        None => println!("No confirmation from this device yet."),
    }
    Ok(())
}

async fn cmd_submit(reconciler: &Reconciler, form: RsvpForm, overwrite: bool) -> Result<()> {
    form.validate()?;

    // Make sure we compare against the latest collection
    reconciler.hybrid_load().await;

    let duplicate = reconciler
        .check_duplicate(form.name.trim(), form.cohort.trim())
        .await;
    if let Some(existing) = duplicate {
        if existing.id != reconciler.device_id() && !overwrite {
            anyhow::bail!(
                "A confirmation for {} (angkatan {}) already exists: {}.\n\
                 Run again with --overwrite to update it.",
                existing.name,
                existing.cohort,
                existing.status
            );
        }
    }

    let outcome = reconciler.submit(form).await?;

    if outcome.replaced.is_empty() {
        println!("Confirmed: {}", describe(&outcome.entry));
    } else {
        println!("Updated: {}", describe(&outcome.entry));
    }
    print_save(outcome.save);
    Ok(())
}

async fn cmd_reset(reconciler: &Reconciler) -> Result<()> {
    reconciler.hybrid_load().await;

    match reconciler.current_user() {
        Some(me) => {
            let outcome = reconciler.reset().await;
            println!("Withdrawn: {}", describe(&me));
            print_save(outcome);
        }
        None => println!("No confirmation from this device to withdraw."),
    }
    Ok(())
}

async fn cmd_sync(reconciler: &Reconciler) -> Result<()> {
    let outcome = reconciler.retry_sync().await;
    print_save(outcome);
    Ok(())
}

async fn cmd_watch(reconciler: Arc<Reconciler>) -> Result<()> {
    let outcome = reconciler.hybrid_load().await;
    print_source(&reconciler, &outcome);
    print_list(&outcome);

    let mut status = reconciler.subscribe();
    let refresher = reconciler.spawn_auto_refresh();
    println!(
        "\nRefreshing every {}s, press Ctrl-C to stop.",
        reconciler.options().refresh_interval.as_secs()
    );

    let mut last_count = outcome.entries.len();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                match current {
                    SyncStatus::Synced => {
                        let stats = reconciler.stats();
                        if stats.total() != last_count {
                            last_count = stats.total();
                            println!(
                                "{} confirmations ({} attending, {} not attending)",
                                stats.total(),
                                stats.attending,
                                stats.not_attending
                            );
                        }
                    }
                    SyncStatus::Error | SyncStatus::Offline => println!("Sync status: {}", current),
                    SyncStatus::Syncing => {}
                }
            }
        }
    }

    refresher.abort();
    Ok(())
}

fn cmd_clear(reconciler: &Reconciler) -> Result<()> {
    reconciler.cache().clear_all()?;
    println!("Local RSVP cache cleared.");
    Ok(())
}

fn print_source(reconciler: &Reconciler, outcome: &LoadOutcome) {
    if outcome.source == LoadSource::Cache {
        let age = reconciler
            .cache()
            .last_cached()
            .unwrap_or_else(|| "never".to_string());
        println!(
            "⚠ Server unreachable ({}), showing cached data from {}",
            reconciler.status(),
            age
        );
    }
}

fn print_list(outcome: &LoadOutcome) {
    let stats = rsvp_invitation::models::RsvpStats::from_entries(&outcome.entries);
    println!(
        "Attending: {}  Not attending: {}  Total: {}",
        stats.attending,
        stats.not_attending,
        stats.total()
    );

    if outcome.entries.is_empty() {
        println!("\nNo confirmations yet.");
        return;
    }

    let mut entries = outcome.entries.clone();
    sort_newest_first(&mut entries);

    let my_id = outcome.current_user.as_ref().map(|e| e.id.as_str());
    println!();
    for entry in &entries {
        let marker = if Some(entry.id.as_str()) == my_id { "*" } else { " " };
        println!("{} {}", marker, describe(entry));
    }
}

fn print_save(outcome: SaveOutcome) {
    match outcome {
        SaveOutcome::Synced => println!("Saved and synced."),
        SaveOutcome::LocalOnly => {
            println!("Saved locally, sync pending. Run `rsvp sync` once the server is reachable.")
        }
    }
}

fn describe(entry: &RsvpEntry) -> String {
    let status = match entry.status {
        AttendanceStatus::Attending => "attending",
        AttendanceStatus::NotAttending => "not attending",
    };
    format!(
        "{} (angkatan {}) - {} - {} [{}]",
        entry.name,
        entry.cohort,
        status,
        entry.address,
        entry.timestamp.format("%Y-%m-%d %H:%M")
    )
}
