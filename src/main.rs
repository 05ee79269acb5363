// ==========================================================
//  lanwake: manage the PCs on your LAN from the terminal
// ==========================================================

use std::sync::Arc;
use std::time::Duration;

use comfy_table::{Cell, Table};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use lanwake::discovery::{DiscoverySource, MdnsDiscovery};
use lanwake::model::{DeviceState, PendingAction};
use lanwake::net::broadcast;
use lanwake::{
    DeviceEngine, JsonFileStore, LanWakeError, ProbeConfig, Settings, TokioTcpProber,
};

const DEVICE_FILE: &str = "devices.json";

fn print_usage() {
    println!("Usage: lanwake <COMMAND> [ARGS]");
    println!("Commands:");
    println!("  status               probe all stored devices and show their state");
    println!("  wake <host>          send a Wake-on-LAN packet to a stored device");
    println!("  shutdown <host>      schedule a shutdown via the tray service");
    println!("  cancel <host>        cancel a pending shutdown");
    println!("  discover [secs]      browse for tray advertisements (default 5s)");
    println!("  --list               show local interfaces and the broadcast address");
    println!("  -h, --help           show this help message");
}

fn list_interfaces() -> Result<(), LanWakeError> {
    match broadcast::local_network()? {
        Some(net) => {
            println!(
                "Local network: {} /{} (subnet prefix {})",
                net.ip,
                net.prefix_len,
                net.subnet_prefix()
            );
            println!(
                "Broadcast address: {}",
                broadcast::resolve_broadcast_address()?
            );
        }
        None => println!("No usable network interface found"),
    }
    Ok(())
}

async fn show_status(engine: &DeviceEngine) -> Result<(), LanWakeError> {
    let devices = engine.find_all().await?;
    if devices.is_empty() {
        println!("No devices stored. Add some to {DEVICE_FILE} or run `lanwake discover`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Hostname", "State", "Tray", "Pending", "Last Seen"]);

    for device in &devices {
        let status = engine.status_of(&device.id);
        let state = match status.state {
            DeviceState::Online => "online",
            DeviceState::Offline => "offline",
            DeviceState::Unknown => "unknown",
        };
        let pending = match status.pending_action {
            PendingAction::None => "-".to_string(),
            PendingAction::ShutdownScheduled { execute_at, .. } => {
                format!("shutdown at {}", execute_at.format("%H:%M:%S"))
            }
        };
        table.add_row(vec![
            Cell::new(&device.hostname),
            Cell::new(state),
            Cell::new(if status.tray_reachable { "yes" } else { "no" }),
            Cell::new(pending),
            Cell::new(status.last_seen.format("%H:%M:%S").to_string()),
        ]);
    }
    println!("{table}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), LanWakeError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        print_usage();
        return Ok(());
    };

    match command {
        "-h" | "--help" => {
            print_usage();
            return Ok(());
        }
        "--list" => return list_interfaces(),
        _ => {}
    }

    let store = Arc::new(JsonFileStore::new(DEVICE_FILE));
    let prober = Arc::new(TokioTcpProber::new());
    let (engine, mut updates) = DeviceEngine::new(
        store,
        prober,
        ProbeConfig::default(),
        Settings::default(),
    );

    match command {
        "status" => {
            let expected = engine.find_all().await?.len();
            engine.refresh_all().await?;
            // Statuses arrive incrementally; wait for the batch with a cap
            // so one dead host cannot stall the listing.
            let mut received = 0;
            while received < expected {
                match tokio::time::timeout(Duration::from_secs(5), updates.recv()).await {
                    Ok(Some(update)) => {
                        engine.apply_update(update).await?;
                        received += 1;
                    }
                    _ => break,
                }
            }
            show_status(&engine).await?;
        }
        "wake" => {
            let host = args.get(1).ok_or_else(|| {
                LanWakeError::Other("wake requires a device name".to_string())
            })?;
            // The device must be probed first so the wake predicate can hold.
            engine.refresh_device(host).await?;
            if let Ok(Some(update)) =
                tokio::time::timeout(Duration::from_secs(5), updates.recv()).await
            {
                engine.apply_update(update).await?;
            }
            engine.wake(host).await?;
            println!("Magic packet sent to '{host}'");
        }
        "shutdown" | "cancel" => {
            let host = args.get(1).ok_or_else(|| {
                LanWakeError::Other(format!("{command} requires a device name"))
            })?;
            engine.refresh_device(host).await?;
            if let Ok(Some(update)) =
                tokio::time::timeout(Duration::from_secs(5), updates.recv()).await
            {
                engine.apply_update(update).await?;
            }
            let acked = if command == "shutdown" {
                engine.shutdown(host).await?
            } else {
                engine.cancel_shutdown(host).await?
            };
            if acked {
                println!("'{host}' acknowledged the {command} request");
            } else {
                println!("'{host}' did not acknowledge (offline, tray unreachable, or wrong state)");
            }
        }
        "discover" => {
            let secs: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(5);
            println!("Browsing for tray services for {secs}s...");
            let source = MdnsDiscovery::new();
            let entries = source.collect(Duration::from_secs(secs)).await?;
            println!("Received {} advertisements", entries.len());
            let summary = engine.ingest_discovered(&entries).await?;
            println!(
                "Added {} device(s), updated {}, rejected {} record(s)",
                summary.added, summary.updated, summary.rejected
            );
        }
        "auto" => {
            // Foreground auto-refresh loop, mainly for debugging.
            let cancel = CancellationToken::new();
            let drain = async {
                while let Some(update) = updates.recv().await {
                    let _ = engine.apply_update(update).await;
                }
            };
            tokio::select! {
                () = engine.auto_refresh_loop(cancel.clone()) => {}
                () = drain => {}
                _ = tokio::signal::ctrl_c() => cancel.cancel(),
            }
        }
        other => {
            println!("Unknown command: {other}");
            print_usage();
        }
    }

    Ok(())
}
