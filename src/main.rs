//!   radar-contacts:   live contact tracking with spoken callsign lookup
//!
//!  Ingests a telemetry feed into a shared contact database and answers
//!  callsign queries typed on stdin.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use radar_contacts::config::Config;
use radar_contacts::feed::{self, FeedEvent, IngestStats, Ingestor};
use radar_contacts::{Coalition, ContactDatabase, Trackfile};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_args();

    // RUST_LOG overrides the level picked by --verbose
    let level = if config.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
    info!("radar-contacts starting...");
    info!("Configuration: {:?}", config);

    let db = Arc::new(ContactDatabase::with_policy(config.match_policy()));
    debug!("Matching policy: {:?}", db.policy());

    // Channel for decoded feed events
    let (event_tx, event_rx): (Sender<FeedEvent>, Receiver<FeedEvent>) =
        bounded(EVENT_CHANNEL_CAPACITY);

    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        // Feed reader, blocking file I/O on its own thread
        let reader_handle = config.feed.clone().map(|filename| {
            std::thread::spawn(move || match feed::read_file(&filename, &event_tx) {
                Ok(malformed) => {
                    info!("Feed {} finished, {} malformed lines", filename, malformed);
                }
                Err(e) => error!("Error reading feed {}: {}", filename, e),
            })
        });

        // Ingestion
        let ingest_handle = {
            let db = Arc::clone(&db);
            let history = config.history;
            tokio::task::spawn_blocking(move || process_events(event_rx, db, history))
        };

        // Periodic contact report
        let report_handle = (config.report_interval > 0).then(|| {
            let db = Arc::clone(&db);
            let period = Duration::from_secs(config.report_interval);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                loop {
                    interval.tick().await;
                    report(&db);
                }
            })
        });

        if config.interactive() {
            answer_queries(&db).await;
        }

        // Without stdin queries, run until the feed is drained
        if let Some(handle) = reader_handle {
            if !config.interactive() && handle.join().is_err() {
                error!("Feed reader panicked");
            }
        }

        if let Some(h) = report_handle {
            h.abort();
        }

        if !config.interactive() {
            match ingest_handle.await {
                Ok(stats) if config.stats => print_stats(&stats),
                Ok(_) => {}
                Err(e) => error!("Ingestion task failed: {}", e),
            }
        } else if config.stats {
            // Feed may still be running, report what we have
            info!("{} contacts tracked at exit", db.len());
        }
    });

    // Do not wait on a feed that is still being read
    rt.shutdown_background();
    Ok(())
}

fn process_events(rx: Receiver<FeedEvent>, db: Arc<ContactDatabase>, history: usize) -> IngestStats {
    let mut ingestor = Ingestor::new(db, history);
    while let Ok(event) = rx.recv() {
        ingestor.apply(event);
    }
    ingestor.stats()
}

async fn answer_queries(db: &ContactDatabase) {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => break,
            "list" => {
                for trackfile in db.values() {
                    match serde_json::to_string(&*trackfile) {
                        Ok(json) => println!("{}", json),
                        Err(e) => error!("Cannot encode contact: {}", e),
                    }
                }
                continue;
            }
            _ => {}
        }

        let (coalition, phrase) = line.split_once(' ').unwrap_or((line, ""));
        let coalition: Coalition = match coalition.parse() {
            Ok(c) => c,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match db.resolve(phrase, coalition) {
            Ok(resolution) => {
                let contact = resolution.trackfile.contact();
                println!(
                    "{} -> {} (id {}, {}, score {})",
                    phrase,
                    resolution.callsign,
                    contact.id(),
                    contact.platform(),
                    resolution.score
                );
            }
            Err(e) if e.is_not_found() => {
                debug!("Lookup '{}' ({}) failed: {}", phrase, coalition, e);
                // Neutrals have no other side to check
                let other = coalition.opposite();
                match db.resolve(phrase, other) {
                    Ok(resolution) if other != coalition => println!(
                        "{} -> not found ({} contact {} is {})",
                        phrase,
                        other,
                        resolution.trackfile.contact().id(),
                        resolution.callsign
                    ),
                    _ => println!("{} -> not found", phrase),
                }
            }
            Err(e) => {
                debug!("Lookup '{}' ({}) failed: {}", phrase, coalition, e);
                println!("{} -> not found", phrase);
            }
        }
    }
}

fn report(db: &ContactDatabase) {
    let mut contacts: Vec<_> = db.values().collect();
    contacts.sort_by_key(|tf| tf.contact().id());
    info!("{} contacts tracked", contacts.len());
    for trackfile in &contacts {
        debug!("{}", describe(trackfile));
    }
}

fn describe(trackfile: &Trackfile) -> String {
    let contact = trackfile.contact();
    let callsign = contact.callsign().unwrap_or("-");
    match trackfile.last_known() {
        Some(frame) => format!(
            "{:>6} {:<16} {:<8} {:<8} {:>9.4} {:>10.4} {:>6.0}ft {:>4.0}° {}",
            contact.id(),
            callsign,
            contact.coalition(),
            contact.platform(),
            frame.point.lat,
            frame.point.lon,
            frame.altitude,
            frame.heading,
            trackfile
                .speed_knots()
                .map(|s| format!("{:.0}kt", s))
                .unwrap_or_default(),
        ),
        None => format!(
            "{:>6} {:<16} {:<8} {:<8} (no position)",
            contact.id(),
            callsign,
            contact.coalition(),
            contact.platform()
        ),
    }
}

fn print_stats(stats: &IngestStats) {
    println!("{} observations", stats.observations);
    println!("{} contacts created", stats.created);
    println!("{} stale samples dropped", stats.stale);
    println!("{} samples with invalid timestamps", stats.invalid);
    println!("{} contacts removed", stats.removed);
    println!("{} resets", stats.resets);
}
