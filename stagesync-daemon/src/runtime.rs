use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::time::Instant;

use stagesync_client::ConsoleClient;
use stagesync_core::config::Config;
use stagesync_core::snapshot;
use stagesync_engine::{ReconcileResult, Reconciler};

use crate::error::{io_err, DaemonError};
use crate::paths::{run_dir, socket_path, DEBOUNCE_WINDOW};
use crate::protocol::{DaemonRequest, DaemonResponse};

/// File locations one daemon instance operates on.
#[derive(Debug, Clone)]
pub struct DaemonSettings {
    /// Root for the control socket (`<home>/.stagesync/run/daemon.sock`).
    pub home: PathBuf,
    pub config_path: PathBuf,
    pub snapshot_path: PathBuf,
}

/// One queued reconciliation. The queue has a single consumer, so runs
/// never overlap regardless of how many triggers fire at once.
struct SyncJob {
    source: &'static str,
    dry_run: bool,
    respond_to: oneshot::Sender<Result<Value, String>>,
}

type LastSync = Arc<RwLock<Option<(u64, Value)>>>;

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(settings: DaemonSettings) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(settings))
}

/// Run the daemon runtime.
pub async fn run(settings: DaemonSettings) -> Result<(), DaemonError> {
    // Startup read validates the configuration and fixes the tick interval.
    let config = Config::load(&settings.config_path)?;
    let interval_secs = config.sync_interval_secs;

    let last_sync: LastSync = Arc::new(RwLock::new(None));
    let started_at_unix = unix_seconds_now();

    let (sync_tx, sync_rx) = mpsc::channel::<SyncJob>(64);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let watcher_handle = {
        let shutdown = shutdown_tx.clone();
        let settings = settings.clone();
        let sync_tx = sync_tx.clone();
        tokio::spawn(async move {
            let result = watcher_task(settings, sync_tx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let processor_handle = {
        let shutdown = shutdown_tx.clone();
        let settings = settings.clone();
        let last_sync = last_sync.clone();
        tokio::spawn(async move {
            let result = sync_processor_task(settings, last_sync, sync_rx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let interval_handle = {
        let shutdown = shutdown_tx.clone();
        let sync_tx = sync_tx.clone();
        tokio::spawn(async move {
            let result = interval_task(interval_secs, sync_tx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let settings = settings.clone();
        let last_sync = last_sync.clone();
        let sync_tx = sync_tx.clone();
        tokio::spawn(async move {
            let result = socket_server_task(
                settings,
                last_sync,
                sync_tx,
                shutdown.clone(),
                shutdown.subscribe(),
                started_at_unix,
            )
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (watcher_result, processor_result, interval_result, socket_result, signal_result) = tokio::join!(
        watcher_handle,
        processor_handle,
        interval_handle,
        socket_handle,
        signal_handle
    );

    handle_join("watcher", watcher_result)?;
    handle_join("sync_processor", processor_result)?;
    handle_join("interval", interval_result)?;
    handle_join("socket_server", socket_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    result.map_err(|err| DaemonError::Protocol(format!("{task} task join error: {err}")))?
}

// ---------------------------------------------------------------------------
// Watcher
// ---------------------------------------------------------------------------

async fn watcher_task(
    settings: DaemonSettings,
    sync_tx: mpsc::Sender<SyncJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut _watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;

    // FSEvents is directory-based: watch the parent directories and filter
    // events down to the two files we care about.
    for dir in watch_dirs(&settings) {
        if dir.exists() {
            _watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            tracing::debug!(path = %dir.display(), "watching input directory");
        }
    }

    let watched = [settings.config_path.clone(), settings.snapshot_path.clone()];
    let mut debounce = HashMap::<PathBuf, Instant>::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                if !is_relevant_event_kind(&event.kind) {
                    continue;
                }

                for path in event.paths {
                    if !is_watched_file(&path, &watched) {
                        continue;
                    }
                    if !should_process_event(&mut debounce, &path, Instant::now()) {
                        continue;
                    }

                    tracing::info!(path = %path.display(), "input changed, triggering reconciliation");
                    match enqueue_sync(&sync_tx, "watcher", false).await {
                        Ok(summary) => {
                            tracing::info!(
                                changes = summary_changes(&summary),
                                "watcher-triggered reconciliation completed",
                            );
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "watcher-triggered reconciliation failed");
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

fn watch_dirs(settings: &DaemonSettings) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = [&settings.config_path, &settings.snapshot_path]
        .iter()
        .filter_map(|p| p.parent().map(Path::to_path_buf))
        .collect();
    dirs.sort();
    dirs.dedup();
    dirs
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

fn is_watched_file(path: &Path, watched: &[PathBuf]) -> bool {
    watched.iter().any(|w| {
        path == w
            || (path.file_name() == w.file_name()
                && path.parent().and_then(|p| fs::canonicalize(p).ok())
                    == w.parent().and_then(|p| fs::canonicalize(p).ok()))
    })
}

fn should_process_event(
    debounce: &mut HashMap<PathBuf, Instant>,
    path: &Path,
    now: Instant,
) -> bool {
    match debounce.get(path) {
        Some(last) if now.duration_since(*last) < DEBOUNCE_WINDOW => false,
        _ => {
            debounce.insert(path.to_path_buf(), now);
            true
        }
    }
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

async fn sync_processor_task(
    settings: DaemonSettings,
    last_sync: LastSync,
    mut sync_rx: mpsc::Receiver<SyncJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_job = sync_rx.recv() => {
                let Some(job) = maybe_job else { break };

                let settings_for_run = settings.clone();
                let dry_run = job.dry_run;
                // The engine is synchronous (one blocking console call at a
                // time); keep it off the async workers.
                let run_result = tokio::task::spawn_blocking(move || {
                    run_reconcile_blocking(&settings_for_run, dry_run)
                })
                .await
                .map_err(|err| DaemonError::Protocol(format!("sync task join error: {err}")))?;

                let outcome = match run_result {
                    Ok(result) => {
                        log_result(job.source, &result);
                        match serde_json::to_value(&result) {
                            Ok(value) => {
                                if !dry_run {
                                    let mut guard = last_sync.write().await;
                                    *guard = Some((unix_seconds_now(), value.clone()));
                                }
                                Ok(value)
                            }
                            Err(err) => Err(format!("failed to serialize result: {err}")),
                        }
                    }
                    Err(err) => Err(err),
                };

                let _ = job.respond_to.send(outcome);
            }
        }
    }

    Ok(())
}

fn run_reconcile_blocking(
    settings: &DaemonSettings,
    dry_run: bool,
) -> Result<ReconcileResult, String> {
    let config = Config::load(&settings.config_path).map_err(|e| e.to_string())?;
    let token = config.console.token().map_err(|e| e.to_string())?;
    let snapshot = snapshot::load(&settings.snapshot_path).map_err(|e| e.to_string())?;
    let client = ConsoleClient::new(&config.console.url, &token);
    Ok(Reconciler::new(&client, &config).run(&snapshot, dry_run))
}

fn log_result(source: &str, result: &ReconcileResult) {
    tracing::info!(
        source,
        dry_run = result.dry_run,
        shot_created = result.shot_jobs_created,
        shot_updated = result.shot_jobs_updated,
        shot_deleted = result.shot_jobs_deleted,
        assets_created = result.assets_jobs_created,
        assets_updated = result.assets_jobs_updated,
        assets_deleted = result.assets_jobs_deleted,
        artists = result.artists_processed,
        errors = result.errors.len(),
        duration_ms = result.duration_ms as u64,
        "reconciliation completed",
    );
    for error in &result.errors {
        tracing::warn!(source, "reconciliation error: {}", error);
    }
}

async fn enqueue_sync(
    sync_tx: &mpsc::Sender<SyncJob>,
    source: &'static str,
    dry_run: bool,
) -> Result<Value, DaemonError> {
    let (tx, rx) = oneshot::channel();
    sync_tx
        .send(SyncJob {
            source,
            dry_run,
            respond_to: tx,
        })
        .await
        .map_err(|_| DaemonError::ChannelClosed("sync queue"))?;

    let outcome = rx
        .await
        .map_err(|_| DaemonError::ChannelClosed("sync response"))?;
    outcome.map_err(DaemonError::Protocol)
}

fn summary_changes(summary: &Value) -> u64 {
    ["shot_jobs_created", "shot_jobs_updated", "shot_jobs_deleted",
     "assets_jobs_created", "assets_jobs_updated", "assets_jobs_deleted"]
        .iter()
        .filter_map(|key| summary.get(key).and_then(Value::as_u64))
        .sum()
}

// ---------------------------------------------------------------------------
// Interval trigger
// ---------------------------------------------------------------------------

async fn interval_task(
    interval_secs: u64,
    sync_tx: mpsc::Sender<SyncJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    if interval_secs == 0 {
        let _ = shutdown_rx.recv().await;
        return Ok(());
    }

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                match enqueue_sync(&sync_tx, "interval", false).await {
                    Ok(summary) => {
                        tracing::info!(
                            changes = summary_changes(&summary),
                            "interval reconciliation completed",
                        );
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "interval reconciliation failed");
                    }
                }
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Socket server
// ---------------------------------------------------------------------------

async fn socket_server_task(
    settings: DaemonSettings,
    last_sync: LastSync,
    sync_tx: mpsc::Sender<SyncJob>,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
    started_at_unix: u64,
) -> Result<(), DaemonError> {
    let run = run_dir(&settings.home);
    if !run.exists() {
        fs::create_dir_all(&run).map_err(|e| io_err(&run, e))?;
    }

    let socket = socket_path(&settings.home);
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let settings = settings.clone();
                let last_sync = last_sync.clone();
                let sync_tx = sync_tx.clone();
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(
                        stream,
                        settings,
                        last_sync,
                        sync_tx,
                        shutdown_tx,
                        started_at_unix,
                    ).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(
    stream: UnixStream,
    settings: DaemonSettings,
    last_sync: LastSync,
    sync_tx: mpsc::Sender<SyncJob>,
    shutdown_tx: broadcast::Sender<()>,
    started_at_unix: u64,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request: Result<DaemonRequest, _> = serde_json::from_str(&line);
        let request = match request {
            Ok(request) => request,
            Err(err) => {
                write_response(
                    &mut writer,
                    &DaemonResponse::error(format!("invalid request JSON: {err}")),
                )
                .await?;
                continue;
            }
        };

        let cmd = request.cmd.clone();
        let response = match cmd.as_str() {
            "status" => {
                let payload =
                    build_status_payload(&settings, last_sync.clone(), started_at_unix).await;
                DaemonResponse::ok(payload)
            }
            "sync" => match enqueue_sync(&sync_tx, "socket", request.dry_run).await {
                Ok(result) => DaemonResponse::ok(result),
                Err(err) => DaemonResponse::error(err.to_string()),
            },
            "stop" => {
                let _ = shutdown_tx.send(());
                DaemonResponse::ok(json!({ "stopping": true }))
            }
            other => DaemonResponse::error(format!("unknown command '{other}'")),
        };

        write_response(&mut writer, &response).await?;
        if cmd == "stop" {
            break;
        }
    }

    Ok(())
}

async fn build_status_payload(
    settings: &DaemonSettings,
    last_sync: LastSync,
    started_at_unix: u64,
) -> Value {
    let (last_sync_at_unix, last_result) = {
        let guard = last_sync.read().await;
        match guard.as_ref() {
            Some((at, result)) => (*at, result.clone()),
            None => (0, Value::Null),
        }
    };

    json!({
        "running": true,
        "started_at_unix": started_at_unix,
        "last_sync_at_unix": last_sync_at_unix,
        "last_result": last_result,
        "config": settings.config_path.display().to_string(),
        "snapshot": settings.snapshot_path.display().to_string(),
        "socket": socket_path(&settings.home).display().to_string(),
    })
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let payload = serde_json::to_string(response)?;
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    Ok(())
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::Protocol(format!(
                "daemon socket already in use: {}",
                socket.display()
            )));
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(home: &Path) -> DaemonSettings {
        DaemonSettings {
            home: home.to_path_buf(),
            config_path: home.join("conf").join("config.yaml"),
            snapshot_path: home.join("conf").join("snapshot.json"),
        }
    }

    #[test]
    fn watch_dirs_deduplicates_shared_parents() {
        let settings = settings(Path::new("/tmp/sync-home"));
        let dirs = watch_dirs(&settings);
        assert_eq!(dirs, vec![PathBuf::from("/tmp/sync-home/conf")]);
    }

    #[test]
    fn debounce_suppresses_rapid_repeats() {
        let mut debounce = HashMap::new();
        let path = Path::new("/tmp/config.yaml");
        let start = Instant::now();

        assert!(should_process_event(&mut debounce, path, start));
        assert!(!should_process_event(
            &mut debounce,
            path,
            start + Duration::from_millis(100)
        ));
        assert!(should_process_event(
            &mut debounce,
            path,
            start + DEBOUNCE_WINDOW + Duration::from_millis(1)
        ));
    }

    #[test]
    fn only_create_and_modify_events_are_relevant() {
        assert!(is_relevant_event_kind(&EventKind::Create(
            notify::event::CreateKind::File
        )));
        assert!(is_relevant_event_kind(&EventKind::Modify(
            notify::event::ModifyKind::Any
        )));
        assert!(!is_relevant_event_kind(&EventKind::Remove(
            notify::event::RemoveKind::File
        )));
    }

    #[test]
    fn summary_changes_sums_all_six_counters() {
        let summary = json!({
            "shot_jobs_created": 2,
            "shot_jobs_updated": 1,
            "shot_jobs_deleted": 0,
            "assets_jobs_created": 1,
            "assets_jobs_updated": 0,
            "assets_jobs_deleted": 3,
            "shot_jobs_hydrated": 99,
        });
        assert_eq!(summary_changes(&summary), 7);
    }

    #[test]
    fn missing_reconcile_inputs_become_error_strings() {
        let home = tempfile::TempDir::new().expect("tempdir");
        let settings = settings(home.path());
        let err = run_reconcile_blocking(&settings, false).expect_err("no inputs on disk");
        assert!(err.contains("I/O error"), "got: {err}");
    }
}
