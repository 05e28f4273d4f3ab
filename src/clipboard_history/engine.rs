//! Clipboard engine
//!
//! [`ClipboardEngine`] ties the monitor, history store, persistence and
//! playback controller together. Every mutation goes through it, and each
//! mutation is saved and pushed to subscribers before the next request is
//! handled.
//!
//! [`EngineHandle`] runs one engine on a dedicated worker thread and talks to
//! it by message passing, so clipboard notifications arriving on any thread
//! are serialized onto that single thread. An optional poller thread feeds
//! it timer ticks.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::backend::ClipboardBackend;
use super::codec::PayloadCodec;
use super::history::{HistoryStore, ViewFilter};
use super::keystroke::KeystrokeInjector;
use super::monitor::{CaptureOutcome, ChangeMonitor, MonitorMode};
use super::persistence::Persistence;
use super::playback::{PlaybackController, Presenter};
use super::retry::RetryPolicy;
use super::settings::Settings;
use super::types::Entry;
use crate::config::Config;
use crate::error::ClipboardHistoryError;

/// Tunables for one engine instance
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub mode: MonitorMode,
    pub capture_on_start: bool,
    pub max_entries: Option<usize>,
    pub max_text_length: usize,
    pub read_policy: RetryPolicy,
    pub write_policy: RetryPolicy,
    pub settle_delay: Duration,
    pub poll_interval: Duration,
}

impl EngineOptions {
    pub fn from_config(config: &Config, mode: MonitorMode) -> Self {
        let history = config.get_history();
        let monitor = config.get_monitor();
        let playback = config.get_playback();
        Self {
            mode,
            capture_on_start: monitor.capture_on_start,
            max_entries: history.effective_max_entries(),
            max_text_length: history.effective_max_text_length(),
            read_policy: RetryPolicy::new(
                monitor.read_retry_attempts,
                monitor.read_retry_backoff(),
            ),
            write_policy: RetryPolicy::new(
                playback.write_retry_attempts,
                playback.write_retry_backoff(),
            ),
            settle_delay: playback.paste_settle_delay(),
            poll_interval: monitor.poll_interval(),
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_config(&Config::default(), MonitorMode::Poll)
    }
}

/// Pushed to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The current filtered view after a mutation or filter change
    ViewChanged(Vec<Entry>),
    /// Copy or paste could not write the clipboard
    PlaybackFailed {
        entry_id: String,
        error: ClipboardHistoryError,
    },
    /// Clipboard was written but the paste keystroke failed
    PasteKeystrokeFailed {
        entry_id: String,
        error: ClipboardHistoryError,
    },
}

pub struct ClipboardEngine {
    store: HistoryStore,
    settings: Settings,
    monitor: ChangeMonitor,
    playback: PlaybackController,
    backend: Box<dyn ClipboardBackend>,
    persistence: Persistence,
    view_filter: ViewFilter,
    subscribers: Vec<Sender<EngineEvent>>,
}

impl ClipboardEngine {
    /// Load history and settings, then (if configured) capture the current
    /// clipboard once.
    pub fn new(
        options: &EngineOptions,
        backend: Box<dyn ClipboardBackend>,
        injector: Box<dyn KeystrokeInjector>,
        presenter: Box<dyn Presenter>,
        persistence: Persistence,
    ) -> Self {
        let codec = PayloadCodec::new(options.max_text_length);
        let store = HistoryStore::with_entries(persistence.load_history(), options.max_entries);
        let settings = persistence.load_settings();

        let mut engine = Self {
            store,
            settings,
            monitor: ChangeMonitor::new(options.mode, options.read_policy, codec.clone()),
            playback: PlaybackController::new(
                options.write_policy,
                options.settle_delay,
                codec,
                injector,
                presenter,
            ),
            backend,
            persistence,
            view_filter: ViewFilter::default(),
            subscribers: Vec::new(),
        };

        if engine.settings.first_run {
            info!("First run, writing initial settings");
            engine.settings.first_run = false;
            engine.persistence.save_settings(&engine.settings);
        }

        info!(
            entries = engine.store.len(),
            mode = ?options.mode,
            max_entries = ?options.max_entries,
            "Clipboard engine ready"
        );

        if options.capture_on_start {
            let outcome = engine.monitor.capture_now(engine.backend.as_mut(), &mut engine.store);
            engine.after_capture(outcome);
        }
        engine
    }

    /// Register for [`EngineEvent`]s. The current view is sent immediately.
    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(EngineEvent::ViewChanged(self.view()));
        self.subscribers.push(tx);
        rx
    }

    pub fn entries(&self) -> &[Entry] {
        self.store.entries()
    }

    pub fn entry(&self, id: &str) -> Option<Entry> {
        self.store.get(id).cloned()
    }

    /// Full id for an id or unique id prefix
    pub fn resolve_id(&self, id_or_prefix: &str) -> Option<String> {
        self.store.resolve_id(id_or_prefix).map(str::to_string)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn monitor(&self) -> &ChangeMonitor {
        &self.monitor
    }

    // ------------------------------------------------------------------
    // Inbound from the OS
    // ------------------------------------------------------------------

    pub fn handle_notification(&mut self) -> CaptureOutcome {
        let outcome = self
            .monitor
            .on_notification(self.backend.as_mut(), &mut self.store);
        self.after_capture(outcome.clone());
        outcome
    }

    pub fn handle_tick(&mut self) -> CaptureOutcome {
        let outcome = self.monitor.on_tick(self.backend.as_mut(), &mut self.store);
        self.after_capture(outcome.clone());
        outcome
    }

    fn after_capture(&mut self, outcome: CaptureOutcome) {
        if let CaptureOutcome::Inserted(id) = outcome {
            info!(entry_id = %id, "Captured clipboard entry");
            self.after_mutation();
        }
    }

    // ------------------------------------------------------------------
    // Inbound from the presentation layer
    // ------------------------------------------------------------------

    /// Insert a candidate entry (normally done by the monitor)
    pub fn insert(&mut self, entry: Entry) -> bool {
        let inserted = self.store.try_insert(entry);
        if inserted {
            self.after_mutation();
        }
        inserted
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let removed = self.store.remove(id);
        if removed {
            self.after_mutation();
        }
        removed
    }

    pub fn toggle_favorite(&mut self, id: &str) -> Option<bool> {
        let favorite = self.store.toggle_favorite(id)?;
        self.after_mutation();
        Some(favorite)
    }

    pub fn edit_text(&mut self, id: &str, text: &str) -> Result<(), ClipboardHistoryError> {
        if !self.store.edit_text(id, text) {
            return Err(ClipboardHistoryError::EntryNotFound(id.to_string()));
        }
        self.after_mutation();
        Ok(())
    }

    pub fn clear(&mut self) -> usize {
        let count = self.store.clear();
        self.after_mutation();
        count
    }

    pub fn filtered_view(&self, favorites_only: bool, search: Option<&str>) -> Vec<Entry> {
        self.store.get_filtered_view(favorites_only, search)
    }

    /// View under the current subscription filter
    pub fn view(&self) -> Vec<Entry> {
        self.store.filtered_view(&self.view_filter)
    }

    pub fn set_view_filter(&mut self, filter: ViewFilter) {
        debug!(?filter, "View filter changed");
        self.view_filter = filter;
        self.publish_view();
    }

    /// Put an entry back on the clipboard
    pub fn copy(&mut self, id: &str) -> Result<(), ClipboardHistoryError> {
        let entry = self.lookup(id)?;
        let result = self
            .playback
            .copy(&entry, self.backend.as_mut(), &mut self.monitor);
        if let Err(error) = &result {
            self.publish(EngineEvent::PlaybackFailed {
                entry_id: entry.id().to_string(),
                error: error.clone(),
            });
        }
        result
    }

    /// Put an entry back on the clipboard and paste it into the focused app
    pub fn paste(&mut self, id: &str) -> Result<(), ClipboardHistoryError> {
        let entry = self.lookup(id)?;
        let result = self
            .playback
            .paste_selected(&entry, self.backend.as_mut(), &mut self.monitor);
        if let Err(error) = &result {
            let entry_id = entry.id().to_string();
            let event = match error {
                ClipboardHistoryError::KeystrokeInjection(_) => {
                    EngineEvent::PasteKeystrokeFailed {
                        entry_id,
                        error: error.clone(),
                    }
                }
                _ => EngineEvent::PlaybackFailed {
                    entry_id,
                    error: error.clone(),
                },
            };
            self.publish(event);
        }
        result
    }

    /// Apply a change to the settings and save them
    pub fn update_settings(&mut self, update: impl FnOnce(&mut Settings)) -> Settings {
        update(&mut self.settings);
        self.persistence.save_settings(&self.settings);
        self.settings.clone()
    }

    /// Save everything
    pub fn shutdown(&mut self) {
        self.persistence.save_history(self.store.entries());
        self.persistence.save_settings(&self.settings);
        info!(entries = self.store.len(), "Clipboard engine shut down");
    }

    fn lookup(&self, id: &str) -> Result<Entry, ClipboardHistoryError> {
        self.store
            .get(id)
            .cloned()
            .ok_or_else(|| ClipboardHistoryError::EntryNotFound(id.to_string()))
    }

    fn after_mutation(&mut self) {
        self.persistence.save_history(self.store.entries());
        self.publish_view();
    }

    fn publish_view(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let view = self.view();
        self.publish(EngineEvent::ViewChanged(view));
    }

    fn publish(&mut self, event: EngineEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

// ============================================================================
// Worker thread
// ============================================================================

/// Update applied to the settings on the worker thread
pub type SettingsUpdate = Box<dyn FnOnce(&mut Settings) + Send>;

/// Request types for the engine worker
pub enum EngineRequest {
    /// Push-model clipboard change notification
    Notify,
    /// Poll-model timer tick
    Tick,
    Insert {
        entry: Entry,
        reply: SyncSender<bool>,
    },
    Remove {
        id: String,
        reply: SyncSender<bool>,
    },
    ToggleFavorite {
        id: String,
        reply: SyncSender<Option<bool>>,
    },
    EditText {
        id: String,
        text: String,
        reply: SyncSender<Result<(), ClipboardHistoryError>>,
    },
    Clear {
        reply: SyncSender<usize>,
    },
    GetFilteredView {
        favorites_only: bool,
        search: Option<String>,
        reply: SyncSender<Vec<Entry>>,
    },
    SetViewFilter {
        filter: ViewFilter,
        reply: SyncSender<()>,
    },
    GetEntry {
        id: String,
        reply: SyncSender<Option<Entry>>,
    },
    ResolveId {
        id_or_prefix: String,
        reply: SyncSender<Option<String>>,
    },
    Copy {
        id: String,
        reply: SyncSender<Result<(), ClipboardHistoryError>>,
    },
    Paste {
        id: String,
        reply: SyncSender<Result<(), ClipboardHistoryError>>,
    },
    GetSettings {
        reply: SyncSender<Settings>,
    },
    UpdateSettings {
        update: SettingsUpdate,
        reply: SyncSender<Settings>,
    },
    Subscribe {
        reply: SyncSender<Receiver<EngineEvent>>,
    },
    /// Save and stop the worker
    Shutdown {
        reply: SyncSender<()>,
    },
}

/// Owner of the engine worker thread (and the poller, if started)
pub struct EngineHandle {
    sender: Sender<EngineRequest>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    poller: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// Start the worker thread. The engine is built on that thread by
    /// `factory`, so backends need not be `Send`.
    pub fn spawn<F>(factory: F) -> Result<Self>
    where
        F: FnOnce() -> Result<ClipboardEngine> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<EngineRequest>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);

        let worker = thread::Builder::new()
            .name("clipstack-engine".to_string())
            .spawn(move || match factory() {
                Ok(engine) => {
                    let _ = ready_tx.send(Ok(()));
                    engine_worker_loop(engine, rx);
                }
                Err(e) => {
                    error!(error = %e, "Failed to initialize clipboard engine");
                    let _ = ready_tx.send(Err(format!("{:#}", e)));
                }
            })
            .context("Failed to spawn engine worker thread")?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(message)) => {
                let _ = worker.join();
                anyhow::bail!("Clipboard engine failed to start: {}", message);
            }
            Err(_) => {
                let _ = worker.join();
                anyhow::bail!("Clipboard engine worker exited during startup");
            }
        }

        info!("Engine worker thread started");
        Ok(Self {
            sender: tx,
            stop: Arc::new(AtomicBool::new(false)),
            worker: Some(worker),
            poller: None,
        })
    }

    /// Start a background thread that sends a tick every `interval`
    pub fn start_polling(&mut self, interval: Duration) -> Result<()> {
        if self.poller.is_some() {
            debug!("Poller already running");
            return Ok(());
        }
        let sender = self.sender.clone();
        let stop = self.stop.clone();
        let poller = thread::Builder::new()
            .name("clipstack-poller".to_string())
            .spawn(move || poll_loop(sender, stop, interval))
            .context("Failed to spawn clipboard poller thread")?;

        info!(poll_interval_ms = interval.as_millis() as u64, "Clipboard polling started");
        self.poller = Some(poller);
        Ok(())
    }

    /// Sender for external collaborators that deliver OS notifications
    pub fn sender(&self) -> Sender<EngineRequest> {
        self.sender.clone()
    }

    /// Fire-and-forget clipboard change notification
    pub fn notify_clipboard_changed(&self) {
        if self.sender.send(EngineRequest::Notify).is_err() {
            warn!("Engine worker gone, dropping clipboard notification");
        }
    }

    fn request<T>(
        &self,
        make: impl FnOnce(SyncSender<T>) -> EngineRequest,
    ) -> Result<T, ClipboardHistoryError> {
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        self.sender
            .send(make(reply_tx))
            .map_err(|_| ClipboardHistoryError::EngineStopped)?;
        reply_rx
            .recv()
            .map_err(|_| ClipboardHistoryError::EngineStopped)
    }

    pub fn insert(&self, entry: Entry) -> Result<bool, ClipboardHistoryError> {
        self.request(|reply| EngineRequest::Insert { entry, reply })
    }

    pub fn remove(&self, id: &str) -> Result<bool, ClipboardHistoryError> {
        let id = id.to_string();
        self.request(|reply| EngineRequest::Remove { id, reply })
    }

    pub fn toggle_favorite(&self, id: &str) -> Result<Option<bool>, ClipboardHistoryError> {
        let id = id.to_string();
        self.request(|reply| EngineRequest::ToggleFavorite { id, reply })
    }

    pub fn edit_text(&self, id: &str, text: &str) -> Result<(), ClipboardHistoryError> {
        let (id, text) = (id.to_string(), text.to_string());
        self.request(|reply| EngineRequest::EditText { id, text, reply })?
    }

    pub fn clear(&self) -> Result<usize, ClipboardHistoryError> {
        self.request(|reply| EngineRequest::Clear { reply })
    }

    pub fn filtered_view(
        &self,
        favorites_only: bool,
        search: Option<&str>,
    ) -> Result<Vec<Entry>, ClipboardHistoryError> {
        let search = search.map(str::to_string);
        self.request(|reply| EngineRequest::GetFilteredView {
            favorites_only,
            search,
            reply,
        })
    }

    pub fn set_view_filter(&self, filter: ViewFilter) -> Result<(), ClipboardHistoryError> {
        self.request(|reply| EngineRequest::SetViewFilter { filter, reply })
    }

    pub fn entry(&self, id: &str) -> Result<Option<Entry>, ClipboardHistoryError> {
        let id = id.to_string();
        self.request(|reply| EngineRequest::GetEntry { id, reply })
    }

    pub fn resolve_id(&self, id_or_prefix: &str) -> Result<Option<String>, ClipboardHistoryError> {
        let id_or_prefix = id_or_prefix.to_string();
        self.request(|reply| EngineRequest::ResolveId {
            id_or_prefix,
            reply,
        })
    }

    pub fn copy(&self, id: &str) -> Result<(), ClipboardHistoryError> {
        let id = id.to_string();
        self.request(|reply| EngineRequest::Copy { id, reply })?
    }

    pub fn paste(&self, id: &str) -> Result<(), ClipboardHistoryError> {
        let id = id.to_string();
        self.request(|reply| EngineRequest::Paste { id, reply })?
    }

    pub fn settings(&self) -> Result<Settings, ClipboardHistoryError> {
        self.request(|reply| EngineRequest::GetSettings { reply })
    }

    pub fn update_settings(
        &self,
        update: impl FnOnce(&mut Settings) + Send + 'static,
    ) -> Result<Settings, ClipboardHistoryError> {
        let update: SettingsUpdate = Box::new(update);
        self.request(|reply| EngineRequest::UpdateSettings { update, reply })
    }

    pub fn subscribe(&self) -> Result<Receiver<EngineEvent>, ClipboardHistoryError> {
        self.request(|reply| EngineRequest::Subscribe { reply })
    }

    /// Stop the poller, save everything and stop the worker. Idempotent.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(poller) = self.poller.take() {
            let _ = poller.join();
        }

        if let Some(worker) = self.worker.take() {
            let (reply_tx, reply_rx) = mpsc::sync_channel(1);
            if self
                .sender
                .send(EngineRequest::Shutdown { reply: reply_tx })
                .is_ok()
            {
                let _ = reply_rx.recv();
            }
            if worker.join().is_err() {
                error!("Engine worker thread panicked");
            }
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn poll_loop(sender: Sender<EngineRequest>, stop: Arc<AtomicBool>, interval: Duration) {
    debug!("Clipboard poller started");
    while !stop.load(Ordering::Relaxed) {
        thread::sleep(interval);
        if stop.load(Ordering::Relaxed) {
            break;
        }
        if sender.send(EngineRequest::Tick).is_err() {
            break;
        }
    }
    debug!("Clipboard poller stopped");
}

fn engine_worker_loop(mut engine: ClipboardEngine, rx: Receiver<EngineRequest>) {
    info!("Engine worker loop started");
    let mut shutdown_reply = None;
    for request in rx {
        if let EngineRequest::Shutdown { reply } = request {
            shutdown_reply = Some(reply);
            break;
        }
        handle_request(&mut engine, request);
    }

    engine.shutdown();
    if let Some(reply) = shutdown_reply {
        let _ = reply.send(());
    }
    info!("Engine worker loop ended");
}

fn handle_request(engine: &mut ClipboardEngine, request: EngineRequest) {
    match request {
        EngineRequest::Notify => {
            engine.handle_notification();
        }
        EngineRequest::Tick => {
            engine.handle_tick();
        }
        EngineRequest::Insert { entry, reply } => {
            let _ = reply.send(engine.insert(entry));
        }
        EngineRequest::Remove { id, reply } => {
            let _ = reply.send(engine.remove(&id));
        }
        EngineRequest::ToggleFavorite { id, reply } => {
            let _ = reply.send(engine.toggle_favorite(&id));
        }
        EngineRequest::EditText { id, text, reply } => {
            let _ = reply.send(engine.edit_text(&id, &text));
        }
        EngineRequest::Clear { reply } => {
            let _ = reply.send(engine.clear());
        }
        EngineRequest::GetFilteredView {
            favorites_only,
            search,
            reply,
        } => {
            let _ = reply.send(engine.filtered_view(favorites_only, search.as_deref()));
        }
        EngineRequest::SetViewFilter { filter, reply } => {
            engine.set_view_filter(filter);
            let _ = reply.send(());
        }
        EngineRequest::GetEntry { id, reply } => {
            let _ = reply.send(engine.entry(&id));
        }
        EngineRequest::ResolveId {
            id_or_prefix,
            reply,
        } => {
            let _ = reply.send(engine.resolve_id(&id_or_prefix));
        }
        EngineRequest::Copy { id, reply } => {
            let _ = reply.send(engine.copy(&id));
        }
        EngineRequest::Paste { id, reply } => {
            let _ = reply.send(engine.paste(&id));
        }
        EngineRequest::GetSettings { reply } => {
            let _ = reply.send(engine.settings().clone());
        }
        EngineRequest::UpdateSettings { update, reply } => {
            let _ = reply.send(engine.update_settings(update));
        }
        EngineRequest::Subscribe { reply } => {
            let _ = reply.send(engine.subscribe());
        }
        EngineRequest::Shutdown { reply } => {
            // Handled by the loop; reaching here means a direct call
            engine.shutdown();
            let _ = reply.send(());
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
