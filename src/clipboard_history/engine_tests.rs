use super::*;
use crate::clipboard_history::codec::{NativeSnapshot, NativeValue};
use crate::clipboard_history::image::encode_image_to_png_bytes;
use crate::clipboard_history::playback::NoopPresenter;
use crate::clipboard_history::settings::{Theme, WindowPosition};
use crate::clipboard_history::testing::{MemoryClipboard, RecordingInjector, RecordingPresenter};
use crate::clipboard_history::types::FORMAT_IMAGE;
use tempfile::TempDir;

fn fast_options(mode: MonitorMode) -> EngineOptions {
    EngineOptions {
        mode,
        capture_on_start: false,
        max_entries: None,
        max_text_length: 1_000,
        read_policy: RetryPolicy::new(4, Duration::from_millis(1)),
        write_policy: RetryPolicy::new(4, Duration::from_millis(1)),
        settle_delay: Duration::from_millis(1),
        poll_interval: Duration::from_millis(5),
    }
}

fn engine_with(
    options: &EngineOptions,
    clipboard: &MemoryClipboard,
    injector: &RecordingInjector,
    dir: &TempDir,
) -> ClipboardEngine {
    ClipboardEngine::new(
        options,
        Box::new(clipboard.clone()),
        Box::new(injector.clone()),
        Box::new(RecordingPresenter::default()),
        Persistence::in_dir(dir.path()),
    )
}

fn texts(entries: &[Entry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.text().unwrap_or_default().to_string())
        .collect()
}

fn drain_views(rx: &Receiver<EngineEvent>) -> Vec<Vec<String>> {
    rx.try_iter()
        .filter_map(|event| match event {
            EngineEvent::ViewChanged(view) => Some(texts(&view)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_duplicate_notifications_yield_one_entry() {
    let dir = TempDir::new().unwrap();
    let clipboard = MemoryClipboard::with_text("hello");
    let mut engine = engine_with(
        &fast_options(MonitorMode::Push),
        &clipboard,
        &RecordingInjector::new(),
        &dir,
    );

    engine.handle_notification();
    engine.handle_notification();
    assert_eq!(engine.entries().len(), 1);

    clipboard.set_text("world");
    engine.handle_notification();
    assert_eq!(texts(engine.entries()), vec!["world", "hello"]);
}

#[test]
fn test_every_mutation_is_saved() {
    let dir = TempDir::new().unwrap();
    let clipboard = MemoryClipboard::new();
    let options = fast_options(MonitorMode::Push);
    let mut engine = engine_with(&options, &clipboard, &RecordingInjector::new(), &dir);

    engine.insert(Entry::from_text("a"));
    engine.insert(Entry::from_text("b"));
    let a = engine.entries()[1].id().to_string();
    engine.toggle_favorite(&a);

    let reloaded = Persistence::in_dir(dir.path()).load_history();
    assert_eq!(texts(&reloaded), vec!["b", "a"]);
    assert!(reloaded[1].is_favorite(), "favorite flag survives persistence");

    engine.remove(&a);
    assert_eq!(texts(&Persistence::in_dir(dir.path()).load_history()), vec!["b"]);
}

#[test]
fn test_history_is_reloaded_on_start() {
    let dir = TempDir::new().unwrap();
    let clipboard = MemoryClipboard::new();
    let options = fast_options(MonitorMode::Push);
    {
        let mut engine = engine_with(&options, &clipboard, &RecordingInjector::new(), &dir);
        engine.insert(Entry::from_text("persisted"));
    }
    let engine = engine_with(&options, &clipboard, &RecordingInjector::new(), &dir);
    assert_eq!(texts(engine.entries()), vec!["persisted"]);
}

#[test]
fn test_image_entry_survives_restart() {
    let dir = TempDir::new().unwrap();
    let image = arboard::ImageData {
        width: 10,
        height: 10,
        bytes: vec![200u8; 400].into(),
    };
    let png = encode_image_to_png_bytes(&image).unwrap();
    let clipboard = MemoryClipboard::new();
    clipboard.set_snapshot(NativeSnapshot::new().with(FORMAT_IMAGE, NativeValue::Png(png.clone())));
    let options = fast_options(MonitorMode::Push);

    {
        let mut engine = engine_with(&options, &clipboard, &RecordingInjector::new(), &dir);
        assert!(engine.handle_notification().inserted_id().is_some());
        engine.shutdown();
    }

    let engine = engine_with(&options, &clipboard, &RecordingInjector::new(), &dir);
    let payload = engine.entries()[0].payload(FORMAT_IMAGE).expect("image payload");
    assert_eq!(payload.bytes, png);
}

#[test]
fn test_capture_on_start() {
    let dir = TempDir::new().unwrap();
    let clipboard = MemoryClipboard::with_text("already there");
    let options = EngineOptions {
        capture_on_start: true,
        ..fast_options(MonitorMode::Poll)
    };
    let mut engine = engine_with(&options, &clipboard, &RecordingInjector::new(), &dir);

    assert_eq!(texts(engine.entries()), vec!["already there"]);
    assert_eq!(engine.handle_tick(), CaptureOutcome::Unchanged);
}

#[test]
fn test_copy_is_not_recaptured_in_push_mode() {
    let dir = TempDir::new().unwrap();
    let clipboard = MemoryClipboard::new();
    let mut engine = engine_with(
        &fast_options(MonitorMode::Push),
        &clipboard,
        &RecordingInjector::new(),
        &dir,
    );
    engine.insert(Entry::from_text("older"));
    engine.insert(Entry::from_text("newer"));
    let older = engine.entries()[1].id().to_string();

    engine.copy(&older).expect("copy should succeed");
    assert_eq!(clipboard.text().as_deref(), Some("older"));

    // The OS delivers the notification for our own write
    assert_eq!(engine.handle_notification(), CaptureOutcome::Suppressed);
    assert_eq!(texts(engine.entries()), vec!["newer", "older"]);
}

#[test]
fn test_paste_is_not_recaptured_in_poll_mode() {
    let dir = TempDir::new().unwrap();
    let clipboard = MemoryClipboard::new();
    let injector = RecordingInjector::new();
    let mut engine = engine_with(&fast_options(MonitorMode::Poll), &clipboard, &injector, &dir);
    engine.insert(Entry::from_text("older"));
    engine.insert(Entry::from_text("newer"));
    let older = engine.entries()[1].id().to_string();

    engine.paste(&older).expect("paste should succeed");
    assert_eq!(injector.paste_count(), 1);
    assert_eq!(clipboard.text().as_deref(), Some("older"));

    assert_eq!(engine.handle_tick(), CaptureOutcome::Unchanged);
    assert_eq!(texts(engine.entries()), vec!["newer", "older"]);
}

#[test]
fn test_paste_with_busy_clipboard_reports_failure() {
    let dir = TempDir::new().unwrap();
    let clipboard = MemoryClipboard::new();
    let injector = RecordingInjector::new();
    let mut engine = engine_with(&fast_options(MonitorMode::Push), &clipboard, &injector, &dir);
    engine.insert(Entry::from_text("one"));
    engine.insert(Entry::from_text("two"));
    let before = engine.entries().to_vec();
    let events = engine.subscribe();
    let _ = drain_views(&events);

    clipboard.set_always_busy(true);
    let id = before[1].id().to_string();
    let err = engine.paste(&id).unwrap_err();

    assert!(matches!(err, ClipboardHistoryError::ClipboardBusy { .. }));
    assert_eq!(engine.entries(), before.as_slice(), "history unchanged");
    assert_eq!(injector.paste_count(), 0);
    match events.try_recv() {
        Ok(EngineEvent::PlaybackFailed { entry_id, .. }) => assert_eq!(entry_id, id),
        other => panic!("expected PlaybackFailed, got {:?}", other),
    }
}

#[test]
fn test_keystroke_failure_is_reported_separately() {
    let dir = TempDir::new().unwrap();
    let clipboard = MemoryClipboard::new();
    let mut engine = engine_with(
        &fast_options(MonitorMode::Push),
        &clipboard,
        &RecordingInjector::failing(),
        &dir,
    );
    engine.insert(Entry::from_text("paste me"));
    let id = engine.entries()[0].id().to_string();
    let events = engine.subscribe();
    let _ = drain_views(&events);

    let err = engine.paste(&id).unwrap_err();
    assert!(matches!(err, ClipboardHistoryError::KeystrokeInjection(_)));
    assert_eq!(clipboard.text().as_deref(), Some("paste me"));
    assert!(matches!(
        events.try_recv(),
        Ok(EngineEvent::PasteKeystrokeFailed { .. })
    ));
}

#[test]
fn test_copy_unknown_entry() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_with(
        &fast_options(MonitorMode::Push),
        &MemoryClipboard::new(),
        &RecordingInjector::new(),
        &dir,
    );
    assert_eq!(
        engine.copy("missing"),
        Err(ClipboardHistoryError::EntryNotFound("missing".into()))
    );
}

#[test]
fn test_subscribers_receive_filtered_view_after_each_mutation() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_with(
        &fast_options(MonitorMode::Push),
        &MemoryClipboard::new(),
        &RecordingInjector::new(),
        &dir,
    );
    let events = engine.subscribe();
    assert_eq!(drain_views(&events), vec![Vec::<String>::new()]);

    engine.set_view_filter(ViewFilter::new(false, Some("ap")));
    engine.insert(Entry::from_text("apple"));
    engine.insert(Entry::from_text("banana"));
    engine.insert(Entry::from_text("grape"));

    let views = drain_views(&events);
    assert_eq!(
        views,
        vec![
            vec![],
            vec!["apple".to_string()],
            vec!["apple".to_string()],
            vec!["grape".to_string(), "apple".to_string()],
        ]
    );
}

#[test]
fn test_dropped_subscriber_is_pruned() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_with(
        &fast_options(MonitorMode::Push),
        &MemoryClipboard::new(),
        &RecordingInjector::new(),
        &dir,
    );
    drop(engine.subscribe());
    engine.insert(Entry::from_text("x"));
    assert!(engine.subscribers.is_empty());
}

#[test]
fn test_edit_and_clear() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_with(
        &fast_options(MonitorMode::Push),
        &MemoryClipboard::new(),
        &RecordingInjector::new(),
        &dir,
    );
    engine.insert(Entry::from_text("typo"));
    let id = engine.entries()[0].id().to_string();

    engine.edit_text(&id, "fixed").unwrap();
    assert_eq!(engine.entry(&id).unwrap().text(), Some("fixed"));
    assert!(engine.edit_text("missing", "x").is_err());

    assert_eq!(engine.clear(), 1);
    assert!(Persistence::in_dir(dir.path()).load_history().is_empty());
}

#[test]
fn test_settings_are_saved_on_change() {
    let dir = TempDir::new().unwrap();
    let options = fast_options(MonitorMode::Push);
    let mut engine = engine_with(&options, &MemoryClipboard::new(), &RecordingInjector::new(), &dir);
    assert!(!engine.settings().first_run, "first run is recorded at startup");

    engine.update_settings(|s| {
        s.theme = Theme::Light;
        s.window_position = Some(WindowPosition { x: 3, y: 4 });
    });

    let loaded = Persistence::in_dir(dir.path()).load_settings();
    assert_eq!(loaded.theme, Theme::Light);
    assert_eq!(loaded.window_position, Some(WindowPosition { x: 3, y: 4 }));
    assert!(!loaded.first_run);
}

#[test]
fn test_cap_applies_to_loaded_and_captured_entries() {
    let dir = TempDir::new().unwrap();
    let options = EngineOptions {
        max_entries: Some(2),
        ..fast_options(MonitorMode::Push)
    };
    let mut engine = engine_with(&options, &MemoryClipboard::new(), &RecordingInjector::new(), &dir);
    for t in ["a", "b", "c"] {
        engine.insert(Entry::from_text(t));
    }
    assert_eq!(texts(engine.entries()), vec!["c", "b"]);
}

// ============================================================================
// Worker thread
// ============================================================================

fn spawn_handle(
    options: EngineOptions,
    clipboard: MemoryClipboard,
    dir: &TempDir,
) -> EngineHandle {
    let data_dir = dir.path().to_path_buf();
    EngineHandle::spawn(move || {
        Ok(ClipboardEngine::new(
            &options,
            Box::new(clipboard),
            Box::new(RecordingInjector::new()),
            Box::new(NoopPresenter),
            Persistence::in_dir(&data_dir),
        ))
    })
    .expect("engine should start")
}

#[test]
fn test_handle_serializes_requests() {
    let dir = TempDir::new().unwrap();
    let clipboard = MemoryClipboard::with_text("first");
    let mut handle = spawn_handle(fast_options(MonitorMode::Push), clipboard.clone(), &dir);

    handle.notify_clipboard_changed();
    handle.notify_clipboard_changed();
    // Round-trip a request so both notifications are handled before the change
    assert_eq!(handle.filtered_view(false, None).unwrap().len(), 1);
    clipboard.set_text("second");
    handle.notify_clipboard_changed();

    let view = handle.filtered_view(false, None).unwrap();
    assert_eq!(texts(&view), vec!["second", "first"]);

    let id = view[1].id().to_string();
    assert_eq!(handle.toggle_favorite(&id).unwrap(), Some(true));
    let favorites = handle.filtered_view(true, None).unwrap();
    assert_eq!(texts(&favorites), vec!["first"]);

    let prefix = &id[..8];
    assert_eq!(handle.resolve_id(prefix).unwrap().as_deref(), Some(id.as_str()));

    handle.shutdown();
    assert_eq!(
        handle.filtered_view(false, None),
        Err(ClipboardHistoryError::EngineStopped)
    );
}

#[test]
fn test_handle_shutdown_saves_history() {
    let dir = TempDir::new().unwrap();
    let mut handle = spawn_handle(fast_options(MonitorMode::Push), MemoryClipboard::new(), &dir);
    handle.insert(Entry::from_text("kept")).unwrap();
    handle
        .update_settings(|s| s.theme = Theme::Light)
        .unwrap();
    handle.shutdown();

    let persistence = Persistence::in_dir(dir.path());
    assert_eq!(texts(&persistence.load_history()), vec!["kept"]);
    assert_eq!(persistence.load_settings().theme, Theme::Light);
}

#[test]
fn test_poller_captures_changes() {
    let dir = TempDir::new().unwrap();
    let clipboard = MemoryClipboard::with_text("polled");
    let options = fast_options(MonitorMode::Poll);
    let interval = options.poll_interval;
    let mut handle = spawn_handle(options, clipboard, &dir);
    let events = handle.subscribe().unwrap();
    handle.start_polling(interval).unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    let mut captured = None;
    while captured.is_none() && std::time::Instant::now() < deadline {
        if let Ok(EngineEvent::ViewChanged(view)) = events.recv_timeout(Duration::from_millis(50)) {
            if !view.is_empty() {
                captured = Some(texts(&view));
            }
        }
    }
    assert_eq!(captured, Some(vec!["polled".to_string()]));
    handle.shutdown();
}

#[test]
fn test_failed_factory_reports_error() {
    let result = EngineHandle::spawn(|| anyhow::bail!("no clipboard"));
    let err = result.err().expect("spawn should fail");
    assert!(err.to_string().contains("no clipboard"));
}
