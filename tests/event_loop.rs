mod common;
use crate::common::builders::WatcherConfigBuilder;
use crate::common::init_tracing;
use crate::common::recording::RecordingTarget;
use crate::common::with_timeout;

use std::sync::Arc;
use std::time::Duration;

use notify::event::{
    AccessKind, CreateKind, DataChange, EventKind, MetadataKind, ModifyKind, RemoveKind,
    RenameMode,
};
use notify::Event;
use tokio::sync::mpsc;
use tokio::time::sleep;

use observer::errors::ObserverError;
use observer::fs::mock::MockFileSystem;
use observer::watch::{changed_paths, is_write_or_create, ChangeDebouncer, EventLoop, FileFilter};

fn event(kind: EventKind, path: &str) -> notify::Result<Event> {
    Ok(Event::new(kind).add_path(path.into()))
}

fn write(path: &str) -> notify::Result<Event> {
    event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), path)
}

/// Event loop over a mock tree with one `.go` watcher ignoring `/vendor/`.
fn setup() -> (
    EventLoop,
    mpsc::UnboundedSender<notify::Result<Event>>,
    RecordingTarget,
) {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/main.go");
    fs.add_file("/proj/vendor/x.go");
    fs.add_file("/proj/README.md");

    let spec = WatcherConfigBuilder::new("go build")
        .label("api")
        .extension(".go")
        .ignore_pattern("/vendor/")
        .spec();

    let target = RecordingTarget::new();
    let debouncer = ChangeDebouncer::new(spec.rebuild_delay, Arc::new(target.clone()));
    let filter = FileFilter::new(&spec, Arc::new(fs));
    let (tx, rx) = mpsc::unbounded_channel();

    (
        EventLoop::new(spec.label.clone(), None, rx, filter, debouncer),
        tx,
        target,
    )
}

#[test]
fn only_writes_and_creates_qualify() {
    assert!(is_write_or_create(&EventKind::Create(CreateKind::File)));
    assert!(is_write_or_create(&EventKind::Modify(ModifyKind::Data(DataChange::Any))));
    assert!(is_write_or_create(&EventKind::Modify(ModifyKind::Any)));
    assert!(is_write_or_create(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime))));

    assert!(is_write_or_create(&EventKind::Modify(ModifyKind::Name(RenameMode::To))));
    assert!(is_write_or_create(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))));

    assert!(!is_write_or_create(&EventKind::Remove(RemoveKind::File)));
    assert!(!is_write_or_create(&EventKind::Modify(ModifyKind::Name(RenameMode::From))));
    assert!(!is_write_or_create(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions))));
    assert!(!is_write_or_create(&EventKind::Access(AccessKind::Any)));
}

#[tokio::test]
async fn handle_event_filters_kind_and_path() {
    init_tracing();
    let (event_loop, _tx, _target) = setup();

    let ok = |r: notify::Result<Event>| r.unwrap();

    assert!(event_loop.handle_event(&ok(write("/proj/main.go"))));
    assert!(!event_loop.handle_event(&ok(write("/proj/vendor/x.go"))));
    assert!(!event_loop.handle_event(&ok(write("/proj/README.md"))));
    assert!(!event_loop.handle_event(&ok(event(
        EventKind::Remove(RemoveKind::File),
        "/proj/main.go"
    ))));
    // Write reported for a file that is already gone.
    assert!(!event_loop.handle_event(&ok(write("/proj/gone.go"))));
}

#[tokio::test]
async fn vendor_writes_never_trigger() {
    let (event_loop, tx, target) = setup();
    let task = tokio::spawn(event_loop.run());

    tx.send(write("/proj/vendor/x.go")).unwrap();
    tx.send(event(EventKind::Create(CreateKind::File), "/proj/vendor/x.go"))
        .unwrap();
    sleep(Duration::from_millis(800)).await;
    assert_eq!(target.count(), 0);

    drop(tx);
    with_timeout(task).await.unwrap().unwrap();
}

#[tokio::test]
async fn burst_of_events_causes_one_rebuild() {
    let (event_loop, tx, target) = setup();
    let task = tokio::spawn(event_loop.run());

    tx.send(write("/proj/main.go")).unwrap();
    sleep(Duration::from_millis(50)).await;
    tx.send(event(EventKind::Create(CreateKind::File), "/proj/main.go"))
        .unwrap();
    sleep(Duration::from_millis(50)).await;
    tx.send(write("/proj/main.go")).unwrap();

    sleep(Duration::from_millis(800)).await;
    assert_eq!(target.count(), 1);

    drop(tx);
    with_timeout(task).await.unwrap().unwrap();
}

#[tokio::test]
async fn subscription_error_ends_the_loop() {
    init_tracing();
    let (event_loop, tx, target) = setup();
    let task = tokio::spawn(event_loop.run());

    tx.send(Err(notify::Error::generic("inotify queue overflow")))
        .unwrap();

    let result = with_timeout(task).await.unwrap();
    match result {
        Err(ObserverError::WatchSubscription { watcher, .. }) => assert_eq!(watcher, "api"),
        other => panic!("expected WatchSubscription, got {other:?}"),
    }
    assert!(ObserverError::WatchSubscription {
        watcher: "api".into(),
        source: notify::Error::generic("x"),
    }
    .is_fatal());
    assert_eq!(target.count(), 0);
}

fn rename(mode: RenameMode, paths: &[&str]) -> Event {
    paths.iter().fold(
        Event::new(EventKind::Modify(ModifyKind::Name(mode))),
        |event, p| event.add_path(p.into()),
    )
}

#[test]
fn rename_counts_only_its_destination() {
    let both = rename(RenameMode::Both, &["/proj/.main.go.swp", "/proj/main.go"]);
    assert_eq!(changed_paths(&both), &[std::path::PathBuf::from("/proj/main.go")]);

    let to = rename(RenameMode::To, &["/proj/main.go"]);
    assert_eq!(changed_paths(&to).len(), 1);

    let from = rename(RenameMode::From, &["/proj/main.go"]);
    assert!(changed_paths(&from).is_empty());
}

#[tokio::test]
async fn file_renamed_into_place_triggers() {
    init_tracing();
    let (event_loop, _tx, _target) = setup();

    // Editor-style save: a temporary file is moved over main.go.
    assert!(event_loop.handle_event(&rename(
        RenameMode::Both,
        &["/proj/.main.go.tmp123", "/proj/main.go"]
    )));
    assert!(event_loop.handle_event(&rename(RenameMode::To, &["/proj/main.go"])));

    // Moving main.go away never triggers, even though the old name is a
    // qualifying file.
    assert!(!event_loop.handle_event(&rename(
        RenameMode::Both,
        &["/proj/main.go", "/proj/README.md"]
    )));
    assert!(!event_loop.handle_event(&rename(RenameMode::From, &["/proj/main.go"])));
}
