use screen_swatch::hotkey::{Key, Modifier};
use screen_swatch::picker::{
    ChannelHook, HookFactory, InputInjector, PixelSampler, SamplingConfig, SamplingController,
    SamplingEvent, ScreenGeometry, VirtualDesktop,
};
use screen_swatch::store::{ColorStore, SharedStore};
use screen_swatch::Color;
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

const ALT: Key = Key::Modifier(Modifier::Alt);
const ONE: Key = Key::Char('1');

struct Session {
    controller: SamplingController,
    desktop: Arc<VirtualDesktop>,
    injector: InputInjector,
    store: SharedStore,
}

fn session_with(desktop: VirtualDesktop) -> Session {
    let desktop = Arc::new(desktop);
    let store = ColorStore::open_in_memory().unwrap().shared();
    let (hook, injector) = ChannelHook::new();
    let factory: HookFactory = Box::new(move || Box::new(hook.clone()));
    let controller = SamplingController::new(
        PixelSampler::new(desktop.clone()),
        Arc::clone(&store),
        factory,
        SamplingConfig::default(),
    );
    Session {
        controller,
        desktop,
        injector,
        store,
    }
}

fn session() -> Session {
    let desktop = VirtualDesktop::new().with_display(
        ScreenGeometry::new(0, 0, 800, 600),
        true,
        Color::rgb(40, 40, 40),
    );
    desktop.set_cursor(Some((100, 100)));
    session_with(desktop)
}

fn press_chord(injector: &InputInjector) {
    assert!(injector.press(ALT));
    assert!(injector.press(ONE));
    assert!(injector.release(ONE));
    assert!(injector.release(ALT));
}

fn tick_until(
    controller: &mut SamplingController,
    done: impl Fn(&[SamplingEvent]) -> bool,
) -> Vec<SamplingEvent> {
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut events = Vec::new();
    loop {
        events.extend(controller.tick(Instant::now()));
        if done(&events) || Instant::now() >= deadline {
            return events;
        }
        sleep(Duration::from_millis(5));
    }
}

fn stored(store: &SharedStore) -> Vec<Color> {
    store
        .lock()
        .unwrap()
        .list_all()
        .unwrap()
        .into_iter()
        .map(|saved| saved.color)
        .collect()
}

#[test]
fn chord_commits_the_colour_under_the_cursor() {
    let mut s = session();
    s.desktop.set_pixel((100, 100), Color::rgb(255, 0, 128));
    s.controller.enable().unwrap();

    press_chord(&s.injector);
    let events = tick_until(&mut s.controller, |events| !events.is_empty());

    assert!(matches!(
        events.as_slice(),
        [SamplingEvent::Committed(saved)] if saved.color == Color::rgb(255, 0, 128)
    ));
    assert_eq!(stored(&s.store), vec![Color::rgb(255, 0, 128)]);
    assert_eq!(
        s.controller.last_committed().map(|saved| saved.color),
        Some(Color::rgb(255, 0, 128))
    );
    assert!(s.controller.is_active());
}

#[test]
fn commit_resamples_instead_of_reusing_the_preview() {
    let mut s = session();
    s.desktop.set_pixel((100, 100), Color::rgb(255, 0, 0));
    s.controller.enable().unwrap();
    s.controller.tick(Instant::now());
    assert_eq!(s.controller.overlay().preview, Some(Color::rgb(255, 0, 0)));

    s.desktop.set_pixel((100, 100), Color::rgb(0, 0, 255));
    press_chord(&s.injector);
    tick_until(&mut s.controller, |events| !events.is_empty());

    assert_eq!(stored(&s.store), vec![Color::rgb(0, 0, 255)]);
}

#[test]
fn commit_off_every_display_is_silently_skipped() {
    let mut s = session();
    s.desktop.set_cursor(Some((-50, -50)));
    s.controller.enable().unwrap();

    press_chord(&s.injector);
    let events = tick_until(&mut s.controller, |events| !events.is_empty());

    assert_eq!(events, vec![SamplingEvent::CommitSkipped]);
    assert!(stored(&s.store).is_empty());
    assert!(s.controller.is_active());
}

#[test]
fn disable_stops_the_monitor_and_the_preview() {
    let mut s = session();
    s.controller.enable().unwrap();
    assert!(s.injector.is_installed());

    s.controller.disable();

    assert!(!s.controller.is_active());
    assert!(!s.injector.is_installed());
    assert!(!s.injector.press(ALT));
    let t0 = Instant::now();
    assert!(s.controller.tick(t0).is_empty());
    assert!(s.controller.tick(t0 + Duration::from_secs(1)).is_empty());
    let view = s.controller.overlay();
    assert!(!view.visible);
    assert_eq!(view.preview, None);
    assert_eq!(view.label_text, None);

    s.controller.disable();
    assert!(!s.controller.is_active());
}

#[test]
fn events_queued_before_disable_are_discarded() {
    let mut s = session();
    s.controller.enable().unwrap();
    press_chord(&s.injector);
    sleep(Duration::from_millis(50));

    s.controller.disable();

    assert!(s.controller.tick(Instant::now()).is_empty());
    assert!(stored(&s.store).is_empty());
}

#[test]
fn enabling_twice_installs_one_hook() {
    let mut s = session();
    s.controller.enable().unwrap();
    s.controller.enable().unwrap();
    assert_eq!(s.injector.install_count(), 1);
}

#[test]
fn sessions_can_be_restarted() {
    let mut s = session();
    s.controller.enable().unwrap();
    s.controller.disable();
    s.controller.enable().unwrap();
    assert_eq!(s.injector.install_count(), 2);

    press_chord(&s.injector);
    let events = tick_until(&mut s.controller, |events| !events.is_empty());
    assert!(matches!(events.as_slice(), [SamplingEvent::Committed(_)]));
}

#[test]
fn denied_hook_aborts_without_side_effects() {
    let mut s = session();
    s.injector.set_install_fault(Some("access denied"));

    let err = s.controller.enable().unwrap_err();
    assert_eq!(err.0, "access denied");
    assert!(!s.controller.is_active());
    assert!(!s.controller.overlay().visible);
    assert!(s.controller.tick(Instant::now()).is_empty());

    s.injector.set_install_fault(None);
    s.controller.enable().unwrap();
    assert!(s.controller.is_active());
}

#[test]
fn cancel_key_ends_the_session() {
    let mut s = session();
    s.controller.enable().unwrap();

    assert!(s.injector.press(Key::Escape));
    let events = tick_until(&mut s.controller, |events| !events.is_empty());

    assert_eq!(events, vec![SamplingEvent::Cancelled]);
    assert!(!s.controller.is_active());
    assert!(!s.injector.is_installed());
    assert!(stored(&s.store).is_empty());
}

#[test]
fn preview_places_labels_relative_to_the_overlay() {
    let mut s = session();
    s.controller.set_label_sizes((70, 20), (190, 16));
    s.controller.enable().unwrap();
    let t0 = Instant::now();

    s.controller.tick(t0);
    let view = s.controller.overlay();
    assert!(view.visible);
    assert_eq!(view.bounds, Some(ScreenGeometry::new(0, 0, 800, 600)));
    assert_eq!(view.label_text.as_deref(), Some("#282828"));
    assert_eq!(view.instruction_text, "(ALT+1 to Pick / ESC to Cancel)");
    let placement = view.placement.unwrap();
    assert_eq!(placement.label.origin(), (115, 115));
    assert_eq!(placement.instruction.origin(), (115, 140));

    s.desktop.set_cursor(Some((790, 590)));
    s.controller.tick(t0 + Duration::from_millis(30));
    let placement = s.controller.overlay().placement.unwrap();
    assert_eq!(placement.label.origin(), (705, 555));
    assert_eq!(placement.instruction.origin(), (705, 580));
}

#[test]
fn preview_waits_for_the_timer_interval() {
    let mut s = session();
    s.controller.enable().unwrap();
    let t0 = Instant::now();
    s.controller.tick(t0);
    s.desktop.set_pixel((100, 100), Color::rgb(1, 2, 3));

    s.controller.tick(t0 + Duration::from_millis(10));
    assert_eq!(s.controller.overlay().preview, Some(Color::rgb(40, 40, 40)));

    s.controller.tick(t0 + Duration::from_millis(30));
    assert_eq!(s.controller.overlay().preview, Some(Color::rgb(1, 2, 3)));
}

#[test]
fn preview_failures_keep_the_timer_running() {
    let mut s = session();
    s.controller.enable().unwrap();
    let t0 = Instant::now();

    s.desktop.set_cursor(Some((5000, 5000)));
    s.controller.tick(t0);
    assert_eq!(s.controller.overlay().preview, None);

    s.desktop.set_cursor(Some((10, 10)));
    s.desktop.set_capture_fault(Some("denied"));
    s.controller.tick(t0 + Duration::from_millis(30));
    assert_eq!(s.controller.overlay().preview, None);
    assert!(s.controller.is_active());

    s.desktop.set_capture_fault(None);
    s.controller.tick(t0 + Duration::from_millis(60));
    assert_eq!(s.controller.overlay().preview, Some(Color::rgb(40, 40, 40)));
}

#[test]
fn preview_capture_faults_are_tracked_until_they_clear() {
    let mut s = session();
    s.controller.enable().unwrap();
    let t0 = Instant::now();

    s.desktop.set_cursor(Some((5000, 5000)));
    s.controller.tick(t0);
    assert_eq!(s.controller.preview_fault(), None);

    s.desktop.set_cursor(Some((10, 10)));
    s.desktop.set_capture_fault(Some("screen capture denied"));
    s.controller.tick(t0 + Duration::from_millis(30));
    assert_eq!(s.controller.preview_fault(), Some("screen capture denied"));
    s.controller.tick(t0 + Duration::from_millis(60));
    assert_eq!(s.controller.preview_fault(), Some("screen capture denied"));

    s.desktop.set_capture_fault(Some("display lost"));
    s.controller.tick(t0 + Duration::from_millis(90));
    assert_eq!(s.controller.preview_fault(), Some("display lost"));

    s.desktop.set_capture_fault(None);
    s.controller.tick(t0 + Duration::from_millis(120));
    assert_eq!(s.controller.preview_fault(), None);

    s.desktop.set_capture_fault(Some("denied again"));
    s.controller.tick(t0 + Duration::from_millis(150));
    s.controller.disable();
    assert_eq!(s.controller.preview_fault(), None);
}

#[test]
fn overlay_spans_every_display() {
    let desktop = VirtualDesktop::new()
        .with_display(
            ScreenGeometry::new(-1920, 0, 1920, 1080),
            false,
            Color::rgb(1, 1, 1),
        )
        .with_display(ScreenGeometry::new(0, 0, 2560, 1440), true, Color::rgb(2, 2, 2));
    desktop.set_cursor(Some((-1900, 10)));
    let mut s = session_with(desktop);
    s.controller.set_label_sizes((70, 20), (190, 16));
    s.controller.enable().unwrap();
    s.controller.tick(Instant::now());

    let view = s.controller.overlay();
    assert_eq!(view.bounds, Some(ScreenGeometry::new(-1920, 0, 4480, 1440)));
    assert_eq!(view.preview, Some(Color::rgb(1, 1, 1)));
    assert_eq!(view.placement.unwrap().label.origin(), (35, 25));
}

#[test]
fn poisoned_store_is_reported_and_sampling_continues() {
    let mut s = session();
    let store = Arc::clone(&s.store);
    let _ = std::thread::spawn(move || {
        let _guard = store.lock().unwrap();
        panic!("poison the store lock");
    })
    .join();

    s.controller.enable().unwrap();
    press_chord(&s.injector);
    let events = tick_until(&mut s.controller, |events| !events.is_empty());

    assert!(matches!(
        events.as_slice(),
        [SamplingEvent::StoreFailed(fault)] if fault.operation == "lock"
    ));
    assert!(s.controller.is_active());
}
