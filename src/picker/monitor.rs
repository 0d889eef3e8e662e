use crate::error::HookRegistrationFault;
use crate::hotkey::{Chord, Key};
use crate::picker::display::DisplayService;
use crate::picker::hook::{InputHook, InputSink, MonitorMessage, RawInput};
use std::sync::mpsc::{channel, sync_channel, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

pub const EVENT_QUEUE_CAPACITY: usize = 64;
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    /// The commit chord was pressed; `position` is the absolute cursor
    /// position read when the trigger went down.
    ColorCommitRequested { position: (i32, i32) },
    CancelRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierState {
    Idle,
    ModifierHeld,
}

/// Modifier/trigger state machine. Owned by the monitor thread only.
#[derive(Debug)]
pub struct ChordTracker {
    chord: Chord,
    cancel_key: Option<Key>,
    state: ModifierState,
    trigger_down: bool,
}

impl ChordTracker {
    pub fn new(chord: Chord, cancel_key: Option<Key>) -> Self {
        Self {
            chord,
            cancel_key,
            state: ModifierState::Idle,
            trigger_down: false,
        }
    }

    pub fn state(&self) -> ModifierState {
        self.state
    }

    /// Feeds one key transition. `cursor` is only consulted when a commit
    /// fires.
    pub fn handle(
        &mut self,
        input: RawInput,
        cursor: impl FnOnce() -> Option<(i32, i32)>,
    ) -> Option<MonitorEvent> {
        let modifier = Key::Modifier(self.chord.modifier);
        match input {
            RawInput::KeyPress(key) if key == modifier => {
                self.state = ModifierState::ModifierHeld;
                None
            }
            RawInput::KeyRelease(key) if key == modifier => {
                self.state = ModifierState::Idle;
                None
            }
            RawInput::KeyPress(key) if key == self.chord.trigger => {
                let repeat = std::mem::replace(&mut self.trigger_down, true);
                if repeat || self.state != ModifierState::ModifierHeld {
                    return None;
                }
                match cursor() {
                    Some(position) => Some(MonitorEvent::ColorCommitRequested { position }),
                    None => {
                        tracing::warn!("commit chord pressed but cursor position is unknown");
                        None
                    }
                }
            }
            RawInput::KeyRelease(key) if key == self.chord.trigger => {
                self.trigger_down = false;
                None
            }
            RawInput::KeyPress(key) if Some(key) == self.cancel_key => {
                Some(MonitorEvent::CancelRequested)
            }
            _ => None,
        }
    }
}

/// Watches global key input on its own thread and queues
/// [`MonitorEvent`]s for the UI thread.
pub struct HotkeyMonitor {
    hook: Box<dyn InputHook>,
    control: Sender<MonitorMessage>,
    events: Receiver<MonitorEvent>,
    thread: Option<JoinHandle<()>>,
}

impl HotkeyMonitor {
    /// Installs `hook` and starts the monitor thread. On registration
    /// failure the thread is shut down again before returning.
    pub fn start(
        mut hook: Box<dyn InputHook>,
        chord: Chord,
        cancel_key: Option<Key>,
        display: Arc<dyn DisplayService>,
    ) -> Result<Self, HookRegistrationFault> {
        let (control, input_rx) = channel::<MonitorMessage>();
        let (event_tx, events) = sync_channel::<MonitorEvent>(EVENT_QUEUE_CAPACITY);

        let thread = std::thread::Builder::new()
            .name("hotkey-monitor".to_string())
            .spawn(move || {
                let mut tracker = ChordTracker::new(chord, cancel_key);
                while let Ok(message) = input_rx.recv() {
                    let input = match message {
                        MonitorMessage::Input(input) => input,
                        MonitorMessage::Shutdown => break,
                    };
                    let Some(event) = tracker.handle(input, || display.cursor_position()) else {
                        continue;
                    };
                    tracing::debug!(?event, "hotkey event");
                    match event_tx.try_send(event) {
                        Ok(()) => {}
                        Err(TrySendError::Full(event)) => {
                            tracing::warn!(?event, "hotkey event queue full; dropping event");
                        }
                        Err(TrySendError::Disconnected(_)) => break,
                    }
                }
                tracing::debug!("hotkey monitor stopped");
            })
            .map_err(|err| HookRegistrationFault(format!("spawn monitor thread: {err}")))?;

        if let Err(err) = hook.install(InputSink::new(control.clone())) {
            let _ = control.send(MonitorMessage::Shutdown);
            let _ = thread.join();
            tracing::warn!(%err, "hotkey monitor failed to start");
            return Err(err);
        }

        tracing::info!(%chord, "hotkey monitor started");
        Ok(Self {
            hook,
            control,
            events,
            thread: Some(thread),
        })
    }

    /// Queued events in delivery order.
    pub fn drain_events(&self) -> Vec<MonitorEvent> {
        self.events.try_iter().collect()
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.hook.uninstall();
        let _ = self.control.send(MonitorMessage::Shutdown);
        join_monitor_thread_with_timeout(thread);
        // Anything queued before shutdown belongs to the finished session.
        while self.events.try_recv().is_ok() {}
    }
}

impl Drop for HotkeyMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn join_monitor_thread_with_timeout(handle: JoinHandle<()>) {
    let (done_tx, done_rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let join_result = handle.join();
        let _ = done_tx.send(join_result);
    });

    match done_rx.recv_timeout(JOIN_TIMEOUT) {
        Ok(Ok(())) => {}
        Ok(Err(_)) => tracing::error!("hotkey monitor thread panicked"),
        Err(RecvTimeoutError::Timeout) => {
            tracing::error!("hotkey monitor thread join timed out");
        }
        Err(RecvTimeoutError::Disconnected) => {
            tracing::error!("hotkey monitor join channel disconnected");
        }
    }
}
