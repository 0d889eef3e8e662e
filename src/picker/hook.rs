use crate::error::HookRegistrationFault;
use crate::hotkey::Key;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

/// A raw key transition as reported by the OS input subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInput {
    KeyPress(Key),
    KeyRelease(Key),
}

#[derive(Debug)]
pub(crate) enum MonitorMessage {
    Input(RawInput),
    Shutdown,
}

/// Write end handed to an [`InputHook`]. Sending never blocks, so it is
/// safe to call from inside an OS hook callback.
#[derive(Debug, Clone)]
pub struct InputSink {
    tx: Sender<MonitorMessage>,
}

impl InputSink {
    pub(crate) fn new(tx: Sender<MonitorMessage>) -> Self {
        Self { tx }
    }

    /// Returns `false` once the monitor has gone away.
    pub fn send(&self, input: RawInput) -> bool {
        self.tx.send(MonitorMessage::Input(input)).is_ok()
    }
}

/// Source of global key events, independent of window focus.
///
/// `install` must not return until events can be delivered; after
/// `uninstall` returns no further input reaches the sink.
pub trait InputHook: Send {
    fn install(&mut self, sink: InputSink) -> Result<(), HookRegistrationFault>;
    fn uninstall(&mut self);
}

#[derive(Debug, Default)]
struct ChannelHookState {
    sink: Option<InputSink>,
    install_fault: Option<String>,
    installs: usize,
}

/// In-process [`InputHook`] driven by an [`InputInjector`].
#[derive(Debug, Clone, Default)]
pub struct ChannelHook {
    state: Arc<Mutex<ChannelHookState>>,
}

/// Test-side handle of a [`ChannelHook`].
#[derive(Debug, Clone)]
pub struct InputInjector {
    state: Arc<Mutex<ChannelHookState>>,
}

impl ChannelHook {
    pub fn new() -> (Self, InputInjector) {
        let hook = Self::default();
        let injector = InputInjector {
            state: Arc::clone(&hook.state),
        };
        (hook, injector)
    }
}

impl InputHook for ChannelHook {
    fn install(&mut self, sink: InputSink) -> Result<(), HookRegistrationFault> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| HookRegistrationFault("channel hook lock poisoned".into()))?;
        if let Some(reason) = &state.install_fault {
            return Err(HookRegistrationFault(reason.clone()));
        }
        state.sink = Some(sink);
        state.installs += 1;
        Ok(())
    }

    fn uninstall(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.sink = None;
        }
    }
}

impl InputInjector {
    /// Delivers `input` if a hook is installed. Returns whether it was.
    pub fn inject(&self, input: RawInput) -> bool {
        let Ok(state) = self.state.lock() else {
            return false;
        };
        state.sink.as_ref().is_some_and(|sink| sink.send(input))
    }

    pub fn press(&self, key: Key) -> bool {
        self.inject(RawInput::KeyPress(key))
    }

    pub fn release(&self, key: Key) -> bool {
        self.inject(RawInput::KeyRelease(key))
    }

    /// Presses then releases `key`.
    pub fn tap(&self, key: Key) -> bool {
        self.press(key) && self.release(key)
    }

    pub fn is_installed(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.sink.is_some())
            .unwrap_or(false)
    }

    /// Number of successful installs so far.
    pub fn install_count(&self) -> usize {
        self.state.lock().map(|state| state.installs).unwrap_or(0)
    }

    /// Makes subsequent installs fail, simulating a denied OS hook.
    pub fn set_install_fault(&self, reason: Option<&str>) {
        if let Ok(mut state) = self.state.lock() {
            state.install_fault = reason.map(str::to_string);
        }
    }
}

#[cfg(all(feature = "desktop", windows))]
pub use platform::{cursor_position, SystemInputHook};

#[cfg(all(feature = "desktop", not(windows)))]
pub use rdev_backend::{cursor_position, SystemInputHook};

#[cfg(all(feature = "desktop", windows))]
mod platform {
    use super::{InputHook, InputSink, RawInput};
    use crate::error::HookRegistrationFault;
    use crate::hotkey::{Key, Modifier};
    use once_cell::sync::Lazy;
    use std::sync::Mutex;
    use std::thread::JoinHandle;
    use std::time::Duration;
    use windows::Win32::Foundation::{LPARAM, LRESULT, POINT, WPARAM};
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        VK_CONTROL, VK_ESCAPE, VK_F1, VK_F12, VK_LCONTROL, VK_LMENU, VK_LSHIFT, VK_LWIN, VK_MENU,
        VK_RCONTROL, VK_RETURN, VK_RMENU, VK_RSHIFT, VK_RWIN, VK_SHIFT, VK_SPACE, VK_TAB,
    };
    use windows::Win32::UI::WindowsAndMessaging::GetCursorPos;

    static HOOK_SINK: Lazy<Mutex<Option<InputSink>>> = Lazy::new(|| Mutex::new(None));

    const READY_TIMEOUT: Duration = Duration::from_secs(2);

    #[derive(Debug)]
    struct HookThread {
        thread_id: u32,
        join: JoinHandle<()>,
    }

    /// `WH_KEYBOARD_LL` hook on a dedicated message-loop thread. Keys are
    /// observed, never swallowed.
    #[derive(Debug, Default)]
    pub struct SystemInputHook {
        hook_thread: Option<HookThread>,
    }

    impl SystemInputHook {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl InputHook for SystemInputHook {
        fn install(&mut self, sink: InputSink) -> Result<(), HookRegistrationFault> {
            if self.hook_thread.is_some() {
                return Ok(());
            }

            use windows::Win32::System::LibraryLoader::GetModuleHandleW;
            use windows::Win32::System::Threading::GetCurrentThreadId;
            use windows::Win32::UI::WindowsAndMessaging::{
                DispatchMessageW, GetMessageW, PeekMessageW, SetWindowsHookExW, TranslateMessage,
                UnhookWindowsHookEx, MSG, PM_NOREMOVE, WH_KEYBOARD_LL,
            };

            if let Ok(mut guard) = HOOK_SINK.lock() {
                *guard = Some(sink);
            }

            let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<Result<u32, String>>(1);

            let join = std::thread::Builder::new()
                .name("keyboard-hook".to_string())
                .spawn(move || {
                    let mut msg = MSG::default();
                    unsafe {
                        let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
                    }

                    let thread_id = unsafe { GetCurrentThreadId() };
                    let hmodule = match unsafe { GetModuleHandleW(None) } {
                        Ok(h) => h,
                        Err(err) => {
                            let _ = ready_tx.send(Err(err.to_string()));
                            return;
                        }
                    };

                    let keyboard_hook = match unsafe {
                        SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), hmodule, 0)
                    } {
                        Ok(h) if !h.0.is_null() => h,
                        Ok(_) => {
                            let _ = ready_tx
                                .send(Err(windows::core::Error::from_win32().to_string()));
                            return;
                        }
                        Err(err) => {
                            let _ = ready_tx.send(Err(err.to_string()));
                            return;
                        }
                    };

                    let _ = ready_tx.send(Ok(thread_id));

                    loop {
                        let r = unsafe { GetMessageW(&mut msg, None, 0, 0) };
                        if r.0 <= 0 {
                            break;
                        }
                        unsafe {
                            let _ = TranslateMessage(&msg);
                            DispatchMessageW(&msg);
                        }
                    }

                    unsafe {
                        let _ = UnhookWindowsHookEx(keyboard_hook);
                    }
                })
                .map_err(|err| HookRegistrationFault(format!("spawn hook thread: {err}")))?;

            let thread_id = match ready_rx.recv_timeout(READY_TIMEOUT) {
                Ok(Ok(thread_id)) => thread_id,
                Ok(Err(reason)) => {
                    clear_sink();
                    let _ = join.join();
                    return Err(HookRegistrationFault(reason));
                }
                Err(_) => {
                    clear_sink();
                    return Err(HookRegistrationFault(
                        "keyboard hook thread did not signal readiness".into(),
                    ));
                }
            };

            self.hook_thread = Some(HookThread { thread_id, join });
            tracing::debug!("keyboard hook installed");
            Ok(())
        }

        fn uninstall(&mut self) {
            clear_sink();

            if let Some(th) = self.hook_thread.take() {
                use windows::Win32::UI::WindowsAndMessaging::{PostThreadMessageW, WM_QUIT};
                unsafe {
                    let _ = PostThreadMessageW(th.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
                }
                let _ = th.join.join();
                tracing::debug!("keyboard hook removed");
            }
        }
    }

    impl Drop for SystemInputHook {
        fn drop(&mut self) {
            self.uninstall();
        }
    }

    fn clear_sink() {
        if let Ok(mut guard) = HOOK_SINK.lock() {
            *guard = None;
        }
    }

    pub fn cursor_position() -> Option<(i32, i32)> {
        let mut point = POINT::default();
        unsafe { GetCursorPos(&mut point) }.ok()?;
        Some((point.x, point.y))
    }

    fn map_vk(vk: u32) -> Key {
        let is = |code: windows::Win32::UI::Input::KeyboardAndMouse::VIRTUAL_KEY| vk == code.0 as u32;
        if is(VK_MENU) || is(VK_LMENU) || is(VK_RMENU) {
            Key::Modifier(Modifier::Alt)
        } else if is(VK_CONTROL) || is(VK_LCONTROL) || is(VK_RCONTROL) {
            Key::Modifier(Modifier::Control)
        } else if is(VK_SHIFT) || is(VK_LSHIFT) || is(VK_RSHIFT) {
            Key::Modifier(Modifier::Shift)
        } else if is(VK_LWIN) || is(VK_RWIN) {
            Key::Modifier(Modifier::Meta)
        } else if is(VK_ESCAPE) {
            Key::Escape
        } else if is(VK_SPACE) {
            Key::Space
        } else if is(VK_RETURN) {
            Key::Enter
        } else if is(VK_TAB) {
            Key::Tab
        } else if (VK_F1.0 as u32..=VK_F12.0 as u32).contains(&vk) {
            Key::Function((vk - VK_F1.0 as u32 + 1) as u8)
        } else if (0x30..=0x39).contains(&vk) || (0x41..=0x5A).contains(&vk) {
            Key::Char(char::from(vk as u8))
        } else {
            Key::Other
        }
    }

    unsafe extern "system" fn keyboard_hook_proc(
        n_code: i32,
        w_param: WPARAM,
        l_param: LPARAM,
    ) -> LRESULT {
        use windows::Win32::UI::WindowsAndMessaging::{
            CallNextHookEx, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, WM_KEYDOWN, WM_KEYUP,
            WM_SYSKEYDOWN, WM_SYSKEYUP,
        };

        if n_code == HC_ACTION as i32 {
            let msg = w_param.0 as u32;
            let info = unsafe { &*(l_param.0 as *const KBDLLHOOKSTRUCT) };
            let input = if msg == WM_KEYDOWN || msg == WM_SYSKEYDOWN {
                Some(RawInput::KeyPress(map_vk(info.vkCode)))
            } else if msg == WM_KEYUP || msg == WM_SYSKEYUP {
                Some(RawInput::KeyRelease(map_vk(info.vkCode)))
            } else {
                None
            };
            if let Some(input) = input {
                if let Ok(guard) = HOOK_SINK.lock() {
                    if let Some(sink) = guard.as_ref() {
                        sink.send(input);
                    }
                }
            }
        }

        CallNextHookEx(HHOOK(std::ptr::null_mut()), n_code, w_param, l_param)
    }
}

#[cfg(all(feature = "desktop", not(windows)))]
mod rdev_backend {
    use super::{InputHook, InputSink, RawInput};
    use crate::error::HookRegistrationFault;
    use crate::hotkey::{Key, Modifier};
    use once_cell::sync::Lazy;
    use rdev::{listen, Event, EventType};
    use std::sync::mpsc::{sync_channel, RecvTimeoutError};
    use std::sync::Mutex;
    use std::time::Duration;

    static HOOK_SINK: Lazy<Mutex<Option<InputSink>>> = Lazy::new(|| Mutex::new(None));
    static LAST_CURSOR: Lazy<Mutex<Option<(i32, i32)>>> = Lazy::new(|| Mutex::new(None));
    static LISTENER_STARTED: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(false));

    /// `rdev::listen` reports permission problems by returning early.
    const STARTUP_GRACE: Duration = Duration::from_millis(250);

    /// Global listener built on `rdev`. The listener thread lives for the
    /// rest of the process; uninstalling detaches the sink.
    ///
    /// Platform limitation: `rdev::listen` has no way to stop, so the
    /// OS-level hook stays registered after `uninstall` until the process
    /// exits. No input is delivered through it once detached. The Win32
    /// backend removes its hook on `uninstall`.
    #[derive(Debug, Default)]
    pub struct SystemInputHook {
        installed: bool,
    }

    impl SystemInputHook {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl InputHook for SystemInputHook {
        fn install(&mut self, sink: InputSink) -> Result<(), HookRegistrationFault> {
            ensure_listener()?;
            if let Ok(mut guard) = HOOK_SINK.lock() {
                *guard = Some(sink);
            }
            self.installed = true;
            Ok(())
        }

        fn uninstall(&mut self) {
            if !self.installed {
                return;
            }
            if let Ok(mut guard) = HOOK_SINK.lock() {
                *guard = None;
            }
            self.installed = false;
        }
    }

    impl Drop for SystemInputHook {
        fn drop(&mut self) {
            self.uninstall();
        }
    }

    fn ensure_listener() -> Result<(), HookRegistrationFault> {
        let mut started = LISTENER_STARTED
            .lock()
            .map_err(|_| HookRegistrationFault("listener state poisoned".into()))?;
        if *started {
            return Ok(());
        }

        let (failed_tx, failed_rx) = sync_channel::<String>(1);
        std::thread::Builder::new()
            .name("input-listener".to_string())
            .spawn(move || {
                if let Err(err) = listen(handle_event) {
                    tracing::error!(?err, "global input listener failed");
                    let _ = failed_tx.send(format!("{err:?}"));
                }
            })
            .map_err(|err| HookRegistrationFault(format!("spawn listener: {err}")))?;

        match failed_rx.recv_timeout(STARTUP_GRACE) {
            Ok(reason) => Err(HookRegistrationFault(reason)),
            Err(RecvTimeoutError::Disconnected) => Err(HookRegistrationFault(
                "global input listener exited".into(),
            )),
            Err(RecvTimeoutError::Timeout) => {
                *started = true;
                tracing::debug!("global input listener running");
                Ok(())
            }
        }
    }

    fn handle_event(event: Event) {
        let input = match event.event_type {
            EventType::KeyPress(key) => RawInput::KeyPress(map_key(key)),
            EventType::KeyRelease(key) => RawInput::KeyRelease(map_key(key)),
            EventType::MouseMove { x, y } => {
                if let Ok(mut guard) = LAST_CURSOR.lock() {
                    *guard = Some((x.round() as i32, y.round() as i32));
                }
                return;
            }
            _ => return,
        };
        if let Ok(guard) = HOOK_SINK.lock() {
            if let Some(sink) = guard.as_ref() {
                sink.send(input);
            }
        }
    }

    /// Last pointer position seen by the listener.
    pub fn cursor_position() -> Option<(i32, i32)> {
        LAST_CURSOR.lock().ok().and_then(|guard| *guard)
    }

    fn map_key(key: rdev::Key) -> Key {
        use rdev::Key as K;
        match key {
            K::Alt | K::AltGr => Key::Modifier(Modifier::Alt),
            K::ControlLeft | K::ControlRight => Key::Modifier(Modifier::Control),
            K::ShiftLeft | K::ShiftRight => Key::Modifier(Modifier::Shift),
            K::MetaLeft | K::MetaRight => Key::Modifier(Modifier::Meta),
            K::Escape => Key::Escape,
            K::Space => Key::Space,
            K::Return => Key::Enter,
            K::Tab => Key::Tab,
            K::Num0 => Key::Char('0'),
            K::Num1 => Key::Char('1'),
            K::Num2 => Key::Char('2'),
            K::Num3 => Key::Char('3'),
            K::Num4 => Key::Char('4'),
            K::Num5 => Key::Char('5'),
            K::Num6 => Key::Char('6'),
            K::Num7 => Key::Char('7'),
            K::Num8 => Key::Char('8'),
            K::Num9 => Key::Char('9'),
            K::KeyA => Key::Char('A'),
            K::KeyB => Key::Char('B'),
            K::KeyC => Key::Char('C'),
            K::KeyD => Key::Char('D'),
            K::KeyE => Key::Char('E'),
            K::KeyF => Key::Char('F'),
            K::KeyG => Key::Char('G'),
            K::KeyH => Key::Char('H'),
            K::KeyI => Key::Char('I'),
            K::KeyJ => Key::Char('J'),
            K::KeyK => Key::Char('K'),
            K::KeyL => Key::Char('L'),
            K::KeyM => Key::Char('M'),
            K::KeyN => Key::Char('N'),
            K::KeyO => Key::Char('O'),
            K::KeyP => Key::Char('P'),
            K::KeyQ => Key::Char('Q'),
            K::KeyR => Key::Char('R'),
            K::KeyS => Key::Char('S'),
            K::KeyT => Key::Char('T'),
            K::KeyU => Key::Char('U'),
            K::KeyV => Key::Char('V'),
            K::KeyW => Key::Char('W'),
            K::KeyX => Key::Char('X'),
            K::KeyY => Key::Char('Y'),
            K::KeyZ => Key::Char('Z'),
            K::F1 => Key::Function(1),
            K::F2 => Key::Function(2),
            K::F3 => Key::Function(3),
            K::F4 => Key::Function(4),
            K::F5 => Key::Function(5),
            K::F6 => Key::Function(6),
            K::F7 => Key::Function(7),
            K::F8 => Key::Function(8),
            K::F9 => Key::Function(9),
            K::F10 => Key::Function(10),
            K::F11 => Key::Function(11),
            K::F12 => Key::Function(12),
            _ => Key::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn injector_delivers_only_while_installed() {
        let (mut hook, injector) = ChannelHook::new();
        assert!(!injector.press(Key::Escape));

        let (tx, rx) = channel();
        hook.install(InputSink::new(tx)).expect("install");
        assert!(injector.is_installed());
        assert!(injector.tap(Key::Char('1')));
        assert!(matches!(
            rx.try_recv(),
            Ok(MonitorMessage::Input(RawInput::KeyPress(Key::Char('1'))))
        ));
        assert!(matches!(
            rx.try_recv(),
            Ok(MonitorMessage::Input(RawInput::KeyRelease(Key::Char('1'))))
        ));

        hook.uninstall();
        assert!(!injector.press(Key::Escape));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn install_fault_is_reported() {
        let (mut hook, injector) = ChannelHook::new();
        injector.set_install_fault(Some("access denied"));
        let (tx, _rx) = channel();
        assert_eq!(
            hook.install(InputSink::new(tx)),
            Err(HookRegistrationFault("access denied".into()))
        );
        assert_eq!(injector.install_count(), 0);
        assert!(!injector.is_installed());
    }
}
