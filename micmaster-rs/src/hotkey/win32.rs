//! Win32 hotkey backend.
//!
//! Global hotkeys use `RegisterHotKey` on a listener thread that owns the
//! registration and pumps its own message queue. Recording uses a
//! `WH_KEYBOARD_LL` hook installed on a second thread. Both threads only
//! enqueue events for the control thread.

use super::binding::HotkeyBinding;
use super::keys::{self, Chord};
use super::service::HotkeyBackend;
use super::HotkeyError;
use crate::events::{AppEvent, EventSender};
use crate::worker::Worker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use windows::core::PCWSTR;
use windows::Win32::Foundation::{FALSE, HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, UnregisterHotKey, HOT_KEY_MODIFIERS, MOD_ALT, MOD_CONTROL, MOD_NOREPEAT,
    MOD_SHIFT, MOD_WIN,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, MsgWaitForMultipleObjects, PeekMessageW, SetWindowsHookExW,
    UnhookWindowsHookEx, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, MSG, PM_REMOVE, QS_ALLINPUT,
    WH_KEYBOARD_LL, WM_HOTKEY, WM_KEYDOWN, WM_SYSKEYDOWN,
};

const HOTKEY_ID: i32 = 1;

/// Upper bound on how long a pump waits before re-checking its stop flag.
const PUMP_WAIT_MS: u32 = 100;

/// Where the keyboard hook sends key-downs. The hook procedure is a plain
/// function pointer, so it cannot capture the sender.
static HOOK_SINK: Mutex<Option<EventSender>> = Mutex::new(None);

type Ready = mpsc::Sender<Result<(), HotkeyError>>;

pub struct Win32Hotkeys {
    hook: Option<Worker>,
    listener: Option<(HotkeyBinding, Worker)>,
}

impl Win32Hotkeys {
    pub fn new() -> Self {
        Self {
            hook: None,
            listener: None,
        }
    }

    /// Spawn `body` and wait until it reports whether its setup succeeded.
    fn spawn_ready<F>(name: &str, body: F) -> Result<Worker, HotkeyError>
    where
        F: FnOnce(Arc<AtomicBool>, Ready) + Send + 'static,
    {
        let (ready_tx, ready_rx) = mpsc::channel();
        let mut worker = Worker::spawn(name, move |running| body(running, ready_tx))
            .map_err(|e| HotkeyError::Hook(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(worker),
            Ok(Err(e)) => {
                worker.stop();
                Err(e)
            }
            Err(_) => {
                worker.stop();
                Err(HotkeyError::Hook(format!("{name} exited during setup")))
            }
        }
    }
}

impl Default for Win32Hotkeys {
    fn default() -> Self {
        Self::new()
    }
}

impl HotkeyBackend for Win32Hotkeys {
    fn install_hook(&mut self, sink: EventSender) -> Result<(), HotkeyError> {
        if self.hook.is_some() {
            return Ok(());
        }
        set_hook_sink(Some(sink));
        match Self::spawn_ready("hotkey-recorder", run_hook_pump) {
            Ok(worker) => {
                self.hook = Some(worker);
                Ok(())
            }
            Err(e) => {
                set_hook_sink(None);
                Err(e)
            }
        }
    }

    fn remove_hook(&mut self) {
        if let Some(mut worker) = self.hook.take() {
            worker.stop();
        }
        set_hook_sink(None);
    }

    fn register(&mut self, binding: &HotkeyBinding, sink: EventSender) -> Result<(), HotkeyError> {
        let chord = keys::chord_for(binding)?;
        if let Some((old, mut worker)) = self.listener.take() {
            debug!(hotkey = %old, "Replacing hotkey listener");
            worker.stop();
        }

        let label = binding.to_string();
        let worker = Self::spawn_ready("hotkey-listener", move |running, ready| {
            run_hotkey_pump(chord, &label, sink, running, ready)
        })?;
        self.listener = Some((binding.clone(), worker));
        Ok(())
    }

    fn unregister(&mut self, binding: &HotkeyBinding) -> Result<(), HotkeyError> {
        match self.listener.take() {
            Some((current, mut worker)) if &current == binding => {
                worker.stop();
                Ok(())
            }
            other => {
                self.listener = other;
                Err(HotkeyError::NotFound(binding.to_string()))
            }
        }
    }
}

fn set_hook_sink(sink: Option<EventSender>) {
    let mut guard = HOOK_SINK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = sink;
}

fn modifier_flags(chord: &Chord) -> HOT_KEY_MODIFIERS {
    let mut flags = MOD_NOREPEAT;
    if chord.modifiers.ctrl {
        flags = flags | MOD_CONTROL;
    }
    if chord.modifiers.shift {
        flags = flags | MOD_SHIFT;
    }
    if chord.modifiers.alt {
        flags = flags | MOD_ALT;
    }
    if chord.modifiers.windows {
        flags = flags | MOD_WIN;
    }
    flags
}

/// Drain the thread's message queue, waiting at most [`PUMP_WAIT_MS`].
///
/// Returns every `WM_HOTKEY` id seen.
unsafe fn pump_once() -> Vec<i32> {
    let mut hotkeys = Vec::new();
    MsgWaitForMultipleObjects(None, FALSE, PUMP_WAIT_MS, QS_ALLINPUT);

    let mut msg = MSG::default();
    while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).as_bool() {
        if msg.message == WM_HOTKEY {
            hotkeys.push(msg.wParam.0 as i32);
        }
    }
    hotkeys
}

fn run_hotkey_pump(
    chord: Chord,
    label: &str,
    sink: EventSender,
    running: Arc<AtomicBool>,
    ready: Ready,
) {
    unsafe {
        if let Err(e) = RegisterHotKey(
            HWND::default(),
            HOTKEY_ID,
            modifier_flags(&chord),
            u32::from(chord.vk),
        ) {
            let _ = ready.send(Err(HotkeyError::Registration {
                binding: label.to_string(),
                detail: e.to_string(),
            }));
            return;
        }
        let _ = ready.send(Ok(()));
        debug!(hotkey = %label, "Hotkey listener running");

        while running.load(Ordering::SeqCst) {
            for id in pump_once() {
                if id == HOTKEY_ID && sink.send(AppEvent::HotkeyTriggered).is_err() {
                    running.store(false, Ordering::SeqCst);
                }
            }
        }

        if let Err(e) = UnregisterHotKey(HWND::default(), HOTKEY_ID) {
            warn!(hotkey = %label, error = %e, "Failed to unregister hotkey");
        }
    }
}

fn run_hook_pump(running: Arc<AtomicBool>, ready: Ready) {
    unsafe {
        let hook = match GetModuleHandleW(PCWSTR::null()).and_then(|module| {
            let instance: HINSTANCE = module.into();
            SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook), instance, 0)
        }) {
            Ok(hook) => hook,
            Err(e) => {
                let _ = ready.send(Err(HotkeyError::Hook(e.to_string())));
                return;
            }
        };
        let _ = ready.send(Ok(()));

        while running.load(Ordering::SeqCst) {
            pump_once();
        }

        if let Err(e) = UnhookWindowsHookEx(hook) {
            warn!(error = %e, "Failed to remove keyboard hook");
        }
    }
}

unsafe extern "system" fn keyboard_hook(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 {
        let message = wparam.0 as u32;
        if message == WM_KEYDOWN || message == WM_SYSKEYDOWN {
            let info = &*(lparam.0 as *const KBDLLHOOKSTRUCT);
            if let Some(token) = keys::token_for_vk(info.vkCode as u16) {
                if let Ok(guard) = HOOK_SINK.lock() {
                    if let Some(sink) = guard.as_ref() {
                        let _ = sink.send(AppEvent::KeyDown(token));
                    }
                }
            }
        }
    }
    CallNextHookEx(HHOOK::default(), code, wparam, lparam)
}
