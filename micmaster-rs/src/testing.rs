//! Fakes for the trait seams, shared by unit tests.

use crate::app::Presenter;
use crate::audio::{
    AudioError, CaptureEndpoint, EndpointProvider, NotificationChannel, Notifier,
};
use crate::events::EventSender;
use crate::hotkey::{HotkeyBackend, HotkeyBinding, HotkeyError};
use crate::platform::{PreferencesError, StartupRegistration};
use crate::process::{ProcessEntry, ProcessError, ProcessSnapshot, ProcessSource};
use crate::settings::Theme;
use crate::update::{Download, Launcher, ReleaseFeed, ReleaseInfo, UpdateError};
use std::cell::{Cell, RefCell};
use std::ffi::OsString;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Shared state of a fake microphone.
pub struct FakeDevice {
    pub muted: Cell<bool>,
    pub volume: Cell<f32>,
    pub mute_writes: Cell<usize>,
    pub volume_writes: Cell<usize>,
    pub fail_writes: Cell<bool>,
}

impl FakeDevice {
    pub fn new(muted: bool, volume: f32) -> Rc<Self> {
        Rc::new(Self {
            muted: Cell::new(muted),
            volume: Cell::new(volume),
            mute_writes: Cell::new(0),
            volume_writes: Cell::new(0),
            fail_writes: Cell::new(false),
        })
    }
}

pub struct FakeEndpoint(Rc<FakeDevice>);

impl CaptureEndpoint for FakeEndpoint {
    fn name(&self) -> String {
        "Fake Microphone".to_string()
    }

    fn get_mute(&self) -> Result<bool, AudioError> {
        Ok(self.0.muted.get())
    }

    fn set_mute(&self, muted: bool) -> Result<(), AudioError> {
        if self.0.fail_writes.get() {
            return Err(AudioError::device("set mute", "device removed"));
        }
        self.0.mute_writes.set(self.0.mute_writes.get() + 1);
        self.0.muted.set(muted);
        Ok(())
    }

    fn get_volume(&self) -> Result<f32, AudioError> {
        Ok(self.0.volume.get())
    }

    fn set_volume(&self, level: f32) -> Result<(), AudioError> {
        if self.0.fail_writes.get() {
            return Err(AudioError::device("set volume", "device removed"));
        }
        self.0.volume_writes.set(self.0.volume_writes.get() + 1);
        self.0.volume.set(level);
        Ok(())
    }
}

pub struct FakeProvider(Rc<FakeDevice>);

impl FakeProvider {
    pub fn with(device: Rc<FakeDevice>) -> Self {
        Self(device)
    }
}

impl EndpointProvider for FakeProvider {
    fn default_capture(&self) -> Result<Box<dyn CaptureEndpoint>, AudioError> {
        Ok(Box::new(FakeEndpoint(self.0.clone())))
    }
}

#[derive(Clone, Default)]
pub struct CountingNotifier(Rc<Cell<usize>>);

impl CountingNotifier {
    pub fn count(&self) -> usize {
        self.0.get()
    }
}

impl Notifier for CountingNotifier {
    fn notify(&self, _channel: NotificationChannel, _muted: bool) {
        self.0.set(self.0.get() + 1);
    }
}

#[derive(Default)]
struct ProcessState {
    names: Vec<String>,
    snapshots: usize,
    fail_next: bool,
    clear_after: Option<usize>,
}

/// Scripted process list. Pids are far above any real pid.
#[derive(Clone, Default)]
pub struct FakeProcesses(Rc<RefCell<ProcessState>>);

impl FakeProcesses {
    pub fn with(names: &[&str]) -> Self {
        let fake = Self::default();
        fake.set(names);
        fake
    }

    pub fn set(&self, names: &[&str]) {
        self.0.borrow_mut().names = names.iter().map(|n| n.to_string()).collect();
    }

    pub fn snapshots(&self) -> usize {
        self.0.borrow().snapshots
    }

    pub fn fail_next(&self) {
        self.0.borrow_mut().fail_next = true;
    }

    /// Report an empty process list once `n` snapshots have been taken.
    pub fn clear_after(&self, n: usize) {
        self.0.borrow_mut().clear_after = Some(n);
    }
}

impl ProcessSource for FakeProcesses {
    fn snapshot(&mut self) -> Result<ProcessSnapshot, ProcessError> {
        let mut state = self.0.borrow_mut();
        if std::mem::take(&mut state.fail_next) {
            return Err(ProcessError::Enumeration("scripted failure".into()));
        }
        let taken = state.snapshots;
        state.snapshots += 1;
        if state.clear_after.is_some_and(|n| taken >= n) {
            return Ok(ProcessSnapshot::default());
        }
        let entries = state
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| ProcessEntry {
                pid: 4_000_000_000 + i as u32,
                name: name.clone(),
            })
            .collect();
        Ok(ProcessSnapshot::new(entries))
    }
}

#[derive(Default)]
struct HotkeyState {
    hook_installed: bool,
    hook_installs: usize,
    registered: Option<HotkeyBinding>,
    rejected: Vec<HotkeyBinding>,
}

#[derive(Clone, Default)]
pub struct FakeHotkeys(Rc<RefCell<HotkeyState>>);

impl FakeHotkeys {
    pub fn hook_installed(&self) -> bool {
        self.0.borrow().hook_installed
    }

    pub fn hook_installs(&self) -> usize {
        self.0.borrow().hook_installs
    }

    pub fn registered(&self) -> Option<HotkeyBinding> {
        self.0.borrow().registered.clone()
    }

    /// Make every later `register` of `binding` fail.
    pub fn reject(&self, binding: &str) {
        if let Some(binding) = HotkeyBinding::parse(binding) {
            self.0.borrow_mut().rejected.push(binding);
        }
    }

    /// Drop the registration behind the service's back.
    pub fn forget_registration(&self) {
        self.0.borrow_mut().registered = None;
    }
}

impl HotkeyBackend for FakeHotkeys {
    fn install_hook(&mut self, _sink: EventSender) -> Result<(), HotkeyError> {
        let mut state = self.0.borrow_mut();
        state.hook_installed = true;
        state.hook_installs += 1;
        Ok(())
    }

    fn remove_hook(&mut self) {
        self.0.borrow_mut().hook_installed = false;
    }

    fn register(&mut self, binding: &HotkeyBinding, _sink: EventSender) -> Result<(), HotkeyError> {
        let mut state = self.0.borrow_mut();
        if state.rejected.contains(binding) {
            return Err(HotkeyError::Registration {
                binding: binding.to_string(),
                detail: "already registered by another application".into(),
            });
        }
        state.registered = Some(binding.clone());
        Ok(())
    }

    fn unregister(&mut self, binding: &HotkeyBinding) -> Result<(), HotkeyError> {
        let mut state = self.0.borrow_mut();
        if state.registered.as_ref() != Some(binding) {
            return Err(HotkeyError::NotFound(binding.to_string()));
        }
        state.registered = None;
        Ok(())
    }
}

struct FeedState {
    version: String,
    download_url: Option<String>,
    body: Vec<u8>,
    length: Option<u64>,
    failure: Option<fn() -> UpdateError>,
}

/// Login registration that remembers the last value it was given.
#[derive(Clone, Default)]
pub struct FakeStartup(Rc<Cell<bool>>);

impl FakeStartup {
    pub fn enabled(&self) -> bool {
        self.0.get()
    }
}

impl StartupRegistration for FakeStartup {
    fn is_enabled(&self) -> Result<bool, PreferencesError> {
        Ok(self.0.get())
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), PreferencesError> {
        self.0.set(enabled);
        Ok(())
    }
}

#[derive(Clone)]
pub struct FakeFeed(Rc<RefCell<FeedState>>);

impl FakeFeed {
    pub fn new(version: &str, download_url: Option<&str>) -> Self {
        Self(Rc::new(RefCell::new(FeedState {
            version: version.to_string(),
            download_url: download_url.map(str::to_string),
            body: b"update".to_vec(),
            length: Some(6),
            failure: None,
        })))
    }

    pub fn set_version(&self, version: &str) {
        self.0.borrow_mut().version = version.to_string();
    }

    pub fn set_body(&self, body: Vec<u8>, with_length: bool) {
        let mut state = self.0.borrow_mut();
        state.length = with_length.then_some(body.len() as u64);
        state.body = body;
    }

    /// Serve `body` while claiming `length` bytes.
    pub fn set_truncated_body(&self, body: Vec<u8>, length: u64) {
        let mut state = self.0.borrow_mut();
        state.body = body;
        state.length = Some(length);
    }

    pub fn fail_with(&self, failure: fn() -> UpdateError) {
        self.0.borrow_mut().failure = Some(failure);
    }
}

impl ReleaseFeed for FakeFeed {
    fn latest(&self) -> Result<ReleaseInfo, UpdateError> {
        let state = self.0.borrow();
        if let Some(failure) = state.failure {
            return Err(failure());
        }
        Ok(ReleaseInfo {
            version: state.version.clone(),
            download_url: state.download_url.clone(),
        })
    }

    fn open(&self, _url: &str) -> Result<Download, UpdateError> {
        let state = self.0.borrow();
        Ok(Download {
            length: state.length,
            reader: Box::new(Cursor::new(state.body.clone())),
        })
    }
}

#[derive(Clone, Default)]
pub struct RecordingLauncher(Rc<RefCell<Vec<(PathBuf, Vec<OsString>)>>>);

impl RecordingLauncher {
    pub fn launches(&self) -> Vec<(PathBuf, Vec<OsString>)> {
        self.0.borrow().clone()
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, program: &Path, args: &[OsString]) -> std::io::Result<()> {
        self.0
            .borrow_mut()
            .push((program.to_path_buf(), args.to_vec()));
        Ok(())
    }
}

/// Everything a presenter was asked to show, as tagged lines.
#[derive(Clone, Default)]
pub struct RecordingPresenter(Rc<RefCell<Vec<String>>>);

impl RecordingPresenter {
    pub fn lines(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.0.borrow().iter().any(|line| line.contains(needle))
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    fn push(&self, line: String) {
        self.0.borrow_mut().push(line);
    }
}

impl Presenter for RecordingPresenter {
    fn status(&mut self, text: &str) {
        self.push(format!("status: {text}"));
    }

    fn error(&mut self, title: &str, message: &str) {
        self.push(format!("error: {title}: {message}"));
    }

    fn hotkey_label(&mut self, text: &str) {
        self.push(format!("hotkey: {text}"));
    }

    fn audio_level(&mut self, level: u8) {
        self.push(format!("level: {level}"));
    }

    fn list(&mut self, title: &str, items: &[String]) {
        self.push(format!("list: {title}: {}", items.join(", ")));
    }

    fn presentation(&mut self, theme: Theme, tray_enabled: bool) {
        self.push(format!("theme: {theme} tray: {tray_enabled}"));
    }
}
