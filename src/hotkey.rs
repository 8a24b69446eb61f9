//! Global key capture using evdev.
//!
//! Monitors all keyboard devices and turns key-down events into
//! [`ReaderKey`]s sent over a tokio channel. The activation key works
//! regardless of focus; the playback keys are forwarded too and the
//! controller ignores them while the reader is closed.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use evdev::{Device, EventType, InputEventKind, Key};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::HotkeyConfig;

/// Named input events consumed by the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderKey {
    Activate,
    Space,
    ShiftSpace,
    Enter,
    SpeedUp,
    SpeedDown,
}

/// Anything that can feed reader keys into the service loop.
pub trait HotkeySource: Send + 'static {
    /// Forward keys into `tx` until the source runs dry.
    fn run(self, tx: mpsc::Sender<ReaderKey>) -> impl Future<Output = ()> + Send;
}

/// Resolve a key name like "KEY_F3" to an evdev Key code.
fn resolve_key(name: &str) -> Option<Key> {
    let key = match name {
        "KEY_F1" => Key::KEY_F1,
        "KEY_F2" => Key::KEY_F2,
        "KEY_F3" => Key::KEY_F3,
        "KEY_F4" => Key::KEY_F4,
        "KEY_F5" => Key::KEY_F5,
        "KEY_F6" => Key::KEY_F6,
        "KEY_F7" => Key::KEY_F7,
        "KEY_F8" => Key::KEY_F8,
        "KEY_F9" => Key::KEY_F9,
        "KEY_F10" => Key::KEY_F10,
        "KEY_F11" => Key::KEY_F11,
        "KEY_F12" => Key::KEY_F12,
        "KEY_PAUSE" => Key::KEY_PAUSE,
        "KEY_SCROLLLOCK" => Key::KEY_SCROLLLOCK,
        "KEY_INSERT" => Key::KEY_INSERT,
        "KEY_HOME" => Key::KEY_HOME,
        "KEY_END" => Key::KEY_END,
        "KEY_ESC" => Key::KEY_ESC,
        _ => {
            warn!("Unknown key name: {name}");
            return None;
        }
    };
    Some(key)
}

/// Turns raw key transitions into reader keys, tracking held shift keys.
#[derive(Debug)]
pub struct KeyMapper {
    activate: Key,
    shift_held: [bool; 2],
}

impl KeyMapper {
    pub fn new(config: &HotkeyConfig) -> Self {
        let activate = resolve_key(&config.activate).unwrap_or_else(|| {
            warn!("Falling back to KEY_F3 for activation");
            Key::KEY_F3
        });
        Self {
            activate,
            shift_held: [false; 2],
        }
    }

    fn shift(&self) -> bool {
        self.shift_held.iter().any(|&held| held)
    }

    /// `value`: 0 = release, 1 = press, 2 = repeat.
    pub fn on_key(&mut self, key: Key, value: i32) -> Option<ReaderKey> {
        let slot = match key {
            Key::KEY_LEFTSHIFT => Some(0),
            Key::KEY_RIGHTSHIFT => Some(1),
            _ => None,
        };
        if let Some(slot) = slot {
            match value {
                1 => self.shift_held[slot] = true,
                0 => self.shift_held[slot] = false,
                _ => {}
            }
            return None;
        }

        if value != 1 {
            return None;
        }

        if key == self.activate {
            return Some(ReaderKey::Activate);
        }
        match key {
            Key::KEY_SPACE if self.shift() => Some(ReaderKey::ShiftSpace),
            Key::KEY_SPACE => Some(ReaderKey::Space),
            Key::KEY_ENTER | Key::KEY_KPENTER => Some(ReaderKey::Enter),
            Key::KEY_UP => Some(ReaderKey::SpeedUp),
            Key::KEY_DOWN => Some(ReaderKey::SpeedDown),
            _ => None,
        }
    }
}

pub struct EvdevHotkeys {
    mapper: Arc<Mutex<KeyMapper>>,
}

impl EvdevHotkeys {
    pub fn new(config: &HotkeyConfig) -> Self {
        info!("Activation key: {}", config.activate);
        Self {
            mapper: Arc::new(Mutex::new(KeyMapper::new(config))),
        }
    }

    /// Find all keyboard input devices.
    pub fn find_keyboards() -> Vec<Device> {
        let mut keyboards = Vec::new();

        for (_path, device) in evdev::enumerate() {
            if let Some(keys) = device.supported_keys() {
                if keys.contains(Key::KEY_A) && keys.contains(Key::KEY_ENTER) {
                    info!(
                        "Found keyboard: {} at {:?}",
                        device.name().unwrap_or("unknown"),
                        device.physical_path()
                    );
                    keyboards.push(device);
                }
            }
        }

        keyboards
    }

    /// Monitor a single device for key events.
    async fn monitor_device(
        device: Device,
        mapper: Arc<Mutex<KeyMapper>>,
        tx: mpsc::Sender<ReaderKey>,
    ) {
        let name = device.name().unwrap_or("unknown").to_string();
        debug!("Monitoring {name}");

        let mut events = match device.into_event_stream() {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Cannot create event stream for {name}: {e}");
                return;
            }
        };

        loop {
            match events.next_event().await {
                Ok(event) => {
                    if event.event_type() != EventType::KEY {
                        continue;
                    }
                    let InputEventKind::Key(key) = event.kind() else {
                        continue;
                    };

                    let mapped = mapper
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .on_key(key, event.value());

                    if let Some(reader_key) = mapped {
                        debug!("Key: {reader_key:?}");
                        if tx.send(reader_key).await.is_err() {
                            debug!("Key channel closed, stopping {name}");
                            break;
                        }
                    }
                }
                Err(e) => {
                    warn!("Device {name} disconnected: {e}");
                    break;
                }
            }
        }
    }
}

impl HotkeySource for EvdevHotkeys {
    /// Monitor all keyboards. Runs until all devices disconnect.
    async fn run(self, tx: mpsc::Sender<ReaderKey>) {
        let keyboards = Self::find_keyboards();
        if keyboards.is_empty() {
            warn!(
                "No keyboards found. Make sure you're in the 'input' group: \
                 sudo usermod -aG input $USER"
            );
            return;
        }

        info!("Monitoring {} keyboard(s)", keyboards.len());

        let mut handles = Vec::new();
        for device in keyboards {
            let mapper = Arc::clone(&self.mapper);
            let tx = tx.clone();
            handles.push(tokio::spawn(Self::monitor_device(device, mapper, tx)));
        }
        drop(tx);

        for handle in handles {
            let _ = handle.await;
        }
    }
}

/// Test double: replays a fixed list of keys, pausing before each one.
pub struct ScriptedKeys {
    steps: Vec<(std::time::Duration, ReaderKey)>,
    linger: std::time::Duration,
}

impl ScriptedKeys {
    /// `linger` is how long to keep the channel open after the last key.
    pub fn new(steps: Vec<(std::time::Duration, ReaderKey)>, linger: std::time::Duration) -> Self {
        Self { steps, linger }
    }
}

impl HotkeySource for ScriptedKeys {
    async fn run(self, tx: mpsc::Sender<ReaderKey>) {
        for (delay, key) in self.steps {
            tokio::time::sleep(delay).await;
            if tx.send(key).await.is_err() {
                return;
            }
        }
        tokio::time::sleep(self.linger).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> KeyMapper {
        KeyMapper::new(&HotkeyConfig::default())
    }

    #[test]
    fn default_activation_is_f3() {
        let mut m = mapper();
        assert_eq!(m.on_key(Key::KEY_F3, 1), Some(ReaderKey::Activate));
        assert_eq!(m.on_key(Key::KEY_F3, 0), None);
    }

    #[test]
    fn configured_activation_key_is_honoured() {
        let mut m = KeyMapper::new(&HotkeyConfig {
            activate: "KEY_F9".into(),
        });
        assert_eq!(m.on_key(Key::KEY_F9, 1), Some(ReaderKey::Activate));
        assert_eq!(m.on_key(Key::KEY_F3, 1), None);
    }

    #[test]
    fn unknown_activation_name_falls_back_to_f3() {
        let mut m = KeyMapper::new(&HotkeyConfig {
            activate: "KEY_NOPE".into(),
        });
        assert_eq!(m.on_key(Key::KEY_F3, 1), Some(ReaderKey::Activate));
    }

    #[test]
    fn shift_turns_space_into_shift_space() {
        let mut m = mapper();
        assert_eq!(m.on_key(Key::KEY_SPACE, 1), Some(ReaderKey::Space));
        assert_eq!(m.on_key(Key::KEY_RIGHTSHIFT, 1), None);
        assert_eq!(m.on_key(Key::KEY_SPACE, 1), Some(ReaderKey::ShiftSpace));
        assert_eq!(m.on_key(Key::KEY_RIGHTSHIFT, 0), None);
        assert_eq!(m.on_key(Key::KEY_SPACE, 1), Some(ReaderKey::Space));
    }

    #[test]
    fn either_shift_counts_until_both_released() {
        let mut m = mapper();
        m.on_key(Key::KEY_LEFTSHIFT, 1);
        m.on_key(Key::KEY_RIGHTSHIFT, 1);
        m.on_key(Key::KEY_LEFTSHIFT, 0);
        assert_eq!(m.on_key(Key::KEY_SPACE, 1), Some(ReaderKey::ShiftSpace));
    }

    #[test]
    fn repeats_and_unrelated_keys_are_ignored() {
        let mut m = mapper();
        assert_eq!(m.on_key(Key::KEY_SPACE, 2), None);
        assert_eq!(m.on_key(Key::KEY_A, 1), None);
        assert_eq!(m.on_key(Key::KEY_ENTER, 1), Some(ReaderKey::Enter));
        assert_eq!(m.on_key(Key::KEY_UP, 1), Some(ReaderKey::SpeedUp));
        assert_eq!(m.on_key(Key::KEY_DOWN, 1), Some(ReaderKey::SpeedDown));
    }
}
