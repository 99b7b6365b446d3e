//! Capture device enumeration.
//!
//! Devices are keyed by name. When the platform supplies a description, the
//! key is `name` + [`KEY_SEPARATOR`] + `description` so identically named
//! devices stay distinguishable.

use std::collections::BTreeMap;

use crate::models::audio_models::{AudioFormat, LineInfo, MixerInfo};
use crate::models::error::LineInError;
use crate::session::capture::CaptureSession;
use crate::traits::audio_subsystem::AudioSubsystem;

/// Separator between a device name and its description in device keys.
///
/// An EM SPACE, which device names in practice never contain.
pub const KEY_SEPARATOR: char = '\u{2003}';

/// The key `list_devices` uses for `mixer`.
pub fn device_key(mixer: &MixerInfo) -> String {
    if mixer.description.is_empty() {
        mixer.name.clone()
    } else {
        format!("{}{}{}", mixer.name, KEY_SEPARATOR, mixer.description)
    }
}

/// Find the mixer a device key refers to.
///
/// An exact key match wins; otherwise the first mixer whose name equals the
/// part of the key before the separator.
pub fn resolve_mixer(subsystem: &dyn AudioSubsystem, key: &str) -> Result<MixerInfo, LineInError> {
    let mixers = subsystem.mixers();
    let name = key.split(KEY_SEPARATOR).next().unwrap_or(key);

    let exact = mixers.iter().position(|m| device_key(m) == key);
    let by_name = || mixers.iter().position(|m| m.name == name);

    exact
        .or_else(by_name)
        .map(|i| mixers[i].clone())
        .ok_or_else(|| LineInError::DeviceNotFound(key.to_string()))
}

/// All capture devices and the descriptor of their first capture line.
///
/// The set of devices is determined by the platform and may change between
/// calls. Never fails: a device the backend cannot describe is left out.
pub fn list_devices(subsystem: &dyn AudioSubsystem) -> BTreeMap<String, LineInfo> {
    let mut devices = BTreeMap::new();

    for mixer in subsystem.mixers() {
        let Some(line) = subsystem
            .target_line_info(&mixer)
            .into_iter()
            .find(LineInfo::is_capture)
        else {
            continue;
        };

        let key = device_key(&mixer);
        if devices.contains_key(&key) {
            log::debug!("Ignoring duplicate capture device {:?}", key);
            continue;
        }
        devices.insert(key, line);
    }

    devices
}

/// Capture devices that can actually be opened in `format`.
///
/// Every candidate is probed by opening and closing a real line, because
/// declared capabilities and actual open success can disagree. This is slow
/// and briefly claims each device; call it on explicit refreshes, not in a
/// polling loop.
pub fn list_devices_supporting(
    subsystem: &dyn AudioSubsystem,
    format: &AudioFormat,
) -> BTreeMap<String, LineInfo> {
    list_devices(subsystem)
        .into_iter()
        .filter(|(key, _)| match CaptureSession::probe(subsystem, *format, key) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Excluding {:?} for {}: {}", key, format, e);
                false
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDevice, MockSubsystem};
    use crate::models::audio_models::{FormatRange, LineKind};

    fn mono() -> AudioFormat {
        AudioFormat::pcm_signed(16000, 16, 1)
    }

    fn mixer(name: &str, description: &str) -> MixerInfo {
        MixerInfo {
            name: name.into(),
            description: description.into(),
            vendor: String::new(),
            index: 0,
        }
    }

    #[test]
    fn key_includes_description_when_present() {
        assert_eq!(device_key(&mixer("Mic", "")), "Mic");
        assert_eq!(device_key(&mixer("Mic", "USB")), "Mic\u{2003}USB");
    }

    #[test]
    fn resolves_exact_key_before_bare_name() {
        let subsystem = MockSubsystem::new(vec![
            MockDevice::new("Mic", vec![]).with_description("Built-in"),
            MockDevice::new("Mic", vec![]).with_description("USB"),
        ]);

        let resolved = resolve_mixer(&subsystem, "Mic\u{2003}USB").unwrap();
        assert_eq!(resolved.index, 1);

        let resolved = resolve_mixer(&subsystem, "Mic").unwrap();
        assert_eq!(resolved.index, 0);

        let resolved = resolve_mixer(&subsystem, "Mic\u{2003}Stale description").unwrap();
        assert_eq!(resolved.index, 0);
    }

    #[test]
    fn unknown_key_is_a_resolution_error() {
        let subsystem = MockSubsystem::empty();
        assert_eq!(
            resolve_mixer(&subsystem, "Nope"),
            Err(LineInError::DeviceNotFound("Nope".into()))
        );
    }

    #[test]
    fn keeps_first_capture_line_and_skips_ports() {
        let port = LineInfo {
            kind: LineKind::Port,
            formats: vec![],
            min_buffer_size: None,
            max_buffer_size: None,
        };
        let first = LineInfo::capture(vec![FormatRange::exact(&mono())]);
        let second = LineInfo::capture(vec![]);

        let subsystem = MockSubsystem::new(vec![
            MockDevice::new("Mic", vec![]).with_lines(vec![port.clone(), first.clone(), second]),
            MockDevice::new("Jack", vec![]).with_lines(vec![port]),
        ]);

        let devices = list_devices(&subsystem);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices["Mic"], first);
    }

    #[test]
    fn empty_host_yields_empty_map() {
        let subsystem = MockSubsystem::empty();
        assert!(list_devices(&subsystem).is_empty());
        assert!(list_devices_supporting(&subsystem, &mono()).is_empty());
    }

    #[test]
    fn probe_failures_are_excluded() {
        let busy = MockDevice::new("Busy", vec![FormatRange::exact(&mono())]);
        busy.line()
            .fail_open_with(LineInError::LineUnavailable("in use".into()));
        let subsystem = MockSubsystem::new(vec![
            MockDevice::new("Good", vec![FormatRange::exact(&mono())]),
            busy,
        ]);

        let all = list_devices(&subsystem);
        let supporting = list_devices_supporting(&subsystem, &mono());
        assert_eq!(all.len(), 2);
        assert_eq!(supporting.keys().collect::<Vec<_>>(), vec!["Good"]);
    }
}
