//! Audio source discovery over PulseAudio and PipeWire.

use async_trait::async_trait;
use tracing::debug;

use crate::tool::Tool;
use crate::JamError;

/// Lists and validates the capture sources recording can use.
#[async_trait]
pub trait AudioSources: Send + Sync {
    /// Every source id currently available.
    async fn list_sources(&self) -> Result<Vec<String>, JamError>;

    /// Monitor source of the default output sink.
    async fn default_monitor(&self) -> Result<String, JamError>;

    /// Check that `id` is a known source. `role` names it in the error.
    async fn validate(&self, role: &'static str, id: &str) -> Result<(), JamError> {
        let sources = self.list_sources().await?;
        if sources.iter().any(|s| s == id) {
            Ok(())
        } else {
            Err(JamError::InvalidSource {
                role,
                id: id.to_string(),
            })
        }
    }
}

/// Sources reported by `pactl`, plus Carla/JACK ports found through `pw-cli`.
pub struct PulseAudio {
    pactl: Tool,
    pw_cli: Tool,
}

impl PulseAudio {
    pub fn new() -> Self {
        Self {
            pactl: Tool::new("pactl"),
            pw_cli: Tool::new("pw-cli"),
        }
    }

    async fn pipewire_ports(&self) -> Result<Vec<String>, JamError> {
        let output = self.pw_cli.output(["list-objects"]).await?;
        Ok(parse_pipewire_ports(&output))
    }
}

impl Default for PulseAudio {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioSources for PulseAudio {
    async fn list_sources(&self) -> Result<Vec<String>, JamError> {
        let output = self.pactl.output(["list", "short", "sources"]).await?;
        let mut sources = parse_pactl_sources(&output);

        // PipeWire is optional
        match self.pipewire_ports().await {
            Ok(ports) => sources.extend(ports),
            Err(e) => debug!("Skipping PipeWire ports: {}", e),
        }

        Ok(sources)
    }

    async fn default_monitor(&self) -> Result<String, JamError> {
        let sink = self.pactl.output(["get-default-sink"]).await?;
        Ok(format!("{}.monitor", sink.trim()))
    }
}

/// Source names from `pactl list short sources` (second column).
pub fn parse_pactl_sources(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}

/// Carla/JACK audio output ports from `pw-cli list-objects`.
///
/// Ports are read from `object.path = "..."` lines; MIDI event ports are
/// skipped.
pub fn parse_pipewire_ports(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| {
            line.contains("object.path") && (line.contains("Carla") || line.contains("JACK"))
        })
        .filter_map(|line| {
            let start = line.find('"')? + 1;
            let len = line[start..].find('"')?;
            Some(&line[start..start + len])
        })
        .filter(|port| {
            (port.contains("output") && !port.contains("events")) || port.contains("audio-out")
        })
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fixed source list for exercising callers without a sound server.
    pub(crate) struct FakeSources {
        pub sources: Vec<String>,
        pub monitor: String,
    }

    impl FakeSources {
        pub(crate) fn new(sources: &[&str], monitor: &str) -> Self {
            Self {
                sources: sources.iter().map(|s| s.to_string()).collect(),
                monitor: monitor.to_string(),
            }
        }
    }

    #[async_trait]
    impl AudioSources for FakeSources {
        async fn list_sources(&self) -> Result<Vec<String>, JamError> {
            Ok(self.sources.clone())
        }

        async fn default_monitor(&self) -> Result<String, JamError> {
            Ok(self.monitor.clone())
        }
    }

    #[test]
    fn test_parse_pactl_sources() {
        let output = "\
48\talsa_output.pci-0000_00_1f.3.analog-stereo.monitor\tPipeWire\ts32le 2ch 48000Hz\tSUSPENDED
49\talsa_input.usb-Focusrite_Scarlett_2i2-00.analog-stereo\tPipeWire\ts32le 2ch 48000Hz\tRUNNING

";
        assert_eq!(
            parse_pactl_sources(output),
            vec![
                "alsa_output.pci-0000_00_1f.3.analog-stereo.monitor",
                "alsa_input.usb-Focusrite_Scarlett_2i2-00.analog-stereo",
            ]
        );
    }

    #[test]
    fn test_parse_pipewire_ports() {
        let output = r#"
	id 61, type PipeWire:Interface:Port/3
 		object.path = "Carla:output_1"
	id 62, type PipeWire:Interface:Port/3
 		object.path = "Carla:events-out"
	id 63, type PipeWire:Interface:Port/3
 		object.path = "Carla-Patchbay_1:audio-out1"
	id 64, type PipeWire:Interface:Port/3
 		object.path = "alsa:pcm:0:front:0:playback"
	id 65, type PipeWire:Interface:Port/3
 		object.path = "JACK:output_events"
"#;
        assert_eq!(
            parse_pipewire_ports(output),
            vec!["Carla:output_1", "Carla-Patchbay_1:audio-out1"]
        );
    }

    #[tokio::test]
    async fn test_validate_uses_listing() {
        let sources = FakeSources::new(&["guitar", "sink.monitor"], "sink.monitor");
        assert!(sources.validate("guitar", "guitar").await.is_ok());

        let err = sources.validate("monitor", "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "invalid monitor input: source nope not found");
    }
}
