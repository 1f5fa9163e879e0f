use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::surface::model::{
    ButtonMapping, DisplaySettings, EncoderMapping, Entity, EntityId, FaderMapping,
    GeneratorConfig, IrMapping, KeypadMapping, MultiplexerConfig, MuxChannelMapping, Surface,
};

// YAML specific configuration

fn default_ir_pin() -> u8 {
    GeneratorConfig::default().ir_pin
}

fn default_led_feedback() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SurfaceDocument {
    pub controller_name: String,
    #[serde(default = "default_ir_pin")]
    pub ir_pin: u8,
    #[serde(default = "default_led_feedback")]
    pub led_feedback: bool,
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default = "Vec::new")]
    pub ir_mappings: Vec<IrMapping>,
    #[serde(default = "Vec::new")]
    pub buttons: Vec<ButtonMapping>,
    #[serde(default = "Vec::new")]
    pub faders: Vec<FaderMapping>,
    #[serde(default = "Vec::new")]
    pub encoders: Vec<EncoderMapping>,
    #[serde(default = "Vec::new")]
    pub keypads: Vec<KeypadMapping>,
    #[serde(default = "Vec::new")]
    pub multiplexers: Vec<MultiplexerConfig>,
    #[serde(default = "Vec::new")]
    pub mux_channels: Vec<MuxChannelMapping>,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Controller name must not be empty.")]
    EmptyControllerName,
    #[error("Id {id} is used by more than one {kind}.")]
    DuplicateId { kind: &'static str, id: EntityId },
    #[error("Multiplexer {mux} needs {needed} select pins, got {got}.")]
    TooFewSelectPins {
        mux: EntityId,
        needed: usize,
        got: usize,
    },
    #[error("Multiplexer channel {channel} refers to unknown multiplexer {mux}.")]
    UnknownMultiplexer { channel: EntityId, mux: EntityId },
    #[error("Multiplexer channel {channel} uses index {index}, multiplexer has {arity} channels.")]
    ChannelIndexOutOfRange {
        channel: EntityId,
        index: u8,
        arity: u8,
    },
    #[error("Multiplexer {mux} has index {index} mapped twice.")]
    DuplicateMuxChannel { mux: EntityId, index: u8 },
    #[error("Encoder {encoder} has an unusable multiplier {value}.")]
    InvalidMultiplier { encoder: EntityId, value: f32 },
}

fn unique_ids<T: Entity>(items: &[T]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    items
        .iter()
        .find(|item| !seen.insert(item.id().clone()))
        .map_or(Ok(()), |dup| {
            Err(ConfigError::DuplicateId {
                kind: T::KIND,
                id: dup.id().clone(),
            })
        })
}

fn check_multiplexers(
    multiplexers: &[MultiplexerConfig],
    channels: &[MuxChannelMapping],
) -> Result<(), ConfigError> {
    for mux in multiplexers {
        let needed = mux.arity.select_pins();
        if mux.select_pins.len() < needed {
            return Err(ConfigError::TooFewSelectPins {
                mux: mux.id.clone(),
                needed,
                got: mux.select_pins.len(),
            });
        }
    }

    let mut used = HashSet::new();
    for channel in channels {
        let mux = multiplexers
            .iter()
            .find(|m| m.id == channel.mux_id)
            .ok_or_else(|| ConfigError::UnknownMultiplexer {
                channel: channel.id.clone(),
                mux: channel.mux_id.clone(),
            })?;
        if channel.channel_index >= mux.arity.channels() {
            return Err(ConfigError::ChannelIndexOutOfRange {
                channel: channel.id.clone(),
                index: channel.channel_index,
                arity: mux.arity.channels(),
            });
        }
        if !used.insert((mux.id.clone(), channel.channel_index)) {
            return Err(ConfigError::DuplicateMuxChannel {
                mux: mux.id.clone(),
                index: channel.channel_index,
            });
        }
    }
    Ok(())
}

// Parsed part - from configuration to application specific

pub fn parse(document: SurfaceDocument) -> Result<Surface, ConfigError> {
    if document.controller_name.trim().is_empty() {
        return Err(ConfigError::EmptyControllerName);
    }
    unique_ids(&document.ir_mappings)?;
    unique_ids(&document.buttons)?;
    unique_ids(&document.faders)?;
    unique_ids(&document.encoders)?;
    unique_ids(&document.keypads)?;
    unique_ids(&document.multiplexers)?;
    unique_ids(&document.mux_channels)?;
    check_multiplexers(&document.multiplexers, &document.mux_channels)?;
    if let Some(encoder) = document
        .encoders
        .iter()
        .find(|e| !e.multiplier.is_finite() || e.multiplier <= 0.0)
    {
        return Err(ConfigError::InvalidMultiplier {
            encoder: encoder.id.clone(),
            value: encoder.multiplier,
        });
    }

    Ok(Surface {
        config: GeneratorConfig {
            controller_name: document.controller_name,
            ir_pin: document.ir_pin,
            led_feedback: document.led_feedback,
            display: document.display,
        },
        ir_mappings: document.ir_mappings.into(),
        buttons: document.buttons.into(),
        faders: document.faders.into(),
        encoders: document.encoders.into(),
        keypads: document.keypads.into(),
        multiplexers: document.multiplexers.into(),
        mux_channels: document.mux_channels.into(),
    })
}

pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> anyhow::Result<SurfaceDocument> {
    let conf_file = std::fs::File::open(path)?;
    // Workaround for merge anchors.
    // Lets repeated controls share a block of settings.
    // https://github.com/dtolnay/serde-yaml/issues/317
    let mut yaml_value: serde_yaml::Value = serde_yaml::from_reader(conf_file)?;
    yaml_value.apply_merge()?;
    Ok(serde_yaml::from_value(yaml_value)?)
}

pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Surface> {
    let path = path.as_ref();
    let surface = parse(load_from_yaml(path)?)?;
    log::info!(
        "Loaded {} from {}: {} IR mappings, {} buttons, {} faders, {} encoders, {} keypads, {} multiplexers",
        surface.config.controller_name,
        path.display(),
        surface.ir_mappings.len(),
        surface.buttons.len(),
        surface.faders.len(),
        surface.encoders.len(),
        surface.keypads.len(),
        surface.multiplexers.len(),
    );
    Ok(surface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::model::IrProtocol;
    use crate::midi::model::{ch, db, MidiType};
    use crate::surface::model::{MuxArity, MuxMode};
    use std::io::Write;

    const FULL: &str = r#"
controller_name: Deck Remote
ir_pin: 14
display:
  enabled: true
  family: LCD1602
  primary: { sda: 4, scl: 5, address: 0x27 }
ir_defaults: &ir_defaults
  midi_type: note_on
  channel: 2
  data2: 127
ir_mappings:
  - <<: *ir_defaults
    id: play
    ir_code: "45"
    data1: 60
    action: play_pause
  - <<: *ir_defaults
    id: cue
    ir_code: "0x46"
    ir_protocol: SONY
    data1: 61
  - id: unset
    midi_type: program_change
    data1: 3
buttons:
  - { name: Shift, pin: 3, midi_type: cc, data1: 64 }
multiplexers:
  - { id: m1, name: Main, arity: 8, select_pins: [2, 3, 4], signal_pin: 26 }
mux_channels:
  - { mux_id: m1, channel_index: 0, data1: 20 }
  - { mux_id: m1, channel_index: 1, mode: digital, midi_type: note_on, data1: 40 }
"#;

    fn document(yaml: &str) -> SurfaceDocument {
        let mut value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        value.apply_merge().unwrap();
        serde_yaml::from_value(value).unwrap()
    }

    fn load_text(yaml: &str) -> anyhow::Result<Surface> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        load(file.path())
    }

    #[test]
    fn test_load_full_document() {
        let surface = load_text(FULL).unwrap();

        assert_eq!(surface.config.controller_name, "Deck Remote");
        assert_eq!(surface.config.ir_pin, 14);
        assert!(surface.config.led_feedback);
        assert_eq!(surface.config.display.primary.address, 0x27);

        let play = surface.ir_mappings.at(0).unwrap();
        assert_eq!(play.id, EntityId::new("play"));
        assert_eq!(play.ir_code.as_ref().unwrap().as_str(), "0x45");
        assert_eq!(play.channel, ch(2));
        assert_eq!(play.midi_type, MidiType::NoteOn);
        assert_eq!(play.action.as_deref(), Some("play_pause"));

        let cue = surface.ir_mappings.at(1).unwrap();
        assert_eq!(cue.ir_code.as_ref().unwrap().as_str(), "0x46");
        assert_eq!(cue.ir_protocol, IrProtocol::Sony);

        let unset = surface.ir_mappings.at(2).unwrap();
        assert!(unset.ir_code.is_none());
        assert_eq!(unset.ir_protocol, IrProtocol::Nec);
        assert_eq!(unset.data2, db(127));

        assert_eq!(surface.buttons.at(0).unwrap().data1, db(64));
        assert_eq!(surface.multiplexers.at(0).unwrap().arity, MuxArity::Eight);
        assert_eq!(surface.mux_channels.at(1).unwrap().mode, MuxMode::Digital);
    }

    #[test]
    fn test_missing_ids_are_minted_uniquely() {
        let surface = load_text(FULL).unwrap();
        let first = &surface.mux_channels.at(0).unwrap().id;
        let second = &surface.mux_channels.at(1).unwrap().id;
        assert_ne!(first, second);
    }

    #[test]
    fn test_unquoted_ir_code_is_rejected() {
        let unquoted = "controller_name: x\nir_mappings:\n  - { ir_code: 45, midi_type: note_on, data1: 60 }\n";
        let error = load_text(unquoted).err().unwrap();
        assert!(format!("{error:#}").contains("quoted hex string"), "{error:#}");

        let hex = "controller_name: x\nir_mappings:\n  - { ir_code: 0x45, midi_type: note_on, data1: 60 }\n";
        assert!(load_text(hex).is_err());

        let quoted = "controller_name: x\nir_mappings:\n  - { ir_code: \"45\", midi_type: note_on, data1: 60 }\n";
        let surface = load_text(quoted).unwrap();
        let code = surface.ir_mappings.at(0).unwrap().ir_code.clone();
        assert_eq!(code.map(|c| c.to_string()).as_deref(), Some("0x45"));
    }

    #[test]
    fn test_out_of_range_channel_is_rejected() {
        let yaml = "controller_name: x\nbuttons:\n  - { pin: 1, channel: 17, data1: 1 }\n";
        assert!(load_text(yaml).is_err());
    }

    #[test]
    fn test_out_of_range_data_byte_is_rejected() {
        let yaml = "controller_name: x\nfaders:\n  - { pin: 26, cc_number: 128 }\n";
        assert!(load_text(yaml).is_err());
    }

    #[test]
    fn test_empty_controller_name() {
        let result = parse(document("controller_name: '  '"));
        assert_eq!(result.err(), Some(ConfigError::EmptyControllerName));
    }

    #[test]
    fn test_duplicate_ids() {
        let yaml = r#"
controller_name: x
faders:
  - { id: f, pin: 26, cc_number: 1 }
  - { id: f, pin: 27, cc_number: 2 }
"#;
        assert_eq!(
            parse(document(yaml)).err(),
            Some(ConfigError::DuplicateId {
                kind: "fader",
                id: EntityId::new("f")
            })
        );
    }

    #[test]
    fn test_sixteen_channel_mux_needs_four_select_pins() {
        let yaml = r#"
controller_name: x
multiplexers:
  - { id: m, arity: 16, select_pins: [2, 3, 4], signal_pin: 26 }
"#;
        assert_eq!(
            parse(document(yaml)).err(),
            Some(ConfigError::TooFewSelectPins {
                mux: EntityId::new("m"),
                needed: 4,
                got: 3
            })
        );
    }

    #[test]
    fn test_mux_channel_checks() {
        let unknown = r#"
controller_name: x
mux_channels:
  - { id: c, mux_id: nope, channel_index: 0, data1: 1 }
"#;
        assert!(matches!(
            parse(document(unknown)),
            Err(ConfigError::UnknownMultiplexer { .. })
        ));

        let out_of_range = r#"
controller_name: x
multiplexers:
  - { id: m, arity: 8, select_pins: [2, 3, 4], signal_pin: 26 }
mux_channels:
  - { id: c, mux_id: m, channel_index: 8, data1: 1 }
"#;
        assert!(matches!(
            parse(document(out_of_range)),
            Err(ConfigError::ChannelIndexOutOfRange { index: 8, arity: 8, .. })
        ));

        let twice = r#"
controller_name: x
multiplexers:
  - { id: m, arity: 8, select_pins: [2, 3, 4], signal_pin: 26 }
mux_channels:
  - { mux_id: m, channel_index: 2, data1: 1 }
  - { mux_id: m, channel_index: 2, data1: 2 }
"#;
        assert!(matches!(
            parse(document(twice)),
            Err(ConfigError::DuplicateMuxChannel { index: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_multiplier() {
        let yaml = r#"
controller_name: x
encoders:
  - { id: e, pin_a: 10, pin_b: 11, cc_number: 20, multiplier: 0 }
"#;
        assert!(matches!(
            parse(document(yaml)),
            Err(ConfigError::InvalidMultiplier { .. })
        ));
    }
}
