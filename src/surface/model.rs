use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::ir::model::{deserialize_code, IrCode, IrProtocol};
use crate::midi::model::{Channel, DataByte, MidiType};
use crate::surface::edit::EditError;

static MINTED: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new<S: Into<String>>(id: S) -> EntityId {
        EntityId(id.into())
    }

    /// Fresh id, unique for the lifetime of the process.
    pub fn mint() -> EntityId {
        let millis = chrono::Utc::now().timestamp_millis();
        let seq = MINTED.fetch_add(1, Ordering::Relaxed);
        EntityId(format!("{millis:x}_{seq}"))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait Entity {
    const KIND: &'static str;
    type Field;

    fn id(&self) -> &EntityId;

    fn apply(&mut self, field: Self::Field) -> Result<(), EditError>;
}

/// Insertion ordered list of entities addressed by id.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection<T>(Vec<T>);

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Collection(Vec::new())
    }
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(items: Vec<T>) -> Self {
        Collection(items)
    }
}

impl<T: Entity> Collection<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: &EntityId) -> Option<&T> {
        self.0.iter().find(|e| e.id() == id)
    }

    pub fn position(&self, id: &EntityId) -> Option<usize> {
        self.0.iter().position(|e| e.id() == id)
    }

    pub fn at(&self, index: usize) -> Option<&T> {
        self.0.get(index)
    }

    pub fn push(&mut self, entity: T) -> EntityId {
        let id = entity.id().clone();
        self.0.push(entity);
        id
    }

    pub fn remove(&mut self, id: &EntityId) -> Result<T, EditError> {
        let index = self.position(id).ok_or_else(|| unknown::<T>(id))?;
        Ok(self.0.remove(index))
    }

    pub fn retain<F: FnMut(&T) -> bool>(&mut self, keep: F) {
        self.0.retain(keep)
    }

    /// Changes one field of the entity with `id`, leaving the rest and the order untouched.
    pub fn update(&mut self, id: &EntityId, field: T::Field) -> Result<(), EditError> {
        self.0
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or_else(|| unknown::<T>(id))?
            .apply(field)
    }
}

fn unknown<T: Entity>(id: &EntityId) -> EditError {
    EditError::UnknownEntity {
        kind: T::KIND,
        id: id.clone(),
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Message types a momentary switch can send.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchMessage {
    #[default]
    NoteOn,
    #[serde(alias = "cc")]
    ControlChange,
}

impl SwitchMessage {
    pub fn midi_type(&self) -> MidiType {
        match self {
            SwitchMessage::NoteOn => MidiType::NoteOn,
            SwitchMessage::ControlChange => MidiType::ControlChange,
        }
    }
}

fn minted() -> EntityId {
    EntityId::mint()
}

/// Full velocity, the value new IR mappings start with.
pub fn full_velocity() -> DataByte {
    DataByte::clamped(127)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IrMapping {
    #[serde(default = "minted")]
    pub id: EntityId,
    #[serde(default, deserialize_with = "deserialize_code")]
    pub ir_code: Option<IrCode>,
    #[serde(default)]
    pub ir_protocol: IrProtocol,
    pub midi_type: MidiType,
    #[serde(default)]
    pub channel: Channel,
    pub data1: DataByte,
    #[serde(default = "full_velocity")]
    pub data2: DataByte,
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ButtonMapping {
    #[serde(default = "minted")]
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    pub pin: u8,
    #[serde(default)]
    pub midi_type: SwitchMessage,
    #[serde(default)]
    pub channel: Channel,
    pub data1: DataByte,
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FaderMapping {
    #[serde(default = "minted")]
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    pub pin: u8,
    #[serde(default)]
    pub channel: Channel,
    pub cc_number: DataByte,
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncoderButton {
    pub pin: u8,
    #[serde(default)]
    pub midi_type: SwitchMessage,
    #[serde(default)]
    pub channel: Channel,
    pub data1: DataByte,
}

fn unit_multiplier() -> f32 {
    1.0
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncoderMapping {
    #[serde(default = "minted")]
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    pub pin_a: u8,
    pub pin_b: u8,
    #[serde(default)]
    pub channel: Channel,
    pub cc_number: DataByte,
    #[serde(default = "unit_multiplier")]
    pub multiplier: f32,
    #[serde(default)]
    pub button: Option<EncoderButton>,
    #[serde(default)]
    pub action_rotate: Option<String>,
    #[serde(default)]
    pub action_click: Option<String>,
}

impl EncoderMapping {
    /// Pulses per detent handed to the encoder driver.
    pub fn speed(&self) -> i32 {
        (self.multiplier * 4.0).round() as i32
    }
}

pub const KEYPAD_SIZE: usize = 4;

pub type Matrix<T> = [[T; KEYPAD_SIZE]; KEYPAD_SIZE];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeypadMapping {
    #[serde(default = "minted")]
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mode: SwitchMessage,
    #[serde(default)]
    pub channel: Channel,
    pub row_pins: [u8; KEYPAD_SIZE],
    pub col_pins: [u8; KEYPAD_SIZE],
    pub values: Matrix<DataByte>,
    #[serde(default)]
    pub actions: Option<Matrix<String>>,
}

impl KeypadMapping {
    pub fn action_at(&self, row: usize, col: usize) -> &str {
        self.actions
            .as_ref()
            .map(|actions| actions[row][col].as_str())
            .unwrap_or("")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MuxArity {
    Eight,
    Sixteen,
}

impl TryFrom<u8> for MuxArity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            8 => Ok(MuxArity::Eight),
            16 => Ok(MuxArity::Sixteen),
            other => Err(format!(
                "Expecting multiplexer arity to be 8 or 16. Got: {other}."
            )),
        }
    }
}

impl From<MuxArity> for u8 {
    fn from(arity: MuxArity) -> Self {
        arity.channels()
    }
}

impl MuxArity {
    pub fn channels(&self) -> u8 {
        match self {
            MuxArity::Eight => 8,
            MuxArity::Sixteen => 16,
        }
    }

    pub fn select_pins(&self) -> usize {
        match self {
            MuxArity::Eight => 3,
            MuxArity::Sixteen => 4,
        }
    }

    /// Driver class of the matching analog multiplexer chip.
    pub fn chip(&self) -> &'static str {
        match self {
            MuxArity::Eight => "CD74HC4051",
            MuxArity::Sixteen => "CD74HC4067",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultiplexerConfig {
    #[serde(default = "minted")]
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    pub arity: MuxArity,
    pub select_pins: Vec<u8>,
    pub signal_pin: u8,
}

impl MultiplexerConfig {
    /// The select pins the chip actually uses.
    pub fn used_select_pins(&self) -> &[u8] {
        let used = self.arity.select_pins().min(self.select_pins.len());
        &self.select_pins[..used]
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuxMode {
    #[default]
    Analog,
    Digital,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MuxChannelMapping {
    #[serde(default = "minted")]
    pub id: EntityId,
    pub mux_id: EntityId,
    pub channel_index: u8,
    #[serde(default)]
    pub mode: MuxMode,
    #[serde(default)]
    pub midi_type: SwitchMessage,
    #[serde(default)]
    pub channel: Channel,
    pub data1: DataByte,
    #[serde(default)]
    pub action: Option<String>,
}

impl MuxChannelMapping {
    /// Analog channels always send CC, digital ones their configured type.
    pub fn midi_type(&self) -> MidiType {
        match self.mode {
            MuxMode::Analog => MidiType::ControlChange,
            MuxMode::Digital => self.midi_type.midi_type(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayFamily {
    #[default]
    #[serde(rename = "SH1106")]
    Sh1106,
    #[serde(rename = "SSD1306")]
    Ssd1306,
    #[serde(rename = "LCD1602")]
    Lcd1602,
    #[serde(rename = "LCD2004")]
    Lcd2004,
}

impl DisplayFamily {
    pub fn is_oled(&self) -> bool {
        matches!(self, DisplayFamily::Sh1106 | DisplayFamily::Ssd1306)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DisplayFamily::Sh1106 => "SH1106",
            DisplayFamily::Ssd1306 => "SSD1306",
            DisplayFamily::Lcd1602 => "LCD1602",
            DisplayFamily::Lcd2004 => "LCD2004",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct I2cDisplay {
    pub sda: u8,
    pub scl: u8,
    pub address: u8,
}

impl I2cDisplay {
    pub fn address_hex(&self) -> String {
        format!("0x{:02X}", self.address)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplaySettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub family: DisplayFamily,
    #[serde(default)]
    pub dual: bool,
    pub primary: I2cDisplay,
    #[serde(default)]
    pub secondary: Option<I2cDisplay>,
    #[serde(default)]
    pub inverted: bool,
    #[serde(default)]
    pub split_layout: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            enabled: false,
            family: DisplayFamily::Sh1106,
            dual: false,
            primary: I2cDisplay {
                sda: 4,
                scl: 5,
                address: 0x3C,
            },
            secondary: None,
            inverted: false,
            split_layout: true,
        }
    }
}

impl DisplaySettings {
    /// Displays that get declared: the primary, plus the secondary in dual mode.
    pub fn panels(&self) -> Vec<I2cDisplay> {
        let mut panels = vec![self.primary];
        if self.dual {
            panels.push(self.secondary.unwrap_or(I2cDisplay {
                address: self.primary.address.wrapping_add(1),
                ..self.primary
            }));
        }
        panels
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub controller_name: String,
    pub ir_pin: u8,
    pub led_feedback: bool,
    pub display: DisplaySettings,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            controller_name: "MyRP2040Controller".to_string(),
            ir_pin: 15,
            led_feedback: true,
            display: DisplaySettings::default(),
        }
    }
}

/// Everything the generators read: global settings plus every control collection.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Surface {
    #[serde(flatten)]
    pub config: GeneratorConfig,
    pub ir_mappings: Collection<IrMapping>,
    pub buttons: Collection<ButtonMapping>,
    pub faders: Collection<FaderMapping>,
    pub encoders: Collection<EncoderMapping>,
    pub keypads: Collection<KeypadMapping>,
    pub multiplexers: Collection<MultiplexerConfig>,
    pub mux_channels: Collection<MuxChannelMapping>,
}

impl Surface {
    /// Whether `channel` points at an existing multiplexer and fits its arity.
    pub fn is_wired(&self, channel: &MuxChannelMapping) -> bool {
        self.multiplexers
            .get(&channel.mux_id)
            .map_or(false, |mux| channel.channel_index < mux.arity.channels())
    }
}
