use crate::extensions::option::OptionExt;

use serde::de::{Error, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fmt::Formatter;

const U8_MSB_EXTRACTOR: u8 = 0x80;

const NOTE_BASE: u8 = 0x90;
const CONTROL_CHANGE_BASE: u8 = 0xB0;
const PROGRAM_CHANGE_BASE: u8 = 0xC0;

/// Renders a byte as two uppercase hex digits.
pub fn to_hex(byte: u8) -> String {
    format!("{byte:02X}")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MidiType {
    NoteOn,
    NoteOff,
    #[serde(alias = "cc")]
    ControlChange,
    ProgramChange,
}

impl MidiType {
    fn status_base(&self) -> u8 {
        match self {
            MidiType::NoteOn | MidiType::NoteOff => NOTE_BASE,
            MidiType::ControlChange => CONTROL_CHANGE_BASE,
            MidiType::ProgramChange => PROGRAM_CHANGE_BASE,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MidiType::NoteOn => "Note",
            MidiType::NoteOff => "Note Off",
            MidiType::ControlChange => "CC",
            MidiType::ProgramChange => "Program",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Status(u8);

impl Status {
    /// Upper nibble carries the message type, lower nibble the zero based channel.
    pub fn for_message(midi_type: MidiType, channel: Channel) -> Status {
        Status(midi_type.status_base() | channel.offset())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&to_hex(self.0))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct DataByte(u8);

impl DataByte {
    pub fn as_u8(&self) -> u8 {
        self.0
    }

    pub fn from_u8(db: u8) -> Option<DataByte> {
        Option::when(db & U8_MSB_EXTRACTOR == 0, || DataByte(db))
    }

    /// Caps at 0x7F instead of rejecting.
    pub fn clamped(db: u8) -> DataByte {
        DataByte(db.min(!U8_MSB_EXTRACTOR))
    }
}

impl fmt::Display for DataByte {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct DataByteVisitor;

impl<'de> Visitor<'de> for DataByteVisitor {
    type Value = DataByte;

    fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter.write_str("Expecting data byte to be u8 between 0x00 and 0x7F.")
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: Error,
    {
        let parse_res = u8::try_from(v).ok().and_then(DataByte::from_u8);

        match parse_res {
            None => Err(E::custom(format!(
                "Expecting data byte to be u8 between 0x00 and 0x7F. Got: {}.",
                v
            ))),
            Some(db) => Ok(db),
        }
    }
}

impl<'de> Deserialize<'de> for DataByte {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_u8(DataByteVisitor)
    }
}

/// MIDI channel as shown to humans, 1 to 16.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Channel(u8);

impl Channel {
    pub fn from_u8(channel: u8) -> Option<Channel> {
        Option::when((1..=16).contains(&channel), || Channel(channel))
    }

    fn offset(&self) -> u8 {
        self.0 - 1
    }
}

impl Default for Channel {
    fn default() -> Self {
        Channel(1)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct ChannelVisitor;

impl<'de> Visitor<'de> for ChannelVisitor {
    type Value = Channel;

    fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter.write_str("Expecting MIDI channel to be between 1 and 16.")
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: Error,
    {
        u8::try_from(v)
            .ok()
            .and_then(Channel::from_u8)
            .ok_or_else(|| {
                E::custom(format!(
                    "Expecting MIDI channel to be between 1 and 16. Got: {}.",
                    v
                ))
            })
    }
}

impl<'de> Deserialize<'de> for Channel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_u8(ChannelVisitor)
    }
}

/// Status byte plus first data byte, the pair a mapping document keys on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiAddress {
    pub status: Status,
    pub fst_data_byte: DataByte,
}

impl MidiAddress {
    pub fn new(midi_type: MidiType, channel: Channel, fst_data_byte: DataByte) -> MidiAddress {
        MidiAddress {
            status: Status::for_message(midi_type, channel),
            fst_data_byte,
        }
    }
}

impl fmt::Display for MidiAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, to_hex(self.fst_data_byte.as_u8()))
    }
}

#[cfg(test)]
pub(crate) fn db(value: u8) -> DataByte {
    DataByte::from_u8(value).unwrap()
}

#[cfg(test)]
pub(crate) fn ch(value: u8) -> Channel {
    Channel::from_u8(value).unwrap()
}
