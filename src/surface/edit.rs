use crate::extensions::option::LabelExt;
use crate::ir::model::{normalize_hex, IrProtocol};
use crate::midi::model::{Channel, DataByte, MidiType};
use crate::surface::model::{
    full_velocity, ButtonMapping, DisplayFamily, EncoderButton, EncoderMapping, Entity,
    EntityId, FaderMapping, I2cDisplay, IrMapping, KeypadMapping, MultiplexerConfig, MuxArity,
    MuxChannelMapping, MuxMode, Surface, SwitchMessage, KEYPAD_SIZE,
};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("No {kind} with id {id}.")]
    UnknownEntity { kind: &'static str, id: EntityId },
    #[error("Multiplexer {0} has no free channel left.")]
    MuxFull(EntityId),
    #[error("Position {index} is outside the {size} slots of this {kind}.")]
    OutOfRange {
        kind: &'static str,
        index: usize,
        size: usize,
    },
}

fn check_slot(kind: &'static str, index: usize, size: usize) -> Result<(), EditError> {
    if index < size {
        Ok(())
    } else {
        Err(EditError::OutOfRange { kind, index, size })
    }
}

fn label(action: Option<String>) -> Option<String> {
    action.filter(|a| a.non_blank().is_some())
}

#[derive(Clone, Debug)]
pub enum IrField {
    /// Raw text, normalized on apply. Unusable input clears the code.
    Code(String),
    Protocol(IrProtocol),
    MidiType(MidiType),
    Channel(Channel),
    Data1(DataByte),
    Data2(DataByte),
    Action(Option<String>),
}

impl Entity for IrMapping {
    const KIND: &'static str = "IR mapping";
    type Field = IrField;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn apply(&mut self, field: IrField) -> Result<(), EditError> {
        match field {
            IrField::Code(raw) => self.ir_code = normalize_hex(&raw),
            IrField::Protocol(protocol) => self.ir_protocol = protocol,
            IrField::MidiType(midi_type) => self.midi_type = midi_type,
            IrField::Channel(channel) => self.channel = channel,
            IrField::Data1(data1) => self.data1 = data1,
            IrField::Data2(data2) => self.data2 = data2,
            IrField::Action(action) => self.action = label(action),
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub enum ButtonField {
    Name(String),
    Pin(u8),
    MidiType(SwitchMessage),
    Channel(Channel),
    Data1(DataByte),
    Action(Option<String>),
}

impl Entity for ButtonMapping {
    const KIND: &'static str = "button";
    type Field = ButtonField;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn apply(&mut self, field: ButtonField) -> Result<(), EditError> {
        match field {
            ButtonField::Name(name) => self.name = name,
            ButtonField::Pin(pin) => self.pin = pin,
            ButtonField::MidiType(midi_type) => self.midi_type = midi_type,
            ButtonField::Channel(channel) => self.channel = channel,
            ButtonField::Data1(data1) => self.data1 = data1,
            ButtonField::Action(action) => self.action = label(action),
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub enum FaderField {
    Name(String),
    Pin(u8),
    Channel(Channel),
    CcNumber(DataByte),
    Action(Option<String>),
}

impl Entity for FaderMapping {
    const KIND: &'static str = "fader";
    type Field = FaderField;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn apply(&mut self, field: FaderField) -> Result<(), EditError> {
        match field {
            FaderField::Name(name) => self.name = name,
            FaderField::Pin(pin) => self.pin = pin,
            FaderField::Channel(channel) => self.channel = channel,
            FaderField::CcNumber(cc) => self.cc_number = cc,
            FaderField::Action(action) => self.action = label(action),
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub enum EncoderField {
    Name(String),
    PinA(u8),
    PinB(u8),
    Channel(Channel),
    CcNumber(DataByte),
    Multiplier(f32),
    Button(Option<EncoderButton>),
    ActionRotate(Option<String>),
    ActionClick(Option<String>),
}

impl Entity for EncoderMapping {
    const KIND: &'static str = "encoder";
    type Field = EncoderField;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn apply(&mut self, field: EncoderField) -> Result<(), EditError> {
        match field {
            EncoderField::Name(name) => self.name = name,
            EncoderField::PinA(pin) => self.pin_a = pin,
            EncoderField::PinB(pin) => self.pin_b = pin,
            EncoderField::Channel(channel) => self.channel = channel,
            EncoderField::CcNumber(cc) => self.cc_number = cc,
            EncoderField::Multiplier(multiplier) => self.multiplier = multiplier,
            EncoderField::Button(button) => self.button = button,
            EncoderField::ActionRotate(action) => self.action_rotate = label(action),
            EncoderField::ActionClick(action) => self.action_click = label(action),
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub enum KeypadField {
    Name(String),
    Mode(SwitchMessage),
    Channel(Channel),
    RowPin { index: usize, pin: u8 },
    ColPin { index: usize, pin: u8 },
    Value { row: usize, col: usize, value: DataByte },
    Action { row: usize, col: usize, action: String },
}

impl Entity for KeypadMapping {
    const KIND: &'static str = "keypad";
    type Field = KeypadField;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn apply(&mut self, field: KeypadField) -> Result<(), EditError> {
        match field {
            KeypadField::Name(name) => self.name = name,
            KeypadField::Mode(mode) => self.mode = mode,
            KeypadField::Channel(channel) => self.channel = channel,
            KeypadField::RowPin { index, pin } => {
                check_slot(Self::KIND, index, KEYPAD_SIZE)?;
                self.row_pins[index] = pin;
            }
            KeypadField::ColPin { index, pin } => {
                check_slot(Self::KIND, index, KEYPAD_SIZE)?;
                self.col_pins[index] = pin;
            }
            KeypadField::Value { row, col, value } => {
                check_slot(Self::KIND, row, KEYPAD_SIZE)?;
                check_slot(Self::KIND, col, KEYPAD_SIZE)?;
                self.values[row][col] = value;
            }
            KeypadField::Action { row, col, action } => {
                check_slot(Self::KIND, row, KEYPAD_SIZE)?;
                check_slot(Self::KIND, col, KEYPAD_SIZE)?;
                self.actions.get_or_insert_with(Default::default)[row][col] = action;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub enum MultiplexerField {
    Name(String),
    Arity(MuxArity),
    SelectPin { index: usize, pin: u8 },
    SignalPin(u8),
}

impl Entity for MultiplexerConfig {
    const KIND: &'static str = "multiplexer";
    type Field = MultiplexerField;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn apply(&mut self, field: MultiplexerField) -> Result<(), EditError> {
        match field {
            MultiplexerField::Name(name) => self.name = name,
            MultiplexerField::Arity(arity) => self.arity = arity,
            MultiplexerField::SelectPin { index, pin } => {
                check_slot(Self::KIND, index, MuxArity::Sixteen.select_pins())?;
                if index >= self.select_pins.len() {
                    self.select_pins.resize(index + 1, 0);
                }
                self.select_pins[index] = pin;
            }
            MultiplexerField::SignalPin(pin) => self.signal_pin = pin,
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub enum MuxChannelField {
    Mode(MuxMode),
    MidiType(SwitchMessage),
    Channel(Channel),
    Data1(DataByte),
    Action(Option<String>),
}

impl Entity for MuxChannelMapping {
    const KIND: &'static str = "multiplexer channel";
    type Field = MuxChannelField;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn apply(&mut self, field: MuxChannelField) -> Result<(), EditError> {
        match field {
            MuxChannelField::Mode(mode) => self.mode = mode,
            MuxChannelField::MidiType(midi_type) => self.midi_type = midi_type,
            MuxChannelField::Channel(channel) => self.channel = channel,
            MuxChannelField::Data1(data1) => self.data1 = data1,
            MuxChannelField::Action(action) => self.action = label(action),
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub enum ConfigField {
    ControllerName(String),
    IrPin(u8),
    LedFeedback(bool),
}

#[derive(Clone, Debug)]
pub enum DisplayField {
    Enabled(bool),
    Family(DisplayFamily),
    Dual(bool),
    Primary(I2cDisplay),
    Secondary(Option<I2cDisplay>),
    Inverted(bool),
    SplitLayout(bool),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    IrMapping,
    Button,
    Fader,
    Encoder,
    Keypad,
    Multiplexer,
    MuxChannel,
}

/// One operator change to the surface.
#[derive(Clone, Debug)]
pub enum Edit {
    Config(ConfigField),
    Display(DisplayField),
    Add(EntityKind),
    AddMuxChannel(EntityId),
    Remove(EntityKind, EntityId),
    IrMapping(EntityId, IrField),
    Button(EntityId, ButtonField),
    Fader(EntityId, FaderField),
    Encoder(EntityId, EncoderField),
    Keypad(EntityId, KeypadField),
    Multiplexer(EntityId, MultiplexerField),
    MuxChannel(EntityId, MuxChannelField),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Applied {
    Added(EntityId),
    Changed,
    Removed,
}

impl Surface {
    pub fn apply(&mut self, edit: Edit) -> Result<Applied, EditError> {
        match edit {
            Edit::Config(field) => {
                match field {
                    ConfigField::ControllerName(name) => self.config.controller_name = name,
                    ConfigField::IrPin(pin) => self.config.ir_pin = pin,
                    ConfigField::LedFeedback(on) => self.config.led_feedback = on,
                }
                Ok(Applied::Changed)
            }
            Edit::Display(field) => {
                let display = &mut self.config.display;
                match field {
                    DisplayField::Enabled(on) => display.enabled = on,
                    DisplayField::Family(family) => display.family = family,
                    DisplayField::Dual(on) => display.dual = on,
                    DisplayField::Primary(panel) => display.primary = panel,
                    DisplayField::Secondary(panel) => display.secondary = panel,
                    DisplayField::Inverted(on) => display.inverted = on,
                    DisplayField::SplitLayout(on) => display.split_layout = on,
                }
                Ok(Applied::Changed)
            }
            Edit::Add(kind) => self.add(kind).map(Applied::Added),
            Edit::AddMuxChannel(mux_id) => self.add_mux_channel(&mux_id).map(Applied::Added),
            Edit::Remove(kind, id) => self.remove(kind, &id).map(|_| Applied::Removed),
            Edit::IrMapping(id, field) => changed(self.ir_mappings.update(&id, field)),
            Edit::Button(id, field) => changed(self.buttons.update(&id, field)),
            Edit::Fader(id, field) => changed(self.faders.update(&id, field)),
            Edit::Encoder(id, field) => changed(self.encoders.update(&id, field)),
            Edit::Keypad(id, field) => changed(self.keypads.update(&id, field)),
            Edit::Multiplexer(id, field) => changed(self.multiplexers.update(&id, field)),
            Edit::MuxChannel(id, field) => changed(self.mux_channels.update(&id, field)),
        }
    }

    fn add(&mut self, kind: EntityKind) -> Result<EntityId, EditError> {
        let id = EntityId::mint();
        let added = match kind {
            EntityKind::IrMapping => self.ir_mappings.push(IrMapping {
                id,
                ir_code: None,
                ir_protocol: IrProtocol::Nec,
                midi_type: MidiType::NoteOn,
                channel: Channel::default(),
                data1: DataByte::clamped(60),
                data2: full_velocity(),
                action: None,
            }),
            EntityKind::Button => {
                let n = self.buttons.len() + 1;
                self.buttons.push(ButtonMapping {
                    id,
                    name: format!("Button {n}"),
                    pin: 0,
                    midi_type: SwitchMessage::NoteOn,
                    channel: Channel::default(),
                    data1: DataByte::clamped(60),
                    action: None,
                })
            }
            EntityKind::Fader => {
                let n = self.faders.len() + 1;
                self.faders.push(FaderMapping {
                    id,
                    name: format!("Fader {n}"),
                    pin: 26,
                    channel: Channel::default(),
                    cc_number: DataByte::clamped(1),
                    action: None,
                })
            }
            EntityKind::Encoder => self.encoders.push(EncoderMapping {
                id,
                name: "New Encoder".to_string(),
                pin_a: 10,
                pin_b: 11,
                channel: Channel::default(),
                cc_number: DataByte::clamped(20),
                multiplier: 1.0,
                button: None,
                action_rotate: None,
                action_click: None,
            }),
            EntityKind::Keypad => {
                let n = self.keypads.len() + 1;
                let mut values = [[DataByte::clamped(0); KEYPAD_SIZE]; KEYPAD_SIZE];
                for (row, cells) in values.iter_mut().enumerate() {
                    for (col, cell) in cells.iter_mut().enumerate() {
                        *cell = DataByte::clamped((36 + row * KEYPAD_SIZE + col) as u8);
                    }
                }
                self.keypads.push(KeypadMapping {
                    id,
                    name: format!("Keypad {n}"),
                    mode: SwitchMessage::NoteOn,
                    channel: Channel::default(),
                    row_pins: [2, 3, 4, 5],
                    col_pins: [6, 7, 8, 9],
                    values,
                    actions: Some(Default::default()),
                })
            }
            EntityKind::Multiplexer => {
                let n = self.multiplexers.len() + 1;
                self.multiplexers.push(MultiplexerConfig {
                    id,
                    name: format!("Multiplexer {n}"),
                    arity: MuxArity::Sixteen,
                    select_pins: vec![2, 3, 4, 5],
                    signal_pin: 26,
                })
            }
            EntityKind::MuxChannel => {
                // A channel needs a parent, use the first multiplexer or create one.
                let mux_id = match self.multiplexers.at(0) {
                    Some(mux) => mux.id.clone(),
                    None => self.add(EntityKind::Multiplexer)?,
                };
                self.add_mux_channel(&mux_id)?
            }
        };
        Ok(added)
    }

    fn add_mux_channel(&mut self, mux_id: &EntityId) -> Result<EntityId, EditError> {
        let arity = self
            .multiplexers
            .get(mux_id)
            .map(|mux| mux.arity)
            .ok_or_else(|| EditError::UnknownEntity {
                kind: MultiplexerConfig::KIND,
                id: mux_id.clone(),
            })?;
        let taken: Vec<u8> = self
            .mux_channels
            .iter()
            .filter(|c| &c.mux_id == mux_id)
            .map(|c| c.channel_index)
            .collect();
        let channel_index = (0..arity.channels())
            .find(|index| !taken.contains(index))
            .ok_or_else(|| EditError::MuxFull(mux_id.clone()))?;

        Ok(self.mux_channels.push(MuxChannelMapping {
            id: EntityId::mint(),
            mux_id: mux_id.clone(),
            channel_index,
            mode: MuxMode::Analog,
            midi_type: SwitchMessage::ControlChange,
            channel: Channel::default(),
            data1: DataByte::clamped(20 + channel_index),
            action: None,
        }))
    }

    fn remove(&mut self, kind: EntityKind, id: &EntityId) -> Result<(), EditError> {
        match kind {
            EntityKind::IrMapping => self.ir_mappings.remove(id).map(drop),
            EntityKind::Button => self.buttons.remove(id).map(drop),
            EntityKind::Fader => self.faders.remove(id).map(drop),
            EntityKind::Encoder => self.encoders.remove(id).map(drop),
            EntityKind::Keypad => self.keypads.remove(id).map(drop),
            EntityKind::Multiplexer => {
                self.multiplexers.remove(id)?;
                self.mux_channels.retain(|c| &c.mux_id != id);
                Ok(())
            }
            EntityKind::MuxChannel => self.mux_channels.remove(id).map(drop),
        }
    }
}

fn changed(result: Result<(), EditError>) -> Result<Applied, EditError> {
    result.map(|_| Applied::Changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::model::{ch, db};

    fn added(result: Result<Applied, EditError>) -> EntityId {
        match result {
            Ok(Applied::Added(id)) => id,
            other => panic!("expected an added entity, got {other:?}"),
        }
    }

    #[test]
    fn test_update_changes_one_field_and_keeps_order() {
        let mut surface = Surface::default();
        let first = added(surface.apply(Edit::Add(EntityKind::IrMapping)));
        let second = added(surface.apply(Edit::Add(EntityKind::IrMapping)));

        surface
            .apply(Edit::IrMapping(second.clone(), IrField::Data1(db(12))))
            .unwrap();

        let ids: Vec<_> = surface.ir_mappings.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec![first.clone(), second.clone()]);
        assert_eq!(surface.ir_mappings.get(&second).unwrap().data1, db(12));
        assert_eq!(surface.ir_mappings.get(&first).unwrap().data1, db(60));
        assert_eq!(surface.ir_mappings.get(&second).unwrap().data2, db(127));
    }

    #[test]
    fn test_code_edit_normalizes() {
        let mut surface = Surface::default();
        let id = added(surface.apply(Edit::Add(EntityKind::IrMapping)));

        surface
            .apply(Edit::IrMapping(id.clone(), IrField::Code("0x1a".into())))
            .unwrap();
        assert_eq!(
            surface.ir_mappings.get(&id).unwrap().ir_code.as_ref().map(|c| c.as_str()),
            Some("0x1A")
        );

        surface
            .apply(Edit::IrMapping(id.clone(), IrField::Code("zz".into())))
            .unwrap();
        assert!(surface.ir_mappings.get(&id).unwrap().ir_code.is_none());
    }

    #[test]
    fn test_unknown_id_is_reported() {
        let mut surface = Surface::default();
        let result = surface.apply(Edit::Button(
            EntityId::new("missing"),
            ButtonField::Channel(ch(2)),
        ));
        assert_eq!(
            result,
            Err(EditError::UnknownEntity {
                kind: "button",
                id: EntityId::new("missing")
            })
        );
    }

    #[test]
    fn test_defaults_follow_collection_size() {
        let mut surface = Surface::default();
        surface.apply(Edit::Add(EntityKind::Button)).unwrap();
        surface.apply(Edit::Add(EntityKind::Button)).unwrap();
        let names: Vec<_> = surface.buttons.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Button 1", "Button 2"]);
    }

    #[test]
    fn test_keypad_defaults_count_up_row_major() {
        let mut surface = Surface::default();
        let id = added(surface.apply(Edit::Add(EntityKind::Keypad)));
        let keypad = surface.keypads.get(&id).unwrap();
        assert_eq!(keypad.values[0][0], db(36));
        assert_eq!(keypad.values[1][0], db(40));
        assert_eq!(keypad.values[3][3], db(51));
    }

    #[test]
    fn test_keypad_cell_out_of_range() {
        let mut surface = Surface::default();
        let id = added(surface.apply(Edit::Add(EntityKind::Keypad)));
        let result = surface.apply(Edit::Keypad(
            id,
            KeypadField::Value {
                row: 4,
                col: 0,
                value: db(1),
            },
        ));
        assert!(matches!(result, Err(EditError::OutOfRange { index: 4, .. })));
    }

    #[test]
    fn test_mux_channels_fill_up_to_arity() {
        let mut surface = Surface::default();
        let mux = added(surface.apply(Edit::Add(EntityKind::Multiplexer)));
        surface
            .apply(Edit::Multiplexer(
                mux.clone(),
                MultiplexerField::Arity(MuxArity::Eight),
            ))
            .unwrap();

        for _ in 0..8 {
            added(surface.apply(Edit::AddMuxChannel(mux.clone())));
        }
        assert_eq!(
            surface.apply(Edit::AddMuxChannel(mux.clone())),
            Err(EditError::MuxFull(mux.clone()))
        );

        let indexes: Vec<u8> = surface.mux_channels.iter().map(|c| c.channel_index).collect();
        assert_eq!(indexes, (0..8).collect::<Vec<u8>>());
        assert_eq!(surface.mux_channels.at(3).unwrap().data1, db(23));
    }

    #[test]
    fn test_removing_mux_drops_its_channels() {
        let mut surface = Surface::default();
        let kept = added(surface.apply(Edit::Add(EntityKind::Multiplexer)));
        let dropped = added(surface.apply(Edit::Add(EntityKind::Multiplexer)));
        surface.apply(Edit::AddMuxChannel(kept.clone())).unwrap();
        surface.apply(Edit::AddMuxChannel(dropped.clone())).unwrap();

        surface
            .apply(Edit::Remove(EntityKind::Multiplexer, dropped))
            .unwrap();

        assert_eq!(surface.multiplexers.len(), 1);
        assert_eq!(surface.mux_channels.len(), 1);
        assert_eq!(surface.mux_channels.at(0).unwrap().mux_id, kept);
    }

    #[test]
    fn test_blank_action_is_cleared() {
        let mut surface = Surface::default();
        let id = added(surface.apply(Edit::Add(EntityKind::Fader)));
        surface
            .apply(Edit::Fader(id.clone(), FaderField::Action(Some(String::new()))))
            .unwrap();
        assert_eq!(surface.faders.get(&id).unwrap().action, None);
    }
}
