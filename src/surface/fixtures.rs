use crate::ir::model::{normalize_hex, IrProtocol};
use crate::midi::model::{ch, db, MidiType};
use crate::surface::model::{
    ButtonMapping, EncoderButton, EncoderMapping, EntityId, FaderMapping, IrMapping,
    KeypadMapping, MultiplexerConfig, MuxArity, MuxChannelMapping, MuxMode, Surface,
    SwitchMessage,
};

pub fn ir(id: &str, code: &str, protocol: IrProtocol, data1: u8) -> IrMapping {
    IrMapping {
        id: EntityId::new(id),
        ir_code: normalize_hex(code),
        ir_protocol: protocol,
        midi_type: MidiType::NoteOn,
        channel: ch(1),
        data1: db(data1),
        data2: db(127),
        action: None,
    }
}

pub fn button(id: &str, name: &str, pin: u8, data1: u8) -> ButtonMapping {
    ButtonMapping {
        id: EntityId::new(id),
        name: name.to_string(),
        pin,
        midi_type: SwitchMessage::NoteOn,
        channel: ch(1),
        data1: db(data1),
        action: None,
    }
}

/// A controller using every kind of control once or twice.
pub fn deck_remote() -> Surface {
    let mut surface = Surface::default();
    surface.config.controller_name = "Deck Remote".to_string();

    let mut play = ir("play", "0x45", IrProtocol::Nec, 60);
    play.action = Some("play_pause".to_string());
    let mut cue = ir("cue", "46", IrProtocol::Sony, 61);
    cue.midi_type = MidiType::ControlChange;
    cue.channel = ch(2);
    let unset = ir("unset", "", IrProtocol::Nec, 62);
    let mut preset = ir("preset", "0x47", IrProtocol::Rc5, 3);
    preset.midi_type = MidiType::ProgramChange;
    for mapping in [play, cue, unset, preset] {
        surface.ir_mappings.push(mapping);
    }

    let mut shift = button("shift", "Shift Key", 3, 64);
    shift.midi_type = SwitchMessage::ControlChange;
    shift.action = Some("sync".to_string());
    surface.buttons.push(shift);

    surface.faders.push(FaderMapping {
        id: EntityId::new("volume"),
        name: "Volume".to_string(),
        pin: 27,
        channel: ch(1),
        cc_number: db(7),
        action: Some("volume".to_string()),
    });

    surface.encoders.push(EncoderMapping {
        id: EntityId::new("browse"),
        name: "Browse".to_string(),
        pin_a: 10,
        pin_b: 11,
        channel: ch(1),
        cc_number: db(20),
        multiplier: 1.5,
        button: Some(EncoderButton {
            pin: 12,
            midi_type: SwitchMessage::NoteOn,
            channel: ch(1),
            data1: db(21),
        }),
        action_rotate: None,
        action_click: Some("load".to_string()),
    });

    let mut values = [[db(0); 4]; 4];
    for (row, cells) in values.iter_mut().enumerate() {
        for (col, cell) in cells.iter_mut().enumerate() {
            *cell = db(36 + (row * 4 + col) as u8);
        }
    }
    let mut actions: [[String; 4]; 4] = Default::default();
    actions[0][0] = "hotcue 1".to_string();
    surface.keypads.push(KeypadMapping {
        id: EntityId::new("pads"),
        name: "Pads".to_string(),
        mode: SwitchMessage::NoteOn,
        channel: ch(3),
        row_pins: [2, 3, 4, 5],
        col_pins: [6, 7, 8, 9],
        values,
        actions: Some(actions),
    });

    surface.multiplexers.push(MultiplexerConfig {
        id: EntityId::new("m1"),
        name: "Main Mux".to_string(),
        arity: MuxArity::Eight,
        select_pins: vec![16, 17, 18, 19],
        signal_pin: 26,
    });
    surface.mux_channels.push(MuxChannelMapping {
        id: EntityId::new("eq_low"),
        mux_id: EntityId::new("m1"),
        channel_index: 0,
        mode: MuxMode::Analog,
        midi_type: SwitchMessage::NoteOn,
        channel: ch(1),
        data1: db(30),
        action: Some("eq_low".to_string()),
    });
    surface.mux_channels.push(MuxChannelMapping {
        id: EntityId::new("fx_on"),
        mux_id: EntityId::new("m1"),
        channel_index: 1,
        mode: MuxMode::Digital,
        midi_type: SwitchMessage::NoteOn,
        channel: ch(1),
        data1: db(40),
        action: Some("effect active".to_string()),
    });

    surface
}
