pub mod display;

use std::collections::HashMap;

use crate::extensions::option::LabelExt;
use crate::ir::model::IrProtocol;
use crate::midi::model::{Channel, DataByte, MidiType};
use crate::naming::{sanitize, IdentifierSet};
use crate::surface::model::{EntityId, IrMapping, MuxArity, MuxMode, Surface, SwitchMessage};

const RULE: &str = " * ==========================================================================";
const THIN_RULE: &str = " * --------------------------------------------------------------------------";

/// Names the generated program declares or uses itself.
const RESERVED: &[&str] = &[
    // Own globals and functions
    "midi",
    "setup",
    "loop",
    "dispatchIr",
    // Arduino and library objects
    "Serial",
    "Wire",
    "Wire1",
    "IrReceiver",
    "Control_Surface",
    "F",
    "HEX",
    "getProtocolString",
    "decode_type_t",
    // Control Surface types
    "USBMIDI_Interface",
    "CD74HC4051",
    "CD74HC4067",
    "CCPotentiometer",
    "CCRotaryEncoder",
    "NoteButton",
    "CCButton",
    "NoteButtonMatrix",
    "CCButtonMatrix",
    "PinList",
    "AddressMatrix",
    // C++ keywords a label can spell
    "auto",
    "bool",
    "break",
    "case",
    "char",
    "class",
    "const",
    "continue",
    "default",
    "delete",
    "do",
    "double",
    "else",
    "enum",
    "float",
    "for",
    "goto",
    "if",
    "int",
    "long",
    "new",
    "return",
    "short",
    "signed",
    "static",
    "struct",
    "switch",
    "this",
    "unsigned",
    "void",
    "volatile",
    "while",
];

/// Line oriented text buffer for generated source.
#[derive(Default)]
pub struct Source {
    text: String,
}

impl Source {
    pub fn line<S: AsRef<str>>(&mut self, line: S) {
        self.text.push_str(line.as_ref());
        self.text.push('\n');
    }

    pub fn blank(&mut self) {
        self.text.push('\n');
    }

    pub fn finish(self) -> String {
        self.text
    }
}

pub fn file_name(surface: &Surface) -> String {
    format!("{}.ino", sanitize(&surface.config.controller_name, "controller"))
}

fn fallback(prefix: &str, id: &EntityId) -> String {
    sanitize(&format!("{prefix}_{id}"), prefix)
}

fn address(data1: DataByte, channel: Channel) -> String {
    format!("{{{}, Channel_{}}}", data1, channel)
}

fn switch_class(message: SwitchMessage) -> &'static str {
    match message {
        SwitchMessage::NoteOn => "NoteButton",
        SwitchMessage::ControlChange => "CCButton",
    }
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Labels end up inside a block comment.
fn comment_safe(label: &str) -> String {
    label.replace("*/", "* /")
}

/// Body of a C string literal.
fn c_string(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            // Split after the escape so following hex digits stay out of it.
            c if c.is_control() && (c as u32) < 0x80 => {
                escaped.push_str(&format!("\\x{:02X}\"\"", c as u32))
            }
            other => escaped.push(other),
        }
    }
    escaped
}

/// Firmware source for the whole surface.
///
/// Output only depends on `surface` and `generated_at`.
pub fn generate(surface: &Surface, generated_at: &str) -> String {
    let mut out = Source::default();
    let mut names = IdentifierSet::new();
    for reserved in RESERVED.iter().chain(display::RESERVED.iter()) {
        names.claim(reserved.to_string());
    }

    header(surface, generated_at, &mut out);
    out.blank();
    preamble(surface, &mut out);
    out.blank();
    controls(surface, &mut names, &mut out);
    setup(surface, &mut out);
    out.blank();
    main_loop(&mut out);
    out.blank();
    dispatch(surface, &mut out);

    out.finish()
}

fn header(surface: &Surface, generated_at: &str, out: &mut Source) {
    let config = &surface.config;
    out.line("/*");
    out.line(RULE);
    out.line(format!(" * PROJECT: {}", comment_safe(&config.controller_name)));
    out.line(format!(" * GENERATED: {generated_at}"));
    out.line(" * PLATFORM: Raspberry Pi Pico (RP2040)");
    out.line(RULE);
    out.line(" *");
    out.line(" * REQUIRED LIBRARIES:");
    out.line(" * - Control Surface (https://github.com/tttapa/Control-Surface)");
    out.line(" * - IRremote (https://github.com/Arduino-IRremote/Arduino-IRremote)");
    if let Some(library) = display::library(&config.display) {
        out.line(format!(" * - {library}"));
    }
    out.line(" *");
    out.line(" * NOTE: Architecture warnings shown by the IDE can be ignored on the RP2040.");
    out.line(THIN_RULE);
    out.line(" * HARDWARE SETUP:");
    out.line(format!(" * - IR RECEIVER: GPIO {}", config.ir_pin));
    if config.display.enabled {
        for (index, panel) in config.display.panels().iter().enumerate() {
            out.line(format!(
                " * - DISPLAY {} ({}): SDA={}, SCL={}, ADDR={}",
                index + 1,
                config.display.family.label(),
                panel.sda,
                panel.scl,
                panel.address_hex()
            ));
        }
    }
    for mux in &surface.multiplexers {
        out.line(format!(
            " * - MULTIPLEXER {} ({}): SELECT={} SIGNAL={}",
            comment_safe(&mux.name),
            mux.arity.chip(),
            join(mux.used_select_pins()),
            mux.signal_pin
        ));
    }
    for fader in &surface.faders {
        out.line(format!(
            " * - FADER {}: GPIO {}",
            comment_safe(&fader.name),
            fader.pin
        ));
    }
    for encoder in &surface.encoders {
        let button = encoder
            .button
            .as_ref()
            .map(|b| format!(", BUTTON={}", b.pin))
            .unwrap_or_default();
        out.line(format!(
            " * - ENCODER {}: A={}, B={}{}",
            comment_safe(&encoder.name),
            encoder.pin_a,
            encoder.pin_b,
            button
        ));
    }
    for button in &surface.buttons {
        out.line(format!(
            " * - BUTTON {}: GPIO {}",
            comment_safe(&button.name),
            button.pin
        ));
    }
    for keypad in &surface.keypads {
        out.line(format!(
            " * - KEYPAD {}: ROWS={} COLS={}",
            comment_safe(&keypad.name),
            join(&keypad.row_pins),
            join(&keypad.col_pins)
        ));
    }
    out.line(RULE);
    out.line(" */");
}

fn preamble(surface: &Surface, out: &mut Source) {
    out.line("#include <Arduino.h>");
    out.line("#include <Wire.h>");
    out.blank();
    out.line("// 1. IR Protocols");
    for protocol in IrProtocol::ALL {
        out.line(format!("#define DECODE_{}", protocol.decoder_name()));
    }
    if display::split_layout(&surface.config.display) {
        out.line("#define DUAL_DECK_LAYOUT");
    }
    out.line("#include <IRremote.hpp>");
    out.blank();
    out.line("// 2. Control Surface Setup");
    out.line("#include <Control_Surface.h>");
    out.blank();
    out.line("USBMIDI_Interface midi;");
}

fn controls(surface: &Surface, names: &mut IdentifierSet, out: &mut Source) {
    let mut muxes: HashMap<&EntityId, (String, MuxArity)> = HashMap::new();
    if !surface.multiplexers.is_empty() {
        out.line("// --- Multiplexers ---");
        for mux in &surface.multiplexers {
            let name = names.declare(&mux.name, &fallback("mux", &mux.id));
            out.line(format!(
                "{} {} {{ {}, {{{}}} }};",
                mux.arity.chip(),
                name,
                mux.signal_pin,
                join(mux.used_select_pins())
            ));
            muxes.insert(&mux.id, (name, mux.arity));
        }
        out.blank();
    }

    display::declarations(&surface.config.display, out);
    out.blank();
    out.line("void dispatchIr(decode_type_t protocol, uint16_t command);");
    out.blank();

    if !surface.faders.is_empty() || !surface.mux_channels.is_empty() {
        out.line("// --- Faders ---");
        for fader in &surface.faders {
            let name = names.declare(&fader.name, &fallback("pot", &fader.id));
            out.line(format!(
                "CCPotentiometer {} {{ {}, {} }};",
                name,
                fader.pin,
                address(fader.cc_number, fader.channel)
            ));
        }
        for channel in &surface.mux_channels {
            let Some((mux_name, arity)) = muxes.get(&channel.mux_id) else {
                log::warn!(
                    "Skipping multiplexer channel {}: unknown multiplexer {}",
                    channel.id,
                    channel.mux_id
                );
                continue;
            };
            if channel.channel_index >= arity.channels() {
                log::warn!(
                    "Skipping multiplexer channel {}: index {} exceeds {} channels of {}",
                    channel.id,
                    channel.channel_index,
                    arity.channels(),
                    mux_name
                );
                continue;
            }
            let name = names.claim(format!("{}_ch{}", mux_name, channel.channel_index));
            let class = match channel.mode {
                MuxMode::Analog => "CCPotentiometer",
                MuxMode::Digital => switch_class(channel.midi_type),
            };
            out.line(format!(
                "{} {} {{ {}.pin({}), {} }};",
                class,
                name,
                mux_name,
                channel.channel_index,
                address(channel.data1, channel.channel)
            ));
        }
        out.blank();
    }

    if !surface.encoders.is_empty() {
        out.line("// --- Encoders ---");
        for encoder in &surface.encoders {
            let name = names.declare(&encoder.name, &fallback("encoder", &encoder.id));
            out.line(format!(
                "CCRotaryEncoder {} {{ {{{}, {}}}, {}, {} }};",
                name,
                encoder.pin_a,
                encoder.pin_b,
                address(encoder.cc_number, encoder.channel),
                encoder.speed()
            ));
            if let Some(button) = &encoder.button {
                let button_name = names.claim(format!("{name}_btn"));
                out.line(format!(
                    "{} {} {{ {}, {} }};",
                    switch_class(button.midi_type),
                    button_name,
                    button.pin,
                    address(button.data1, button.channel)
                ));
            }
        }
        out.blank();
    }

    if !surface.buttons.is_empty() {
        out.line("// --- Buttons ---");
        for button in &surface.buttons {
            let name = names.declare(&button.name, &fallback("btn", &button.id));
            out.line(format!(
                "{} {} {{ {}, {} }};",
                switch_class(button.midi_type),
                name,
                button.pin,
                address(button.data1, button.channel)
            ));
        }
        out.blank();
    }

    if !surface.keypads.is_empty() {
        out.line("// --- Keypads ---");
        for keypad in &surface.keypads {
            let name = names.declare(&keypad.name, &fallback("keypad", &keypad.id));
            let row_pins = names.claim(format!("{name}_rowPins"));
            let col_pins = names.claim(format!("{name}_colPins"));
            let addresses = names.claim(format!("{name}_addresses"));
            let class = match keypad.mode {
                SwitchMessage::NoteOn => "NoteButtonMatrix",
                SwitchMessage::ControlChange => "CCButtonMatrix",
            };
            out.line(format!(
                "const PinList<4> {} = {{ {} }};",
                row_pins,
                join(&keypad.row_pins)
            ));
            out.line(format!(
                "const PinList<4> {} = {{ {} }};",
                col_pins,
                join(&keypad.col_pins)
            ));
            out.line(format!("const AddressMatrix<4, 4> {addresses} = {{{{"));
            let rows: Vec<String> = keypad
                .values
                .iter()
                .map(|row| format!("    {{ {} }}", join(row)))
                .collect();
            out.line(rows.join(",\n"));
            out.line("}};");
            out.line(format!(
                "{}<4, 4> {} = {{ {}, {}, {}, Channel_{} }};",
                class, name, row_pins, col_pins, addresses, keypad.channel
            ));
        }
        out.blank();
    }
}

fn setup(surface: &Surface, out: &mut Source) {
    let config = &surface.config;
    out.line("void setup() {");
    out.line("  Serial.begin(115200);");
    out.blank();
    display::bus_setup(&config.display, out);
    out.blank();
    display::setup(&config.display, out);
    out.line("  Control_Surface.begin();");
    out.line(format!(
        "  IrReceiver.begin({}, {});",
        config.ir_pin,
        if config.led_feedback {
            "ENABLE_LED_FEEDBACK"
        } else {
            "DISABLE_LED_FEEDBACK"
        }
    ));
    out.blank();
    out.line("  Serial.println(F(\"MIDI Controller Ready\"));");
    out.line("  updateDisplay(1, \"Ready\");");
    out.line("}");
}

fn main_loop(out: &mut Source) {
    out.line("void loop() {");
    out.line("  Control_Surface.loop();");
    out.blank();
    out.line("  if (IrReceiver.decode()) {");
    out.line("    if (!(IrReceiver.decodedIRData.flags & IRDATA_FLAGS_IS_REPEAT)) {");
    out.line("      // Read by the learning session on the host.");
    out.line("      Serial.print(F(\"Protocol: \"));");
    out.line("      Serial.print(getProtocolString(IrReceiver.decodedIRData.protocol));");
    out.line("      Serial.print(F(\" Code: 0x\"));");
    out.line("      Serial.println(IrReceiver.decodedIRData.command, HEX);");
    out.line(
        "      dispatchIr(IrReceiver.decodedIRData.protocol, IrReceiver.decodedIRData.command);",
    );
    out.line("    }");
    out.line("    IrReceiver.resume();");
    out.line("  }");
    out.line("}");
}

fn send_call(mapping: &IrMapping) -> String {
    let target = address(mapping.data1, mapping.channel);
    match mapping.midi_type {
        MidiType::NoteOn => format!("midi.sendNoteOn({}, {});", target, mapping.data2),
        MidiType::NoteOff => format!("midi.sendNoteOff({}, {});", target, mapping.data2),
        MidiType::ControlChange => {
            format!("midi.sendControlChange({}, {});", target, mapping.data2)
        }
        MidiType::ProgramChange => format!(
            "midi.sendProgramChange({{Channel_{}}}, {});",
            mapping.channel, mapping.data1
        ),
    }
}

/// First matching mapping wins, mappings without a usable code are left out.
fn dispatch(surface: &Surface, out: &mut Source) {
    out.line("void dispatchIr(decode_type_t protocol, uint16_t command) {");
    for mapping in &surface.ir_mappings {
        let Some(code) = &mapping.ir_code else {
            continue;
        };
        let shown = mapping
            .action
            .non_blank()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} {}", mapping.midi_type.label(), mapping.data1));
        out.line(format!(
            "  if (protocol == decode_type_t::{} && command == {}) {{",
            mapping.ir_protocol.decoder_name(),
            code
        ));
        out.line(format!("    {}", send_call(mapping)));
        out.line(format!(
            "    updateDisplay({}, \"{}\");",
            mapping.channel,
            c_string(&shown)
        ));
        out.line("    return;");
        out.line("  }");
    }
    out.line("}");
}
