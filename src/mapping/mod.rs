pub mod actions;

use crate::extensions::option::LabelExt;
use crate::midi::model::{MidiAddress, MidiType};
use crate::naming::sanitize;
use crate::surface::model::Surface;

const AUTHOR: &str = "ir_midi_forge";
const ROTATE_FALLBACK: &str = "browser_scroll";
const CLICK_FALLBACK: &str = "browser_enter";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    MuxChannels,
    Faders,
    IrMappings,
    Buttons,
    Encoders,
    Keypads,
}

impl Category {
    fn title(&self) -> &'static str {
        match self {
            Category::MuxChannels => "Multiplexer Channels",
            Category::Faders => "Faders & Pots",
            Category::IrMappings => "IR Remote Mappings",
            Category::Buttons => "Physical Buttons",
            Category::Encoders => "Rotary Encoders",
            Category::Keypads => "Keypads",
        }
    }
}

/// One `<map>` line of the document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub category: Category,
    pub address: MidiAddress,
    pub action: String,
}

fn label(action: &Option<String>) -> String {
    action.clone().unwrap_or_default()
}

fn or_fallback(action: &Option<String>, fallback: &str) -> String {
    action.non_blank().unwrap_or(fallback).to_string()
}

/// Every entry of the document, grouped by category in document order.
pub fn entries(surface: &Surface) -> Vec<Entry> {
    let mut entries = Vec::new();
    let mut push = |category, address, action| {
        entries.push(Entry {
            category,
            address,
            action,
        })
    };

    for channel in surface.mux_channels.iter().filter(|c| surface.is_wired(c)) {
        push(
            Category::MuxChannels,
            MidiAddress::new(channel.midi_type(), channel.channel, channel.data1),
            label(&channel.action),
        );
    }
    for fader in &surface.faders {
        push(
            Category::Faders,
            MidiAddress::new(MidiType::ControlChange, fader.channel, fader.cc_number),
            label(&fader.action),
        );
    }
    for mapping in &surface.ir_mappings {
        push(
            Category::IrMappings,
            MidiAddress::new(mapping.midi_type, mapping.channel, mapping.data1),
            label(&mapping.action),
        );
    }
    for button in &surface.buttons {
        push(
            Category::Buttons,
            MidiAddress::new(button.midi_type.midi_type(), button.channel, button.data1),
            label(&button.action),
        );
    }
    for encoder in &surface.encoders {
        push(
            Category::Encoders,
            MidiAddress::new(MidiType::ControlChange, encoder.channel, encoder.cc_number),
            or_fallback(&encoder.action_rotate, ROTATE_FALLBACK),
        );
        if let Some(button) = &encoder.button {
            push(
                Category::Encoders,
                MidiAddress::new(button.midi_type.midi_type(), button.channel, button.data1),
                or_fallback(&encoder.action_click, CLICK_FALLBACK),
            );
        }
    }
    for keypad in &surface.keypads {
        let midi_type = keypad.mode.midi_type();
        for (row, cells) in keypad.values.iter().enumerate() {
            for (col, value) in cells.iter().enumerate() {
                push(
                    Category::Keypads,
                    MidiAddress::new(midi_type, keypad.channel, *value),
                    keypad.action_at(row, col).to_string(),
                );
            }
        }
    }
    entries
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn file_name(surface: &Surface) -> String {
    format!("{}.xml", sanitize(&surface.config.controller_name, "controller"))
}

/// VirtualDJ mapper document for the whole surface.
pub fn generate(surface: &Surface) -> String {
    let device = escape(&surface.config.controller_name);
    let mut lines = vec![
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>".to_string(),
        format!("<mapper device=\"{device}\" author=\"{AUTHOR}\" version=\"1.0\">"),
        format!("  <info><name>{device}</name></info>"),
        "  <mapping>".to_string(),
    ];

    let mut current = None;
    for entry in entries(surface) {
        if current != Some(entry.category) {
            lines.push(format!("    <!-- {} -->", entry.category.title()));
            current = Some(entry.category);
        }
        lines.push(format!(
            "    <map value=\"{}\" action=\"{}\" />",
            entry.address,
            escape(&entry.action)
        ));
    }

    lines.push("  </mapping>".to_string());
    lines.push("</mapper>".to_string());
    lines.join("\n") + "\n"
}
