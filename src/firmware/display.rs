use crate::firmware::Source;
use crate::surface::model::{DisplayFamily, DisplaySettings, I2cDisplay};

/// Globals the display blocks may declare, kept away from control names.
pub const RESERVED: &[&str] = &[
    "u8g2",
    "u8g2_2",
    "lcd",
    "lcd_2",
    "deck1Msg",
    "deck2Msg",
    "updateDisplay",
    "drawPanel",
    "U8G2",
    "LiquidCrystal_I2C",
];

const OLED_PANELS: [&str; 2] = ["u8g2", "u8g2_2"];
const LCD_PANELS: [&str; 2] = ["lcd", "lcd_2"];

pub fn library(settings: &DisplaySettings) -> Option<&'static str> {
    settings.enabled.then(|| {
        if settings.family.is_oled() {
            "U8g2 (https://github.com/olikraus/u8g2)"
        } else {
            "LiquidCrystal I2C (https://github.com/johnrickman/LiquidCrystal_I2C)"
        }
    })
}

pub fn split_layout(settings: &DisplaySettings) -> bool {
    settings.enabled && settings.split_layout
}

fn lcd_geometry(family: DisplayFamily) -> (u8, u8) {
    match family {
        DisplayFamily::Lcd2004 => (20, 4),
        _ => (16, 2),
    }
}

/// Second panel wired to its own pins, driven through the second hardware I2C block.
fn second_bus(settings: &DisplaySettings) -> Option<I2cDisplay> {
    settings
        .panels()
        .get(1)
        .copied()
        .filter(|panel| (panel.sda, panel.scl) != (settings.primary.sda, settings.primary.scl))
}

fn oled_class(family: DisplayFamily, second_bus: bool) -> String {
    let bus = if second_bus { "2ND_HW_I2C" } else { "HW_I2C" };
    format!("U8G2_{}_128X64_NONAME_F_{}", family.label(), bus)
}

pub fn declarations(settings: &DisplaySettings, out: &mut Source) {
    out.line("// --- Display ---");
    if !settings.enabled {
        out.line("void updateDisplay(int channel, const char* msg) {}");
        return;
    }

    let panels = settings.panels();
    if settings.family.is_oled() {
        out.line("#include <U8g2lib.h>");
        for (index, name) in OLED_PANELS.iter().enumerate().take(panels.len()) {
            let own_bus = index > 0 && second_bus(settings).is_some();
            out.line(format!(
                "{} {}(U8G2_R0, /* reset=*/ U8X8_PIN_NONE);",
                oled_class(settings.family, own_bus),
                name
            ));
        }
        out.line("char deck1Msg[20] = \"Ready\";");
        out.line("char deck2Msg[20] = \"Ready\";");
        out.blank();
        oled_helpers(panels.len() > 1, out);
    } else {
        if second_bus(settings).is_some() {
            log::warn!("LCD panels share the primary I2C bus, second panel pins are ignored");
        }
        let (cols, rows) = lcd_geometry(settings.family);
        out.line("#include <LiquidCrystal_I2C.h>");
        for (panel, name) in panels.iter().zip(LCD_PANELS) {
            out.line(format!(
                "LiquidCrystal_I2C {}({}, {}, {});",
                name,
                panel.address_hex(),
                cols,
                rows
            ));
        }
        out.blank();
        lcd_helpers(panels.len() > 1, cols, out);
    }
}

fn oled_helpers(dual: bool, out: &mut Source) {
    out.line("void drawPanel(U8G2 &panel, const char* title, const char* msg, int top) {");
    out.line("  panel.setFont(u8g2_font_ncenB08_tr);");
    out.line("  panel.drawStr(0, top + 10, title);");
    out.line("  panel.setFont(u8g2_font_6x10_tf);");
    out.line("  panel.drawStr(0, top + 24, msg);");
    out.line("}");
    out.blank();
    out.line("void updateDisplay(int channel, const char* msg) {");
    if dual {
        out.line("  U8G2 &panel = channel == 2 ? u8g2_2 : u8g2;");
        out.line("  panel.clearBuffer();");
        out.line("  drawPanel(panel, channel == 2 ? \"DECK 2\" : \"DECK 1\", msg, 0);");
        out.line("  panel.sendBuffer();");
    } else {
        out.line("#ifdef DUAL_DECK_LAYOUT");
        out.line("  if (channel == 2) strncpy(deck2Msg, msg, 19);");
        out.line("  else strncpy(deck1Msg, msg, 19);");
        out.line("  u8g2.clearBuffer();");
        out.line("  drawPanel(u8g2, \"DECK 1\", deck1Msg, 0);");
        out.line("  u8g2.drawHLine(0, 31, 128);");
        out.line("  drawPanel(u8g2, \"DECK 2\", deck2Msg, 35);");
        out.line("  u8g2.sendBuffer();");
        out.line("#else");
        out.line("  u8g2.clearBuffer();");
        out.line("  drawPanel(u8g2, \"MIDI STATUS\", msg, 0);");
        out.line("  u8g2.drawHLine(0, 12, 128);");
        out.line("  u8g2.sendBuffer();");
        out.line("#endif");
    }
    out.line("}");
}

fn lcd_helpers(dual: bool, cols: u8, out: &mut Source) {
    out.line("void updateDisplay(int channel, const char* msg) {");
    out.line(format!("  char buf[{}];", cols + 1));
    if dual {
        out.line("  LiquidCrystal_I2C &panel = channel == 2 ? lcd_2 : lcd;");
        out.line("  panel.setCursor(0, 1);");
        out.line(format!("  snprintf(buf, sizeof(buf), \"%-{cols}s\", msg);"));
        out.line("  panel.print(buf);");
    } else {
        out.line("#ifdef DUAL_DECK_LAYOUT");
        out.line("  lcd.setCursor(0, channel == 2 ? 1 : 0);");
        out.line(format!(
            "  snprintf(buf, sizeof(buf), \"D%d: %-{}s\", channel == 2 ? 2 : 1, msg);",
            cols - 4
        ));
        out.line("  lcd.print(buf);");
        out.line("#else");
        out.line("  lcd.setCursor(0, 0);");
        out.line("  lcd.print(\"MIDI STATUS\");");
        out.line("  lcd.setCursor(0, 1);");
        out.line(format!("  snprintf(buf, sizeof(buf), \"%-{cols}s\", msg);"));
        out.line("  lcd.print(buf);");
        out.line("#endif");
    }
    out.line("}");
}

/// Pin assignment and bring up of the I2C buses.
pub fn bus_setup(settings: &DisplaySettings, out: &mut Source) {
    out.line("  // I2C Setup");
    out.line(format!("  Wire.setSDA({});", settings.primary.sda));
    out.line(format!("  Wire.setSCL({});", settings.primary.scl));
    out.line("  Wire.begin();");
    if settings.enabled && settings.family.is_oled() {
        if let Some(panel) = second_bus(settings) {
            out.line(format!("  Wire1.setSDA({});", panel.sda));
            out.line(format!("  Wire1.setSCL({});", panel.scl));
            out.line("  Wire1.begin();");
        }
    }
}

pub fn setup(settings: &DisplaySettings, out: &mut Source) {
    if !settings.enabled {
        return;
    }
    let panels = settings.panels();
    let split = split_layout(settings);

    if settings.family.is_oled() {
        for (panel, name) in panels.iter().zip(OLED_PANELS) {
            // U8g2 expects the 8 bit form of the address.
            out.line(format!("  {}.setI2CAddress({} * 2);", name, panel.address_hex()));
            out.line(format!("  {name}.begin();"));
            if settings.inverted {
                out.line(format!("  {name}.sendF(\"c\", 0xA7);"));
            }
        }
        if split {
            if panels.len() > 1 {
                for (deck, name) in OLED_PANELS.iter().enumerate().take(panels.len()) {
                    out.line(format!("  {name}.clearBuffer();"));
                    out.line(format!(
                        "  drawPanel({}, \"DECK {}\", \"Ready\", 0);",
                        name,
                        deck + 1
                    ));
                    out.line(format!("  {name}.sendBuffer();"));
                }
            } else {
                out.line("  u8g2.clearBuffer();");
                out.line("  u8g2.setFont(u8g2_font_ncenB08_tr);");
                out.line("  u8g2.drawStr(0, 10, \"Deck 1\");");
                out.line("  u8g2.drawStr(66, 10, \"Deck 2\");");
                out.line("  u8g2.drawVLine(63, 0, 64);");
                out.line("  u8g2.sendBuffer();");
            }
        }
    } else {
        let (cols, _) = lcd_geometry(settings.family);
        for name in LCD_PANELS.iter().take(panels.len()) {
            out.line(format!("  {name}.init();"));
            if settings.inverted {
                out.line(format!("  {name}.noBacklight();"));
            } else {
                out.line(format!("  {name}.backlight();"));
            }
        }
        if split {
            if panels.len() > 1 {
                for (deck, name) in LCD_PANELS.iter().enumerate().take(panels.len()) {
                    out.line(format!("  {name}.setCursor(0, 0);"));
                    out.line(format!("  {}.print(\"Deck {}\");", name, deck + 1));
                }
            } else {
                out.line("  lcd.setCursor(0, 0);");
                out.line("  lcd.print(\"Deck 1\");");
                out.line(format!("  lcd.setCursor({}, 0);", cols / 2));
                out.line("  lcd.print(\"Deck 2\");");
            }
        }
    }
}
