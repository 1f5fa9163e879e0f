pub mod framing;
pub mod serial;
#[cfg(test)]
pub mod stubs;

use regex::Regex;
use std::sync::OnceLock;

use crate::ir::model::{normalize_hex, IrCode, IrProtocol};
use crate::surface::edit::{Edit, IrField};
use crate::surface::model::{EntityId, Surface};

static DIAGNOSTIC_LINE: OnceLock<Regex> = OnceLock::new();

fn diagnostic_line() -> &'static Regex {
    DIAGNOSTIC_LINE.get_or_init(|| {
        Regex::new(r"Protocol:\s*(\w+)\s*Code:\s*(0x[0-9A-Fa-f]+)").expect("diagnostic line regex")
    })
}

/// Reads the `Protocol: <NAME> Code: 0x<HEX>` line the firmware prints for every new IR code.
pub fn parse_line(line: &str) -> Option<(IrProtocol, IrCode)> {
    let captures = diagnostic_line().captures(line)?;
    let protocol = IrProtocol::from_keyword(&captures[1]);
    normalize_hex(&captures[2]).map(|code| (protocol, code))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LearnState {
    Idle,
    Armed(EntityId),
}

/// Outcome of one applied learn line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Learned {
    pub id: EntityId,
    pub protocol: IrProtocol,
    pub code: IrCode,
    pub next: Option<EntityId>,
}

/// Walks the IR mappings in order, writing each received code into the armed one.
pub struct Sequencer {
    state: LearnState,
}

impl Default for Sequencer {
    fn default() -> Self {
        Sequencer {
            state: LearnState::Idle,
        }
    }
}

impl Sequencer {
    pub fn state(&self) -> &LearnState {
        &self.state
    }

    pub fn arm(&mut self, id: EntityId) {
        self.state = LearnState::Armed(id);
    }

    pub fn cancel(&mut self) {
        self.state = LearnState::Idle;
    }

    /// Applies `line` to the armed mapping of `surface`.
    ///
    /// Lines that do not match, arrive while idle or outside the IR view, or
    /// target a mapping that no longer exists change nothing.
    pub fn handle_line(
        &mut self,
        surface: &mut Surface,
        ir_view_active: bool,
        line: &str,
    ) -> Option<Learned> {
        let LearnState::Armed(id) = &self.state else {
            return None;
        };
        if !ir_view_active {
            return None;
        }
        let (protocol, code) = parse_line(line)?;
        let position = surface.ir_mappings.position(id)?;

        let id = id.clone();
        surface
            .apply(Edit::IrMapping(id.clone(), IrField::Protocol(protocol)))
            .ok()?;
        surface
            .apply(Edit::IrMapping(
                id.clone(),
                IrField::Code(code.as_str().to_string()),
            ))
            .ok()?;

        let next = surface.ir_mappings.at(position + 1).map(|m| m.id.clone());
        self.state = match &next {
            Some(next) => LearnState::Armed(next.clone()),
            None => LearnState::Idle,
        };
        Some(Learned {
            id,
            protocol,
            code,
            next,
        })
    }
}
