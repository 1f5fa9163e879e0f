use std::sync::Arc;

use crate::clock::Clock;
use crate::firmware;
use crate::learning::serial::{LinkError, SerialEvent, SerialLink, SerialPort};
use crate::learning::{LearnState, Learned, Sequencer};
use crate::mapping;
use crate::surface::edit::{Applied, Edit, EditError};
use crate::surface::model::{Entity, EntityId, IrMapping, Surface};

/// Section of the surface the operator is looking at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Ir,
    Buttons,
    Faders,
    Encoders,
    Keypads,
    Multiplexers,
    Display,
}

/// Generated documents for the current surface.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Artifacts {
    pub firmware: String,
    pub mapping: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Learned(Learned),
    Ignored(String),
    Closed,
}

/// Owns the surface and keeps both documents in sync with it.
pub struct Editor {
    surface: Surface,
    view: View,
    sequencer: Sequencer,
    link: SerialLink,
    events: (
        async_channel::Sender<SerialEvent>,
        async_channel::Receiver<SerialEvent>,
    ),
    clock: Arc<dyn Clock + Send + Sync>,
    artifacts: Artifacts,
}

impl Editor {
    pub fn new(
        surface: Surface,
        clock: Arc<dyn Clock + Send + Sync>,
        port: Option<Arc<dyn SerialPort + Send + Sync>>,
    ) -> Editor {
        let mut editor = Editor {
            surface,
            view: View::default(),
            sequencer: Sequencer::default(),
            link: SerialLink::new(port),
            events: async_channel::unbounded(),
            clock,
            artifacts: Artifacts::default(),
        };
        editor.regenerate();
        editor
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    pub fn set_view(&mut self, view: View) {
        self.view = view;
    }

    pub fn learning(&self) -> &LearnState {
        self.sequencer.state()
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    fn regenerate(&mut self) {
        self.artifacts = Artifacts {
            firmware: firmware::generate(&self.surface, &self.clock.stamp()),
            mapping: mapping::generate(&self.surface),
        };
    }

    pub fn edit(&mut self, edit: Edit) -> Result<Applied, EditError> {
        let applied = self.surface.apply(edit)?;
        self.regenerate();
        Ok(applied)
    }

    /// Arms the sequencer on an existing IR mapping.
    pub fn start_learning(&mut self, id: EntityId) -> Result<(), EditError> {
        if self.surface.ir_mappings.get(&id).is_none() {
            return Err(EditError::UnknownEntity {
                kind: IrMapping::KIND,
                id,
            });
        }
        log::info!("Waiting for an IR code for mapping {}", id);
        self.sequencer.arm(id);
        Ok(())
    }

    /// Arms the sequencer on the first IR mapping, if there is one.
    pub fn start_learning_from_first(&mut self) -> Option<EntityId> {
        let first = self.surface.ir_mappings.at(0).map(|m| m.id.clone())?;
        self.sequencer.arm(first.clone());
        log::info!("Waiting for an IR code for mapping {}", first);
        Some(first)
    }

    pub fn cancel_learning(&mut self) {
        self.sequencer.cancel();
    }

    pub async fn connect(&mut self) -> Result<bool, LinkError> {
        self.drain();
        self.link.connect(self.events.0.clone()).await
    }

    /// Stops the reader, drops lines it left behind and ends learning.
    pub async fn disconnect(&mut self) {
        self.link.disconnect().await;
        self.drain();
        self.sequencer.cancel();
    }

    fn drain(&self) {
        while self.events.1.try_recv().is_ok() {}
    }

    /// Waits for the next serial event and applies it to the current surface.
    pub async fn step(&mut self) -> Step {
        let received = self.events.1.recv().await;
        match received {
            Ok(event) => self.handle(event),
            Err(_) => Step::Closed,
        }
    }

    pub fn handle(&mut self, event: SerialEvent) -> Step {
        match event {
            SerialEvent::Line(line) => {
                let ir_view = self.view == View::Ir;
                match self.sequencer.handle_line(&mut self.surface, ir_view, &line) {
                    Some(learned) => {
                        log::info!(
                            "Learned {} {} for mapping {}",
                            learned.protocol,
                            learned.code,
                            learned.id
                        );
                        self.regenerate();
                        Step::Learned(learned)
                    }
                    None => Step::Ignored(line),
                }
            }
            SerialEvent::Closed => {
                self.sequencer.cancel();
                Step::Closed
            }
        }
    }
}
