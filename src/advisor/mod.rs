pub mod command;
pub mod model;
#[cfg(test)]
pub mod stubs;

use std::sync::Arc;

use crate::advisor::model::AdvisorBackend;

pub const NOT_CONFIGURED: &str =
    "No assistant is configured. Pass --command to point at a program that answers prompts.";
pub const FAILED: &str =
    "The assistant could not be reached. Check its command and credentials.";
pub const NO_ANSWER: &str = "The assistant returned no answer.";

pub fn prompt(question: &str, firmware: &str) -> String {
    format!(
        "You are an expert in Arduino, C++ and MIDI.\n\
         \n\
         The user builds a MIDI controller on a Raspberry Pi Pico (RP2040) that turns \
         infrared remote codes and physical controls into USB MIDI messages, using the \
         Control Surface and IRremote libraries.\n\
         \n\
         This is the firmware currently generated for it:\n\
         ```cpp\n\
         {firmware}\n\
         ```\n\
         \n\
         Question: \"{question}\"\n\
         \n\
         Answer briefly and precisely. If the code has to change, explain the change.\n"
    )
}

/// Front for an optional backend that always produces text for the operator.
pub struct Assistant {
    backend: Option<Arc<dyn AdvisorBackend + Send + Sync>>,
}

impl Assistant {
    pub fn new(backend: Option<Arc<dyn AdvisorBackend + Send + Sync>>) -> Assistant {
        Assistant { backend }
    }

    pub async fn ask(&self, question: &str, firmware: &str) -> String {
        let Some(backend) = &self.backend else {
            return NOT_CONFIGURED.to_string();
        };
        match backend.complete(&prompt(question, firmware)).await {
            Ok(answer) if answer.trim().is_empty() => NO_ANSWER.to_string(),
            Ok(answer) => answer,
            Err(e) => {
                log::warn!("Assistant request failed: {:#}", e);
                FAILED.to_string()
            }
        }
    }
}
