use clap::{Args, Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::advisor::command::{CommandBackend, Config};
use crate::advisor::model::AdvisorBackend;
use crate::advisor::Assistant;
use crate::clock::{Clock, FixedClock, SystemClock};
use crate::configuration;
use crate::editor::{Editor, Step, View};
use crate::firmware;
use crate::learning::serial::{DevicePort, SerialPort};
use crate::learning::LearnState;
use crate::mapping;
use crate::mapping::actions::{unknown_actions, KNOWN_ACTIONS};
use crate::surface::model::EntityId;

#[derive(Debug, Parser)]
#[command(
    name = "forge",
    about = "Generates RP2040 MIDI controller firmware and VirtualDJ mappings",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write firmware source and mapping document for a configuration.
    Generate(GenerateArgs),

    /// Fill in IR codes from the diagnostic output of a running controller.
    Learn(LearnArgs),

    /// Print the catalogue of known VirtualDJ actions.
    Actions,

    /// Ask the assistant a question about the generated firmware.
    Ask(AskArgs),
}

#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    #[arg(long)]
    pub config: PathBuf,

    #[arg(long = "out-dir", default_value = ".")]
    pub out_dir: PathBuf,

    /// RFC 3339 instant to stamp into the firmware instead of the current time.
    #[arg(long = "frozen-clock")]
    pub frozen_clock: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct LearnArgs {
    #[arg(long)]
    pub config: PathBuf,

    /// Serial device or file to read, `-` for standard input.
    #[arg(long)]
    pub port: PathBuf,

    /// IR mapping id to start with, defaults to the first mapping.
    #[arg(long)]
    pub start: Option<String>,

    #[arg(long = "out-dir", default_value = ".")]
    pub out_dir: PathBuf,

    /// Print the updated configuration as YAML when done.
    #[arg(long = "print-config")]
    pub print_config: bool,
}

#[derive(Debug, Clone, Args)]
pub struct AskArgs {
    #[arg(long)]
    pub config: PathBuf,

    /// Program answering the prompt, which is passed as its last argument.
    #[arg(long)]
    pub command: Option<String>,

    #[arg(long = "arg")]
    pub args: Vec<String>,

    pub question: String,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => run_generate(args).await,
        Commands::Learn(args) => run_learn(args).await,
        Commands::Actions => {
            KNOWN_ACTIONS.iter().for_each(|action| println!("{action}"));
            Ok(())
        }
        Commands::Ask(args) => run_ask(args).await,
    }
}

fn clock(frozen: Option<&str>) -> anyhow::Result<Arc<dyn Clock + Send + Sync>> {
    Ok(match frozen {
        Some(instant) => {
            let instant = chrono::DateTime::parse_from_rfc3339(instant)?;
            Arc::new(FixedClock(instant.with_timezone(&chrono::Local)))
        }
        None => Arc::new(SystemClock),
    })
}

async fn write_artifacts(editor: &Editor, out_dir: &Path) -> anyhow::Result<()> {
    for action in unknown_actions(editor.surface()) {
        log::warn!("Action {:?} is not a known VirtualDJ action", action);
    }

    tokio::fs::create_dir_all(out_dir).await?;
    let firmware_path = out_dir.join(firmware::file_name(editor.surface()));
    let mapping_path = out_dir.join(mapping::file_name(editor.surface()));
    tokio::fs::write(&firmware_path, &editor.artifacts().firmware).await?;
    tokio::fs::write(&mapping_path, &editor.artifacts().mapping).await?;
    log::info!(
        "Wrote {} and {}",
        firmware_path.display(),
        mapping_path.display()
    );
    Ok(())
}

async fn run_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let surface = configuration::load(&args.config)?;
    let editor = Editor::new(surface, clock(args.frozen_clock.as_deref())?, None);
    write_artifacts(&editor, &args.out_dir).await
}

async fn run_learn(args: LearnArgs) -> anyhow::Result<()> {
    let surface = configuration::load(&args.config)?;
    let port: Arc<dyn SerialPort + Send + Sync> = Arc::new(DevicePort::new(args.port));
    let mut editor = Editor::new(surface, clock(None)?, Some(port));
    editor.set_view(View::Ir);

    match args.start {
        Some(id) => editor.start_learning(EntityId::new(id))?,
        None => {
            if editor.start_learning_from_first().is_none() {
                log::warn!("Configuration has no IR mappings, nothing to learn");
                return Ok(());
            }
        }
    }
    if !editor.connect().await? {
        return Ok(());
    }

    while *editor.learning() != LearnState::Idle {
        let step = tokio::select! {
            step = editor.step() => Some(step),
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(step) = step else {
            log::info!("Interrupted, keeping codes learned so far");
            editor.cancel_learning();
            break;
        };
        match step {
            Step::Learned(learned) => match learned.next {
                Some(next) => println!("{} = {}, next: {}", learned.id, learned.code, next),
                None => println!("{} = {}, all mappings learned", learned.id, learned.code),
            },
            Step::Ignored(line) => log::debug!("Ignored line {:?}", line),
            Step::Closed => {
                log::warn!("Serial connection closed before learning finished");
                break;
            }
        }
    }
    editor.disconnect().await;

    write_artifacts(&editor, &args.out_dir).await?;
    if args.print_config {
        print!("{}", serde_yaml::to_string(editor.surface())?);
    }
    Ok(())
}

async fn run_ask(args: AskArgs) -> anyhow::Result<()> {
    let surface = configuration::load(&args.config)?;
    let editor = Editor::new(surface, clock(None)?, None);
    let backend = args.command.map(|command| {
        Arc::new(CommandBackend::new(Config {
            envs: HashMap::new(),
            command,
            args: args.args,
        })) as Arc<dyn AdvisorBackend + Send + Sync>
    });

    let answer = Assistant::new(backend)
        .ask(&args.question, &editor.artifacts().firmware)
        .await;
    println!("{answer}");
    Ok(())
}
