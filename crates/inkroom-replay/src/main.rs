//! InkRoom replay driver
//!
//! Runs a JSON script of input events through the canvas engine and prints the
//! resulting scene as JSON.
//!
//! ## Script format
//!
//! ```json
//! { "steps": [
//!     { "background": { "r": 97, "g": 97, "b": 97 } },
//!     { "tool": { "insert": "rectangle" } },
//!     { "event": "pointer_down", "position": { "x": 10, "y": 10 } },
//!     { "event": "pointer_up", "position": { "x": 10, "y": 10 } }
//! ] }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use inkroom_core::{
    Canvas, EngineConfig, InputEvent, LoroRoom, MemoryRoom, Rgb, SharedDocument, Tool,
};
use serde::Deserialize;

/// Replay scripted pointer and keyboard input against a fresh room
#[derive(Parser, Debug)]
#[command(name = "inkroom-replay")]
#[command(version, about, long_about = None)]
struct Args {
    /// Engine configuration (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Document backend to run against
    #[arg(long, value_enum, default_value_t = Backend::Memory)]
    backend: Backend,

    /// Abort on the first rejected step instead of logging it
    #[arg(long)]
    strict: bool,

    /// Script to replay
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Memory,
    Loro,
}

#[derive(Debug, Deserialize)]
struct Script {
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Step {
    SetTool { tool: Tool },
    SetBackground { background: Rgb },
    Input(InputEvent),
}

fn load_script(path: &Path) -> Result<Script> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid script {}", path.display()))
}

fn replay<D: SharedDocument>(canvas: &mut Canvas<D>, script: &Script, strict: bool) -> Result<()> {
    for (index, step) in script.steps.iter().enumerate() {
        let result = match step {
            Step::SetTool { tool } => canvas.set_tool(*tool),
            Step::SetBackground { background } => canvas.set_background(*background),
            Step::Input(event) => canvas.dispatch(event),
        };
        if let Err(e) = result {
            if strict {
                return Err(e).with_context(|| format!("Step {} failed", index));
            }
            log::warn!("Step {} rejected: {}", index, e);
        }
    }
    log::info!("Replayed {} steps", script.steps.len());
    Ok(())
}

fn run<D: SharedDocument>(doc: D, config: EngineConfig, script: &Script, strict: bool) -> Result<String> {
    let mut canvas = Canvas::new(doc, config);
    replay(&mut canvas, script, strict)?;
    Ok(serde_json::to_string_pretty(&canvas.scene())?)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let script = load_script(&args.script)?;

    let output = match args.backend {
        Backend::Memory => {
            let room = MemoryRoom::with_max_layers(config.max_layers);
            run(room.join_with_history(config.max_history), config, &script, args.strict)?
        }
        Backend::Loro => {
            let mut room = LoroRoom::new();
            room.set_max_history(config.max_history);
            room.set_max_layers(config.max_layers);
            run(room, config, &script, args.strict)?
        }
    };
    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"{ "steps": [
        { "background": { "r": 97, "g": 97, "b": 97 } },
        { "tool": { "insert": "ellipse" } },
        { "event": "pointer_down", "position": { "x": 10, "y": 10 } },
        { "event": "pointer_up", "position": { "x": 10, "y": 10 } },
        { "tool": "pencil" },
        { "event": "pointer_down", "position": { "x": 0, "y": 0 } },
        { "event": "pointer_move", "position": { "x": 5, "y": 0 }, "buttons": 1 },
        { "event": "pointer_up", "position": { "x": 5, "y": 5 } },
        { "event": "pointer_leave" }
    ] }"#;

    #[test]
    fn test_parse_script() {
        let script: Script = serde_json::from_str(SCRIPT).unwrap();
        assert_eq!(script.steps.len(), 9);
        assert!(matches!(script.steps[0], Step::SetBackground { .. }));
        assert!(matches!(script.steps[4], Step::SetTool { tool: Tool::Pencil }));
        assert!(matches!(script.steps[8], Step::Input(InputEvent::PointerLeave)));
    }

    #[test]
    fn test_replay_on_both_backends() {
        let script: Script = serde_json::from_str(SCRIPT).unwrap();

        let room = MemoryRoom::new();
        let mut memory = Canvas::new(room.join(), EngineConfig::default());
        replay(&mut memory, &script, true).unwrap();
        assert_eq!(memory.document().layer_count(), 2);

        let mut loro = Canvas::new(LoroRoom::new(), EngineConfig::default());
        replay(&mut loro, &script, true).unwrap();
        assert_eq!(loro.document().layer_count(), 2);
        assert_eq!(loro.background(), Rgb::new(97, 97, 97));
        assert_eq!(memory.background(), loro.background());

        // Ids are random per run; the layers themselves must agree
        let layers = |scene: inkroom_core::Scene| -> Vec<_> {
            scene.layers.into_iter().map(|(_, layer)| layer).collect()
        };
        assert_eq!(layers(loro.scene()), layers(memory.scene()));
    }

    #[test]
    fn test_strict_stops_on_capacity() {
        let config = EngineConfig {
            max_layers: 1,
            ..EngineConfig::default()
        };
        let script: Script = serde_json::from_str(SCRIPT).unwrap();

        let room = MemoryRoom::new();
        let mut canvas = Canvas::new(room.join(), config.clone());
        assert!(replay(&mut canvas, &script, true).is_err());

        let other_room = MemoryRoom::new();
        let mut lenient = Canvas::new(other_room.join(), config);
        replay(&mut lenient, &script, false).unwrap();
        assert_eq!(lenient.document().layer_count(), 1);
    }
}
