// Replays a recorded keypoint stream through the engine in real time.
//
// Usage:
//   replay_session <frames.jsonl> <exercise> <target>
//   replay_session <frames.jsonl> --config <session.json>
//
// Each line of the recording is one serialized `KeypointFrame`. Frames are
// fed at the pace their timestamps imply, so the stability window and
// countdown behave as they would with a live camera.

use anyhow::{anyhow, bail, Context};
use log::{info, warn};
use reptrack_lib::{Engine, EngineEvents, ExerciseType, KeypointFrame, SessionConfig, SessionEvent, SessionState, Target};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::time::Duration;

const USAGE: &str = "usage: replay_session <frames.jsonl> (<exercise> <target> | --config <session.json>)";

fn parse_config(args: &[String]) -> anyhow::Result<SessionConfig> {
    match args {
        [flag, path] if flag == "--config" => {
            SessionConfig::load(path).with_context(|| format!("loading {}", path))
        }
        [exercise, target] => {
            let exercise = ExerciseType::from_string(exercise).map_err(|e| anyhow!(e))?;
            let amount: u32 = target.parse().context("target must be a whole number")?;
            let target = if exercise.is_hold() {
                Target::HoldSeconds(amount)
            } else {
                Target::Reps(amount)
            };
            Ok(SessionConfig::new(exercise, target))
        }
        _ => bail!(USAGE),
    }
}

fn read_frames(path: &str) -> anyhow::Result<Vec<KeypointFrame>> {
    let reader = BufReader::new(File::open(path).with_context(|| format!("opening {}", path))?);
    let mut frames = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<KeypointFrame>(&line) {
            Ok(frame) => frames.push(frame),
            Err(e) => warn!("Skipping line {}: {}", number + 1, e),
        }
    }
    Ok(frames)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((recording, rest)) = args.split_first() else {
        bail!(USAGE);
    };
    let config = parse_config(rest)?;
    let frames = read_frames(recording)?;
    info!("Loaded {} frames from {}", frames.len(), recording);

    let (engine, events) = Engine::new()?;
    let EngineEvents {
        pose_updates,
        mut session_events,
    } = events;
    // Pose updates are for overlays; nothing to draw here
    drop(pose_updates);

    let printer = tokio::spawn(async move {
        while let Some(event) = session_events.recv().await {
            match &event {
                SessionEvent::StateChanged { from, to } => println!("state: {} -> {}", from, to),
                SessionEvent::Progress { progress } => println!("progress: {}", progress),
                SessionEvent::Completed { progress, skipped } => {
                    println!("completed: {}{}", progress, if *skipped { " (skipped)" } else { "" })
                }
            }
        }
    });

    engine.start_with_config(config)?;

    let mut previous: Option<i64> = None;
    for frame in frames {
        if let Some(last) = previous {
            let gap = (frame.timestamp_ms - last).max(0) as u64;
            tokio::time::sleep(Duration::from_millis(gap)).await;
        }
        previous = Some(frame.timestamp_ms);
        engine.feed_frame(frame)?;
        if engine.state() == SessionState::Complete {
            break;
        }
    }

    if let Some(summary) = engine.summary() {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    engine.dispose();
    printer.await?;
    Ok(())
}
