//! Replay recorded skeleton poses through the retargeter.
//!
//! ```sh
//! cargo run --bin retarget-replay -- roid1.json poses.json
//! cargo run --bin retarget-replay -- roid1.json poses.json calibration.json
//! cargo run --bin retarget-replay -- roid1 poses.json
//! ```
//!
//! The first pose is recorded as rest pose (it must be the T-pose), every
//! following pose is retargeted and the actuator target of each joint is
//! printed, one line per frame.  `roid1` in place of the mechanism file
//! uses the built-in Roid1 description.  Set `RETARGET_LOG=debug` for the
//! per-joint angles.

use cu_retarget::mechanism::roid1_description;
use cu_retarget::{
    CalibrationTable, JointPosition, Mechanism, PoseSnapshot, RetargetEngine, RetargetResult,
};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::path::Path;

fn run(mechanism_arg: &str, poses_path: &Path, calibration_path: Option<&Path>) -> RetargetResult<()> {
    let calibration = match calibration_path {
        Some(path) => CalibrationTable::load(path)?,
        None => CalibrationTable::roid1(),
    };
    let mut mechanism = if mechanism_arg == "roid1" {
        Mechanism::from_description(&roid1_description())
    } else {
        Mechanism::load(Path::new(mechanism_arg))?
    };
    let mut engine = RetargetEngine::from_mechanism(&calibration, &mut mechanism);

    let frames = PoseSnapshot::load_sequence(poses_path)?;
    let Some((rest, frames)) = frames.split_first() else {
        eprintln!("{} holds no pose", poses_path.display());
        return Ok(());
    };
    engine.record_rest_pose(rest)?;

    let header: Vec<&str> = JointPosition::ALL.iter().map(|j| j.name()).collect();
    println!("frame\t{}", header.join("\t"));
    for (i, frame) in frames.iter().enumerate() {
        engine.update(frame)?;
        let targets = engine.targets();
        let row: Vec<String> = targets.as_slice().iter().map(|t| format!("{t:.2}")).collect();
        println!("{}\t{}", i + 1, row.join("\t"));
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 || args.len() > 4 {
        eprintln!("Usage: retarget-replay <mechanism.json|roid1> <poses.json> [calibration.json]");
        eprintln!("  e.g. retarget-replay roid1 poses.json");
        std::process::exit(1);
    }

    let level = match std::env::var("RETARGET_LOG").as_deref() {
        Ok("trace") => LevelFilter::Trace,
        Ok("debug") => LevelFilter::Debug,
        Ok("warn") => LevelFilter::Warn,
        _ => LevelFilter::Info,
    };
    if let Err(e) = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto) {
        eprintln!("Could not set up logging: {e}");
    }

    let calibration = args.get(3).map(Path::new);
    if let Err(e) = run(&args[1], Path::new(&args[2]), calibration) {
        eprintln!("retarget-replay: {e}");
        std::process::exit(1);
    }
}
