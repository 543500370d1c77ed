//! Survival, a small sprite demo for the Sprig engine.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p sprig-survival
//! ```
//!
//! Run from the repository root so the `assets/` directory resolves. The
//! sprite shaders are loaded as SPIR-V; compile them first:
//!
//! ```bash
//! glslc assets/shaders/sprite.vert -o assets/shaders/sprite.vert.spv
//! glslc assets/shaders/sprite.frag -o assets/shaders/sprite.frag.spv
//! ```
//!
//! ## Controls
//!
//! - Left / A / D-pad left: walk left
//! - Down / S / D-pad down: walk toward the camera
//!
//! The first connected gamepad is picked up at startup; a pad plugged in
//! later is used when none is active.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod animation;
mod app;

use sprig_app::{run_app, AppConfig};

use crate::app::Survival;

fn main() -> anyhow::Result<()> {
    run_app::<Survival>(AppConfig::default())
}
