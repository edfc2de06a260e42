// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Viewport proximity.
//!
//! Scrolls a viewport past a target and prints visibility and distance (in
//! viewport heights) for a few visibility offsets.
//!
//! Run:
//! - `cargo run -p cadence_demos --example viewport_proximity`

use cadence_viewport::{FixedLayout, ViewportProximityModel, VisibilityOffset};
use kurbo::Rect;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let layout = FixedLayout::new(Rect::new(0.0, 2400.0, 320.0, 2520.0), 800.0);
    for text in ["", "100%", "50%", "-20px"] {
        let offset: VisibilityOffset = text.parse()?;
        let mut model = ViewportProximityModel::new();
        model.initialize(layout, offset);
        println!("== offset {text:?} ==");
        for scroll in (0..=3000).step_by(400) {
            let scroll = f64::from(scroll);
            let visible = model.check_target_in_viewport(scroll);
            println!(
                "  scroll={scroll:>6.0} visible={visible:<5} distance={:.3}",
                model.viewport_distance_from_target()
            );
        }
    }

    match "12em".parse::<VisibilityOffset>() {
        Ok(offset) => println!("unexpectedly parsed {offset}"),
        Err(err) => println!("rejected: {err}"),
    }
    Ok(())
}
