// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scroll visualiser.
//!
//! The whole pipeline on a simulated page: a raw scroll source, the viewport
//! proximity model, a throttle controller, an event bus, and two pooled
//! indicator panels (one for scroll events, one for the change-detection
//! passes they trigger). Settings are read from `config/scroll_viz.toml`, or
//! from the path given as the first argument.
//!
//! Run:
//! - `cargo run -p cadence_demos --example scroll_viz`
//! - `RUST_LOG=cadence_pool=debug cargo run -p cadence_demos --example scroll_viz`

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use cadence_bus::{DispatchMode, EventBus, Source, Subject};
use cadence_pool::{EventIndicator, IndicatorPool, IndicatorRenderer, PoolConfig};
use cadence_throttle::{ThrottleController, ThrottleMode, ThrottleSettings};
use cadence_timer::Scheduler;
use cadence_viewport::{FixedLayout, ViewportProximityModel, VisibilityOffset};
use kurbo::Rect;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
enum VizEvent {
    Scroll,
    ChangeDetection,
    ClearCounters,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DemoConfig {
    throttle: ThrottleSettings,
    pool: PoolConfig,
    scroll: ScrollConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ScrollConfig {
    visibility_offset: VisibilityOffset,
    viewport_height: f64,
    target_top: f64,
    target_height: f64,
    step_px: f64,
    step_ms: u64,
    steps: u32,
    animation_ms: u64,
    run_outside: bool,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            visibility_offset: VisibilityOffset::None,
            viewport_height: 800.0,
            target_top: 4000.0,
            target_height: 120.0,
            step_px: 12.0,
            step_ms: 16,
            steps: 400,
            animation_ms: 600,
            run_outside: false,
        }
    }
}

/// Pretend sprites. Newly shown sprites are queued so the host can start their animation.
struct Sprites {
    panel: &'static str,
    next: u32,
    started: Rc<RefCell<Vec<u32>>>,
}

struct Sprite {
    id: u32,
    color: &'static str,
}

impl IndicatorRenderer for Sprites {
    type Handle = Sprite;
    type Key = u32;
    type Tag = &'static str;

    fn create(&mut self, tag: &&'static str) -> Sprite {
        self.next += 1;
        tracing::trace!(panel = self.panel, id = self.next, "sprite created");
        self.started.borrow_mut().push(self.next);
        Sprite {
            id: self.next,
            color: *tag,
        }
    }

    fn reset(&mut self, sprite: &mut Sprite, tag: &&'static str) {
        sprite.color = *tag;
        self.started.borrow_mut().push(sprite.id);
    }

    fn key(&self, sprite: &Sprite) -> u32 {
        sprite.id
    }

    fn destroy(&mut self, sprite: Sprite) {
        tracing::trace!(
            panel = self.panel,
            id = sprite.id,
            color = sprite.color,
            "sprite destroyed"
        );
    }
}

struct Panel {
    indicator: EventIndicator<Sprites>,
    started: Rc<RefCell<Vec<u32>>>,
}

impl Panel {
    fn new(
        bus: &EventBus<VizEvent, f64>,
        scheduler: &Scheduler,
        config: PoolConfig,
        event: VizEvent,
        color: &'static str,
    ) -> Self {
        let started = Rc::new(RefCell::new(Vec::new()));
        let sprites = Sprites {
            panel: color,
            next: 0,
            started: started.clone(),
        };
        let pool = IndicatorPool::new(sprites, scheduler.clone(), config);
        let indicator = EventIndicator::bind(bus, event, VizEvent::ClearCounters, pool, color);
        Self { indicator, started }
    }

    /// Schedule the end of every animation started since the last call.
    fn start_animations(&self, scheduler: &Scheduler, animation: Duration) {
        let started: Vec<u32> = self.started.borrow_mut().drain(..).collect();
        for key in started {
            let pool = self.indicator.pool().clone();
            let _ = scheduler.schedule(animation, move || {
                pool.release(&key);
            });
        }
    }
}

fn load_config() -> Result<DemoConfig, Box<dyn std::error::Error>> {
    let path = std::env::args_os().nth(1).map_or_else(
        || PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/scroll_viz.toml"),
        PathBuf::from,
    );
    let text = std::fs::read_to_string(&path)?;
    let config = toml::from_str(&text)?;
    tracing::info!(path = %path.display(), "settings loaded");
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    let scroll = &config.scroll;
    let scheduler = Scheduler::new();

    let layout = FixedLayout::new(
        Rect::new(0.0, scroll.target_top, 320.0, scroll.target_top + scroll.target_height),
        scroll.viewport_height,
    );
    let model = Rc::new(RefCell::new(ViewportProximityModel::new()));
    model
        .borrow_mut()
        .initialize(layout, scroll.visibility_offset);

    let raw: Subject<f64> = Subject::new();
    let controller = ThrottleController::builder()
        .source(raw.clone())
        .scheduler(scheduler.clone())
        .settings(config.throttle.clone())
        .proximity(model.clone())
        .build()?;

    let bus: EventBus<VizEvent, f64> = EventBus::with_scheduler(scheduler.clone());
    let mut scroll_panel = Panel::new(&bus, &scheduler, config.pool, VizEvent::Scroll, "teal");
    let mut detect_panel = Panel::new(
        &bus,
        &scheduler,
        config.pool,
        VizEvent::ChangeDetection,
        "orange",
    );

    // Without the run-outside flag every throttled scroll also triggers a
    // change-detection pass, deferred to the next tick while throttling.
    let detection_mode = if controller.mode() != ThrottleMode::None && !scroll.run_outside {
        DispatchMode::NextTick
    } else {
        DispatchMode::Immediate
    };
    let publisher = bus.clone();
    let run_outside = scroll.run_outside;
    let _throttled = controller.stream().subscribe(move |y: &f64| {
        publisher.dispatch(VizEvent::Scroll, *y);
        if !run_outside {
            publisher.dispatch_with(VizEvent::ChangeDetection, *y, detection_mode);
        }
    });

    let step = Duration::from_millis(scroll.step_ms);
    let animation = Duration::from_millis(scroll.animation_ms);
    let mut y = 0.0;
    let mut first_visible = None;
    for i in 0..scroll.steps {
        scheduler.advance(step);
        y += scroll.step_px;
        let visible = model.borrow_mut().check_target_in_viewport(y);
        if visible && first_visible.is_none() {
            first_visible = Some(i);
            tracing::info!(scroll = y, "target entered the viewport");
        }
        raw.next(&y);
        scroll_panel.start_animations(&scheduler, animation);
        detect_panel.start_animations(&scheduler, animation);
        if i == scroll.steps / 2 {
            println!(
                "halfway: scroll={} detection={} proximity={:.2}",
                scroll_panel.indicator.event_count(),
                detect_panel.indicator.event_count(),
                controller.last_proximity()
            );
            bus.dispatch(VizEvent::ClearCounters, 0.0);
        }
    }

    // Let the remaining animations finish, then wait out the idle countdown.
    scheduler.advance(animation);
    scroll_panel.start_animations(&scheduler, animation);
    detect_panel.start_animations(&scheduler, animation);
    scheduler.advance(animation);
    println!(
        "after burst: scroll pool active={} free={}",
        scroll_panel.indicator.pool().active_len(),
        scroll_panel.indicator.pool().free_len()
    );
    scheduler.advance(config.pool.idle_eviction_delay);

    for (name, panel) in [("scroll", &scroll_panel), ("detection", &detect_panel)] {
        let pool = panel.indicator.pool();
        println!(
            "{name}: count={} active={} free={} stats={:?}",
            panel.indicator.event_count(),
            pool.active_len(),
            pool.free_len(),
            pool.stats()
        );
    }
    println!("first visible at step {first_visible:?}");

    scroll_panel.indicator.teardown();
    detect_panel.indicator.teardown();
    bus.destroy();
    Ok(())
}
