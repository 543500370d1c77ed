//! Frame loop controller.
//!
//! Tracks window state from [`PlatformEvent`]s and decides, on every tick,
//! which fixed physics steps and which render call to make. Nothing is
//! called while the window is minimized.

use std::time::{Duration, Instant};

use sprig_core::AspectViewport;
use sprig_platform::PlatformEvent;

use crate::config::AppConfig;

/// Longest wall-clock gap fed into the physics accumulator per tick.
const MAX_FRAME_GAP: Duration = Duration::from_millis(250);

/// Per-tick hooks driven by [`FrameLoop::tick`].
pub trait FrameCallbacks {
    type Error;

    /// One fixed physics step of `dt` seconds.
    fn on_physics(&mut self, dt: f32) -> Result<(), Self::Error>;

    /// Upload what changed and draw. `dt` is the time since the last render.
    fn on_render(&mut self, dt: f32) -> Result<(), Self::Error>;
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub physics_steps: u32,
    pub rendered: bool,
}

/// Window-state flags plus fixed-step and render pacing.
#[derive(Debug, Clone)]
pub struct FrameLoop {
    minimized: bool,
    maximized: bool,
    framebuffer_resized: bool,
    quit: bool,
    aspect_ratio: f32,
    viewport: AspectViewport,
    physics_step: Duration,
    render_interval: Option<Duration>,
    accumulator: Duration,
    last_tick: Option<Instant>,
    last_render: Option<Instant>,
}

impl FrameLoop {
    pub fn new(physics_step: Duration, render_interval: Option<Duration>, aspect_ratio: f32) -> Self {
        Self {
            minimized: false,
            maximized: false,
            framebuffer_resized: false,
            quit: false,
            aspect_ratio,
            viewport: AspectViewport::default(),
            physics_step,
            render_interval,
            accumulator: Duration::ZERO,
            last_tick: None,
            last_render: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let mut frame_loop = Self::new(
            config.physics_step(),
            config.render_interval(),
            config.aspect_ratio,
        );
        frame_loop.viewport = AspectViewport::fit(config.width, config.height, config.aspect_ratio);
        frame_loop
    }

    /// Apply a window-state event.
    pub fn handle_event(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::Minimized => self.minimized = true,
            PlatformEvent::Restored => {
                self.minimized = false;
                self.maximized = false;
            }
            PlatformEvent::Maximized => self.maximized = true,
            PlatformEvent::SizeChanged { width, height } => {
                self.minimized = false;
                self.viewport = AspectViewport::fit(width, height, self.aspect_ratio);
                self.framebuffer_resized = true;
            }
            PlatformEvent::Quit => self.quit = true,
        }
    }

    /// Run the physics steps that are due and, if the render interval has
    /// elapsed, one render.
    pub fn tick<C: FrameCallbacks>(&mut self, now: Instant, callbacks: &mut C) -> Result<TickReport, C::Error> {
        let mut report = TickReport::default();

        let elapsed = self
            .last_tick
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last))
            .min(MAX_FRAME_GAP);
        self.last_tick = Some(now);

        if self.quit || self.minimized {
            // Time spent minimized is not simulated.
            self.accumulator = Duration::ZERO;
            self.last_render = None;
            return Ok(report);
        }

        self.accumulator += elapsed;
        let step_secs = self.physics_step.as_secs_f32();
        while self.accumulator >= self.physics_step && !self.physics_step.is_zero() {
            callbacks.on_physics(step_secs)?;
            self.accumulator -= self.physics_step;
            report.physics_steps += 1;
        }

        let render_due = match (self.last_render, self.render_interval) {
            (None, _) | (_, None) => true,
            (Some(last), Some(interval)) => now.saturating_duration_since(last) >= interval,
        };
        if render_due {
            let dt = self
                .last_render
                .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f32());
            callbacks.on_render(dt)?;
            self.last_render = Some(now);
            report.rendered = true;
        }

        Ok(report)
    }

    /// Time until the next render is due, for sleeping between ticks.
    pub fn until_next_render(&self, now: Instant) -> Option<Duration> {
        let interval = self.render_interval?;
        let last = self.last_render?;
        Some(interval.saturating_sub(now.saturating_duration_since(last)))
    }

    /// Returns whether a resize was signalled since the last call.
    pub fn take_framebuffer_resized(&mut self) -> bool {
        std::mem::take(&mut self.framebuffer_resized)
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn is_maximized(&self) -> bool {
        self.maximized
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn viewport(&self) -> AspectViewport {
        self.viewport
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingScene {
        physics: u32,
        renders: u32,
    }

    impl FrameCallbacks for CountingScene {
        type Error = ();

        fn on_physics(&mut self, _dt: f32) -> Result<(), ()> {
            self.physics += 1;
            Ok(())
        }

        fn on_render(&mut self, _dt: f32) -> Result<(), ()> {
            self.renders += 1;
            Ok(())
        }
    }

    fn test_loop() -> FrameLoop {
        FrameLoop::new(Duration::from_millis(20), Some(Duration::from_millis(16)), 1.0)
    }

    #[test]
    fn minimized_loop_calls_nothing() {
        let mut frame_loop = test_loop();
        let mut scene = CountingScene::default();
        let start = Instant::now();

        frame_loop.handle_event(PlatformEvent::Minimized);
        for i in 1..=50 {
            let report = frame_loop
                .tick(start + Duration::from_millis(i * 20), &mut scene)
                .unwrap();
            assert_eq!(report, TickReport::default());
        }
        assert_eq!(scene.physics, 0);
        assert_eq!(scene.renders, 0);
    }

    #[test]
    fn size_change_unminimizes_and_flags_resize() {
        let mut frame_loop = test_loop();
        frame_loop.handle_event(PlatformEvent::Minimized);
        frame_loop.handle_event(PlatformEvent::SizeChanged {
            width: 800,
            height: 600,
        });
        assert!(!frame_loop.is_minimized());
        assert_eq!(frame_loop.viewport(), AspectViewport::fit(800, 600, 1.0));
        assert!(frame_loop.take_framebuffer_resized());
        assert!(!frame_loop.take_framebuffer_resized());
    }

    #[test]
    fn restore_clears_minimized_and_maximized() {
        let mut frame_loop = test_loop();
        frame_loop.handle_event(PlatformEvent::Maximized);
        frame_loop.handle_event(PlatformEvent::Minimized);
        assert!(frame_loop.is_maximized() && frame_loop.is_minimized());

        frame_loop.handle_event(PlatformEvent::Restored);
        assert!(!frame_loop.is_maximized());
        assert!(!frame_loop.is_minimized());
    }

    #[test]
    fn physics_runs_at_fixed_steps() {
        let mut frame_loop = test_loop();
        let mut scene = CountingScene::default();
        let start = Instant::now();

        frame_loop.tick(start, &mut scene).unwrap();
        let report = frame_loop
            .tick(start + Duration::from_millis(65), &mut scene)
            .unwrap();
        assert_eq!(report.physics_steps, 3);
        let report = frame_loop
            .tick(start + Duration::from_millis(80), &mut scene)
            .unwrap();
        assert_eq!(report.physics_steps, 1);
        assert_eq!(scene.physics, 4);
    }

    #[test]
    fn render_is_paced() {
        let mut frame_loop = test_loop();
        let mut scene = CountingScene::default();
        let start = Instant::now();

        assert!(frame_loop.tick(start, &mut scene).unwrap().rendered);
        assert!(!frame_loop
            .tick(start + Duration::from_millis(5), &mut scene)
            .unwrap()
            .rendered);
        assert!(frame_loop
            .tick(start + Duration::from_millis(17), &mut scene)
            .unwrap()
            .rendered);
        assert_eq!(scene.renders, 2);
    }

    #[test]
    fn time_spent_minimized_is_not_simulated() {
        let mut frame_loop = test_loop();
        let mut scene = CountingScene::default();
        let start = Instant::now();

        frame_loop.tick(start, &mut scene).unwrap();
        frame_loop.handle_event(PlatformEvent::Minimized);
        frame_loop
            .tick(start + Duration::from_secs(10), &mut scene)
            .unwrap();
        frame_loop.handle_event(PlatformEvent::Restored);
        let report = frame_loop
            .tick(start + Duration::from_millis(10_010), &mut scene)
            .unwrap();
        assert_eq!(report.physics_steps, 0);
        assert!(report.rendered);
    }

    #[test]
    fn quit_stops_callbacks() {
        let mut frame_loop = test_loop();
        let mut scene = CountingScene::default();
        frame_loop.handle_event(PlatformEvent::Quit);
        assert!(frame_loop.should_quit());
        frame_loop.tick(Instant::now(), &mut scene).unwrap();
        assert_eq!(scene.renders, 0);
    }
}
