//! Scroll physics: bounded offset, fling deceleration and overscroll glow.

use egui::{vec2, Vec2};

use crate::models::settings::GridConfig;

/// Below this speed (px/s) a fling is considered settled.
const SETTLE_VELOCITY: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Top, Edge::Bottom, Edge::Left, Edge::Right];

    fn index(self) -> usize {
        match self {
            Edge::Top => 0,
            Edge::Bottom => 1,
            Edge::Left => 2,
            Edge::Right => 3,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct EdgeState {
    pull: f32,
    released_at_ms: Option<u64>,
}

/// Decorative pull indicator for the four scroll bounds.
///
/// A pull accumulates strength in `[0, 1]`; once released it fades out
/// linearly over the configured duration.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeGlow {
    edges: [EdgeState; 4],
    fade_ms: u64,
}

impl EdgeGlow {
    pub fn new(fade_ms: u64) -> Self {
        Self {
            edges: [EdgeState::default(); 4],
            fade_ms: fade_ms.max(1),
        }
    }

    pub fn pull(&mut self, edge: Edge, amount: f32) {
        let state = &mut self.edges[edge.index()];
        state.pull = (state.pull + amount.abs()).min(1.0);
        state.released_at_ms = None;
    }

    pub fn release(&mut self, edge: Edge, now_ms: u64) {
        let state = &mut self.edges[edge.index()];
        if state.pull > 0.0 && state.released_at_ms.is_none() {
            state.released_at_ms = Some(now_ms);
        }
    }

    pub fn release_all(&mut self, now_ms: u64) {
        for edge in Edge::ALL {
            self.release(edge, now_ms);
        }
    }

    pub fn is_pulled(&self, edge: Edge) -> bool {
        let state = &self.edges[edge.index()];
        state.pull > 0.0 && state.released_at_ms.is_none()
    }

    /// Current strength of one edge in `[0, 1]`.
    pub fn intensity(&self, edge: Edge, now_ms: u64) -> f32 {
        let state = &self.edges[edge.index()];
        match state.released_at_ms {
            None => state.pull,
            Some(released) => {
                let elapsed = now_ms.saturating_sub(released) as f32;
                let remaining = 1.0 - elapsed / self.fade_ms as f32;
                (state.pull * remaining).max(0.0)
            }
        }
    }

    pub fn is_finished(&self, now_ms: u64) -> bool {
        Edge::ALL
            .iter()
            .all(|edge| self.intensity(*edge, now_ms) <= 0.0)
    }

    /// Forgets edges whose fade has completed.
    pub fn settle(&mut self, now_ms: u64) {
        for edge in Edge::ALL {
            if self.intensity(edge, now_ms) <= 0.0 {
                self.edges[edge.index()] = EdgeState::default();
            }
        }
    }
}

/// Exponentially decaying fling: `x(t) = x0 + v0 / k * (1 - e^(-k t))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fling {
    start_ms: u64,
    origin: Vec2,
    velocity: Vec2,
    friction: f32,
}

impl Fling {
    pub fn new(start_ms: u64, origin: Vec2, velocity: Vec2, friction: f32) -> Self {
        Self {
            start_ms,
            origin,
            velocity,
            friction: friction.max(f32::EPSILON),
        }
    }

    fn elapsed_secs(&self, now_ms: u64) -> f32 {
        now_ms.saturating_sub(self.start_ms) as f32 / 1000.0
    }

    pub fn position(&self, now_ms: u64) -> Vec2 {
        let decay = 1.0 - (-self.friction * self.elapsed_secs(now_ms)).exp();
        self.origin + self.velocity / self.friction * decay
    }

    pub fn velocity(&self, now_ms: u64) -> Vec2 {
        self.velocity * (-self.friction * self.elapsed_secs(now_ms)).exp()
    }

    /// Where the fling would come to rest without bounds.
    pub fn final_position(&self) -> Vec2 {
        self.origin + self.velocity / self.friction
    }
}

/// Scroll offset clamped to `[0, max.x] x [0, max.y]`.
#[derive(Debug, Clone)]
pub struct ScrollPhysics {
    offset: Vec2,
    max: Vec2,
    view_size: Vec2,
    friction: f32,
    fling: Option<Fling>,
    glow: EdgeGlow,
}

impl ScrollPhysics {
    pub fn new(config: &GridConfig) -> Self {
        Self {
            offset: Vec2::ZERO,
            max: Vec2::ZERO,
            view_size: Vec2::ZERO,
            friction: config.fling_friction,
            fling: None,
            glow: EdgeGlow::new(config.glow_fade_ms),
        }
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn max(&self) -> Vec2 {
        self.max
    }

    pub fn glow(&self) -> &EdgeGlow {
        &self.glow
    }

    pub fn is_flinging(&self) -> bool {
        self.fling.is_some()
    }

    /// New bounds after a resize or column change; the offset is pulled back
    /// inside them.
    pub fn set_bounds(&mut self, max: Vec2, view_size: Vec2) {
        self.max = max.max(Vec2::ZERO);
        self.view_size = view_size;
        self.offset = self.clamp(self.offset);
    }

    pub fn scroll_to(&mut self, offset: Vec2) {
        self.offset = self.clamp(offset);
    }

    fn clamp(&self, offset: Vec2) -> Vec2 {
        vec2(
            clamp_axis(offset.x, self.max.x),
            clamp_axis(offset.y, self.max.y),
        )
    }

    pub fn drag_horizontal(&mut self, delta: f32, now_ms: u64) {
        let (offset, max, extent) = (self.offset.x, self.max.x, self.view_size.x);
        self.offset.x = self.drag_axis(offset, delta, max, extent, Edge::Left, Edge::Right, now_ms);
    }

    pub fn drag_vertical(&mut self, delta: f32, now_ms: u64) {
        let (offset, max, extent) = (self.offset.y, self.max.y, self.view_size.y);
        self.offset.y = self.drag_axis(offset, delta, max, extent, Edge::Top, Edge::Bottom, now_ms);
    }

    #[allow(clippy::too_many_arguments)]
    fn drag_axis(
        &mut self,
        offset: f32,
        delta: f32,
        max: f32,
        extent: f32,
        low: Edge,
        high: Edge,
        now_ms: u64,
    ) -> f32 {
        let target = offset + delta;
        let extent = extent.max(1.0);

        if target < 0.0 {
            self.glow.pull(low, target / extent);
            self.glow.release(high, now_ms);
            0.0
        } else if target > max {
            self.glow.pull(high, (target - max) / extent);
            self.glow.release(low, now_ms);
            max
        } else {
            // Moving back from an edge lets its glow go.
            if delta > 0.0 {
                self.glow.release(low, now_ms);
            } else if delta < 0.0 {
                self.glow.release(high, now_ms);
            }
            target
        }
    }

    pub fn release_glow(&mut self, now_ms: u64) {
        self.glow.release_all(now_ms);
    }

    /// Starts a fling with `velocity` in content px/s.
    pub fn fling(&mut self, velocity: Vec2, now_ms: u64) {
        self.fling = Some(Fling::new(now_ms, self.offset, velocity, self.friction));
        log::debug!("Fling from {:?} at {:?} px/s", self.offset, velocity);
    }

    pub fn stop(&mut self) {
        self.fling = None;
    }

    /// Advances the fling to `now_ms`. Returns true while it is still moving.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        self.glow.settle(now_ms);

        let Some(fling) = self.fling else {
            return false;
        };

        let position = fling.position(now_ms);
        let clamped = self.clamp(position);
        self.offset = clamped;

        let velocity = fling.velocity(now_ms);
        let axis_done = |speed: f32, pos: f32, clamped: f32| {
            speed.abs() < SETTLE_VELOCITY || (pos - clamped).abs() > f32::EPSILON
        };
        let settled = axis_done(velocity.x, position.x, clamped.x)
            && axis_done(velocity.y, position.y, clamped.y);

        if settled {
            self.fling = None;
        }
        !settled
    }

    /// True while a fling or glow fade still needs frames.
    pub fn is_animating(&self, now_ms: u64) -> bool {
        self.fling.is_some() || !self.glow.is_finished(now_ms)
    }
}

fn clamp_axis(value: f32, max: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max.max(0.0))
    }
}
