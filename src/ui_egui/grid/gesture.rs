//! Gesture classification.
//!
//! [`GestureDetector`] turns the raw pointer stream into taps, long presses,
//! scrolls and flings using press timing and a touch slop, independent of
//! any input framework. [`GestureSession`] holds the per-press state the
//! grid keeps between pointer-down and pointer-up.

use egui::{Pos2, Vec2};

use super::velocity::VelocityTracker;
use crate::models::appointment::Appointment;
use crate::models::settings::GridConfig;

/// Raw pointer input, positions relative to the grid's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { pos: Pos2, time_ms: u64 },
    Move { pos: Pos2, time_ms: u64 },
    Up { pos: Pos2, time_ms: u64 },
    Cancel { time_ms: u64 },
}

impl PointerEvent {
    pub fn time_ms(&self) -> u64 {
        match *self {
            PointerEvent::Down { time_ms, .. }
            | PointerEvent::Move { time_ms, .. }
            | PointerEvent::Up { time_ms, .. }
            | PointerEvent::Cancel { time_ms } => time_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Down { pos: Pos2 },
    SingleTapUp { pos: Pos2 },
    LongPress { pos: Pos2 },
    /// `delta` is the distance the content should travel: previous pointer
    /// position minus the current one.
    Scroll { pos: Pos2, delta: Vec2 },
    /// Pointer velocity at release, px/s.
    Fling { velocity: Vec2 },
}

#[derive(Debug, Clone, Copy)]
struct Press {
    down_pos: Pos2,
    last_pos: Pos2,
    long_press_at_ms: u64,
    in_tap_region: bool,
    long_pressed: bool,
}

pub struct GestureDetector {
    touch_slop: f32,
    long_press_timeout_ms: u64,
    min_fling_velocity: f32,
    max_fling_velocity: f32,
    press: Option<Press>,
    tracker: VelocityTracker,
}

impl GestureDetector {
    pub fn new(config: &GridConfig) -> Self {
        Self {
            touch_slop: config.touch_slop,
            long_press_timeout_ms: config.long_press_timeout_ms,
            min_fling_velocity: config.min_fling_velocity,
            max_fling_velocity: config.max_fling_velocity,
            press: None,
            tracker: VelocityTracker::new(),
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.press.is_some()
    }

    /// Forgets the current press, including a pending long press.
    pub fn reset(&mut self) {
        self.press = None;
        self.tracker.reset();
    }

    /// When [`poll`](Self::poll) next has something to report.
    pub fn next_deadline(&self) -> Option<u64> {
        self.press
            .filter(|press| press.in_tap_region && !press.long_pressed)
            .map(|press| press.long_press_at_ms)
    }

    /// Fires the long press once the pointer has rested long enough.
    pub fn poll(&mut self, now_ms: u64) -> Option<Gesture> {
        let press = self.press.as_mut()?;
        if press.in_tap_region && !press.long_pressed && now_ms >= press.long_press_at_ms {
            press.long_pressed = true;
            return Some(Gesture::LongPress { pos: press.down_pos });
        }
        None
    }

    pub fn handle(&mut self, event: PointerEvent) -> Vec<Gesture> {
        let mut gestures = Vec::new();
        if let Some(long_press) = self.poll(event.time_ms()) {
            gestures.push(long_press);
        }

        match event {
            PointerEvent::Down { pos, time_ms } => {
                self.tracker.reset();
                self.tracker.add(time_ms, pos);
                self.press = Some(Press {
                    down_pos: pos,
                    last_pos: pos,
                    long_press_at_ms: time_ms + self.long_press_timeout_ms,
                    in_tap_region: true,
                    long_pressed: false,
                });
                gestures.push(Gesture::Down { pos });
            }
            PointerEvent::Move { pos, time_ms } => {
                let Some(press) = self.press.as_mut() else {
                    return gestures;
                };
                self.tracker.add(time_ms, pos);
                if press.long_pressed {
                    return gestures;
                }

                let delta = press.last_pos - pos;
                if press.in_tap_region {
                    if (pos - press.down_pos).length() > self.touch_slop {
                        press.in_tap_region = false;
                        press.last_pos = pos;
                        gestures.push(Gesture::Scroll { pos, delta });
                    }
                } else if delta.x.abs() >= 1.0 || delta.y.abs() >= 1.0 {
                    press.last_pos = pos;
                    gestures.push(Gesture::Scroll { pos, delta });
                }
            }
            PointerEvent::Up { pos, time_ms } => {
                let Some(press) = self.press.take() else {
                    return gestures;
                };
                self.tracker.add(time_ms, pos);
                if press.long_pressed {
                    // The long press already consumed this gesture.
                } else if press.in_tap_region {
                    gestures.push(Gesture::SingleTapUp { pos });
                } else {
                    let velocity = self.tracker.velocity(time_ms);
                    if velocity.x.abs() > self.min_fling_velocity
                        || velocity.y.abs() > self.min_fling_velocity
                    {
                        let max = self.max_fling_velocity;
                        gestures.push(Gesture::Fling {
                            velocity: Vec2::new(
                                velocity.x.clamp(-max, max),
                                velocity.y.clamp(-max, max),
                            ),
                        });
                    }
                }
                self.tracker.reset();
            }
            PointerEvent::Cancel { .. } => self.reset(),
        }

        gestures
    }
}

/// Scroll axis lock for the current press.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TouchMode {
    #[default]
    Initial,
    Down,
    HorizontalScroll,
    VerticalScroll,
}

impl TouchMode {
    /// The axis a first scroll step commits to; ties go vertical.
    pub fn for_first_scroll(delta: Vec2) -> Self {
        if delta.x.abs().trunc() > delta.y.abs().trunc() {
            TouchMode::HorizontalScroll
        } else {
            TouchMode::VerticalScroll
        }
    }
}

/// Per-press state, reset when the pointer goes down and dropped on up.
#[derive(Debug, Default, Clone)]
pub struct GestureSession {
    pub touch_mode: TouchMode,
    pub scrolling: bool,
    pub down_time_ms: u64,
    /// Appointment found under the pointer on down, highlighted once the
    /// tap timeout passes.
    pub pending_click: Option<Appointment>,
    /// Appointment currently shown in the pressed colour.
    pub clicked: Option<Appointment>,
}

impl GestureSession {
    pub fn clear_click(&mut self) {
        self.pending_click = None;
        self.clicked = None;
    }
}
