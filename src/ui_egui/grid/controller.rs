//! Widget controller.
//!
//! [`AppointmentGrid`] owns the displayed day, the selection, the loaded
//! appointments and every timer. It is driven from one thread: the host
//! feeds it pointer events and clock ticks, drains its messages and asks it
//! for a [`DrawList`] each frame. Time arguments (`now_ms`) come from a
//! monotonic source chosen by the host; wall-clock time is only read through
//! the injected [`Clock`].

use std::sync::mpsc::{self, Receiver, Sender};

use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use egui::{vec2, Pos2, Vec2};

use super::geometry::{layout_appointments, GridMetrics};
use super::gesture::{Gesture, GestureDetector, GestureSession, PointerEvent, TouchMode};
use super::palette::GridPalette;
use super::picking::{self, Pick, Selection, SelectionMode};
use super::renderer::{self, DrawList, Scene};
use super::scheduler::{Scheduler, TaskHandle};
use super::scroll::ScrollPhysics;
use super::text_layout::TextLayoutCache;
use crate::models::appointment::Appointment;
use crate::models::resource::ResourceList;
use crate::models::settings::GridConfig;
use crate::services::loader::{AppointmentLoader, LoadRequest, LoadResponse};
use crate::services::timezone::{parse_zone, TimeZoneResolver};
use crate::utils::clock::Clock;
use crate::utils::date::{
    add_wall_clock_hour, instant_at_hour, julian_day_of, minutes_since_midnight, MINUTES_PER_HOUR,
};

/// Length of the appointment fade-in started by an animated day change.
const APPOINTMENT_FADE_MS: u64 = 200;

/// Intents sent to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum GridMessage {
    /// Create an appointment in an empty slot.
    New {
        resource: String,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    },
    /// Open an existing appointment.
    View {
        id: i64,
        resource: String,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    },
}

/// Raised by a long press; the host decides what menu to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextRequest {
    pub column: usize,
    pub hour: u32,
    pub appointment_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GridTask {
    UpdateCurrentTime,
    SetClick,
    ClearClick,
}

pub struct AppointmentGrid {
    config: GridConfig,
    resources: ResourceList,
    metrics: GridMetrics,
    hour_label_width: f32,

    physics: ScrollPhysics,
    detector: GestureDetector,
    session: GestureSession,
    selection: Selection,
    selected_appointment: Option<usize>,

    appointments: Vec<Appointment>,
    text_cache: TextLayoutCache,

    scheduler: Scheduler<GridTask>,
    current_time_task: Option<TaskHandle>,

    loader: Box<dyn AppointmentLoader>,
    reply: Sender<LoadResponse>,
    replies: Receiver<LoadResponse>,
    generation: u64,

    zone_resolver: Box<dyn TimeZoneResolver>,
    clock: Box<dyn Clock>,
    zone: Tz,
    day: i32,
    today: i32,
    now_minute: u32,

    active: bool,
    now_ms: u64,
    appointments_alpha: u8,
    fade_started_ms: Option<u64>,

    messages: Vec<GridMessage>,
    context_request: Option<ContextRequest>,
}

impl AppointmentGrid {
    pub fn new(
        config: GridConfig,
        resources: ResourceList,
        shown_columns: usize,
        loader: Box<dyn AppointmentLoader>,
        zone_resolver: Box<dyn TimeZoneResolver>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let zone = parse_zone(&zone_resolver.current_time_zone()).unwrap_or(Tz::UTC);
        let now = clock.now().with_timezone(&zone);
        let metrics = GridMetrics::new(
            &config,
            Vec2::ZERO,
            resources.len(),
            shown_columns,
            config.hour_gutter_width,
        );
        let (reply, replies) = mpsc::channel();

        Self {
            physics: ScrollPhysics::new(&config),
            detector: GestureDetector::new(&config),
            text_cache: TextLayoutCache::new(config.max_text_len),
            hour_label_width: 0.0,
            metrics,
            session: GestureSession::default(),
            selection: Selection::new(0, 0),
            selected_appointment: None,
            appointments: Vec::new(),
            scheduler: Scheduler::new(),
            current_time_task: None,
            loader,
            reply,
            replies,
            generation: 0,
            zone_resolver,
            clock,
            zone,
            day: julian_day_of(&now),
            today: julian_day_of(&now),
            now_minute: minutes_since_midnight(&now),
            active: true,
            now_ms: 0,
            appointments_alpha: u8::MAX,
            fade_started_ms: None,
            messages: Vec::new(),
            context_request: None,
            config,
            resources,
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn resources(&self) -> &ResourceList {
        &self.resources
    }

    pub fn metrics(&self) -> &GridMetrics {
        &self.metrics
    }

    pub fn scroll_offset(&self) -> Vec2 {
        self.physics.offset()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn visible_day(&self) -> i32 {
        self.day
    }

    pub fn today(&self) -> i32 {
        self.today
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_scrolling(&self) -> bool {
        self.session.scrolling
    }

    /// True between pointer-down and pointer-up/cancel.
    pub fn is_pressed(&self) -> bool {
        self.detector.is_pressed()
    }

    // ---- host API -------------------------------------------------------

    /// Shows the day containing `instant` with the selection on its hour in
    /// `resource`'s column, then reloads.
    ///
    /// Unless `ignore_selection` is set the view scrolls vertically to bring
    /// the selected hour into view. `animate` fades the appointments in.
    pub fn set_visible_day<Z: TimeZone>(
        &mut self,
        instant: DateTime<Z>,
        resource: &str,
        ignore_selection: bool,
        animate: bool,
    ) {
        let local = instant.with_timezone(&self.zone);
        self.day = julian_day_of(&local);
        self.selection.hour = minutes_since_midnight(&local) / MINUTES_PER_HOUR;
        self.selection.column = self.resources.index_of(resource);
        self.selected_appointment = None;
        self.cancel_click();
        log::info!(
            "Showing day {} for '{}' at hour {}",
            self.day,
            resource,
            self.selection.hour
        );

        if !ignore_selection {
            self.reveal_selected_hour();
        }
        if animate {
            self.appointments_alpha = 0;
            self.fade_started_ms = Some(self.now_ms);
        }

        self.relayout();
        self.reload();
    }

    /// Re-requests the displayed day. Selection is kept.
    pub fn reload(&mut self) {
        self.refresh_time_zone();
        self.selected_appointment = None;
        if !self.active {
            return;
        }

        self.generation += 1;
        let request = LoadRequest {
            julian_day: self.day,
            zone: self.zone,
            generation: self.generation,
        };
        log::debug!(
            "Requesting appointments for day {} (generation {})",
            request.julian_day,
            request.generation
        );
        self.loader.load(request, self.reply.clone());
    }

    /// Start of the selected hour on the displayed day.
    pub fn selected_instant(&self) -> Option<DateTime<Tz>> {
        instant_at_hour(&self.zone, self.day, self.selection.hour)
    }

    pub fn selected_minutes_since_midnight(&self) -> u32 {
        self.selection.hour * MINUTES_PER_HOUR
    }

    /// The picked appointment, or a one-hour draft for the selected cell.
    pub fn selected_appointment(&self) -> Option<Appointment> {
        if let Some(appointment) = self
            .selected_appointment
            .and_then(|index| self.appointments.get(index))
        {
            return Some(appointment.clone());
        }

        let start = self.selected_instant()?;
        let mut draft = Appointment::draft(self.day, start, self.selected_minutes_since_midnight());
        draft.resource = self.resources.name(self.selection.column).map(str::to_string);
        Some(draft)
    }

    pub fn is_appointment_selected(&self) -> bool {
        self.selected_appointment.is_some()
    }

    pub fn on_resume(&mut self) {
        if !self.active {
            return;
        }
        log::info!("Appointment grid resumed");
        self.selection.mode = SelectionMode::Hidden;
        self.loader.start();
        self.refresh_time_zone();
        self.restart_current_time_updates();
        self.reload();
    }

    pub fn on_pause(&mut self) {
        log::info!("Appointment grid paused");
        self.cleanup();
        self.loader.stop();
    }

    /// Cancels every timer, the press in progress with its pending long
    /// press, any click flash and the appointment fade, and stops scrolling.
    pub fn cleanup(&mut self) {
        self.scheduler.clear();
        self.current_time_task = None;
        self.detector.reset();
        self.session.clear_click();
        self.session.touch_mode = TouchMode::Initial;
        self.session.scrolling = false;
        self.physics.stop();
        self.physics.release_glow(self.now_ms);
        self.stop_appointments_animation();
    }

    /// Final teardown. Late loader answers are ignored from here on.
    pub fn destroy(&mut self) {
        self.cleanup();
        self.active = false;
        self.loader.stop();
        let dropped = self.replies.try_iter().count();
        log::info!(
            "Appointment grid destroyed ({} pending load result(s) dropped)",
            dropped
        );
    }

    pub fn set_appointments_alpha(&mut self, alpha: u8) {
        self.fade_started_ms = None;
        self.appointments_alpha = alpha;
    }

    pub fn appointments_alpha(&self) -> u8 {
        self.appointments_alpha
    }

    pub fn stop_appointments_animation(&mut self) {
        self.fade_started_ms = None;
        self.appointments_alpha = u8::MAX;
    }

    pub fn take_messages(&mut self) -> Vec<GridMessage> {
        std::mem::take(&mut self.messages)
    }

    pub fn take_context_request(&mut self) -> Option<ContextRequest> {
        self.context_request.take()
    }

    // ---- sizing ---------------------------------------------------------

    pub fn set_view_size(&mut self, size: Vec2) {
        if size == self.metrics.view_size {
            return;
        }
        self.remeasure(size);
    }

    /// Width of the widest hour label; the gutter grows to fit it.
    pub fn set_hour_label_width(&mut self, width: f32) {
        let width = width + self.config.hours_left_margin + self.config.hours_right_margin;
        if (width - self.hour_label_width).abs() < f32::EPSILON {
            return;
        }
        self.hour_label_width = width;
        self.remeasure(self.metrics.view_size);
    }

    fn remeasure(&mut self, size: Vec2) {
        self.metrics = GridMetrics::new(
            &self.config,
            size,
            self.resources.len(),
            self.metrics.shown_columns,
            self.hour_label_width,
        );
        self.physics.set_bounds(self.metrics.max_scroll(), size);
        self.relayout();
    }

    fn relayout(&mut self) {
        layout_appointments(
            &self.config,
            &self.metrics,
            &self.resources,
            self.day,
            &mut self.appointments,
        );
    }

    fn reveal_selected_hour(&mut self) {
        let grid_height = (self.metrics.view_size.y - self.metrics.header_height).max(0.0);
        let top = self.metrics.hour_top(self.selection.hour);
        let bottom = self.metrics.hour_top(self.selection.hour + 1);
        let offset = self.physics.offset();

        let y = if top < offset.y {
            top
        } else if bottom > offset.y + grid_height {
            bottom - grid_height
        } else {
            offset.y
        };
        self.physics.scroll_to(vec2(offset.x, y));
    }

    // ---- time -----------------------------------------------------------

    /// Follows the resolver's zone, keeping the displayed wall-clock day.
    fn refresh_time_zone(&mut self) {
        let Some(zone) = parse_zone(&self.zone_resolver.current_time_zone()) else {
            return;
        };
        if zone == self.zone {
            return;
        }

        log::info!("Time zone changed from {} to {}", self.zone, zone);
        self.zone = zone;
        for appointment in &mut self.appointments {
            appointment.project_into(&zone);
        }
        self.update_now();
        self.relayout();
    }

    fn update_now(&mut self) {
        let now = self.clock.now().with_timezone(&self.zone);
        self.today = julian_day_of(&now);
        self.now_minute = minutes_since_midnight(&now);
    }

    pub fn restart_current_time_updates(&mut self) {
        if let Some(handle) = self.current_time_task.take() {
            self.scheduler.cancel(handle);
        }
        self.update_current_time();
    }

    /// Refreshes "now" and schedules the next refresh on a period boundary
    /// of wall-clock time.
    fn update_current_time(&mut self) {
        self.update_now();

        let period = self.config.current_time_refresh_ms.max(1);
        let wall_ms = self.clock.now().timestamp_millis().max(0) as u64;
        let delay = period - wall_ms % period;
        self.current_time_task = Some(self.scheduler.schedule_after(
            self.now_ms,
            delay,
            GridTask::UpdateCurrentTime,
        ));
    }

    /// Runs everything due at `now_ms`: long-press detection, timers, scroll
    /// animation, the appointment fade and pending load results.
    pub fn tick(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);

        if let Some(gesture) = self.detector.poll(now_ms) {
            self.on_gesture(gesture, now_ms);
        }
        while let Some(task) = self.scheduler.pop_due(now_ms) {
            self.run_task(task);
        }
        self.physics.tick(now_ms);
        self.advance_fade(now_ms);
        self.poll_loads();
    }

    /// When the host should call [`tick`](Self::tick) next.
    pub fn next_wakeup(&self, now_ms: u64) -> Option<u64> {
        let frame = (self.physics.is_animating(now_ms) || self.fade_started_ms.is_some())
            .then(|| now_ms + self.config.frame_interval_ms);

        [self.scheduler.next_due(), self.detector.next_deadline(), frame]
            .into_iter()
            .flatten()
            .min()
    }

    fn advance_fade(&mut self, now_ms: u64) {
        let Some(started) = self.fade_started_ms else {
            return;
        };
        let elapsed = now_ms.saturating_sub(started);
        if elapsed >= APPOINTMENT_FADE_MS {
            self.stop_appointments_animation();
        } else {
            self.appointments_alpha = (elapsed * u8::MAX as u64 / APPOINTMENT_FADE_MS) as u8;
        }
    }

    fn run_task(&mut self, task: GridTask) {
        match task {
            GridTask::UpdateCurrentTime => self.update_current_time(),
            GridTask::SetClick => {
                self.session.clicked = self.session.pending_click.take();
            }
            GridTask::ClearClick => {
                if let Some(clicked) = self.session.clicked.take() {
                    let resource = self.selected_resource_name();
                    log::debug!("Viewing appointment {}", clicked.id);
                    self.messages.push(GridMessage::View {
                        id: clicked.id,
                        resource,
                        start: clicked.start.with_timezone(&self.zone),
                        end: clicked.end.with_timezone(&self.zone),
                    });
                }
            }
        }
    }

    // ---- loading --------------------------------------------------------

    /// Applies loader answers that arrived since the last call.
    pub fn poll_loads(&mut self) {
        while let Ok(response) = self.replies.try_recv() {
            self.apply_load(response);
        }
    }

    fn apply_load(&mut self, response: LoadResponse) {
        if !self.active {
            log::debug!("Dropping load result for inactive grid");
            return;
        }
        if response.request.julian_day != self.day {
            log::debug!(
                "Dropping stale load for day {} (showing {})",
                response.request.julian_day,
                self.day
            );
            return;
        }

        match response.result {
            Ok(appointments) => {
                log::debug!(
                    "Loaded {} appointment(s) for day {}",
                    appointments.len(),
                    self.day
                );
                self.appointments = appointments;
                self.text_cache.reset(self.appointments.len());
                self.selected_appointment = None;
                self.relayout();
            }
            Err(err) => log::warn!("Failed to load appointments for day {}: {}", self.day, err),
        }
    }

    // ---- input ----------------------------------------------------------

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        let now_ms = event.time_ms();
        self.now_ms = self.now_ms.max(now_ms);

        if let PointerEvent::Up { .. } = event {
            self.physics.release_glow(now_ms);
        }

        for gesture in self.detector.handle(event) {
            self.on_gesture(gesture, now_ms);
        }

        if let PointerEvent::Up { .. } | PointerEvent::Cancel { .. } = event {
            self.session.scrolling = false;
            self.session.touch_mode = TouchMode::Initial;
        }
    }

    fn on_gesture(&mut self, gesture: Gesture, now_ms: u64) {
        match gesture {
            Gesture::Down { pos } => self.on_down(pos, now_ms),
            Gesture::SingleTapUp { pos } => self.on_single_tap(pos, now_ms),
            Gesture::LongPress { pos } => self.on_long_press(pos),
            Gesture::Scroll { delta, .. } => self.on_scroll(delta, now_ms),
            Gesture::Fling { velocity } => self.on_fling(velocity, now_ms),
        }
    }

    fn pick_at(&self, pos: Pos2) -> Option<Pick> {
        picking::pick(
            &self.metrics,
            self.physics.offset(),
            pos,
            &self.appointments,
            &self.resources,
            self.day,
            self.config.proximity_radius,
        )
    }

    fn select(&mut self, pick: &Pick) {
        self.selection.column = pick.column;
        self.selection.hour = pick.hour;
        self.selected_appointment = pick.appointment;
    }

    fn cancel_click(&mut self) {
        self.scheduler
            .cancel_where(|task| matches!(task, GridTask::SetClick | GridTask::ClearClick));
        self.session.clear_click();
    }

    fn on_down(&mut self, pos: Pos2, now_ms: u64) {
        self.physics.stop();
        self.session.touch_mode = TouchMode::Down;

        // Trial pick: decides the click flash without touching the selection.
        let Some(trial) = self.pick_at(pos) else {
            return;
        };
        let pressed_selected = self.selection.is_pressed_by(&trial);
        match trial.appointment {
            Some(index) if !pressed_selected => {
                self.session.pending_click = self.appointments.get(index).cloned();
                self.session.down_time_ms = now_ms;
                self.scheduler.schedule_after(
                    now_ms,
                    self.config.tap_timeout_ms,
                    GridTask::SetClick,
                );
            }
            _ => self.cancel_click(),
        }
    }

    fn on_single_tap(&mut self, pos: Pos2, now_ms: u64) {
        if self.session.scrolling {
            return;
        }
        let Some(pick) = self.pick_at(pos) else {
            return;
        };

        let pressed_selected = self.selection.is_pressed_by(&pick);
        self.select(&pick);

        if pressed_selected && self.session.pending_click.is_none() {
            self.selection.mode = SelectionMode::Selected;
            self.emit_new();
        } else if pick.appointment.is_some() {
            self.selection.mode = SelectionMode::Hidden;
            let elapsed = now_ms.saturating_sub(self.session.down_time_ms);
            let delay = (self.config.click_display_ms + self.config.tap_timeout_ms)
                .saturating_sub(elapsed);
            self.scheduler
                .schedule_after(now_ms, delay, GridTask::ClearClick);
        } else {
            self.selection.mode = SelectionMode::Selected;
        }
    }

    fn emit_new(&mut self) {
        let Some(start) = self.selected_instant() else {
            log::warn!("No valid instant for day {} hour {}", self.day, self.selection.hour);
            return;
        };
        let Some(end) = add_wall_clock_hour(&start) else {
            log::warn!("No valid end instant after {}", start);
            return;
        };

        let resource = self.selected_resource_name();
        log::debug!("New appointment requested for '{}' at {}", resource, start);
        self.messages.push(GridMessage::New {
            resource,
            start,
            end,
        });
    }

    fn selected_resource_name(&self) -> String {
        self.resources
            .name(self.selection.column)
            .unwrap_or_default()
            .to_string()
    }

    fn on_long_press(&mut self, pos: Pos2) {
        self.cancel_click();
        if self.session.scrolling {
            return;
        }
        let Some(pick) = self.pick_at(pos) else {
            return;
        };

        self.select(&pick);
        self.selection.mode = SelectionMode::LongPress;
        self.context_request = Some(ContextRequest {
            column: pick.column,
            hour: pick.hour,
            appointment_id: pick
                .appointment
                .and_then(|index| self.appointments.get(index))
                .map(|appointment| appointment.id),
        });
    }

    fn on_scroll(&mut self, delta: Vec2, now_ms: u64) {
        if self.session.touch_mode == TouchMode::Down {
            self.session.touch_mode = TouchMode::for_first_scroll(delta);
            // A drag is never a click.
            self.cancel_click();
            log::debug!("Scroll axis locked: {:?}", self.session.touch_mode);
        }

        match self.session.touch_mode {
            TouchMode::HorizontalScroll => self.physics.drag_horizontal(delta.x, now_ms),
            TouchMode::VerticalScroll => self.physics.drag_vertical(delta.y, now_ms),
            TouchMode::Initial | TouchMode::Down => {}
        }

        self.session.scrolling = true;
        self.selection.mode = SelectionMode::Hidden;
    }

    /// Wheel and trackpad scrolling; `delta` is in content movement
    /// direction, as egui reports it.
    pub fn scroll_by(&mut self, delta: Vec2) {
        if delta == Vec2::ZERO {
            return;
        }
        self.physics.stop();
        self.physics.scroll_to(self.physics.offset() - delta);
        self.selection.mode = SelectionMode::Hidden;
    }

    fn on_fling(&mut self, velocity: Vec2, now_ms: u64) {
        self.session.scrolling = true;
        self.physics.fling(-velocity, now_ms);
        self.session.touch_mode = TouchMode::Initial;
    }

    // ---- rendering ------------------------------------------------------

    pub fn render(&mut self, palette: &GridPalette) -> DrawList {
        let scene = Scene {
            config: &self.config,
            metrics: &self.metrics,
            palette,
            scroll: self.physics.offset(),
            resources: &self.resources,
            appointments: &self.appointments,
            selection: self.selection,
            clicked_id: self.session.clicked.as_ref().map(|appointment| appointment.id),
            day: self.day,
            today: self.today,
            now_minute: self.now_minute,
            appointments_alpha: self.appointments_alpha,
            glow: self.physics.glow(),
            now_ms: self.now_ms,
        };
        renderer::build(&scene, &mut self.text_cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::loader::{InMemoryLoader, MockAppointmentLoader};
    use crate::services::timezone::{ConfiguredTimeZone, MockTimeZoneResolver};
    use crate::utils::clock::ManualClock;
    use chrono::Utc;
    use egui::pos2;
    use pretty_assertions::assert_eq;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 8, 2, 0).unwrap()
    }

    fn resources() -> ResourceList {
        ResourceList::new(["Karos", "Colin", "Mechelle", "Tom"])
    }

    fn appointment(id: i64, resource: &str, start_hour: u32, end_hour: u32) -> Appointment {
        let mut appointment = Appointment::new(
            id,
            format!("Booking {}", id),
            Utc.with_ymd_and_hms(2024, 5, 10, start_hour, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 10, end_hour, 0, 0).unwrap(),
        )
        .unwrap();
        appointment.resource = Some(resource.to_string());
        appointment
    }

    fn grid_with(appointments: Vec<Appointment>) -> (AppointmentGrid, Rc<ManualClock>) {
        let clock = Rc::new(ManualClock::new(now()));
        let mut grid = AppointmentGrid::new(
            GridConfig::default(),
            resources(),
            4,
            Box::new(InMemoryLoader::new(appointments)),
            Box::new(ConfiguredTimeZone::new("UTC")),
            Box::new(Rc::clone(&clock)),
        );
        grid.set_view_size(vec2(800.0, 600.0));
        grid.on_resume();
        grid.poll_loads();
        (grid, clock)
    }

    fn tap(grid: &mut AppointmentGrid, pos: Pos2, at_ms: u64) {
        grid.handle_pointer(PointerEvent::Down { pos, time_ms: at_ms });
        grid.tick(at_ms + 20);
        grid.handle_pointer(PointerEvent::Up {
            pos,
            time_ms: at_ms + 40,
        });
    }

    #[test]
    fn test_resume_loads_today() {
        let (grid, _) = grid_with(vec![appointment(1, "Colin", 9, 10)]);
        assert_eq!(grid.appointments().len(), 1);
        assert_eq!(grid.visible_day(), grid.today());
        assert!(grid.appointments()[0].layout.is_finite());
    }

    #[test]
    fn test_tap_selects_then_second_tap_requests_new() {
        let (mut grid, _) = grid_with(vec![]);
        tap(&mut grid, pos2(155.0, 175.0), 1_000);

        let selection = grid.selection();
        assert_eq!((selection.column, selection.hour), (0, 1));
        assert_eq!(selection.mode, SelectionMode::Selected);
        assert!(grid.take_messages().is_empty());

        tap(&mut grid, pos2(155.0, 175.0), 2_000);
        let messages = grid.take_messages();
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            GridMessage::New {
                resource,
                start,
                end,
            } => {
                assert_eq!(resource, "Karos");
                assert_eq!(minutes_since_midnight(start), 60);
                assert_eq!((*end - *start).num_minutes(), 60);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_tap_on_appointment_flashes_then_views() {
        let (mut grid, _) = grid_with(vec![appointment(7, "Colin", 1, 2)]);
        // Column 1, hour 1.
        let pos = pos2(300.0, 45.0 + 150.0);

        grid.handle_pointer(PointerEvent::Down { pos, time_ms: 1_000 });
        grid.tick(1_099);
        assert!(grid.session.clicked.is_none());
        grid.tick(1_100);
        assert_eq!(grid.session.clicked.as_ref().map(|a| a.id), Some(7));
        grid.handle_pointer(PointerEvent::Up { pos, time_ms: 1_120 });
        assert_eq!(grid.selection().mode, SelectionMode::Hidden);
        assert!(grid.is_appointment_selected());

        // Flash lasts until down + tap timeout + click display.
        grid.tick(1_140);
        assert!(grid.take_messages().is_empty());
        grid.tick(1_150);
        let messages = grid.take_messages();
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            GridMessage::View { id, resource, .. } => {
                assert_eq!(*id, 7);
                assert_eq!(resource, "Colin");
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_quick_tap_without_flash_sends_nothing() {
        let (mut grid, _) = grid_with(vec![appointment(7, "Colin", 1, 2)]);
        let pos = pos2(300.0, 195.0);
        grid.handle_pointer(PointerEvent::Down { pos, time_ms: 0 });
        grid.handle_pointer(PointerEvent::Up { pos, time_ms: 30 });
        // The flash timer fires at 100, the view at 150.
        grid.tick(150);
        assert_eq!(grid.take_messages().len(), 1);
    }

    #[test]
    fn test_long_press_raises_context_request() {
        let (mut grid, _) = grid_with(vec![appointment(3, "Tom", 4, 6)]);
        let pos = pos2(40.0 + 3.0 * 190.0 + 50.0, 45.0 + 5.0 * 101.0 + 10.0);
        grid.handle_pointer(PointerEvent::Down { pos, time_ms: 0 });
        grid.tick(600);

        assert_eq!(grid.selection().mode, SelectionMode::LongPress);
        assert_eq!(
            grid.take_context_request(),
            Some(ContextRequest {
                column: 3,
                hour: 5,
                appointment_id: Some(3),
            })
        );

        grid.handle_pointer(PointerEvent::Up { pos, time_ms: 700 });
        assert!(grid.take_messages().is_empty());
        assert_eq!(grid.take_context_request(), None);
    }

    #[test]
    fn test_vertical_drag_scrolls_and_hides_selection() {
        let (mut grid, _) = grid_with(vec![]);
        tap(&mut grid, pos2(155.0, 175.0), 0);

        grid.handle_pointer(PointerEvent::Down {
            pos: pos2(300.0, 400.0),
            time_ms: 1_000,
        });
        grid.handle_pointer(PointerEvent::Move {
            pos: pos2(302.0, 300.0),
            time_ms: 1_050,
        });
        assert!(grid.is_scrolling());
        assert_eq!(grid.selection().mode, SelectionMode::Hidden);
        assert_eq!(grid.scroll_offset().x, 0.0);
        assert!(grid.scroll_offset().y > 0.0);

        grid.handle_pointer(PointerEvent::Cancel { time_ms: 1_060 });
        assert!(!grid.is_scrolling());
    }

    #[test]
    fn test_fling_stays_in_bounds() {
        let (mut grid, _) = grid_with(vec![]);
        grid.handle_pointer(PointerEvent::Down {
            pos: pos2(300.0, 500.0),
            time_ms: 0,
        });
        for step in 1..=5u64 {
            grid.handle_pointer(PointerEvent::Move {
                pos: pos2(300.0, 500.0 - step as f32 * 80.0),
                time_ms: step * 10,
            });
        }
        grid.handle_pointer(PointerEvent::Up {
            pos: pos2(300.0, 100.0),
            time_ms: 60,
        });

        let mut now = 60;
        while grid.next_wakeup(now).is_some() && now < 10_000 {
            now += 16;
            grid.tick(now);
            let offset = grid.scroll_offset();
            let max = grid.metrics().max_scroll();
            assert!(offset.y >= 0.0 && offset.y <= max.y);
            if !grid.physics.is_animating(now) {
                break;
            }
        }
        assert!(grid.scroll_offset().y > 0.0);
    }

    #[test]
    fn test_wheel_scroll_clamps() {
        let (mut grid, _) = grid_with(vec![]);
        grid.scroll_by(vec2(0.0, -300.0));
        assert_eq!(grid.scroll_offset(), vec2(0.0, 300.0));
        grid.scroll_by(vec2(0.0, 10_000.0));
        assert_eq!(grid.scroll_offset(), Vec2::ZERO);
    }

    #[test]
    fn test_header_tap_is_ignored() {
        let (mut grid, _) = grid_with(vec![]);
        tap(&mut grid, pos2(155.0, 20.0), 0);
        assert_eq!(grid.selection().mode, SelectionMode::Hidden);
    }

    #[test]
    fn test_set_visible_day_round_trip() {
        let (mut grid, _) = grid_with(vec![]);
        let target = chrono_tz::UTC.with_ymd_and_hms(2024, 7, 4, 15, 30, 0).unwrap();
        grid.set_visible_day(target, "Mechelle", false, false);

        let selected = grid.selected_instant().unwrap();
        assert_eq!(julian_day_of(&selected), julian_day_of(&target));
        assert_eq!(minutes_since_midnight(&selected), 15 * 60);
        assert_eq!(grid.selection().column, 2);
        assert_eq!(grid.selected_minutes_since_midnight(), 900);
        // Row 15 is brought into view.
        let offset = grid.scroll_offset().y;
        assert!(offset <= 15.0 * 101.0);
        assert!(offset + 555.0 >= 16.0 * 101.0);
    }

    #[test]
    fn test_selected_appointment_falls_back_to_draft() {
        let (mut grid, _) = grid_with(vec![]);
        tap(&mut grid, pos2(300.0, 175.0), 0);

        assert!(!grid.is_appointment_selected());
        let draft = grid.selected_appointment().unwrap();
        assert!(draft.is_draft());
        assert_eq!(draft.start_minute, 60);
        assert_eq!(draft.resource.as_deref(), Some("Colin"));
    }

    #[test]
    fn test_stale_day_results_are_dropped() {
        let mut loader = MockAppointmentLoader::new();
        let captured: Arc<Mutex<Vec<(LoadRequest, Sender<LoadResponse>)>>> = Arc::default();
        let sink = Arc::clone(&captured);
        loader.expect_start().return_const(());
        loader.expect_stop().return_const(());
        loader
            .expect_load()
            .returning(move |request, reply| sink.lock().unwrap().push((request, reply)));

        let mut grid = AppointmentGrid::new(
            GridConfig::default(),
            resources(),
            4,
            Box::new(loader),
            Box::new(ConfiguredTimeZone::new("UTC")),
            Box::new(ManualClock::new(now())),
        );
        grid.set_view_size(vec2(800.0, 600.0));
        grid.on_resume();
        let tomorrow = now() + chrono::Duration::days(1);
        grid.set_visible_day(tomorrow, "Karos", true, false);

        let requests = captured.lock().unwrap().drain(..).collect::<Vec<_>>();
        assert_eq!(requests.len(), 2);
        for (request, reply) in requests {
            reply
                .send(LoadResponse {
                    request,
                    result: Ok(vec![appointment(request.generation as i64, "Karos", 9, 10)]),
                })
                .unwrap();
        }
        grid.poll_loads();

        // Only tomorrow's answer is applied.
        assert_eq!(grid.appointments().len(), 1);
        assert_eq!(grid.appointments()[0].id, 2);
    }

    #[test]
    fn test_results_after_destroy_are_ignored() {
        let clock = ManualClock::new(now());
        let loader = InMemoryLoader::new(vec![appointment(1, "Karos", 9, 10)]);
        let mut grid = AppointmentGrid::new(
            GridConfig::default(),
            resources(),
            4,
            Box::new(loader),
            Box::new(ConfiguredTimeZone::new("UTC")),
            Box::new(clock),
        );
        grid.on_resume();
        grid.destroy();
        grid.poll_loads();
        grid.reload();
        grid.poll_loads();

        assert!(grid.appointments().is_empty());
        assert!(!grid.is_active());
        assert_eq!(grid.next_wakeup(0), None);
    }

    #[test]
    fn test_current_time_refresh_aligns_to_five_minutes() {
        let (mut grid, clock) = grid_with(vec![]);
        // 08:02 -> next refresh at 08:05, three minutes out.
        assert_eq!(grid.next_wakeup(0), Some(180_000));

        clock.set(Utc.with_ymd_and_hms(2024, 5, 10, 8, 5, 0).unwrap());
        grid.tick(180_000);
        assert_eq!(grid.now_minute, 8 * 60 + 5);
        assert_eq!(grid.next_wakeup(180_000), Some(480_000));
    }

    #[test]
    fn test_pause_cancels_timers() {
        let (mut grid, _) = grid_with(vec![appointment(7, "Colin", 1, 2)]);
        grid.handle_pointer(PointerEvent::Down {
            pos: pos2(300.0, 195.0),
            time_ms: 0,
        });
        grid.on_pause();
        assert!(grid.scheduler.is_empty());
        assert!(!grid.is_pressed());
        grid.tick(1_000);
        assert!(grid.take_messages().is_empty());
        assert_eq!(grid.take_context_request(), None);
    }

    #[test]
    fn test_pause_drops_pending_long_press_and_fade() {
        let (mut grid, _) = grid_with(vec![]);
        grid.set_visible_day(now(), "Karos", true, true);
        assert_eq!(grid.appointments_alpha(), 0);

        grid.handle_pointer(PointerEvent::Down {
            pos: pos2(155.0, 175.0),
            time_ms: 0,
        });
        grid.on_pause();
        grid.tick(600);

        assert_eq!(grid.take_context_request(), None);
        assert_ne!(grid.selection().mode, SelectionMode::LongPress);
        assert_eq!(grid.appointments_alpha(), u8::MAX);
        assert_eq!(grid.next_wakeup(600), None);
    }

    #[test]
    fn test_long_press_on_overnight_appointment_uses_displayed_day_rows() {
        let mut overnight = Appointment::new(
            5,
            "Late shift",
            Utc.with_ymd_and_hms(2024, 5, 10, 22, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 11, 2, 0, 0).unwrap(),
        )
        .unwrap();
        overnight.resource = Some("Karos".to_string());
        let (mut grid, _) = grid_with(vec![overnight]);

        let next_morning = Utc.with_ymd_and_hms(2024, 5, 11, 1, 0, 0).unwrap();
        grid.set_visible_day(next_morning, "Karos", true, false);
        grid.poll_loads();
        assert_eq!(grid.appointments().len(), 1);

        // Column 0, hour 1 row, inside the drawn rect.
        let pos = pos2(155.0, 45.0 + 101.0 + 50.0);
        grid.handle_pointer(PointerEvent::Down { pos, time_ms: 0 });
        grid.tick(600);

        assert_eq!(
            grid.take_context_request(),
            Some(ContextRequest {
                column: 0,
                hour: 1,
                appointment_id: Some(5),
            })
        );
        assert_eq!(
            grid.selected_instant().map(|instant| instant.with_timezone(&Utc)),
            Some(next_morning)
        );
    }

    #[test]
    fn test_time_zone_change_reprojects() {
        let mut resolver = MockTimeZoneResolver::new();
        // Construction and the first resume see UTC, later calls Tokyo.
        let calls = Arc::new(AtomicUsize::new(0));
        resolver.expect_current_time_zone().returning(move || {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                "UTC".to_string()
            } else {
                "Asia/Tokyo".to_string()
            }
        });

        let mut grid = AppointmentGrid::new(
            GridConfig::default(),
            resources(),
            4,
            Box::new(InMemoryLoader::new(vec![])),
            Box::new(resolver),
            Box::new(ManualClock::new(now())),
        );
        assert_eq!(grid.zone(), chrono_tz::UTC);
        grid.on_resume();
        grid.reload();
        assert_eq!(grid.zone(), chrono_tz::Asia::Tokyo);
        // 08:02 UTC is 17:02 in Tokyo.
        assert_eq!(grid.now_minute, 17 * 60 + 2);
    }

    #[test]
    fn test_animated_day_change_fades_in() {
        let (mut grid, _) = grid_with(vec![]);
        grid.tick(1_000);
        grid.set_visible_day(now(), "Karos", true, true);
        assert_eq!(grid.appointments_alpha(), 0);

        grid.tick(1_100);
        let alpha = grid.appointments_alpha();
        assert!(alpha > 0 && alpha < u8::MAX);

        grid.tick(1_300);
        assert_eq!(grid.appointments_alpha(), u8::MAX);

        grid.set_appointments_alpha(40);
        assert_eq!(grid.appointments_alpha(), 40);
        grid.stop_appointments_animation();
        assert_eq!(grid.appointments_alpha(), u8::MAX);
    }
}
