//! Grid renderer.
//!
//! [`build`] turns the grid state into a [`DrawList`] of view-relative
//! commands in paint order; [`paint`] replays a list onto an egui painter.
//! Keeping the two apart lets the draw order and geometry be tested without
//! a running egui context.

use std::sync::Arc;

use egui::{pos2, vec2, Align2, Color32, FontId, Painter, Pos2, Rect, Rounding, Shape, Stroke};

use super::geometry::{self, GridMetrics};
use super::palette::{fade, GridPalette};
use super::picking::Selection;
use super::scroll::{Edge, EdgeGlow};
use super::text_layout::{TextBlock, TextLayoutCache, TextStyle};
use crate::models::appointment::Appointment;
use crate::models::resource::ResourceList;
use crate::models::settings::GridConfig;
use crate::utils::date::{HOURS_PER_DAY, MINUTES_PER_HOUR};

/// Paint layers, in the order they are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Background,
    GridLines,
    HourLabels,
    Appointments,
    CurrentTime,
    Selection,
    Header,
    Glow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Shape(Shape),
    /// An appointment label, wrapped to `rect` and clipped to it.
    Text {
        block: Arc<TextBlock>,
        rect: Rect,
        style: TextStyle,
    },
    Label {
        text: String,
        pos: Pos2,
        anchor: Align2,
        font: FontId,
        color: Color32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub layer: Layer,
    /// View-relative clip rectangle.
    pub clip: Rect,
    pub command: DrawCommand,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DrawList {
    items: Vec<DrawItem>,
}

impl DrawList {
    fn push(&mut self, layer: Layer, clip: Rect, command: DrawCommand) {
        self.items.push(DrawItem {
            layer,
            clip,
            command,
        });
    }

    fn shape(&mut self, layer: Layer, clip: Rect, shape: Shape) {
        self.push(layer, clip, DrawCommand::Shape(shape));
    }

    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn in_layer(&self, layer: Layer) -> impl Iterator<Item = &DrawItem> + '_ {
        self.items.iter().filter(move |item| item.layer == layer)
    }

    /// Layers in the order they were emitted, duplicates collapsed.
    pub fn layer_order(&self) -> Vec<Layer> {
        let mut order: Vec<Layer> = Vec::new();
        for item in &self.items {
            if order.last() != Some(&item.layer) {
                order.push(item.layer);
            }
        }
        order
    }
}

/// Everything the renderer reads for one frame.
pub struct Scene<'a> {
    pub config: &'a GridConfig,
    pub metrics: &'a GridMetrics,
    pub palette: &'a GridPalette,
    pub scroll: egui::Vec2,
    pub resources: &'a ResourceList,
    pub appointments: &'a [Appointment],
    pub selection: Selection,
    /// Appointment currently shown in the pressed colour.
    pub clicked_id: Option<i64>,
    pub day: i32,
    pub today: i32,
    /// Minutes since local midnight of "now".
    pub now_minute: u32,
    pub appointments_alpha: u8,
    pub glow: &'a EdgeGlow,
    pub now_ms: u64,
}

struct Regions {
    view: Rect,
    /// Below the header, gutter included.
    body: Rect,
    /// Below the header, right of the gutter.
    grid: Rect,
    gutter: Rect,
    header: Rect,
    header_columns: Rect,
}

impl Regions {
    fn new(metrics: &GridMetrics) -> Self {
        let size = metrics.view_size;
        let header = metrics.header_height;
        let gutter = metrics.gutter_width;
        Self {
            view: Rect::from_min_size(Pos2::ZERO, size),
            body: Rect::from_min_max(pos2(0.0, header), pos2(size.x, size.y)),
            grid: Rect::from_min_max(pos2(gutter, header), pos2(size.x, size.y)),
            gutter: Rect::from_min_max(pos2(0.0, header), pos2(gutter, size.y)),
            header: Rect::from_min_max(Pos2::ZERO, pos2(size.x, header)),
            header_columns: Rect::from_min_max(pos2(gutter, 0.0), pos2(size.x, header)),
        }
    }
}

/// Grid y of the current-time line.
fn now_line_y(metrics: &GridMetrics, now_minute: u32) -> f32 {
    let hour = now_minute / MINUTES_PER_HOUR;
    let minute = now_minute % MINUTES_PER_HOUR;
    hour as f32 * metrics.row_pitch() + minute as f32 * metrics.row_height / MINUTES_PER_HOUR as f32
        + 1.0
}

pub fn hour_label(hour: u32) -> String {
    format!("{:02}:00", hour)
}

pub fn build(scene: &Scene<'_>, cache: &mut TextLayoutCache) -> DrawList {
    let mut list = DrawList::default();
    let regions = Regions::new(scene.metrics);

    draw_background(scene, &regions, &mut list);
    draw_grid_lines(scene, &regions, &mut list);
    draw_hour_labels(scene, &regions, &mut list);
    draw_appointments(scene, &regions, cache, &mut list);
    draw_current_time(scene, &regions, &mut list);
    draw_selection(scene, &regions, &mut list);
    draw_header(scene, &regions, &mut list);
    draw_glow(scene, &regions, &mut list);

    list
}

fn draw_background(scene: &Scene<'_>, regions: &Regions, list: &mut DrawList) {
    let metrics = scene.metrics;
    let palette = scene.palette;

    list.shape(
        Layer::Background,
        regions.gutter,
        Shape::rect_filled(regions.gutter, Rounding::ZERO, palette.hour_bg),
    );
    list.shape(
        Layer::Background,
        regions.grid,
        Shape::rect_filled(regions.grid, Rounding::ZERO, palette.past_bg),
    );

    // Time later than now, or the whole day when it lies in the future.
    if scene.day >= scene.today {
        let line_y = if scene.day == scene.today {
            now_line_y(metrics, scene.now_minute)
        } else {
            0.0
        };
        let future = metrics.rect_to_screen(
            Rect::from_min_max(
                pos2(metrics.gutter_width, line_y),
                pos2(
                    metrics.content_width(),
                    metrics.hour_top(HOURS_PER_DAY) + metrics.hour_gap,
                ),
            ),
            scene.scroll,
        );
        list.shape(
            Layer::Background,
            regions.grid,
            Shape::rect_filled(future, Rounding::ZERO, palette.future_bg),
        );
    }
}

fn draw_grid_lines(scene: &Scene<'_>, regions: &Regions, list: &mut DrawList) {
    let metrics = scene.metrics;
    let scroll = scene.scroll;
    let right = metrics.column_left(scene.resources.len()) - scroll.x;
    let bottom = metrics.content_to_screen(pos2(0.0, metrics.hour_top(HOURS_PER_DAY)), scroll).y;

    let horizontal = Stroke::new(1.0, scene.palette.horizontal_line);
    for hour in 0..=HOURS_PER_DAY {
        let y = metrics.content_to_screen(pos2(0.0, metrics.hour_top(hour)), scroll).y + 0.5;
        if y < regions.body.top() || y > regions.body.bottom() {
            continue;
        }
        list.shape(
            Layer::GridLines,
            regions.body,
            Shape::line_segment([pos2(0.0, y), pos2(right, y)], horizontal),
        );
    }

    let vertical = Stroke::new(1.0, scene.palette.vertical_line);
    let top = regions.grid.top();
    for column in 0..=scene.resources.len() {
        let x = metrics.column_left(column) - scroll.x + 0.5;
        if x < regions.grid.left() || x > regions.grid.right() {
            continue;
        }
        list.shape(
            Layer::GridLines,
            regions.grid,
            Shape::line_segment([pos2(x, top), pos2(x, bottom)], vertical),
        );
    }
}

fn draw_hour_labels(scene: &Scene<'_>, regions: &Regions, list: &mut DrawList) {
    let metrics = scene.metrics;
    let font = FontId::proportional(scene.config.hour_font_size);
    let x = metrics.gutter_width / 2.0;

    for hour in 0..HOURS_PER_DAY {
        let top = metrics.hour_top(hour) + metrics.hour_gap + scene.config.hours_top_margin;
        let pos = metrics.content_to_screen(pos2(x, top), scene.scroll);
        if pos.y > regions.gutter.bottom() || pos.y + metrics.row_height < regions.gutter.top() {
            continue;
        }
        list.push(
            Layer::HourLabels,
            regions.gutter,
            DrawCommand::Label {
                text: hour_label(hour),
                pos: pos2(x, pos.y),
                anchor: Align2::CENTER_TOP,
                font: font.clone(),
                color: scene.palette.hour_label,
            },
        );
    }
}

/// Shrinks an appointment rect to the area its text may use.
fn text_rect(config: &GridConfig, rect: Rect) -> Rect {
    if rect.height() <= 0.0 || rect.width() <= 0.0 {
        return Rect::from_min_size(rect.min, egui::Vec2::ZERO);
    }

    let mut text = rect;
    if text.height() > 2.0 * config.text_vertical_margin {
        text.min.y += config.text_vertical_margin;
        text.max.y -= config.text_vertical_margin;
    }
    if text.width() > 2.0 * config.text_horizontal_margin {
        text.min.x += config.text_horizontal_margin;
        text.max.x -= config.text_horizontal_margin;
    }
    text
}

fn draw_appointments(
    scene: &Scene<'_>,
    regions: &Regions,
    cache: &mut TextLayoutCache,
    list: &mut DrawList,
) {
    let config = scene.config;
    let palette = scene.palette;
    let alpha = scene.appointments_alpha;
    let font = FontId::proportional(config.appointment_font_size);

    for (index, appointment) in scene.appointments.iter().enumerate() {
        if !geometry::is_laid_out(appointment) {
            continue;
        }

        let layout = scene.metrics.rect_to_screen(appointment.layout, scene.scroll);
        if !layout.intersects(regions.grid) {
            continue;
        }

        let fill = if scene.clicked_id == Some(appointment.id) {
            palette.clicked
        } else {
            palette.appointment_fill(appointment.color.as_deref())
        };
        let shape_rect = Rect::from_min_max(
            pos2(
                layout.left() + config.appointment_rect_left_margin,
                layout.top() + config.appointment_rect_top_margin,
            ),
            pos2(
                layout.right(),
                layout.bottom() - config.appointment_rect_bottom_margin,
            ),
        );
        list.shape(
            Layer::Appointments,
            regions.grid,
            Shape::rect_filled(
                shape_rect,
                Rounding::same(config.appointment_corner_radius),
                fade(fill, alpha),
            ),
        );

        let label_area = text_rect(
            config,
            Rect::from_min_max(
                pos2(
                    layout.left() + config.appointment_rect_left_margin,
                    layout.top() + config.appointment_rect_top_margin,
                ),
                pos2(
                    layout.right() - config.appointment_rect_right_margin,
                    layout.bottom() - config.appointment_rect_bottom_margin,
                ),
            ),
        );
        if label_area.width() < config.min_text_width {
            continue;
        }
        let Some(block) = cache.layout_for(index, appointment, label_area.width()) else {
            continue;
        };
        list.push(
            Layer::Appointments,
            regions.grid.intersect(label_area),
            DrawCommand::Text {
                block,
                rect: label_area,
                style: TextStyle {
                    font: font.clone(),
                    title_color: fade(palette.appointment_title, alpha),
                    color: fade(palette.appointment_text, alpha),
                },
            },
        );
    }
}

fn draw_current_time(scene: &Scene<'_>, regions: &Regions, list: &mut DrawList) {
    if scene.day != scene.today {
        return;
    }

    let config = scene.config;
    let metrics = scene.metrics;
    let top = now_line_y(metrics, scene.now_minute) - config.current_time_top_offset;
    let line = metrics.rect_to_screen(
        Rect::from_min_max(
            pos2(metrics.gutter_width - config.current_time_side_buffer - 1.0, top),
            pos2(
                metrics.content_width() + config.current_time_side_buffer + 1.0,
                top + config.current_time_thickness,
            ),
        ),
        scene.scroll,
    );
    // The gutter end does not scroll sideways.
    let line = Rect::from_min_max(
        pos2(metrics.gutter_width - config.current_time_side_buffer - 1.0, line.top()),
        line.max,
    );

    list.shape(
        Layer::CurrentTime,
        regions.body,
        Shape::rect_filled(line, Rounding::ZERO, scene.palette.current_time),
    );
}

fn draw_selection(scene: &Scene<'_>, regions: &Regions, list: &mut DrawList) {
    let selection = scene.selection;
    if !selection.is_visible() {
        return;
    }

    let config = scene.config;
    let metrics = scene.metrics;
    let cell = metrics.rect_to_screen(metrics.cell_rect(selection.column, selection.hour), scene.scroll);
    list.shape(
        Layer::Selection,
        regions.grid,
        Shape::rect_filled(cell, Rounding::ZERO, scene.palette.selection),
    );

    // "+" hint centred on the cell.
    let row = metrics.row_height;
    let width = cell.width();
    let length = ((row.min(width)) - config.new_hint_margin * 2.0)
        .min(config.new_hint_max_length)
        .max(0.0);
    let mid_x = cell.left() + width / 2.0;
    let mid_y = cell.top() + row / 2.0;
    let stroke = Stroke::new(config.new_hint_stroke, scene.palette.new_hint);
    list.shape(
        Layer::Selection,
        regions.grid,
        Shape::line_segment(
            [pos2(mid_x - length / 2.0, mid_y), pos2(mid_x + length / 2.0, mid_y)],
            stroke,
        ),
    );
    list.shape(
        Layer::Selection,
        regions.grid,
        Shape::line_segment(
            [pos2(mid_x, mid_y - length / 2.0), pos2(mid_x, mid_y + length / 2.0)],
            stroke,
        ),
    );
}

fn draw_header(scene: &Scene<'_>, regions: &Regions, list: &mut DrawList) {
    let config = scene.config;
    let metrics = scene.metrics;
    let scroll_x = scene.scroll.x;

    list.shape(
        Layer::Header,
        regions.header,
        Shape::rect_filled(regions.header, Rounding::ZERO, scene.palette.header_bg),
    );

    let line_y = metrics.header_height - 0.5;
    let right = metrics.column_left(scene.resources.len()) - scroll_x;
    list.shape(
        Layer::Header,
        regions.header,
        Shape::line_segment(
            [pos2(0.0, line_y), pos2(right, line_y)],
            Stroke::new(1.0, scene.palette.horizontal_line),
        ),
    );

    let font = FontId::proportional(config.header_font_size);
    let baseline = metrics.header_height - config.header_bottom_margin;
    for (index, name) in scene.resources.names().iter().enumerate() {
        let x = metrics.column_left(index) - config.header_right_margin + metrics.cell_width / 2.0
            - scroll_x;
        if x + metrics.cell_width / 2.0 < regions.header_columns.left()
            || x - metrics.cell_width / 2.0 > regions.header_columns.right()
        {
            continue;
        }
        list.push(
            Layer::Header,
            regions.header_columns,
            DrawCommand::Label {
                text: name.clone(),
                pos: pos2(x, baseline),
                anchor: Align2::CENTER_BOTTOM,
                font: font.clone(),
                color: scene.palette.header_text,
            },
        );
    }
}

fn draw_glow(scene: &Scene<'_>, regions: &Regions, list: &mut DrawList) {
    let max_height = scene.config.glow_max_height;
    let grid = regions.grid;

    for edge in Edge::ALL {
        let intensity = scene.glow.intensity(edge, scene.now_ms);
        if intensity <= 0.0 {
            continue;
        }
        let depth = max_height * intensity;
        let rect = match edge {
            Edge::Top => Rect::from_min_size(grid.left_top(), vec2(grid.width(), depth)),
            Edge::Bottom => Rect::from_min_max(
                pos2(grid.left(), grid.bottom() - depth),
                grid.right_bottom(),
            ),
            Edge::Left => Rect::from_min_size(grid.left_top(), vec2(depth, grid.height())),
            Edge::Right => Rect::from_min_max(
                pos2(grid.right() - depth, grid.top()),
                grid.right_bottom(),
            ),
        };
        list.shape(
            Layer::Glow,
            regions.view,
            Shape::rect_filled(
                rect,
                Rounding::same(depth / 2.0),
                scene.palette.glow.gamma_multiply(intensity),
            ),
        );
    }
}

/// Replays `list` with its view origin at `origin`.
pub fn paint(painter: &Painter, origin: Pos2, list: &DrawList) {
    let offset = origin.to_vec2();

    for item in list.items() {
        let clip = painter.clip_rect().intersect(item.clip.translate(offset));
        if !clip.is_positive() {
            continue;
        }
        let painter = painter.with_clip_rect(clip);

        match &item.command {
            DrawCommand::Shape(shape) => {
                let mut shape = shape.clone();
                shape.translate(offset);
                painter.add(shape);
            }
            DrawCommand::Text { block, rect, style } => {
                let row_height = painter.ctx().fonts(|fonts| fonts.row_height(&style.font));
                let rows = (rect.height() / row_height.max(1.0)).floor() as usize;
                if rows == 0 {
                    continue;
                }
                let galley = painter.layout_job(block.to_job(style, rows));
                painter.galley(rect.min + offset, galley, style.color);
            }
            DrawCommand::Label {
                text,
                pos,
                anchor,
                font,
                color,
            } => {
                painter.text(*pos + offset, *anchor, text, font.clone(), *color);
            }
        }
    }
}
