//! Per-appointment label cache.
//!
//! Blocks are keyed by the appointment's position in the current list and
//! rebuilt when the available width changes. Wrapping itself happens at
//! paint time through egui's galley cache.

use std::sync::Arc;

use egui::text::{LayoutJob, TextFormat};
use egui::{Color32, FontId};

use crate::models::appointment::Appointment;

/// Sanitised label text for one appointment at one width.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub title: String,
    pub location: String,
    pub width: f32,
}

impl TextBlock {
    pub fn build(appointment: &Appointment, width: f32, max_len: usize) -> Self {
        let title = sanitize(&appointment.title, max_len.saturating_sub(1));
        // The separating space counts against the budget.
        let used = title.chars().count() + 1;
        let location = appointment
            .location
            .as_deref()
            .map(|location| sanitize(location, max_len.saturating_sub(used)))
            .unwrap_or_default();

        Self {
            title,
            location,
            width,
        }
    }

    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.location)
    }

    /// Layout job wrapping to the block's width and showing at most
    /// `max_rows` lines; lines that would be cut are dropped.
    pub fn to_job(&self, style: &TextStyle, max_rows: usize) -> LayoutJob {
        let mut job = LayoutJob::default();
        job.append(
            &format!("{} ", self.title),
            0.0,
            TextFormat::simple(style.font.clone(), style.title_color),
        );
        job.append(
            &self.location,
            0.0,
            TextFormat::simple(style.font.clone(), style.color),
        );
        job.wrap.max_width = self.width;
        job.wrap.max_rows = max_rows;
        job.wrap.break_anywhere = false;
        job
    }
}

/// Fonts and colours applied when a block is turned into a galley.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font: FontId,
    pub title_color: Color32,
    pub color: Color32,
}

/// Collapses a tab or newline directly before a comma, turns every other
/// tab or newline into a space, and keeps at most `max_len` characters.
pub fn sanitize(text: &str, max_len: usize) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if matches!(c, '\t' | '\n') && chars.peek() == Some(&',') {
            continue;
        }
        cleaned.push(c);
    }

    cleaned
        .chars()
        .take(max_len)
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect()
}

#[derive(Debug, Default)]
pub struct TextLayoutCache {
    blocks: Vec<Option<Arc<TextBlock>>>,
    max_len: usize,
}

impl TextLayoutCache {
    pub fn new(max_len: usize) -> Self {
        Self {
            blocks: Vec::new(),
            max_len,
        }
    }

    /// Drops every block and sizes the cache for a new appointment list.
    pub fn reset(&mut self, len: usize) {
        self.blocks.clear();
        self.blocks.resize(len, None);
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn layout_for(
        &mut self,
        index: usize,
        appointment: &Appointment,
        width: f32,
    ) -> Option<Arc<TextBlock>> {
        let max_len = self.max_len;
        let slot = self.blocks.get_mut(index)?;
        if let Some(block) = slot.as_ref().filter(|block| block.width == width) {
            return Some(Arc::clone(block));
        }

        let block = Arc::new(TextBlock::build(appointment, width, max_len));
        *slot = Some(Arc::clone(&block));
        Some(block)
    }
}
