use egui::{Color32, Visuals};

fn with_alpha(color: Color32, alpha: u8) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

fn blend(a: Color32, b: Color32, t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |c1: u8, c2: u8| -> u8 { ((c1 as f32 * (1.0 - t)) + (c2 as f32 * t)).round() as u8 };
    Color32::from_rgb(lerp(a.r(), b.r()), lerp(a.g(), b.g()), lerp(a.b(), b.b()))
}

/// Parse a hex color string (`#RRGGBB`) to Color32.
pub fn parse_color(hex: &str) -> Option<Color32> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some(Color32::from_rgb(r, g, b))
}

/// Scales a colour's alpha by `alpha / 255`.
pub fn fade(color: Color32, alpha: u8) -> Color32 {
    color.gamma_multiply(alpha as f32 / 255.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPalette {
    pub past_bg: Color32,
    pub future_bg: Color32,
    pub hour_bg: Color32,
    pub header_bg: Color32,
    pub horizontal_line: Color32,
    pub vertical_line: Color32,
    pub hour_label: Color32,
    pub header_text: Color32,
    pub selection: Color32,
    pub new_hint: Color32,
    pub appointment: Color32,
    pub appointment_text: Color32,
    pub appointment_title: Color32,
    pub clicked: Color32,
    pub current_time: Color32,
    pub glow: Color32,
}

impl GridPalette {
    pub fn from_visuals(visuals: &Visuals) -> Self {
        let panel = visuals.panel_fill;
        let extreme = visuals.extreme_bg_color;
        let line = visuals.widgets.noninteractive.bg_stroke.color;
        let accent = visuals.selection.bg_fill;
        let text = visuals.text_color();

        Self {
            past_bg: blend(panel, extreme, 0.3),
            future_bg: extreme,
            hour_bg: panel,
            header_bg: panel,
            horizontal_line: line,
            vertical_line: with_alpha(line, 200),
            hour_label: visuals.weak_text_color(),
            header_text: visuals.strong_text_color(),
            selection: with_alpha(accent, if visuals.dark_mode { 110 } else { 80 }),
            new_hint: text,
            appointment: Color32::from_rgb(100, 150, 200),
            appointment_text: if visuals.dark_mode {
                Color32::from_rgb(230, 230, 230)
            } else {
                Color32::from_rgb(245, 245, 245)
            },
            appointment_title: Color32::WHITE,
            clicked: with_alpha(accent, 200),
            current_time: Color32::from_rgb(255, 100, 100),
            glow: with_alpha(accent, 160),
        }
    }

    pub fn light() -> Self {
        Self::from_visuals(&Visuals::light())
    }

    pub fn dark() -> Self {
        Self::from_visuals(&Visuals::dark())
    }

    pub fn appointment_fill(&self, color: Option<&str>) -> Color32 {
        color.and_then(parse_color).unwrap_or(self.appointment)
    }
}

impl Default for GridPalette {
    fn default() -> Self {
        Self::light()
    }
}
