use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use egui::{Color32, RichText};

use crate::models::resource::ResourceList;
use crate::models::settings::AppConfig;
use crate::services::appointment::AppointmentService;
use crate::services::config;
use crate::services::database::Database;
use crate::services::grid_state::GridStateService;
use crate::services::loader::BackgroundLoader;
use crate::services::timezone::{parse_zone, ConfiguredTimeZone, SystemTimeZone, TimeZoneResolver};
use crate::ui_egui::grid::{AppointmentGrid, GridMessage, GridWidget};
use crate::utils::clock::SystemClock;
use crate::utils::date::{date_from_julian_day, instant_at_hour};

const MAX_ACTIVITY_LINES: usize = 20;

/// Demo host: shows one day of the configured resources and logs the
/// grid's intents.
pub struct AppointmentApp {
    database: Database,
    grid: AppointmentGrid,
    /// Most recent intents, newest last.
    activity: Vec<String>,
}

impl AppointmentApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Result<Self> {
        apply_system_theme(&cc.egui_ctx);

        let database_path = config
            .database_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(config::default_database_path);
        log::info!("Using appointment store at {}", database_path.display());

        let database = Database::new(&database_path.to_string_lossy())?;
        database
            .initialize_schema()
            .context("Failed to initialize appointment store")?;

        let resolver: Box<dyn TimeZoneResolver> = match &config.timezone {
            Some(name) => Box::new(ConfiguredTimeZone::new(name.clone())),
            None => Box::new(SystemTimeZone),
        };
        let zone = parse_zone(&resolver.current_time_zone()).unwrap_or(chrono_tz::UTC);

        if config.seed_demo_data {
            let today = Utc::now().with_timezone(&zone).date_naive();
            let seeded = AppointmentService::new(database.connection())
                .seed_demo_day(&config.resources, today, &zone)?;
            if seeded > 0 {
                log::info!("Seeded {} demo appointment(s)", seeded);
            }
        }

        let saved = GridStateService::new(database.connection())
            .selected_instant()
            .unwrap_or_else(|e| {
                log::warn!("{:#}", e);
                None
            });

        let repaint = cc.egui_ctx.clone();
        let loader = BackgroundLoader::new(database_path).with_waker(move || repaint.request_repaint());

        let mut grid = AppointmentGrid::new(
            config.grid.clone(),
            ResourceList::new(config.resources.clone()),
            config.shown_columns,
            Box::new(loader),
            resolver,
            Box::new(SystemClock),
        );
        grid.on_resume();
        grid.set_visible_day(
            saved.unwrap_or_else(Utc::now),
            &config.login_resource,
            false,
            false,
        );

        Ok(Self {
            database,
            grid,
            activity: Vec::new(),
        })
    }

    /// Moves the displayed day by `days`, keeping hour and column.
    fn shift_day(&mut self, days: i32) {
        let selection = self.grid.selection();
        let resource = self
            .grid
            .resources()
            .name(selection.column)
            .unwrap_or_default()
            .to_string();
        let target = instant_at_hour(&self.grid.zone(), self.grid.visible_day() + days, selection.hour);

        match target {
            Some(instant) => self.grid.set_visible_day(instant, &resource, true, true),
            None => log::warn!("No instant {} day(s) from day {}", days, self.grid.visible_day()),
        }
    }

    fn go_to_today(&mut self) {
        let selection = self.grid.selection();
        let resource = self
            .grid
            .resources()
            .name(selection.column)
            .unwrap_or_default()
            .to_string();
        self.grid.set_visible_day(Local::now(), &resource, false, true);
    }

    fn record(&mut self, line: String) {
        log::info!("{}", line);
        self.activity.push(line);
        if self.activity.len() > MAX_ACTIVITY_LINES {
            let excess = self.activity.len() - MAX_ACTIVITY_LINES;
            self.activity.drain(..excess);
        }
    }

    fn drain_grid_output(&mut self) {
        for message in self.grid.take_messages() {
            let line = match message {
                GridMessage::New {
                    resource,
                    start,
                    end,
                } => format!(
                    "New appointment for {}: {} - {}",
                    resource,
                    start.format("%H:%M"),
                    end.format("%H:%M")
                ),
                GridMessage::View {
                    id,
                    resource,
                    start,
                    end,
                } => format!(
                    "View appointment #{} ({}): {} - {}",
                    id,
                    resource,
                    start.format("%H:%M"),
                    end.format("%H:%M")
                ),
            };
            self.record(line);
        }

        if let Some(request) = self.grid.take_context_request() {
            let resource = self
                .grid
                .resources()
                .name(request.column)
                .unwrap_or_default()
                .to_string();
            let line = match request.appointment_id {
                Some(id) => format!("Context menu on appointment #{} ({})", id, resource),
                None => format!("Context menu on {} at {:02}:00", resource, request.hour),
            };
            self.record(line);
        }
    }

    fn render_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("navigation").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("◀ Previous").clicked() {
                    self.shift_day(-1);
                }
                if ui.button("Today").clicked() {
                    self.go_to_today();
                }
                if ui.button("Next ▶").clicked() {
                    self.shift_day(1);
                }
                if ui.button("Reload").clicked() {
                    self.grid.reload();
                }

                ui.separator();
                let title = date_from_julian_day(self.grid.visible_day())
                    .map(|date| date.format("%A, %B %d, %Y").to_string())
                    .unwrap_or_default();
                ui.label(RichText::new(title).strong().size(16.0));
                if self.grid.visible_day() == self.grid.today() {
                    ui.label(RichText::new("Today").color(Color32::from_rgb(66, 133, 244)));
                }
            });
        });
    }

    fn render_activity(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("activity")
            .resizable(true)
            .default_height(120.0)
            .show(ctx, |ui| {
                ui.label(RichText::new("Activity").strong());
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for line in &self.activity {
                            ui.label(line);
                        }
                    });
            });
    }

    fn save_selected_instant(&self) {
        let Some(instant) = self.grid.selected_instant() else {
            return;
        };
        if let Err(e) = GridStateService::new(self.database.connection())
            .save_selected_instant(instant.with_timezone(&Utc))
        {
            log::warn!("{:#}", e);
        }
    }
}

impl eframe::App for AppointmentApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.render_toolbar(ctx);
        self.render_activity(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                GridWidget::show(ui, &mut self.grid);
            });

        self.drain_grid_output();
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.save_selected_instant();
        self.grid.destroy();
    }
}

fn apply_system_theme(ctx: &egui::Context) {
    match dark_light::detect() {
        dark_light::Mode::Dark => ctx.set_visuals(egui::Visuals::dark()),
        dark_light::Mode::Light | dark_light::Mode::Default => {
            ctx.set_visuals(egui::Visuals::light())
        }
    }
}
