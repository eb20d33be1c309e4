// Appointment grid demo
// Main entry point

use appointment_grid::services::config;
use appointment_grid::ui_egui::AppointmentApp;

fn main() -> eframe::Result<()> {
    // Initialize logging
    env_logger::init();

    log::info!("Starting appointment grid");

    let config_path = config::default_config_path();
    let app_config = config::load_or_default(config_path.as_deref());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("Appointment Grid"),
        ..Default::default()
    };

    eframe::run_native(
        "Appointment Grid",
        options,
        Box::new(move |cc| Ok(Box::new(AppointmentApp::new(cc, app_config)?))),
    )
}
