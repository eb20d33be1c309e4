// Integration tests for the appointment grid
// Drive the public controller API end to end, with in-memory and SQLite loaders

use std::time::{Duration, Instant};

use appointment_grid::models::appointment::Appointment;
use appointment_grid::models::resource::ResourceList;
use appointment_grid::models::settings::GridConfig;
use appointment_grid::services::appointment::{AppointmentService, NewAppointment};
use appointment_grid::services::database::Database;
use appointment_grid::services::grid_state::GridStateService;
use appointment_grid::services::loader::{BackgroundLoader, InMemoryLoader};
use appointment_grid::services::timezone::ConfiguredTimeZone;
use appointment_grid::ui_egui::grid::picking::SelectionMode;
use appointment_grid::ui_egui::grid::{AppointmentGrid, GridMessage, PointerEvent};
use appointment_grid::utils::clock::ManualClock;
use appointment_grid::utils::date::{julian_day_of, minutes_since_midnight};
use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use egui::{pos2, vec2, Pos2};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn clerks() -> ResourceList {
    ResourceList::new(["Karos", "Colin", "Mechelle", "Tom"])
}

fn in_memory_grid(zone: &str, appointments: Vec<Appointment>) -> AppointmentGrid {
    let mut grid = AppointmentGrid::new(
        GridConfig::default(),
        clerks(),
        4,
        Box::new(InMemoryLoader::new(appointments)),
        Box::new(ConfiguredTimeZone::new(zone)),
        Box::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap(),
        )),
    );
    grid.set_view_size(vec2(800.0, 600.0));
    grid.on_resume();
    grid.poll_loads();
    grid
}

fn tap(grid: &mut AppointmentGrid, pos: Pos2, at_ms: u64) {
    grid.handle_pointer(PointerEvent::Down { pos, time_ms: at_ms });
    grid.handle_pointer(PointerEvent::Up {
        pos,
        time_ms: at_ms + 60,
    });
    grid.tick(at_ms + 60);
}

#[test]
fn test_reference_layout_tap_then_new() {
    let mut grid = in_memory_grid("UTC", vec![]);

    // 800 wide, 40 px gutter, four shown columns.
    assert_eq!(grid.metrics().cell_width, 189.0);

    // x: (155 - 40) / 190 = 0, y: (175 - 45) / 101 = 1
    tap(&mut grid, pos2(155.0, 175.0), 0);
    let selection = grid.selection();
    assert_eq!((selection.column, selection.hour), (0, 1));
    assert_eq!(selection.mode, SelectionMode::Selected);
    assert!(grid.take_messages().is_empty());

    tap(&mut grid, pos2(155.0, 175.0), 1_000);
    let messages = grid.take_messages();
    assert_eq!(messages.len(), 1);
    let GridMessage::New {
        resource,
        start,
        end,
    } = &messages[0]
    else {
        panic!("expected a new-appointment request, got {:?}", messages[0]);
    };
    assert_eq!(resource, "Karos");
    assert_eq!(minutes_since_midnight(start), 60);
    assert_eq!(minutes_since_midnight(end), 120);
    assert_eq!(julian_day_of(start), grid.visible_day());
}

#[test]
fn test_set_visible_day_round_trip_in_several_zones() {
    for name in ["UTC", "America/New_York", "Asia/Tokyo", "Australia/Adelaide"] {
        let zone: Tz = name.parse().unwrap();
        let mut grid = in_memory_grid(name, vec![]);
        let target = zone.with_ymd_and_hms(2024, 3, 10, 14, 20, 0).unwrap();

        grid.set_visible_day(target, "Tom", false, false);
        let selected = grid.selected_instant().unwrap();

        assert_eq!(julian_day_of(&selected), julian_day_of(&target), "{}", name);
        assert_eq!(minutes_since_midnight(&selected), 14 * 60, "{}", name);
        assert_eq!(grid.selection().column, 3);
    }
}

#[test]
fn test_unknown_resource_selects_last_column() {
    let mut grid = in_memory_grid("UTC", vec![]);
    grid.set_visible_day(Utc::now(), "Somebody else", true, false);
    assert_eq!(grid.selection().column, 3);
}

#[test]
fn test_huge_drag_and_fling_stay_in_bounds() {
    let mut grid = in_memory_grid("UTC", vec![]);
    let max = grid.metrics().max_scroll();

    grid.handle_pointer(PointerEvent::Down {
        pos: pos2(400.0, 100.0),
        time_ms: 0,
    });
    grid.handle_pointer(PointerEvent::Move {
        pos: pos2(400.0, -90_000.0),
        time_ms: 10,
    });
    assert_eq!(grid.scroll_offset().y, max.y);

    grid.handle_pointer(PointerEvent::Move {
        pos: pos2(400.0, 90_000.0),
        time_ms: 20,
    });
    assert_eq!(grid.scroll_offset().y, 0.0);
    grid.handle_pointer(PointerEvent::Up {
        pos: pos2(400.0, 90_000.0),
        time_ms: 25,
    });

    let mut now = 25;
    for _ in 0..500 {
        now += 16;
        grid.tick(now);
        let offset = grid.scroll_offset();
        assert!(offset.x >= 0.0 && offset.x <= max.x);
        assert!(offset.y >= 0.0 && offset.y <= max.y);
    }
}

#[test]
fn test_background_loader_feeds_grid() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("appointments.db");
    let database = Database::new(path.to_str().unwrap()).unwrap();
    database.initialize_schema().unwrap();
    AppointmentService::new(database.connection())
        .create(&NewAppointment {
            title: "Cut & style".to_string(),
            location: Some("Chair 1".to_string()),
            resource: Some("Mechelle".to_string()),
            start: Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 5, 10, 10, 0, 0).unwrap(),
            color: Some("#4A90D9".to_string()),
        })
        .unwrap();

    let mut grid = AppointmentGrid::new(
        GridConfig::default(),
        clerks(),
        4,
        Box::new(BackgroundLoader::new(path.clone())),
        Box::new(ConfiguredTimeZone::new("UTC")),
        Box::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap(),
        )),
    );
    grid.set_view_size(vec2(800.0, 600.0));
    grid.on_resume();

    let deadline = Instant::now() + Duration::from_secs(5);
    while grid.appointments().is_empty() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
        grid.poll_loads();
    }

    assert_eq!(grid.appointments().len(), 1);
    let appointment = &grid.appointments()[0];
    assert_eq!(appointment.resource.as_deref(), Some("Mechelle"));
    // Column 2 starts at 40 + 2 * 190.
    assert_eq!(appointment.layout.left(), 421.0);

    grid.destroy();
}

#[test]
fn test_late_result_after_destroy_is_ignored() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("appointments.db");
    let database = Database::new(path.to_str().unwrap()).unwrap();
    database.initialize_schema().unwrap();
    AppointmentService::new(database.connection())
        .seed_demo_day(
            &["Karos".to_string(), "Colin".to_string()],
            chrono::NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            &chrono_tz::UTC,
        )
        .unwrap();

    let mut grid = AppointmentGrid::new(
        GridConfig::default(),
        clerks(),
        4,
        Box::new(BackgroundLoader::new(path.clone())),
        Box::new(ConfiguredTimeZone::new("UTC")),
        Box::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap(),
        )),
    );
    grid.on_resume();
    grid.destroy();

    std::thread::sleep(Duration::from_millis(50));
    grid.poll_loads();
    assert!(grid.appointments().is_empty());
}

#[test]
fn test_selected_instant_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("appointments.db");
    let target = chrono_tz::Europe::London
        .with_ymd_and_hms(2024, 10, 27, 16, 0, 0)
        .unwrap();

    {
        let database = Database::new(path.to_str().unwrap()).unwrap();
        database.initialize_schema().unwrap();
        let mut grid = in_memory_grid("Europe/London", vec![]);
        grid.set_visible_day(target, "Colin", false, false);
        GridStateService::new(database.connection())
            .save_selected_instant(grid.selected_instant().unwrap().with_timezone(&Utc))
            .unwrap();
    }

    let database = Database::new(path.to_str().unwrap()).unwrap();
    database.initialize_schema().unwrap();
    let saved = GridStateService::new(database.connection())
        .selected_instant()
        .unwrap()
        .unwrap();

    let mut grid = in_memory_grid("Europe/London", vec![]);
    grid.set_visible_day(saved, "Colin", false, false);
    assert_eq!(grid.selected_instant().unwrap(), target);
}
