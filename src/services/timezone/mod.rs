// Timezone service
// Resolves the zone the grid projects appointments into

use chrono_tz::Tz;

/// Source of the zone name used for "today", the current-time line and the
/// julian-day projection of appointments.
#[cfg_attr(test, mockall::automock)]
pub trait TimeZoneResolver {
    /// IANA zone name, e.g. `"Europe/London"`.
    fn current_time_zone(&self) -> String;
}

/// Always answers with the zone from the host configuration.
#[derive(Debug, Clone)]
pub struct ConfiguredTimeZone {
    name: String,
}

impl ConfiguredTimeZone {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TimeZoneResolver for ConfiguredTimeZone {
    fn current_time_zone(&self) -> String {
        self.name.clone()
    }
}

/// Follows the process environment (`TZ`), re-read on every call so a zone
/// change is picked up on the next reload.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeZone;

impl TimeZoneResolver for SystemTimeZone {
    fn current_time_zone(&self) -> String {
        std::env::var("TZ")
            .ok()
            .map(|name| name.trim_start_matches(':').to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "UTC".to_string())
    }
}

/// Parses an IANA name, logging and returning `None` for unknown zones.
pub fn parse_zone(name: &str) -> Option<Tz> {
    match name.parse::<Tz>() {
        Ok(zone) => Some(zone),
        Err(err) => {
            log::warn!("Unknown timezone '{}': {}", name, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_zone() {
        assert_eq!(parse_zone("Europe/London"), Some(chrono_tz::Europe::London));
        assert_eq!(parse_zone("Mars/Olympus_Mons"), None);
    }

    #[test]
    fn test_configured_zone() {
        let resolver = ConfiguredTimeZone::new("Asia/Tokyo");
        assert_eq!(resolver.current_time_zone(), "Asia/Tokyo");
    }

    #[test]
    #[serial]
    fn test_system_zone_reads_tz_variable() {
        let previous = std::env::var("TZ").ok();

        std::env::set_var("TZ", ":America/New_York");
        assert_eq!(SystemTimeZone.current_time_zone(), "America/New_York");

        std::env::remove_var("TZ");
        assert_eq!(SystemTimeZone.current_time_zone(), "UTC");

        if let Some(value) = previous {
            std::env::set_var("TZ", value);
        }
    }
}
