use std::env;
use std::net::SocketAddr;

use crate::calendar::CalendarLayout;
use crate::error::AppError;
use crate::supabase::SupabaseConfig;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub supabase: SupabaseConfig,
    pub bind_addr: SocketAddr,
    pub calendar: CalendarLayout,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let supabase = SupabaseConfig::new_from_env()?;

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("BIND_ADDR is invalid: {}", e)))?;

        let defaults = CalendarLayout::default();
        let calendar = CalendarLayout {
            window_start_hour: env_or("CALENDAR_START_HOUR", defaults.window_start_hour),
            window_end_hour: env_or("CALENDAR_END_HOUR", defaults.window_end_hour),
            hour_height_px: env_or("CALENDAR_HOUR_HEIGHT_PX", defaults.hour_height_px),
        };
        check_calendar(&calendar)?;

        Ok(Self {
            supabase,
            bind_addr,
            calendar,
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn check_calendar(layout: &CalendarLayout) -> Result<(), AppError> {
    if layout.window_end_hour <= layout.window_start_hour || layout.window_end_hour > 24 {
        return Err(AppError::Config(format!(
            "calendar window {}:00-{}:00 is invalid",
            layout.window_start_hour, layout.window_end_hour
        )));
    }
    if layout.hour_height_px.is_nan() || layout.hour_height_px <= 0.0 {
        return Err(AppError::Config("CALENDAR_HOUR_HEIGHT_PX must be positive".to_string()));
    }
    Ok(())
}
