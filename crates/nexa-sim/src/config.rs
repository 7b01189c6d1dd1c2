//! Driver configuration loaded from environment variables.
//!
//! Every setting has a default, so the driver runs with no configuration.

use std::path::PathBuf;
use std::str::FromStr;

use nexa_client::SimulatorSettings;

pub const DEFAULT_LOGIN_EMAIL: &str = "admin@nexaautomations.com";

#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// SQLite file holding the store.
    /// Env: `NEXA_DB_PATH`
    /// Default: `None`, the platform data directory.
    pub db_path: Option<PathBuf>,

    /// Account to log in as.
    /// Env: `NEXA_LOGIN_EMAIL`
    /// Default: the seeded admin.
    pub login_email: String,

    /// Env: `NEXA_SIM_MIN_SECS`, `NEXA_SIM_MAX_SECS`, `NEXA_SIM_PROBABILITY`
    pub simulator: SimulatorSettings,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            login_email: DEFAULT_LOGIN_EMAIL.to_string(),
            simulator: SimulatorSettings::default(),
        }
    }
}

impl SimConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any variable source; unparsable values keep the default.
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = var("NEXA_DB_PATH").filter(|p| !p.trim().is_empty()) {
            config.db_path = Some(PathBuf::from(path));
        }

        if let Some(email) = var("NEXA_LOGIN_EMAIL").filter(|e| !e.trim().is_empty()) {
            config.login_email = email.trim().to_string();
        }

        let sim = &mut config.simulator;
        parse_into(&var, "NEXA_SIM_MIN_SECS", &mut sim.min_delay_secs);
        parse_into(&var, "NEXA_SIM_MAX_SECS", &mut sim.max_delay_secs);
        parse_into(&var, "NEXA_SIM_PROBABILITY", &mut sim.message_probability);

        // RUST_LOG is read by tracing-subscriber's EnvFilter directly.

        config
    }
}

fn parse_into<T, F>(var: &F, key: &str, slot: &mut T)
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = var(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(key, value = %raw, "Invalid value, using default"),
    }
}
