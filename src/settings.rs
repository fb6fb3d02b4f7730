use std::{env, str::FromStr, time::Duration};

use tandem_collab::Config;
use tandem_server::DEFAULT_PORT;
use thiserror::Error;

/// Everything the binary reads from its environment
#[derive(Debug, Clone)]
pub struct Settings {
    /// Where postgres lives. Without one, records are kept in memory.
    pub database_url: Option<String>,
    pub port: u16,
    pub config: Config,
}

#[derive(Debug, Error)]
#[error("{name} must be {expected}, got {value:?}")]
pub struct InvalidSetting {
    name: &'static str,
    expected: &'static str,
    value: String,
}

/// Longest invitation lifetime accepted, one year
const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

impl Settings {
    pub fn from_env() -> Result<Self, InvalidSetting> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, InvalidSetting> {
        let positive = |name: &'static str, max: u64| -> Result<Option<u64>, InvalidSetting> {
            let value = lookup(name);

            match parse::<u64>(name, value.clone())? {
                Some(number) if number == 0 || number > max => Err(InvalidSetting {
                    name,
                    expected: "a positive number in range",
                    value: value.unwrap_or_default(),
                }),
                number => Ok(number),
            }
        };

        let mut config = Config::default();

        if let Some(secs) = positive("TANDEM_INVITATION_TTL_SECS", MAX_TTL_SECS)? {
            config = config.with_invitation_ttl(chrono::Duration::seconds(secs as i64));
        }

        if let Some(millis) = positive("TANDEM_DEADLINE_MS", u32::MAX as u64)? {
            config.deadline = Duration::from_millis(millis);
        }

        if let Some(secs) = positive("TANDEM_SWEEP_INTERVAL_SECS", MAX_TTL_SECS)? {
            config.sweep_interval = Duration::from_secs(secs);
        }

        let port = parse("TANDEM_SERVER_PORT", lookup("TANDEM_SERVER_PORT"))?.unwrap_or(DEFAULT_PORT);

        Ok(Self {
            database_url: lookup("TANDEM_DATABASE_URL").filter(|x| !x.is_empty()),
            port,
            config,
        })
    }
}

fn parse<T: FromStr>(name: &'static str, value: Option<String>) -> Result<Option<T>, InvalidSetting> {
    value
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| InvalidSetting {
                    name,
                    expected: "a number",
                    value,
                })
        })
        .transpose()
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, InvalidSetting> {
        let vars: HashMap<_, _> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let settings = settings(&[]).unwrap();

        assert_eq!(settings.database_url, None);
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.config.invitation_ttl, chrono::Duration::minutes(10));
    }

    #[test]
    fn overrides_from_environment() {
        let settings = settings(&[
            ("TANDEM_DATABASE_URL", "postgres://localhost/tandem"),
            ("TANDEM_SERVER_PORT", "8080"),
            ("TANDEM_INVITATION_TTL_SECS", "30"),
            ("TANDEM_DEADLINE_MS", "250"),
        ])
        .unwrap();

        assert_eq!(settings.database_url.as_deref(), Some("postgres://localhost/tandem"));
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.config.invitation_ttl, chrono::Duration::seconds(30));
        assert_eq!(settings.config.deadline, Duration::from_millis(250));
    }

    #[test]
    fn rejects_garbage() {
        let error = settings(&[("TANDEM_SERVER_PORT", "eighty")]).unwrap_err();

        assert_eq!(
            error.to_string(),
            "TANDEM_SERVER_PORT must be a number, got \"eighty\""
        );
    }

    #[test]
    fn rejects_zero_and_huge_durations() {
        for (name, value) in [
            ("TANDEM_SWEEP_INTERVAL_SECS", "0"),
            ("TANDEM_INVITATION_TTL_SECS", "0"),
            ("TANDEM_INVITATION_TTL_SECS", "18446744073709551615"),
            ("TANDEM_DEADLINE_MS", "0"),
        ] {
            let error = settings(&[(name, value)]).unwrap_err();

            assert_eq!(
                error.to_string(),
                format!("{name} must be a positive number in range, got {value:?}")
            );
        }

        let settings = settings(&[("TANDEM_SWEEP_INTERVAL_SECS", "5")]).unwrap();
        assert_eq!(settings.config.sweep_interval, Duration::from_secs(5));
    }
}
