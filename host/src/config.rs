//! Serial link settings, read from a TOML file and overridden on the command line.

use {
    anyhow::{Context, Result},
    serde::Deserialize,
    std::{path::Path, time::Duration},
};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Serial device, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port: String,
    pub baud_rate: u32,
    /// How long to wait for each reply.
    pub timeout_ms: u64,
    /// Pause after each write before listening for the reply.
    pub settle_us: u64,
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_owned(),
            baud_rate: 1_000_000,
            timeout_ms: 20,
            settle_us: 1_000,
        }
    }
}

impl Config {
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse {} as TOML", path.display()))
    }

    #[inline]
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    #[inline(always)]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[inline(always)]
    pub const fn settle(&self) -> Duration {
        Duration::from_micros(self.settle_us)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.baud_rate, 1_000_000);
        assert_eq!(config.timeout(), Duration::from_millis(20));
        assert_eq!(config.settle(), Duration::from_millis(1));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::parse("port = \"/dev/ttyACM0\"\nbaud_rate = 500000\n").unwrap();
        assert_eq!(
            config,
            Config {
                port: "/dev/ttyACM0".to_owned(),
                baud_rate: 500_000,
                ..Config::default()
            }
        );
    }

    #[test]
    fn typos_are_rejected() {
        assert!(Config::parse("baudrate = 115200").is_err());
    }
}
