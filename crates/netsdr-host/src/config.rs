//! Host configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (NETSDR_HOST, NETSDR_PORT)
//! - TOML configuration file

use anyhow::{bail, Context, Result};
use netsdr_client::ClientConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Receiver host name or address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Receiver control (TCP) port.
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,

    /// Local port the IQ stream (UDP) arrives on.
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,

    /// Protocol client settings.
    #[serde(default)]
    pub client: ClientSection,

    /// Receiver tuning.
    #[serde(default)]
    pub receiver: ReceiverSection,

    /// Sample output.
    #[serde(default)]
    pub output: OutputSection,
}

/// Protocol client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSection {
    /// Command response timeout in milliseconds.
    #[serde(default = "default_response_timeout")]
    pub response_timeout_ms: u64,

    /// IQ output sample rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: u64,

    /// Sample width in bits.
    #[serde(default = "default_bits_per_sample")]
    pub bits_per_sample: u32,
}

/// Receiver tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiverSection {
    /// Frequency to tune to after setup, if any.
    #[serde(default)]
    pub frequency_hz: Option<u64>,

    /// Receiver channel.
    #[serde(default)]
    pub channel: u8,
}

/// Sample output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    /// File samples are appended to.
    #[serde(default = "default_samples_path")]
    pub samples_path: PathBuf,

    /// Stop after this many seconds; stream until Ctrl-C when unset.
    #[serde(default)]
    pub stream_seconds: Option<u64>,
}

// Default value functions
fn default_host() -> String {
    std::env::var("NETSDR_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())
}

fn default_tcp_port() -> u16 {
    std::env::var("NETSDR_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(50000)
}

fn default_udp_port() -> u16 {
    60000
}

fn default_response_timeout() -> u64 {
    5_000 // 5 seconds
}

fn default_sample_rate() -> u64 {
    100_000
}

fn default_bits_per_sample() -> u32 {
    16
}

fn default_samples_path() -> PathBuf {
    PathBuf::from("samples.bin")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            tcp_port: default_tcp_port(),
            udp_port: default_udp_port(),
            client: ClientSection::default(),
            receiver: ReceiverSection::default(),
            output: OutputSection::default(),
        }
    }
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            response_timeout_ms: default_response_timeout(),
            sample_rate_hz: default_sample_rate(),
            bits_per_sample: default_bits_per_sample(),
        }
    }
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            samples_path: default_samples_path(),
            stream_seconds: None,
        }
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "netsdr.toml",
            "/etc/netsdr/netsdr.toml",
            "~/.config/netsdr/netsdr.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;

        Ok(config)
    }

    /// Check values the client cannot work with.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        let bits = self.client.bits_per_sample;
        if bits == 0 || bits % 8 != 0 || bits > 32 {
            bail!("bits_per_sample must be 8, 16, 24 or 32 (got {})", bits);
        }
        if self.client.response_timeout_ms == 0 {
            bail!("response_timeout_ms must be greater than 0");
        }
        Ok(())
    }

    /// Receiver control address as `host:port`.
    #[must_use]
    pub fn tcp_addr(&self) -> String {
        format!("{}:{}", self.host, self.tcp_port)
    }

    /// Settings for the protocol client.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            response_timeout: Duration::from_millis(self.client.response_timeout_ms),
            sample_rate_hz: self.client.sample_rate_hz,
            bits_per_sample: self.client.bits_per_sample,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.udp_port, 60000);
        assert_eq!(config.client.response_timeout_ms, 5000);
        assert_eq!(config.output.samples_path, PathBuf::from("samples.bin"));
        assert!(config.receiver.frequency_hz.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            host = "192.168.1.50"
            tcp_port = 50000

            [client]
            response_timeout_ms = 2000

            [receiver]
            frequency_hz = 14010000
            channel = 1

            [output]
            stream_seconds = 30
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.tcp_addr(), "192.168.1.50:50000");
        assert_eq!(config.receiver.frequency_hz, Some(14_010_000));
        assert_eq!(config.receiver.channel, 1);
        assert_eq!(config.output.stream_seconds, Some(30));

        let client = config.client_config();
        assert_eq!(client.response_timeout, Duration::from_secs(2));
        assert_eq!(client.bits_per_sample, 16);
    }

    #[test]
    fn test_invalid_sample_width_rejected() {
        let toml_str = r#"
            [client]
            bits_per_sample = 12
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }
}
