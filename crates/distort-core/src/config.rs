use std::{net::IpAddr, path::Path};

use crate::{Class, ConfigError};

fn read_lines(path: &Path) -> Result<Vec<String>, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
    Ok(text.lines().map(|l| l.trim_end_matches('\r').to_string()).collect())
}

fn line<'a>(lines: &'a [String], path: &Path, idx: usize) -> Result<&'a str, ConfigError> {
    lines.get(idx).map(String::as_str).ok_or_else(|| ConfigError::TooShort {
        path: path.display().to_string(),
        found: lines.len(),
        expected: idx + 1,
    })
}

fn parse_port(lines: &[String], path: &Path, idx: usize) -> Result<u16, ConfigError> {
    let raw = line(lines, path, idx)?;
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        path: path.display().to_string(),
        line: idx,
        value: raw.to_string(),
    })
}

fn parse_ip(lines: &[String], path: &Path, idx: usize) -> Result<IpAddr, ConfigError> {
    let raw = line(lines, path, idx)?;
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        path: path.display().to_string(),
        line: idx,
        value: raw.to_string(),
    })
}

/// `distort-client` config: one line each, in order.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub username: String,
    pub folder_path: String,
    pub registry_ip: IpAddr,
    pub registry_port: u16,
}

impl ClientConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let lines = read_lines(path)?;
        Ok(Self {
            username: line(&lines, path, 0)?.to_string(),
            folder_path: line(&lines, path, 1)?.to_string(),
            registry_ip: parse_ip(&lines, path, 2)?,
            registry_port: parse_port(&lines, path, 3)?,
        })
    }
}

/// `distort-registry` config: one line each, in order.
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    pub client_ip: IpAddr,
    pub client_port: u16,
    pub worker_ip: IpAddr,
    pub worker_port: u16,
}

impl RegistryConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let lines = read_lines(path)?;
        Ok(Self {
            client_ip: parse_ip(&lines, path, 0)?,
            client_port: parse_port(&lines, path, 1)?,
            worker_ip: parse_ip(&lines, path, 2)?,
            worker_port: parse_port(&lines, path, 3)?,
        })
    }
}

/// `distort-worker` config: one line each, in order.
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub registry_ip: IpAddr,
    pub registry_port: u16,
    pub worker_ip: IpAddr,
    pub worker_port: u16,
    pub folder_path: String,
    pub class: Class,
}

impl WorkerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let lines = read_lines(path)?;
        let class_raw = line(&lines, path, 5)?;
        let class = class_raw.parse().map_err(|()| ConfigError::InvalidValue {
            path: path.display().to_string(),
            line: 5,
            value: class_raw.to_string(),
        })?;
        Ok(Self {
            registry_ip: parse_ip(&lines, path, 0)?,
            registry_port: parse_port(&lines, path, 1)?,
            worker_ip: parse_ip(&lines, path, 2)?,
            worker_port: parse_port(&lines, path, 3)?,
            folder_path: line(&lines, path, 4)?.to_string(),
            class,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_client_config_in_fixed_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.conf");
        std::fs::write(&path, "alice\n/home/alice/distort\n127.0.0.1\n9000\n").unwrap();

        let cfg = ClientConfig::load(&path).unwrap();
        assert_eq!(cfg.username, "alice");
        assert_eq!(cfg.registry_port, 9000);
    }

    #[test]
    fn rejects_short_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.conf");
        std::fs::write(&path, "alice\n").unwrap();

        assert!(matches!(ClientConfig::load(&path), Err(ConfigError::TooShort { .. })));
    }

    #[test]
    fn loads_worker_config_class() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worker.conf");
        std::fs::write(&path, "127.0.0.1\n9000\n127.0.0.1\n9100\n/var/distort\ntext\n").unwrap();

        let cfg = WorkerConfig::load(&path).unwrap();
        assert_eq!(cfg.class, Class::Text);
    }
}
