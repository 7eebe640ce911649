use std::{
    collections::HashMap,
    io::BufRead,
    sync::Arc,
};

use serde::Serialize;
use thiserror::Error;

/// An application definition shared across all hosts: every machine in the
/// fleet running `name` listens on `port` and is polled through one of the
/// named connectors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Application {
    name: String,
    port: u16,
    connectors: Vec<String>,
}

impl Application {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn connectors(&self) -> &[String] {
        &self.connectors
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("line {line}: malformed application record {record:?}: expected `name port connector[,connector...]`")]
    Malformed { line: usize, record: String },

    #[error("line {line}: invalid port {port:?}")]
    InvalidPort { line: usize, port: String },

    #[error("duplicate application name {name:?}")]
    DuplicateName { name: String },

    #[error("duplicate application port {port}")]
    DuplicatePort { port: u16 },

    #[error("application {name:?} names no connector")]
    NoConnectors { name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Accumulates application definitions, rejecting duplicates by name or
/// port. `build` consumes the builder, so a list can be produced exactly
/// once; there is no partially built list to observe on error.
pub struct ApplicationListBuilder {
    applications: Vec<Arc<Application>>,
}

impl ApplicationListBuilder {
    pub fn new() -> Self {
        Self {
            applications: Vec::new(),
        }
    }

    pub fn add(
        &mut self,
        port: u16,
        name: impl Into<String>,
        connectors: Vec<String>,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        if connectors.is_empty() {
            return Err(ConfigError::NoConnectors { name });
        }
        if self.applications.iter().any(|a| a.name == name) {
            return Err(ConfigError::DuplicateName { name });
        }
        if self.applications.iter().any(|a| a.port == port) {
            return Err(ConfigError::DuplicatePort { port });
        }
        self.applications.push(Arc::new(Application {
            name,
            port,
            connectors,
        }));
        Ok(())
    }

    /// Read newline-delimited records of the form
    /// `name <ws> port <ws> connector[,connector...]`. Blank lines and `#`
    /// comments are ignored; anything else malformed is fatal.
    pub fn read_config(&mut self, reader: impl BufRead) -> Result<(), ConfigError> {
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let record = line.trim();
            if record.is_empty() || record.starts_with('#') {
                continue;
            }
            let mut fields = record.split_whitespace();
            let (Some(name), Some(port), Some(connectors), None) = (
                fields.next(),
                fields.next(),
                fields.next(),
                fields.next(),
            ) else {
                return Err(ConfigError::Malformed {
                    line: index + 1,
                    record: record.to_owned(),
                });
            };
            let port: u16 = match port.parse() {
                Ok(0) | Err(_) => {
                    return Err(ConfigError::InvalidPort {
                        line: index + 1,
                        port: port.to_owned(),
                    });
                },
                Ok(p) => p,
            };
            let connectors = connectors.split(',').map(str::to_owned).collect();
            self.add(port, name, connectors)?;
        }
        Ok(())
    }

    pub fn build(self) -> ApplicationList {
        let mut applications = self.applications;
        applications.sort_by(|a, b| a.name.cmp(&b.name));
        let by_port = applications.iter().map(|a| (a.port, a.clone())).collect();
        let by_name = applications
            .iter()
            .map(|a| (a.name.clone(), a.clone()))
            .collect();
        ApplicationList {
            applications,
            by_port,
            by_name,
        }
    }
}

/// The immutable set of application definitions, fixed at startup.
#[derive(Clone)]
pub struct ApplicationList {
    applications: Vec<Arc<Application>>,
    by_port: HashMap<u16, Arc<Application>>,
    by_name: HashMap<String, Arc<Application>>,
}

impl ApplicationList {
    /// All applications, sorted by name.
    pub fn all(&self) -> &[Arc<Application>] {
        &self.applications
    }

    pub fn by_port(&self, port: u16) -> Option<&Arc<Application>> {
        self.by_port.get(&port)
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<Application>> {
        self.by_name.get(name)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_build_and_lookups() {
        let mut builder = ApplicationListBuilder::new();
        builder.add(80, "web", vec!["http".to_owned()]).unwrap();
        builder.add(5432, "db", vec!["wire".to_owned()]).unwrap();
        let list = builder.build();

        assert_eq!(list.all().len(), 2);
        // Sorted by name.
        assert_eq!(list.all()[0].name(), "db");
        assert_eq!(list.by_port(80).unwrap().name(), "web");
        assert_eq!(list.by_name("db").unwrap().port(), 5432);
        assert!(list.by_port(81).is_none());
        assert!(list.by_name("cache").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut builder = ApplicationListBuilder::new();
        builder.add(80, "web", vec!["http".to_owned()]).unwrap();
        let err = builder.add(81, "web", vec!["http".to_owned()]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName { .. }));
    }

    #[test]
    fn test_duplicate_port_rejected() {
        let mut builder = ApplicationListBuilder::new();
        builder.add(80, "web", vec!["http".to_owned()]).unwrap();
        let err = builder.add(80, "cache", vec!["http".to_owned()]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicatePort { port: 80 }));
    }

    #[test]
    fn test_read_config() {
        let config = "\
# fleet applications
web 80 http
db 5432 wire,probe

cache 6379 probe
";
        let mut builder = ApplicationListBuilder::new();
        builder.read_config(Cursor::new(config)).unwrap();
        let list = builder.build();
        assert_eq!(list.all().len(), 3);
        assert_eq!(
            list.by_name("db").unwrap().connectors(),
            &["wire".to_owned(), "probe".to_owned()]
        );
    }

    #[test]
    fn test_read_config_malformed_record() {
        let mut builder = ApplicationListBuilder::new();
        let err = builder
            .read_config(Cursor::new("web 80\n"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { line: 1, .. }));
    }

    #[test]
    fn test_read_config_bad_port() {
        let mut builder = ApplicationListBuilder::new();
        for bad in ["web zero http", "web 0 http", "web 70000 http"] {
            let err = ApplicationListBuilder::new()
                .read_config(Cursor::new(bad))
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidPort { .. }), "{bad}");
        }
        // The builder that saw only errors built nothing.
        assert!(builder.read_config(Cursor::new("")).is_ok());
        assert!(builder.build().all().is_empty());
    }

    #[test]
    fn test_read_config_duplicate_is_fatal() {
        let mut builder = ApplicationListBuilder::new();
        let err = builder
            .read_config(Cursor::new("web 80 http\nweb 81 http\n"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName { .. }));
    }
}
