use serde::{Deserialize, Serialize};

// ============================================================================
// Event Store Configuration
// ============================================================================
//
// Read from the environment (a `.env` file is honoured when present):
//
//   SCYLLA_NODES                    comma separated host:port list
//   EVENT_STORE_KEYSPACE            keyspace holding the events table
//   EVENT_STORE_TABLE               events table name
//   EVENT_STORE_INDEX               optional secondary index (view) name
//   EVENT_STORE_REPLICATION_FACTOR  used when bootstrapping the keyspace
//   EVENT_STORE_PAGE_SIZE           rows per page for range queries
//
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid CQL identifier for {key}: {value:?}")]
    InvalidIdentifier { key: &'static str, value: String },

    #[error("No ScyllaDB nodes configured")]
    NoNodes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventStoreConfig {
    pub known_nodes: Vec<String>,
    pub keyspace: String,
    pub table: String,
    pub index_name: Option<String>,
    pub replication_factor: u32,
    pub page_size: i32,
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            known_nodes: vec!["127.0.0.1:9042".to_string()],
            keyspace: "event_store_ks".to_string(),
            table: "events".to_string(),
            index_name: None,
            replication_factor: 1,
            page_size: 100,
        }
    }
}

impl EventStoreConfig {
    /// Load from process environment, after applying `.env` if one exists
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(nodes) = lookup("SCYLLA_NODES") {
            config.known_nodes = nodes
                .split(',')
                .map(str::trim)
                .filter(|node| !node.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(keyspace) = lookup("EVENT_STORE_KEYSPACE") {
            config.keyspace = keyspace;
        }
        if let Some(table) = lookup("EVENT_STORE_TABLE") {
            config.table = table;
        }
        if let Some(index) = lookup("EVENT_STORE_INDEX") {
            config.index_name = Some(index).filter(|name| !name.is_empty());
        }
        if let Some(value) = lookup("EVENT_STORE_REPLICATION_FACTOR") {
            config.replication_factor = parse_positive("EVENT_STORE_REPLICATION_FACTOR", &value)?;
        }
        if let Some(value) = lookup("EVENT_STORE_PAGE_SIZE") {
            config.page_size = parse_positive("EVENT_STORE_PAGE_SIZE", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Names end up spliced into CQL text, so only plain identifiers pass.
    /// Also covers configs built through serde, which skip `parse_positive`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.known_nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }
        if self.page_size < 1 {
            return Err(ConfigError::InvalidValue {
                key: "EVENT_STORE_PAGE_SIZE",
                value: self.page_size.to_string(),
            });
        }
        if self.replication_factor < 1 {
            return Err(ConfigError::InvalidValue {
                key: "EVENT_STORE_REPLICATION_FACTOR",
                value: self.replication_factor.to_string(),
            });
        }

        check_identifier("EVENT_STORE_KEYSPACE", &self.keyspace)?;
        check_identifier("EVENT_STORE_TABLE", &self.table)?;
        if let Some(index) = &self.index_name {
            check_identifier("EVENT_STORE_INDEX", index)?;
        }
        Ok(())
    }
}

fn parse_positive<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(parsed),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn check_identifier(key: &'static str, value: &str) -> Result<(), ConfigError> {
    let valid = value
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            key,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = EventStoreConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, EventStoreConfig::default());
        assert_eq!(config.known_nodes, vec!["127.0.0.1:9042"]);
        assert!(config.index_name.is_none());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = EventStoreConfig::from_lookup(lookup(&[
            ("SCYLLA_NODES", "10.0.0.1:9042, 10.0.0.2:9042"),
            ("EVENT_STORE_KEYSPACE", "celebrities"),
            ("EVENT_STORE_TABLE", "celebrity_events"),
            ("EVENT_STORE_INDEX", "events_by_version"),
            ("EVENT_STORE_PAGE_SIZE", "25"),
        ]))
        .unwrap();

        assert_eq!(config.known_nodes, vec!["10.0.0.1:9042", "10.0.0.2:9042"]);
        assert_eq!(config.keyspace, "celebrities");
        assert_eq!(config.table, "celebrity_events");
        assert_eq!(config.index_name.as_deref(), Some("events_by_version"));
        assert_eq!(config.page_size, 25);
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let error =
            EventStoreConfig::from_lookup(lookup(&[("EVENT_STORE_PAGE_SIZE", "0")])).unwrap_err();

        assert_eq!(
            error,
            ConfigError::InvalidValue {
                key: "EVENT_STORE_PAGE_SIZE",
                value: "0".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_identifiers_that_are_not_plain_names() {
        let error =
            EventStoreConfig::from_lookup(lookup(&[("EVENT_STORE_TABLE", "events; DROP")]))
                .unwrap_err();

        assert!(matches!(
            error,
            ConfigError::InvalidIdentifier {
                key: "EVENT_STORE_TABLE",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_empty_node_list() {
        let error = EventStoreConfig::from_lookup(lookup(&[("SCYLLA_NODES", " , ")])).unwrap_err();

        assert_eq!(error, ConfigError::NoNodes);
    }

    #[test]
    fn test_deserialized_zero_page_size_fails_validation() {
        let config: EventStoreConfig = serde_json::from_str(r#"{"page_size": 0}"#).unwrap();

        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                key: "EVENT_STORE_PAGE_SIZE",
                value: "0".to_string()
            })
        );
    }

    #[test]
    fn test_deserialized_zero_replication_fails_validation() {
        let config: EventStoreConfig =
            serde_json::from_str(r#"{"replication_factor": 0}"#).unwrap();

        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                key: "EVENT_STORE_REPLICATION_FACTOR",
                value: "0".to_string()
            })
        );
    }

    #[test]
    fn test_deserialized_defaults_validate() {
        let config: EventStoreConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config, EventStoreConfig::default());
        assert!(config.validate().is_ok());
    }
}
