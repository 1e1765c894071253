/// Connection descriptor parsing
///
/// A descriptor names the sentinel-monitored cluster, the sentinels to ask
/// about it, and the database index to select on the resulting connection:
///
/// ```text
/// <cluster_name>/<host1>:<port1>,<host2>:<port2>,.../<db_index>
/// ```
///
/// Parsing is all-or-nothing: any malformed segment rejects the whole string
/// with [`ConfigError::DescriptorError`] carrying the raw input.
use crate::config::ConfigError;
use crate::core::Endpoint;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Name the sentinels use for the primary/replica set
    pub cluster_name: String,
    /// Sentinel endpoints, in descriptor order
    pub monitor_endpoints: Vec<Endpoint>,
    /// Passed through unchanged to the data connection
    pub db_index: String,
}

impl ConnectionDescriptor {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::DescriptorError(raw.to_string());

        let mut segments = raw.split('/');
        let (cluster_name, endpoints, db_index) =
            match (segments.next(), segments.next(), segments.next(), segments.next()) {
                (Some(name), Some(endpoints), Some(db), None) => (name, endpoints, db),
                _ => return Err(invalid()),
            };

        if cluster_name.is_empty() || db_index.is_empty() {
            return Err(invalid());
        }

        let monitor_endpoints = endpoints
            .split(',')
            .map(Endpoint::parse)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(invalid)?;

        Ok(Self {
            cluster_name: cluster_name.to_string(),
            monitor_endpoints,
            db_index: db_index.to_string(),
        })
    }
}

impl FromStr for ConnectionDescriptor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/", self.cluster_name)?;
        for (i, endpoint) in self.monitor_endpoints.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", endpoint)?;
        }
        write!(f, "/{}", self.db_index)
    }
}
