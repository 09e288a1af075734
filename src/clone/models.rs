// ABOUTME: Request and result types for a clone job
// ABOUTME: Results serialize to the camelCase JSON shape callers expect

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Marker for statistics that were not measured.
pub const UNKNOWN_COUNT: i64 = -1;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"****")
            .finish()
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationDescriptor {
    pub container_name: String,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneDetails {
    pub tables_copied: i64,
    pub records_copied: i64,
    pub total_time: String,
}

impl CloneDetails {
    pub fn measured(tables: Option<usize>, elapsed: Duration) -> Self {
        Self {
            tables_copied: tables.map_or(UNKNOWN_COUNT, |n| n as i64),
            records_copied: UNKNOWN_COUNT,
            total_time: format!("{:.1}s", elapsed.as_secs_f64()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloneResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<CloneDetails>,
}

impl CloneResult {
    pub fn completed(details: CloneDetails) -> Self {
        Self {
            success: true,
            message: "Clone completed successfully".to_string(),
            details: Some(details),
        }
    }

    pub fn failed(reason: impl fmt::Display) -> Self {
        Self {
            success: false,
            message: format!("Clone failed: {}", reason),
            details: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_json_shape() {
        let result = CloneResult::completed(CloneDetails::measured(None, Duration::ZERO));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["details"]["tablesCopied"], -1);
        assert_eq!(json["details"]["recordsCopied"], -1);
        assert_eq!(json["details"]["totalTime"], "0.0s");

        let failed = serde_json::to_value(CloneResult::failed("boom")).unwrap();
        assert!(failed.get("details").is_none());
    }

    #[test]
    fn test_measured_details() {
        let details = CloneDetails::measured(Some(12), Duration::from_millis(4300));
        assert_eq!(details.tables_copied, 12);
        assert_eq!(details.records_copied, UNKNOWN_COUNT);
        assert_eq!(details.total_time, "4.3s");
        assert_eq!(
            CloneDetails::measured(None, Duration::ZERO).tables_copied,
            UNKNOWN_COUNT
        );
    }

    #[test]
    fn test_source_debug_hides_password() {
        let source = SourceDescriptor {
            host: "h".to_string(),
            port: 5432,
            database: "d".to_string(),
            user: "u".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", source).contains("hunter2"));
        assert_eq!(source.to_string(), "u@h:5432/d");
    }
}
