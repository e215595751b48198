//! RSVP entry model matching the invitation page's RSVPEntry record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a guest will attend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AttendanceStatus {
    Attending,
    NotAttending,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Attending => "attending",
            AttendanceStatus::NotAttending => "not-attending",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "attending" => Some(AttendanceStatus::Attending),
            "not-attending" => Some(AttendanceStatus::NotAttending),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single attendance confirmation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RsvpEntry {
    pub id: String,
    pub name: String,
    pub address: String,
    /// Alumni-year label ("angkatan").
    #[serde(rename = "angkatan")]
    pub cohort: String,
    pub status: AttendanceStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl RsvpEntry {
    /// The de-duplication key for this guest.
    pub fn identity(&self) -> LogicalIdentity {
        LogicalIdentity::new(&self.name, &self.cohort)
    }

    pub fn matches_identity(&self, identity: &LogicalIdentity) -> bool {
        self.identity() == *identity
    }
}

/// Normalized (name, cohort) pair identifying a guest across devices.
///
/// Names compare case-insensitively after trimming; cohorts compare exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalIdentity {
    name: String,
    cohort: String,
}

impl LogicalIdentity {
    pub fn new(name: &str, cohort: &str) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            cohort: cohort.to_string(),
        }
    }
}

/// Attendance counts over a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpStats {
    pub attending: usize,
    pub not_attending: usize,
}

impl RsvpStats {
    pub fn from_entries(entries: &[RsvpEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut stats, entry| {
            match entry.status {
                AttendanceStatus::Attending => stats.attending += 1,
                AttendanceStatus::NotAttending => stats.not_attending += 1,
            }
            stats
        })
    }

    pub fn total(&self) -> usize {
        self.attending + self.not_attending
    }
}

/// Find the first entry with the given logical identity.
pub fn find_by_identity<'a>(
    entries: &'a [RsvpEntry],
    name: &str,
    cohort: &str,
) -> Option<&'a RsvpEntry> {
    let identity = LogicalIdentity::new(name, cohort);
    entries.iter().find(|e| e.matches_identity(&identity))
}

/// Order a collection newest-first by submission time.
pub fn sort_newest_first(entries: &mut [RsvpEntry]) {
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: &str, name: &str, cohort: &str, status: AttendanceStatus) -> RsvpEntry {
        RsvpEntry {
            id: id.to_string(),
            name: name.to_string(),
            address: "Jl. Merdeka 1".to_string(),
            cohort: cohort.to_string(),
            status,
            timestamp: Utc::now(),
            avatar: None,
        }
    }

    #[test]
    fn test_identity_ignores_case_and_whitespace() {
        let a = entry("1", "Ahmad Fauzi", "2010", AttendanceStatus::Attending);
        let b = entry("2", "  ahmad FAUZI ", "2010", AttendanceStatus::NotAttending);
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn test_identity_distinguishes_cohort() {
        let a = entry("1", "Ahmad Fauzi", "2010", AttendanceStatus::Attending);
        let b = entry("2", "Ahmad Fauzi", "2011", AttendanceStatus::Attending);
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn test_entry_wire_format() {
        let mut e = entry("abc", "Siti", "2015", AttendanceStatus::NotAttending);
        e.timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();

        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["angkatan"], "2015");
        assert_eq!(json["status"], "not-attending");
        assert_eq!(json["timestamp"], "2024-05-01T08:30:00Z");
        assert!(json.get("avatar").is_none());
        assert!(json.get("cohort").is_none());
    }

    #[test]
    fn test_entry_parses_browser_timestamp() {
        let json = r#"{
            "id": "1717000000000",
            "name": "Budi",
            "address": "Bandung",
            "angkatan": "2012",
            "status": "attending",
            "timestamp": "2024-05-29T16:26:40.000Z"
        }"#;
        let e: RsvpEntry = serde_json::from_str(json).unwrap();
        assert_eq!(e.status, AttendanceStatus::Attending);
        assert_eq!(e.timestamp, Utc.with_ymd_and_hms(2024, 5, 29, 16, 26, 40).unwrap());
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [AttendanceStatus::Attending, AttendanceStatus::NotAttending] {
            assert_eq!(AttendanceStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AttendanceStatus::parse("maybe"), None);
    }

    #[test]
    fn test_stats() {
        let entries = vec![
            entry("1", "A", "2010", AttendanceStatus::Attending),
            entry("2", "B", "2010", AttendanceStatus::Attending),
            entry("3", "C", "2011", AttendanceStatus::NotAttending),
        ];
        let stats = RsvpStats::from_entries(&entries);
        assert_eq!(stats.attending, 2);
        assert_eq!(stats.not_attending, 1);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn test_sort_newest_first() {
        let mut old = entry("old", "A", "2010", AttendanceStatus::Attending);
        old.timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut new = entry("new", "B", "2010", AttendanceStatus::Attending);
        new.timestamp = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        let mut entries = vec![old, new];
        sort_newest_first(&mut entries);
        assert_eq!(entries[0].id, "new");
    }

    #[test]
    fn test_find_by_identity() {
        let entries = vec![entry("1", "Ahmad Fauzi", "2010", AttendanceStatus::Attending)];
        assert!(find_by_identity(&entries, " AHMAD FAUZI", "2010").is_some());
        assert!(find_by_identity(&entries, "Ahmad", "2010").is_none());
        assert!(find_by_identity(&entries, "Ahmad Fauzi", " 2010").is_none());
    }
}
