//! Submission form and its presence check.

use chrono::Utc;
use thiserror::Error;

use crate::models::{AttendanceStatus, RsvpEntry};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormError {
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// What a guest fills in before confirming.
#[derive(Debug, Clone)]
pub struct RsvpForm {
    pub name: String,
    pub address: String,
    pub cohort: String,
    pub status: AttendanceStatus,
}

impl RsvpForm {
    pub fn validate(&self) -> Result<(), FormError> {
        if self.name.trim().is_empty() {
            return Err(FormError::MissingField("name"));
        }
        if self.cohort.trim().is_empty() {
            return Err(FormError::MissingField("angkatan"));
        }
        if self.address.trim().is_empty() {
            return Err(FormError::MissingField("address"));
        }
        Ok(())
    }

    /// Build the entry this device submits, stamped now.
    pub fn into_entry(self, device_id: &str) -> RsvpEntry {
        RsvpEntry {
            id: device_id.to_string(),
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            cohort: self.cohort.trim().to_string(),
            status: self.status,
            timestamp: Utc::now(),
            avatar: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, address: &str, cohort: &str) -> RsvpForm {
        RsvpForm {
            name: name.to_string(),
            address: address.to_string(),
            cohort: cohort.to_string(),
            status: AttendanceStatus::Attending,
        }
    }

    #[test]
    fn test_presence_checks() {
        assert_eq!(
            form("  ", "Bogor", "2010").validate(),
            Err(FormError::MissingField("name"))
        );
        assert_eq!(
            form("Ani", "Bogor", "").validate(),
            Err(FormError::MissingField("angkatan"))
        );
        assert_eq!(
            form("Ani", "", "2010").validate(),
            Err(FormError::MissingField("address"))
        );
        assert!(form("Ani", "Bogor", "2010").validate().is_ok());
    }

    #[test]
    fn test_into_entry_trims_and_uses_device_id() {
        let entry = form(" Ani ", " Bogor", "2010 ").into_entry("device-1");
        assert_eq!(entry.id, "device-1");
        assert_eq!(entry.name, "Ani");
        assert_eq!(entry.address, "Bogor");
        assert_eq!(entry.cohort, "2010");
    }
}
