use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// One row of the final export. Every field defaults to empty; a record is
/// never discarded just because extraction came up short on some fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicRecord {
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
    pub services: String,
    /// Page the record was scraped from. Kept for logging and debugging,
    /// not part of the exported column set.
    pub source_url: String,
}

impl ClinicRecord {
    /// Best-effort stand-in for a page that could not be fetched or parsed:
    /// the URL goes in the name column so the row is still traceable.
    pub fn placeholder(url: &str) -> Self {
        ClinicRecord {
            name: url.to_string(),
            source_url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn has_contact_details(&self) -> bool {
        !self.phone.is_empty() || !self.email.is_empty()
    }
}

impl Display for ClinicRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = if self.name.is_empty() {
            "[unnamed clinic]"
        } else {
            self.name.as_str()
        };
        writeln!(f, "{}", name)?;
        if !self.address.is_empty() {
            writeln!(f, "   Address:  {}", self.address)?;
        }
        if !self.phone.is_empty() {
            writeln!(f, "   Phone:    {}", self.phone)?;
        }
        if !self.email.is_empty() {
            writeln!(f, "   Email:    {}", self.email)?;
        }
        if !self.services.is_empty() {
            writeln!(f, "   Services: {}", self.services)?;
        }
        Ok(())
    }
}
