use crate::types::ClinicRecord;

/// Bounds a discovered URL list, mostly for trial runs that should not
/// hammer the archive with the full directory.
#[derive(Debug, Default)]
pub struct LinkFilter {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl LinkFilter {
    pub fn apply(self, mut links: Vec<String>) -> Vec<String> {
        if let Some(off) = self.offset {
            links = links.into_iter().skip(off).collect();
        }
        if let Some(lim) = self.limit {
            links.truncate(lim);
        }
        links
    }

    pub fn validate(self) -> Result<Self, String> {
        if self.offset.is_some_and(|o| o == 0) {
            return Err("Offset must be greater than 0".to_string());
        }
        if self.limit.is_some_and(|l| l == 0) {
            return Err("Limit must be greater than 0".to_string());
        }
        Ok(self)
    }
}

/// Field-coverage summary printed after a text-mode batch run.
#[derive(Debug)]
pub struct ScrapeStats {
    pub with_address: usize,
    pub with_email: usize,
    pub with_phone: usize,
    pub with_services: usize,
    pub total: usize,
}

impl ScrapeStats {
    pub fn from_records(records: &[ClinicRecord]) -> ScrapeStats {
        ScrapeStats {
            with_address: records.iter().filter(|r| !r.address.is_empty()).count(),
            with_email: records.iter().filter(|r| !r.email.is_empty()).count(),
            with_phone: records.iter().filter(|r| !r.phone.is_empty()).count(),
            with_services: records.iter().filter(|r| !r.services.is_empty()).count(),
            total: records.len(),
        }
    }
}

impl std::fmt::Display for ScrapeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        writeln!(f, "  With address:  {}", self.with_address)?;
        writeln!(f, "  With email:    {}", self.with_email)?;
        writeln!(f, "  With phone:    {}", self.with_phone)?;
        writeln!(f, "  With services: {}", self.with_services)?;
        writeln!(f, "  Total records: {}", self.total)
    }
}
