use crate::parser::{ParseError, discover_clinic_links, parse_clinic_page, parse_listing_blocks};
use crate::types::ClinicRecord;
use crate::utils::LinkFilter;

use reqwest::Client;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
    start_url: String,
}

impl WebScraper {
    pub fn new() -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            start_url: crate::START_URL.to_string(),
        })
    }

    /// Fetch the listing page and discover clinic detail URLs. A failure
    /// here is fatal to a batch run; there is nothing to iterate without it.
    pub async fn fetch_clinic_links(&self) -> Result<Vec<String>, ScraperError> {
        log::info!("Fetching clinic listing from {}...", self.start_url);
        let html = self.get_html(&self.start_url).await?;
        Ok(discover_clinic_links(&html, &self.start_url)?)
    }

    /// Fetch and extract a single clinic detail page.
    pub async fn fetch_clinic(&self, url: &str) -> Result<ClinicRecord, ScraperError> {
        let html = self.get_html(url).await?;
        if html.trim().is_empty() {
            return Err(ScraperError::ParseError(ParseError::EmptyResponse(
                url.to_string(),
            )));
        }
        Ok(parse_clinic_page(&html, url))
    }

    /// Scrape the whole directory sequentially, sleeping `delay` between
    /// page fetches.
    pub async fn scrape_clinics(&self, delay: Duration) -> Result<Vec<ClinicRecord>, ScraperError> {
        self.scrape_clinic_subset(LinkFilter::default(), delay).await
    }

    /// Like [`scrape_clinics`](Self::scrape_clinics), with the discovered
    /// link list bounded by `filter` first. A page that fails to fetch or
    /// parse becomes a placeholder record carrying its URL; the batch always
    /// runs to the end. When the snapshot exposes no clinic links at all,
    /// fall back to whatever the listing's heading blocks describe.
    pub async fn scrape_clinic_subset(
        &self,
        filter: LinkFilter,
        delay: Duration,
    ) -> Result<Vec<ClinicRecord>, ScraperError> {
        log::info!("Fetching clinic listing from {}...", self.start_url);
        let html = self.get_html(&self.start_url).await?;
        let links = discover_clinic_links(&html, &self.start_url)?;

        if links.is_empty() {
            log::warn!("No clinic links found; falling back to listing heading blocks");
            let records = parse_listing_blocks(&html);
            log::info!("Recovered {} clinic blocks from the listing page", records.len());
            return Ok(records);
        }

        let links = filter.apply(links);
        log::info!("Scraping {} clinic pages...", links.len());

        let mut records = Vec::with_capacity(links.len());
        for (i, url) in links.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(delay).await;
            }
            log::info!("[{}/{}] Processing {}", i + 1, links.len(), url);

            match self.fetch_clinic(url).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    log::warn!("Failed to scrape {}: {}", url, e);
                    records.push(ClinicRecord::placeholder(url));
                }
            }
        }

        log::info!("Completed scraping, {} records total", records.len());
        Ok(records)
    }

    async fn get_html(&self, url: &str) -> Result<String, ScraperError> {
        Ok(self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}
