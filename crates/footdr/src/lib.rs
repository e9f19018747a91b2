pub mod export;
mod parser;
pub mod scraper;
pub mod types;
pub mod utils;

pub use scraper::WebScraper;

/// Web Archive snapshot of the clinic listing. Everything we fetch hangs
/// off this URL, including relative hrefs rewritten by the archive.
pub(crate) const START_URL: &str =
    "https://web.archive.org/web/20250708180027/https://www.myfootdr.com.au/our-clinics/";
