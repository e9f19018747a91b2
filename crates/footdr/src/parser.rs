use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::types::ClinicRecord;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to parse URL: {0}")]
    UrlParseError(String),
    #[error("Empty response: {0}")]
    EmptyResponse(String),
}

const CLINIC_PATH_MARKER: &str = "/our-clinics/";

/// Headings that introduce a services section, tried in order.
const SERVICE_HEADINGS: [&str; 5] = [
    "our services",
    "services",
    "clinical podiatry",
    "we provide",
    "we offer",
];

static RE_PHONE_LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Ph|Phone|Call)[:\s]*([0-9+\-\s()]{6,})")
        .expect("invalid regex: labelled phone")
});
static RE_PHONE_BARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(?\d{2,4}\)?[\s\-]?\d{3,4}[\s\-]?\d{3,4}").expect("invalid regex: bare phone")
});
static RE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.\-]+@[\w.\-]+\.\w+").expect("invalid regex: email"));
static RE_STATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:QLD|NSW|VIC|SA|WA|NT|TAS)\b").expect("invalid regex: state token")
});
static RE_POSTCODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4}\b").expect("invalid regex: postcode"));

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible text of the whole document, space-separated. Mirrors what a
/// text-mode dump of the page would look like for regex scanning.
fn document_text(document: &Html) -> String {
    document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Visible text split into one line per text node, empties dropped.
fn document_lines(document: &Html) -> Vec<String> {
    document
        .root_element()
        .text()
        .map(|t| normalize_whitespace(t))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Collect clinic detail-page URLs from the listing page.
///
/// Hrefs are resolved against `base_url` (relative and protocol-relative
/// forms included), fragments stripped and trailing slashes trimmed. Only
/// URLs with a non-empty path under the clinic sub-path survive, so the
/// listing page itself is never returned as a candidate. The result is
/// deduplicated and sorted; zero matches is an empty vec, not an error.
pub fn discover_clinic_links(html: &str, base_url: &str) -> Result<Vec<String>, ParseError> {
    let base = Url::parse(base_url)
        .map_err(|e| ParseError::UrlParseError(format!("{}: {}", base_url, e)))?;

    let document = Html::parse_document(html);
    let anchor_selector = Selector::parse("a[href]").unwrap();

    let mut links = BTreeSet::new();
    for element in document.select(&anchor_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let mut resolved = match base.join(href.trim()) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("Skipping unresolvable href '{}': {}", href, e);
                continue;
            }
        };
        resolved.set_fragment(None);

        let full = resolved.as_str().trim_end_matches('/').to_string();
        let Some(idx) = full.find(CLINIC_PATH_MARKER) else {
            continue;
        };
        if full[idx + CLINIC_PATH_MARKER.len()..].is_empty() {
            continue;
        }

        links.insert(full);
    }

    log::debug!("Discovered {} unique clinic links", links.len());
    Ok(links.into_iter().collect())
}

/// Fallback for snapshots where the clinic links only exist behind script:
/// treat each plausible heading as a clinic name and capture up to six
/// following text blocks as its details.
pub fn parse_listing_blocks(html: &str) -> Vec<ClinicRecord> {
    let document = Html::parse_document(html);
    let heading_selector = Selector::parse("h1, h2, h3, h4, h5, h6").unwrap();

    let mut records = Vec::new();
    for heading in document.select(&heading_selector) {
        let title = normalize_whitespace(&elem_text(heading));
        if title.is_empty() || title.len() >= 120 || !title.chars().any(|c| c.is_alphabetic()) {
            continue;
        }

        let mut context = Vec::new();
        for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
            if context.len() >= 6 {
                break;
            }
            let text = normalize_whitespace(&elem_text(sibling));
            if !text.is_empty() {
                context.push(text);
            }
        }
        if context.is_empty() {
            continue;
        }

        records.push(ClinicRecord {
            name: title,
            address: context.join(" | "),
            ..Default::default()
        });
    }

    records
}

/// Extract a clinic record from a detail page. Each field runs its own
/// strategy chain and independently falls back to empty; a page that
/// matches nothing still yields a (blank) record.
pub fn parse_clinic_page(html: &str, url: &str) -> ClinicRecord {
    let document = Html::parse_document(html);

    ClinicRecord {
        name: extract_name(&document),
        address: extract_address(&document),
        email: extract_email(&document),
        phone: extract_phone(&document),
        services: extract_services(&document),
        source_url: url.to_string(),
    }
}

fn extract_name(document: &Html) -> String {
    let h1_selector = Selector::parse("h1").unwrap();
    if let Some(h1) = document.select(&h1_selector).next() {
        let name = normalize_whitespace(&elem_text(h1));
        if !name.is_empty() {
            return name;
        }
    }

    // Page title, minus the "| My FootDr" style suffix.
    let title_selector = Selector::parse("title").unwrap();
    document
        .select(&title_selector)
        .next()
        .map(|t| elem_text(t))
        .and_then(|t| t.split('|').next().map(|s| s.trim().to_string()))
        .unwrap_or_default()
}

fn extract_phone(document: &Html) -> String {
    let tel_selector = Selector::parse("a[href^='tel:']").unwrap();
    if let Some(link) = document.select(&tel_selector).next() {
        let phone = elem_text(link).trim().to_string();
        if !phone.is_empty() {
            return phone;
        }
    }

    let text = document_text(document);
    if let Some(caps) = RE_PHONE_LABELLED.captures(&text) {
        return caps[1].trim().to_string();
    }
    RE_PHONE_BARE
        .find(&text)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn extract_email(document: &Html) -> String {
    let mailto_selector = Selector::parse("a[href^='mailto:']").unwrap();
    if let Some(link) = document.select(&mailto_selector).next()
        && let Some(href) = link.value().attr("href")
    {
        let email = href
            .trim_start_matches("mailto:")
            .split('?')
            .next()
            .unwrap_or("")
            .trim();
        if !email.is_empty() {
            return email.to_string();
        }
    }

    RE_EMAIL
        .find(&document_text(document))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn extract_address(document: &Html) -> String {
    for selector in ["address", ".clinic-info__address"] {
        let selector = Selector::parse(selector).unwrap();
        if let Some(element) = document.select(&selector).next() {
            let address = normalize_whitespace(&elem_text(element));
            if !address.is_empty() {
                return address;
            }
        }
    }

    // No semantic container: hunt for a text line carrying a state token
    // and a 4-digit postcode, pulling up to two preceding lines along as
    // street/suburb context.
    let lines = document_lines(document);
    for (i, line) in lines.iter().enumerate() {
        if RE_STATE.is_match(line) && RE_POSTCODE.is_match(line) {
            return lines[i.saturating_sub(2)..=i].join(", ");
        }
    }

    String::new()
}

fn extract_services(document: &Html) -> String {
    let heading_selector = Selector::parse("h2, h3, h4").unwrap();
    for heading in document.select(&heading_selector) {
        let text = elem_text(heading).to_lowercase();
        if !SERVICE_HEADINGS.iter().any(|h| text.contains(h)) {
            continue;
        }
        if let Some(services) = collect_services_after(heading) {
            return services;
        }
    }

    let list_selector = Selector::parse(".services-list li").unwrap();
    let items: Vec<String> = document
        .select(&list_selector)
        .map(|li| normalize_whitespace(&elem_text(li)))
        .filter(|t| !t.is_empty())
        .collect();
    if !items.is_empty() {
        return items.join(" | ");
    }

    // Last resort: the first bulleted list anywhere on the page.
    let ul_selector = Selector::parse("ul").unwrap();
    document
        .select(&ul_selector)
        .next()
        .map(list_items_joined)
        .unwrap_or_default()
}

/// Walk the siblings after a services heading: a `<ul>` wins outright,
/// otherwise plain blocks accumulate until the next heading.
fn collect_services_after(heading: ElementRef) -> Option<String> {
    let mut blocks = Vec::new();
    for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
        let tag = sibling.value().name();
        if tag == "ul" {
            let joined = list_items_joined(sibling);
            return (!joined.is_empty()).then_some(joined);
        }
        if tag.starts_with('h') {
            break;
        }
        let text = normalize_whitespace(&elem_text(sibling));
        if !text.is_empty() {
            blocks.push(text);
        }
    }
    (!blocks.is_empty()).then(|| blocks.join(" | "))
}

fn list_items_joined(list: ElementRef) -> String {
    let li_selector = Selector::parse("li").unwrap();
    list.select(&li_selector)
        .map(|li| normalize_whitespace(&elem_text(li)))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const BASE: &str =
        "https://web.archive.org/web/20250708180027/https://www.myfootdr.com.au/our-clinics/";

    #[test]
    fn test_discover_links_from_fixture() {
        let html = fs::read_to_string("fixtures/listing_page.html")
            .expect("Failed to read listing fixture");

        let links = discover_clinic_links(&html, BASE).expect("Failed to discover links");

        assert!(!links.is_empty(), "Should discover at least one link");
        for link in &links {
            assert!(link.contains("/our-clinics/"), "Unexpected link: {}", link);
            assert!(!link.contains('#'), "Fragment survived: {}", link);
            assert!(!link.ends_with('/'), "Trailing slash survived: {}", link);
        }

        let mut sorted = links.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(links, sorted, "Links should be sorted and unique");
    }

    #[test]
    fn test_discover_links_normalizes_and_dedupes() {
        let html = r#"
            <a href="/web/20250708180027/https://www.myfootdr.com.au/our-clinics/camp-hill/">Camp Hill</a>
            <a href="https://web.archive.org/web/20250708180027/https://www.myfootdr.com.au/our-clinics/camp-hill">Camp Hill again</a>
            <a href="//web.archive.org/web/20250708180027/https://www.myfootdr.com.au/our-clinics/redcliffe/">Redcliffe</a>
            <a href="/web/20250708180027/https://www.myfootdr.com.au/our-clinics/redcliffe/#book">Redcliffe anchor</a>
        "#;

        let links = discover_clinic_links(html, BASE).expect("Failed to discover");

        assert_eq!(links.len(), 2);
        assert!(links[0].ends_with("/our-clinics/camp-hill"));
        assert!(links[1].ends_with("/our-clinics/redcliffe"));
    }

    #[test]
    fn test_discover_links_skips_listing_itself() {
        let html = r#"
            <a href="/web/20250708180027/https://www.myfootdr.com.au/our-clinics/">All clinics</a>
            <a href="/web/20250708180027/https://www.myfootdr.com.au/about-us/">About</a>
        "#;

        let links = discover_clinic_links(html, BASE).expect("Failed to discover");
        assert!(links.is_empty(), "Listing and unrelated pages should be dropped");
    }

    #[test]
    fn test_discover_links_empty_page_is_ok() {
        let links = discover_clinic_links("<html><body></body></html>", BASE)
            .expect("Empty page should not error");
        assert!(links.is_empty());
    }

    #[test]
    fn test_discover_links_bad_base_is_error() {
        let err = discover_clinic_links("<a href='/x'>x</a>", "not a url").unwrap_err();
        assert!(matches!(err, ParseError::UrlParseError(_)));
    }

    #[test]
    fn test_name_prefers_h1_over_title() {
        let html = r#"
            <html><head><title>Camp Hill | My FootDr</title></head>
            <body><h1>My FootDr Camp Hill</h1></body></html>
        "#;
        let record = parse_clinic_page(html, "http://example.com");
        assert_eq!(record.name, "My FootDr Camp Hill");
    }

    #[test]
    fn test_name_falls_back_to_title_before_separator() {
        let html = r#"
            <html><head><title>Camp Hill Podiatry | My FootDr</title></head>
            <body><p>no heading here</p></body></html>
        "#;
        let record = parse_clinic_page(html, "http://example.com");
        assert_eq!(record.name, "Camp Hill Podiatry");
    }

    #[test]
    fn test_name_empty_when_no_heading_and_no_title() {
        let record = parse_clinic_page("<html><body><p>text</p></body></html>", "u");
        assert_eq!(record.name, "");
    }

    #[test]
    fn test_phone_from_tel_link_verbatim() {
        let html = r#"<body><a href="tel:0755625055">07 5562 5055</a></body>"#;
        let record = parse_clinic_page(html, "u");
        assert_eq!(record.phone, "07 5562 5055");
    }

    #[test]
    fn test_phone_from_labelled_text() {
        let html = "<body><p>Call 07 5562 5055 to book today</p></body>";
        let record = parse_clinic_page(html, "u");
        assert_eq!(record.phone, "07 5562 5055");
    }

    #[test]
    fn test_phone_from_bare_digit_groups() {
        let html = "<body><p>Reach us on (07) 3847 5123 anytime.</p></body>";
        let record = parse_clinic_page(html, "u");
        assert_eq!(record.phone, "(07) 3847 5123");
    }

    #[test]
    fn test_phone_empty_when_absent() {
        let record = parse_clinic_page("<body><p>No contact info.</p></body>", "u");
        assert_eq!(record.phone, "");
    }

    #[test]
    fn test_email_from_mailto_strips_scheme_and_query() {
        let html = r#"<body><a href="mailto:camphill@myfootdr.com.au?subject=Booking">Email us</a></body>"#;
        let record = parse_clinic_page(html, "u");
        assert_eq!(record.email, "camphill@myfootdr.com.au");
    }

    #[test]
    fn test_email_from_visible_text() {
        let html = "<body><p>Contact reception at camphill@myfootdr.com.au for details</p></body>";
        let record = parse_clinic_page(html, "u");
        assert_eq!(record.email, "camphill@myfootdr.com.au");
    }

    #[test]
    fn test_email_empty_when_absent() {
        let record = parse_clinic_page("<body><p>nothing at all</p></body>", "u");
        assert_eq!(record.email, "");
    }

    #[test]
    fn test_address_from_address_tag() {
        let html = "<body><address>25 Samuel St\nCamp Hill QLD 4152</address></body>";
        let record = parse_clinic_page(html, "u");
        assert_eq!(record.address, "25 Samuel St Camp Hill QLD 4152");
    }

    #[test]
    fn test_address_from_clinic_info_container() {
        let html = r#"<body><div class="clinic-info__address">Shop 4, 12 High St, Toowong QLD 4066</div></body>"#;
        let record = parse_clinic_page(html, "u");
        assert_eq!(record.address, "Shop 4, 12 High St, Toowong QLD 4066");
    }

    #[test]
    fn test_address_from_line_scan_merges_context() {
        let html = r#"
            <body>
                <p>Visit us at:</p>
                <p>Westfield Shopping Centre</p>
                <p>Shop 123, 400 Logan Rd</p>
                <p>Mt Gravatt QLD 4122</p>
            </body>
        "#;
        let record = parse_clinic_page(html, "u");
        assert_eq!(
            record.address,
            "Westfield Shopping Centre, Shop 123, 400 Logan Rd, Mt Gravatt QLD 4122"
        );
    }

    #[test]
    fn test_address_requires_postcode_with_state() {
        // State token alone is not enough to call a line an address.
        let html = "<body><p>Serving all of QLD with great care</p></body>";
        let record = parse_clinic_page(html, "u");
        assert_eq!(record.address, "");
    }

    #[test]
    fn test_services_from_heading_with_list() {
        let html = r#"
            <body>
                <h2>Our Services</h2>
                <ul><li>Ingrown toenail surgery</li><li>Orthotics</li></ul>
                <h2>Opening Hours</h2>
                <ul><li>Mon 9-5</li></ul>
            </body>
        "#;
        let record = parse_clinic_page(html, "u");
        assert_eq!(record.services, "Ingrown toenail surgery | Orthotics");
    }

    #[test]
    fn test_services_from_heading_with_paragraphs() {
        let html = r#"
            <body>
                <h3>We offer</h3>
                <p>General podiatry</p>
                <p>Diabetic foot care</p>
                <h3>Location</h3>
                <p>Not a service</p>
            </body>
        "#;
        let record = parse_clinic_page(html, "u");
        assert_eq!(record.services, "General podiatry | Diabetic foot care");
    }

    #[test]
    fn test_services_from_services_list_container() {
        let html = r#"
            <body>
                <h2>Welcome</h2>
                <div><ul class="services-list"><li>Shockwave therapy</li><li>Nail surgery</li></ul></div>
            </body>
        "#;
        let record = parse_clinic_page(html, "u");
        assert_eq!(record.services, "Shockwave therapy | Nail surgery");
    }

    #[test]
    fn test_services_first_list_fallback() {
        let html = "<body><p>intro</p><ul><li>Podiatry</li><li>Footwear</li></ul></body>";
        let record = parse_clinic_page(html, "u");
        assert_eq!(record.services, "Podiatry | Footwear");
    }

    #[test]
    fn test_services_empty_when_absent() {
        let record = parse_clinic_page("<body><p>plain page</p></body>", "u");
        assert_eq!(record.services, "");
    }

    #[test]
    fn test_parse_clinic_page_from_fixture() {
        let html = fs::read_to_string("fixtures/clinic_camp_hill.html")
            .expect("Failed to read clinic fixture");

        let record = parse_clinic_page(&html, "http://example.com/our-clinics/camp-hill");

        assert_eq!(record.name, "My FootDr Camp Hill");
        assert_eq!(record.phone, "07 3395 1706");
        assert_eq!(record.email, "camphill@myfootdr.com.au");
        assert!(record.address.contains("QLD"));
        assert!(record.services.contains("Orthotics"));
        assert_eq!(record.source_url, "http://example.com/our-clinics/camp-hill");
    }

    #[test]
    fn test_parse_clinic_page_never_rejects_sparse_pages() {
        let record = parse_clinic_page("<html><body></body></html>", "http://x/our-clinics/y");
        assert_eq!(record.name, "");
        assert_eq!(record.address, "");
        assert_eq!(record.email, "");
        assert_eq!(record.phone, "");
        assert_eq!(record.services, "");
    }

    #[test]
    fn test_listing_blocks_fallback() {
        let html = r#"
            <body>
                <div>
                    <h4>My FootDr Camp Hill</h4>
                    <p>25 Samuel St, Camp Hill QLD 4152</p>
                    <p>07 3395 1706</p>
                </div>
                <div>
                    <h4>My FootDr Redcliffe</h4>
                    <p>Bluewater Square, Redcliffe QLD 4020</p>
                </div>
            </body>
        "#;

        let blocks = parse_listing_blocks(html);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].name, "My FootDr Camp Hill");
        assert_eq!(
            blocks[0].address,
            "25 Samuel St, Camp Hill QLD 4152 | 07 3395 1706"
        );
        assert_eq!(blocks[1].name, "My FootDr Redcliffe");
        assert!(blocks[0].phone.is_empty(), "Fallback records carry no phone");
    }

    #[test]
    fn test_listing_blocks_skip_headings_without_context() {
        let html = "<body><h2>Lonely heading</h2></body>";
        assert!(parse_listing_blocks(html).is_empty());
    }
}
