//! Google Scholar citations-page client.
//!
//! Implements [`AuthorSource`] by fetching the public profile pages
//! (`/citations?user=...`) and the author search page and parsing them
//! with `scraper`.

use crate::config::{Config, DEFAULT_SCHOLAR_URL};
use crate::error::{ProfileError, Result};
use crate::source::{AuthorRecord, AuthorSource, RawPublication};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// User agent string for requests
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Publications per profile page (Scholar maximum)
pub const PAGE_SIZE: usize = 100;

/// Pause between profile pages
const PAGE_DELAY: Duration = Duration::from_secs(1);

/// HTTP client for Google Scholar profile pages
pub struct ScholarClient {
    client: reqwest::Client,
    base_url: String,
    page_delay: Duration,
}

impl ScholarClient {
    /// Create a client against `base_url` (default: scholar.google.com),
    /// optionally through `proxy`.
    pub fn new(base_url: Option<&str>, proxy: Option<&str>) -> Result<Self> {
        let base_url = base_url
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_SCHOLAR_URL.to_string());

        Ok(Self {
            client: build_http_client(proxy)?,
            base_url,
            page_delay: PAGE_DELAY,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(Some(&config.base_url), config.proxy.as_deref())
    }

    /// Override the pause between profile pages
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    fn profile_url(&self, author_id: &str, cstart: usize) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/citations", self.base_url))
            .map_err(|e| ProfileError::Config(format!("Invalid base URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("user", author_id)
            .append_pair("hl", "en")
            .append_pair("cstart", &cstart.to_string())
            .append_pair("pagesize", &PAGE_SIZE.to_string());
        Ok(url)
    }

    fn search_url(&self, name: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/citations", self.base_url))
            .map_err(|e| ProfileError::Config(format!("Invalid base URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("view_op", "search_authors")
            .append_pair("mauthors", name)
            .append_pair("hl", "en");
        Ok(url)
    }

    /// Fetch a page. `Ok(None)` on 404.
    async fn fetch_page(&self, url: &Url) -> Result<Option<String>> {
        debug!(url = %url, "Fetching page");
        let response = self
            .client
            .get(url.as_str())
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProfileError::RateLimited(60));
        }
        if !status.is_success() {
            return Err(ProfileError::Api {
                code: status.as_u16() as i32,
                message: format!("HTTP error: {}", status),
            });
        }

        let html = response.text().await?;
        if is_captcha(&html) {
            warn!(url = %url, "CAPTCHA detected");
            return Err(ProfileError::Captcha);
        }
        Ok(Some(html))
    }

    /// Page through the publication table until a short page or `limit`.
    /// Returns the rows and whether the list is complete.
    async fn fetch_publications(
        &self,
        author_id: &str,
        first_page: &str,
        limit: Option<usize>,
    ) -> Result<(Vec<RawPublication>, bool)> {
        let mut publications = parse_publication_rows(first_page, &self.base_url)?;
        let mut complete = publications.len() < PAGE_SIZE;
        let mut cstart = PAGE_SIZE;

        while !complete && limit.map_or(true, |l| publications.len() < l) {
            if !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
            let url = self.profile_url(author_id, cstart)?;
            let Some(html) = self.fetch_page(&url).await? else {
                break;
            };
            let page = parse_publication_rows(&html, &self.base_url)?;
            debug!(cstart, count = page.len(), "Parsed publication page");
            complete = page.len() < PAGE_SIZE;
            publications.extend(page);
            cstart += PAGE_SIZE;
        }

        if let Some(limit) = limit {
            if publications.len() > limit {
                publications.truncate(limit);
                complete = false;
            }
        }

        Ok((publications, complete))
    }
}

#[async_trait]
impl AuthorSource for ScholarClient {
    async fn lookup_by_id(
        &self,
        author_id: &str,
        filled: bool,
        limit: Option<usize>,
    ) -> Result<Option<AuthorRecord>> {
        let url = self.profile_url(author_id, 0)?;
        let Some(html) = self.fetch_page(&url).await? else {
            return Ok(None);
        };
        let Some(mut record) = parse_profile(&html, author_id)? else {
            return Ok(None);
        };

        if filled {
            let (publications, complete) =
                self.fetch_publications(author_id, &html, limit).await?;
            info!(
                count = publications.len(),
                complete,
                "Fetched publication list"
            );
            record.publications = Some(publications);
            record.filled = complete;
        }

        Ok(Some(record))
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<AuthorRecord>> {
        let url = self.search_url(name)?;
        let Some(html) = self.fetch_page(&url).await? else {
            return Ok(Vec::new());
        };
        let candidates = parse_search_results(&html, &self.base_url)?;
        info!(query = name, count = candidates.len(), "Parsed author search");
        Ok(candidates)
    }

    async fn fill(&self, record: &AuthorRecord) -> Result<AuthorRecord> {
        if record.scholar_id.is_empty() {
            return Err(ProfileError::Validation(format!(
                "cannot fill {:?}: no scholar id",
                record.name
            )));
        }
        self.lookup_by_id(&record.scholar_id, true, None)
            .await?
            .ok_or_else(|| ProfileError::NotFound(record.scholar_id.clone()))
    }
}

/// Build HTTP client with optional proxy
fn build_http_client(proxy: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .cookie_store(true);

    if let Some(proxy_url) = proxy {
        let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
            ProfileError::Config(format!("Invalid proxy URL '{}': {}", proxy_url, e))
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ProfileError::Config(format!("Failed to build HTTP client: {}", e)))
}

fn is_captcha(html: &str) -> bool {
    html.contains("Solving the above CAPTCHA")
        || html.contains("unusual traffic")
        || html.contains("id=\"gs_captcha_ccl\"")
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ProfileError::Parse(e.to_string()))
}

fn regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ProfileError::Parse(e.to_string()))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// "1,234" -> 1234; empty or junk -> 0
fn parse_count(text: &str) -> u64 {
    text.trim().replace(',', "").parse().unwrap_or(0)
}

/// "Verified email at pjlab.org.cn - Homepage" -> "@pjlab.org.cn"
fn email_domain(text: &str) -> Result<String> {
    let re = regex(r"Verified email at\s+([A-Za-z0-9.\-]+)")?;
    Ok(re
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| format!("@{}", m.as_str().trim_end_matches('.')))
        .unwrap_or_default())
}

/// Resolve a page-relative link against the base URL
fn absolute_url(base_url: &str, href: &str) -> String {
    match Url::parse(base_url).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

fn query_param(link: &str, name: &str) -> Option<String> {
    Url::parse(link)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Parse the header, statistics and histogram of a profile page.
///
/// Returns `Ok(None)` when the page has no profile name (not a profile).
pub fn parse_profile(html: &str, author_id: &str) -> Result<Option<AuthorRecord>> {
    let document = Html::parse_document(html);

    let name_selector = selector("#gsc_prf_in")?;
    let info_selector = selector("div.gsc_prf_il")?;
    let email_selector = selector("#gsc_prf_ivh")?;
    let homepage_selector = selector("#gsc_prf_ivh a")?;
    let interest_selector = selector("#gsc_prf_int a")?;
    let stats_selector = selector("#gsc_rsb_st td.gsc_rsb_std")?;
    let year_selector = selector("span.gsc_g_t")?;
    let bar_selector = selector("a.gsc_g_a")?;
    let bar_count_selector = selector("span.gsc_g_al")?;

    let Some(name) = document
        .select(&name_selector)
        .next()
        .map(element_text)
        .filter(|n| !n.is_empty())
    else {
        return Ok(None);
    };

    let mut record = AuthorRecord {
        scholar_id: author_id.to_string(),
        name,
        ..Default::default()
    };

    // First info line without an id is the affiliation
    record.affiliation = document
        .select(&info_selector)
        .find(|e| e.value().id().is_none())
        .map(element_text)
        .unwrap_or_default();

    if let Some(email) = document.select(&email_selector).next() {
        record.email_domain = email_domain(&element_text(email))?;
    }
    record.homepage = document
        .select(&homepage_selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .unwrap_or("")
        .to_string();
    record.interests = document
        .select(&interest_selector)
        .map(element_text)
        .filter(|i| !i.is_empty())
        .collect();

    // All-time / since-year pairs: citations, h-index, i10-index
    let stats: Vec<u64> = document
        .select(&stats_selector)
        .map(|e| parse_count(&element_text(e)))
        .collect();
    record.citedby = stats.first().copied().unwrap_or(0);
    record.hindex = stats.get(2).copied().unwrap_or(0);
    record.i10index = stats.get(4).copied().unwrap_or(0);

    // Bars carry their position from the right in `z-index`; years
    // without citations have no bar.
    let years: Vec<String> = document.select(&year_selector).map(element_text).collect();
    let mut counts = vec![0u64; years.len()];
    let z_index = regex(r"z-index:\s*(\d+)")?;
    for bar in document.select(&bar_selector) {
        let position = bar
            .value()
            .attr("style")
            .and_then(|s| z_index.captures(s))
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<usize>().ok());
        let count = bar
            .select(&bar_count_selector)
            .next()
            .map(|e| parse_count(&element_text(e)))
            .unwrap_or(0);
        if let Some(position) = position.filter(|p| (1..=years.len()).contains(p)) {
            counts[years.len() - position] = count;
        }
    }
    record.cites_per_year = years.into_iter().zip(counts).collect();

    Ok(Some(record))
}

/// Parse the publication table rows of a profile page
pub fn parse_publication_rows(html: &str, base_url: &str) -> Result<Vec<RawPublication>> {
    let document = Html::parse_document(html);

    let row_selector = selector("tr.gsc_a_tr")?;
    let title_selector = selector("a.gsc_a_at")?;
    let gray_selector = selector("div.gs_gray")?;
    let cite_selector = selector("a.gsc_a_ac")?;
    let year_selector = selector("span.gsc_a_h")?;
    let trailing_year = regex(r",\s*(19|20)\d{2}$")?;

    let mut publications = Vec::new();

    for row in document.select(&row_selector) {
        let mut bib = Map::new();
        let mut publication = RawPublication::default();

        if let Some(link) = row.select(&title_selector).next() {
            bib.insert("title".to_string(), Value::String(element_text(link)));
            let href = link
                .value()
                .attr("href")
                .or_else(|| link.value().attr("data-href"));
            if let Some(href) = href {
                let url = absolute_url(base_url, href);
                publication.author_pub_id = query_param(&url, "citation_for_view");
                publication.pub_url = Some(url);
            }
        }

        let mut gray = row.select(&gray_selector).map(element_text);
        if let Some(authors) = gray.next() {
            bib.insert("author".to_string(), Value::String(authors));
        }
        if let Some(citation) = gray.next() {
            let venue = trailing_year.replace(&citation, "").trim().to_string();
            bib.insert("venue".to_string(), Value::String(venue));
            bib.insert("citation".to_string(), Value::String(citation));
        }

        if let Some(year) = row
            .select(&year_selector)
            .next()
            .map(element_text)
            .filter(|y| !y.is_empty())
        {
            bib.insert("pub_year".to_string(), Value::String(year));
        }

        let citations = row
            .select(&cite_selector)
            .next()
            .map(|e| parse_count(&element_text(e)))
            .unwrap_or(0);
        publication.num_citations = Some(Value::from(citations));
        publication.bib = Some(bib);
        publications.push(publication);
    }

    Ok(publications)
}

/// Parse candidate cards from the author search page
pub fn parse_search_results(html: &str, base_url: &str) -> Result<Vec<AuthorRecord>> {
    let document = Html::parse_document(html);

    let card_selector = selector("div.gsc_1usr")?;
    let name_selector = selector("h3.gs_ai_name a")?;
    let affiliation_selector = selector("div.gs_ai_aff")?;
    let email_selector = selector("div.gs_ai_eml")?;
    let cited_selector = selector("div.gs_ai_cby")?;
    let interest_selector = selector("a.gs_ai_one_int")?;
    let digits = regex(r"[\d,]+")?;

    let mut candidates = Vec::new();

    for card in document.select(&card_selector) {
        let Some(link) = card.select(&name_selector).next() else {
            continue;
        };
        let mut record = AuthorRecord {
            name: element_text(link),
            ..Default::default()
        };
        if let Some(href) = link.value().attr("href") {
            record.scholar_id =
                query_param(&absolute_url(base_url, href), "user").unwrap_or_default();
        }
        record.affiliation = card
            .select(&affiliation_selector)
            .next()
            .map(element_text)
            .unwrap_or_default();
        if let Some(email) = card.select(&email_selector).next() {
            record.email_domain = email_domain(&element_text(email))?;
        }
        record.citedby = card
            .select(&cited_selector)
            .next()
            .map(element_text)
            .and_then(|t| digits.find(&t).map(|m| parse_count(m.as_str())))
            .unwrap_or(0);
        record.interests = card.select(&interest_selector).map(element_text).collect();
        candidates.push(record);
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://scholar.google.com";

    const PROFILE_HTML: &str = r##"
<html><body>
<div id="gsc_prf_in">Yuhang Zang</div>
<div class="gsc_prf_il">Shanghai AI Laboratory</div>
<div class="gsc_prf_il" id="gsc_prf_ivh">Verified email at pjlab.org.cn - <a href="https://yuhangzang.github.io/" rel="nofollow" class="gsc_prf_ila">Homepage</a></div>
<div class="gsc_prf_il" id="gsc_prf_int"><a class="gsc_prf_inta" href="#">Vision Language Model</a><a class="gsc_prf_inta" href="#">Computer Vision</a></div>
<table id="gsc_rsb_st"><tbody>
<tr><td>Citations</td><td class="gsc_rsb_std">1,523</td><td class="gsc_rsb_std">1,400</td></tr>
<tr><td>h-index</td><td class="gsc_rsb_std">17</td><td class="gsc_rsb_std">16</td></tr>
<tr><td>i10-index</td><td class="gsc_rsb_std">21</td><td class="gsc_rsb_std">20</td></tr>
</tbody></table>
<div class="gsc_md_hist_b">
<span class="gsc_g_t">2022</span><span class="gsc_g_t">2023</span><span class="gsc_g_t">2024</span>
<a href="#" class="gsc_g_a" style="left:8px;z-index:3"><span class="gsc_g_al">120</span></a>
<a href="#" class="gsc_g_a" style="left:40px;z-index:1"><span class="gsc_g_al">900</span></a>
</div>
<table id="gsc_a_t"><tbody id="gsc_a_b">
<tr class="gsc_a_tr">
<td class="gsc_a_t"><a href="/citations?view_op=view_citation&amp;hl=en&amp;user=hW23VKIAAAAJ&amp;citation_for_view=hW23VKIAAAAJ:u-x6o8ySG0sC" class="gsc_a_at">Open-Vocabulary DETR</a>
<div class="gs_gray">Y Zang, W Li, K Zhou</div><div class="gs_gray">European Conference on Computer Vision, 2022</div></td>
<td class="gsc_a_c"><a href="#" class="gsc_a_ac gs_ibl">212</a></td>
<td class="gsc_a_y"><span class="gsc_a_h gsc_a_hc gs_ibl">2022</span></td>
</tr>
<tr class="gsc_a_tr">
<td class="gsc_a_t"><a href="/citations?view_op=view_citation&amp;citation_for_view=hW23VKIAAAAJ:abc" class="gsc_a_at">Unpublished Note</a>
<div class="gs_gray">Y Zang</div></td>
<td class="gsc_a_c"><a href="#" class="gsc_a_ac gs_ibl"></a></td>
<td class="gsc_a_y"><span class="gsc_a_h gsc_a_hc gs_ibl"></span></td>
</tr>
</tbody></table>
</body></html>
"##;

    const SEARCH_HTML: &str = r##"
<html><body>
<div class="gsc_1usr">
  <h3 class="gs_ai_name"><a href="/citations?hl=en&amp;user=hW23VKIAAAAJ">Yuhang Zang</a></h3>
  <div class="gs_ai_aff">Shanghai AI Laboratory</div>
  <div class="gs_ai_eml">Verified email at pjlab.org.cn</div>
  <div class="gs_ai_cby">Cited by 1523</div>
  <div class="gs_ai_int"><a class="gs_ai_one_int" href="#">Computer Vision</a></div>
</div>
<div class="gsc_1usr">
  <h3 class="gs_ai_name"><a href="/citations?hl=en&amp;user=OTHERID">Yuhang Zhang</a></h3>
  <div class="gs_ai_aff">Some University</div>
</div>
</body></html>
"##;

    #[test]
    fn test_parse_profile_header() -> Result<()> {
        let record = parse_profile(PROFILE_HTML, "hW23VKIAAAAJ")?.expect("profile");
        assert_eq!(record.scholar_id, "hW23VKIAAAAJ");
        assert_eq!(record.name, "Yuhang Zang");
        assert_eq!(record.affiliation, "Shanghai AI Laboratory");
        assert_eq!(record.email_domain, "@pjlab.org.cn");
        assert_eq!(record.homepage, "https://yuhangzang.github.io/");
        assert_eq!(
            record.interests,
            vec!["Vision Language Model", "Computer Vision"]
        );
        assert_eq!(record.citedby, 1523);
        assert_eq!(record.hindex, 17);
        assert_eq!(record.i10index, 21);
        assert!(record.publications.is_none());
        assert!(!record.filled);
        Ok(())
    }

    #[test]
    fn test_parse_histogram_gaps() -> Result<()> {
        let record = parse_profile(PROFILE_HTML, "x")?.expect("profile");
        assert_eq!(record.cites_per_year.get("2022"), Some(&120));
        assert_eq!(record.cites_per_year.get("2023"), Some(&0));
        assert_eq!(record.cites_per_year.get("2024"), Some(&900));
        Ok(())
    }

    #[test]
    fn test_parse_publication_rows() -> Result<()> {
        let rows = parse_publication_rows(PROFILE_HTML, BASE)?;
        assert_eq!(rows.len(), 2);

        let first = &rows[0];
        let bib = first.bib.as_ref().expect("bib");
        assert_eq!(bib["title"], "Open-Vocabulary DETR");
        assert_eq!(bib["author"], "Y Zang, W Li, K Zhou");
        assert_eq!(bib["venue"], "European Conference on Computer Vision");
        assert_eq!(bib["pub_year"], "2022");
        assert_eq!(first.num_citations, Some(Value::from(212u64)));
        assert_eq!(
            first.author_pub_id.as_deref(),
            Some("hW23VKIAAAAJ:u-x6o8ySG0sC")
        );
        assert!(first
            .pub_url
            .as_deref()
            .is_some_and(|u| u.starts_with("https://scholar.google.com/citations?")));

        let second = &rows[1];
        let bib = second.bib.as_ref().expect("bib");
        assert!(bib.get("venue").is_none());
        assert!(bib.get("pub_year").is_none());
        assert_eq!(second.num_citations, Some(Value::from(0u64)));
        Ok(())
    }

    #[test]
    fn test_parse_search_results() -> Result<()> {
        let candidates = parse_search_results(SEARCH_HTML, BASE)?;
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].scholar_id, "hW23VKIAAAAJ");
        assert_eq!(candidates[0].affiliation, "Shanghai AI Laboratory");
        assert_eq!(candidates[0].email_domain, "@pjlab.org.cn");
        assert_eq!(candidates[0].citedby, 1523);
        assert_eq!(candidates[0].interests, vec!["Computer Vision"]);
        assert_eq!(candidates[1].scholar_id, "OTHERID");
        assert_eq!(candidates[1].citedby, 0);
        Ok(())
    }

    #[test]
    fn test_not_a_profile() -> Result<()> {
        assert!(parse_profile("<html><body></body></html>", "x")?.is_none());
        Ok(())
    }

    #[test]
    fn test_build_profile_url() -> Result<()> {
        let client = ScholarClient::new(Some("https://mirror.example.com/"), None)?;
        let url = client.profile_url("hW23VKIAAAAJ", 100)?;
        assert_eq!(
            url.as_str(),
            "https://mirror.example.com/citations?user=hW23VKIAAAAJ&hl=en&cstart=100&pagesize=100"
        );
        Ok(())
    }

    #[test]
    fn test_captcha_detection() {
        assert!(is_captcha("<p>Our systems have detected unusual traffic</p>"));
        assert!(!is_captcha(PROFILE_HTML));
    }
}
