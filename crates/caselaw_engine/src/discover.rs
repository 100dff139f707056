//! Finding the case URLs that still need downloading.
//!
//! The local corpus is laid out as `root/<jurisdiction>/<court>/`, one record
//! file per case. Each court directory names a court index page on the site,
//! which links to one table of contents per year, which links to the cases.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use caselaw_logging::harvest_debug;
use scraper::{Html, Selector};
use url::Url;

use crate::decode::decode_html;
use crate::fetch::Fetcher;
use crate::FetchError;

const YEAR_LINKS_SELECTOR: &str = "div.year-options-list a[href]";

#[derive(Debug, thiserror::Error)]
pub enum DiscoverError {
    #[error("listing page {url} failed")]
    Fetch { url: String, source: FetchError },
    #[error("listing page {url} could not be decoded")]
    Decode { url: String },
    #[error("listing page {url} has no `{selector}`")]
    MissingStructure { url: String, selector: &'static str },
    #[error("invalid base url {0}")]
    BaseUrl(String),
    #[error("cannot list {path}")]
    Io { path: PathBuf, source: io::Error },
}

/// URL scheme of the case-law site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLayout {
    base_url: Url,
}

impl SiteLayout {
    pub fn new(base_url: &str) -> Result<Self, DiscoverError> {
        let base_url =
            Url::parse(base_url).map_err(|_| DiscoverError::BaseUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(DiscoverError::BaseUrl(base_url.to_string()));
        }
        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Court index listing the years that have cases.
    pub fn court_index_url(&self, jurisdiction: &str, court: &str) -> String {
        format!(
            "{}/cgi-bin/viewdb/au/cases/{jurisdiction}/{court}/",
            self.origin()
        )
    }

    /// Table of contents for one court and year.
    pub fn year_index_url(&self, jurisdiction: &str, court: &str, year: &str) -> String {
        format!(
            "{}/cgi-bin/viewtoc/au/cases/{jurisdiction}/{court}/{year}/",
            self.origin()
        )
    }

    fn origin(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }
}

/// One `root/<jurisdiction>/<court>` directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CourtDir {
    pub jurisdiction: String,
    pub court: String,
    pub path: PathBuf,
}

/// Court directories under `root`, sorted by jurisdiction then court.
pub fn list_courts(root: &Path) -> Result<Vec<CourtDir>, DiscoverError> {
    let mut courts = Vec::new();
    for (jurisdiction, jurisdiction_path) in subdirectories(root)? {
        for (court, path) in subdirectories(&jurisdiction_path)? {
            courts.push(CourtDir {
                jurisdiction: jurisdiction.clone(),
                court,
                path,
            });
        }
    }
    courts.sort();
    Ok(courts)
}

fn subdirectories(dir: &Path) -> Result<Vec<(String, PathBuf)>, DiscoverError> {
    let io_err = |source: io::Error| DiscoverError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if !entry.file_type().map_err(io_err)?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                found.push((name.to_string(), entry.path()));
            }
        }
    }
    Ok(found)
}

/// Years offered by a court index page, ascending and without repeats.
///
/// Every four-digit run in the year list's links counts, matching how the
/// site encodes years in both link text and hrefs.
pub fn parse_years(html: &str) -> Option<Vec<String>> {
    let doc = Html::parse_document(html);
    let list_sel = Selector::parse("div.year-options-list").ok()?;
    doc.select(&list_sel).next()?;
    let link_sel = Selector::parse(YEAR_LINKS_SELECTOR).ok()?;

    let mut years = BTreeSet::new();
    for link in doc.select(&link_sel) {
        years.extend(four_digit_runs(&link.html()));
    }
    Some(years.into_iter().collect())
}

fn four_digit_runs(text: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    for c in text.chars().chain(std::iter::once(' ')) {
        if c.is_ascii_digit() {
            current.push(c);
            continue;
        }
        // A longer run holds non-overlapping four-digit groups, as a regex scan would.
        let mut rest = current.as_str();
        while rest.len() >= 4 {
            runs.push(rest[..4].to_string());
            rest = &rest[4..];
        }
        current.clear();
    }
    runs
}

/// Case links on a year table of contents: hrefs containing `{year}/<digits>.html`,
/// made absolute against `base`, in page order without repeats.
pub fn parse_case_links(html: &str, year: &str, base: &Url) -> Vec<String> {
    let doc = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    doc.select(&selector)
        .filter_map(|link| link.value().attr("href"))
        .filter(|href| is_case_href(href, year))
        .filter_map(|href| base.join(href).ok())
        .map(|url| url.to_string())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

fn is_case_href(href: &str, year: &str) -> bool {
    let needle = format!("{year}/");
    href.match_indices(&needle).any(|(idx, _)| {
        let tail = &href[idx + needle.len()..];
        let digits = tail.chars().take_while(char::is_ascii_digit).count();
        digits > 0 && tail[digits..].starts_with(".html")
    })
}

/// Walks the site's listing pages for one court.
pub struct Discoverer<'a> {
    fetcher: &'a dyn Fetcher,
    layout: &'a SiteLayout,
}

impl<'a> Discoverer<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, layout: &'a SiteLayout) -> Self {
        Self { fetcher, layout }
    }

    pub fn years(&self, jurisdiction: &str, court: &str) -> Result<Vec<String>, DiscoverError> {
        let url = self.layout.court_index_url(jurisdiction, court);
        let html = self.fetch_page(&url)?;
        parse_years(&html).ok_or(DiscoverError::MissingStructure {
            url,
            selector: YEAR_LINKS_SELECTOR,
        })
    }

    pub fn case_urls(
        &self,
        jurisdiction: &str,
        court: &str,
        year: &str,
    ) -> Result<Vec<String>, DiscoverError> {
        let url = self.layout.year_index_url(jurisdiction, court, year);
        let html = self.fetch_page(&url)?;
        let links = parse_case_links(&html, year, self.layout.base_url());
        harvest_debug!("{} case links on {}", links.len(), url);
        Ok(links)
    }

    fn fetch_page(&self, url: &str) -> Result<String, DiscoverError> {
        let output = self
            .fetcher
            .get(url)
            .map_err(|source| DiscoverError::Fetch {
                url: url.to_string(),
                source,
            })?;
        decode_html(&output.bytes, output.metadata.content_type.as_deref())
            .map(|decoded| decoded.html)
            .map_err(|_| DiscoverError::Decode {
                url: url.to_string(),
            })
    }
}
