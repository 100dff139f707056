use scraper::{Html, Selector};

use crate::filename::sanitize_title;

/// Container holding a case judgment's heading on the site.
const CASE_HEADING_SELECTOR: &str = "div#page-main h1";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("no element matches `{0}`")]
    MissingElement(&'static str),
    #[error("case heading has no text")]
    EmptyHeading,
}

/// Pulls a case title out of a decoded judgment page.
pub trait TitleExtractor: Send + Sync {
    fn extract_title(&self, html: &str) -> Result<String, ExtractError>;
}

/// Title extractor for judgment pages:
/// - first text of the first `h1` inside `div#page-main`
/// - citation tail after the first `;` dropped
/// - reduced to a filesystem-friendly form (see [`sanitize_title`])
#[derive(Debug, Default, Clone, Copy)]
pub struct CaseTitleExtractor;

impl TitleExtractor for CaseTitleExtractor {
    fn extract_title(&self, html: &str) -> Result<String, ExtractError> {
        let doc = Html::parse_document(html);
        let selector = Selector::parse(CASE_HEADING_SELECTOR)
            .map_err(|_| ExtractError::MissingElement(CASE_HEADING_SELECTOR))?;
        let heading = doc
            .select(&selector)
            .next()
            .ok_or(ExtractError::MissingElement(CASE_HEADING_SELECTOR))?;

        let first_text = heading
            .text()
            .map(str::trim)
            .find(|text| !text.is_empty())
            .ok_or(ExtractError::EmptyHeading)?;
        let name = first_text.split(';').next().unwrap_or(first_text);
        Ok(sanitize_title(name))
    }
}
