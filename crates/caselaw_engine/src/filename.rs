use sha2::{Digest, Sha256};
use url::Url;

const UNTITLED: &str = "untitled";

/// Reduce a case name to `[A-Za-z0-9_-]`: other characters are dropped and
/// spaces become underscores.
///
/// `"Smith v Jones [2019] NSWSC 12"` becomes `"Smith_v_Jones_2019_NSWSC_12"`.
pub fn sanitize_title(raw: &str) -> String {
    let kept: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '-')
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    if kept.is_empty() {
        UNTITLED.to_string()
    } else {
        kept
    }
}

/// Deterministic record name for a case URL, without extension.
///
/// Uses the last two path segments with the extension dropped, so
/// `.../NSWSC/2019/12.html` becomes `2019_12`. URLs with fewer segments fall
/// back to a short hash of the whole URL.
pub fn case_filename(url: &str) -> String {
    let segments: Vec<String> = Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed.path_segments().map(|segments| {
                segments
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_string)
                    .collect()
            })
        })
        .unwrap_or_default();

    match segments.as_slice() {
        [.., parent, last] => {
            let stem = last.split('.').next().unwrap_or(last);
            let name = format!("{}_{}", safe_segment(parent), safe_segment(stem));
            if name.len() > 1 {
                name
            } else {
                format!("case-{}", short_hash(url))
            }
        }
        _ => format!("case-{}", short_hash(url)),
    }
}

fn safe_segment(segment: &str) -> String {
    segment
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect()
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
