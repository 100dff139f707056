//! Caselaw engine: HTTP, extraction, persistence and the parallel fetch rounds.
mod decode;
mod discover;
mod download;
mod engine;
mod extract;
mod fetch;
mod filename;
mod persist;
mod pool;
mod store;
mod types;

pub use decode::{decode_html, DecodeError, DecodedHtml};
pub use discover::{list_courts, parse_case_links, parse_years, CourtDir, DiscoverError, Discoverer, SiteLayout};
pub use download::{CaseDownloader, Clock, FetchUnit};
pub use engine::Engine;
pub use extract::{CaseTitleExtractor, ExtractError, TitleExtractor};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use filename::{case_filename, sanitize_title};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use pool::WorkerPool;
pub use store::{load_record, save_record, saved_urls, CaseRecord, StoreError, RECORD_EXTENSION};
pub use types::{FetchError, FetchMetadata, FetchOutput};
