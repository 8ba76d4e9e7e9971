//! Service modules for the identification and organization pipeline

pub mod action_log;
pub mod comicvine_client;
pub mod confidence;
pub mod enrichment;
pub mod filename_parser;
pub mod knowledge_matcher;
pub mod organizer;
pub mod path_formatter;
pub mod queue_processor;
pub mod scanner;

pub use action_log::{ActionLog, MAX_ACTIONS};
pub use comicvine_client::ComicVineClient;
pub use confidence::{score, Assessment, ScoreInput, SeriesOrigin};
pub use enrichment::{enrich, Enrichment};
pub use filename_parser::{parse, ParsedName, COMIC_EXTENSIONS};
pub use knowledge_matcher::{
    match_series, MatchOutcome, MatcherConfig, DEFAULT_SIMILARITY_THRESHOLD,
};
pub use organizer::{OrganizeError, OrganizeOutcome, Organizer};
pub use path_formatter::{
    format_path, has_unresolved_placeholders, sanitize_component, DEFAULT_FILE_TEMPLATE,
    DEFAULT_FOLDER_TEMPLATE,
};
pub use queue_processor::{Disposition, FileResult, QueueProcessor, RunMode, RunSummary};
pub use scanner::{ScanError, Scanner};
