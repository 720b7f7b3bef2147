pub mod batch;
pub mod container;
pub mod document;
pub mod encoding;
pub mod error;
pub mod evidence;
pub mod filter;
pub mod handlers;
pub mod language;
pub mod lemma;
pub mod pipeline;
pub mod progress;
pub mod reference;
pub mod store;
pub mod subtitle;
pub mod tokenize;

pub use batch::{BatchEvent, BatchReport, FileState, FileStatus};
pub use container::{ContainerOpener, MatroskaOpener, SubtitleFormat, SubtitleTrack};
pub use error::{ExtractError, FailureReason, PersistError};
pub use evidence::EvidenceAggregator;
pub use filter::{FilterConfig, FilterMode, apply_filters};
pub use handlers::{AppState, router};
pub use language::{LanguageDetector, WhatlangDetector};
pub use pipeline::{Extractor, References, Source, frequency_vocabulary};
pub use progress::{LogProgress, Progress, Silent};
pub use reference::{ReferenceOutcome, ReferenceSet, ReferenceWarning, SummaryCount, summarize};
pub use store::{load_vocabulary, save_vocabulary};
pub use tokenize::tokenize;
