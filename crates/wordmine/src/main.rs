use std::env;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;
use wordmine_dict::{EcdictDictionary, LoadMode};
use wordmine_morph::Morphy;
use wordmine_types::{Corpus, SortOrder, Vocabulary, VocabularyType, WordEntry, sort_entries};

use wordmine::{
    AppState, BatchEvent, Extractor, FileStatus, FilterConfig, FilterMode, LogProgress,
    ReferenceSet, References, Source, frequency_vocabulary, router, save_vocabulary, summarize,
};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_DICT: &str = "ecdict.csv";

#[derive(Parser)]
#[command(name = "wordmine")]
#[command(about = "Extract study vocabularies from documents and subtitles")]
struct Cli {
    /// ECDICT-format CSV dictionary.
    #[arg(long, env = "WORDMINE_DICT", default_value = DEFAULT_DICT, global = true)]
    dict: PathBuf,
    /// `mmap` or `owned`.
    #[arg(long, env = "WORDMINE_DICT_MODE", default_value = "mmap", value_parser = parse_load_mode, global = true)]
    dict_mode: LoadMode,
    /// Directory with `*.exc` exception lists for rule-based lemmas.
    #[arg(long, env = "WORDMINE_EXC_DIR", global = true)]
    exc: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract from a PDF or plain-text document.
    Document {
        path: PathBuf,
        #[command(flatten)]
        refine: RefineArgs,
    },
    /// Extract from an SRT file.
    Subtitle {
        path: PathBuf,
        #[command(flatten)]
        refine: RefineArgs,
    },
    /// Extract from one subtitle track of a Matroska file.
    Container {
        path: PathBuf,
        #[arg(long, default_value_t = 0)]
        track: usize,
        #[command(flatten)]
        refine: RefineArgs,
    },
    /// Extract from the English track of many Matroska files.
    Batch {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long, default_value = "batch")]
        name: String,
        #[command(flatten)]
        refine: RefineArgs,
    },
    /// Every dictionary word within a corpus rank range.
    Frequency {
        #[arg(long, default_value = "coca")]
        corpus: Corpus,
        #[arg(long)]
        from: u32,
        #[arg(long)]
        to: u32,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Serve the HTTP API. HOST (default 127.0.0.1) and PORT come from the environment.
    Serve,
}

#[derive(Args)]
struct RefineArgs {
    /// Filter out numeric literals such as `42` or `3.5`.
    #[arg(long)]
    numbers: bool,
    /// Filter out words ranked below N in BNC.
    #[arg(long, value_name = "N")]
    bnc_below: Option<u32>,
    /// Filter out words ranked below N in COCA.
    #[arg(long, value_name = "N")]
    coca_below: Option<u32>,
    /// Filter out words without a BNC rank.
    #[arg(long)]
    bnc_zero: bool,
    /// Filter out words without a COCA rank.
    #[arg(long)]
    coca_zero: bool,
    /// Fold inflected forms into their lemma.
    #[arg(long)]
    lemmas: bool,
    /// Also guess lemmas with suffix rules when the dictionary has none.
    #[arg(long)]
    rule_lemmas: bool,
    /// Keep only words matching a filter instead of dropping them.
    #[arg(long)]
    keep_matching: bool,
    /// Drop words found in these saved vocabularies.
    #[arg(long, value_name = "FILE")]
    exclude: Vec<PathBuf>,
    /// Keep only words found in one of these saved vocabularies.
    #[arg(long, value_name = "FILE")]
    include: Vec<PathBuf>,
    /// Count result words per reference list, as NAME=FILE.
    #[arg(long, value_name = "NAME=FILE", value_parser = parse_summary)]
    summary: Vec<(String, PathBuf)>,
    #[arg(long, default_value = "appearance")]
    sort: SortOrder,
    /// Write the vocabulary here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

impl RefineArgs {
    fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            mode: if self.keep_matching {
                FilterMode::Include
            } else {
                FilterMode::Exclude
            },
            numbers: self.numbers,
            bnc_below: self.bnc_below,
            coca_below: self.coca_below,
            bnc_zero: self.bnc_zero,
            coca_zero: self.coca_zero,
            lemmas: self.lemmas || self.rule_lemmas,
            rule_lemmas: self.rule_lemmas,
        }
    }

    fn references(&self) -> References {
        References {
            exclude: self.exclude.clone(),
            include: self.include.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let start = Instant::now();
    let dict = EcdictDictionary::load_with_mode(&cli.dict, cli.dict_mode)
        .with_context(|| format!("loading dictionary {}", cli.dict.display()))?;
    info!(
        "dictionary {} loaded ({} words, mode: {:?}) in {} ms",
        cli.dict.display(),
        dict.len(),
        cli.dict_mode,
        start.elapsed().as_millis()
    );
    let morphy = match &cli.exc {
        Some(dir) => Morphy::load(dir)?,
        None => Morphy::builtin(),
    };
    let extractor = Extractor::new(Arc::new(dict)).with_morphy(morphy);

    match cli.command {
        Command::Document { path, refine } => {
            run_single(&extractor, Source::Document { path }, &refine)
        }
        Command::Subtitle { path, refine } => {
            run_single(&extractor, Source::Subtitle { path }, &refine)
        }
        Command::Container {
            path,
            track,
            refine,
        } => run_single(&extractor, Source::Container { path, track }, &refine),
        Command::Batch {
            paths,
            name,
            refine,
        } => run_batch(&extractor, &paths, name, &refine),
        Command::Frequency {
            corpus,
            from,
            to,
            output,
        } => {
            let vocab = frequency_vocabulary(extractor.dictionary(), corpus, from, to)?;
            info!("{} words in {} ranks {from}..={to}", vocab.size, corpus);
            emit(&vocab, output.as_ref())
        }
        Command::Serve => serve(extractor).await,
    }
}

fn run_single(extractor: &Extractor, source: Source, refine: &RefineArgs) -> anyhow::Result<()> {
    let raw = extractor.extract(&source, &mut LogProgress)?;
    let vocab = finish(extractor, raw, refine, |entries| source.vocabulary(entries));
    report_summary(&vocab, refine);
    emit(&vocab, refine.output.as_ref())
}

fn run_batch(
    extractor: &Extractor,
    paths: &[PathBuf],
    name: String,
    refine: &RefineArgs,
) -> anyhow::Result<()> {
    let report = extractor.extract_batch(paths, &mut |event| match event {
        BatchEvent::Started(path) => info!("processing {}", path.display()),
        BatchEvent::Finished(path, FileStatus::Error { message, .. }) => {
            warn!("{} failed: {message}", path.display())
        }
        BatchEvent::Finished(..) => {}
    });
    if report.succeeded() == 0 {
        bail!("none of the {} files could be read", paths.len());
    }
    let vocab = finish(extractor, report.entries, refine, |entries| {
        Vocabulary::new(name, VocabularyType::Document, entries)
    });
    report_summary(&vocab, refine);
    emit(&vocab, refine.output.as_ref())
}

fn finish(
    extractor: &Extractor,
    raw: Vec<WordEntry>,
    refine: &RefineArgs,
    wrap: impl FnOnce(Vec<WordEntry>) -> Vocabulary,
) -> Vocabulary {
    let outcome = extractor.refine(raw, &refine.filter_config(), &refine.references());
    let mut entries = outcome.entries;
    sort_entries(&mut entries, refine.sort);
    wrap(entries)
}

fn report_summary(vocab: &Vocabulary, refine: &RefineArgs) {
    if refine.summary.is_empty() {
        return;
    }
    let sets: Vec<ReferenceSet> = refine
        .summary
        .iter()
        .filter_map(|(name, path)| match ReferenceSet::load(path) {
            Ok(set) => Some(set.with_name(name.clone())),
            Err(warning) => {
                warn!("{warning}");
                None
            }
        })
        .collect();
    for count in summarize(&vocab.entries, &sets) {
        info!("{}: {} of {} words", count.name, count.count, vocab.size);
    }
}

fn emit(vocab: &Vocabulary, output: Option<&PathBuf>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            save_vocabulary(vocab, path)?;
            info!("wrote {} words to {}", vocab.size, path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, vocab)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

async fn serve(extractor: Extractor) -> anyhow::Result<()> {
    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    info!("binding to {host}:{port}");

    let state = AppState::new(Arc::new(extractor));
    let app = router(state).layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

fn parse_load_mode(raw: &str) -> Result<LoadMode, String> {
    match raw.to_ascii_lowercase().as_str() {
        "mmap" => Ok(LoadMode::Mmap),
        "owned" => Ok(LoadMode::Owned),
        other => Err(format!("unknown load mode: {other}")),
    }
}

fn parse_summary(raw: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=FILE, got {raw}"))?;
    if name.is_empty() {
        return Err("summary name must not be empty".to_string());
    }
    Ok((name.to_string(), PathBuf::from(path)))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .init();
}
