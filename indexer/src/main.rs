use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine::analysis::doc_terms;
use engine::{Document, IndexConfig, IndexWriter, Score, DEFAULT_BLOCK_SIZE};
use serde::Deserialize;
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One stored document as written by the crawler. Extra fields are ignored.
#[derive(Debug, Deserialize)]
struct InputDoc {
    url: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    score: Score,
    #[serde(default)]
    title: String,
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a segmented forward/inverted index from stored documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a document file or a directory of them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory; any index already there is replaced
        #[arg(long)]
        output: String,
        /// Documents per inverted-index segment
        #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: u32,
        /// Checkpoint the stores every N documents
        #[arg(long, default_value_t = 500)]
        sync_every: u32,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, block_size, sync_every } => {
            let config = IndexConfig::default().with_block_size(block_size);
            build_index(Path::new(&input), Path::new(&output), config, sync_every)
        }
    }
}

fn is_document_file(path: &Path) -> bool {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => matches!(ext, "json" | "jsonl"),
        None => true,
    }
}

/// Document files under `input`, sorted so doc ids are reproducible.
fn collect_files(input: &Path) -> Vec<PathBuf> {
    if input.is_file() {
        return vec![input.to_path_buf()];
    }
    WalkDir::new(input)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_document_file(p))
        .collect()
}

struct Ingest {
    writer: IndexWriter,
    sync_every: u32,
}

impl Ingest {
    fn add(&mut self, doc: InputDoc) -> Result<()> {
        let terms = doc_terms(&doc.text);
        self.writer.add_document(&doc.url, Document::new(terms, doc.score, doc.title))?;
        let count = self.writer.doc_count();
        if self.sync_every > 0 && count % self.sync_every == 0 {
            self.writer.sync()?;
            tracing::info!(doc_count = count, blocks = self.writer.block_count(), "checkpoint");
        }
        Ok(())
    }

    fn ingest_jsonl(&mut self, file: &Path) -> Result<()> {
        let reader = BufReader::new(File::open(file)?);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            let doc: InputDoc = serde_json::from_str(&line)?;
            self.add(doc)?;
        }
        Ok(())
    }

    fn ingest_json(&mut self, file: &Path) -> Result<()> {
        let reader = BufReader::new(File::open(file)?);
        let json: serde_json::Value = serde_json::from_reader(reader)?;
        match json {
            serde_json::Value::Array(arr) => {
                for v in arr {
                    self.add(serde_json::from_value(v)?)?;
                }
            }
            serde_json::Value::Object(_) => self.add(serde_json::from_value(json)?)?,
            _ => tracing::warn!(file = %file.display(), "skipping file without a JSON object"),
        }
        Ok(())
    }
}

fn build_index(input: &Path, output: &Path, config: IndexConfig, sync_every: u32) -> Result<()> {
    let files = collect_files(input);
    tracing::info!(files = files.len(), input = %input.display(), "collected input files");

    let writer = IndexWriter::start_indexing(output, config)?;
    let mut ingest = Ingest { writer, sync_every };
    for file in files {
        let result = if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            ingest.ingest_jsonl(&file)
        } else {
            ingest.ingest_json(&file)
        };
        result.with_context(|| format!("indexing {}", file.display()))?;
    }

    let meta = ingest.writer.finalize()?;
    tracing::info!(
        output = %output.display(),
        num_docs = meta.doc_count,
        blocks = meta.block_count,
        average_doclen = meta.average_doclen,
        "index build complete"
    );
    Ok(())
}
