use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use suggest_core::builder::build_from_store;
use suggest_core::{DictionaryCategory, DictionaryStore, MemoryStore, TrieDictionary};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Precompile dictionary rows into `{category}_trie.dat` blobs.
#[derive(Parser)]
#[command(name = "trie_precompiler")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build blobs from a `word<TAB>pinyin<TAB>frequency<TAB>category` file.
    Build {
        #[arg(long)]
        input: PathBuf,

        #[arg(long, default_value = "dicts")]
        out_dir: PathBuf,

        /// Only build this category (default: every category with rows).
        #[arg(long)]
        category: Option<DictionaryCategory>,

        /// Override the per-node word capacity.
        #[arg(long)]
        capacity: Option<usize>,
    },
    /// Print the words stored under a prefix of an existing blob.
    Inspect {
        #[arg(long)]
        blob: PathBuf,

        #[arg(long, default_value = "")]
        prefix: String,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Args::parse().command {
        Command::Build {
            input,
            out_dir,
            category,
            capacity,
        } => build(input, out_dir, category, capacity),
        Command::Inspect { blob, prefix, limit } => inspect(blob, &prefix, limit),
    }
}

fn build(
    input: PathBuf,
    out_dir: PathBuf,
    category: Option<DictionaryCategory>,
    capacity: Option<usize>,
) -> Result<()> {
    let store = MemoryStore::load_tsv(&input)?;
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let categories: Vec<DictionaryCategory> = match category {
        Some(c) => vec![c],
        None => DictionaryCategory::ALL
            .iter()
            .copied()
            .filter(|c| store.entry_count(*c) > 0)
            .collect(),
    };
    if categories.is_empty() {
        bail!("{} contains no usable rows", input.display());
    }

    for category in categories {
        let dict = build_from_store(&store, category, capacity.unwrap_or(category.default_capacity()))?;
        if dict.is_empty() {
            bail!("no rows for category `{category}` in {}", input.display());
        }
        let path = out_dir.join(category.blob_file_name());
        dict.save_to(&path)?;
        let stats = dict.memory_stats();
        info!(
            category = %category,
            path = %path.display(),
            nodes = stats.node_count,
            words = stats.word_count,
            "wrote blob"
        );
        println!("{} -> {}", category, path.display());
    }
    Ok(())
}

fn inspect(blob: PathBuf, prefix: &str, limit: usize) -> Result<()> {
    let dict = TrieDictionary::load_from(&blob)?;
    let stats = dict.memory_stats();
    println!(
        "{}: capacity={} nodes={} words={}",
        blob.display(),
        dict.capacity(),
        stats.node_count,
        stats.word_count
    );
    let hits = dict.search_by_prefix(prefix, limit);
    if hits.is_empty() {
        println!("no words under `{prefix}`");
    }
    for (i, item) in hits.iter().enumerate() {
        println!("  {}. {} (freq={})", i + 1, item.word, item.frequency);
    }
    Ok(())
}
