//! `rag` command-line binary.
//!
//! Drives the default knowledge-base pipeline (`CustomRagAdapter` over a
//! persistent SQLite store) from the shell.
//!
//! # Usage
//!
//! ```bash
//! rag add ./docs report.pdf https://example.com/page
//! rag add --data-type text "some inline text"
//! rag query "how is the report structured?"
//! rag info
//! rag reset
//! rag --config rag.yaml query "..."
//! ```
//!
//! # Environment Variables
//!
//! - `OPENAI_API_KEY` / `EMBEDDINGS_OPENAI_API_KEY`: embedding credentials
//! - `OPENAI_API_BASE`: OpenAI-compatible endpoint
//! - `CREWAI_RAG_EMBEDDING_MODEL`, `CREWAI_RAG_COLLECTION`
//! - `CREWAI_RAG_PERSIST_DIR`: store location (default: crewAI storage dir)
//! - `RUST_LOG`: log filter (default: "info")

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};

use crewai_tools::adapters::{AddOptions, Adapter, ContentItem, CustomRagAdapter};
use crewai_tools::rag::config::{RagConfig, RagToolConfig};
use crewai_tools::rag::factory::default_persist_directory;
use crewai_tools::rag::DataType;

const USAGE: &str = "usage: rag [--config FILE] <add [--data-type TYPE] SOURCE...|query QUESTION|info|reset>";

#[derive(Debug)]
enum Command {
    Add {
        sources: Vec<String>,
        data_type: Option<DataType>,
    },
    Query(String),
    Info,
    Reset,
}

#[derive(Debug)]
struct Cli {
    config: Option<PathBuf>,
    command: Command,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Cli> {
    let mut config = None;
    let mut data_type = None;
    let mut positional = Vec::new();

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or_else(|| anyhow!("--config needs a file"))?;
                config = Some(PathBuf::from(path));
            }
            "--data-type" => {
                let value = args.next().ok_or_else(|| anyhow!("--data-type needs a value"))?;
                data_type = Some(value.parse::<DataType>()?);
            }
            "-h" | "--help" => bail!(USAGE),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let command = match positional.next().as_deref() {
        Some("add") => {
            let sources: Vec<String> = positional.collect();
            if sources.is_empty() {
                bail!("add needs at least one source\n{}", USAGE);
            }
            Command::Add { sources, data_type }
        }
        Some("query") => {
            let question = positional.collect::<Vec<_>>().join(" ");
            if question.trim().is_empty() {
                bail!("query needs a question\n{}", USAGE);
            }
            Command::Query(question)
        }
        Some("info") => Command::Info,
        Some("reset") => Command::Reset,
        Some(other) => bail!("unknown command {:?}\n{}", other, USAGE),
        None => bail!(USAGE),
    };
    Ok(Cli { config, command })
}

/// A reference the adapter resolves and loads, rather than inline text.
fn source_item(source: String) -> ContentItem {
    ContentItem::Record {
        source: Some(source),
        content: None,
        metadata: Default::default(),
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<RagToolConfig> {
    let mut config = match path {
        Some(path) => RagToolConfig::from_yaml_file(path)
            .with_context(|| format!("reading config {}", path.display()))?
            .with_env_overrides(|key| std::env::var(key).ok()),
        None => RagToolConfig::from_env(),
    };
    if config.vector_store.persist_directory.is_none() {
        let defaults = config.vector_store.clone();
        config.vector_store = RagConfig::sqlite(default_persist_directory())
            .with_limit(defaults.limit)
            .with_score_threshold(defaults.score_threshold)
            .with_batch_size(defaults.batch_size);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = parse_args(std::env::args().skip(1))?;
    let config = load_config(cli.config.as_ref())?;
    let adapter = CustomRagAdapter::from_config(&config).context("building the RAG pipeline")?;

    match cli.command {
        Command::Add { sources, data_type } => {
            let items: Vec<ContentItem> = sources.into_iter().map(source_item).collect();
            let mut options = AddOptions::default();
            options.data_type = data_type;
            adapter.add(&items, &options).await?;
            let info = adapter.get_collection_info()?;
            println!("{} now holds {} chunks", info.name, info.count);
        }
        Command::Query(question) => {
            println!("{}", adapter.query(&question).await?);
        }
        Command::Info => {
            let info = adapter.get_collection_info()?;
            println!("collection:      {}", info.name);
            println!("chunks:          {}", info.count);
            println!("embedding model: {}", info.embedding_model);
            if let Some(dir) = &adapter.persist_directory {
                println!("store:           {}", dir.display());
            }
        }
        Command::Reset => {
            adapter.delete_collection()?;
            println!("deleted collection {}", config.collection_name);
        }
    }
    Ok(())
}
