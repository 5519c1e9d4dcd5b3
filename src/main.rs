//! Interactive entry point: composition root plus a menu loop.
//!
//! Every component is constructed here, once, from the resolved
//! configuration. Errors during a menu action are displayed and logged but
//! never end the session; only startup failures are fatal.

use std::sync::Arc;
use std::sync::Once;

use rig::client::EmbeddingsClient;
use rig::providers::openai;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::error;
use tracing_subscriber::EnvFilter;

use ragmill::config::ConfigBuilder;
use ragmill::embedding::RigEmbeddingProvider;
use ragmill::generation::{
    ChatTurn, GeneratorMode, OpenAiResponseGenerator, ResponseGenerator,
};
use ragmill::ingestion::{DocumentLoader, IngestionPipeline};
use ragmill::progress::StartupProgress;
use ragmill::retrieval::Retriever;
use ragmill::stores::{SqliteChunkStore, VectorStore};
use ragmill::types::RagError;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("fatal: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), RagError> {
    dotenvy::dotenv().ok();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let config = ConfigBuilder::new()
        .with_file(&config_path)?
        .with_env()
        .build()?;
    init_tracing(&config.log_level);

    let progress = StartupProgress::spawn("initializing");
    let store = open_store(&config).await;
    progress.finish().await;
    let store: Arc<dyn VectorStore> = Arc::new(store?);

    let embedder = Arc::new(RigEmbeddingProvider::openai(&config.embedding_model)?);
    let pipeline = IngestionPipeline::new(
        DocumentLoader::new(&config.docs_directory),
        config.chunking,
        embedder,
        store.clone(),
    );
    let retriever = Retriever::new(store.clone());
    let answerer =
        OpenAiResponseGenerator::new(GeneratorMode::QuestionAnswer, &config.completion_model)?;
    let summarizer =
        OpenAiResponseGenerator::new(GeneratorMode::Summary, &config.completion_model)?;

    let mut history: Vec<ChatTurn> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!();
        println!("[1] ingest documents");
        println!("[2] ask a question");
        println!("[3] summarize a topic");
        println!("[4] store status");
        println!("[5] quit");

        let Some(choice) = prompt(&mut lines, "> ").await? else {
            break;
        };

        // One failed action must not end the session.
        let outcome = match choice.as_str() {
            "1" => ingest(&pipeline).await,
            "2" => ask(&mut lines, &retriever, &answerer, config.top_k, &mut history).await,
            "3" => summarize(&mut lines, &retriever, &summarizer, config.top_k).await,
            "4" => status(store.as_ref()).await,
            "5" | "q" | "quit" | "exit" => break,
            "" => continue,
            other => {
                println!("unrecognized choice: {other}");
                continue;
            }
        };
        if let Err(err) = outcome {
            error!(%err, "menu action failed");
            println!("error: {err}");
        }
    }

    Ok(())
}

async fn open_store(
    config: &ragmill::PipelineConfig,
) -> Result<SqliteChunkStore<openai::EmbeddingModel>, RagError> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| RagError::Config("OPENAI_API_KEY is not set".to_string()))?;
    let client = openai::Client::new(&api_key)
        .map_err(|err| RagError::Config(err.to_string()))?;
    let store_model = client.embedding_model(&config.embedding_model);
    SqliteChunkStore::open(&config.persist_directory, &config.collection_name, store_model).await
}

fn init_tracing(log_level: &str) {
    static INIT: Once = Once::new();
    let level = log_level.to_string();
    INIT.call_once(move || {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Prints `label`, reads one trimmed line. `None` means stdin closed.
async fn prompt(
    lines: &mut Lines<BufReader<Stdin>>,
    label: &str,
) -> Result<Option<String>, RagError> {
    use std::io::Write;
    print!("{label}");
    let _ = std::io::stdout().flush();
    Ok(lines.next_line().await?.map(|line| line.trim().to_string()))
}

async fn ingest(pipeline: &IngestionPipeline) -> Result<(), RagError> {
    let report = pipeline.ingest().await?;
    println!(
        "loaded {} documents ({} already ingested), stored {} new chunks",
        report.documents_loaded, report.documents_skipped, report.chunks_stored
    );
    Ok(())
}

async fn ask(
    lines: &mut Lines<BufReader<Stdin>>,
    retriever: &Retriever,
    generator: &dyn ResponseGenerator,
    top_k: usize,
    history: &mut Vec<ChatTurn>,
) -> Result<(), RagError> {
    let Some(question) = prompt(lines, "question: ").await? else {
        return Ok(());
    };
    if question.is_empty() {
        return Ok(());
    }

    let context = retriever.retrieve(&question, top_k).await?;
    let answer = generator.generate(&question, &context, history).await?;
    println!("{answer}");

    history.push(ChatTurn::user(question));
    history.push(ChatTurn::assistant(answer));
    Ok(())
}

async fn summarize(
    lines: &mut Lines<BufReader<Stdin>>,
    retriever: &Retriever,
    generator: &dyn ResponseGenerator,
    top_k: usize,
) -> Result<(), RagError> {
    let Some(topic) = prompt(lines, "topic: ").await? else {
        return Ok(());
    };
    if topic.is_empty() {
        return Ok(());
    }

    let context = retriever.retrieve(&topic, top_k).await?;
    let summary = generator.generate(&topic, &context, &[]).await?;
    println!("{summary}");
    Ok(())
}

async fn status(store: &dyn VectorStore) -> Result<(), RagError> {
    let count = store.count().await?;
    println!("{count} chunks stored");
    Ok(())
}
