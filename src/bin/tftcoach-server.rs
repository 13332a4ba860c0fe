//! tftcoach HTTP server binary

use std::sync::Arc;
use tftcoach::server::{run_server, AppState};
use tftcoach::{
    BaseAttributes, CandidateSource, ChunkStore, Config, ContextEngine, Difficulty, Embedder,
    Generation, HashEmbedder, HttpEmbedder, HttpVectorIndex, IndexedSource, IngestPipeline,
    MemoryIndex, SourceDocument, VectorIndex,
};

type SourcePair = (Arc<dyn CandidateSource>, Arc<dyn ChunkStore>);

fn indexed<E, I>(embedder: E, index: I, config: &Config) -> SourcePair
where
    E: Embedder + 'static,
    I: VectorIndex + 'static,
{
    let source = Arc::new(IndexedSource::new(embedder, index).with_batching(
        config.services.embedding_batch_size,
        config.services.embedding_concurrency,
    ));
    (source.clone(), source)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    println!("tftcoach strategy server");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    let config = Config::load()?;
    let use_real = std::env::args().any(|arg| arg == "--use-real");

    let (source, store) = if use_real {
        let (Some(embedding_url), Some(index_url)) = (
            config.services.embedding_url.clone(),
            config.services.index_url.clone(),
        ) else {
            anyhow::bail!(
                "--use-real needs services.embedding_url and services.index_url \
                 (or TFTCOACH_SERVICES__EMBEDDING_URL / TFTCOACH_SERVICES__INDEX_URL)"
            );
        };
        println!("✓ Mode: REAL services");
        println!("✓ Embedding service: {}", embedding_url);
        println!("✓ Vector index: {} (collection '{}')", index_url, config.services.collection);

        let client = reqwest::Client::new();
        match client.get(format!("{}/health", embedding_url.trim_end_matches('/'))).send().await {
            Ok(resp) if resp.status().is_success() => println!("✓ Embedding service is healthy"),
            Ok(resp) => eprintln!("⚠️  Embedding service returned status: {}", resp.status()),
            Err(e) => {
                eprintln!("❌ Failed to connect to embedding service: {}", e);
                return Err(e.into());
            }
        }

        indexed(
            HttpEmbedder::new(embedding_url, config.services.embedding_model.clone()),
            HttpVectorIndex::new(&index_url, &config.services.collection),
            &config,
        )
    } else {
        println!("✓ Mode: DEMO in-memory index");
        println!("   (use --use-real to connect to external services)");
        indexed(HashEmbedder::default(), MemoryIndex::new(), &config)
    };

    let ingest = Arc::new(IngestPipeline::new(&config, store)?);
    if !use_real {
        let report = ingest.ingest(demo_documents()).await?;
        println!("✓ Seeded {} demo chunks", report.chunks);
    }

    let generation = Generation::from_config(&config.generation);
    if !generation.is_enabled() {
        println!("⚠️  No generation API key: answers are grounding-only");
    }

    let engine = ContextEngine::new(&config, source, generation)?;
    println!("✓ Context engine initialized");
    println!("✓ Starting HTTP server on {}:{}...", config.server.host, config.server.port);
    println!();

    run_server(AppState { engine, ingest }, &config.server).await?;

    Ok(())
}

/// Strategy notes seeded into the demo index
fn demo_documents() -> Vec<SourceDocument> {
    fn doc(source: &str, timestamp: &str, difficulty: Difficulty, items: &[&str], text: &str) -> SourceDocument {
        SourceDocument {
            text: text.to_string(),
            attributes: BaseAttributes {
                video_source: Some(source.to_string()),
                timestamp: Some(timestamp.to_string()),
                composition_name: Some("6도전자".to_string()),
                difficulty,
                synergies: vec!["도전자".to_string()],
                core_items: items.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
        }
    }

    vec![
        doc(
            "demo_001",
            "0:00-2:30",
            Difficulty::Novice,
            &["무한의 대검"],
            "2-1에서는 연패 전략을 추천합니다.\n\
             야스오나 요네가 나오면 바로 픽업하세요.\n\
             골드를 최대한 아껴서 4-1까지 50골드 이상 유지하는 게 목표입니다.\n\
             체력이 30 이하로 떨어지면 최소한의 방어는 해야 합니다.",
        ),
        doc(
            "demo_002",
            "2:30-5:00",
            Difficulty::Novice,
            &["무한의 대검", "최후의 속삭임"],
            "3-2가 되면 레벨 6으로 올려야 합니다.\n\
             골드가 50 이상이고 야스오가 2개 이상 있으면 리롤을 시작하세요.\n\
             목표는 야스오 2성 또는 요네 2성을 만드는 것입니다.\n\
             2성이 완성되면 리롤을 멈추고 레벨업으로 전환하세요.",
        ),
        doc(
            "demo_003",
            "5:00-7:30",
            Difficulty::Intermediate,
            &["무한의 대검", "최후의 속삭임", "거인 학살자"],
            "4-1에서는 레벨 7-8로 올리고 강력한 조합을 완성해야 합니다.\n\
             연패로 모은 골드를 사용할 시점입니다.\n\
             도전자 6을 완성하거나, 다른 시너지로 전환을 고려하세요.\n\
             아이템은 핵심 캐리에게 몰아주는 게 중요합니다.",
        ),
        doc(
            "demo_004",
            "0:00-1:30",
            Difficulty::Novice,
            &["무한의 대검", "최후의 속삭임", "거인 학살자"],
            "아이템 우선순위: 무한의 대검 > 최후의 속삭임 > 거인 학살자\n\
             야스오에게 공격 아이템을 주는 게 가장 좋습니다.\n\
             방어 아이템은 앞라인 탱커에게 주세요.\n\
             아이템이 애매하면 최대한 합치지 말고 기다리세요.",
        ),
    ]
}
