use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokenpool::adapters::message::MessageRenderer;
use tokenpool::domain::Token;
use tokenpool::persistence::{
    ConnectionPool, SqlxTokenRepository, StorageConfig, TokenRepository,
};

async fn memory_repository() -> SqlxTokenRepository {
    let config = StorageConfig {
        url: "sqlite::memory:".to_string(),
        ..Default::default()
    };
    let pool = ConnectionPool::open(&config).await.unwrap();
    pool.ensure_schema(&config.table, &config.column).await.unwrap();
    SqlxTokenRepository::from_config(pool, &config).unwrap()
}

fn benchmark_dispense_empty_pool(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let repo = rt.block_on(memory_repository());

    c.bench_function("dispense_empty_pool", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(repo.dispense().await.unwrap());
        });
    });
}

fn benchmark_insert_then_dispense(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let repo = rt.block_on(memory_repository());

    c.bench_function("insert_then_dispense", |b| {
        b.to_async(&rt).iter(|| async {
            let token = Token::generate(16).unwrap();
            repo.insert(std::slice::from_ref(&token)).await.unwrap();
            black_box(repo.dispense().await.unwrap());
        });
    });
}

fn benchmark_token_generation(c: &mut Criterion) {
    c.bench_function("token_generate", |b| {
        b.iter(|| black_box(Token::generate(8).unwrap()));
    });
}

fn benchmark_message_render(c: &mut Criterion) {
    let renderer = MessageRenderer::new("Your access code is: {{ token }}").unwrap();
    let token = Token::parse("ABC123").unwrap();

    c.bench_function("message_render", |b| {
        b.iter(|| black_box(renderer.render(black_box(&token))));
    });
}

criterion_group!(
    benches,
    benchmark_dispense_empty_pool,
    benchmark_insert_then_dispense,
    benchmark_token_generation,
    benchmark_message_render
);
criterion_main!(benches);
