//! Resilience Patterns Example
//!
//! Walks through the failure-isolation layers of the facade:
//! - A bare circuit breaker tripping on a failure rate and recovering
//! - Read caching with write invalidation
//! - The breaker-protected list read degrading to the fallback payload
//!
//! Usage:
//!   cargo run --example resilience_patterns

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use user_facade::resilience::{CircuitBreaker, CircuitBreakerConfig};
use user_facade::{Error, ErrorContext, FacadeConfig, RecordDraft, RecordPatch, UserFacade};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    user_facade::telemetry::init_tracing();
    println!("=== User Facade Resilience Demo ===\n");

    demo_circuit_breaker().await;
    demo_cache_invalidation().await?;
    demo_guarded_list().await?;
    Ok(())
}

async fn demo_circuit_breaker() {
    println!("--- Example 1: Circuit Breaker ---\n");

    let config = CircuitBreakerConfig::new()
        .with_timeout(Duration::from_millis(100))
        .with_error_threshold_percentage(50)
        .with_volume_threshold(4)
        .with_reset_timeout(Duration::from_millis(500));
    let breaker = CircuitBreaker::new("demo", config);

    println!("Configuration:");
    println!("  - Timeout: 100ms");
    println!("  - Opens at >= 50% failures over at least 4 calls");
    println!("  - Reset timeout: 500ms\n");

    let calls = AtomicU32::new(0);
    for i in 1..=6 {
        let out = breaker
            .call(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n % 2 == 1 {
                    Err(Error::internal_with_context(
                        "upstream refused",
                        ErrorContext::new().with_source("demo"),
                    ))
                } else {
                    Ok(n)
                }
            })
            .await;
        match out.fallback() {
            Some(f) => println!("Call {i}: fallback ({:?}) state={}", f.reason, breaker.state()),
            None => println!("Call {i}: ok state={}", breaker.state()),
        }
    }

    tokio::time::sleep(Duration::from_millis(550)).await;
    let trial = breaker.call(|| async { Ok(0u32) }).await;
    println!(
        "\nAfter reset timeout, trial {} -> state={}\n",
        if trial.is_fallback() { "failed" } else { "succeeded" },
        breaker.state()
    );
}

async fn demo_cache_invalidation() -> anyhow::Result<()> {
    println!("--- Example 2: Read Cache ---\n");

    let facade = UserFacade::in_memory(FacadeConfig::default())?;
    facade.provider().get_all().await?;
    facade.provider().get_all().await?;
    let stats = facade.provider().cache_stats();
    println!("Two reads: hits={} misses={}", stats.hits, stats.misses);

    let created = facade
        .create(RecordDraft::new("Grace Hopper", "grace@example.com").with_role("admin"))
        .await?;
    let all = facade.provider().get_all().await?;
    println!("After create: {} records (collection re-read)", all.len());

    facade
        .update(&created.id, RecordPatch::new().with_name("Rear Admiral Hopper"))
        .await?;
    println!("After update: {}", facade.get(&created.id).await?.name);

    let stats = facade.provider().cache_stats();
    println!(
        "Stats: hits={} misses={} invalidations={} hit ratio={:.2}\n",
        stats.hits,
        stats.misses,
        stats.invalidations,
        stats.hit_ratio()
    );
    Ok(())
}

async fn demo_guarded_list() -> anyhow::Result<()> {
    println!("--- Example 3: Guarded List Read ---\n");

    let config = FacadeConfig::new().with_breaker(
        CircuitBreakerConfig::new().with_timeout(Duration::from_millis(50)),
    );
    let facade = Arc::new(UserFacade::in_memory(config)?);

    let out = facade.list().await;
    println!("Healthy list: {}", serde_json::to_string(&out)?);
    println!("Snapshot: {}", serde_json::to_string(&facade.breaker_snapshot())?);

    let err = facade.get("unknown").await.unwrap_err();
    let resp = facade.error_response(&err);
    println!("\nUnknown id -> HTTP {} {}", resp.status, resp.to_json());

    println!("\nThe list route never returns an error; while the store is slow or");
    println!("failing it answers {{\"fallback\":true,\"error\":\"Service temporarily unavailable\"}}.");
    Ok(())
}
