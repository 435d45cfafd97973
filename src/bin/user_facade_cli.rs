//! user-facade-cli: exercise an in-process facade from the command line
//!
//! Usage:
//!   user-facade-cli list                          List records (through the breaker)
//!   user-facade-cli get <id>                      Fetch one record
//!   user-facade-cli create <name> <email> [role]  Create a record, then list
//!   user-facade-cli delete <id>                   Delete a record, then list
//!   user-facade-cli demo-breaker                  Trip and recover the breaker
//!
//! The store is volatile and seeded, so every invocation starts from the same
//! two records.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use user_facade::resilience::CircuitBreakerConfig;
use user_facade::store::RecordStore;
use user_facade::telemetry::init_tracing;
use user_facade::{Error, FacadeConfig, MemoryStore, RecordDraft, UserFacade};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let config = FacadeConfig::from_env().context("loading configuration from environment")?;

    match args[1].as_str() {
        "list" => {
            let facade = UserFacade::in_memory(config)?;
            print_json(&facade.list().await)
        }
        "get" => {
            let id = arg(&args, 2, "id")?;
            let facade = UserFacade::in_memory(config)?;
            respond(&facade, facade.get(id).await)
        }
        "create" => {
            let name = arg(&args, 2, "name")?;
            let email = arg(&args, 3, "email")?;
            let mut draft = RecordDraft::new(name, email);
            if let Some(role) = args.get(4) {
                draft = draft.with_role(role.as_str());
            }
            let facade = UserFacade::in_memory(config)?;
            respond(&facade, facade.create(draft).await)?;
            print_json(&facade.list().await)
        }
        "delete" => {
            let id = arg(&args, 2, "id")?;
            let facade = UserFacade::in_memory(config)?;
            respond(&facade, facade.delete(id).await.map(|()| serde_json::json!({"deleted": id})))?;
            print_json(&facade.list().await)
        }
        "demo-breaker" => demo_breaker(config).await,
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!(
        r#"user-facade-cli: record facade driver

USAGE:
    user-facade-cli <COMMAND> [ARGS]

COMMANDS:
    list                          List records through the circuit breaker
    get <id>                      Fetch one record
    create <name> <email> [role]  Create a record
    delete <id>                   Delete a record
    demo-breaker                  Show the breaker opening and recovering
    help                          Show this help message

ENVIRONMENT:
    RUST_LOG                          Log filter (default: info)
    USER_FACADE_CACHE_TTL_MS          Cache TTL
    USER_FACADE_BREAKER_TIMEOUT_MS    Per-call timeout of the protected read
    USER_FACADE_EXPOSE_ERROR_DETAILS  Include cause chains in error bodies"#
    );
}

fn arg<'a>(args: &'a [String], idx: usize, name: &str) -> anyhow::Result<&'a str> {
    args.get(idx)
        .map(String::as_str)
        .with_context(|| format!("missing argument <{name}>"))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the value, or the client-facing error body with its status.
fn respond<T: serde::Serialize>(facade: &UserFacade, result: Result<T, Error>) -> anyhow::Result<()> {
    match result {
        Ok(v) => print_json(&v),
        Err(e) => {
            let resp = facade.error_response(&e);
            eprintln!("HTTP {}", resp.status);
            print_json(&resp.to_json())
        }
    }
}

/// Store whose fetch-all stalls past the breaker timeout until told otherwise.
struct StallingStore {
    inner: MemoryStore,
    stall: std::sync::atomic::AtomicBool,
}

#[async_trait::async_trait]
impl RecordStore for StallingStore {
    async fn create(&self, draft: RecordDraft) -> user_facade::Result<user_facade::Record> {
        self.inner.create(draft).await
    }
    async fn fetch_by_id(&self, id: &str) -> user_facade::Result<user_facade::Record> {
        self.inner.fetch_by_id(id).await
    }
    async fn fetch_all(&self) -> user_facade::Result<Vec<user_facade::Record>> {
        if self.stall.load(std::sync::atomic::Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.inner.fetch_all().await
    }
    async fn update(
        &self,
        id: &str,
        patch: user_facade::RecordPatch,
    ) -> user_facade::Result<user_facade::Record> {
        self.inner.update(id, patch).await
    }
    async fn delete(&self, id: &str) -> user_facade::Result<()> {
        self.inner.delete(id).await
    }
    fn name(&self) -> &'static str {
        "stalling"
    }
}

async fn demo_breaker(config: FacadeConfig) -> anyhow::Result<()> {
    let config = config.with_breaker(
        CircuitBreakerConfig::new()
            .with_timeout(Duration::from_millis(200))
            .with_reset_timeout(Duration::from_secs(1)),
    );
    let store = Arc::new(StallingStore {
        inner: MemoryStore::seeded(),
        stall: std::sync::atomic::AtomicBool::new(true),
    });
    let facade = UserFacade::new(store.clone(), config)?;

    println!("-- stalled store: call times out");
    print_json(&facade.list().await)?;
    println!("-- circuit open: short-circuit");
    print_json(&facade.list().await)?;
    print_json(&facade.breaker_snapshot())?;

    store.stall.store(false, std::sync::atomic::Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(1100)).await;
    println!("-- reset timeout elapsed: trial call succeeds");
    print_json(&facade.list().await)?;
    print_json(&facade.breaker_snapshot())
}
