//! Roadmap orchestrator server binary
//!
//! Wires configuration, database, checkpoint backend, agents, executor
//! and the HTTP/WS router together and serves.

use roadmap_checkpoint::{CheckpointStore, FileCheckpointStore};
use roadmap_orchestrator::agents::ScriptedAgents;
use roadmap_orchestrator::api::create_router;
use roadmap_orchestrator::db::repositories::task_repo;
use roadmap_orchestrator::db::{DatabaseConnection, DbCheckpointStore};
use roadmap_orchestrator::{
    CheckpointBackend, LiveStepMap, NotificationBus, RuntimeConfig, WorkflowBrain,
    WorkflowExecutor,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(rust_log).init();

    let cfg = Arc::new(RuntimeConfig::from_env()?);
    tracing::info!(
        max_rounds = cfg.max_rounds,
        content_concurrency = cfg.content_concurrency,
        max_active_tasks = cfg.max_active_tasks,
        backend = ?cfg.checkpoint_backend,
        "configuration loaded"
    );

    tracing::info!(url = %cfg.database_url, "connecting to database");
    let db = DatabaseConnection::new(&cfg.database_url).await?;
    db.run_migrations().await?;
    db.health_check().await?;

    let checkpoints: Arc<dyn CheckpointStore> = match cfg.checkpoint_backend {
        CheckpointBackend::Local => {
            Arc::new(FileCheckpointStore::new(cfg.checkpoint_dir.clone()).await?)
        }
        CheckpointBackend::Remote => Arc::new(DbCheckpointStore::new(db.pool().clone())),
    };

    let bus = NotificationBus::new();
    let live = LiveStepMap::new();
    let brain = Arc::new(WorkflowBrain::new(
        db.clone(),
        bus.clone(),
        live,
        cfg.clone(),
    ));

    // The scripted agents keep the server runnable without LLM wiring;
    // production deployments swap in prompt-driven implementations here.
    let agents = Arc::new(ScriptedAgents::agent_set());
    let executor = Arc::new(WorkflowExecutor::new(cfg.clone(), brain, agents, checkpoints));

    // Pick up tasks a previous process left mid-graph; suspended tasks
    // stay parked until their review decision arrives.
    for task in task_repo::list(db.pool(), Some("processing")).await? {
        match executor.recover(&task.task_id).await {
            Ok(true) => tracing::info!(task_id = %task.task_id, "recovered from checkpoint"),
            Ok(false) => {}
            Err(err) => tracing::warn!(task_id = %task.task_id, %err, "recovery failed"),
        }
    }

    let router = create_router(db, executor.clone(), bus);
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;
    tracing::info!(%addr, "roadmap orchestrator listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
