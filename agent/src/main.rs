// File: agent/src/main.rs
use anyhow::Result;
use relay::config::{config_path, load_config};
use relay::{AgentConfig, AgentSettings, NatsBus, PeriodicTask, RelayAgent, ReqwestExecutor};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("relay=info".parse()?)
        .add_directive("relay_agent=info".parse()?)
        .add_directive("async_nats=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    info!("Starting HTTP relay agent");

    let config: AgentConfig = load_config(&config_path("config/agent.toml")).await?;
    info!(
        "Configuration loaded: subject '{}', queue '{}', bus {}",
        config.subject, config.queue, config.bus.url
    );

    let bus = Arc::new(NatsBus::connect(&config.bus.url).await?);

    let settings = AgentSettings::new(config.subject.clone(), config.queue.clone())
        .max_payload_bytes(config.bus.max_payload_bytes);
    let agent = Arc::new(RelayAgent::start(settings, bus, Arc::new(ReqwestExecutor::new())).await?);

    let heartbeat = (config.heartbeat_seconds > 0).then(|| {
        let agent = agent.clone();
        PeriodicTask::spawn(
            "agent-heartbeat",
            Duration::from_secs(config.heartbeat_seconds),
            move |_| {
                let stats = agent.stats();
                async move {
                    info!(
                        "Agent stats: received={} replied={} failed={} publish_failures={} since {}",
                        stats.received,
                        stats.replied,
                        stats.failed,
                        stats.publish_failures,
                        stats.started_at
                    );
                }
            },
        )
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    if let Some(heartbeat) = heartbeat {
        heartbeat.stop().await;
    }

    match Arc::try_unwrap(agent) {
        Ok(agent) => agent.stop().await,
        Err(_) => warn!("Agent still referenced at shutdown, dropping it"),
    }

    Ok(())
}
