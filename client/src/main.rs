// File: client/src/main.rs
//! Sample client: relays one request to the configured target every poll
//! interval and logs how it went.

use anyhow::{anyhow, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use relay::config::{config_path, load_config};
use relay::{ClientConfig, NatsBus, PeriodicTask, RelayClient, RelayError};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("relay=info".parse()?)
        .add_directive("relay_client=info".parse()?)
        .add_directive("async_nats=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    let config: ClientConfig = load_config(&config_path("config/client.toml")).await?;
    let method: http::Method = config
        .method
        .parse()
        .map_err(|e| anyhow!("Invalid method '{}': {}", config.method, e))?;

    info!(
        "Relaying {} {} via '{}' every {:?}",
        method,
        config.target_url,
        config.subject,
        config.poll_interval()
    );

    let bus = Arc::new(NatsBus::connect(&config.bus.url).await?);
    let client = RelayClient::new(config.subject.clone(), bus)
        .with_timeout(config.timeout())
        .with_max_payload_bytes(config.bus.max_payload_bytes);

    let target_url = config.target_url.clone();
    let poller = PeriodicTask::spawn("client-poll", config.poll_interval(), move |tick| {
        let client = client.clone();
        let method = method.clone();
        let target_url = target_url.clone();
        async move {
            let started = Instant::now();
            match relay_once(&client, method, &target_url).await {
                Ok((status, body)) => info!(
                    "#{} DONE {:?} {} {}",
                    tick,
                    started.elapsed(),
                    status,
                    String::from_utf8_lossy(&body)
                ),
                Err(e) => warn!("#{} ERR {:?} {}", tick, started.elapsed(), e),
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    let ticks = poller.stop().await;
    info!("Stopped after {} requests", ticks);

    Ok(())
}

async fn relay_once(
    client: &RelayClient,
    method: http::Method,
    url: &str,
) -> Result<(http::StatusCode, Bytes), RelayError> {
    let request = http::Request::builder()
        .method(method)
        .uri(url)
        .body(Empty::<Bytes>::new())
        .map_err(|e| RelayError::Url {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.call(request).await?;
    let status = response.status();
    let body = match response.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    };
    Ok((status, body))
}
