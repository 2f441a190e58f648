use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use http_transport_firehose::app::ports::RecordSink;
use http_transport_firehose::capture::from_reqwest;
use http_transport_firehose::config::Config;
use http_transport_firehose::infra::{NdjsonSink, ReqwestExecutor};
use http_transport_firehose::{logging, metrics, server, CaptureTransport, DeliveryEndpoint};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "firehose-relay")]
#[command(about = "Capture HTTP requests into a Firehose stream and replay them from its delivery callback")]
#[command(version)]
struct Cli {
    /// Optional TOML config file; environment variables take precedence
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP endpoint that receives and replays delivery batches
    Serve {
        /// Listen address (overrides endpoint.bind_addr)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Send one request through the capture transport
    Capture {
        /// Destination URL of the request to capture
        url: String,
        #[arg(long, short = 'X', default_value = "POST")]
        method: String,
        /// Header in `Name: value` form, repeatable
        #[arg(long = "header", short = 'H')]
        headers: Vec<String>,
        /// Request body
        #[arg(long, short = 'd')]
        data: Option<String>,
        /// Stream name (overrides transport.stream_name)
        #[arg(long)]
        stream: Option<String>,
        /// Append to a local NDJSON file instead of Firehose
        #[arg(long)]
        ndjson: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let _guard = logging::init_logging(&config.logging, config.debug);

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.endpoint.bind_addr = bind;
            }
            config.endpoint.validate()?;
            info!(policy = %config.endpoint.credential_policy, "Access key check policy");

            let executor = ReqwestExecutor::new(config.endpoint.replay_timeout())
                .context("Failed to build HTTP client")?;
            let endpoint = Arc::new(DeliveryEndpoint::new(Arc::new(executor), &config.endpoint));
            let handle = if config.endpoint.metrics {
                metrics::install_recorder()
            } else {
                None
            };

            server::start_server(endpoint, handle, config.endpoint.bind_addr).await?;
        }
        Commands::Capture {
            url,
            method,
            headers,
            data,
            stream,
            ndjson,
        } => {
            if let Some(stream) = stream {
                config.transport.stream_name = stream;
            }
            let sink = build_sink(&config, ndjson).await?;
            let transport = CaptureTransport::new(sink, &config.transport);

            let method = reqwest::Method::from_bytes(method.to_uppercase().as_bytes())
                .with_context(|| format!("Invalid method {}", method))?;
            let mut builder = reqwest::Client::new().request(method, &url);
            for header in &headers {
                let (name, value) = header
                    .split_once(':')
                    .ok_or_else(|| anyhow!("Header must be `Name: value`, got {}", header))?;
                builder = builder.header(name.trim(), value.trim());
            }
            if let Some(data) = data {
                builder = builder.body(data);
            }
            let request = from_reqwest(builder.build()?)?;

            match transport.execute(request).await {
                Ok(response) => println!("{}", response.status()),
                Err(e) => {
                    warn!(error = %e, "Capture failed");
                    println!("{}", e.response.status());
                    return Err(e.into());
                }
            }
        }
    }
    Ok(())
}

async fn build_sink(config: &Config, ndjson: Option<PathBuf>) -> anyhow::Result<Arc<dyn RecordSink>> {
    if let Some(path) = ndjson {
        return Ok(Arc::new(NdjsonSink::new(path)));
    }
    firehose_sink(config).await
}

#[cfg(feature = "firehose")]
async fn firehose_sink(config: &Config) -> anyhow::Result<Arc<dyn RecordSink>> {
    let sink = http_transport_firehose::infra::FirehoseSink::from_env(config.transport.region.clone()).await;
    Ok(Arc::new(sink))
}

#[cfg(not(feature = "firehose"))]
async fn firehose_sink(_config: &Config) -> anyhow::Result<Arc<dyn RecordSink>> {
    Err(anyhow!("built without the `firehose` feature; pass --ndjson <path>"))
}
