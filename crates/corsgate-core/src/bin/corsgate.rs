//! corsgate: CORS-enforcing reverse proxy
//!
//! All options can also be set through `CORSGATE_*` environment variables.
//! Log filtering follows `RUST_LOG` (default `info`).

use clap::{Parser, ValueEnum};
use corsgate_core::server::{DEFAULT_MAX_REQUEST_BODY, DEFAULT_MAX_RESPONSE_BODY};
use corsgate_core::{Cors, CorsConfig, MiddlewareChain, ProxyConfig, ProxyServer};
use std::net::SocketAddr;
use std::process::ExitCode;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "corsgate")]
#[command(version, about = "Reverse proxy that enforces a CORS origin allow-list", long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "CORSGATE_LISTEN", default_value = "0.0.0.0:3000")]
    listen: SocketAddr,

    /// Backend base URI, e.g. http://127.0.0.1:8080
    #[arg(long, env = "CORSGATE_BACKEND")]
    backend: String,

    /// Comma-delimited methods sent in preflight responses (`*` for all)
    #[arg(
        long,
        env = "CORSGATE_ALLOWED_METHODS",
        default_value = "GET, HEAD, POST, PUT, PATCH, DELETE, OPTIONS"
    )]
    allowed_methods: String,

    /// Comma-delimited origin allow-list (`*`, `example.com`, `.example.com`, `//host:*`, ...)
    #[arg(long, env = "CORSGATE_ALLOWED_ORIGINS", default_value = "*")]
    allowed_origins: String,

    /// Comma-delimited headers sent in preflight responses (`*` for all)
    #[arg(long, env = "CORSGATE_ALLOWED_HEADERS", default_value = "*")]
    allowed_headers: String,

    /// Forward preflight requests to the backend instead of answering them
    #[arg(long, env = "CORSGATE_DEFERRED_PREFLIGHT", default_value_t = false)]
    deferred_preflight: bool,

    /// Largest request body accepted from clients, in bytes (413 beyond it)
    #[arg(long, env = "CORSGATE_MAX_REQUEST_BODY", default_value_t = DEFAULT_MAX_REQUEST_BODY)]
    max_request_body: usize,

    /// Largest response body accepted from the backend, in bytes (502 beyond it)
    #[arg(long, env = "CORSGATE_MAX_RESPONSE_BODY", default_value_t = DEFAULT_MAX_RESPONSE_BODY)]
    max_response_body: usize,

    /// Runtime worker threads (defaults to the number of CPUs)
    #[arg(long, env = "CORSGATE_WORKERS")]
    workers: Option<usize>,

    /// Log output format
    #[arg(long, value_enum, env = "CORSGATE_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> corsgate_core::Result<()> {
    let config = CorsConfig::new()
        .allow_methods(cli.allowed_methods)
        .allow_origins(cli.allowed_origins)
        .allow_headers(cli.allowed_headers);

    let mut cors = Cors::new(config);
    if cli.deferred_preflight {
        cors = cors.deferred();
    }

    let proxy = ProxyConfig::new()
        .listen(cli.listen)
        .backend(cli.backend)
        .max_request_body(cli.max_request_body)
        .max_response_body(cli.max_response_body);
    let server = ProxyServer::bind(&proxy, MiddlewareChain::new().with(cors))?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "cannot listen for ctrl-c, running until killed");
                std::future::pending::<()>().await;
            }
        })
        .await
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let workers = cli.workers.unwrap_or_else(num_cpus::get).max(1);
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "corsgate stopped");
            ExitCode::FAILURE
        }
    }
}
