// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Apo CLI entrypoint.
//!
//! By default this serves the HTTP API and streamable-HTTP MCP at `http://<bind>/mcp`.
//!
//! Use `--mcp` to serve the MCP tools over stdio instead (intended for tool integrations).

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use apo::agent::{FirecrawlSearch, OpenAiCompatibleModel, Orchestrator, OrchestratorConfig};
use apo::config::ProviderConfig;
use apo::http::{router, AppState};
use apo::mcp::ApoMcp;
use apo::query::CanvasDigest;
use apo::store::MemoryContextCache;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_BIND: &str = "127.0.0.1:27436";
const STREAM_CHUNK_DELAY: Duration = Duration::from_millis(20);

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--bind <addr>] [--port <port>] [--model <id>]\n  {program} --mcp [--model <id>]\n\nHTTP mode (default) serves the API and MCP over streamable HTTP at `http://<addr>/mcp`.\n--bind selects the listen address (default {DEFAULT_BIND}); --port overrides only its port (0 = ephemeral).\n--model overrides the default model (AI_MODEL).\n\n--mcp serves the MCP tools over stdio and cannot be combined with --bind/--port."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    mcp: bool,
    bind: Option<SocketAddr>,
    port: Option<u16>,
    model: Option<String>,
}

impl CliOptions {
    fn listen_addr(&self) -> Result<SocketAddr, Box<dyn Error>> {
        let mut addr = match self.bind {
            Some(addr) => addr,
            None => DEFAULT_BIND.parse()?,
        };
        if let Some(port) = self.port {
            addr.set_port(port);
        }
        Ok(addr)
    }
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mcp" => {
                if options.mcp {
                    return Err(());
                }
                options.mcp = true;
            }
            "--bind" => {
                if options.bind.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                options.bind = Some(raw.parse().map_err(|_| ())?);
            }
            "--port" => {
                if options.port.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                options.port = Some(raw.parse().map_err(|_| ())?);
            }
            "--model" => {
                if options.model.is_some() {
                    return Err(());
                }
                options.model = Some(args.next().ok_or(())?);
            }
            _ => return Err(()),
        }
    }

    if options.mcp && (options.bind.is_some() || options.port.is_some()) {
        return Err(());
    }

    Ok(options)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "apo".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        init_tracing();

        let contexts = Arc::new(MemoryContextCache::<CanvasDigest>::new());

        if options.mcp {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
            runtime.block_on(ApoMcp::with_context_cache(contexts).serve_stdio())?;
            return Ok(());
        }

        let mut provider = ProviderConfig::from_env()?;
        if let Some(model) = options.model.clone() {
            provider = provider.with_default_model(model)?;
        }
        if !provider.has_model_key() {
            warn!("no OPENROUTER_API_KEY or OPENAI_API_KEY set; assistant routes will answer 503");
        }

        let config = OrchestratorConfig {
            default_model: provider.default_model.clone(),
            chunk_delay: STREAM_CHUNK_DELAY,
            ..OrchestratorConfig::default()
        };
        let orchestrator = Orchestrator::new(
            Arc::new(OpenAiCompatibleModel::new(&provider)?),
            Arc::new(FirecrawlSearch::new(&provider)?),
            config,
        );
        let state = AppState::new(orchestrator, contexts, provider.has_model_key());
        let addr = options.listen_addr()?;

        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!(addr = %listener.local_addr()?, model = %provider.default_model, "apo listening");
            axum::serve(listener, router(state)).await?;
            Ok::<(), Box<dyn Error>>(())
        })?;

        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("apo: {err}");
        std::process::exit(1);
    }
}
