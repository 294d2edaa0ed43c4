//! Subprocess transition tools

use crate::error::{T8nError, T8nResult};
use crate::tool::TransitionTool;
use crate::wire::{StdinInput, TransitionRequest, TransitionResponse, TransitionResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tessera_exceptions::ExceptionMap;
use tessera_primitives::Bytes;
use tessera_types::Alloc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default per-invocation timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Wire dialect of a tool binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// go-ethereum `evm t8n`, streaming over stdin/stdout
    #[default]
    Geth,
    /// `evmone-t8n`, exchanging files in a working directory
    Evmone,
}

impl Engine {
    /// Binary name when none is configured
    pub fn default_binary(self) -> &'static str {
        match self {
            Engine::Geth => "evm",
            Engine::Evmone => "evmone-t8n",
        }
    }

    /// Subcommand placed before the flags
    pub fn default_subcommand(self) -> Option<&'static str> {
        match self {
            Engine::Geth => Some("t8n"),
            Engine::Evmone => None,
        }
    }

    /// Built-in exception table
    pub fn exception_map(self) -> ExceptionMap {
        match self {
            Engine::Geth => ExceptionMap::geth(),
            Engine::Evmone => ExceptionMap::evmone(),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::Geth => f.write_str("geth"),
            Engine::Evmone => f.write_str("evmone"),
        }
    }
}

/// How to run an external tool
#[derive(Debug, Clone)]
pub struct ExternalToolConfig {
    /// Executable
    pub binary: PathBuf,
    /// Argument placed before the flags (`t8n` for geth's `evm`)
    pub subcommand: Option<String>,
    /// Wire dialect
    pub engine: Engine,
    /// Kill the tool after this long
    pub timeout: Duration,
    /// Collect EVM traces
    pub trace: bool,
}

impl ExternalToolConfig {
    /// Defaults for `engine`
    pub fn new(engine: Engine) -> Self {
        ExternalToolConfig {
            binary: PathBuf::from(engine.default_binary()),
            subcommand: engine.default_subcommand().map(str::to_string),
            engine,
            timeout: DEFAULT_TIMEOUT,
            trace: false,
        }
    }

    /// Set the binary
    pub fn binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Set the subcommand
    pub fn subcommand(mut self, subcommand: Option<String>) -> Self {
        self.subcommand = subcommand;
        self
    }

    /// Set the timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable tracing
    pub fn trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

/// A transition tool run as a child process, once per block. Invocations
/// are never retried.
#[derive(Debug, Clone)]
pub struct ExternalTool {
    config: ExternalToolConfig,
    name: String,
    exceptions: ExceptionMap,
}

impl ExternalTool {
    /// Tool with the engine's built-in exception table
    pub fn new(config: ExternalToolConfig) -> Self {
        let exceptions = config.engine.exception_map();
        let name = format!("{} {}", config.engine, exceptions.version());
        ExternalTool {
            config,
            name,
            exceptions,
        }
    }

    /// Replace the exception table
    pub fn with_exception_map(mut self, exceptions: ExceptionMap) -> Self {
        self.exceptions = exceptions;
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &ExternalToolConfig {
        &self.config
    }

    fn command(&self, request: &TransitionRequest) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        if let Some(sub) = &self.config.subcommand {
            cmd.arg(sub);
        }
        cmd.arg(format!("--state.fork={}", request.fork.t8n_name()))
            .arg(format!("--state.chainid={}", request.chain_id))
            .arg(format!("--state.reward={}", request.reward_arg()))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, mut cmd: Command, stdin: Option<Vec<u8>>) -> T8nResult<Vec<u8>> {
        cmd.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        let mut child = cmd.spawn().map_err(|source| T8nError::Spawn {
            binary: self.config.binary.display().to_string(),
            source,
        })?;

        let timeout = self.config.timeout;
        let pipe = child.stdin.take();
        let exchange = async move {
            // feed stdin while stdout and stderr drain
            let feed = async move {
                if let (Some(input), Some(mut pipe)) = (stdin, pipe) {
                    // A tool that exits early closes the pipe; its exit status is the real error
                    match pipe.write_all(&input).await {
                        Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(T8nError::from(e)),
                        _ => drop(pipe),
                    }
                }
                Ok(())
            };
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            let output = output.map_err(T8nError::from)?;
            fed?;
            Ok::<_, T8nError>(output)
        };
        // Dropping the child on timeout kills it
        let output = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| T8nError::Timeout(timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(code = ?output.status.code(), %stderr, "t8n failed");
            return Err(T8nError::NonZeroExit {
                code: output.status.code(),
                stderr,
            });
        }
        Ok(output.stdout)
    }

    async fn evaluate_streaming(
        &self,
        request: &TransitionRequest,
        workdir: &Path,
    ) -> T8nResult<TransitionResponse> {
        let mut cmd = self.command(request);
        cmd.args([
            "--input.alloc=stdin",
            "--input.txs=stdin",
            "--input.env=stdin",
            "--output.result=stdout",
            "--output.alloc=stdout",
            "--output.body=stdout",
        ]);
        if self.config.trace {
            cmd.arg("--trace")
                .arg(format!("--output.basedir={}", workdir.display()));
        }

        let input = to_json(&StdinInput {
            alloc: &request.alloc,
            txs: &request.txs,
            env: &request.env,
        })?;

        let stdout = self.run(cmd, Some(input)).await?;
        serde_json::from_slice(&stdout).map_err(|e| T8nError::MalformedOutput(e.to_string()))
    }

    async fn evaluate_files(
        &self,
        request: &TransitionRequest,
        workdir: &Path,
    ) -> T8nResult<TransitionResponse> {
        tokio::fs::write(workdir.join("alloc.json"), to_json(&request.alloc)?).await?;
        tokio::fs::write(workdir.join("txs.json"), to_json(&request.txs)?).await?;
        tokio::fs::write(workdir.join("env.json"), to_json(&request.env)?).await?;

        let mut cmd = self.command(request);
        let input = |name: &str| workdir.join(name).display().to_string();
        cmd.arg(format!("--input.alloc={}", input("alloc.json")))
            .arg(format!("--input.txs={}", input("txs.json")))
            .arg(format!("--input.env={}", input("env.json")))
            .arg(format!("--output.basedir={}", workdir.display()))
            .arg("--output.result=result.json")
            .arg("--output.alloc=out_alloc.json")
            .arg("--output.body=txs.rlp");
        if self.config.trace {
            cmd.arg("--trace");
        }
        self.run(cmd, None).await?;

        let result: TransitionResult = read_json(&workdir.join("result.json")).await?;
        let alloc: Alloc = read_json(&workdir.join("out_alloc.json")).await?;
        let body: Bytes = read_json(&workdir.join("txs.rlp")).await?;
        Ok(TransitionResponse {
            alloc,
            result,
            body: Some(body),
            traces: None,
        })
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> T8nResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| T8nError::Encode(e.to_string()))
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> T8nResult<T> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| T8nError::MalformedOutput(format!("{}: {}", path.display(), e)))?;
    serde_json::from_slice(&raw)
        .map_err(|e| T8nError::MalformedOutput(format!("{}: {}", path.display(), e)))
}

/// Read `trace-<index>-<hash>.jsonl` files in transaction order
async fn collect_traces(workdir: &Path) -> T8nResult<Vec<Vec<serde_json::Value>>> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(workdir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let index = name
            .strip_prefix("trace-")
            .filter(|_| name.ends_with(".jsonl"))
            .and_then(|rest| rest.split('-').next())
            .and_then(|i| i.parse::<usize>().ok());
        if let Some(index) = index {
            files.push((index, entry.path()));
        }
    }
    files.sort();

    let mut traces = Vec::with_capacity(files.len());
    for (_, path) in files {
        let raw = tokio::fs::read_to_string(&path).await?;
        let lines = raw
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<Result<Vec<serde_json::Value>, _>>()
            .map_err(|e| T8nError::MalformedOutput(format!("{}: {}", path.display(), e)))?;
        traces.push(lines);
    }
    Ok(traces)
}

#[async_trait]
impl TransitionTool for ExternalTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn exception_map(&self) -> &ExceptionMap {
        &self.exceptions
    }

    async fn evaluate(&self, request: &TransitionRequest) -> T8nResult<TransitionResponse> {
        let workdir = tempfile::tempdir()?;
        let started = Instant::now();
        debug!(
            engine = %self.config.engine,
            fork = %request.fork,
            number = request.env.current_number,
            txs = request.txs.len(),
            "invoking t8n"
        );

        let mut response = match self.config.engine {
            Engine::Geth => self.evaluate_streaming(request, workdir.path()).await?,
            Engine::Evmone => self.evaluate_files(request, workdir.path()).await?,
        };
        if self.config.trace {
            response.traces = Some(collect_traces(workdir.path()).await?);
        }

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            rejected = response.result.rejected.len(),
            "t8n finished"
        );
        Ok(response)
    }
}
