use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::{MrError, Result};

pub const DEFAULT_PORT: u16 = 50051;
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_CHANNELS: usize = 64;

pub fn default_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), DEFAULT_PORT)
}

/// Fixed for the lifetime of a job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// One map task per file, in order.
    pub inputs: Vec<PathBuf>,
    pub n_reduce: usize,
    pub task_timeout: Duration,
    pub addr: SocketAddr,
    /// Worker connections served at once.
    pub max_channels: usize,
}

impl JobConfig {
    pub fn new(inputs: Vec<PathBuf>, n_reduce: usize) -> Self {
        JobConfig {
            inputs,
            n_reduce,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            addr: default_addr(),
            max_channels: DEFAULT_MAX_CHANNELS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_reduce == 0 {
            return Err(MrError::InvalidConfig("reduce count must be non-zero".into()));
        }
        if self.task_timeout.is_zero() {
            return Err(MrError::InvalidConfig("task timeout must be non-zero".into()));
        }
        if self.max_channels == 0 {
            return Err(MrError::InvalidConfig("max channels must be non-zero".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub server: SocketAddr,
    /// Where intermediate and output files are written and read.
    pub work_dir: PathBuf,
    pub wait_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            server: default_addr(),
            work_dir: PathBuf::from("."),
            wait_interval: DEFAULT_WAIT_INTERVAL,
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Run the map-reduce coordinator")]
pub struct CoordinatorOpts {
    /// Input files, one map task each
    pub files: Vec<PathBuf>,

    /// Number of reduce tasks
    #[arg(short = 'r', long, default_value_t = 10)]
    pub n_reduce: usize,

    /// Listen address
    #[arg(short, long, default_value_t = default_addr())]
    pub addr: SocketAddr,

    /// Milliseconds before an unreported task is handed out again
    #[arg(short, long, default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Worker connections served at once
    #[arg(long, default_value_t = DEFAULT_MAX_CHANNELS)]
    pub max_channels: usize,
}

impl From<CoordinatorOpts> for JobConfig {
    fn from(opts: CoordinatorOpts) -> Self {
        JobConfig {
            inputs: opts.files,
            n_reduce: opts.n_reduce,
            task_timeout: Duration::from_millis(opts.timeout_ms),
            addr: opts.addr,
            max_channels: opts.max_channels,
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Run a map-reduce worker")]
pub struct WorkerOpts {
    /// Coordinator address
    #[arg(short, long, default_value_t = default_addr())]
    pub server: SocketAddr,

    /// Directory for intermediate and output files
    #[arg(short = 'd', long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Milliseconds to sleep when no task is ready
    #[arg(short, long, default_value_t = 1_000)]
    pub wait_ms: u64,
}

impl From<WorkerOpts> for WorkerConfig {
    fn from(opts: WorkerOpts) -> Self {
        WorkerConfig {
            server: opts.server,
            work_dir: opts.work_dir,
            wait_interval: Duration::from_millis(opts.wait_ms),
        }
    }
}
