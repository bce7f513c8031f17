use crate::config::WorkerConfig;
use crate::error::{MrError, Result};
use crate::partition::{bucket, group_by_key};
use crate::rpc::RpcClient;
use crate::storage::{self, AtomicWriter};
use crate::task::{TaskAssignment, TaskKind};
use std::fs;
use std::path::{Path, PathBuf};
use tarpc::{client, context, tokio_serde::formats::Json};
use tokio::time::sleep;
use tracing::{debug, info};

/// Executes tasks handed out by the coordinator. Holds no scheduling state
/// between calls; everything it needs arrives in the assignment.
pub struct Worker {
    config: WorkerConfig,
    client: Option<RpcClient>,
    map_fn: MapFn,
    reduce_fn: ReduceFn,
}

/// `(input file name, file contents) -> key/value pairs`
pub type MapFn = fn(String, String) -> Vec<(String, String)>;
/// `(key, every value for that key) -> reduced value`
pub type ReduceFn = fn(String, Vec<String>) -> String;

impl std::fmt::Display for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Worker {{ server: {}, work_dir: {}, connected: {} }}",
            self.config.server,
            self.config.work_dir.display(),
            self.client.is_some()
        )
    }
}

impl Worker {
    pub fn new(map_fn: MapFn, reduce_fn: ReduceFn) -> Self {
        Self::with_config(WorkerConfig::default(), map_fn, reduce_fn)
    }

    pub fn with_config(config: WorkerConfig, map_fn: MapFn, reduce_fn: ReduceFn) -> Self {
        Worker {
            config,
            client: None,
            map_fn,
            reduce_fn,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        if self.client.is_some() {
            // already have a client running
            return Ok(());
        }

        let mut transport =
            tarpc::serde_transport::tcp::connect(&self.config.server, Json::default);
        transport.config_mut().max_frame_length(usize::MAX);

        let client = RpcClient::new(client::Config::default(), transport.await?).spawn();
        self.client = Some(client);
        info!(server = %self.config.server, "connected to coordinator");
        Ok(())
    }

    /// Reads one input file and splits the map output into `n_reduce`
    /// intermediate files. All buckets are written, empty or not.
    pub fn do_map(&self, input: &Path, index: usize, n_reduce: usize) -> Result<Vec<PathBuf>> {
        if n_reduce == 0 {
            return Err(MrError::InvalidConfig("reduce count must be non-zero".into()));
        }
        // bytes that are not utf-8 are replaced, only an unreadable file fails
        let bytes = fs::read(input)?;
        let contents = String::from_utf8_lossy(&bytes).into_owned();
        let pairs = (self.map_fn)(input.display().to_string(), contents);

        let mut writers = (0..n_reduce)
            .map(|b| AtomicWriter::create(storage::intermediate_path(&self.config.work_dir, index, b)))
            .collect::<Result<Vec<_>>>()?;
        for (key, value) in &pairs {
            writers[bucket(key, n_reduce)].write_record(key, value)?;
        }
        debug!(index, records = pairs.len(), "map output partitioned");

        writers.into_iter().map(AtomicWriter::commit).collect()
    }

    /// Merges every intermediate file of bucket `index` into one sorted output file.
    pub fn do_reduce(&self, index: usize) -> Result<PathBuf> {
        let mut records = Vec::new();
        let inputs = storage::find_intermediate(&self.config.work_dir, index)?;
        for file in &inputs {
            records.extend(storage::read_intermediate(file)?);
        }
        debug!(index, files = inputs.len(), records = records.len(), "reduce input loaded");

        let mut writer = AtomicWriter::create(storage::output_path(&self.config.work_dir, index))?;
        for (key, values) in group_by_key(records) {
            let value = (self.reduce_fn)(key.clone(), values);
            writer.write_line(&key, &value)?;
        }
        writer.commit()
    }

    /// Requests tasks until the coordinator says to exit or can no longer be
    /// reached. A local I/O failure ends the loop with an error and nothing
    /// is reported; the coordinator's timeout takes care of the task.
    pub async fn run(&self) -> Result<()> {
        let client = self.client.as_ref().ok_or(MrError::NotConnected)?;
        loop {
            let assignment = match client.get_task(context::current()).await {
                Ok(assignment) => assignment,
                Err(e) => {
                    info!(error = %e, "coordinator unreachable, exiting");
                    return Ok(());
                }
            };

            let (kind, index, attempt) = match assignment {
                TaskAssignment::Map {
                    index,
                    attempt,
                    input,
                    n_reduce,
                } => {
                    info!(index, attempt, input = %input.display(), "running map task");
                    self.do_map(&input, index, n_reduce)?;
                    (TaskKind::Map, index, attempt)
                }
                TaskAssignment::Reduce { index, attempt } => {
                    info!(index, attempt, "running reduce task");
                    self.do_reduce(index)?;
                    (TaskKind::Reduce, index, attempt)
                }
                TaskAssignment::Wait => {
                    sleep(self.config.wait_interval).await;
                    continue;
                }
                TaskAssignment::Exit => {
                    info!("job finished, exiting");
                    return Ok(());
                }
            };

            if let Err(e) = client
                .task_done(context::current(), kind, index, attempt)
                .await
            {
                info!(error = %e, "coordinator unreachable, exiting");
                return Ok(());
            }
        }
    }
}
