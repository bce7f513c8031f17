use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mr::config::WorkerConfig;
use mr::coordinator::{self, Coordinator};
use mr::partition::bucket;
use mr::rpc::RpcClient;
use mr::storage::output_path;
use mr::{TaskAssignment, TaskKind, TaskStatus, Worker};
use tarpc::{client, context, tokio_serde::formats::Json};
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

fn map_function(_key: String, value: String) -> Vec<(String, String)> {
    value
        .split_whitespace()
        .map(|word| (word.to_string(), "1".to_owned()))
        .collect()
}

fn reduce_function(_key: String, values: Vec<String>) -> String {
    let mut count = 0;
    for item in values {
        count += item.parse::<i32>().unwrap();
    }
    count.to_string()
}

fn write_inputs(dir: &Path, texts: &[&str]) -> Vec<PathBuf> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let path = dir.join(format!("input-{}.txt", i));
            fs::write(&path, text).unwrap();
            path
        })
        .collect()
}

async fn start_coordinator(inputs: Vec<PathBuf>, n_reduce: usize, task_timeout: Duration) -> (Coordinator, SocketAddr) {
    let coordinator = Coordinator::new(inputs, n_reduce, task_timeout).unwrap();
    let any_port: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let addr = coordinator::serve(coordinator.clone(), any_port, 16)
        .await
        .unwrap();
    (coordinator, addr)
}

fn spawn_worker(addr: SocketAddr, work_dir: &Path) -> tokio::task::JoinHandle<mr::Result<()>> {
    let config = WorkerConfig {
        server: addr,
        work_dir: work_dir.to_path_buf(),
        wait_interval: Duration::from_millis(50),
    };
    tokio::spawn(async move {
        let mut worker = Worker::with_config(config, map_function, reduce_function);
        worker.start().await?;
        worker.run().await
    })
}

async fn wait_done(coordinator: &Coordinator) {
    timeout(Duration::from_secs(30), async {
        while !coordinator.done().await {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("job did not finish");
}

// key -> (value, reduce file it was found in)
fn collect_output(dir: &Path, n_reduce: usize) -> HashMap<String, (String, usize)> {
    let mut result = HashMap::new();
    for r in 0..n_reduce {
        let contents = fs::read_to_string(output_path(dir, r)).unwrap();
        let keys: Vec<&str> = contents.lines().map(|l| l.split(' ').next().unwrap()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted, "keys in mr-out-{} are not ascending", r);

        for line in contents.lines() {
            let kv: Vec<&str> = line.split(' ').collect();
            assert_eq!(kv.len(), 2);
            let previous = result.insert(kv[0].to_owned(), (kv[1].to_owned(), r));
            assert!(previous.is_none(), "{} appears in more than one output", kv[0]);
        }
    }
    result
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_word_count() {
    let dir = TempDir::new().unwrap();
    let inputs = write_inputs(dir.path(), &["the cat sat", "the dog ran"]);
    let (coordinator, addr) = start_coordinator(inputs, 2, Duration::from_secs(10)).await;

    let workers: Vec<_> = (0..3).map(|_| spawn_worker(addr, dir.path())).collect();
    wait_done(&coordinator).await;
    for worker in workers {
        worker.await.unwrap().unwrap();
    }

    let result = collect_output(dir.path(), 2);
    let expected = [("cat", "1"), ("dog", "1"), ("ran", "1"), ("sat", "1"), ("the", "2")];
    assert_eq!(result.len(), expected.len());
    for (word, count) in expected {
        let (value, file) = &result[word];
        assert_eq!(value, count);
        assert_eq!(*file, bucket(word, 2));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_matches_sequential_run() {
    let dir = TempDir::new().unwrap();
    let texts = [
        "a b c d e f g",
        "a a a b b",
        "",
        "z y x w v u t s r q",
        "the quick brown fox jumps over the lazy dog",
    ];
    let inputs = write_inputs(dir.path(), &texts);
    let (coordinator, addr) = start_coordinator(inputs, 5, Duration::from_secs(10)).await;

    let workers: Vec<_> = (0..4).map(|_| spawn_worker(addr, dir.path())).collect();
    wait_done(&coordinator).await;
    for worker in workers {
        worker.await.unwrap().unwrap();
    }

    let mut sequential = HashMap::<String, Vec<String>>::new();
    for (i, text) in texts.iter().enumerate() {
        for (k, v) in map_function(i.to_string(), text.to_string()) {
            sequential.entry(k).or_default().push(v);
        }
    }

    let result = collect_output(dir.path(), 5);
    assert_eq!(result.len(), sequential.len());
    for (k, vs) in sequential {
        assert_eq!(result[&k].0, reduce_function(k.clone(), vs));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_crashed_worker_task_is_reassigned() {
    let dir = TempDir::new().unwrap();
    let inputs = write_inputs(dir.path(), &["the cat sat", "the dog ran"]);
    let (coordinator, addr) = start_coordinator(inputs, 2, Duration::from_millis(300)).await;

    // takes the first map task and never reports it
    let transport = tarpc::serde_transport::tcp::connect(addr, Json::default)
        .await
        .unwrap();
    let straggler = RpcClient::new(client::Config::default(), transport).spawn();
    let stuck = straggler.get_task(context::current()).await.unwrap();
    let attempt = match stuck {
        TaskAssignment::Map { index: 0, attempt, .. } => attempt,
        other => panic!("expected map task 0, got {:?}", other),
    };

    let worker = spawn_worker(addr, dir.path());
    wait_done(&coordinator).await;
    worker.await.unwrap().unwrap();

    let (status, latest) = coordinator.task_status(TaskKind::Map, 0).await.unwrap();
    assert_eq!(status, TaskStatus::Completed);
    assert!(latest > attempt);

    // the late report changes nothing
    straggler
        .task_done(context::current(), TaskKind::Map, 0, attempt)
        .await
        .unwrap();
    assert_eq!(
        coordinator.task_status(TaskKind::Map, 0).await,
        Some((TaskStatus::Completed, latest))
    );
    assert!(straggler.done(context::current()).await.unwrap());
    assert_eq!(
        straggler.get_task(context::current()).await.unwrap(),
        TaskAssignment::Exit
    );

    let result = collect_output(dir.path(), 2);
    assert_eq!(result["the"].0, "2");
    assert_eq!(result.len(), 5);
}
