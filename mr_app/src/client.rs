use clap::Parser;
use mr::config::{WorkerConfig, WorkerOpts};
use mr::worker::Worker;
use tracing_subscriber::EnvFilter;

fn map_function(_key: String, value: String) -> Vec<(String, String)> {
    value
        .split(|c: char| !c.is_alphabetic())
        .filter(|word| !word.is_empty())
        .map(|word| (word.to_string(), "1".to_owned()))
        .collect()
}

fn reduce_function(_key: String, values: Vec<String>) -> String {
    let count: u64 = values
        .iter()
        .map(|item| item.parse::<u64>().unwrap_or(0))
        .sum();
    count.to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = WorkerConfig::from(WorkerOpts::parse());
    let mut worker = Worker::with_config(config, map_function, reduce_function);
    worker.start().await?;
    tracing::info!("worker started: {}", worker);
    worker.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_functions() {
        let pairs = map_function("a.txt".into(), "The cat, the hat.".into());
        let words: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(words, vec!["The", "cat", "the", "hat"]);
        assert_eq!(reduce_function("the".into(), vec!["1".into(), "1".into()]), "2");
    }
}
