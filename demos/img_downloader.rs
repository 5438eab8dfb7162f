use std::path::PathBuf;
use tqwp::prelude::*;

/// Downloads one URL into the output folder. Any non-200 answer is a failure.
struct FileDownloadTask {
    id: usize,
    url: String,
    path: PathBuf,
    client: reqwest::Client,
    retry: RetryState,
}

#[async_trait]
impl Task for FileDownloadTask {
    async fn process(&mut self) -> TaskResult {
        let response = self.client.get(&self.url).send().await.map_err(|err| {
            TaskError::with_source(format!("failed to download {}", self.url), err)
        })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(TaskError::new(format!(
                "failed to download {}: {}",
                self.url, status
            )));
        }

        let body = response.bytes().await.map_err(|err| {
            TaskError::with_source(format!("failed to read body of {}", self.url), err)
        })?;
        tokio::fs::write(&self.path, &body).await?;

        println!(
            "File {} downloaded and saved: {} ({} bytes)",
            self.id,
            self.path.display(),
            body.len()
        );
        Ok(())
    }

    fn task_type(&self) -> &'static str {
        "file_download"
    }

    fn retry_state(&mut self) -> Option<&mut dyn Retryable> {
        Some(&mut self.retry)
    }
}

const URLS: &[&str] = &[
    "https://www.rust-lang.org/static/images/rust-logo-blk.svg",
    "https://docs.rs/-/static/favicon.ico",
    "https://crates.io/assets/cargo.png",
    // Answers 404 and exhausts its retries
    "https://www.rust-lang.org/static/images/does-not-exist.png",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = PoolConfig::default()
        .with_workers(3)
        .with_max_retries(2)
        .with_capacity(10);
    init_tracing(&config.logging);

    let downloads = std::env::temp_dir().join("tqwp-downloads");
    tokio::fs::create_dir_all(&downloads).await?;

    let pool = WorkerPool::builder(config)
        .logger(ConsoleLogger::stdout())
        .build()?;
    pool.start().await?;

    let client = reqwest::Client::new();
    for (i, url) in URLS.iter().enumerate() {
        let name = url.rsplit('/').next().unwrap_or("download");
        pool.enqueue_task(FileDownloadTask {
            id: i + 1,
            url: url.to_string(),
            path: downloads.join(format!("file{}_{}", i + 1, name)),
            client: client.clone(),
            retry: RetryState::new(),
        })
        .await?;
    }

    pool.stop().await?;
    println!("{}", pool.summary()?);
    Ok(())
}
