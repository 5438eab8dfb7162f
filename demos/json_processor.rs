use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tqwp::prelude::*;

/// Input record
#[derive(Debug, Serialize, Deserialize)]
struct UserData {
    id: u32,
    name: String,
    email: String,
    created_at: String,
}

/// Output record derived from a [`UserData`]
#[derive(Debug, Serialize)]
struct ProcessedUserData {
    id: u32,
    full_name: String,
    email_domain: String,
    account_age: String,
    processed_at: String,
}

/// Reads one user file, derives a few fields and writes the result.
struct JsonProcessTask {
    input: PathBuf,
    output: PathBuf,
    retry: RetryState,
}

impl JsonProcessTask {
    fn transform(user: UserData) -> Result<ProcessedUserData, TaskError> {
        let created = NaiveDate::parse_from_str(&user.created_at, "%Y-%m-%d").map_err(|err| {
            TaskError::with_source(format!("bad created_at {:?}", user.created_at), err)
        })?;
        let email_domain = user
            .email
            .split_once('@')
            .map(|(_, domain)| domain.to_string())
            .ok_or_else(|| TaskError::new(format!("bad email {:?}", user.email)))?;

        let now = Local::now();
        let age_days = (now.date_naive() - created).num_days();

        Ok(ProcessedUserData {
            id: user.id,
            full_name: user.name,
            email_domain,
            account_age: format!("{age_days} days"),
            processed_at: now.to_rfc3339(),
        })
    }
}

#[async_trait]
impl Task for JsonProcessTask {
    async fn process(&mut self) -> TaskResult {
        let data = tokio::fs::read(&self.input).await?;
        let user: UserData = serde_json::from_slice(&data)?;
        let processed = Self::transform(user)?;

        if let Some(dir) = self.output.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&self.output, serde_json::to_vec_pretty(&processed)?).await?;
        Ok(())
    }

    fn task_type(&self) -> &'static str {
        "json_process"
    }

    fn retry_state(&mut self) -> Option<&mut dyn Retryable> {
        Some(&mut self.retry)
    }
}

async fn create_sample_files(dir: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;

    let users = [
        ("John Doe", "john@example.com", "2022-01-15"),
        ("Jane Smith", "jane@company.com", "2023-06-20"),
        ("Bob Wilson", "bob@domain.com", "2021-11-30"),
        ("No Domain", "nobody", "2020-02-02"),
    ];

    for (i, (name, email, created_at)) in users.into_iter().enumerate() {
        let user = UserData {
            id: i as u32 + 1,
            name: name.to_string(),
            email: email.to_string(),
            created_at: created_at.to_string(),
        };
        let path = dir.join(format!("user_{}.json", i + 1));
        tokio::fs::write(path, serde_json::to_vec_pretty(&user)?).await?;
    }

    // Not valid JSON at all
    tokio::fs::write(dir.join("user_broken.json"), b"{ \"id\": ").await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = PoolConfig::default()
        .with_workers(4)
        .with_max_retries(2)
        .with_capacity(100);
    init_tracing(&config.logging);

    let root = std::env::temp_dir().join("tqwp-json-processor");
    let input_dir = root.join("input");
    let output_dir = root.join("output");
    create_sample_files(&input_dir).await?;

    let pool = WorkerPool::builder(config)
        .logger(ConsoleLogger::stdout())
        .build()?;
    pool.start().await?;

    let mut entries = tokio::fs::read_dir(&input_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            let name = entry.file_name().to_string_lossy().into_owned();
            pool.enqueue_task(JsonProcessTask {
                input: path,
                output: output_dir.join(format!("processed_{name}")),
                retry: RetryState::new(),
            })
            .await?;
        }
    }

    pool.stop().await?;
    let summary = pool.summary()?;
    println!(
        "{} of {} file(s) written to {}",
        summary.succeeded,
        summary.processed,
        output_dir.display()
    );
    Ok(())
}
