use rand::Rng;
use serde_json::{Value, json};
use std::time::Duration;
use tqwp::prelude::*;

/// Divides its payload by a random divisor that is zero half of the time.
struct DivideTask {
    id: u32,
    data: Value,
    retry: RetryState,
}

impl DivideTask {
    fn new(id: u32, data: Value) -> Self {
        Self {
            id,
            data,
            retry: RetryState::new(),
        }
    }
}

#[async_trait]
impl Task for DivideTask {
    async fn process(&mut self) -> TaskResult {
        let num = self
            .data
            .as_i64()
            .ok_or_else(|| TaskError::new(format!("task {}: invalid type", self.id)))?;

        let divisor: i64 = rand::rng().random_range(0..2);
        if divisor == 0 {
            return Err(TaskError::new(format!("task {}: division by zero", self.id)));
        }

        self.data = json!(num / divisor);
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(())
    }

    fn task_type(&self) -> &'static str {
        "divide"
    }

    fn retry_state(&mut self) -> Option<&mut dyn Retryable> {
        Some(&mut self.retry)
    }
}

#[tokio::main]
async fn main() -> PoolResult<()> {
    let config = PoolConfig::default().with_workers(10).with_max_retries(3);
    init_tracing(&config.logging);

    let pool = WorkerPool::builder(config)
        .logger(ConsoleLogger::stdout())
        .build()?;

    // Tasks may be queued before the workers exist
    let mut rng = rand::rng();
    pool.enqueue_task(DivideTask::new(111_111, json!(rng.random_range(0..1000))))
        .await?;
    pool.enqueue_task(DivideTask::new(123_124, json!(rng.random_range(0..1000))))
        .await?;
    // Never succeeds: not an integer
    pool.enqueue_task(DivideTask::new(999_999, json!("forty-two")))
        .await?;

    pool.start().await?;

    for id in 1..=1000 {
        let data = json!(rng.random_range(0..1000));
        pool.enqueue_task(DivideTask::new(id, data)).await?;
    }

    pool.stop().await?;
    let summary = pool.summary()?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
