use rand::Rng;
use tqwp::prelude::*;

const TASKS: usize = 10_000;

/// Divides a number by a random divisor that is zero half of the time.
struct Division {
    number: u32,
    retry: RetryState,
}

#[async_trait]
impl Task for Division {
    async fn process(&mut self) -> TaskResult {
        let divisor: u32 = rand::rng().random_range(0..2);
        self.number = self
            .number
            .checked_div(divisor)
            .ok_or_else(|| TaskError::new("division by zero"))?;
        Ok(())
    }

    fn task_type(&self) -> &'static str {
        "division"
    }

    fn retry_state(&mut self) -> Option<&mut dyn Retryable> {
        Some(&mut self.retry)
    }
}

/// Queues every task up front, then lets three workers drain them.
#[tokio::main]
async fn main() -> PoolResult<()> {
    let config = PoolConfig::default()
        .with_workers(3)
        .with_max_retries(3)
        .with_capacity(TASKS);
    let pool = WorkerPool::builder(config).logger(NoopLogger).build()?;

    let mut rng = rand::rng();
    for _ in 0..TASKS {
        pool.enqueue_task(Division {
            number: rng.random_range(0..1000),
            retry: RetryState::new(),
        })
        .await?;
    }

    pool.start().await?;
    pool.stop().await?;

    let summary = pool.summary()?;
    ConsoleLogger::stdout().tagged(
        "[SUMMARY]",
        &format!(
            "\n- Processed {} Tasks\n- {} Success\n- {} Failed\n- {} Retries\n- Process took {:?}",
            summary.processed, summary.succeeded, summary.failed, summary.retried, summary.elapsed
        ),
    );
    Ok(())
}
