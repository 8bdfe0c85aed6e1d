use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{error, info, warn};

use crate::{
    application::interfaces::sync_runner::SyncRunner,
    domain::value_objects::enums::background_fetch_results::BackgroundFetchResult,
};

/// Shortest period the host platform honours for a background fetch task.
pub const MIN_BACKGROUND_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundTaskConfig {
    pub name: String,
    pub interval: Duration,
}

pub struct BackgroundScheduler {
    runner: Arc<dyn SyncRunner + Send + Sync>,
    min_interval: Duration,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl BackgroundScheduler {
    pub fn new(runner: Arc<dyn SyncRunner + Send + Sync>) -> Self {
        Self::with_min_interval(runner, MIN_BACKGROUND_INTERVAL)
    }

    pub fn with_min_interval(runner: Arc<dyn SyncRunner + Send + Sync>, min_interval: Duration) -> Self {
        Self {
            runner,
            min_interval,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a periodic wake-up. Returns false when a task with the same
    /// name is already registered; the existing task keeps running untouched.
    pub fn register(&self, config: BackgroundTaskConfig) -> bool {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if tasks.get(&config.name).is_some_and(|task| !task.is_finished()) {
            info!(task = %config.name, "background_sync: task already registered");
            return false;
        }

        let interval = config.interval.max(self.min_interval);
        if interval != config.interval {
            warn!(
                task = %config.name,
                requested_secs = config.interval.as_secs(),
                interval_secs = interval.as_secs(),
                "background_sync: interval raised to platform minimum"
            );
        }

        let runner = Arc::clone(&self.runner);
        let name = config.name.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                run_pass(runner.as_ref(), &name).await;
            }
        });

        info!(task = %config.name, interval_secs = interval.as_secs(), "background_sync: task registered");
        tasks.insert(config.name, handle);
        true
    }

    pub fn unregister(&self, name: &str) -> bool {
        let removed = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);

        match removed {
            Some(handle) => {
                handle.abort();
                info!(task = %name, "background_sync: task unregistered");
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .is_some_and(|task| !task.is_finished())
    }

    /// One wake-up as the host platform would fire it.
    pub async fn run_once(&self, name: &str) -> BackgroundFetchResult {
        run_pass(self.runner.as_ref(), name).await
    }
}

impl Drop for BackgroundScheduler {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }
}

async fn run_pass(runner: &(dyn SyncRunner + Send + Sync), name: &str) -> BackgroundFetchResult {
    let pass = runner.sync_all_pending().await;
    let result = pass.to_background_result();
    match result {
        BackgroundFetchResult::Failed => {
            error!(task = %name, %result, ?pass, "background_sync: pass finished with failures")
        }
        _ => info!(task = %name, %result, ?pass, "background_sync: pass finished"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::interfaces::sync_runner::MockSyncRunner,
        domain::value_objects::sync_results::{BatchSummary, SyncPassResult},
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn task(name: &str, interval: Duration) -> BackgroundTaskConfig {
        BackgroundTaskConfig {
            name: name.to_string(),
            interval,
        }
    }

    #[tokio::test]
    async fn registering_twice_is_a_no_op() {
        let scheduler = BackgroundScheduler::new(Arc::new(MockSyncRunner::new()));

        assert!(scheduler.register(task("delivery-background-sync", Duration::from_secs(60))));
        assert!(!scheduler.register(task("delivery-background-sync", Duration::from_secs(60))));
        assert!(scheduler.is_registered("delivery-background-sync"));

        assert!(scheduler.unregister("delivery-background-sync"));
        assert!(!scheduler.is_registered("delivery-background-sync"));
        assert!(!scheduler.unregister("delivery-background-sync"));
    }

    #[tokio::test]
    async fn run_once_maps_the_pass_to_the_host_contract() {
        let mut runner = MockSyncRunner::new();
        runner.expect_sync_all_pending().times(1).returning(|| {
            SyncPassResult::Completed(BatchSummary {
                failed: 2,
                ..Default::default()
            })
        });
        let scheduler = BackgroundScheduler::new(Arc::new(runner));

        assert_eq!(
            scheduler.run_once("delivery-background-sync").await,
            BackgroundFetchResult::Failed
        );
    }

    #[tokio::test]
    async fn registered_task_fires_on_its_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut runner = MockSyncRunner::new();
        runner.expect_sync_all_pending().returning({
            let calls = Arc::clone(&calls);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                SyncPassResult::Busy
            }
        });
        let scheduler =
            BackgroundScheduler::with_min_interval(Arc::new(runner), Duration::from_millis(10));

        scheduler.register(task("fast", Duration::from_millis(10)));
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(scheduler.unregister("fast"));
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }
}
