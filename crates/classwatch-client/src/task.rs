use tokio::task::JoinHandle;

/// Owns a spawned background loop and aborts it when dropped.
/// Dropping is the only way pollers and socket tasks are stopped.
#[derive(Debug)]
pub struct BackgroundTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    pub fn new(name: &'static str, handle: JoinHandle<()>) -> Self {
        Self { name, handle }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        tracing::debug!(task = self.name, "stopping background task");
        self.handle.abort();
    }
}
