use tokio::sync::broadcast;

pub trait Shutdown {
    fn subscribe(&self) -> broadcast::Receiver<()>;
}

/// Process-wide stop signal for long-running tasks such as the HTTP server.
#[derive(Clone)]
pub struct ShutdownChannel {
    shutdown: broadcast::Sender<()>,
}

impl Default for ShutdownChannel {
    fn default() -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self { shutdown }
    }
}

impl ShutdownChannel {
    /// Notifies every subscriber. Calling it with nobody listening is not an error.
    pub fn trigger(&self) {
        if self.shutdown.send(()).is_err() {
            tracing::debug!("Shutdown triggered with no active subscribers");
        }
    }

    /// Resolves once `trigger` is called, for use with graceful server shutdown.
    pub fn signalled(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut receiver = self.subscribe();
        async move {
            let _ = receiver.recv().await;
        }
    }
}

impl Shutdown for ShutdownChannel {
    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }
}
