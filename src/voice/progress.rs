use std::sync::{Arc, Mutex};

/// Download/load progress reported by the on-device model provider.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ProgressEvent {
    /// Always `"progress"`; kept so listeners can match on a stable tag.
    pub status: &'static str,
    pub file: String,
    /// Percentage in `[0, 100]`; `None` when the total size is unknown.
    pub progress: Option<f64>,
    pub loaded: u64,
    pub total: Option<u64>,
}

type Listener = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Multicast fan-out of progress events. Late subscribers miss earlier events.
#[derive(Clone, Default)]
pub struct ProgressHub {
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&ProgressEvent) + Send + Sync + 'static) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(Arc::new(listener));
        }
    }

    pub fn emit(&self, event: &ProgressEvent) {
        // Snapshot so listeners may subscribe re-entrantly.
        let listeners: Vec<Listener> = match self.listeners.lock() {
            Ok(l) => l.clone(),
            Err(_) => return,
        };
        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for ProgressHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
