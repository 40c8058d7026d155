//! Network endpoints and background services.

use super::UnlocalizedString;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

pub type EndpointCallback = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Named request handlers for the host's communication interface
#[derive(Default)]
pub struct NetworkEndpoints {
    endpoints: Vec<(String, EndpointCallback)>,
}

impl NetworkEndpoints {
    pub fn register(
        &mut self,
        endpoint: impl Into<String>,
        callback: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) {
        self.endpoints.push((endpoint.into(), Arc::new(callback)));
    }

    /// Call the endpoint registered as `endpoint`, `None` if there is none
    #[must_use]
    pub fn call(&self, endpoint: &str, data: &Value) -> Option<Value> {
        let (_, callback) = self.endpoints.iter().find(|(name, _)| name == endpoint)?;
        debug!("Calling network endpoint '{}'", endpoint);
        Some(callback(data))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.endpoints.iter().map(|(name, _)| name.as_str())
    }

    pub fn clear(&mut self) {
        self.endpoints.clear();
    }
}

pub type ServiceCallback = Arc<dyn Fn() + Send + Sync>;

struct Service {
    unlocalized_name: UnlocalizedString,
    callback: ServiceCallback,
    worker: Option<JoinHandle<()>>,
}

/// Repeating callbacks run on worker threads once boot has finished
#[derive(Default)]
pub struct BackgroundServices {
    services: Vec<Service>,
    stop: Arc<AtomicBool>,
}

impl BackgroundServices {
    pub fn register(
        &mut self,
        unlocalized_name: impl Into<UnlocalizedString>,
        callback: impl Fn() + Send + Sync + 'static,
    ) {
        self.services.push(Service {
            unlocalized_name: unlocalized_name.into(),
            callback: Arc::new(callback),
            worker: None,
        });
    }

    /// Start one worker per service that is not running yet. Each worker calls
    /// its callback, then sleeps `interval`, until [`stop_all`](Self::stop_all).
    pub fn start_all(&mut self, interval: Duration) -> usize {
        self.stop.store(false, Ordering::SeqCst);
        let mut started = 0;

        for service in self.services.iter_mut().filter(|service| service.worker.is_none()) {
            let stop = self.stop.clone();
            let callback = service.callback.clone();
            let name = service.unlocalized_name.to_string();

            let spawned = thread::Builder::new()
                .name(format!("service:{name}"))
                .spawn(move || {
                    while !stop.load(Ordering::SeqCst) {
                        callback();
                        thread::sleep(interval);
                    }
                });

            match spawned {
                Ok(handle) => {
                    info!("Started background service '{}'", name);
                    service.worker = Some(handle);
                    started += 1;
                }
                Err(err) => error!("Failed to start background service '{}': {}", name, err),
            }
        }

        started
    }

    /// Signal every worker to stop and wait for them
    pub fn stop_all(&mut self) {
        self.stop.store(true, Ordering::SeqCst);

        for service in &mut self.services {
            if let Some(worker) = service.worker.take() {
                if worker.join().is_err() {
                    error!("Background service '{}' panicked", service.unlocalized_name);
                }
            }
        }
    }

    #[must_use]
    pub fn running(&self) -> usize {
        self.services.iter().filter(|service| service.worker.is_some()).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Stops running workers before dropping the services
    pub fn clear(&mut self) {
        self.stop_all();
        self.services.clear();
    }
}

impl Drop for BackgroundServices {
    fn drop(&mut self) {
        self.stop_all();
    }
}
