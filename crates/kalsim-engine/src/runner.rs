use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use kalsim_models::SimulationLog;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::EngineError;
use crate::simulation::{Simulation, SimulationStatus};

struct ActiveRun {
    cancel: CancellationToken,
    status: Arc<Mutex<SimulationStatus>>,
    task: Option<JoinHandle<Result<SimulationLog, EngineError>>>,
}

/// Runs at most one simulation at a time in a background task.
#[derive(Default)]
pub struct SimulationRunner {
    running: Arc<Mutex<bool>>,
    current: Mutex<Option<ActiveRun>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the running flag when the run task ends, including by panic.
struct RunningGuard(Arc<Mutex<bool>>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        *lock(&self.0) = false;
    }
}

impl SimulationRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        *lock(&self.running)
    }

    /// Spawn `simulation`. Fails with `AlreadyRunning` while another run is active.
    pub fn start(&self, mut simulation: Simulation) -> Result<(), EngineError> {
        {
            let mut running = lock(&self.running);
            if *running {
                return Err(EngineError::AlreadyRunning);
            }
            *running = true;
        }

        let cancel = simulation.cancel_token();
        let status = simulation.status_handle();
        let guard = RunningGuard(Arc::clone(&self.running));
        let task = tokio::spawn(async move {
            let _guard = guard;
            simulation.run().await
        });

        *lock(&self.current) = Some(ActiveRun {
            cancel,
            status,
            task: Some(task),
        });
        info!("Simulation started");
        Ok(())
    }

    /// Ask the active run to stop at its next step boundary.
    pub fn stop(&self) -> Result<(), EngineError> {
        if !self.is_running() {
            return Err(EngineError::NotRunning);
        }
        if let Some(run) = lock(&self.current).as_ref() {
            run.cancel.cancel();
            info!("Simulation stop requested");
        }
        Ok(())
    }

    /// Status of the active or most recent run.
    pub fn status(&self) -> Option<SimulationStatus> {
        lock(&self.current)
            .as_ref()
            .map(|run| lock(&run.status).clone())
    }

    /// Wait for the active run to finish and return its log.
    pub async fn wait(&self) -> Result<SimulationLog, EngineError> {
        let task = lock(&self.current)
            .as_mut()
            .and_then(|run| run.task.take())
            .ok_or(EngineError::NotRunning)?;
        task.await
            .map_err(|e| EngineError::Task(e.to_string()))?
    }
}

impl std::fmt::Debug for SimulationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationRunner")
            .field("running", &self.is_running())
            .finish()
    }
}
