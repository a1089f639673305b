use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::SimulationConfig;
use crate::error::{MeshError, MeshResult};
use crate::runtime::{
    FeedbackMonitor, FeedbackReport, MeshScheduler, MeshSnapshot, MeshSource, OscillatorRunner,
    OscillatorSnapshot, SharedMesh, SharedOscillator, ShutdownSignal,
};
use crate::simulation::{OscillatorState, Resonator};

/// Application state: shared simulation state plus the three background loops
pub struct App {
    mesh: Arc<SharedMesh>,
    oscillator: Arc<SharedOscillator>,
    monitor: Arc<FeedbackMonitor>,
    shutdown: ShutdownSignal,
    workers: Vec<(&'static str, JoinHandle<()>)>,
}

impl App {
    /// Validate `config`, build the shared state and start every loop.
    /// The monitor observes this instance's own mesh.
    pub fn start(config: SimulationConfig) -> MeshResult<Self> {
        Self::start_inner(config, None)
    }

    /// Same as [`App::start`], but the monitor observes `source` instead
    pub fn start_with_source(config: SimulationConfig, source: Arc<dyn MeshSource>) -> MeshResult<Self> {
        Self::start_inner(config, Some(source))
    }

    fn start_inner(config: SimulationConfig, source: Option<Arc<dyn MeshSource>>) -> MeshResult<Self> {
        config.validate()?;

        log::info!("Initializing resonant mesh simulation...");
        log::info!("Grid size: {}x{}", config.mesh.rows, config.mesh.cols);
        log::info!(
            "Resonator: T={} R={} lambda={} nm, damping {}",
            config.resonator.transmission,
            config.resonator.reflection,
            config.resonator.lambda_nm,
            config.resonator.damping
        );

        let mesh = Arc::new(SharedMesh::from_config(&config)?);
        let oscillator = Arc::new(SharedOscillator::new(OscillatorState::initial(
            config.oscillator.z_target,
        )));
        let runner = OscillatorRunner::new(Arc::clone(&oscillator), &config.oscillator)?;
        let source = source.unwrap_or_else(|| Arc::clone(&mesh) as Arc<dyn MeshSource>);
        let monitor = Arc::new(FeedbackMonitor::new(source, config.monitor.clone()));

        let mut app = Self {
            mesh,
            oscillator,
            monitor,
            shutdown: ShutdownSignal::new(),
            workers: Vec::with_capacity(3),
        };

        // On a spawn failure `app` is dropped, which stops what already runs.
        let scheduler = MeshScheduler::new(Arc::clone(&app.mesh), config.mesh.update_interval());
        app.spawn("mesh-scheduler", move |shutdown| {
            scheduler.run(&shutdown);
        })?;

        app.spawn("oscillator", move |shutdown| {
            runner.run(&shutdown);
        })?;

        let monitor = Arc::clone(&app.monitor);
        app.spawn("feedback-monitor", move |shutdown| {
            monitor.run(&shutdown);
        })?;

        log::info!("Initialization complete!");
        Ok(app)
    }

    fn spawn<F>(&mut self, name: &'static str, body: F) -> MeshResult<()>
    where
        F: FnOnce(ShutdownSignal) + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || body(shutdown))
            .map_err(|source| MeshError::Spawn { name, source })?;
        self.workers.push((name, handle));
        Ok(())
    }

    pub fn read_mesh(&self) -> MeshSnapshot {
        self.mesh.read_mesh()
    }

    pub fn read_oscillator(&self) -> OscillatorSnapshot {
        self.oscillator.read_oscillator()
    }

    pub fn adjust_coefficients(&self, transmission: f64, reflection: f64) -> MeshResult<Resonator> {
        self.mesh.adjust_coefficients(transmission, reflection)
    }

    pub fn latest_report(&self) -> Option<FeedbackReport> {
        self.monitor.latest_report()
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Stop every loop and wait for them to exit
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        log::info!("Shutting down...");
        self.shutdown.trigger();
        for (name, handle) in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("{} thread panicked", name);
            }
        }
        log::info!("All loops stopped");
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.stop();
    }
}
