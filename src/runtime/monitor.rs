//! Periodic observer of the mesh that flags high-amplitude cells.
//!
//! The monitor never mutates simulation state. It publishes a report per
//! successful cycle; acting on the alerts is left to its consumers.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde::Serialize;

use crate::config::MonitorConfig;
use crate::error::FetchError;
use crate::runtime::shared::{MeshSnapshot, SharedMesh};
use crate::runtime::shutdown::ShutdownSignal;
use crate::simulation::Cell;

/// Anything that can hand out the current mesh state, locally or remotely.
///
/// Implementations may block; the monitor bounds every call with its own
/// timeout.
pub trait MeshSource: Send + Sync {
    fn fetch_mesh(&self) -> Result<MeshSnapshot, FetchError>;
}

impl MeshSource for SharedMesh {
    fn fetch_mesh(&self) -> Result<MeshSnapshot, FetchError> {
        Ok(self.read_mesh())
    }
}

/// Qualitative signal raised by a monitor cycle
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Alert {
    /// Grid A cells above the critical amplitude
    CriticalCells { count: usize },
    /// Mean Grid A amplitude above the corrective limit
    MeanAmplitudeHigh { mean: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeedbackReport {
    /// Pass count of the snapshot this report was computed from
    pub passes: u64,
    pub critical_cells: Vec<Cell>,
    pub mean_amplitude: f64,
    pub alerts: Vec<Alert>,
}

type FetchReceiver = mpsc::Receiver<Result<MeshSnapshot, FetchError>>;

pub struct FeedbackMonitor {
    source: Arc<dyn MeshSource>,
    config: MonitorConfig,
    latest: Mutex<Option<FeedbackReport>>,
    /// Fetch that overran its cycle and has not answered yet
    pending: Mutex<Option<FetchReceiver>>,
}

impl FeedbackMonitor {
    pub fn new(source: Arc<dyn MeshSource>, config: MonitorConfig) -> Self {
        Self {
            source,
            config,
            latest: Mutex::new(None),
            pending: Mutex::new(None),
        }
    }

    /// Scan Grid A of `snapshot` against the configured thresholds
    pub fn evaluate(&self, snapshot: &MeshSnapshot) -> FeedbackReport {
        let critical_cells: Vec<Cell> = snapshot
            .grid_a
            .iter()
            .filter(|c| c.amplitude > self.config.critical_amplitude)
            .copied()
            .collect();
        let mean_amplitude = snapshot.grid_a.mean_amplitude();

        let mut alerts = Vec::new();
        if !critical_cells.is_empty() {
            alerts.push(Alert::CriticalCells {
                count: critical_cells.len(),
            });
        }
        if mean_amplitude > self.config.mean_amplitude_limit {
            alerts.push(Alert::MeanAmplitudeHigh {
                mean: mean_amplitude,
            });
        }

        FeedbackReport {
            passes: snapshot.passes,
            critical_cells,
            mean_amplitude,
            alerts,
        }
    }

    /// Fetch from the source, giving up after the configured timeout.
    ///
    /// The fetch runs on a helper thread. At most one is in flight: when a
    /// fetch overruns, later cycles wait on that same thread instead of
    /// starting another, so a hung source costs one thread in total.
    pub fn fetch(&self) -> Result<MeshSnapshot, FetchError> {
        let timeout = self.config.fetch_timeout();
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let rx = match pending.take() {
            Some(rx) => {
                log::debug!("Previous mesh fetch still in flight, waiting on it");
                rx
            }
            None => self.spawn_fetch()?,
        };

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                *pending = Some(rx);
                Err(FetchError::Timeout(timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(FetchError::Disconnected),
        }
    }

    fn spawn_fetch(&self) -> Result<FetchReceiver, FetchError> {
        let (tx, rx) = mpsc::channel();
        let source = Arc::clone(&self.source);
        thread::Builder::new()
            .name("mesh-fetch".into())
            .spawn(move || {
                // Receiver is gone if the monitor was dropped meanwhile
                let _ = tx.send(source.fetch_mesh());
            })
            .map_err(|e| FetchError::Unavailable(e.to_string()))?;
        Ok(rx)
    }

    /// One observation. A failed fetch yields no report and is not an error.
    pub fn run_cycle(&self) -> Option<FeedbackReport> {
        let snapshot = match self.fetch() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("No mesh observation this cycle: {}", e);
                return None;
            }
        };

        let report = self.evaluate(&snapshot);
        if report.critical_cells.is_empty() {
            log::info!(
                "Pass {}: no critical cells (mean amplitude {:.3})",
                report.passes,
                report.mean_amplitude
            );
        } else {
            let coords: Vec<(u32, u32)> = report.critical_cells.iter().map(Cell::coords).collect();
            log::warn!(
                "Pass {}: {} critical cells above {}: {:?}",
                report.passes,
                coords.len(),
                self.config.critical_amplitude,
                coords
            );
        }
        if report
            .alerts
            .iter()
            .any(|a| matches!(a, Alert::MeanAmplitudeHigh { .. }))
        {
            log::warn!(
                "Mean amplitude {:.3} exceeds {}, corrective action advised",
                report.mean_amplitude,
                self.config.mean_amplitude_limit
            );
        }

        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = Some(report.clone());
        Some(report)
    }

    /// Most recent successful report
    pub fn latest_report(&self) -> Option<FeedbackReport> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Observe every interval until shutdown. Returns the number of cycles run.
    pub fn run(&self, shutdown: &ShutdownSignal) -> u64 {
        log::info!(
            "Feedback monitor started, every {:?}, critical above {}",
            self.config.interval(),
            self.config.critical_amplitude
        );
        let mut cycles = 0;
        while !shutdown.is_triggered() {
            self.run_cycle();
            cycles += 1;
            if shutdown.wait_timeout(self.config.interval()) {
                break;
            }
        }
        log::info!("Feedback monitor stopped after {} cycles", cycles);
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::simulation::{Grid, Resonator};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Instant, SystemTime};

    fn snapshot_with(grid_a: Grid) -> MeshSnapshot {
        let (rows, cols) = grid_a.dims();
        MeshSnapshot {
            grid_a,
            grid_b: Grid::new(rows, cols).unwrap(),
            resonator: Resonator::default(),
            passes: 7,
            updated_at: SystemTime::now(),
        }
    }

    fn local_monitor(config: MonitorConfig) -> FeedbackMonitor {
        let mesh = SharedMesh::from_config(&SimulationConfig::default()).unwrap();
        FeedbackMonitor::new(Arc::new(mesh), config)
    }

    struct FailingSource;

    impl MeshSource for FailingSource {
        fn fetch_mesh(&self) -> Result<MeshSnapshot, FetchError> {
            Err(FetchError::Unavailable("connection refused".into()))
        }
    }

    struct StalledSource(Duration);

    impl MeshSource for StalledSource {
        fn fetch_mesh(&self) -> Result<MeshSnapshot, FetchError> {
            thread::sleep(self.0);
            Err(FetchError::Unavailable("too late".into()))
        }
    }

    /// Blocks every call until the gate sender is dropped
    struct HangingSource {
        calls: AtomicUsize,
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl MeshSource for HangingSource {
        fn fetch_mesh(&self) -> Result<MeshSnapshot, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _ = self.gate.lock().unwrap().recv();
            Err(FetchError::Unavailable("hung up".into()))
        }
    }

    #[test]
    fn test_single_critical_cell_reported() {
        let mut grid = Grid::populated(5, 5, |x, y| (0.2 * f64::from((x + y) % 5), 0.0)).unwrap();
        grid.set_amplitude(3, 1, 2.0);
        let monitor = local_monitor(MonitorConfig::default());

        let report = monitor.evaluate(&snapshot_with(grid));
        assert_eq!(report.critical_cells.len(), 1);
        assert_eq!(report.critical_cells[0].coords(), (1, 3));
        assert_eq!(report.alerts, vec![Alert::CriticalCells { count: 1 }]);
        assert_eq!(report.passes, 7);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let grid = Grid::populated(2, 2, |_, _| (1.5, 0.0)).unwrap();
        let report = local_monitor(MonitorConfig::default()).evaluate(&snapshot_with(grid));
        assert!(report.critical_cells.is_empty());
        assert!(report.alerts.is_empty());
    }

    #[test]
    fn test_mean_alert() {
        let grid = Grid::populated(2, 2, |_, _| (1.6, 0.0)).unwrap();
        let report = local_monitor(MonitorConfig::default()).evaluate(&snapshot_with(grid));
        assert_eq!(report.critical_cells.len(), 4);
        assert!(report
            .alerts
            .iter()
            .any(|a| matches!(a, Alert::MeanAmplitudeHigh { mean } if (*mean - 1.6).abs() < 1e-12)));
    }

    #[test]
    fn test_local_cycle_stores_report() {
        let monitor = local_monitor(MonitorConfig::default());
        assert!(monitor.latest_report().is_none());
        let report = monitor.run_cycle().unwrap();
        assert_eq!(report.passes, 0);
        assert!(report.critical_cells.is_empty());
        assert_eq!(monitor.latest_report(), Some(report));
    }

    #[test]
    fn test_failed_fetch_is_no_observation() {
        let monitor = FeedbackMonitor::new(Arc::new(FailingSource), MonitorConfig::default());
        assert!(matches!(monitor.fetch(), Err(FetchError::Unavailable(_))));
        assert!(monitor.run_cycle().is_none());
        assert!(monitor.latest_report().is_none());
    }

    #[test]
    fn test_stalled_fetch_times_out() {
        let config = MonitorConfig {
            fetch_timeout_ms: 20,
            ..MonitorConfig::default()
        };
        let monitor = FeedbackMonitor::new(Arc::new(StalledSource(Duration::from_millis(500))), config);
        let start = Instant::now();
        assert!(matches!(monitor.fetch(), Err(FetchError::Timeout(_))));
        assert!(start.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn test_hung_source_holds_one_fetch_thread() {
        let (release, gate) = mpsc::channel::<()>();
        let source = Arc::new(HangingSource {
            calls: AtomicUsize::new(0),
            gate: Mutex::new(gate),
        });
        let config = MonitorConfig {
            fetch_timeout_ms: 5,
            ..MonitorConfig::default()
        };
        let monitor = FeedbackMonitor::new(Arc::clone(&source) as Arc<dyn MeshSource>, config);

        for _ in 0..50 {
            assert!(monitor.run_cycle().is_none());
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        // Once the hung call returns, the next cycles fetch afresh
        drop(release);
        let start = Instant::now();
        while source.calls.load(Ordering::SeqCst) < 2 && start.elapsed() < Duration::from_secs(5) {
            let _ = monitor.fetch();
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_loop_survives_failures_until_shutdown() {
        let config = MonitorConfig {
            interval_ms: 5,
            ..MonitorConfig::default()
        };
        let monitor = Arc::new(FeedbackMonitor::new(Arc::new(FailingSource), config));
        let shutdown = ShutdownSignal::new();
        let handle = {
            let monitor = Arc::clone(&monitor);
            let shutdown = shutdown.clone();
            thread::spawn(move || monitor.run(&shutdown))
        };
        thread::sleep(Duration::from_millis(60));
        shutdown.trigger();
        let cycles = handle.join().unwrap();
        assert!(cycles >= 2, "only {} cycles", cycles);
    }
}
