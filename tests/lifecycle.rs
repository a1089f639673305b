use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use resonant_mesh::config::MeshConfig;
use resonant_mesh::runtime::{MeshSnapshot, MeshSource};
use resonant_mesh::simulation::{Grid, Mesh};
use resonant_mesh::{App, FetchError, MeshError, SimulationConfig};

fn fast_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.mesh.update_interval_ms = 5;
    config.oscillator.total_time = 2.0;
    config.oscillator.step_pacing_ms = 0;
    config.monitor.interval_ms = 5;
    config.monitor.fetch_timeout_ms = 500;
    config
}

fn wait_until<F: Fn() -> bool>(cond: F) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(10) {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn test_full_lifecycle() {
    let app = App::start(fast_config()).unwrap();

    assert!(wait_until(|| app.read_mesh().passes >= 3));
    assert!(wait_until(|| app.read_oscillator().finished));
    assert!(wait_until(|| app.latest_report().is_some()));

    let osc = app.read_oscillator();
    assert_eq!(osc.step, 200);
    assert!((osc.state.phase - osc.state.y.atan2(osc.state.x)).abs() < 1e-15);

    let mesh = app.read_mesh();
    assert_eq!(mesh.grid_a.dims(), (5, 5));
    assert_eq!(mesh.grid_b.dims(), (5, 5));

    app.shutdown();
}

#[test]
fn test_adjustment_through_app() {
    let app = App::start(fast_config()).unwrap();
    assert!(matches!(
        app.adjust_coefficients(0.7, 0.7),
        Err(MeshError::CoefficientSum { .. })
    ));
    assert_eq!(app.read_mesh().resonator.transmission(), 0.6);

    app.adjust_coefficients(0.3, 0.7).unwrap();
    assert!(wait_until(|| app.read_mesh().resonator.transmission() == 0.3));
    app.shutdown();
}

#[test]
fn test_shutdown_is_prompt_with_long_periods() {
    let mut config = SimulationConfig::default();
    config.oscillator.total_time = 1e9;
    let app = App::start(config).unwrap();
    let signal = app.shutdown_signal();

    thread::sleep(Duration::from_millis(20));
    let start = Instant::now();
    app.shutdown();

    assert!(signal.is_triggered());
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_invalid_config_fails_before_start() {
    let mut config = fast_config();
    config.resonator.reflection = 0.5;
    assert!(matches!(
        App::start(config),
        Err(MeshError::CoefficientSum { .. })
    ));

    let mut config = fast_config();
    config.resonator.lambda_nm = 0.0;
    assert!(matches!(
        App::start(config),
        Err(MeshError::InvalidWavelength(_))
    ));
}

#[test]
fn test_mismatched_mesh_rejected() {
    let a = Grid::new(5, 5).unwrap();
    let b = Grid::new(5, 6).unwrap();
    assert!(matches!(
        Mesh::new(a, b),
        Err(MeshError::DimensionMismatch { .. })
    ));
    assert!(Mesh::from_config(&MeshConfig {
        cols: 0,
        ..MeshConfig::default()
    })
    .is_err());
}

struct UnreachableRemote;

impl MeshSource for UnreachableRemote {
    fn fetch_mesh(&self) -> Result<MeshSnapshot, FetchError> {
        Err(FetchError::Unavailable("remote mesh not reachable".into()))
    }
}

#[test]
fn test_unreachable_remote_does_not_stop_simulation() {
    let app = App::start_with_source(fast_config(), Arc::new(UnreachableRemote)).unwrap();
    assert!(wait_until(|| app.read_mesh().passes >= 3));
    assert!(app.latest_report().is_none());
    app.shutdown();
}
