mod integrator;
mod monitor;
mod scheduler;
mod shared;
mod shutdown;

pub use integrator::OscillatorRunner;
pub use monitor::{Alert, FeedbackMonitor, FeedbackReport, MeshSource};
pub use scheduler::MeshScheduler;
pub use shared::{MeshSnapshot, OscillatorSnapshot, SharedMesh, SharedOscillator};
pub use shutdown::ShutdownSignal;
