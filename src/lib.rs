pub mod config;
pub mod dynamics;
pub mod error;
pub mod io;
pub mod orbital;
pub mod physics;
pub mod sim;

pub use config::SimulationConfig;
pub use error::{PrecessionError, SimResult};

// Short paths for the common entry points
pub mod integrator {
    pub use crate::sim::convergence::convergence_test;
    pub use crate::sim::integrator::{rk4_step, IntegrationMethod, OdeSystem};
    pub use crate::sim::runner::{solve, solve_with};
}

pub mod types {
    pub use crate::dynamics::state::{BodyId, BodyState, StateVector, Trajectory, N_EQUATIONS};
    pub use crate::dynamics::{Features, PrecessionModel};
    pub use crate::physics::{Body, BodyParams};
}
