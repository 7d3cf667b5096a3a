pub mod equations;
pub mod state;

pub use equations::{derivatives, Features, PrecessionModel};
pub use state::{initial_state, BodyId, BodyState, StateVector, Trajectory, N_EQUATIONS};
