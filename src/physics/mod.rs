pub mod body;
pub mod presets;

pub use body::{kepler_central_gm, Body, BodyParams};
