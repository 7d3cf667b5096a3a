pub mod diagnostics;
pub mod elements;

pub use diagnostics::{
    cartesian_track, find_apsides, out_of_tolerance, unwrapped_longitudes, wrap_angle, Apsis, ApsisRecord,
    ExcursionRecord, OrbitReport, PrecessionEstimate,
};
pub use elements::{eccentricity_vector, state_eccentricity_vector, OsculatingElements};
