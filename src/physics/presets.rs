use super::body::BodyParams;

// ---------------------------------------------------------------------------
// Preset bodies (normalized units: solar masses, years, AU)
// ---------------------------------------------------------------------------

const SOLAR_MASS_KG: f64 = 2.0e30;

pub fn mercury() -> BodyParams {
    BodyParams::new("Mercury")
        .mass(2.4e23 / SOLAR_MASS_KG)
        .period(0.24)
        .eccentricity(0.206)
        .semi_major_axis(0.387)
}

pub fn venus() -> BodyParams {
    BodyParams::new("Venus")
        .mass(4.87e24 / SOLAR_MASS_KG)
        .period(0.616)
        .semi_major_axis(0.7)
}

pub fn earth() -> BodyParams {
    BodyParams::new("Earth")
        .mass(5.97e24 / SOLAR_MASS_KG)
        .period(1.0)
        .semi_major_axis(1.0)
}

pub fn jupiter() -> BodyParams {
    BodyParams::new("Jupiter")
        .mass(1.9e27 / SOLAR_MASS_KG)
        .period(12.0)
        .semi_major_axis(5.203)
}

/// Look up a preset by case-insensitive name.
pub fn by_name(name: &str) -> Option<BodyParams> {
    match name.to_ascii_lowercase().as_str() {
        "mercury" => Some(mercury()),
        "venus" => Some(venus()),
        "earth" => Some(earth()),
        "jupiter" => Some(jupiter()),
        _ => None,
    }
}
