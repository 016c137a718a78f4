//! Built-in meteorological rules.
use crate::diagnostics::ComputeError;
use crate::payload::{DataArray, DependencyPool};
use crate::store::{Registry, Rule, RuleBuilder};
use log::{debug, warn};

/// Specific gas constant for dry air, J/(kg K).
pub const R_D: f64 = 287.058;
/// Specific heat of dry air at constant pressure, J/(kg K).
pub const C_P: f64 = 1005.0;
/// Reference pressure, Pa.
pub const P0: f64 = 100000.0;
/// Latent heat of vaporization of water, J/kg.
pub const L_V: f64 = 2.501e6;
/// Ratio of the molar masses of water vapour and dry air.
pub const EPSILON: f64 = 0.622;

fn potential_temperature(pool: &DependencyPool) -> Result<DataArray, ComputeError> {
    let t = pool.get("air_temperature")?;
    let p = pool.get("air_pressure")?;
    let factor = p.map(|p| (P0 / p).powf(R_D / C_P))?;
    t.try_mul(&factor)
}

fn wind_speed(pool: &DependencyPool) -> Result<DataArray, ComputeError> {
    let u = pool.get("eastward_wind")?;
    let v = pool.get("northward_wind")?;
    let speed = u.zip_map(v, f64::hypot)?;
    // Keep the input's units when it carries them.
    Ok(match u.attrs.get("units") {
        Some(units) => speed.with_attr("units", units.clone()),
        None => speed,
    })
}

fn wind_from_direction(pool: &DependencyPool) -> Result<DataArray, ComputeError> {
    let u = pool.get("eastward_wind")?;
    let v = pool.get("northward_wind")?;
    v.zip_map(u, |v, u| (270.0 - v.atan2(u).to_degrees()).rem_euclid(360.0))
}

fn saturation_vapor_pressure_tetens(pool: &DependencyPool) -> Result<DataArray, ComputeError> {
    let t = pool.get("air_temperature")?;
    t.map(|t_k| {
        let t_c = t_k - 273.15;
        610.78 * ((17.27 * t_c) / (t_c + 237.3)).exp()
    })
}

fn mixing_ratio_from_specific_humidity(pool: &DependencyPool) -> Result<DataArray, ComputeError> {
    let q = pool.get("specific_humidity")?;
    q.map(|q| if 1.0 - q <= 0.0 { f64::NAN } else { q / (1.0 - q) })
}

fn saturation_mixing_ratio(pool: &DependencyPool) -> Result<DataArray, ComputeError> {
    let p = pool.get("air_pressure")?;
    let es = pool.get("saturation_vapor_pressure_tetens")?;
    p.zip_map(es, |p, es| if p - es <= 0.0 { f64::NAN } else { EPSILON * es / (p - es) })
}

fn relative_humidity_from_mixing_ratios(pool: &DependencyPool) -> Result<DataArray, ComputeError> {
    let w = pool.get("mixing_ratio_from_specific_humidity")?;
    let ws = pool.get("saturation_mixing_ratio")?;
    w.zip_map(ws, |w, ws| if ws <= 0.0 { f64::NAN } else { w / ws * 100.0 })?
        .clip(0.0, 100.0)
}

fn equivalent_potential_temperature_approx(pool: &DependencyPool) -> Result<DataArray, ComputeError> {
    let theta = pool.get("potential_temperature")?;
    let w = pool.get("mixing_ratio_from_specific_humidity")?;
    let t = pool.get("air_temperature")?;
    let growth = w.zip_map(t, |w, t_k| ((L_V * w) / (C_P * t_k)).exp())?;
    theta.try_mul(&growth)
}

fn describe(builder: RuleBuilder, units: &str, long_name: &str, standard_name: &str) -> RuleBuilder {
    builder.attr("units", units).long_name(long_name).standard_name(standard_name)
}

fn standard_rules() -> Vec<Rule> {
    let rules = [
        describe(
            Rule::builder("potential_temperature", ["air_temperature", "air_pressure"], potential_temperature)
                .description("Air Potential Temperature calculated using temperature and pressure.")
                .formula("T * (P0 / P)^(R_d / C_p)"),
            "K",
            "Air Potential Temperature",
            "air_potential_temperature",
        ),
        describe(
            Rule::builder("wind_speed", ["eastward_wind", "northward_wind"], wind_speed)
                .description("Wind Speed calculated from u and v components.")
                .formula("sqrt(u^2 + v^2)"),
            "m s-1",
            "Wind Speed",
            "wind_speed",
        ),
        describe(
            Rule::builder("wind_from_direction", ["eastward_wind", "northward_wind"], wind_from_direction)
                .description("Wind From Direction calculated from u and v components.")
                .formula("(270 - atan2(v, u) * 180/pi) % 360"),
            "degree",
            "Wind From Direction",
            "wind_from_direction",
        ),
        describe(
            Rule::builder("saturation_vapor_pressure_tetens", ["air_temperature"], saturation_vapor_pressure_tetens)
                .description("Saturation vapor pressure using Tetens' formula.")
                .formula("610.78 * exp((17.27 * (T_k - 273.15)) / ((T_k - 273.15) + 237.3))"),
            "Pa",
            "Saturation Vapor Pressure (Tetens)",
            "saturation_vapor_pressure",
        ),
        describe(
            Rule::builder("mixing_ratio_from_specific_humidity", ["specific_humidity"], mixing_ratio_from_specific_humidity)
                .description("Mixing ratio calculated from specific humidity.")
                .formula("q / (1 - q)"),
            "kg kg-1",
            "Mixing Ratio (from Specific Humidity)",
            "humidity_mixing_ratio",
        ),
        describe(
            Rule::builder(
                "saturation_mixing_ratio",
                ["air_pressure", "saturation_vapor_pressure_tetens"],
                saturation_mixing_ratio,
            )
            .description("Saturation mixing ratio.")
            .formula("(0.622 * es_tetens) / (P - es_tetens)"),
            "kg kg-1",
            "Saturation Mixing Ratio",
            "saturation_mixing_ratio",
        ),
        describe(
            Rule::builder(
                "relative_humidity_from_mixing_ratios",
                ["mixing_ratio_from_specific_humidity", "saturation_mixing_ratio"],
                relative_humidity_from_mixing_ratios,
            )
            .description("Relative humidity from mixing ratio and saturation mixing ratio.")
            .formula("(w / ws) * 100"),
            "%",
            "Relative Humidity (from Mixing Ratios)",
            "relative_humidity",
        ),
        describe(
            Rule::builder(
                "equivalent_potential_temperature_approx",
                ["potential_temperature", "mixing_ratio_from_specific_humidity", "air_temperature"],
                equivalent_potential_temperature_approx,
            )
            .description("Equivalent Potential Temperature (approximate).")
            .formula("theta * exp((Lv * w) / (Cp * T_k))"),
            "K",
            "Equivalent Potential Temperature (Approximate)",
            "equivalent_potential_temperature",
        ),
    ];

    rules
        .into_iter()
        .filter_map(|builder| match builder.build() {
            Ok(rule) => Some(rule),
            Err(e) => {
                warn!("skipping malformed standard rule: {}", e);
                None
            }
        })
        .collect()
}

/// Registers the built-in rules, skipping any name that is already taken.
/// Returns how many rules were added.
pub fn register_standard_rules(registry: &mut Registry) -> usize {
    let mut added = 0;
    for rule in standard_rules() {
        let name = rule.name().to_string();
        match registry.register(rule) {
            Ok(()) => added += 1,
            Err(_) => debug!("standard rule '{}' already registered, skipping", name),
        }
    }
    added
}
