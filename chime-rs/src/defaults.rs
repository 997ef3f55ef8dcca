//! Defaults and accepted ranges for every user-facing parameter.
//!
//! The same table seeds [`ParameterInput::default`](crate::ParameterInput) and
//! bounds [`ParameterInput::validate`](crate::ParameterInput::validate), so an
//! interactive front end that reads `min`, `max` and `step` from here accepts
//! exactly what the model accepts.

use crate::error::ChimeError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterDefault {
    pub name: &'static str,
    pub default: f64,
    pub min: f64,
    pub max: f64,
    pub min_inclusive: bool,
    pub max_inclusive: bool,
    pub step: f64,
}

impl ParameterDefault {
    const fn new(name: &'static str, default: f64, min: f64, max: f64, step: f64) -> Self {
        ParameterDefault {
            name,
            default,
            min,
            max,
            min_inclusive: true,
            max_inclusive: true,
            step,
        }
    }

    const fn exclusive_min(mut self) -> Self {
        self.min_inclusive = false;
        self
    }

    const fn exclusive_max(mut self) -> Self {
        self.max_inclusive = false;
        self
    }

    /// Whether `value` lies in the accepted range. NaN never does.
    pub fn contains(&self, value: f64) -> bool {
        let above = if self.min_inclusive {
            value >= self.min
        } else {
            value > self.min
        };
        let below = if self.max_inclusive {
            value <= self.max
        } else {
            value < self.max
        };
        above && below
    }

    pub fn check(&self, value: f64) -> Result<f64, ChimeError> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(ChimeError::invalid(format!(
                "{} must be in {}{}, {}{} (got {value})",
                self.name,
                if self.min_inclusive { '[' } else { '(' },
                self.min,
                self.max,
                if self.max_inclusive { ']' } else { ')' },
            )))
        }
    }
}

pub const POPULATION: ParameterDefault =
    ParameterDefault::new("population", 3_600_000.0, 1.0, f64::INFINITY, 1.0).exclusive_max();
pub const MARKET_SHARE: ParameterDefault =
    ParameterDefault::new("market_share", 0.15, 0.0, 1.0, 0.01).exclusive_min();
pub const CURRENT_HOSPITALIZED: ParameterDefault =
    ParameterDefault::new("current_hospitalized", 69.0, 0.0, f64::INFINITY, 1.0).exclusive_max();
pub const RECOVERED: ParameterDefault =
    ParameterDefault::new("recovered", 0.0, 0.0, f64::INFINITY, 1.0).exclusive_max();
/// An infinite doubling time is accepted and means no growth.
pub const DOUBLING_TIME: ParameterDefault =
    ParameterDefault::new("doubling_time", 4.0, 0.0, f64::INFINITY, 0.25).exclusive_min();
pub const RELATIVE_CONTACT_RATE: ParameterDefault =
    ParameterDefault::new("relative_contact_rate", 0.3, 0.0, 1.0, 0.01).exclusive_max();
pub const HOSPITALIZED_RATE: ParameterDefault =
    ParameterDefault::new("hospitalized.rate", 0.025, 0.0, 1.0, 0.0025).exclusive_min();
pub const HOSPITALIZED_DAYS: ParameterDefault =
    ParameterDefault::new("hospitalized.days", 7.0, 1.0, f64::INFINITY, 1.0);
pub const ICU_RATE: ParameterDefault =
    ParameterDefault::new("icu.rate", 0.0075, 0.0, 1.0, 0.0005).exclusive_min();
pub const ICU_DAYS: ParameterDefault =
    ParameterDefault::new("icu.days", 9.0, 1.0, f64::INFINITY, 1.0);
pub const VENTILATED_RATE: ParameterDefault =
    ParameterDefault::new("ventilated.rate", 0.005, 0.0, 1.0, 0.0005).exclusive_min();
pub const VENTILATED_DAYS: ParameterDefault =
    ParameterDefault::new("ventilated.days", 10.0, 1.0, f64::INFINITY, 1.0);
pub const INFECTIOUS_DAYS: ParameterDefault =
    ParameterDefault::new("infectious_days", 14.0, 1.0, f64::INFINITY, 1.0);
pub const N_DAYS: ParameterDefault =
    ParameterDefault::new("n_days", 100.0, 30.0, 3650.0, 1.0);
/// Longest back-solve window: `current_date - date_first_hospitalized`.
pub const MAX_DAYS_SINCE_FIRST_HOSPITALIZED: i64 = 730;
/// Only a presentation hint; the default is what a front end offers once the
/// fixed axis is switched on.
pub const MAX_Y_AXIS: ParameterDefault =
    ParameterDefault::new("max_y_axis", 500.0, 0.0, f64::INFINITY, 25.0).exclusive_min();

pub static PARAMETER_DEFAULTS: [ParameterDefault; 15] = [
    POPULATION,
    MARKET_SHARE,
    CURRENT_HOSPITALIZED,
    RECOVERED,
    DOUBLING_TIME,
    RELATIVE_CONTACT_RATE,
    HOSPITALIZED_RATE,
    HOSPITALIZED_DAYS,
    ICU_RATE,
    ICU_DAYS,
    VENTILATED_RATE,
    VENTILATED_DAYS,
    INFECTIOUS_DAYS,
    N_DAYS,
    MAX_Y_AXIS,
];

pub fn lookup(name: &str) -> Option<&'static ParameterDefault> {
    PARAMETER_DEFAULTS.iter().find(|entry| entry.name == name)
}
