//! Conversions between doubling time, daily growth rate and reproduction
//! number, before and after mitigation.

use std::f64::consts::LN_2;

use log::{debug, warn};
use roots::{SimpleConvergency, find_root_brent};
use serde::Serialize;

use crate::error::{ChimeError, ensure_finite};
use crate::sir::{self, ContactSchedule, SirState};

const ROOT_TOLERANCE: f64 = 1e-9;
const ROOT_MAX_ITERATIONS: usize = 200;
const MAX_BRACKET_EXPANSIONS: usize = 16;

/// Average daily growth rate implied by a doubling time. An infinite doubling
/// time gives zero growth, a negative one (a halving time) negative growth.
pub fn growth_rate(doubling_time: f64) -> f64 {
    2.0_f64.powf(1.0 / doubling_time) - 1.0
}

/// Doubling time implied by a daily growth rate: infinite without growth and
/// negative while infections shrink.
pub fn doubling_time(growth_rate: f64) -> Result<f64, ChimeError> {
    if growth_rate.is_nan() || growth_rate <= -1.0 {
        return Err(ChimeError::unstable(format!(
            "no doubling time for a growth rate of {growth_rate}"
        )));
    }
    if growth_rate == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(LN_2 / growth_rate.ln_1p())
}

pub fn reproduction_number(growth_rate: f64, infectious_days: u32) -> f64 {
    1.0 + growth_rate * f64::from(infectious_days)
}

/// Rates derived from the parameters, before (`growth_rate`, `r_naught`,
/// `beta`) and after (`*_t`) mitigation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationState {
    pub raw_doubling_time: f64,
    pub growth_rate: f64,
    pub r_naught: f64,
    pub doubling_time_t: f64,
    pub growth_rate_t: f64,
    pub r_t: f64,
    pub beta: f64,
    pub beta_t: f64,
    pub gamma: f64,
}

impl SimulationState {
    /// Derives every rate from a pre-mitigation growth rate. Mitigation scales
    /// the contact rate by `1 - contact_reduction`, so with no reduction the
    /// post-mitigation values equal the pre-mitigation ones exactly.
    pub fn from_growth_rate(
        growth_rate: f64,
        infectious_days: u32,
        contact_reduction: f64,
    ) -> Result<Self, ChimeError> {
        if infectious_days == 0 {
            return Err(ChimeError::invalid("infectious_days must be at least 1"));
        }
        let growth_rate = ensure_finite("growth_rate", growth_rate)?;
        let gamma = 1.0 / f64::from(infectious_days);

        let beta = ensure_finite("beta", growth_rate + gamma)?;
        if beta < 0.0 {
            return Err(ChimeError::unstable(format!(
                "growth rate {growth_rate} implies a negative contact rate"
            )));
        }
        let beta_t = ensure_finite("beta_t", beta * (1.0 - contact_reduction))?;
        let growth_rate_t = growth_rate * (1.0 - contact_reduction) - gamma * contact_reduction;

        Ok(SimulationState {
            raw_doubling_time: doubling_time(growth_rate)?,
            growth_rate,
            r_naught: reproduction_number(growth_rate, infectious_days),
            doubling_time_t: doubling_time(growth_rate_t)?,
            growth_rate_t,
            r_t: reproduction_number(growth_rate_t, infectious_days),
            beta,
            beta_t,
            gamma,
        })
    }

    pub fn from_doubling_time(
        doubling_time: f64,
        infectious_days: u32,
        contact_reduction: f64,
    ) -> Result<Self, ChimeError> {
        if doubling_time.is_nan() || doubling_time <= 0.0 {
            return Err(ChimeError::invalid(format!(
                "doubling_time must be positive (got {doubling_time})"
            )));
        }
        Self::from_growth_rate(growth_rate(doubling_time), infectious_days, contact_reduction)
    }

    pub fn schedule(&self, mitigation_day: Option<i64>) -> ContactSchedule {
        ContactSchedule {
            beta: self.beta,
            beta_t: self.beta_t,
            mitigation_day,
        }
    }

    pub fn mitigation_impact(&self, mitigated: bool) -> MitigationImpact {
        if !mitigated {
            MitigationImpact::None
        } else if self.growth_rate_t < 0.0 {
            MitigationImpact::Halves {
                every_days: self.doubling_time_t.abs(),
            }
        } else if self.growth_rate_t == 0.0 {
            MitigationImpact::Steady
        } else {
            MitigationImpact::Doubles {
                every_days: self.doubling_time_t,
            }
        }
    }
}

/// What mitigation does to the spread, for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MitigationImpact {
    None,
    /// Infections halve every `every_days` days.
    Halves { every_days: f64 },
    Steady,
    /// Infections still double, every `every_days` days.
    Doubles { every_days: f64 },
}

/// Finds the pre-mitigation growth rate under which the infected count grows
/// from `initial` to `target_infected` in `elapsed_days` simulated days.
///
/// The residual, relative to the target, is evaluated with the SIR integrator
/// itself, so susceptible depletion and any mitigation inside the window are
/// accounted for. The root is searched with Brent's method between `-gamma`
/// (no transmission) and an upper bound grown from the closed-form inversion
/// of exponential growth. When no bracket exists, the closed form is returned.
pub fn fit_growth_rate(
    initial: SirState,
    target_infected: f64,
    elapsed_days: i64,
    infectious_days: u32,
    contact_reduction: f64,
    mitigation_day: Option<i64>,
) -> Result<f64, ChimeError> {
    if target_infected.is_nan() || target_infected <= 0.0 {
        return Err(ChimeError::invalid(format!(
            "target infected count must be positive (got {target_infected})"
        )));
    }
    if elapsed_days <= 0 {
        return Err(ChimeError::invalid(format!(
            "the first hospitalization must precede the current date (elapsed days: {elapsed_days})"
        )));
    }
    if infectious_days == 0 {
        return Err(ChimeError::invalid("infectious_days must be at least 1"));
    }
    let steps = elapsed_days as usize;
    let gamma = 1.0 / f64::from(infectious_days);

    let closed_form = ensure_finite(
        "growth_rate",
        (target_infected / initial.infected).powf(1.0 / elapsed_days as f64) - 1.0,
    )?;

    let residual = |growth_rate: f64| {
        let beta = growth_rate + gamma;
        let schedule = ContactSchedule {
            beta,
            beta_t: beta * (1.0 - contact_reduction),
            mitigation_day,
        };
        let states = sir::simulate(initial, gamma, &schedule, steps);
        (states[steps].infected - target_infected) / target_infected
    };

    let lower = -gamma;
    if residual(lower) >= 0.0 {
        warn!("target of {target_infected} infected is reached without transmission");
        return Ok(closed_form);
    }
    let mut upper = (2.0 * closed_form).max(1.0);
    let mut expansions = 0;
    while residual(upper) < 0.0 {
        if expansions == MAX_BRACKET_EXPANSIONS {
            warn!(
                "target of {target_infected} infected is unreachable within the population; \
                 using the exponential estimate {closed_form}"
            );
            return Ok(closed_form);
        }
        upper *= 2.0;
        expansions += 1;
    }

    let mut convergency = SimpleConvergency {
        eps: ROOT_TOLERANCE,
        max_iter: ROOT_MAX_ITERATIONS,
    };
    let growth_rate = find_root_brent(lower, upper, &residual, &mut convergency)
        .map_err(|err| ChimeError::unstable(format!("growth rate search failed: {err:?}")))?;
    debug!("fitted growth rate {growth_rate} (exponential estimate {closed_form})");
    ensure_finite("growth_rate", growth_rate)
}
