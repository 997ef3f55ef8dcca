use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::error::ChimeError;

/// Relative drift of `S + I + R` away from the closed population that is
/// tolerated before a step is rescaled.
pub const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SirState {
    pub susceptible: f64,
    pub infected: f64,
    pub recovered: f64,
}

impl SirState {
    pub fn total(&self) -> f64 {
        self.susceptible + self.infected + self.recovered
    }

    /// Everyone who has been infected so far, recovered or not.
    pub fn ever_infected(&self) -> f64 {
        self.infected + self.recovered
    }
}

/// Contact rates before and after the mitigation day. Days are counted from
/// the first simulated day; a mitigation day at or before zero mitigates the
/// whole run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactSchedule {
    pub beta: f64,
    pub beta_t: f64,
    pub mitigation_day: Option<i64>,
}

impl ContactSchedule {
    pub fn beta_on(&self, day: usize) -> f64 {
        match self.mitigation_day {
            Some(mitigation_day) if day as i64 >= mitigation_day => self.beta_t,
            _ => self.beta,
        }
    }
}

/// Advances the model by one day in a closed population of size `n`.
pub fn step(state: SirState, beta: f64, gamma: f64, n: f64) -> SirState {
    if n <= 0.0 {
        return state;
    }
    let infections = beta * state.susceptible * state.infected / n;
    let recoveries = gamma * state.infected;

    let mut next = SirState {
        susceptible: (state.susceptible - infections).max(0.0),
        infected: (state.infected + infections - recoveries).max(0.0),
        recovered: (state.recovered + recoveries).max(0.0),
    };

    let total = next.total();
    if total > 0.0 && (total - n).abs() > EPSILON * n {
        let scale = n / total;
        next.susceptible *= scale;
        next.infected *= scale;
        next.recovered *= scale;
    }
    next
}

/// Runs `n_steps` daily steps from `initial`, returning `n_steps + 1` states
/// with the initial one first.
pub fn simulate(
    initial: SirState,
    gamma: f64,
    schedule: &ContactSchedule,
    n_steps: usize,
) -> Vec<SirState> {
    let n = initial.total();
    let mut states = Vec::with_capacity(n_steps + 1);
    let mut state = initial;
    states.push(state);
    for day in 0..n_steps {
        state = step(state, schedule.beta_on(day), gamma, n);
        states.push(state);
    }
    states
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrajectoryRow {
    pub day: usize,
    pub date: NaiveDate,
    pub susceptible: f64,
    pub infected: f64,
    pub recovered: f64,
}

/// Daily S/I/R counts, ascending by day from the first simulated day.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    rows: Vec<TrajectoryRow>,
}

impl Trajectory {
    pub fn new(start_date: NaiveDate, states: &[SirState]) -> Result<Self, ChimeError> {
        let rows = states
            .iter()
            .enumerate()
            .map(|(day, state)| {
                let date = start_date
                    .checked_add_days(Days::new(day as u64))
                    .ok_or_else(|| {
                        ChimeError::invalid(format!("day {day} after {start_date} is out of range"))
                    })?;
                Ok(TrajectoryRow {
                    day,
                    date,
                    susceptible: state.susceptible,
                    infected: state.infected,
                    recovered: state.recovered,
                })
            })
            .collect::<Result<Vec<_>, ChimeError>>()?;
        Ok(Trajectory { rows })
    }

    pub fn rows(&self) -> &[TrajectoryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, day: usize) -> Option<&TrajectoryRow> {
        self.rows.get(day)
    }

    pub fn on(&self, date: NaiveDate) -> Option<&TrajectoryRow> {
        let start = self.rows.first()?.date;
        let day = usize::try_from(date.signed_duration_since(start).num_days()).ok()?;
        self.rows.get(day)
    }

    pub fn infected(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.infected).collect()
    }

    pub fn ever_infected(&self) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| row.infected + row.recovered)
            .collect()
    }
}
