use crate::parameters::{Disposition, DispositionKind};

/// Daily admissions, occupied beds and cumulative admissions of one
/// disposition, indexed like the trajectory they were derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct DispositionSeries {
    pub kind: DispositionKind,
    pub admits: Vec<f64>,
    pub census: Vec<f64>,
    pub ever: Vec<f64>,
}

impl DispositionSeries {
    /// Projects a disposition from the ever-infected curve (`I + R`).
    ///
    /// Admissions after day zero are the disposition's share of new
    /// infections; `seed` is the admissions count on day zero.
    pub fn project(
        kind: DispositionKind,
        disposition: &Disposition,
        market_share: f64,
        ever_infected: &[f64],
        seed: f64,
    ) -> Self {
        let admits = admits(ever_infected, disposition.rate * market_share, seed);
        let census = census(&admits, disposition.days);
        let ever = admits
            .iter()
            .scan(0.0, |total, admits| {
                *total += admits;
                Some(*total)
            })
            .collect();
        DispositionSeries {
            kind,
            admits,
            census,
            ever,
        }
    }

    pub fn len(&self) -> usize {
        self.admits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admits.is_empty()
    }
}

/// New admissions per day: `share` of the day-over-day increase in
/// `ever_infected`, never negative. Day zero takes `seed`.
pub fn admits(ever_infected: &[f64], share: f64, seed: f64) -> Vec<f64> {
    if ever_infected.is_empty() {
        return Vec::new();
    }
    let mut admits = Vec::with_capacity(ever_infected.len());
    admits.push(seed.max(0.0));
    admits.extend(
        ever_infected
            .windows(2)
            .map(|pair| (share * (pair[1] - pair[0])).max(0.0)),
    );
    admits
}

/// Patients occupying a bed each day: the admissions of the last
/// `length_of_stay` days, today included.
pub fn census(admits: &[f64], length_of_stay: u32) -> Vec<f64> {
    let window = length_of_stay.max(1) as usize;
    (0..admits.len())
        .map(|day| {
            let first = (day + 1).saturating_sub(window);
            admits[first..=day].iter().sum::<f64>()
        })
        .collect()
}
