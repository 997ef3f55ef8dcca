use chrono::NaiveDate;
use log::{debug, info, warn};

use crate::dispositions::DispositionSeries;
use crate::error::ChimeError;
use crate::parameters::{AdmitsSeed, DispositionKind, GrowthInput, ParameterSet};
use crate::rates::{self, MitigationImpact, SimulationState};
use crate::sir::{self, SirState, Trajectory};
use crate::table::{Column, Table};

pub const SIM_SIR_W_DATE: &str = "sim_sir_w_date";
pub const PROJECTED_ADMITS: &str = "projected_admits";
pub const PROJECTED_CENSUS: &str = "projected_census";
pub const DISPOSITIONS: &str = "dispositions";

/// One projection run: the derived rates, the S/I/R trajectory, the
/// disposition series and their date-aligned tables.
///
/// A run starts on the current date when a doubling time is given, or on the
/// date of the first hospitalization when the doubling time is back-solved.
#[derive(Debug, Clone, PartialEq)]
pub struct SimSirModel {
    parameters: ParameterSet,
    state: SimulationState,
    start_date: NaiveDate,
    current_day: usize,
    infected_exceeds_population: bool,
    trajectory: Trajectory,
    dispositions: Vec<DispositionSeries>,
    sim_sir_w_date: Table,
    admits: Table,
    census: Table,
    ever: Table,
}

impl SimSirModel {
    pub fn new(parameters: &ParameterSet) -> Result<Self, ChimeError> {
        let p = parameters;
        let hospitalized_share = p.market_share() * p.hospitalized().rate;
        let contact_reduction = p.effective_contact_reduction();

        let (start_date, seed_hospitalized) = match p.growth() {
            GrowthInput::DoublingTime(doubling_time) => {
                info!("Using doubling_time: {doubling_time}");
                (p.current_date(), p.current_hospitalized())
            }
            GrowthInput::DateFirstHospitalized(date) => {
                info!(
                    "Using date_first_hospitalized: {date}; current_date: {}; current_hospitalized: {}",
                    p.current_date(),
                    p.current_hospitalized()
                );
                (date, 1.0)
            }
        };
        let elapsed_days = p.current_date().signed_duration_since(start_date).num_days();
        let mitigation_day = p
            .mitigation_date()
            .map(|date| date.signed_duration_since(start_date).num_days());

        let (initial, start_clamped) = initial_state(p, seed_hospitalized / hospitalized_share);

        let state = match p.growth() {
            GrowthInput::DoublingTime(doubling_time) => SimulationState::from_doubling_time(
                doubling_time,
                p.infectious_days(),
                contact_reduction,
            )?,
            GrowthInput::DateFirstHospitalized(_) => {
                let growth_rate = rates::fit_growth_rate(
                    initial,
                    p.current_hospitalized() / hospitalized_share,
                    elapsed_days,
                    p.infectious_days(),
                    contact_reduction,
                    mitigation_day,
                )?;
                let state = SimulationState::from_growth_rate(
                    growth_rate,
                    p.infectious_days(),
                    contact_reduction,
                )?;
                info!("Estimated doubling_time: {}", state.raw_doubling_time);
                state
            }
        };

        let current_day = usize::try_from(elapsed_days).map_err(|_| {
            ChimeError::invalid(format!(
                "simulation start {start_date} is after current_date {}",
                p.current_date()
            ))
        })?;
        let n_steps = current_day + p.n_days() as usize;
        let states = sir::simulate(
            initial,
            state.gamma,
            &state.schedule(mitigation_day),
            n_steps,
        );
        let trajectory = Trajectory::new(start_date, &states)?;
        debug!(
            "Simulated {} days from {start_date} (current day index {current_day})",
            trajectory.len()
        );

        let ever_infected = trajectory.ever_infected();
        let dispositions: Vec<DispositionSeries> = p
            .dispositions()
            .iter()
            .map(|(kind, disposition)| {
                let seed = match p.admits_seed() {
                    AdmitsSeed::Hospitalized if kind == DispositionKind::Hospitalized => {
                        seed_hospitalized
                    }
                    AdmitsSeed::Hospitalized | AdmitsSeed::Zero => 0.0,
                    AdmitsSeed::AllDispositions => {
                        initial.infected * disposition.rate * p.market_share()
                    }
                };
                DispositionSeries::project(
                    kind,
                    disposition,
                    p.market_share(),
                    &ever_infected,
                    seed,
                )
            })
            .collect();

        let days: Vec<i64> = trajectory
            .rows()
            .iter()
            .map(|row| row.day as i64 - current_day as i64)
            .collect();
        let dates: Vec<NaiveDate> = trajectory.rows().iter().map(|row| row.date).collect();

        let sim_sir_w_date = Table::new(
            SIM_SIR_W_DATE,
            days.clone(),
            dates.clone(),
            vec![
                Column::new(
                    "susceptible",
                    trajectory.rows().iter().map(|row| row.susceptible).collect(),
                ),
                Column::new("infected", trajectory.infected()),
                Column::new(
                    "recovered",
                    trajectory.rows().iter().map(|row| row.recovered).collect(),
                ),
            ],
        )?;
        let admits = disposition_table(PROJECTED_ADMITS, "", &days, &dates, &dispositions, |d| {
            &d.admits
        })?;
        let census = disposition_table(PROJECTED_CENSUS, "", &days, &dates, &dispositions, |d| {
            &d.census
        })?;
        let ever = disposition_table(DISPOSITIONS, "ever_", &days, &dates, &dispositions, |d| {
            &d.ever
        })?;

        // Infections implied by the hospital census, whichever growth input
        // was used.
        let implied_infected = p.current_hospitalized() / hospitalized_share;
        let infected_now = trajectory
            .get(current_day)
            .map_or(initial.infected, |row| row.infected);
        let infected_exceeds_population = start_clamped
            || implied_infected > p.population()
            || infected_now > p.population();
        if infected_exceeds_population {
            warn!(
                "Estimated infections ({implied_infected:.0}) exceed the regional population ({}); \
                 check current_hospitalized, market_share and hospitalized.rate",
                p.population()
            );
        }

        Ok(SimSirModel {
            parameters: p.clone(),
            state,
            start_date,
            current_day,
            infected_exceeds_population,
            trajectory,
            dispositions,
            sim_sir_w_date,
            admits,
            census,
            ever,
        })
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn r_naught(&self) -> f64 {
        self.state.r_naught
    }

    pub fn r_t(&self) -> f64 {
        self.state.r_t
    }

    /// The doubling time the run used, given or back-solved.
    pub fn doubling_time(&self) -> f64 {
        self.state.raw_doubling_time
    }

    pub fn doubling_time_t(&self) -> f64 {
        self.state.doubling_time_t
    }

    pub fn daily_growth_rate(&self) -> f64 {
        self.state.growth_rate
    }

    pub fn daily_growth_rate_t(&self) -> f64 {
        self.state.growth_rate_t
    }

    pub fn mitigation_impact(&self) -> MitigationImpact {
        self.state
            .mitigation_impact(self.parameters.mitigation_date().is_some())
    }

    /// First simulated date.
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Index of the current date in the trajectory.
    pub fn current_day(&self) -> usize {
        self.current_day
    }

    fn current_row(&self) -> SirState {
        self.trajectory
            .get(self.current_day)
            .map(|row| SirState {
                susceptible: row.susceptible,
                infected: row.infected,
                recovered: row.recovered,
            })
            .unwrap_or(SirState {
                susceptible: 0.0,
                infected: 0.0,
                recovered: 0.0,
            })
    }

    /// Infected on the current date.
    pub fn infected(&self) -> f64 {
        self.current_row().infected
    }

    pub fn susceptible(&self) -> f64 {
        self.current_row().susceptible
    }

    pub fn recovered(&self) -> f64 {
        self.current_row().recovered
    }

    /// Set when the infections implied by the hospital census exceed the
    /// regional population. The run is still complete but should be shown
    /// with a warning.
    pub fn infected_exceeds_population(&self) -> bool {
        self.infected_exceeds_population
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn dispositions(&self) -> &[DispositionSeries] {
        &self.dispositions
    }

    pub fn disposition(&self, kind: DispositionKind) -> Option<&DispositionSeries> {
        self.dispositions.iter().find(|series| series.kind == kind)
    }

    /// Daily S/I/R counts. Each row sums to the population, except when
    /// [`infected_exceeds_population`](Self::infected_exceeds_population) is
    /// set and the initial infections alone outnumber it: rows then sum to
    /// the initial infected plus recovered.
    pub fn sim_sir_w_date(&self) -> &Table {
        &self.sim_sir_w_date
    }

    pub fn sim_sir_w_date_floor(&self) -> Table {
        self.sim_sir_w_date.floor()
    }

    pub fn admits(&self) -> &Table {
        &self.admits
    }

    pub fn admits_floor(&self) -> Table {
        self.admits.floor()
    }

    pub fn census(&self) -> &Table {
        &self.census
    }

    pub fn census_floor(&self) -> Table {
        self.census.floor()
    }

    /// Cumulative admissions per disposition.
    pub fn ever(&self) -> &Table {
        &self.ever
    }

    pub fn ever_floor(&self) -> Table {
        self.ever.floor()
    }

    pub fn tables(&self) -> [&Table; 4] {
        [&self.admits, &self.census, &self.sim_sir_w_date, &self.ever]
    }
}

fn disposition_table(
    name: &str,
    prefix: &str,
    days: &[i64],
    dates: &[NaiveDate],
    dispositions: &[DispositionSeries],
    series: impl Fn(&DispositionSeries) -> &Vec<f64>,
) -> Result<Table, ChimeError> {
    Table::new(
        name,
        days.to_vec(),
        dates.to_vec(),
        dispositions
            .iter()
            .map(|d| Column::new(format!("{prefix}{}", d.kind.name()), series(d).clone()))
            .collect(),
    )
}

/// Initial compartments for `infected` people. Susceptibles are clamped at
/// zero; the flag reports whether clamping was needed.
fn initial_state(p: &ParameterSet, infected: f64) -> (SirState, bool) {
    let susceptible = p.population() - infected - p.recovered();
    (
        SirState {
            susceptible: susceptible.max(0.0),
            infected,
            recovered: p.recovered(),
        },
        susceptible < 0.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::{Disposition, ParameterInput};
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use chrono::Days;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, 28).unwrap()
    }

    fn input() -> ParameterInput {
        ParameterInput {
            population: 1000.0,
            current_hospitalized: 2.0,
            hospitalized: Disposition {
                rate: 0.05,
                days: 7,
            },
            market_share: 0.15,
            doubling_time: Some(4.0),
            infectious_days: 14,
            n_days: 30,
            current_date: today(),
            ..ParameterInput::default()
        }
    }

    fn model(input: ParameterInput) -> SimSirModel {
        SimSirModel::new(&input.validate().unwrap()).unwrap()
    }

    #[test]
    fn test_small_town() {
        let m = model(input());
        assert_abs_diff_eq!(m.infected(), 266.667, epsilon = 1e-3);
        assert_abs_diff_eq!(m.daily_growth_rate(), 0.1892, epsilon = 1e-3);
        assert_abs_diff_eq!(m.r_naught(), 3.6489, epsilon = 1e-3);
        assert_eq!(m.r_t(), m.r_naught());
        assert_eq!(m.daily_growth_rate_t(), m.daily_growth_rate());
        assert_eq!(m.mitigation_impact(), MitigationImpact::None);
        assert_eq!(m.trajectory().len(), 31);
        assert_eq!(m.current_day(), 0);
        assert_eq!(m.start_date(), today());
        let first = m.trajectory().get(0).unwrap();
        assert_relative_eq!(
            first.susceptible + first.infected + first.recovered,
            1000.0,
            max_relative = 1e-12
        );
        assert!(!m.infected_exceeds_population());
    }

    #[test]
    fn test_conserves_population() {
        let inputs = [
            input(),
            ParameterInput {
                population: 3_600_000.0,
                current_hospitalized: 69.0,
                mitigation_date: today().checked_add_days(Days::new(5)),
                relative_contact_rate: 0.6,
                n_days: 200,
                ..input()
            },
            ParameterInput {
                population: 12_345.5,
                recovered: 100.0,
                doubling_time: Some(1.5),
                ..input()
            },
        ];
        for input in inputs {
            let population = input.population;
            let m = model(input);
            for row in m.trajectory().rows() {
                let total = row.susceptible + row.infected + row.recovered;
                assert!((total - population).abs() < 1e-6 * population, "{row:?}");
            }
        }
    }

    #[test]
    fn test_mitigation_bends_the_curve() {
        let m = model(ParameterInput {
            population: 10_000_000.0,
            mitigation_date: today().checked_add_days(Days::new(10)),
            relative_contact_rate: 0.5,
            ..input()
        });
        let infected = m.trajectory().infected();
        let delta: Vec<f64> = infected.windows(2).map(|w| w[1] - w[0]).collect();
        for day in 1..10 {
            assert!(delta[day] > delta[day - 1], "day {day}");
        }
        assert!(delta[10] < delta[9]);

        let unmitigated = model(ParameterInput {
            population: 10_000_000.0,
            ..input()
        });
        assert_eq!(infected[..=10], unmitigated.trajectory().infected()[..=10]);
        assert!(infected[11] < unmitigated.trajectory().infected()[11]);
    }

    #[test]
    fn test_mitigation_before_start_applies_from_day_zero() {
        let m = model(ParameterInput {
            population: 10_000_000.0,
            mitigation_date: today().checked_sub_days(Days::new(3)),
            relative_contact_rate: 0.5,
            ..input()
        });
        let expected = m.infected() * (1.0 + m.daily_growth_rate_t());
        assert_relative_eq!(
            m.trajectory().infected()[1],
            expected,
            max_relative = 1e-4
        );
    }

    #[test]
    fn test_strong_mitigation() {
        let m = model(ParameterInput {
            mitigation_date: Some(today()),
            relative_contact_rate: 0.99,
            ..input()
        });
        assert!(m.daily_growth_rate_t() < 0.0);
        assert!(m.doubling_time_t() < 0.0);
        assert!(matches!(
            m.mitigation_impact(),
            MitigationImpact::Halves { .. }
        ));
        let infected = m.trajectory().infected();
        assert!(infected[30] < infected[0]);
    }

    #[test]
    fn test_zero_growth_is_flat() {
        let m = model(ParameterInput {
            population: 1e9,
            doubling_time: Some(f64::INFINITY),
            ..input()
        });
        assert_eq!(m.daily_growth_rate(), 0.0);
        let infected = m.trajectory().infected();
        for value in &infected {
            assert_relative_eq!(*value, infected[0], max_relative = 1e-4);
        }
    }

    #[test]
    fn test_infected_exceeds_population() {
        let m = model(ParameterInput {
            population: 100.0,
            ..input()
        });
        assert!(m.infected_exceeds_population());
        assert_eq!(m.trajectory().len(), 31);
        assert_eq!(m.trajectory().get(0).unwrap().susceptible, 0.0);
        assert_eq!(m.admits().len(), 31);
    }

    #[test]
    fn test_date_first_hospitalized() {
        let first = today().checked_sub_days(Days::new(24)).unwrap();
        let m = model(ParameterInput {
            population: 1e9,
            current_hospitalized: 64.0,
            doubling_time: None,
            date_first_hospitalized: Some(first),
            ..input()
        });
        assert_abs_diff_eq!(m.doubling_time(), 4.0, epsilon = 1e-3);
        assert_eq!(m.start_date(), first);
        assert_eq!(m.current_day(), 24);
        assert_eq!(m.trajectory().len(), 55);
        assert_relative_eq!(m.infected(), 64.0 / 0.0075, max_relative = 1e-6);
        assert_eq!(m.admits().days()[0], -24);
        assert_eq!(m.admits().days()[24], 0);
        assert_eq!(m.admits().dates()[24], today());
        let hospitalized = m.disposition(DispositionKind::Hospitalized).unwrap();
        assert_eq!(hospitalized.admits[0], 1.0);
        assert!(!m.infected_exceeds_population());
    }

    #[test]
    fn test_date_first_hospitalized_beyond_population() {
        // 64 patients imply 8533 infections in a town of 1000.
        let first = today().checked_sub_days(Days::new(24)).unwrap();
        let m = model(ParameterInput {
            population: 1000.0,
            current_hospitalized: 64.0,
            doubling_time: None,
            date_first_hospitalized: Some(first),
            ..input()
        });
        assert!(m.infected_exceeds_population());
        assert!(m.infected() < 1000.0);
        assert_abs_diff_eq!(m.doubling_time(), 4.0, epsilon = 1e-9);
        let first_row = m.trajectory().get(0).unwrap();
        assert!(first_row.susceptible > 0.0);
    }

    #[test]
    fn test_mitigation_after_horizon() {
        let m = model(ParameterInput {
            mitigation_date: today().checked_add_days(Days::new(45)),
            relative_contact_rate: 0.5,
            ..input()
        });
        let unmitigated = model(input());
        assert_eq!(m.trajectory(), unmitigated.trajectory());
        assert_eq!(m.census(), unmitigated.census());
        assert!(m.r_t() < m.r_naught());
    }

    #[test]
    fn test_admits_seed_hospitalized() {
        let m = model(input());
        let hospitalized = m.disposition(DispositionKind::Hospitalized).unwrap();
        assert_eq!(hospitalized.admits[0], 2.0);
        assert_eq!(hospitalized.census[0], 2.0);
        assert_eq!(m.disposition(DispositionKind::Icu).unwrap().admits[0], 0.0);
        assert_eq!(
            m.disposition(DispositionKind::Ventilated).unwrap().admits[0],
            0.0
        );
    }

    #[test]
    fn test_admits_seed_all_dispositions() {
        let m = model(ParameterInput {
            admits_seed: AdmitsSeed::AllDispositions,
            icu: Disposition {
                rate: 0.02,
                days: 9,
            },
            ..input()
        });
        let icu = m.disposition(DispositionKind::Icu).unwrap();
        assert_relative_eq!(icu.admits[0], m.infected() * 0.02 * 0.15, max_relative = 1e-12);
        let hospitalized = m.disposition(DispositionKind::Hospitalized).unwrap();
        assert_relative_eq!(hospitalized.admits[0], 2.0, max_relative = 1e-12);
    }

    #[test]
    fn test_admits_seed_zero() {
        let m = model(ParameterInput {
            admits_seed: AdmitsSeed::Zero,
            ..input()
        });
        for series in m.dispositions() {
            assert_eq!(series.admits[0], 0.0);
            assert_eq!(series.census[0], 0.0);
        }
    }

    #[test]
    fn test_admits_follow_new_infections() {
        let m = model(input());
        let ever = m.trajectory().ever_infected();
        let hospitalized = m.disposition(DispositionKind::Hospitalized).unwrap();
        for day in 1..ever.len() {
            let expected = (0.05 * 0.15 * (ever[day] - ever[day - 1])).max(0.0);
            assert_relative_eq!(hospitalized.admits[day], expected, max_relative = 1e-12);
            assert!(hospitalized.census[day] >= 0.0);
        }
    }

    #[test]
    fn test_tables() {
        let m = model(input());
        assert_eq!(m.admits().name(), PROJECTED_ADMITS);
        assert_eq!(
            m.admits().headers(),
            vec!["day", "date", "hospitalized", "icu", "ventilated"]
        );
        assert_eq!(
            m.ever().headers(),
            vec!["day", "date", "ever_hospitalized", "ever_icu", "ever_ventilated"]
        );
        assert_eq!(
            m.sim_sir_w_date().headers(),
            vec!["day", "date", "susceptible", "infected", "recovered"]
        );
        for table in m.tables() {
            assert_eq!(table.len(), m.trajectory().len());
            assert!(table.dates().windows(2).all(|w| w[0] < w[1]));
        }
        let floor = m.census_floor();
        for (raw, floor) in m.census().columns().iter().zip(floor.columns()) {
            for (raw, floor) in raw.values.iter().zip(&floor.values) {
                assert_eq!(*floor, raw.floor());
            }
        }
        assert_eq!(m.sim_sir_w_date_floor().column("infected").unwrap()[0], 266.0);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(model(input()), model(input()));
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SimSirModel>();
        assert_send_sync::<ParameterSet>();
    }
}
