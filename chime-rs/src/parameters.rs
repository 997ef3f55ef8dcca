use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::defaults;
use crate::error::ChimeError;

/// Patient-care categories projected by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispositionKind {
    Hospitalized,
    Icu,
    Ventilated,
}

impl DispositionKind {
    pub const ALL: [DispositionKind; 3] = [
        DispositionKind::Hospitalized,
        DispositionKind::Icu,
        DispositionKind::Ventilated,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DispositionKind::Hospitalized => "hospitalized",
            DispositionKind::Icu => "icu",
            DispositionKind::Ventilated => "ventilated",
        }
    }
}

/// Share of all infections that end up in a care setting, and the average
/// length of stay there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Disposition {
    pub rate: f64,
    pub days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dispositions {
    pub hospitalized: Disposition,
    pub icu: Disposition,
    pub ventilated: Disposition,
}

impl Dispositions {
    pub fn get(&self, kind: DispositionKind) -> &Disposition {
        match kind {
            DispositionKind::Hospitalized => &self.hospitalized,
            DispositionKind::Icu => &self.icu,
            DispositionKind::Ventilated => &self.ventilated,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (DispositionKind, &Disposition)> {
        DispositionKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
    }
}

impl Default for Dispositions {
    fn default() -> Self {
        Dispositions {
            hospitalized: Disposition {
                rate: defaults::HOSPITALIZED_RATE.default,
                days: defaults::HOSPITALIZED_DAYS.default as u32,
            },
            icu: Disposition {
                rate: defaults::ICU_RATE.default,
                days: defaults::ICU_DAYS.default as u32,
            },
            ventilated: Disposition {
                rate: defaults::VENTILATED_RATE.default,
                days: defaults::VENTILATED_DAYS.default as u32,
            },
        }
    }
}

/// How admissions on the first simulated day are seeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmitsSeed {
    /// The hospitalized series starts with the patients already in hospital;
    /// ICU and ventilated start at zero.
    #[default]
    Hospitalized,
    /// Every disposition starts with its share of the initial infections.
    AllDispositions,
    Zero,
}

/// What the growth of infections is estimated from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthInput {
    DoublingTime(f64),
    /// Back-solve the doubling time from the date the first patient was
    /// hospitalized.
    DateFirstHospitalized(NaiveDate),
}

/// Raw, unvalidated input as collected from a user or a config file.
///
/// Exactly one of `doubling_time` and `date_first_hospitalized` must be set;
/// both are left unset when missing from a deserialized document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterInput {
    pub population: f64,
    pub market_share: f64,
    pub current_hospitalized: f64,
    pub recovered: f64,
    #[serde(default)]
    pub doubling_time: Option<f64>,
    #[serde(default)]
    pub date_first_hospitalized: Option<NaiveDate>,
    pub mitigation_date: Option<NaiveDate>,
    pub relative_contact_rate: f64,
    pub hospitalized: Disposition,
    pub icu: Disposition,
    pub ventilated: Disposition,
    pub infectious_days: u32,
    pub n_days: u32,
    pub current_date: NaiveDate,
    pub max_y_axis: Option<f64>,
    pub admits_seed: AdmitsSeed,
}

impl Default for ParameterInput {
    fn default() -> Self {
        let dispositions = Dispositions::default();
        ParameterInput {
            population: defaults::POPULATION.default,
            market_share: defaults::MARKET_SHARE.default,
            current_hospitalized: defaults::CURRENT_HOSPITALIZED.default,
            recovered: defaults::RECOVERED.default,
            doubling_time: None,
            date_first_hospitalized: None,
            mitigation_date: None,
            relative_contact_rate: defaults::RELATIVE_CONTACT_RATE.default,
            hospitalized: dispositions.hospitalized,
            icu: dispositions.icu,
            ventilated: dispositions.ventilated,
            infectious_days: defaults::INFECTIOUS_DAYS.default as u32,
            n_days: defaults::N_DAYS.default as u32,
            current_date: Local::now().date_naive(),
            max_y_axis: None,
            admits_seed: AdmitsSeed::default(),
        }
    }
}

impl ParameterInput {
    /// Checks every value against the defaults table and the growth-input
    /// rule, producing an immutable [`ParameterSet`].
    pub fn validate(self) -> Result<ParameterSet, ChimeError> {
        let growth = match (self.doubling_time, self.date_first_hospitalized) {
            (Some(doubling_time), None) => {
                GrowthInput::DoublingTime(defaults::DOUBLING_TIME.check(doubling_time)?)
            }
            (None, Some(date)) => {
                if date >= self.current_date {
                    return Err(ChimeError::invalid(format!(
                        "date_first_hospitalized ({date}) must be before current_date ({})",
                        self.current_date
                    )));
                }
                let elapsed = self.current_date.signed_duration_since(date).num_days();
                if elapsed > defaults::MAX_DAYS_SINCE_FIRST_HOSPITALIZED {
                    return Err(ChimeError::invalid(format!(
                        "date_first_hospitalized ({date}) is {elapsed} days before current_date; \
                         at most {} are supported",
                        defaults::MAX_DAYS_SINCE_FIRST_HOSPITALIZED
                    )));
                }
                if self.current_hospitalized < 1.0 {
                    return Err(ChimeError::invalid(
                        "current_hospitalized must be at least 1 when date_first_hospitalized is set",
                    ));
                }
                GrowthInput::DateFirstHospitalized(date)
            }
            (Some(_), Some(_)) => {
                return Err(ChimeError::invalid(
                    "only one of doubling_time and date_first_hospitalized may be set",
                ));
            }
            (None, None) => {
                return Err(ChimeError::invalid(
                    "one of doubling_time and date_first_hospitalized must be set",
                ));
            }
        };

        let dispositions = Dispositions {
            hospitalized: check_disposition(
                self.hospitalized,
                &defaults::HOSPITALIZED_RATE,
                &defaults::HOSPITALIZED_DAYS,
            )?,
            icu: check_disposition(self.icu, &defaults::ICU_RATE, &defaults::ICU_DAYS)?,
            ventilated: check_disposition(
                self.ventilated,
                &defaults::VENTILATED_RATE,
                &defaults::VENTILATED_DAYS,
            )?,
        };

        if let Some(max_y_axis) = self.max_y_axis {
            defaults::MAX_Y_AXIS.check(max_y_axis)?;
        }

        Ok(ParameterSet {
            population: defaults::POPULATION.check(self.population)?,
            market_share: defaults::MARKET_SHARE.check(self.market_share)?,
            current_hospitalized: defaults::CURRENT_HOSPITALIZED
                .check(self.current_hospitalized)?,
            recovered: defaults::RECOVERED.check(self.recovered)?,
            growth,
            mitigation_date: self.mitigation_date,
            relative_contact_rate: defaults::RELATIVE_CONTACT_RATE
                .check(self.relative_contact_rate)?,
            dispositions,
            infectious_days: defaults::INFECTIOUS_DAYS.check(f64::from(self.infectious_days))?
                as u32,
            n_days: defaults::N_DAYS.check(f64::from(self.n_days))? as u32,
            current_date: self.current_date,
            max_y_axis: self.max_y_axis,
            admits_seed: self.admits_seed,
        })
    }
}

fn check_disposition(
    disposition: Disposition,
    rate: &defaults::ParameterDefault,
    days: &defaults::ParameterDefault,
) -> Result<Disposition, ChimeError> {
    rate.check(disposition.rate)?;
    days.check(f64::from(disposition.days))?;
    Ok(disposition)
}

/// Validated, immutable inputs of one projection run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSet {
    population: f64,
    market_share: f64,
    current_hospitalized: f64,
    recovered: f64,
    growth: GrowthInput,
    mitigation_date: Option<NaiveDate>,
    relative_contact_rate: f64,
    dispositions: Dispositions,
    infectious_days: u32,
    n_days: u32,
    current_date: NaiveDate,
    max_y_axis: Option<f64>,
    admits_seed: AdmitsSeed,
}

impl ParameterSet {
    pub fn population(&self) -> f64 {
        self.population
    }

    pub fn market_share(&self) -> f64 {
        self.market_share
    }

    pub fn current_hospitalized(&self) -> f64 {
        self.current_hospitalized
    }

    pub fn recovered(&self) -> f64 {
        self.recovered
    }

    pub fn growth(&self) -> GrowthInput {
        self.growth
    }

    /// The doubling time when it was supplied directly.
    pub fn doubling_time(&self) -> Option<f64> {
        match self.growth {
            GrowthInput::DoublingTime(doubling_time) => Some(doubling_time),
            GrowthInput::DateFirstHospitalized(_) => None,
        }
    }

    pub fn date_first_hospitalized(&self) -> Option<NaiveDate> {
        match self.growth {
            GrowthInput::DoublingTime(_) => None,
            GrowthInput::DateFirstHospitalized(date) => Some(date),
        }
    }

    pub fn mitigation_date(&self) -> Option<NaiveDate> {
        self.mitigation_date
    }

    pub fn relative_contact_rate(&self) -> f64 {
        self.relative_contact_rate
    }

    /// The contact-rate reduction actually applied: zero without a mitigation
    /// date.
    pub fn effective_contact_reduction(&self) -> f64 {
        if self.mitigation_date.is_some() {
            self.relative_contact_rate
        } else {
            0.0
        }
    }

    pub fn dispositions(&self) -> &Dispositions {
        &self.dispositions
    }

    pub fn hospitalized(&self) -> &Disposition {
        &self.dispositions.hospitalized
    }

    pub fn infectious_days(&self) -> u32 {
        self.infectious_days
    }

    pub fn n_days(&self) -> u32 {
        self.n_days
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    pub fn max_y_axis(&self) -> Option<f64> {
        self.max_y_axis
    }

    pub fn admits_seed(&self) -> AdmitsSeed {
        self.admits_seed
    }

    /// SHA-256 of the canonical JSON form, hex encoded. Identical parameter
    /// sets always share a digest.
    pub fn digest(&self) -> Result<String, ChimeError> {
        let canonical = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }
}
