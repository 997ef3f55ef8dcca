//! Hospital demand projections from a discrete-time SIR model.
//!
//! Collect user input into a [`ParameterInput`], validate it into a
//! [`ParameterSet`], then build a [`SimSirModel`]:
//!
//! ```
//! use chime::{ParameterInput, SimSirModel};
//! use chrono::NaiveDate;
//!
//! let parameters = ParameterInput {
//!     doubling_time: Some(4.0),
//!     current_date: NaiveDate::from_ymd_opt(2020, 3, 28).unwrap(),
//!     ..ParameterInput::default()
//! }
//! .validate()
//! .unwrap();
//! let model = SimSirModel::new(&parameters).unwrap();
//! let csv = model.census_floor().to_csv_string().unwrap();
//! assert!(csv.starts_with("day,date,hospitalized,icu,ventilated"));
//! ```

pub mod defaults;
pub mod dispositions;
pub mod error;
pub mod model;
pub mod parameters;
pub mod rates;
pub mod sir;
pub mod table;

pub use dispositions::DispositionSeries;
pub use error::ChimeError;
pub use model::SimSirModel;
pub use parameters::{
    AdmitsSeed, Disposition, DispositionKind, Dispositions, GrowthInput, ParameterInput,
    ParameterSet,
};
pub use rates::{MitigationImpact, SimulationState};
pub use sir::{Trajectory, TrajectoryRow};
pub use table::{Column, Table};
