use chime::{MitigationImpact, SimSirModel};
use chrono::NaiveDate;
use log::info;
use serde::Serialize;

use crate::environment::Environment;

pub const SUMMARY_FILE: &str = "run.json";

/// Headline numbers of a run, written next to the tables.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub current_date: NaiveDate,
    pub start_date: NaiveDate,
    pub doubling_time: f64,
    pub doubling_time_t: f64,
    pub daily_growth_rate: f64,
    pub daily_growth_rate_t: f64,
    pub r_naught: f64,
    pub r_t: f64,
    pub susceptible: f64,
    pub infected: f64,
    pub recovered: f64,
    pub infected_exceeds_population: bool,
    pub mitigation_impact: MitigationImpact,
    pub max_y_axis: Option<f64>,
    pub tables: Vec<String>,
}

impl RunSummary {
    pub fn new(model: &SimSirModel, tables: Vec<String>) -> anyhow::Result<RunSummary> {
        let p = model.parameters();
        Ok(RunSummary {
            run_id: p.digest()?,
            current_date: p.current_date(),
            start_date: model.start_date(),
            doubling_time: model.doubling_time(),
            doubling_time_t: model.doubling_time_t(),
            daily_growth_rate: model.daily_growth_rate(),
            daily_growth_rate_t: model.daily_growth_rate_t(),
            r_naught: model.r_naught(),
            r_t: model.r_t(),
            susceptible: model.susceptible(),
            infected: model.infected(),
            recovered: model.recovered(),
            infected_exceeds_population: model.infected_exceeds_population(),
            mitigation_impact: model.mitigation_impact(),
            max_y_axis: p.max_y_axis(),
            tables,
        })
    }
}

/// Writes every table of `model` (floor views when `floor` is set) and the
/// run summary.
pub fn write_outputs<I>(
    env: &Environment<I>,
    model: &SimSirModel,
    floor: bool,
) -> anyhow::Result<RunSummary> {
    let current_date = model.parameters().current_date();
    let mut files = Vec::new();
    for table in model.tables() {
        let file_name = table.file_name(current_date);
        if floor {
            env.write_table(&file_name, &table.floor())?;
        } else {
            env.write_table(&file_name, table)?;
        }
        info!("Wrote {file_name} ({} rows)", table.len());
        files.push(file_name);
    }

    let summary = RunSummary::new(model, files)?;
    let mut json = serde_json::to_vec_pretty(&summary)?;
    json.push(b'\n');
    env.write(SUMMARY_FILE, &json)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chime::{ParameterInput, Table};
    use serde_json::{Value, json};
    use std::fs;

    fn model() -> SimSirModel {
        let parameters = ParameterInput {
            population: 1000.0,
            current_hospitalized: 2.0,
            doubling_time: Some(4.0),
            n_days: 30,
            current_date: NaiveDate::from_ymd_opt(2020, 3, 28).unwrap(),
            ..ParameterInput::default()
        }
        .validate()
        .unwrap();
        SimSirModel::new(&parameters).unwrap()
    }

    #[test]
    fn test_write_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = Environment::from_json(json!({}));
        env.set_output_dir(dir.path());

        let model = model();
        let summary = write_outputs(&env, &model, false).unwrap();
        assert_eq!(
            summary.tables,
            vec![
                "2020-03-28_projected_admits.csv",
                "2020-03-28_projected_census.csv",
                "2020-03-28_sim_sir_w_date.csv",
                "2020-03-28_dispositions.csv",
            ]
        );

        let census = Table::from_csv(
            "projected_census",
            fs::File::open(dir.path().join("2020-03-28_projected_census.csv")).unwrap(),
        )
        .unwrap();
        assert_eq!(&census, model.census());

        let run: Value =
            serde_json::from_slice(&fs::read(dir.path().join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(run["run_id"], json!(model.parameters().digest().unwrap()));
        assert_eq!(run["current_date"], json!("2020-03-28"));
        assert_eq!(run["mitigation_impact"], json!({ "kind": "none" }));
        assert_eq!(run["infected_exceeds_population"], json!(false));
    }

    #[test]
    fn test_write_floor_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = Environment::from_json(json!({}));
        env.set_output_dir(dir.path());

        let model = model();
        write_outputs(&env, &model, true).unwrap();
        let admits = Table::from_csv(
            "projected_admits",
            fs::File::open(dir.path().join("2020-03-28_projected_admits.csv")).unwrap(),
        )
        .unwrap();
        assert_eq!(admits, model.admits_floor());
    }
}
