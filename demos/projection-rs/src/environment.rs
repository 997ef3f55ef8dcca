use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chime::Table;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// A run request: the `input` section holding model parameters and the
/// `output` section saying where tables go.
pub struct Environment<I = ()> {
    input_json: serde_json::Map<String, Value>,
    pub input: I,
    output: Value,
}

impl Environment {
    pub fn from_json(data: Value) -> Self {
        let input_json = data
            .get("input")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        let output = data.get("output").cloned().unwrap_or(Value::Null);

        Self {
            input_json,
            input: (),
            output,
        }
    }

    pub fn from_reader<R: Read>(mut reader: R) -> anyhow::Result<Self> {
        let mut raw = String::new();
        reader
            .read_to_string(&mut raw)
            .context("failed to read run request")?;
        if raw.trim().is_empty() {
            bail!("no run request on stdin");
        }
        let data: Value = serde_json::from_str(&raw).context("failed to parse run request JSON")?;
        Ok(Self::from_json(data))
    }

    /// Reads a TOML config with an `[input]` table and an optional `[output]`
    /// table. Dates are written as quoted `YYYY-MM-DD` strings.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let table: toml::Table = toml::from_str(text).context("failed to parse TOML config")?;
        let data = serde_json::to_value(table).context("failed to convert TOML config")?;
        Ok(Self::from_json(data))
    }

    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&text)
    }

    pub fn with_input_type<I: DeserializeOwned>(self) -> anyhow::Result<Environment<I>> {
        let input_value = Value::Object(self.input_json.clone());
        let input = serde_json::from_value(input_value).context("failed to deserialize input")?;
        Ok(Environment {
            input_json: self.input_json,
            input,
            output: self.output,
        })
    }
}

impl<I> Environment<I> {
    pub fn set_output_dir(&mut self, dir: &Path) {
        self.output = json!({
            "spec": "filesystem",
            "dir": dir.to_string_lossy(),
        });
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        let output = &self.output;

        if output.get("spec").and_then(|v| v.as_str()) == Some("filesystem") {
            if let Some(dir) = output.get("dir").and_then(|v| v.as_str()) {
                return Some(PathBuf::from(dir));
            }
            return None;
        }

        // Profiled output: the default profile, or the first one listed
        if let Some(profiles) = output.get("profile").and_then(|v| v.as_object()) {
            let selected = profiles
                .get("default")
                .or_else(|| profiles.values().next());
            if let Some(profile) = selected
                && profile.get("spec").and_then(|v| v.as_str()) == Some("filesystem")
                && let Some(dir) = profile.get("dir").and_then(|v| v.as_str())
            {
                return Some(PathBuf::from(dir));
            }
        }

        None
    }

    pub fn write(&self, filename: &str, data: &[u8]) -> anyhow::Result<()> {
        if let Some(dir) = self.output_dir() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            fs::write(dir.join(filename), data)
                .with_context(|| format!("failed to write {filename}"))?;
        } else {
            io::stdout()
                .write_all(data)
                .context("failed to write to stdout")?;
        }
        Ok(())
    }

    pub fn write_table(&self, filename: &str, table: &Table) -> anyhow::Result<()> {
        if let Some(dir) = self.output_dir() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            let file = fs::File::create(dir.join(filename))
                .with_context(|| format!("failed to create {filename}"))?;
            table
                .write_csv(file)
                .with_context(|| format!("failed to write {filename}"))?;
        } else {
            table
                .write_csv(io::stdout().lock())
                .with_context(|| format!("failed to write {filename} to stdout"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chime::ParameterInput;
    use chrono::NaiveDate;

    #[test]
    fn test_from_json_basic() {
        let data = json!({
            "input": {
                "population": 1000.0,
                "doubling_time": 4.0,
                "current_date": "2020-03-28"
            },
            "output": {
                "spec": "filesystem",
                "dir": "/tmp/output"
            }
        });
        let env = Environment::from_json(data);
        assert_eq!(
            env.input_json.get("population").unwrap().as_f64().unwrap(),
            1000.0
        );
        assert_eq!(env.output_dir(), Some(PathBuf::from("/tmp/output")));
    }

    #[test]
    fn test_with_input_type() {
        let data = json!({
            "input": {
                "population": 1000.0,
                "doubling_time": 4.0,
                "current_date": "2020-03-28"
            }
        });
        let env = Environment::from_json(data)
            .with_input_type::<ParameterInput>()
            .unwrap();
        assert_eq!(env.input.population, 1000.0);
        assert_eq!(env.input.doubling_time, Some(4.0));
        assert_eq!(
            env.input.current_date,
            NaiveDate::from_ymd_opt(2020, 3, 28).unwrap()
        );
    }

    #[test]
    fn test_with_input_type_rejects_bad_input() {
        let data = json!({ "input": { "population": "many" } });
        assert!(
            Environment::from_json(data)
                .with_input_type::<ParameterInput>()
                .is_err()
        );
    }

    #[test]
    fn test_from_toml() {
        let env = Environment::from_toml(
            r#"
            [input]
            population = 1000.0
            date_first_hospitalized = "2020-03-01"
            current_date = "2020-03-28"
            current_hospitalized = 12.0

            [input.icu]
            rate = 0.01
            days = 5

            [output]
            spec = "filesystem"
            dir = "out"
            "#,
        )
        .unwrap()
        .with_input_type::<ParameterInput>()
        .unwrap();
        assert_eq!(env.input.icu.days, 5);
        assert_eq!(
            env.input.date_first_hospitalized,
            NaiveDate::from_ymd_opt(2020, 3, 1)
        );
        assert_eq!(env.output_dir(), Some(PathBuf::from("out")));
    }

    #[test]
    fn test_example_config_is_valid() {
        let env = Environment::from_toml(include_str!("../chime.toml"))
            .unwrap()
            .with_input_type::<ParameterInput>()
            .unwrap();
        let parameters = env.input.clone().validate().unwrap();
        assert_eq!(parameters.doubling_time(), Some(4.0));
        assert_eq!(
            parameters.mitigation_date(),
            NaiveDate::from_ymd_opt(2020, 4, 4)
        );
        assert_eq!(env.output_dir(), None);
    }

    #[test]
    fn test_from_reader_empty() {
        assert!(Environment::from_reader("  \n".as_bytes()).is_err());
        assert!(Environment::from_reader("{\"input\": {}}".as_bytes()).is_ok());
    }

    #[test]
    fn test_output_dir_profiled() {
        let data = json!({
            "input": {},
            "output": {
                "profile": {
                    "default": {
                        "spec": "filesystem",
                        "dir": "/tmp/profiled"
                    }
                }
            }
        });
        let env = Environment::from_json(data);
        assert_eq!(env.output_dir(), Some(PathBuf::from("/tmp/profiled")));
    }

    #[test]
    fn test_output_dir_none() {
        let data = json!({
            "input": {},
            "output": {
                "spec": "stdout"
            }
        });
        let env = Environment::from_json(data);
        assert_eq!(env.output_dir(), None);
    }

    #[test]
    fn test_set_output_dir() {
        let mut env = Environment::from_json(json!({}));
        assert!(env.input_json.is_empty());
        assert_eq!(env.output_dir(), None);
        env.set_output_dir(Path::new("/tmp/override"));
        assert_eq!(env.output_dir(), Some(PathBuf::from("/tmp/override")));
    }
}
