//! Python bindings for the JSON entry points.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use pyo3::prelude::*;

use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::request;

fn to_py_err(err: PlannerError) -> PyErr {
    pyo3::exceptions::PyValueError::new_err(err.to_string())
}

/// Generate a single-plan schedule.
///
/// # Arguments
/// * `request_json` - camelCase schedule request document
/// * `config_toml` - Optional planner configuration; defaults apply when omitted
///
/// # Returns
/// * JSON string with `items` and `unplacedTasks`
///
/// # Raises
/// * ValueError on malformed JSON or an invalid configuration
#[pyfunction]
#[pyo3(signature = (request_json, config_toml=None))]
fn generate_schedule(request_json: &str, config_toml: Option<&str>) -> PyResult<String> {
    let config = match config_toml {
        Some(source) => PlannerConfig::from_toml_str(source).map_err(to_py_err)?,
        None => PlannerConfig::default(),
    };
    request::generate_schedule_json_with(request_json, config).map_err(to_py_err)
}

/// Build the three candidate plans for an auto-plan request.
///
/// # Raises
/// * ValueError on malformed JSON
#[pyfunction]
fn generate_auto_plans(request_json: &str) -> PyResult<String> {
    request::generate_auto_plans_json(request_json).map_err(to_py_err)
}

/// The default planner configuration as TOML.
#[pyfunction]
fn default_config_toml() -> PyResult<String> {
    PlannerConfig::default().to_toml_string().map_err(to_py_err)
}

/// The study_planner Python module.
#[pymodule]
fn study_planner(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(generate_schedule, m)?)?;
    m.add_function(wrap_pyfunction!(generate_auto_plans, m)?)?;
    m.add_function(wrap_pyfunction!(default_config_toml, m)?)?;
    Ok(())
}
