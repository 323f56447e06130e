use serde_json::{Map, Value};

use crate::{Error, Result};

pub fn parse_technique_name<'a>(
	value: &str,
	label: &str,
	supported: &[&'a str],
) -> Result<&'a str> {
	let normalized = value.trim().to_ascii_lowercase();

	supported.iter().copied().find(|name| *name == normalized).ok_or_else(|| Error::Configuration {
		message: format!("{label} must be one of: {}. Got {normalized}.", supported.join(", ")),
	})
}

/// Error for a name that passed the allow-list but has no matching variant.
pub fn unsupported_technique(name: &str) -> Error {
	Error::Configuration { message: format!("technique {name} has no implementation.") }
}

/// Rejects every parameter name outside `allowed`.
pub fn validate_param_names(
	params: &Map<String, Value>,
	allowed: &[&str],
	technique: &str,
) -> Result<()> {
	let mut unsupported: Vec<&str> =
		params.keys().map(String::as_str).filter(|key| !allowed.contains(key)).collect();

	if unsupported.is_empty() {
		return Ok(());
	}

	unsupported.sort_unstable();

	Err(Error::Configuration {
		message: format!(
			"unrecognized parameters in {technique} technique: {}. Supported parameters: [{}].",
			unsupported.join(", "),
			allowed.join(", ")
		),
	})
}

pub fn parse_float_list(value: &Value, path: &str) -> Result<Vec<f32>> {
	let Some(items) = value.as_array() else {
		return Err(Error::Configuration { message: format!("{path} must be a list of numbers.") });
	};
	let mut out = Vec::with_capacity(items.len());

	for item in items {
		let Some(number) = item.as_f64() else {
			return Err(Error::Configuration {
				message: format!("{path} must be a list of numbers."),
			});
		};

		out.push(number as f32);
	}

	Ok(out)
}
