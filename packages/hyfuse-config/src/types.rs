use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub service: Service,
	pub normalization: Technique,
	pub combination: Technique,
	#[serde(default)]
	pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Service {
	pub log_level: String,
}
impl Default for Service {
	fn default() -> Self {
		Self { log_level: "info".to_string() }
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct Technique {
	pub technique: String,
	/// Technique specific parameters, validated against the technique's allow-list at
	/// construction.
	#[serde(default)]
	pub parameters: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pagination {
	/// Upper bound of hits each sub-query collects per shard.
	pub depth: u32,
}
impl Default for Pagination {
	fn default() -> Self {
		Self { depth: 100 }
	}
}
