mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Pagination, Service, Technique};

use std::{fs, path::Path};

pub const MAX_PAGINATION_DEPTH: u32 = 10_000;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse_at(&raw, path)
}

pub fn parse(raw: &str) -> Result<Config> {
	parse_at(raw, Path::new("<inline>"))
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}

	for (label, technique) in
		[("normalization", &cfg.normalization), ("combination", &cfg.combination)]
	{
		if technique.technique.is_empty() {
			return Err(Error::Validation {
				message: format!("{label}.technique must be non-empty."),
			});
		}

		for key in technique.parameters.keys() {
			if key.trim().is_empty() {
				return Err(Error::Validation {
					message: format!("{label}.parameters must not contain empty keys."),
				});
			}
		}
	}

	if cfg.pagination.depth == 0 {
		return Err(Error::Validation {
			message: "pagination.depth must be greater than zero.".to_string(),
		});
	}
	if cfg.pagination.depth > MAX_PAGINATION_DEPTH {
		return Err(Error::Validation {
			message: format!("pagination.depth must be {MAX_PAGINATION_DEPTH} or less."),
		});
	}

	Ok(())
}

fn parse_at(raw: &str, path: &Path) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

fn normalize(cfg: &mut Config) {
	for technique in [&mut cfg.normalization, &mut cfg.combination] {
		technique.technique = technique.technique.trim().to_ascii_lowercase();
	}

	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = Service::default().log_level;
	}
}
