use serde_json::{Map, Value};

use crate::{Error, Result, technique};
use hyfuse_domain::CompoundHits;

/// Score assigned by L2 when a sub-query's norm is zero.
pub const MIN_SCORE: f32 = 0.001;
/// Score assigned by min-max when every hit of a sub-query has the same score.
pub const SINGLE_RESULT_SCORE: f32 = 1.0;

const L2: &str = "l2";
const MIN_MAX: &str = "min_max";
const SUPPORTED: [&str; 2] = [L2, MIN_MAX];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NormalizationTechnique {
	L2,
	MinMax,
}
impl NormalizationTechnique {
	pub fn parse(name: &str, params: &Map<String, Value>) -> Result<Self> {
		let technique =
			match technique::parse_technique_name(name, "normalization.technique", &SUPPORTED)? {
				L2 => Self::L2,
				MIN_MAX => Self::MinMax,
				other => return Err(technique::unsupported_technique(other)),
			};

		technique::validate_param_names(params, technique.supported_params(), technique.as_str())?;

		Ok(technique)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::L2 => L2,
			Self::MinMax => MIN_MAX,
		}
	}

	fn supported_params(self) -> &'static [&'static str] {
		match self {
			Self::L2 | Self::MinMax => &[],
		}
	}

	/// Rewrites every hit score in place using statistics gathered over all shards.
	pub fn normalize(self, shards: &mut [CompoundHits]) -> Result<()> {
		match self {
			Self::L2 => normalize_l2(shards),
			Self::MinMax => normalize_min_max(shards),
		}
	}
}

#[derive(Clone, Debug)]
pub struct NormalizationContext {
	pub technique: NormalizationTechnique,
}
impl NormalizationContext {
	pub fn new(technique: NormalizationTechnique) -> Self {
		Self { technique }
	}

	pub fn from_config(cfg: &hyfuse_config::Technique) -> Result<Self> {
		Ok(Self::new(NormalizationTechnique::parse(&cfg.technique, &cfg.parameters)?))
	}
}

/// Fails with a format error when no shard carries any sub-query results.
pub fn normalize_scores(shards: &mut [CompoundHits], ctx: &NormalizationContext) -> Result<()> {
	ctx.technique.normalize(shards)
}

fn sub_query_count(shards: &[CompoundHits]) -> Result<usize> {
	let Some(count) =
		shards.iter().find(|shard| !shard.is_empty()).map(CompoundHits::sub_query_count)
	else {
		return Err(Error::Format {
			message: "score normalization requires at least one shard with sub-query results."
				.to_string(),
		});
	};

	for (idx, shard) in shards.iter().enumerate() {
		if shard.sub_query_count() > count {
			return Err(Error::Format {
				message: format!(
					"shard {idx} has {} sub-query lists but {count} were expected.",
					shard.sub_query_count()
				),
			});
		}
	}

	Ok(count)
}

fn normalize_l2(shards: &mut [CompoundHits]) -> Result<()> {
	let count = sub_query_count(shards)?;
	let mut norms = vec![0.0_f32; count];

	for shard in shards.iter() {
		for (idx, hits) in shard.sub_queries.iter().enumerate() {
			norms[idx] += hits.iter().map(|hit| hit.score * hit.score).sum::<f32>();
		}
	}
	for norm in &mut norms {
		*norm = norm.sqrt();
	}

	for shard in shards.iter_mut() {
		for (idx, hits) in shard.sub_queries.iter_mut().enumerate() {
			let norm = norms[idx];

			for hit in hits {
				hit.score = if norm == 0.0 { MIN_SCORE } else { hit.score / norm };
			}
		}
	}

	Ok(())
}

fn normalize_min_max(shards: &mut [CompoundHits]) -> Result<()> {
	let count = sub_query_count(shards)?;
	let mut mins = vec![f32::MAX; count];
	let mut maxs = vec![f32::MIN; count];

	for shard in shards.iter() {
		for (idx, hits) in shard.sub_queries.iter().enumerate() {
			for hit in hits {
				mins[idx] = mins[idx].min(hit.score);
				maxs[idx] = maxs[idx].max(hit.score);
			}
		}
	}

	for shard in shards.iter_mut() {
		for (idx, hits) in shard.sub_queries.iter_mut().enumerate() {
			let (min, max) = (mins[idx], maxs[idx]);

			for hit in hits {
				hit.score =
					if max == min { SINGLE_RESULT_SCORE } else { (hit.score - min) / (max - min) };
			}
		}
	}

	Ok(())
}
