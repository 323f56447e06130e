use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::{Error, Result, technique};
use hyfuse_domain::{CompoundHits, DocId, FusedHit, SortSpec, SortValue};

/// Score of a document no sub-query matched.
pub const ZERO_SCORE: f32 = 0.0;
/// Placeholder for "this sub-query produced no hit for the document".
pub const NO_HIT_SCORE: f32 = -1.0;
pub const PARAM_WEIGHTS: &str = "weights";

const ARITHMETIC_MEAN: &str = "arithmetic_mean";
const HARMONIC_MEAN: &str = "harmonic_mean";
const GEOMETRIC_MEAN: &str = "geometric_mean";
const SUPPORTED: [&str; 3] = [ARITHMETIC_MEAN, HARMONIC_MEAN, GEOMETRIC_MEAN];
const SUPPORTED_PARAMS: [&str; 1] = [PARAM_WEIGHTS];
const WEIGHT_SUM_DELTA: f32 = 0.0005;

/// Per sub-query weights. Empty means uniform; an index past the end weighs 1.0.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Weights(Vec<f32>);
impl Weights {
	pub fn uniform() -> Self {
		Self(Vec::new())
	}

	pub fn new(values: Vec<f32>) -> Result<Self> {
		for value in &values {
			if !value.is_finite() {
				return Err(Error::Configuration {
					message: "combination.parameters.weights must contain finite numbers."
						.to_string(),
				});
			}
			if !(0.0..=1.0).contains(value) {
				return Err(Error::Configuration {
					message: "combination.parameters.weights must be in the range 0.0-1.0."
						.to_string(),
				});
			}
		}

		if !values.is_empty() {
			let sum: f32 = values.iter().sum();

			if (sum - 1.0).abs() > WEIGHT_SUM_DELTA {
				return Err(Error::Configuration {
					message: format!("combination.parameters.weights must sum to 1.0. Got {sum}."),
				});
			}
		}

		Ok(Self(values))
	}

	pub fn as_slice(&self) -> &[f32] {
		&self.0
	}

	pub fn weight_for(&self, sub_query: usize) -> f32 {
		self.0.get(sub_query).copied().unwrap_or(1.0)
	}

	pub fn check_sub_query_count(&self, count: usize) -> Result<()> {
		if self.0.is_empty() || self.0.len() == count {
			return Ok(());
		}

		Err(Error::Configuration {
			message: format!(
				"number of weights [{}] must match number of sub-queries [{count}] in hybrid query.",
				self.0.len()
			),
		})
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum CombinationTechnique {
	ArithmeticMean(Weights),
	HarmonicMean(Weights),
	GeometricMean(Weights),
}
impl CombinationTechnique {
	pub fn parse(name: &str, params: &Map<String, Value>) -> Result<Self> {
		let name = technique::parse_technique_name(name, "combination.technique", &SUPPORTED)?;

		technique::validate_param_names(params, &SUPPORTED_PARAMS, name)?;

		let weights = match params.get(PARAM_WEIGHTS) {
			Some(value) => Weights::new(technique::parse_float_list(
				value,
				"combination.parameters.weights",
			)?)?,
			None => Weights::uniform(),
		};

		Ok(match name {
			ARITHMETIC_MEAN => Self::ArithmeticMean(weights),
			HARMONIC_MEAN => Self::HarmonicMean(weights),
			GEOMETRIC_MEAN => Self::GeometricMean(weights),
			other => return Err(technique::unsupported_technique(other)),
		})
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::ArithmeticMean(_) => ARITHMETIC_MEAN,
			Self::HarmonicMean(_) => HARMONIC_MEAN,
			Self::GeometricMean(_) => GEOMETRIC_MEAN,
		}
	}

	pub fn weights(&self) -> &Weights {
		match self {
			Self::ArithmeticMean(weights)
			| Self::HarmonicMean(weights)
			| Self::GeometricMean(weights) => weights,
		}
	}

	/// Fuses one document's per sub-query scores. Negative entries mean no hit and are skipped.
	pub fn combine(&self, scores: &[f32]) -> f32 {
		match self {
			Self::ArithmeticMean(weights) => arithmetic_mean(scores, weights),
			Self::HarmonicMean(weights) => harmonic_mean(scores, weights),
			Self::GeometricMean(weights) => geometric_mean(scores, weights),
		}
	}
}

#[derive(Clone, Debug)]
pub struct CombinationContext {
	pub technique: CombinationTechnique,
	pub from: usize,
	pub sort: Option<SortSpec>,
	/// Only used to point callers at the right knob when pagination runs out of hits.
	pub pagination_depth: u32,
}
impl CombinationContext {
	pub fn new(technique: CombinationTechnique) -> Self {
		Self { technique, from: 0, sort: None, pagination_depth: 0 }
	}

	pub fn from_config(cfg: &hyfuse_config::Config) -> Result<Self> {
		let technique =
			CombinationTechnique::parse(&cfg.combination.technique, &cfg.combination.parameters)?;

		Ok(Self { pagination_depth: cfg.pagination.depth, ..Self::new(technique) })
	}

	pub fn with_from(mut self, from: usize) -> Self {
		self.from = from;

		self
	}

	pub fn with_sort(mut self, sort: Option<SortSpec>) -> Self {
		self.sort = sort;

		self
	}
}

/// Fused hits of one shard, ordered.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CombinedShard {
	pub hits: Vec<FusedHit>,
	pub total_hits: u64,
}

pub fn combine_scores(
	shards: &[CompoundHits],
	technique: &CombinationTechnique,
	sort: Option<&SortSpec>,
) -> Result<Vec<CombinedShard>> {
	for shard in shards.iter().filter(|shard| !shard.is_empty()) {
		technique.weights().check_sub_query_count(shard.sub_query_count())?;
	}

	Ok(shards.iter().map(|shard| combine_shard(shard, technique, sort)).collect())
}

fn combine_shard(
	shard: &CompoundHits,
	technique: &CombinationTechnique,
	sort: Option<&SortSpec>,
) -> CombinedShard {
	if shard.is_empty() {
		return CombinedShard::default();
	}

	let count = shard.sub_query_count();
	let mut order: Vec<DocId> = Vec::new();
	let mut scores_by_doc: HashMap<DocId, Vec<f32>> = HashMap::new();
	let mut sort_values_by_doc: HashMap<DocId, Vec<SortValue>> = HashMap::new();

	for (idx, hits) in shard.sub_queries.iter().enumerate() {
		for hit in hits {
			let scores = scores_by_doc.entry(hit.doc_id).or_insert_with(|| {
				order.push(hit.doc_id);
				sort_values_by_doc.insert(hit.doc_id, hit.sort_values.clone());

				vec![NO_HIT_SCORE; count]
			});

			scores[idx] = hit.score;
		}
	}

	let mut hits: Vec<FusedHit> = order
		.into_iter()
		.map(|doc_id| FusedHit {
			doc_id,
			score: scores_by_doc
				.get(&doc_id)
				.map(|scores| technique.combine(scores))
				.unwrap_or(ZERO_SCORE),
			sort_values: sort_values_by_doc.remove(&doc_id).unwrap_or_default(),
		})
		.collect();

	match sort {
		Some(spec) => hits.sort_by(|lhs, rhs| {
			spec.compare_keys(
				(rhs.score, rhs.sort_values.as_slice()),
				(lhs.score, lhs.sort_values.as_slice()),
			)
		}),
		None => hits.sort_by(|lhs, rhs| rhs.score.total_cmp(&lhs.score)),
	}

	CombinedShard { total_hits: hits.len() as u64, hits }
}

fn arithmetic_mean(scores: &[f32], weights: &Weights) -> f32 {
	let mut combined = 0.0_f32;
	let mut sum_of_weights = 0.0_f32;

	for (idx, score) in scores.iter().enumerate() {
		if *score >= 0.0 {
			let weight = weights.weight_for(idx);

			combined += score * weight;
			sum_of_weights += weight;
		}
	}

	if sum_of_weights == 0.0 {
		return ZERO_SCORE;
	}

	combined / sum_of_weights
}

fn harmonic_mean(scores: &[f32], weights: &Weights) -> f32 {
	let mut sum_of_weights = 0.0_f32;
	let mut sum_of_harmonics = 0.0_f32;

	for (idx, score) in scores.iter().enumerate() {
		if *score > 0.0 {
			let weight = weights.weight_for(idx);

			sum_of_weights += weight;
			sum_of_harmonics += weight / score;
		}
	}

	if sum_of_harmonics <= 0.0 {
		return ZERO_SCORE;
	}

	sum_of_weights / sum_of_harmonics
}

fn geometric_mean(scores: &[f32], weights: &Weights) -> f32 {
	let mut weighted_ln_sum = 0.0_f32;
	let mut sum_of_weights = 0.0_f32;

	for (idx, score) in scores.iter().enumerate() {
		if *score > 0.0 {
			let weight = weights.weight_for(idx);

			weighted_ln_sum += weight * score.ln();
			sum_of_weights += weight;
		}
	}

	if sum_of_weights == 0.0 {
		return ZERO_SCORE;
	}

	(weighted_ln_sum / sum_of_weights).exp()
}
