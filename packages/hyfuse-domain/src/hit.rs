use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::sort::SortValue;

/// Shard-local document id assigned by the query-execution layer.
pub type DocId = u32;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hit {
	pub doc_id: DocId,
	pub score: f32,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub sort_values: Vec<SortValue>,
}
impl Hit {
	pub fn new(doc_id: DocId, score: f32) -> Self {
		Self { doc_id, score, sort_values: Vec::new() }
	}

	pub fn with_sort_values(mut self, sort_values: Vec<SortValue>) -> Self {
		self.sort_values = sort_values;

		self
	}
}

/// A document after combination, carrying its final score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FusedHit {
	pub doc_id: DocId,
	pub score: f32,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub sort_values: Vec<SortValue>,
}

/// Natural score order: `Greater` when `lhs` ranks ahead of `rhs`.
pub fn by_score(lhs: &Hit, rhs: &Hit) -> Ordering {
	lhs.score.total_cmp(&rhs.score)
}
