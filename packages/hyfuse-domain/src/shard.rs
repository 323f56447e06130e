use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
	hit::{DocId, FusedHit},
	sentinel::SentinelTopDocs,
	sort::SortSpec,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShardTopDocs {
	/// Query-phase output, still sentinel encoded.
	Sentinel(SentinelTopDocs),
	Scored {
		total_hits: u64,
		hits: Vec<FusedHit>,
	},
	Sorted {
		total_hits: u64,
		hits: Vec<FusedHit>,
		sort: SortSpec,
	},
}
impl ShardTopDocs {
	pub fn fused_hits(&self) -> Option<&[FusedHit]> {
		match self {
			Self::Sentinel(_) => None,
			Self::Scored { hits, .. } | Self::Sorted { hits, .. } => Some(hits),
		}
	}

	pub fn total_hits(&self) -> u64 {
		match self {
			Self::Sentinel(top_docs) => top_docs.total_hits,
			Self::Scored { total_hits, .. } | Self::Sorted { total_hits, .. } => *total_hits,
		}
	}

	pub fn sort(&self) -> Option<&SortSpec> {
		match self {
			Self::Sorted { sort, .. } => Some(sort),
			Self::Sentinel(_) | Self::Scored { .. } => None,
		}
	}
}

/// Caller-owned result holder for one shard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShardResult {
	pub shard_index: usize,
	#[serde(default)]
	pub from: usize,
	#[serde(default)]
	pub request_cache: bool,
	pub top_docs: Option<ShardTopDocs>,
	#[serde(default)]
	pub max_score: f32,
}
impl ShardResult {
	pub fn new(shard_index: usize, top_docs: SentinelTopDocs) -> Self {
		Self {
			shard_index,
			from: 0,
			request_cache: false,
			top_docs: Some(ShardTopDocs::Sentinel(top_docs)),
			max_score: 0.0,
		}
	}

	pub fn sentinel_top_docs(&self) -> Option<&SentinelTopDocs> {
		match self.top_docs.as_ref() {
			Some(ShardTopDocs::Sentinel(top_docs)) => Some(top_docs),
			_ => None,
		}
	}

	pub fn fused_hits(&self) -> Option<&[FusedHit]> {
		self.top_docs.as_ref().and_then(ShardTopDocs::fused_hits)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FetchedHit {
	pub doc_id: DocId,
	pub score: f32,
	#[serde(default)]
	pub source: Value,
}

/// Document content fetched before reduction, aligned slot by slot with the shard's sentinel
/// sequence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
	pub hits: Vec<FetchedHit>,
	#[serde(default)]
	pub total_hits: u64,
	#[serde(default)]
	pub max_score: f32,
}
