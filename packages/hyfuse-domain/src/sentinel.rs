//! Flat sentinel encoding of several ranked sub-query lists.
//!
//! A sequence carrying `n` sub-lists has the shape
//! `StartStop, hits_0.., Delimiter, hits_1.., .., Delimiter, hits_n-1.., StartStop`.
//! The empty sequence stands for a shard that produced no hybrid results.

use serde::{Deserialize, Serialize};

use crate::{
	Error, Result,
	hit::{DocId, Hit},
};

pub const MIN_SEQUENCE_LEN: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
	StartStop,
	Delimiter,
	Hit(Hit),
}
impl Entry {
	pub fn as_hit(&self) -> Option<&Hit> {
		match self {
			Self::Hit(hit) => Some(hit),
			Self::StartStop | Self::Delimiter => None,
		}
	}

	pub fn is_sentinel(&self) -> bool {
		!matches!(self, Self::Hit(_))
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SentinelSequence {
	entries: Vec<Entry>,
}
impl SentinelSequence {
	pub fn from_entries(entries: Vec<Entry>) -> Self {
		Self { entries }
	}

	pub fn entries(&self) -> &[Entry] {
		&self.entries
	}

	pub fn into_entries(self) -> Vec<Entry> {
		self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn hit_count(&self) -> usize {
		self.entries.iter().filter(|entry| !entry.is_sentinel()).count()
	}

	/// Doc id of every entry in sequence order, `None` for sentinel slots.
	pub fn slot_doc_ids(&self) -> Vec<Option<DocId>> {
		self.entries.iter().map(|entry| entry.as_hit().map(|hit| hit.doc_id)).collect()
	}
}

/// Raw per-shard payload handed over by the query-execution layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SentinelTopDocs {
	pub total_hits: u64,
	pub sequence: SentinelSequence,
}

/// Tagged form of one shard's results: one ranked hit list per sub-query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompoundHits {
	pub sub_queries: Vec<Vec<Hit>>,
}
impl CompoundHits {
	pub fn new(sub_queries: Vec<Vec<Hit>>) -> Self {
		Self { sub_queries }
	}

	pub fn sub_query_count(&self) -> usize {
		self.sub_queries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sub_queries.is_empty()
	}

	pub fn hit_count(&self) -> usize {
		self.sub_queries.iter().map(Vec::len).sum()
	}
}

pub fn encode(compound: &CompoundHits) -> SentinelSequence {
	if compound.is_empty() {
		return SentinelSequence::default();
	}

	let mut entries = Vec::with_capacity(compound.hit_count() + compound.sub_query_count() + 1);

	entries.push(Entry::StartStop);

	for (idx, hits) in compound.sub_queries.iter().enumerate() {
		if idx > 0 {
			entries.push(Entry::Delimiter);
		}

		entries.extend(hits.iter().cloned().map(Entry::Hit));
	}

	entries.push(Entry::StartStop);

	SentinelSequence { entries }
}

/// Splits a sequence into its sub-query hit lists, keeping each list's order as given.
///
/// Only the structure is checked. Each sub-list must already be ranked best first under the
/// request's order; callers own that ordering.
pub fn decode(sequence: &SentinelSequence) -> Result<CompoundHits> {
	if sequence.is_empty() {
		return Ok(CompoundHits::default());
	}

	let sub_queries = sub_lists(sequence)?
		.into_iter()
		.map(|hits| hits.into_iter().cloned().collect())
		.collect();

	Ok(CompoundHits { sub_queries })
}

/// Checks the structural invariants and returns the number of sub-lists.
pub fn validate(sequence: &SentinelSequence) -> Result<usize> {
	sub_lists(sequence).map(|lists| lists.len())
}

pub(crate) fn sub_lists(sequence: &SentinelSequence) -> Result<Vec<Vec<&Hit>>> {
	let entries = sequence.entries();

	if entries.len() < MIN_SEQUENCE_LEN {
		return Err(Error::Format {
			message: format!(
				"sequence must have at least {MIN_SEQUENCE_LEN} entries, got {}.",
				entries.len()
			),
		});
	}
	if entries.first() != Some(&Entry::StartStop) {
		return Err(Error::Format {
			message: "sequence must begin with a start/stop marker.".to_string(),
		});
	}
	if entries.last() != Some(&Entry::StartStop) {
		return Err(Error::Format {
			message: "sequence must end with a start/stop marker.".to_string(),
		});
	}

	let mut lists = vec![Vec::new()];

	for (offset, entry) in entries[1..entries.len() - 1].iter().enumerate() {
		match entry {
			Entry::Hit(hit) => {
				if let Some(current) = lists.last_mut() {
					current.push(hit);
				}
			},
			Entry::Delimiter => lists.push(Vec::new()),
			Entry::StartStop => {
				return Err(Error::Format {
					message: format!("unexpected start/stop marker at position {}.", offset + 1),
				});
			},
		}
	}

	Ok(lists)
}
