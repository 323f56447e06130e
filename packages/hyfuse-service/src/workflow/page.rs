use serde::Serialize;

use crate::{Error, Result};
use hyfuse_domain::{DocId, ShardResult, SortSpec, SortValue};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedHit {
	pub shard_index: usize,
	pub doc_id: DocId,
	pub score: f32,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub sort_values: Vec<SortValue>,
}

/// Merges fused shard results into one global ranking and cuts the `[from, from + size)` page.
///
/// Ties keep shard order, then position within the shard. Shards without results are skipped.
pub fn collect_page(shards: &[ShardResult], from: usize, size: usize) -> Result<Vec<RankedHit>> {
	let mut sort: Option<&SortSpec> = None;
	let mut ranked = Vec::new();

	for shard in shards {
		let Some(top_docs) = shard.top_docs.as_ref() else { continue };
		let Some(hits) = top_docs.fused_hits() else {
			return Err(Error::Format {
				message: format!(
					"shard {} still holds sentinel encoded results; run score fusion first.",
					shard.shard_index
				),
			});
		};

		if sort.is_none() {
			sort = top_docs.sort();
		}

		ranked.extend(hits.iter().map(|hit| RankedHit {
			shard_index: shard.shard_index,
			doc_id: hit.doc_id,
			score: hit.score,
			sort_values: hit.sort_values.clone(),
		}));
	}

	match sort {
		Some(spec) => ranked.sort_by(|lhs, rhs| {
			spec.compare_keys(
				(rhs.score, rhs.sort_values.as_slice()),
				(lhs.score, lhs.sort_values.as_slice()),
			)
		}),
		None => ranked.sort_by(|lhs, rhs| rhs.score.total_cmp(&lhs.score)),
	}

	if from > 0 && from > ranked.len() {
		return Err(Error::Pagination {
			message: format!(
				"Reached end of search result: from [{from}] exceeds the [{}] ranked hits.",
				ranked.len()
			),
		});
	}

	Ok(ranked.into_iter().skip(from).take(size).collect())
}
