mod fetch;
mod page;

pub use page::{RankedHit, collect_page};

use crate::{
	Error, Result,
	combination::{self, CombinationContext, CombinedShard},
	normalization::{self, NormalizationContext},
};
use hyfuse_domain::{
	CompoundHits, DocId, FetchResult, FusedHit, ShardResult, ShardTopDocs, SortSpec,
};

pub const MAX_SCORE_WHEN_NO_HITS_FOUND: f32 = 0.0;

struct ShardUpdate {
	top_docs: ShardTopDocs,
	max_score: f32,
}
impl ShardUpdate {
	fn new(shard: CombinedShard, sort: Option<&SortSpec>) -> Self {
		let max_score = max_score_for_shard(&shard.hits, sort.is_some());
		let top_docs = match sort {
			Some(sort) => ShardTopDocs::Sorted {
				total_hits: shard.total_hits,
				hits: shard.hits,
				sort: sort.clone(),
			},
			None => ShardTopDocs::Scored { total_hits: shard.total_hits, hits: shard.hits },
		};

		Self { top_docs, max_score }
	}
}

/// Normalizes, combines and reorders every shard's hybrid results for one request.
///
/// `fetch` carries document content when the fetch phase already ran for a single shard; it is
/// re-keyed and re-emitted in fused order. Every check runs before the first holder is written,
/// so on error `shards` and `fetch` are left as they were.
pub fn execute(
	shards: &mut [ShardResult],
	fetch: Option<&mut FetchResult>,
	normalization: &NormalizationContext,
	combination: &CombinationContext,
) -> Result<()> {
	let original_doc_ids = original_doc_ids(shards);

	tracing::debug!(shards = shards.len(), "Pre-process query results.");

	let mut compound = compound_hits(shards)?;

	tracing::debug!(technique = normalization.technique.as_str(), "Do score normalization.");

	normalization::normalize_scores(&mut compound, normalization)?;

	tracing::debug!(
		technique = combination.technique.as_str(),
		sorted = combination.sort.is_some(),
		"Do score combination."
	);

	let combined =
		combination::combine_scores(&compound, &combination.technique, combination.sort.as_ref())?;
	let total_hits: usize = combined.iter().map(|shard| shard.hits.len()).sum();

	check_pagination(combination.from, total_hits, combination.pagination_depth)?;

	let updates: Vec<ShardUpdate> = combined
		.into_iter()
		.map(|shard| ShardUpdate::new(shard, combination.sort.as_ref()))
		.collect();
	let fetched_hits = match fetch.as_deref() {
		Some(fetch) => {
			let request_cache = shards.first().map(|shard| shard.request_cache).unwrap_or(false);
			let fused: &[FusedHit] =
				updates.first().and_then(|update| update.top_docs.fused_hits()).unwrap_or(&[]);

			Some(fetch::reconcile(
				&fetch.hits,
				&original_doc_ids,
				fused,
				combination.from,
				request_cache,
			)?)
		},
		None => None,
	};

	tracing::debug!(
		total_hits,
		fetch_reconciled = fetched_hits.is_some(),
		"Post-process query results after score normalization and combination."
	);

	for (shard, update) in shards.iter_mut().zip(updates) {
		// Fetch already ran, so the shard result must trim by the request offset itself.
		if fetched_hits.is_some() {
			shard.from = combination.from;
		}

		shard.top_docs = Some(update.top_docs);
		shard.max_score = update.max_score;
	}

	if let (Some(fetch), Some(hits)) = (fetch, fetched_hits) {
		fetch.hits = hits;

		if let Some(first) = shards.first() {
			fetch.total_hits = first.top_docs.as_ref().map(ShardTopDocs::total_hits).unwrap_or(0);
			fetch.max_score = first.max_score;
		}
	}

	Ok(())
}

fn original_doc_ids(shards: &[ShardResult]) -> Vec<Option<DocId>> {
	shards
		.first()
		.and_then(ShardResult::sentinel_top_docs)
		.map(|top_docs| top_docs.sequence.slot_doc_ids())
		.unwrap_or_default()
}

fn compound_hits(shards: &[ShardResult]) -> Result<Vec<CompoundHits>> {
	let compound = shards
		.iter()
		.filter_map(ShardResult::sentinel_top_docs)
		.map(|top_docs| hyfuse_domain::decode(&top_docs.sequence))
		.collect::<hyfuse_domain::Result<Vec<_>>>()?;

	if compound.len() != shards.len() {
		return Err(Error::Format {
			message: format!(
				"query results were not formatted correctly by the hybrid query; sizes of shard results [{}] and compound hits [{}] must match.",
				shards.len(),
				compound.len()
			),
		});
	}

	Ok(compound)
}

fn check_pagination(from: usize, total_hits: usize, pagination_depth: u32) -> Result<()> {
	if from > 0 && from > total_hits {
		return Err(Error::Pagination {
			message: format!(
				"Reached end of search result: from [{from}] exceeds the [{total_hits}] combined hits. Reduce from or increase pagination_depth (currently {pagination_depth}) to see more results."
			),
		});
	}

	Ok(())
}

fn max_score_for_shard(hits: &[FusedHit], sorted: bool) -> f32 {
	let Some(first) = hits.first() else { return MAX_SCORE_WHEN_NO_HITS_FOUND };

	if sorted {
		return hits.iter().fold(MAX_SCORE_WHEN_NO_HITS_FOUND, |max, hit| max.max(hit.score));
	}

	first.score
}
