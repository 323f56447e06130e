use std::collections::HashMap;

use crate::{Error, Result};
use hyfuse_domain::{DocId, FetchedHit, FusedHit};

/// Re-emits fetched content in fused order, skipping the first `from` fused hits.
///
/// `slots` holds the doc id of every entry of the shard's original sentinel sequence, `None` for
/// markers. Fetched hits are aligned with those slots one to one. A cached request may have
/// fetched fewer slots than the sequence holds.
pub(super) fn reconcile(
	fetched: &[FetchedHit],
	slots: &[Option<DocId>],
	fused: &[FusedHit],
	from: usize,
	request_cache: bool,
) -> Result<Vec<FetchedHit>> {
	let count_matches =
		if request_cache { fetched.len() <= slots.len() } else { fetched.len() == slots.len() };

	if !count_matches {
		return Err(Error::Consistency {
			message: format!(
				"cannot produce the final query result: the number of fetched hits [{}] does not match the number of query results [{}].",
				fetched.len(),
				slots.len()
			),
		});
	}

	let mut by_doc_id: HashMap<DocId, &FetchedHit> = HashMap::with_capacity(fetched.len());

	for (slot, hit) in slots.iter().zip(fetched) {
		if let Some(doc_id) = slot {
			by_doc_id.entry(*doc_id).or_insert(hit);
		}
	}

	fused
		.iter()
		.skip(from)
		.map(|fused_hit| {
			let Some(hit) = by_doc_id.get(&fused_hit.doc_id) else {
				return Err(Error::Consistency {
					message: format!(
						"cannot produce the final query result: no fetched content for document {}.",
						fused_hit.doc_id
					),
				});
			};

			Ok(FetchedHit { score: fused_hit.score, ..(*hit).clone() })
		})
		.collect()
}
