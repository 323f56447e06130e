use serde_json::json;

use hyfuse_domain::{
	CompoundHits, DocId, FetchResult, FetchedHit, Hit, SentinelSequence, SentinelTopDocs,
	ShardResult,
};

pub const SCORE_TOLERANCE: f32 = 1e-5;

pub fn hits(pairs: &[(DocId, f32)]) -> Vec<Hit> {
	pairs.iter().map(|(doc_id, score)| Hit::new(*doc_id, *score)).collect()
}

pub fn compound(sub_queries: &[&[(DocId, f32)]]) -> CompoundHits {
	CompoundHits::new(sub_queries.iter().map(|pairs| hits(pairs)).collect())
}

pub fn sequence(sub_queries: &[&[(DocId, f32)]]) -> SentinelSequence {
	hyfuse_domain::encode(&compound(sub_queries))
}

pub fn top_docs(sub_queries: &[&[(DocId, f32)]]) -> SentinelTopDocs {
	let compound = compound(sub_queries);
	let total_hits = compound.sub_queries.iter().map(Vec::len).max().unwrap_or(0) as u64;

	SentinelTopDocs { total_hits, sequence: hyfuse_domain::encode(&compound) }
}

pub fn shard(shard_index: usize, sub_queries: &[&[(DocId, f32)]]) -> ShardResult {
	ShardResult::new(shard_index, top_docs(sub_queries))
}

/// Fetched content for every slot of `sequence`, sentinel slots included, in sequence order.
pub fn fetched_for(sequence: &SentinelSequence) -> FetchResult {
	let hits = sequence
		.slot_doc_ids()
		.into_iter()
		.map(|slot| match slot {
			Some(doc_id) => FetchedHit {
				doc_id,
				score: 0.0,
				source: json!({ "title": format!("doc-{doc_id}") }),
			},
			None => FetchedHit { doc_id: 0, score: 0.0, source: json!(null) },
		})
		.collect();

	FetchResult { hits, total_hits: 0, max_score: 0.0 }
}

pub fn assert_close(actual: f32, expected: f32) {
	assert!(
		(actual - expected).abs() <= SCORE_TOLERANCE,
		"Expected {expected}, got {actual}."
	);
}

pub fn all_scores(compound: &CompoundHits) -> Vec<Vec<f32>> {
	compound
		.sub_queries
		.iter()
		.map(|hits| hits.iter().map(|hit| hit.score).collect())
		.collect()
}
