use hyfuse_domain::{
	DocId, Entry, SentinelSequence, SentinelTopDocs, ShardResult, ShardTopDocs, SortField,
	SortOrder, SortSpec, SortValue,
};
use hyfuse_service::{
	CombinationContext, CombinationTechnique, Error, NormalizationContext, NormalizationTechnique,
	Weights, collect_page, execute,
};
use hyfuse_testkit::{assert_close, fetched_for, shard};

fn min_max() -> NormalizationContext {
	NormalizationContext::new(NormalizationTechnique::MinMax)
}

fn arithmetic() -> CombinationContext {
	CombinationContext::new(CombinationTechnique::ArithmeticMean(Weights::uniform()))
}

fn doc_ids(shard: &ShardResult) -> Vec<DocId> {
	shard.fused_hits().expect("Shard must be fused.").iter().map(|hit| hit.doc_id).collect()
}

fn three_doc_shard() -> ShardResult {
	shard(0, &[&[(1, 4.0), (2, 2.0)], &[(2, 0.9), (3, 0.5)]])
}

#[test]
fn fuses_two_shards_with_global_statistics() {
	let mut shards = vec![shard(0, &[&[(1, 10.0), (2, 8.0)]]), shard(1, &[&[(1, 6.0), (2, 4.0)]])];

	execute(&mut shards, None, &min_max(), &arithmetic()).expect("Fusion must succeed.");

	assert_close(shards[0].max_score, 1.0);
	assert_close(shards[1].max_score, 2.0 / 6.0);

	let page = collect_page(&shards, 0, 10).expect("Page must be collected.");

	assert_eq!(page.len(), 4);
	assert_eq!((page[0].shard_index, page[0].doc_id), (0, 1));
	assert_close(page[0].score, 1.0);
	assert_eq!((page[3].shard_index, page[3].doc_id), (1, 2));
	assert_close(page[3].score, 0.0);
}

#[test]
fn averages_sub_queries_normalized_across_shards() {
	let mut shards =
		vec![shard(0, &[&[(1, 10.0)], &[(1, 8.0)]]), shard(1, &[&[(5, 6.0)], &[(5, 4.0)]])];

	execute(&mut shards, None, &min_max(), &arithmetic()).expect("Fusion must succeed.");

	let page = collect_page(&shards, 0, 10).expect("Page must be collected.");

	assert_eq!(page.len(), 2);
	assert_eq!((page[0].shard_index, page[0].doc_id), (0, 1));
	assert_close(page[0].score, 1.0);
	assert_eq!((page[1].shard_index, page[1].doc_id), (1, 5));
	assert_close(page[1].score, 0.0);
	assert_close(shards[0].max_score, 1.0);
	assert_close(shards[1].max_score, 0.0);
}

#[test]
fn fuses_sub_queries_into_one_ranking_per_shard() {
	let mut shards = vec![three_doc_shard()];

	execute(&mut shards, None, &min_max(), &arithmetic()).expect("Fusion must succeed.");

	let hits = shards[0].fused_hits().expect("Shard must be fused.");

	assert_eq!(doc_ids(&shards[0]), vec![1, 2, 3]);
	assert_close(hits[0].score, 1.0);
	assert_close(hits[1].score, 0.5);
	assert_close(hits[2].score, 0.0);
	assert_eq!(shards[0].top_docs.as_ref().map(ShardTopDocs::total_hits), Some(3));
	assert!(matches!(shards[0].top_docs, Some(ShardTopDocs::Scored { .. })));
}

#[test]
fn shard_without_results_gets_zero_max_score() {
	let mut shards = vec![
		ShardResult::new(0, SentinelTopDocs::default()),
		shard(1, &[&[(4, 3.0), (5, 1.0)]]),
	];

	execute(&mut shards, None, &min_max(), &arithmetic()).expect("Fusion must succeed.");

	assert_eq!(shards[0].max_score, 0.0);
	assert!(doc_ids(&shards[0]).is_empty());
	assert_eq!(doc_ids(&shards[1]), vec![4, 5]);
}

#[test]
fn no_results_in_any_shard_is_a_format_error() {
	let mut shards = vec![
		ShardResult::new(0, SentinelTopDocs::default()),
		ShardResult::new(1, SentinelTopDocs::default()),
	];
	let before = shards.clone();
	let err =
		execute(&mut shards, None, &min_max(), &arithmetic()).expect_err("Expected format error.");

	assert!(matches!(err, Error::Format { .. }), "Unexpected error: {err}");
	assert_eq!(shards, before);
}

#[test]
fn missing_shard_payload_is_a_format_error() {
	let mut shards = vec![three_doc_shard(), shard(1, &[&[(7, 1.0)], &[]])];

	shards[1].top_docs = None;

	let before = shards.clone();
	let err = execute(&mut shards, None, &min_max(), &arithmetic())
		.expect_err("Expected format error.");

	assert!(matches!(err, Error::Format { .. }), "Unexpected error: {err}");
	assert!(err.to_string().contains("must match"), "Unexpected error: {err}");
	assert_eq!(shards, before);
}

#[test]
fn malformed_sequence_is_a_format_error() {
	let sequence = SentinelSequence::from_entries(vec![Entry::StartStop, Entry::StartStop]);
	let mut shards = vec![ShardResult::new(0, SentinelTopDocs { total_hits: 0, sequence })];
	let err = execute(&mut shards, None, &min_max(), &arithmetic())
		.expect_err("Expected format error.");

	assert!(matches!(err, Error::Format { .. }), "Unexpected error: {err}");
}

#[test]
fn offset_past_fused_hits_is_a_pagination_error() {
	let mut shards = vec![three_doc_shard()];
	let before = shards.clone();
	let combination = CombinationContext { pagination_depth: 50, ..arithmetic().with_from(4) };
	let err = execute(&mut shards, None, &min_max(), &combination)
		.expect_err("Expected pagination error.");

	assert!(matches!(err, Error::Pagination { .. }), "Unexpected error: {err}");
	assert!(err.to_string().contains("pagination_depth"), "Unexpected error: {err}");
	assert_eq!(shards, before);
}

#[test]
fn page_holds_remaining_hits_after_offset() {
	let mut shards = vec![three_doc_shard()];

	execute(&mut shards, None, &min_max(), &arithmetic().with_from(1))
		.expect("Fusion must succeed.");

	let page = collect_page(&shards, 1, 10).expect("Page must be collected.");

	assert_eq!(page.iter().map(|hit| hit.doc_id).collect::<Vec<_>>(), vec![2, 3]);
	assert_eq!(collect_page(&shards, 0, 2).expect("Page must be collected.").len(), 2);
	assert!(collect_page(&shards, 3, 2).expect("Page must be collected.").is_empty());
	assert!(matches!(collect_page(&shards, 4, 2), Err(Error::Pagination { .. })));
}

#[test]
fn collect_page_rejects_unfused_shards() {
	let shards = vec![three_doc_shard()];

	assert!(matches!(collect_page(&shards, 0, 10), Err(Error::Format { .. })));
}

#[test]
fn fetched_content_follows_fused_order() {
	let mut shards = vec![three_doc_shard()];
	let sequence = shards[0].sentinel_top_docs().expect("Shard must be raw.").sequence.clone();
	let mut fetch = fetched_for(&sequence);

	execute(&mut shards, Some(&mut fetch), &min_max(), &arithmetic().with_from(1))
		.expect("Fusion must succeed.");

	assert_eq!(fetch.hits.iter().map(|hit| hit.doc_id).collect::<Vec<_>>(), vec![2, 3]);
	assert_close(fetch.hits[0].score, 0.5);
	assert_eq!(fetch.hits[0].source, serde_json::json!({ "title": "doc-2" }));
	assert_eq!(fetch.total_hits, 3);
	assert_close(fetch.max_score, 1.0);
	assert_eq!(shards[0].from, 1);
}

#[test]
fn fetched_count_mismatch_is_a_consistency_error() {
	let mut shards = vec![three_doc_shard()];
	let sequence = shards[0].sentinel_top_docs().expect("Shard must be raw.").sequence.clone();
	let mut fetch = fetched_for(&sequence);

	fetch.hits.pop();

	let before = (shards.clone(), fetch.clone());
	let err = execute(&mut shards, Some(&mut fetch), &min_max(), &arithmetic())
		.expect_err("Expected consistency error.");

	assert!(matches!(err, Error::Consistency { .. }), "Unexpected error: {err}");
	assert_eq!((shards, fetch), before);
}

#[test]
fn cached_request_accepts_fewer_fetched_hits() {
	let mut shards = vec![three_doc_shard()];
	let sequence = shards[0].sentinel_top_docs().expect("Shard must be raw.").sequence.clone();
	let mut fetch = fetched_for(&sequence);

	shards[0].request_cache = true;
	fetch.hits.pop();

	execute(&mut shards, Some(&mut fetch), &min_max(), &arithmetic())
		.expect("Fusion must succeed.");

	assert_eq!(fetch.hits.len(), 3);
}

#[test]
fn fused_document_without_content_is_a_consistency_error() {
	let mut shards = vec![three_doc_shard()];
	let sequence = shards[0].sentinel_top_docs().expect("Shard must be raw.").sequence.clone();
	let mut fetch = fetched_for(&sequence);

	shards[0].request_cache = true;
	fetch.hits.truncate(fetch.hits.len() - 2);

	let err = execute(&mut shards, Some(&mut fetch), &min_max(), &arithmetic())
		.expect_err("Expected consistency error.");

	assert!(err.to_string().contains("document 3"), "Unexpected error: {err}");
	assert!(shards[0].sentinel_top_docs().is_some());
}

#[test]
fn explicit_sort_keeps_sort_order_and_scans_max_score() {
	let mut shards = vec![three_doc_shard()];

	if let Some(ShardTopDocs::Sentinel(top_docs)) = shards[0].top_docs.as_mut() {
		let mut entries = top_docs.sequence.clone().into_entries();

		for entry in &mut entries {
			if let Entry::Hit(hit) = entry {
				hit.sort_values = vec![SortValue::Long(100 - i64::from(hit.doc_id))];
			}
		}

		top_docs.sequence = SentinelSequence::from_entries(entries);
	}

	let sort = SortSpec::new(vec![SortField::new("rank", SortOrder::Asc)]);

	execute(&mut shards, None, &min_max(), &arithmetic().with_sort(Some(sort.clone())))
		.expect("Fusion must succeed.");

	assert_eq!(doc_ids(&shards[0]), vec![3, 2, 1]);
	assert_close(shards[0].max_score, 1.0);
	assert_eq!(shards[0].top_docs.as_ref().and_then(ShardTopDocs::sort), Some(&sort));

	let page = collect_page(&shards, 0, 1).expect("Page must be collected.");

	assert_eq!(page[0].doc_id, 3);
}

#[test]
fn contexts_build_from_config() {
	let cfg = hyfuse_config::parse(
		r#"
[normalization]
technique = "L2"

[combination]
technique = "arithmetic_mean"

[combination.parameters]
weights = [0.3, 0.7]
"#,
	)
	.expect("Config must parse.");
	let normalization =
		NormalizationContext::from_config(&cfg.normalization).expect("Context must build.");
	let combination = CombinationContext::from_config(&cfg).expect("Context must build.");

	assert_eq!(normalization.technique, NormalizationTechnique::L2);
	assert_eq!(combination.technique.weights().as_slice(), &[0.3, 0.7]);
	assert_eq!(combination.pagination_depth, 100);

	let mut shards = vec![shard(0, &[&[(1, 3.0), (2, 4.0)], &[(1, 1.0)]])];

	execute(&mut shards, None, &normalization, &combination).expect("Fusion must succeed.");

	// doc 1: 0.3 * 0.6 + 0.7 * 1.0, doc 2: only the first sub-query matched.
	let hits = shards[0].fused_hits().expect("Shard must be fused.");

	assert_eq!(doc_ids(&shards[0]), vec![1, 2]);
	assert_close(hits[0].score, 0.88);
	assert_close(hits[1].score, 0.8);
}
