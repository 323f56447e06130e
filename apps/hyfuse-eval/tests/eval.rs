use std::path::{Path, PathBuf};

use serde_json::Value;

use hyfuse_eval::Args;

fn fixture(name: &str) -> PathBuf {
	Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn args(config: &str, dataset: &str) -> Args {
	Args {
		config_a: fixture(config),
		config_b: None,
		dataset: fixture(dataset),
		from: None,
		size: None,
		output: None,
	}
}

fn evaluate(args: &Args) -> Value {
	let cfg = hyfuse_config::load(&args.config_a).expect("Config must load.");
	let report = hyfuse_eval::evaluate(args, &cfg).expect("Evaluation must succeed.");

	serde_json::to_value(&report).expect("Report must serialize.")
}

fn page(report: &Value) -> Vec<(u64, u64, f64)> {
	report["hits"]
		.as_array()
		.expect("Hits must be an array.")
		.iter()
		.map(|hit| {
			(
				hit["shard_index"].as_u64().expect("Shard index must be a number."),
				hit["doc_id"].as_u64().expect("Doc id must be a number."),
				hit["score"].as_f64().expect("Score must be a number."),
			)
		})
		.collect()
}

#[test]
fn two_shards_rank_globally() {
	let report = evaluate(&args("min_max.toml", "two_shards.json"));
	let hits = page(&report);

	assert_eq!(report["dataset"]["name"], "two-shards");
	assert_eq!(report["dataset"]["shard_count"], 2);
	assert_eq!(
		hits.iter().map(|(shard, doc, _)| (*shard, *doc)).collect::<Vec<_>>(),
		vec![(0, 1), (0, 2), (1, 1), (1, 2)]
	);
	assert!((hits[0].2 - 1.0).abs() < 1e-5, "Unexpected score: {}", hits[0].2);
	assert!(hits[3].2.abs() < 1e-5, "Unexpected score: {}", hits[3].2);
	assert_eq!(report["shards"][0]["total_hits"], 2);
	assert_eq!(report["settings"]["normalization"], "min_max");
	assert_eq!(report["settings"]["policy_id"].as_str().map(str::len), Some(64));
	assert_eq!(report["metrics"]["relevant_count"], 2);
	assert_eq!(report["metrics"]["rr"].as_f64(), Some(1.0));
	assert_eq!(report["metrics"]["precision_at_k"].as_f64(), Some(0.5));
}

#[test]
fn page_size_and_offset_cut_the_ranking() {
	let mut args = args("min_max.toml", "two_shards.json");

	args.from = Some(1);
	args.size = Some(2);

	let report = evaluate(&args);

	assert_eq!(
		page(&report).iter().map(|(shard, doc, _)| (*shard, *doc)).collect::<Vec<_>>(),
		vec![(0, 2), (1, 1)]
	);
	assert_eq!(report["settings"]["from"], 1);
	assert_eq!(report["settings"]["size"], 2);
}

#[test]
fn offset_past_the_end_fails() {
	let mut args = args("min_max.toml", "two_shards.json");

	args.from = Some(5);

	let cfg = hyfuse_config::load(&args.config_a).expect("Config must load.");
	let err = hyfuse_eval::evaluate(&args, &cfg).expect_err("Expected pagination error.");

	assert!(err.to_string().contains("Pagination error"), "Unexpected error: {err}");
}

#[test]
fn segments_are_merged_truncated_and_fetched() {
	let mut args = args("shallow.toml", "segments.json");

	args.from = Some(1);

	let report = evaluate(&args);
	let hits = report["hits"].as_array().expect("Hits must be an array.");

	assert_eq!(
		page(&report).iter().map(|(_, doc, _)| *doc).collect::<Vec<_>>(),
		vec![2, 3, 4]
	);
	assert_eq!(hits[0]["source"]["title"], "beta");
	assert_eq!(hits[2]["source"]["title"], "delta");
	assert_eq!(report["shards"][0]["total_hits"], 4);
	assert_eq!(report["settings"]["pagination_depth"], 2);
	assert!(report.get("metrics").is_none());
}

#[test]
fn sources_need_a_single_shard() {
	let args = args("min_max.toml", "sources_two_shards.json");
	let cfg = hyfuse_config::load(&args.config_a).expect("Config must load.");
	let err = hyfuse_eval::evaluate(&args, &cfg).expect_err("Expected dataset error.");

	assert!(err.to_string().contains("single-shard"), "Unexpected error: {err}");
}

#[test]
fn comparing_policies_reports_churn() {
	let mut args = args("min_max.toml", "two_shards.json");

	args.config_b = Some(fixture("l2.toml"));

	let report = evaluate(&args);

	assert_eq!(report["a"]["settings"]["normalization"], "min_max");
	assert_eq!(report["b"]["settings"]["normalization"], "l2");
	assert_ne!(report["a"]["settings"]["policy_id"], report["b"]["settings"]["policy_id"]);
	assert_eq!(report["policy_churn"]["positional_churn_at_k"].as_f64(), Some(0.0));
	assert_eq!(report["policy_churn"]["set_churn_at_k"].as_f64(), Some(0.0));
}
