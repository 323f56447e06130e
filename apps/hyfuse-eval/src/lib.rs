use std::{
	cmp::Ordering,
	collections::{HashMap, HashSet},
	fs, iter,
	path::{Path, PathBuf},
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use hyfuse_config::Config;
use hyfuse_domain::{
	CompoundHits, DocId, FetchResult, FetchedHit, Hit, SentinelTopDocs, ShardResult, SortSpec,
};
use hyfuse_service::{CombinationContext, NormalizationContext, RankedHit};

const DEFAULT_PAGE_SIZE: usize = 10;

/// Shard index plus shard-local doc id.
type DocKey = (usize, DocId);

#[derive(Debug, Parser)]
#[command(
	version = hyfuse_cli::VERSION,
	rename_all = "kebab",
	styles = hyfuse_cli::styles(),
)]
pub struct Args {
	#[arg(long = "config-a", short = 'c', value_name = "FILE", visible_alias = "config")]
	pub config_a: PathBuf,
	#[arg(long = "config-b", value_name = "FILE")]
	pub config_b: Option<PathBuf>,
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: PathBuf,
	#[arg(long, value_name = "N")]
	pub from: Option<usize>,
	#[arg(long, value_name = "N")]
	pub size: Option<usize>,
	#[arg(long, short = 'o', value_name = "FILE")]
	pub output: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct EvalDataset {
	name: Option<String>,
	#[serde(default)]
	from: usize,
	size: Option<usize>,
	sort: Option<SortSpec>,
	#[serde(default)]
	request_cache: bool,
	shards: Vec<EvalShard>,
	/// Document content keyed by doc id. Only valid for single-shard datasets.
	sources: Option<HashMap<DocId, Value>>,
	#[serde(default)]
	expected: Vec<DocKey>,
}

/// One shard's query-phase output. Each segment is collected on its own and merged into the
/// shard result; `sub_queries` counts as one more segment.
#[derive(Debug, Deserialize)]
struct EvalShard {
	#[serde(default)]
	sub_queries: Vec<Vec<Hit>>,
	#[serde(default)]
	segments: Vec<EvalSegment>,
}

#[derive(Debug, Deserialize)]
struct EvalSegment {
	sub_queries: Vec<Vec<Hit>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Report {
	Single(EvalOutput),
	Compare(CompareOutput),
}

#[derive(Debug, Serialize)]
pub struct EvalOutput {
	dataset: EvalDatasetInfo,
	#[serde(flatten)]
	run: EvalRun,
}

#[derive(Debug, Serialize)]
pub struct CompareOutput {
	dataset: EvalDatasetInfo,
	a: EvalRun,
	b: EvalRun,
	policy_churn: PolicyChurn,
}

#[derive(Debug, Serialize)]
struct EvalDatasetInfo {
	name: String,
	shard_count: usize,
}

#[derive(Debug, Serialize)]
struct EvalRun {
	settings: EvalSettings,
	shards: Vec<ShardReport>,
	#[serde(skip_serializing_if = "Option::is_none")]
	metrics: Option<Metrics>,
	hits: Vec<PageItem>,
}

#[derive(Debug, Serialize)]
struct EvalSettings {
	config_path: String,
	policy_id: String,
	normalization: &'static str,
	combination: &'static str,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	weights: Vec<f32>,
	pagination_depth: u32,
	from: usize,
	size: usize,
}

#[derive(Debug, Serialize)]
struct ShardReport {
	shard_index: usize,
	total_hits: u64,
	max_score: f32,
}

#[derive(Debug, Serialize)]
struct PageItem {
	#[serde(flatten)]
	hit: RankedHit,
	#[serde(skip_serializing_if = "Option::is_none")]
	source: Option<Value>,
}

#[derive(Debug, Serialize)]
struct Metrics {
	recall_at_k: f64,
	precision_at_k: f64,
	rr: f64,
	ndcg: f64,
	relevant_count: usize,
}

#[derive(Debug, Serialize)]
struct PolicyChurn {
	k: usize,
	positional_churn_at_k: f64,
	set_churn_at_k: f64,
}

pub fn run(args: Args) -> color_eyre::Result<()> {
	let config_a = hyfuse_config::load(&args.config_a)?;
	let filter = EnvFilter::new(config_a.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let report = evaluate(&args, &config_a)?;
	let json = serde_json::to_string_pretty(&report)?;

	match &args.output {
		Some(path) => fs::write(path, json)?,
		None => println!("{json}"),
	}

	Ok(())
}

pub fn evaluate(args: &Args, config_a: &Config) -> color_eyre::Result<Report> {
	let dataset = load_dataset(args.dataset.as_path())?;
	let info = EvalDatasetInfo {
		name: dataset.name.clone().unwrap_or_else(|| "unnamed".to_string()),
		shard_count: dataset.shards.len(),
	};
	let run_a = eval_config(args.config_a.as_path(), config_a, &dataset, args)?;
	let Some(config_b_path) = &args.config_b else {
		return Ok(Report::Single(EvalOutput { dataset: info, run: run_a }));
	};
	let config_b = hyfuse_config::load(config_b_path)?;
	let run_b = eval_config(config_b_path.as_path(), &config_b, &dataset, args)?;
	let k = run_a
		.hits
		.len()
		.max(run_b.hits.len())
		.min(run_a.settings.size.min(run_b.settings.size))
		.max(1);
	let (positional_churn_at_k, set_churn_at_k) =
		churn_against_baseline_at_k(&page_keys(&run_a.hits), &page_keys(&run_b.hits), k);

	Ok(Report::Compare(CompareOutput {
		dataset: info,
		a: run_a,
		b: run_b,
		policy_churn: PolicyChurn { k, positional_churn_at_k, set_churn_at_k },
	}))
}

fn load_dataset(path: &Path) -> color_eyre::Result<EvalDataset> {
	let raw = fs::read_to_string(path)?;
	let dataset: EvalDataset = serde_json::from_str(&raw)?;

	if dataset.shards.is_empty() {
		return Err(eyre::eyre!("Dataset must include at least one shard."));
	}

	Ok(dataset)
}

fn eval_config(
	config_path: &Path,
	cfg: &Config,
	dataset: &EvalDataset,
	args: &Args,
) -> color_eyre::Result<EvalRun> {
	let from = args.from.unwrap_or(dataset.from);
	let size = args.size.or(dataset.size).unwrap_or(DEFAULT_PAGE_SIZE);
	let normalization = NormalizationContext::from_config(&cfg.normalization)?;
	let combination =
		CombinationContext::from_config(cfg)?.with_from(from).with_sort(dataset.sort.clone());
	let policy_id = policy_id(&normalization, &combination)?;
	let mut shards = build_shards(dataset, cfg.pagination.depth as usize)?;
	let mut fetch = build_fetch(dataset, &shards)?;

	tracing::info!(
		config = %config_path.display(),
		policy_id = %policy_id,
		shards = shards.len(),
		from,
		size,
		"Run score fusion."
	);

	hyfuse_service::execute(&mut shards, fetch.as_mut(), &normalization, &combination)?;

	let page = hyfuse_service::collect_page(&shards, from, size)?;
	let sources: HashMap<DocId, Value> = fetch
		.map(|fetch| fetch.hits.into_iter().map(|hit| (hit.doc_id, hit.source)).collect())
		.unwrap_or_default();
	let hits: Vec<PageItem> = page
		.into_iter()
		.map(|hit| PageItem { source: sources.get(&hit.doc_id).cloned(), hit })
		.collect();
	let metrics = if dataset.expected.is_empty() {
		None
	} else {
		let expected: HashSet<DocKey> = dataset.expected.iter().copied().collect();

		Some(compute_metrics(&page_keys(&hits), &expected))
	};
	let shard_reports = shards
		.iter()
		.map(|shard| ShardReport {
			shard_index: shard.shard_index,
			total_hits: shard.top_docs.as_ref().map(|top_docs| top_docs.total_hits()).unwrap_or(0),
			max_score: shard.max_score,
		})
		.collect();

	Ok(EvalRun {
		settings: EvalSettings {
			config_path: config_path.display().to_string(),
			policy_id,
			normalization: normalization.technique.as_str(),
			combination: combination.technique.as_str(),
			weights: combination.technique.weights().as_slice().to_vec(),
			pagination_depth: cfg.pagination.depth,
			from,
			size,
		},
		shards: shard_reports,
		metrics,
		hits,
	})
}

fn policy_id(
	normalization: &NormalizationContext,
	combination: &CombinationContext,
) -> color_eyre::Result<String> {
	let payload = serde_json::json!({
		"normalization": normalization.technique.as_str(),
		"combination": {
			"technique": combination.technique.as_str(),
			"weights": combination.technique.weights().as_slice(),
		},
		"sort": combination.sort,
		"pagination_depth": combination.pagination_depth,
	});
	let raw = serde_json::to_vec(&payload)?;

	Ok(blake3::hash(&raw).to_hex().to_string())
}

fn build_shards(dataset: &EvalDataset, depth: usize) -> color_eyre::Result<Vec<ShardResult>> {
	let mut shards = Vec::with_capacity(dataset.shards.len());

	for (shard_index, shard) in dataset.shards.iter().enumerate() {
		let top_docs = shard_top_docs(shard, dataset.sort.as_ref(), depth)?;
		let mut result = ShardResult::new(shard_index, top_docs);

		result.request_cache = dataset.request_cache;

		shards.push(result);
	}

	Ok(shards)
}

/// Merges a shard's segments and keeps the top `depth` hits of every sub-query.
fn shard_top_docs(
	shard: &EvalShard,
	sort: Option<&SortSpec>,
	depth: usize,
) -> color_eyre::Result<SentinelTopDocs> {
	let comparator = |lhs: &Hit, rhs: &Hit| match sort {
		Some(sort) => sort.compare(lhs, rhs),
		None => hyfuse_domain::by_score(lhs, rhs),
	};
	let segments = shard
		.segments
		.iter()
		.map(|segment| &segment.sub_queries)
		.chain(iter::once(&shard.sub_queries));
	let mut merged: Option<SentinelTopDocs> = None;

	for sub_queries in segments {
		// Segments without hits are not collected.
		if sub_queries.iter().all(Vec::is_empty) {
			continue;
		}

		let segment = segment_top_docs(sub_queries, &comparator);

		merged = Some(match merged {
			Some(acc) => hyfuse_domain::merge_top_docs(&acc, &segment, &comparator)?,
			None => segment,
		});
	}

	let Some(merged) = merged else { return Ok(SentinelTopDocs::default()) };
	let mut compound = hyfuse_domain::decode(&merged.sequence)?;

	for hits in &mut compound.sub_queries {
		hits.truncate(depth);
	}

	Ok(SentinelTopDocs { total_hits: merged.total_hits, sequence: hyfuse_domain::encode(&compound) })
}

fn segment_top_docs<F>(sub_queries: &[Vec<Hit>], comparator: &F) -> SentinelTopDocs
where
	F: Fn(&Hit, &Hit) -> Ordering,
{
	let mut sub_queries = sub_queries.to_vec();

	for hits in &mut sub_queries {
		hits.sort_by(|lhs, rhs| comparator(rhs, lhs));
	}

	let total_hits = sub_queries.iter().map(Vec::len).max().unwrap_or(0) as u64;

	SentinelTopDocs { total_hits, sequence: hyfuse_domain::encode(&CompoundHits::new(sub_queries)) }
}

/// Content for every slot of the shard's sequence, markers included.
fn build_fetch(
	dataset: &EvalDataset,
	shards: &[ShardResult],
) -> color_eyre::Result<Option<FetchResult>> {
	let Some(sources) = dataset.sources.as_ref() else { return Ok(None) };
	let [shard] = shards else {
		return Err(eyre::eyre!(
			"sources are only supported for single-shard datasets; got {} shards.",
			shards.len()
		));
	};
	let slots = shard
		.sentinel_top_docs()
		.map(|top_docs| top_docs.sequence.slot_doc_ids())
		.unwrap_or_default();
	let hits = slots
		.into_iter()
		.map(|slot| match slot {
			Some(doc_id) => FetchedHit {
				doc_id,
				score: 0.0,
				source: sources.get(&doc_id).cloned().unwrap_or(Value::Null),
			},
			None => FetchedHit { doc_id: 0, score: 0.0, source: Value::Null },
		})
		.collect();

	Ok(Some(FetchResult { hits, ..Default::default() }))
}

fn page_keys(hits: &[PageItem]) -> Vec<DocKey> {
	hits.iter().map(|item| (item.hit.shard_index, item.hit.doc_id)).collect()
}

fn churn_against_baseline_at_k(baseline: &[DocKey], other: &[DocKey], k: usize) -> (f64, f64) {
	let k = k.max(1);
	let positional_diff = (0..k).filter(|idx| baseline.get(*idx) != other.get(*idx)).count();
	let positional_churn = positional_diff as f64 / k as f64;
	let base_set: HashSet<DocKey> = baseline.iter().take(k).copied().collect();
	let other_set: HashSet<DocKey> = other.iter().take(k).copied().collect();
	let overlap = base_set.intersection(&other_set).count();
	let set_churn = 1.0 - (overlap as f64 / k as f64);

	(positional_churn, set_churn)
}

fn compute_metrics(retrieved: &[DocKey], expected: &HashSet<DocKey>) -> Metrics {
	let expected_count = expected.len();
	let mut relevant_count = 0_usize;
	let mut dcg = 0.0_f64;
	let mut first_hit: Option<usize> = None;

	for (idx, key) in retrieved.iter().enumerate() {
		if expected.contains(key) {
			let rank = idx + 1;

			relevant_count += 1;
			dcg += 1.0 / (rank as f64 + 1.0).log2();

			if first_hit.is_none() {
				first_hit = Some(rank);
			}
		}
	}

	let rr = first_hit.map(|rank| 1.0 / rank as f64).unwrap_or(0.0);
	let idcg: f64 = (1..=expected_count.min(retrieved.len()))
		.map(|rank| 1.0 / (rank as f64 + 1.0).log2())
		.sum();
	let ndcg = if idcg > 0.0 { dcg / idcg } else { 0.0 };
	let precision_at_k =
		if retrieved.is_empty() { 0.0 } else { relevant_count as f64 / retrieved.len() as f64 };
	let recall_at_k =
		if expected_count == 0 { 0.0 } else { relevant_count as f64 / expected_count as f64 };

	Metrics { recall_at_k, precision_at_k, rr, ndcg, relevant_count }
}
