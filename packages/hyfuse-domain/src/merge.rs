use std::cmp::Ordering;

use crate::{
	Error, Result,
	hit::Hit,
	sentinel::{self, Entry, SentinelSequence, SentinelTopDocs},
};

/// Merges two sentinel sequences sub-list by sub-list.
///
/// `comparator` returns `Greater` when its first argument ranks ahead. Ties keep the hit from
/// `lhs` first, so repeated pairwise merges stay stable in any reduction order. Neither input is
/// modified.
///
/// Both inputs must already be ranked under `comparator` within each sub-list. That order is not
/// checked here; unordered input yields an unordered merge.
pub fn merge<F>(
	lhs: &SentinelSequence,
	rhs: &SentinelSequence,
	comparator: F,
) -> Result<SentinelSequence>
where
	F: Fn(&Hit, &Hit) -> Ordering,
{
	let left = sentinel::sub_lists(lhs)?;
	let right = sentinel::sub_lists(rhs)?;

	if left.len() != right.len() {
		return Err(Error::Format {
			message: format!(
				"cannot merge sequences with {} and {} sub-query lists.",
				left.len(),
				right.len()
			),
		});
	}

	let mut entries = Vec::with_capacity(lhs.len() + rhs.len());

	entries.push(Entry::StartStop);

	for (idx, (left_hits, right_hits)) in left.iter().zip(right.iter()).enumerate() {
		if idx > 0 {
			entries.push(Entry::Delimiter);
		}

		merge_runs(left_hits, right_hits, &comparator, &mut entries);
	}

	entries.push(Entry::StartStop);

	Ok(SentinelSequence::from_entries(entries))
}

pub fn merge_top_docs<F>(
	lhs: &SentinelTopDocs,
	rhs: &SentinelTopDocs,
	comparator: F,
) -> Result<SentinelTopDocs>
where
	F: Fn(&Hit, &Hit) -> Ordering,
{
	let sequence = merge(&lhs.sequence, &rhs.sequence, comparator)?;

	Ok(SentinelTopDocs { total_hits: lhs.total_hits.saturating_add(rhs.total_hits), sequence })
}

fn merge_runs<F>(left: &[&Hit], right: &[&Hit], comparator: &F, out: &mut Vec<Entry>)
where
	F: Fn(&Hit, &Hit) -> Ordering,
{
	let mut left_idx = 0;
	let mut right_idx = 0;

	while left_idx < left.len() && right_idx < right.len() {
		if comparator(left[left_idx], right[right_idx]) != Ordering::Less {
			out.push(Entry::Hit(left[left_idx].clone()));

			left_idx += 1;
		} else {
			out.push(Entry::Hit(right[right_idx].clone()));

			right_idx += 1;
		}
	}

	out.extend(left[left_idx..].iter().map(|hit| Entry::Hit((*hit).clone())));
	out.extend(right[right_idx..].iter().map(|hit| Entry::Hit((*hit).clone())));
}
