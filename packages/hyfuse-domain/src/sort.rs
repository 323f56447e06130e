use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::hit::Hit;

pub const SCORE_FIELD: &str = "_score";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortValue {
	Long(i64),
	Double(f64),
	Text(String),
	Missing,
}
impl SortValue {
	fn cmp_present(&self, other: &Self) -> Option<Ordering> {
		match (self, other) {
			(Self::Missing, _) | (_, Self::Missing) => None,
			(Self::Long(lhs), Self::Long(rhs)) => Some(lhs.cmp(rhs)),
			(Self::Double(lhs), Self::Double(rhs)) => Some(lhs.total_cmp(rhs)),
			(Self::Long(lhs), Self::Double(rhs)) => Some((*lhs as f64).total_cmp(rhs)),
			(Self::Double(lhs), Self::Long(rhs)) => Some(lhs.total_cmp(&(*rhs as f64))),
			(Self::Text(lhs), Self::Text(rhs)) => Some(lhs.cmp(rhs)),
			(Self::Text(_), _) => Some(Ordering::Greater),
			(_, Self::Text(_)) => Some(Ordering::Less),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
	Asc,
	Desc,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SortField {
	pub field: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub order: Option<SortOrder>,
}
impl SortField {
	pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
		Self { field: field.into(), order: Some(order) }
	}

	pub fn is_score(&self) -> bool {
		self.field == SCORE_FIELD
	}

	/// `_score` defaults to descending, every other field to ascending.
	pub fn effective_order(&self) -> SortOrder {
		match self.order {
			Some(order) => order,
			None if self.is_score() => SortOrder::Desc,
			None => SortOrder::Asc,
		}
	}
}

/// Explicit sort criteria of a request. Hits carry one sort value per field, in field order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec {
	pub fields: Vec<SortField>,
}
impl SortSpec {
	pub fn new(fields: Vec<SortField>) -> Self {
		Self { fields }
	}

	pub fn compare(&self, lhs: &Hit, rhs: &Hit) -> Ordering {
		self.compare_keys(
			(lhs.score, lhs.sort_values.as_slice()),
			(rhs.score, rhs.sort_values.as_slice()),
		)
	}

	/// Returns `Greater` when `lhs` ranks ahead of `rhs`. Missing values rank last in either
	/// order.
	pub fn compare_keys(&self, lhs: (f32, &[SortValue]), rhs: (f32, &[SortValue])) -> Ordering {
		for (idx, field) in self.fields.iter().enumerate() {
			let ord = if field.is_score() {
				lhs.0.total_cmp(&rhs.0)
			} else {
				let left = lhs.1.get(idx).unwrap_or(&SortValue::Missing);
				let right = rhs.1.get(idx).unwrap_or(&SortValue::Missing);

				match (left, right) {
					(SortValue::Missing, SortValue::Missing) => Ordering::Equal,
					(SortValue::Missing, _) => return Ordering::Less,
					(_, SortValue::Missing) => return Ordering::Greater,
					_ => left.cmp_present(right).unwrap_or(Ordering::Equal).reverse(),
				}
			};
			let ord = match field.effective_order() {
				SortOrder::Desc if !field.is_score() => ord.reverse(),
				SortOrder::Asc if field.is_score() => ord.reverse(),
				_ => ord,
			};

			if ord != Ordering::Equal {
				return ord;
			}
		}

		Ordering::Equal
	}
}
