pub mod combination;
pub mod normalization;
pub mod technique;
pub mod workflow;

mod error;

pub use combination::{
	CombinationContext, CombinationTechnique, CombinedShard, Weights, combine_scores,
};
pub use error::{Error, Result};
pub use normalization::{NormalizationContext, NormalizationTechnique, normalize_scores};
pub use workflow::{RankedHit, collect_page, execute};
