pub mod hit;
pub mod merge;
pub mod sentinel;
pub mod shard;
pub mod sort;

mod error;

pub use error::{Error, Result};
pub use hit::{DocId, FusedHit, Hit, by_score};
pub use merge::{merge, merge_top_docs};
pub use sentinel::{CompoundHits, Entry, SentinelSequence, SentinelTopDocs, decode, encode};
pub use shard::{FetchResult, FetchedHit, ShardResult, ShardTopDocs};
pub use sort::{SCORE_FIELD, SortField, SortOrder, SortSpec, SortValue};
