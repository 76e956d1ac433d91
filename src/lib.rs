//! # TopTen
//!
//! Two-phase bounded top-K over partitioned records.
//!
//! Each partition is reduced independently to its local top-K. A single merger
//! then folds every local result into the global top-K, which is written to a
//! keyed table. Memory stays O(K) per partition regardless of input size.
//!
//! ```no_run
//! use topten_rs::{MemTable, TopKJob};
//!
//! let partitions = vec![
//!     vec![r#"<row Id="1" Reputation="50" />"#.to_string()],
//!     vec![r#"<row Id="2" Reputation="70" />"#.to_string()],
//! ];
//! let mut table = MemTable::new(["info"]);
//! let report = TopKJob::new(10).run(partitions, &mut table).unwrap();
//! assert_eq!(report.top[0].id, "2");
//! ```

pub mod config;
pub mod error;
pub mod input;
pub mod merger;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod reducer;
pub mod sink;
pub mod topk;

// Re-export main types for convenience
pub use config::TopTenConfig;
pub use error::{InputError, JobError, ParseError, SinkError, SkipReason};
pub use input::{plan_splits, InputSplit, PartitionSource};
pub use merger::GlobalMerger;
pub use model::{FinalResult, PartitionResult, Record, ScoredEntry};
pub use parser::{RecordParser, RecordSchema};
pub use pipeline::{JobReport, TopKJob};
pub use reducer::{PartitionReducer, PartitionStats};
pub use sink::{MemTable, Put, ResultSink, ResultWriter, RocksTable};
pub use topk::BoundedTopK;
