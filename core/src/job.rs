//! The three aggregation jobs.

use mapfold_common::error::CommonError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Selects the tokenizer and aggregator a job is built from.
///
/// | kind        | tokenizer            | aggregator              |
/// |-------------|----------------------|-------------------------|
/// | `WordCount` | `WordTokenizer`      | `SumAggregator`         |
/// | `Dedup`     | `WholeLineTokenizer` | `PresenceAggregator`    |
/// | `TopK`      | `NumberTokenizer`    | `BoundedTopKAggregator` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    WordCount,
    Dedup,
    TopK,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [JobKind::WordCount, JobKind::Dedup, JobKind::TopK];

    pub fn name(&self) -> &'static str {
        match self {
            JobKind::WordCount => "wordcount",
            JobKind::Dedup => "dedup",
            JobKind::TopK => "topk",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JobKind {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wordcount" | "word-count" => Ok(JobKind::WordCount),
            "dedup" => Ok(JobKind::Dedup),
            "topk" | "top-k" => Ok(JobKind::TopK),
            other => Err(CommonError::configuration_error(format!(
                "Unknown job '{other}', expected one of wordcount, dedup, topk"
            ))),
        }
    }
}
