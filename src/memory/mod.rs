//! Interaction memory: the append-only log, topic labelling, and the analyses built on
//! top of a log snapshot (gaps, analytics, reflections).

pub mod analytics;
pub mod gaps;
pub mod log;
pub mod stopwords;
pub mod topic;
pub mod types;
