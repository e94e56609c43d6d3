//! loopfeat-core
//!
//! Static loop feature extraction: walks the loop forests of compiled
//! program units and emits a per-loop numeric feature vector to a durable,
//! append-only dataset for downstream machine-learning models.

pub mod extractor;
