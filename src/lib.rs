//! Workspace root package. It carries repository tooling configuration only;
//! the pipeline lives in `crates/`.
