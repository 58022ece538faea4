pub mod ingest;
pub mod query;
pub mod review;
pub mod status;
