pub mod dataset;
pub mod ingest;
pub mod kpi;
pub mod output;
pub mod report;
pub mod samples;
pub mod tech;
