pub mod analysis;
pub mod batch;
pub mod provider;
pub mod scoring;
pub mod summary;
pub mod yahoo;
