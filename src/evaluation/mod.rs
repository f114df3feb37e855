pub mod detection_normalizer;
pub mod detection_record;
pub mod label_oracle;
pub mod metrics;
pub mod pipeline;
pub mod result_store;
