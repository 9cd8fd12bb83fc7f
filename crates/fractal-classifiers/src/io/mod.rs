pub mod feature_csv;

pub use feature_csv::{read_feature_csv, read_feature_csv_with_config, write_feature_csv, FeatureCsvConfig};
