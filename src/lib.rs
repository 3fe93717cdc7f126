pub mod alignment_trimmer;
pub mod curate_argument_parsing;
pub mod filter_pipeline;
pub mod genome_quality;
pub mod marker_accounting;
pub mod metadata_tables;
pub mod output_writer;
pub mod taxonomy;

#[macro_use]
extern crate log;
extern crate clap;
#[macro_use]
extern crate lazy_static;

pub const DEFAULT_QUALITY_THRESHOLD: &str = "50";
pub const DEFAULT_QUALITY_WEIGHT: &str = "2";
pub const DEFAULT_MIN_COMPLETENESS: &str = "50";
pub const DEFAULT_MAX_CONTAMINATION: &str = "10";
pub const DEFAULT_MIN_PERC_AA: &str = "50";
pub const DEFAULT_MIN_REP_PERC_AA: &str = "20";
pub const DEFAULT_MIN_PERC_TAXA: &str = "50";
pub const DEFAULT_CONSENSUS: &str = "25";
pub const DEFAULT_OUTPUT_PREFIX: &str = "corella";
