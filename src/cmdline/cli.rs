use std::path::PathBuf;

use clap::{ArgAction, Parser};
use log::LevelFilter;

use crate::hts::duplicate_scoring_strategy::ScoringStrategy;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Coordinate sorted and indexed input BAM.
    #[arg(long = "bam", value_name = "PATH")]
    pub(crate) bam: PathBuf,

    /// Output BAM with duplicates marked.
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub(crate) output: PathBuf,

    /// File to write duplication metrics to.
    #[arg(long = "metrics", short = 'M', value_name = "PATH")]
    pub(crate) metrics: Option<PathBuf>,

    /// File to write the optical distance histogram to. Setting it enables the histogram.
    #[arg(long = "optical-histogram", value_name = "PATH")]
    pub(crate) optical_histogram: Option<PathBuf>,

    /// Number of read pairs per duplicate group that take part in the optical histogram. The
    /// group is shuffled deterministically before taking this many. Negative means no limit.
    #[arg(
        long = "optical-histogram-max",
        value_name = "INT",
        default_value_t = -1,
        allow_hyphen_values = true
    )]
    pub(crate) optical_histogram_max: i64,

    /// The maximum offset between two duplicate clusters in order to consider them optical
    /// duplicates. Optical duplicates are not classified when unset.
    #[arg(long = "optical-distance", value_name = "INT")]
    pub(crate) optical_distance: Option<i32>,

    /// Number of reference bases per shard.
    #[arg(long = "shard-size", value_name = "INT", default_value_t = 5_000_000)]
    pub(crate) shard_size: i64,

    /// Number of worker threads. 0 uses every available core.
    #[arg(long = "parallelism", short = 'p', value_name = "INT", default_value_t = 0)]
    pub(crate) parallelism: usize,

    /// The scoring strategy for choosing the non-duplicate among candidates.
    #[arg(
        long = "scoring-strategy",
        value_enum,
        default_value_t = ScoringStrategy::SumOfBaseQualities
    )]
    pub(crate) scoring_strategy: ScoringStrategy,

    /// Write DI, DS and DT tags on the records of every duplicate set.
    #[arg(long = "tag-duplicates", action = ArgAction::SetTrue)]
    pub(crate) tag_duplicates: bool,

    /// Drop duplicates from the output instead of flagging them.
    #[arg(long = "remove-duplicates", action = ArgAction::SetTrue)]
    pub(crate) remove_duplicates: bool,

    /// The program record ID for the @PG record created by this program. This string may have a
    /// suffix appended to avoid collision with other program record IDs.
    #[arg(long = "program-record-id", value_name = "String", default_value = "shardmark")]
    pub(crate) program_record_id: String,

    /// Do not add a @PG record to the output header.
    #[arg(long = "no-program-record", action = ArgAction::SetTrue)]
    pub(crate) no_program_record: bool,

    #[arg(long = "log-level", value_name = "LEVEL", default_value_t = LevelFilter::Info)]
    pub(crate) log_level: LevelFilter,
}
