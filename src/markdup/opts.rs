use std::path::PathBuf;

use anyhow::{bail, Error};

use crate::{cmdline::cli::Cli, hts::duplicate_scoring_strategy::ScoringStrategy};

/// Validated configuration of a duplicate marking run.
#[derive(Debug, Clone)]
pub(crate) struct MarkDuplicatesOpts {
    pub(crate) bam: PathBuf,
    pub(crate) output: PathBuf,
    pub(crate) metrics: Option<PathBuf>,

    pub(crate) optical_histogram: Option<PathBuf>,
    /// Negative means every pair of a group is compared.
    pub(crate) optical_histogram_max: i64,
    pub(crate) optical_distance: Option<i32>,

    pub(crate) shard_size: i64,
    pub(crate) parallelism: usize,
    pub(crate) scoring_strategy: ScoringStrategy,

    pub(crate) tag_duplicates: bool,
    pub(crate) remove_duplicates: bool,

    pub(crate) program_record_id: Option<String>,
    pub(crate) command_line: String,
}

impl Default for MarkDuplicatesOpts {
    fn default() -> Self {
        Self {
            bam: PathBuf::new(),
            output: PathBuf::new(),
            metrics: None,
            optical_histogram: None,
            optical_histogram_max: -1,
            optical_distance: None,
            shard_size: 5_000_000,
            parallelism: 0,
            scoring_strategy: ScoringStrategy::SumOfBaseQualities,
            tag_duplicates: false,
            remove_duplicates: false,
            program_record_id: None,
            command_line: String::new(),
        }
    }
}

impl MarkDuplicatesOpts {
    pub(crate) fn from_cli(cli: &Cli, command_line: String) -> Result<Self, Error> {
        if cli.shard_size <= 0 {
            bail!("--shard-size must be positive, got {}", cli.shard_size);
        }

        if let Some(d) = cli.optical_distance {
            if d < 0 {
                bail!("--optical-distance must not be negative, got {}", d);
            }
        }

        Ok(Self {
            bam: cli.bam.clone(),
            output: cli.output.clone(),
            metrics: cli.metrics.clone(),
            optical_histogram: cli.optical_histogram.clone(),
            optical_histogram_max: cli.optical_histogram_max,
            optical_distance: cli.optical_distance,
            shard_size: cli.shard_size,
            parallelism: cli.parallelism,
            scoring_strategy: cli.scoring_strategy,
            tag_duplicates: cli.tag_duplicates,
            remove_duplicates: cli.remove_duplicates,
            program_record_id: (!cli.no_program_record).then(|| cli.program_record_id.clone()),
            command_line,
        })
    }

    pub(crate) fn optical_histogram_enabled(&self) -> bool {
        self.optical_histogram.is_some()
    }
}
