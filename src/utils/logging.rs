use std::sync::Mutex;
use std::time::Instant;

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::runtime::ConfigBuilder;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use rust_htslib::bam::Record;

use bio_types::genome::AbstractInterval;

use super::{human_readable_byte_count, mem_stats};

const LOG_DEST_STDERR: &str = "stderr";

pub(crate) fn default_configbuilder() -> ConfigBuilder {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{l:<7} {d(%Y-%m-%d %H:%M:%S)}     {t}  {m}{n}",
        )))
        .build();

    Config::builder().appender(Appender::builder().build(LOG_DEST_STDERR, Box::new(stderr)))
}

static LOG_HANDLE: Mutex<Option<log4rs::Handle>> = Mutex::new(None);

/// Installs the stderr logger. Calling it again only changes the root level.
pub(crate) fn init_global_logger(level: LevelFilter) -> Result<(), anyhow::Error> {
    let config = default_configbuilder()
        .build(Root::builder().appender(LOG_DEST_STDERR).build(level))?;

    let mut handle = LOG_HANDLE
        .lock()
        .map_err(|_| anyhow::anyhow!("Logger handle lock is poisoned."))?;

    match handle.as_ref() {
        Some(h) => h.set_config(config),
        None => *handle = Some(log4rs::init_config(config)?),
    }

    Ok(())
}

/// Periodically reports how many records a shard worker has consumed.
pub(crate) struct ProgressLogger {
    log: &'static str,
    n: usize,
    verb: &'static str,
    noun: &'static str,

    last_chrom: String,
    last_pos: i64,

    start_time: Instant,
    last_start_time: u64,

    processed: usize,
}

impl ProgressLogger {
    pub(crate) fn new(log: &'static str, n: usize, verb: &'static str, noun: &'static str) -> Self {
        Self {
            log,
            n: n.max(1),
            verb,
            noun,
            start_time: Instant::now(),
            processed: 0,
            last_start_time: 0,
            last_chrom: String::new(),
            last_pos: 0,
        }
    }

    /// Returns true when this call emitted a progress line.
    pub(crate) fn record(&mut self, rec: &Record) -> bool {
        if rec.tid() < 0 {
            self.check_and_then_record("", 0)
        } else {
            self.check_and_then_record(rec.contig(), rec.pos())
        }
    }

    pub(crate) fn processed(&self) -> usize {
        self.processed
    }

    fn check_and_then_record(&mut self, chrom: &str, pos: i64) -> bool {
        if !chrom.eq(&self.last_chrom) {
            self.last_chrom.clear();
            self.last_chrom.push_str(chrom);
        }
        self.last_pos = pos;

        self.processed += 1;
        if self.processed % self.n == 0 {
            self.emit();
            true
        } else {
            false
        }
    }

    fn emit(&mut self) {
        let seconds = self.start_time.elapsed().as_secs();
        let last_period_seconds = seconds - self.last_start_time;
        self.last_start_time = seconds;

        let read_info = if self.last_chrom.is_empty() {
            "*/*".to_string()
        } else {
            format!("{}:{}", self.last_chrom, self.last_pos + 1)
        };

        let mem = mem_stats().record();

        log::info!(target: self.log,
            "{} {} {}.  Elapsed time: {}.  Time for last {}: {:>4}s.  Last read position: {}.  Memory: {} allocated, {} resident",
            self.verb,
            pad(&self.processed.to_string(), 13),
            self.noun,
            format_elapsed_time(seconds),
            self.n,
            last_period_seconds,
            read_info,
            human_readable_byte_count(mem.allocated),
            human_readable_byte_count(mem.resident),
        );
    }
}

fn format_elapsed_time(seconds: u64) -> String {
    let s = seconds % 60;
    let all_minutes = seconds / 60;
    let m = all_minutes % 60;
    let h = all_minutes / 60;

    format!("{:0>2}:{:0>2}:{:0>2}", h, m, s)
}

fn pad(s: &str, length: usize) -> String {
    format!("{:>width$}", s, width = length)
}
