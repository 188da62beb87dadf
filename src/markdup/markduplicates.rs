use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Error};
use macro_sup::set_mlog;
use rayon::prelude::*;
use rust_htslib::bam::{self, Header, HeaderView, IndexedReader, Read, Record};

use crate::{
    hts::{
        header::program_record,
        shard::{Shard, ShardIndex},
        SortOrder,
    },
    utils::{errors::Error as CoreError, logging::ProgressLogger},
};

use super::{
    duplicate_group_selector::DuplicateGroupSelector,
    metrics::{DuplicationMetrics, MetricsCollection},
    opts::MarkDuplicatesOpts,
    tag_sanitizer::clear_dup_flag_tags,
    utils::{
        distant_mates::DistantMateTable, duplicate_entry::DuplicateEntry,
        library_id_generator::LibraryIdGenerator, read_pair::ReadPair,
    },
};

set_mlog!(stringify!(MarkDuplicates));

const PROGRESS_INTERVAL: usize = 1_000_000;

/// What one shard's local pass produced. File indices are shard-local until `offset` is applied.
#[derive(Default)]
pub(crate) struct ShardPass {
    record_count: u64,
    /// Records that never take part in duplicate comparison.
    passthrough: Vec<(u64, Record)>,
    /// Complete pairs and single-read entries.
    fragments: Vec<ReadPair>,
    /// Halves of templates whose mate was not read by this shard.
    distant: Vec<ReadPair>,
    /// Names of the templates this shard paired.
    completed: HashSet<Vec<u8>>,
    metrics: MetricsCollection,
}

impl ShardPass {
    fn offset(&mut self, offset: u64) {
        self.passthrough.iter_mut().for_each(|(idx, _)| *idx += offset);
        self.fragments
            .iter_mut()
            .chain(self.distant.iter_mut())
            .for_each(|p| p.offset_file_idx(offset));
    }
}

/// Sanitizes and classifies the records of one shard, assembling the pairs whose two reads it
/// sees.
pub(crate) struct ShardAssembler<'a> {
    libraries: &'a LibraryIdGenerator,
    pending: HashMap<Vec<u8>, ReadPair>,
    pass: ShardPass,
}

impl<'a> ShardAssembler<'a> {
    pub(crate) fn new(libraries: &'a LibraryIdGenerator) -> Self {
        Self {
            libraries,
            pending: HashMap::new(),
            pass: ShardPass::default(),
        }
    }

    pub(crate) fn push(&mut self, mut rec: Record) -> Result<(), Error> {
        let file_idx = self.pass.record_count;
        self.pass.record_count += 1;

        clear_dup_flag_tags(&mut rec)?;

        if rec.is_unmapped() {
            self.library_metrics(&rec).unmapped_reads += 1;
            self.pass.passthrough.push((file_idx, rec));
        } else if rec.is_secondary() || rec.is_supplementary() {
            self.library_metrics(&rec).secondary_or_supplementary_rds += 1;
            self.pass.passthrough.push((file_idx, rec));
        } else if !rec.is_paired() || rec.is_mate_unmapped() {
            self.pass.fragments.push(ReadPair::new(rec, file_idx));
        } else if self.pass.completed.contains(rec.qname()) {
            return Err(CoreError::template_collision(rec.qname(), rec.flags()).into());
        } else {
            match self.pending.remove(rec.qname()) {
                Some(mut pair) => {
                    pair.add_read(rec, file_idx)?;
                    self.pass.completed.insert(pair.left.qname().to_vec());
                    self.pass.fragments.push(pair);
                }
                None => {
                    self.pending
                        .insert(rec.qname().to_vec(), ReadPair::new(rec, file_idx));
                }
            }
        }

        Ok(())
    }

    fn library_metrics(&mut self, rec: &Record) -> &mut DuplicationMetrics {
        let library_id = self.libraries.get_library_id(rec);
        self.pass.metrics.library_mut(library_id)
    }

    pub(crate) fn finish(mut self) -> ShardPass {
        let mut distant = self.pending.into_values().collect::<Vec<_>>();
        distant.sort_by_key(|p| p.left_file_idx);
        self.pass.distant = distant;

        self.pass
    }
}

pub(crate) struct MarkDuplicates {
    opts: MarkDuplicatesOpts,
}

impl MarkDuplicates {
    pub(crate) fn new(opts: MarkDuplicatesOpts) -> Self {
        Self { opts }
    }

    pub(crate) fn do_work(&self) -> Result<(), Error> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.opts.parallelism)
            .build()?;

        pool.install(|| self.run())
    }

    fn run(&self) -> Result<(), Error> {
        let opts = &self.opts;

        let reader = IndexedReader::from_path(&opts.bam)?;
        let header_view = reader.header().clone();
        drop(reader);

        match SortOrder::from_header(&header_view)? {
            SortOrder::Coordinate => {}
            other => mlog::warn!(
                "Input sort order is {:?}. Records will be read in index order.",
                other
            ),
        }

        let libraries = LibraryIdGenerator::new(&header_view);
        let shard_index = ShardIndex::new(&header_view, opts.shard_size);
        mlog::info!(
            "Reading {} in {} shards of {} bases.",
            opts.bam.display(),
            shard_index.len(),
            opts.shard_size
        );

        // Records keep a reference-counted handle to the header of the reader that produced
        // them. Each shard's records stay on one thread until the passes are joined, and none
        // is cloned or dropped while shards run in parallel.
        let mut passes = shard_index
            .shards()
            .par_iter()
            .map(|shard| self.scan_shard(shard, &libraries))
            .collect::<Result<Vec<_>, Error>>()?;

        let mut offset = 0;
        for pass in passes.iter_mut() {
            let count = pass.record_count;
            pass.offset(offset);
            offset += count;
        }
        mlog::info!("Read {} records.", offset);

        let mut metrics = MetricsCollection::default();
        let mut passthrough = Vec::new();
        let mut fragments = Vec::new();
        let mut distant = Vec::new();
        let mut completed = HashSet::new();
        for pass in passes {
            metrics.merge(pass.metrics);
            passthrough.extend(pass.passthrough);
            fragments.extend(pass.fragments);
            distant.push(pass.distant);
            completed.extend(pass.completed);
        }

        let (resolved, unresolved) = resolve_distant_mates(distant, completed)?;
        mlog::info!("Resolved {} templates whose mates were read by different shards.", resolved.len());
        for pair in unresolved {
            mlog::warn!("Mate of {} was never found. Its records are written unmarked.", pair);
            passthrough.extend(pair.into_records());
        }
        fragments.extend(resolved);

        let buckets = route(fragments, &shard_index);
        let selector = DuplicateGroupSelector::new(opts, &libraries);
        let marked = buckets
            .into_par_iter()
            .map(|mut entries| {
                let mut shard_metrics = MetricsCollection::default();
                selector.mark(&mut entries, &mut shard_metrics)?;
                Ok((entries, shard_metrics))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let mut records = passthrough;
        for (entries, shard_metrics) in marked {
            metrics.merge(shard_metrics);
            records.extend(entries.into_iter().flat_map(|e| e.into_records()));
        }
        records.sort_unstable_by_key(|(idx, _)| *idx);

        self.write_output(&header_view, records)?;
        self.write_metrics(&metrics, &libraries)?;

        Ok(())
    }

    fn scan_shard(&self, shard: &Shard, libraries: &LibraryIdGenerator) -> Result<ShardPass, Error> {
        let mut reader = IndexedReader::from_path(&self.opts.bam)?;
        reader.fetch(shard.fetch_definition())?;

        let mut progress = ProgressLogger::new(mlog::TARGET, PROGRESS_INTERVAL, "Read", "records");
        let mut assembler = ShardAssembler::new(libraries);

        for result in reader.records() {
            let rec = result?;
            // region queries also return records that start in an earlier shard
            if !shard.owns(rec.tid(), rec.pos()) {
                continue;
            }

            progress.record(&rec);
            assembler.push(rec)?;
        }

        let pass = assembler.finish();
        mlog::debug!(
            "{}: {} records, {} fragments, {} distant mates",
            shard,
            progress.processed(),
            pass.fragments.len(),
            pass.distant.len()
        );

        Ok(pass)
    }

    fn write_output(&self, header_view: &HeaderView, records: Vec<(u64, Record)>) -> Result<(), Error> {
        let opts = &self.opts;

        let mut header = Header::from_template(header_view);
        if let Some(id) = opts.program_record_id.as_deref() {
            let pg = program_record(&header, id, &opts.command_line);
            header.push_record(&pg);
        }

        let mut writer = bam::Writer::from_path(&opts.output, &header, bam::Format::Bam)?;
        if opts.parallelism > 1 {
            writer.set_threads(opts.parallelism)?;
        }

        mlog::info!("Writing {}.", opts.output.display());
        let mut written = 0_u64;
        for (_, rec) in records.iter() {
            if opts.remove_duplicates && rec.is_duplicate() {
                continue;
            }
            writer.write(rec)?;
            written += 1;
        }
        mlog::info!("Wrote {} of {} records.", written, records.len());

        Ok(())
    }

    fn write_metrics(&self, metrics: &MetricsCollection, libraries: &LibraryIdGenerator) -> Result<(), Error> {
        let opts = &self.opts;

        if let Some(path) = opts.metrics.as_ref() {
            let headers = vec![
                opts.command_line.clone(),
                format!("Started on: {}", chrono::Local::now().to_rfc2822()),
            ];
            metrics.write_metrics(path, libraries, headers)?;
        }

        if let Some(path) = opts.optical_histogram.as_ref() {
            metrics.write_optical_histogram(path)?;
        }

        Ok(())
    }
}

/**
 * Joins the halves of templates whose two reads were read by different shards. File indices
 * must already be global. `completed` names the templates the shards paired on their own; a
 * half carrying one of those names is a third read and fails the run. Returns the completed
 * pairs and the halves whose mate never showed up.
 */
pub(crate) fn resolve_distant_mates(
    halves_per_shard: Vec<Vec<ReadPair>>,
    completed: HashSet<Vec<u8>>,
) -> Result<(Vec<ReadPair>, Vec<ReadPair>), Error> {
    let table = DistantMateTable::new(completed);

    let resolved = halves_per_shard
        .into_par_iter()
        .map(|halves| {
            let mut completed = Vec::new();
            for half in halves {
                if let Some(pair) = table.resolve(half)? {
                    completed.push(pair);
                }
            }
            Ok(completed)
        })
        .collect::<Result<Vec<_>, Error>>()?
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

    Ok((resolved, table.into_unresolved()?))
}

/// Sends every fragment to the shard that holds the 5' end of its left read, so that all
/// members of a duplicate group meet in one bucket.
pub(crate) fn route(fragments: Vec<ReadPair>, shard_index: &ShardIndex) -> Vec<Vec<DuplicateEntry>> {
    let mut buckets = (0..shard_index.len()).map(|_| Vec::new()).collect::<Vec<_>>();

    for pair in fragments {
        let entry = DuplicateEntry::from_read_pair(pair);
        let ((tid, pos), _) = entry.five_prime_ends();
        buckets[shard_index.shard_for(tid, pos)].push(entry);
    }

    buckets.retain(|b| !b.is_empty());
    buckets
}

/// Fails when the program has nothing to read.
pub(crate) fn check_input(opts: &MarkDuplicatesOpts) -> Result<(), Error> {
    if !opts.bam.exists() {
        return Err(anyhow!("Input {} does not exist.", opts.bam.display()));
    }

    Ok(())
}
