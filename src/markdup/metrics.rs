use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::Error;

use crate::hts::{
    metrics::{MetricBase, MetricsFile, MetricsHeader},
    utils::histogram::Histogram,
};

use super::utils::library_id_generator::LibraryIdGenerator;

/// Duplication counts of one library.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct DuplicationMetrics {
    pub(crate) library: String,
    pub(crate) unpaired_reads_examined: u64,
    /// Counted once per pair.
    pub(crate) read_pairs_examined: u64,
    pub(crate) secondary_or_supplementary_rds: u64,
    pub(crate) unmapped_reads: u64,
    pub(crate) unpaired_read_duplicates: u64,
    /// Counted once per pair.
    pub(crate) read_pair_duplicates: u64,
    pub(crate) read_pair_optical_duplicates: u64,
    pub(crate) percent_duplication: f64,
    pub(crate) estimated_library_size: Option<u64>,
}

impl DuplicationMetrics {
    fn merge(&mut self, other: &DuplicationMetrics) {
        self.unpaired_reads_examined += other.unpaired_reads_examined;
        self.read_pairs_examined += other.read_pairs_examined;
        self.secondary_or_supplementary_rds += other.secondary_or_supplementary_rds;
        self.unmapped_reads += other.unmapped_reads;
        self.unpaired_read_duplicates += other.unpaired_read_duplicates;
        self.read_pair_duplicates += other.read_pair_duplicates;
        self.read_pair_optical_duplicates += other.read_pair_optical_duplicates;
    }

    /**
     * Fills in the ESTIMATED_LIBRARY_SIZE based on the paired read data examined where
     * possible and the PERCENT_DUPLICATION.
     */
    pub(crate) fn calculate_derived_fields(&mut self) {
        self.estimated_library_size = estimate_library_size(
            self.read_pairs_examined - self.read_pair_optical_duplicates,
            self.read_pairs_examined - self.read_pair_duplicates,
        );

        let examined = self.unpaired_reads_examined + self.read_pairs_examined * 2;
        self.percent_duplication = if examined == 0 {
            0.0
        } else {
            (self.unpaired_read_duplicates + self.read_pair_duplicates * 2) as f64 / examined as f64
        };
    }
}

impl MetricBase for DuplicationMetrics {
    fn type_name() -> &'static str {
        "DuplicationMetrics"
    }

    fn column_names() -> &'static [&'static str] {
        &[
            "LIBRARY",
            "UNPAIRED_READS_EXAMINED",
            "READ_PAIRS_EXAMINED",
            "SECONDARY_OR_SUPPLEMENTARY_RDS",
            "UNMAPPED_READS",
            "UNPAIRED_READ_DUPLICATES",
            "READ_PAIR_DUPLICATES",
            "READ_PAIR_OPTICAL_DUPLICATES",
            "PERCENT_DUPLICATION",
            "ESTIMATED_LIBRARY_SIZE",
        ]
    }

    fn values(&self) -> Vec<String> {
        vec![
            self.library.clone(),
            self.unpaired_reads_examined.to_string(),
            self.read_pairs_examined.to_string(),
            self.secondary_or_supplementary_rds.to_string(),
            self.unmapped_reads.to_string(),
            self.unpaired_read_duplicates.to_string(),
            self.read_pair_duplicates.to_string(),
            self.read_pair_optical_duplicates.to_string(),
            format!("{:.6}", self.percent_duplication),
            self.estimated_library_size
                .map(|v| v.to_string())
                .unwrap_or_default(),
        ]
    }
}

/**
 * Estimates the size of a library based on the number of paired end molecules observed
 * and the number of unique pairs observed.
 *
 * Based on the Lander-Waterman equation that states:
 *     C/X = 1 - exp( -N/X )
 * where
 *     X = number of distinct molecules in library
 *     N = number of read pairs
 *     C = number of distinct fragments observed in read pairs
 */
pub(crate) fn estimate_library_size(read_pairs: u64, unique_read_pairs: u64) -> Option<u64> {
    let read_pair_duplicates = read_pairs.saturating_sub(unique_read_pairs);

    if read_pairs == 0 || read_pair_duplicates == 0 || unique_read_pairs == 0 {
        return None;
    }

    let n = read_pairs as f64;
    let c = unique_read_pairs as f64;
    let f = |x: f64| c / x - 1.0 + (-n / x).exp();

    let mut m = 1.0;
    let mut upper = 100.0;

    if unique_read_pairs >= read_pairs || f(m * c) < 0.0 {
        return None;
    }

    // find value of M, large enough to act as other side for bisection method
    while f(upper * c) > 0.0 {
        upper *= 10.0;
    }

    // use bisection method (no more than 40 times) to find solution
    for _ in 0..40 {
        let r = (m + upper) / 2.0;
        let u = f(r * c);
        if u == 0.0 {
            break;
        } else if u > 0.0 {
            m = r;
        } else {
            upper = r;
        }
    }

    Some((c * (m + upper) / 2.0) as u64)
}

/// Run-wide counters. Shard workers fill private collections which are merged at the end.
#[derive(Debug, Default)]
pub(crate) struct MetricsCollection {
    library_metrics: BTreeMap<i16, DuplicationMetrics>,
    /// Keyed by (duplicate group size, optical distance).
    optical_distances: Histogram<(i32, i32)>,
    duplicate_set_sizes: Histogram<i32>,
}

impl MetricsCollection {
    pub(crate) fn library_mut(&mut self, library_id: i16) -> &mut DuplicationMetrics {
        self.library_metrics.entry(library_id).or_default()
    }

    pub(crate) fn add_distance(&mut self, set_size: usize, distance: i32) {
        self.optical_distances
            .increment1((set_size.min(i32::MAX as usize) as i32, distance));
    }

    pub(crate) fn add_duplicate_set(&mut self, set_size: usize) {
        self.duplicate_set_sizes
            .increment1(set_size.min(i32::MAX as usize) as i32);
    }

    pub(crate) fn merge(&mut self, other: MetricsCollection) {
        for (library_id, m) in other.library_metrics.iter() {
            self.library_mut(*library_id).merge(m);
        }
        self.optical_distances.add_histogram(&other.optical_distances);
        self.duplicate_set_sizes
            .add_histogram(&other.duplicate_set_sizes);
    }

    /// Final per-library rows, with library names and derived fields filled in.
    pub(crate) fn library_metrics(&self, libraries: &LibraryIdGenerator) -> Vec<DuplicationMetrics> {
        self.library_metrics
            .iter()
            .map(|(library_id, m)| {
                let mut m = m.clone();
                m.library = libraries.library_name(*library_id).to_string();
                m.calculate_derived_fields();
                m
            })
            .collect()
    }

    pub(crate) fn optical_distances(&self) -> &Histogram<(i32, i32)> {
        &self.optical_distances
    }

    pub(crate) fn write_metrics(
        &self,
        path: impl AsRef<Path>,
        libraries: &LibraryIdGenerator,
        headers: Vec<String>,
    ) -> Result<(), Error> {
        let mut file = MetricsFile::<DuplicationMetrics, i32>::new();
        for h in headers {
            file.add_header(MetricsHeader::StringHeader(h));
        }
        for m in self.library_metrics(libraries) {
            file.add_metric(m);
        }
        if !self.duplicate_set_sizes.is_empty() {
            let mut h = Histogram::from_labels("set_size", "duplicate_sets");
            h.add_histogram(&self.duplicate_set_sizes);
            file.add_histogram(h);
        }

        file.write(path)
    }

    /// Writes the optical distance histogram as `set_size  distance  count` rows.
    pub(crate) fn write_optical_histogram(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let mut out = BufWriter::new(File::create(path.as_ref())?);
        self.write_optical_histogram_to(&mut out)?;
        out.flush()?;

        Ok(())
    }

    fn write_optical_histogram_to(&self, out: &mut impl Write) -> Result<(), Error> {
        writeln!(out, "set_size\tdistance\tcount")?;
        for bin in self.optical_distances.bins() {
            let (set_size, distance) = bin.get_id();
            writeln!(out, "{}\t{}\t{}", set_size, distance, bin.get_value())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn library_size_has_no_estimate_without_duplicates() {
        assert_eq!(estimate_library_size(0, 0), None);
        assert_eq!(estimate_library_size(100, 100), None);
    }

    #[test]
    fn library_size_estimate() {
        // 1000 pairs of which 900 unique: the solution of 900/X = 1 - exp(-1000/X) is ~4,660.
        let estimate = estimate_library_size(1000, 900).unwrap();
        assert!((4600..4700).contains(&estimate), "{}", estimate);

        // more duplication means a smaller library
        assert!(estimate_library_size(1000, 500).unwrap() < estimate);
    }

    #[test]
    fn percent_duplication() {
        let mut m = DuplicationMetrics {
            unpaired_reads_examined: 10,
            read_pairs_examined: 20,
            unpaired_read_duplicates: 2,
            read_pair_duplicates: 4,
            ..Default::default()
        };
        m.calculate_derived_fields();

        assert!((m.percent_duplication - 10.0 / 50.0).abs() < 1e-9);
        assert!(m.estimated_library_size.is_some());
    }

    #[test]
    fn merging_collections() {
        let mut a = MetricsCollection::default();
        a.library_mut(0).read_pairs_examined = 3;
        a.add_distance(2, 10);

        let mut b = MetricsCollection::default();
        b.library_mut(0).read_pairs_examined = 4;
        b.library_mut(1).unpaired_reads_examined = 1;
        b.add_distance(2, 10);
        b.add_distance(3, 1);

        a.merge(b);

        let rows = a.library_metrics(&LibraryIdGenerator::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].read_pairs_examined, 7);
        assert_eq!(rows[0].library, LibraryIdGenerator::UNKNOWN_LIBRARY);

        let mut out = Vec::new();
        a.write_optical_histogram_to(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "set_size\tdistance\tcount\n2\t10\t2\n3\t1\t1\n"
        );
    }

    #[test]
    fn metrics_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.txt");

        let mut c = MetricsCollection::default();
        c.library_mut(0).unpaired_reads_examined = 4;
        c.library_mut(0).unpaired_read_duplicates = 1;
        c.add_duplicate_set(2);
        c.write_metrics(&path, &LibraryIdGenerator::default(), vec!["cmd".into()])
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("## htsjdk.samtools.metrics.StringHeader\n# cmd\n"));
        assert!(text.contains("Unknown Library\t4\t0\t0\t0\t1\t0\t0\t0.250000\t\n"));
        assert!(text.contains("## HISTOGRAM\tset_size\nset_size\tduplicate_sets\n2\t1\n"));
    }
}
