use std::{
    fmt::Display,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use super::utils::histogram::Histogram;
use anyhow::Error;

/// A row of a metrics table.
pub(crate) trait MetricBase {
    /// Name written after `## METRICS CLASS`.
    fn type_name() -> &'static str;

    fn column_names() -> &'static [&'static str];

    /// Cell values, in the order of `column_names`.
    fn values(&self) -> Vec<String>;
}

/// Picard-style metrics report: headers first, metrics second and histograms third.
pub(crate) struct MetricsFile<B, H> {
    metrics: Vec<B>,
    histograms: Vec<Histogram<H>>,

    headers: Vec<MetricsHeader>,
}

impl<B, H> MetricsFile<B, H>
where
    B: MetricBase,
    H: Ord + Copy + Display,
{
    pub(crate) const MAJOR_HEADER_PREFIX: &'static str = "## ";
    pub(crate) const MINOR_HEADER_PREFIX: &'static str = "# ";

    const SEPARATOR: &'static str = "\t";
    const HISTO_HEADER: &'static str = "## HISTOGRAM\t";
    const METRIC_HEADER: &'static str = "## METRICS CLASS\t";

    pub(crate) fn new() -> Self {
        Self {
            metrics: Vec::new(),
            histograms: Vec::new(),
            headers: Vec::new(),
        }
    }

    /** Adds a bean to the collection of metrics. */
    pub(crate) fn add_metric(&mut self, bean: B) {
        self.metrics.push(bean)
    }

    /** Adds a histogram to the list of histograms in the metrics file. */
    pub(crate) fn add_histogram(&mut self, histogram: Histogram<H>) {
        self.histograms.push(histogram)
    }

    /** Adds a header to the collection of metrics. */
    pub(crate) fn add_header(&mut self, h: MetricsHeader) {
        self.headers.push(h)
    }

    /**
     * Writes out the metrics file to the supplied file. The file is written out
     * headers first, metrics second and histogram third.
     */
    pub(crate) fn write(&self, f: impl AsRef<Path>) -> Result<(), Error> {
        let mut out = BufWriter::new(File::create(f.as_ref())?);
        self.write_to(&mut out)?;
        out.flush()?;

        Ok(())
    }

    pub(crate) fn write_to(&self, out: &mut impl Write) -> Result<(), Error> {
        self.print_header(out)?;
        writeln!(out)?;

        self.print_bean_metrics(out)?;
        writeln!(out)?;

        self.print_histogram(out)?;
        writeln!(out)?;

        Ok(())
    }

    /** Prints the headers into the provided writer. */
    fn print_header(&self, out: &mut impl Write) -> Result<(), std::io::Error> {
        for h in self.headers.iter() {
            writeln!(out, "{}{}", Self::MAJOR_HEADER_PREFIX, h.type_name())?;
            writeln!(out, "{}{}", Self::MINOR_HEADER_PREFIX, h)?;
        }

        Ok(())
    }

    /** Prints each of the metrics entries into the provided writer. */
    fn print_bean_metrics(&self, out: &mut impl Write) -> Result<(), std::io::Error> {
        if self.metrics.is_empty() {
            return Ok(());
        }

        // Write out a header row with the type of the metric class
        writeln!(out, "{}{}", Self::METRIC_HEADER, B::type_name())?;
        writeln!(out, "{}", B::column_names().join(Self::SEPARATOR))?;

        for bean in self.metrics.iter() {
            writeln!(out, "{}", bean.values().join(Self::SEPARATOR))?;
        }

        Ok(())
    }

    fn print_histogram(&self, out: &mut impl Write) -> Result<(), std::io::Error> {
        let Some(first) = self.histograms.first() else {
            return Ok(());
        };

        // All histograms share the bin column of the first one.
        let mut keys = self
            .histograms
            .iter()
            .flat_map(|h| h.bins().map(|b| b.get_id()))
            .collect::<Vec<_>>();
        keys.sort();
        keys.dedup();

        writeln!(out, "{}{}", Self::HISTO_HEADER, first.get_bin_label())?;
        write!(out, "{}", first.get_bin_label())?;
        for h in self.histograms.iter() {
            write!(out, "{}{}", Self::SEPARATOR, h.get_value_label())?;
        }
        writeln!(out)?;

        for key in keys {
            write!(out, "{}", key)?;
            for h in self.histograms.iter() {
                let value = h.get(&key).map(|b| b.get_value()).unwrap_or(0.0);
                write!(out, "{}{}", Self::SEPARATOR, value)?;
            }
            writeln!(out)?;
        }

        Ok(())
    }
}

#[derive(Clone)]
pub(crate) enum MetricsHeader {
    StringHeader(String),
}

impl MetricsHeader {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            MetricsHeader::StringHeader(_) => "htsjdk.samtools.metrics.StringHeader",
        }
    }
}

impl Display for MetricsHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsHeader::StringHeader(v) => write!(f, "{}", v),
        }
    }
}
