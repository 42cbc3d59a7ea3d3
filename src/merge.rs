use crate::cli::Args;
use crate::parse::{FIELD_NAMES, Row, StatsReader};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{Level, debug, info};

/// Running sums for one time key
#[derive(Debug)]
struct MergedEntry {
    time: String,
    counts: [u64; 8],
}

/// Merge state accumulated across all input files.
///
/// A value of this type only exists once every input has parsed
/// successfully; construction fails otherwise.
#[derive(Debug)]
pub struct Merger {
    csv_files: Vec<PathBuf>,
    entries: BTreeMap<String, MergedEntry>,
    coverage: BTreeMap<String, HashSet<PathBuf>>,
}

impl Merger {
    /// Parse every input file, in order, and fold its rows into the
    /// merge state. The first unreadable or malformed input aborts.
    pub fn from_files(csv_files: &[PathBuf]) -> Result<Self> {
        let mut merger = Merger {
            csv_files: csv_files.to_vec(),
            entries: BTreeMap::new(),
            coverage: BTreeMap::new(),
        };

        let pb = ProgressBar::new(csv_files.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );

        for path in csv_files {
            pb.inc(1);
            pb.set_message(format!("{}", path.display()));
            info!("parsing file: {}", path.display());

            for row in StatsReader::open(path)? {
                merger.ingest(row?, path);
            }
        }

        pb.finish_with_message("done");
        Ok(merger)
    }

    /// Add one row into the sums and record its source in the time
    /// key's coverage. Duplicate rows from the same source are summed
    /// again, not deduplicated.
    fn ingest(&mut self, row: Row, source: &Path) {
        let entry = self
            .entries
            .entry(row.time.clone())
            .or_insert_with(|| MergedEntry {
                time: row.time.clone(),
                counts: [0; 8],
            });
        for (sum, value) in entry.counts.iter_mut().zip(row.counts) {
            *sum += value;
        }
        self.coverage
            .entry(row.time)
            .or_default()
            .insert(source.to_owned());
    }

    /// Input files that never reported a row for this time key, in
    /// input order.
    pub fn missing_sources(&self, time: &str) -> Vec<&Path> {
        let covered = self.coverage.get(time);
        self.csv_files
            .iter()
            .filter(|path| !covered.is_some_and(|sources| sources.contains(*path)))
            .map(PathBuf::as_path)
            .collect()
    }

    /// Write the combined table: one row per time key covered by every
    /// input, in ascending key order. Keys with incomplete coverage
    /// are dropped entirely, never zero-filled.
    pub fn write_combined(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("cannot create output file {}", path.display()))?;
        let mut out = BufWriter::new(file);
        writeln!(out, "{}", FIELD_NAMES.join(","))?;

        for (time, entry) in &self.entries {
            let covered = self.coverage.get(time).map_or(0, HashSet::len);
            if covered == self.csv_files.len() {
                write!(out, "{}", entry.time)?;
                for count in entry.counts {
                    write!(out, ",{}", count)?;
                }
                writeln!(out)?;
            } else if tracing::enabled!(Level::DEBUG) {
                let missing = self.missing_sources(time);
                if !missing.is_empty() {
                    debug!("missing files for {}: {:?}", time, missing);
                }
            }
        }

        out.flush()?;
        Ok(())
    }
}

pub fn run(args: Args) -> Result<()> {
    let merger = Merger::from_files(&args.csv_files)?;
    merger.write_combined(&args.output_file)
}
