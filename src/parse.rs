use anyhow::{Context, Result, anyhow, bail};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Recognized columns, in output order
pub const FIELD_NAMES: [&str; 9] = [
    "Time",
    "Number of values",
    "Number of different values",
    "Number of values which could be parsed",
    "Number of different values which could be parsed",
    "Number of values which returned a warning",
    "Number of different values which returned a warning",
    "Number of values which are not prettified",
    "Number of different values which are not prettified",
];

pub const TIME_FIELD: &str = FIELD_NAMES[0];

/// Bytes inspected for header and delimiter detection
const SAMPLE_LEN: u64 = 1024;

/// One record from an input file: the time key plus the eight counters,
/// in `FIELD_NAMES` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub time: String,
    pub counts: [u64; 8],
}

/// Lazy reader over the data rows of one statistics CSV file.
///
/// Opening detects the delimiter and validates the header; iterating
/// yields one parsed `Row` per data line, failing on the first
/// malformed value.
#[derive(Debug)]
pub struct StatsReader {
    path: PathBuf,
    delimiter: char,
    columns: Vec<String>,
    lines: io::Lines<BufReader<File>>,
}

/// Presence check on the detection sample: the first non-comment line
/// must mention the time column. Not a full parse.
fn has_header_line(sample: &str) -> bool {
    sample
        .lines()
        .find(|line| !line.starts_with('#') && !line.trim().is_empty())
        .is_some_and(|line| line.contains(TIME_FIELD))
}

/// Prefer comma; fall back to semicolon if the sample has no comma.
fn detect_delimiter(sample: &str) -> Option<char> {
    if sample.contains(',') {
        Some(',')
    } else if sample.contains(';') {
        Some(';')
    } else {
        None
    }
}

impl StatsReader {
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)
            .with_context(|| format!("cannot open input file {}", path.display()))?;

        let mut sample = Vec::new();
        file.by_ref()
            .take(SAMPLE_LEN)
            .read_to_end(&mut sample)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let sample = String::from_utf8_lossy(&sample);

        if !has_header_line(&sample) {
            bail!(
                "no header line found in {}: not a recognized generated statistics file",
                path.display()
            );
        }
        let Some(delimiter) = detect_delimiter(&sample) else {
            bail!("unknown delimiter in {}", path.display());
        };

        // rewind: the sample bytes belong to the header
        file.seek(SeekFrom::Start(0))?;
        let mut lines = BufReader::new(file).lines();

        let header = loop {
            match lines.next() {
                None => bail!(
                    "no header line found in {}: not a recognized generated statistics file",
                    path.display()
                ),
                Some(line) => {
                    let line = line?;
                    let line = line.trim_end_matches('\r');
                    if line.starts_with('#') || line.trim().is_empty() {
                        continue;
                    }
                    break line.to_string();
                }
            }
        };

        let columns: Vec<String> = header
            .split(delimiter)
            .map(|name| name.trim().to_string())
            .collect();
        for name in FIELD_NAMES {
            if !columns.iter().any(|column| column == name) {
                bail!("missing column {:?} in {}", name, path.display());
            }
        }

        Ok(StatsReader {
            path: path.to_owned(),
            delimiter,
            columns,
            lines,
        })
    }

    /// Map one data line onto the recognized fields by column name.
    /// Unrecognized columns are ignored.
    fn parse_row(&self, line: &str) -> Result<Row> {
        let values: HashMap<&str, &str> = self
            .columns
            .iter()
            .map(String::as_str)
            .zip(line.split(self.delimiter).map(str::trim_start))
            .collect();
        let field = |name: &str| {
            values.get(name).copied().ok_or_else(|| {
                anyhow!(
                    "row in {} has no value for column {:?}",
                    self.path.display(),
                    name
                )
            })
        };

        let time = field(TIME_FIELD)?.to_string();
        let mut counts = [0u64; 8];
        for (count, name) in counts.iter_mut().zip(FIELD_NAMES[1..].iter().copied()) {
            let value = field(name)?;
            *count = value.trim().parse().map_err(|_| {
                anyhow!(
                    "invalid value {:?} for field {:?} in {}",
                    value,
                    name,
                    self.path.display()
                )
            })?;
        }

        Ok(Row { time, counts })
    }
}

impl Iterator for StatsReader {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            let line = line.trim_end_matches('\r');
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            return Some(self.parse_row(line));
        }
    }
}
