use std::{fmt::{self, Display, Formatter}, str::FromStr};

use itertools::Itertools;
use located_error::prelude::*;

use crate::{Genotype, VcfError, genotype::MISSING};

/// 0-based expected column index of the INFO field.
pub const INFO_FIELD_INDEX: usize = 7;
/// 0-based expected column index of the FORMAT field.
pub const FORMAT_FIELD_INDEX: usize = 8;
/// 0-based expected column index where genotype entries are expected to begin.
pub const GENOTYPES_START_IDX: usize = 9;

pub const FORMAT_GT: &str = "GT";
pub const FORMAT_DE_NOVO: &str = "DN";
pub const INFO_ALLELE_FREQ: &str = "AF";

/// Spanning deletion placeholder allele.
pub const SPANNING_DELETION: &str = "*";

/// Nature of an allele.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlleleKind {
    /// Explicit bases.
    Concrete,
    /// `*`: the position is covered by an upstream deletion.
    SpanningDeletion,
    /// Structural allele: `<DEL>`, breakends, single breakends...
    Symbolic,
}

impl AlleleKind {
    #[must_use]
    pub fn of(allele: &str) -> Self {
        if allele == SPANNING_DELETION {
            Self::SpanningDeletion
        } else if allele.starts_with('<')
            || allele.contains('[')
            || allele.contains(']')
            || (allele.len() > 1 && (allele.starts_with('.') || allele.ends_with('.'))) {
            Self::Symbolic
        } else {
            Self::Concrete
        }
    }
}

/// A single VCF data line.
///
/// # Fields
/// - `chrom`  : sequence name.
/// - `start`  : 0-based start position (the text form is 1-based).
/// - `id`     : ID column, `.` when absent.
/// - `ref_allele`, `alts`: reference and alternate alleles.
/// - `qual`, `filter`: raw QUAL and FILTER columns.
/// - `info`   : ordered `key[=value]` INFO entries.
/// - `format` : FORMAT keys.
/// - `samples`: per-sample values, aligned on `format`.
#[derive(Debug, Clone, PartialEq)]
pub struct VcfRecord {
    chrom     : String,
    start     : usize,
    id        : String,
    ref_allele: String,
    alts      : Vec<String>,
    qual      : String,
    filter    : String,
    info      : Vec<(String, Option<String>)>,
    format    : Vec<String>,
    samples   : Vec<Vec<String>>,
}

impl VcfRecord {
    #[must_use]
    pub fn new(chrom: impl Into<String>, start: usize, ref_allele: impl Into<String>) -> Self {
        Self {
            chrom     : chrom.into(),
            start,
            id        : MISSING.to_string(),
            ref_allele: ref_allele.into(),
            alts      : Vec::new(),
            qual      : MISSING.to_string(),
            filter    : MISSING.to_string(),
            info      : Vec::new(),
            format    : Vec::new(),
            samples   : Vec::new(),
        }
    }

    #[must_use]
    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    /// 0-based start position.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// 0-based, exclusive end of the reference span.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.ref_allele.len()
    }

    #[must_use]
    pub fn ref_allele(&self) -> &str {
        &self.ref_allele
    }

    #[must_use]
    pub fn alts(&self) -> &[String] {
        &self.alts
    }

    pub fn add_alt(&mut self, alt: impl Into<String>) -> &mut Self {
        self.alts.push(alt.into());
        self
    }

    /// Allele `idx`, where 0 is the reference.
    #[must_use]
    pub fn allele(&self, idx: usize) -> Option<&str> {
        match idx {
            0 => Some(&self.ref_allele),
            k => self.alts.get(k - 1).map(String::as_str),
        }
    }

    /// Value of an INFO entry. Flags yield an empty string.
    #[must_use]
    pub fn info(&self, key: &str) -> Option<&str> {
        self.info.iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_deref().unwrap_or(""))
    }

    pub fn set_info(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        let value = Some(value.into());
        match self.info.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None        => self.info.push((key.to_string(), value)),
        }
        self
    }

    pub fn clear_info(&mut self) {
        self.info.clear();
    }

    #[must_use]
    pub fn format(&self) -> &[String] {
        &self.format
    }

    #[must_use]
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    fn format_index(&self, key: &str) -> Option<usize> {
        self.format.iter().position(|k| k == key)
    }

    /// Register a FORMAT key, filling every existing sample with `.`
    pub fn add_format(&mut self, key: &str) -> usize {
        if let Some(idx) = self.format_index(key) {
            return idx
        }
        self.format.push(key.to_string());
        for sample in &mut self.samples {
            sample.push(MISSING.to_string());
        }
        self.format.len() - 1
    }

    /// Append a new sample column, with every FORMAT value set to `.`
    pub fn add_sample(&mut self) -> usize {
        self.samples.push(vec![MISSING.to_string(); self.format.len()]);
        self.samples.len() - 1
    }

    /// Raw value of `key` for sample `sample_idx`.
    #[must_use]
    pub fn sample_value(&self, sample_idx: usize, key: &str) -> Option<&str> {
        let idx = self.format_index(key)?;
        self.samples.get(sample_idx)?.get(idx).map(String::as_str)
    }

    /// Raw values of every FORMAT key, for sample `sample_idx`.
    #[must_use]
    pub fn sample_values(&self, sample_idx: usize) -> Option<&[String]> {
        self.samples.get(sample_idx).map(Vec::as_slice)
    }

    pub fn set_sample_value(&mut self, sample_idx: usize, key: &str, value: impl Into<String>) -> Result<()> {
        let idx = self.add_format(key);
        let sample = self.samples.get_mut(sample_idx).with_loc(|| VcfError::SampleIndex(sample_idx))?;
        sample[idx] = value.into();
        Ok(())
    }

    /// Copy every FORMAT value of `from` into sample `to`.
    pub fn copy_sample(&mut self, from: usize, to: usize) -> Result<()> {
        let values = self.samples.get(from).cloned().with_loc(|| VcfError::SampleIndex(from))?;
        *self.samples.get_mut(to).with_loc(|| VcfError::SampleIndex(to))? = values;
        Ok(())
    }

    /// Parsed `GT` field of a sample. `None` if the record carries no `GT` key.
    pub fn genotype(&self, sample_idx: usize) -> Result<Option<Genotype>> {
        match self.sample_value(sample_idx, FORMAT_GT) {
            Some(gt) => Ok(Some(gt.parse::<Genotype>().with_loc(|| format!("At {}:{}", self.chrom, self.start + 1))?)),
            None     => Ok(None),
        }
    }

    pub fn set_genotype(&mut self, sample_idx: usize, genotype: &Genotype) -> Result<()> {
        self.set_sample_value(sample_idx, FORMAT_GT, genotype.to_string())
    }
}

impl FromStr for VcfRecord {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.trim_end_matches(&['\n', '\r'][..]).split('\t').collect();
        if fields.len() < FORMAT_FIELD_INDEX {
            return Err(VcfError::MissingFields{expected: FORMAT_FIELD_INDEX, found: fields.len()})
                .loc("While parsing VCF record")
        }

        let pos: usize = fields[1].parse().ok()
            .filter(|pos| *pos > 0)
            .with_loc(|| VcfError::ParsePos(fields[1].to_string()))?;

        let alts = match fields[4] {
            MISSING => Vec::new(),
            alts    => alts.split(',').map(ToString::to_string).collect(),
        };

        let info = match fields[INFO_FIELD_INDEX] {
            MISSING => Vec::new(),
            info    => info.split(';').map(|entry| match entry.split_once('=') {
                Some((key, value)) => (key.to_string(), Some(value.to_string())),
                None               => (entry.to_string(), None),
            }).collect(),
        };

        let format: Vec<String> = fields.get(FORMAT_FIELD_INDEX)
            .map(|f| f.split(':').map(ToString::to_string).collect())
            .unwrap_or_default();

        // Trailing sample fields may be dropped.
        let samples = fields.iter().skip(GENOTYPES_START_IDX).map(|sample| {
            let mut values: Vec<String> = sample.split(':').map(ToString::to_string).collect();
            values.resize(format.len().max(values.len()), MISSING.to_string());
            values
        }).collect();

        Ok(Self {
            chrom     : fields[0].to_string(),
            start     : pos - 1,
            id        : fields[2].to_string(),
            ref_allele: fields[3].to_string(),
            alts,
            qual      : fields[5].to_string(),
            filter    : fields[6].to_string(),
            info,
            format,
            samples,
        })
    }
}

impl Display for VcfRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let alts = match self.alts.is_empty() {
            true  => MISSING.to_string(),
            false => self.alts.join(","),
        };
        let info = match self.info.is_empty() {
            true  => MISSING.to_string(),
            false => self.info.iter().map(|(key, value)| match value {
                Some(value) => format!("{key}={value}"),
                None        => key.clone(),
            }).join(";"),
        };
        write!(f, "{}\t{}\t{}\t{}\t{alts}\t{}\t{}\t{info}",
            self.chrom, self.start + 1, self.id, self.ref_allele, self.qual, self.filter
        )?;
        if !self.format.is_empty() {
            write!(f, "\t{}", self.format.join(":"))?;
            for sample in &self.samples {
                write!(f, "\t{}", sample.join(":"))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "chr1\t60026\trs1\tA\tC,AT\t100\tPASS\tAC=25;AF=0.3,0.2;DB\tGT:DP\t0|1:4\t1|2:3\t.";

    #[test]
    fn parse_fields() -> Result<()> {
        let record: VcfRecord = LINE.parse()?;
        assert_eq!(record.chrom(), "chr1");
        assert_eq!(record.start(), 60025);
        assert_eq!(record.end(), 60026);
        assert_eq!(record.alts(), &["C".to_string(), "AT".to_string()]);
        assert_eq!(record.allele(0), Some("A"));
        assert_eq!(record.allele(2), Some("AT"));
        assert_eq!(record.allele(3), None);
        assert_eq!(record.info(INFO_ALLELE_FREQ), Some("0.3,0.2"));
        assert_eq!(record.info("DB"), Some(""));
        assert_eq!(record.info("XX"), None);
        assert_eq!(record.num_samples(), 3);
        assert_eq!(record.sample_value(0, "DP"), Some("4"));
        assert_eq!(record.sample_value(2, "DP"), Some("."));
        assert_eq!(record.genotype(1)?, Some(Genotype::phased(&[1, 2])));
        Ok(())
    }

    #[test]
    fn display_roundtrip() -> Result<()> {
        let record: VcfRecord = LINE.replace("\t.", "\t.:.").parse()?;
        assert_eq!(record.to_string(), LINE.replace("\t.", "\t.:."));
        Ok(())
    }

    #[test]
    fn sites_only_record() -> Result<()> {
        let mut record = VcfRecord::new("2", 9, "AC");
        record.add_alt("A").set_info(INFO_ALLELE_FREQ, "0.5");
        assert_eq!(record.to_string(), "2\t10\t.\tAC\tA\t.\t.\tAF=0.5");
        let reparsed: VcfRecord = record.to_string().parse()?;
        assert_eq!(reparsed, record);
        Ok(())
    }

    #[test]
    fn sample_edition() -> Result<()> {
        let mut record: VcfRecord = "1\t5\t.\tA\tG\t.\t.\t.\tGT\t0|1".parse()?;
        let child = record.add_sample();
        assert_eq!(record.sample_value(child, FORMAT_GT), Some("."));
        record.set_sample_value(child, FORMAT_DE_NOVO, "Y")?;
        assert_eq!(record.format(), &["GT".to_string(), "DN".to_string()]);
        assert_eq!(record.sample_value(0, FORMAT_DE_NOVO), Some("."));
        record.copy_sample(0, child)?;
        assert_eq!(record.sample_value(child, FORMAT_GT), Some("0|1"));
        assert!(record.set_sample_value(9, FORMAT_GT, "0").is_err());
        record.clear_info();
        assert_eq!(record.to_string(), "1\t5\t.\tA\tG\t.\t.\t.\tGT:DN\t0|1:.\t0|1:.");
        Ok(())
    }

    #[test]
    fn invalid_records() {
        assert!("1\t0\t.\tA\tG\t.\t.\t.".parse::<VcfRecord>().is_err());
        assert!("1\tX\t.\tA\tG\t.\t.\t.".parse::<VcfRecord>().is_err());
        assert!("1\t5\t.\tA".parse::<VcfRecord>().is_err());
    }

    #[test]
    fn allele_kinds() {
        assert_eq!(AlleleKind::of("ACGT"), AlleleKind::Concrete);
        assert_eq!(AlleleKind::of("*"), AlleleKind::SpanningDeletion);
        assert_eq!(AlleleKind::of("<DEL>"), AlleleKind::Symbolic);
        assert_eq!(AlleleKind::of("G]17:198982]"), AlleleKind::Symbolic);
        assert_eq!(AlleleKind::of(".A"), AlleleKind::Symbolic);
    }
}
