use std::fmt::{self, Display, Formatter};

use genome::Sex;
use located_error::{prelude::*, loc};

use crate::VcfError;

pub const FILE_FORMAT_LINE: &str = "##fileformat=VCFv4.2";
const COLUMNS: [&str; 8] = ["#CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO"];

/// VCF header: meta-information lines and sample names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcfHeader {
    meta   : Vec<String>,
    samples: Vec<String>,
}

impl Default for VcfHeader {
    fn default() -> Self {
        Self{meta: vec![FILE_FORMAT_LINE.to_string()], samples: Vec::new()}
    }
}

/// Value of `key` within a structured meta line body such as `<ID=x,Sex=MALE>`.
fn structured_field<'a>(body: &'a str, key: &str) -> Option<&'a str> {
    body.trim_start_matches('<').trim_end_matches('>')
        .split(',')
        .filter_map(|field| field.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, value)| value)
}

impl VcfHeader {
    /// Build a header from its raw `##` lines and `#CHROM` line.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
        let mut meta = Vec::new();
        for line in lines {
            let line = line.as_ref().trim_end();
            if line.starts_with("##") {
                meta.push(line.to_string());
            } else if line.starts_with("#CHROM") {
                let samples = line.split('\t').skip(COLUMNS.len() + 1).map(ToString::to_string).collect();
                return Ok(Self{meta, samples})
            }
        }
        loc!(VcfError::MissingHeader)
    }

    #[must_use]
    pub fn meta_lines(&self) -> &[String] {
        &self.meta
    }

    /// Append a meta line, unless an identical one is already present.
    pub fn add_meta_line(&mut self, line: impl Into<String>) {
        let line = line.into();
        if !self.meta.contains(&line) {
            self.meta.push(line);
        }
    }

    /// Bodies of every `##<key>=` meta line.
    pub fn meta_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.meta.iter().filter_map(move |line| {
            line.strip_prefix("##")
                .and_then(|l| l.strip_prefix(key))
                .and_then(|l| l.strip_prefix('='))
        })
    }

    pub fn add_info_line(&mut self, id: &str, number: &str, kind: &str, description: &str) {
        let exists = self.meta_values("INFO").any(|body| structured_field(body, "ID") == Some(id));
        if !exists {
            self.meta.push(format!("##INFO=<ID={id},Number={number},Type={kind},Description=\"{description}\">"));
        }
    }

    pub fn add_format_line(&mut self, id: &str, number: &str, kind: &str, description: &str) {
        let exists = self.meta_values("FORMAT").any(|body| structured_field(body, "ID") == Some(id));
        if !exists {
            self.meta.push(format!("##FORMAT=<ID={id},Number={number},Type={kind},Description=\"{description}\">"));
        }
    }

    /// `true` if a `##FORMAT` line declares `id`.
    #[must_use]
    pub fn has_format(&self, id: &str) -> bool {
        self.meta_values("FORMAT").any(|body| structured_field(body, "ID") == Some(id))
    }

    pub fn add_contig(&mut self, name: &str, length: usize) {
        self.add_meta_line(format!("##contig=<ID={name},length={length}>"));
    }

    /// Record the seed of the run which produced this file. Any previous seed line is replaced.
    pub fn set_seed(&mut self, seed: u64) {
        self.meta.retain(|line| !line.starts_with("##SEED="));
        self.meta.push(format!("##SEED={seed}"));
    }

    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.meta_values("SEED").last().and_then(|s| s.parse().ok())
    }

    #[must_use]
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    #[must_use]
    pub fn sample_index(&self, name: &str) -> Option<usize> {
        self.samples.iter().position(|s| s == name)
    }

    /// Index of a sample which must be present.
    pub fn require_sample(&self, name: &str) -> Result<usize> {
        self.sample_index(name).with_loc(|| VcfError::MissingSample(name.to_string()))
    }

    /// Register a new sample column.
    pub fn add_sample(&mut self, name: &str) -> Result<usize> {
        if self.sample_index(name).is_some() {
            return loc!(VcfError::DuplicateSample(name.to_string()))
        }
        self.samples.push(name.to_string());
        Ok(self.samples.len() - 1)
    }

    /// Declare the sex of a sample, through a `##SAMPLE=<ID=..,Sex=..>` line.
    pub fn add_sample_sex(&mut self, name: &str, sex: Sex) {
        self.meta.retain(|line| {
            line.strip_prefix("##SAMPLE=").map_or(true, |body| structured_field(body, "ID") != Some(name))
        });
        self.meta.push(format!("##SAMPLE=<ID={name},Sex={}>", sex.vcf_tag()));
    }

    /// Sex declared for a sample, if any.
    #[must_use]
    pub fn sample_sex(&self, name: &str) -> Option<Sex> {
        self.meta_values("SAMPLE")
            .filter(|body| structured_field(body, "ID") == Some(name))
            .find_map(|body| structured_field(body, "Sex"))
            .and_then(|sex| sex.parse::<Sex>().ok())
            .filter(|sex| !sex.is_either())
    }

    pub fn add_pedigree(&mut self, child: &str, father: &str, mother: &str) {
        self.add_meta_line(format!("##PEDIGREE=<Child={child},Mother={mother},Father={father}>"));
    }

    pub fn add_derived(&mut self, derived: &str, original: &str) {
        self.add_meta_line(format!("##PEDIGREE=<Derived={derived},Original={original}>"));
    }

    /// Header line listing the data columns.
    #[must_use]
    pub fn column_line(&self) -> String {
        let mut line = COLUMNS.join("\t");
        if !self.samples.is_empty() {
            line.push_str("\tFORMAT");
            for sample in &self.samples {
                line.push('\t');
                line.push_str(sample);
            }
        }
        line
    }
}

impl Display for VcfHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for line in &self.meta {
            writeln!(f, "{line}")?;
        }
        write!(f, "{}", self.column_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: [&str; 5] = [
        "##fileformat=VCFv4.1",
        "##SAMPLE=<ID=dad,Sex=MALE>",
        "##SAMPLE=<ID=mum,Sex=FEMALE>",
        "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">",
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tdad\tmum",
    ];

    #[test]
    fn parse_header() -> Result<()> {
        let header = VcfHeader::from_lines(&HEADER)?;
        assert_eq!(header.samples(), &["dad".to_string(), "mum".to_string()]);
        assert_eq!(header.sample_sex("dad"), Some(Sex::Male));
        assert_eq!(header.sample_sex("mum"), Some(Sex::Female));
        assert_eq!(header.sample_sex("kid"), None);
        assert!(header.has_format("GT"));
        assert!(!header.has_format("DN"));
        assert_eq!(header.to_string(), HEADER.join("\n"));
        Ok(())
    }

    #[test]
    fn missing_column_line() {
        assert!(VcfHeader::from_lines(&HEADER[..4]).is_err());
    }

    #[test]
    fn samples() -> Result<()> {
        let mut header = VcfHeader::from_lines(&HEADER)?;
        assert_eq!(header.add_sample("kid")?, 2);
        assert!(header.add_sample("dad").is_err());
        assert_eq!(header.require_sample("kid")?, 2);
        assert!(header.require_sample("ghost").is_err());
        header.add_sample_sex("kid", Sex::Female);
        header.add_sample_sex("kid", Sex::Male);
        assert_eq!(header.sample_sex("kid"), Some(Sex::Male));
        assert_eq!(header.meta_values("SAMPLE").count(), 3);
        Ok(())
    }

    #[test]
    fn meta_lines_are_not_duplicated() {
        let mut header = VcfHeader::default();
        header.add_format_line("GT", "1", "String", "Genotype");
        header.add_format_line("GT", "1", "String", "Genotype");
        header.add_info_line("AF", "A", "Float", "Allele Frequency");
        header.add_contig("chr1", 1000);
        header.add_contig("chr1", 1000);
        header.set_seed(12);
        header.set_seed(13);
        assert_eq!(header.meta_lines().len(), 5);
        assert_eq!(header.seed(), Some(13));
        assert_eq!(header.column_line(), "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO");
    }

    #[test]
    fn pedigree_lines() {
        let mut header = VcfHeader::default();
        header.add_pedigree("kid", "dad", "mum");
        header.add_derived("kid2", "kid");
        let values: Vec<&str> = header.meta_values("PEDIGREE").collect();
        assert_eq!(values, vec!["<Child=kid,Mother=mum,Father=dad>", "<Derived=kid2,Original=kid>"]);
    }
}
