use std::{fs::File, io::{BufRead, BufReader}, path::Path};

use located_error::{prelude::*, loc};
use log::{debug, info};

use crate::{Base, Ploidy, Sex};

mod error;
pub use error::ReferenceError;

mod spec;
pub use spec::{ReferenceSpec, SequenceSpec, DefaultSpec, ResolvedSpec, REFERENCE_SPEC_FILE};

/// Read-only, random access to a set of reference sequences.
///
/// Sequences are addressed by their 0-based id, in file order. Bases are returned as
/// uppercase ascii, with every non-`ACGT` character normalized to `N`.
pub trait ReferenceSource {
    fn num_sequences(&self) -> usize;

    fn name(&self, seq_id: usize) -> Result<&str>;

    fn length(&self, seq_id: usize) -> Result<usize>;

    /// Read `len` bases of sequence `seq_id`, starting at the 0-based offset `start`.
    fn read(&self, seq_id: usize, start: usize, len: usize) -> Result<&[u8]>;

    /// Per-sex ploidy specification attached to this reference, if any.
    fn reference_spec(&self) -> Option<&ReferenceSpec>;

    fn seq_id(&self, name: &str) -> Option<usize> {
        (0..self.num_sequences()).find(|id| self.name(*id).map_or(false, |n| n == name))
    }

    /// Sum of every sequence length.
    fn total_length(&self) -> Result<u64> {
        (0..self.num_sequences()).map(|id| self.length(id).map(|l| l as u64)).sum()
    }

    /// Resolve the ploidy of every sequence for the given sex.
    fn genome(&self, sex: Sex, default_ploidy: Ploidy) -> Result<ReferenceGenome> {
        ReferenceGenome::new(self, sex, default_ploidy)
    }
}

/// Metadata of a single reference sequence, resolved for a given sex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSequence {
    pub seq_id            : usize,
    pub name              : String,
    pub length            : usize,
    pub ploidy            : Ploidy,
    pub linear            : bool,
    pub haploid_complement: Option<String>,
}

impl ReferenceSequence {
    #[must_use]
    pub fn effective_count(&self) -> usize {
        self.ploidy.effective_count()
    }
}

/// Reference sequences, with their ploidy resolved for one sex.
#[derive(Debug, Clone)]
pub struct ReferenceGenome {
    sex      : Sex,
    sequences: Vec<ReferenceSequence>,
}

impl ReferenceGenome {
    pub fn new<R: ReferenceSource + ?Sized>(source: &R, sex: Sex, default_ploidy: Ploidy) -> Result<Self> {
        let empty = ReferenceSpec::default();
        let spec = source.reference_spec().unwrap_or(&empty);
        let sequences = (0..source.num_sequences()).map(|seq_id| {
            let name     = source.name(seq_id)?.to_string();
            let length   = source.length(seq_id)?;
            let resolved = spec.resolve(sex, &name, default_ploidy);
            let haploid_complement = match resolved.ploidy {
                Ploidy::Haploid => resolved.haploid_complement,
                _               => None,
            };
            Ok(ReferenceSequence{seq_id, name, length, ploidy: resolved.ploidy, linear: resolved.linear, haploid_complement})
        }).collect::<Result<Vec<_>>>()?;
        Ok(Self{sex, sequences})
    }

    #[must_use]
    pub fn sex(&self) -> Sex {
        self.sex
    }

    #[must_use]
    pub fn sequences(&self) -> &[ReferenceSequence] {
        &self.sequences
    }

    #[must_use]
    pub fn sequence(&self, name: &str) -> Option<&ReferenceSequence> {
        self.sequences.iter().find(|seq| seq.name == name)
    }
}

/// A named reference contig, held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contig {
    pub name : String,
    pub bases: Vec<u8>,
}

/// In-memory reference, loaded from a FASTA file.
///
/// # Fields
/// - `contigs`: reference sequences, in file order.
/// - `spec`   : optional ploidy specification, read from a `reference.txt` file located
///              in the same directory as the FASTA file.
#[derive(Debug, Clone, Default)]
pub struct FastaReference {
    contigs: Vec<Contig>,
    spec   : Option<ReferenceSpec>,
}

impl FastaReference {
    /// Build a reference from named ascii sequences.
    pub fn from_contigs<N, S>(contigs: impl IntoIterator<Item = (N, S)>) -> Result<Self>
    where   N: Into<String>,
            S: AsRef<[u8]>,
    {
        let mut out = Self::default();
        for (name, bases) in contigs {
            out.push_contig(name.into(), bases.as_ref())?;
        }
        Ok(out)
    }

    #[must_use]
    pub fn with_spec(mut self, spec: ReferenceSpec) -> Self {
        self.spec = Some(spec);
        self
    }

    /// Load a FASTA file, along with its sibling `reference.txt` file if present.
    pub fn from_fasta(path: impl AsRef<Path>) -> Result<Self> {
        use ReferenceError::{Empty, InvalidLine, Open, OrphanSequence};
        let path = path.as_ref();
        info!("Loading reference sequences from {}", path.display());
        let source = BufReader::new(File::open(path).with_loc(|| Open)?);

        let mut out = Self::default();
        let mut current: Option<(String, Vec<u8>)> = None;
        for (i, line) in source.lines().enumerate() {
            let line = line.with_loc(|| InvalidLine(i + 1))?;
            let line = line.trim_end();
            if let Some(header) = line.strip_prefix('>') {
                if let Some((name, bases)) = current.take() {
                    out.push_contig(name, &bases)?;
                }
                let name = header.split_whitespace().next().unwrap_or_default().to_string();
                current = Some((name, Vec::new()));
            } else if !line.is_empty() {
                match current.as_mut() {
                    Some((_, bases)) => bases.extend_from_slice(line.as_bytes()),
                    None => return loc!(OrphanSequence(i + 1)),
                }
            }
        }
        if let Some((name, bases)) = current.take() {
            out.push_contig(name, &bases)?;
        }
        if out.contigs.is_empty() {
            return loc!(Empty);
        }

        let spec_path = path.with_file_name(REFERENCE_SPEC_FILE);
        if spec_path.is_file() {
            debug!("Found reference specification at {}", spec_path.display());
            out.spec = Some(ReferenceSpec::from_file(&spec_path)?);
        }
        Ok(out)
    }

    fn push_contig(&mut self, name: String, bases: &[u8]) -> Result<()> {
        if self.contigs.iter().any(|c| c.name == name) {
            return loc!(ReferenceError::DuplicateSequence(name));
        }
        let bases = bases.iter().map(|b| Base::from_ascii(*b).to_ascii()).collect();
        debug!("Loaded contig {name}");
        self.contigs.push(Contig{name, bases});
        Ok(())
    }

    fn contig(&self, seq_id: usize) -> Result<&Contig> {
        self.contigs.get(seq_id).with_loc(|| ReferenceError::UnknownSequence(seq_id))
    }

    #[must_use]
    pub fn contigs(&self) -> &[Contig] {
        &self.contigs
    }
}

impl ReferenceSource for FastaReference {
    fn num_sequences(&self) -> usize {
        self.contigs.len()
    }

    fn name(&self, seq_id: usize) -> Result<&str> {
        Ok(&self.contig(seq_id)?.name)
    }

    fn length(&self, seq_id: usize) -> Result<usize> {
        Ok(self.contig(seq_id)?.bases.len())
    }

    fn read(&self, seq_id: usize, start: usize, len: usize) -> Result<&[u8]> {
        let contig = self.contig(seq_id)?;
        let end = start + len;
        contig.bases.get(start..end).with_loc(|| ReferenceError::OutOfBounds{
            name: contig.name.clone(), start, end, length: contig.bases.len()
        })
    }

    fn reference_spec(&self) -> Option<&ReferenceSpec> {
        self.spec.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_fasta_with_spec() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let fasta = tmpdir.path().join("genome.fa");
        let mut file = File::create(&fasta)?;
        writeln!(file, ">chr1 some description\nACGTAC\nGTacgn\n>chrX\nNNNNAC\n")?;
        std::fs::write(
            tmpdir.path().join(REFERENCE_SPEC_FILE),
            "version 1\neither\tdef\tdiploid\tlinear\nmale\tseq\tchrX\thaploid\tlinear\n"
        )?;

        let reference = FastaReference::from_fasta(&fasta)?;
        assert_eq!(reference.num_sequences(), 2);
        assert_eq!(reference.name(0)?, "chr1");
        assert_eq!(reference.length(0)?, 12);
        assert_eq!(reference.read(0, 6, 6)?, b"GTACGN");
        assert_eq!(reference.seq_id("chrX"), Some(1));
        assert_eq!(reference.total_length()?, 18);

        let male = reference.genome(Sex::Male, Ploidy::Diploid)?;
        assert_eq!(male.sequence("chrX").map(|s| s.ploidy), Some(Ploidy::Haploid));
        assert_eq!(male.sequence("chr1").map(|s| s.ploidy), Some(Ploidy::Diploid));
        let female = reference.genome(Sex::Female, Ploidy::Diploid)?;
        assert_eq!(female.sequence("chrX").map(|s| s.ploidy), Some(Ploidy::Diploid));
        Ok(())
    }

    #[test]
    fn out_of_bounds_reads_fail() -> Result<()> {
        let reference = FastaReference::from_contigs([("c", "ACGT")])?;
        assert!(reference.read(0, 2, 3).is_err());
        assert!(reference.read(1, 0, 1).is_err());
        assert!(reference.name(4).is_err());
        Ok(())
    }

    #[test]
    fn duplicate_and_orphans_fail() -> Result<()> {
        assert!(FastaReference::from_contigs([("c", "A"), ("c", "C")]).is_err());
        let tmpdir = tempfile::tempdir()?;
        let fasta = tmpdir.path().join("orphan.fa");
        std::fs::write(&fasta, "ACGT\n>c\nAC\n")?;
        assert!(FastaReference::from_fasta(&fasta).is_err());
        Ok(())
    }

    #[test]
    fn default_ploidy_without_spec() -> Result<()> {
        let reference = FastaReference::from_contigs([("a", "ACGT"), ("b", "AC")])?;
        let genome = reference.genome(Sex::Male, Ploidy::Haploid)?;
        assert!(genome.sequences().iter().all(|s| s.ploidy == Ploidy::Haploid && s.linear));
        assert_eq!(genome.sex(), Sex::Male);
        Ok(())
    }
}
