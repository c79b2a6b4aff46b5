use std::{fmt::{self, Display, Formatter}, fs, path::Path};

use located_error::{prelude::*, loc};
use log::debug;

use crate::{Ploidy, Sex};
use super::ReferenceError;

/// File name of the reference specification, expected alongside the reference sequences.
pub const REFERENCE_SPEC_FILE: &str = "reference.txt";

const VERSION_LINE: &str = "version 1";

/// Ploidy and topology of a single sequence, as declared for a given sex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceSpec {
    pub sex               : Sex,
    pub name              : String,
    pub ploidy            : Ploidy,
    pub linear            : bool,
    pub haploid_complement: Option<String>,
}

/// Default ploidy and topology for every sequence lacking a dedicated line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultSpec {
    pub sex   : Sex,
    pub ploidy: Ploidy,
    pub linear: bool,
}

/// Resolved description of one sequence for one sex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpec {
    pub ploidy            : Ploidy,
    pub linear            : bool,
    pub haploid_complement: Option<String>,
}

/// Textual, per-sex description of the reference sequences.
///
/// ```text
/// version 1
/// either  def  diploid  linear
/// male    seq  chrX     haploid  linear  chrY
/// male    seq  chrY     haploid  linear  chrX
/// female  seq  chrY     none     linear
/// either  seq  chrM     polyploid  circular
/// ```
/// Fields are tab-separated. `dup` lines (pseudo-autosomal regions) are accepted and ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSpec {
    pub defaults : Vec<DefaultSpec>,
    pub sequences: Vec<SequenceSpec>,
}

fn parse_sex(line: usize, field: &str) -> Result<Sex, ReferenceError> {
    match field {
        "male"   => Ok(Sex::Male),
        "female" => Ok(Sex::Female),
        "either" => Ok(Sex::Either),
        other    => Err(ReferenceError::InvalidSex(line, other.to_string())),
    }
}

fn parse_shape(line: usize, field: &str) -> Result<bool, ReferenceError> {
    match field {
        "linear"   => Ok(true),
        "circular" => Ok(false),
        other      => Err(ReferenceError::InvalidShape(line, other.to_string())),
    }
}

fn shape(linear: bool) -> &'static str {
    if linear { "linear" } else { "circular" }
}

impl ReferenceSpec {
    /// Parse a reference specification from its textual form.
    pub fn parse(text: &str) -> Result<Self> {
        use ReferenceError::{InvalidSpecLine, MissingVersion};
        let mut spec = Self::default();
        let mut lines = text.lines().enumerate()
            .map(|(i, line)| (i + 1, line.trim_end()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        match lines.next() {
            Some((_, line)) if line.split_whitespace().collect::<Vec<_>>() == ["version", "1"] => {},
            _ => return loc!(MissingVersion),
        }

        for (i, line) in lines {
            let fields: Vec<&str> = line.split('\t').collect();
            let sex = parse_sex(i, fields[0]).loc("While parsing reference specification")?;
            match fields.get(1).copied() {
                Some("def") if fields.len() == 4 => {
                    let ploidy = fields[2].parse::<Ploidy>().with_loc(|| InvalidSpecLine(i))?;
                    let linear = parse_shape(i, fields[3])?;
                    spec.defaults.push(DefaultSpec{sex, ploidy, linear});
                },
                Some("seq") if fields.len() == 5 || fields.len() == 6 => {
                    let ploidy = fields[3].parse::<Ploidy>().with_loc(|| InvalidSpecLine(i))?;
                    let linear = parse_shape(i, fields[4])?;
                    let haploid_complement = fields.get(5).map(ToString::to_string);
                    spec.sequences.push(SequenceSpec{sex, name: fields[2].to_string(), ploidy, linear, haploid_complement});
                },
                Some("dup") => debug!("Ignoring duplicated region declaration @ line {i}: {line}"),
                _ => return loc!(InvalidSpecLine(i)),
            }
        }
        Ok(spec)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_loc(|| ReferenceError::Open)?;
        Self::parse(&text).with_loc(|| format!("While parsing {}", path.display()))
    }

    /// Resolve the ploidy of a sequence for a given sex.
    ///
    /// # Behavior
    /// - sequence lines take precedence over default lines.
    /// - within each kind, a line declared for `sex` takes precedence over an `either` line.
    /// - `fallback` applies when no line matches.
    #[must_use]
    pub fn resolve(&self, sex: Sex, name: &str, fallback: Ploidy) -> ResolvedSpec {
        let rank = |line_sex: Sex| match line_sex {
            s if s == sex => Some(0),
            Sex::Either   => Some(1),
            _             => None,
        };

        let sequence = self.sequences.iter()
            .filter(|seq| seq.name == name)
            .filter_map(|seq| rank(seq.sex).map(|r| (r, seq)))
            .min_by_key(|(r, _)| *r);
        if let Some((_, seq)) = sequence {
            return ResolvedSpec{ploidy: seq.ploidy, linear: seq.linear, haploid_complement: seq.haploid_complement.clone()}
        }

        let default = self.defaults.iter()
            .filter_map(|def| rank(def.sex).map(|r| (r, def)))
            .min_by_key(|(r, _)| *r);
        match default {
            Some((_, def)) => ResolvedSpec{ploidy: def.ploidy, linear: def.linear, haploid_complement: None},
            None           => ResolvedSpec{ploidy: fallback, linear: true, haploid_complement: None},
        }
    }
}

impl Display for ReferenceSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{VERSION_LINE}")?;
        for def in &self.defaults {
            writeln!(f, "{}\tdef\t{}\t{}", def.sex, def.ploidy, shape(def.linear))?;
        }
        for seq in &self.sequences {
            write!(f, "{}\tseq\t{}\t{}\t{}", seq.sex, seq.name, seq.ploidy, shape(seq.linear))?;
            if let Some(complement) = &seq.haploid_complement {
                write!(f, "\t{complement}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HUMAN: &str = "version 1\n\
        # comment\n\
        either\tdef\tdiploid\tlinear\n\
        male\tseq\tchrX\thaploid\tlinear\tchrY\n\
        male\tseq\tchrY\thaploid\tlinear\tchrX\n\
        female\tseq\tchrY\tnone\tlinear\n\
        either\tseq\tchrM\tpolyploid\tcircular\n\
        male\tdup\tchrX:60001-2699520\tchrY:10001-2649520\n";

    #[test]
    fn resolve_by_sex() -> Result<()> {
        let spec = ReferenceSpec::parse(HUMAN)?;
        assert_eq!(spec.resolve(Sex::Male, "chr1", Ploidy::Haploid).ploidy, Ploidy::Diploid);
        assert_eq!(spec.resolve(Sex::Male, "chrX", Ploidy::Diploid).ploidy, Ploidy::Haploid);
        assert_eq!(spec.resolve(Sex::Male, "chrX", Ploidy::Diploid).haploid_complement.as_deref(), Some("chrY"));
        assert_eq!(spec.resolve(Sex::Female, "chrX", Ploidy::Haploid).ploidy, Ploidy::Diploid);
        assert_eq!(spec.resolve(Sex::Female, "chrY", Ploidy::Diploid).ploidy, Ploidy::None);
        let mito = spec.resolve(Sex::Female, "chrM", Ploidy::Diploid);
        assert_eq!(mito.ploidy, Ploidy::Polyploid);
        assert!(!mito.linear);
        Ok(())
    }

    #[test]
    fn fallback_without_defaults() -> Result<()> {
        let spec = ReferenceSpec::parse("version 1\n")?;
        assert_eq!(spec.resolve(Sex::Either, "contig", Ploidy::Haploid).ploidy, Ploidy::Haploid);
        Ok(())
    }

    #[test]
    fn display_roundtrip() -> Result<()> {
        let spec = ReferenceSpec::parse(HUMAN)?;
        let reparsed = ReferenceSpec::parse(&spec.to_string())?;
        assert_eq!(spec, reparsed);
        assert!(spec.to_string().starts_with("version 1\neither\tdef\tdiploid\tlinear\n"));
        Ok(())
    }

    #[test]
    fn invalid_specs() {
        assert!(ReferenceSpec::parse("either\tdef\tdiploid\tlinear\n").is_err());
        assert!(ReferenceSpec::parse("version 1\nboth\tdef\tdiploid\tlinear\n").is_err());
        assert!(ReferenceSpec::parse("version 1\neither\tdef\tdiploid\tsquare\n").is_err());
        assert!(ReferenceSpec::parse("version 1\neither\tseq\tchr1\n").is_err());
    }
}
