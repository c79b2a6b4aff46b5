use std::{
    fs::File,
    path::{Path, PathBuf},
    fmt::{self, Display, Formatter}, ffi::OsStr
};

use located_error::prelude::*;

use clap::{Parser, Subcommand, ArgEnum};
use serde::{Serialize, Deserialize};
use log::debug;
use anyhow::{anyhow, Result};

mod error;
pub use error::ParserError;

#[derive(Parser, Debug, Serialize, Deserialize)]
#[clap(name="varsim", author, version, about, long_about = None)]
#[clap(propagate_version = true)]
/// varsim: simulate population variants, pedigrees and de novo mutations.
pub struct Cli {
    ///Set the verbosity level (-v -vv -vvv)
    ///
    /// Set the verbosity level of this program. Multiple levels allowed {n}
    ///
    /// -v: Info  |  -vv: Debug  | -vvv: Trace {n}
    ///
    /// Note that the program will still output warnings by default, even when this flag is off.
    /// Use The --quiet/-q to disable them
    #[clap(short='v', long, parse(from_occurrences), global=true)]
    pub verbose: u8,

    /// Disable warnings.
    ///
    /// By default, warnings are emitted and redirected to the console, even when verbose mode is off.
    /// Use this argument to disable this. Only errors will be displayed.
    #[clap(short='q', long, global=true)]
    pub quiet: bool,

    #[clap(subcommand)]
    pub commands: Commands,
}

impl Cli {
    /// Serialize command line arguments within a `.yaml` file.
    ///
    /// # Behavior
    /// - File naming follows the convention '{current time}-{module name}.yaml'. current time follows the format
    ///   `YYYY`-`MM`-`DD`T`hhmmss`
    /// - File is written next to the main output of the invoked command.
    /// - Returns the path of the written file, or `None` for `from-yaml`, which never gets serialized.
    ///
    /// # Errors
    /// - if `serde_yaml` fails to parse `Self` to a string.
    /// - if the output directory is not writable.
    pub fn serialize(&self) -> Result<Option<PathBuf>> {
        let Some(output_dir) = self.commands.output_dir() else {
            return Ok(None)
        };

        // Parse arguments to yaml and print to console.
        let serialized = serde_yaml::to_string(&self).with_loc(|| ParserError::Serialize)?;
        debug!("\n---- Command line args ----\n{}\n---", serialized);

        let current_time = chrono::offset::Local::now().format("%Y-%m-%dT%H%M%S").to_string();
        let output_file = output_dir.join(format!("{current_time}-{}.yaml", self.commands.name()));
        std::fs::write(&output_file, serialized)
            .with_loc(|| ParserError::WriteYaml(output_file.display().to_string()))?;
        Ok(Some(output_file))
    }

    /// Deserialize a `.yaml` file into Command line arguments.
    ///
    /// # Errors
    /// - if the provided `.yaml` does not exist or lacks read permissions.
    /// - if `serde_yaml` fails to parse the provided file to `Self`.
    pub fn deserialize(yaml: impl AsRef<Path>) -> Result<Self> {
        let yaml = yaml.as_ref();
        let loc_msg = || ParserError::Deserialize(yaml.display().to_string());
        let file = File::open(yaml).with_loc(loc_msg)?;
        serde_yaml::from_reader(file).with_loc(loc_msg)
    }
}

#[derive(Subcommand, Debug, Serialize, Deserialize)]
pub enum Commands {
    /// Generate population variants from genome-wide mutation priors.
    PopSim {
        #[clap(flatten)]
        common: Common,
        #[clap(flatten)]
        pop: PopSim,
    },

    /// Generate population variants at a fixed distance from one another, following a mutation specification.
    FixedSim {
        #[clap(flatten)]
        common: Common,
        #[clap(flatten)]
        fixed: FixedSim,
    },

    /// Draw the genotype of a new founder sample from population allele frequencies.
    SampleSim {
        #[clap(flatten)]
        common: Common,
        #[clap(flatten)]
        sample: SampleSim,
    },

    /// Simulate the genotype of one or more children from two existing parent samples.
    ChildSim {
        #[clap(flatten)]
        common: Common,
        #[clap(flatten)]
        child: ChildSim,
    },

    /// Inject de novo mutations into a sample.
    DenovoSim {
        #[clap(flatten)]
        common: Common,
        #[clap(flatten)]
        denovo: DenovoSim,
    },

    /// Reconstruct the haplotype sequences of a sample from its genotypes.
    SampleReplay {
        #[clap(flatten)]
        common: Common,
        #[clap(flatten)]
        replay: SampleReplay,
    },

    /// Run varsim using a previously generated .yaml configuration file.
    ///
    /// This allows users to easily re-apply a varsim command using the exact same parameters,
    /// seed included.
    FromYaml {
        yaml: PathBuf,
    },
}

impl Commands {
    /// Kebab-case name of the subcommand.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PopSim{..}       => "pop-sim",
            Self::FixedSim{..}     => "fixed-sim",
            Self::SampleSim{..}    => "sample-sim",
            Self::ChildSim{..}     => "child-sim",
            Self::DenovoSim{..}    => "denovo-sim",
            Self::SampleReplay{..} => "sample-replay",
            Self::FromYaml{..}     => "from-yaml",
        }
    }

    /// Directory receiving the main output of the subcommand.
    #[must_use]
    pub fn output_dir(&self) -> Option<PathBuf> {
        let parent = |path: &Path| match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        match self {
            Self::PopSim{pop, ..}          => Some(parent(&pop.output)),
            Self::FixedSim{fixed, ..}      => Some(parent(&fixed.output)),
            Self::SampleSim{sample, ..}    => Some(parent(&sample.output)),
            Self::ChildSim{child, ..}      => Some(parent(&child.output)),
            Self::DenovoSim{denovo, ..}    => Some(parent(&denovo.output)),
            Self::SampleReplay{replay, ..} => Some(replay.output_dir.clone()),
            Self::FromYaml{..}             => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ArgEnum, Serialize, Deserialize)]
pub enum SexArg {
    Male,
    Female,
    Either,
}

impl Default for SexArg {
    fn default() -> Self {Self::Either}
}

impl Display for SexArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Male   => write!(f, "male"),
            Self::Female => write!(f, "female"),
            Self::Either => write!(f, "either"),
        }
    }
}

/// Ploidy of reference sequences lacking an explicit declaration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ArgEnum, Serialize, Deserialize)]
pub enum PloidyArg {
    Haploid,
    Diploid,
}

impl Default for PloidyArg {
    fn default() -> Self {Self::Diploid}
}

#[derive(Parser, Debug, Default, Serialize, Deserialize)]
pub struct Common {
    /// Reference genome, in FASTA format.
    ///
    /// The ploidy of each sequence is read from a 'reference.txt' file, located within the same directory.
    /// Every sequence defaults to --ploidy when this file is missing.
    #[clap(short='r', long, parse(try_from_os_str=valid_input_file))]
    pub reference: PathBuf,

    /// Default ploidy of sequences absent from the reference specification.
    #[clap(long, arg_enum, default_value("diploid"))]
    pub ploidy: PloidyArg,

    /// Provide the RNG with a set seed.
    #[clap(long, required(false), default_value_t=fastrand::u64(u64::MIN..=u64::MAX))]
    pub seed: u64,

    /// Overwrite existing output files.
    #[clap(short='w', long)]
    pub overwrite: bool,
}

impl Common {
    /// Check if a given file already exists ; raise an error if such is the case, and the user did not explicitly
    /// allow file overwriting.
    ///
    /// # Errors
    /// - If the provided `path` already exists and the user did not specifically allow for file
    ///   overwrite using the `--overwrite` argument
    pub fn can_write_file(&self, path: &Path) -> Result<bool> {
        if ! self.overwrite && path.exists() {
            return Err(ParserError::CannotOverwrite(path.display().to_string()))
                .loc( "While parsing command line arguments" )
        }
        Ok(true)
    }
}

#[derive(Parser, Debug, Default, Serialize, Deserialize)]
pub struct PopSim {
    /// Output VCF file. Compressed with BGZF if the file name ends with '.gz'
    #[clap(short='o', long)]
    pub output: PathBuf,

    /// Genome-wide mutation priors, in .yaml format.
    ///
    /// Fields missing from the file keep their default, human-like value.
    #[clap(short='p', long, parse(try_from_os_str=valid_input_file))]
    pub priors: Option<PathBuf>,

    /// Table of alternate allele frequencies, with 'frequency count' lines.
    ///
    /// A built-in table is used when unspecified.
    #[clap(long, parse(try_from_os_str=valid_input_file))]
    pub allele_frequency_table: Option<PathBuf>,

    /// Bias the drawn allele frequencies towards rare (-1.0) or common (1.0) alleles.
    #[clap(long, default_value("0.0"), parse(try_from_str=parse_bias), allow_hyphen_values(true))]
    pub bias: f64,

    /// Expected number of variants per base pair.
    ///
    /// Defaults to the overall mutation rate of the priors.
    #[clap(long, conflicts_with("num-variants"))]
    pub rate: Option<f64>,

    /// Expected number of variants.
    #[clap(short='n', long)]
    pub num_variants: Option<f64>,
}

#[derive(Parser, Debug, Default, Serialize, Deserialize)]
pub struct FixedSim {
    /// Output VCF file. Compressed with BGZF if the file name ends with '.gz'
    #[clap(short='o', long)]
    pub output: PathBuf,

    /// Distance between consecutive variants, in base pairs.
    #[clap(short='d', long)]
    pub distance: usize,

    /// Mutation specification.
    ///
    /// Operations:{n}
    ///   X: substitution   | Y: substitution, differing from the other haplotype{n}
    ///   I: insertion      | J: insertion, differing from the other haplotype{n}
    ///   D: deletion       | = or E: identity{n}
    ///
    /// Operations may be preceded by a repeat count (e.g. '3X'). Separate both haplotypes of a
    /// heterozygous mutation with '_' (e.g. 'X_=')
    #[clap(long)]
    pub spec: String,

    /// Allele frequency of every generated variant.
    #[clap(long, default_value("0.5"), parse(try_from_str=parse_frequency))]
    pub allele_frequency: f64,
}

#[derive(Parser, Debug, Default, Serialize, Deserialize)]
pub struct SampleSim {
    /// Input population VCF file.
    #[clap(short='i', long, parse(try_from_os_str=valid_input_file))]
    pub input: PathBuf,

    /// Output VCF file. Compressed with BGZF if the file name ends with '.gz'
    #[clap(short='o', long)]
    pub output: PathBuf,

    /// Name of the new sample.
    #[clap(short='s', long)]
    pub sample: String,

    /// Sex of the new sample.
    #[clap(long, arg_enum, default_value("either"))]
    pub sex: SexArg,

    /// Draw alleles uniformly at records lacking an allele frequency annotation.
    ///
    /// By default, such records always yield the reference allele.
    #[clap(long)]
    pub allow_missing_af: bool,

    /// Also write the haplotype sequences of the new sample within this directory.
    #[clap(long, parse(try_from_os_str=valid_output_dir))]
    pub output_genome: Option<PathBuf>,
}

#[derive(Parser, Debug, Default, Serialize, Deserialize)]
pub struct ChildSim {
    /// Input VCF file, containing both parents.
    #[clap(short='i', long, parse(try_from_os_str=valid_input_file))]
    pub input: PathBuf,

    /// Output VCF file. Compressed with BGZF if the file name ends with '.gz'
    #[clap(short='o', long)]
    pub output: PathBuf,

    /// Name of the existing sample to use as the father.
    #[clap(long)]
    pub father: String,

    /// Name of the existing sample to use as the mother.
    #[clap(long)]
    pub mother: String,

    /// Name(s) of the new child sample(s).
    #[clap(short='s', long, multiple_values(true), required(true))]
    pub child: Vec<String>,

    /// Sex of each child, in the order of --child.
    ///
    /// Children lacking a value are of unspecified sex (either).
    #[clap(long, arg_enum, multiple_values(true))]
    pub sex: Vec<SexArg>,

    /// Likelihood of extra crossovers per chromosome.
    #[clap(long, default_value("0.01"), parse(try_from_str=parse_positive))]
    pub extra_crossovers: f64,

    /// Directory of per-chromosome genetic maps.
    ///
    /// Crossover positions are drawn uniformly along chromosomes lacking a map.
    #[clap(short='G', long, parse(try_from_os_str=valid_input_directory))]
    pub genetic_maps: Option<PathBuf>,

    /// Interpolate genetic map probabilities between consecutive map positions.
    #[clap(long)]
    pub interpolate: bool,

    /// Also write the haplotype sequences of every child within this directory.
    #[clap(long, parse(try_from_os_str=valid_output_dir))]
    pub output_genome: Option<PathBuf>,
}

impl ChildSim {
    /// Pair each child with its sex.
    ///
    /// # Errors
    /// - if more sexes than children were provided.
    pub fn children(&self) -> Result<Vec<(String, SexArg)>> {
        if self.sex.len() > self.child.len() {
            return Err(ParserError::ChildSexCount{children: self.child.len(), sexes: self.sex.len()})
                .loc("While parsing command line arguments")
        }
        Ok(self.child.iter().enumerate()
            .map(|(i, name)| (name.clone(), self.sex.get(i).copied().unwrap_or_default()))
            .collect())
    }
}

#[derive(Parser, Debug, Default, Serialize, Deserialize)]
pub struct DenovoSim {
    /// Input VCF file.
    #[clap(short='i', long, parse(try_from_os_str=valid_input_file))]
    pub input: PathBuf,

    /// Output VCF file. Compressed with BGZF if the file name ends with '.gz'
    #[clap(short='o', long)]
    pub output: PathBuf,

    /// Name of the existing sample receiving de novo mutations.
    #[clap(long)]
    pub original: String,

    /// Name of the derived sample. Mutations are applied in place when equal to --original.
    #[clap(short='s', long)]
    pub sample: String,

    /// Expected number of mutations per genome.
    #[clap(long, default_value("70"), parse(try_from_str=parse_positive))]
    pub expected_mutations: f64,

    /// Genome-wide mutation priors, in .yaml format.
    #[clap(short='p', long, parse(try_from_os_str=valid_input_file))]
    pub priors: Option<PathBuf>,

    /// Also write the haplotype sequences of the derived sample within this directory.
    #[clap(long, parse(try_from_os_str=valid_output_dir))]
    pub output_genome: Option<PathBuf>,
}

#[derive(Parser, Debug, Default, Serialize, Deserialize)]
pub struct SampleReplay {
    /// Input VCF file.
    #[clap(short='i', long, parse(try_from_os_str=valid_input_file))]
    pub input: PathBuf,

    /// Name of the sample to replay.
    #[clap(short='s', long)]
    pub sample: String,

    /// Output directory. Receives '<sample>.fa' and its 'reference.txt' specification.
    #[clap(short='o', long, parse(try_from_os_str=valid_output_dir))]
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub enum FileEntity {File, Directory}

impl Display for FileEntity {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::File      => write!(f, "File"),
            Self::Directory => write!(f, "Directory"),
        }
    }
}

impl FileEntity {
    fn validate(self, path: &Path) -> Result<(), ParserError> {
        use ParserError::InvalidFileEntity;
        let valid = match self {
            Self::File      => path.is_file(),
            Self::Directory => path.is_dir()
        };

        if valid {
            Ok(())
        } else {
            Err(InvalidFileEntity(self, path.display().to_string()))
        }
    }
}

fn assert_filesystem_entity_is_valid(s: &OsStr, entity: FileEntity) -> Result<()> {
    use ParserError::MissingFileEntity;
    let path = Path::new(s);
    if ! path.exists() {
        return Err(MissingFileEntity(entity, path.display().to_string()))
            .loc("While parsing arguments.")
    }

    entity.validate(path).loc("While parsing arguments.")
}

fn valid_input_directory(s: &OsStr) -> Result<PathBuf> {
    assert_filesystem_entity_is_valid(s, FileEntity::Directory)
        .loc("While checking for directory validity")?;
    Ok(PathBuf::from(s))
}

fn valid_input_file(s: &OsStr) -> Result<PathBuf> {
    assert_filesystem_entity_is_valid(s, FileEntity::File)
        .loc("While checking for file validity")?;
    Ok(PathBuf::from(s))
}

fn valid_output_dir(s: &OsStr) -> Result<PathBuf> {
    if ! Path::new(s).exists() {
        std::fs::create_dir_all(s)?;
    }
    assert_filesystem_entity_is_valid(s, FileEntity::Directory)
        .loc("While checking for directory validity")?;
    Ok(PathBuf::from(s))
}

fn parse_within(s: &str, min: f64, max: f64) -> Result<f64> {
    let value = s.parse::<f64>().with_loc(|| format!("While parsing {s}"))?;
    match (min..=max).contains(&value) {
        true  => Ok(value),
        false => Err(anyhow!(ParserError::ParseRange(min, max))).with_loc(|| format!("While parsing {s}"))
    }
}

fn parse_bias(s: &str) -> Result<f64> {
    parse_within(s, -1.0, 1.0)
}

fn parse_frequency(s: &str) -> Result<f64> {
    parse_within(s, 0.0, 1.0)
}

fn parse_positive(s: &str) -> Result<f64> {
    parse_within(s, 0.0, f64::MAX)
}
