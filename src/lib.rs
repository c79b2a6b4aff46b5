use std::path::Path;

use anyhow::Result;
use located_error::prelude::*;
use log::info;

use parser::{Cli, Common, PloidyArg, SexArg, Commands::*};
use genome::{FastaReference, Ploidy, ReferenceSource, Sex};
use variant_sims::{
    child::Trio,
    population::write_population_vcf,
    ChildSampleSimulator, CrossoverSelector, DeNovoSampleSimulator, FixedStepVariantSource, GenomePriorParams, Mutator,
    PopulationPriors, PopulationVariantGenerator, PriorVariantSource, SampleReplayer, SampleSimulator,
    TableAlleleFrequencyChooser,
};

fn sex(arg: SexArg) -> Sex {
    match arg {
        SexArg::Male   => Sex::Male,
        SexArg::Female => Sex::Female,
        SexArg::Either => Sex::Either,
    }
}

fn ploidy(arg: PloidyArg) -> Ploidy {
    match arg {
        PloidyArg::Haploid => Ploidy::Haploid,
        PloidyArg::Diploid => Ploidy::Diploid,
    }
}

fn load_reference(common: &Common) -> Result<FastaReference> {
    info!("Loading reference genome...");
    FastaReference::from_fasta(&common.reference)
        .with_loc(|| format!("While loading reference {}", common.reference.display()))
}

/// Human-like priors, unless a `.yaml` file is provided.
fn load_priors(path: Option<&Path>) -> Result<PopulationPriors> {
    let params = match path {
        Some(path) => GenomePriorParams::from_yaml(path)?,
        None       => GenomePriorParams::default(),
    };
    PopulationPriors::new(&params)
}

/// Write the haplotypes of `sample` within `output_dir`, if any was requested.
fn replay_genome<R: ReferenceSource>(reference: &R, common: &Common, vcf: &Path, sample: &str, output_dir: Option<&Path>) -> Result<()> {
    if let Some(dir) = output_dir {
        common.can_write_file(&dir.join(format!("{sample}.{}", variant_sims::replay::FASTA_EXTENSION)))?;
        SampleReplayer::new(reference)
            .with_default_ploidy(ploidy(common.ploidy))
            .replay_sample(vcf, dir, sample)?;
    }
    Ok(())
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.commands {
        PopSim {common, pop} => {
            common.can_write_file(&pop.output)?;
            let reference = load_reference(&common)?;
            let priors = load_priors(pop.priors.as_deref())?;
            let chooser = match &pop.allele_frequency_table {
                Some(table) => TableAlleleFrequencyChooser::from_file(table, pop.bias)?,
                None        => TableAlleleFrequencyChooser::builtin(pop.bias)?,
            };
            let source = PriorVariantSource::new(&reference, priors, chooser)?;
            let target = match (pop.num_variants, pop.rate) {
                (Some(count), _)  => count,
                (None, Some(rate)) => (reference.total_length()? as f64 * rate).floor(),
                (None, None)       => source.default_target(),
            };

            info!("Generating population variants (expected count: {target}, seed: {})", common.seed);
            let mut rng = fastrand::Rng::with_seed(common.seed);
            let variants = PopulationVariantGenerator::with_target(source, target)?
                .generate_population(&mut rng)?;
            info!("Generated {} population variants", variants.len());
            write_population_vcf(&pop.output, &variants, &reference, common.seed)?;
        },

        FixedSim {common, fixed} => {
            common.can_write_file(&fixed.output)?;
            let reference = load_reference(&common)?;
            let mutator = fixed.spec.parse::<Mutator>()?;
            let source = FixedStepVariantSource::new(&reference, mutator, fixed.distance, fixed.allele_frequency)?;

            info!("Generating fixed-step population variants every {} bp (seed: {})", fixed.distance, common.seed);
            let mut rng = fastrand::Rng::with_seed(common.seed);
            let variants = PopulationVariantGenerator::new(source).generate_population(&mut rng)?;
            info!("Generated {} population variants", variants.len());
            write_population_vcf(&fixed.output, &variants, &reference, common.seed)?;
        },

        SampleSim {common, sample} => {
            common.can_write_file(&sample.output)?;
            let reference = load_reference(&common)?;
            SampleSimulator::new(&reference, common.seed)
                .with_default_ploidy(ploidy(common.ploidy))
                .allow_missing_af(sample.allow_missing_af)
                .mutate_individual(&sample.input, &sample.output, &sample.sample, sex(sample.sex))?;
            replay_genome(&reference, &common, &sample.output, &sample.sample, sample.output_genome.as_deref())?;
        },

        ChildSim {common, child} => {
            common.can_write_file(&child.output)?;
            let reference = load_reference(&common)?;
            let trios: Vec<Trio> = child.children()?.into_iter()
                .map(|(name, child_sex)| Trio::new(&child.father, &child.mother, &name, sex(child_sex)))
                .collect();
            let crossovers = CrossoverSelector::new(child.genetic_maps.as_deref(), child.extra_crossovers, child.interpolate)?;
            ChildSampleSimulator::new(&reference, common.seed, crossovers)
                .with_default_ploidy(ploidy(common.ploidy))
                .mutate_individual(&child.input, &child.output, &trios)?;
            for trio in &trios {
                replay_genome(&reference, &common, &child.output, &trio.child, child.output_genome.as_deref())?;
            }
        },

        DenovoSim {common, denovo} => {
            common.can_write_file(&denovo.output)?;
            let reference = load_reference(&common)?;
            let priors = load_priors(denovo.priors.as_deref())?;
            DeNovoSampleSimulator::new(&reference, priors, common.seed, denovo.expected_mutations)
                .with_default_ploidy(ploidy(common.ploidy))
                .mutate_individual(&denovo.input, &denovo.output, &denovo.original, &denovo.sample)?;
            replay_genome(&reference, &common, &denovo.output, &denovo.sample, denovo.output_genome.as_deref())?;
        },

        SampleReplay {common, replay} => {
            let reference = load_reference(&common)?;
            replay_genome(&reference, &common, &replay.input, &replay.sample, Some(&replay.output_dir))?;
        },

        FromYaml {yaml} => {
            let cli = Cli::deserialize(&yaml)?;
            info!("Re-running {} from {}", cli.commands.name(), yaml.display());
            self::run(cli)?;
        },
    };
    Ok(())
}
