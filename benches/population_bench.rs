use criterion::{black_box, criterion_group, criterion_main, Criterion};

use genome::FastaReference;
use variant_sims::{
    FixedAlleleFrequency, GenomePriorParams, PopulationPriors, PopulationVariantGenerator, PriorVariantSource,
    TableAlleleFrequencyChooser,
};

/// Random 100kb, two-contig reference.
fn reference() -> FastaReference {
    let mut rng = fastrand::Rng::with_seed(0);
    let mut contig = |len: usize| (0..len).map(|_| b"ACGT"[rng.usize(0..4)]).collect::<Vec<u8>>();
    let (chr1, chr2) = (contig(60_000), contig(40_000));
    FastaReference::from_contigs([("chr1", chr1), ("chr2", chr2)]).expect("valid reference")
}

fn bench_population(c: &mut Criterion) {
    let reference = reference();
    let priors = PopulationPriors::new(&GenomePriorParams::default()).expect("valid priors");

    let mut group = c.benchmark_group("population");
    group.sample_size(50);

    group.bench_function("fixed-frequency", |b| b.iter(|| {
        let source = PriorVariantSource::new(&reference, priors.clone(), FixedAlleleFrequency::new(0.5).expect("valid frequency"))
            .expect("valid source");
        let mut rng = fastrand::Rng::with_seed(black_box(42));
        PopulationVariantGenerator::with_target(source, black_box(50.0)).expect("valid target")
            .generate_population(&mut rng)
    }));

    group.bench_function("frequency-table", |b| b.iter(|| {
        let chooser = TableAlleleFrequencyChooser::builtin(black_box(0.0)).expect("valid table");
        let source = PriorVariantSource::new(&reference, priors.clone(), chooser).expect("valid source");
        let target = source.default_target();
        let mut rng = fastrand::Rng::with_seed(black_box(42));
        PopulationVariantGenerator::with_target(source, target).expect("valid target")
            .generate_population(&mut rng)
    }));
    group.finish();
}

criterion_group!(benches, bench_population);
criterion_main!(benches);
