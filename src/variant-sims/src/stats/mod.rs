use std::fmt::{self, Display, Formatter};

use vcf_io::{AlleleKind, Genotype, VcfRecord};

/// Classification of a non-reference allele against its reference allele.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlleleClass {
    Snp,
    Mnp,
    Insertion,
    Deletion,
    Complex,
    Symbolic,
}

impl AlleleClass {
    #[must_use]
    pub fn of(ref_allele: &str, alt: &str) -> Self {
        if AlleleKind::of(alt) != AlleleKind::Concrete {
            return Self::Symbolic
        }
        match (ref_allele.len(), alt.len()) {
            (1, 1)                                         => Self::Snp,
            (r, a) if r == a                               => Self::Mnp,
            (r, a) if r < a && alt.starts_with(ref_allele) => Self::Insertion,
            (r, a) if r > a && ref_allele.starts_with(alt) => Self::Deletion,
            _                                              => Self::Complex,
        }
    }
}

/// Per-sample tally of simulated genotypes.
///
/// Allele classes are counted once per distinct non-reference allele carried by a genotype.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantStatistics {
    pub sample      : String,
    pub records     : usize,
    pub missing     : usize,
    pub reference   : usize,
    pub snps        : usize,
    pub mnps        : usize,
    pub insertions  : usize,
    pub deletions   : usize,
    pub complex     : usize,
    pub symbolic    : usize,
    pub hemizygous  : usize,
    pub homozygous  : usize,
    pub heterozygous: usize,
}

impl VariantStatistics {
    #[must_use]
    pub fn new(sample: &str) -> Self {
        Self{sample: sample.to_string(), ..Default::default()}
    }

    /// Account for the genotype of this sample at `record`.
    pub fn tally(&mut self, record: &VcfRecord, genotype: &Genotype) {
        self.records += 1;
        if genotype.is_missing() {
            self.missing += 1;
            return
        }
        let called: Vec<usize> = genotype.alleles().iter().flatten().copied().collect();
        if called.iter().all(|allele| *allele == 0) {
            self.reference += 1;
            return
        }

        match called.as_slice() {
            [_]                                                   => self.hemizygous += 1,
            [first, rest @ ..] if rest.iter().all(|a| a == first) => self.homozygous += 1,
            _                                                     => self.heterozygous += 1,
        }

        let mut alts: Vec<usize> = called.into_iter().filter(|allele| *allele != 0).collect();
        alts.sort_unstable();
        alts.dedup();
        for alt in alts.into_iter().filter_map(|idx| record.allele(idx)) {
            let counter = match AlleleClass::of(record.ref_allele(), alt) {
                AlleleClass::Snp       => &mut self.snps,
                AlleleClass::Mnp       => &mut self.mnps,
                AlleleClass::Insertion => &mut self.insertions,
                AlleleClass::Deletion  => &mut self.deletions,
                AlleleClass::Complex   => &mut self.complex,
                AlleleClass::Symbolic  => &mut self.symbolic,
            };
            *counter += 1;
        }
    }

    /// Number of records where the sample carries at least one alternate allele.
    #[must_use]
    pub fn variant_sites(&self) -> usize {
        self.hemizygous + self.homozygous + self.heterozygous
    }
}

impl Display for VariantStatistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Sample {}: {} records, {} variant sites ({} missing, {} reference). \
            SNP: {}, MNP: {}, insertion: {}, deletion: {}, complex: {}, symbolic: {}. \
            Hemizygous: {}, homozygous: {}, heterozygous: {}",
            self.sample, self.records, self.variant_sites(), self.missing, self.reference,
            self.snps, self.mnps, self.insertions, self.deletions, self.complex, self.symbolic,
            self.hemizygous, self.homozygous, self.heterozygous,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ref_allele: &str, alts: &[&str]) -> VcfRecord {
        let mut record = VcfRecord::new("chr1", 0, ref_allele);
        for alt in alts {
            record.add_alt(*alt);
        }
        record
    }

    #[test]
    fn classify_alleles() {
        assert_eq!(AlleleClass::of("A", "T"), AlleleClass::Snp);
        assert_eq!(AlleleClass::of("AC", "TG"), AlleleClass::Mnp);
        assert_eq!(AlleleClass::of("A", "ACG"), AlleleClass::Insertion);
        assert_eq!(AlleleClass::of("ACG", "A"), AlleleClass::Deletion);
        assert_eq!(AlleleClass::of("ACG", "TT"), AlleleClass::Complex);
        assert_eq!(AlleleClass::of("A", "<DEL>"), AlleleClass::Symbolic);
        assert_eq!(AlleleClass::of("A", "*"), AlleleClass::Symbolic);
    }

    #[test]
    fn zygosity() {
        let mut stats = VariantStatistics::new("sm");
        let snp = record("A", &["T", "G"]);
        stats.tally(&snp, &Genotype::phased(&[0, 0]));
        stats.tally(&snp, &Genotype::phased(&[1, 1]));
        stats.tally(&snp, &Genotype::phased(&[1, 2]));
        stats.tally(&snp, &Genotype::phased(&[2]));
        stats.tally(&snp, &Genotype::missing());
        assert_eq!(stats.records, 5);
        assert_eq!(stats.reference, 1);
        assert_eq!(stats.missing, 1);
        assert_eq!((stats.hemizygous, stats.homozygous, stats.heterozygous), (1, 1, 1));
        assert_eq!(stats.snps, 4);
        assert_eq!(stats.variant_sites(), 3);
    }

    #[test]
    fn indels() {
        let mut stats = VariantStatistics::new("sm");
        stats.tally(&record("AC", &["A"]), &Genotype::phased(&[0, 1]));
        stats.tally(&record("A", &["AT"]), &Genotype::phased(&[1, 1]));
        assert_eq!((stats.deletions, stats.insertions), (1, 1));
        assert!(stats.to_string().starts_with("Sample sm: 2 records"));
    }
}
