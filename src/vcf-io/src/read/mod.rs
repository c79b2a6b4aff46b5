use std::{fs::File, io::{BufRead, BufReader, Read}, path::{Path, PathBuf}};

use gzp::{deflate::Bgzf, par::decompress::ParDecompressBuilder};
use located_error::{prelude::*, loc};
use log::debug;

use crate::{VcfError, VcfHeader, VcfRecord};

/// Single-threaded decompression: records must be read in order.
const DECOMPRESSION_THREADS: usize = 0;

/// Streaming reader over a `.vcf` or BGZF-compressed `.vcf.gz` file.
///
/// # Fields
/// - `source`: Boxed BufReader for the given `.vcf(.gz)` file.
/// - `header`: parsed header (meta lines + sample names).
/// - `line`  : 1-based index of the last line read.
pub struct VcfReader<'a> {
    source: Box<dyn BufRead + 'a>,
    header: VcfHeader,
    line  : usize,
}

impl<'a> VcfReader<'a> {
    /// Open a VCF file and parse its header.
    pub fn from_path(path: &Path) -> Result<VcfReader<'a>> {
        let loc_msg = || format!("While attempting to open {}", path.display());
        let source = Self::get_reader(path).with_loc(loc_msg)?;
        Self::new(source).with_loc(loc_msg)
    }

    /// Wrap an arbitrary buffered source, and parse its header.
    pub fn new(mut source: Box<dyn BufRead + 'a>) -> Result<VcfReader<'a>> {
        let mut lines = Vec::new();
        let mut line = 0;
        loop {
            let mut buf = String::new();
            line += 1;
            let read = source.read_line(&mut buf).with_loc(|| VcfError::ReadLine(line))?;
            if read == 0 {
                return loc!(VcfError::MissingHeader)
            }
            let is_column_line = buf.starts_with("#CHROM");
            lines.push(buf);
            if is_column_line {
                break
            }
        }
        let header = VcfHeader::from_lines(&lines)?;
        debug!("Found {} samples within VCF header", header.samples().len());
        Ok(Self{source, header, line})
    }

    fn get_reader(path: &Path) -> Result<Box<dyn BufRead>> {
        use VcfError::{InvalidFileExt, Open};
        let path_ext = path.extension().with_loc(|| InvalidFileExt)?;
        let vcf      = File::open(path).with_loc(|| Open)?;
        let source: Box<dyn Read> = match path_ext.to_str() {
            Some("vcf") => Box::new(vcf),
            Some("gz")  => Box::new(ParDecompressBuilder::<Bgzf>::new().maybe_num_threads(DECOMPRESSION_THREADS).maybe_par_from_reader(vcf)),
            _           => return loc!(InvalidFileExt)
        };
        Ok(Box::new(BufReader::new(source)))
    }

    #[must_use]
    pub fn header(&self) -> &VcfHeader {
        &self.header
    }

    /// Read the next record. `Ok(None)` at the end of the file.
    pub fn next_record(&mut self) -> Result<Option<VcfRecord>> {
        loop {
            let mut buf = String::new();
            self.line += 1;
            let line = self.line;
            if self.source.read_line(&mut buf).with_loc(|| VcfError::ReadLine(line))? == 0 {
                return Ok(None)
            }
            if buf.trim().is_empty() {
                continue
            }
            let record = buf.parse::<VcfRecord>().with_loc(|| format!("Invalid VCF record @ line {line}"))?;
            if record.num_samples() != self.header.samples().len() {
                let err = VcfError::SampleCount{expected: self.header.samples().len(), found: record.num_samples()};
                return Err(err).with_loc(|| format!("@ line {line}"))
            }
            return Ok(Some(record))
        }
    }

    /// Consume the reader, collecting every record.
    pub fn into_vcf(mut self) -> Result<Vcf> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(Vcf{header: self.header, records})
    }
}

impl<'a> Iterator for VcfReader<'a> {
    type Item = Result<VcfRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// A fully loaded VCF file.
#[derive(Debug, Clone, Default)]
pub struct Vcf {
    pub header : VcfHeader,
    pub records: Vec<VcfRecord>,
}

impl Vcf {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        VcfReader::from_path(path.as_ref())?.into_vcf()
    }

    /// Records located on a given sequence, in file order.
    pub fn records_on<'a>(&'a self, chrom: &'a str) -> impl Iterator<Item = &'a VcfRecord> + 'a {
        self.records.iter().filter(move |record| record.chrom() == chrom)
    }
}

/// List the `.vcf` / `.vcf.gz` files of a directory, sorted by name.
pub fn fetch_vcf_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir).loc("Failed to read directory contents")?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            name.ends_with(".vcf") || name.ends_with(".vcf.gz")
        })
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gzp::{par::compress::{ParCompress, ParCompressBuilder}, ZWriter};
    use std::io::Write;

    const FAKE_VCF: &str = "\
        ##fileformat=VCFv4.2\n\
        ##SAMPLE=<ID=HG00096,Sex=MALE>\n\
        #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tHG00096\tHG00097\n\
        12\t60020\t.\tT\tTA,TAC\t100\tPASS\tAF=0.0029,0.0086\tGT\t0|0\t0|2\n\
        12\t60026\t.\tA\tC\t100\tPASS\tAF=0.3\tGT\t0|1\t1|0\n\
        \n\
        X\t60057\t.\tC\tA\t100\tPASS\t.\tGT\t1\t0|1\n";

    #[test]
    fn read_plain_vcf() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let vcf_path = tmpdir.path().join("panel.vcf");
        let mut file = File::create(&vcf_path)?;
        write!(file, "{FAKE_VCF}")?;

        let vcf = Vcf::from_path(&vcf_path)?;
        assert_eq!(vcf.header.samples().len(), 2);
        assert_eq!(vcf.records.len(), 3);
        assert_eq!(vcf.records_on("12").count(), 2);
        assert_eq!(vcf.records_on("X").next().map(VcfRecord::start), Some(60056));
        Ok(())
    }

    #[test]
    fn read_bgzf_vcf() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let vcf_path = tmpdir.path().join("panel.vcf.gz");
        let file = File::create(&vcf_path)?;
        let mut parz: ParCompress<Bgzf> = ParCompressBuilder::new().from_writer(file);
        parz.write_all(FAKE_VCF.as_bytes()).expect("Failed to write VCF with ParCompressBuilder");
        parz.finish().expect("ParCompress should be able to flush its output.");

        let reader = VcfReader::from_path(&vcf_path)?;
        assert_eq!(reader.header().sample_sex("HG00096"), Some(genome::Sex::Male));
        assert_eq!(reader.collect::<Result<Vec<_>>>()?.len(), 3);
        Ok(())
    }

    #[test]
    fn invalid_inputs() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let txt = tmpdir.path().join("README.txt");
        std::fs::write(&txt, FAKE_VCF)?;
        assert!(VcfReader::from_path(&txt).is_err());

        let headerless = tmpdir.path().join("headerless.vcf");
        std::fs::write(&headerless, "##fileformat=VCFv4.2\n")?;
        assert!(VcfReader::from_path(&headerless).is_err());

        let ragged = tmpdir.path().join("ragged.vcf");
        std::fs::write(&ragged, FAKE_VCF.replace("\t0|1\t1|0", "\t0|1"))?;
        assert!(Vcf::from_path(&ragged).is_err());
        Ok(())
    }

    #[test]
    fn list_vcf_files() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        for name in ["b.vcf.gz", "a.vcf", "notes.txt"] {
            std::fs::write(tmpdir.path().join(name), "")?;
        }
        let files = fetch_vcf_files(tmpdir.path())?;
        let names: Vec<_> = files.iter().filter_map(|p| p.file_name()).collect();
        assert_eq!(names, vec!["a.vcf", "b.vcf.gz"]);
        Ok(())
    }
}
