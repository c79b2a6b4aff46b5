use std::{fs::File, io::{Write, BufWriter}, path::Path};

use gzp::{deflate::Bgzf, ZBuilder, ZWriter};
use located_error::prelude::*;
use log::debug;

use crate::{VcfError, VcfHeader, VcfRecord};

pub mod error;
pub use error::WriterError;

/// Number of bases per FASTA line.
pub const FASTA_LINE_WIDTH: usize = 60;

/// Output sink: plain buffered file/stdout, or a BGZF stream.
enum Sink<'a> {
    Plain(BufWriter<Box<dyn Write + 'a>>),
    Bgzf(Box<dyn ZWriter>),
}

impl<'a> Sink<'a> {
    fn create(path: &Path) -> Result<Sink<'a>> {
        let file = File::create(path).map_err(WriterError::IOError).with_loc(|| VcfError::Create)?;
        let compressed = path.extension().map_or(false, |ext| ext == "gz");
        debug!("Opening {} {}", path.display(), if compressed {"(BGZF)"} else {""});
        Ok(match compressed {
            true  => Sink::Bgzf(ZBuilder::<Bgzf, _>::new().num_threads(0).from_writer(file)),
            false => Sink::Plain(BufWriter::new(Box::new(file))),
        })
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Sink::Plain(w) => w as &mut dyn Write,
            Sink::Bgzf(w)  => w as &mut dyn Write,
        }
    }

    fn finish(self) -> Result<()> {
        match self {
            Sink::Plain(mut w) => w.flush().map_err(WriterError::IOError).loc("While flushing buffer contents"),
            Sink::Bgzf(mut w)  => w.finish()
                .map_err(|err| WriterError::Compression(err.to_string()))
                .loc("While flushing BGZF stream"),
        }
    }
}

fn write_fasta_entry(writer: &mut dyn Write, name: &str, bases: &[u8]) -> std::io::Result<()> {
    writeln!(writer, ">{name}")?;
    for line in bases.chunks(FASTA_LINE_WIDTH) {
        writer.write_all(line)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// A generic line-oriented file writer.
/// - source: plain `BufWriter` (file or stdout), or BGZF stream when the path ends with `.gz`.
pub struct GenericWriter<'a> {
    source: Sink<'a>,
}

impl<'a> GenericWriter<'a> {
    /// Instantiate a new `GenericWriter`, linked to a file, or to stdout if `path` is `None`.
    ///
    /// # Errors
    /// if `path` is either an invalid file, or the user does not have the proper
    /// UNIX permissions to write at this location.
    pub fn new(path: Option<impl AsRef<Path>>) -> Result<GenericWriter<'a>> {
        let source = match path {
            Some(path) => Sink::create(path.as_ref())?,
            None       => Sink::Plain(BufWriter::new(Box::new(std::io::stdout()))),
        };
        Ok(Self{source})
    }

    /// Write the contents of a generic iterator. One item = one line.
    pub fn write_iter<T, I>(&mut self, iter: T) -> Result<()>
    where   T: IntoIterator<Item = I>,
            I: std::fmt::Display,
    {
        let writer = self.source.writer();
        for obj in iter {
            writeln!(writer, "{obj}").map_err(WriterError::IOError).loc("While writing contents into file")?;
        }
        Ok(())
    }

    /// Write a single FASTA entry, wrapping bases every [`FASTA_LINE_WIDTH`] characters.
    pub fn write_fasta(&mut self, name: &str, bases: &[u8]) -> Result<()> {
        write_fasta_entry(self.source.writer(), name, bases).map_err(WriterError::IOError).with_loc(|| format!("While writing FASTA entry {name}"))
    }

    /// Flush every buffered byte. BGZF streams are terminated with their EOF block.
    pub fn finish(self) -> Result<()> {
        self.source.finish()
    }
}

/// Writes a VCF header followed by its records.
pub struct VcfWriter<'a> {
    inner  : GenericWriter<'a>,
    samples: usize,
}

impl<'a> VcfWriter<'a> {
    /// Create the output file and write the header. The output is BGZF-compressed if `path` ends with `.gz`
    pub fn new(path: impl AsRef<Path>, header: &VcfHeader) -> Result<VcfWriter<'a>> {
        let mut inner = GenericWriter::new(Some(path))?;
        inner.write_iter([header])?;
        Ok(Self{inner, samples: header.samples().len()})
    }

    pub fn write_record(&mut self, record: &VcfRecord) -> Result<()> {
        if record.num_samples() != self.samples {
            return Err(WriterError::SampleCount{expected: self.samples, found: record.num_samples()})
                .with_loc(|| format!("While writing record at {}:{}", record.chrom(), record.start() + 1))
        }
        self.inner.write_iter([record])
    }

    pub fn write_records<'r>(&mut self, records: impl IntoIterator<Item = &'r VcfRecord>) -> Result<()> {
        records.into_iter().try_for_each(|record| self.write_record(record))
    }

    pub fn finish(self) -> Result<()> {
        self.inner.finish()
    }
}

/// Write a whole VCF file at once.
pub fn write_vcf<'r>(path: impl AsRef<Path>, header: &VcfHeader, records: impl IntoIterator<Item = &'r VcfRecord>) -> Result<()> {
    let mut writer = VcfWriter::new(path, header)?;
    writer.write_records(records)?;
    writer.finish()
}
