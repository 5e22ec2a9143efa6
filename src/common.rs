
use docopt::{Docopt, ArgvMap};
use std::process::{Child, Command, Stdio};
use std::io::{self, stdin, BufRead, BufReader, Read};
use std::fs::File;
use anyhow::{Context, Result};
use env_logger::Env;
use rust_htslib::bam;
use rust_htslib::bam::{Header, HeaderView, Format, CompressionLevel};
use rust_htslib::bam::Read as BamRead;

macro_rules! error {
	($($arg:tt)+) => ({
		use std::process::exit;
		eprint!("ERROR: "); eprintln!($($arg)+); exit(-1);
	})
}

pub fn parse_args(usage: &str) -> ArgvMap {
	Docopt::new(usage).and_then(|d| d.parse()).unwrap_or_else(|_| {
		error!("Invalid arguments.\n{}", usage);
	})
}

pub fn init_logging() {
	env_logger::Builder::from_env(Env::default().default_filter_or("info"))
		.format_timestamp(None).init();
}

pub trait PathArgs {
	fn get_path(&self, arg: &str) -> String;
}

impl PathArgs for ArgvMap {
	fn get_path(&self, arg: &str) -> String {
		let path = self.get_str(arg);
		if let Some(rest) = path.strip_prefix('~') {
			if let Ok(home) = std::env::var("HOME") {
				return format!("{}{}", home, rest);
			}
		}
		path.into()
	}
}

// Reads plain text from a file or stdin ("-"). Files ending in .gz are
// decompressed through an external gunzip process, whose exit status is
// checked once the stream reaches EOF.
pub struct FileReader {
	bufread: Box<dyn BufRead>,
	gunzip: Option<Child>
}

impl FileReader {
	pub fn open(path: &str) -> Result<FileReader> {
		if path == "-" {
			return Ok(FileReader { bufread: Box::new(BufReader::new(stdin())), gunzip: None });
		}
		let file = File::open(path).with_context(
			|| format!("Cannot open file {} for reading.", path))?;
		if path.ends_with(".gz") {
			let mut gunzip = Command::new("gunzip").arg("-c")
				.stdout(Stdio::piped()).stderr(Stdio::null()).stdin(file).spawn()
				.context("Cannot start gunzip process.")?;
			let stdout = gunzip.stdout.take()
				.context("Cannot read from gunzip process.")?;
			Ok(FileReader { bufread: Box::new(BufReader::new(stdout)), gunzip: Some(gunzip) })
		} else {
			Ok(FileReader { bufread: Box::new(BufReader::new(file)), gunzip: None })
		}
	}

	#[allow(dead_code)]
	pub fn read_line(&mut self, line: &mut String) -> Result<bool> {
		line.clear();
		let len = self.bufread.read_line(line)
			.context("I/O error while reading from file.")?;
		if len == 0 {
			self.finish().context("Cannot decompress file.")?;
		}
		Ok(len > 0)
	}

	fn finish(&mut self) -> io::Result<()> {
		if let Some(mut gunzip) = self.gunzip.take() {
			let status = gunzip.wait()?;
			if !status.success() {
				return Err(io::Error::new(io::ErrorKind::InvalidData,
					format!("gunzip exited with {}", status)));
			}
		}
		Ok(())
	}
}

impl Read for FileReader {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		let len = self.bufread.read(buf)?;
		if len == 0 && !buf.is_empty() { self.finish()?; }
		Ok(len)
	}
}

// Iterates over the records of a BAM/SAM file, or stdin when the path is "-".
pub struct BamReader {
	reader: bam::Reader
}

impl BamReader {
	pub fn open(path: &str) -> Result<BamReader> {
		let reader = if path == "-" {
			bam::Reader::from_stdin()
				.context("Failed to read BAM file from standard input.")?
		} else {
			bam::Reader::from_path(path)
				.with_context(|| format!("Cannot open BAM file '{}'", path))?
		};
		Ok(BamReader { reader })
	}

	pub fn header(&self) -> HeaderView {
		self.reader.header().clone()
	}
}

impl Iterator for BamReader {
	type Item = Result<bam::Record>;

	fn next(&mut self) -> Option<Self::Item> {
		let mut record = bam::Record::new();
		match self.reader.read(&mut record) {
			None => None,
			Some(Ok(())) => Some(Ok(record)),
			Some(Err(e)) => Some(Err(e).context("Input BAM file ended prematurely."))
		}
	}
}

// Only the sam binary writes BAM.
#[allow(dead_code)]
pub struct BamWriter {
	writer: bam::Writer
}

#[allow(dead_code)]
impl BamWriter {
	pub fn open(path: &str, header: &HeaderView, compressed: bool)
		-> Result<BamWriter> {
		let header = Header::from_template(header);
		let mut writer = if path == "-" {
			bam::Writer::from_stdout(&header, Format::Bam)
				.context("Cannot write BAM to standard output.")?
		} else {
			bam::Writer::from_path(path, &header, Format::Bam)
				.with_context(|| format!("Cannot open file {} for writing.", path))?
		};
		if !compressed {
			writer.set_compression_level(CompressionLevel::Uncompressed)
				.context("Cannot disable BAM compression.")?;
		}
		Ok(BamWriter { writer })
	}

	pub fn write(&mut self, record: &bam::Record) -> Result<()> {
		self.writer.write(record).context("Output stream closed unexpectedly.")
	}
}
