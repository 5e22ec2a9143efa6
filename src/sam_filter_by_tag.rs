
use crate::common::{parse_args, PathArgs, FileReader, BamReader, BamWriter};
use crate::tag_filter::{filter_read, filter_pair, retain_by_read_number, ReadNumber};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use anyhow::{bail, Context, Result};
use docopt::ArgvMap;
use log::{info, warn};
use regex::Regex;
use rust_htslib::bam::Record;

const USAGE: &str = "
Usage:
  sam filter by tag [options] <bam_file> <tag>

Options:
  --value=V          Only accept reads whose tag has this value
  --values=PATH      Only accept reads whose tag value is listed in this
                     file (one value per line)
  --discard          Discard matching reads instead of retaining them
  --paired           Keep or discard mates together. The pair matches if
                     either mate matches.
  --read-number=N    Only output read 1 or read 2 of each pair. Unpaired
                     reads are always output.
  --min-mapq=N       Discard reads with MAPQ below threshold [default: 0]
  --output=PATH      Output BAM file [default: -]
  --uncompressed     Output in uncompressed BAM format
  --summary=PATH     Write the number of accepted and rejected reads here

Filters a BAM file based on the presence and value of an auxiliary tag
(e.g. cell barcode XC). A read matches if it carries the tag and, when --value
or --values is given, the tag value is one of the listed values.
Matching reads are retained, or discarded if --discard is given.

In --paired mode, mates are identified by read name. Input can be name-sorted
or position-sorted, but memory usage grows with the distance between mates.
";

pub struct FilterOptions {
	pub bam_path: String,
	pub tag: Vec<u8>,
	pub accepted: Option<HashSet<String>>,
	pub retain_matching: bool,
	pub paired: bool,
	pub read_number: Option<ReadNumber>,
	pub min_mapq: u8,
	pub output: String,
	pub compressed: bool,
	pub summary: Option<String>
}

impl FilterOptions {
	pub fn from_args(args: &ArgvMap) -> Result<FilterOptions> {
		let tag = args.get_str("<tag>");
		let tag_regex = Regex::new(r"^[A-Za-z][A-Za-z0-9]$")?;
		if !tag_regex.is_match(tag) {
			bail!("Tag '{}' is not a valid two-character SAM tag.", tag);
		}

		let value = args.get_str("--value");
		let values_path = args.get_path("--values");
		let accepted: Option<HashSet<String>> = match (value.is_empty(), values_path.is_empty()) {
			(true, true) => None,
			(false, true) => Some(std::iter::once(value.to_string()).collect()),
			(true, false) => Some(load_tag_values(&values_path)?),
			(false, false) => bail!("--value and --values cannot be used together.")
		};

		let read_number = match args.get_str("--read-number") {
			"" => None,
			n => Some(n.parse::<ReadNumber>().map_err(anyhow::Error::msg)?)
		};

		let min_mapq: u8 = args.get_str("--min-mapq").parse().ok().context(
			"--min-mapq must be an integer between 0 - 255.")?;

		let summary = args.get_path("--summary");
		Ok(FilterOptions {
			bam_path: args.get_path("<bam_file>"),
			tag: tag.as_bytes().to_vec(),
			accepted,
			retain_matching: !args.get_bool("--discard"),
			paired: args.get_bool("--paired"),
			read_number,
			min_mapq,
			output: args.get_path("--output"),
			compressed: !args.get_bool("--uncompressed"),
			summary: if summary.is_empty() { None } else { Some(summary) }
		})
	}
}

// Reads one tag value per line. Surrounding whitespace and empty lines are
// ignored.
pub fn load_tag_values(path: &str) -> Result<HashSet<String>> {
	let mut file = FileReader::open(path)?;
	let mut values = HashSet::new();
	let mut line = String::new();
	while file.read_line(&mut line)? {
		let value = line.trim();
		if !value.is_empty() { values.insert(value.to_string()); }
	}
	info!("Loaded {} distinct tag values from {}.", values.len(), path);
	Ok(values)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct FilterCounts {
	pub accepted: u64,
	pub rejected: u64
}

pub fn main() {
	let args = parse_args(USAGE);
	let opts = FilterOptions::from_args(&args)
		.unwrap_or_else(|e| error!("{:#}", e));

	let counts = filter_bam(&opts).unwrap_or_else(|e| error!("{:#}", e));
	let total = counts.accepted + counts.rejected;
	info!("Accepted {} / {} reads ({:.1}%).", counts.accepted, total,
		counts.accepted as f64 / total.max(1) as f64 * 100.0);

	if let Some(path) = &opts.summary {
		write_summary(path, &counts).unwrap_or_else(|e| error!("{:#}", e));
	}
}

struct Output<'a> {
	opts: &'a FilterOptions,
	writer: BamWriter,
	counts: FilterCounts
}

impl<'a> Output<'a> {
	// The tag decision has already been made; MAPQ and read number are
	// checked per read.
	fn emit(&mut self, read: &Record, rejected: bool) -> Result<()> {
		let keep = !rejected && read.mapq() >= self.opts.min_mapq &&
			self.opts.read_number.map_or(true, |n| retain_by_read_number(read, n));
		if keep {
			self.writer.write(read)?;
			self.counts.accepted += 1;
		} else {
			self.counts.rejected += 1;
		}
		Ok(())
	}
}

pub fn filter_bam(opts: &FilterOptions) -> Result<FilterCounts> {
	let bam = BamReader::open(&opts.bam_path)?;
	let header = bam.header();
	let writer = BamWriter::open(&opts.output, &header, opts.compressed)?;
	let mut out = Output { opts, writer, counts: FilterCounts::default() };

	let tag = &opts.tag;
	let accepted = opts.accepted.as_ref();

	// Mates waiting for their partner, keyed by read name. The counter
	// lets us flush orphans in input order.
	let mut pending: HashMap<Vec<u8>, (u64, Record)> = HashMap::new();
	let mut seen: u64 = 0;

	for r in bam {
		let read = r?;
		seen += 1;

		let pairable = opts.paired && read.is_paired() &&
			!read.is_secondary() && !read.is_supplementary();
		if !pairable {
			let rejected = filter_read(&read, tag, accepted, opts.retain_matching);
			out.emit(&read, rejected)?;
			continue;
		}

		let qname = read.qname().to_vec();
		if let Some((_, mate)) = pending.remove(&qname) {
			let rejected = filter_pair(&mate, &read, tag, accepted,
				opts.retain_matching);
			out.emit(&mate, rejected)?;
			out.emit(&read, rejected)?;
		} else {
			pending.insert(qname, (seen, read));
		}
	}

	if !pending.is_empty() {
		warn!("{} paired reads had no mate in the input, and were filtered on their own.",
			pending.len());
		let mut orphans: Vec<(u64, Record)> = pending.into_values().collect();
		orphans.sort_by_key(|(order, _)| *order);
		for (_, read) in orphans {
			let rejected = filter_read(&read, tag, accepted, opts.retain_matching);
			out.emit(&read, rejected)?;
		}
	}

	Ok(out.counts)
}

fn write_summary(path: &str, counts: &FilterCounts) -> Result<()> {
	let file = File::create(path).with_context(
		|| format!("Cannot open file {} for writing.", path))?;
	let mut out = BufWriter::new(file);
	writeln!(out, "READS_ACCEPTED\tREADS_REJECTED")?;
	writeln!(out, "{}\t{}", counts.accepted, counts.rejected)?;
	out.flush()?;
	Ok(())
}
