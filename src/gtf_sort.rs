
use crate::common::{parse_args, PathArgs, FileReader, BamReader};
use crate::genomic_order::{Annotation, GenomicOrderComparator, SequenceDictionary};
use std::io::{stdout, Write};
use anyhow::{Context, Result};
use bio::io::gff::{self, GffType};
use itertools::Itertools;
use log::{info, warn};

const USAGE: &str = "
Usage:
  gtf sort [options] <dict_file> <gtf_file>

Options:
  --skip-unknown    Drop records on chromosomes missing from the dictionary

Sorts GTF records by chromosome, start, end, and transcript type. Chromosome
order is taken from the @SQ lines of <dict_file>, which can be a sequence
dictionary (.dict) or any SAM/BAM file. Records on chromosomes missing from
the dictionary are placed first unless --skip-unknown is given.
";

pub fn main() {
	let args = parse_args(USAGE);
	let dict_path = args.get_path("<dict_file>");
	let gtf_path = args.get_path("<gtf_file>");
	let skip_unknown = args.get_bool("--skip-unknown");

	let stdout = stdout();
	let written = sort_gtf_file(&dict_path, &gtf_path, skip_unknown, stdout.lock())
		.unwrap_or_else(|e| error!("{:#}", e));
	info!("Wrote {} GTF records in genomic order.", written);
}

pub fn sort_gtf_file<W: Write>(dict_path: &str, gtf_path: &str,
	skip_unknown: bool, out: W) -> Result<usize> {
	let dict = BamReader::open(dict_path)
		.with_context(|| format!("Cannot read sequence dictionary from '{}'", dict_path))?
		.header();

	let mut gtf = gff::Reader::new(FileReader::open(gtf_path)?, GffType::GTF2);
	let records: Vec<gff::Record> = gtf.records().collect::<Result<_, _>>()
		.with_context(|| format!("Invalid GTF record in '{}'", gtf_path))?;
	info!("Loaded {} GTF records.", records.len());

	let sorted = sort_records(records, &dict, skip_unknown);
	let mut writer = gff::Writer::new(out, GffType::GTF2);
	for record in &sorted {
		writer.write(record).context("Output stream closed unexpectedly.")?;
	}
	Ok(sorted.len())
}

pub fn sort_records<D: SequenceDictionary + ?Sized>(records: Vec<gff::Record>,
	dict: &D, skip_unknown: bool) -> Vec<gff::Record> {
	let total = records.len();
	let cmp = GenomicOrderComparator::new(dict);
	let sorted: Vec<gff::Record> = records.into_iter()
		.filter(|r| !skip_unknown || dict.sequence_index(r.chromosome()).is_some())
		.sorted_by(|a, b| cmp.compare(a, b))
		.collect();
	if sorted.len() < total {
		warn!("Dropped {} records on chromosomes missing from the dictionary.",
			total - sorted.len());
	}
	sorted
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	const DICT: &str = "\
@HD\tVN:1.6
@SQ\tSN:chr1\tLN:248956422
@SQ\tSN:chr2\tLN:242193529
@SQ\tSN:chr10\tLN:133797422
";

	const GTF: &str = "\
chr10\tHAVANA\tgene\t5000\t6000\t.\t+\t.\tgene_id \"G4\"; transcript_type \"lncRNA\";
chr2\tHAVANA\tgene\t100\t900\t.\t-\t.\tgene_id \"G3\"; transcript_type \"protein_coding\";
chr1\tHAVANA\tgene\t300\t400\t.\t+\t.\tgene_id \"G2\"; transcript_type \"protein_coding\";
chrUn\tHAVANA\tgene\t1\t50\t.\t+\t.\tgene_id \"G5\"; transcript_type \"lncRNA\";
chr1\tHAVANA\tgene\t300\t350\t.\t+\t.\tgene_id \"G1\"; transcript_type \"protein_coding\";
";

	fn record(chr: &str, start: u64) -> gff::Record {
		let mut record = gff::Record::new();
		*record.seqname_mut() = chr.to_string();
		*record.start_mut() = start;
		*record.end_mut() = start + 10;
		record
	}

	fn positions(records: &[gff::Record]) -> Vec<(String, u64)> {
		records.iter().map(|r| (r.chromosome().to_string(), Annotation::start(r)))
			.collect()
	}

	#[test]
	fn unknown_chromosomes_first_or_dropped() {
		let dict: Vec<String> = vec!["chr1".into(), "chr2".into()];
		let records = vec![record("chr2", 5), record("chrUn", 9), record("chr1", 7)];

		let sorted = sort_records(records.clone(), &dict, false);
		assert_eq!(positions(&sorted), vec![("chrUn".to_string(), 9),
			("chr1".to_string(), 7), ("chr2".to_string(), 5)]);

		let sorted = sort_records(records, &dict, true);
		assert_eq!(positions(&sorted), vec![("chr1".to_string(), 7),
			("chr2".to_string(), 5)]);
	}

	#[test]
	fn sorts_gtf_file() {
		let dir = TempDir::new().unwrap();
		let dict_path = dir.path().join("genome.dict");
		let gtf_path = dir.path().join("genes.gtf");
		fs::write(&dict_path, DICT).unwrap();
		fs::write(&gtf_path, GTF).unwrap();

		let mut out: Vec<u8> = Vec::new();
		let written = sort_gtf_file(dict_path.to_str().unwrap(),
			gtf_path.to_str().unwrap(), true, &mut out).unwrap();
		assert_eq!(written, 4);

		let text = String::from_utf8(out).unwrap();
		let loci: Vec<String> = text.lines()
			.map(|line| line.split('\t').take(5).join("\t")).collect();
		assert_eq!(loci, vec![
			"chr1\tHAVANA\tgene\t300\t350",
			"chr1\tHAVANA\tgene\t300\t400",
			"chr2\tHAVANA\tgene\t100\t900",
			"chr10\tHAVANA\tgene\t5000\t6000"]);
	}
}
