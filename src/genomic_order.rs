
use std::cmp::Ordering;
use bio::io::gff;
use rust_htslib::bam::HeaderView;

// Maps chromosome names to their position in the reference genome.
// Unknown names have no index, and sort before all known chromosomes.
pub trait SequenceDictionary {
	fn sequence_index(&self, name: &str) -> Option<usize>;
}

impl SequenceDictionary for HeaderView {
	fn sequence_index(&self, name: &str) -> Option<usize> {
		self.tid(name.as_bytes()).map(|tid| tid as usize)
	}
}

impl SequenceDictionary for [String] {
	fn sequence_index(&self, name: &str) -> Option<usize> {
		self.iter().position(|chr| chr == name)
	}
}

impl SequenceDictionary for Vec<String> {
	fn sequence_index(&self, name: &str) -> Option<usize> {
		self.as_slice().sequence_index(name)
	}
}

pub trait Annotation {
	fn chromosome(&self) -> &str;
	fn start(&self) -> u64;
	fn end(&self) -> u64;
	fn transcript_type(&self) -> Option<&str>;
}

impl Annotation for gff::Record {
	fn chromosome(&self) -> &str { self.seqname() }
	fn start(&self) -> u64 { *gff::Record::start(self) }
	fn end(&self) -> u64 { *gff::Record::end(self) }

	// GENCODE uses transcript_type, Ensembl uses transcript_biotype
	fn transcript_type(&self) -> Option<&str> {
		let attributes = self.attributes();
		attributes.get("transcript_type")
			.or_else(|| attributes.get("transcript_biotype"))
			.map(|t| t.as_str())
	}
}

// Orders annotations by chromosome (in dictionary order), start, end, and
// finally transcript type. Records without a transcript type come first.
pub struct GenomicOrderComparator<'a, D: SequenceDictionary + ?Sized> {
	dict: &'a D
}

impl<'a, D: SequenceDictionary + ?Sized> GenomicOrderComparator<'a, D> {
	pub fn new(dict: &'a D) -> Self {
		GenomicOrderComparator { dict }
	}

	pub fn compare<A: Annotation + ?Sized>(&self, a: &A, b: &A) -> Ordering {
		let a_idx = self.dict.sequence_index(a.chromosome());
		let b_idx = self.dict.sequence_index(b.chromosome());
		a_idx.cmp(&b_idx)
			.then_with(|| a.start().cmp(&b.start()))
			.then_with(|| a.end().cmp(&b.end()))
			.then_with(|| a.transcript_type().cmp(&b.transcript_type()))
	}
}
