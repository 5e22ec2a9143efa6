
use std::collections::HashSet;
use std::str::FromStr;
use itertools::Itertools;
use rust_htslib::bam::record::{Aux, Record};

// The parts of an alignment record that tag filtering looks at.
pub trait TaggedRecord {
	fn tag_value(&self, tag: &[u8]) -> Option<String>;
	fn is_paired(&self) -> bool;
	fn is_first_of_pair(&self) -> bool;
	fn is_second_of_pair(&self) -> bool;
}

impl TaggedRecord for Record {
	fn tag_value(&self, tag: &[u8]) -> Option<String> {
		self.aux(tag).ok().and_then(|aux| aux_to_string(&aux))
	}
	fn is_paired(&self) -> bool { Record::is_paired(self) }
	fn is_first_of_pair(&self) -> bool { self.is_first_in_template() }
	fn is_second_of_pair(&self) -> bool { self.is_last_in_template() }
}

// Renders an aux field value the way it appears in SAM text format.
// B-type arrays become comma-separated lists.
fn aux_to_string(aux: &Aux) -> Option<String> {
	Some(match aux {
		Aux::Char(c) => char::from(*c).to_string(),
		Aux::I8(x) => x.to_string(),
		Aux::U8(x) => x.to_string(),
		Aux::I16(x) => x.to_string(),
		Aux::U16(x) => x.to_string(),
		Aux::I32(x) => x.to_string(),
		Aux::U32(x) => x.to_string(),
		Aux::Float(x) => x.to_string(),
		Aux::Double(x) => x.to_string(),
		Aux::String(s) | Aux::HexByteArray(s) => s.to_string(),
		Aux::ArrayI8(a) => a.iter().join(","),
		Aux::ArrayU8(a) => a.iter().join(","),
		Aux::ArrayI16(a) => a.iter().join(","),
		Aux::ArrayU16(a) => a.iter().join(","),
		Aux::ArrayI32(a) => a.iter().join(","),
		Aux::ArrayU32(a) => a.iter().join(","),
		Aux::ArrayFloat(a) => a.iter().join(","),
		#[allow(unreachable_patterns)]
		_ => return None
	})
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadNumber { First, Second }

impl FromStr for ReadNumber {
	type Err = String;

	fn from_str(s: &str) -> Result<ReadNumber, String> {
		match s.trim() {
			"1" => Ok(ReadNumber::First),
			"2" => Ok(ReadNumber::Second),
			_ => Err(format!("Read number must be 1 or 2, got '{}'.", s))
		}
	}
}

// A record matches if it carries the tag, and the tag value is one of the
// accepted values (any value is accepted if no set is given).
pub fn tag_matches<R: TaggedRecord + ?Sized>(read: &R, tag: &[u8],
	accepted: Option<&HashSet<String>>) -> bool {
	match (read.tag_value(tag), accepted) {
		(None, _) => false,
		(Some(_), None) => true,
		(Some(value), Some(values)) => values.contains(&value)
	}
}

fn reject(matches: bool, retain_matching: bool) -> bool {
	if retain_matching { !matches } else { matches }
}

// Returns true if the read should be excluded from the output.
pub fn filter_read<R: TaggedRecord + ?Sized>(read: &R, tag: &[u8],
	accepted: Option<&HashSet<String>>, retain_matching: bool) -> bool {
	reject(tag_matches(read, tag, accepted), retain_matching)
}

// Mates are kept or dropped together. The pair counts as a match if either
// mate matches, since the tag is often only attached to one of them.
pub fn filter_pair<R: TaggedRecord + ?Sized>(first: &R, second: &R,
	tag: &[u8], accepted: Option<&HashSet<String>>, retain_matching: bool)
	-> bool {
	let matches = tag_matches(first, tag, accepted)
		|| tag_matches(second, tag, accepted);
	reject(matches, retain_matching)
}

// Unpaired reads have no read number, and are always retained.
pub fn retain_by_read_number<R: TaggedRecord + ?Sized>(read: &R,
	wanted: ReadNumber) -> bool {
	!read.is_paired() || match wanted {
		ReadNumber::First => read.is_first_of_pair(),
		ReadNumber::Second => read.is_second_of_pair()
	}
}
