
use std::env;

#[macro_use] mod common;
mod tag_filter;
mod sam_filter_by_tag;

const USAGE: &str = "
Usage:
  sam filter by tag <bam_file> <tag>
";

fn main() {
	common::init_logging();
	let args: Vec<String> = env::args().collect();

	if args.len() >= 4 && args[1..4] == ["filter", "by", "tag"] {
		sam_filter_by_tag::main();
	} else {
		eprintln!("{}", USAGE);
	}
}
