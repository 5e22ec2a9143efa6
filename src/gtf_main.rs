
use std::env;

#[macro_use] mod common;
mod genomic_order;
mod gtf_sort;

const USAGE: &str = "
Usage:
  gtf sort <dict_file> <gtf_file>
";

fn main() {
	common::init_logging();
	let args: Vec<String> = env::args().collect();

	if args.len() >= 2 && args[1] == "sort" {
		gtf_sort::main();
	} else {
		eprintln!("{}", USAGE);
	}
}
