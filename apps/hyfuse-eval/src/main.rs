// crates.io
use clap::Parser;
// self
use hyfuse_eval::Args;

fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	hyfuse_eval::run(args)
}
