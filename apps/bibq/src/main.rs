use clap::Parser;

use bibq::Args;

fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	bibq::run(args)
}
