use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = cdl_api::Args::parse();

	cdl_api::run(args).await
}
