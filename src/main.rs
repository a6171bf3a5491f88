fn main() -> anyhow::Result<()> {
    variant_stats::cli::run()
}
