fn main() -> anyhow::Result<()> {
    mo_cli::run()
}
