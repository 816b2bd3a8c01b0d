fn main() -> anyhow::Result<()> {
    vibecheck_lib::run()
}
