#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dopamine_breaker_lib::run().await
}
