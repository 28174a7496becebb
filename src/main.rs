#[tokio::main]
async fn main() -> anyhow::Result<()> {
  recovance_lib::run().await
}
