use anyhow::Result;
use konto_client::cli::start;

#[tokio::main]
async fn main() -> Result<()> {
    let (action, config) = start()?;

    action.execute(&config).await
}
