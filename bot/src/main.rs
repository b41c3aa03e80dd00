mod trader;

use anyhow::Result;
use trader::Trader;

#[tokio::main]
async fn main() -> Result<()> {
    common::setup_env();
    let trader = Trader::new()?;
    trader.run().await?;
    Ok(())
}
