use coin_market_sdk::{
    ClientConfig, CoinGeckoProvider, DatasetOptions, MarketDataset, SortConfig, SortDirection,
};
use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let provider = Arc::new(CoinGeckoProvider::new(ClientConfig::from_env())?);
    let dataset = MarketDataset::new(provider, DatasetOptions::default());

    println!("Market overview (provider: {})", dataset.provider_name());
    println!("-------------------------------------------");

    // 1. First load goes to the network
    let start = Instant::now();
    if let Err(e) = dataset.refresh().await {
        eprintln!("Error: could not load markets: {}", e.user_message());
        return Ok(());
    }
    println!("Loaded {} assets in {:?}", dataset.snapshot().await.len(), start.elapsed());

    // 2. Second page is appended to the snapshot
    match dataset.load_more().await {
        Ok(outcome) => println!("Load more: {:?}", outcome),
        Err(e) => eprintln!("Warning: load more failed: {}", e.user_message()),
    }

    // 3. A refresh within the cache window never leaves the process
    let start = Instant::now();
    dataset.refresh().await?;
    println!("Cached refresh took {:?}", start.elapsed());
    println!();

    let stats = dataset.stats().await;
    println!("Total market cap:   ${:.0}", stats.total_market_cap);
    println!("24h volume:         ${:.0}", stats.total_volume_24h);
    println!(
        "Gainers / losers:   {} / {} ({} neutral)",
        stats.gainers, stats.losers, stats.neutral
    );
    match stats.sentiment() {
        Some(ratio) => println!("Sentiment ratio:    {:.2}", ratio),
        None => println!("Sentiment ratio:    n/a"),
    }
    println!("BTC dominance:      {:.2}%", stats.btc_dominance);
    println!("ETH dominance:      {:.2}%", stats.eth_dominance);
    println!();

    if let Some(highlights) = dataset.highlights().await {
        println!("Top gainers (24h):");
        for asset in highlights.top_gainers.iter().take(5) {
            println!(
                "  {:<8} {:>8.2}%",
                asset.symbol.to_uppercase(),
                asset.price_change_percentage_24h.unwrap_or_default()
            );
        }
        println!("Trending: {}", highlights.trending.len());
        println!();
    }

    dataset
        .set_sort_config(SortConfig::new("total_volume", SortDirection::Desc))
        .await;
    println!("Top 10 by volume:");
    for asset in dataset.visible().await.iter().take(10) {
        println!(
            "  {:<8} ${:<14.4} vol ${:.0}",
            asset.symbol.to_uppercase(),
            asset.current_price.unwrap_or_default(),
            asset.total_volume.unwrap_or_default()
        );
    }

    Ok(())
}
