//! Print live ticker updates for one instrument until Ctrl-C.
//!
//! ```bash
//! RUST_LOG=realtime_feed=debug cargo run --example live_ticker -- ETHUSDT weekly
//! ```

use realtime_feed::prelude::*;

#[tokio::main]
async fn main() -> Result<(), FeedError> {
    init_logging();

    let mut args = std::env::args().skip(1);
    let symbol = Symbol::new(args.next().unwrap_or_default()).or_default();
    let timeframe = match args.next() {
        Some(raw) => raw.parse::<Timeframe>().map_err(FeedError::Validation)?,
        None => Timeframe::Daily,
    };

    let client = FeedClient::builder().build()?;
    let feed = client.realtime().subscribe(symbol, timeframe, None);
    let mut updates = feed.watch();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                print_state(&state);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    feed.dispose();
    client.dispose();
    Ok(())
}

fn print_state(state: &FeedState) {
    let Some(ticker) = state.ticker() else {
        if let Some(error) = &state.error {
            println!("{}: {}", state.symbol, error);
        }
        return;
    };

    let via = match state.source() {
        Some(Source::Stream) => "stream",
        _ => "poll",
    };
    let rsi = state.candles.rsi(14).round_dp(1);
    println!(
        "{} {} ({:+}) 24h {:+}% | {} candles, RSI {} | via {}{}",
        state.symbol,
        ticker.last_price,
        state.price_change(),
        ticker.price_change_percent.round_dp(2),
        state.candles.len(),
        rsi,
        via,
        if state.is_connected { "" } else { " (fallback)" },
    );
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(cfg!(debug_assertions))
        .init()
}
