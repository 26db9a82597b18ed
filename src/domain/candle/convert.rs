//! Conversion: RestKline → Candle (TryFrom + timestamp validation).

use super::wire::RestKline;
use super::Candle;
use crate::error::HttpError;
use chrono::{TimeZone, Utc};

impl TryFrom<RestKline> for Candle {
    type Error = HttpError;

    fn try_from(k: RestKline) -> Result<Self, Self::Error> {
        let open_time = Utc
            .timestamp_millis_opt(k.0)
            .single()
            .ok_or_else(|| HttpError::Decode(format!("invalid kline open time: {}", k.0)))?;
        let close_time = Utc
            .timestamp_millis_opt(k.6)
            .single()
            .ok_or_else(|| HttpError::Decode(format!("invalid kline close time: {}", k.6)))?;

        Ok(Candle {
            open_time,
            close_time,
            open: k.1,
            high: k.2,
            low: k.3,
            close: k.4,
            volume: k.5,
            quote_volume: k.7,
            trades: k.8,
        })
    }
}
