//! Technical indicators over close prices.

use rust_decimal::Decimal;

/// Value returned by `rsi` when there is not enough data.
const NEUTRAL_RSI: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Relative strength index over the last `period` price changes.
///
/// Neutral (50) with fewer than `period + 1` prices; 100 when the window has
/// no losses.
pub fn rsi(prices: &[Decimal], period: usize) -> Decimal {
    if period == 0 || prices.len() <= period {
        return NEUTRAL_RSI;
    }

    let window = &prices[prices.len() - period - 1..];
    let (gains, losses) = window
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((Decimal::ZERO, Decimal::ZERO), |(g, l), change| {
            if change > Decimal::ZERO {
                (g + change, l)
            } else {
                (g, l + change.abs())
            }
        });

    if losses.is_zero() {
        return Decimal::ONE_HUNDRED;
    }

    let period = Decimal::from(period as u64);
    let rs = (gains / period) / (losses / period);
    Decimal::ONE_HUNDRED - Decimal::ONE_HUNDRED / (Decimal::ONE + rs)
}

/// Mean of the last `period` prices; the last price when there are fewer.
pub fn simple_moving_average(prices: &[Decimal], period: usize) -> Decimal {
    if period == 0 || prices.len() < period {
        return prices.last().copied().unwrap_or(Decimal::ZERO);
    }

    let window = &prices[prices.len() - period..];
    window.iter().copied().sum::<Decimal>() / Decimal::from(period as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rsi_neutral_when_short() {
        assert_eq!(rsi(&[dec!(1), dec!(2)], 14), dec!(50));
        assert_eq!(rsi(&[dec!(1), dec!(2)], usize::MAX), dec!(50));
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let prices: Vec<Decimal> = (1..=15).map(Decimal::from).collect();
        assert_eq!(rsi(&prices, 14), dec!(100));
    }

    #[test]
    fn test_rsi_balanced_is_50() {
        // +1, -1 alternating: equal average gain and loss
        let prices = vec![dec!(10), dec!(11), dec!(10), dec!(11), dec!(10)];
        assert_eq!(rsi(&prices, 4), dec!(50));
    }

    #[test]
    fn test_rsi_uses_latest_window() {
        let mut prices = vec![dec!(100), dec!(50)];
        prices.extend([dec!(51), dec!(52), dec!(53)]);
        assert_eq!(rsi(&prices, 3), dec!(100));
    }

    #[test]
    fn test_sma() {
        let prices = vec![dec!(1), dec!(2), dec!(3), dec!(4)];
        assert_eq!(simple_moving_average(&prices, 2), dec!(3.5));
        assert_eq!(simple_moving_average(&prices, 10), dec!(4));
        assert_eq!(simple_moving_average(&[], 3), Decimal::ZERO);
    }
}
