//! Trading statistics derived from a wallet's fill history.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::exchange::Fill;
use crate::utils::decimal::percent_of;
use crate::utils::display_name;

/// Aggregate of a wallet's fills.
///
/// Only fills with a non-zero closed PnL count as wins or losses; opening
/// fills only add to `total_trades`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FillStats {
    pub total_trades: usize,
    pub profitable_trades: usize,
    pub losing_trades: usize,
    /// Profitable share of closing fills, in percent
    pub win_rate: Decimal,
    pub realized_pnl: Decimal,
    /// Largest positive closed PnL and its instrument (display name)
    pub largest_win: Option<(Decimal, String)>,
    /// Most negative closed PnL and its instrument (display name)
    pub largest_loss: Option<(Decimal, String)>,
}

impl FillStats {
    pub fn from_fills(fills: &[Fill]) -> Self {
        let mut stats = FillStats {
            total_trades: fills.len(),
            ..FillStats::default()
        };

        for fill in fills {
            let pnl = fill.closed_pnl;
            stats.realized_pnl += pnl;

            if pnl > Decimal::ZERO {
                stats.profitable_trades += 1;
                if stats.largest_win.as_ref().map_or(true, |(best, _)| pnl > *best) {
                    stats.largest_win = Some((pnl, display_name(&fill.instrument).to_string()));
                }
            } else if pnl < Decimal::ZERO {
                stats.losing_trades += 1;
                if stats.largest_loss.as_ref().map_or(true, |(worst, _)| pnl < *worst) {
                    stats.largest_loss = Some((pnl, display_name(&fill.instrument).to_string()));
                }
            }
        }

        let closed = (stats.profitable_trades + stats.losing_trades).max(1);
        stats.win_rate = percent_of(
            Decimal::from(stats.profitable_trades),
            Decimal::from(closed),
        );

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fill(instrument: &str, pnl: Decimal) -> Fill {
        Fill {
            instrument: instrument.to_string(),
            closed_pnl: pnl,
        }
    }

    #[test]
    fn test_stats_from_mixed_fills() {
        let fills = vec![
            fill("vntls:OPENAI", dec!(0)),
            fill("vntls:OPENAI", dec!(120.5)),
            fill("BTC", dec!(-40)),
            fill("vntls:ANTHROPIC", dec!(300)),
            fill("ETH", dec!(-75.25)),
        ];

        let stats = FillStats::from_fills(&fills);
        assert_eq!(stats.total_trades, 5);
        assert_eq!(stats.profitable_trades, 2);
        assert_eq!(stats.losing_trades, 2);
        assert_eq!(stats.win_rate, dec!(50));
        assert_eq!(stats.realized_pnl, dec!(305.25));
        assert_eq!(stats.largest_win, Some((dec!(300), "ANTHROPIC".to_string())));
        assert_eq!(stats.largest_loss, Some((dec!(-75.25), "ETH".to_string())));
    }

    #[test]
    fn test_no_closing_fills() {
        let stats = FillStats::from_fills(&[fill("BTC", Decimal::ZERO)]);
        assert_eq!(stats.total_trades, 1);
        assert_eq!(stats.win_rate, Decimal::ZERO);
        assert!(stats.largest_win.is_none());
        assert!(stats.largest_loss.is_none());

        assert_eq!(FillStats::from_fills(&[]), FillStats::default());
    }
}
