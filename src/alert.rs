//! Plain-text rendering of alerts, status reports and account overviews.

use rust_decimal::Decimal;
use std::fmt::Write;
use std::time::Duration;

use crate::exchange::PositionRecord;
use crate::monitor::{AccountOverview, StatusReport};
use crate::risk::{Assessment, RiskAssessment, SeverityBasis};
use crate::utils::decimal::{format_price, format_usd, round_to_precision};
use crate::utils::display_name;

/// Text of a critical-position alert.
pub fn render_alert(position: &PositionRecord, risk: &RiskAssessment) -> String {
    let size = position.size.unwrap_or_default();
    let entry_price = position.entry_price.unwrap_or_default();
    let current_value = position.position_value.unwrap_or_default().abs();

    let mut text = String::new();
    let _ = writeln!(text, "LIQUIDATION ALERT");
    let _ = writeln!(text);
    let _ = writeln!(text, "Position: {}", display_name(&position.instrument));
    let _ = writeln!(text, "Side: {}", risk.side.as_str());
    let _ = writeln!(text, "Size: {}", size.normalize());
    let _ = writeln!(text, "Entry Price: {}", format_price(entry_price));
    let _ = writeln!(text, "Entry Value: {}", format_usd(entry_price * size.abs()));
    let _ = writeln!(text, "Current Price: {}", format_price(risk.current_price));
    let _ = writeln!(text, "Current Value: {}", format_usd(current_value));
    let _ = writeln!(text, "Liquidation Price: {}", liquidation_label(risk));
    let _ = writeln!(text, "Distance to Liquidation: {}", distance_label(risk));
    let _ = writeln!(text);
    let _ = write!(text, "Action required: consider closing the position or adding margin.");
    text
}

/// Text of an on-demand status report.
pub fn render_status(report: &StatusReport) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Account Status");
    let _ = writeln!(text);
    let _ = writeln!(text, "Wallet: {}", report.wallet_address);
    let _ = writeln!(text, "Threshold: {}", threshold_label(report.threshold, report.basis));
    if let Some(interval) = report.alert_interval {
        let _ = writeln!(text, "Alert interval: {}", duration_label(interval));
    }
    let _ = writeln!(text);

    if report.positions.is_empty() {
        let _ = write!(text, "No active positions found.");
        return text;
    }

    let _ = writeln!(text, "Active Positions:");
    for status in &report.positions {
        let record = &status.record;
        let name = display_name(&record.instrument);
        let _ = writeln!(text);

        let risk = match &status.outcome {
            Ok(Assessment::Assessed(risk)) => risk,
            Ok(Assessment::Excluded(reason)) => {
                let _ = writeln!(text, "[--] {}: {}", name, reason);
                continue;
            }
            Err(e) => {
                let _ = writeln!(text, "[??] {}: {}", name, e);
                continue;
            }
        };

        let _ = writeln!(text, "[{}] {}", risk.severity.as_str(), name);
        let _ = writeln!(
            text,
            "   Size: {} ({})",
            record.size.unwrap_or_default().normalize(),
            risk.side.as_str()
        );
        if let Some(entry_price) = record.entry_price {
            let _ = writeln!(text, "   Entry Price: {}", format_price(entry_price));
        }
        if let Some(entry_value) = status.entry_value() {
            let _ = writeln!(text, "   Entry Value: {}", format_usd(entry_value));
        }
        let _ = writeln!(text, "   Current Price: {}", format_price(risk.current_price));
        let _ = writeln!(
            text,
            "   Current Value: {}",
            format_usd(record.position_value.unwrap_or_default().abs())
        );
        let _ = writeln!(text, "   Liquidation Price: {}", liquidation_label(risk));
        let _ = writeln!(text, "   Distance to Liquidation: {}", distance_label(risk));
        if let Some(pnl) = record.unrealized_pnl {
            let _ = writeln!(text, "   PnL: {}", format_usd(pnl));
        }
    }

    let _ = writeln!(text);
    let _ = write!(
        text,
        "Total Unrealized PnL: {}",
        format_usd(report.total_unrealized_pnl)
    );
    if let Some(summary) = &report.account_summary {
        let _ = write!(
            text,
            "\nAccount Value: {}\nMargin Used: {}",
            format_usd(summary.account_value),
            format_usd(summary.total_margin_used)
        );
    }
    text
}

/// Text of an account overview.
pub fn render_account(overview: &AccountOverview) -> String {
    let stats = &overview.stats;
    let mut text = String::new();
    let _ = writeln!(text, "Account Overview");
    let _ = writeln!(text);
    let _ = writeln!(text, "Wallet: {}", overview.wallet_address);
    let _ = writeln!(text);
    let _ = writeln!(text, "Trading Statistics:");
    let _ = writeln!(text, "- Total Trades: {}", stats.total_trades);
    let _ = writeln!(text, "- Win Rate: {}%", round_to_precision(stats.win_rate, 1));
    let _ = writeln!(text, "- Profitable Trades: {}", stats.profitable_trades);
    let _ = writeln!(text, "- Losing Trades: {}", stats.losing_trades);
    match &stats.largest_win {
        Some((pnl, instrument)) => {
            let _ = writeln!(text, "- Largest Win: +{} ({})", format_usd(*pnl), instrument);
        }
        None => {
            let _ = writeln!(text, "- Largest Win: no completed wins");
        }
    }
    match &stats.largest_loss {
        Some((pnl, instrument)) => {
            let _ = writeln!(text, "- Largest Loss: {} ({})", format_usd(*pnl), instrument);
        }
        None => {
            let _ = writeln!(text, "- Largest Loss: no completed losses");
        }
    }
    let _ = writeln!(text);
    let _ = writeln!(text, "PnL Breakdown:");
    let _ = writeln!(text, "- Realized PnL: {}", format_usd(stats.realized_pnl));
    let _ = writeln!(text, "- Unrealized PnL: {}", format_usd(overview.total_unrealized_pnl));
    let _ = writeln!(text, "- Total PnL: {}", format_usd(overview.total_account_pnl));
    let _ = writeln!(text);
    let _ = writeln!(text, "Portfolio Summary:");
    let _ = writeln!(text, "- Account Value: {}", format_usd(overview.account_value));
    let _ = write!(text, "- Active Positions: {}", overview.active_positions);
    text
}

fn liquidation_label(risk: &RiskAssessment) -> String {
    if risk.liquidation_estimated {
        format!("{} (estimated)", format_price(risk.liquidation_price))
    } else {
        format_price(risk.liquidation_price)
    }
}

fn distance_label(risk: &RiskAssessment) -> String {
    format!(
        "{}% ({})",
        round_to_precision(risk.distance_percent, 1),
        format_usd(risk.distance_dollar)
    )
}

fn threshold_label(threshold: Decimal, basis: SeverityBasis) -> String {
    match basis {
        SeverityBasis::Percent => format!("{}%", threshold.normalize()),
        SeverityBasis::Dollar => format_usd(threshold),
    }
}

fn duration_label(interval: Duration) -> String {
    let secs = interval.as_secs();
    let (minutes, seconds) = (secs / 60, secs % 60);
    if seconds > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}m", minutes)
    }
}
