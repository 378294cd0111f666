use anyhow::Result;
use ethers::types::U256;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::str::FromStr;

use crate::constants::{ETHER_DECIMALS, PROJECT_NAME};

pub fn setup_logger(level: &str) -> Result<()> {
    let colors = ColoredLevelConfig {
        trace: Color::Cyan,
        debug: Color::Magenta,
        info: Color::Green,
        warn: Color::Red,
        error: Color::BrightRed,
        ..ColoredLevelConfig::new()
    };

    let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}[{}] {}",
                chrono::Local::now().format("[%H:%M:%S]"),
                colors.color(record.level()),
                message
            ))
        })
        .chain(std::io::stdout())
        .level(LevelFilter::Warn)
        .level_for(PROJECT_NAME, level)
        .apply()?;

    Ok(())
}

/// Renders a wei amount as a decimal ether amount with trailing zeros removed,
/// so 10^18 becomes "1" and 25 * 10^16 becomes "0.25".
pub fn format_ether_trimmed(wei: U256) -> String {
    let unit = U256::exp10(ETHER_DECIMALS);
    let whole = wei / unit;
    let frac = (wei % unit).to_string();

    if frac == "0" {
        return whole.to_string();
    }

    let padded = format!("{}{}", "0".repeat(ETHER_DECIMALS - frac.len()), frac);
    format!("{}.{}", whole, padded.trim_end_matches('0'))
}

/// Blank strings count as absent.
pub fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
