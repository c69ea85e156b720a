//! Classic floor-trader pivot points and the messages built from them.

use crate::{errors::ValidationError, utils::fit_message};

/// Maximum stop-loss distance (in points) for custom scalp/swing signals.
pub const MAX_STOP_DISTANCE: f64 = 25.0;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriceInput {
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Parse `high,low,close`.
pub fn parse_prices(text: &str) -> Result<PriceInput, ValidationError> {
    let parts: Vec<&str> = text.trim().split(',').map(str::trim).collect();
    let [high, low, close] = parts.as_slice() else {
        return Err(ValidationError::PriceFormat);
    };

    let num = |s: &str| {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or(ValidationError::PriceNotNumeric)
    };
    let input = PriceInput {
        high: num(high)?,
        low: num(low)?,
        close: num(close)?,
    };
    if input.high < input.low {
        return Err(ValidationError::HighBelowLow);
    }
    Ok(input)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PivotLevels {
    pub pivot: f64,
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

impl PivotLevels {
    /// All levels are rounded to two decimals.
    pub fn calculate(p: PriceInput) -> Self {
        let PriceInput { high, low, close } = p;
        let pivot = (high + low + close) / 3.0;
        Self {
            pivot: round2(pivot),
            r1: round2(2.0 * pivot - low),
            r2: round2(pivot + (high - low)),
            r3: round2(high + 2.0 * (pivot - low)),
            s1: round2(2.0 * pivot - high),
            s2: round2(pivot - (high - low)),
            s3: round2(low - 2.0 * (high - pivot)),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// Buy when the close settled above the pivot.
    pub fn from_close(levels: &PivotLevels, close: f64) -> Self {
        if close > levels.pivot {
            Direction::Buy
        } else {
            Direction::Sell
        }
    }

    fn label(self) -> &'static str {
        match self {
            Direction::Buy => "📈 BUY",
            Direction::Sell => "📉 SELL",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TradeType {
    Scalp,
    Swing,
}

impl TradeType {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeType::Scalp => "scalp",
            TradeType::Swing => "swing",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            TradeType::Scalp => "⚡ Signal type: scalping (quick in and out)",
            TradeType::Swing => "📊 Signal type: swing (medium term)",
        }
    }
}

/// Reply to the user who asked for a calculation.
pub fn format_results(l: &PivotLevels) -> String {
    format!(
        "📊 Pivot point analysis\n{RULE}\n\n\
         🎯 Targets (resistance):\n\
         R3: {:.2}\nR2: {:.2}\nR1: {:.2}\n\n\
         🚪 Entry zone:\nPP: {:.2}\n\n\
         🛡️ Support levels:\n\
         S1: {:.2}\nS2: {:.2}\nS3: {:.2}\n\n\
         {RULE}\n📈 Calculated with the classic formula",
        l.r3, l.r2, l.r1, l.pivot, l.s1, l.s2, l.s3
    )
}

struct Plan {
    direction: Direction,
    entry: (f64, f64),
    targets: [f64; 3],
}

impl Plan {
    fn new(l: &PivotLevels, close: f64) -> Self {
        let direction = Direction::from_close(l, close);
        match direction {
            Direction::Buy => Self {
                direction,
                entry: (l.pivot, l.s1),
                targets: [l.r1, l.r2, l.r3],
            },
            Direction::Sell => Self {
                direction,
                entry: (l.pivot, l.r1),
                targets: [l.s1, l.s2, l.s3],
            },
        }
    }

    fn body(&self, header: &str, stop: f64) -> String {
        let [tp1, tp2, tp3] = self.targets;
        format!(
            "{header}\n{RULE}\n\n{}\n\n\
             🔴 Entry zone: {:.2} - {:.2}\n\n\
             🎯 Targets:\nTP1: {tp1:.2}\nTP2: {tp2:.2}\nTP3: {tp3:.2}\n\n\
             🛑 Stop loss: {stop:.2}\n\n{RULE}\n",
            self.direction.label(),
            self.entry.0,
            self.entry.1,
        )
    }
}

/// Automatic post to the bound channel after a calculation.
pub fn format_channel_recommendation(l: &PivotLevels, close: f64, header: &str) -> String {
    let plan = Plan::new(l, close);
    let (stop, scalp, swing) = match plan.direction {
        Direction::Buy => (l.s2, l.r1, (l.r2, l.r3)),
        Direction::Sell => (l.r2, l.s1, (l.s2, l.s3)),
    };

    let mut out = plan.body(header, stop);
    out.push_str(&format!(
        "⚡ Scalping: {scalp:.2}\n📊 Swing: {:.2} - {:.2}\n\n⚠️ Trade carefully and manage your risk",
        swing.0, swing.1
    ));
    fit_message(&out)
}

/// Stop-loss for custom signals: the S2/R2 distance, capped at [`MAX_STOP_DISTANCE`].
pub fn capped_stop(l: &PivotLevels, direction: Direction) -> f64 {
    match direction {
        Direction::Buy => l.pivot - (l.pivot - l.s2).abs().min(MAX_STOP_DISTANCE),
        Direction::Sell => l.pivot + (l.r2 - l.pivot).abs().min(MAX_STOP_DISTANCE),
    }
}

/// `/scalp` and `/swing` posts.
pub fn format_custom_recommendation(
    l: &PivotLevels,
    close: f64,
    header: &str,
    footer: &str,
) -> String {
    let plan = Plan::new(l, close);
    let stop = capped_stop(l, plan.direction);

    let mut out = plan.body(header, stop);
    out.push_str("🫰🏻 Please keep your lot size small\n\n");
    out.push_str(footer);
    fit_message(&out)
}
