//! 成本统计 - 业务能力层
//!
//! 只做记账：累计 token、计时、按价格表估算费用，不做任何 I/O

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::Config;

/// 每百万 token 的价格（美元）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceTable {
    pub input_price_per_million: f64,
    pub output_price_per_million: f64,
}

impl Default for PriceTable {
    /// Gemini 2.5 Flash 价格
    fn default() -> Self {
        Self {
            input_price_per_million: 0.30,
            output_price_per_million: 2.50,
        }
    }
}

impl PriceTable {
    pub fn from_config(config: &Config) -> Self {
        Self {
            input_price_per_million: config.input_price_per_million,
            output_price_per_million: config.output_price_per_million,
        }
    }
}

/// 某一时刻的统计快照
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostSummary {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_estimate_usd: f64,
    pub duration_seconds: f64,
}

/// 成本统计器
///
/// 一次运行创建一个，只由当前正在进行的调用修改
#[derive(Debug, Clone)]
pub struct CostTracker {
    prices: PriceTable,
    input_tokens: u64,
    output_tokens: u64,
    started_at: Option<Instant>,
    stopped_at: Option<Instant>,
}

impl CostTracker {
    pub fn new(prices: PriceTable) -> Self {
        Self {
            prices,
            input_tokens: 0,
            output_tokens: 0,
            started_at: None,
            stopped_at: None,
        }
    }

    pub fn start_timer(&mut self) {
        self.started_at = Some(Instant::now());
        self.stopped_at = None;
    }

    pub fn stop_timer(&mut self) {
        self.stopped_at = Some(Instant::now());
    }

    pub fn add_tokens(&mut self, input: u64, output: u64) {
        self.input_tokens += input;
        self.output_tokens += output;
    }

    pub fn input_tokens(&self) -> u64 {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> u64 {
        self.output_tokens
    }

    /// 估算费用（美元）
    pub fn cost(&self) -> f64 {
        let input_cost = (self.input_tokens as f64 / 1_000_000.0) * self.prices.input_price_per_million;
        let output_cost =
            (self.output_tokens as f64 / 1_000_000.0) * self.prices.output_price_per_million;
        input_cost + output_cost
    }

    /// 已停止时为 stop − start，否则为到目前为止的时长；未开始为 0
    pub fn duration(&self) -> Duration {
        match (self.started_at, self.stopped_at) {
            (Some(start), Some(stop)) => stop.saturating_duration_since(start),
            (Some(start), None) => start.elapsed(),
            (None, _) => Duration::ZERO,
        }
    }

    pub fn summary(&self) -> CostSummary {
        CostSummary {
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            cost_estimate_usd: self.cost(),
            duration_seconds: self.duration().as_secs_f64(),
        }
    }
}

impl Default for CostTracker {
    fn default() -> Self {
        Self::new(PriceTable::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_accumulate_and_cost() {
        let mut tracker = CostTracker::default();
        tracker.add_tokens(100, 50);
        tracker.add_tokens(200, 10);

        assert_eq!(tracker.input_tokens(), 300);
        assert_eq!(tracker.output_tokens(), 60);

        let expected = (300.0 / 1_000_000.0) * 0.30 + (60.0 / 1_000_000.0) * 2.50;
        assert_eq!(tracker.cost(), expected);
    }

    #[test]
    fn test_custom_prices() {
        let mut tracker = CostTracker::new(PriceTable {
            input_price_per_million: 1.0,
            output_price_per_million: 2.0,
        });
        tracker.add_tokens(1_000_000, 500_000);
        assert_eq!(tracker.cost(), 2.0);
    }

    #[test]
    fn test_duration_before_start_is_zero() {
        let tracker = CostTracker::default();
        assert_eq!(tracker.duration(), Duration::ZERO);
    }

    #[test]
    fn test_stopped_duration_is_frozen() {
        let mut tracker = CostTracker::default();
        tracker.start_timer();
        std::thread::sleep(Duration::from_millis(5));
        tracker.stop_timer();

        let first = tracker.duration();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(tracker.duration(), first);
        assert!(first >= Duration::from_millis(5));
    }

    #[test]
    fn test_live_duration_grows() {
        let mut tracker = CostTracker::default();
        tracker.start_timer();
        let first = tracker.duration();
        std::thread::sleep(Duration::from_millis(5));
        assert!(tracker.duration() > first);
    }

    #[test]
    fn test_summary_snapshot() {
        let mut tracker = CostTracker::default();
        tracker.add_tokens(10, 20);
        let summary = tracker.summary();

        assert_eq!(summary.input_tokens, 10);
        assert_eq!(summary.output_tokens, 20);
        assert_eq!(summary.cost_estimate_usd, tracker.cost());
        assert_eq!(summary.duration_seconds, 0.0);
        assert_eq!(tracker.input_tokens(), 10);
    }
}
