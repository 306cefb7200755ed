//! Token and cost accounting

use serde::Serialize;

use crate::config::Pricing;

/// Input/output token counts for one call, one conversation or one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
}

impl TokenUsage {
    pub fn new(input_tokens: i64, output_tokens: i64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total_tokens(&self) -> i64 {
        self.input_tokens + self.output_tokens
    }

    pub fn input_cost(&self, pricing: &Pricing) -> f64 {
        per_million(self.input_tokens, pricing.input_per_million)
    }

    pub fn output_cost(&self, pricing: &Pricing) -> f64 {
        per_million(self.output_tokens, pricing.output_per_million)
    }

    pub fn total_cost(&self, pricing: &Pricing) -> f64 {
        self.input_cost(pricing) + self.output_cost(pricing)
    }
}

fn per_million(tokens: i64, rate: f64) -> f64 {
    tokens as f64 / 1_000_000.0 * rate
}

/// Dollar cost of a call
pub fn calculate_cost(input_tokens: i64, output_tokens: i64, pricing: &Pricing) -> f64 {
    TokenUsage::new(input_tokens, output_tokens).total_cost(pricing)
}

/// One line of the sidebar usage panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageLine {
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
    pub cost: f64,
    /// e.g. "12,345"
    pub input_display: String,
    pub output_display: String,
    /// e.g. "$0.0123"
    pub cost_display: String,
}

impl UsageLine {
    pub fn new(usage: TokenUsage, pricing: &Pricing) -> Self {
        let cost = usage.total_cost(pricing);
        Self {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            total_tokens: usage.total_tokens(),
            cost,
            input_display: format_thousands(usage.input_tokens),
            output_display: format_thousands(usage.output_tokens),
            cost_display: format_cost(cost),
        }
    }
}

/// Usage for the open conversation and the user's all-time totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSummary {
    pub conversation: Option<UsageLine>,
    pub all_time: UsageLine,
}

impl UsageSummary {
    pub fn new(conversation: Option<TokenUsage>, all_time: TokenUsage, pricing: &Pricing) -> Self {
        Self {
            conversation: conversation.map(|usage| UsageLine::new(usage, pricing)),
            all_time: UsageLine::new(all_time, pricing),
        }
    }
}

/// Group digits in threes: 1234567 -> "1,234,567"
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

pub fn format_cost(cost: f64) -> String {
    format!("${:.4}", cost)
}
