//! Per-model cost estimation.
//!
//! Prices are USD per 1K tokens, matched by model-name prefix so dated model
//! releases ("-20250115" suffixes and the like) resolve to their family.
//! Unknown models estimate at a conservative mid-tier rate rather than zero,
//! so spend reports never silently under-count.

use rust_decimal::Decimal;

use super::{Provider, TokenUsage};

/// USD per 1K input/output tokens
struct ModelPrice {
    prefix: &'static str,
    input_per_1k: Decimal,
    output_per_1k: Decimal,
}

const TOKENS_PER_UNIT: i64 = 1000;

fn price_table(provider: Provider) -> &'static [ModelPrice] {
    // from_parts(lo, .., scale) is lo * 10^-scale; e.g. (15, .., 4) = 0.0015
    static OPENAI: &[ModelPrice] = &[
        ModelPrice {
            prefix: "gpt-4o-mini",
            input_per_1k: Decimal::from_parts(15, 0, 0, false, 5),
            output_per_1k: Decimal::from_parts(6, 0, 0, false, 4),
        },
        ModelPrice {
            prefix: "gpt-4o",
            input_per_1k: Decimal::from_parts(25, 0, 0, false, 4),
            output_per_1k: Decimal::from_parts(1, 0, 0, false, 2),
        },
        ModelPrice {
            prefix: "gpt-4",
            input_per_1k: Decimal::from_parts(3, 0, 0, false, 2),
            output_per_1k: Decimal::from_parts(6, 0, 0, false, 2),
        },
        ModelPrice {
            prefix: "gpt-3.5-turbo",
            input_per_1k: Decimal::from_parts(5, 0, 0, false, 4),
            output_per_1k: Decimal::from_parts(15, 0, 0, false, 4),
        },
    ];
    static ANTHROPIC: &[ModelPrice] = &[
        ModelPrice {
            prefix: "claude-3-5-haiku",
            input_per_1k: Decimal::from_parts(8, 0, 0, false, 4),
            output_per_1k: Decimal::from_parts(4, 0, 0, false, 3),
        },
        ModelPrice {
            prefix: "claude-3-haiku",
            input_per_1k: Decimal::from_parts(25, 0, 0, false, 5),
            output_per_1k: Decimal::from_parts(125, 0, 0, false, 5),
        },
        ModelPrice {
            prefix: "claude-3-opus",
            input_per_1k: Decimal::from_parts(15, 0, 0, false, 3),
            output_per_1k: Decimal::from_parts(75, 0, 0, false, 3),
        },
        ModelPrice {
            prefix: "claude",
            input_per_1k: Decimal::from_parts(3, 0, 0, false, 3),
            output_per_1k: Decimal::from_parts(15, 0, 0, false, 3),
        },
    ];
    static GEMINI: &[ModelPrice] = &[
        ModelPrice {
            prefix: "gemini-2.0-flash",
            input_per_1k: Decimal::from_parts(1, 0, 0, false, 4),
            output_per_1k: Decimal::from_parts(4, 0, 0, false, 4),
        },
        ModelPrice {
            prefix: "gemini-1.5-pro",
            input_per_1k: Decimal::from_parts(125, 0, 0, false, 5),
            output_per_1k: Decimal::from_parts(5, 0, 0, false, 3),
        },
        ModelPrice {
            prefix: "gemini",
            input_per_1k: Decimal::from_parts(75, 0, 0, false, 6),
            output_per_1k: Decimal::from_parts(3, 0, 0, false, 4),
        },
    ];

    match provider {
        Provider::Openai => OPENAI,
        Provider::Anthropic => ANTHROPIC,
        Provider::Gemini => GEMINI,
    }
}

// Fallback when no prefix matches: mid-tier rate, applied to both directions.
fn default_price() -> (Decimal, Decimal) {
    (Decimal::from_parts(3, 0, 0, false, 3), Decimal::from_parts(15, 0, 0, false, 3))
}

/// Estimate the USD cost of a call from its token usage.
pub fn estimate_cost(provider: Provider, model: &str, usage: &TokenUsage) -> Decimal {
    let (input_per_1k, output_per_1k) = price_table(provider)
        .iter()
        .find(|price| model.starts_with(price.prefix))
        .map(|price| (price.input_per_1k, price.output_per_1k))
        .unwrap_or_else(default_price);

    let tokens_per_unit = Decimal::from(TOKENS_PER_UNIT);
    let input_cost = Decimal::from(usage.prompt_tokens) * input_per_1k / tokens_per_unit;
    let output_cost = Decimal::from(usage.completion_tokens) * output_per_1k / tokens_per_unit;

    input_cost + output_cost
}
