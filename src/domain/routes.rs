//! DNA substitution in routes templates.
//!
//! A template marks where a DNA goes with a single-quoted anchor, e.g.
//! `('Binance Futures', 'BTC-USDT', '2h', 'MyStrategy', 'DNA_ANCHOR')`.

use crate::domain::error::BtscanError;

/// Single-quoted string literal for `value`.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Replace every quoted `anchor` in `template` with the quoted `dna`.
pub fn inject_dna(template: &str, anchor: &str, dna: &str) -> Result<String, BtscanError> {
    let quoted = format!("'{}'", anchor);
    if !template.contains(&quoted) {
        return Err(BtscanError::RouteAnchorMissing {
            anchor: anchor.to_string(),
        });
    }
    Ok(template.replace(&quoted, &quote_literal(dna)))
}

/// Example route line shown when a template lacks the anchor.
pub fn example_route(anchor: &str) -> String {
    format!("('Bitfinex', 'BTC-USD', '2h', 'myStra', '{}'),", anchor)
}
