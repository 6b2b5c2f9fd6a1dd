//! Shared generators for property tests.
//!
//! Random layouts are generated as *documents*: the text form is the one
//! place where every structural rule (ring order, one member per row,
//! unique keycodes) is easy to satisfy by construction, and going
//! through the parser means the generators can never build a structure
//! the engine itself would refuse to load.

// Each test binary uses a different subset of the helpers.
#![allow(dead_code)]

use proptest::prelude::*;

/// Sixteenths of a key unit, the engine's snap step.
pub fn unit(n16: u32) -> f64 {
    f64::from(n16) / 16.0
}

fn fmt(n16: u32) -> String {
    keyplane::units::format_units(unit(n16))
}

/// One plain key: width and leading glue in sixteenths.
#[derive(Clone, Debug)]
pub struct KeyPlan {
    pub w16: u32,
    pub g16: u32,
}

/// One multirow key: top row, total rows spanned, member sizing.
#[derive(Clone, Debug)]
pub struct ChainPlan {
    pub start: usize,
    pub span: usize,
    /// `None` inherits the parent width; `Some` sizes every member.
    pub sized: Option<(u32, bool)>,
    pub w16: u32,
    pub g16: u32,
}

#[derive(Clone, Debug)]
pub struct DocPlan {
    pub rows: Vec<Vec<KeyPlan>>,
    pub chains: Vec<ChainPlan>,
    pub heights: Vec<u32>,
}

impl DocPlan {
    /// Render the plan as a parseable document.
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut keycode = 10u32;
        for (r, keys) in self.rows.iter().enumerate() {
            if self.heights[r] != 16 {
                out.push_str(&fmt(self.heights[r]));
                out.push(' ');
            }
            let mut tokens: Vec<String> = Vec::new();
            // Members of chains opened above, in open order.
            for chain in &self.chains {
                if r > chain.start && r < chain.start + chain.span {
                    let letter = if r == chain.start + chain.span - 1 {
                        'E'
                    } else {
                        'S'
                    };
                    let body = match chain.sized {
                        Some((w16, right)) => {
                            format!("W: {}, {}", fmt(w16), if right { 'R' } else { 'L' })
                        }
                        None => String::new(),
                    };
                    tokens.push(format!("{letter}({body})"));
                }
            }
            for key in keys {
                let mut body = format!("{keycode}");
                keycode += 1;
                if key.w16 != 16 {
                    body.push_str(&format!(", W: {}", fmt(key.w16)));
                }
                if key.g16 != 0 {
                    body.push_str(&format!(", UG: {}", fmt(key.g16)));
                }
                tokens.push(format!("K({body})"));
            }
            for chain in &self.chains {
                if r == chain.start {
                    let mut body = format!("{keycode}");
                    keycode += 1;
                    if chain.w16 != 16 {
                        body.push_str(&format!(", W: {}", fmt(chain.w16)));
                    }
                    if chain.g16 != 0 {
                        body.push_str(&format!(", UG: {}", fmt(chain.g16)));
                    }
                    tokens.push(format!("P({body})"));
                }
            }
            out.push_str(&tokens.join(" "));
            out.push_str(";\n");
        }
        out
    }
}

fn key_plan() -> impl Strategy<Value = KeyPlan> {
    (4u32..=40, 0u32..=16).prop_map(|(w16, g16)| KeyPlan { w16, g16 })
}

fn chain_plan(rows: usize) -> impl Strategy<Value = ChainPlan> {
    (
        0..rows.max(1),
        2usize..=3,
        prop::option::of((8u32..=40, any::<bool>())),
        8u32..=40,
        0u32..=16,
    )
        .prop_map(move |(start, span, sized, w16, g16)| ChainPlan {
            start,
            span: span.min(rows.saturating_sub(start)),
            sized,
            w16,
            g16,
        })
}

/// A random well-formed document with up to five rows and a couple of
/// multirow keys.
pub fn doc_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::collection::vec(key_plan(), 1..6), 1..5).prop_flat_map(|rows| {
        let nrows = rows.len();
        (
            Just(rows),
            prop::collection::vec(chain_plan(nrows), 0..3),
            prop::collection::vec(prop_oneof![Just(16u32), Just(8), Just(24), Just(32)], nrows),
        )
            .prop_map(|(rows, chains, heights)| {
                let chains: Vec<ChainPlan> =
                    chains.into_iter().filter(|c| c.span >= 2).collect();
                DocPlan {
                    rows,
                    chains,
                    heights,
                }
                .text()
            })
    })
}
