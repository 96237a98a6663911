//! Stochastic content generators for test variations
//!
//! Uses seeded RNG for reproducibility. Print seed on failure for replay.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded generator for reproducible stochastic tests
pub struct Gen {
    pub rng: StdRng,
    pub seed: u64,
}

impl Gen {
    /// Create with specific seed (for reproduction)
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create from environment or random seed
    pub fn from_env_or_random() -> Self {
        let seed = std::env::var("ASTN_TEST_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(rand::random);
        Self::new(seed)
    }

    /// Geometric distribution: count until rand > alpha
    /// Returns 0, 1, 2, ... with decreasing probability
    pub fn geometric(&mut self, alpha: f64) -> usize {
        let mut n = 0;
        while self.rng.gen::<f64>() < alpha {
            n += 1;
        }
        n
    }

    /// Poisson-like count (simplified)
    pub fn poisson(&mut self, lambda: f64) -> usize {
        let l = (-lambda).exp();
        let mut k = 0;
        let mut p = 1.0;
        loop {
            k += 1;
            p *= self.rng.gen::<f64>();
            if p <= l {
                break;
            }
        }
        k - 1
    }

    /// Random boolean with probability p
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen::<f64>() < p
    }

    /// Split text into chunks of geometric length, on character boundaries.
    pub fn split<'t>(&mut self, text: &'t str) -> Vec<&'t str> {
        let mut chunks = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            let chars = 1 + self.geometric(0.7);
            let len = rest
                .char_indices()
                .nth(chars)
                .map_or(rest.len(), |(i, _)| i);
            let (chunk, tail) = rest.split_at(len);
            chunks.push(chunk);
            rest = tail;
        }
        chunks
    }

    /// Run of spaces and tabs, possibly empty.
    pub fn whitespace(&mut self) -> String {
        (0..self.geometric(0.5))
            .map(|_| if self.chance(0.8) { ' ' } else { '\t' })
            .collect()
    }

    /// Blank lines, usually none
    pub fn blank_lines(&mut self) -> String {
        let mut out = String::new();
        for _ in 0..self.geometric(0.3) {
            out.push_str(&self.whitespace());
            out.push(if self.chance(0.8) { '\n' } else { '\r' });
        }
        out
    }

    /// Random key (letters, digits, underscore)
    pub fn key(&mut self) -> String {
        let len = 1 + self.geometric(0.7);
        let chars = b"abcdefghijklmnopqrstuvwxyz0123456789_";
        let mut key = String::with_capacity(len);
        key.push(self.rng.gen_range('a'..='z'));
        for _ in 1..len {
            key.push(chars[self.rng.gen_range(0..chars.len())] as char);
        }
        key
    }

    /// Random scalar in any string form
    pub fn scalar(&mut self) -> String {
        match self.rng.gen_range(0..6) {
            0 => self.rng.gen_range(-9999..9999).to_string(),
            1 => ["true", "false", "null"][self.rng.gen_range(0..3)].to_string(),
            2 => format!("\"{}\"", self.key()),
            3 => format!("'{}'", self.key()),
            4 => format!("`{}\n{}`", self.key(), self.key()),
            _ => format!("\"\\t{}\\u0041\"", self.key()),
        }
    }

    /// Random well-formed value, nesting at most `depth` levels
    pub fn value(&mut self, depth: usize) -> String {
        if depth == 0 {
            return self.scalar();
        }
        match self.rng.gen_range(0..5) {
            0 => {
                let (open, close) = if self.chance(0.8) { ('[', ']') } else { ('<', '>') };
                let items: Vec<String> =
                    (0..self.geometric(0.6)).map(|_| self.value(depth - 1)).collect();
                format!("{}{}{}", open, items.join(", "), close)
            }
            1 => {
                let (open, close) = if self.chance(0.8) { ('{', '}') } else { ('(', ')') };
                let mut body = Vec::new();
                for _ in 0..self.geometric(0.6) {
                    let colon = if self.chance(0.7) { ": " } else { " " };
                    body.push(format!("\"{}\"{}{}", self.key(), colon, self.value(depth - 1)));
                }
                format!("{}{}{}", open, body.join(", "), close)
            }
            2 => format!("| '{}' {}", self.key(), self.value(depth - 1)),
            3 => format!("/* {} */ {}", self.key(), self.value(depth - 1)),
            _ => self.scalar(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reproducibility() {
        let mut g1 = Gen::new(42);
        let mut g2 = Gen::new(42);

        for _ in 0..10 {
            assert_eq!(g1.value(3), g2.value(3));
            assert_eq!(g1.geometric(0.9), g2.geometric(0.9));
        }
    }

    #[test]
    fn test_split_preserves_text() {
        let mut gen = Gen::new(7);
        let text = "{ \"é\": [1, '✓'] }";
        for _ in 0..20 {
            assert_eq!(gen.split(text).concat(), text);
        }
    }
}
