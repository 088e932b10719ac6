use std::collections::BTreeMap;

use crate::error::FormatterError;

/// Maps integers to labels by divisibility rules
#[derive(Debug, Default, Clone)]
pub struct RuleFormatter {
    rules: BTreeMap<u64, String>,
}

impl RuleFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins for a given divisor.
    pub fn add_rule(&mut self, divisor: u64, label: impl Into<String>) -> Result<(), FormatterError> {
        if divisor == 0 {
            return Err(FormatterError::ZeroDivisor);
        }
        self.rules.insert(divisor, label.into());
        Ok(())
    }

    /// An exact divisor match wins outright. Otherwise labels of every
    /// dividing rule are joined in ascending divisor order. Falls back to
    /// the decimal form of `n`.
    pub fn generate(&self, n: u64) -> String {
        if let Some(label) = self.rules.get(&n) {
            return label.clone();
        }

        let mut matched = false;
        let mut out = String::new();
        for (divisor, label) in &self.rules {
            if n % divisor == 0 {
                matched = true;
                out.push_str(label);
            }
        }

        if matched {
            out
        } else {
            n.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fizzbuzz() -> RuleFormatter {
        let mut f = RuleFormatter::new();
        f.add_rule(5, "Buzz").unwrap();
        f.add_rule(3, "Fizz").unwrap();
        f
    }

    #[test]
    fn divisors_concatenate_in_ascending_order() {
        let f = fizzbuzz();
        assert_eq!(f.generate(1), "1");
        assert_eq!(f.generate(9), "Fizz");
        assert_eq!(f.generate(10), "Buzz");
        assert_eq!(f.generate(30), "FizzBuzz");
    }

    #[test]
    fn exact_match_takes_precedence() {
        let mut f = fizzbuzz();
        f.add_rule(15, "Fifteen").unwrap();
        assert_eq!(f.generate(15), "Fifteen");
        assert_eq!(f.generate(45), "FizzBuzzFifteen");
        assert_eq!(f.generate(3), "Fizz");
    }

    #[test]
    fn last_rule_wins_and_zero_is_rejected() {
        let mut f = fizzbuzz();
        f.add_rule(3, "Fuzz").unwrap();
        assert_eq!(f.generate(6), "Fuzz");
        assert_eq!(f.add_rule(0, "Never"), Err(FormatterError::ZeroDivisor));
    }
}
