//! Generation of unique name prefixes for synthesized nodes and values.

use std::collections::BTreeSet;
use std::ops::Bound;

/// Issues name prefixes that no existing name in a graph starts with.
///
/// Prefixes have the form `lower_{n}_`, where `n` increases with each call.
/// Since no issued prefix is a prefix of another, names built by appending
/// suffixes to different prefixes never collide with each other, nor with any
/// name the generator was seeded with.
pub struct NameGen {
    existing: BTreeSet<String>,
    next: usize,
}

impl NameGen {
    /// Create a generator which avoids the names in `existing`.
    pub fn new<S: Into<String>>(existing: impl IntoIterator<Item = S>) -> Self {
        NameGen {
            existing: existing.into_iter().map(Into::into).collect(),
            next: 0,
        }
    }

    /// Return true if any existing name starts with `prefix`.
    fn is_prefix_used(&self, prefix: &str) -> bool {
        // Names starting with `prefix` sort directly after it.
        self.existing
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .next()
            .is_some_and(|name| name.starts_with(prefix))
    }

    /// Return a new prefix for synthesized names.
    pub fn next_prefix(&mut self) -> String {
        loop {
            let prefix = format!("lower_{}_", self.next);
            self.next += 1;
            if !self.is_prefix_used(&prefix) {
                return prefix;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NameGen;

    #[test]
    fn test_next_prefix() {
        struct Case<'a> {
            existing: &'a [&'a str],
            expected: &'a [&'a str],
        }

        let cases = [
            Case {
                existing: &[],
                expected: &["lower_0_", "lower_1_", "lower_2_"],
            },
            Case {
                existing: &["x", "lower_0_shape_a", "lower_1_"],
                expected: &["lower_2_", "lower_3_"],
            },
            // Names which share a prefix with a candidate without starting
            // with the whole candidate don't block it.
            Case {
                existing: &["lower_0", "lower_01_x", "lower_"],
                expected: &["lower_0_", "lower_1_"],
            },
            Case {
                existing: &["lower_1_p", "lower_3_q"],
                expected: &["lower_0_", "lower_2_", "lower_4_"],
            },
        ];

        for Case { existing, expected } in cases {
            let mut names = NameGen::new(existing.iter().copied());
            let prefixes: Vec<_> = (0..expected.len()).map(|_| names.next_prefix()).collect();
            assert_eq!(prefixes, expected, "existing names {:?}", existing);
        }
    }
}
