//! Fingerprint comparison and log divergence detection.

use std::fmt;

use crate::record::{ActionRecord, Fingerprint};

/// Which fingerprint component diverged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DivergenceKind {
    /// Number of random values drawn.
    RandomCalls,
    /// Next unit id after the command.
    NextUnitId,
    /// Content checksum of randomly resolved objects.
    Checksum,
}

impl fmt::Display for DivergenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DivergenceKind::RandomCalls => "random_calls",
            DivergenceKind::NextUnitId => "next_unit_id",
            DivergenceKind::Checksum => "checksum",
        })
    }
}

/// A single diverging fingerprint component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldDivergence {
    /// Which component.
    pub kind: DivergenceKind,
    /// Value recorded by the peer that executed the command first.
    pub expected: Option<u64>,
    /// Value produced by this execution.
    pub actual: Option<u64>,
}

impl fmt::Display for FieldDivergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<u64>| v.map_or_else(|| "<none>".to_string(), |v| v.to_string());
        write!(
            f,
            "{}: expected {}, found {}",
            self.kind,
            show(self.expected),
            show(self.actual)
        )
    }
}

/// Options for [`compare_fingerprint`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompareOptions {
    /// Accept recorded checkups that carry no `next_unit_id`.
    ///
    /// Older peers did not record it. With this flag set, a missing
    /// recorded value matches anything; without it, the absence itself is
    /// a divergence.
    pub legacy_checkups_without_unit_id: bool,
}

/// Compare the fingerprint recorded in the log against a fresh one.
///
/// Returns every diverging component, or an empty vector on a match.
pub fn compare_fingerprint(
    expected: &Fingerprint,
    actual: &Fingerprint,
    options: CompareOptions,
) -> Vec<FieldDivergence> {
    let mut out = Vec::new();
    if expected.random_calls != actual.random_calls {
        out.push(FieldDivergence {
            kind: DivergenceKind::RandomCalls,
            expected: Some(expected.random_calls),
            actual: Some(actual.random_calls),
        });
    }
    let skip_unit_id = expected.next_unit_id.is_none() && options.legacy_checkups_without_unit_id;
    if !skip_unit_id && expected.next_unit_id != actual.next_unit_id {
        out.push(FieldDivergence {
            kind: DivergenceKind::NextUnitId,
            expected: expected.next_unit_id,
            actual: actual.next_unit_id,
        });
    }
    if expected.checksum != actual.checksum {
        out.push(FieldDivergence {
            kind: DivergenceKind::Checksum,
            expected: expected.checksum,
            actual: actual.checksum,
        });
    }
    out
}

/// Index of the first record at which two logs differ, if any.
///
/// A log that is a strict prefix of the other diverges at its length.
pub fn first_divergence(a: &[ActionRecord], b: &[ActionRecord]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(calls: u64, next: Option<u64>) -> Fingerprint {
        Fingerprint {
            random_calls: calls,
            next_unit_id: next,
            checksum: None,
        }
    }

    #[test]
    fn equal_fingerprints_match() {
        let a = fp(2, Some(5));
        assert!(compare_fingerprint(&a, &a, CompareOptions::default()).is_empty());
    }

    #[test]
    fn reports_both_values() {
        let d = compare_fingerprint(&fp(2, Some(5)), &fp(3, Some(5)), CompareOptions::default());
        assert_eq!(
            d,
            vec![FieldDivergence {
                kind: DivergenceKind::RandomCalls,
                expected: Some(2),
                actual: Some(3),
            }]
        );
        assert_eq!(d[0].to_string(), "random_calls: expected 2, found 3");
    }

    #[test]
    fn missing_unit_id_needs_legacy_flag() {
        let recorded = fp(0, None);
        let fresh = fp(0, Some(9));
        let strict = compare_fingerprint(&recorded, &fresh, CompareOptions::default());
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].kind, DivergenceKind::NextUnitId);

        let legacy = CompareOptions {
            legacy_checkups_without_unit_id: true,
        };
        assert!(compare_fingerprint(&recorded, &fresh, legacy).is_empty());
        // The flag only excuses absence, not a wrong value.
        assert_eq!(
            compare_fingerprint(&fp(0, Some(8)), &fresh, legacy).len(),
            1
        );
    }

    #[test]
    fn checksum_divergence() {
        let mut a = fp(1, Some(2));
        let mut b = a;
        a.checksum = Some(10);
        b.checksum = Some(11);
        let d = compare_fingerprint(&a, &b, CompareOptions::default());
        assert_eq!(d[0].kind, DivergenceKind::Checksum);
    }

    #[test]
    fn first_divergence_finds_index_or_prefix() {
        let a = vec![ActionRecord::new("x"), ActionRecord::new("y")];
        let mut b = a.clone();
        assert_eq!(first_divergence(&a, &b), None);
        b.push(ActionRecord::new("z"));
        assert_eq!(first_divergence(&a, &b), Some(2));
        b[1] = ActionRecord::new("q");
        assert_eq!(first_divergence(&a, &b), Some(1));
    }
}
