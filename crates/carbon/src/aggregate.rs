use std::collections::BTreeMap;

use crate::decimal::Decimal;
use crate::footprint::{CarbonFootprint, Scope, clamp_confidence};

pub const AGGREGATED_METHODOLOGY: &str = "Aggregated calculation";

/// Combine footprints into one.
///
/// - totals, scopes and breakdown categories are summed exactly;
/// - a scope is `None` only when no input declared it;
/// - confidence is the total-weighted mean `Σ(cᵢ·tᵢ) / Σtᵢ`, or 0 when the
///   grand total is zero.
///
/// The result does not depend on input order: confidence terms are summed
/// after sorting by `(total, confidence)`.
pub fn aggregate(footprints: &[CarbonFootprint]) -> CarbonFootprint {
    let total: Decimal = footprints.iter().map(|fp| fp.total_co2e).sum();

    let mut combined = CarbonFootprint::new(
        total,
        AGGREGATED_METHODOLOGY,
        weighted_confidence(footprints, total),
    );

    for scope in Scope::ALL {
        let declared: Option<Decimal> = footprints
            .iter()
            .filter_map(|fp| fp.scope(scope))
            .fold(None, |acc, v| Some(acc.unwrap_or(Decimal::ZERO) + v));
        if let Some(value) = declared {
            combined = combined.with_scope(scope, value);
        }
    }

    let mut breakdown: BTreeMap<String, Decimal> = BTreeMap::new();
    for (category, value) in footprints.iter().flat_map(|fp| fp.breakdown.iter()) {
        *breakdown.entry(category.clone()).or_default() += *value;
    }
    combined.breakdown = breakdown;

    combined
}

fn weighted_confidence(footprints: &[CarbonFootprint], total: Decimal) -> f64 {
    if total.is_zero() {
        return 0.0;
    }

    let mut terms: Vec<(Decimal, f64)> = footprints
        .iter()
        .map(|fp| (fp.total_co2e, fp.confidence_level))
        .collect();
    terms.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let grand = total.to_f64();
    let weighted: f64 = terms
        .iter()
        .map(|(t, c)| c * (t.to_f64() / grand))
        .sum();
    clamp_confidence(weighted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn empty_input_is_zero_with_no_scopes() {
        let fp = aggregate(&[]);
        assert_eq!(fp.total_co2e, Decimal::ZERO);
        assert_eq!(fp.confidence_level, 0.0);
        assert_eq!(fp.scope1, None);
        assert_eq!(fp.scope2, None);
        assert_eq!(fp.scope3, None);
        assert_eq!(fp.methodology, "Aggregated calculation");
    }

    #[test]
    fn weights_confidence_by_total() {
        let a = CarbonFootprint::new(d("10"), "a", 0.8).with_scope(Scope::Scope2, d("10"));
        let b = CarbonFootprint::new(d("30"), "b", 0.4).with_scope(Scope::Scope3, d("30"));
        let fp = aggregate(&[a, b]);

        assert_eq!(fp.total_co2e, d("40"));
        assert_eq!(fp.scope1, None);
        assert_eq!(fp.scope2, Some(d("10")));
        assert_eq!(fp.scope3, Some(d("30")));
        assert!((fp.confidence_level - 0.5).abs() < 1e-12);
    }

    #[test]
    fn single_input_keeps_its_confidence() {
        let only = CarbonFootprint::new(d("7.3"), "x", 0.65);
        assert_eq!(aggregate(&[only]).confidence_level, 0.65);
    }

    #[test]
    fn zero_total_gives_zero_confidence() {
        let zero = CarbonFootprint::new(Decimal::ZERO, "x", 0.9);
        assert_eq!(aggregate(&[zero.clone(), zero]).confidence_level, 0.0);
    }

    #[test]
    fn breakdown_categories_are_summed() {
        let a = CarbonFootprint::new(d("2"), "a", 0.7).with_breakdown("energy", d("2"));
        let b = CarbonFootprint::new(d("3"), "b", 0.7)
            .with_breakdown("energy", d("1"))
            .with_breakdown("water", d("2"));
        let fp = aggregate(&[a, b]);
        assert_eq!(fp.breakdown.get("energy"), Some(&d("3")));
        assert_eq!(fp.breakdown.get("water"), Some(&d("2")));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn footprint() -> impl Strategy<Value = CarbonFootprint> {
            (
                0i64..1_000_000_000_000,
                0.0f64..=1.0,
                prop::option::of(0i64..1_000_000_000),
                prop::option::of(0i64..1_000_000_000),
                prop::option::of(0i64..1_000_000_000),
            )
                .prop_map(|(total, confidence, s1, s2, s3)| {
                    let mut fp =
                        CarbonFootprint::new(Decimal::from_micros(total), "generated", confidence);
                    fp.scope1 = s1.map(Decimal::from_micros);
                    fp.scope2 = s2.map(Decimal::from_micros);
                    fp.scope3 = s3.map(Decimal::from_micros);
                    fp
                })
        }

        fn shuffled() -> impl Strategy<Value = (Vec<CarbonFootprint>, Vec<CarbonFootprint>)> {
            prop::collection::vec(footprint(), 0..24).prop_flat_map(|original| {
                let permuted = Just(original.clone()).prop_shuffle();
                (Just(original), permuted)
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: aggregation is invariant under permutation of its input.
            #[test]
            fn aggregation_is_order_independent((original, permuted) in shuffled()) {
                prop_assert_eq!(aggregate(&original), aggregate(&permuted));
            }

            /// Property: the aggregate total is the exact sum of input totals and
            /// confidence stays within [0, 1].
            #[test]
            fn total_is_exact_and_confidence_bounded(inputs in prop::collection::vec(footprint(), 0..24)) {
                let fp = aggregate(&inputs);
                let expected: i64 = inputs.iter().map(|f| f.total_co2e.micros()).sum();
                prop_assert_eq!(fp.total_co2e.micros(), expected);
                prop_assert!((0.0..=1.0).contains(&fp.confidence_level));
            }

            /// Property: a scope is declared on the aggregate iff some input declared it.
            #[test]
            fn scope_presence_follows_inputs(inputs in prop::collection::vec(footprint(), 0..24)) {
                let fp = aggregate(&inputs);
                for scope in Scope::ALL {
                    let any_declared = inputs.iter().any(|f| f.scope(scope).is_some());
                    prop_assert_eq!(fp.scope(scope).is_some(), any_declared);
                }
            }
        }
    }
}
