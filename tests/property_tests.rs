use cvrisk_trends::model::SignificanceTier;
use cvrisk_trends::normalizer::{is_significant, significance_tier};
use cvrisk_trends::parser::{Parser, RegressionLogParser, NO_DATA};
use proptest::prelude::*;

fn data_line(age: u32, coefficient: f64) -> String {
    format!(
        "x_{},{}({} to {}),0.04,0.01,1000,10",
        age,
        coefficient,
        coefficient - 0.5,
        coefficient + 0.5
    )
}

proptest! {
    #[test]
    fn prop_parsed_lines_are_sorted_and_complete(
        pairs in prop::collection::btree_map(0u32..60, -5.0f64..5.0, 1..25)
            .prop_map(|m| m.into_iter().collect::<Vec<_>>())
            .prop_shuffle()
    ) {
        let text: String = pairs.iter().map(|(a, c)| data_line(*a, *c) + "\n").collect();
        let obs = RegressionLogParser::new().parse_block("x", &text).unwrap();

        prop_assert_eq!(obs.len(), pairs.len());
        prop_assert!(obs.windows(2).all(|w| w[0].age <= w[1].age));
        for (age, coefficient) in &pairs {
            let found = obs.iter().find(|o| o.age == *age).unwrap();
            prop_assert_eq!(found.coefficient(), Some(*coefficient));
        }
    }

    #[test]
    fn prop_no_data_lines_have_no_fit(
        ages in prop::collection::btree_set(0u32..60, 1..30),
        mask in prop::collection::vec(any::<bool>(), 30)
    ) {
        let mut sentinels = 0;
        let mut text = String::new();
        for (i, age) in ages.iter().enumerate() {
            if mask[i] {
                sentinels += 1;
                text.push_str(&format!("x_{},{}\n", age, NO_DATA));
            } else {
                text.push_str(&data_line(*age, 0.1));
                text.push('\n');
            }
        }
        let obs = RegressionLogParser::new().parse_block("x", &text).unwrap();
        prop_assert_eq!(obs.iter().filter(|o| o.is_no_data()).count(), sentinels);
        prop_assert_eq!(obs.iter().filter(|o| o.fit.is_some()).count(), ages.len() - sentinels);
    }

    #[test]
    fn prop_tier_is_monotone(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(significance_tier(Some(low)) >= significance_tier(Some(high)));
    }

    #[test]
    fn prop_tier_agrees_with_significance(p in 0.0f64..=1.0) {
        let tier = significance_tier(Some(p));
        prop_assert_eq!(tier != SignificanceTier::None, is_significant(Some(p)));
    }
}

#[test]
fn test_absent_p_value_has_no_tier() {
    assert_eq!(significance_tier(None), SignificanceTier::None);
    assert!(!is_significant(None));
}
