//! Property tests for save/load round trips.

use proptest::prelude::*;
use rampart_acl::{Adapter, PolicyModel};

use crate::common::memory_adapter;

fn rule_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z0-9_]{1,8}", 1..=5)
}

fn model_strategy() -> impl Strategy<Value = PolicyModel> {
    let entry = (
        prop_oneof![Just("p"), Just("p2"), Just("g"), Just("g2")],
        rule_strategy(),
    );
    prop::collection::vec(entry, 0..24).prop_map(|entries| {
        let mut model = PolicyModel::new();
        for (ptype, rule) in entries {
            model.add_rule(&ptype[..1], ptype, rule);
        }
        model
    })
}

proptest! {
    #[test]
    fn test_save_then_load_reproduces_model(model in model_strategy()) {
        let loaded = tokio_test::block_on(async {
            let adapter = memory_adapter().await;
            adapter.save_policy(&model).await.unwrap();
            let mut loaded = PolicyModel::new();
            adapter.load_policy(&mut loaded).await.unwrap();
            loaded
        });
        prop_assert_eq!(loaded, model);
    }

    #[test]
    fn test_add_rule_keeps_first_five_tokens(
        rule in prop::collection::vec("[a-z]{1,4}", 0..10)
    ) {
        let loaded = tokio_test::block_on(async {
            let adapter = memory_adapter().await;
            adapter.add_policy("p", "p", &rule).await.unwrap();
            let mut loaded = PolicyModel::new();
            adapter.load_policy(&mut loaded).await.unwrap();
            loaded
        });
        let expected: Vec<String> = rule.iter().take(5).cloned().collect();
        prop_assert_eq!(loaded.rules("p", "p"), &[expected][..]);
    }
}
