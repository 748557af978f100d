//! Role policy selection is a pure function of the registration sequence.

use lodestar_authz::RolePolicy;
use proptest::prelude::*;

fn pattern() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            4 => prop::sample::select(vec!["admin", "users", "reports", "audit"]).prop_map(str::to_string),
            1 => Just("{id}".to_string()),
        ],
        0..4,
    )
    .prop_map(|segments| {
        let mut seen_param = false;
        let kept: Vec<String> = segments
            .into_iter()
            .filter(|s| {
                if s == "{id}" {
                    let first = !seen_param;
                    seen_param = true;
                    first
                } else {
                    true
                }
            })
            .collect();
        format!("/{}", kept.join("/"))
    })
}

fn request_path() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec!["admin", "users", "reports", "audit", "42"]),
        0..5,
    )
    .prop_map(|segments| format!("/{}", segments.join("/")))
}

fn build(rules: &[(String, String)]) -> RolePolicy {
    let mut policy = RolePolicy::new();
    for (pattern, role) in rules {
        policy.register(pattern, role).unwrap();
    }
    policy
}

proptest! {
    #[test]
    fn same_registrations_give_same_answers(
        rules in prop::collection::vec((pattern(), "[a-c]"), 0..12),
        paths in prop::collection::vec(request_path(), 1..12),
    ) {
        let first = build(&rules);
        let second = build(&rules);
        prop_assert_eq!(&first, &second);
        for path in &paths {
            prop_assert_eq!(first.required_role(path), second.required_role(path));
        }
    }

    #[test]
    fn chosen_rule_always_guards_the_path(
        rules in prop::collection::vec((pattern(), "[a-c]"), 1..12),
        path in request_path(),
    ) {
        let policy = build(&rules);
        if let Some(rule) = policy.rule_for(&path) {
            let pattern = lodestar_router::PathPattern::parse(rule.pattern()).unwrap();
            prop_assert!(pattern.is_prefix_of(&path));
        }
    }

    #[test]
    fn first_registration_wins_for_identical_patterns(
        pattern in pattern(),
        roles in prop::collection::vec("[a-c]", 1..6),
        path in request_path(),
    ) {
        let rules: Vec<(String, String)> =
            roles.iter().map(|role| (pattern.clone(), role.clone())).collect();
        let policy = build(&rules);
        if let Some(role) = policy.required_role(&path) {
            prop_assert_eq!(role, roles[0].as_str());
        }
    }
}
