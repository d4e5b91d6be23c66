// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Order laws for execution points: irreflexive, antisymmetric, transitive,
//! and `equals` agrees with "neither precedes the other".

use proptest::prelude::*;
use replay_protocol::{ExecutionPoint, Position};

fn position() -> impl Strategy<Value = Option<Position>> {
    prop::option::of(
        (
            prop::sample::select(vec!["Break", "OnStep", "OnPop"]),
            0u64..4,
            0u64..40,
            0u32..3,
        )
            .prop_map(|(kind, script, offset, frame_index)| Position {
                kind: kind.to_string(),
                script,
                offset,
                frame_index,
            }),
    )
}

fn point() -> impl Strategy<Value = ExecutionPoint> {
    // Small domains so that ties on checkpoint/progress actually occur.
    (1u32..4, prop::sample::select(vec![0.0, 0.5, 1.0, 7.0]), position()).prop_map(
        |(checkpoint, progress, position)| ExecutionPoint {
            checkpoint,
            progress,
            position,
        },
    )
}

proptest! {
    #[test]
    fn precedes_is_irreflexive(a in point()) {
        prop_assert!(!a.precedes(&a));
        prop_assert!(a.equals(&a));
    }

    #[test]
    fn precedes_is_antisymmetric(a in point(), b in point()) {
        prop_assert!(!(a.precedes(&b) && b.precedes(&a)));
    }

    #[test]
    fn precedes_is_transitive(a in point(), b in point(), c in point()) {
        if a.precedes(&b) && b.precedes(&c) {
            prop_assert!(a.precedes(&c));
        }
    }

    #[test]
    fn equals_is_mutual_non_precedence(a in point(), b in point()) {
        prop_assert_eq!(a.equals(&b), !a.precedes(&b) && !b.precedes(&a));
    }

    #[test]
    fn equal_points_have_equal_keys(a in point(), b in point()) {
        if a.equals(&b) {
            prop_assert_eq!(a.to_comparable_string(), b.to_comparable_string());
        }
    }
}
