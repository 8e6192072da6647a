//! Property tests for document paths.

use proptest::prelude::*;
use veneer_core::{DocPath, PathSegment};

fn segment_strategy() -> impl Strategy<Value = PathSegment> {
    prop_oneof![
        "[a-z][a-z0-9_]{0,7}".prop_map(PathSegment::Key),
        (0usize..20).prop_map(PathSegment::Index),
    ]
}

proptest! {
    /// Display and parse are inverses for well-formed paths.
    #[test]
    fn display_parse_round_trip(
        segments in prop::collection::vec(segment_strategy(), 1..8)
    ) {
        let path = DocPath::from_segments(segments);
        let reparsed: DocPath = path.to_string().parse().unwrap();
        prop_assert_eq!(reparsed, path);
    }

    /// Ancestor/descendant relations agree and are strict-order shaped.
    #[test]
    fn ancestry_is_consistent(
        base in prop::collection::vec(segment_strategy(), 1..5),
        extra in prop::collection::vec(segment_strategy(), 1..4)
    ) {
        let parent = DocPath::from_segments(base.clone());
        let mut all = base;
        all.extend(extra);
        let child = DocPath::from_segments(all);

        prop_assert!(parent.is_strict_ancestor_of(&child));
        prop_assert!(child.is_strict_descendant_of(&parent));
        prop_assert!(!child.is_strict_ancestor_of(&parent));
        prop_assert!(!parent.is_strict_ancestor_of(&parent));
        prop_assert!(parent.is_ancestor_of(&parent));
    }
}
