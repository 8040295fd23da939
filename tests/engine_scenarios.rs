//! End-to-end ranking sessions.
//!
//! Each test drives a full session through the public API, answering the
//! surfaced matchups from a fixed ground-truth order.

use pairwise_ranker::{
    Choice, ItemId, Matchup, RankerError, RankerPolicy, RankingEngine, Resolution,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Every matchup shown to the user during a session.
struct Transcript {
    asked: Vec<Matchup>,
}

/// Answer by position in `truth`, checking each surfaced matchup first.
fn run_session(engine: &mut RankingEngine, truth: &[&str]) -> Transcript {
    let rank = |id: &ItemId| truth.iter().position(|t| *t == id.as_str()).unwrap();
    let mut asked = Vec::new();

    while !engine.is_complete() {
        let m = engine.current_matchup().unwrap();

        // The cache must have intercepted anything already implied
        assert!(
            !engine.beats(m.first.as_str(), m.second.as_str())
                && !engine.beats(m.second.as_str(), m.first.as_str()),
            "asked implied matchup {m}"
        );
        // Both scored means both in the same layer
        if let (Some(a), Some(b)) = (engine.score(m.first.as_str()), engine.score(m.second.as_str())) {
            assert_eq!(a, b, "asked matchup {m} across layers");
        }

        let (w, l) = if rank(&m.first) < rank(&m.second) {
            (m.first.clone(), m.second.clone())
        } else {
            (m.second.clone(), m.first.clone())
        };
        engine.make_choice(&w, &l).unwrap();
        asked.push(m);
        assert!(asked.len() <= truth.len() * truth.len(), "session did not terminate");
    }

    Transcript { asked }
}

fn sorted(engine: &RankingEngine) -> Vec<String> {
    engine.sorting().into_iter().map(ItemId::into_inner).collect()
}

fn start(items: &[&str]) -> RankingEngine {
    let mut engine = RankingEngine::new(items.iter().copied()).unwrap();
    engine.initialize().unwrap();
    engine
}

// ─────────────────────────────────────────────────────────────────────────────
// Basic sessions
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_two_item_session() {
    let mut engine = start(&["a", "b"]);

    let m = engine.current_matchup().unwrap();
    assert!(m.is_pair(&ItemId::from("a"), &ItemId::from("b")));

    engine.make_choice("a", "b").unwrap();
    assert!(engine.is_complete());
    assert_eq!(sorted(&engine), vec!["a", "b"]);
}

#[test]
fn test_three_item_session() {
    let mut engine = start(&["a", "b", "c"]);
    let transcript = run_session(&mut engine, &["a", "b", "c"]);

    assert_eq!(sorted(&engine), vec!["a", "b", "c"]);
    assert_eq!(transcript.asked.len(), 3);
}

#[test]
fn test_reverse_truth_three_items() {
    let mut engine = start(&["a", "b", "c"]);
    run_session(&mut engine, &["c", "b", "a"]);
    assert_eq!(sorted(&engine), vec!["c", "b", "a"]);
}

#[test]
fn test_odd_and_even_pools_keep_every_item() {
    for n in 2..=12 {
        let names: Vec<String> = (0..n).map(|i| format!("item{i:02}")).collect();
        let items: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut truth = items.clone();
        truth.rotate_left(n / 3);

        let mut engine = start(&items);
        run_session(&mut engine, &truth);

        assert_eq!(sorted(&engine), truth, "pool of {n}");
        assert_eq!(engine.unintroduced_len(), 0);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transitivity
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_transitive_pair_never_asked_once_implied() {
    let mut engine = start(&["a", "b", "c"]);
    let transcript = run_session(&mut engine, &["a", "b", "c"]);

    // Once a > b and b > c are both on record, {a, c} is settled
    let ab = transcript
        .asked
        .iter()
        .position(|m| m.is_pair(&"a".into(), &"b".into()))
        .unwrap();
    let bc = transcript
        .asked
        .iter()
        .position(|m| m.is_pair(&"b".into(), &"c".into()))
        .unwrap();
    let settled = ab.max(bc);
    assert!(transcript.asked[settled + 1..]
        .iter()
        .all(|m| !m.is_pair(&"a".into(), &"c".into())));
    assert!(engine.beats("a", "c"));
}

#[test]
fn test_queued_implied_matchup_is_auto_resolved() {
    let mut engine = start(&["a", "c", "b", "d"]);
    let transcript = run_session(&mut engine, &["a", "b", "c", "d"]);

    // a > b is answered once; after pruning the pair ties again and the
    // cache answers the repeat
    assert_eq!(engine.stats().auto_resolutions, 1);
    let ab = Matchup::new("a", "b");
    assert_eq!(transcript.asked.iter().filter(|m| **m == ab).count(), 1);
    assert_eq!(transcript.asked.len(), 5);

    let inferred: Vec<&Choice> = engine
        .history()
        .iter()
        .filter(|r| r.resolution == Resolution::Inferred)
        .map(|r| &r.choice)
        .collect();
    assert_eq!(inferred, vec![&Choice::new("a", "b")]);
    assert_eq!(sorted(&engine), vec!["a", "b", "c", "d"]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Matchup safety
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_cross_layer_pair_never_surfaced() {
    let mut engine = start(&["a", "b", "c"]);
    assert_eq!(engine.current_matchup().unwrap(), Matchup::new("a", "b"));
    engine.make_choice("a", "b").unwrap();

    // c is introduced against the median item
    assert_eq!(engine.current_matchup().unwrap(), Matchup::new("c", "a"));
    engine.make_choice("a", "c").unwrap();

    // a sits above both b and c now
    assert_eq!(engine.score("a"), Some(1));
    assert_eq!(engine.score("c"), Some(0));

    let snapshot = engine.snapshot();
    let ac = Matchup::new("a", "c");
    assert_ne!(snapshot.current_matchup, Some(ac.clone()));
    assert!(!snapshot.queued.contains(&ac));
    assert_eq!(snapshot.current_matchup, Some(Matchup::new("b", "c")));
}

#[test]
fn test_larger_session_only_asks_safe_pairs() {
    let names: Vec<String> = (0..24).map(|i| format!("t{i:02}")).collect();
    let truth: Vec<&str> = names.iter().map(String::as_str).collect();
    let mut items = truth.clone();
    items.reverse();
    items.swap(2, 17);
    items.swap(5, 9);

    let mut engine = start(&items);
    run_session(&mut engine, &truth);

    assert_eq!(sorted(&engine), truth);
    assert!(engine.graph().is_acyclic());
}

// ─────────────────────────────────────────────────────────────────────────────
// Usage errors
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_empty_pool_rejected() {
    let mut engine = RankingEngine::new(Vec::<&str>::new()).unwrap();
    assert_eq!(engine.initialize(), Err(RankerError::EmptyPool));
}

#[test]
fn test_invalid_choice_is_atomic() {
    let mut engine = start(&["a", "b", "c", "d", "e"]);
    engine.make_choice("a", "b").unwrap();
    let before = engine.snapshot();

    let err = engine.make_choice("a", "e").unwrap_err();
    assert!(matches!(err, RankerError::InvalidChoice { .. }));
    assert!(err.is_usage_error());

    let err = engine.make_choice("nope", "a").unwrap_err();
    assert!(matches!(err, RankerError::InvalidChoice { .. }));

    assert_eq!(engine.snapshot(), before);
    assert_eq!(engine.snapshot().fingerprint(), before.fingerprint());
}

#[test]
fn test_choice_after_completion_has_no_matchup() {
    let mut engine = start(&["a", "b"]);
    engine.make_choice("b", "a").unwrap();
    assert_eq!(engine.make_choice("b", "a"), Err(RankerError::NoMatchup));
    assert_eq!(engine.final_sorting(), Some(vec![ItemId::from("b"), ItemId::from("a")]));
}

// ─────────────────────────────────────────────────────────────────────────────
// Policies
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_policies_reach_same_order() {
    let truth = ["f", "a", "d", "b", "e", "c"];
    let items = ["a", "b", "c", "d", "e", "f"];

    for policy in [RankerPolicy::default(), RankerPolicy::sequential()] {
        let mut engine = RankingEngine::with_policy(items, policy.clone()).unwrap();
        engine.initialize().unwrap();
        run_session(&mut engine, &truth);
        assert_eq!(sorted(&engine), truth, "policy {}", policy.pairing);
    }
}

#[test]
fn test_unpruned_graph_keeps_every_answer() {
    let policy = RankerPolicy {
        prune_redundant_edges: false,
        ..RankerPolicy::default()
    };
    let truth = ["a", "b", "c", "d", "e"];
    let mut engine = RankingEngine::with_policy(truth, policy).unwrap();
    engine.initialize().unwrap();
    run_session(&mut engine, &truth);

    assert_eq!(engine.stats().pruned_edges, 0);
    assert_eq!(engine.graph().num_edges(), engine.stats().total_choices());
    assert_eq!(sorted(&engine), truth);
}
