use double_chance_lib::bracket::{BracketState, Section, Stage};
use double_chance_lib::competitor::{Competitor, Hand};
use double_chance_lib::ledger::MatchRecord;
use double_chance_lib::pairing::Pairing;
use double_chance_lib::progression::TransitionOutcome;
use proptest::prelude::*;

fn roster(n: u32) -> Vec<Competitor> {
    (1..=n)
        .map(|id| Competitor::new(id, format!("Name{id}"), format!("Surname{id}"), 25, Hand::Right))
        .collect()
}

/// Decide every pending match of the round, taking the first or second
/// competitor according to the next bit of `picks`.
fn play_round(state: &mut BracketState, picks: &[bool], cursor: &mut usize) {
    for (section, index) in state.pending_matches() {
        let pairing = state
            .pairings(section)
            .into_iter()
            .find(|p| p.index() == index)
            .unwrap();
        let Pairing::Match { first, second, .. } = pairing else {
            panic!("a bye was left pending");
        };
        let first_wins = picks.get(*cursor % picks.len().max(1)).copied().unwrap_or(true);
        *cursor += 1;
        let (winner, loser) = if first_wins { (first, second) } else { (second, first) };
        state.record_match_result(section, index, winner, loser).unwrap();
    }
}

/// Rounds allowed for `n` competitors: two rounds per halving (top and
/// bottom drain in step) plus semifinal, final and super-final.
fn round_budget(n: u32) -> u32 {
    2 * n.next_power_of_two().trailing_zeros() + 3
}

fn run_to_completion(n: u32, picks: &[bool]) -> (BracketState, u32) {
    let mut state = BracketState::initialize(roster(n)).unwrap();
    let mut cursor = 0;
    let mut advances = 0;
    loop {
        play_round(&mut state, picks, &mut cursor);
        advances += 1;
        assert!(
            advances <= round_budget(n),
            "bracket of {n} needed more than {} rounds",
            round_budget(n)
        );
        if let TransitionOutcome::TournamentComplete { .. } = state.advance_round().unwrap() {
            return (state, advances);
        }
    }
}

proptest! {
    #[test]
    fn test_every_bracket_finishes_with_one_survivor(
        n in 2u32..48,
        picks in proptest::collection::vec(any::<bool>(), 1..64)
    ) {
        let (state, advances) = run_to_completion(n, &picks);
        let champion = state.champion().unwrap();

        prop_assert_eq!(state.active_count(), 1);
        prop_assert!(!state.competitor(champion).unwrap().eliminated());
        prop_assert_eq!(state.history().len() as u32, advances);
        prop_assert_eq!(state.ranking()[0].display_name.clone(), state.competitor(champion).unwrap().display_name());

        // every real match hands out exactly one loss
        let losses: u32 = state.participants().iter().map(|c| c.losses()).sum();
        prop_assert!(losses <= 2 * n);
        prop_assert_eq!(losses, 2 * (n - 1) + state.competitor(champion).unwrap().losses());
    }

    #[test]
    fn test_corrections_never_accumulate(
        n in 2u32..32,
        flips in proptest::collection::vec(any::<bool>(), 1..16)
    ) {
        let mut state = BracketState::initialize(roster(n)).unwrap();
        let pairings = state.pairings(Section::Top);
        for flip in &flips {
            for pairing in &pairings {
                if let Pairing::Match { index, first, second } = *pairing {
                    let (winner, loser) = if *flip { (first, second) } else { (second, first) };
                    let record = state.record_match_result(Section::Top, index, winner, loser).unwrap();
                    let reverted_to_self = matches!(record, MatchRecord::Corrected { previous } if previous == winner);
                    prop_assert!(!reverted_to_self, "correction reported the new winner as superseded");
                }
            }
        }

        let matches = pairings.iter().filter(|p| !p.is_bye()).count() as u32;
        let byes = pairings.len() as u32 - matches;
        let wins: u32 = state.participants().iter().map(|c| c.wins()).sum();
        let losses: u32 = state.participants().iter().map(|c| c.losses()).sum();
        prop_assert_eq!(wins, matches + byes);
        prop_assert_eq!(losses, matches);
        prop_assert!(state.is_round_complete());
    }
}

#[test]
fn test_completed_bracket_is_frozen() {
    let (mut state, _) = run_to_completion(5, &[true, false, false]);
    let champion = state.champion().unwrap();
    let frozen = state.clone();

    assert_eq!(
        state.advance_round().unwrap(),
        TransitionOutcome::TournamentComplete { champion }
    );
    assert!(state.record_match_result(Section::Top, 0, 1, 2).is_err());
    assert_eq!(state, frozen);
}

#[test]
fn test_top_finalist_always_wins_means_no_super_final() {
    for n in 2..20 {
        let (state, _) = run_to_completion(n, &[true]);
        assert!(state.history().iter().all(|round| round.stage != Stage::SuperFinal));
        assert_eq!(state.history().last().unwrap().stage, Stage::Final);
    }
}

#[test]
fn test_large_brackets_finish_in_logarithmic_rounds() {
    for n in [64, 128, 257, 1000] {
        for picks in [[true], [false]] {
            let (state, advances) = run_to_completion(n, &picks);
            assert!(state.champion().is_some());
            assert!(advances <= round_budget(n), "n={n} took {advances} rounds");
        }
    }
    assert_eq!(round_budget(2), 5);
    assert_eq!(round_budget(1000), 23);
}
