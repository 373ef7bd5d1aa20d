use hunt_tracker::quantity::Quantity;
use hunt_tracker::sampler::{Sampler, SamplerState};
use hunt_tracker::snapshot::{ClockDirection, ClockSettings, Frames, Snapshot};
use proptest::prelude::*;
use std::collections::BTreeMap;

type Step = (i64, Option<i32>, Option<i32>);

const TRACKED: [Quantity; 2] = [Quantity::PlayerHp, Quantity::PlayerStamina];

fn settings(direction: ClockDirection) -> ClockSettings {
    ClockSettings {
        direction,
        frames_per_second: 30,
    }
}

fn step() -> impl Strategy<Value = Step> {
    (
        -3i64..6,
        proptest::option::of(0i32..4),
        proptest::option::of(0i32..4),
    )
}

/// Turn clock deltas into snapshots. The clock mostly advances in
/// `direction` but may repeat or go back.
fn snapshots(direction: ClockDirection, steps: &[Step]) -> Vec<Snapshot> {
    let mut key: Frames = match direction {
        ClockDirection::CountUp => 0,
        ClockDirection::CountDown => 10_000,
    };
    steps
        .iter()
        .map(|&(delta, hp, stamina)| {
            key += match direction {
                ClockDirection::CountUp => delta,
                ClockDirection::CountDown => -delta,
            };
            Snapshot {
                player_hp: hp,
                player_stamina: stamina,
                ..Snapshot::in_quest(1, key, 10_000)
            }
        })
        .collect()
}

fn direction() -> impl Strategy<Value = ClockDirection> {
    prop_oneof![Just(ClockDirection::CountUp), Just(ClockDirection::CountDown)]
}

proptest! {
    #[test]
    fn keys_stay_ordered_and_never_repeat(
        direction in direction(),
        steps in prop::collection::vec(step(), 1..80),
    ) {
        let mut sampler = Sampler::new(settings(direction));
        for snapshot in snapshots(direction, &steps) {
            sampler.tick(&snapshot);
        }
        for q in TRACKED {
            let keys: Vec<Frames> = sampler.history::<i32>(q).unwrap().keys().collect();
            prop_assert!(keys.windows(2).all(|w| direction.advances(w[0], w[1])), "{:?}", keys);
        }
    }

    #[test]
    fn history_matches_change_rule(
        direction in direction(),
        steps in prop::collection::vec(step(), 1..80),
    ) {
        let mut sampler = Sampler::new(settings(direction));
        let mut previous = 0;
        let mut expected: BTreeMap<Frames, i32> = BTreeMap::new();
        for snapshot in snapshots(direction, &steps) {
            sampler.tick(&snapshot);
            if let Some(hp) = snapshot.player_hp {
                if hp != previous && !expected.contains_key(&snapshot.time_frames) {
                    expected.insert(snapshot.time_frames, hp);
                    previous = hp;
                }
            }
            prop_assert_eq!(*sampler.previous::<i32>(Quantity::PlayerHp).unwrap(), previous);
        }
        let mut recorded: Vec<(Frames, i32)> = sampler
            .history::<i32>(Quantity::PlayerHp)
            .unwrap()
            .iter()
            .map(|(k, v)| (k, *v))
            .collect();
        recorded.sort_unstable();
        prop_assert_eq!(recorded, expected.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn duplicate_snapshot_is_a_no_op(
        direction in direction(),
        steps in prop::collection::vec(step(), 1..40),
    ) {
        let mut sampler = Sampler::new(settings(direction));
        for snapshot in snapshots(direction, &steps) {
            sampler.tick(&snapshot);
            let before = sampler.total_entries();
            let again = sampler.tick(&snapshot);
            prop_assert_eq!(again.summary.recorded, 0);
            prop_assert_eq!(sampler.total_entries(), before);
        }
    }

    #[test]
    fn entries_never_exceed_value_changes(steps in prop::collection::vec(step(), 1..80)) {
        let mut sampler = Sampler::new(settings(ClockDirection::CountUp));
        let snapshots = snapshots(ClockDirection::CountUp, &steps);
        let mut changes = 0usize;
        let mut last = 0;
        for snapshot in &snapshots {
            if let Some(hp) = snapshot.player_hp {
                if hp != last {
                    changes += 1;
                    last = hp;
                }
            }
            sampler.tick(snapshot);
        }
        prop_assert!(sampler.history_len(Quantity::PlayerHp) <= changes);
    }

    #[test]
    fn reset_clears_everything(
        direction in direction(),
        steps in prop::collection::vec(step(), 1..60),
    ) {
        let mut sampler = Sampler::new(settings(direction));
        let charts: Vec<_> = sampler.plots();
        for snapshot in snapshots(direction, &steps) {
            sampler.tick(&snapshot);
        }
        sampler.reset();
        prop_assert_eq!(sampler.state(), SamplerState::Idle);
        prop_assert_eq!(sampler.total_entries(), 0);
        for q in TRACKED {
            prop_assert_eq!(*sampler.previous::<i32>(q).unwrap(), 0);
        }
        for (_, series) in charts {
            prop_assert!(series.is_empty());
        }
    }
}
