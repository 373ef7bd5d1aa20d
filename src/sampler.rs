//! Turns a stream of snapshots into change-triggered histories.
//!
//! The sampler owns one `TrackedQuantity` per `Quantity`. Every tick it
//! checks the session boundaries (quest ended, quest switched, Hunter's Road
//! floor advanced), diffs each quantity against its previous value, and on
//! quest completion hands the finished session out as a `SessionRecord`.
//!
//! `Sampler` is single-writer: every mutating call takes `&mut self`. Chart
//! readers only ever see the `PlotSeries` handles, which carry their own
//! locks.

use chrono::{DateTime, Local};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::history::{Accessor, History, SampleOutcome, SampleValue, Track, TrackedQuantity};
use crate::plot::{PlotSeries, PlotValue};
use crate::quantity::Quantity;
use crate::snapshot::{
    ClockDirection, ClockSettings, Frames, ItemSlot, MonsterHp, QuestClock, Snapshot,
    AMMO_POUCH_SLOTS, INVENTORY_SLOTS, PARTNYA_BAG_SLOTS, PART_COUNT,
};

// ─── Reports ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    /// Nothing recorded since the last reset.
    Idle,
    /// At least one quantity recorded.
    Sampling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    QuestEnded { quest_id: u32 },
    QuestChanged { from: u32, to: u32 },
    RoadFloorAdvanced { from: u32, to: u32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleSummary {
    pub recorded: usize,
    pub unchanged: usize,
    pub duplicate: usize,
    pub unavailable: usize,
}

impl SampleSummary {
    fn count(&mut self, outcome: SampleOutcome) {
        match outcome {
            SampleOutcome::Recorded => self.recorded += 1,
            SampleOutcome::Unchanged => self.unchanged += 1,
            SampleOutcome::DuplicateKey => self.duplicate += 1,
            SampleOutcome::Unavailable => self.unavailable += 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct TickReport {
    pub reset: Option<ResetReason>,
    pub summary: SampleSummary,
    pub completed: Option<SessionRecord>,
}

/// Everything recorded during one quest, handed to the run log on completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub quest_id: u32,
    pub completed_at: DateTime<Local>,
    pub clock: ClockSettings,
    pub final_time_frames: Frames,
    pub time_limit_frames: Frames,
    pub road_floor: Option<u32>,
    /// Quantity key to `[[key, value], ...]`.
    pub histories: BTreeMap<String, serde_json::Value>,
}

impl SessionRecord {
    pub fn elapsed_frames(&self) -> Frames {
        match self.clock.direction {
            ClockDirection::CountDown => self.time_limit_frames - self.final_time_frames,
            ClockDirection::CountUp => self.final_time_frames,
        }
    }

    pub fn entry_count(&self) -> usize {
        self.histories
            .values()
            .filter_map(|v| v.as_array())
            .map(|a| a.len())
            .sum()
    }
}

// ─── Quantity table ─────────────────────────────────────────────────

fn tracked<T>(quantity: Quantity, direction: ClockDirection, read: Accessor<T>) -> Box<dyn Track>
where
    T: SampleValue + Serialize + Send + 'static,
{
    Box::new(TrackedQuantity::new(quantity, direction, read))
}

fn charted<T>(quantity: Quantity, direction: ClockDirection, read: Accessor<T>) -> Box<dyn Track>
where
    T: SampleValue + Serialize + Send + PlotValue + 'static,
{
    Box::new(TrackedQuantity::new(quantity, direction, read).with_plot(PlotSeries::new()))
}

fn build_tracks(d: ClockDirection) -> Vec<Box<dyn Track>> {
    use Quantity as Q;
    vec![
        charted::<i32>(Q::AttackBuff, d, |s, _| s.attack_buff),
        tracked::<i32>(Q::HitCount, d, |s, _| s.hit_count),
        charted::<f64>(Q::HitsPerSecond, d, |s, c| s.hits_per_second(c)),
        charted::<i32>(Q::DamageDealt, d, |s, _| s.damage_dealt),
        charted::<f64>(Q::DamagePerSecond, d, |s, c| s.damage_per_second(c)),
        tracked::<u32>(Q::AreaId, d, |s, _| s.area_id),
        tracked::<u32>(Q::Carts, d, |s, _| s.carts),
        tracked::<i32>(Q::HitsTakenBlocked, d, |s, _| s.hits_taken_blocked),
        charted::<f64>(Q::HitsTakenBlockedPerSecond, d, |s, c| {
            s.hits_taken_blocked_per_second(c)
        }),
        charted::<i32>(Q::PlayerHp, d, |s, _| s.player_hp),
        charted::<i32>(Q::PlayerStamina, d, |s, _| s.player_stamina),
        tracked::<i32>(Q::Actions, d, |s, _| s.actions),
        charted::<f64>(Q::ActionsPerMinute, d, |s, c| s.actions_per_minute(c)),
        tracked::<MonsterHp>(Q::Monster1Hp, d, |s, _| s.monster_hp[0]),
        tracked::<MonsterHp>(Q::Monster2Hp, d, |s, _| s.monster_hp[1]),
        tracked::<MonsterHp>(Q::Monster3Hp, d, |s, _| s.monster_hp[2]),
        tracked::<MonsterHp>(Q::Monster4Hp, d, |s, _| s.monster_hp[3]),
        tracked::<f64>(Q::Monster1AttackMultiplier, d, |s, _| s.monster1_attack_multiplier),
        tracked::<f64>(Q::Monster1DefenseRate, d, |s, _| s.monster1_defense_rate),
        tracked::<f64>(Q::Monster1SizeMultiplier, d, |s, _| s.monster1_size_multiplier),
        tracked::<i32>(Q::Monster1PoisonThreshold, d, |s, _| s.monster1_poison_threshold),
        tracked::<i32>(Q::Monster1SleepThreshold, d, |s, _| s.monster1_sleep_threshold),
        tracked::<i32>(Q::Monster1ParalysisThreshold, d, |s, _| {
            s.monster1_paralysis_threshold
        }),
        tracked::<i32>(Q::Monster1BlastThreshold, d, |s, _| s.monster1_blast_threshold),
        tracked::<i32>(Q::Monster1StunThreshold, d, |s, _| s.monster1_stun_threshold),
        tracked::<[i32; PART_COUNT]>(Q::Monster1PartThresholds, d, |s, _| {
            s.monster1_part_thresholds
        }),
        tracked::<[ItemSlot; INVENTORY_SLOTS]>(Q::PlayerInventory, d, |s, _| s.player_inventory),
        tracked::<[ItemSlot; AMMO_POUCH_SLOTS]>(Q::PlayerAmmoPouch, d, |s, _| s.player_ammo_pouch),
        tracked::<[ItemSlot; PARTNYA_BAG_SLOTS]>(Q::PartnyaBag, d, |s, _| s.partnya_bag),
    ]
}

// ─── Sampler ────────────────────────────────────────────────────────

pub struct Sampler {
    settings: ClockSettings,
    tracks: Vec<Box<dyn Track>>,
    state: SamplerState,
    active_quest: Option<u32>,
    road_floor: Option<u32>,
    completion_reported: bool,
}

impl Sampler {
    pub fn new(settings: ClockSettings) -> Self {
        Self {
            settings,
            tracks: build_tracks(settings.direction),
            state: SamplerState::Idle,
            active_quest: None,
            road_floor: None,
            completion_reported: false,
        }
    }

    pub fn settings(&self) -> ClockSettings {
        self.settings
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    pub fn active_quest(&self) -> Option<u32> {
        self.active_quest
    }

    /// One polling step: apply session boundaries, sample, and report a
    /// finished quest once.
    pub fn tick(&mut self, snapshot: &Snapshot) -> TickReport {
        let mut report = TickReport::default();

        if !snapshot.is_quest_active() {
            if let Some(quest_id) = self.active_quest.take() {
                self.reset();
                info!("Quest {} ended, histories cleared", quest_id);
                report.reset = Some(ResetReason::QuestEnded { quest_id });
            } else if self.state == SamplerState::Sampling {
                self.reset();
            }
            self.road_floor = None;
            return report;
        }

        if let Some(from) = self.active_quest {
            if from != snapshot.quest_id {
                self.reset();
                self.road_floor = None;
                info!("Quest changed {} -> {}, histories cleared", from, snapshot.quest_id);
                report.reset = Some(ResetReason::QuestChanged {
                    from,
                    to: snapshot.quest_id,
                });
            }
        }
        self.active_quest = Some(snapshot.quest_id);

        if let Some(to) = snapshot.road_floor {
            if let Some(from) = self.road_floor {
                if to > from {
                    self.reset();
                    info!("Road floor {} -> {}, histories cleared", from, to);
                    if report.reset.is_none() {
                        report.reset = Some(ResetReason::RoadFloorAdvanced { from, to });
                    }
                }
            }
            self.road_floor = Some(to);
        }

        report.summary = self.sample(snapshot);

        if snapshot.quest_cleared
            && !self.completion_reported
            && self.state == SamplerState::Sampling
        {
            let record = self.session_record(snapshot);
            info!(
                "Quest {} complete: {} history entries over {} frames",
                record.quest_id,
                record.entry_count(),
                record.elapsed_frames(),
            );
            self.completion_reported = true;
            report.completed = Some(record);
        }

        report
    }

    /// Diff every quantity in `snapshot` against its previous value.
    pub fn sample(&mut self, snapshot: &Snapshot) -> SampleSummary {
        let clock = QuestClock::new(self.settings, snapshot);
        let mut summary = SampleSummary::default();
        for track in &mut self.tracks {
            summary.count(track.sample(snapshot, &clock));
        }
        if summary.recorded > 0 && self.state == SamplerState::Idle {
            info!("Sampling started at key {}", clock.key);
            self.state = SamplerState::Sampling;
        }
        summary
    }

    /// Clear every history, chart series and previous value together.
    pub fn reset(&mut self) {
        for track in &mut self.tracks {
            track.reset();
        }
        self.state = SamplerState::Idle;
        self.completion_reported = false;
    }

    fn track(&self, quantity: Quantity) -> Option<&dyn Track> {
        self.tracks
            .iter()
            .find(|t| t.quantity() == quantity)
            .map(|t| &**t)
    }

    fn tracked_quantity<T: 'static>(&self, quantity: Quantity) -> Option<&TrackedQuantity<T>> {
        self.track(quantity)?
            .as_any()
            .downcast_ref::<TrackedQuantity<T>>()
    }

    /// Typed view of one history. `None` if `T` is not the quantity's type.
    pub fn history<T: 'static>(&self, quantity: Quantity) -> Option<&History<T>> {
        self.tracked_quantity::<T>(quantity).map(|t| t.history())
    }

    pub fn previous<T: 'static>(&self, quantity: Quantity) -> Option<&T> {
        self.tracked_quantity::<T>(quantity).map(|t| t.previous())
    }

    pub fn history_len(&self, quantity: Quantity) -> usize {
        self.track(quantity).map_or(0, |t| t.len())
    }

    pub fn total_entries(&self) -> usize {
        self.tracks.iter().map(|t| t.len()).sum()
    }

    /// Handle to the chart series of `quantity`, if it is charted.
    pub fn plot(&self, quantity: Quantity) -> Option<PlotSeries> {
        self.track(quantity)?.plot().cloned()
    }

    pub fn plots(&self) -> Vec<(Quantity, PlotSeries)> {
        self.tracks
            .iter()
            .filter_map(|t| t.plot().map(|p| (t.quantity(), p.clone())))
            .collect()
    }

    /// Export every history as it stands, stamped with the snapshot's clock.
    pub fn session_record(&self, snapshot: &Snapshot) -> SessionRecord {
        let mut histories = BTreeMap::new();
        for track in &self.tracks {
            match track.export() {
                Ok(value) => {
                    histories.insert(track.quantity().key().to_string(), value);
                }
                Err(e) => warn!("Failed to export {} history: {}", track.quantity(), e),
            }
        }
        SessionRecord {
            quest_id: snapshot.quest_id,
            completed_at: Local::now(),
            clock: self.settings,
            final_time_frames: snapshot.time_frames,
            time_limit_frames: snapshot.time_limit_frames,
            road_floor: snapshot.road_floor,
            histories,
        }
    }
}
