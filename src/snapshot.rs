use serde::{Deserialize, Serialize};

/// Quest clock value, in game frames.
pub type Frames = i64;

pub const DEFAULT_FRAMES_PER_SECOND: u32 = 30;
pub const MONSTER_SLOTS: usize = 4;
pub const PART_COUNT: usize = 10;
pub const INVENTORY_SLOTS: usize = 20;
pub const AMMO_POUCH_SLOTS: usize = 10;
pub const PARTNYA_BAG_SLOTS: usize = 10;

// ─── Value types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterHp {
    pub monster_id: u32,
    pub hp: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSlot {
    pub item_id: u16,
    pub quantity: u16,
}

impl ItemSlot {
    pub fn is_empty(&self) -> bool {
        self.item_id == 0 || self.quantity == 0
    }
}

// ─── Quest clock ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockDirection {
    /// The in-game timer: frames remaining, decreasing while a quest runs.
    #[default]
    CountDown,
    /// Frames elapsed since quest start.
    CountUp,
}

impl ClockDirection {
    /// Whether `next` comes strictly after `last` on this clock.
    pub fn advances(self, last: Frames, next: Frames) -> bool {
        match self {
            Self::CountDown => next < last,
            Self::CountUp => next > last,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockSettings {
    pub direction: ClockDirection,
    pub frames_per_second: u32,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            direction: ClockDirection::CountDown,
            frames_per_second: DEFAULT_FRAMES_PER_SECOND,
        }
    }
}

/// The clock reading of one tick, with enough context to turn a key into
/// elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestClock {
    pub key: Frames,
    pub time_limit_frames: Frames,
    pub settings: ClockSettings,
}

impl QuestClock {
    pub fn new(settings: ClockSettings, snapshot: &Snapshot) -> Self {
        Self {
            key: snapshot.time_frames,
            time_limit_frames: snapshot.time_limit_frames,
            settings,
        }
    }

    pub fn elapsed_frames_at(&self, key: Frames) -> Frames {
        match self.settings.direction {
            ClockDirection::CountDown => self.time_limit_frames - key,
            ClockDirection::CountUp => key,
        }
    }

    pub fn elapsed_seconds_at(&self, key: Frames) -> f64 {
        if self.settings.frames_per_second == 0 {
            return 0.0;
        }
        self.elapsed_frames_at(key) as f64 / f64::from(self.settings.frames_per_second)
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds_at(self.key)
    }

    /// `total / elapsed_seconds`, or 0.0 before any time has elapsed.
    pub fn per_second(&self, total: i32) -> f64 {
        let seconds = self.elapsed_seconds();
        if seconds <= 0.0 {
            return 0.0;
        }
        f64::from(total) / seconds
    }

    pub fn per_minute(&self, total: i32) -> f64 {
        let seconds = self.elapsed_seconds();
        if seconds <= 0.0 {
            return 0.0;
        }
        f64::from(total) / (seconds / 60.0)
    }
}

// ─── Snapshot ───────────────────────────────────────────────────────

/// One flat read of every tracked game value.
///
/// The clock fields are always present; a provider that cannot read them
/// fails the whole tick instead. Every tracked field is `None` when its read
/// failed this tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// 0 while no quest is active.
    pub quest_id: u32,
    pub time_frames: Frames,
    pub time_limit_frames: Frames,
    /// Current floor, only while in Hunter's Road.
    pub road_floor: Option<u32>,
    pub quest_cleared: bool,

    pub attack_buff: Option<i32>,
    pub hit_count: Option<i32>,
    pub damage_dealt: Option<i32>,
    pub area_id: Option<u32>,
    pub carts: Option<u32>,
    pub hits_taken_blocked: Option<i32>,
    pub player_hp: Option<i32>,
    pub player_stamina: Option<i32>,
    pub actions: Option<i32>,

    pub monster_hp: [Option<MonsterHp>; MONSTER_SLOTS],
    pub monster1_attack_multiplier: Option<f64>,
    pub monster1_defense_rate: Option<f64>,
    pub monster1_size_multiplier: Option<f64>,
    pub monster1_poison_threshold: Option<i32>,
    pub monster1_sleep_threshold: Option<i32>,
    pub monster1_paralysis_threshold: Option<i32>,
    pub monster1_blast_threshold: Option<i32>,
    pub monster1_stun_threshold: Option<i32>,
    pub monster1_part_thresholds: Option<[i32; PART_COUNT]>,

    pub player_inventory: Option<[ItemSlot; INVENTORY_SLOTS]>,
    pub player_ammo_pouch: Option<[ItemSlot; AMMO_POUCH_SLOTS]>,
    pub partnya_bag: Option<[ItemSlot; PARTNYA_BAG_SLOTS]>,
}

impl Snapshot {
    /// An otherwise empty snapshot taken during `quest_id`.
    pub fn in_quest(quest_id: u32, time_frames: Frames, time_limit_frames: Frames) -> Self {
        Self {
            quest_id,
            time_frames,
            time_limit_frames,
            ..Self::default()
        }
    }

    pub fn is_quest_active(&self) -> bool {
        self.quest_id != 0
    }

    pub fn damage_per_second(&self, clock: &QuestClock) -> Option<f64> {
        self.damage_dealt.map(|total| clock.per_second(total))
    }

    pub fn hits_per_second(&self, clock: &QuestClock) -> Option<f64> {
        self.hit_count.map(|total| clock.per_second(total))
    }

    pub fn hits_taken_blocked_per_second(&self, clock: &QuestClock) -> Option<f64> {
        self.hits_taken_blocked.map(|total| clock.per_second(total))
    }

    pub fn actions_per_minute(&self, clock: &QuestClock) -> Option<f64> {
        self.actions.map(|total| clock.per_minute(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(snapshot: &Snapshot) -> QuestClock {
        QuestClock::new(ClockSettings::default(), snapshot)
    }

    #[test]
    fn dps_uses_countdown_elapsed_time() {
        let snapshot = Snapshot {
            damage_dealt: Some(450),
            ..Snapshot::in_quest(21731, 2700, 3000)
        };
        let clock = clock(&snapshot);
        assert_eq!(clock.elapsed_frames_at(2700), 300);
        assert_eq!(snapshot.damage_per_second(&clock), Some(45.0));
    }

    #[test]
    fn rates_are_zero_before_time_elapses() {
        let snapshot = Snapshot {
            hit_count: Some(3),
            actions: Some(10),
            ..Snapshot::in_quest(1, 3000, 3000)
        };
        let clock = clock(&snapshot);
        assert_eq!(snapshot.hits_per_second(&clock), Some(0.0));
        assert_eq!(snapshot.actions_per_minute(&clock), Some(0.0));
    }

    #[test]
    fn actions_per_minute_scales_seconds() {
        // 60 seconds elapsed at 30 fps.
        let snapshot = Snapshot {
            actions: Some(90),
            ..Snapshot::in_quest(1, 1800, 3600)
        };
        assert_eq!(snapshot.actions_per_minute(&clock(&snapshot)), Some(90.0));
    }

    #[test]
    fn count_up_clock_uses_key_as_elapsed() {
        let settings = ClockSettings {
            direction: ClockDirection::CountUp,
            frames_per_second: 30,
        };
        let snapshot = Snapshot {
            hits_taken_blocked: Some(4),
            ..Snapshot::in_quest(1, 60, 0)
        };
        let clock = QuestClock::new(settings, &snapshot);
        assert_eq!(clock.elapsed_seconds(), 2.0);
        assert_eq!(snapshot.hits_taken_blocked_per_second(&clock), Some(2.0));
    }

    #[test]
    fn missing_inputs_make_rates_unavailable() {
        let snapshot = Snapshot::in_quest(1, 100, 3000);
        assert_eq!(snapshot.damage_per_second(&clock(&snapshot)), None);
    }

    #[test]
    fn direction_ordering() {
        assert!(ClockDirection::CountDown.advances(2700, 2699));
        assert!(!ClockDirection::CountDown.advances(2700, 2700));
        assert!(ClockDirection::CountUp.advances(100, 130));
        assert!(!ClockDirection::CountUp.advances(130, 100));
    }
}
