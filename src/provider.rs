use log::{debug, info, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use sysinfo::System;

use crate::address_map::{self as fields, offset_address, AddressMap};
use crate::errors::{Result, TrackerError};
use crate::memory::{read_f32, read_i32, read_u16, read_u32, ProcessMemoryReader};
use crate::snapshot::{Frames, ItemSlot, MonsterHp, Snapshot, MONSTER_SLOTS, PART_COUNT};

/// Source of one snapshot per tick.
pub trait GameStateProvider {
    /// Read the current state. An error means the whole tick is skipped.
    fn snapshot(&mut self) -> Result<Snapshot>;
}

// ─── Process memory ─────────────────────────────────────────────────

/// Quest state value the game writes once the quest is cleared.
const QUEST_STATE_CLEARED: u32 = 1;
const ITEM_SLOT_STRIDE: u64 = 4;
const PART_STRIDE: u64 = 4;

pub fn find_process(process_name: &str) -> Option<u32> {
    let mut sys = System::new();
    sys.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
    sys.processes()
        .values()
        .find(|p| p.name().to_string_lossy() == process_name)
        .map(|p| p.pid().as_u32())
}

/// Reads every snapshot field from the game process through an `AddressMap`.
///
/// `quest_id`, `time_frames` and `time_limit_frames` must be mapped and
/// readable; every other field is `None` when unmapped or unreadable.
pub struct MemoryStateProvider {
    reader: Box<dyn ProcessMemoryReader>,
    addresses: AddressMap,
    pid: Option<u32>,
}

impl MemoryStateProvider {
    pub fn new(reader: Box<dyn ProcessMemoryReader>, addresses: AddressMap) -> Self {
        Self {
            reader,
            addresses,
            pid: None,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_attached(&self) -> bool {
        self.reader.is_attached()
    }

    pub fn attach_by_name(&mut self, process_name: &str) -> Result<u32> {
        let pid = find_process(process_name)
            .ok_or_else(|| TrackerError::ProcessNotFound(process_name.to_string()))?;
        info!("Found process '{}' with PID={}", process_name, pid);
        self.attach(pid)?;
        Ok(pid)
    }

    pub fn attach(&mut self, pid: u32) -> Result<()> {
        self.reader.attach(pid)?;
        self.pid = Some(pid);
        info!("Attached to PID={} ({} mapped fields)", pid, self.addresses.len());
        Ok(())
    }

    pub fn detach(&mut self) {
        if let Err(e) = self.reader.detach() {
            warn!("Detach error: {}", e);
        }
        self.pid = None;
    }

    fn read_required<T>(
        &self,
        field: &'static str,
        read: impl FnOnce(&dyn ProcessMemoryReader, usize) -> io::Result<T>,
    ) -> Result<T> {
        let chain = self.addresses.get(field).ok_or(TrackerError::Unmapped(field))?;
        let reader = &*self.reader;
        let address = chain.resolve(reader)?;
        Ok(read(reader, address)?)
    }

    fn read_field<T>(
        &self,
        field: &str,
        read: impl FnOnce(&dyn ProcessMemoryReader, usize) -> io::Result<T>,
    ) -> Option<T> {
        let chain = self.addresses.get(field)?;
        let reader = &*self.reader;
        match chain.resolve(reader).and_then(|address| read(reader, address)) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Read of {} failed: {}", field, e);
                None
            }
        }
    }

    fn read_i32_field(&self, field: &str) -> Option<i32> {
        self.read_field(field, read_i32)
    }

    fn read_u32_field(&self, field: &str) -> Option<u32> {
        self.read_field(field, read_u32)
    }

    fn read_f32_field(&self, field: &str) -> Option<f64> {
        self.read_field(field, read_f32).map(f64::from)
    }

    fn read_monster(&self, slot: usize) -> Option<MonsterHp> {
        let monster_id = self.read_field(fields::MONSTER_ID[slot], read_u16)?;
        let hp = self.read_i32_field(fields::MONSTER_HP[slot])?;
        Some(MonsterHp {
            monster_id: u32::from(monster_id),
            hp,
        })
    }

    fn read_parts(&self) -> Option<[i32; PART_COUNT]> {
        let chain = self.addresses.get(fields::MONSTER1_PART_THRESHOLDS)?;
        self.read_field(fields::MONSTER1_PART_THRESHOLDS, |reader, base| {
            let mut parts = [0i32; PART_COUNT];
            for (i, part) in parts.iter_mut().enumerate() {
                *part = read_i32(reader, chain.element(base, i, PART_STRIDE)?)?;
            }
            Ok(parts)
        })
    }

    fn read_slots<const N: usize>(&self, field: &str) -> Option<[ItemSlot; N]> {
        let chain = self.addresses.get(field)?;
        self.read_field(field, |reader, base| {
            let mut slots = [ItemSlot::default(); N];
            for (i, slot) in slots.iter_mut().enumerate() {
                let address = chain.element(base, i, ITEM_SLOT_STRIDE)?;
                *slot = ItemSlot {
                    item_id: read_u16(reader, address)?,
                    quantity: read_u16(reader, offset_address(address, 2)?)?,
                };
            }
            Ok(slots)
        })
    }
}

impl GameStateProvider for MemoryStateProvider {
    fn snapshot(&mut self) -> Result<Snapshot> {
        if !self.reader.is_attached() {
            return Err(TrackerError::Detached);
        }

        let quest_id = self.read_required(fields::QUEST_ID, read_u32)?;
        let time_frames = self.read_required(fields::TIME_FRAMES, read_i32)?;
        let time_limit_frames = self.read_required(fields::TIME_LIMIT_FRAMES, read_i32)?;

        let mut monster_hp = [None; MONSTER_SLOTS];
        for (slot, hp) in monster_hp.iter_mut().enumerate() {
            *hp = self.read_monster(slot);
        }

        Ok(Snapshot {
            quest_id,
            time_frames: Frames::from(time_frames),
            time_limit_frames: Frames::from(time_limit_frames),
            road_floor: self.read_u32_field(fields::ROAD_FLOOR).filter(|f| *f > 0),
            quest_cleared: self.read_u32_field(fields::QUEST_STATE) == Some(QUEST_STATE_CLEARED),

            attack_buff: self.read_i32_field(fields::ATTACK_BUFF),
            hit_count: self.read_i32_field(fields::HIT_COUNT),
            damage_dealt: self.read_i32_field(fields::DAMAGE_DEALT),
            area_id: self.read_u32_field(fields::AREA_ID),
            carts: self.read_u32_field(fields::CARTS),
            hits_taken_blocked: self.read_i32_field(fields::HITS_TAKEN_BLOCKED),
            player_hp: self.read_i32_field(fields::PLAYER_HP),
            player_stamina: self.read_i32_field(fields::PLAYER_STAMINA),
            actions: self.read_i32_field(fields::ACTIONS),

            monster_hp,
            monster1_attack_multiplier: self.read_f32_field(fields::MONSTER1_ATTACK_MULTIPLIER),
            monster1_defense_rate: self.read_f32_field(fields::MONSTER1_DEFENSE_RATE),
            monster1_size_multiplier: self.read_f32_field(fields::MONSTER1_SIZE_MULTIPLIER),
            monster1_poison_threshold: self.read_i32_field(fields::MONSTER1_POISON_THRESHOLD),
            monster1_sleep_threshold: self.read_i32_field(fields::MONSTER1_SLEEP_THRESHOLD),
            monster1_paralysis_threshold: self
                .read_i32_field(fields::MONSTER1_PARALYSIS_THRESHOLD),
            monster1_blast_threshold: self.read_i32_field(fields::MONSTER1_BLAST_THRESHOLD),
            monster1_stun_threshold: self.read_i32_field(fields::MONSTER1_STUN_THRESHOLD),
            monster1_part_thresholds: self.read_parts(),

            player_inventory: self.read_slots(fields::PLAYER_INVENTORY),
            player_ammo_pouch: self.read_slots(fields::PLAYER_AMMO_POUCH),
            partnya_bag: self.read_slots(fields::PARTNYA_BAG),
        })
    }
}

// ─── Replay ─────────────────────────────────────────────────────────

/// Plays back snapshots stored one JSON object per line.
pub struct ReplayProvider<R> {
    lines: io::Lines<R>,
    line: usize,
    served: usize,
}

impl ReplayProvider<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        info!("Replaying snapshots from {}", path.display());
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplayProvider<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
            served: 0,
        }
    }

    pub fn served(&self) -> usize {
        self.served
    }

    /// 1-based number of the last line read.
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> GameStateProvider for ReplayProvider<R> {
    fn snapshot(&mut self) -> Result<Snapshot> {
        loop {
            let Some(line) = self.lines.next() else {
                return Err(TrackerError::ReplayFinished(self.served));
            };
            let line = line?;
            self.line += 1;
            if line.trim().is_empty() {
                continue;
            }
            let snapshot = serde_json::from_str(&line)?;
            self.served += 1;
            return Ok(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_map::PointerChain;
    use crate::memory::testing::FakeMemory;

    fn base_memory() -> (FakeMemory, AddressMap) {
        let mut mem = FakeMemory::default();
        mem.put_u32(0x1000, 21731);
        mem.put_i32(0x1004, 2700);
        mem.put_i32(0x1008, 3000);
        mem.put_i32(0x1010, 450);
        mem.attached = true;
        let map = AddressMap::new()
            .with(fields::QUEST_ID, PointerChain::at(0x1000))
            .with(fields::TIME_FRAMES, PointerChain::at(0x1004))
            .with(fields::TIME_LIMIT_FRAMES, PointerChain::at(0x1008))
            .with(fields::DAMAGE_DEALT, PointerChain::at(0x1010))
            .with(fields::PLAYER_HP, PointerChain::at(0x9000));
        (mem, map)
    }

    #[test]
    fn reads_clock_and_isolates_failed_fields() {
        let (mem, map) = base_memory();
        let mut provider = MemoryStateProvider::new(Box::new(mem), map);
        let snapshot = provider.snapshot().unwrap();
        assert_eq!(snapshot.quest_id, 21731);
        assert_eq!(snapshot.time_frames, 2700);
        assert_eq!(snapshot.time_limit_frames, 3000);
        assert_eq!(snapshot.damage_dealt, Some(450));
        // Mapped but unreadable.
        assert_eq!(snapshot.player_hp, None);
        // Unmapped.
        assert_eq!(snapshot.carts, None);
        assert!(!snapshot.quest_cleared);
    }

    #[test]
    fn unmapped_clock_fails_the_tick() {
        let (mem, _) = base_memory();
        let map = AddressMap::new().with(fields::QUEST_ID, PointerChain::at(0x1000));
        let mut provider = MemoryStateProvider::new(Box::new(mem), map);
        assert!(matches!(
            provider.snapshot(),
            Err(TrackerError::Unmapped(fields::TIME_FRAMES))
        ));
    }

    #[test]
    fn detached_reader_fails_the_tick() {
        let (mut mem, map) = base_memory();
        mem.attached = false;
        let mut provider = MemoryStateProvider::new(Box::new(mem), map);
        assert!(matches!(provider.snapshot(), Err(TrackerError::Detached)));
    }

    #[test]
    fn reads_item_slots_and_monsters() {
        let (mut mem, map) = base_memory();
        for i in 0..10u16 {
            let address = 0x2000 + usize::from(i) * 4;
            mem.put(address, &(100 + i).to_le_bytes());
            mem.put(address + 2, &(i + 1).to_le_bytes());
        }
        mem.put(0x3000, &55u16.to_le_bytes());
        mem.put_i32(0x3004, 12000);
        mem.put_u32(0x3100, 1);
        let map = map
            .with(fields::PLAYER_AMMO_POUCH, PointerChain::at(0x2000))
            .with(fields::MONSTER_ID[0], PointerChain::at(0x3000))
            .with(fields::MONSTER_HP[0], PointerChain::at(0x3004))
            .with(fields::QUEST_STATE, PointerChain::at(0x3100));
        let mut provider = MemoryStateProvider::new(Box::new(mem), map);
        let snapshot = provider.snapshot().unwrap();
        let pouch = snapshot.player_ammo_pouch.unwrap();
        assert_eq!(pouch[0], ItemSlot { item_id: 100, quantity: 1 });
        assert_eq!(pouch[9], ItemSlot { item_id: 109, quantity: 10 });
        assert_eq!(
            snapshot.monster_hp[0],
            Some(MonsterHp { monster_id: 55, hp: 12000 })
        );
        assert_eq!(snapshot.monster_hp[1], None);
        assert!(snapshot.quest_cleared);
        // 20-slot inventory is unmapped.
        assert!(snapshot.player_inventory.is_none());
    }

    #[test]
    fn replay_skips_blank_lines_and_reports_end() {
        let text = "{\"quest_id\":5,\"time_frames\":100,\"player_hp\":500}\n\n{\"quest_id\":5,\"time_frames\":130}\n";
        let mut replay = ReplayProvider::from_reader(text.as_bytes());
        let first = replay.snapshot().unwrap();
        assert_eq!(first.player_hp, Some(500));
        let second = replay.snapshot().unwrap();
        assert_eq!(second.time_frames, 130);
        assert_eq!(second.player_hp, None);
        assert!(matches!(replay.snapshot(), Err(TrackerError::ReplayFinished(2))));
    }

    #[test]
    fn replay_rejects_malformed_lines() {
        let mut replay = ReplayProvider::from_reader("\nnot json\n{\"quest_id\":5}\n".as_bytes());
        assert!(matches!(replay.snapshot(), Err(TrackerError::Json(_))));
        assert_eq!(replay.line(), 2);
        assert_eq!(replay.snapshot().unwrap().quest_id, 5);
        assert_eq!(replay.line(), 3);
    }
}
