use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;

use crate::memory::{read_u32, ProcessMemoryReader};

/// The game is 32-bit; valid userspace pointers are in this range.
const MIN_VALID_PTR: usize = 0x10000;
const MAX_VALID_PTR: usize = 0x7FFF_0000;

fn is_valid_ptr(addr: usize) -> bool {
    addr > MIN_VALID_PTR && addr < MAX_VALID_PTR
}

fn out_of_range(address: usize, offset: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("address 0x{:X} + 0x{:X} is out of range", address, offset),
    )
}

/// `address + offset`, failing instead of wrapping.
pub fn offset_address(address: usize, offset: u64) -> io::Result<usize> {
    usize::try_from(offset)
        .ok()
        .and_then(|o| address.checked_add(o))
        .ok_or_else(|| out_of_range(address, offset))
}

// ─── Field names ────────────────────────────────────────────────────

pub const QUEST_ID: &str = "quest_id";
pub const TIME_FRAMES: &str = "time_frames";
pub const TIME_LIMIT_FRAMES: &str = "time_limit_frames";
pub const ROAD_FLOOR: &str = "road_floor";
pub const QUEST_STATE: &str = "quest_state";
pub const ATTACK_BUFF: &str = "attack_buff";
pub const HIT_COUNT: &str = "hit_count";
pub const DAMAGE_DEALT: &str = "damage_dealt";
pub const AREA_ID: &str = "area_id";
pub const CARTS: &str = "carts";
pub const HITS_TAKEN_BLOCKED: &str = "hits_taken_blocked";
pub const PLAYER_HP: &str = "player_hp";
pub const PLAYER_STAMINA: &str = "player_stamina";
pub const ACTIONS: &str = "actions";
pub const MONSTER_ID: [&str; 4] = ["monster1_id", "monster2_id", "monster3_id", "monster4_id"];
pub const MONSTER_HP: [&str; 4] = ["monster1_hp", "monster2_hp", "monster3_hp", "monster4_hp"];
pub const MONSTER1_ATTACK_MULTIPLIER: &str = "monster1_attack_multiplier";
pub const MONSTER1_DEFENSE_RATE: &str = "monster1_defense_rate";
pub const MONSTER1_SIZE_MULTIPLIER: &str = "monster1_size_multiplier";
pub const MONSTER1_POISON_THRESHOLD: &str = "monster1_poison_threshold";
pub const MONSTER1_SLEEP_THRESHOLD: &str = "monster1_sleep_threshold";
pub const MONSTER1_PARALYSIS_THRESHOLD: &str = "monster1_paralysis_threshold";
pub const MONSTER1_BLAST_THRESHOLD: &str = "monster1_blast_threshold";
pub const MONSTER1_STUN_THRESHOLD: &str = "monster1_stun_threshold";
pub const MONSTER1_PART_THRESHOLDS: &str = "monster1_part_thresholds";
pub const PLAYER_INVENTORY: &str = "player_inventory";
pub const PLAYER_AMMO_POUCH: &str = "player_ammo_pouch";
pub const PARTNYA_BAG: &str = "partnya_bag";

// ─── Pointer chains ─────────────────────────────────────────────────

/// Where one game value lives.
///
/// With no offsets, `base` is the value's address. Otherwise `base` holds a
/// pointer; every offset but the last is added and dereferenced again, and
/// the last offset is added to give the value's address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerChain {
    pub base: u64,
    #[serde(default)]
    pub offsets: Vec<u64>,
    /// Distance between consecutive elements of an array value.
    #[serde(default)]
    pub stride: Option<u64>,
}

impl PointerChain {
    pub fn at(base: u64) -> Self {
        Self {
            base,
            offsets: Vec::new(),
            stride: None,
        }
    }

    pub fn resolve(&self, reader: &dyn ProcessMemoryReader) -> io::Result<usize> {
        let mut address = offset_address(0, self.base)?;
        let Some((last, walk)) = self.offsets.split_last() else {
            return Ok(address);
        };
        for offset in std::iter::once(&0).chain(walk) {
            let ptr = read_u32(reader, offset_address(address, *offset)?)? as usize;
            if !is_valid_ptr(ptr) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("invalid pointer 0x{:X} behind 0x{:X}", ptr, address),
                ));
            }
            address = ptr;
        }
        offset_address(address, *last)
    }

    /// Address of element `index` of an array value.
    pub fn element(&self, base: usize, index: usize, default_stride: u64) -> io::Result<usize> {
        let stride = self.stride.unwrap_or(default_stride);
        (index as u64)
            .checked_mul(stride)
            .ok_or_else(|| out_of_range(base, stride))
            .and_then(|offset| offset_address(base, offset))
    }
}

/// Field name to pointer chain, loaded from the `[addresses]` config table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressMap {
    fields: BTreeMap<String, PointerChain>,
}

impl AddressMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, chain: PointerChain) -> Self {
        self.insert(field, chain);
        self
    }

    pub fn insert(&mut self, field: &str, chain: PointerChain) {
        self.fields.insert(field.to_string(), chain);
    }

    pub fn get(&self, field: &str) -> Option<&PointerChain> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::testing::FakeMemory;

    #[test]
    fn direct_address_needs_no_reads() {
        let mem = FakeMemory::default();
        assert_eq!(PointerChain::at(0x1234).resolve(&mem).unwrap(), 0x1234);
    }

    #[test]
    fn follows_pointer_chain() {
        let mut mem = FakeMemory::default();
        mem.put_u32(0x0040_0000, 0x0050_0000);
        mem.put_u32(0x0050_0010, 0x0060_0000);
        let chain = PointerChain {
            base: 0x0040_0000,
            offsets: vec![0x10, 0x24],
            stride: None,
        };
        assert_eq!(chain.resolve(&mem).unwrap(), 0x0060_0024);
    }

    #[test]
    fn null_pointer_is_rejected() {
        let mut mem = FakeMemory::default();
        mem.put_u32(0x0040_0000, 0);
        let chain = PointerChain {
            base: 0x0040_0000,
            offsets: vec![0x8],
            stride: None,
        };
        let err = chain.resolve(&mem).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn overflowing_offsets_are_errors() {
        let mut mem = FakeMemory::default();
        mem.put_u32(0x0040_0000, 0x0050_0000);
        let chain = PointerChain {
            base: 0x0040_0000,
            offsets: vec![u64::MAX],
            stride: None,
        };
        assert_eq!(chain.resolve(&mem).unwrap_err().kind(), io::ErrorKind::InvalidData);

        let chain = PointerChain {
            stride: Some(u64::MAX),
            ..PointerChain::at(0x0040_0000)
        };
        assert_eq!(
            chain.element(0x1000, 2, 4).unwrap_err().kind(),
            io::ErrorKind::InvalidData
        );
    }

    #[test]
    fn parses_from_toml_table() {
        let text = r#"
            quest_id = { base = 0x1A2B3C }
            player_inventory = { base = 0x400000, offsets = [0x10], stride = 8 }
        "#;
        let map: AddressMap = toml::from_str(text).unwrap();
        assert_eq!(map.get(QUEST_ID), Some(&PointerChain::at(0x1A2B3C)));
        let inventory = map.get(PLAYER_INVENTORY).unwrap();
        assert_eq!(inventory.element(0x100, 3, 4).unwrap(), 0x100 + 24);
        assert_eq!(map.len(), 2);
    }
}
