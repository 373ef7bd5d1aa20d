// ─── Tracked quantity names ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Quantity {
    AttackBuff,
    HitCount,
    HitsPerSecond,
    DamageDealt,
    DamagePerSecond,
    AreaId,
    Carts,
    HitsTakenBlocked,
    HitsTakenBlockedPerSecond,
    PlayerHp,
    PlayerStamina,
    Actions,
    ActionsPerMinute,
    Monster1Hp,
    Monster2Hp,
    Monster3Hp,
    Monster4Hp,
    Monster1AttackMultiplier,
    Monster1DefenseRate,
    Monster1SizeMultiplier,
    Monster1PoisonThreshold,
    Monster1SleepThreshold,
    Monster1ParalysisThreshold,
    Monster1BlastThreshold,
    Monster1StunThreshold,
    Monster1PartThresholds,
    PlayerInventory,
    PlayerAmmoPouch,
    PartnyaBag,
}

impl Quantity {
    /// Every quantity, in sampling order.
    pub const ALL: [Quantity; 29] = [
        Self::AttackBuff,
        Self::HitCount,
        Self::HitsPerSecond,
        Self::DamageDealt,
        Self::DamagePerSecond,
        Self::AreaId,
        Self::Carts,
        Self::HitsTakenBlocked,
        Self::HitsTakenBlockedPerSecond,
        Self::PlayerHp,
        Self::PlayerStamina,
        Self::Actions,
        Self::ActionsPerMinute,
        Self::Monster1Hp,
        Self::Monster2Hp,
        Self::Monster3Hp,
        Self::Monster4Hp,
        Self::Monster1AttackMultiplier,
        Self::Monster1DefenseRate,
        Self::Monster1SizeMultiplier,
        Self::Monster1PoisonThreshold,
        Self::Monster1SleepThreshold,
        Self::Monster1ParalysisThreshold,
        Self::Monster1BlastThreshold,
        Self::Monster1StunThreshold,
        Self::Monster1PartThresholds,
        Self::PlayerInventory,
        Self::PlayerAmmoPouch,
        Self::PartnyaBag,
    ];

    /// Stable key used in run records and logs.
    pub fn key(&self) -> &'static str {
        match self {
            Self::AttackBuff => "attack_buff",
            Self::HitCount => "hit_count",
            Self::HitsPerSecond => "hits_per_second",
            Self::DamageDealt => "damage_dealt",
            Self::DamagePerSecond => "damage_per_second",
            Self::AreaId => "area_id",
            Self::Carts => "carts",
            Self::HitsTakenBlocked => "hits_taken_blocked",
            Self::HitsTakenBlockedPerSecond => "hits_taken_blocked_per_second",
            Self::PlayerHp => "player_hp",
            Self::PlayerStamina => "player_stamina",
            Self::Actions => "actions",
            Self::ActionsPerMinute => "actions_per_minute",
            Self::Monster1Hp => "monster1_hp",
            Self::Monster2Hp => "monster2_hp",
            Self::Monster3Hp => "monster3_hp",
            Self::Monster4Hp => "monster4_hp",
            Self::Monster1AttackMultiplier => "monster1_attack_multiplier",
            Self::Monster1DefenseRate => "monster1_defense_rate",
            Self::Monster1SizeMultiplier => "monster1_size_multiplier",
            Self::Monster1PoisonThreshold => "monster1_poison_threshold",
            Self::Monster1SleepThreshold => "monster1_sleep_threshold",
            Self::Monster1ParalysisThreshold => "monster1_paralysis_threshold",
            Self::Monster1BlastThreshold => "monster1_blast_threshold",
            Self::Monster1StunThreshold => "monster1_stun_threshold",
            Self::Monster1PartThresholds => "monster1_part_thresholds",
            Self::PlayerInventory => "player_inventory",
            Self::PlayerAmmoPouch => "player_ammo_pouch",
            Self::PartnyaBag => "partnya_bag",
        }
    }

    /// Whether this quantity also feeds a live chart series.
    pub fn is_charted(&self) -> bool {
        matches!(
            self,
            Self::AttackBuff
                | Self::HitsPerSecond
                | Self::DamageDealt
                | Self::DamagePerSecond
                | Self::HitsTakenBlockedPerSecond
                | Self::PlayerHp
                | Self::PlayerStamina
                | Self::ActionsPerMinute
        )
    }

    /// Derived quantities are computed from other snapshot fields and the clock.
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            Self::HitsPerSecond
                | Self::DamagePerSecond
                | Self::HitsTakenBlockedPerSecond
                | Self::ActionsPerMinute
        )
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_are_unique() {
        let keys: HashSet<&str> = Quantity::ALL.iter().map(|q| q.key()).collect();
        assert_eq!(keys.len(), Quantity::ALL.len());
    }

    #[test]
    fn every_derived_rate_is_charted() {
        for q in Quantity::ALL.iter().filter(|q| q.is_derived()) {
            assert!(q.is_charted(), "{} should feed a chart", q);
        }
    }
}
