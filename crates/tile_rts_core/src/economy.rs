//! Player stockpiles and supply.
//!
//! All checks and mutations are integer-only. Spending is all-or-nothing:
//! a failed check leaves the economy untouched.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::map::ResourceKind;
use crate::unit::UnitType;

/// Amount harvested from a resource tile per gathering tick.
pub const HARVEST_QUANTUM: i32 = 2;

/// Cargo at which a gatherer heads back to a dropoff.
pub const CARRY_CAPACITY: i32 = 20;

/// Gold, wood and food counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Economy {
    /// Gold stockpile.
    pub gold: i32,
    /// Wood stockpile.
    pub wood: i32,
    /// Food committed to living and queued units.
    pub food_used: i32,
    /// Food available.
    pub food_cap: i32,
}

impl Economy {
    /// Create an economy with the given stockpiles and no food in use.
    #[must_use]
    pub const fn new(gold: i32, wood: i32, food_cap: i32) -> Self {
        Self {
            gold,
            wood,
            food_used: 0,
            food_cap,
        }
    }

    /// Check if the stockpiles cover a cost.
    #[must_use]
    pub const fn can_afford(&self, gold: i32, wood: i32) -> bool {
        self.gold >= gold && self.wood >= wood
    }

    /// Deduct a cost if affordable.
    pub fn spend(&mut self, gold: i32, wood: i32) -> Result<()> {
        if !self.can_afford(gold, wood) {
            return Err(GameError::InsufficientResources {
                gold,
                wood,
                have_gold: self.gold,
                have_wood: self.wood,
            });
        }
        self.gold -= gold;
        self.wood -= wood;
        Ok(())
    }

    /// Return a previously spent cost.
    pub fn refund(&mut self, gold: i32, wood: i32) {
        self.gold += gold;
        self.wood += wood;
    }

    /// Reserve gold, wood and food for one unit of `ty`.
    pub fn reserve_unit(&mut self, ty: &UnitType) -> Result<()> {
        if self.food_used + ty.food > self.food_cap {
            return Err(GameError::FoodCapExceeded {
                used: self.food_used,
                needed: ty.food,
                cap: self.food_cap,
            });
        }
        self.spend(ty.cost_gold, ty.cost_wood)?;
        self.food_used += ty.food;
        Ok(())
    }

    /// Undo [`reserve_unit`](Self::reserve_unit).
    pub fn release_unit(&mut self, ty: &UnitType) {
        self.refund(ty.cost_gold, ty.cost_wood);
        self.food_used -= ty.food;
    }

    /// Credit delivered cargo.
    ///
    /// Returns the amount credited; cargo of kind `None` is discarded.
    pub fn deposit(&mut self, kind: Option<ResourceKind>, amount: i32) -> i32 {
        match kind {
            Some(ResourceKind::Gold) => {
                self.gold += amount;
                amount
            }
            Some(ResourceKind::Wood) => {
                self.wood += amount;
                amount
            }
            _ => 0,
        }
    }
}

impl Default for Economy {
    fn default() -> Self {
        Self::new(500, 0, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn footman() -> UnitType {
        UnitType {
            id: "footman".into(),
            cost_gold: 120,
            cost_wood: 10,
            food: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let eco = Economy::default();
        assert_eq!((eco.gold, eco.wood, eco.food_used, eco.food_cap), (500, 0, 0, 10));
    }

    #[test]
    fn test_spend_is_all_or_nothing() {
        let mut eco = Economy::new(100, 10, 10);
        assert!(eco.spend(50, 20).is_err());
        assert_eq!((eco.gold, eco.wood), (100, 10));

        eco.spend(50, 10).unwrap();
        assert_eq!((eco.gold, eco.wood), (50, 0));

        eco.refund(50, 10);
        assert_eq!((eco.gold, eco.wood), (100, 10));
    }

    #[test]
    fn test_reserve_checks_food_first() {
        let mut eco = Economy::new(1000, 100, 3);
        eco.reserve_unit(&footman()).unwrap();
        assert_eq!(eco.food_used, 2);

        let err = eco.reserve_unit(&footman()).unwrap_err();
        assert!(matches!(err, GameError::FoodCapExceeded { used: 2, needed: 2, cap: 3 }));
        assert_eq!(eco.gold, 880);

        eco.release_unit(&footman());
        assert_eq!((eco.gold, eco.wood, eco.food_used), (1000, 100, 0));
    }

    #[test]
    fn test_reserve_insufficient_gold_leaves_food() {
        let mut eco = Economy::new(100, 100, 10);
        assert!(matches!(
            eco.reserve_unit(&footman()),
            Err(GameError::InsufficientResources { .. })
        ));
        assert_eq!(eco.food_used, 0);
    }

    #[test]
    fn test_deposit_by_kind() {
        let mut eco = Economy::new(0, 0, 10);
        assert_eq!(eco.deposit(Some(ResourceKind::Wood), 20), 20);
        assert_eq!(eco.deposit(Some(ResourceKind::Gold), 8), 8);
        assert_eq!(eco.deposit(None, 5), 0);
        assert_eq!((eco.gold, eco.wood), (8, 20));
    }
}
