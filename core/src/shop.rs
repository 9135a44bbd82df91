use alloc::vec::Vec;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::*;

pub const BASE_SHOP_ITEMS: usize = 5;

const STOCK: [ItemKind; 12] = [
    ItemKind::Potion,
    ItemKind::Potion,
    ItemKind::Ether,
    ItemKind::CrystalBall,
    ItemKind::Spyglass,
    ItemKind::Detector,
    ItemKind::Key,
    ItemKind::Transmute,
    ItemKind::Ward,
    ItemKind::Blaze,
    ItemKind::Shield,
    ItemKind::staff(),
];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferKind {
    Item(ItemKind),
    Upgrade(UpgradeId),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopOffer {
    pub kind: OfferKind,
    pub cost: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Purchase {
    Upgrade(UpgradeId),
    Item(ItemKind, Pickup),
}

pub fn shop_number(level: u8, cadence: u8) -> u32 {
    u32::from(level / cadence.max(1)).max(1)
}

pub fn open_shop<R: Rng + ?Sized>(
    run: &RunState,
    level: u8,
    cadence: u8,
    rng: &mut R,
) -> Vec<ShopOffer> {
    let profile = run.profile();
    let base = shop_number(level, cadence) + 1;
    let item_count = BASE_SHOP_ITEMS + usize::from(run.upgrade_count(UpgradeId::Traders));

    let mut offers: Vec<ShopOffer> = (0..item_count)
        .map(|i| {
            let extra = u32::from(i >= BASE_SHOP_ITEMS);
            let item = random_stock(rng);
            ShopOffer {
                kind: OfferKind::Item(item),
                cost: profile.price(base + i as u32 + extra),
            }
        })
        .collect();

    let upgrades = eligible_upgrades(run);
    if let Some(&upgrade) = upgrades.choose(rng) {
        offers.push(ShopOffer {
            kind: OfferKind::Upgrade(upgrade),
            cost: profile.price(base + item_count as u32),
        });
    }

    log::debug!(
        "Opened shop #{} with {} offers",
        shop_number(level, cadence),
        offers.len()
    );
    offers
}

fn random_stock<R: Rng + ?Sized>(rng: &mut R) -> ItemKind {
    // one in eight offers is a tome
    if rng.random_range(0..8) == 0 {
        if let Some(&spell) = SpellId::ALL.choose(rng) {
            return ItemKind::Tome(spell);
        }
    }
    STOCK.choose(rng).copied().unwrap_or(ItemKind::Potion)
}

/// Buys `offers[index]`. Nothing changes when the offer does not exist or
/// the run cannot afford it.
pub fn buy(
    run: &mut RunState,
    offers: &mut Vec<ShopOffer>,
    index: usize,
) -> ActionResult<Purchase> {
    let offer = *offers.get(index).ok_or(ActionError::InvalidOffer(index))?;
    if run.gold < offer.cost {
        return Err(ActionError::InsufficientGold {
            needed: offer.cost,
            available: run.gold,
        });
    }

    run.gold -= offer.cost;
    offers.remove(index);

    let purchase = match offer.kind {
        OfferKind::Upgrade(upgrade) => {
            apply_upgrade(run, upgrade);
            Purchase::Upgrade(upgrade)
        }
        OfferKind::Item(item) => Purchase::Item(item, collect_item(run, item)),
    };
    log::debug!("Bought {:?} for {} gold", offer.kind, offer.cost);
    Ok(purchase)
}
