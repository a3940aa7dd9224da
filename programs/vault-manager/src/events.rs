//! Notifications emitted by vault state transitions
//!
//! Each transition produces a typed record. Hosts collect them in an emission
//! list and publish them through `Event::emit`, which writes a marker line, the
//! event type and the bs58-encoded borsh payload to the program log.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, pubkey::Pubkey};

/// Event type discriminator
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    // Vault events
    CollateralDeposited = 1,
    CollateralWithdrawn = 2,
    DebtMinted = 3,
    DebtBurned = 4,
    ZeroLiquidationEnabled = 5,
    ZeroLiquidationDisabled = 6,

    // Liquidation events
    CollateralLiquidated = 10,

    // Rate events
    RatePerSecondUpdated = 20,

    // Admin events
    Paused = 30,
    Unpaused = 31,
    CollateralFloorUpdated = 32,
    RatiosUpdated = 33,
    BonusPercentUpdated = 34,
    RebalancingToggled = 35,
    RebalanceIntervalUpdated = 36,
}

/// Base event trait
pub trait Event: BorshSerialize {
    fn event_type() -> EventType;

    fn emit(&self) {
        msg!("VAULT_MANAGER_EVENT");
        msg!("TYPE:{:?}", Self::event_type());

        if let Ok(data) = self.try_to_vec() {
            msg!("DATA:{}", bs58::encode(&data).into_string());
        }
    }
}

#[macro_export]
macro_rules! define_event {
    ($name:ident { $($field:ident: $type:ty),* $(,)? }) => {
        #[derive(::borsh::BorshSerialize, ::borsh::BorshDeserialize, Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            $(pub $field: $type,)*
        }

        impl $crate::events::Event for $name {
            fn event_type() -> $crate::events::EventType {
                $crate::events::EventType::$name
            }
        }
    };
}

// === Vault Events ===

define_event!(CollateralDeposited {
    owner: Pubkey,
    amount: u128,
});

define_event!(CollateralWithdrawn {
    owner: Pubkey,
    amount: u128,
});

define_event!(DebtMinted {
    owner: Pubkey,
    amount: u128,
});

define_event!(DebtBurned {
    owner: Pubkey,
    amount: u128,
});

define_event!(ZeroLiquidationEnabled { owner: Pubkey });

define_event!(ZeroLiquidationDisabled { owner: Pubkey });

// === Liquidation Events ===

define_event!(CollateralLiquidated {
    owner: Pubkey,
    liquidator: Pubkey,
    repay_amount: u128,
    collateral_reward: u128,
});

// === Rate Events ===

define_event!(RatePerSecondUpdated {
    old_rate: u128,
    new_rate: u128,
});

// === Admin Events ===

define_event!(Paused { account: Pubkey });

define_event!(Unpaused { account: Pubkey });

define_event!(CollateralFloorUpdated { collateral_floor: u128 });

define_event!(RatiosUpdated {
    standard_ratio: u128,
    zero_liquidation_ratio: u128,
});

define_event!(BonusPercentUpdated { bonus_percent: u128 });

define_event!(RebalancingToggled { enabled: bool });

define_event!(RebalanceIntervalUpdated { seconds: i64 });

/// Any notification, in the order transitions produced them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
    CollateralDeposited(CollateralDeposited),
    CollateralWithdrawn(CollateralWithdrawn),
    DebtMinted(DebtMinted),
    DebtBurned(DebtBurned),
    ZeroLiquidationEnabled(ZeroLiquidationEnabled),
    ZeroLiquidationDisabled(ZeroLiquidationDisabled),
    CollateralLiquidated(CollateralLiquidated),
    RatePerSecondUpdated(RatePerSecondUpdated),
    Paused(Paused),
    Unpaused(Unpaused),
    CollateralFloorUpdated(CollateralFloorUpdated),
    RatiosUpdated(RatiosUpdated),
    BonusPercentUpdated(BonusPercentUpdated),
    RebalancingToggled(RebalancingToggled),
    RebalanceIntervalUpdated(RebalanceIntervalUpdated),
}

macro_rules! dispatch {
    ($self:ident, $inner:ident => $body:expr) => {
        match $self {
            VaultEvent::CollateralDeposited($inner) => $body,
            VaultEvent::CollateralWithdrawn($inner) => $body,
            VaultEvent::DebtMinted($inner) => $body,
            VaultEvent::DebtBurned($inner) => $body,
            VaultEvent::ZeroLiquidationEnabled($inner) => $body,
            VaultEvent::ZeroLiquidationDisabled($inner) => $body,
            VaultEvent::CollateralLiquidated($inner) => $body,
            VaultEvent::RatePerSecondUpdated($inner) => $body,
            VaultEvent::Paused($inner) => $body,
            VaultEvent::Unpaused($inner) => $body,
            VaultEvent::CollateralFloorUpdated($inner) => $body,
            VaultEvent::RatiosUpdated($inner) => $body,
            VaultEvent::BonusPercentUpdated($inner) => $body,
            VaultEvent::RebalancingToggled($inner) => $body,
            VaultEvent::RebalanceIntervalUpdated($inner) => $body,
        }
    };
}

impl VaultEvent {
    pub fn event_type(&self) -> EventType {
        fn type_of<E: Event>(_: &E) -> EventType {
            E::event_type()
        }
        dispatch!(self, e => type_of(e))
    }

    pub fn emit(&self) {
        dispatch!(self, e => e.emit())
    }
}

/// Publish an emission list in order
pub fn emit_all(events: &[VaultEvent]) {
    for event in events {
        event.emit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_dispatch() {
        let owner = Pubkey::new_unique();
        let event = VaultEvent::CollateralLiquidated(CollateralLiquidated {
            owner,
            liquidator: Pubkey::new_unique(),
            repay_amount: 1,
            collateral_reward: 2,
        });
        assert_eq!(event.event_type(), EventType::CollateralLiquidated);

        let event = VaultEvent::ZeroLiquidationEnabled(ZeroLiquidationEnabled { owner });
        assert_eq!(event.event_type(), EventType::ZeroLiquidationEnabled);
    }

    #[test]
    fn test_payload_field_order() {
        let owner = Pubkey::new_unique();
        let liquidator = Pubkey::new_unique();
        let event = CollateralLiquidated {
            owner,
            liquidator,
            repay_amount: 1_500,
            collateral_reward: 7_875,
        };
        let bytes = event.try_to_vec().unwrap();
        assert_eq!(bytes.len(), 32 + 32 + 16 + 16);
        assert_eq!(&bytes[..32], owner.as_ref());
        assert_eq!(&bytes[32..64], liquidator.as_ref());

        let decoded = CollateralLiquidated::try_from_slice(&bytes).unwrap();
        assert_eq!(decoded, event);
    }
}
