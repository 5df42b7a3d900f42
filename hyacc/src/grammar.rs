//! Clause grammar rules
//!
//! The resolver aggregates whatever it is given. Rules about which modifiers may
//! appear together belong to the directive's grammar and are checked here,
//! before resolution.
use enum_map::EnumMap;
use smallvec::{SmallVec, smallvec};

use crate::{
    clause::{ClauseItem, ModifierKind, Pragma},
    device::{DeviceRegistry, DeviceTag},
    utils::{Error, Result},
};

/// A grammar rule set applied to a validated [`Pragma`].
pub trait ClauseGrammar {
    /// Check `pragma`, failing with [`Error::ConflictingModifiers`] when it
    /// combines clauses the directive does not allow together.
    fn check(&self, pragma: &Pragma, registry: &DeviceRegistry) -> Result<()>;
}

/// Accepts every clause combination.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveGrammar;

impl ClauseGrammar for PermissiveGrammar {
    fn check(&self, _pragma: &Pragma, _registry: &DeviceRegistry) -> Result<()> {
        Ok(())
    }
}

/// Grammar of the `loop` construct.
///
/// At most one of the exclusive modifiers (by default `seq`, `independent` and
/// `auto`) may apply to any given device type. Modifiers under different
/// `device_type` scopes do not conflict, so `seq device_type(nvidia)
/// independent` is accepted while `device_type(nvidia) seq auto` is not.
/// Repeating the same modifier is never a conflict.
#[derive(Debug, Clone)]
pub struct LoopGrammar {
    exclusive: EnumMap<ModifierKind, bool>,
}

impl Default for LoopGrammar {
    fn default() -> Self {
        Self::new([
            ModifierKind::Seq,
            ModifierKind::Independent,
            ModifierKind::Auto,
        ])
    }
}

impl LoopGrammar {
    pub fn new(exclusive: impl IntoIterator<Item = ModifierKind>) -> Self {
        let mut set = EnumMap::default();
        for kind in exclusive {
            set[kind] = true;
        }
        Self { exclusive: set }
    }

    pub fn is_exclusive(&self, kind: ModifierKind) -> bool {
        self.exclusive[kind]
    }
}

impl ClauseGrammar for LoopGrammar {
    fn check(&self, pragma: &Pragma, registry: &DeviceRegistry) -> Result<()> {
        let mut scope: SmallVec<[DeviceTag; 2]> = smallvec![DeviceTag::None];
        let mut claimed: Vec<(DeviceTag, ModifierKind)> = Vec::new();

        for item in pragma {
            match item {
                ClauseItem::DeviceType(selector) => {
                    scope = selector.devices().iter().copied().collect();
                }
                ClauseItem::Modifier(kind) if self.is_exclusive(*kind) => {
                    for device in &scope {
                        let previous = claimed
                            .iter()
                            .find(|(claimed_device, claimed_kind)| {
                                claimed_device == device && claimed_kind != kind
                            })
                            .map(|(_, claimed_kind)| *claimed_kind);

                        if let Some(first) = previous {
                            return Err(Error::ConflictingModifiers {
                                first,
                                second: *kind,
                                device: registry.spelling(*device),
                            });
                        }
                        claimed.push((*device, *kind));
                    }
                }
                ClauseItem::Modifier(_) => {}
            }
        }

        Ok(())
    }
}
