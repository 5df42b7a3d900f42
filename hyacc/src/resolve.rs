//! Scope resolution
//!
//! Decides, for every modifier clause of a directive, which device types it
//! applies to. The rule is strictly left to right: a `device_type(..)` clause
//! only scopes the modifiers written *after* it, and a modifier written before
//! any selector applies to [`DeviceTag::None`].
//!
//! ```rust
//! # use hyacc::{clause::*, device::*, resolve::resolve};
//! let reg = DeviceRegistry::new();
//! let radeon = reg.intern("radeon");
//!
//! // `seq device_type(radeon)`: the selector comes too late for `seq`.
//! let late = Pragma::new([
//!     ModifierKind::Seq.into(),
//!     ClauseItem::device_type([radeon]).unwrap(),
//! ]);
//! assert_eq!(resolve(&late).get(ModifierKind::Seq), Some(&[DeviceTag::None][..]));
//!
//! // `device_type(radeon) seq`
//! let early = Pragma::new([
//!     ClauseItem::device_type([radeon]).unwrap(),
//!     ModifierKind::Seq.into(),
//! ]);
//! assert_eq!(resolve(&early).get(ModifierKind::Seq), Some(&[radeon][..]));
//! ```
use enum_map::EnumMap;
use log::trace;
use smallvec::{SmallVec, smallvec};

use crate::{
    clause::{ClauseItem, ModifierKind, Pragma},
    device::DeviceTag,
    utils::{Error, Result},
};

/// Resolved modifiers of one directive: for each modifier kind that appears,
/// the ordered list of device types it applies to.
///
/// Lists are never empty. Duplicates are kept, since each entry stems from a
/// distinct clause. Once built the map is read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: EnumMap<ModifierKind, SmallVec<[DeviceTag; 2]>>,
}

impl AttributeMap {
    /// Build a map from explicit entries, e.g. when reading IR back.
    ///
    /// An entry with an empty device list, or a kind given twice, is an
    /// [`Error::InternalConsistency`] violation.
    pub fn try_from_entries<I, T>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ModifierKind, T)>,
        T: IntoIterator<Item = DeviceTag>,
    {
        let mut map = Self::default();
        for (kind, devices) in entries {
            if !map.entries[kind].is_empty() {
                return Err(Error::internal(format!(
                    "attribute `{}` is given more than once",
                    kind.attr_name()
                )));
            }

            let devices: SmallVec<[DeviceTag; 2]> = devices.into_iter().collect();
            if devices.is_empty() {
                return Err(Error::internal(format!(
                    "attribute `{}` has an empty device type list",
                    kind.attr_name()
                )));
            }
            map.entries[kind] = devices;
        }
        Ok(map)
    }

    /// Device types `kind` applies to, or `None` if no such clause was written.
    pub fn get(&self, kind: ModifierKind) -> Option<&[DeviceTag]> {
        let devices = &self.entries[kind];
        if devices.is_empty() {
            None
        } else {
            Some(devices.as_slice())
        }
    }

    /// Present entries, ordered by attribute name.
    pub fn iter(&self) -> impl Iterator<Item = (ModifierKind, &[DeviceTag])> + '_ {
        self.entries
            .iter()
            .filter(|(_, devices)| !devices.is_empty())
            .map(|(kind, devices)| (kind, devices.as_slice()))
    }

    /// Number of modifier kinds present.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|devices| devices.is_empty())
    }
}

/// Resolve the modifiers of `pragma` in a single left to right scan.
pub fn resolve(pragma: &Pragma) -> AttributeMap {
    let mut current_scope: SmallVec<[DeviceTag; 2]> = smallvec![DeviceTag::None];
    let mut pending = AttributeMap::default();

    for (index, item) in pragma.iter().enumerate() {
        match item {
            ClauseItem::DeviceType(selector) => {
                trace!("clause #{index}: device type scope is now {:?}", selector.devices());
                current_scope = selector.devices().iter().copied().collect();
            }
            ClauseItem::Modifier(kind) => {
                trace!("clause #{index}: `{kind}` applies to {:?}", current_scope);
                pending.entries[*kind].extend(current_scope.iter().copied());
            }
        }
    }

    pending
}
