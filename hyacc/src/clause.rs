//! Clause model
//!
//! A loop directive is stored as the ordered list of clauses it was written
//! with. The model is a flat tagged union: a clause is either a
//! `device_type(..)` selector or a bare modifier. Nothing is reordered or
//! deduplicated, since the meaning of a modifier depends on the selectors that
//! precede it.
//!
//! Upstream parsers hand clauses over as [`ClauseRecord`]s (keyword plus
//! optional identifier list). [`Pragma::from_records`] turns those into the
//! validated [`ClauseItem`] form.
use std::ops::Range;

use enum_map::Enum;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::{Display, EnumIs, EnumIter, EnumString, IntoStaticStr};

use crate::{
    device::{DeviceRegistry, DeviceTag},
    utils::{Error, Result},
};

/// Loop parallelism modifiers.
///
/// Variants are declared in the order their attribute names sort, which is the
/// order attributes are printed in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Enum,
    EnumIs,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Display,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ModifierKind {
    /// `auto`: the implementation decides whether the loop is parallel.
    Auto,
    /// `independent`: iterations are data-independent.
    Independent,
    /// `seq`: the loop runs sequentially.
    Seq,
}

impl ModifierKind {
    /// The clause keyword (`seq`, `independent`, `auto`).
    pub fn keyword(&self) -> &'static str {
        self.into()
    }

    /// The name of the attribute this modifier lowers to.
    ///
    /// `auto` is a reserved word in the IR's generated accessors, so its
    /// attribute carries a trailing underscore.
    pub fn attr_name(&self) -> &'static str {
        match self {
            ModifierKind::Auto => "auto_",
            ModifierKind::Independent => "independent",
            ModifierKind::Seq => "seq",
        }
    }

    /// Inverse of [`Self::attr_name`].
    pub fn from_attr_name(name: &str) -> Option<Self> {
        match name {
            "auto_" => Some(ModifierKind::Auto),
            "independent" => Some(ModifierKind::Independent),
            "seq" => Some(ModifierKind::Seq),
            _ => None,
        }
    }
}

/// The device list of a `device_type(..)` clause. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceSelector {
    devices: SmallVec<[DeviceTag; 2]>,
}

impl DeviceSelector {
    /// Build a selector, rejecting an empty device list.
    pub fn new(devices: impl IntoIterator<Item = DeviceTag>) -> Result<Self> {
        let devices: SmallVec<[DeviceTag; 2]> = devices.into_iter().collect();
        if devices.is_empty() {
            return Err(Error::MalformedClause {
                index: None,
                clause: ClauseItem::DEVICE_TYPE.to_string(),
                reason: "the device type list must not be empty".to_string(),
            });
        }
        Ok(Self { devices })
    }

    #[inline]
    pub fn devices(&self) -> &[DeviceTag] {
        &self.devices
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs)]
pub enum ClauseItem {
    DeviceType(DeviceSelector),
    Modifier(ModifierKind),
}

impl ClauseItem {
    pub const DEVICE_TYPE: &'static str = "device_type";
    pub const DTYPE: &'static str = "dtype";

    /// Convenience constructor for a `device_type(..)` clause.
    pub fn device_type(devices: impl IntoIterator<Item = DeviceTag>) -> Result<Self> {
        DeviceSelector::new(devices).map(ClauseItem::DeviceType)
    }
}

impl From<ModifierKind> for ClauseItem {
    fn from(kind: ModifierKind) -> Self {
        ClauseItem::Modifier(kind)
    }
}

impl From<DeviceSelector> for ClauseItem {
    fn from(selector: DeviceSelector) -> Self {
        ClauseItem::DeviceType(selector)
    }
}

/// A clause as delivered by the directive parser, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// `keyword(name, name, ..)`
    Selector { keyword: String, names: Vec<String> },
    /// `keyword`
    Modifier { keyword: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClauseRecord {
    pub kind: RecordKind,
    /// Byte range of the clause in the directive text, `0..0` when unknown.
    pub span: Range<usize>,
}

impl ClauseRecord {
    pub fn selector<S: Into<String>>(
        keyword: impl Into<String>,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            kind: RecordKind::Selector {
                keyword: keyword.into(),
                names: names.into_iter().map(Into::into).collect(),
            },
            span: 0..0,
        }
    }

    pub fn modifier(keyword: impl Into<String>) -> Self {
        Self {
            kind: RecordKind::Modifier {
                keyword: keyword.into(),
            },
            span: 0..0,
        }
    }

    pub fn keyword(&self) -> &str {
        match &self.kind {
            RecordKind::Selector { keyword, .. } | RecordKind::Modifier { keyword } => keyword,
        }
    }
}

/// Reader options that change which clause spellings are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClauseOptions {
    /// Accept `dtype(..)` as a spelling of `device_type(..)`.
    pub accept_dtype_alias: bool,
}

impl Default for ClauseOptions {
    fn default() -> Self {
        Self {
            accept_dtype_alias: true,
        }
    }
}

/// The clause list of one loop directive, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Pragma {
    items: Vec<ClauseItem>,
}

impl Pragma {
    pub fn new(items: impl IntoIterator<Item = ClauseItem>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    /// Validate the records of one directive and intern their device names.
    ///
    /// Fails with [`Error::MalformedClause`] on the first record that is not a
    /// well-formed `device_type`/`dtype` selector or a known modifier.
    pub fn from_records(
        records: &[ClauseRecord],
        registry: &DeviceRegistry,
        options: ClauseOptions,
    ) -> Result<Self> {
        records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                Self::item_from_record(record, registry, options).map_err(|err| match err {
                    Error::MalformedClause { clause, reason, .. } => Error::MalformedClause {
                        index: Some(index),
                        clause,
                        reason,
                    },
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(|items| Self { items })
    }

    fn item_from_record(
        record: &ClauseRecord,
        registry: &DeviceRegistry,
        options: ClauseOptions,
    ) -> Result<ClauseItem> {
        let malformed = |reason: &str| Error::MalformedClause {
            index: None,
            clause: record.keyword().to_string(),
            reason: reason.to_string(),
        };

        let is_selector = |keyword: &str| {
            keyword == ClauseItem::DEVICE_TYPE
                || (options.accept_dtype_alias && keyword == ClauseItem::DTYPE)
        };

        match &record.kind {
            RecordKind::Selector { keyword, names } if is_selector(keyword) => {
                if names.iter().any(|name| name.is_empty()) {
                    return Err(malformed("device type names must not be empty"));
                }
                ClauseItem::device_type(names.iter().map(|name| registry.intern(name)))
            }
            RecordKind::Modifier { keyword } if is_selector(keyword) => {
                Err(malformed("expected a parenthesized device type list"))
            }
            RecordKind::Selector { keyword, .. } => match keyword.parse::<ModifierKind>() {
                Ok(_) => Err(malformed("this clause does not take arguments")),
                Err(_) => Err(malformed("unsupported clause on a loop directive")),
            },
            RecordKind::Modifier { keyword } => keyword
                .parse::<ModifierKind>()
                .map(ClauseItem::Modifier)
                .map_err(|_| malformed("unsupported clause on a loop directive")),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClauseItem> {
        self.items.iter()
    }

    /// Iterate over the modifier kinds in source order.
    pub fn modifiers(&self) -> impl Iterator<Item = ModifierKind> + '_ {
        self.items.iter().filter_map(|item| match item {
            ClauseItem::Modifier(kind) => Some(*kind),
            ClauseItem::DeviceType(_) => None,
        })
    }
}

impl<'a> IntoIterator for &'a Pragma {
    type Item = &'a ClauseItem;
    type IntoIter = std::slice::Iter<'a, ClauseItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<ClauseItem> for Pragma {
    fn from_iter<T: IntoIterator<Item = ClauseItem>>(iter: T) -> Self {
        Self::new(iter)
    }
}
