//! Device tags
//!
//! A device tag names the class of accelerator a clause applies to. Tags are
//! interned in a [`DeviceRegistry`] so that comparing two tags is a cheap
//! integer comparison. Two tags are distinguished values rather than names:
//!
//! - [`DeviceTag::None`] means "no `device_type` selector is active";
//! - [`DeviceTag::Star`] is the `device_type(*)` wildcard.
//!
//! Every other spelling becomes a [`DeviceTag::Named`] symbol, including a
//! device that is literally called `none`. The registry renders such names
//! quoted so they never read back as the unscoped tag.
use std::{collections::BTreeMap, sync::Arc};

use log::debug;
use parking_lot::RwLock;
use strum::EnumIs;

/// Index of an interned device name inside a [`DeviceRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs)]
pub enum DeviceTag {
    /// No explicit device type selector is active.
    None,
    /// `device_type(*)`
    Star,
    /// A user spelled device type, e.g. `nvidia`.
    Named(Symbol),
}

impl DeviceTag {
    /// Spelling of [`DeviceTag::None`] in textual IR.
    pub const NONE_KEYWORD: &'static str = "none";
    /// Spelling of [`DeviceTag::Star`] in textual IR.
    pub const STAR_KEYWORD: &'static str = "star";
    /// Spelling of [`DeviceTag::Star`] inside a `device_type(..)` clause.
    pub const STAR_CLAUSE: &'static str = "*";
}

/// Session wide table of interned device names.
///
/// The registry is read-mostly: looking up or re-interning a known name only
/// takes shared read locks, and interning a new name upgrades to a write lock.
/// It is `Send + Sync` and can be shared between directives lowered in
/// parallel.
///
/// ```rust
/// # use hyacc::device::{DeviceRegistry, DeviceTag};
/// let reg = DeviceRegistry::new();
/// let nvidia = reg.intern("nvidia");
/// assert_eq!(reg.intern("nvidia"), nvidia);
/// assert_eq!(reg.intern("*"), DeviceTag::Star);
/// assert_eq!(format!("{}", reg.fmt(nvidia)), "#acc.device_type<nvidia>");
/// ```
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    names: RwLock<Vec<Arc<str>>>,
    lookup: RwLock<BTreeMap<Arc<str>, Symbol>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        // INFO: Always lock `names` before `lookup` to avoid deadlock
        Self {
            names: Default::default(),
            lookup: Default::default(),
        }
    }

    /// Intern a device name as it appears in a `device_type(..)` clause.
    ///
    /// `*` maps to [`DeviceTag::Star`]; every other spelling is interned as a
    /// [`DeviceTag::Named`] symbol. `none` is *not* special here.
    pub fn intern(&self, name: &str) -> DeviceTag {
        if name == DeviceTag::STAR_CLAUSE {
            DeviceTag::Star
        } else {
            DeviceTag::Named(self.search_or_insert(name))
        }
    }

    /// Look `name` up without interning it.
    pub fn lookup(&self, name: &str) -> Option<DeviceTag> {
        if name == DeviceTag::STAR_CLAUSE {
            return Some(DeviceTag::Star);
        }

        self.lookup
            .read_recursive()
            .get(name)
            .copied()
            .map(DeviceTag::Named)
    }

    /// Return the interned symbol for `name`, allocating one if needed.
    ///
    /// # A note on concurrency
    /// Known names are found under a shared read lock. Otherwise both tables
    /// are taken with upgradable reads, in a fixed order, and are only upgraded
    /// when `name` is still missing. Concurrent callers interning the same name
    /// observe the same [`Symbol`].
    pub fn search_or_insert(&self, name: &str) -> Symbol {
        if let Some(symbol) = self.lookup.read_recursive().get(name).copied() {
            return symbol;
        }

        // Lock, notice that the order is critical, always lock `names` first
        let mut names_lock = self.names.upgradable_read();
        let mut lookup_lock = self.lookup.upgradable_read();

        if let Some(symbol) = lookup_lock.get(name) {
            return *symbol;
        }

        // NOTE: Ordering of upgrade is paramount to avoid deadlock
        names_lock.with_upgraded(|names| {
            lookup_lock.with_upgraded(|lookup| {
                let symbol = Symbol(names.len() as u32);
                let name: Arc<str> = Arc::from(name);

                debug!("New device type `{}` registered as symbol {}.", name, symbol.0);
                names.push(Arc::clone(&name));
                lookup.insert(name, symbol);
                symbol
            })
        })
    }

    /// Name of an interned symbol, or `None` if the symbol does not belong to
    /// this registry.
    pub fn name(&self, symbol: Symbol) -> Option<Arc<str>> {
        self.names.read_recursive().get(symbol.0 as usize).cloned()
    }

    /// Number of interned names.
    pub fn len(&self) -> usize {
        self.names.read_recursive().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spelling of `tag` inside the `<..>` of a `#acc.device_type` attribute.
    pub fn spelling(&self, tag: DeviceTag) -> String {
        match tag {
            DeviceTag::None => DeviceTag::NONE_KEYWORD.to_string(),
            DeviceTag::Star => DeviceTag::STAR_KEYWORD.to_string(),
            DeviceTag::Named(symbol) => match self.name(symbol) {
                Some(name) if needs_quotes(&name) => quote(&name),
                Some(name) => name.to_string(),
                None => format!("<unknown device {}>", symbol.0),
            },
        }
    }

    /// Format a device tag as a `#acc.device_type<..>` attribute.
    pub fn fmt(&self, tag: DeviceTag) -> impl std::fmt::Display + '_ {
        struct Fmt<'a> {
            registry: &'a DeviceRegistry,
            tag: DeviceTag,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "#acc.device_type<{}>", self.registry.spelling(self.tag))
            }
        }

        Fmt {
            registry: self,
            tag,
        }
    }
}

/// Reserved spellings and anything that is not a plain identifier is quoted.
fn needs_quotes(name: &str) -> bool {
    if name == DeviceTag::NONE_KEYWORD || name == DeviceTag::STAR_KEYWORD {
        return true;
    }

    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return true,
    }
    !chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn quote(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for c in name.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
