//! Codec registry.
//!
//! The registry owns two tables keyed by [`TypeKey`]:
//!
//! | Table    | Contents                                        | Mutable |
//! |----------|-------------------------------------------------|---------|
//! | built-in | strings, numerics, `bool`, `char`, `Uuid`, `Value` | no   |
//! | user     | everything passed to [`Registry::register`]     | yes     |
//!
//! ## Resolution
//!
//! - **Read** is exact: the declared type must have a codec, built-ins
//!   first.
//! - **Write** starts at the runtime type and, on a miss, walks its
//!   declared [`Lineage`]: at each level the type itself is probed, then
//!   its interfaces depth-first in declaration order, then the walk moves
//!   to the superclass. Built-ins are probed over the whole walk first.
//!   When the built-in hit is the [`Value`] entry, a user codec found on
//!   the same walk takes precedence.
//!
//! ## Concurrency
//!
//! Tables sit behind `RwLock`s. Lookups clone the codec `Arc` out of the
//! table, so no lock is held while a codec runs and codecs may re-enter
//! the registry freely.

#[cfg(test)]
mod tests;

mod lineage;

use std::any::{Any, type_name};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::codec::builtin::{
    BoolCodec, CharCodec, F32Codec, F64Codec, I8Codec, I16Codec, I32Codec, I64Codec,
    NullableStringCodec, StringCodec, UuidCodec,
};
use crate::codec::{
    Codec, EnumCodec, MapCodec, OrdinalEnum, SetCodec, TypeKey, Value, ValueCodec, VecCodec,
};
use crate::config::RegistryConfig;
use crate::context::WriteContext;
use crate::error::{ConfigError, EncodeError};

pub use lineage::Lineage;
use lineage::{Link, LineageEntry, Next};

/// Writer that downcasts a `&dyn Any` and runs the typed codec.
type ErasedWriter = dyn Fn(&dyn Any, &mut WriteContext<'_>) -> Result<(), EncodeError> + Send + Sync;

// ------------------------------------------------------------------------------------------------
// Entries
// ------------------------------------------------------------------------------------------------

#[derive(Clone)]
struct CodecEntry {
    key: TypeKey,
    /// Holds an `Arc<dyn Codec<T>>` for the entry's `T`.
    typed: Arc<dyn Any + Send + Sync>,
    writer: Arc<ErasedWriter>,
}

impl CodecEntry {
    fn new<T: Any>(codec: Arc<dyn Codec<T>>) -> Self {
        let erased = Arc::clone(&codec);
        let writer = erased_writer(move |value, ctx| {
            let value = value.downcast_ref::<T>().ok_or(EncodeError::TypeMismatch {
                expected: type_name::<T>(),
            })?;
            erased.write(value, ctx)
        });
        Self {
            key: TypeKey::of::<T>(),
            typed: Arc::new(codec),
            writer,
        }
    }

    fn codec<T: Any>(&self) -> Option<Arc<dyn Codec<T>>> {
        self.typed.downcast_ref::<Arc<dyn Codec<T>>>().cloned()
    }
}

fn erased_writer<F>(write: F) -> Arc<ErasedWriter>
where
    F: Fn(&dyn Any, &mut WriteContext<'_>) -> Result<(), EncodeError> + Send + Sync + 'static,
{
    Arc::new(write)
}

/// A codec found for a runtime type, plus the projections leading to the
/// ancestor it was registered for.
#[derive(Clone)]
pub struct WriteResolution {
    resolved: TypeKey,
    path: Vec<Link>,
    writer: Arc<ErasedWriter>,
}

impl WriteResolution {
    /// The type whose codec was found.
    pub fn resolved_type(&self) -> TypeKey {
        self.resolved
    }

    /// Number of lineage hops between the runtime type and the resolved type.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Writes `value`, which must be of the runtime type this resolution
    /// was computed for.
    pub fn write(&self, value: &dyn Any, ctx: &mut WriteContext<'_>) -> Result<(), EncodeError> {
        apply(&self.path, &*self.writer, value, ctx)
    }
}

fn apply(
    path: &[Link],
    writer: &ErasedWriter,
    value: &dyn Any,
    ctx: &mut WriteContext<'_>,
) -> Result<(), EncodeError> {
    match path.split_first() {
        None => writer(value, ctx),
        Some((link, rest)) => {
            let mut next = |projected: &dyn Any| apply(rest, writer, projected, ctx);
            (link.project)(value, &mut next as &mut Next<'_>)
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Registry
// ------------------------------------------------------------------------------------------------

/// The shared codec table.
///
/// Built once, populated during setup, then passed by reference to every
/// [`ReadContext`](crate::context::ReadContext) and [`WriteContext`].
pub struct Registry {
    config: RegistryConfig,
    builtins: HashMap<TypeKey, CodecEntry>,
    user: RwLock<HashMap<TypeKey, CodecEntry>>,
    lineages: RwLock<HashMap<TypeKey, LineageEntry>>,
    /// Names of every type the registry has seen, for erased lookups.
    names: RwLock<HashMap<TypeKey, &'static str>>,
}

impl Registry {
    /// Creates a registry with the built-in codecs and default limits.
    pub fn new() -> Self {
        Self::build(RegistryConfig::default())
    }

    /// Creates a registry with the given limits.
    pub fn with_config(config: RegistryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        debug!(
            max_string_len = config.max_string_len,
            max_collection_len = config.max_collection_len,
            max_depth = config.max_depth,
            "registry configured"
        );
        Ok(Self::build(config))
    }

    fn build(config: RegistryConfig) -> Self {
        let mut builtins = HashMap::new();
        let mut install = |entry: CodecEntry| {
            builtins.insert(entry.key, entry);
        };
        install(CodecEntry::new::<String>(Arc::new(StringCodec)));
        install(CodecEntry::new::<Option<String>>(Arc::new(NullableStringCodec)));
        install(CodecEntry::new::<i8>(Arc::new(I8Codec)));
        install(CodecEntry::new::<i16>(Arc::new(I16Codec)));
        install(CodecEntry::new::<i32>(Arc::new(I32Codec)));
        install(CodecEntry::new::<i64>(Arc::new(I64Codec)));
        install(CodecEntry::new::<f32>(Arc::new(F32Codec)));
        install(CodecEntry::new::<f64>(Arc::new(F64Codec)));
        install(CodecEntry::new::<bool>(Arc::new(BoolCodec)));
        install(CodecEntry::new::<char>(Arc::new(CharCodec)));
        install(CodecEntry::new::<Uuid>(Arc::new(UuidCodec)));
        install(CodecEntry::new::<Value>(Arc::new(ValueCodec)));

        let names = builtins.keys().map(|key| (*key, key.name())).collect();
        Self {
            config,
            builtins,
            user: RwLock::new(HashMap::new()),
            lineages: RwLock::new(HashMap::new()),
            names: RwLock::new(names),
        }
    }

    /// The decode limits every read context of this registry enforces.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // --------------------------------------------------------------------------------------------
    // Registration
    // --------------------------------------------------------------------------------------------

    /// Registers `codec` for `T`, returning the codec it replaces.
    ///
    /// Last registration wins. A user codec for a type that also has a
    /// built-in codec is stored but never consulted, since built-ins are
    /// probed first.
    pub fn register<T, C>(&self, codec: C) -> Option<Arc<dyn Codec<T>>>
    where
        T: Any,
        C: Codec<T> + 'static,
    {
        self.register_arc::<T>(Arc::new(codec))
    }

    /// Registers a shared codec for `T`, returning the codec it replaces.
    pub fn register_arc<T: Any>(&self, codec: Arc<dyn Codec<T>>) -> Option<Arc<dyn Codec<T>>> {
        let entry = CodecEntry::new::<T>(codec);
        let key = entry.key;
        self.remember(key);

        if self.builtins.contains_key(&key) {
            warn!(ty = key.name(), "user codec shadowed by a built-in codec");
        }

        let previous = write_lock(&self.user).insert(key, entry);
        match &previous {
            Some(_) => warn!(ty = key.name(), "codec replaced"),
            None => debug!(ty = key.name(), "codec registered"),
        }
        previous.and_then(|entry| entry.codec::<T>())
    }

    /// Registers the ordinal codec for `E`, making it reachable from
    /// [`read_object`](crate::context::ReadContext::read_object).
    pub fn register_enum<E: OrdinalEnum>(&self) -> Option<Arc<dyn Codec<E>>> {
        self.register::<E, _>(EnumCodec::<E>::new())
    }

    /// Registers a `Vec<T>` codec that resolves `T` through this registry.
    pub fn register_list<T: Any>(&self) -> Option<Arc<dyn Codec<Vec<T>>>> {
        self.register::<Vec<T>, _>(VecCodec::<T>::new())
    }

    /// Registers a `HashSet<T>` codec that resolves `T` through this registry.
    pub fn register_set<T: Any + Eq + Hash>(&self) -> Option<Arc<dyn Codec<HashSet<T>>>> {
        self.register::<HashSet<T>, _>(SetCodec::<T>::new())
    }

    /// Registers a `HashMap<K, V>` codec that resolves `K` and `V` through
    /// this registry.
    pub fn register_map<K, V>(&self) -> Option<Arc<dyn Codec<HashMap<K, V>>>>
    where
        K: Any + Eq + Hash,
        V: Any,
    {
        self.register::<HashMap<K, V>, _>(MapCodec::<K, V>::new())
    }

    /// Removes the user codec for `T`.
    pub fn unregister<T: Any>(&self) -> Option<Arc<dyn Codec<T>>> {
        let removed = write_lock(&self.user).remove(&TypeKey::of::<T>());
        if removed.is_some() {
            debug!(ty = type_name::<T>(), "codec unregistered");
        }
        removed.and_then(|entry| entry.codec::<T>())
    }

    /// Declares the ancestors of `R`, replacing any earlier declaration.
    pub fn declare<R: Any>(&self, lineage: Lineage<R>) {
        let key = TypeKey::of::<R>();
        let entry = lineage.entry;

        self.remember(key);
        for link in entry.superclass.iter().chain(&entry.interfaces) {
            self.remember(link.ancestor);
        }
        debug!(
            ty = key.name(),
            superclass = entry.superclass.as_ref().map(|l| l.ancestor.name()),
            interfaces = entry.interfaces.len(),
            "lineage declared"
        );
        write_lock(&self.lineages).insert(key, entry);
    }

    fn remember(&self, key: TypeKey) {
        write_lock(&self.names).entry(key).or_insert(key.name());
    }

    // --------------------------------------------------------------------------------------------
    // Lookup
    // --------------------------------------------------------------------------------------------

    /// Codec for exactly `T`: built-in first, then user.
    pub fn resolve_for_read<T: Any>(&self) -> Option<Arc<dyn Codec<T>>> {
        let key = TypeKey::of::<T>();
        if let Some(entry) = self.builtins.get(&key) {
            return entry.codec::<T>();
        }
        read_lock(&self.user).get(&key).and_then(CodecEntry::codec::<T>)
    }

    /// Codec for a value whose runtime type is `key`, searched along the
    /// declared lineage.
    pub fn resolve_for_write(&self, key: TypeKey) -> Option<WriteResolution> {
        let builtin = self.walk(key, |probe| self.builtins.get(&probe).cloned());

        let any_key = TypeKey::of::<Value>();
        let resolution = match builtin {
            Some(found) if found.resolved != any_key => Some(found),
            fallback => {
                let user = read_lock(&self.user);
                if user.is_empty() {
                    fallback
                } else {
                    self.walk(key, |probe| user.get(&probe).cloned()).or(fallback)
                }
            }
        };

        match &resolution {
            Some(found) => trace!(
                ty = key.name(),
                resolved = found.resolved.name(),
                depth = found.depth(),
                "write codec resolved"
            ),
            None => trace!(ty = key.name(), "no write codec"),
        }
        resolution
    }

    /// The write-side probe order for `key`, starting with `key` itself.
    pub fn ancestors(&self, key: TypeKey) -> Vec<TypeKey> {
        let mut order = Vec::new();
        let _ = self.walk(key, |probe| {
            order.push(probe);
            None
        });
        order
    }

    /// `key` with its type name filled in, if the registry has seen the type.
    pub fn name_key(&self, key: TypeKey) -> TypeKey {
        match read_lock(&self.names).get(&key) {
            Some(name) => key.with_name(name),
            None => key,
        }
    }

    /// Types with a user-registered codec, in arbitrary order.
    pub fn user_codecs(&self) -> Vec<TypeKey> {
        read_lock(&self.user).keys().copied().collect()
    }

    /// Whether a codec for exactly `T` exists in either table.
    pub fn contains<T: Any>(&self) -> bool {
        let key = TypeKey::of::<T>();
        self.builtins.contains_key(&key) || read_lock(&self.user).contains_key(&key)
    }

    /// Walks the lineage of `start`, returning the first probe hit together
    /// with the projection path leading to it.
    fn walk<P>(&self, start: TypeKey, mut probe: P) -> Option<WriteResolution>
    where
        P: FnMut(TypeKey) -> Option<CodecEntry>,
    {
        let lineages = read_lock(&self.lineages);
        let mut visited = HashSet::new();
        let mut chain = HashSet::new();
        let mut path: Vec<Link> = Vec::new();
        let mut current = start;

        loop {
            if !chain.insert(current) {
                trace!(ty = current.name(), "lineage cycle");
                return None;
            }
            // A superclass already reached as an interface is not probed
            // twice, but its own superclass chain is still climbed.
            if visited.insert(current) {
                trace!(ty = current.name(), "probing");
                if let Some(entry) = probe(current) {
                    return Some(resolution(entry, path));
                }
            }

            let lineage = lineages.get(&current)?;
            for link in &lineage.interfaces {
                if let Some(found) =
                    probe_interface(&lineages, link, &mut path, &mut visited, &mut probe)
                {
                    return Some(found);
                }
            }

            let superclass = lineage.superclass.as_ref()?;
            path.push(superclass.clone());
            current = superclass.ancestor;
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Depth-first probe of one interface and the interfaces it extends.
fn probe_interface<P>(
    lineages: &HashMap<TypeKey, LineageEntry>,
    link: &Link,
    path: &mut Vec<Link>,
    visited: &mut HashSet<TypeKey>,
    probe: &mut P,
) -> Option<WriteResolution>
where
    P: FnMut(TypeKey) -> Option<CodecEntry>,
{
    let key = link.ancestor;
    if !visited.insert(key) {
        return None;
    }

    path.push(link.clone());
    trace!(ty = key.name(), "probing interface");
    if let Some(entry) = probe(key) {
        return Some(resolution(entry, path.clone()));
    }
    if let Some(lineage) = lineages.get(&key) {
        for parent in &lineage.interfaces {
            if let Some(found) = probe_interface(lineages, parent, path, visited, probe) {
                return Some(found);
            }
        }
    }
    path.pop();
    None
}

fn resolution(entry: CodecEntry, path: Vec<Link>) -> WriteResolution {
    WriteResolution {
        resolved: entry.key,
        path,
        writer: entry.writer,
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
