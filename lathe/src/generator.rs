//! Named generators of unique values.
//!
//! A generator turns a sequence index (starting at 1) into a value. The
//! registry remembers every value a generator has emitted and skips
//! collisions, so each call for a given name yields a value not seen before
//! for the life of the process, or until the generator is reset.

use crate::error::{LatheError, LatheResult};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use tracing::debug;

/// Default number of collisions tolerated before a generator gives up.
pub const DEFAULT_RETRIES: usize = 100;

/// Producer signature: sequence index in, value out.
pub type GeneratorFn = dyn Fn(u64) -> Value + Send + Sync;

/// Process-wide registry used by factories that do not bring their own.
static GENERATORS: LazyLock<Arc<GeneratorRegistry>> =
    LazyLock::new(|| Arc::new(GeneratorRegistry::new()));

/// The process-wide generator registry.
pub fn generators() -> Arc<GeneratorRegistry> {
    Arc::clone(&GENERATORS)
}

struct Generator {
    producer: Arc<GeneratorFn>,
    counter: u64,
    seen: HashSet<String>,
}

impl Generator {
    fn new(producer: Arc<GeneratorFn>) -> Self {
        Self {
            producer,
            counter: 0,
            seen: HashSet::new(),
        }
    }

    fn advance(&mut self, name: &str, retries: usize) -> LatheResult<Value> {
        for _ in 0..=retries {
            self.counter += 1;
            let value = (self.producer)(self.counter);
            if self.seen.insert(value.to_string()) {
                return Ok(value);
            }
        }
        Err(LatheError::GeneratorExhausted {
            name: name.to_string(),
            attempts: retries + 1,
        })
    }

    fn rewind(&mut self) {
        self.counter = 0;
        self.seen.clear();
    }
}

/// Registry of named generators.
///
/// Producers run while the registry lock is held and must not call back into
/// the registry.
pub struct GeneratorRegistry {
    generators: Mutex<HashMap<String, Generator>>,
    retries: usize,
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::with_retries(DEFAULT_RETRIES)
    }

    /// A registry that tolerates `retries` collisions per draw.
    #[must_use]
    pub fn with_retries(retries: usize) -> Self {
        Self {
            generators: Mutex::new(HashMap::new()),
            retries,
        }
    }

    fn lock(&self) -> LatheResult<MutexGuard<'_, HashMap<String, Generator>>> {
        self.generators.lock().map_err(|_| LatheError::LockPoisoned)
    }

    /// Defines (or redefines) a generator ahead of use. Redefinition starts
    /// the sequence over.
    pub fn define<F>(&self, name: &str, producer: F) -> LatheResult<()>
    where
        F: Fn(u64) -> Value + Send + Sync + 'static,
    {
        self.lock()?
            .insert(name.to_string(), Generator::new(Arc::new(producer)));
        Ok(())
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.lock().map(|g| g.contains_key(name)).unwrap_or(false)
    }

    /// Next value for `name`. The first call for a name installs `producer`;
    /// later calls ignore it and advance the existing generator.
    pub fn next<F>(&self, name: &str, producer: F) -> LatheResult<Value>
    where
        F: Fn(u64) -> Value + Send + Sync + 'static,
    {
        let mut generators = self.lock()?;
        let generator = generators.entry(name.to_string()).or_insert_with(|| {
            debug!("Initialized generator {}", name);
            Generator::new(Arc::new(producer))
        });
        generator.advance(name, self.retries)
    }

    /// Next value from a generator installed earlier.
    pub fn next_defined(&self, name: &str) -> LatheResult<Value> {
        let mut generators = self.lock()?;
        let generator = generators
            .get_mut(name)
            .ok_or_else(|| LatheError::NoGenerator(name.to_string()))?;
        generator.advance(name, self.retries)
    }

    /// Restarts one generator's sequence and forgets what it emitted.
    pub fn reset(&self, name: &str) -> LatheResult<()> {
        if let Some(generator) = self.lock()?.get_mut(name) {
            generator.rewind();
        }
        Ok(())
    }

    /// Restarts every generator.
    pub fn reset_all(&self) -> LatheResult<()> {
        self.lock()?.values_mut().for_each(Generator::rewind);
        Ok(())
    }

    /// Removes every generator.
    pub fn clear(&self) -> LatheResult<()> {
        self.lock()?.clear();
        Ok(())
    }
}

/// Text producer substituting the index for each `{n}` in `template`.
pub fn sequence(template: &str) -> impl Fn(u64) -> Value + Send + Sync + 'static {
    let template = template.to_string();
    move |n| Value::String(template.replace("{n}", &n.to_string()))
}

/// Numeric producer emitting the index itself.
pub fn counter() -> impl Fn(u64) -> Value + Send + Sync + 'static {
    |n: u64| Value::from(n)
}

/// Random token producer (UUID v4, hyphenless).
pub fn token() -> impl Fn(u64) -> Value + Send + Sync + 'static {
    |_| Value::String(uuid::Uuid::new_v4().simple().to_string())
}
