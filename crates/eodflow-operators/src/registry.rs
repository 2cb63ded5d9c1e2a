//! Stage registry: string key → stage instance.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::average::Average;
use crate::benefit::Benefit;
use crate::bonus::Bonus;
use crate::parse::Parse;
use crate::traits::Stage;

type Factory = Box<dyn Fn() -> Arc<dyn Stage> + Send + Sync>;

pub struct Registry {
    factories: BTreeMap<String, Factory>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Registry pre-loaded with the built-in stages.
    pub fn new() -> Self {
        let mut reg = Self {
            factories: BTreeMap::new(),
        };
        reg.register("parse", || Arc::new(Parse));
        reg.register("average", || Arc::new(Average));
        reg.register("benefit", || Arc::new(Benefit::default()));
        reg.register("bonus", || Arc::new(Bonus::default()));
        reg
    }

    /// Add or replace a stage factory.
    pub fn register<F>(&mut self, key: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Stage> + Send + Sync + 'static,
    {
        self.factories.insert(key.into(), Box::new(factory));
    }

    pub fn make(&self, key: &str) -> Option<Arc<dyn Stage>> {
        self.factories.get(key).map(|f| f())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}
