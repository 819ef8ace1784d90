//! Ordered, named storage with relative insertion.
//!
//! Grammars are `Storage<Pattern>`: the iteration order is the precedence
//! order the lexer uses, so extensions place their rules relative to rules
//! registered by other extensions (`"<paragraph"` inserts before the
//! `paragraph` pattern) instead of agreeing on global numbers.

use crate::error::StorageError;
use std::fmt;
use std::str::FromStr;

/// Where [`Storage::add`] inserts a new item
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Location {
    #[default]
    End,
    Begin,
    Index(usize),
    Before(String),
    After(String),
}

impl Location {
    pub fn before(name: impl Into<String>) -> Self {
        Location::Before(name.into())
    }

    pub fn after(name: impl Into<String>) -> Self {
        Location::After(name.into())
    }
}

impl FromStr for Location {
    type Err = StorageError;

    /// `_end`, `_begin`, `<name`, `>name` or an integer index
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "_end" => Ok(Location::End),
            "_begin" => Ok(Location::Begin),
            _ => {
                if let Some(name) = s.strip_prefix('<') {
                    Ok(Location::before(name))
                } else if let Some(name) = s.strip_prefix('>') {
                    Ok(Location::after(name))
                } else if let Ok(index) = s.parse::<usize>() {
                    Ok(Location::Index(index))
                } else {
                    Err(StorageError::InvalidLocation(s.to_string()))
                }
            }
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::End => write!(f, "_end"),
            Location::Begin => write!(f, "_begin"),
            Location::Index(i) => write!(f, "{}", i),
            Location::Before(name) => write!(f, "<{}", name),
            Location::After(name) => write!(f, ">{}", name),
        }
    }
}

/// Lookup key: a name or a position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'a> {
    Name(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for Key<'a> {
    fn from(name: &'a str) -> Self {
        Key::Name(name)
    }
}

impl<'a> From<&'a String> for Key<'a> {
    fn from(name: &'a String) -> Self {
        Key::Name(name.as_str())
    }
}

impl From<usize> for Key<'_> {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

#[derive(Debug, Clone)]
pub struct Storage<T> {
    names: Vec<String>,
    items: Vec<T>,
}

impl<T> Default for Storage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Storage<T> {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Insert `item` under `name`; duplicate names never replace the existing entry
    pub fn add(
        &mut self,
        name: impl Into<String>,
        item: T,
        location: Location,
    ) -> Result<(), StorageError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(StorageError::Duplicate(name));
        }

        let index = match &location {
            Location::End => self.names.len(),
            Location::Begin => 0,
            Location::Index(index) => {
                if *index > self.names.len() {
                    return Err(StorageError::OutOfRange {
                        index: *index,
                        len: self.names.len(),
                    });
                }
                *index
            }
            Location::Before(anchor) => self.position(anchor)?,
            Location::After(anchor) => self.position(anchor)? + 1,
        };

        self.names.insert(index, name);
        self.items.insert(index, item);
        Ok(())
    }

    pub fn get<'k>(&self, key: impl Into<Key<'k>>) -> Result<&T, StorageError> {
        let index = self.resolve(key.into())?;
        Ok(&self.items[index])
    }

    pub fn get_mut<'k>(&mut self, key: impl Into<Key<'k>>) -> Result<&mut T, StorageError> {
        let index = self.resolve(key.into())?;
        Ok(&mut self.items[index])
    }

    /// Item stored under `name`, appending a default item at the end when absent
    pub fn get_or_insert_default(&mut self, name: &str) -> &mut T
    where
        T: Default,
    {
        let index = match self.names.iter().position(|n| n == name) {
            Some(index) => index,
            None => {
                self.names.push(name.to_string());
                self.items.push(T::default());
                self.items.len() - 1
            }
        };
        &mut self.items[index]
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn position(&self, name: &str) -> Result<usize, StorageError> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Items with their names, in precedence order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.names.iter().map(String::as_str).zip(self.items.iter())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn resolve(&self, key: Key<'_>) -> Result<usize, StorageError> {
        match key {
            Key::Name(name) => self.position(name),
            Key::Index(index) if index < self.items.len() => Ok(index),
            Key::Index(index) => Err(StorageError::OutOfRange {
                index,
                len: self.items.len(),
            }),
        }
    }
}
