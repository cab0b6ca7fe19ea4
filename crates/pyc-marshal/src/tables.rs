//! Tables de session : références (`TYPE_REF`) et chaînes internées (`TYPE_STRINGREF`).
//!
//! Les deux tables appartiennent à un [`Decoder`](crate::Decoder) et disparaissent
//! avec lui, que le décodage ait réussi ou non.

use std::mem;
use std::rc::Rc;

use crate::error::{MarshalError, MarshalResult};
use crate::value::Value;

/// Entrée de la table de références.
#[derive(Debug, Clone, PartialEq)]
enum RefSlot {
    /// Réservée avant le décodage du contenu.
    Pending,
    /// Copie de la valeur finale.
    Ready(Value),
}

/// Table des valeurs partageables, indexée dans l’ordre d’apparition.
#[derive(Debug, Clone)]
pub struct RefTable {
    slots: Vec<RefSlot>,
    limit: usize,
}

impl RefTable {
    /// Table vide plafonnée à `limit` entrées.
    pub fn new(limit: usize) -> Self { Self { slots: Vec::new(), limit } }

    /// Nombre d’entrées (réservées ou remplies).
    pub fn len(&self) -> usize { self.slots.len() }

    /// Vrai si aucune entrée.
    pub fn is_empty(&self) -> bool { self.slots.is_empty() }

    /// Réserve la prochaine entrée ; son index est fixé avant le contenu.
    pub fn reserve(&mut self) -> MarshalResult<usize> {
        if self.slots.len() >= self.limit {
            return Err(MarshalError::SizeOutOfRange { what: "ref table", size: self.slots.len() as i64 + 1 });
        }
        self.slots.push(RefSlot::Pending);
        Ok(self.slots.len() - 1)
    }

    /// Remplace la réservation `index` par une copie de `value`.
    pub fn fill(&mut self, index: usize, value: &Value) {
        if let Some(slot) = self.slots.get_mut(index) {
            drop(mem::replace(slot, RefSlot::Ready(value.clone())));
        }
    }

    /// Copie profonde de l’entrée `index`.
    pub fn resolve(&self, index: u32) -> MarshalResult<Value> {
        match self.slots.get(index as usize) {
            Some(RefSlot::Ready(value)) => Ok(value.clone()),
            Some(RefSlot::Pending) => Err(MarshalError::PendingReference { index }),
            None => Err(MarshalError::RefOutOfRange { index, len: self.slots.len() }),
        }
    }
}

/// Table des chaînes internées.
#[derive(Debug, Clone, Default)]
pub struct InternTable {
    entries: Vec<Rc<[u8]>>,
}

impl InternTable {
    /// Table vide.
    pub fn new() -> Self { Self::default() }

    /// Nombre d’entrées.
    pub fn len(&self) -> usize { self.entries.len() }

    /// Vrai si aucune entrée.
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Ajoute une chaîne ; renvoie son index.
    pub fn push(&mut self, data: Rc<[u8]>) -> usize {
        self.entries.push(data);
        self.entries.len() - 1
    }

    /// Octets de l’entrée `index`.
    pub fn get(&self, index: u32) -> MarshalResult<Rc<[u8]>> {
        self.entries
            .get(index as usize)
            .cloned()
            .ok_or(MarshalError::StringRefOutOfRange { index, len: self.entries.len() })
    }
}
