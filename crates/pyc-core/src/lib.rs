//! pyc-core — primitives partagées du décodeur pyc/marshal
//!
//! Fournit :
//! - `ByteReader` : curseur séquentiel little-endian avec position explicite
//! - `CoreError` + alias `CoreResult<T>` (lecture courte, magic inconnu, en-tête)
//! - `Section` : plage nommée/adressée produite pour chaque code object
//! - [`magic`] : registre des magics CPython (ordre de publication), tailles d’en-tête
//!
//! Features :
//! - `serde` (par défaut) : derive (dé)sérialisation sur `Section` et `PycVersion`

#![deny(missing_docs)]

/* ─────────────────────────── Imports ─────────────────────────── */

use std::borrow::Cow;
use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ─────────────────────────── Modules publics ─────────────────────────── */

/// Registre des magics et en-têtes `.pyc`.
pub mod magic;

pub use magic::{header_size, lookup, magic_int_within, PycVersion, PYC_MAGIC_SUFFIX};

/* ─────────────────────────── Résultat commun ─────────────────────────── */

/// Alias résultat commun au core.
pub type CoreResult<T> = core::result::Result<T, CoreError>;

/* ─────────────────────────── Sections ─────────────────────────── */

/// Plage nommée d’un code object dans le flux d’entrée.
///
/// `name` est le chemin pointé depuis le code object racine (`module.outer.inner`),
/// `start` l’offset du premier octet de bytecode, `size` sa longueur.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Section {
    /// Chemin pointé.
    pub name: String,
    /// Offset de début (inclus).
    pub start: u64,
    /// Taille en octets.
    pub size: u64,
}

impl Section {
    /// Crée une section.
    pub fn new(name: impl Into<String>, start: u64, size: u64) -> Self { Self { name: name.into(), start, size } }
    /// Offset de fin (exclu).
    pub fn end(&self) -> u64 { self.start.saturating_add(self.size) }
    /// Vrai si `addr` tombe dans la section.
    pub fn contains(&self, addr: u64) -> bool { addr >= self.start && addr < self.end() }
}

/* ─────────────────────────── Byte Reader (LE) ─────────────────────────── */

/// Lecteur séquentiel sur un slice d’octets (helpers LE).
///
/// Une lecture courte renvoie `UnexpectedEof` et ne fait pas avancer le curseur.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    off: usize,
}

impl<'a> ByteReader<'a> {
    /// Construit un lecteur positionné au début.
    pub fn new(data: &'a [u8]) -> Self { Self { data, off: 0 } }

    /// Construit un lecteur positionné à `off` (les offsets restent absolus).
    pub fn at(data: &'a [u8], off: usize) -> CoreResult<Self> {
        if off > data.len() {
            return Err(CoreError::UnexpectedEof { needed: (off - data.len()) as u64, at: data.len() as u64 });
        }
        Ok(Self { data, off })
    }

    /// Offset courant.
    pub fn offset(&self) -> usize { self.off }
    /// Taille totale du flux.
    pub fn len(&self) -> usize { self.data.len() }
    /// Vrai si le flux est vide.
    pub fn is_empty(&self) -> bool { self.data.is_empty() }
    /// Taille restante.
    pub fn remaining(&self) -> usize { self.data.len().saturating_sub(self.off) }

    /// Lit `n` octets (ou erreur si EOF).
    pub fn read_bytes(&mut self, n: usize) -> CoreResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CoreError::UnexpectedEof { needed: n as u64, at: self.off as u64 });
        }
        let start = self.off;
        self.off += n;
        Ok(&self.data[start..self.off])
    }

    /// Lit un octet.
    pub fn read_u8(&mut self) -> CoreResult<u8> { Ok(self.read_bytes(1)?[0]) }

    /// Regarde l’octet courant sans avancer.
    pub fn peek_u8(&self) -> Option<u8> { self.data.get(self.off).copied() }

    /// Lit un u16 LE.
    pub fn read_u16_le(&mut self) -> CoreResult<u16> { Ok(LittleEndian::read_u16(self.read_bytes(2)?)) }

    /// Lit un u32 LE.
    pub fn read_u32_le(&mut self) -> CoreResult<u32> { Ok(LittleEndian::read_u32(self.read_bytes(4)?)) }

    /// Lit un i32 LE.
    pub fn read_i32_le(&mut self) -> CoreResult<i32> { Ok(LittleEndian::read_i32(self.read_bytes(4)?)) }

    /// Lit un u64 LE.
    pub fn read_u64_le(&mut self) -> CoreResult<u64> { Ok(LittleEndian::read_u64(self.read_bytes(8)?)) }

    /// Lit un i64 LE.
    pub fn read_i64_le(&mut self) -> CoreResult<i64> { Ok(LittleEndian::read_i64(self.read_bytes(8)?)) }

    /// Lit un f64 LE (IEEE 754).
    pub fn read_f64_le(&mut self) -> CoreResult<f64> { Ok(LittleEndian::read_f64(self.read_bytes(8)?)) }
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Erreurs de bas niveau communes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Fin de buffer inattendue (lecture courte).
    UnexpectedEof { /// Nombre d’octets demandés.
        needed: u64, /// Offset où l’erreur s’est produite.
        at: u64
    },
    /// Magic absent du registre.
    UnknownMagic { /// Valeur brute (32 bits).
        magic: u32
    },
    /// En-tête `.pyc` invalide.
    BadHeader(Cow<'static, str>),
    /// Données corrompues.
    Corrupted(Cow<'static, str>),
}

impl CoreError {
    /// Construit une erreur « corrompu ».
    pub fn corrupted(msg: impl Into<Cow<'static, str>>) -> Self { CoreError::Corrupted(msg.into()) }
    /// Construit une erreur d’en-tête.
    pub fn bad_header(msg: impl Into<Cow<'static, str>>) -> Self { CoreError::BadHeader(msg.into()) }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::UnexpectedEof { needed, at } => write!(f, "unexpected EOF: need {needed} bytes at {at}"),
            CoreError::UnknownMagic { magic } => write!(f, "unknown magic: 0x{magic:08X}"),
            CoreError::BadHeader(msg) => write!(f, "bad pyc header: {msg}"),
            CoreError::Corrupted(msg) => write!(f, "corrupted: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

/* ─────────────────────────── Prélude (reexports utiles) ─────────────────────────── */

/// Prélude pratique pour importer les types/funcs clés du crate.
pub mod prelude {
    /// Réexports utiles pour une importation rapide.
    pub use super::{
        header_size, lookup, magic_int_within, ByteReader, CoreError, CoreResult, PycVersion, Section,
        PYC_MAGIC_SUFFIX,
    };
}

/* ─────────────────────────── Tests ─────────────────────────── */
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reader_le() -> CoreResult<()> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0xBEEFu16.to_le_bytes());
        bytes.extend_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        bytes.extend_from_slice(&(-42i64).to_le_bytes());
        bytes.extend_from_slice(&3.5f64.to_le_bytes());
        bytes.extend_from_slice(&(-7i32).to_le_bytes());

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_u16_le()?, 0xBEEF);
        assert_eq!(r.read_u32_le()?, 0xDEAD_BEEF);
        assert_eq!(r.read_i64_le()?, -42);
        assert_eq!(r.read_f64_le()?, 3.5);
        assert_eq!(r.read_i32_le()?, -7);
        assert_eq!(r.remaining(), 0);
        Ok(())
    }

    #[test]
    fn short_read_does_not_advance() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        assert_eq!(r.read_u32_le(), Err(CoreError::UnexpectedEof { needed: 4, at: 0 }));
        assert_eq!(r.offset(), 0);
        assert_eq!(r.read_u16_le(), Ok(0x0201));
        assert_eq!(r.read_u16_le(), Err(CoreError::UnexpectedEof { needed: 2, at: 2 }));
        assert_eq!(r.offset(), 2);
    }

    #[test]
    fn reader_at_keeps_absolute_offsets() -> CoreResult<()> {
        let data = [0u8, 0, 0, 0, 0x2A];
        let mut r = ByteReader::at(&data, 4)?;
        assert_eq!(r.offset(), 4);
        assert_eq!(r.read_u8()?, 0x2A);
        assert_eq!(r.offset(), 5);
        assert!(ByteReader::at(&data, 6).is_err());
        Ok(())
    }

    #[test]
    fn section_bounds() {
        let s = Section::new("mod.f", 10, 4);
        assert_eq!(s.end(), 14);
        assert!(s.contains(10));
        assert!(s.contains(13));
        assert!(!s.contains(14));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn section_json() {
        let s = Section::new("m.f", 30, 6);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#"{"name":"m.f","start":30,"size":6}"#);
        let back: Section = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
