//! Profil de format : largeur et présence des champs d’un code object selon l’époque.

use pyc_core::magic::{magic_int_since, magic_int_within};
use pyc_core::CoreResult;

/// Largeur d’un champ entier du code object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldWidth {
    /// Champ absent du flux (vaut 0).
    Absent,
    /// u16 LE.
    U16,
    /// u32 LE.
    U32,
}

/// Règles de lecture dérivées d’un tag de version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatProfile {
    /// Tag de version d’origine.
    pub magic: u32,
    /// `co_argcount`.
    pub argcount: FieldWidth,
    /// `co_posonlyargcount` (u32) présent.
    pub posonlyargcount: bool,
    /// `co_kwonlyargcount` (u32) présent.
    pub kwonlyargcount: bool,
    /// `co_nlocals`.
    pub nlocals: FieldWidth,
    /// `co_stacksize`.
    pub stacksize: FieldWidth,
    /// `co_flags`.
    pub flags: FieldWidth,
    /// `co_varnames` présent.
    pub varnames: bool,
    /// `co_freevars` et `co_cellvars` présents.
    pub free_cell_vars: bool,
    /// `co_firstlineno`.
    pub firstlineno: FieldWidth,
    /// Table des lignes présente.
    pub lnotab: bool,
    /// Disposition 3.11+ : `localsplusnames`, `localspluskinds`, `qualname`, `exceptiontable`.
    pub localsplus: bool,
    /// Composantes de `TYPE_COMPLEX` préfixées sur 32 bits.
    pub wide_complex_len: bool,
}

impl FormatProfile {
    /// Dérive le profil ; `UnknownMagic` si le tag n’est pas enregistré.
    pub fn from_magic(magic: u32) -> CoreResult<Self> {
        let m = magic & 0xffff;
        let v10_to_12 = magic_int_within(magic, 39170, 16679)?;
        let v11_to_14 = magic_int_within(magic, 39170, 20117)?;
        let v13_to_20 = magic_int_within(magic, 11913, 50824)?;
        let v13_to_22 = magic_int_within(magic, 11913, 60718)?;
        let v15_to_22 = magic_int_within(magic, 20121, 60718)?;
        let posonly = magic_int_since(magic, 3410)?;
        // Les pré-versions 3.11 suivent déjà la disposition finale.
        let localsplus = magic_int_since(magic, 3450)?;

        let classic = if v13_to_22 {
            FieldWidth::U16
        } else if v10_to_12 {
            FieldWidth::Absent
        } else {
            FieldWidth::U32
        };

        Ok(Self {
            magic,
            argcount: classic,
            posonlyargcount: posonly,
            kwonlyargcount: 3020 < m && m < 20121 && !v11_to_14,
            nlocals: if localsplus { FieldWidth::Absent } else { classic },
            stacksize: if v15_to_22 {
                FieldWidth::U16
            } else if v11_to_14 {
                FieldWidth::Absent
            } else {
                FieldWidth::U32
            },
            flags: classic,
            varnames: !v10_to_12 && !localsplus,
            free_cell_vars: !(v10_to_12 || v13_to_20) && !localsplus,
            firstlineno: if v15_to_22 {
                FieldWidth::U16
            } else if v11_to_14 {
                FieldWidth::Absent
            } else {
                FieldWidth::U32
            },
            lnotab: !v11_to_14,
            localsplus,
            wide_complex_len: m > 62061,
        })
    }
}
