//! pyc-marshal — décodeur du format marshal (`.pyc`)
//!
//! Pipeline :
//! ```text
//! octets ──▶ Decoder (curseur + profil de version + tables de session)
//!        ──▶ Value racine (souvent un code object)
//!        ──▶ extract_sections : Section { "module.classe.méthode", start, size }
//! ```
//!
//! API :
//! - [`decode`] / [`decode_sections`] : flux marshal brut, tag de version fourni à part
//! - [`PycFile::parse`] : fichier `.pyc` (magic, en-tête, puis flux marshal)
//! - [`Decoder`] : session bas niveau, une valeur à la fois
//!
//! Features :
//! - `serde` (par défaut) : `DecoderConfig` et `Section` (dé)sérialisables
//! - `tracing` (par défaut) : événements de session, de tag et d’extraction

#![deny(missing_docs)]

/* ─────────────────────────── Modules ─────────────────────────── */

#[macro_use]
mod log;

mod code;
mod decoder;
mod error;
mod long;
mod profile;
mod pyc;
mod repr;
mod sections;
mod tables;
mod value;

/* ─────────────────────────── Réexports ─────────────────────────── */

pub use decoder::{Decoder, DecoderConfig, MAX_SIZE};
pub use error::{ErrorKind, MarshalError, MarshalResult, SkipReason};
pub use long::{to_hex_text, LongAccumulator, DIGIT_BITS};
pub use profile::{FieldWidth, FormatProfile};
pub use pyc::{decode, decode_sections, Decoded, PycFile};
pub use repr::format_g15;
pub use sections::{extract_node, extract_sections, Extraction};
pub use tables::{InternTable, RefTable};
pub use value::{tag, CodeFlags, CodeObject, StrKind, Value};

pub use pyc_core::{PycVersion, Section};

/// Prélude : types et fonctions d’usage courant.
pub mod prelude {
    pub use super::{
        decode, decode_sections, extract_sections, CodeObject, Decoded, Decoder, DecoderConfig, MarshalError,
        MarshalResult, PycFile, Section, Value,
    };
}
