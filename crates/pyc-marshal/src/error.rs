//! Erreurs du décodeur marshal.
//!
//! Deux familles distinctes :
//! - [`MarshalError`] : flux corrompu, fatal pour la valeur en cours et, par
//!   propagation, pour toute la session de décodage ;
//! - [`SkipReason`] : un nœud de l’arbre de code objects n’est pas extractible ;
//!   l’extracteur l’ignore et continue avec les frères.

use std::borrow::Cow;

use pyc_core::CoreError;
use thiserror::Error;

/// Alias résultat du décodeur.
pub type MarshalResult<T> = core::result::Result<T, MarshalError>;

/// Erreur de décodage d’un flux marshal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    /// Flux épuisé au milieu d’un champ.
    #[error("bad marshal data (short read: need {needed} bytes at {at})")]
    ShortRead {
        /// Octets demandés.
        needed: u64,
        /// Offset de la lecture.
        at: u64,
    },

    /// Longueur ou cardinal déclaré au-delà de `0x7FFFFFFF`.
    #[error("bad marshal data ({what} size out of range: {size})")]
    SizeOutOfRange {
        /// Nature de la valeur (`string`, `tuple`, …).
        what: &'static str,
        /// Taille lue.
        size: i64,
    },

    /// `TYPE_STRINGREF` vers un index absent de la table d’internement.
    #[error("bad marshal data (string ref out of range: {index} >= {len})")]
    StringRefOutOfRange {
        /// Index lu.
        index: u32,
        /// Taille courante de la table.
        len: usize,
    },

    /// `TYPE_REF` vers un index absent de la table de références.
    #[error("bad marshal data (invalid reference: {index} >= {len})")]
    RefOutOfRange {
        /// Index lu.
        index: u32,
        /// Taille courante de la table.
        len: usize,
    },

    /// `TYPE_REF` vers une valeur dont le contenu est encore en cours de décodage.
    #[error("bad marshal data (reference {index} to an object still being decoded)")]
    PendingReference {
        /// Index lu.
        index: u32,
    },

    /// Tag sans décodeur.
    #[error("bad marshal data (unsupported type 0x{tag:02x} at {at})")]
    UnsupportedType {
        /// Tag (sans le bit de partage).
        tag: u8,
        /// Offset du tag.
        at: u64,
    },

    /// Imbrication au-delà de `DecoderConfig::max_depth`.
    #[error("bad marshal data (nesting deeper than {limit})")]
    DepthExceeded {
        /// Limite configurée.
        limit: usize,
    },

    /// Structure incohérente.
    #[error("bad marshal data ({0})")]
    Malformed(Cow<'static, str>),

    /// Magic / en-tête.
    #[error(transparent)]
    Version(CoreError),
}

impl MarshalError {
    /// Construit une erreur « structure incohérente ».
    pub fn malformed(msg: impl Into<Cow<'static, str>>) -> Self { Self::Malformed(msg.into()) }

    /// Catégorie de l’erreur.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ShortRead { .. } => ErrorKind::ShortRead,
            Self::SizeOutOfRange { .. } => ErrorKind::SizeOutOfRange,
            Self::StringRefOutOfRange { .. } | Self::RefOutOfRange { .. } | Self::PendingReference { .. } => {
                ErrorKind::BadReference
            }
            Self::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            Self::DepthExceeded { .. } => ErrorKind::Limit,
            Self::Malformed(_) => ErrorKind::Malformed,
            Self::Version(_) => ErrorKind::Version,
        }
    }
}

impl From<CoreError> for MarshalError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::UnexpectedEof { needed, at } => Self::ShortRead { needed, at },
            other => Self::Version(other),
        }
    }
}

/// Catégories d’erreurs de flux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Lecture courte.
    ShortRead,
    /// Taille hors bornes.
    SizeOutOfRange,
    /// Référence (objet ou chaîne) invalide.
    BadReference,
    /// Tag non supporté.
    UnsupportedType,
    /// Limite de configuration atteinte.
    Limit,
    /// Structure incohérente.
    Malformed,
    /// Magic inconnu ou en-tête invalide.
    Version,
}

/// Raison pour laquelle un nœud ne produit pas de section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum SkipReason {
    /// La valeur n’est pas un code object.
    #[error("not a code object")]
    NotCode,
    /// Le champ `name` est absent (NULL).
    #[error("code object has no name")]
    Unnamed,
    /// Le champ `name` n’est pas une chaîne ascii/bytes/internée.
    #[error("code object name is not a plain string")]
    NameNotText,
    /// Le champ `name` est vide.
    #[error("code object name is empty")]
    EmptyName,
    /// `consts` n’est pas un tuple : la section est émise mais la descente s’arrête.
    #[error("consts is not a tuple")]
    ConstsNotTuple,
}
