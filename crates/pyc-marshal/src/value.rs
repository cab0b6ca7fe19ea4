//! Modèle de valeurs marshal.
//!
//! Une `Value` par tag de type ; le tag détermine entièrement la forme du contenu.
//! `Clone` est une copie profonde : les conteneurs dupliquent leurs enfants, seuls
//! les octets immuables des chaînes (`Rc<[u8]>`) sont partagés.

use std::borrow::Cow;
use std::rc::Rc;

use bitflags::bitflags;
use num_bigint::BigInt;

/// Tags de type (octet de tête, bit de partage retiré).
pub mod tag {
    /// Bit « partageable » : la valeur est enregistrée dans la table de références.
    pub const FLAG_REF: u8 = 0x80;

    /// Absence de valeur (fin de dict).
    pub const NULL: u8 = b'0';
    /// `None`.
    pub const NONE: u8 = b'N';
    /// `False`.
    pub const FALSE: u8 = b'F';
    /// `True`.
    pub const TRUE: u8 = b'T';
    /// `StopIteration`.
    pub const STOPITER: u8 = b'S';
    /// `Ellipsis`.
    pub const ELLIPSIS: u8 = b'.';
    /// Entier signé 32 bits.
    pub const INT: u8 = b'i';
    /// Entier signé 64 bits.
    pub const INT64: u8 = b'I';
    /// Flottant texte (longueur 8 bits).
    pub const FLOAT: u8 = b'f';
    /// Flottant IEEE 754 sur 8 octets.
    pub const BINARY_FLOAT: u8 = b'g';
    /// Complexe texte.
    pub const COMPLEX: u8 = b'x';
    /// Complexe binaire (deux flottants IEEE 754).
    pub const BINARY_COMPLEX: u8 = b'y';
    /// Entier multi-précision, chiffres de 15 bits.
    pub const LONG: u8 = b'l';
    /// Chaîne d’octets.
    pub const STRING: u8 = b's';
    /// Chaîne d’octets internée.
    pub const INTERNED: u8 = b't';
    /// Rétro-référence vers la table de références.
    pub const REF: u8 = b'r';
    /// Tuple, cardinal 32 bits.
    pub const TUPLE: u8 = b'(';
    /// Liste.
    pub const LIST: u8 = b'[';
    /// Dictionnaire terminé par `NULL`.
    pub const DICT: u8 = b'{';
    /// Code object.
    pub const CODE: u8 = b'c';
    /// Code object des toutes premières versions.
    pub const CODE_LEGACY: u8 = b'C';
    /// Chaîne unicode (UTF-8).
    pub const UNICODE: u8 = b'u';
    /// Type inconnu ; jamais décodé.
    pub const UNKNOWN: u8 = b'?';
    /// Ensemble.
    pub const SET: u8 = b'<';
    /// Ensemble figé.
    pub const FROZENSET: u8 = b'>';
    /// Chaîne ASCII.
    pub const ASCII: u8 = b'a';
    /// Chaîne ASCII internée.
    pub const ASCII_INTERNED: u8 = b'A';
    /// Tuple, cardinal 8 bits.
    pub const SMALL_TUPLE: u8 = b')';
    /// Chaîne ASCII, longueur 8 bits.
    pub const SHORT_ASCII: u8 = b'z';
    /// Chaîne ASCII internée, longueur 8 bits.
    pub const SHORT_ASCII_INTERNED: u8 = b'Z';
    /// Référence à la table d’internement.
    pub const STRINGREF: u8 = b'R';
}

/// Variante d’une chaîne marshal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrKind {
    /// `s` : chaîne d’octets.
    Bytes,
    /// `t` : chaîne d’octets internée.
    Interned,
    /// `u` : unicode (UTF-8).
    Unicode,
    /// `a`
    Ascii,
    /// `A`
    AsciiInterned,
    /// `z` (longueur sur 8 bits)
    ShortAscii,
    /// `Z` (longueur sur 8 bits)
    ShortAsciiInterned,
}

impl StrKind {
    /// Tag marshal.
    pub const fn tag(self) -> u8 {
        match self {
            Self::Bytes => tag::STRING,
            Self::Interned => tag::INTERNED,
            Self::Unicode => tag::UNICODE,
            Self::Ascii => tag::ASCII,
            Self::AsciiInterned => tag::ASCII_INTERNED,
            Self::ShortAscii => tag::SHORT_ASCII,
            Self::ShortAsciiInterned => tag::SHORT_ASCII_INTERNED,
        }
    }

    /// Vrai si le contenu est ajouté à la table d’internement.
    pub const fn is_interned(self) -> bool {
        matches!(self, Self::Interned | Self::AsciiInterned | Self::ShortAsciiInterned)
    }

    /// Vrai si la longueur est codée sur 8 bits.
    pub const fn is_short(self) -> bool { matches!(self, Self::ShortAscii | Self::ShortAsciiInterned) }

    /// Nom utilisé dans les messages d’erreur.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bytes | Self::Interned => "string",
            Self::Unicode => "unicode",
            _ => "ascii",
        }
    }
}

/// Valeur marshal décodée.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence de valeur ; termine un dict.
    Null,
    /// `None`
    None,
    /// `True`
    True,
    /// `False`
    False,
    /// `StopIteration`
    StopIteration,
    /// `...`
    Ellipsis,
    /// Entier 32 bits.
    Int(i32),
    /// Entier 64 bits.
    Int64(i64),
    /// Entier multi-précision.
    Long(BigInt),
    /// Flottant, forme texte brute.
    Float(String),
    /// Flottant binaire (IEEE 754).
    BinaryFloat(f64),
    /// Complexe, composantes texte.
    Complex {
        /// Partie réelle.
        real: String,
        /// Partie imaginaire.
        imag: String,
    },
    /// Complexe binaire.
    BinaryComplex {
        /// Partie réelle.
        real: f64,
        /// Partie imaginaire.
        imag: f64,
    },
    /// Chaîne (toutes variantes sauf référence).
    Str {
        /// Variante.
        kind: StrKind,
        /// Contenu brut.
        data: Rc<[u8]>,
    },
    /// Vue sur une entrée de la table d’internement.
    StringRef {
        /// Index dans la table.
        index: u32,
        /// Octets partagés avec la table.
        data: Rc<[u8]>,
    },
    /// Tuple (cardinal 32 bits).
    Tuple(Vec<Value>),
    /// Tuple court (cardinal 8 bits).
    SmallTuple(Vec<Value>),
    /// Liste.
    List(Vec<Value>),
    /// Dictionnaire, paires dans l’ordre du flux.
    Dict(Vec<(Value, Value)>),
    /// Ensemble.
    Set(Vec<Value>),
    /// Ensemble figé.
    FrozenSet(Vec<Value>),
    /// Code object.
    Code(Box<CodeObject>),
}

impl Value {
    /// Construit une chaîne.
    pub fn str(kind: StrKind, data: impl Into<Rc<[u8]>>) -> Self { Self::Str { kind, data: data.into() } }

    /// Tag marshal de la valeur.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Null => tag::NULL,
            Self::None => tag::NONE,
            Self::True => tag::TRUE,
            Self::False => tag::FALSE,
            Self::StopIteration => tag::STOPITER,
            Self::Ellipsis => tag::ELLIPSIS,
            Self::Int(_) => tag::INT,
            Self::Int64(_) => tag::INT64,
            Self::Long(_) => tag::LONG,
            Self::Float(_) => tag::FLOAT,
            Self::BinaryFloat(_) => tag::BINARY_FLOAT,
            Self::Complex { .. } => tag::COMPLEX,
            Self::BinaryComplex { .. } => tag::BINARY_COMPLEX,
            Self::Str { kind, .. } => kind.tag(),
            Self::StringRef { .. } => tag::STRINGREF,
            Self::Tuple(_) => tag::TUPLE,
            Self::SmallTuple(_) => tag::SMALL_TUPLE,
            Self::List(_) => tag::LIST,
            Self::Dict(_) => tag::DICT,
            Self::Set(_) => tag::SET,
            Self::FrozenSet(_) => tag::FROZENSET,
            Self::Code(_) => tag::CODE,
        }
    }

    /// Nom lisible du type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::None => "none",
            Self::True | Self::False => "bool",
            Self::StopIteration => "stopiter",
            Self::Ellipsis => "ellipsis",
            Self::Int(_) | Self::Int64(_) | Self::Long(_) => "int",
            Self::Float(_) | Self::BinaryFloat(_) => "float",
            Self::Complex { .. } | Self::BinaryComplex { .. } => "complex",
            Self::Str { kind, .. } => kind.label(),
            Self::StringRef { .. } => "stringref",
            Self::Tuple(_) | Self::SmallTuple(_) => "tuple",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::Set(_) => "set",
            Self::FrozenSet(_) => "frozenset",
            Self::Code(_) => "code",
        }
    }

    /// Octets bruts si la valeur est une chaîne (y compris une référence internée).
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Str { data, .. } | Self::StringRef { data, .. } => Some(data.as_ref()),
            _ => None,
        }
    }

    /// Texte (UTF-8 avec remplacement) si la valeur est une chaîne.
    pub fn as_text(&self) -> Option<Cow<'_, str>> { self.as_bytes().map(String::from_utf8_lossy) }

    /// Éléments si la valeur est un tuple (court ou non).
    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Self::Tuple(items) | Self::SmallTuple(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Code object contenu.
    pub fn as_code(&self) -> Option<&CodeObject> {
        match self {
            Self::Code(code) => Some(code.as_ref()),
            _ => None,
        }
    }

    /// Vrai pour `Null`.
    pub fn is_null(&self) -> bool { matches!(self, Self::Null) }
}

bitflags! {
    /// Drapeaux `co_flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CodeFlags: u32 {
        /// Locales dans un tableau.
        const OPTIMIZED          = 0x0001;
        /// Nouvel espace de noms local à chaque appel.
        const NEWLOCALS          = 0x0002;
        /// `*args`.
        const VARARGS            = 0x0004;
        /// `**kwargs`.
        const VARKEYWORDS        = 0x0008;
        /// Fonction imbriquée.
        const NESTED             = 0x0010;
        /// Générateur.
        const GENERATOR          = 0x0020;
        /// Aucune variable libre ni cellule.
        const NOFREE             = 0x0040;
        /// Coroutine (`async def`).
        const COROUTINE          = 0x0080;
        /// Générateur utilisable avec `await`.
        const ITERABLE_COROUTINE = 0x0100;
        /// Générateur asynchrone.
        const ASYNC_GENERATOR    = 0x0200;
    }
}

/// Code object reconstruit.
///
/// Les champs absents pour l’époque du flux valent 0 (compteurs) ou `None`.
/// `start_offset..end_offset` couvre les octets de bytecode dans le flux d’entrée.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeObject {
    /// Arguments positionnels.
    pub argcount: u32,
    /// Arguments positionnels seuls (3.8+).
    pub posonlyargcount: u32,
    /// Arguments nommés seuls (3.0+).
    pub kwonlyargcount: u32,
    /// Variables locales (avant 3.11).
    pub nlocals: u32,
    /// Profondeur de pile maximale.
    pub stacksize: u32,
    /// `co_flags` bruts ; voir [`CodeObject::code_flags`].
    pub flags: u32,
    /// Bytecode (chaîne d’octets).
    pub code: Value,
    /// Constantes, en général un tuple.
    pub consts: Value,
    /// Noms globaux et attributs.
    pub names: Value,
    /// Noms des locales (avant 3.11).
    pub varnames: Option<Value>,
    /// Variables libres (avant 3.11).
    pub freevars: Option<Value>,
    /// Cellules (avant 3.11).
    pub cellvars: Option<Value>,
    /// 3.11+ : noms des locales, libres et cellules.
    pub localsplusnames: Option<Value>,
    /// 3.11+ : genre de chaque entrée de `localsplusnames`.
    pub localspluskinds: Option<Value>,
    /// Fichier source.
    pub filename: Value,
    /// Nom de la fonction, de la classe ou du module.
    pub name: Value,
    /// 3.11+.
    pub qualname: Option<Value>,
    /// Première ligne source.
    pub firstlineno: u32,
    /// `co_lnotab` puis `co_linetable` (3.10+).
    pub lnotab: Option<Value>,
    /// 3.11+.
    pub exceptiontable: Option<Value>,
    /// Offset du premier octet de bytecode.
    pub start_offset: u64,
    /// Offset qui suit le dernier octet de bytecode.
    pub end_offset: u64,
}

impl CodeObject {
    /// Drapeaux typés (bits inconnus conservés).
    pub fn code_flags(&self) -> CodeFlags { CodeFlags::from_bits_retain(self.flags) }

    /// Nom du code object si c’est une chaîne.
    pub fn name_text(&self) -> Option<Cow<'_, str>> { self.name.as_text() }

    /// Octets de bytecode.
    pub fn bytecode(&self) -> Option<&[u8]> { self.code.as_bytes() }

    /// Taille du bytecode dans le flux.
    pub fn code_size(&self) -> u64 { self.end_offset.saturating_sub(self.start_offset) }

    /// Constantes (vide si `consts` n’est pas un tuple).
    pub fn consts(&self) -> &[Value] { self.consts.as_tuple().unwrap_or(&[]) }

    /// Code objects imbriqués directement dans `consts`.
    pub fn children(&self) -> impl Iterator<Item = &CodeObject> { self.consts().iter().filter_map(Value::as_code) }
}
