//! Décodeur de valeurs marshal.
//!
//! Une session = un [`Decoder`] : curseur, profil de version, table de références
//! et table d’internement. Rien n’est partagé entre deux sessions.

use std::rc::Rc;

use pyc_core::ByteReader;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MarshalError, MarshalResult};
use crate::long::LongAccumulator;
use crate::profile::{FieldWidth, FormatProfile};
use crate::tables::{InternTable, RefTable};
use crate::value::{tag, StrKind, Value};

/// Plus grande longueur acceptée pour une chaîne ou un conteneur.
pub const MAX_SIZE: u32 = 0x7FFF_FFFF;

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 16 * STACK_RED_ZONE;

/* ─────────────────────────── Configuration ─────────────────────────── */

/// Limites d’une session de décodage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DecoderConfig {
    /// Profondeur d’imbrication maximale.
    pub max_depth: usize,
    /// Nombre maximal d’entrées dans la table de références.
    pub max_refs: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self { Self { max_depth: 1000, max_refs: 1 << 20 } }
}

/* ─────────────────────────── Session ─────────────────────────── */

/// Session de décodage sur un flux marshal.
#[derive(Debug)]
pub struct Decoder<'a> {
    reader: ByteReader<'a>,
    profile: FormatProfile,
    config: DecoderConfig,
    refs: RefTable,
    interned: InternTable,
    depth: usize,
}

impl<'a> Decoder<'a> {
    /// Session au début de `data`, configuration par défaut.
    pub fn new(data: &'a [u8], magic: u32) -> MarshalResult<Self> {
        Self::with_config(data, magic, DecoderConfig::default())
    }

    /// Session au début de `data`.
    pub fn with_config(data: &'a [u8], magic: u32, config: DecoderConfig) -> MarshalResult<Self> {
        Self::from_reader(ByteReader::new(data), magic, config)
    }

    /// Session sur un lecteur déjà positionné ; les offsets restent ceux du lecteur.
    pub fn from_reader(reader: ByteReader<'a>, magic: u32, config: DecoderConfig) -> MarshalResult<Self> {
        let profile = FormatProfile::from_magic(magic)?;
        debug!(magic, len = reader.len(), start = reader.offset(), "marshal session");
        Ok(Self {
            reader,
            profile,
            config,
            refs: RefTable::new(config.max_refs),
            interned: InternTable::new(),
            depth: 0,
        })
    }

    /// Offset courant dans le flux.
    pub fn offset(&self) -> u64 { self.reader.offset() as u64 }

    /// Profil de version de la session.
    pub fn profile(&self) -> &FormatProfile { &self.profile }

    /// Configuration de la session.
    pub fn config(&self) -> &DecoderConfig { &self.config }

    /// Taille courante de la table de références.
    pub fn refs_len(&self) -> usize { self.refs.len() }

    /// Taille courante de la table d’internement.
    pub fn interned_len(&self) -> usize { self.interned.len() }

    /// Décode une valeur à la position courante.
    pub fn decode_value(&mut self) -> MarshalResult<Value> {
        if self.depth >= self.config.max_depth {
            return Err(MarshalError::DepthExceeded { limit: self.config.max_depth });
        }
        self.depth += 1;
        // Nouveau segment de pile quand il reste moins que la zone rouge.
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.decode_tagged());
        self.depth -= 1;
        result
    }

    fn decode_tagged(&mut self) -> MarshalResult<Value> {
        let at = self.offset();
        let code = self.reader.read_u8()?;
        let ty = code & !tag::FLAG_REF;
        if !is_supported(ty) {
            return Err(MarshalError::UnsupportedType { tag: ty, at });
        }

        // Réservé avant le contenu : l’index suit l’ordre d’apparition des tags.
        let slot = if code & tag::FLAG_REF != 0 { Some(self.refs.reserve()?) } else { None };
        trace!(at, tag = %char::from(ty), shared = slot.is_some(), "value");

        let value = self.decode_payload(ty)?;
        if let Some(index) = slot {
            self.refs.fill(index, &value);
        }
        Ok(value)
    }

    fn decode_payload(&mut self, ty: u8) -> MarshalResult<Value> {
        Ok(match ty {
            tag::NULL => Value::Null,
            tag::NONE => Value::None,
            tag::TRUE => Value::True,
            tag::FALSE => Value::False,
            tag::STOPITER => Value::StopIteration,
            tag::ELLIPSIS => Value::Ellipsis,
            tag::INT => Value::Int(self.reader.read_i32_le()?),
            tag::INT64 => Value::Int64(self.reader.read_i64_le()?),
            tag::LONG => self.decode_long()?,
            tag::FLOAT => {
                let len = usize::from(self.reader.read_u8()?);
                Value::Float(self.read_text(len)?)
            }
            tag::BINARY_FLOAT => Value::BinaryFloat(self.reader.read_f64_le()?),
            tag::COMPLEX => {
                let real = self.read_complex_part()?;
                let imag = self.read_complex_part()?;
                Value::Complex { real, imag }
            }
            tag::BINARY_COMPLEX => {
                let real = self.reader.read_f64_le()?;
                let imag = self.reader.read_f64_le()?;
                Value::BinaryComplex { real, imag }
            }
            tag::STRING => self.decode_str(StrKind::Bytes)?,
            tag::INTERNED => self.decode_str(StrKind::Interned)?,
            tag::UNICODE => self.decode_str(StrKind::Unicode)?,
            tag::ASCII => self.decode_str(StrKind::Ascii)?,
            tag::ASCII_INTERNED => self.decode_str(StrKind::AsciiInterned)?,
            tag::SHORT_ASCII => self.decode_str(StrKind::ShortAscii)?,
            tag::SHORT_ASCII_INTERNED => self.decode_str(StrKind::ShortAsciiInterned)?,
            tag::STRINGREF => {
                let index = self.reader.read_u32_le()?;
                Value::StringRef { index, data: self.interned.get(index)? }
            }
            tag::TUPLE => {
                let n = self.read_size("tuple")?;
                Value::Tuple(self.decode_items(n)?)
            }
            tag::SMALL_TUPLE => {
                let n = usize::from(self.reader.read_u8()?);
                Value::SmallTuple(self.decode_items(n)?)
            }
            tag::LIST => {
                let n = self.read_size("list")?;
                Value::List(self.decode_items(n)?)
            }
            tag::SET => {
                let n = self.read_size("set")?;
                Value::Set(self.decode_items(n)?)
            }
            tag::FROZENSET => {
                let n = self.read_size("frozenset")?;
                Value::FrozenSet(self.decode_items(n)?)
            }
            tag::DICT => self.decode_dict()?,
            tag::REF => {
                let index = self.reader.read_u32_le()?;
                self.refs.resolve(index)?
            }
            tag::CODE | tag::CODE_LEGACY => Value::Code(Box::new(self.decode_code()?)),
            other => return Err(MarshalError::UnsupportedType { tag: other, at: self.offset() }),
        })
    }

    /* ───────────── Types ───────────── */

    fn decode_long(&mut self) -> MarshalResult<Value> {
        let n = self.reader.read_i32_le()?;
        if n == i32::MIN {
            return Err(MarshalError::SizeOutOfRange { what: "long", size: i64::from(n) });
        }
        let digits = n.unsigned_abs() as usize;
        let mut acc = LongAccumulator::with_digits(digits.min(self.reader.remaining() / 2));
        for _ in 0..digits {
            acc.push_digit(self.reader.read_u16_le()?);
        }
        Ok(Value::Long(acc.finish(n < 0)))
    }

    fn read_complex_part(&mut self) -> MarshalResult<String> {
        let len = if self.profile.wide_complex_len {
            self.read_size("complex")?
        } else {
            usize::from(self.reader.read_u8()?)
        };
        self.read_text(len)
    }

    fn decode_str(&mut self, kind: StrKind) -> MarshalResult<Value> {
        let len = if kind.is_short() { usize::from(self.reader.read_u8()?) } else { self.read_size(kind.label())? };
        let data: Rc<[u8]> = Rc::from(self.reader.read_bytes(len)?);
        if kind.is_interned() {
            self.interned.push(Rc::clone(&data));
        }
        Ok(Value::Str { kind, data })
    }

    fn decode_items(&mut self, n: usize) -> MarshalResult<Vec<Value>> {
        let mut items = Vec::with_capacity(n.min(self.reader.remaining()));
        for _ in 0..n {
            items.push(self.decode_value()?);
        }
        Ok(items)
    }

    fn decode_dict(&mut self) -> MarshalResult<Value> {
        let mut pairs = Vec::new();
        loop {
            let key = self.decode_value()?;
            if key.is_null() {
                break;
            }
            let value = self.decode_value()?;
            if value.is_null() {
                // Fin du dict ; la clé orpheline est abandonnée.
                break;
            }
            pairs.push((key, value));
        }
        Ok(Value::Dict(pairs))
    }

    /* ───────────── Lectures ───────────── */

    /// Longueur 32 bits bornée à [`MAX_SIZE`] ; rien n’est lu au-delà en cas de refus.
    pub(crate) fn read_size(&mut self, what: &'static str) -> MarshalResult<usize> {
        let n = self.reader.read_u32_le()?;
        if n > MAX_SIZE {
            return Err(MarshalError::SizeOutOfRange { what, size: i64::from(n) });
        }
        Ok(n as usize)
    }

    /// Entier de code object selon sa largeur (0 si absent).
    pub(crate) fn read_field(&mut self, width: FieldWidth) -> MarshalResult<u32> {
        Ok(match width {
            FieldWidth::Absent => 0,
            FieldWidth::U16 => u32::from(self.reader.read_u16_le()?),
            FieldWidth::U32 => self.reader.read_u32_le()?,
        })
    }

    fn read_text(&mut self, len: usize) -> MarshalResult<String> {
        Ok(String::from_utf8_lossy(self.reader.read_bytes(len)?).into_owned())
    }

    /// Valeurs en fin de session (diagnostic).
    pub(crate) fn log_summary(&self) {
        debug!(offset = self.offset(), refs = self.refs.len(), interned = self.interned.len(), "marshal session done");
    }
}

fn is_supported(ty: u8) -> bool {
    matches!(
        ty,
        tag::NULL
            | tag::NONE
            | tag::TRUE
            | tag::FALSE
            | tag::STOPITER
            | tag::ELLIPSIS
            | tag::INT
            | tag::INT64
            | tag::LONG
            | tag::FLOAT
            | tag::BINARY_FLOAT
            | tag::COMPLEX
            | tag::BINARY_COMPLEX
            | tag::STRING
            | tag::INTERNED
            | tag::UNICODE
            | tag::ASCII
            | tag::ASCII_INTERNED
            | tag::SHORT_ASCII
            | tag::SHORT_ASCII_INTERNED
            | tag::STRINGREF
            | tag::TUPLE
            | tag::SMALL_TUPLE
            | tag::LIST
            | tag::SET
            | tag::FROZENSET
            | tag::DICT
            | tag::REF
            | tag::CODE
            | tag::CODE_LEGACY
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use pretty_assertions::assert_eq;

    const PY38: u32 = 3413;
    const PY27: u32 = 62211;

    fn decode(bytes: &[u8]) -> MarshalResult<Value> { Decoder::new(bytes, PY38)?.decode_value() }

    #[test]
    fn singletons_consume_one_byte() {
        for (byte, expected) in [(b'N', Value::None), (b'T', Value::True), (b'F', Value::False)] {
            let data = [byte, b'N'];
            let mut d = Decoder::new(&data, PY38).unwrap();
            assert_eq!(d.decode_value(), Ok(expected));
            assert_eq!(d.offset(), 1);
        }
    }

    #[test]
    fn ints() {
        assert_eq!(decode(&[b'i', 0xfe, 0xff, 0xff, 0xff]), Ok(Value::Int(-2)));
        let mut data = vec![b'I'];
        data.extend_from_slice(&(1i64 << 40).to_le_bytes());
        assert_eq!(decode(&data), Ok(Value::Int64(1 << 40)));
        assert!(matches!(decode(&[b'i', 1, 2]), Err(MarshalError::ShortRead { needed: 4, at: 1 })));
    }

    #[test]
    fn longs() {
        assert_eq!(decode(&[b'l', 0, 0, 0, 0]), Ok(Value::Long(BigInt::from(0))));
        let neg = [b'l', 0xfe, 0xff, 0xff, 0xff, 1, 0, 0, 0];
        assert_eq!(decode(&neg), Ok(Value::Long(BigInt::from(-1))));
        assert!(matches!(decode(&[b'l', 0, 0, 0, 0x80]), Err(MarshalError::SizeOutOfRange { what: "long", .. })));
    }

    #[test]
    fn floats_and_complex() {
        assert_eq!(decode(&[b'f', 3, b'1', b'.', b'5']), Ok(Value::Float("1.5".into())));
        let mut data = vec![b'g'];
        data.extend_from_slice(&0.25f64.to_le_bytes());
        assert_eq!(decode(&data), Ok(Value::BinaryFloat(0.25)));

        let narrow = [b'x', 1, b'1', 1, b'2'];
        assert_eq!(decode(&narrow), Ok(Value::Complex { real: "1".into(), imag: "2".into() }));

        let wide = [b'x', 1, 0, 0, 0, b'1', 1, 0, 0, 0, b'2'];
        let v = Decoder::new(&wide, PY27).unwrap().decode_value();
        assert_eq!(v, Ok(Value::Complex { real: "1".into(), imag: "2".into() }));
    }

    #[test]
    fn interned_strings_feed_stringref() {
        let data = [b'(', 2, 0, 0, 0, b'Z', 2, b'h', b'i', b'R', 0, 0, 0, 0];
        let mut d = Decoder::new(&data, PY38).unwrap();
        let v = d.decode_value().unwrap();
        assert_eq!(d.interned_len(), 1);
        let items = v.as_tuple().unwrap();
        assert_eq!(items[1].as_bytes(), Some(&b"hi"[..]));
        assert!(matches!(items[1], Value::StringRef { index: 0, .. }));
    }

    #[test]
    fn oversized_lengths_stop_before_payload() {
        let data = [b's', 0x00, 0x00, 0x00, 0x80, b'x'];
        let mut d = Decoder::new(&data, PY38).unwrap();
        assert!(matches!(d.decode_value(), Err(MarshalError::SizeOutOfRange { what: "string", .. })));
        assert_eq!(d.offset(), 5);
    }

    #[test]
    fn dict_ends_on_null_key() {
        let data = [b'{', b'z', 1, b'k', b'i', 1, 0, 0, 0, b'0'];
        let expected = Value::Dict(vec![(Value::str(StrKind::ShortAscii, &b"k"[..]), Value::Int(1))]);
        assert_eq!(decode(&data), Ok(expected));
        assert_eq!(decode(&[b'{', b'N', b'0']), Ok(Value::Dict(vec![])));
        assert!(matches!(decode(&[b'{', b'N']), Err(MarshalError::ShortRead { .. })));
    }

    #[test]
    fn dict_null_value_ends_without_the_pending_key() {
        let data = [b'{', b'z', 1, b'k', b'i', 1, 0, 0, 0, b'z', 1, b'j', b'0', b'N'];
        let mut d = Decoder::new(&data, PY38).unwrap();
        let expected = Value::Dict(vec![(Value::str(StrKind::ShortAscii, &b"k"[..]), Value::Int(1))]);
        assert_eq!(d.decode_value(), Ok(expected));
        assert_eq!(d.offset(), 13);
        // Une vraie erreur dans la valeur reste fatale.
        assert!(matches!(decode(&[b'{', b'N', b'?']), Err(MarshalError::UnsupportedType { tag: b'?', .. })));
    }

    #[test]
    fn flagged_values_are_backreferenced() {
        // [ (1,)*, ref 0 ]
        let data = [b'[', 2, 0, 0, 0, b')' | 0x80, 1, b'N', b'r', 0, 0, 0, 0];
        let mut d = Decoder::new(&data, PY38).unwrap();
        let v = d.decode_value().unwrap();
        assert_eq!(d.refs_len(), 1);
        let one = Value::SmallTuple(vec![Value::None]);
        assert_eq!(v, Value::List(vec![one.clone(), one]));
    }

    #[test]
    fn self_reference_is_rejected() {
        let data = [b'[' | 0x80, 1, 0, 0, 0, b'r', 0, 0, 0, 0];
        assert_eq!(decode(&data), Err(MarshalError::PendingReference { index: 0 }));
        assert_eq!(decode(&[b'r', 0, 0, 0, 0]), Err(MarshalError::RefOutOfRange { index: 0, len: 0 }));
    }

    #[test]
    fn unsupported_tag_consumes_only_the_tag() {
        let data = [b'?', 1, 2];
        let mut d = Decoder::new(&data, PY38).unwrap();
        assert_eq!(d.decode_value(), Err(MarshalError::UnsupportedType { tag: b'?', at: 0 }));
        assert_eq!(d.offset(), 1);
        assert_eq!(d.refs_len(), 0);
    }

    #[test]
    fn depth_limit() {
        let data = [b')', 1, b')', 1, b')', 1, b'N'];
        let config = DecoderConfig { max_depth: 3, ..DecoderConfig::default() };
        let mut d = Decoder::with_config(&data, PY38, config).unwrap();
        assert_eq!(d.decode_value(), Err(MarshalError::DepthExceeded { limit: 3 }));
    }

    #[test]
    fn unknown_magic_fails_up_front() {
        assert!(matches!(Decoder::new(&[b'N'], 1), Err(MarshalError::Version(_))));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_defaults_from_json() {
        let c: DecoderConfig = serde_json::from_str(r#"{"max_depth": 12}"#).unwrap();
        assert_eq!(c, DecoderConfig { max_depth: 12, max_refs: 1 << 20 });
    }
}
