//! Points d’entrée : flux marshal brut ou fichier `.pyc` complet.

use pyc_core::magic::{header_size, read_magic};
use pyc_core::{lookup, ByteReader, CoreError, PycVersion, Section};

use crate::decoder::{Decoder, DecoderConfig};
use crate::error::MarshalResult;
use crate::sections::extract_sections;
use crate::value::{CodeObject, Value};

/// Valeur racine et sections extraites.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Valeur racine du flux.
    pub root: Value,
    /// Sections, parcours en profondeur.
    pub sections: Vec<Section>,
}

impl Decoded {
    fn from_root(root: Value) -> Self {
        let sections = extract_sections(&root).sections;
        Self { root, sections }
    }

    /// Code objects des sections, dans le même ordre.
    pub fn code_objects(&self) -> Vec<&CodeObject> { extract_sections(&self.root).code_objects }
}

/// Décode la valeur racine d’un flux marshal brut.
pub fn decode(data: &[u8], magic: u32) -> MarshalResult<Value> {
    run(Decoder::new(data, magic)?)
}

/// Décode un flux marshal brut puis extrait ses sections.
pub fn decode_sections(data: &[u8], magic: u32) -> MarshalResult<Decoded> { decode(data, magic).map(Decoded::from_root) }

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn run(mut decoder: Decoder<'_>) -> MarshalResult<Value> {
    let result = decoder.decode_value();
    match &result {
        Ok(_) => decoder.log_summary(),
        Err(e) => warn!(error = %e, offset = decoder.offset(), "marshal decode failed"),
    }
    result
}

/// Fichier `.pyc` décodé.
#[derive(Debug, Clone, PartialEq)]
pub struct PycFile {
    /// Tag de version lu en tête.
    pub magic: u32,
    /// Entrée du registre correspondante.
    pub version: &'static PycVersion,
    /// Offset du flux marshal (taille de l’en-tête).
    pub header_size: usize,
    /// Contenu décodé ; les offsets des sections sont relatifs au fichier.
    pub decoded: Decoded,
}

impl PycFile {
    /// Décode un fichier `.pyc` avec la configuration par défaut.
    pub fn parse(data: &[u8]) -> MarshalResult<Self> { Self::parse_with_config(data, DecoderConfig::default()) }

    /// Décode un fichier `.pyc`.
    pub fn parse_with_config(data: &[u8], config: DecoderConfig) -> MarshalResult<Self> {
        let magic = read_magic(data)?;
        let version = lookup(magic).ok_or(CoreError::UnknownMagic { magic })?;
        let header_size = header_size(magic)?;
        if data.len() < header_size {
            return Err(CoreError::bad_header(format!("header needs {header_size} bytes, file has {}", data.len())).into());
        }
        debug!(magic, version = version.version, header_size, "pyc header");

        let reader = ByteReader::at(data, header_size)?;
        let root = run(Decoder::from_reader(reader, magic, config)?)?;
        Ok(Self { magic, version, header_size, decoded: Decoded::from_root(root) })
    }

    /// Sections du fichier.
    pub fn sections(&self) -> &[Section] { &self.decoded.sections }

    /// Valeur racine.
    pub fn root(&self) -> &Value { &self.decoded.root }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MarshalError;
    use pretty_assertions::assert_eq;

    #[test]
    fn non_code_root_has_no_sections() {
        let d = decode_sections(&[b')', 1, b'i', 1, 0, 0, 0], 3413).unwrap();
        assert_eq!(d.root, Value::SmallTuple(vec![Value::Int(1)]));
        assert!(d.sections.is_empty());
        assert!(d.code_objects().is_empty());
    }

    #[test]
    fn pyc_header_is_skipped() {
        let mut data = vec![0x55, 0x0d, 0x0d, 0x0a];
        data.extend_from_slice(&[0; 12]);
        data.push(b'N');
        let file = PycFile::parse(&data).unwrap();
        assert_eq!(file.version.version, "3.8b4");
        assert_eq!(file.header_size, 16);
        assert_eq!(file.root(), &Value::None);
    }

    #[test]
    fn truncated_header() {
        let data = [0x55, 0x0d, 0x0d, 0x0a, 0, 0];
        assert!(matches!(PycFile::parse(&data), Err(MarshalError::Version(CoreError::BadHeader(_)))));
    }

    #[test]
    fn unknown_magic() {
        let data = [0x01, 0x00, 0x0d, 0x0a, 0, 0, 0, 0, b'N'];
        assert!(matches!(PycFile::parse(&data), Err(MarshalError::Version(CoreError::UnknownMagic { .. }))));
    }
}
