//! Extraction des sections : un chemin pointé et une plage de bytecode par code object.
//!
//! Parcours en profondeur depuis la racine à travers les tuples `consts`. Un nœud
//! non extractible ne produit rien mais n’interrompt jamais ses frères.

use std::borrow::Cow;

use pyc_core::Section;

use crate::error::SkipReason;
use crate::value::{CodeObject, StrKind, Value};

/// Résultat d’une extraction, dans l’ordre du parcours.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction<'a> {
    /// Sections émises.
    pub sections: Vec<Section>,
    /// Code object de chaque section (même index).
    pub code_objects: Vec<&'a CodeObject>,
}

/// Extrait toutes les sections atteignables depuis `root`.
pub fn extract_sections(root: &Value) -> Extraction<'_> {
    let mut out = Extraction::default();
    if let Err(reason) = extract_node(root, None, &mut out) {
        log_skip(reason);
    }
    out
}

/// Extrait `node` puis ses descendants sous le chemin `prefix`.
///
/// `Err` décrit pourquoi le nœud lui-même n’a pas (entièrement) été traité ; les
/// échecs des enfants sont absorbés ici.
pub fn extract_node<'a>(node: &'a Value, prefix: Option<&str>, out: &mut Extraction<'a>) -> Result<(), SkipReason> {
    let code = node.as_code().ok_or(SkipReason::NotCode)?;
    let name = section_name(code)?;
    let path = match prefix {
        Some(parent) => format!("{parent}.{name}"),
        None => name.into_owned(),
    };

    out.sections.push(Section::new(path.as_str(), code.start_offset, code.code_size()));
    out.code_objects.push(code);

    let consts = code.consts.as_tuple().ok_or(SkipReason::ConstsNotTuple)?;
    for child in consts {
        if let Err(reason) = extract_node(child, Some(&path), out) {
            log_skip(reason);
        }
    }
    Ok(())
}

fn section_name(code: &CodeObject) -> Result<Cow<'_, str>, SkipReason> {
    match &code.name {
        Value::Null => Err(SkipReason::Unnamed),
        Value::Str { kind, data } if *kind != StrKind::Unicode => {
            if data.is_empty() {
                Err(SkipReason::EmptyName)
            } else {
                Ok(String::from_utf8_lossy(data))
            }
        }
        _ => Err(SkipReason::NameNotText),
    }
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn log_skip(reason: SkipReason) {
    match reason {
        SkipReason::NotCode => trace!(%reason, "skipped constant"),
        _ => debug!(%reason, "skipped code object"),
    }
}
