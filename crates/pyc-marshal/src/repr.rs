//! Rendu textuel des valeurs, proche du `repr` Python.

use std::fmt::{self, Write as _};

use crate::long::to_hex_text;
use crate::value::{StrKind, Value};

/// Formate un double comme `printf("%.15g")`.
pub fn format_g15(x: f64) -> String {
    const PRECISION: i32 = 15;

    if x.is_nan() {
        return "nan".to_owned();
    }
    if x.is_infinite() {
        return if x < 0.0 { "-inf" } else { "inf" }.to_owned();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0" } else { "0" }.to_owned();
    }

    // L’exposant est pris après arrondi à 15 chiffres significatifs.
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, x);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= PRECISION {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.abs())
    } else {
        let decimals = (PRECISION - 1 - exp) as usize;
        trim_fraction(&format!("{x:.decimals$}")).to_owned()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') { s.trim_end_matches('0').trim_end_matches('.') } else { s }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

fn write_str_value(f: &mut fmt::Formatter<'_>, kind: Option<StrKind>, data: &[u8]) -> fmt::Result {
    if kind == Some(StrKind::Bytes) || kind == Some(StrKind::Interned) {
        let mut out = String::from("b'");
        for &b in data {
            if b == b'\'' {
                out.push_str("\\'");
            } else {
                for c in std::ascii::escape_default(b) {
                    out.push(char::from(c));
                }
            }
        }
        out.push('\'');
        return f.write_str(&out);
    }
    f.write_char('\'')?;
    for c in String::from_utf8_lossy(data).chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '"' => f.write_char('"')?,
            c => write!(f, "{}", c.escape_debug())?,
        }
    }
    f.write_char('\'')
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::None => f.write_str("None"),
            Value::True => f.write_str("True"),
            Value::False => f.write_str("False"),
            Value::StopIteration => f.write_str("StopIteration"),
            Value::Ellipsis => f.write_str("Ellipsis"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Int64(i) => write!(f, "{i}"),
            Value::Long(v) => f.write_str(&to_hex_text(v)),
            Value::Float(text) => f.write_str(text),
            Value::BinaryFloat(x) => f.write_str(&format_g15(*x)),
            Value::Complex { real, imag } => write!(f, "{real}+{imag}j"),
            Value::BinaryComplex { real, imag } => write!(f, "{}+{}j", format_g15(*real), format_g15(*imag)),
            Value::Str { kind, data } => write_str_value(f, Some(*kind), data),
            Value::StringRef { data, .. } => write_str_value(f, None, data),
            Value::Tuple(items) | Value::SmallTuple(items) => {
                if items.len() == 1 {
                    write!(f, "({},)", items[0])
                } else {
                    write_seq(f, "(", items, ")")
                }
            }
            Value::List(items) => write_seq(f, "[", items, "]"),
            Value::Dict(pairs) => {
                f.write_char('{')?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_char('}')
            }
            Value::Set(items) if items.is_empty() => f.write_str("set()"),
            Value::Set(items) => write_seq(f, "{", items, "}"),
            Value::FrozenSet(items) if items.is_empty() => f.write_str("frozenset()"),
            Value::FrozenSet(items) => write_seq(f, "frozenset({", items, "})"),
            Value::Code(code) => match code.name_text() {
                Some(name) => write!(f, "<code object {name}>"),
                None => f.write_str("<code object>"),
            },
        }
    }
}
