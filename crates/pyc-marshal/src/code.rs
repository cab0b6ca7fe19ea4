//! Reconstruction des code objects (`TYPE_CODE`).
//!
//! L’ordre des champs est fixe ; seuls leur présence et leur largeur dépendent du
//! [`FormatProfile`](crate::FormatProfile) de la session. Une erreur sur n’importe
//! quel champ abandonne tout le code object.

use crate::decoder::Decoder;
use crate::error::{MarshalError, MarshalResult};
use crate::profile::FieldWidth;
use crate::value::CodeObject;

/// Tag (1 octet) + longueur de la chaîne de bytecode (4 octets).
const BYTECODE_HEADER: u64 = 5;

impl Decoder<'_> {
    pub(crate) fn decode_code(&mut self) -> MarshalResult<CodeObject> {
        let p = *self.profile();

        let argcount = self.read_field(p.argcount)?;
        let posonlyargcount = self.read_field(if p.posonlyargcount { FieldWidth::U32 } else { FieldWidth::Absent })?;
        let kwonlyargcount = self.read_field(if p.kwonlyargcount { FieldWidth::U32 } else { FieldWidth::Absent })?;
        let nlocals = self.read_field(p.nlocals)?;
        let stacksize = self.read_field(p.stacksize)?;
        let flags = self.read_field(p.flags)?;

        let start_offset = self.offset() + BYTECODE_HEADER;
        let code = self.decode_value()?;
        let end_offset = self.offset();
        if end_offset < start_offset {
            return Err(MarshalError::malformed("bytecode ends before its header"));
        }

        let consts = self.decode_value()?;
        let names = self.decode_value()?;

        let (localsplusnames, localspluskinds) =
            if p.localsplus { (Some(self.decode_value()?), Some(self.decode_value()?)) } else { (None, None) };
        let varnames = if p.varnames { Some(self.decode_value()?) } else { None };
        let (freevars, cellvars) =
            if p.free_cell_vars { (Some(self.decode_value()?), Some(self.decode_value()?)) } else { (None, None) };

        let filename = self.decode_value()?;
        let name = self.decode_value()?;
        let qualname = if p.localsplus { Some(self.decode_value()?) } else { None };

        let firstlineno = self.read_field(p.firstlineno)?;
        let lnotab = if p.lnotab { Some(self.decode_value()?) } else { None };
        let exceptiontable = if p.localsplus { Some(self.decode_value()?) } else { None };

        trace!(name = %name, start_offset, end_offset, "code object");

        Ok(CodeObject {
            argcount,
            posonlyargcount,
            kwonlyargcount,
            nlocals,
            stacksize,
            flags,
            code,
            consts,
            names,
            varnames,
            freevars,
            cellvars,
            localsplusnames,
            localspluskinds,
            filename,
            name,
            qualname,
            firstlineno,
            lnotab,
            exceptiontable,
            start_offset,
            end_offset,
        })
    }
}
