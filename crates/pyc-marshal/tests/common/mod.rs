//! Construction de flux marshal pour les tests.

#![allow(dead_code)]

/// Python 3.8b4.
pub const PY38: u32 = 3413;

/// Écrivain de flux marshal.
#[derive(Debug, Default)]
pub struct Stream {
    bytes: Vec<u8>,
}

impl Stream {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.bytes.len() }

    pub fn finish(&self) -> Vec<u8> { self.bytes.clone() }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn tag(&mut self, t: u8) -> &mut Self { self.raw(&[t]) }

    pub fn u8(&mut self, v: u8) -> &mut Self { self.raw(&[v]) }

    pub fn u16(&mut self, v: u16) -> &mut Self { self.raw(&v.to_le_bytes()) }

    pub fn u32(&mut self, v: u32) -> &mut Self { self.raw(&v.to_le_bytes()) }

    pub fn i32(&mut self, v: i32) -> &mut Self { self.raw(&v.to_le_bytes()) }

    /// `z` + longueur 8 bits.
    pub fn short_ascii(&mut self, s: &str) -> &mut Self {
        self.tag(b'z').u8(s.len() as u8).raw(s.as_bytes())
    }

    /// `Z` : ajouté à la table d’internement.
    pub fn interned(&mut self, s: &str) -> &mut Self {
        self.tag(b'Z').u8(s.len() as u8).raw(s.as_bytes())
    }

    /// `s` + longueur 32 bits.
    pub fn string(&mut self, bytes: &[u8]) -> &mut Self { self.tag(b's').u32(bytes.len() as u32).raw(bytes) }

    pub fn string_ref(&mut self, index: u32) -> &mut Self { self.tag(b'R').u32(index) }

    pub fn small_tuple(&mut self, n: u8) -> &mut Self { self.tag(b')').u8(n) }

    pub fn tuple(&mut self, n: u32) -> &mut Self { self.tag(b'(').u32(n) }

    pub fn list(&mut self, n: u32) -> &mut Self { self.tag(b'[').u32(n) }

    pub fn int(&mut self, v: i32) -> &mut Self { self.tag(b'i').i32(v) }

    /// Code object 3.8 ; `consts` écrit le champ du même nom.
    ///
    /// Le bytecode commence 30 octets après le tag `c`.
    pub fn code38(&mut self, name: &str, bytecode: &[u8], consts: impl FnOnce(&mut Self)) -> &mut Self {
        self.tag(b'c');
        for v in [0, 0, 0, 0, 1, 0x40] {
            self.u32(v);
        }
        self.string(bytecode);
        consts(self);
        self.small_tuple(0).small_tuple(0).small_tuple(0).small_tuple(0);
        self.short_ascii("m.py").short_ascii(name).u32(1).string(b"")
    }
}

/// En-tête `.pyc` 3.8 (16 octets).
pub fn pyc38_header() -> Vec<u8> {
    let mut h = vec![0x55, 0x0d, 0x0d, 0x0a];
    h.extend_from_slice(&[0; 12]);
    h
}
