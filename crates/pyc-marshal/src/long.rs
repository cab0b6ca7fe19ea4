//! Adaptateur entier multi-précision pour `TYPE_LONG`.
//!
//! Le flux stocke la valeur absolue en chiffres de 15 bits, poids faible d’abord ;
//! le signe est celui du nombre de chiffres.

use num_bigint::{BigInt, BigUint, Sign};

/// Bits utiles par chiffre marshal.
pub const DIGIT_BITS: usize = 15;

/// Accumule les chiffres d’un entier long.
///
/// Les chiffres sont additionnés directement dans des mots de 32 bits : un chiffre
/// hors plage (bit 15 posé) déborde sur le suivant comme `limb << (15 * i)`.
#[derive(Debug, Default, Clone)]
pub struct LongAccumulator {
    words: Vec<u32>,
    digits: usize,
}

impl LongAccumulator {
    /// Accumulateur à zéro.
    pub fn new() -> Self { Self::default() }

    /// Accumulateur prévu pour `digits` chiffres.
    pub fn with_digits(digits: usize) -> Self {
        Self { words: Vec::with_capacity(digits * DIGIT_BITS / 32 + 2), digits: 0 }
    }

    /// Ajoute le chiffre suivant : `value += limb << (15 * i)`.
    pub fn push_digit(&mut self, limb: u16) {
        let bit = DIGIT_BITS * self.digits;
        self.digits += 1;

        let mut index = bit / 32;
        let mut carry = u64::from(limb) << (bit % 32);
        // Les mots au-dessus du dernier chiffre sont nuls : la retenue s’arrête vite.
        while carry != 0 {
            if index >= self.words.len() {
                self.words.resize(index + 1, 0);
            }
            let sum = u64::from(self.words[index]) + (carry & 0xffff_ffff);
            self.words[index] = (sum & 0xffff_ffff) as u32;
            carry = (carry >> 32) + (sum >> 32);
            index += 1;
        }
    }

    /// Nombre de chiffres consommés.
    pub fn digits(&self) -> usize { self.digits }

    /// Valeur finale signée.
    pub fn finish(self, negative: bool) -> BigInt {
        let sign = if negative { Sign::Minus } else { Sign::Plus };
        BigInt::from_biguint(sign, BigUint::new(self.words))
    }
}

/// Rendu hexadécimal : `0`, `0x1f`, `-0x1`.
pub fn to_hex_text(value: &BigInt) -> String {
    match value.sign() {
        Sign::NoSign => "0".to_owned(),
        Sign::Plus => format!("0x{:x}", value.magnitude()),
        Sign::Minus => format!("-0x{:x}", value.magnitude()),
    }
}
