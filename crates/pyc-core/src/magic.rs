//! Registre des magics CPython.
//!
//! Un fichier `.pyc` commence par 4 octets : un entier 16 bits LE propre à la
//! version de l’interpréteur, suivi de `\r\n`. Les valeurs numériques ne sont pas
//! chronologiques (1.x vaut ~40000, 2.x ~60000, 3.x ~3000), d’où un registre trié
//! par version : les comparaisons d’époque se font sur la *position* dans ce tableau.
//!
//! Toutes les recherches utilisent les 16 bits de poids faible du tag de version.

use crate::{CoreError, CoreResult};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Suffixe `\r\n` des magics `.pyc` (octets 2 et 3 de l’en-tête).
pub const PYC_MAGIC_SUFFIX: [u8; 2] = [0x0d, 0x0a];

/// Entrée du registre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PycVersion {
    /// Magic 16 bits.
    pub magic: u16,
    /// Version CPython correspondante.
    pub version: &'static str,
}

impl PycVersion {
    /// Magic complet tel qu’il apparaît (LE) en tête de fichier.
    pub const fn full_magic(&self) -> u32 { (self.magic as u32) | 0x0a0d_0000 }
}

const fn v(magic: u16, version: &'static str) -> PycVersion { PycVersion { magic, version } }

/// Registre, trié par version.
pub static VERSIONS: &[PycVersion] = &[
    v(39170, "1.0 - 1.1"),
    v(16679, "1.2"),
    v(11913, "1.3"),
    v(20117, "1.4"),
    v(20121, "1.5"),
    v(50428, "1.6"),
    v(50823, "2.0"),
    v(50824, "2.0b1"),
    v(60202, "2.1"),
    v(60717, "2.2"),
    v(60718, "2.2a1"),
    v(62011, "2.3a0"),
    v(62021, "2.3a0"),
    v(62041, "2.4a0"),
    v(62051, "2.4a3"),
    v(62061, "2.4b1"),
    v(62071, "2.5a0"),
    v(62081, "2.5a0"),
    v(62091, "2.5a0"),
    v(62092, "2.5a0"),
    v(62101, "2.5b3"),
    v(62111, "2.5b3"),
    v(62121, "2.5c1"),
    v(62131, "2.5c2"),
    v(62151, "2.6a0"),
    v(62161, "2.6a1"),
    v(62171, "2.7a0"),
    v(62181, "2.7a0"),
    v(62191, "2.7a0"),
    v(62201, "2.7a0"),
    v(62211, "2.7a0"),
    v(3000, "3.0"),
    v(3010, "3.0"),
    v(3020, "3.0"),
    v(3030, "3.0"),
    v(3040, "3.0"),
    v(3050, "3.0"),
    v(3060, "3.0"),
    v(3061, "3.0"),
    v(3071, "3.0"),
    v(3081, "3.0"),
    v(3091, "3.0"),
    v(3101, "3.0"),
    v(3103, "3.0"),
    v(3111, "3.0a4"),
    v(3131, "3.0a5"),
    v(3141, "3.1a1"),
    v(3151, "3.1a2"),
    v(3160, "3.2a1"),
    v(3170, "3.2a2"),
    v(3180, "3.2a3"),
    v(3190, "3.3a1"),
    v(3200, "3.3a1"),
    v(3210, "3.3a1"),
    v(3220, "3.3a2"),
    v(3230, "3.3a4"),
    v(3250, "3.4a1"),
    v(3260, "3.4a1"),
    v(3270, "3.4a1"),
    v(3280, "3.4a1"),
    v(3290, "3.4a4"),
    v(3300, "3.4a4"),
    v(3310, "3.4rc2"),
    v(3320, "3.5a1"),
    v(3330, "3.5b1"),
    v(3340, "3.5b2"),
    v(3350, "3.5b3"),
    v(3351, "3.5.2"),
    v(3360, "3.6a0"),
    v(3361, "3.6a1"),
    v(3370, "3.6a2"),
    v(3371, "3.6a2"),
    v(3372, "3.6a2"),
    v(3373, "3.6b1"),
    v(3375, "3.6b1"),
    v(3376, "3.6b1"),
    v(3377, "3.6b1"),
    v(3378, "3.6b2"),
    v(3379, "3.6rc1"),
    v(3390, "3.7a1"),
    v(3391, "3.7a2"),
    v(3392, "3.7a4"),
    v(3393, "3.7b1"),
    v(3394, "3.7b5"),
    v(3400, "3.8a1"),
    v(3401, "3.8a1"),
    v(3410, "3.8a1"),
    v(3411, "3.8b2"),
    v(3412, "3.8b2"),
    v(3413, "3.8b4"),
    v(3420, "3.9a0"),
    v(3421, "3.9a0"),
    v(3422, "3.9a0"),
    v(3423, "3.9a2"),
    v(3424, "3.9a2"),
    v(3425, "3.9a2"),
    v(3430, "3.10a1"),
    v(3431, "3.10a1"),
    v(3432, "3.10a2"),
    v(3433, "3.10a2"),
    v(3434, "3.10a6"),
    v(3435, "3.10a7"),
    v(3436, "3.10b1"),
    v(3437, "3.10b1"),
    v(3438, "3.10b1"),
    v(3439, "3.10b1"),
    // Pré-versions 3.11.
    v(3450, "3.11a1-rc"), v(3451, "3.11a1-rc"), v(3452, "3.11a1-rc"), v(3453, "3.11a1-rc"),
    v(3454, "3.11a1-rc"), v(3455, "3.11a1-rc"), v(3456, "3.11a1-rc"), v(3457, "3.11a1-rc"),
    v(3458, "3.11a1-rc"), v(3459, "3.11a1-rc"), v(3460, "3.11a1-rc"), v(3461, "3.11a1-rc"),
    v(3462, "3.11a1-rc"), v(3463, "3.11a1-rc"), v(3464, "3.11a1-rc"), v(3465, "3.11a1-rc"),
    v(3466, "3.11a1-rc"), v(3467, "3.11a1-rc"), v(3468, "3.11a1-rc"), v(3469, "3.11a1-rc"),
    v(3470, "3.11a1-rc"), v(3471, "3.11a1-rc"), v(3472, "3.11a1-rc"), v(3473, "3.11a1-rc"),
    v(3474, "3.11a1-rc"), v(3475, "3.11a1-rc"), v(3476, "3.11a1-rc"), v(3477, "3.11a1-rc"),
    v(3478, "3.11a1-rc"), v(3479, "3.11a1-rc"), v(3480, "3.11a1-rc"), v(3481, "3.11a1-rc"),
    v(3482, "3.11a1-rc"), v(3483, "3.11a1-rc"), v(3484, "3.11a1-rc"), v(3485, "3.11a1-rc"),
    v(3486, "3.11a1-rc"), v(3487, "3.11a1-rc"), v(3488, "3.11a1-rc"), v(3489, "3.11a1-rc"),
    v(3490, "3.11a1-rc"), v(3491, "3.11a1-rc"), v(3492, "3.11a1-rc"), v(3493, "3.11a1-rc"),
    v(3494, "3.11a1-rc"),
    v(3495, "3.11"),
    // Pré-versions 3.12.
    v(3500, "3.12a1-rc"), v(3501, "3.12a1-rc"), v(3502, "3.12a1-rc"), v(3503, "3.12a1-rc"),
    v(3504, "3.12a1-rc"), v(3505, "3.12a1-rc"), v(3506, "3.12a1-rc"), v(3507, "3.12a1-rc"),
    v(3508, "3.12a1-rc"), v(3509, "3.12a1-rc"), v(3510, "3.12a1-rc"), v(3511, "3.12a1-rc"),
    v(3512, "3.12a1-rc"), v(3513, "3.12a1-rc"), v(3514, "3.12a1-rc"), v(3515, "3.12a1-rc"),
    v(3516, "3.12a1-rc"), v(3517, "3.12a1-rc"), v(3518, "3.12a1-rc"), v(3519, "3.12a1-rc"),
    v(3520, "3.12a1-rc"), v(3521, "3.12a1-rc"), v(3522, "3.12a1-rc"), v(3523, "3.12a1-rc"),
    v(3524, "3.12a1-rc"), v(3525, "3.12a1-rc"), v(3526, "3.12a1-rc"), v(3527, "3.12a1-rc"),
    v(3528, "3.12a1-rc"), v(3529, "3.12a1-rc"), v(3530, "3.12a1-rc"),
    v(3531, "3.12"),
    // Pré-versions 3.13.
    v(3550, "3.13a1-rc"), v(3551, "3.13a1-rc"), v(3552, "3.13a1-rc"), v(3553, "3.13a1-rc"),
    v(3554, "3.13a1-rc"), v(3555, "3.13a1-rc"), v(3556, "3.13a1-rc"), v(3557, "3.13a1-rc"),
    v(3558, "3.13a1-rc"), v(3559, "3.13a1-rc"), v(3560, "3.13a1-rc"), v(3561, "3.13a1-rc"),
    v(3562, "3.13a1-rc"), v(3563, "3.13a1-rc"), v(3564, "3.13a1-rc"), v(3565, "3.13a1-rc"),
    v(3566, "3.13a1-rc"), v(3567, "3.13a1-rc"), v(3568, "3.13a1-rc"), v(3569, "3.13a1-rc"),
    v(3570, "3.13a1-rc"),
    v(3571, "3.13"),
];

/// Position d’un magic dans le registre.
fn position(magic: u16) -> Option<usize> { VERSIONS.iter().position(|e| e.magic == magic) }

fn low16(magic: u32) -> u16 { (magic & 0xffff) as u16 }

/// Recherche l’entrée associée à un tag de version (16 bits de poids faible).
pub fn lookup(magic: u32) -> Option<&'static PycVersion> {
    let m = low16(magic);
    VERSIONS.iter().find(|e| e.magic == m)
}

/// Vrai si `target` se situe entre `lower` et `upper` (inclus) dans l’ordre des versions.
///
/// `UnknownMagic` si l’une des trois valeurs n’est pas enregistrée.
pub fn magic_int_within(target: u32, lower: u16, upper: u16) -> CoreResult<bool> {
    let ti = position(low16(target)).ok_or(CoreError::UnknownMagic { magic: target })?;
    let li = position(lower).ok_or(CoreError::UnknownMagic { magic: u32::from(lower) })?;
    let ui = position(upper).ok_or(CoreError::UnknownMagic { magic: u32::from(upper) })?;
    Ok(li <= ti && ti <= ui)
}

/// Vrai si `target` est à la position de `since` ou après.
pub fn magic_int_since(target: u32, since: u16) -> CoreResult<bool> {
    let ti = position(low16(target)).ok_or(CoreError::UnknownMagic { magic: target })?;
    let si = position(since).ok_or(CoreError::UnknownMagic { magic: u32::from(since) })?;
    Ok(ti >= si)
}

/// Taille de l’en-tête `.pyc` (= point d’entrée du flux marshal).
///
/// - avant 3.3 : magic + mtime (8 octets)
/// - 3.3 à 3.6 : + taille source (12 octets)
/// - 3.7+ : + champ flags PEP 552 (16 octets)
pub fn header_size(magic: u32) -> CoreResult<usize> {
    if !magic_int_since(magic, 3210)? {
        Ok(8)
    } else if !magic_int_since(magic, 3392)? {
        Ok(12)
    } else {
        Ok(16)
    }
}

/// Lit et valide le magic en tête d’un fichier `.pyc`.
pub fn read_magic(data: &[u8]) -> CoreResult<u32> {
    let Some(head) = data.get(..4) else {
        return Err(CoreError::bad_header("file shorter than a magic number"));
    };
    if head[2..4] != PYC_MAGIC_SUFFIX {
        return Err(CoreError::bad_header("magic is not followed by \\r\\n"));
    }
    let magic = u32::from_le_bytes([head[0], head[1], head[2], head[3]]);
    lookup(magic).ok_or(CoreError::UnknownMagic { magic })?;
    Ok(magic)
}
