/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2026 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! The prefix-free encoding of a key into a tree path: `path_bit(k, i)` is
//! bit `i` of `k`'s little-endian byte representation, bit 0 being the LSB
//! of byte 0. Bit 0 decides left/right at the root, bit `i` at level `i`.

use crate::field::Hash;

/// Bit `i` of `k` (`0` = left, `1` = right).
pub fn path_bit(k: &Hash, i: usize) -> bool {
    let byte = k.as_bytes()[i / 8];
    (byte >> (i % 8)) & 1 == 1
}

/// The first `levels` path bits of `k`.
pub fn path(k: &Hash, levels: usize) -> Vec<bool> {
    (0..levels).map(|i| path_bit(k, i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_zero_is_lsb_of_first_byte() {
        let h = Hash::from_u64(1);
        assert!(path_bit(&h, 0));
        assert!(!path_bit(&h, 1));
    }

    #[test]
    fn bit_one_set_for_two() {
        let h = Hash::from_u64(2);
        assert!(!path_bit(&h, 0));
        assert!(path_bit(&h, 1));
    }

    #[test]
    fn path_collects_requested_levels() {
        let h = Hash::from_u64(3);
        let p = path(&h, 4);
        assert_eq!(p, vec![true, true, false, false]);
    }
}
