use bitvec::slice::BitSlice;
use bitvec::vec::BitVec;
use rand::Rng;

/// Draw `count` independent, equiprobable bits.
pub fn random_bits<R: Rng + ?Sized>(rng: &mut R, count: usize) -> BitVec {
    let mut bits = BitVec::with_capacity(count);
    for _ in 0..count {
        bits.push(rng.gen::<bool>());
    }
    bits
}

/// Count positions where `sent` and `received` differ.
///
/// Bits present in only one of the two sequences count as errors.
pub fn count_bit_errors(sent: &BitSlice, received: &BitSlice) -> usize {
    let common = sent.len().min(received.len());
    let mismatched = sent[..common]
        .iter()
        .by_vals()
        .zip(received[..common].iter().by_vals())
        .filter(|(a, b)| a != b)
        .count();
    mismatched + sent.len().abs_diff(received.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitvec::bitvec;
    use bitvec::order::Lsb0;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn random_bits_has_requested_length_and_both_values() {
        let mut rng = StdRng::seed_from_u64(7);
        let bits = random_bits(&mut rng, 1000);
        assert_eq!(bits.len(), 1000);
        let ones = bits.count_ones();
        assert!(ones > 400 && ones < 600, "ones = {}", ones);
    }

    #[test]
    fn random_bits_is_reproducible_from_seed() {
        let a = random_bits(&mut StdRng::seed_from_u64(3), 64);
        let b = random_bits(&mut StdRng::seed_from_u64(3), 64);
        assert_eq!(a, b);
    }

    #[test]
    fn counts_mismatches_and_length_difference() {
        let sent = bitvec![usize, Lsb0; 1, 0, 1, 1, 0];
        let same = sent.clone();
        assert_eq!(count_bit_errors(&sent, &same), 0);

        let flipped = bitvec![usize, Lsb0; 0, 0, 1, 0, 0];
        assert_eq!(count_bit_errors(&sent, &flipped), 2);

        let short = bitvec![usize, Lsb0; 1, 1, 1];
        assert_eq!(count_bit_errors(&sent, &short), 1 + 2);
        assert_eq!(count_bit_errors(&short, &sent), 1 + 2);
    }
}
