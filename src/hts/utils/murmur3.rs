/// 32 bit murmur3 over a byte string, consuming two bytes per block.
pub(crate) struct Murmur3 {
    seed: u32,
}

impl Murmur3 {
    /** Constructs a Murmur3 hash with the given seed. */
    pub(crate) fn new(seed: u32) -> Self {
        Self { seed }
    }

    pub(crate) fn hash_bytes(&self, bytes: &[u8]) -> u32 {
        let mut h1 = self.seed;

        let mut blocks = bytes.chunks_exact(2);
        for block in blocks.by_ref() {
            let k1 = Self::mix_k1(block[0] as u32 | ((block[1] as u32) << 16));
            h1 = Self::mix_h1(h1, k1);
        }

        // deal with any remaining bytes
        if let [last] = blocks.remainder() {
            h1 ^= Self::mix_k1(*last as u32);
        }

        Self::fmix(h1, 2 * bytes.len() as u32)
    }

    fn mix_k1(mut k1: u32) -> u32 {
        const C1: u32 = 0xcc9e2d51;
        const C2: u32 = 0x1b873593;

        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(15);
        k1.wrapping_mul(C2)
    }

    fn mix_h1(mut h1: u32, k1: u32) -> u32 {
        h1 ^= k1;
        h1 = h1.rotate_left(13);
        h1.wrapping_mul(5).wrapping_add(0xe6546b64)
    }

    fn fmix(mut h1: u32, length: u32) -> u32 {
        h1 ^= length;
        h1 ^= h1 >> 16;
        h1 = h1.wrapping_mul(0x85ebca6b);
        h1 ^= h1 >> 13;
        h1 = h1.wrapping_mul(0xc2b2ae35);
        h1 ^= h1 >> 16;

        h1
    }
}
