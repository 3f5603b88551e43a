/*
    FluxFox
    https://github.com/dbalsom/fluxfox

    Copyright 2024 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    src/random.rs

    Provide a random bit source for fuzzy bits.

    With the 'rand' feature, bits come from a seeded rand generator. Without it,
    we fall back to a fast pseudo-random bit table generated at compile time.
*/

#[cfg(not(feature = "rand"))]
const RANDOM_BITS_SIZE: usize = 2048;

#[cfg(not(feature = "rand"))]
const PSEUDO_RANDOM_BITS: [bool; RANDOM_BITS_SIZE] = generate_pseudo_random_bits(0x57A857FA, RANDOM_BITS_SIZE);

#[cfg(not(feature = "rand"))]
const fn pseudo_random_bit(seed: u32, index: usize) -> bool {
    // A simple pseudo-random function using bit shifts and XOR
    let mut value = seed ^ (index as u32);
    value = value.wrapping_mul(0x45d9f3b);
    value ^= value >> 16;
    (value & 1) != 0
}

#[cfg(not(feature = "rand"))]
const fn generate_pseudo_random_bits(seed: u32, len: usize) -> [bool; RANDOM_BITS_SIZE] {
    let mut bits = [false; RANDOM_BITS_SIZE];
    let mut i = 0;
    while i < len {
        bits[i] = pseudo_random_bit(seed, i);
        i += 1;
    }
    bits
}

/// A per-drive source of random bits, consulted whenever a fuzzy bit is read.
pub(crate) struct RandomBits {
    #[cfg(feature = "rand")]
    rng: rand::rngs::StdRng,
    #[cfg(not(feature = "rand"))]
    index: usize,
}

impl Default for RandomBits {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomBits {
    #[cfg(feature = "rand")]
    pub(crate) fn new() -> Self {
        use rand::SeedableRng;
        Self {
            rng: rand::rngs::StdRng::from_entropy(),
        }
    }

    #[cfg(not(feature = "rand"))]
    pub(crate) fn new() -> Self {
        Self { index: 0 }
    }

    #[cfg(feature = "rand")]
    pub(crate) fn next_bit(&mut self) -> bool {
        use rand::Rng;
        self.rng.gen::<bool>()
    }

    #[cfg(not(feature = "rand"))]
    pub(crate) fn next_bit(&mut self) -> bool {
        let bit = PSEUDO_RANDOM_BITS[self.index & (RANDOM_BITS_SIZE - 1)];
        self.index = self.index.wrapping_add(1);
        bit
    }
}
