//! Shared test fixtures.

use rand_core::RngCore;

/// Deterministic nonce source for mining in tests: yields 1, 2, 3, ...
pub struct StepRng(u64);

impl StepRng {
    pub fn new() -> StepRng {
        StepRng(0)
    }
}

impl Default for StepRng {
    fn default() -> StepRng {
        StepRng::new()
    }
}

impl RngCore for StepRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(1);
        self.0
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
